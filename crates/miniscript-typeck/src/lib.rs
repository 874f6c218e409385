//! MiniScript type checker: bidirectional inference and checking.
//!
//! Every declaration in a linked document is given a type. Inference
//! synthesizes a type bottom-up; checking verifies a node against an
//! expected type and reports disagreements on the most specific node it
//! can. Type variables are solved by unification.
//!
//! # Architecture
//!
//! - [`ty`]: Core type representation (Ty, TyVar, PrimTy, ClassTy)
//! - [`unify`]: Unification and assignability with occurs check
//! - [`env`]: Declaration -> type environment of one pass
//! - [`signatures`]: Operator and function signature tables
//! - [`builtins`]: Built-in primitive and operator registration
//! - [`config`]: Severity and reporting options
//! - [`error`]: Type errors, origins and diagnostics
//! - [`infer`]: The checker and its inference half
//! - [`diagnostics`]: Ariadne and JSON rendering
//! - [`driver`]: Recomputing types when a document is linked

pub mod builtins;
mod calls;
mod check;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod env;
pub mod error;
pub mod infer;
pub mod signatures;
pub mod ty;
pub mod unify;

use rustc_hash::FxHashMap;

use miniscript_ast::{Ast, NodeId};

pub use builtins::TypeSystem;
pub use config::TypeckConfig;
pub use diagnostics::DiagnosticOptions;
pub use driver::{DocumentLifecycle, DocumentPhase, TypeComputer, TypedDocument};
pub use env::TypeEnv;
pub use error::{Diagnostic, Severity, TypeError};
pub use infer::TypeChecker;
pub use ty::Ty;

/// The result of type checking one document.
#[derive(Debug, Default)]
pub struct TypeckResult {
    /// Fully resolved type of every declaration.
    pub env: TypeEnv,
    /// Errors and warnings, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
    /// Call expression -> the function declaration it resolved to.
    pub resolved_calls: FxHashMap<NodeId, NodeId>,
}

impl TypeckResult {
    /// Type of a declaration, if it was reached.
    pub fn type_of(&self, decl: NodeId) -> Option<&Ty> {
        self.env.get(decl)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Render every diagnostic against `ast`.
    pub fn render_diagnostics(&self, ast: &Ast, filename: &str, options: &DiagnosticOptions) -> Vec<String> {
        self.diagnostics
            .iter()
            .map(|diag| diagnostics::render_diagnostic(diag, ast, filename, options))
            .collect()
    }
}

/// Type-check a linked document.
pub fn check(ast: &Ast, system: &TypeSystem) -> TypeckResult {
    TypeChecker::new(ast, system).run()
}
