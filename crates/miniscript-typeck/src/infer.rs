//! Inference: synthesize a type for a node, bottom-up.
//!
//! [`TypeChecker`] owns everything one checking pass needs: the unification
//! table, the environment being filled, the user function signatures seen
//! in this document, and the diagnostics collected so far. Inference and
//! checking (`check.rs`) are mutually recursive methods on it; operator and
//! call typing lives in `calls.rs`.
//!
//! Declarations are memoized in the environment, so a reference that is
//! reached before its declaration (hoisting) infers the declaration early
//! and the later walk reuses the result. Variables and parameters are
//! marked in progress while their initializer or default value is analysed;
//! reaching one of them again through a reference is a circular dependency.

use rustc_hash::FxHashMap;
use tracing::debug;

use miniscript_ast::{Ast, NodeId, NodeKind};

use crate::builtins::{LiteralKind, TypeSystem};
use crate::env::TypeEnv;
use crate::error::{ConstraintOrigin, Diagnostic, Severity, TypeError};
use crate::signatures::{Signature, SignatureTable};
use crate::ty::Ty;
use crate::unify::InferCtx;
use crate::TypeckResult;

pub struct TypeChecker<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) system: &'a TypeSystem,
    pub(crate) ctx: InferCtx,
    pub(crate) env: TypeEnv,
    /// User function signatures of this pass, grouped into overload sets.
    pub(crate) functions: SignatureTable,
    /// Provisional types of variables and parameters under analysis.
    pub(crate) in_progress: FxHashMap<NodeId, Ty>,
    /// Call expression -> function declaration it resolved to.
    pub(crate) resolved_calls: FxHashMap<NodeId, NodeId>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(ast: &'a Ast, system: &'a TypeSystem) -> Self {
        TypeChecker {
            ast,
            system,
            ctx: InferCtx::new(),
            env: TypeEnv::new(),
            functions: SignatureTable::new(),
            in_progress: FxHashMap::default(),
            resolved_calls: FxHashMap::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Check the whole document.
    pub fn run(mut self) -> TypeckResult {
        debug!(nodes = self.ast.len(), "type checking document");
        self.declare_functions();
        let root = self.ast.root();
        self.infer(root);
        self.finish()
    }

    /// Resolve every recorded type and hand over the results.
    pub fn finish(self) -> TypeckResult {
        let TypeChecker {
            mut ctx,
            mut env,
            diagnostics,
            resolved_calls,
            ..
        } = self;
        env.map_types(|ty| ctx.resolve(ty));
        let result = TypeckResult {
            env,
            diagnostics,
            resolved_calls,
        };
        debug!(
            bindings = result.env.len(),
            errors = result.errors().count(),
            warnings = result.warnings().count(),
            "type check finished"
        );
        result
    }

    pub fn env(&self) -> &TypeEnv {
        &self.env
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Follow type variable bindings made so far.
    pub fn resolve(&mut self, ty: Ty) -> Ty {
        self.ctx.resolve(ty)
    }

    // ── Reporting ───────────────────────────────────────────────────────

    pub(crate) fn report(&mut self, error: TypeError, severity: Severity) {
        let ctx = &mut self.ctx;
        let error = error.map_types(&mut |ty| ctx.resolve(ty));
        self.diagnostics.push(Diagnostic::new(error, severity));
    }

    /// Unify, reporting a failure as an error. Returns whether they agreed.
    pub(crate) fn unify_or_report(&mut self, expected: Ty, found: Ty, origin: ConstraintOrigin) -> bool {
        match self.ctx.unify(expected, found, origin) {
            Ok(()) => true,
            Err(err) => {
                self.report(err, Severity::Error);
                false
            }
        }
    }

    /// Source text of a node, for messages that quote the program.
    pub(crate) fn source_text(&self, node: NodeId) -> String {
        let range = self.ast.span(node).range();
        self.ast.text().get(range).unwrap_or_default().to_string()
    }

    pub(crate) fn enclosing_function(&self, node: NodeId) -> Option<NodeId> {
        self.ast
            .ancestor(node, |kind| matches!(kind, NodeKind::FunctionDecl { .. }))
    }

    // ── Function signatures ─────────────────────────────────────────────

    /// Register the signature of every function declared in the document.
    fn declare_functions(&mut self) {
        let ast = self.ast;
        for id in ast.descendants(ast.root()) {
            if matches!(ast.kind(id), NodeKind::FunctionDecl { .. }) {
                self.function_signature(id);
            }
        }
    }

    /// Signature of a function declaration, registering it on first sight.
    ///
    /// Parameter types are the parameters' inferred types; the return type
    /// is the declared one or a fresh variable later bound by the body.
    pub(crate) fn function_signature(&mut self, decl: NodeId) -> Signature {
        if let Some(sig) = self.functions.for_decl(decl) {
            return sig.clone();
        }
        let ast = self.ast;
        let NodeKind::FunctionDecl {
            name,
            params,
            return_type,
            ..
        } = ast.kind(decl)
        else {
            debug_assert!(false, "{decl} is not a function declaration");
            return Signature::declared(decl, Vec::new(), Ty::Unknown);
        };

        let param_tys: Vec<Ty> = params
            .iter()
            .map(|param| self.infer(*param).unwrap_or(Ty::Unknown))
            .collect();
        let ret = match return_type {
            Some(ty) => self.infer(*ty).unwrap_or(Ty::Unknown),
            None => self.ctx.fresh_var(),
        };

        // A default value may have reached this declaration already.
        if let Some(sig) = self.functions.for_decl(decl) {
            return sig.clone();
        }
        let sig = Signature::declared(decl, param_tys, ret);
        debug!(name = %name, arity = sig.arity(), "registered function signature");
        self.functions.register(name.clone(), sig.clone());
        sig
    }

    // ── Inference ───────────────────────────────────────────────────────

    /// Synthesize the type of `node`. `None` means the node is not typed
    /// (the program root).
    pub fn infer(&mut self, node: NodeId) -> Option<Ty> {
        let ast = self.ast;
        let kind = ast.kind(node);
        let ty = match kind {
            NodeKind::Program { items } => {
                for item in items {
                    self.infer(*item);
                }
                return None;
            }
            NodeKind::IntegerLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::BooleanLiteral { .. } => match LiteralKind::of(kind) {
                Some(literal) => self.system.literal_type(literal),
                None => Ty::Unknown,
            },
            NodeKind::ConditionalExpression {
                condition,
                then_branch,
                else_branch,
            } => self.infer_conditional(node, *condition, *then_branch, *else_branch),
            NodeKind::InfixExpression { op, left, right } => {
                self.infer_operator(node, op.symbol(), &[*left, *right])
            }
            NodeKind::PrefixExpression { op, operand } => {
                self.infer_operator(node, op.symbol(), &[*operand])
            }
            NodeKind::CallExpression { receiver, args } => self.infer_call(node, *receiver, args),
            NodeKind::ReferenceExpression { target, .. } => match target {
                Some(decl) => self.declaration_type(*decl, node),
                None => self.ctx.fresh_var(),
            },
            NodeKind::NamedType { name, target } => match target {
                Some(decl) => self.declaration_type(*decl, node),
                None => self.system.named_primitive(name).unwrap_or(Ty::Unknown),
            },
            NodeKind::ClassDecl { name } => self.infer_class(node, name),
            NodeKind::FunctionDecl { body, .. } => self.infer_function(node, *body),
            NodeKind::ValueParameter {
                type_ref,
                default_value,
                ..
            } => self.infer_binding(node, *type_ref, *default_value),
            NodeKind::VariableDecl {
                type_ref, value, ..
            } => self.infer_binding(node, *type_ref, *value),
            NodeKind::BlockStatement { statements } => self.infer_block(statements).0,
            NodeKind::ReturnStatement { value } => match value {
                Some(value) => self.infer(*value).unwrap_or(Ty::Unknown),
                None => Ty::Void,
            },
        };
        Some(ty)
    }

    /// Type of the declaration a reference points at.
    fn declaration_type(&mut self, decl: NodeId, reference: NodeId) -> Ty {
        if let Some(ty) = self.env.get(decl) {
            return ty.clone();
        }
        if let Some(ty) = self.in_progress.get(&decl).cloned() {
            let name = self.ast.name(decl).unwrap_or_default().to_string();
            self.report(
                TypeError::CircularDependency {
                    name,
                    decl,
                    reference,
                },
                Severity::Error,
            );
            return ty;
        }
        match self.infer(decl) {
            Some(ty) => ty,
            None => self.ctx.fresh_var(),
        }
    }

    fn infer_conditional(
        &mut self,
        node: NodeId,
        condition: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    ) -> Ty {
        self.check(condition, &Ty::bool());
        let then_ty = self.infer(then_branch).unwrap_or(Ty::Unknown);
        let else_ty = self.infer(else_branch).unwrap_or(Ty::Unknown);
        if self.system.config().report_branch_mismatch {
            let origin = ConstraintOrigin::IfBranches {
                expr: node,
                then_branch,
                else_branch,
            };
            self.unify_or_report(then_ty.clone(), else_ty, origin);
        }
        then_ty
    }

    fn infer_class(&mut self, node: NodeId, name: &str) -> Ty {
        if let Some(ty) = self.env.get(node) {
            return ty.clone();
        }
        let ty = self
            .system
            .class_primitive(name)
            .unwrap_or_else(|| Ty::class(node, name));
        self.env.insert(node, ty)
    }

    fn infer_function(&mut self, node: NodeId, body: NodeId) -> Ty {
        if let Some(ty) = self.env.get(node) {
            return ty.clone();
        }
        let sig = self.function_signature(node);
        // Default values may have walked this function while it was being signed.
        if let Some(ty) = self.env.get(node) {
            return ty.clone();
        }
        let fun_ty = self.env.insert(node, sig.to_ty());

        let ast = self.ast;
        let (body_ty, first_return) = match ast.kind(body) {
            NodeKind::BlockStatement { statements } => self.infer_block(statements),
            _ => (self.infer(body).unwrap_or(Ty::Unknown), None),
        };
        let origin = ConstraintOrigin::Return {
            ret: first_return.unwrap_or(body),
            function: Some(node),
        };
        self.unify_or_report(sig.ret, body_ty, origin);
        fun_ty
    }

    /// Variables and parameters: the declared type, or a fresh variable,
    /// which the initializer/default value is then checked against.
    fn infer_binding(&mut self, node: NodeId, type_ref: Option<NodeId>, value: Option<NodeId>) -> Ty {
        if let Some(ty) = self.env.get(node) {
            return ty.clone();
        }
        if let Some(ty) = self.in_progress.get(&node) {
            return ty.clone();
        }
        let expected = match type_ref {
            Some(ty) => self.infer(ty).unwrap_or(Ty::Unknown),
            None => self.ctx.fresh_var(),
        };
        if let Some(value) = value {
            self.in_progress.insert(node, expected.clone());
            self.check(value, &expected);
            self.in_progress.remove(&node);
        }
        self.env.insert(node, expected)
    }

    /// Infer every statement. The block's type is that of the first
    /// statement that definitely returns (a return, or a nested block that
    /// does); later returns must agree with it. Blocks that never return
    /// are `Void`. Also yields the first return statement, for locations.
    pub(crate) fn infer_block(&mut self, statements: &[NodeId]) -> (Ty, Option<NodeId>) {
        let mut first: Option<(Ty, NodeId)> = None;
        for &statement in statements {
            let ty = self.infer(statement).unwrap_or(Ty::Unknown);
            let Some(ret) = first_return(self.ast, statement) else {
                continue;
            };
            match &first {
                None => first = Some((ty, ret)),
                Some((first_ty, _)) => {
                    let origin = ConstraintOrigin::Return {
                        ret,
                        function: self.enclosing_function(ret),
                    };
                    self.unify_or_report(first_ty.clone(), ty, origin);
                }
            }
        }
        match first {
            Some((ty, ret)) => (ty, Some(ret)),
            None => (Ty::Void, None),
        }
    }
}

/// The return statement that makes `statement` definitely return, if any.
pub(crate) fn first_return(ast: &Ast, statement: NodeId) -> Option<NodeId> {
    match ast.kind(statement) {
        NodeKind::ReturnStatement { .. } => Some(statement),
        NodeKind::BlockStatement { statements } => {
            statements.iter().find_map(|s| first_return(ast, *s))
        }
        _ => None,
    }
}
