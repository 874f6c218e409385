//! Recomputing types as documents move through the host lifecycle.
//!
//! The host owns documents and advances them through [`DocumentPhase`]s.
//! [`TypeComputer::register`] subscribes to the `Linked` phase: every time a
//! document is (re)linked, a fresh checking pass runs over its tree and the
//! result replaces whatever the document carried before. Nothing is reused
//! between passes except the shared [`TypeSystem`].

use std::sync::Arc;

use tracing::debug;

use miniscript_ast::Ast;

use crate::builtins::TypeSystem;
use crate::TypeckResult;

/// Stages a document goes through after each edit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentPhase {
    Changed,
    Parsed,
    Linked,
    Validated,
}

/// A document the checker can read a tree from and attach types to.
pub trait TypedDocument {
    fn ast(&self) -> &Ast;

    /// Replace the document's types with a new result.
    fn attach_types(&mut self, result: TypeckResult);
}

pub type PhaseListener<D> = Box<dyn FnMut(&mut D)>;

/// Host side of the lifecycle: accepts listeners run when a document
/// reaches a phase.
pub trait DocumentLifecycle {
    type Document: TypedDocument;

    fn on_phase(&mut self, phase: DocumentPhase, listener: PhaseListener<Self::Document>);
}

/// Runs a checking pass per linked document.
#[derive(Clone)]
pub struct TypeComputer {
    system: Arc<TypeSystem>,
}

impl TypeComputer {
    pub fn new(system: Arc<TypeSystem>) -> Self {
        TypeComputer { system }
    }

    pub fn system(&self) -> &Arc<TypeSystem> {
        &self.system
    }

    /// Subscribe to the `Linked` phase of `lifecycle`.
    pub fn register<L: DocumentLifecycle>(&self, lifecycle: &mut L) {
        let computer = self.clone();
        lifecycle.on_phase(
            DocumentPhase::Linked,
            Box::new(move |doc: &mut L::Document| computer.update(doc)),
        );
    }

    /// Check a tree from scratch.
    pub fn compute(&self, ast: &Ast) -> TypeckResult {
        crate::check(ast, &self.system)
    }

    /// Check a document and attach the result, dropping the previous one.
    pub fn update<D: TypedDocument>(&self, doc: &mut D) {
        let result = self.compute(doc.ast());
        debug!(
            bindings = result.env.len(),
            diagnostics = result.diagnostics.len(),
            "attached types to document"
        );
        doc.attach_types(result);
    }
}

impl Default for TypeComputer {
    fn default() -> Self {
        TypeComputer::new(Arc::new(TypeSystem::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniscript_ast::AstBuilder;

    use crate::ty::Ty;

    struct Doc {
        ast: Ast,
        results: usize,
        types: Option<TypeckResult>,
    }

    impl TypedDocument for Doc {
        fn ast(&self) -> &Ast {
            &self.ast
        }

        fn attach_types(&mut self, result: TypeckResult) {
            self.results += 1;
            self.types = Some(result);
        }
    }

    #[derive(Default)]
    struct Host {
        listeners: Vec<(DocumentPhase, PhaseListener<Doc>)>,
    }

    impl Host {
        fn advance(&mut self, doc: &mut Doc, phase: DocumentPhase) {
            for (at, listener) in &mut self.listeners {
                if *at == phase {
                    listener(doc);
                }
            }
        }
    }

    impl DocumentLifecycle for Host {
        type Document = Doc;

        fn on_phase(&mut self, phase: DocumentPhase, listener: PhaseListener<Doc>) {
            self.listeners.push((phase, listener));
        }
    }

    fn doc() -> (Doc, miniscript_ast::NodeId) {
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let x = b.var("x", None, Some(five));
        (
            Doc {
                ast: b.finish(vec![x]),
                results: 0,
                types: None,
            },
            x,
        )
    }

    #[test]
    fn types_attach_only_on_linked() {
        let mut host = Host::default();
        TypeComputer::default().register(&mut host);
        let (mut doc, x) = doc();

        host.advance(&mut doc, DocumentPhase::Parsed);
        assert!(doc.types.is_none());

        host.advance(&mut doc, DocumentPhase::Linked);
        let types = doc.types.as_ref().unwrap();
        assert_eq!(types.type_of(x), Some(&Ty::int()));
        assert_eq!(doc.results, 1);
    }

    #[test]
    fn relinking_replaces_previous_result() {
        let mut host = Host::default();
        TypeComputer::default().register(&mut host);
        let (mut doc, x) = doc();

        host.advance(&mut doc, DocumentPhase::Linked);
        host.advance(&mut doc, DocumentPhase::Linked);
        assert_eq!(doc.results, 2);
        let types = doc.types.as_ref().unwrap();
        assert_eq!(types.env.len(), 1);
        assert_eq!(types.type_of(x), Some(&Ty::int()));
    }
}
