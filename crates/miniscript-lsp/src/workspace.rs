//! Documents, the phase-driven builder, and the open-document store.
//!
//! A [`Document`] is rebuilt from scratch on every change: the builder
//! walks it through `Changed -> Parsed -> Linked -> Validated`, running the
//! listeners registered for each phase. The type computer is one such
//! listener, attached to `Linked`.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tower_lsp::lsp_types::Url;
use tracing::debug;

use miniscript_ast::{link, Ast, LinkError};
use miniscript_common::LineIndex;
use miniscript_typeck::driver::PhaseListener;
use miniscript_typeck::{DocumentLifecycle, DocumentPhase, TypeComputer, TypeSystem, TypedDocument, TypeckResult};

/// One open document and everything computed for its current version.
pub struct Document {
    uri: Url,
    version: i32,
    ast: Ast,
    line_index: LineIndex,
    phase: DocumentPhase,
    link_errors: Vec<LinkError>,
    types: Option<TypeckResult>,
}

impl Document {
    pub fn new(uri: Url, version: i32, ast: Ast) -> Self {
        let line_index = LineIndex::new(ast.text());
        Document {
            uri,
            version,
            ast,
            line_index,
            phase: DocumentPhase::Changed,
            link_errors: Vec::new(),
            types: None,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn text(&self) -> &str {
        self.ast.text()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn phase(&self) -> DocumentPhase {
        self.phase
    }

    /// Names the linker could not resolve.
    pub fn link_errors(&self) -> &[LinkError] {
        &self.link_errors
    }

    /// Types of the current version, once it has been linked.
    pub fn types(&self) -> Option<&TypeckResult> {
        self.types.as_ref()
    }
}

impl TypedDocument for Document {
    fn ast(&self) -> &Ast {
        &self.ast
    }

    fn attach_types(&mut self, result: TypeckResult) {
        self.types = Some(result);
    }
}

// ── Builder ────────────────────────────────────────────────────────────

/// Drives documents through their phases.
#[derive(Default)]
pub struct DocumentBuilder {
    listeners: Vec<(DocumentPhase, PhaseListener<Document>)>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every phase on `doc`, linking it on the way.
    pub fn build(&mut self, doc: &mut Document) {
        self.advance(doc, DocumentPhase::Changed);
        // Trees arrive already parsed.
        self.advance(doc, DocumentPhase::Parsed);
        doc.link_errors = link(&mut doc.ast);
        self.advance(doc, DocumentPhase::Linked);
        self.advance(doc, DocumentPhase::Validated);
    }

    fn advance(&mut self, doc: &mut Document, phase: DocumentPhase) {
        doc.phase = phase;
        debug!(uri = %doc.uri, version = doc.version, ?phase, "document phase");
        for (at, listener) in &mut self.listeners {
            if *at == phase {
                listener(doc);
            }
        }
    }
}

impl DocumentLifecycle for DocumentBuilder {
    type Document = Document;

    fn on_phase(&mut self, phase: DocumentPhase, listener: PhaseListener<Document>) {
        self.listeners.push((phase, listener));
    }
}

// ── Workspace ──────────────────────────────────────────────────────────

/// Open documents keyed by URI.
pub struct Workspace {
    builder: DocumentBuilder,
    documents: FxHashMap<Url, Document>,
}

impl Workspace {
    pub fn new(builder: DocumentBuilder) -> Self {
        Workspace {
            builder,
            documents: FxHashMap::default(),
        }
    }

    /// A workspace whose documents are type checked with `system`.
    pub fn with_type_system(system: Arc<TypeSystem>) -> Self {
        let mut builder = DocumentBuilder::new();
        TypeComputer::new(system).register(&mut builder);
        Self::new(builder)
    }

    pub fn open(&mut self, uri: Url, version: i32, ast: Ast) -> &Document {
        debug!(uri = %uri, version, "open document");
        self.rebuild(uri, version, ast)
    }

    /// Replace a document with a new version. Nothing of the previous
    /// version survives.
    pub fn change(&mut self, uri: Url, version: i32, ast: Ast) -> &Document {
        debug!(uri = %uri, version, "change document");
        self.rebuild(uri, version, ast)
    }

    pub fn close(&mut self, uri: &Url) -> Option<Document> {
        debug!(uri = %uri, "close document");
        self.documents.remove(uri)
    }

    pub fn get(&self, uri: &Url) -> Option<&Document> {
        self.documents.get(uri)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn rebuild(&mut self, uri: Url, version: i32, ast: Ast) -> &Document {
        let mut doc = Document::new(uri.clone(), version, ast);
        self.builder.build(&mut doc);
        self.documents.insert(uri.clone(), doc);
        &self.documents[&uri]
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::with_type_system(Arc::new(TypeSystem::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniscript_ast::AstBuilder;
    use miniscript_typeck::Ty;

    fn uri() -> Url {
        Url::parse("file:///main.ms").unwrap()
    }

    fn var_doc(value: i64) -> (Ast, miniscript_ast::NodeId) {
        let mut b = AstBuilder::new();
        let lit = b.int(value);
        let x = b.var("x", None, Some(lit));
        (b.finish(vec![x]), x)
    }

    #[test]
    fn open_links_and_types_the_document() {
        let mut workspace = Workspace::default();
        let (ast, x) = var_doc(1);
        let doc = workspace.open(uri(), 1, ast);

        assert_eq!(doc.phase(), DocumentPhase::Validated);
        assert!(doc.link_errors().is_empty());
        let types = doc.types().unwrap();
        assert_eq!(types.type_of(x), Some(&Ty::int()));
    }

    #[test]
    fn change_replaces_the_document() {
        let mut workspace = Workspace::default();
        let (ast, _) = var_doc(1);
        workspace.open(uri(), 1, ast);

        let mut b = AstBuilder::new();
        let s = b.string("s");
        let y = b.var("y", None, Some(s));
        let ast = b.finish(vec![y]);
        let doc = workspace.change(uri(), 2, ast);

        assert_eq!(doc.version(), 2);
        assert_eq!(doc.text(), "var y = \"s\";");
        let types = doc.types().unwrap();
        assert_eq!(types.env.len(), 1);
        assert_eq!(types.type_of(y), Some(&Ty::string()));
        assert_eq!(workspace.len(), 1);
    }

    #[test]
    fn close_forgets_the_document() {
        let mut workspace = Workspace::default();
        let (ast, _) = var_doc(1);
        workspace.open(uri(), 1, ast);
        assert!(workspace.close(&uri()).is_some());
        assert!(workspace.get(&uri()).is_none());
        assert!(workspace.is_empty());
    }

    #[test]
    fn unresolved_names_are_kept_as_link_errors() {
        let mut workspace = Workspace::default();
        let mut b = AstBuilder::new();
        let missing = b.reference("missing");
        let x = b.var("x", None, Some(missing));
        let doc = workspace.open(uri(), 1, b.finish(vec![x]));

        assert_eq!(doc.link_errors().len(), 1);
        assert_eq!(doc.link_errors()[0].name, "missing");
        // The checker still runs; the unresolved reference is a fresh variable.
        assert!(doc.types().unwrap().diagnostics.is_empty());
    }

    #[test]
    fn listeners_run_in_phase_order() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut builder = DocumentBuilder::new();
        for phase in [DocumentPhase::Validated, DocumentPhase::Parsed, DocumentPhase::Linked] {
            let seen = Arc::clone(&seen);
            builder.on_phase(
                phase,
                Box::new(move |doc: &mut Document| seen.lock().unwrap().push(doc.phase())),
            );
        }
        let mut workspace = Workspace::new(builder);
        let (ast, _) = var_doc(1);
        let doc = workspace.open(uri(), 1, ast);

        assert!(doc.types().is_none());
        assert_eq!(
            *seen.lock().unwrap(),
            vec![DocumentPhase::Parsed, DocumentPhase::Linked, DocumentPhase::Validated]
        );
    }
}
