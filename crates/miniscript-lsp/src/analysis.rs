//! Editor analysis over a built document: LSP diagnostics, inlay hints and
//! hover.
//!
//! Byte offsets are converted into LSP line/character positions (0-based,
//! UTF-16 code units, as LSP requires).

use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, Hover, HoverContents, InlayHint, InlayHintKind, InlayHintLabel,
    MarkupContent, MarkupKind, NumberOrString, Position, Range,
};

use miniscript_ast::{NodeId, NodeKind, Property};
use miniscript_common::{LineIndex, Span};
use miniscript_typeck::diagnostics::{diagnostic_span, error_code};
use miniscript_typeck::{Severity, Ty, TypedDocument};

use crate::workspace::Document;

const SOURCE: &str = "miniscript";

/// Convert a byte offset to an LSP Position (0-based line, 0-based UTF-16 character offset).
pub fn offset_to_position(source: &str, index: &LineIndex, offset: usize) -> Position {
    let offset = offset.min(source.len());
    let (line, col) = index.line_col(offset as u32);
    let line_start = offset - (col as usize - 1);
    let character: u32 = source[line_start..offset]
        .chars()
        .map(|c| c.len_utf16() as u32)
        .sum();
    Position {
        line: line - 1,
        character,
    }
}

/// Convert an LSP Position back to a byte offset in the source.
///
/// A character past the end of the line clamps to the line end.
pub fn position_to_offset(source: &str, index: &LineIndex, position: &Position) -> Option<usize> {
    let line_start = index.line_start(position.line)? as usize;
    let line_text = &source[line_start..];
    let mut utf16_offset = 0u32;
    for (byte_idx, c) in line_text.char_indices() {
        if utf16_offset >= position.character || c == '\n' {
            return Some(line_start + byte_idx);
        }
        utf16_offset += c.len_utf16() as u32;
    }
    Some(source.len())
}

pub fn span_to_range(source: &str, index: &LineIndex, span: Span) -> Range {
    Range::new(
        offset_to_position(source, index, span.start as usize),
        offset_to_position(source, index, span.end as usize),
    )
}

// ── Diagnostics ────────────────────────────────────────────────────────

/// Link errors followed by checker diagnostics, as LSP diagnostics.
pub fn diagnostics(doc: &Document) -> Vec<Diagnostic> {
    let source = doc.text();
    let index = doc.line_index();
    let mut out = Vec::new();

    for error in doc.link_errors() {
        out.push(Diagnostic {
            range: span_to_range(source, index, error.span),
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(SOURCE.to_string()),
            message: error.to_string(),
            ..Default::default()
        });
    }

    if let Some(types) = doc.types() {
        for diag in &types.diagnostics {
            let severity = match diag.severity {
                Severity::Error => DiagnosticSeverity::ERROR,
                Severity::Warning => DiagnosticSeverity::WARNING,
            };
            out.push(Diagnostic {
                range: span_to_range(source, index, diagnostic_span(diag, doc.ast())),
                severity: Some(severity),
                code: Some(NumberOrString::String(error_code(&diag.error).to_string())),
                source: Some(SOURCE.to_string()),
                message: diag.message(),
                ..Default::default()
            });
        }
    }
    out
}

// ── Inlay hints ────────────────────────────────────────────────────────

/// `: T` after the name of every variable declared without a type.
///
/// Variables whose type is not fully solved get no hint.
pub fn inlay_hints(doc: &Document) -> Vec<InlayHint> {
    let Some(types) = doc.types() else {
        return Vec::new();
    };
    let ast = doc.ast();
    ast.ids()
        .filter(|id| {
            matches!(
                ast.kind(*id),
                NodeKind::VariableDecl { type_ref: None, .. }
            )
        })
        .filter_map(|id| {
            let ty = types.type_of(id)?;
            if !ty.is_ground() && *ty != Ty::Any {
                return None;
            }
            let name = ast.property_span(id, Property::Name);
            Some(InlayHint {
                position: offset_to_position(doc.text(), doc.line_index(), name.end as usize),
                label: InlayHintLabel::String(format!(": {}", ty)),
                kind: Some(InlayHintKind::TYPE),
                text_edits: None,
                tooltip: None,
                padding_left: None,
                padding_right: None,
                data: None,
            })
        })
        .collect()
}

// ── Hover ──────────────────────────────────────────────────────────────

/// Declaration shown when hovering `offset`, with the span to highlight.
fn hovered_declaration(doc: &Document, offset: u32) -> Option<(NodeId, Span)> {
    let ast = doc.ast();
    let node = ast.node_at_offset(offset)?;
    let kind = ast.kind(node);
    match kind {
        NodeKind::ReferenceExpression { .. } | NodeKind::NamedType { .. } => {
            let mut decl = ast.target(node)?;
            // A call's receiver shows the overload the call resolved to.
            if let Some(call) = ast.parent(node) {
                if let NodeKind::CallExpression { receiver, .. } = ast.kind(call) {
                    if *receiver == node {
                        if let Some(resolved) = doc.types().and_then(|t| t.resolved_calls.get(&call)) {
                            decl = *resolved;
                        }
                    }
                }
            }
            Some((decl, ast.span(node)))
        }
        _ if kind.is_declaration() => {
            let name = ast.property_span(node, Property::Name);
            name.contains(offset).then_some((node, name))
        }
        _ => None,
    }
}

/// Type of the declaration or reference under the cursor.
pub fn hover(doc: &Document, position: &Position) -> Option<Hover> {
    let source = doc.text();
    let index = doc.line_index();
    let offset = position_to_offset(source, index, position)?;
    let (decl, span) = hovered_declaration(doc, offset as u32)?;
    let ty = doc.types()?.type_of(decl)?;
    let name = doc.ast().name(decl).unwrap_or_default();

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: format!("```miniscript\n{}: {}\n```", name, ty),
        }),
        range: Some(span_to_range(source, index, span)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniscript_ast::{AstBuilder, InfixOp};
    use tower_lsp::lsp_types::Url;

    use crate::workspace::Workspace;

    fn open(workspace: &mut Workspace, b: AstBuilder, items: Vec<NodeId>) -> &Document {
        let uri = Url::parse("file:///test.ms").unwrap();
        workspace.open(uri, 1, b.finish(items))
    }

    fn hover_text(hover: &Hover) -> &str {
        match &hover.contents {
            HoverContents::Markup(markup) => &markup.value,
            other => panic!("unexpected hover contents: {:?}", other),
        }
    }

    #[test]
    fn offset_to_position_multiline() {
        let source = "line1\nline2\nline3";
        let index = LineIndex::new(source);
        assert_eq!(offset_to_position(source, &index, 0), Position::new(0, 0));
        assert_eq!(offset_to_position(source, &index, 6), Position::new(1, 0));
        assert_eq!(offset_to_position(source, &index, 7), Position::new(1, 1));
        assert_eq!(offset_to_position(source, &index, 12), Position::new(2, 0));
        assert_eq!(offset_to_position(source, &index, 17), Position::new(2, 5));
    }

    #[test]
    fn positions_count_utf16_units() {
        let source = "var s = \"é😀\";";
        let index = LineIndex::new(source);
        // `"` after the emoji: 9 ASCII + é (1 unit) + 😀 (2 units).
        let quote = source.rfind('"').unwrap();
        assert_eq!(offset_to_position(source, &index, quote), Position::new(0, 12));
        assert_eq!(position_to_offset(source, &index, &Position::new(0, 12)), Some(quote));
    }

    #[test]
    fn position_to_offset_roundtrip() {
        let source = "hello\nworld\nfoo";
        let index = LineIndex::new(source);
        for offset in 0..source.len() {
            let pos = offset_to_position(source, &index, offset);
            assert_eq!(
                position_to_offset(source, &index, &pos),
                Some(offset),
                "roundtrip failed for offset {} (pos {:?})",
                offset,
                pos
            );
        }
        assert_eq!(position_to_offset(source, &index, &Position::new(0, 99)), Some(5));
        assert_eq!(position_to_offset(source, &index, &Position::new(7, 0)), None);
    }

    #[test]
    fn clean_document_has_no_diagnostics() {
        let mut workspace = Workspace::default();
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let x = b.var("x", None, Some(five));
        let doc = open(&mut workspace, b, vec![x]);
        assert!(diagnostics(doc).is_empty());
    }

    #[test]
    fn comparison_warning_on_operator() {
        let mut workspace = Workspace::default();
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let x = b.var("x", None, Some(five));
        let three = b.int(3);
        let t = b.boolean(true);
        let eq = b.infix(three, InfixOp::Eq, t);
        let doc = open(&mut workspace, b, vec![x, eq]);

        assert_eq!(doc.text(), "var x = 5;\n3 == true;");
        let diags = diagnostics(doc);
        assert_eq!(diags.len(), 1);
        let diag = &diags[0];
        assert_eq!(diag.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(diag.range, Range::new(Position::new(1, 2), Position::new(1, 4)));
        assert_eq!(diag.code, Some(NumberOrString::String("W0002".to_string())));
        assert_eq!(diag.source.as_deref(), Some("miniscript"));
    }

    #[test]
    fn link_errors_become_diagnostics() {
        let mut workspace = Workspace::default();
        let mut b = AstBuilder::new();
        let missing = b.reference("missing");
        let x = b.var("x", None, Some(missing));
        let doc = open(&mut workspace, b, vec![x]);

        let diags = diagnostics(doc);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "cannot find value `missing` in this scope");
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diags[0].range, Range::new(Position::new(0, 8), Position::new(0, 15)));
    }

    #[test]
    fn inlay_hint_after_untyped_variable() {
        let mut workspace = Workspace::default();
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let x = b.var("x", None, Some(five));
        let int_ty = b.named_type("Int");
        let six = b.int(6);
        let y = b.var("y", Some(int_ty), Some(six));
        let doc = open(&mut workspace, b, vec![x, y]);

        let hints = inlay_hints(doc);
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].position, Position::new(0, 5));
        assert_eq!(hints[0].label, InlayHintLabel::String(": Int".to_string()));
        assert_eq!(hints[0].kind, Some(InlayHintKind::TYPE));
    }

    #[test]
    fn no_inlay_hint_for_partly_solved_type() {
        let mut workspace = Workspace::default();
        let mut b = AstBuilder::new();
        let p = b.param("p", None, None);
        let int_ty = b.named_type("Int");
        let one = b.int(1);
        let ret = b.ret(Some(one));
        let body = b.block(vec![ret]);
        let h = b.function("h", vec![p], Some(int_ty), body);
        let h_ref = b.reference("h");
        let v = b.var("v", None, Some(h_ref));
        let doc = open(&mut workspace, b, vec![h, v]);

        let types = doc.types().unwrap();
        assert!(matches!(types.type_of(v), Some(Ty::Fun(..))));
        assert!(!types.type_of(v).unwrap().is_ground());
        assert!(inlay_hints(doc).is_empty());
    }

    #[test]
    fn hover_on_reference_shows_declaration_type() {
        let mut workspace = Workspace::default();
        let mut b = AstBuilder::new();
        let s = b.string("a");
        let x = b.var("x", None, Some(s));
        let x_ref = b.reference("x");
        let y = b.var("y", None, Some(x_ref));
        let doc = open(&mut workspace, b, vec![x, y]);

        assert_eq!(doc.text(), "var x = \"a\";\nvar y = x;");
        let hover = hover(doc, &Position::new(1, 8)).unwrap();
        assert_eq!(hover_text(&hover), "```miniscript\nx: String\n```");
        assert_eq!(hover.range, Some(Range::new(Position::new(1, 8), Position::new(1, 9))));
    }

    #[test]
    fn hover_on_declaration_name() {
        let mut workspace = Workspace::default();
        let mut b = AstBuilder::new();
        let t = b.boolean(true);
        let flag = b.var("flag", None, Some(t));
        let doc = open(&mut workspace, b, vec![flag]);

        let hover = hover(doc, &Position::new(0, 5)).unwrap();
        assert_eq!(hover_text(&hover), "```miniscript\nflag: Bool\n```");
        // On the initializer, not the name.
        assert!(super::hover(doc, &Position::new(0, 12)).is_none());
    }
}
