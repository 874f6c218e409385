//! Ariadne-based rendering of checker diagnostics.
//!
//! Each diagnostic becomes a report with an error code, a terse message, a
//! label on the offending node (or property) and, where it helps, a second
//! label pointing at the related declaration or branch. A JSON mode emits
//! the same information for machine consumers.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use serde::Serialize;

use miniscript_ast::{Ast, NodeKind, Property};
use miniscript_common::Span;

use crate::error::{ConstraintOrigin, Diagnostic, Severity, TypeError};

/// Output options for [`render_diagnostic`].
#[derive(Clone, Debug)]
pub struct DiagnosticOptions {
    pub color: bool,
    pub json: bool,
}

impl DiagnosticOptions {
    /// Plain text without ANSI escapes, for logs and snapshot tests.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    /// One JSON object per diagnostic.
    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions {
            color: true,
            json: false,
        }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

/// Stable code per error kind.
pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::Mismatch { .. } => "E0001",
        TypeError::InfiniteType { .. } => "E0002",
        TypeError::ArityMismatch { .. } => "E0003",
        TypeError::NotAFunction { .. } => "E0004",
        TypeError::NoMatchingOverload { .. } => "E0005",
        TypeError::NotAssignable { .. } => "E0006",
        TypeError::CircularDependency { .. } => "E0007",
        TypeError::LiteralMismatch { .. } => "W0001",
        TypeError::AlwaysConstant { .. } => "W0002",
    }
}

// ── Labels ─────────────────────────────────────────────────────────────

struct LabelSpec {
    span: Span,
    message: String,
    primary: bool,
}

fn primary_label(diag: &Diagnostic) -> String {
    match &diag.error {
        TypeError::Mismatch {
            expected, found, ..
        } => format!("expected `{}`, found `{}`", expected, found),
        TypeError::InfiniteType { .. } => "this would need an infinite type".to_string(),
        TypeError::ArityMismatch { expected, .. } => format!("expected {} here", expected),
        TypeError::LiteralMismatch { expected, .. } => format!("expected `{}`", expected),
        TypeError::NotAFunction { ty, .. } => format!("has type `{}`", ty),
        TypeError::NoMatchingOverload { .. } => "no overload applies".to_string(),
        TypeError::NotAssignable { from, .. } => format!("has type `{}`", from),
        TypeError::AlwaysConstant { result, .. } => format!("always `{}`", result),
        TypeError::CircularDependency { .. } => "used before its value is known".to_string(),
    }
}

fn secondary_labels(diag: &Diagnostic, ast: &Ast) -> Vec<LabelSpec> {
    let mut labels = Vec::new();
    match &diag.error {
        TypeError::Mismatch {
            expected,
            origin:
                ConstraintOrigin::IfBranches {
                    then_branch, ..
                },
            ..
        } => labels.push(LabelSpec {
            span: ast.span(*then_branch),
            message: format!("then branch has type `{}`", expected),
            primary: false,
        }),
        TypeError::Mismatch {
            origin:
                ConstraintOrigin::Return {
                    function: Some(function),
                    ..
                },
            ..
        } => {
            if let NodeKind::FunctionDecl {
                return_type: Some(ty),
                ..
            } = ast.kind(*function)
            {
                labels.push(LabelSpec {
                    span: ast.span(*ty),
                    message: "return type declared here".to_string(),
                    primary: false,
                });
            }
        }
        TypeError::CircularDependency { decl, .. } => labels.push(LabelSpec {
            span: ast.property_span(*decl, Property::Name),
            message: "declared here".to_string(),
            primary: false,
        }),
        _ => {}
    }
    labels
}

fn help(diag: &Diagnostic) -> Option<&'static str> {
    match &diag.error {
        TypeError::AlwaysConstant { .. } => Some("compare values of the same type"),
        TypeError::CircularDependency { .. } => {
            Some("a declaration cannot depend on its own value")
        }
        TypeError::NotAFunction { .. } => Some("only functions can be called"),
        _ => None,
    }
}

/// Span a diagnostic points at.
pub fn diagnostic_span(diag: &Diagnostic, ast: &Ast) -> Span {
    let location = diag.location;
    match location.property {
        Some(property) => ast.property_span(location.node, property),
        None => ast.span(location.node),
    }
}

// ── Main Rendering Function ────────────────────────────────────────────

#[derive(Serialize)]
struct JsonLabel {
    start: u32,
    end: u32,
    message: String,
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: &'static str,
    severity: Severity,
    message: String,
    file: &'a str,
    labels: Vec<JsonLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    help: Option<&'static str>,
}

/// Render a diagnostic against the document it was reported on.
pub fn render_diagnostic(diag: &Diagnostic, ast: &Ast, filename: &str, options: &DiagnosticOptions) -> String {
    let code = error_code(&diag.error);
    let message = diag.message();
    let mut labels = vec![LabelSpec {
        span: diagnostic_span(diag, ast),
        message: primary_label(diag),
        primary: true,
    }];
    labels.extend(secondary_labels(diag, ast));

    if options.json {
        let json = JsonDiagnostic {
            code,
            severity: diag.severity,
            message,
            file: filename,
            labels: labels
                .into_iter()
                .map(|label| JsonLabel {
                    start: label.span.start,
                    end: label.span.end,
                    message: label.message,
                })
                .collect(),
            help: help(diag),
        };
        return serde_json::to_string(&json).unwrap_or_default();
    }

    let source = ast.text();
    let source_len = source.len();
    // Clamp a range into the source; ariadne needs at least one character.
    let clamp = |r: Range<usize>| -> Range<usize> {
        let s = r.start.min(source_len);
        let e = r.end.min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let kind = match diag.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
    };
    let primary_color = match diag.severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    };
    let primary_range = clamp(labels[0].span.range());

    let mut builder = Report::build(kind, (filename, primary_range))
        .with_code(code)
        .with_message(&message)
        .with_config(Config::default().with_color(options.color));
    for label in labels {
        let color = if label.primary { primary_color } else { Color::Blue };
        builder.add_label(
            Label::new((filename, clamp(label.span.range())))
                .with_message(label.message)
                .with_color(color),
        );
    }
    if let Some(help) = help(diag) {
        builder.set_help(help);
    }

    let mut buf = Vec::new();
    builder
        .finish()
        .write((filename, Source::from(source)), &mut buf)
        .expect("failed to write diagnostic");
    String::from_utf8(buf).expect("diagnostic output should be valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniscript_ast::{AstBuilder, NodeId};

    use crate::ty::Ty;

    #[test]
    fn every_error_has_a_code() {
        let node = NodeId(0);
        let errors = [
            TypeError::NotAFunction { node, ty: Ty::int() },
            TypeError::CircularDependency {
                name: "x".into(),
                decl: node,
                reference: node,
            },
        ];
        assert_eq!(error_code(&errors[0]), "E0004");
        assert_eq!(error_code(&errors[1]), "E0007");
    }

    #[test]
    fn json_mode_carries_code_and_span() {
        let mut b = AstBuilder::new();
        let five = b.int(5);
        let call = b.call(five, vec![]);
        let ast = b.finish(vec![call]);
        let diag = Diagnostic::new(
            TypeError::NotAFunction {
                node: five,
                ty: Ty::int(),
            },
            Severity::Error,
        );

        let out = render_diagnostic(&diag, &ast, "main.ms", &DiagnosticOptions::json_mode());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["code"], "E0004");
        assert_eq!(parsed["severity"], "error");
        assert_eq!(parsed["file"], "main.ms");
        assert_eq!(parsed["labels"][0]["start"], 0);
        assert_eq!(parsed["labels"][0]["end"], 1);
        assert_eq!(parsed["help"], "only functions can be called");
    }
}
