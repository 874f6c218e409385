//! Canonical rendering of a syntax tree.
//!
//! The printer is the only place spans come from: it writes each node's
//! text and records where the node, its name and its operator landed.
//! Nested infix and conditional operands are parenthesized; the recorded
//! operand span excludes the parentheses.

use miniscript_common::Span;

use crate::node::{Ast, NodeId, NodeKind};

const INDENT: &str = "    ";

pub(crate) fn render(ast: &mut Ast) {
    let mut printer = Printer {
        out: String::new(),
        indent: 0,
    };
    let root = ast.root;
    printer.node(ast, root);
    ast.text = printer.out;
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn offset(&self) -> u32 {
        self.out.len() as u32
    }

    fn token(&mut self, text: &str) -> Span {
        let start = self.offset();
        self.out.push_str(text);
        Span::new(start, self.offset())
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn statement(&mut self, ast: &mut Ast, id: NodeId) {
        self.node(ast, id);
        let terminated = matches!(
            ast.kind(id),
            NodeKind::VariableDecl { .. }
                | NodeKind::FunctionDecl { .. }
                | NodeKind::ClassDecl { .. }
                | NodeKind::ReturnStatement { .. }
                | NodeKind::BlockStatement { .. }
        );
        if !terminated {
            self.out.push(';');
        }
    }

    fn operand(&mut self, ast: &mut Ast, id: NodeId) {
        let nested = matches!(
            ast.kind(id),
            NodeKind::InfixExpression { .. } | NodeKind::ConditionalExpression { .. }
        );
        if nested {
            self.out.push('(');
            self.node(ast, id);
            self.out.push(')');
        } else {
            self.node(ast, id);
        }
    }

    fn list(&mut self, ast: &mut Ast, ids: &[NodeId]) {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.node(ast, *id);
        }
    }

    fn node(&mut self, ast: &mut Ast, id: NodeId) {
        let start = self.offset();
        match ast.kind(id).clone() {
            NodeKind::Program { items } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push('\n');
                    }
                    self.statement(ast, *item);
                }
            }
            NodeKind::IntegerLiteral { value } => {
                self.out.push_str(&value.to_string());
            }
            NodeKind::StringLiteral { value } => {
                self.out.push('"');
                for ch in value.chars() {
                    if ch == '"' || ch == '\\' {
                        self.out.push('\\');
                    }
                    self.out.push(ch);
                }
                self.out.push('"');
            }
            NodeKind::BooleanLiteral { value } => {
                self.out.push_str(if value { "true" } else { "false" });
            }
            NodeKind::ConditionalExpression {
                condition,
                then_branch,
                else_branch,
            } => {
                self.operand(ast, condition);
                self.out.push_str(" ? ");
                self.operand(ast, then_branch);
                self.out.push_str(" : ");
                self.operand(ast, else_branch);
            }
            NodeKind::InfixExpression { op, left, right } => {
                self.operand(ast, left);
                self.out.push(' ');
                let op_span = self.token(op.symbol());
                ast.nodes[id.index()].op_span = op_span;
                self.out.push(' ');
                self.operand(ast, right);
            }
            NodeKind::PrefixExpression { op, operand } => {
                let op_span = self.token(op.symbol());
                ast.nodes[id.index()].op_span = op_span;
                self.operand(ast, operand);
            }
            NodeKind::CallExpression { receiver, args } => {
                self.operand(ast, receiver);
                self.out.push('(');
                self.list(ast, &args);
                self.out.push(')');
            }
            NodeKind::ReferenceExpression { name, .. } | NodeKind::NamedType { name, .. } => {
                let name_span = self.token(&name);
                ast.nodes[id.index()].name_span = name_span;
            }
            NodeKind::ClassDecl { name } => {
                self.out.push_str("class ");
                let name_span = self.token(&name);
                ast.nodes[id.index()].name_span = name_span;
                self.out.push_str(" {}");
            }
            NodeKind::FunctionDecl {
                name,
                params,
                return_type,
                body,
            } => {
                self.out.push_str("fun ");
                let name_span = self.token(&name);
                ast.nodes[id.index()].name_span = name_span;
                self.out.push('(');
                self.list(ast, &params);
                self.out.push(')');
                if let Some(ty) = return_type {
                    self.out.push_str(": ");
                    self.node(ast, ty);
                }
                self.out.push(' ');
                self.node(ast, body);
            }
            NodeKind::ValueParameter {
                name,
                type_ref,
                default_value,
            } => {
                let name_span = self.token(&name);
                ast.nodes[id.index()].name_span = name_span;
                if let Some(ty) = type_ref {
                    self.out.push_str(": ");
                    self.node(ast, ty);
                }
                if let Some(value) = default_value {
                    self.out.push_str(" = ");
                    self.node(ast, value);
                }
            }
            NodeKind::BlockStatement { statements } => {
                if statements.is_empty() {
                    self.out.push_str("{}");
                } else {
                    self.out.push('{');
                    self.indent += 1;
                    for statement in &statements {
                        self.newline();
                        self.statement(ast, *statement);
                    }
                    self.indent -= 1;
                    self.newline();
                    self.out.push('}');
                }
            }
            NodeKind::ReturnStatement { value } => {
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.node(ast, value);
                }
                self.out.push(';');
            }
            NodeKind::VariableDecl {
                name,
                type_ref,
                value,
            } => {
                self.out.push_str("var ");
                let name_span = self.token(&name);
                ast.nodes[id.index()].name_span = name_span;
                if let Some(ty) = type_ref {
                    self.out.push_str(": ");
                    self.node(ast, ty);
                }
                if let Some(value) = value {
                    self.out.push_str(" = ");
                    self.node(ast, value);
                }
                self.out.push(';');
            }
        }
        ast.nodes[id.index()].span = Span::new(start, self.offset());
    }
}
