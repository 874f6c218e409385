//! Bottom-up construction of syntax trees.
//!
//! Children are built first and handed to their parent's constructor, which
//! adopts them. [`AstBuilder::finish`] wraps the top-level items in a
//! `Program` node and renders the canonical text, assigning every span.

use crate::node::{Ast, InfixOp, Node, NodeId, NodeKind, PrefixOp};
use crate::printer;

#[derive(Default)]
pub struct AstBuilder {
    nodes: Vec<Node>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            let slot = &mut self.nodes[child.index()];
            debug_assert!(
                slot.parent.is_none(),
                "node {child} adopted twice (by {id})"
            );
            slot.parent = Some(id);
        }
        self.nodes.push(Node::new(kind));
        id
    }

    // ── Literals ───────────────────────────────────────────────────────

    pub fn int(&mut self, value: i64) -> NodeId {
        self.push(NodeKind::IntegerLiteral { value })
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.push(NodeKind::StringLiteral {
            value: value.into(),
        })
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.push(NodeKind::BooleanLiteral { value })
    }

    // ── Expressions ────────────────────────────────────────────────────

    pub fn conditional(&mut self, condition: NodeId, then_branch: NodeId, else_branch: NodeId) -> NodeId {
        self.push(NodeKind::ConditionalExpression {
            condition,
            then_branch,
            else_branch,
        })
    }

    pub fn infix(&mut self, left: NodeId, op: InfixOp, right: NodeId) -> NodeId {
        self.push(NodeKind::InfixExpression { op, left, right })
    }

    pub fn prefix(&mut self, op: PrefixOp, operand: NodeId) -> NodeId {
        self.push(NodeKind::PrefixExpression { op, operand })
    }

    pub fn call(&mut self, receiver: NodeId, args: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::CallExpression { receiver, args })
    }

    pub fn reference(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::ReferenceExpression {
            name: name.into(),
            target: None,
        })
    }

    /// Shorthand for a call whose receiver is a plain reference.
    pub fn call_named(&mut self, name: impl Into<String>, args: Vec<NodeId>) -> NodeId {
        let receiver = self.reference(name);
        self.call(receiver, args)
    }

    // ── Types and declarations ─────────────────────────────────────────

    pub fn named_type(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::NamedType {
            name: name.into(),
            target: None,
        })
    }

    pub fn class_decl(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeKind::ClassDecl { name: name.into() })
    }

    pub fn function(
        &mut self,
        name: impl Into<String>,
        params: Vec<NodeId>,
        return_type: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.push(NodeKind::FunctionDecl {
            name: name.into(),
            params,
            return_type,
            body,
        })
    }

    pub fn param(
        &mut self,
        name: impl Into<String>,
        type_ref: Option<NodeId>,
        default_value: Option<NodeId>,
    ) -> NodeId {
        self.push(NodeKind::ValueParameter {
            name: name.into(),
            type_ref,
            default_value,
        })
    }

    /// Parameter annotated with a named type.
    pub fn typed_param(&mut self, name: impl Into<String>, ty: &str) -> NodeId {
        let type_ref = self.named_type(ty);
        self.param(name, Some(type_ref), None)
    }

    pub fn var(&mut self, name: impl Into<String>, type_ref: Option<NodeId>, value: Option<NodeId>) -> NodeId {
        self.push(NodeKind::VariableDecl {
            name: name.into(),
            type_ref,
            value,
        })
    }

    // ── Statements ─────────────────────────────────────────────────────

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::BlockStatement { statements })
    }

    pub fn ret(&mut self, value: Option<NodeId>) -> NodeId {
        self.push(NodeKind::ReturnStatement { value })
    }

    /// Wrap `items` in a `Program` root and render the tree.
    pub fn finish(mut self, items: Vec<NodeId>) -> Ast {
        let root = self.push(NodeKind::Program { items });
        let mut ast = Ast {
            nodes: self.nodes,
            root,
            text: String::new(),
        };
        printer::render(&mut ast);
        ast
    }
}
