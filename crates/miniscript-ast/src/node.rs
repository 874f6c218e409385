//! Node storage for MiniScript syntax trees.
//!
//! Every node lives in a flat arena owned by [`Ast`] and is addressed by a
//! [`NodeId`]. A node records its kind (with child ids), its parent, the span
//! of its rendering, and the spans of its name and operator tokens. Node
//! identity is what the type checker keys its environment on.

use std::fmt;

use miniscript_common::Span;

/// Index of a node inside its [`Ast`] arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Binary operators of the expression grammar.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Eq,
    Ne,
    Assign,
}

impl InfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Rem => "%",
            InfixOp::Lt => "<",
            InfixOp::Le => "<=",
            InfixOp::Gt => ">",
            InfixOp::Ge => ">=",
            InfixOp::And => "&&",
            InfixOp::Or => "||",
            InfixOp::Eq => "==",
            InfixOp::Ne => "!=",
            InfixOp::Assign => "=",
        }
    }
}

/// Unary prefix operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    Not,
    Neg,
}

impl PrefixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PrefixOp::Not => "!",
            PrefixOp::Neg => "-",
        }
    }
}

/// The syntactic kind of a node together with its children.
///
/// `target` fields start out as `None` and are filled in by the linker.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Program {
        items: Vec<NodeId>,
    },
    IntegerLiteral {
        value: i64,
    },
    StringLiteral {
        value: String,
    },
    BooleanLiteral {
        value: bool,
    },
    ConditionalExpression {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    InfixExpression {
        op: InfixOp,
        left: NodeId,
        right: NodeId,
    },
    PrefixExpression {
        op: PrefixOp,
        operand: NodeId,
    },
    CallExpression {
        receiver: NodeId,
        args: Vec<NodeId>,
    },
    ReferenceExpression {
        name: String,
        target: Option<NodeId>,
    },
    NamedType {
        name: String,
        target: Option<NodeId>,
    },
    ClassDecl {
        name: String,
    },
    FunctionDecl {
        name: String,
        params: Vec<NodeId>,
        return_type: Option<NodeId>,
        body: NodeId,
    },
    ValueParameter {
        name: String,
        type_ref: Option<NodeId>,
        default_value: Option<NodeId>,
    },
    BlockStatement {
        statements: Vec<NodeId>,
    },
    ReturnStatement {
        value: Option<NodeId>,
    },
    VariableDecl {
        name: String,
        type_ref: Option<NodeId>,
        value: Option<NodeId>,
    },
}

impl NodeKind {
    /// Kind name as used in diagnostics and logs.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::IntegerLiteral { .. } => "IntegerLiteral",
            NodeKind::StringLiteral { .. } => "StringLiteral",
            NodeKind::BooleanLiteral { .. } => "BooleanLiteral",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::InfixExpression { .. } => "InfixExpression",
            NodeKind::PrefixExpression { .. } => "PrefixExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::ReferenceExpression { .. } => "ReferenceExpression",
            NodeKind::NamedType { .. } => "NamedType",
            NodeKind::ClassDecl { .. } => "ClassDecl",
            NodeKind::FunctionDecl { .. } => "FunctionDecl",
            NodeKind::ValueParameter { .. } => "ValueParameter",
            NodeKind::BlockStatement { .. } => "BlockStatement",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::VariableDecl { .. } => "VariableDecl",
        }
    }

    /// Child node ids in source order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Program { items } => items.clone(),
            NodeKind::BlockStatement { statements } => statements.clone(),
            NodeKind::ConditionalExpression {
                condition,
                then_branch,
                else_branch,
            } => vec![*condition, *then_branch, *else_branch],
            NodeKind::InfixExpression { left, right, .. } => vec![*left, *right],
            NodeKind::PrefixExpression { operand, .. } => vec![*operand],
            NodeKind::CallExpression { receiver, args } => {
                let mut out = vec![*receiver];
                out.extend(args.iter().copied());
                out
            }
            NodeKind::FunctionDecl {
                params,
                return_type,
                body,
                ..
            } => {
                let mut out = params.clone();
                out.extend(*return_type);
                out.push(*body);
                out
            }
            NodeKind::ValueParameter {
                type_ref,
                default_value,
                ..
            } => type_ref.iter().chain(default_value.iter()).copied().collect(),
            NodeKind::VariableDecl {
                type_ref, value, ..
            } => type_ref.iter().chain(value.iter()).copied().collect(),
            NodeKind::ReturnStatement { value } => value.iter().copied().collect(),
            NodeKind::IntegerLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::ReferenceExpression { .. }
            | NodeKind::NamedType { .. }
            | NodeKind::ClassDecl { .. } => Vec::new(),
        }
    }

    /// Whether this node introduces a name into its enclosing scope.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::ClassDecl { .. }
                | NodeKind::FunctionDecl { .. }
                | NodeKind::ValueParameter { .. }
                | NodeKind::VariableDecl { .. }
        )
    }
}

/// A named part of a node that a diagnostic can point at.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    /// Declared or referenced name.
    Name,
    /// Operator token of an infix or prefix expression.
    Op,
    /// Initializer, default value, returned value or assigned right operand.
    Value,
    /// Type annotation.
    TypeRef,
    /// Callee of a call expression.
    Receiver,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Property::Name => "name",
            Property::Op => "operator",
            Property::Value => "value",
            Property::TypeRef => "type",
            Property::Receiver => "receiver",
        };
        write!(f, "{}", name)
    }
}

/// A single arena entry.
#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub span: Span,
    /// Span of the declared/referenced name, empty for unnamed nodes.
    pub name_span: Span,
    /// Span of the operator token, empty for non-operator nodes.
    pub op_span: Span,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            parent: None,
            span: Span::default(),
            name_span: Span::default(),
            op_span: Span::default(),
        }
    }
}

/// A complete syntax tree: node arena, root id and canonical source text.
#[derive(Clone, Debug)]
pub struct Ast {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) text: String,
}

impl Ast {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Source text the spans point into.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node. Ids are only ever handed out by the builder of this
    /// tree, so an out-of-range id is a caller bug.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// Declared or referenced name of a node, if it has one.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::ReferenceExpression { name, .. }
            | NodeKind::NamedType { name, .. }
            | NodeKind::ClassDecl { name }
            | NodeKind::FunctionDecl { name, .. }
            | NodeKind::ValueParameter { name, .. }
            | NodeKind::VariableDecl { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Declaration a reference or named type was linked to.
    pub fn target(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::ReferenceExpression { target, .. } | NodeKind::NamedType { target, .. } => {
                *target
            }
            _ => None,
        }
    }

    pub(crate) fn set_target(&mut self, id: NodeId, decl: Option<NodeId>) {
        match &mut self.nodes[id.index()].kind {
            NodeKind::ReferenceExpression { target, .. } | NodeKind::NamedType { target, .. } => {
                *target = decl;
            }
            _ => {}
        }
    }

    /// Span of a property of `id`, falling back to the whole node when the
    /// node has no such property.
    pub fn property_span(&self, id: NodeId, property: Property) -> Span {
        let node = self.node(id);
        let child = match (property, &node.kind) {
            (Property::Name, _) if !node.name_span.is_empty() => return node.name_span,
            (Property::Op, _) if !node.op_span.is_empty() => return node.op_span,
            (Property::Value, NodeKind::VariableDecl { value, .. }) => *value,
            (Property::Value, NodeKind::ValueParameter { default_value, .. }) => *default_value,
            (Property::Value, NodeKind::ReturnStatement { value }) => *value,
            (Property::Value, NodeKind::InfixExpression { right, .. }) => Some(*right),
            (Property::TypeRef, NodeKind::VariableDecl { type_ref, .. })
            | (Property::TypeRef, NodeKind::ValueParameter { type_ref, .. }) => *type_ref,
            (Property::TypeRef, NodeKind::FunctionDecl { return_type, .. }) => *return_type,
            (Property::Receiver, NodeKind::CallExpression { receiver, .. }) => Some(*receiver),
            _ => None,
        };
        child.map_or(node.span, |c| self.span(c))
    }

    /// All node ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Pre-order walk of the subtree rooted at `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children = self.children(current);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Innermost node whose span contains `offset`.
    pub fn node_at_offset(&self, offset: u32) -> Option<NodeId> {
        let mut current = self.root;
        if !self.span(current).contains(offset) {
            return None;
        }
        'descend: loop {
            for child in self.children(current) {
                if self.span(child).contains(offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    /// Nearest ancestor of `id` (including itself) matching `pred`.
    pub fn ancestor(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if pred(self.kind(node)) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }
}
