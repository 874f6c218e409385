//! Built-in type registration.
//!
//! The [`TypeSystem`] holds everything that does not depend on a document:
//! the checker configuration, the primitive rules (which literal kinds and
//! which type spellings denote each primitive) and the operator signatures.
//! It is built once and shared by every checking pass.

use tracing::debug;

use miniscript_ast::{InfixOp, NodeKind, PrefixOp};

use crate::config::TypeckConfig;
use crate::signatures::{Signature, SignatureTable, Validation};
use crate::ty::Ty;

/// The literal node kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    String,
    Bool,
}

impl LiteralKind {
    pub fn of(kind: &NodeKind) -> Option<LiteralKind> {
        match kind {
            NodeKind::IntegerLiteral { .. } => Some(LiteralKind::Int),
            NodeKind::StringLiteral { .. } => Some(LiteralKind::String),
            NodeKind::BooleanLiteral { .. } => Some(LiteralKind::Bool),
            _ => None,
        }
    }

    /// Word used in "expected a … type" messages.
    pub fn describe(self) -> &'static str {
        match self {
            LiteralKind::Int => "int",
            LiteralKind::String => "string",
            LiteralKind::Bool => "boolean",
        }
    }
}

/// How one primitive is recognised in the tree.
#[derive(Clone, Debug)]
pub struct PrimitiveRule {
    pub ty: Ty,
    /// Spelling in type references, e.g. `Int`.
    pub spelling: &'static str,
    /// Literal kind that has this type.
    pub literal: Option<LiteralKind>,
    /// Whether `class <spelling> {}` denotes the primitive rather than a new class.
    pub class_alias: bool,
}

pub struct TypeSystem {
    config: TypeckConfig,
    primitives: Vec<PrimitiveRule>,
    operators: SignatureTable,
}

impl TypeSystem {
    pub fn new(config: TypeckConfig) -> Self {
        let mut primitives = Vec::new();
        register_primitives(&mut primitives);
        let mut operators = SignatureTable::new();
        register_operators(&mut operators);
        debug!(
            primitives = primitives.len(),
            operators = operators.len(),
            "registered built-in types"
        );
        TypeSystem {
            config,
            primitives,
            operators,
        }
    }

    pub fn config(&self) -> &TypeckConfig {
        &self.config
    }

    pub fn operators(&self) -> &SignatureTable {
        &self.operators
    }

    pub fn literal_type(&self, literal: LiteralKind) -> Ty {
        self.primitives
            .iter()
            .find(|rule| rule.literal == Some(literal))
            .map(|rule| rule.ty.clone())
            .unwrap_or(Ty::Unknown)
    }

    /// Primitive spelled `name` in a type reference, if any.
    pub fn named_primitive(&self, name: &str) -> Option<Ty> {
        self.primitives
            .iter()
            .find(|rule| rule.spelling == name)
            .map(|rule| rule.ty.clone())
    }

    /// Primitive that a class declaration named `name` stands for, if any.
    pub fn class_primitive(&self, name: &str) -> Option<Ty> {
        self.primitives
            .iter()
            .find(|rule| rule.class_alias && rule.spelling == name)
            .map(|rule| rule.ty.clone())
    }
}

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new(TypeckConfig::default())
    }
}

fn register_primitives(rules: &mut Vec<PrimitiveRule>) {
    rules.push(PrimitiveRule {
        ty: Ty::int(),
        spelling: "Int",
        literal: Some(LiteralKind::Int),
        class_alias: true,
    });
    rules.push(PrimitiveRule {
        ty: Ty::string(),
        spelling: "String",
        literal: Some(LiteralKind::String),
        class_alias: true,
    });
    rules.push(PrimitiveRule {
        ty: Ty::bool(),
        spelling: "Bool",
        literal: Some(LiteralKind::Bool),
        class_alias: true,
    });
    rules.push(PrimitiveRule {
        ty: Ty::Any,
        spelling: "Any",
        literal: None,
        class_alias: false,
    });
}

fn register_operators(table: &mut SignatureTable) {
    // ── Arithmetic ──────────────────────────────────────────────────

    for op in [InfixOp::Add, InfixOp::Sub, InfixOp::Mul, InfixOp::Div, InfixOp::Rem] {
        table.register(op.symbol(), Signature::builtin(vec![Ty::int(), Ty::int()], Ty::int()));
    }

    // String concatenation.
    table.register(
        InfixOp::Add.symbol(),
        Signature::builtin(vec![Ty::string(), Ty::string()], Ty::string()),
    );

    // ── Relational ──────────────────────────────────────────────────

    for op in [InfixOp::Lt, InfixOp::Le, InfixOp::Gt, InfixOp::Ge] {
        table.register(op.symbol(), Signature::builtin(vec![Ty::int(), Ty::int()], Ty::bool()));
    }

    // ── Logical ─────────────────────────────────────────────────────

    for op in [InfixOp::And, InfixOp::Or] {
        table.register(op.symbol(), Signature::builtin(vec![Ty::bool(), Ty::bool()], Ty::bool()));
    }

    // ── Equality ────────────────────────────────────────────────────

    // Anything can be compared; comparing different types is suspicious.
    for op in [InfixOp::Eq, InfixOp::Ne] {
        table.register(
            op.symbol(),
            Signature::builtin(vec![Ty::Any, Ty::Any], Ty::bool())
                .with_validation(Validation::SameOperandTypes),
        );
    }

    // ── Assignment ──────────────────────────────────────────────────

    table.register(
        InfixOp::Assign.symbol(),
        Signature::builtin(vec![Ty::Any, Ty::Any], Ty::Any)
            .with_validation(Validation::AssignableToLeft),
    );

    // ── Unary ───────────────────────────────────────────────────────

    table.register(PrefixOp::Not.symbol(), Signature::builtin(vec![Ty::bool()], Ty::bool()));
    table.register(PrefixOp::Neg.symbol(), Signature::builtin(vec![Ty::int()], Ty::int()));
}
