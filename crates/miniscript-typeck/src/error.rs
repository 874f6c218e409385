//! Type errors and the diagnostics that carry them.
//!
//! Unification failures carry a `ConstraintOrigin` recording which rule
//! required the two types to agree, so the diagnostic can point at the node
//! responsible. Every error knows its own [`Location`]: a node plus,
//! optionally, the property of that node to highlight.

use std::fmt;

use miniscript_ast::{NodeId, Property};
use serde::{Deserialize, Serialize};

use crate::builtins::LiteralKind;
use crate::ty::{Ty, TyVar};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Where a diagnostic points: a node, narrowed to one of its properties.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub node: NodeId,
    pub property: Option<Property>,
}

impl Location {
    pub fn node(node: NodeId) -> Self {
        Location {
            node,
            property: None,
        }
    }

    pub fn property(node: NodeId, property: Property) -> Self {
        Location {
            node,
            property: Some(property),
        }
    }
}

/// The origin of a type constraint: which construct decided that two types
/// must be equal.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstraintOrigin {
    /// Argument `arg` of call `call` against parameter `param_idx`.
    FnArg {
        call: NodeId,
        arg: NodeId,
        param_idx: usize,
    },
    /// Operand `index` of an operator expression against its signature.
    Operand {
        expr: NodeId,
        operand: NodeId,
        index: usize,
    },
    /// Both branches of a conditional expression.
    IfBranches {
        expr: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    /// An expression checked against a type required by its context.
    Annotation { node: NodeId },
    /// A returned value against the function's return type or an earlier return.
    Return {
        ret: NodeId,
        function: Option<NodeId>,
    },
    /// A declaration's recorded type against the type its context expects.
    LetBinding { decl: NodeId },
    /// A call's return type against the type its context expects.
    CallResult { call: NodeId },
}

impl ConstraintOrigin {
    pub fn location(&self) -> Location {
        match self {
            ConstraintOrigin::FnArg { arg, .. } => Location::node(*arg),
            ConstraintOrigin::Operand { operand, .. } => Location::node(*operand),
            ConstraintOrigin::IfBranches { else_branch, .. } => Location::node(*else_branch),
            ConstraintOrigin::Annotation { node } => Location::node(*node),
            ConstraintOrigin::Return { ret, .. } => Location::property(*ret, Property::Value),
            ConstraintOrigin::LetBinding { decl } => Location::property(*decl, Property::Name),
            ConstraintOrigin::CallResult { call } => Location::node(*call),
        }
    }
}

/// A type error found while checking a document.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeError {
    /// Two types that should be equal are not.
    Mismatch {
        expected: Ty,
        found: Ty,
        origin: ConstraintOrigin,
    },
    /// A type variable would have to contain itself.
    InfiniteType {
        var: TyVar,
        ty: Ty,
        origin: ConstraintOrigin,
    },
    /// Function called with the wrong number of arguments.
    ArityMismatch {
        expected: usize,
        found: usize,
        origin: ConstraintOrigin,
    },
    /// A literal checked against a type it can never have.
    LiteralMismatch {
        node: NodeId,
        literal: LiteralKind,
        expected: Ty,
    },
    /// The callee of a call expression is not a function.
    NotAFunction { node: NodeId, ty: Ty },
    /// No signature of an overloaded operator or function accepts the arguments.
    NoMatchingOverload {
        at: Location,
        name: String,
        args: Vec<Ty>,
    },
    /// The right-hand side of an assignment does not fit the target.
    NotAssignable {
        node: NodeId,
        value_text: String,
        target_text: String,
        from: Ty,
        to: Ty,
    },
    /// An equality comparison between operands of provably different types.
    AlwaysConstant {
        node: NodeId,
        result: bool,
        left_text: String,
        right_text: String,
        left: Ty,
        right: Ty,
    },
    /// A declaration referenced while its own initializer is being analysed.
    CircularDependency {
        name: String,
        decl: NodeId,
        reference: NodeId,
    },
}

impl TypeError {
    pub fn location(&self) -> Location {
        match self {
            TypeError::Mismatch { origin, .. }
            | TypeError::InfiniteType { origin, .. }
            | TypeError::ArityMismatch { origin, .. } => origin.location(),
            TypeError::LiteralMismatch { node, .. } | TypeError::NotAFunction { node, .. } => {
                Location::node(*node)
            }
            TypeError::NoMatchingOverload { at, .. } => *at,
            TypeError::NotAssignable { node, .. } => Location::property(*node, Property::Value),
            TypeError::AlwaysConstant { node, .. } => Location::property(*node, Property::Op),
            TypeError::CircularDependency { reference, .. } => Location::node(*reference),
        }
    }

    /// Rewrite every type carried by the error, e.g. to resolve variables.
    pub fn map_types(self, f: &mut impl FnMut(Ty) -> Ty) -> Self {
        match self {
            TypeError::Mismatch {
                expected,
                found,
                origin,
            } => TypeError::Mismatch {
                expected: f(expected),
                found: f(found),
                origin,
            },
            TypeError::InfiniteType { var, ty, origin } => TypeError::InfiniteType {
                var,
                ty: f(ty),
                origin,
            },
            TypeError::LiteralMismatch {
                node,
                literal,
                expected,
            } => TypeError::LiteralMismatch {
                node,
                literal,
                expected: f(expected),
            },
            TypeError::NotAFunction { node, ty } => TypeError::NotAFunction { node, ty: f(ty) },
            TypeError::NoMatchingOverload { at, name, args } => TypeError::NoMatchingOverload {
                at,
                name,
                args: args.into_iter().map(&mut *f).collect(),
            },
            TypeError::NotAssignable {
                node,
                value_text,
                target_text,
                from,
                to,
            } => TypeError::NotAssignable {
                node,
                value_text,
                target_text,
                from: f(from),
                to: f(to),
            },
            TypeError::AlwaysConstant {
                node,
                result,
                left_text,
                right_text,
                left,
                right,
            } => TypeError::AlwaysConstant {
                node,
                result,
                left_text,
                right_text,
                left: f(left),
                right: f(right),
            },
            other @ (TypeError::ArityMismatch { .. } | TypeError::CircularDependency { .. }) => other,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Mismatch {
                expected, found, ..
            } => write!(f, "expected `{}`, found `{}`", expected, found),
            TypeError::InfiniteType { var, ty, .. } => {
                write!(f, "infinite type: ?{} occurs in `{}`", var.0, ty)
            }
            TypeError::ArityMismatch {
                expected, found, ..
            } => write!(
                f,
                "expected {} argument{}, found {}",
                expected,
                if *expected == 1 { "" } else { "s" },
                found
            ),
            TypeError::LiteralMismatch {
                literal, expected, ..
            } => write!(
                f,
                "expected a {} type, but got: {}",
                literal.describe(),
                expected
            ),
            TypeError::NotAFunction { ty, .. } => {
                write!(f, "expected a function type, but got: {}", ty)
            }
            TypeError::NoMatchingOverload { name, args, .. } => {
                write!(f, "no overload of `{}` accepts (", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            TypeError::NotAssignable {
                value_text,
                target_text,
                from,
                to,
                ..
            } => write!(
                f,
                "`{}` of type `{}` is not assignable to `{}` of type `{}`",
                value_text, from, target_text, to
            ),
            TypeError::AlwaysConstant {
                result,
                left_text,
                right_text,
                left,
                right,
                ..
            } => write!(
                f,
                "this comparison always evaluates to `{}`: `{}` has type `{}` but `{}` has type `{}`",
                result, left_text, left, right_text, right
            ),
            TypeError::CircularDependency { name, .. } => {
                write!(f, "`{}` is used in its own initializer", name)
            }
        }
    }
}

/// A reported error together with its severity and resolved location.
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub error: TypeError,
    pub severity: Severity,
    pub location: Location,
}

impl Diagnostic {
    pub fn new(error: TypeError, severity: Severity) -> Self {
        let location = error.location();
        Diagnostic {
            error,
            severity,
            location,
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
