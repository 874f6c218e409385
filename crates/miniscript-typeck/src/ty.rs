//! Type representation for MiniScript.
//!
//! A closed set of types: inference variables, the three primitives,
//! function types, nominal class types, and the special `Any`, `Void`,
//! `Unknown` and `Error` types. Type variables are integer handles into the
//! `ena` unification table owned by [`crate::unify::InferCtx`].

use std::fmt;
use std::hash::{Hash, Hasher};

use miniscript_ast::NodeId;

/// A type variable, identified by a `u32` index into the unification table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyVar(pub u32);

/// The primitive types, compared by tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PrimTy {
    Int,
    String,
    Bool,
}

impl PrimTy {
    pub fn name(self) -> &'static str {
        match self {
            PrimTy::Int => "Int",
            PrimTy::String => "String",
            PrimTy::Bool => "Bool",
        }
    }
}

/// A nominal type introduced by a class declaration.
///
/// Identity is the declaration node; the name is carried for display only.
#[derive(Clone, Debug)]
pub struct ClassTy {
    pub decl: NodeId,
    pub name: String,
}

impl PartialEq for ClassTy {
    fn eq(&self, other: &Self) -> bool {
        self.decl == other.decl
    }
}

impl Eq for ClassTy {}

impl Hash for ClassTy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.decl.hash(state);
    }
}

/// A MiniScript type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// An inference variable, resolved through the unification table.
    Var(TyVar),
    Prim(PrimTy),
    /// A function type: `(param_types) -> return_type`.
    Fun(Vec<Ty>, Box<Ty>),
    Class(ClassTy),
    /// Top type: unifies with and is assignable from/to everything.
    Any,
    /// Type of statements and bodies that produce no value.
    Void,
    /// No type could be determined.
    Unknown,
    /// Ill-typed, optionally with the reason.
    Error(Option<String>),
}

impl Ty {
    pub fn int() -> Ty {
        Ty::Prim(PrimTy::Int)
    }

    pub fn string() -> Ty {
        Ty::Prim(PrimTy::String)
    }

    pub fn bool() -> Ty {
        Ty::Prim(PrimTy::Bool)
    }

    pub fn fun(params: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Fun(params, Box::new(ret))
    }

    pub fn class(decl: NodeId, name: impl Into<String>) -> Ty {
        Ty::Class(ClassTy {
            decl,
            name: name.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Ty {
        Ty::Error(Some(message.into()))
    }

    /// `Unknown` or `Error`: types that must not produce follow-up diagnostics.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Ty::Unknown | Ty::Error(_))
    }

    /// Whether the type mentions no type variable and no `Any`, `Unknown`
    /// or `Error` anywhere, so comparing it with another is conclusive.
    pub fn is_ground(&self) -> bool {
        match self {
            Ty::Prim(_) | Ty::Class(_) | Ty::Void => true,
            Ty::Fun(params, ret) => params.iter().all(Ty::is_ground) && ret.is_ground(),
            Ty::Var(_) | Ty::Any | Ty::Unknown | Ty::Error(_) => false,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Var(v) => write!(f, "?{}", v.0),
            Ty::Prim(p) => write!(f, "{}", p.name()),
            Ty::Fun(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Ty::Class(c) => write!(f, "{}", c.name),
            Ty::Any => write!(f, "Any"),
            Ty::Void => write!(f, "Void"),
            Ty::Unknown => write!(f, "Unknown"),
            Ty::Error(_) => write!(f, "Error"),
        }
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Ty::int().to_string(), "Int");
        assert_eq!(
            Ty::fun(vec![Ty::int(), Ty::string()], Ty::bool()).to_string(),
            "(Int, String) -> Bool"
        );
        assert_eq!(Ty::fun(vec![], Ty::Void).to_string(), "() -> Void");
        assert_eq!(Ty::class(NodeId(3), "Point").to_string(), "Point");
        assert_eq!(Ty::Var(TyVar(7)).to_string(), "?7");
        assert_eq!(Ty::error("boom").to_string(), "Error");
    }

    #[test]
    fn classes_compare_by_declaration() {
        assert_eq!(Ty::class(NodeId(1), "A"), Ty::class(NodeId(1), "Renamed"));
        assert_ne!(Ty::class(NodeId(1), "A"), Ty::class(NodeId(2), "A"));
    }

    #[test]
    fn ground_types() {
        assert!(Ty::fun(vec![Ty::int()], Ty::Void).is_ground());
        assert!(!Ty::fun(vec![Ty::Any], Ty::Void).is_ground());
        assert!(!Ty::Var(TyVar(0)).is_ground());
        assert!(Ty::Unknown.is_indeterminate());
        assert!(!Ty::Any.is_indeterminate());
    }
}
