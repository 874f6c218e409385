//! Signature table for operators and functions.
//!
//! Maps a name (operator symbol or function name) to its overload set. A
//! call site selects the signatures of matching arity and resolves among
//! them by argument types; the chosen signature may carry a validation that
//! runs after the operands have been related to its parameters.

use rustc_hash::FxHashMap;

use miniscript_ast::NodeId;

use crate::ty::Ty;

/// Extra check attached to a signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Validation {
    None,
    /// Warn when the two operands provably have different types.
    SameOperandTypes,
    /// The right operand must be assignable to the left one.
    AssignableToLeft,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    pub params: Vec<Ty>,
    pub ret: Ty,
    /// Declaring function, for user signatures.
    pub decl: Option<NodeId>,
    pub validation: Validation,
}

impl Signature {
    pub fn builtin(params: Vec<Ty>, ret: Ty) -> Self {
        Signature {
            params,
            ret,
            decl: None,
            validation: Validation::None,
        }
    }

    pub fn declared(decl: NodeId, params: Vec<Ty>, ret: Ty) -> Self {
        Signature {
            params,
            ret,
            decl: Some(decl),
            validation: Validation::None,
        }
    }

    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The signature as a function type.
    pub fn to_ty(&self) -> Ty {
        Ty::fun(self.params.clone(), self.ret.clone())
    }
}

/// Overload sets keyed by name, in registration order.
#[derive(Clone, Debug, Default)]
pub struct SignatureTable {
    entries: FxHashMap<String, Vec<Signature>>,
}

impl SignatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, signature: Signature) {
        self.entries.entry(name.into()).or_default().push(signature);
    }

    /// Every signature registered under `name`.
    pub fn overloads(&self, name: &str) -> &[Signature] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Signatures under `name` taking exactly `arity` arguments.
    pub fn candidates(&self, name: &str, arity: usize) -> Vec<Signature> {
        self.overloads(name)
            .iter()
            .filter(|sig| sig.arity() == arity)
            .cloned()
            .collect()
    }

    /// The signature registered for a declaration.
    pub fn for_decl(&self, decl: NodeId) -> Option<&Signature> {
        self.entries
            .values()
            .flatten()
            .find(|sig| sig.decl == Some(decl))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_filter_by_arity() {
        let mut table = SignatureTable::new();
        table.register("-", Signature::builtin(vec![Ty::int(), Ty::int()], Ty::int()));
        table.register("-", Signature::builtin(vec![Ty::int()], Ty::int()));

        assert_eq!(table.overloads("-").len(), 2);
        assert_eq!(table.candidates("-", 1).len(), 1);
        assert_eq!(table.candidates("-", 2)[0].arity(), 2);
        assert!(table.candidates("-", 3).is_empty());
        assert!(table.overloads("?").is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn lookup_by_declaration() {
        let mut table = SignatureTable::new();
        table.register("f", Signature::declared(NodeId(3), vec![], Ty::Void));
        table.register("f", Signature::declared(NodeId(9), vec![Ty::int()], Ty::int()));

        let sig = table.for_decl(NodeId(9)).unwrap();
        assert_eq!(sig.to_ty(), Ty::fun(vec![Ty::int()], Ty::int()));
        assert!(table.for_decl(NodeId(4)).is_none());
    }
}
