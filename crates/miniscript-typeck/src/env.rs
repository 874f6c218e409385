//! Per-document type environment.
//!
//! Maps declaration nodes (variables, parameters, classes and functions) to
//! their types. A checking pass owns a fresh environment; re-checking a
//! document replaces it wholesale rather than patching it.

use rustc_hash::FxHashMap;

use miniscript_ast::NodeId;

use crate::ty::Ty;

#[derive(Clone, Debug, Default)]
pub struct TypeEnv {
    bindings: FxHashMap<NodeId, Ty>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the type of a declaration and hand it back.
    ///
    /// A declaration is recorded once per pass.
    pub fn insert(&mut self, decl: NodeId, ty: Ty) -> Ty {
        let previous = self.bindings.insert(decl, ty.clone());
        debug_assert!(previous.is_none(), "declaration {decl} recorded twice");
        ty
    }

    pub fn get(&self, decl: NodeId) -> Option<&Ty> {
        self.bindings.get(&decl)
    }

    pub fn contains(&self, decl: NodeId) -> bool {
        self.bindings.contains_key(&decl)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Ty)> {
        self.bindings.iter().map(|(id, ty)| (*id, ty))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Rewrite every recorded type in place.
    pub(crate) fn map_types(&mut self, mut f: impl FnMut(Ty) -> Ty) {
        for ty in self.bindings.values_mut() {
            *ty = f(std::mem::replace(ty, Ty::Unknown));
        }
    }
}
