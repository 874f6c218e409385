//! Unification engine.
//!
//! Type variables live in `ena`'s union-find table. Unifying binds unbound
//! variables; a conflict between two concrete types is returned to the
//! caller and never recorded here, since only the calling rule knows how
//! (and whether) to report it. Snapshots let overload resolution try a
//! signature and roll the bindings back.

use ena::unify::InPlaceUnificationTable;
use tracing::trace;

use crate::error::{ConstraintOrigin, TypeError};
use crate::ty::{Ty, TyVar};

/// The inference context: owns the unification table of one checking pass.
pub struct InferCtx {
    table: InPlaceUnificationTable<TyVar>,
}

impl InferCtx {
    pub fn new() -> Self {
        InferCtx {
            table: InPlaceUnificationTable::new(),
        }
    }

    // ── Type Variable Creation ──────────────────────────────────────────

    pub fn fresh_var(&mut self) -> Ty {
        Ty::Var(self.table.new_key(None))
    }

    /// Number of type variables created so far.
    pub fn var_count(&self) -> usize {
        self.table.len()
    }

    // ── Resolution ──────────────────────────────────────────────────────

    /// Resolve a type by following union-find indirection, recursively.
    ///
    /// Unbound variables are normalized to the root of their class, so two
    /// unified-but-unbound variables resolve to the same `?N`.
    pub fn resolve(&mut self, ty: Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(v) {
                Some(inner) => self.resolve(inner),
                None => Ty::Var(self.table.find(v)),
            },
            Ty::Fun(params, ret) => {
                let params = params.into_iter().map(|p| self.resolve(p)).collect();
                let ret = Box::new(self.resolve(*ret));
                Ty::Fun(params, ret)
            }
            other => other,
        }
    }

    // ── Occurs Check ────────────────────────────────────────────────────

    /// Check if a type variable occurs anywhere within a type.
    pub fn occurs_in(&mut self, var: TyVar, ty: &Ty) -> bool {
        match ty {
            Ty::Var(v) => {
                if self.table.find(*v) == self.table.find(var) {
                    return true;
                }
                match self.table.probe_value(*v) {
                    Some(inner) => self.occurs_in(var, &inner),
                    None => false,
                }
            }
            Ty::Fun(params, ret) => {
                params.iter().any(|p| self.occurs_in(var, p)) || self.occurs_in(var, ret)
            }
            Ty::Prim(_) | Ty::Class(_) | Ty::Any | Ty::Void | Ty::Unknown | Ty::Error(_) => false,
        }
    }

    // ── Unification ─────────────────────────────────────────────────────

    /// Unify two types, making them equal.
    ///
    /// `Any` agrees with every type. `Unknown` and `Error` agree with every
    /// type too but never bind a variable, so an unresolved reference does
    /// not leak its indeterminacy into its neighbours.
    pub fn unify(&mut self, a: Ty, b: Ty, origin: ConstraintOrigin) -> Result<(), TypeError> {
        let a = self.resolve(a);
        let b = self.resolve(b);

        match (a, b) {
            (Ty::Var(v1), Ty::Var(v2)) if v1 == v2 => Ok(()),

            (Ty::Var(v1), Ty::Var(v2)) => {
                self.table
                    .unify_var_var(v1, v2)
                    .expect("unifying two unbound vars should not fail");
                Ok(())
            }

            (Ty::Var(_), ty) | (ty, Ty::Var(_)) if ty.is_indeterminate() => Ok(()),

            (Ty::Var(v), ty) | (ty, Ty::Var(v)) => {
                if self.occurs_in(v, &ty) {
                    Err(TypeError::InfiniteType { var: v, ty, origin })
                } else {
                    trace!(var = v.0, ty = %ty, "bind type variable");
                    self.table
                        .unify_var_value(v, Some(ty))
                        .expect("binding an unbound var after occurs check should not fail");
                    Ok(())
                }
            }

            (Ty::Any, _) | (_, Ty::Any) => Ok(()),
            (a, b) if a.is_indeterminate() || b.is_indeterminate() => Ok(()),

            (Ty::Fun(p1, r1), Ty::Fun(p2, r2)) => {
                if p1.len() != p2.len() {
                    Err(TypeError::Mismatch {
                        expected: Ty::Fun(p1, r1),
                        found: Ty::Fun(p2, r2),
                        origin,
                    })
                } else {
                    for (a, b) in p1.into_iter().zip(p2) {
                        self.unify(a, b, origin.clone())?;
                    }
                    self.unify(*r1, *r2, origin)
                }
            }

            (a, b) if a == b => Ok(()),

            (a, b) => Err(TypeError::Mismatch {
                expected: a,
                found: b,
                origin,
            }),
        }
    }

    /// Whether `a` and `b` would unify, without keeping any binding.
    pub fn can_unify(&mut self, a: &Ty, b: &Ty, origin: &ConstraintOrigin) -> bool {
        let snapshot = self.table.snapshot();
        let ok = self.unify(a.clone(), b.clone(), origin.clone()).is_ok();
        self.table.rollback_to(snapshot);
        ok
    }

    // ── Assignability ───────────────────────────────────────────────────

    /// Whether a value of type `from` may be stored where `to` is expected.
    ///
    /// `Any` is the top type; function types are contravariant in their
    /// parameters and covariant in their result. Unbound variables are
    /// bound along the way.
    pub fn is_assignable(&mut self, from: &Ty, to: &Ty, origin: &ConstraintOrigin) -> bool {
        let from = self.resolve(from.clone());
        let to = self.resolve(to.clone());
        match (&from, &to) {
            (_, Ty::Any) | (Ty::Any, _) => true,
            (f, t) if f.is_indeterminate() || t.is_indeterminate() => true,
            (Ty::Fun(fp, fr), Ty::Fun(tp, tr)) => {
                fp.len() == tp.len()
                    && tp
                        .iter()
                        .zip(fp.iter())
                        .all(|(t, f)| self.is_assignable(t, f, origin))
                    && self.is_assignable(fr, tr, origin)
            }
            _ => self.unify(from.clone(), to.clone(), origin.clone()).is_ok(),
        }
    }

    /// Assignability probe that rolls back any binding it made.
    pub fn could_assign(&mut self, from: &Ty, to: &Ty, origin: &ConstraintOrigin) -> bool {
        let snapshot = self.table.snapshot();
        let ok = self.is_assignable(from, to, origin);
        self.table.rollback_to(snapshot);
        ok
    }
}

impl Default for InferCtx {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use miniscript_ast::NodeId;

    fn origin() -> ConstraintOrigin {
        ConstraintOrigin::Annotation { node: NodeId(0) }
    }

    #[test]
    fn unify_two_fresh_vars() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();

        assert!(ctx.unify(a.clone(), b.clone(), origin()).is_ok());
        assert!(ctx.unify(a.clone(), Ty::int(), origin()).is_ok());
        assert_eq!(ctx.resolve(a), Ty::int());
        assert_eq!(ctx.resolve(b), Ty::int());
    }

    #[test]
    fn unify_var_with_itself_leaves_it_unbound() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();

        assert!(ctx.unify(a.clone(), a.clone(), origin()).is_ok());
        assert_eq!(ctx.resolve(a.clone()), a);

        // Same class via a second variable: still a no-op, still unbound.
        let b = ctx.fresh_var();
        ctx.unify(a.clone(), b.clone(), origin()).unwrap();
        assert!(ctx.unify(b.clone(), a.clone(), origin()).is_ok());
        assert!(matches!(ctx.resolve(a), Ty::Var(_)));
    }

    #[test]
    fn unify_mismatch_is_returned_not_recorded() {
        let mut ctx = InferCtx::new();
        match ctx.unify(Ty::int(), Ty::string(), origin()) {
            Err(TypeError::Mismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, Ty::int());
                assert_eq!(found, Ty::string());
            }
            other => panic!("expected Mismatch, got {:?}", other),
        }
    }

    #[test]
    fn unify_is_symmetric() {
        // Each case runs in a fresh context so bindings don't leak between
        // orders; a "bound" variable is pre-bound to Int.
        #[derive(Clone, Copy, Debug)]
        enum Case {
            Unbound,
            Bound,
            Int,
            Str,
            Bool,
            Any,
        }
        let cases = [Case::Unbound, Case::Bound, Case::Int, Case::Str, Case::Bool, Case::Any];
        let make = |ctx: &mut InferCtx, case: Case| -> Ty {
            match case {
                Case::Unbound => ctx.fresh_var(),
                Case::Bound => {
                    let v = ctx.fresh_var();
                    ctx.unify(v.clone(), Ty::int(), origin()).unwrap();
                    v
                }
                Case::Int => Ty::int(),
                Case::Str => Ty::string(),
                Case::Bool => Ty::bool(),
                Case::Any => Ty::Any,
            }
        };

        for &x in &cases {
            for &y in &cases {
                let mut ctx1 = InferCtx::new();
                let (a1, b1) = (make(&mut ctx1, x), make(&mut ctx1, y));
                let forward = ctx1.unify(a1.clone(), b1.clone(), origin()).is_ok();

                let mut ctx2 = InferCtx::new();
                let (a2, b2) = (make(&mut ctx2, x), make(&mut ctx2, y));
                let backward = ctx2.unify(b2.clone(), a2.clone(), origin()).is_ok();

                assert_eq!(forward, backward, "unify({:?}, {:?}) is not symmetric", x, y);
                if forward {
                    assert_eq!(
                        ctx1.resolve(a1).to_string() == ctx1.resolve(b1).to_string(),
                        ctx2.resolve(a2).to_string() == ctx2.resolve(b2).to_string(),
                        "bindings differ for {:?} / {:?}",
                        x,
                        y
                    );
                }
            }
        }
    }

    #[test]
    fn any_and_indeterminate_types_agree_with_everything() {
        let mut ctx = InferCtx::new();
        assert!(ctx.unify(Ty::Any, Ty::int(), origin()).is_ok());
        assert!(ctx.unify(Ty::string(), Ty::Unknown, origin()).is_ok());
        assert!(ctx.unify(Ty::error("x"), Ty::bool(), origin()).is_ok());

        // Unknown never binds a variable.
        let v = ctx.fresh_var();
        ctx.unify(v.clone(), Ty::Unknown, origin()).unwrap();
        assert!(matches!(ctx.resolve(v), Ty::Var(_)));
    }

    #[test]
    fn unify_function_types() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let f1 = Ty::fun(vec![a.clone()], Ty::bool());
        let f2 = Ty::fun(vec![Ty::int()], Ty::bool());
        assert!(ctx.unify(f1, f2, origin()).is_ok());
        assert_eq!(ctx.resolve(a), Ty::int());

        let f3 = Ty::fun(vec![Ty::int()], Ty::string());
        let f4 = Ty::fun(vec![Ty::int(), Ty::int()], Ty::string());
        assert!(ctx.unify(f3, f4, origin()).is_err());
    }

    #[test]
    fn occurs_check_infinite_type() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let fun = Ty::fun(vec![a.clone()], Ty::int());
        match ctx.unify(a, fun, origin()) {
            Err(TypeError::InfiniteType { .. }) => {}
            other => panic!("expected InfiniteType, got {:?}", other),
        }
    }

    #[test]
    fn probes_roll_back() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        assert!(ctx.can_unify(&a, &Ty::int(), &origin()));
        assert!(ctx.could_assign(&a, &Ty::string(), &origin()));
        assert!(matches!(ctx.resolve(a), Ty::Var(_)));
    }

    #[test]
    fn assignability() {
        let mut ctx = InferCtx::new();
        let o = origin();
        assert!(ctx.is_assignable(&Ty::int(), &Ty::Any, &o));
        assert!(ctx.is_assignable(&Ty::Any, &Ty::int(), &o));
        assert!(!ctx.is_assignable(&Ty::string(), &Ty::int(), &o));

        // (Any) -> Int fits where (Int) -> Any is expected, not the reverse.
        let wide = Ty::fun(vec![Ty::Any], Ty::int());
        let narrow = Ty::fun(vec![Ty::int()], Ty::Any);
        assert!(ctx.is_assignable(&wide, &narrow, &o));
        let strict = Ty::fun(vec![Ty::int()], Ty::int());
        let other = Ty::fun(vec![Ty::string()], Ty::int());
        assert!(!ctx.is_assignable(&strict, &other, &o));
    }
}
