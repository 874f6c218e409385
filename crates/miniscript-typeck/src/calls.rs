//! Operator and call typing through signature tables.
//!
//! Operators look up the built-in table of the [`TypeSystem`](crate::builtins::TypeSystem);
//! calls whose receiver names a function declaration look up the per-pass
//! table of user functions. With a single candidate the arguments are
//! related to its parameters directly and each disagreement is reported on
//! the offending argument; with several, the first candidate that accepts
//! every argument wins and no match at all is one `NoMatchingOverload`.

use miniscript_ast::{InfixOp, NodeId, NodeKind, Property};

use crate::error::{ConstraintOrigin, Location, Severity, TypeError};
use crate::infer::TypeChecker;
use crate::signatures::{Signature, Validation};
use crate::ty::Ty;

impl<'a> TypeChecker<'a> {
    // ── Operators ───────────────────────────────────────────────────────

    pub(crate) fn infer_operator(&mut self, node: NodeId, name: &str, operands: &[NodeId]) -> Ty {
        let system = self.system;
        let candidates = system.operators().candidates(name, operands.len());
        debug_assert!(
            !candidates.is_empty(),
            "no signature registered for operator `{}` with {} operand(s)",
            name,
            operands.len()
        );
        if candidates.is_empty() {
            return Ty::Unknown;
        }

        let args: Vec<Ty> = operands
            .iter()
            .map(|operand| self.infer(*operand).unwrap_or(Ty::Unknown))
            .collect();
        let origins: Vec<ConstraintOrigin> = operands
            .iter()
            .enumerate()
            .map(|(index, operand)| ConstraintOrigin::Operand {
                expr: node,
                operand: *operand,
                index,
            })
            .collect();

        let sig = if candidates.len() == 1 {
            let sig = candidates.into_iter().next();
            if let Some(sig) = &sig {
                self.relate_arguments(sig, &args, &origins);
            }
            sig
        } else {
            self.select_overload(candidates, &args, &origins)
        };

        match sig {
            Some(sig) => {
                self.validate_operator(node, &sig, operands, &args);
                sig.ret
            }
            None => {
                self.report(
                    TypeError::NoMatchingOverload {
                        at: Location::property(node, Property::Op),
                        name: name.to_string(),
                        args,
                    },
                    Severity::Error,
                );
                Ty::Error(None)
            }
        }
    }

    fn validate_operator(&mut self, node: NodeId, sig: &Signature, operands: &[NodeId], args: &[Ty]) {
        let (&[left_node, right_node], [left, right]) = (operands, args) else {
            return;
        };
        match sig.validation {
            Validation::None => {}
            Validation::SameOperandTypes => {
                let left = self.ctx.resolve(left.clone());
                let right = self.ctx.resolve(right.clone());
                if left.is_ground() && right.is_ground() && left != right {
                    let result = matches!(
                        self.ast.kind(node),
                        NodeKind::InfixExpression { op: InfixOp::Ne, .. }
                    );
                    let severity = self.system.config().comparison_severity;
                    self.report(
                        TypeError::AlwaysConstant {
                            node,
                            result,
                            left_text: self.source_text(left_node),
                            right_text: self.source_text(right_node),
                            left,
                            right,
                        },
                        severity,
                    );
                }
            }
            Validation::AssignableToLeft => {
                let origin = ConstraintOrigin::Operand {
                    expr: node,
                    operand: right_node,
                    index: 1,
                };
                if !self.ctx.is_assignable(right, left, &origin) {
                    let severity = self.system.config().assignment_severity;
                    self.report(
                        TypeError::NotAssignable {
                            node,
                            value_text: self.source_text(right_node),
                            target_text: self.source_text(left_node),
                            from: right.clone(),
                            to: left.clone(),
                        },
                        severity,
                    );
                }
            }
        }
    }

    // ── Overload resolution ─────────────────────────────────────────────

    /// Relate each argument to its parameter, reporting every mismatch.
    /// `Any` parameters accept anything and bind nothing.
    fn relate_arguments(&mut self, sig: &Signature, args: &[Ty], origins: &[ConstraintOrigin]) {
        for ((param, arg), origin) in sig.params.iter().zip(args).zip(origins) {
            if *param == Ty::Any {
                continue;
            }
            if !self.ctx.is_assignable(arg, param, origin) {
                self.report(
                    TypeError::Mismatch {
                        expected: param.clone(),
                        found: arg.clone(),
                        origin: origin.clone(),
                    },
                    Severity::Error,
                );
            }
        }
    }

    /// First candidate accepting every argument, with its bindings applied.
    fn select_overload(
        &mut self,
        candidates: Vec<Signature>,
        args: &[Ty],
        origins: &[ConstraintOrigin],
    ) -> Option<Signature> {
        let chosen = candidates.into_iter().find(|sig| {
            sig.params
                .iter()
                .zip(args)
                .zip(origins)
                .all(|((param, arg), origin)| *param == Ty::Any || self.ctx.could_assign(arg, param, origin))
        })?;
        self.relate_arguments(&chosen, args, origins);
        Some(chosen)
    }

    // ── Calls ───────────────────────────────────────────────────────────

    pub(crate) fn infer_call(&mut self, node: NodeId, receiver: NodeId, args: &[NodeId]) -> Ty {
        let ast = self.ast;
        if let Some(decl) = ast.target(receiver) {
            if matches!(ast.kind(decl), NodeKind::FunctionDecl { .. }) {
                return self.call_declared(node, decl, args);
            }
        }

        let callee = self.infer(receiver).unwrap_or(Ty::Unknown);
        let callee = self.ctx.resolve(callee);
        match callee {
            Ty::Fun(params, ret) => {
                self.apply_arguments(node, &params, args);
                *ret
            }
            Ty::Var(_) => {
                // Calling something not yet known makes it a function.
                let params: Vec<Ty> = args.iter().map(|_| self.ctx.fresh_var()).collect();
                let ret = self.ctx.fresh_var();
                let origin = ConstraintOrigin::Annotation { node: receiver };
                self.unify_or_report(callee, Ty::fun(params.clone(), ret.clone()), origin);
                self.apply_arguments(node, &params, args);
                ret
            }
            Ty::Any => {
                self.infer_arguments(args);
                Ty::Any
            }
            ty if ty.is_indeterminate() => {
                self.infer_arguments(args);
                ty
            }
            ty => {
                self.report(TypeError::NotAFunction { node: receiver, ty }, Severity::Error);
                self.infer_arguments(args);
                Ty::Error(None)
            }
        }
    }

    /// Functions named like `decl` and declared in the same program or
    /// block, in declaration order.
    fn overload_set(&self, decl: NodeId, name: &str) -> Vec<Signature> {
        let container = self.ast.parent(decl);
        self.functions
            .overloads(name)
            .iter()
            .filter(|sig| sig.decl.is_some_and(|d| self.ast.parent(d) == container))
            .cloned()
            .collect()
    }

    /// A call whose receiver is linked to a function declaration: resolve
    /// among the declarations sharing its name and scope.
    fn call_declared(&mut self, node: NodeId, decl: NodeId, args: &[NodeId]) -> Ty {
        let name = self.ast.name(decl).unwrap_or_default().to_string();
        let overloads = self.overload_set(decl, &name);
        if overloads.len() <= 1 {
            let sig = self.function_signature(decl);
            self.resolved_calls.insert(node, decl);
            self.apply_arguments(node, &sig.params, args);
            return sig.ret;
        }

        let candidates: Vec<Signature> = overloads
            .into_iter()
            .filter(|sig| sig.arity() == args.len())
            .collect();
        let arg_tys: Vec<Ty> = args
            .iter()
            .map(|arg| self.infer(*arg).unwrap_or(Ty::Unknown))
            .collect();
        let origins: Vec<ConstraintOrigin> = args
            .iter()
            .enumerate()
            .map(|(param_idx, arg)| ConstraintOrigin::FnArg {
                call: node,
                arg: *arg,
                param_idx,
            })
            .collect();

        match self.select_overload(candidates, &arg_tys, &origins) {
            Some(sig) => {
                self.resolved_calls.insert(node, sig.decl.unwrap_or(decl));
                sig.ret
            }
            None => {
                self.report(
                    TypeError::NoMatchingOverload {
                        at: Location::property(node, Property::Receiver),
                        name,
                        args: arg_tys,
                    },
                    Severity::Error,
                );
                Ty::Error(None)
            }
        }
    }

    /// Check each argument against its parameter.
    fn apply_arguments(&mut self, node: NodeId, params: &[Ty], args: &[NodeId]) {
        if params.len() != args.len() {
            self.report(
                TypeError::ArityMismatch {
                    expected: params.len(),
                    found: args.len(),
                    origin: ConstraintOrigin::CallResult { call: node },
                },
                Severity::Error,
            );
        }
        for (param_idx, arg) in args.iter().enumerate() {
            match params.get(param_idx) {
                Some(param) => {
                    let origin = ConstraintOrigin::FnArg {
                        call: node,
                        arg: *arg,
                        param_idx,
                    };
                    self.check_with(*arg, param, origin);
                }
                None => {
                    self.infer(*arg);
                }
            }
        }
    }

    fn infer_arguments(&mut self, args: &[NodeId]) {
        for arg in args {
            self.infer(*arg);
        }
    }
}
