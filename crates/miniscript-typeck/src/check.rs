//! Checking: verify a node against an expected type, top-down.
//!
//! Nodes without a dedicated rule fall back to inference followed by
//! unification with the expected type.

use miniscript_ast::{NodeId, NodeKind};

use crate::builtins::LiteralKind;
use crate::error::{ConstraintOrigin, TypeError};
use crate::infer::TypeChecker;
use crate::ty::Ty;

impl<'a> TypeChecker<'a> {
    /// Check `node` against `expected`, reporting any disagreement.
    pub fn check(&mut self, node: NodeId, expected: &Ty) {
        self.check_with(node, expected, ConstraintOrigin::Annotation { node });
    }

    /// Check with an explicit origin for the fallback unification.
    pub(crate) fn check_with(&mut self, node: NodeId, expected: &Ty, origin: ConstraintOrigin) {
        let ast = self.ast;
        let kind = ast.kind(node);
        match kind {
            NodeKind::IntegerLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::BooleanLiteral { .. } => {
                if let Some(literal) = LiteralKind::of(kind) {
                    self.check_literal(node, literal, expected);
                }
            }
            NodeKind::VariableDecl { .. } => {
                let ty = self.infer(node).unwrap_or(Ty::Unknown);
                self.unify_or_report(expected.clone(), ty, ConstraintOrigin::LetBinding { decl: node });
            }
            NodeKind::ConditionalExpression {
                condition,
                then_branch,
                else_branch,
            } => {
                self.check(*condition, &Ty::bool());
                self.check(*then_branch, expected);
                self.check(*else_branch, expected);
            }
            NodeKind::FunctionDecl { body, .. } => self.check_function(node, *body),
            NodeKind::CallExpression { receiver, args } => {
                let ret = self.infer_call(node, *receiver, args);
                self.unify_or_report(expected.clone(), ret, ConstraintOrigin::CallResult { call: node });
            }
            NodeKind::BlockStatement { statements } => {
                if !self.check_statements(statements, expected) {
                    let origin = ConstraintOrigin::Return {
                        ret: node,
                        function: self.enclosing_function(node),
                    };
                    self.unify_or_report(expected.clone(), Ty::Void, origin);
                }
            }
            NodeKind::ReturnStatement { value } => self.check_return(node, *value, expected),
            _ => {
                if let Some(actual) = self.infer(node) {
                    self.unify_or_report(expected.clone(), actual, origin);
                }
            }
        }
    }

    /// Literals have a fixed type; a conflicting expectation is reported
    /// on the literal with the configured severity.
    fn check_literal(&mut self, node: NodeId, literal: LiteralKind, expected: &Ty) {
        let actual = self.system.literal_type(literal);
        let expected = self.ctx.resolve(expected.clone());
        match expected {
            Ty::Var(_) => {
                self.unify_or_report(expected, actual, ConstraintOrigin::Annotation { node });
            }
            Ty::Any => {}
            ref ty if ty.is_indeterminate() || *ty == actual => {}
            expected => {
                let severity = self.system.config().literal_mismatch_severity;
                self.report(
                    TypeError::LiteralMismatch {
                        node,
                        literal,
                        expected,
                    },
                    severity,
                );
            }
        }
    }

    fn check_function(&mut self, node: NodeId, body: NodeId) {
        if self.env.contains(node) {
            return;
        }
        let sig = self.function_signature(node);
        if self.env.contains(node) {
            return;
        }
        self.env.insert(node, sig.to_ty());
        self.check(body, &sig.ret);
    }

    /// Check the statements of a block against the expected return type.
    /// Returns whether the block definitely returns.
    fn check_statements(&mut self, statements: &[NodeId], expected: &Ty) -> bool {
        let ast = self.ast;
        let mut returned = false;
        for &statement in statements {
            match ast.kind(statement) {
                NodeKind::ReturnStatement { value } => {
                    self.check_return(statement, *value, expected);
                    returned = true;
                }
                NodeKind::BlockStatement { statements: inner } => {
                    returned |= self.check_statements(inner, expected);
                }
                _ => {
                    self.infer(statement);
                }
            }
        }
        returned
    }

    fn check_return(&mut self, node: NodeId, value: Option<NodeId>, expected: &Ty) {
        let origin = ConstraintOrigin::Return {
            ret: node,
            function: self.enclosing_function(node),
        };
        match value {
            Some(value) => self.check_with(value, expected, origin),
            None => {
                self.unify_or_report(expected.clone(), Ty::Void, origin);
            }
        }
    }
}
