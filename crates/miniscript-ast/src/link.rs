//! Name resolution.
//!
//! Resolves every `ReferenceExpression` and `NamedType` to the declaration
//! it names. Scopes are the program, each function (its parameters) and
//! each block. Declarations are hoisted: a name is visible everywhere in
//! its container, including before the declaring statement. When several
//! functions share a name the first one is the link target; the type
//! checker widens that to the whole overload set.

use std::fmt;

use miniscript_common::Span;
use rustc_hash::FxHashMap;

use crate::node::{Ast, NodeId, NodeKind};

/// Type names the type checker understands without a declaration.
pub const BUILTIN_TYPE_NAMES: [&str; 4] = ["Int", "String", "Bool", "Any"];

pub fn is_builtin_type_name(name: &str) -> bool {
    BUILTIN_TYPE_NAMES.contains(&name)
}

/// A reference that did not resolve to any declaration in scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkError {
    pub node: NodeId,
    pub name: String,
    pub span: Span,
    /// Whether a type (`NamedType`) or a value was expected.
    pub is_type: bool,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = if self.is_type { "type" } else { "value" };
        write!(f, "cannot find {} `{}` in this scope", what, self.name)
    }
}

#[derive(Default)]
struct Scope {
    values: FxHashMap<String, NodeId>,
    types: FxHashMap<String, NodeId>,
}

struct Linker {
    scopes: Vec<Scope>,
    errors: Vec<LinkError>,
}

/// Link all references in `ast`, overwriting targets from any earlier run.
pub fn link(ast: &mut Ast) -> Vec<LinkError> {
    let mut linker = Linker {
        scopes: Vec::new(),
        errors: Vec::new(),
    };
    let root = ast.root();
    linker.visit(ast, root);
    linker.errors
}

impl Linker {
    fn enter(&mut self, ast: &Ast, members: &[NodeId]) {
        let mut scope = Scope::default();
        for &member in members {
            let kind = ast.kind(member);
            let Some(name) = ast.name(member) else {
                continue;
            };
            let table = match kind {
                NodeKind::ClassDecl { .. } => &mut scope.types,
                _ if kind.is_declaration() => &mut scope.values,
                _ => continue,
            };
            table.entry(name.to_string()).or_insert(member);
        }
        self.scopes.push(scope);
    }

    fn lookup_value(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.values.get(name).copied())
            .or_else(|| self.lookup_type(name))
    }

    fn lookup_type(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.types.get(name).copied())
    }

    fn unresolved(&mut self, ast: &Ast, id: NodeId, name: String, is_type: bool) {
        self.errors.push(LinkError {
            node: id,
            name,
            span: ast.span(id),
            is_type,
        });
    }

    fn visit(&mut self, ast: &mut Ast, id: NodeId) {
        match ast.kind(id).clone() {
            NodeKind::Program { items: members } | NodeKind::BlockStatement { statements: members } => {
                self.enter(ast, &members);
                for member in members {
                    self.visit(ast, member);
                }
                self.scopes.pop();
            }
            NodeKind::FunctionDecl {
                params,
                return_type,
                body,
                ..
            } => {
                if let Some(ty) = return_type {
                    self.visit(ast, ty);
                }
                self.enter(ast, &params);
                for param in params {
                    self.visit(ast, param);
                }
                self.visit(ast, body);
                self.scopes.pop();
            }
            NodeKind::ReferenceExpression { name, .. } => {
                let target = self.lookup_value(&name);
                ast.set_target(id, target);
                if target.is_none() {
                    self.unresolved(ast, id, name, false);
                }
            }
            NodeKind::NamedType { name, .. } => {
                let target = self.lookup_type(&name);
                ast.set_target(id, target);
                if target.is_none() && !is_builtin_type_name(&name) {
                    self.unresolved(ast, id, name, true);
                }
            }
            kind => {
                for child in kind.children() {
                    self.visit(ast, child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AstBuilder;

    #[test]
    fn resolves_parameters_and_hoisted_functions() {
        let mut b = AstBuilder::new();
        // g() is called before it is declared.
        let g_call = b.call_named("g", vec![]);
        let ret = b.ret(Some(g_call));
        let body = b.block(vec![ret]);
        let f = b.function("f", vec![], None, body);
        let x = b.param("x", None, None);
        let x_ref = b.reference("x");
        let g_ret = b.ret(Some(x_ref));
        let g_body = b.block(vec![g_ret]);
        let g = b.function("g", vec![x], None, g_body);
        let mut ast = b.finish(vec![f, g]);

        let errors = link(&mut ast);
        assert!(errors.is_empty(), "unexpected link errors: {:?}", errors);

        let NodeKind::CallExpression { receiver, .. } = ast.kind(g_call) else {
            panic!("expected a call");
        };
        assert_eq!(ast.target(*receiver), Some(g));
        assert_eq!(ast.target(x_ref), Some(x));
    }

    #[test]
    fn block_scope_does_not_leak() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let inner = b.var("y", None, Some(one));
        let block = b.block(vec![inner]);
        let y_ref = b.reference("y");
        let ast_items = vec![block, y_ref];
        let mut ast = b.finish(ast_items);

        let errors = link(&mut ast);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].node, y_ref);
        assert_eq!(errors[0].to_string(), "cannot find value `y` in this scope");
        assert_eq!(ast.target(y_ref), None);
    }

    #[test]
    fn named_types_resolve_to_classes_or_builtins() {
        let mut b = AstBuilder::new();
        let point = b.class_decl("Point");
        let point_ty = b.named_type("Point");
        let p = b.var("p", Some(point_ty), None);
        let int_ty = b.named_type("Int");
        let n = b.var("n", Some(int_ty), None);
        let bogus_ty = b.named_type("Nope");
        let q = b.var("q", Some(bogus_ty), None);
        let mut ast = b.finish(vec![point, p, n, q]);

        let errors = link(&mut ast);
        assert_eq!(ast.target(point_ty), Some(point));
        assert_eq!(ast.target(int_ty), None);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_type);
        assert_eq!(errors[0].name, "Nope");
    }

    #[test]
    fn overloaded_functions_link_to_first_declaration() {
        let mut b = AstBuilder::new();
        let body1 = b.block(vec![]);
        let first = b.function("h", vec![], None, body1);
        let p = b.typed_param("s", "String");
        let body2 = b.block(vec![]);
        let second = b.function("h", vec![p], None, body2);
        let call = b.call_named("h", vec![]);
        let mut ast = b.finish(vec![first, second, call]);

        assert!(link(&mut ast).is_empty());
        let NodeKind::CallExpression { receiver, .. } = ast.kind(call) else {
            panic!("expected a call");
        };
        assert_eq!(ast.target(*receiver), Some(first));
        assert_ne!(ast.target(*receiver), Some(second));
    }
}
