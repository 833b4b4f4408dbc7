use super::*;

use crate::core::decls::DeclKind;
use crate::core::lexer::Lexer;
use crate::core::parse::Parser;
use crate::core::tree::{ExprKind, StmtKind};

fn resolve_source(source: &str) -> Result<ResolvedModule, Vec<ResolveError>> {
    let tokens = Lexer::new(source).tokenize().expect("Failed to tokenize");
    let mut parser = Parser::new(&tokens);
    let module = parser.parse().expect("Failed to parse");
    resolve(module)
}

/// The reference recorded for the first expression statement matching the
/// given predicate on its syntax.
fn first_expr_ref(
    resolved: &ResolvedModule,
    matches_expr: impl Fn(&ExprKind) -> bool,
) -> Option<DeclRef> {
    for body in &resolved.bodies {
        for stmt in &body.block.stmts {
            if let StmtKind::Expr(expr) = &stmt.kind
                && matches_expr(&expr.kind)
            {
                return resolved.refs.get(&expr.id).cloned();
            }
        }
    }
    None
}

#[test]
fn test_resolve_local_param_reference() {
    let resolved = resolve_source("func id(x: Int) -> Int { x }").expect("Failed to resolve");
    let decl_ref = first_expr_ref(&resolved, |kind| matches!(kind, ExprKind::Name { name } if name == "x"))
        .expect("reference recorded");
    let DeclRef::Resolved(decl) = decl_ref else {
        panic!("param reference should be unique");
    };
    assert!(matches!(resolved.decls.decl(decl).kind, DeclKind::Var(_)));
}

#[test]
fn test_resolve_overloaded_function_reference() {
    let source = "\
func f(x: Int) -> Int { return x }
func f(x: String) -> String { return x }
func test() { f }
";
    let resolved = resolve_source(source).expect("Failed to resolve");
    let decl_ref = first_expr_ref(&resolved, |kind| matches!(kind, ExprKind::Name { name } if name == "f"))
        .expect("reference recorded");
    let DeclRef::Overloaded(candidates) = decl_ref else {
        panic!("expected candidate list, got {decl_ref:?}");
    };
    assert_eq!(candidates.len(), 2);
}

#[test]
fn test_resolve_operator_by_fixity() {
    let source = "\
prefix func !(x: Int) -> Int { return x }
func test(a: Int) { !a }
";
    let resolved = resolve_source(source).expect("Failed to resolve");
    // The prefix call's callee resolves only to prefix candidates. The
    // builtin prelude also declares prefix `!` on Bool, so two candidates.
    let mut found = None;
    for (node, decl_ref) in &resolved.refs {
        let _ = node;
        if let DeclRef::Overloaded(candidates) = decl_ref {
            let all_prefix = candidates.iter().all(|decl| {
                matches!(
                    &resolved.decls.decl(*decl).kind,
                    DeclKind::Func(func) if func.fixity == crate::core::tree::Fixity::Prefix
                )
            });
            if all_prefix {
                found = Some(candidates.len());
            }
        }
    }
    assert_eq!(found, Some(2));
}

#[test]
fn test_resolve_unresolved_name_is_error() {
    let errors = resolve_source("func test() { missing }").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|err| matches!(err.kind(), ResolveErrorKind::UnresolvedName(name) if name == "missing"))
    );
}

#[test]
fn test_resolve_locals_shadow_and_bind_after_init() {
    let source = "\
let x = 1
func test() {
    let x = x
    x
}
";
    let resolved = resolve_source(source).expect("Failed to resolve");
    // The trailing `x` refers to the local, not the top-level var.
    let decl_ref = first_expr_ref(&resolved, |kind| matches!(kind, ExprKind::Name { name } if name == "x"))
        .expect("reference recorded");
    let DeclRef::Resolved(local) = decl_ref else {
        panic!("expected unique local");
    };
    let DeclKind::Var(var) = &resolved.decls.decl(local).kind else {
        panic!("expected var decl");
    };
    assert!(var.owner.is_none());
}

#[test]
fn test_resolve_type_name_gives_metatype_reference() {
    let resolved = resolve_source("func test() { Int }").expect("Failed to resolve");
    let decl_ref = first_expr_ref(&resolved, |kind| matches!(kind, ExprKind::Name { name } if name == "Int"))
        .expect("reference recorded");
    let DeclRef::Resolved(decl) = decl_ref else {
        panic!("expected unique type reference");
    };
    assert!(matches!(resolved.decls.decl(decl).kind, DeclKind::Struct(_)));
}

#[test]
fn test_resolve_duplicate_type_is_error() {
    let errors = resolve_source("struct S { }\nstruct S { }").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|err| matches!(err.kind(), ResolveErrorKind::DuplicateDecl(name) if name == "S"))
    );
}

#[test]
fn test_resolve_self_in_method() {
    let source = "\
struct Point {
    var x: Int
    func getX() -> Int { return self.x }
}
";
    let resolved = resolve_source(source).expect("Failed to resolve");
    assert_eq!(resolved.self_decls.len(), 1);
}

#[test]
fn test_resolve_generic_param_in_signature() {
    let resolved =
        resolve_source("func id<T>(x: T) -> T { return x }").expect("Failed to resolve");
    let func = resolved
        .decls
        .decls()
        .find(|decl| decl.name == "id")
        .expect("func decl");
    let DeclKind::Func(func) = &func.kind else {
        panic!("expected func");
    };
    assert!(matches!(
        func.params[0].ty,
        crate::core::types::Type::Archetype { .. }
    ));
    assert_eq!(func.params[0].ty, func.ret);
}
