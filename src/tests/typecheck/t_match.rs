use super::*;

use std::collections::HashMap;

use crate::core::decls::{ClassDecl, DeclKind, DeclTable, FuncDecl, GenericSig, Prelude,
    install_prelude};
use crate::core::diag::Span;
use crate::core::tree::Fixity;
use crate::core::types::{FnFlags, LValueQualifiers, TupleElement, Type};

struct Fixture {
    decls: DeclTable,
    prelude: Prelude,
}

fn fixture() -> Fixture {
    let mut decls = DeclTable::new();
    let prelude = install_prelude(&mut decls);
    Fixture { decls, prelude }
}

/// Adds `class Derived : Base` and returns (base, derived) types.
fn with_class_pair(fixture: &mut Fixture) -> (Type, Type) {
    let base = fixture.decls.add_decl(
        "Base",
        DeclKind::Class(ClassDecl::default()),
        Span::default(),
    );
    let base_ty = Type::nominal(base, "Base");
    let derived = fixture.decls.add_decl(
        "Derived",
        DeclKind::Class(ClassDecl {
            generics: GenericSig::default(),
            superclass: Some(base_ty.clone()),
            conformances: Vec::new(),
        }),
        Span::default(),
    );
    (base_ty, Type::nominal(derived, "Derived"))
}

fn holds(fixture: &Fixture, a: &Type, b: &Type, kind: TypeMatchKind) -> bool {
    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    super::ranking::check_relation(&mut ctx, a, b, kind)
}

const ALL_KINDS: [TypeMatchKind; 5] = [
    TypeMatchKind::Bind,
    TypeMatchKind::SameType,
    TypeMatchKind::TrivialSubtype,
    TypeMatchKind::Subtype,
    TypeMatchKind::Conversion,
];

/// Once a relation holds at some strictness, every weaker kind must also
/// accept it.
fn assert_monotone(fixture: &Fixture, a: &Type, b: &Type) {
    let mut seen = false;
    for kind in ALL_KINDS {
        let result = holds(fixture, a, b, kind);
        assert!(
            !seen || result,
            "{a} -> {b} held at a stricter kind but failed at {kind:?}"
        );
        seen = seen || result;
    }
}

#[test]
fn test_identical_types_solve_at_every_kind() {
    let fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    for kind in ALL_KINDS {
        assert!(holds(&fixture, &int_ty, &int_ty, kind));
    }
}

#[test]
fn test_class_upcast_kind_threshold() {
    let mut fixture = fixture();
    let (base, derived) = with_class_pair(&mut fixture);
    assert!(!holds(&fixture, &derived, &base, TypeMatchKind::Bind));
    assert!(!holds(&fixture, &derived, &base, TypeMatchKind::SameType));
    assert!(holds(&fixture, &derived, &base, TypeMatchKind::TrivialSubtype));
    assert!(holds(&fixture, &derived, &base, TypeMatchKind::Subtype));
    assert!(holds(&fixture, &derived, &base, TypeMatchKind::Conversion));
    // Never the other way.
    assert!(!holds(&fixture, &base, &derived, TypeMatchKind::Conversion));
    assert_monotone(&fixture, &derived, &base);
}

#[test]
fn test_existential_erasure_requires_subtype() {
    let fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let any = Type::any();
    assert!(!holds(&fixture, &int_ty, &any, TypeMatchKind::SameType));
    assert!(!holds(&fixture, &int_ty, &any, TypeMatchKind::TrivialSubtype));
    assert!(holds(&fixture, &int_ty, &any, TypeMatchKind::Subtype));
    assert!(holds(&fixture, &int_ty, &any, TypeMatchKind::Conversion));
    assert!(!holds(&fixture, &any, &int_ty, TypeMatchKind::Conversion));
    assert_monotone(&fixture, &int_ty, &any);
}

#[test]
fn test_lvalue_load_requires_subtype() {
    let fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let lvalue = Type::lvalue(int_ty.clone(), LValueQualifiers::implicit_settable());
    assert!(!holds(&fixture, &lvalue, &int_ty, TypeMatchKind::TrivialSubtype));
    assert!(holds(&fixture, &lvalue, &int_ty, TypeMatchKind::Subtype));
    assert!(holds(&fixture, &lvalue, &int_ty, TypeMatchKind::Conversion));
    // Rvalues never materialize into lvalues.
    assert!(!holds(&fixture, &int_ty, &lvalue, TypeMatchKind::Conversion));
}

#[test]
fn test_scalar_tuple_promotion_is_conversion_only() {
    let fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let labeled = Type::tuple(vec![TupleElement::named("x", int_ty.clone())]);
    assert!(!holds(&fixture, &int_ty, &labeled, TypeMatchKind::Subtype));
    assert!(holds(&fixture, &int_ty, &labeled, TypeMatchKind::Conversion));

    let single = Type::tuple(vec![TupleElement::unnamed(int_ty.clone())]);
    assert!(holds(&fixture, &single, &int_ty, TypeMatchKind::Conversion));
    assert!(!holds(&fixture, &single, &int_ty, TypeMatchKind::Subtype));
}

#[test]
fn test_tuple_shuffle_applies_only_to_conversion() {
    let fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let string_ty = fixture.prelude.string_type();
    let source = Type::tuple(vec![
        TupleElement::named("a", int_ty.clone()),
        TupleElement::unnamed(string_ty.clone()),
    ]);
    let target = Type::tuple(vec![
        TupleElement::unnamed(string_ty),
        TupleElement::named("a", int_ty),
    ]);
    assert!(!holds(&fixture, &source, &target, TypeMatchKind::Subtype));
    assert!(holds(&fixture, &source, &target, TypeMatchKind::Conversion));
}

#[test]
fn test_strict_tuple_names_must_agree() {
    let fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let a = Type::tuple(vec![TupleElement::named("a", int_ty.clone())]);
    let b = Type::tuple(vec![TupleElement::named("b", int_ty)]);
    assert!(!holds(&fixture, &a, &b, TypeMatchKind::SameType));
}

#[test]
fn test_function_variance() {
    let mut fixture = fixture();
    let (base, derived) = with_class_pair(&mut fixture);
    let covariant = Type::func(
        Type::tuple(vec![TupleElement::unnamed(base.clone())]),
        derived.clone(),
    );
    let contravariant = Type::func(
        Type::tuple(vec![TupleElement::unnamed(derived)]),
        base,
    );
    assert!(holds(&fixture, &covariant, &contravariant, TypeMatchKind::Subtype));
    assert!(!holds(&fixture, &contravariant, &covariant, TypeMatchKind::Subtype));
}

#[test]
fn test_autoclosure_wrapping() {
    let fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let autoclosure = Type::func_with_flags(
        Type::unit(),
        int_ty.clone(),
        FnFlags {
            autoclosure: true,
            noreturn: false,
        },
    );
    assert!(holds(&fixture, &int_ty, &autoclosure, TypeMatchKind::Conversion));
    assert!(!holds(&fixture, &int_ty, &autoclosure, TypeMatchKind::Subtype));
    // An autoclosure function can stand in for a plain one.
    let plain = Type::func(Type::unit(), int_ty);
    assert!(holds(&fixture, &autoclosure, &plain, TypeMatchKind::Subtype));
    assert!(!holds(&fixture, &plain, &autoclosure, TypeMatchKind::SameType));
}

#[test]
fn test_noreturn_function_subtyping() {
    let fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let noreturn = Type::func_with_flags(
        Type::unit(),
        int_ty.clone(),
        FnFlags {
            autoclosure: false,
            noreturn: true,
        },
    );
    let plain = Type::func(Type::unit(), int_ty);
    assert!(holds(&fixture, &noreturn, &plain, TypeMatchKind::Subtype));
    assert!(!holds(&fixture, &plain, &noreturn, TypeMatchKind::Subtype));
}

#[test]
fn test_metatype_covariance_only_for_classes() {
    let mut fixture = fixture();
    let (base, derived) = with_class_pair(&mut fixture);
    let meta_base = Type::metatype(base);
    let meta_derived = Type::metatype(derived);
    assert!(holds(&fixture, &meta_derived, &meta_base, TypeMatchKind::Subtype));
    assert!(!holds(&fixture, &meta_base, &meta_derived, TypeMatchKind::Subtype));

    let meta_int = Type::metatype(fixture.prelude.int_type());
    let meta_double = Type::metatype(fixture.prelude.double_type());
    assert!(!holds(&fixture, &meta_int, &meta_double, TypeMatchKind::Conversion));
}

#[test]
fn test_bound_generic_arguments_are_invariant() {
    let mut fixture = fixture();
    let (base, derived) = with_class_pair(&mut fixture);
    let array_of_base = fixture.prelude.array_of(base);
    let array_of_derived = fixture.prelude.array_of(derived);
    assert!(!holds(
        &fixture,
        &array_of_derived,
        &array_of_base,
        TypeMatchKind::Conversion
    ));
}

#[test]
fn test_user_conversion_member_is_conversion_only() {
    let mut fixture = fixture();
    let celsius = fixture.decls.add_decl(
        "Celsius",
        DeclKind::Struct(Default::default()),
        Span::default(),
    );
    let double_ty = fixture.prelude.double_type();
    let conversion = fixture.decls.add_decl(
        crate::core::decls::CONVERSION_MEMBER,
        DeclKind::Func(FuncDecl {
            owner: Some(celsius),
            is_static: false,
            fixity: Fixity::None,
            generics: GenericSig::default(),
            params: Vec::new(),
            ret: double_ty.clone(),
            is_requirement: false,
            has_default_impl: false,
        }),
        Span::default(),
    );
    fixture.decls.add_member(celsius, conversion);

    let celsius_ty = Type::nominal(celsius, "Celsius");
    assert!(holds(&fixture, &celsius_ty, &double_ty, TypeMatchKind::Conversion));
    assert!(!holds(&fixture, &celsius_ty, &double_ty, TypeMatchKind::Subtype));
    // The witness output is only subtype-checked, so no chaining through a
    // second conversion member.
    assert!(!holds(
        &fixture,
        &celsius_ty,
        &fixture.prelude.string_type(),
        TypeMatchKind::Conversion
    ));
}

#[test]
fn test_error_type_absorbs_matching() {
    let fixture = fixture();
    assert!(holds(&fixture, &Type::Error, &fixture.prelude.int_type(), TypeMatchKind::Bind));
    assert!(holds(&fixture, &fixture.prelude.int_type(), &Type::Error, TypeMatchKind::SameType));
}
