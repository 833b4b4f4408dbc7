use super::*;

use std::collections::HashMap;
use std::rc::Rc;

use crate::core::decls::{
    AssocTypeDecl, DeclId, DeclKind, DeclTable, FuncDecl, GenericSig, NominalDecl, Prelude,
    ProtocolDecl, VarDecl, install_prelude,
};
use crate::core::diag::Span;
use crate::core::tree::Fixity;
use crate::core::types::{ArchetypeId, TupleElement, Type};

struct Fixture {
    decls: DeclTable,
    prelude: Prelude,
}

fn fixture() -> Fixture {
    let mut decls = DeclTable::new();
    let prelude = install_prelude(&mut decls);
    Fixture { decls, prelude }
}

fn add_protocol(fixture: &mut Fixture, name: &str) -> (DeclId, ArchetypeId) {
    let self_archetype = fixture.decls.fresh_archetype("Self", Vec::new(), None);
    let proto = fixture.decls.add_decl(
        name,
        DeclKind::Protocol(ProtocolDecl {
            inherited: Vec::new(),
            self_archetype,
            requirements: Vec::new(),
            assoc_types: Vec::new(),
            literal_default: None,
        }),
        Span::default(),
    );
    fixture.decls.archetype_mut(self_archetype).bounds.push(proto);
    (proto, self_archetype)
}

fn add_func_requirement(
    fixture: &mut Fixture,
    proto: DeclId,
    name: &str,
    params: Vec<Type>,
    ret: Type,
) -> DeclId {
    let req = fixture.decls.add_decl(
        name,
        DeclKind::Func(FuncDecl {
            owner: Some(proto),
            is_static: false,
            fixity: Fixity::None,
            generics: GenericSig::default(),
            params: params.into_iter().map(TupleElement::unnamed).collect(),
            ret,
            is_requirement: true,
            has_default_impl: false,
        }),
        Span::default(),
    );
    fixture.decls.add_member(proto, req);
    if let DeclKind::Protocol(decl) = &mut fixture.decls.decl_mut(proto).kind {
        decl.requirements.push(req);
    }
    req
}

fn add_struct_with_method(
    fixture: &mut Fixture,
    name: &str,
    conformances: Vec<DeclId>,
    method: &str,
    params: Vec<Type>,
    ret: Type,
) -> DeclId {
    let nominal = fixture.decls.add_decl(
        name,
        DeclKind::Struct(NominalDecl {
            generics: GenericSig::default(),
            conformances,
        }),
        Span::default(),
    );
    let func = fixture.decls.add_decl(
        method,
        DeclKind::Func(FuncDecl {
            owner: Some(nominal),
            is_static: false,
            fixity: Fixity::None,
            generics: GenericSig::default(),
            params: params.into_iter().map(TupleElement::unnamed).collect(),
            ret,
            is_requirement: false,
            has_default_impl: false,
        }),
        Span::default(),
    );
    fixture.decls.add_member(nominal, func);
    nominal
}

#[test]
fn test_conformance_with_matching_witness() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let (proto, _) = add_protocol(&mut fixture, "Countable");
    let req = add_func_requirement(&mut fixture, proto, "count", Vec::new(), int_ty.clone());
    let nominal =
        add_struct_with_method(&mut fixture, "Bag", vec![proto], "count", Vec::new(), int_ty);

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let ty = Type::nominal(nominal, "Bag");
    let check = ctx.conformance(&ty, proto);
    let ConformanceCheck::Conforms(conformance) = &*check else {
        panic!("expected conformance, got {check:?}");
    };
    let witness = conformance.witnesses.get(&req).expect("witness recorded");
    assert!(witness.exact);
    assert!(!witness.from_default);
}

#[test]
fn test_conformance_is_idempotent_and_cached() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let (proto, _) = add_protocol(&mut fixture, "Countable");
    add_func_requirement(&mut fixture, proto, "count", Vec::new(), int_ty.clone());
    let nominal =
        add_struct_with_method(&mut fixture, "Bag", vec![proto], "count", Vec::new(), int_ty);

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let ty = Type::nominal(nominal, "Bag");
    let first = ctx.conformance(&ty, proto);
    let second = ctx.conformance(&ty, proto);
    assert!(first.conforms());
    // The identical record, never recomputed.
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn test_undeclared_conformance_fails() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let (proto, _) = add_protocol(&mut fixture, "Countable");
    add_func_requirement(&mut fixture, proto, "count", Vec::new(), int_ty.clone());
    // The method exists, but the conformance is never declared.
    let nominal =
        add_struct_with_method(&mut fixture, "Bag", Vec::new(), "count", Vec::new(), int_ty);

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let check = ctx.conformance(&Type::nominal(nominal, "Bag"), proto);
    assert!(matches!(
        &*check,
        ConformanceCheck::Fails(failures) if failures.contains(&ConformanceFailure::NotDeclared)
    ));
}

#[test]
fn test_missing_witness_batched_with_other_failures() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let bool_ty = fixture.prelude.bool_type();
    let (proto, _) = add_protocol(&mut fixture, "Shape");
    let req_area = add_func_requirement(&mut fixture, proto, "area", Vec::new(), int_ty.clone());
    let req_fits = add_func_requirement(
        &mut fixture,
        proto,
        "fits",
        vec![int_ty.clone()],
        bool_ty,
    );
    // Neither requirement has a witness; both must be reported in one pass.
    let nominal = fixture.decls.add_decl(
        "Blob",
        DeclKind::Struct(NominalDecl {
            generics: GenericSig::default(),
            conformances: vec![proto],
        }),
        Span::default(),
    );

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let check = ctx.conformance(&Type::nominal(nominal, "Blob"), proto);
    let ConformanceCheck::Fails(failures) = &*check else {
        panic!("expected failure");
    };
    assert!(failures.contains(&ConformanceFailure::MissingWitness {
        requirement: req_area
    }));
    assert!(failures.contains(&ConformanceFailure::MissingWitness {
        requirement: req_fits
    }));
    let _ = int_ty;
}

#[test]
fn test_witness_parameter_rename_tolerated_but_downgraded() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let (proto, _) = add_protocol(&mut fixture, "Scalable");
    let req = fixture.decls.add_decl(
        "scaled",
        DeclKind::Func(FuncDecl {
            owner: Some(proto),
            is_static: false,
            fixity: Fixity::None,
            generics: GenericSig::default(),
            params: vec![TupleElement::named("by", int_ty.clone())],
            ret: int_ty.clone(),
            is_requirement: true,
            has_default_impl: false,
        }),
        Span::default(),
    );
    fixture.decls.add_member(proto, req);
    if let DeclKind::Protocol(decl) = &mut fixture.decls.decl_mut(proto).kind {
        decl.requirements.push(req);
    }

    let nominal = fixture.decls.add_decl(
        "Box",
        DeclKind::Struct(NominalDecl {
            generics: GenericSig::default(),
            conformances: vec![proto],
        }),
        Span::default(),
    );
    let witness_func = fixture.decls.add_decl(
        "scaled",
        DeclKind::Func(FuncDecl {
            owner: Some(nominal),
            is_static: false,
            fixity: Fixity::None,
            generics: GenericSig::default(),
            params: vec![TupleElement::named("factor", int_ty.clone())],
            ret: int_ty,
            is_requirement: false,
            has_default_impl: false,
        }),
        Span::default(),
    );
    fixture.decls.add_member(nominal, witness_func);

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let check = ctx.conformance(&Type::nominal(nominal, "Box"), proto);
    let ConformanceCheck::Conforms(conformance) = &*check else {
        panic!("expected conformance, got {check:?}");
    };
    let witness = conformance.witnesses.get(&req).expect("witness recorded");
    assert_eq!(witness.decl, witness_func);
    assert!(!witness.exact);
}

#[test]
fn test_result_type_must_match_exactly() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let double_ty = fixture.prelude.double_type();
    let (proto, _) = add_protocol(&mut fixture, "Countable");
    let req = add_func_requirement(&mut fixture, proto, "count", Vec::new(), int_ty);
    // Result Double does not witness result Int.
    let nominal = add_struct_with_method(
        &mut fixture,
        "Bag",
        vec![proto],
        "count",
        Vec::new(),
        double_ty,
    );

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let check = ctx.conformance(&Type::nominal(nominal, "Bag"), proto);
    assert!(matches!(
        &*check,
        ConformanceCheck::Fails(failures)
            if failures.contains(&ConformanceFailure::MissingWitness { requirement: req })
    ));
}

#[test]
fn test_self_requirement_matches_conforming_type() {
    let mut fixture = fixture();
    let (proto, self_archetype) = add_protocol(&mut fixture, "Copyable");
    let self_ty = Type::archetype(self_archetype, "Self");
    let req = add_func_requirement(&mut fixture, proto, "copy", Vec::new(), self_ty);
    let nominal = add_struct_with_method(&mut fixture, "Sheet", vec![proto], "copy", Vec::new(), {
        // Placeholder; replaced below once the decl id exists.
        Type::Error
    });
    // Patch the witness return type to the struct's own type.
    let witness = fixture.decls.members_of(nominal).to_vec();
    for member in witness {
        if let DeclKind::Func(func) = &mut fixture.decls.decl_mut(member).kind {
            func.ret = Type::nominal(nominal, "Sheet");
        }
    }

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let check = ctx.conformance(&Type::nominal(nominal, "Sheet"), proto);
    let ConformanceCheck::Conforms(conformance) = &*check else {
        panic!("expected conformance, got {check:?}");
    };
    assert!(conformance.witnesses.contains_key(&req));
}

#[test]
fn test_associated_type_deduced_through_witness() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let (proto, _) = add_protocol(&mut fixture, "Producer");
    let item_archetype = fixture.decls.fresh_archetype("Item", Vec::new(), None);
    let assoc = fixture.decls.add_decl(
        "Item",
        DeclKind::AssocType(AssocTypeDecl {
            protocol: proto,
            archetype: item_archetype,
        }),
        Span::default(),
    );
    fixture.decls.add_member(proto, assoc);
    if let DeclKind::Protocol(decl) = &mut fixture.decls.decl_mut(proto).kind {
        decl.assoc_types.push(assoc);
    }
    add_func_requirement(
        &mut fixture,
        proto,
        "produce",
        Vec::new(),
        Type::archetype(item_archetype, "Item"),
    );
    let nominal = add_struct_with_method(
        &mut fixture,
        "Counter",
        vec![proto],
        "produce",
        Vec::new(),
        int_ty.clone(),
    );

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let check = ctx.conformance(&Type::nominal(nominal, "Counter"), proto);
    let ConformanceCheck::Conforms(conformance) = &*check else {
        panic!("expected conformance, got {check:?}");
    };
    assert_eq!(conformance.assoc_bindings.get(&assoc), Some(&int_ty));
}

#[test]
fn test_protocol_default_used_when_no_concrete_witness() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let (proto, _) = add_protocol(&mut fixture, "Sized");
    let req = fixture.decls.add_decl(
        "size",
        DeclKind::Func(FuncDecl {
            owner: Some(proto),
            is_static: false,
            fixity: Fixity::None,
            generics: GenericSig::default(),
            params: Vec::new(),
            ret: int_ty,
            is_requirement: true,
            has_default_impl: true,
        }),
        Span::default(),
    );
    fixture.decls.add_member(proto, req);
    if let DeclKind::Protocol(decl) = &mut fixture.decls.decl_mut(proto).kind {
        decl.requirements.push(req);
    }
    let nominal = fixture.decls.add_decl(
        "Pixel",
        DeclKind::Struct(NominalDecl {
            generics: GenericSig::default(),
            conformances: vec![proto],
        }),
        Span::default(),
    );

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let check = ctx.conformance(&Type::nominal(nominal, "Pixel"), proto);
    let ConformanceCheck::Conforms(conformance) = &*check else {
        panic!("expected conformance, got {check:?}");
    };
    let witness = conformance.witnesses.get(&req).expect("witness recorded");
    assert!(witness.from_default);
}

#[test]
fn test_archetype_conformance_by_declared_bounds_only() {
    let mut fixture = fixture();
    let (proto, _) = add_protocol(&mut fixture, "Countable");
    let (other, _) = add_protocol(&mut fixture, "Other");
    let bounded = fixture.decls.fresh_archetype("T", vec![proto], None);

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let archetype_ty = Type::archetype(bounded, "T");
    assert!(ctx.conforms_to(&archetype_ty, proto));
    assert!(!ctx.conforms_to(&archetype_ty, other));
}

#[test]
fn test_existential_self_conformance() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();

    // `Marker` has a Self-free requirement: self-conforming.
    let (marker, _) = add_protocol(&mut fixture, "Marker");
    add_func_requirement(&mut fixture, marker, "tag", Vec::new(), int_ty.clone());

    // `Cloneable` returns Self in parameter position: not self-conforming.
    let (cloneable, clone_self) = add_protocol(&mut fixture, "Cloneable");
    add_func_requirement(
        &mut fixture,
        cloneable,
        "assign",
        vec![Type::archetype(clone_self, "Self")],
        int_ty,
    );

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let marker_existential = fixture.decls.declared_type(marker);
    assert!(ctx.conforms_to(&marker_existential, marker));
    let cloneable_existential = fixture.decls.declared_type(cloneable);
    assert!(!ctx.conforms_to(&cloneable_existential, cloneable));
}

#[test]
fn test_var_requirement_needs_settable_witness() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let (proto, _) = add_protocol(&mut fixture, "Mutable");
    let req = fixture.decls.add_decl(
        "value",
        DeclKind::Var(VarDecl {
            owner: Some(proto),
            ty: int_ty.clone(),
            settable: true,
            is_static: false,
            is_requirement: true,
        }),
        Span::default(),
    );
    fixture.decls.add_member(proto, req);
    if let DeclKind::Protocol(decl) = &mut fixture.decls.decl_mut(proto).kind {
        decl.requirements.push(req);
    }

    let nominal = fixture.decls.add_decl(
        "Cell",
        DeclKind::Struct(NominalDecl {
            generics: GenericSig::default(),
            conformances: vec![proto],
        }),
        Span::default(),
    );
    let field = fixture.decls.add_decl(
        "value",
        DeclKind::Var(VarDecl {
            owner: Some(nominal),
            ty: int_ty,
            settable: false,
            is_static: false,
            is_requirement: false,
        }),
        Span::default(),
    );
    fixture.decls.add_member(nominal, field);

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let check = ctx.conformance(&Type::nominal(nominal, "Cell"), proto);
    assert!(matches!(
        &*check,
        ConformanceCheck::Fails(failures)
            if failures.contains(&ConformanceFailure::MissingWitness { requirement: req })
    ));
}
