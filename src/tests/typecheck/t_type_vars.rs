use super::*;

use crate::core::types::{TupleElement, Type};

fn dummy_nominal(raw: u32, name: &str) -> Type {
    Type::nominal(crate::core::decls::DeclId(raw), name)
}

#[test]
fn test_representative_is_idempotent() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(false);
    let b = store.fresh(false);
    let c = store.fresh(false);
    store.merge_equivalence_classes(a, b).expect("merge");
    store.merge_equivalence_classes(b, c).expect("merge");

    let root = store.representative(a);
    assert_eq!(store.representative(root), root);
    assert_eq!(store.representative(b), root);
    assert_eq!(store.representative(c), root);
}

#[test]
fn test_fixed_type_visible_across_merged_class() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(false);
    let b = store.fresh(false);
    store.merge_equivalence_classes(a, b).expect("merge");

    let int_ty = dummy_nominal(0, "Int");
    store.assign_fixed_type(a, int_ty.clone()).expect("assign");
    assert_eq!(store.fixed_type(b), Some(int_ty));
}

#[test]
fn test_merge_preserves_existing_binding() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(false);
    let b = store.fresh(false);
    let int_ty = dummy_nominal(0, "Int");
    store.assign_fixed_type(a, int_ty.clone()).expect("assign");
    store.merge_equivalence_classes(a, b).expect("merge");
    assert_eq!(store.fixed_type(b), Some(int_ty));
}

#[test]
fn test_merge_lvalue_capability_mismatch_fails() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(true);
    let b = store.fresh(false);
    assert_eq!(
        store.merge_equivalence_classes(a, b),
        Err(BindError::LValueCapability)
    );
}

#[test]
fn test_occurs_check_rejects_self_reference() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(false);
    let recursive = Type::tuple(vec![TupleElement::unnamed(Type::var(a))]);
    assert_eq!(
        store.assign_fixed_type(a, recursive),
        Err(BindError::OccursCheck)
    );
}

#[test]
fn test_occurs_check_through_merge() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(false);
    let b = store.fresh(false);
    store.merge_equivalence_classes(a, b).expect("merge");
    // Binding `a` to a type containing `b` is the same cycle.
    let recursive = Type::tuple(vec![TupleElement::unnamed(Type::var(b))]);
    assert_eq!(
        store.assign_fixed_type(a, recursive),
        Err(BindError::OccursCheck)
    );
}

#[test]
fn test_fixed_type_recursive_follows_chains() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(false);
    let b = store.fresh(false);
    let int_ty = dummy_nominal(0, "Int");
    store.assign_fixed_type(a, Type::var(b)).expect("assign");
    store.assign_fixed_type(b, int_ty.clone()).expect("assign");
    assert_eq!(store.fixed_type_recursive(&Type::var(a)), int_ty);
}

#[test]
fn test_apply_substitutes_nested_vars() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(false);
    let int_ty = dummy_nominal(0, "Int");
    store.assign_fixed_type(a, int_ty.clone()).expect("assign");
    let tuple = Type::tuple(vec![TupleElement::unnamed(Type::var(a))]);
    let applied = store.apply(&tuple);
    assert_eq!(applied, Type::tuple(vec![TupleElement::unnamed(int_ty)]));
}

#[test]
fn test_unbound_root_stays_unbound() {
    let mut store = TypeVarStore::new();
    let a = store.fresh(false);
    assert_eq!(store.fixed_type(a), None);
    let resolved = store.fixed_type_recursive(&Type::var(a));
    assert!(matches!(resolved, Type::Var(_)));
}
