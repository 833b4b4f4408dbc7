use super::*;

use crate::core::decls::DeclId;
use crate::core::types::{TupleElement, Type};

fn int() -> Type {
    Type::nominal(DeclId(0), "Int")
}

fn string() -> Type {
    Type::nominal(DeclId(1), "String")
}

fn named(name: &str, ty: Type) -> TupleElement {
    TupleElement::named(name, ty)
}

fn unnamed(ty: Type) -> TupleElement {
    TupleElement::unnamed(ty)
}

#[test]
fn test_shuffle_named_then_positional() {
    // source (a: Int, Int, c: String) -> target (Int, c: String, a: Int)
    let source = [named("a", int()), unnamed(int()), named("c", string())];
    let target = [unnamed(int()), named("c", string()), named("a", int())];
    let entries = shuffle_tuple(&source, &target).expect("shuffle");
    assert_eq!(
        entries,
        vec![
            ShuffleEntry::Source(1),
            ShuffleEntry::Source(2),
            ShuffleEntry::Source(0),
        ]
    );
}

#[test]
fn test_shuffle_too_many_arguments() {
    // source (Int, Int) -> target (x: Int): one leftover source element.
    let source = [unnamed(int()), unnamed(int())];
    let target = [named("x", int())];
    assert_eq!(
        shuffle_tuple(&source, &target),
        Err(ShuffleError::SizeMismatch)
    );
}

#[test]
fn test_shuffle_too_few_arguments() {
    let source = [unnamed(int())];
    let target = [unnamed(int()), unnamed(string())];
    assert_eq!(
        shuffle_tuple(&source, &target),
        Err(ShuffleError::SizeMismatch)
    );
}

#[test]
fn test_shuffle_name_exact_match_only() {
    // A differently-named source is not a fuzzy candidate; it is leftover.
    let source = [named("ax", int())];
    let target = [named("a", int()), named("b", string())];
    assert!(shuffle_tuple(&source, &target).is_err());
}

#[test]
fn test_shuffle_defaulted_target_consumes_nothing() {
    let source = [unnamed(int())];
    let target = [
        unnamed(int()),
        TupleElement {
            name: Some("scale".into()),
            ty: int(),
            variadic: false,
            has_default: true,
        },
    ];
    let entries = shuffle_tuple(&source, &target).expect("shuffle");
    assert_eq!(entries, vec![ShuffleEntry::Source(0), ShuffleEntry::Default]);
}

#[test]
fn test_shuffle_trailing_variadic_collects_rest() {
    let source = [unnamed(string()), unnamed(int()), unnamed(int())];
    let target = [
        unnamed(string()),
        TupleElement {
            name: None,
            ty: int(),
            variadic: true,
            has_default: false,
        },
    ];
    let entries = shuffle_tuple(&source, &target).expect("shuffle");
    assert_eq!(
        entries,
        vec![ShuffleEntry::Source(0), ShuffleEntry::Variadic(vec![1, 2])]
    );
}

#[test]
fn test_shuffle_variadic_may_be_empty() {
    let source = [unnamed(string())];
    let target = [
        unnamed(string()),
        TupleElement {
            name: None,
            ty: int(),
            variadic: true,
            has_default: false,
        },
    ];
    let entries = shuffle_tuple(&source, &target).expect("shuffle");
    assert_eq!(
        entries,
        vec![ShuffleEntry::Source(0), ShuffleEntry::Variadic(Vec::new())]
    );
}

#[test]
fn test_shuffle_leftover_named_source_is_name_mismatch() {
    let source = [named("a", int()), named("b", int())];
    let target = [named("a", int())];
    assert_eq!(
        shuffle_tuple(&source, &target),
        Err(ShuffleError::NameMismatch)
    );
}
