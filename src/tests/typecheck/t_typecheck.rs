use super::*;

use indoc::indoc;

use crate::core::tree::{PatternKind, StmtKind};
use crate::core::types::Type;
use crate::driver::{check_source, check_source_partial};

/// The solved type of the local binding named `name`, anywhere in the
/// module's bodies.
fn local_type(source: &str, name: &str) -> Type {
    let (resolved, output, _) = check_source_partial(source).expect("Failed to check");
    assert!(
        output.errors.is_empty(),
        "unexpected errors: {:?}",
        output.errors
    );
    for body in &resolved.bodies {
        for stmt in &body.block.stmts {
            if let StmtKind::Var(var) = &stmt.kind
                && let PatternKind::Name(pattern_name) = &var.pattern.kind
                && pattern_name == name
            {
                return output
                    .types
                    .get(var.pattern.id)
                    .cloned()
                    .expect("binding typed");
            }
        }
    }
    panic!("no local named {name}");
}

fn check_errors(source: &str) -> Vec<TypeCheckError> {
    let (_, output, _) = check_source_partial(source).expect("Failed to check");
    output.errors
}

#[test]
fn test_integer_addition_picks_int_overload() {
    // `1 + 2` with (Int, Int) -> Int and (Double, Double) -> Double visible:
    // integer literals default to Int.
    let ty = local_type("func test() { let r = 1 + 2 }", "r");
    assert_eq!(ty.to_string(), "Int");
}

#[test]
fn test_array_literal_adopts_contextual_element_type() {
    let ty = local_type(
        "func test() { let xs: Array<Double> = [1, 2, 3] }",
        "xs",
    );
    assert_eq!(ty.to_string(), "Array<Double>");
}

#[test]
fn test_array_literal_defaults_to_int_elements() {
    let ty = local_type("func test() { let xs = [1, 2, 3] }", "xs");
    assert_eq!(ty.to_string(), "Array<Int>");
}

#[test]
fn test_generic_identity_instantiates_to_int() {
    let source = indoc! {"
        func identity<T>(x: T) -> T { return x }
        func test() { let r = identity(1) }
    "};
    let ty = local_type(source, "r");
    assert_eq!(ty.to_string(), "Int");
}

#[test]
fn test_missing_member_reports_single_failure() {
    let source = indoc! {"
        struct SomeStruct { var a: Int }
        func test(x: SomeStruct) { x.missingMember }
    "};
    let errors = check_errors(source);
    assert_eq!(errors.len(), 1);
    let TEK::DoesNotHaveMember(base, member) = errors[0].kind() else {
        panic!("expected missing-member error, got {:?}", errors[0].kind());
    };
    assert_eq!(base.to_string(), "SomeStruct");
    assert_eq!(member, "missingMember");
}

#[test]
fn test_float_literal_defaults_to_double() {
    let ty = local_type("func test() { let x = 1.5 }", "x");
    assert_eq!(ty.to_string(), "Double");
}

#[test]
fn test_integer_literal_adopts_double_context() {
    let ty = local_type("func test() { let x: Double = 1 }", "x");
    assert_eq!(ty.to_string(), "Double");
}

#[test]
fn test_dictionary_literal_infers_key_and_value() {
    let ty = local_type("func test() { let m = [1: \"a\", 2: \"b\"] }", "m");
    assert_eq!(ty.to_string(), "Dictionary<Int, String>");
}

#[test]
fn test_if_expression_joins_branches() {
    let ty = local_type(
        "func test(c: Bool) { let r = if c { 1 } else { 2 } }",
        "r",
    );
    assert_eq!(ty.to_string(), "Int");
}

#[test]
fn test_member_access_and_method_call() {
    let source = indoc! {"
        struct Point {
            var x: Int
            var y: Int
            func manhattan() -> Int { return x + y }
        }
        func test(p: Point) {
            let a = p.x
            let b = p.manhattan()
        }
    "};
    assert_eq!(local_type(source, "a").to_string(), "Int");
    assert_eq!(local_type(source, "b").to_string(), "Int");
}

#[test]
fn test_memberwise_constructor() {
    let source = indoc! {"
        struct Point { var x: Int var y: Int }
        func test() { let p = Point(x: 1, y: 2) }
    "};
    assert_eq!(local_type(source, "p").to_string(), "Point");
}

#[test]
fn test_argument_labels_shuffle_to_parameters() {
    let source = indoc! {"
        func describe(count: Int, label: String) -> String { return label }
        func test() { let s = describe(label: \"x\", count: 3) }
    "};
    assert_eq!(local_type(source, "s").to_string(), "String");
}

#[test]
fn test_tuple_index_projection() {
    let source = indoc! {"
        func test() {
            let pair = (1, \"one\")
            let first = pair.0
            let second = pair.1
        }
    "};
    assert_eq!(local_type(source, "first").to_string(), "Int");
    assert_eq!(local_type(source, "second").to_string(), "String");
}

#[test]
fn test_closure_parameter_inference_through_call() {
    let source = indoc! {"
        func apply(f: (Int) -> Int, x: Int) -> Int { return f(x) }
        func test() { let r = apply(f: { v in v + 1 }, x: 2) }
    "};
    assert_eq!(local_type(source, "r").to_string(), "Int");
}

#[test]
fn test_address_of_settable_local() {
    let source = indoc! {"
        func test() {
            var x = 1
            let p = &x
        }
    "};
    assert_eq!(local_type(source, "p").to_string(), "Int");
}

#[test]
fn test_address_of_immutable_fails() {
    let errors = check_errors("func test(x: Int) { let p = &x }");
    assert!(!errors.is_empty());
}

#[test]
fn test_equally_specific_overloads_are_ambiguous() {
    let source = indoc! {"
        func pick(x: Int) -> Int { return x }
        func pick(x: Int) -> Bool { return true }
        func test() { let r = pick(1) }
    "};
    let errors = check_errors(source);
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].kind(), TEK::Ambiguous(_)));
}

#[test]
fn test_class_upcast_in_argument_position() {
    let source = indoc! {"
        class Animal { }
        class Dog : Animal { }
        func adopt(a: Animal) -> Animal { return a }
        func test(d: Dog) { let r = adopt(d) }
    "};
    assert_eq!(local_type(source, "r").to_string(), "Animal");
}

#[test]
fn test_existential_argument_accepts_conforming_value() {
    let source = indoc! {"
        protocol Tagged { func tag() -> Int }
        struct Card : Tagged { func tag() -> Int { return 1 } }
        func read(t: Tagged) -> Int { return t.tag() }
        func test(c: Card) { let r = read(c) }
    "};
    assert_eq!(local_type(source, "r").to_string(), "Int");
}

#[test]
fn test_missing_conformance_is_rejected() {
    let source = indoc! {"
        protocol Tagged { func tag() -> Int }
        struct Card { }
        func read(t: Tagged) -> Int { return t.tag() }
        func test(c: Card) { let r = read(c) }
    "};
    let errors = check_errors(source);
    assert!(!errors.is_empty());
}

#[test]
fn test_conformance_witness_missing_is_batched() {
    let source = indoc! {"
        protocol Shape {
            func area() -> Int
            func perimeter() -> Int
        }
        struct Blob : Shape { }
    "};
    let errors = check_errors(source);
    let missing: Vec<_> = errors
        .iter()
        .filter(|err| matches!(err.kind(), TEK::MissingWitness(_, _)))
        .collect();
    assert_eq!(missing.len(), 2);
}

#[test]
fn test_return_type_mismatch_reported() {
    let errors = check_errors("func f() -> Int { return \"nope\" }");
    assert!(!errors.is_empty());
}

#[test]
fn test_generic_bound_enforced() {
    let source = indoc! {"
        protocol Tagged { func tag() -> Int }
        func label<T: Tagged>(x: T) -> Int { return x.tag() }
        func test() { let r = label(1) }
    "};
    let errors = check_errors(source);
    assert!(!errors.is_empty());
}

#[test]
fn test_generic_bound_satisfied() {
    let source = indoc! {"
        protocol Tagged { func tag() -> Int }
        struct Card : Tagged { func tag() -> Int { return 7 } }
        func label<T: Tagged>(x: T) -> Int { return x.tag() }
        func test(c: Card) { let r = label(c) }
    "};
    assert_eq!(local_type(source, "r").to_string(), "Int");
}

#[test]
fn test_user_conversion_member_applies() {
    let source = indoc! {"
        struct Celsius {
            var value: Double
            func __conversion() -> Double { return value }
        }
        func test(c: Celsius) { let d: Double = c }
    "};
    assert_eq!(local_type(source, "d").to_string(), "Double");
}

#[test]
fn test_tuple_destructuring_binding() {
    let source = indoc! {"
        func test() {
            let (a, b) = (1, \"x\")
        }
    "};
    assert_eq!(local_type(source, "a").to_string(), "Int");
    assert_eq!(local_type(source, "b").to_string(), "String");
}

#[test]
fn test_check_source_rejects_type_errors() {
    assert!(check_source("func f() -> Int { return \"nope\" }").is_err());
    assert!(check_source("func f() -> Int { return 1 }").is_ok());
}

#[test]
fn test_string_concatenation() {
    let ty = local_type("func test() { let s = \"a\" + \"b\" }", "s");
    assert_eq!(ty.to_string(), "String");
}

#[test]
fn test_comparison_yields_bool() {
    let ty = local_type("func test() { let c = 1 < 2 }", "c");
    assert_eq!(ty.to_string(), "Bool");
}
