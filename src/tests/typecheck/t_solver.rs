use super::*;

use std::collections::HashMap;

use crate::core::decls::{DeclId, DeclKind, DeclTable, FuncDecl, GenericSig, Prelude,
    install_prelude};
use crate::core::diag::Span;
use crate::core::tree::{Fixity, NodeId};
use crate::core::types::{TupleElement, Type};

struct Fixture {
    decls: DeclTable,
    prelude: Prelude,
}

fn fixture() -> Fixture {
    let mut decls = DeclTable::new();
    let prelude = install_prelude(&mut decls);
    Fixture { decls, prelude }
}

fn add_free_func(fixture: &mut Fixture, name: &str, params: Vec<Type>, ret: Type) -> DeclId {
    fixture.decls.add_decl(
        name,
        DeclKind::Func(FuncDecl {
            owner: None,
            is_static: false,
            fixity: Fixity::None,
            generics: GenericSig::default(),
            params: params.into_iter().map(TupleElement::unnamed).collect(),
            ret,
            is_requirement: false,
            has_default_impl: false,
        }),
        Span::default(),
    )
}

/// Builds `f(<int literal>)` against the given overload candidates and
/// solves; returns the surviving solutions plus the chosen decl of the best.
fn solve_literal_call(fixture: &Fixture, candidates: &[DeclId]) -> (Vec<Solution>, Option<DeclId>) {
    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let mut system = ConstraintSystem::new(&mut ctx);

    let callee_locator = system.intern(Locator::new(NodeId::synthetic(0)));
    let callee_var = system.fresh_var(true);
    system.add_overload_set(OverloadSet {
        bound_var: callee_var,
        choices: candidates
            .iter()
            .map(|decl| OverloadChoice::Decl {
                decl: *decl,
                base: None,
            })
            .collect(),
        locator: callee_locator,
    });

    let literal_locator = system.intern(Locator::new(NodeId::synthetic(1)));
    let literal_var = system.fresh_var(false);
    system.add_constraint(Constraint::ConformsTo {
        ty: Type::var(literal_var),
        protocol: fixture.prelude.integer_literal,
        locator: literal_locator,
    });

    let call_locator = system.intern(Locator::new(NodeId::synthetic(2)));
    let result_var = system.fresh_var(false);
    system.add_constraint(Constraint::Applicable {
        fn_shape: Type::func(
            Type::tuple(vec![TupleElement::unnamed(Type::var(literal_var))]),
            Type::var(result_var),
        ),
        callee: Type::var(callee_var),
        locator: call_locator,
    });

    let outcome = solve(&mut system);
    let best = best_solution(system.ctx, &outcome.solutions).map(|index| {
        match &outcome.solutions[index].choices[&callee_locator] {
            OverloadChoice::Decl { decl, .. } => *decl,
            other => panic!("unexpected choice {other:?}"),
        }
    });
    (outcome.solutions, best)
}

#[test]
fn test_more_specialized_overload_wins() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let f_int = add_free_func(&mut fixture, "f", vec![int_ty.clone()], int_ty.clone());
    let f_any = add_free_func(&mut fixture, "f", vec![Type::any()], Type::any());

    let (solutions, best) = solve_literal_call(&fixture, &[f_int, f_any]);
    assert!(!solutions.is_empty());
    assert_eq!(best, Some(f_int));
}

#[test]
fn test_overload_resolution_is_deterministic() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let f_int = add_free_func(&mut fixture, "f", vec![int_ty.clone()], int_ty.clone());
    let f_any = add_free_func(&mut fixture, "f", vec![Type::any()], Type::any());

    let (_, first) = solve_literal_call(&fixture, &[f_int, f_any]);
    let (_, second) = solve_literal_call(&fixture, &[f_int, f_any]);
    assert_eq!(first, second);
    assert_eq!(first, Some(f_int));
}

#[test]
fn test_literal_defaulting_prefers_int_overload() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let double_ty = fixture.prelude.double_type();
    let plus_int = add_free_func(&mut fixture, "+", vec![int_ty.clone()], int_ty.clone());
    let plus_double = add_free_func(&mut fixture, "+", vec![double_ty.clone()], double_ty);

    let (solutions, best) = solve_literal_call(&fixture, &[plus_int, plus_double]);
    // Both overloads admit the literal; the defaulted binding scores better.
    assert!(solutions.len() >= 2);
    assert_eq!(best, Some(plus_int));
}

#[test]
fn test_equally_specific_overloads_are_ambiguous() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let bool_ty = fixture.prelude.bool_type();
    let f_a = add_free_func(&mut fixture, "f", vec![int_ty.clone()], int_ty.clone());
    let f_b = add_free_func(&mut fixture, "f", vec![int_ty], bool_ty);

    let (solutions, best) = solve_literal_call(&fixture, &[f_a, f_b]);
    assert_eq!(solutions.len(), 2);
    assert_eq!(best, None);
}

#[test]
fn test_failing_forks_are_pruned() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let string_ty = fixture.prelude.string_type();
    let f_int = add_free_func(&mut fixture, "f", vec![int_ty.clone()], int_ty.clone());
    // An integer literal can never become a String.
    let f_string = add_free_func(&mut fixture, "f", vec![string_ty.clone()], string_ty);

    let (solutions, best) = solve_literal_call(&fixture, &[f_int, f_string]);
    assert_eq!(solutions.len(), 1);
    assert_eq!(best, Some(f_int));
}

#[test]
fn test_no_viable_overload_reports_most_advanced_failure() {
    let mut fixture = fixture();
    let string_ty = fixture.prelude.string_type();
    let f_string = add_free_func(&mut fixture, "f", vec![string_ty.clone()], string_ty);

    let (solutions, _) = solve_literal_call(&fixture, &[f_string]);
    assert!(solutions.is_empty());

    // Re-run to inspect the failure record itself.
    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let mut system = ConstraintSystem::new(&mut ctx);
    let locator = system.intern(Locator::new(NodeId::synthetic(0)));
    let literal_var = system.fresh_var(false);
    system.add_constraint(Constraint::ConformsTo {
        ty: Type::var(literal_var),
        protocol: fixture.prelude.integer_literal,
        locator,
    });
    system.relate(
        TypeMatchKind::Conversion,
        Type::var(literal_var),
        fixture.prelude.string_type(),
        locator,
    );
    let outcome = solve(&mut system);
    assert!(outcome.solutions.is_empty());
    let failure = outcome.best_failure.expect("failure recorded");
    assert!(matches!(
        failure.kind,
        FailureKind::TypeMismatch | FailureKind::DoesNotConform(_)
    ));
}

#[test]
fn test_identity_choice_beats_decl_choice() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let f_int = add_free_func(&mut fixture, "f", vec![int_ty.clone()], int_ty.clone());

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let locator = LocatorId(0);
    let make = |choice: OverloadChoice| Solution {
        var_bindings: HashMap::new(),
        choices: HashMap::from([(locator, choice)]),
        fixed_score: 0,
    };
    let identity = make(OverloadChoice::IdentityFunction);
    let through_decl = make(OverloadChoice::Decl {
        decl: f_int,
        base: None,
    });
    assert_eq!(
        compare_solutions(&mut ctx, &identity, &through_decl),
        SolutionDiff::Better
    );
    let _ = int_ty;
}

#[test]
fn test_direct_decl_beats_dynamic_lookup() {
    let mut fixture = fixture();
    let int_ty = fixture.prelude.int_type();
    let f_int = add_free_func(&mut fixture, "f", vec![int_ty.clone()], int_ty.clone());

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let locator = LocatorId(0);
    let direct = Solution {
        var_bindings: HashMap::new(),
        choices: HashMap::from([(
            locator,
            OverloadChoice::Decl {
                decl: f_int,
                base: None,
            },
        )]),
        fixed_score: 0,
    };
    let dynamic = Solution {
        var_bindings: HashMap::new(),
        choices: HashMap::from([(
            locator,
            OverloadChoice::DeclViaDynamic {
                decl: f_int,
                base: None,
            },
        )]),
        fixed_score: 0,
    };
    assert_eq!(
        compare_solutions(&mut ctx, &direct, &dynamic),
        SolutionDiff::Better
    );
    assert_eq!(
        compare_solutions(&mut ctx, &dynamic, &direct),
        SolutionDiff::Worse
    );
}

#[test]
fn test_concrete_binding_beats_archetype() {
    let mut fixture = fixture();
    let archetype = fixture.decls.fresh_archetype("T", Vec::new(), None);

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let var = crate::core::types::TypeVarId(0);
    let concrete = Solution {
        var_bindings: HashMap::from([(var, ctx.prelude.int_type())]),
        choices: HashMap::new(),
        fixed_score: 0,
    };
    let abstract_ = Solution {
        var_bindings: HashMap::from([(var, Type::archetype(archetype, "T"))]),
        choices: HashMap::new(),
        fixed_score: 0,
    };
    assert_eq!(
        compare_solutions(&mut ctx, &concrete, &abstract_),
        SolutionDiff::Better
    );
}

#[test]
fn test_archetype_constraint() {
    let mut fixture = fixture();
    let archetype = fixture.decls.fresh_archetype("T", Vec::new(), None);

    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let mut system = ConstraintSystem::new(&mut ctx);
    let locator = system.intern(Locator::new(NodeId::synthetic(0)));
    system.add_constraint(Constraint::Archetype {
        ty: Type::archetype(archetype, "T"),
        locator,
    });
    assert!(!solve(&mut system).solutions.is_empty());

    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let mut system = ConstraintSystem::new(&mut ctx);
    let locator = system.intern(Locator::new(NodeId::synthetic(0)));
    system.add_constraint(Constraint::Archetype {
        ty: fixture.prelude.int_type(),
        locator,
    });
    let outcome = solve(&mut system);
    assert!(outcome.solutions.is_empty());
    assert!(matches!(
        outcome.best_failure.expect("failure recorded").kind,
        FailureKind::NotAnArchetype
    ));
}

#[test]
fn test_identical_solutions_compare_identical() {
    let fixture = fixture();
    let refs = HashMap::new();
    let mut ctx = CheckerContext::new(&fixture.decls, &fixture.prelude, &refs);
    let solution = Solution {
        var_bindings: HashMap::from([(
            crate::core::types::TypeVarId(0),
            ctx.prelude.int_type(),
        )]),
        choices: HashMap::new(),
        fixed_score: 0,
    };
    assert_eq!(
        compare_solutions(&mut ctx, &solution, &solution.clone()),
        SolutionDiff::Identical
    );
}
