//! Solution comparison and selection.
//!
//! Two candidate solutions are compared aspect by aspect: overload choices
//! at shared locators and type bindings of shared variables each award a
//! point to the better side. The overall winner must strictly beat every
//! rival; a tie or a cycle is an ambiguity, reported rather than guessed.
//! The integer point values carry no meaning beyond their ordering.

use crate::core::decls::{DeclId, DeclKind};
use crate::core::tree::NodeId;
use crate::core::types::Type;

use super::constraints::{Locator, OverloadChoice, TypeMatchKind};
use super::solver::{Solution, solve};
use super::system::{CheckerContext, ConstraintSystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionDiff {
    Better,
    Worse,
    /// No compared aspect differs; a modeling redundancy, not an error.
    Identical,
    Incomparable,
}

/// Checks a relation between two concrete types in a scratch system; used
/// for ranking, never for binding.
pub(crate) fn check_relation(
    ctx: &mut CheckerContext,
    a: &Type,
    b: &Type,
    kind: TypeMatchKind,
) -> bool {
    let mut system = ConstraintSystem::new(ctx);
    let locator = system.intern(Locator::new(NodeId::synthetic(u32::MAX)));
    system.relate(kind, a.clone(), b.clone(), locator);
    !solve(&mut system).solutions.is_empty()
}

/// The "at least as specialized as" relation over ignoring-self function
/// types: `a` is at least as specialized when its parameter tuple subtypes
/// `b`'s.
pub(crate) fn at_least_as_specialized(ctx: &mut CheckerContext, a: DeclId, b: DeclId) -> bool {
    let input_of = |ctx: &CheckerContext, decl: DeclId| -> Option<Type> {
        match &ctx.decls.decl(decl).kind {
            DeclKind::Func(func) => Some(func.input_type()),
            DeclKind::Constructor(ctor) => Some(Type::tuple(ctor.params.clone())),
            _ => None,
        }
    };
    let (Some(input_a), Some(input_b)) = (input_of(ctx, a), input_of(ctx, b)) else {
        return false;
    };
    check_relation(ctx, &input_a, &input_b, TypeMatchKind::Subtype)
}

fn is_archetype(ty: &Type) -> bool {
    matches!(ty, Type::Archetype { .. })
}

/// Awards the per-aspect point for two differing overload choices.
fn compare_choices(
    ctx: &mut CheckerContext,
    a: &OverloadChoice,
    b: &OverloadChoice,
) -> Option<std::cmp::Ordering> {
    use OverloadChoice::*;
    use std::cmp::Ordering;
    match (a, b) {
        // An identity-function overload beats a declaration-based one.
        (IdentityFunction, Decl { .. } | DeclViaDynamic { .. }) => Some(Ordering::Greater),
        (Decl { .. } | DeclViaDynamic { .. }, IdentityFunction) => Some(Ordering::Less),
        // A directly-found declaration beats one found via dynamic lookup.
        (Decl { .. }, DeclViaDynamic { .. }) => Some(Ordering::Greater),
        (DeclViaDynamic { .. }, Decl { .. }) => Some(Ordering::Less),
        // Two declarations: the more specialized parameter list wins.
        (Decl { decl: da, .. }, Decl { decl: db, .. })
        | (DeclViaDynamic { decl: da, .. }, DeclViaDynamic { decl: db, .. }) => {
            let a_spec = at_least_as_specialized(ctx, *da, *db);
            let b_spec = at_least_as_specialized(ctx, *db, *da);
            match (a_spec, b_spec) {
                (true, false) => Some(Ordering::Greater),
                (false, true) => Some(Ordering::Less),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Awards the per-aspect point for two differing type bindings: a strictly
/// more-subtype binding wins, then a strictly more-convertible one, then a
/// concrete type beats an archetype.
fn compare_bindings(ctx: &mut CheckerContext, a: &Type, b: &Type) -> Option<std::cmp::Ordering> {
    use std::cmp::Ordering;
    let sub_ab = check_relation(ctx, a, b, TypeMatchKind::Subtype);
    let sub_ba = check_relation(ctx, b, a, TypeMatchKind::Subtype);
    match (sub_ab, sub_ba) {
        (true, false) => return Some(Ordering::Greater),
        (false, true) => return Some(Ordering::Less),
        _ => {}
    }
    let conv_ab = check_relation(ctx, a, b, TypeMatchKind::Conversion);
    let conv_ba = check_relation(ctx, b, a, TypeMatchKind::Conversion);
    match (conv_ab, conv_ba) {
        (true, false) => return Some(Ordering::Greater),
        (false, true) => return Some(Ordering::Less),
        _ => {}
    }
    match (is_archetype(a), is_archetype(b)) {
        (false, true) => Some(Ordering::Greater),
        (true, false) => Some(Ordering::Less),
        _ => None,
    }
}

pub fn compare_solutions(
    ctx: &mut CheckerContext,
    a: &Solution,
    b: &Solution,
) -> SolutionDiff {
    // The fixed score is the primary key: fewer penalties always wins.
    if a.fixed_score != b.fixed_score {
        return if a.fixed_score < b.fixed_score {
            SolutionDiff::Better
        } else {
            SolutionDiff::Worse
        };
    }

    let mut points_a = 0u32;
    let mut points_b = 0u32;
    let mut differences = false;

    let mut locators: Vec<_> = a
        .choices
        .keys()
        .filter(|locator| b.choices.contains_key(locator))
        .copied()
        .collect();
    locators.sort();
    for locator in locators {
        let choice_a = &a.choices[&locator];
        let choice_b = &b.choices[&locator];
        if choice_a == choice_b {
            continue;
        }
        differences = true;
        match compare_choices(ctx, &choice_a.clone(), &choice_b.clone()) {
            Some(std::cmp::Ordering::Greater) => points_a += 1,
            Some(std::cmp::Ordering::Less) => points_b += 1,
            _ => {}
        }
    }

    let mut vars: Vec<_> = a
        .var_bindings
        .keys()
        .filter(|var| b.var_bindings.contains_key(var))
        .copied()
        .collect();
    vars.sort();
    for var in vars {
        let binding_a = a.var_bindings[&var].clone();
        let binding_b = b.var_bindings[&var].clone();
        if binding_a == binding_b {
            continue;
        }
        differences = true;
        match compare_bindings(ctx, &binding_a, &binding_b) {
            Some(std::cmp::Ordering::Greater) => points_a += 1,
            Some(std::cmp::Ordering::Less) => points_b += 1,
            _ => {}
        }
    }

    if !differences {
        return SolutionDiff::Identical;
    }
    match points_a.cmp(&points_b) {
        std::cmp::Ordering::Greater => SolutionDiff::Better,
        std::cmp::Ordering::Less => SolutionDiff::Worse,
        std::cmp::Ordering::Equal => SolutionDiff::Incomparable,
    }
}

/// The overall best solution must strictly beat every rival; otherwise the
/// outcome is ambiguous and the checker refuses to guess. Identical rivals
/// are modeling redundancies and never block selection.
pub fn best_solution(ctx: &mut CheckerContext, solutions: &[Solution]) -> Option<usize> {
    if solutions.len() == 1 {
        return Some(0);
    }
    for index in 0..solutions.len() {
        let beats_all = (0..solutions.len()).filter(|j| *j != index).all(|j| {
            matches!(
                compare_solutions(ctx, &solutions[index], &solutions[j]),
                SolutionDiff::Better | SolutionDiff::Identical
            )
        });
        if beats_all {
            return Some(index);
        }
    }
    None
}
