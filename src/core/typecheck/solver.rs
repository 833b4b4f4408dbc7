//! Solver search: iterative constraint propagation interleaved with overload
//! and disjunction forking, over explicit state snapshots.
//!
//! Backtracking is complete; score-based pruning only skips forks that can
//! no longer beat an already-completed solution. Failure recording follows
//! the most advanced fork so diagnostics come from the branch that got
//! furthest, not from abandoned alternatives.

use std::collections::HashMap;

use crate::core::decls::DeclKind;
use crate::core::types::{Type, TypeVarId};

use super::constraints::{Constraint, LocatorId, OverloadChoice, TypeMatchKind};
use super::errors::{Failure, FailureKind};
use super::match_types::Matched;
use super::system::ConstraintSystem;

/// A fully-resolved assignment: every type variable mapped to a concrete
/// type, every overload locator to its chosen candidate, plus the fixed
/// score accumulated while getting there.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub var_bindings: HashMap<TypeVarId, Type>,
    pub choices: HashMap<LocatorId, OverloadChoice>,
    pub fixed_score: u32,
}

impl Solution {
    pub fn type_of(&self, ty: &Type) -> Type {
        ty.map_nodes(&|t| match t {
            Type::Var(var) => self
                .var_bindings
                .get(&var)
                .cloned()
                .unwrap_or(Type::Var(var)),
            other => other,
        })
    }
}

#[derive(Debug)]
pub struct SolveOutcome {
    pub solutions: Vec<Solution>,
    /// The most specific failure seen by the most advanced fork; only
    /// meaningful when `solutions` is empty.
    pub best_failure: Option<Failure>,
}

enum Progress {
    Complete,
    ForkDisjunction(usize),
    ForkOverloads(usize),
    ForkBindings(TypeVarId, Vec<(Type, u32)>),
}

pub fn solve(system: &mut ConstraintSystem) -> SolveOutcome {
    let initial = std::mem::take(&mut system.state);
    let mut stack = vec![initial];
    let mut solutions: Vec<Solution> = Vec::new();
    let mut best_score: Option<u32> = None;
    let mut best_failure: Option<(u32, Failure)> = None;

    while let Some(state) = stack.pop() {
        // Prune forks that already can't beat a completed solution. This is
        // an optimization only; equal scores stay in play.
        if let Some(best) = best_score
            && state.score > best
        {
            continue;
        }
        system.state = state;

        match propagate(system) {
            Err(failure) => {
                let progress = system.state.progress;
                let replace = best_failure
                    .as_ref()
                    .map(|(recorded, _)| progress >= *recorded)
                    .unwrap_or(true);
                if replace {
                    best_failure = Some((progress, failure));
                }
            }
            Ok(Progress::Complete) => match finalize(system) {
                Ok(solution) => {
                    best_score = Some(
                        best_score
                            .map(|best| best.min(solution.fixed_score))
                            .unwrap_or(solution.fixed_score),
                    );
                    if !solutions.contains(&solution) {
                        solutions.push(solution);
                    }
                }
                Err(failure) => {
                    let progress = system.state.progress;
                    let replace = best_failure
                        .as_ref()
                        .map(|(recorded, _)| progress >= *recorded)
                        .unwrap_or(true);
                    if replace {
                        best_failure = Some((progress, failure));
                    }
                }
            },
            Ok(Progress::ForkDisjunction(index)) => {
                let (branches, _locator) = system.state.disjunctions.remove(index);
                let base = std::mem::take(&mut system.state);
                for branch in branches.iter().rev() {
                    let mut forked = base.clone();
                    for constraint in branch {
                        forked.worklist.push_back(constraint.clone());
                    }
                    stack.push(forked);
                }
            }
            Ok(Progress::ForkOverloads(index)) => {
                let set = system.state.unresolved_sets.remove(index);
                let base = std::mem::take(&mut system.state);
                for choice_index in (0..set.choices.len()).rev() {
                    system.state = base.clone();
                    system.resolve_overload(&set, choice_index);
                    stack.push(std::mem::take(&mut system.state));
                }
            }
            Ok(Progress::ForkBindings(var, candidates)) => {
                let base = std::mem::take(&mut system.state);
                for (candidate, penalty) in candidates.iter().rev() {
                    let mut forked = base.clone();
                    forked.score += penalty;
                    // Defaults carrying archetypes (collection literals) open
                    // to fresh variables in the forked state.
                    let candidate = if candidate.contains_archetypes() {
                        let mut subst = HashMap::new();
                        collect_archetypes(candidate, &mut |id, name| {
                            subst
                                .entry(id)
                                .or_insert_with(|| Type::Var(forked.vars.fresh(false)));
                            let _ = name;
                        });
                        candidate.substitute_archetypes(&subst)
                    } else {
                        candidate.clone()
                    };
                    forked.worklist.push_back(Constraint::Relate {
                        kind: TypeMatchKind::Bind,
                        first: Type::Var(var),
                        second: candidate,
                        locator: LocatorId(0),
                    });
                    stack.push(forked);
                }
            }
        }
    }

    SolveOutcome {
        solutions,
        best_failure: best_failure.map(|(_, failure)| failure),
    }
}

/// Simplifies the worklist to a fixpoint, then reports how to continue.
fn propagate(system: &mut ConstraintSystem) -> Result<Progress, Failure> {
    loop {
        let mut progressed = false;
        let mut pending = std::mem::take(&mut system.state.worklist);
        while let Some(constraint) = pending.pop_front() {
            match simplify(system, constraint.clone()) {
                Matched::Solved | Matched::TriviallySolved => {
                    progressed = true;
                    system.state.progress += 1;
                }
                Matched::Unsolved => system.state.worklist.push_back(constraint),
                Matched::Failed(failure) => return Err(failure),
            }
        }
        if !progressed {
            break;
        }
    }

    if !system.state.disjunctions.is_empty() {
        return Ok(Progress::ForkDisjunction(0));
    }
    if !system.state.unresolved_sets.is_empty() {
        // Deterministic pick: the set with the lowest locator id.
        let index = system
            .state
            .unresolved_sets
            .iter()
            .enumerate()
            .min_by_key(|(_, set)| set.locator)
            .map(|(index, _)| index)
            .expect("nonempty");
        return Ok(Progress::ForkOverloads(index));
    }
    if system.state.worklist.is_empty() {
        return Ok(Progress::Complete);
    }

    // Stuck on deferred relational constraints: gather candidate bindings
    // for the lowest-id unbound variable that has any.
    if let Some((var, candidates)) = gather_binding_candidates(system) {
        return Ok(Progress::ForkBindings(var, candidates));
    }

    let first = system.state.worklist.front().expect("nonempty").clone();
    let (first_ty, second_ty, locator) = constraint_types(&first);
    Err(Failure {
        kind: FailureKind::CannotInfer,
        first: first_ty,
        second: second_ty,
        locator,
    })
}

fn collect_archetypes(ty: &Type, visit: &mut dyn FnMut(crate::core::types::ArchetypeId, &str)) {
    match ty {
        Type::Archetype { id, name } => visit(*id, name),
        Type::BoundGeneric { args, .. } => {
            for arg in args {
                collect_archetypes(arg, visit);
            }
        }
        Type::Tuple { elements } => {
            for elem in elements {
                collect_archetypes(&elem.ty, visit);
            }
        }
        Type::Fn { input, output, .. } => {
            collect_archetypes(input, visit);
            collect_archetypes(output, visit);
        }
        Type::Metatype { instance } => collect_archetypes(instance, visit),
        Type::LValue { object, .. } => collect_archetypes(object, visit),
        _ => {}
    }
}

fn constraint_types(constraint: &Constraint) -> (Type, Type, LocatorId) {
    match constraint {
        Constraint::Relate {
            first,
            second,
            locator,
            ..
        } => (first.clone(), second.clone(), *locator),
        Constraint::Applicable {
            fn_shape,
            callee,
            locator,
        } => (fn_shape.clone(), callee.clone(), *locator),
        Constraint::Construction {
            fn_shape,
            instance,
            locator,
        } => (fn_shape.clone(), instance.clone(), *locator),
        Constraint::ConformsTo { ty, locator, .. } => (ty.clone(), Type::Error, *locator),
        Constraint::Member {
            base,
            member,
            locator,
            ..
        } => (base.clone(), member.clone(), *locator),
        Constraint::Archetype { ty, locator } => (ty.clone(), Type::Error, *locator),
        Constraint::Disjunction { locator, .. } | Constraint::Conjunction { locator, .. } => {
            (Type::Error, Type::Error, *locator)
        }
    }
}

/// Candidate bindings for an unbound variable, drawn from the deferred
/// relational constraints it appears in (conversion targets first, then
/// sources, then literal protocol defaults). The attached penalty feeds the
/// solution's fixed score: a literal variable bound away from its protocol's
/// default type costs a point.
fn gather_binding_candidates(
    system: &mut ConstraintSystem,
) -> Option<(TypeVarId, Vec<(Type, u32)>)> {
    let worklist: Vec<Constraint> = system.state.worklist.iter().cloned().collect();

    let mut roots: Vec<TypeVarId> = Vec::new();
    for constraint in &worklist {
        let (first, second, _) = constraint_types(constraint);
        for ty in [first, second] {
            if let Type::Var(var) = system.state.vars.fixed_type_recursive(&ty) {
                let root = system.state.vars.representative(var);
                if !roots.contains(&root) {
                    roots.push(root);
                }
            }
        }
    }
    roots.sort();

    for root in roots {
        let mut above: Vec<Type> = Vec::new();
        let mut below: Vec<Type> = Vec::new();
        let mut literal_defaults: Vec<Type> = Vec::new();

        for constraint in &worklist {
            match constraint {
                Constraint::Relate {
                    kind,
                    first,
                    second,
                    ..
                } if *kind >= TypeMatchKind::TrivialSubtype => {
                    let first = system.state.vars.fixed_type_recursive(first);
                    let second = system.state.vars.fixed_type_recursive(second);
                    let first_is_root = matches!(first, Type::Var(v) if system.state.vars.representative(v) == root);
                    let second_is_root = matches!(second, Type::Var(v) if system.state.vars.representative(v) == root);
                    if first_is_root && !second.contains_type_vars() {
                        let candidate = if system.state.vars.can_bind_lvalue(root) {
                            second.clone()
                        } else {
                            second.rvalue()
                        };
                        if !above.contains(&candidate) {
                            above.push(candidate);
                        }
                    }
                    if second_is_root && !first.contains_type_vars() {
                        let candidate = first.rvalue();
                        if !below.contains(&candidate) {
                            below.push(candidate);
                        }
                    }
                }
                Constraint::ConformsTo { ty, protocol, .. } => {
                    let ty = system.state.vars.fixed_type_recursive(ty);
                    if matches!(ty, Type::Var(v) if system.state.vars.representative(v) == root)
                        && let DeclKind::Protocol(proto) = &system.ctx.decls.decl(*protocol).kind
                        && let Some(default) = proto.literal_default.clone()
                        && !literal_defaults.contains(&default)
                    {
                        literal_defaults.push(default);
                    }
                }
                _ => {}
            }
        }

        let mut candidates: Vec<(Type, u32)> = Vec::new();
        let is_literal_var = !literal_defaults.is_empty();
        let matches_default = |ty: &Type, defaults: &[Type]| {
            defaults.iter().any(|default| {
                default == ty
                    || (default.nominal_decl().is_some()
                        && default.nominal_decl() == ty.nominal_decl())
            })
        };
        for ty in above.into_iter().chain(below) {
            if candidates.iter().any(|(existing, _)| *existing == ty) {
                continue;
            }
            let penalty = if is_literal_var && !matches_default(&ty, &literal_defaults) {
                1
            } else {
                0
            };
            candidates.push((ty, penalty));
        }
        for default in literal_defaults {
            if !candidates.iter().any(|(existing, _)| *existing == default) {
                candidates.push((default, 0));
            }
        }

        if !candidates.is_empty() {
            return Some((root, candidates));
        }
    }
    None
}

/// Builds a solution from a state with no pending work. Every type reachable
/// from an expression node must be fully resolved; leftover variables from
/// unexplored disjunction branches are harmless and poison out.
fn finalize(system: &mut ConstraintSystem) -> Result<Solution, Failure> {
    for ty in system.node_types.values() {
        let applied = system.state.vars.apply(ty);
        if applied.contains_type_vars() {
            return Err(Failure {
                kind: FailureKind::CannotInfer,
                first: ty.clone(),
                second: applied,
                locator: LocatorId(0),
            });
        }
    }

    let mut var_bindings = HashMap::new();
    for raw in 0..system.state.vars.len() {
        let var = TypeVarId(raw as u32);
        let resolved = system.state.vars.apply(&Type::Var(var));
        let resolved = if resolved.contains_type_vars() {
            Type::Error
        } else {
            resolved
        };
        var_bindings.insert(var, resolved);
    }
    Ok(Solution {
        var_bindings,
        choices: system.state.choices.clone(),
        fixed_score: system.state.score,
    })
}

/// Dispatches one constraint to its simplification rule.
pub fn simplify(system: &mut ConstraintSystem, constraint: Constraint) -> Matched {
    match constraint {
        Constraint::Relate {
            kind,
            first,
            second,
            locator,
        } => system.match_types(&first, &second, kind, locator),
        Constraint::Applicable {
            fn_shape,
            callee,
            locator,
        } => simplify_applicable(system, fn_shape, callee, locator),
        Constraint::Construction {
            fn_shape,
            instance,
            locator,
        } => simplify_construction(system, fn_shape, instance, locator),
        Constraint::ConformsTo {
            ty,
            protocol,
            locator,
        } => simplify_conforms(system, ty, protocol, locator),
        Constraint::Member {
            base,
            name,
            member,
            is_type_member,
            locator,
        } => {
            if is_type_member {
                simplify_type_member(system, base, name, member, locator)
            } else {
                simplify_value_member(system, base, name, member, locator)
            }
        }
        Constraint::Archetype { ty, locator } => {
            let resolved = system.resolve(&ty);
            match resolved {
                Type::Var(_) => Matched::Unsolved,
                Type::Error => Matched::Solved,
                Type::Archetype { .. } => Matched::Solved,
                other => Matched::Failed(Failure {
                    kind: FailureKind::NotAnArchetype,
                    first: other,
                    second: Type::Error,
                    locator,
                }),
            }
        }
        Constraint::Disjunction { branches, locator } => {
            system.state.disjunctions.push((branches, locator));
            Matched::Solved
        }
        Constraint::Conjunction { constraints, .. } => {
            for constraint in constraints {
                system.add_constraint(constraint);
            }
            Matched::Solved
        }
    }
}

fn simplify_applicable(
    system: &mut ConstraintSystem,
    fn_shape: Type,
    callee: Type,
    locator: LocatorId,
) -> Matched {
    let resolved = system.resolve(&callee);
    match resolved {
        Type::Var(_) => Matched::Unsolved,
        Type::Error => Matched::Solved,
        Type::LValue { object, .. } => {
            system.add_constraint(Constraint::Applicable {
                fn_shape,
                callee: (*object).clone(),
                locator,
            });
            Matched::Solved
        }
        Type::Fn {
            input: ref callee_input,
            output: ref callee_output,
            ..
        } => {
            // The shape is `(args) -> result`: arguments convert to the
            // callee's input, the result binds to the callee's output.
            let Some((shape_input, shape_output, _)) = fn_shape.as_fn().map(|(i, o, f)| {
                (i.clone(), o.clone(), f)
            }) else {
                return Matched::Failed(Failure {
                    kind: FailureKind::NotCallable,
                    first: fn_shape,
                    second: resolved.clone(),
                    locator,
                });
            };
            let arg_locator = {
                let appended = system
                    .locators
                    .get(locator)
                    .appending(super::constraints::PathStep::FnArgument);
                system.locators.intern(appended)
            };
            let result_locator = {
                let appended = system
                    .locators
                    .get(locator)
                    .appending(super::constraints::PathStep::FnResult);
                system.locators.intern(appended)
            };
            system.relate(
                TypeMatchKind::Conversion,
                shape_input,
                (**callee_input).clone(),
                arg_locator,
            );
            system.relate(
                TypeMatchKind::Bind,
                shape_output,
                (**callee_output).clone(),
                result_locator,
            );
            Matched::Solved
        }
        Type::Metatype { instance } => {
            system.add_constraint(Constraint::Construction {
                fn_shape,
                instance: (*instance).clone(),
                locator,
            });
            Matched::Solved
        }
        other => Matched::Failed(Failure {
            kind: FailureKind::NotCallable,
            first: other,
            second: fn_shape,
            locator,
        }),
    }
}

fn simplify_construction(
    system: &mut ConstraintSystem,
    fn_shape: Type,
    instance: Type,
    locator: LocatorId,
) -> Matched {
    let resolved = system.resolve(&instance);
    match &resolved {
        Type::Var(_) => Matched::Unsolved,
        Type::Error => Matched::Solved,
        Type::Nominal { .. } | Type::BoundGeneric { .. } => {
            let base = Type::metatype(resolved.clone());
            let ctors = system.ctx.lookup_constructors(&resolved);
            if ctors.is_empty() {
                return Matched::Failed(Failure {
                    kind: FailureKind::DoesNotHaveConstructor,
                    first: resolved.clone(),
                    second: fn_shape,
                    locator,
                });
            }
            let member_var = system.fresh_var(false);
            let choices = ctors
                .into_iter()
                .map(|decl| OverloadChoice::Decl {
                    decl,
                    base: Some(base.clone()),
                })
                .collect();
            system.add_overload_set(super::constraints::OverloadSet {
                bound_var: member_var,
                choices,
                locator,
            });
            system.add_constraint(Constraint::Applicable {
                fn_shape,
                callee: Type::Var(member_var),
                locator,
            });
            Matched::Solved
        }
        other => Matched::Failed(Failure {
            kind: FailureKind::DoesNotHaveConstructor,
            first: other.clone(),
            second: fn_shape,
            locator,
        }),
    }
}

fn simplify_conforms(
    system: &mut ConstraintSystem,
    ty: Type,
    protocol: crate::core::decls::DeclId,
    locator: LocatorId,
) -> Matched {
    let resolved = system.resolve(&ty);
    match &resolved {
        Type::Var(_) => Matched::Unsolved,
        Type::Error => Matched::Solved,
        concrete => {
            let concrete = concrete.rvalue();
            if concrete.contains_type_vars() {
                return Matched::Unsolved;
            }
            if system.ctx.conforms_to(&concrete, protocol) {
                Matched::Solved
            } else {
                Matched::Failed(Failure {
                    kind: FailureKind::DoesNotConform(protocol),
                    first: concrete,
                    second: Type::Error,
                    locator,
                })
            }
        }
    }
}

fn simplify_value_member(
    system: &mut ConstraintSystem,
    base: Type,
    name: String,
    member: Type,
    locator: LocatorId,
) -> Matched {
    let resolved_base = system.resolve(&base);
    match &resolved_base {
        Type::Var(_) => return Matched::Unsolved,
        Type::Error => {
            let _ = system.match_types(&member, &Type::Error, TypeMatchKind::Bind, locator);
            return Matched::Solved;
        }
        _ => {}
    }

    let object = resolved_base.rvalue();

    let member_var = match member {
        Type::Var(var) => var,
        other => {
            // Member constraints are always generated against a fresh
            // variable; reaching here with a concrete type is a logic error
            // upstream, surfaced as a mismatch rather than a crash.
            return Matched::Failed(Failure {
                kind: FailureKind::TypeMismatch,
                first: other,
                second: resolved_base,
                locator,
            });
        }
    };

    // Tuple element projection by index (`pair.0`) or by element name.
    if let Type::Tuple { elements } = &object {
        let index = match name.parse::<usize>() {
            Ok(index) => Some(index),
            Err(_) => elements
                .iter()
                .position(|elem| elem.name.as_deref() == Some(name.as_str())),
        };
        let Some(index) = index.filter(|index| *index < elements.len()) else {
            return Matched::Failed(Failure {
                kind: FailureKind::DoesNotHaveMember(name),
                first: object,
                second: Type::Error,
                locator,
            });
        };
        system.add_overload_set(super::constraints::OverloadSet {
            bound_var: member_var,
            choices: vec![OverloadChoice::TupleIndex {
                base: resolved_base,
                index,
            }],
            locator,
        });
        return Matched::Solved;
    }

    // Member lookup needs a concrete base shape; nested unknowns in generic
    // arguments are fine, an unknown head is not.
    if object.contains_type_vars() && object.nominal_decl().is_none() {
        return Matched::Unsolved;
    }

    let candidates = system.ctx.lookup_member(&object, &name);
    let viable: Vec<OverloadChoice> = candidates
        .into_iter()
        .filter(|decl| system.member_viable(*decl, &resolved_base))
        .map(|decl| OverloadChoice::Decl {
            decl,
            base: Some(resolved_base.clone()),
        })
        .collect();

    if viable.is_empty() {
        return Matched::Failed(Failure {
            kind: FailureKind::DoesNotHaveMember(name),
            first: object,
            second: Type::Error,
            locator,
        });
    }
    system.add_overload_set(super::constraints::OverloadSet {
        bound_var: member_var,
        choices: viable,
        locator,
    });
    Matched::Solved
}

fn simplify_type_member(
    system: &mut ConstraintSystem,
    base: Type,
    name: String,
    member: Type,
    locator: LocatorId,
) -> Matched {
    let resolved_base = system.resolve(&base);
    match &resolved_base {
        Type::Var(_) => return Matched::Unsolved,
        Type::Error => return Matched::Solved,
        _ => {}
    }
    let object = resolved_base.rvalue();
    if object.contains_type_vars() && object.nominal_decl().is_none() {
        return Matched::Unsolved;
    }
    let projections = system.ctx.lookup_member_type(&object, &name);
    match projections.first() {
        Some(projected) => {
            system.match_types(&member, &projected.clone(), TypeMatchKind::Bind, locator)
        }
        None => Matched::Failed(Failure {
            kind: FailureKind::DoesNotHaveMember(name),
            first: object,
            second: Type::Error,
            locator,
        }),
    }
}
