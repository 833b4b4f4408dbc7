//! Constraint-based type checker.
//!
//! Each expression is checked by one constraint system: generation walks the
//! tree emitting constraints (`generate`), the simplifier rewrites them
//! (`match_types`), the solver searches overload and binding choices
//! (`solver`), and the ranked best solution is written back into a node-type
//! side table (`apply`). Protocol conformance and witness matching live in
//! `conformance`.

mod apply;
mod conformance;
mod constraints;
mod errors;
mod generate;
mod match_types;
mod ranking;
mod shuffle;
mod solver;
mod system;
mod type_vars;

pub use apply::{TypeMap, apply_solution};
pub use conformance::{
    Conformance, ConformanceCache, ConformanceCheck, ConformanceFailure, Witness,
};
pub use constraints::{
    Constraint, Locator, LocatorId, LocatorTable, OverloadChoice, OverloadSet, PathStep,
    TypeMatchKind,
};
pub use errors::{Failure, FailureKind, TEK, TypeCheckError, TypeCheckErrorKind};
pub use generate::ConstraintGenerator;
pub use match_types::Matched;
pub use ranking::{SolutionDiff, best_solution, compare_solutions};
pub use shuffle::{ShuffleEntry, ShuffleError, shuffle_tuple};
pub use solver::{Solution, SolveOutcome, simplify, solve};
pub use system::{CheckerContext, ConstraintSystem, SolverState};
pub use type_vars::{BindError, TypeVarStore};

use std::collections::HashMap;

use crate::core::decls::{DeclId, DeclKind};
use crate::core::diag::Span;
use crate::core::resolve::{DeclRef, ResolvedModule};
use crate::core::tree::{Expr, ItemKind, NodeId, Pattern, PatternKind, Stmt, StmtKind};
use crate::core::types::Type;

/// One fully-checked expression: its type, the per-node type table, and the
/// solution that produced them.
#[derive(Debug)]
pub struct CheckedExpr {
    pub ty: Type,
    pub types: TypeMap,
    pub solution: Solution,
}

/// Module-level checking output: merged node types plus every diagnostic.
#[derive(Debug, Default)]
pub struct TypecheckOutput {
    pub types: TypeMap,
    pub errors: Vec<TypeCheckError>,
}

/// Checks one expression against an optional expected type.
pub fn check_expr(
    ctx: &mut CheckerContext,
    expr: &Expr,
    expected: Option<&Type>,
    annotations: &HashMap<NodeId, Type>,
) -> Result<CheckedExpr, Vec<TypeCheckError>> {
    let mut system = ConstraintSystem::new(ctx);
    let root_ty = ConstraintGenerator::new(&mut system, annotations).generate(expr);
    let Some(root_ty) = root_ty else {
        return Err(vec![TEK::PoisonedReference.at(expr.span)]);
    };

    if let Some(expected) = expected {
        let locator = system.intern(Locator::new(expr.id));
        system.relate(
            TypeMatchKind::Conversion,
            root_ty.clone(),
            expected.clone(),
            locator,
        );
    }

    let outcome = solver::solve(&mut system);
    if outcome.solutions.is_empty() {
        return Err(vec![failure_to_error(
            &system,
            expr.span,
            outcome.best_failure,
        )]);
    }

    match ranking::best_solution(system.ctx, &outcome.solutions) {
        Some(index) => {
            let solution = outcome.solutions.into_iter().nth(index).expect("index valid");
            let types = apply::apply_solution(&system, &solution);
            let ty = solution.type_of(&root_ty).rvalue();
            Ok(CheckedExpr {
                ty,
                types,
                solution,
            })
        }
        None => {
            let candidates = outcome
                .solutions
                .iter()
                .map(|solution| describe_solution(system.ctx, solution))
                .collect();
            Err(vec![TEK::Ambiguous(candidates).at(expr.span)])
        }
    }
}

/// Checks every body and top-level initializer of a resolved module and
/// validates its declared protocol conformances.
pub fn check_module(resolved: &ResolvedModule) -> TypecheckOutput {
    let mut ctx = CheckerContext::new(&resolved.decls, &resolved.prelude, &resolved.refs);
    let mut output = TypecheckOutput::default();

    validate_conformances(&mut ctx, resolved, &mut output.errors);

    for item in &resolved.module.items {
        if let ItemKind::Var(var) = &item.kind
            && let Some(init) = &var.init
        {
            let expected = top_level_var_type(resolved, item.span);
            match check_expr(&mut ctx, init, expected.as_ref(), &resolved.annotations) {
                Ok(checked) => output.types.merge(checked.types),
                Err(errors) => output.errors.extend(errors),
            }
        }
    }

    for body in &resolved.bodies {
        ctx.local_types.clear();
        let ret_ty = callable_return_type(resolved, body.owner);
        for stmt in &body.block.stmts {
            check_stmt(&mut ctx, resolved, stmt, &ret_ty, &mut output);
        }
    }

    output
}

fn check_stmt(
    ctx: &mut CheckerContext,
    resolved: &ResolvedModule,
    stmt: &Stmt,
    ret_ty: &Type,
    output: &mut TypecheckOutput,
) {
    match &stmt.kind {
        StmtKind::Expr(expr) => {
            match check_expr(ctx, expr, None, &resolved.annotations) {
                Ok(checked) => output.types.merge(checked.types),
                Err(errors) => output.errors.extend(errors),
            }
        }
        StmtKind::Return(value) => match value {
            Some(expr) => match check_expr(ctx, expr, Some(ret_ty), &resolved.annotations) {
                Ok(checked) => output.types.merge(checked.types),
                Err(errors) => output.errors.extend(errors),
            },
            None => {
                if !ret_ty.is_unit() && !ret_ty.is_error() {
                    output
                        .errors
                        .push(TEK::TypeMismatch(Type::unit(), ret_ty.clone()).at(stmt.span));
                }
            }
        },
        StmtKind::Var(var) => {
            let annotation = var
                .ty
                .as_ref()
                .and_then(|ty_expr| resolved.annotations.get(&ty_expr.id))
                .cloned();
            match &var.init {
                Some(init) => {
                    match check_expr(ctx, init, annotation.as_ref(), &resolved.annotations) {
                        Ok(checked) => {
                            let bound_ty = annotation.unwrap_or_else(|| checked.ty.clone());
                            bind_pattern_types(ctx, resolved, &var.pattern, &bound_ty, output);
                            output.types.merge(checked.types);
                        }
                        Err(errors) => {
                            output.errors.extend(errors);
                            // Keep later statements checkable against the
                            // annotation, or poison the binding.
                            let fallback = annotation.unwrap_or(Type::Error);
                            bind_pattern_types(ctx, resolved, &var.pattern, &fallback, output);
                        }
                    }
                }
                None => match annotation {
                    Some(ty) => bind_pattern_types(ctx, resolved, &var.pattern, &ty, output),
                    None => {
                        output.errors.push(TEK::CannotInferType.at(stmt.span));
                        bind_pattern_types(ctx, resolved, &var.pattern, &Type::Error, output);
                    }
                },
            }
        }
    }
}

fn bind_pattern_types(
    ctx: &mut CheckerContext,
    resolved: &ResolvedModule,
    pattern: &Pattern,
    ty: &Type,
    output: &mut TypecheckOutput,
) {
    match &pattern.kind {
        PatternKind::Name(_) => {
            if let Some(DeclRef::Resolved(decl)) = resolved.refs.get(&pattern.id) {
                ctx.local_types.insert(*decl, ty.rvalue());
                output.types.insert(pattern.id, ty.rvalue());
            }
        }
        PatternKind::Wildcard => {}
        PatternKind::Tuple(patterns) => {
            let object = ty.rvalue();
            match object.tuple_elements() {
                Some(elements) if elements.len() == patterns.len() => {
                    for (sub, element) in patterns.iter().zip(elements) {
                        bind_pattern_types(ctx, resolved, sub, &element.ty.clone(), output);
                    }
                }
                _ => {
                    if !object.is_error() {
                        output.errors.push(
                            TEK::TupleSizeMismatch(object.clone(), ty.clone()).at(pattern.span),
                        );
                    }
                    for sub in patterns {
                        bind_pattern_types(ctx, resolved, sub, &Type::Error, output);
                    }
                }
            }
        }
    }
}

fn callable_return_type(resolved: &ResolvedModule, owner: DeclId) -> Type {
    match &resolved.decls.decl(owner).kind {
        DeclKind::Func(func) => func.ret.clone(),
        _ => Type::unit(),
    }
}

fn top_level_var_type(resolved: &ResolvedModule, span: Span) -> Option<Type> {
    resolved
        .decls
        .decls()
        .find(|decl| {
            decl.span == span
                && matches!(&decl.kind, DeclKind::Var(var) if var.owner.is_none() && !var.ty.is_error())
        })
        .map(|decl| match &decl.kind {
            DeclKind::Var(var) => var.ty.clone(),
            _ => Type::Error,
        })
}

/// Checks every declared conformance of the module's nominal types, batching
/// all requirement failures per (type, protocol) pair.
fn validate_conformances(
    ctx: &mut CheckerContext,
    resolved: &ResolvedModule,
    errors: &mut Vec<TypeCheckError>,
) {
    let nominals: Vec<DeclId> = resolved
        .decls
        .decls()
        .filter(|decl| {
            matches!(
                decl.kind,
                DeclKind::Struct(_) | DeclKind::Class(_) | DeclKind::Enum(_)
            )
        })
        .map(|decl| decl.id)
        .collect();

    for nominal in nominals {
        let span = resolved.decls.decl(nominal).span;
        let ty = resolved.decls.declared_type(nominal);
        let conformances = resolved.decls.conformances_of(nominal).to_vec();
        for protocol in conformances {
            let check = ctx.conformance(&ty, protocol);
            let ConformanceCheck::Fails(failures) = &*check else {
                continue;
            };
            let protocol_name = resolved.decls.decl(protocol).name.clone();
            for failure in failures {
                errors.push(conformance_failure_to_error(
                    resolved,
                    &ty,
                    &protocol_name,
                    failure,
                    span,
                ));
            }
        }
    }
}

fn conformance_failure_to_error(
    resolved: &ResolvedModule,
    ty: &Type,
    protocol_name: &str,
    failure: &ConformanceFailure,
    span: Span,
) -> TypeCheckError {
    match failure {
        ConformanceFailure::NotDeclared => {
            TEK::DoesNotConformToProtocol(ty.clone(), protocol_name.to_string()).at(span)
        }
        ConformanceFailure::MissingWitness { requirement } => TEK::MissingWitness(
            protocol_name.to_string(),
            resolved.decls.decl(*requirement).name.clone(),
        )
        .at(span),
        ConformanceFailure::AmbiguousWitness { requirement } => TEK::AmbiguousWitness(
            protocol_name.to_string(),
            resolved.decls.decl(*requirement).name.clone(),
        )
        .at(span),
        ConformanceFailure::ConflictingAssociatedType {
            assoc,
            first,
            second,
        } => TEK::ConflictingAssociatedType(
            protocol_name.to_string(),
            resolved.decls.decl(*assoc).name.clone(),
            first.clone(),
            second.clone(),
        )
        .at(span),
        ConformanceFailure::UndeducedAssociatedType { assoc } => TEK::MissingWitness(
            protocol_name.to_string(),
            resolved.decls.decl(*assoc).name.clone(),
        )
        .at(span),
    }
}

/// Maps a recorded constraint failure to a user-facing error, anchored at
/// the failing constraint's locator when possible.
fn failure_to_error(
    system: &ConstraintSystem,
    fallback_span: Span,
    failure: Option<Failure>,
) -> TypeCheckError {
    let Some(failure) = failure else {
        return TEK::CannotInferType.at(fallback_span);
    };
    let anchor = system.locators.get(failure.locator).anchor;
    let span = system
        .node_spans
        .get(&anchor)
        .copied()
        .unwrap_or(fallback_span);
    let kind = match failure.kind {
        FailureKind::TypeMismatch => TEK::TypeMismatch(failure.first, failure.second),
        FailureKind::TupleSizeMismatch => TEK::TupleSizeMismatch(failure.first, failure.second),
        FailureKind::TupleNameMismatch => TEK::TupleNameMismatch(failure.first, failure.second),
        FailureKind::FunctionTypesMismatch => {
            TEK::FunctionTypesMismatch(failure.first, failure.second)
        }
        FailureKind::DoesNotConform(protocol) => TEK::DoesNotConformToProtocol(
            failure.first,
            system.ctx.decls.decl(protocol).name.clone(),
        ),
        FailureKind::DoesNotHaveMember(name) => TEK::DoesNotHaveMember(failure.first, name),
        FailureKind::DoesNotHaveConstructor => TEK::DoesNotHaveConstructor(failure.first),
        FailureKind::NotAnArchetype => TEK::NotAnArchetype(failure.first),
        FailureKind::OccursCheck => TEK::InfiniteType(failure.first, failure.second),
        FailureKind::LValueCapability => {
            TEK::LValueCapabilityMismatch(failure.first, failure.second)
        }
        FailureKind::NotCallable => TEK::NotCallable(failure.first),
        FailureKind::NotAddressable => TEK::NotAddressable(failure.first),
        FailureKind::CannotInfer => TEK::CannotInferType,
    };
    kind.at(span)
}

fn describe_solution(ctx: &CheckerContext, solution: &Solution) -> String {
    let mut names: Vec<String> = Vec::new();
    let mut locators: Vec<_> = solution.choices.keys().copied().collect();
    locators.sort();
    for locator in locators {
        match &solution.choices[&locator] {
            OverloadChoice::Decl { decl, .. } | OverloadChoice::DeclViaDynamic { decl, .. } => {
                let decl = ctx.decls.decl(*decl);
                let detail = match &decl.kind {
                    DeclKind::Func(func) => format!("{}: {}", decl.name, func.fn_type()),
                    _ => decl.name.clone(),
                };
                names.push(detail);
            }
            OverloadChoice::IdentityFunction => names.push("(identity)".to_string()),
            OverloadChoice::BaseType { base } => names.push(format!("(base {base})")),
            OverloadChoice::TupleIndex { index, .. } => names.push(format!(".{index}")),
        }
    }
    names.join(", ")
}

#[cfg(test)]
#[path = "../../tests/typecheck/t_type_vars.rs"]
mod tests_type_vars;

#[cfg(test)]
#[path = "../../tests/typecheck/t_shuffle.rs"]
mod tests_shuffle;

#[cfg(test)]
#[path = "../../tests/typecheck/t_match.rs"]
mod tests_match;

#[cfg(test)]
#[path = "../../tests/typecheck/t_solver.rs"]
mod tests_solver;

#[cfg(test)]
#[path = "../../tests/typecheck/t_conformance.rs"]
mod tests_conformance;

#[cfg(test)]
#[path = "../../tests/typecheck/t_typecheck.rs"]
mod tests_typecheck;
