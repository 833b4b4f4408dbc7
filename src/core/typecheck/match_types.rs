//! The constraint simplifier: `match_types` and friends.
//!
//! Given two types and a match kind from the strictness lattice, either
//! solve the relation (possibly decomposing into sub-constraints on the
//! worklist), defer it on an unbound type variable, or fail with a recorded
//! `Failure`. Weaker kinds never bind variables eagerly; they re-queue so a
//! later, better-informed pass can decide.

use crate::core::decls::{CONVERSION_MEMBER, DeclKind};
use crate::core::types::{TupleElement, Type, TypeVarId};

use super::constraints::{Constraint, LocatorId, PathStep, TypeMatchKind};
use super::errors::{Failure, FailureKind};
use super::shuffle::{ShuffleEntry, ShuffleError, shuffle_tuple};
use super::system::ConstraintSystem;
use super::type_vars::BindError;

/// Outcome of one simplification attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Matched {
    /// Types were already structurally identical.
    TriviallySolved,
    /// A rewrite applied or variables were bound; sub-constraints may have
    /// been queued.
    Solved,
    /// Progress blocked on an unbound type variable; re-queue.
    Unsolved,
    Failed(Failure),
}

impl Matched {
    pub fn solved(&self) -> bool {
        matches!(self, Matched::TriviallySolved | Matched::Solved)
    }
}

impl<'c, 'd> ConstraintSystem<'c, 'd> {
    fn failure(&self, kind: FailureKind, first: &Type, second: &Type, locator: LocatorId) -> Failure {
        Failure {
            kind,
            first: first.clone(),
            second: second.clone(),
            locator,
        }
    }

    fn step_locator(&mut self, locator: LocatorId, step: PathStep) -> LocatorId {
        let appended = self.locators.get(locator).appending(step);
        self.locators.intern(appended)
    }

    pub fn match_types(
        &mut self,
        a: &Type,
        b: &Type,
        kind: TypeMatchKind,
        locator: LocatorId,
    ) -> Matched {
        let a = self.resolve(a);
        let b = self.resolve(b);

        // Poisoned subtrees absorb every relation; the original failure was
        // already reported upstream.
        if a.is_error() || b.is_error() {
            return Matched::Solved;
        }

        if a == b {
            return Matched::TriviallySolved;
        }

        // Unresolved type variables: bind or union for the strict kinds,
        // defer for the rest so no premature binding rejects a solution that
        // later context would allow.
        match (&a, &b) {
            (Type::Var(va), Type::Var(vb)) => {
                return if kind <= TypeMatchKind::SameType {
                    self.merge_vars(*va, *vb, &a, &b, locator)
                } else {
                    Matched::Unsolved
                };
            }
            (Type::Var(var), concrete) => {
                return if kind <= TypeMatchKind::SameType {
                    self.bind_var(*var, concrete.clone(), kind, &a, &b, locator)
                } else {
                    Matched::Unsolved
                };
            }
            (concrete, Type::Var(var)) => {
                return if kind <= TypeMatchKind::SameType {
                    self.bind_var(*var, concrete.clone(), kind, &a, &b, locator)
                } else {
                    Matched::Unsolved
                };
            }
            _ => {}
        }

        // Parallel structural decomposition for same-shaped types.
        match (&a, &b) {
            (Type::Tuple { elements: ea }, Type::Tuple { elements: eb }) => {
                return self.match_tuple_types(ea, eb, &a, &b, kind, locator);
            }
            (Type::Fn { .. }, Type::Fn { .. }) => {
                if let Some(result) = self.match_function_types(&a, &b, kind, locator) {
                    return result;
                }
                // Flag-incompatible functions fall through to conversions.
            }
            (
                Type::BoundGeneric { decl: da, args: aa, .. },
                Type::BoundGeneric { decl: db, args: ab, .. },
            ) if da == db => {
                if aa.len() != ab.len() {
                    return Matched::Failed(self.failure(
                        FailureKind::TypeMismatch,
                        &a,
                        &b,
                        locator,
                    ));
                }
                for (index, (arg_a, arg_b)) in aa.iter().zip(ab.iter()).enumerate() {
                    let step = self.step_locator(locator, PathStep::GenericArgument(index));
                    self.relate(TypeMatchKind::SameType, arg_a.clone(), arg_b.clone(), step);
                }
                return Matched::Solved;
            }
            (Type::Metatype { instance: ia }, Type::Metatype { instance: ib }) => {
                // Metatypes are covariant only where the instances are
                // classes with possible superclass relations.
                let sub_kind = if kind >= TypeMatchKind::TrivialSubtype
                    && self.is_class_type(ia)
                    && self.is_class_type(ib)
                {
                    kind
                } else {
                    TypeMatchKind::SameType
                };
                let instance_a = (**ia).clone();
                let instance_b = (**ib).clone();
                return self.match_types(&instance_a, &instance_b, sub_kind, locator);
            }
            (
                Type::LValue {
                    object: oa,
                    qualifiers: qa,
                },
                Type::LValue {
                    object: ob,
                    qualifiers: qb,
                },
            ) => {
                let qualifiers_ok = if kind <= TypeMatchKind::SameType {
                    qa == qb
                } else {
                    // A settable lvalue may serve where a non-settable one is
                    // expected, never the reverse.
                    qa.settable || !qb.settable
                };
                if !qualifiers_ok {
                    return Matched::Failed(self.failure(
                        FailureKind::TypeMismatch,
                        &a,
                        &b,
                        locator,
                    ));
                }
                return self.match_types(
                    &(**oa).clone(),
                    &(**ob).clone(),
                    TypeMatchKind::SameType,
                    locator,
                );
            }
            _ => {}
        }

        self.match_conversions(&a, &b, kind, locator)
    }

    fn merge_vars(
        &mut self,
        va: TypeVarId,
        vb: TypeVarId,
        a: &Type,
        b: &Type,
        locator: LocatorId,
    ) -> Matched {
        match self.state.vars.merge_equivalence_classes(va, vb) {
            Ok(()) => Matched::Solved,
            Err(BindError::LValueCapability) => {
                Matched::Failed(self.failure(FailureKind::LValueCapability, a, b, locator))
            }
            Err(BindError::OccursCheck) => {
                Matched::Failed(self.failure(FailureKind::OccursCheck, a, b, locator))
            }
        }
    }

    fn bind_var(
        &mut self,
        var: TypeVarId,
        mut ty: Type,
        kind: TypeMatchKind,
        a: &Type,
        b: &Type,
        locator: LocatorId,
    ) -> Matched {
        if ty.is_lvalue() && !self.state.vars.can_bind_lvalue(var) {
            if kind == TypeMatchKind::SameType {
                // Load to an rvalue first; same-type matching permits it.
                ty = ty.rvalue();
            } else {
                return Matched::Failed(self.failure(
                    FailureKind::LValueCapability,
                    a,
                    b,
                    locator,
                ));
            }
        }
        match self.state.vars.assign_fixed_type(var, ty) {
            Ok(()) => Matched::Solved,
            Err(BindError::OccursCheck) => {
                Matched::Failed(self.failure(FailureKind::OccursCheck, a, b, locator))
            }
            Err(BindError::LValueCapability) => {
                Matched::Failed(self.failure(FailureKind::LValueCapability, a, b, locator))
            }
        }
    }

    /// Tuples match element-wise: strict correspondence for the strict
    /// kinds, the name-aware shuffle for conversions.
    fn match_tuple_types(
        &mut self,
        source: &[TupleElement],
        target: &[TupleElement],
        a: &Type,
        b: &Type,
        kind: TypeMatchKind,
        locator: LocatorId,
    ) -> Matched {
        if kind < TypeMatchKind::Conversion {
            if source.len() != target.len() {
                return Matched::Failed(self.failure(
                    FailureKind::TupleSizeMismatch,
                    a,
                    b,
                    locator,
                ));
            }
            for (index, (sa, sb)) in source.iter().zip(target.iter()).enumerate() {
                if sa.name != sb.name {
                    return Matched::Failed(self.failure(
                        FailureKind::TupleNameMismatch,
                        a,
                        b,
                        locator,
                    ));
                }
                if sa.variadic != sb.variadic {
                    return Matched::Failed(self.failure(
                        FailureKind::TupleSizeMismatch,
                        a,
                        b,
                        locator,
                    ));
                }
                let step = self.step_locator(locator, PathStep::TupleElement(index));
                self.relate(kind, sa.ty.clone(), sb.ty.clone(), step);
            }
            return Matched::Solved;
        }

        match shuffle_tuple(source, target) {
            Ok(entries) => {
                for (target_index, entry) in entries.iter().enumerate() {
                    let target_ty = target[target_index].ty.clone();
                    match entry {
                        ShuffleEntry::Source(source_index) => {
                            let step =
                                self.step_locator(locator, PathStep::TupleElement(target_index));
                            self.relate(
                                TypeMatchKind::Conversion,
                                source[*source_index].ty.clone(),
                                target_ty,
                                step,
                            );
                        }
                        ShuffleEntry::Variadic(source_indices) => {
                            for source_index in source_indices {
                                let step = self
                                    .step_locator(locator, PathStep::TupleElement(target_index));
                                self.relate(
                                    TypeMatchKind::Conversion,
                                    source[*source_index].ty.clone(),
                                    target_ty.clone(),
                                    step,
                                );
                            }
                        }
                        ShuffleEntry::Default => {}
                    }
                }
                Matched::Solved
            }
            Err(ShuffleError::SizeMismatch) => {
                Matched::Failed(self.failure(FailureKind::TupleSizeMismatch, a, b, locator))
            }
            Err(ShuffleError::NameMismatch) => {
                Matched::Failed(self.failure(FailureKind::TupleNameMismatch, a, b, locator))
            }
        }
    }

    /// Functions match contravariantly on input, covariantly on output.
    /// Returns `None` when flags force the caller into conversion fallbacks.
    fn match_function_types(
        &mut self,
        a: &Type,
        b: &Type,
        kind: TypeMatchKind,
        locator: LocatorId,
    ) -> Option<Matched> {
        let (ia, oa, fa) = a.as_fn().expect("function type");
        let (ib, ob, fb) = b.as_fn().expect("function type");

        let flags_ok = if kind <= TypeMatchKind::SameType {
            fa == fb
        } else {
            // An autoclosure function can serve as a plain function, and a
            // noreturn function anywhere a returning one is expected.
            (fa.autoclosure || !fb.autoclosure) && (fa.noreturn || !fb.noreturn)
        };
        if !flags_ok {
            if kind == TypeMatchKind::Conversion && fb.autoclosure {
                return None; // try autoclosure value wrapping
            }
            return Some(Matched::Failed(self.failure(
                FailureKind::FunctionTypesMismatch,
                a,
                b,
                locator,
            )));
        }

        let arg_locator = self.step_locator(locator, PathStep::FnArgument);
        let result_locator = self.step_locator(locator, PathStep::FnResult);
        // Contravariant input: the target's input must convert to ours.
        self.relate(kind, (*ib).clone(), (*ia).clone(), arg_locator);
        self.relate(kind, (*oa).clone(), (*ob).clone(), result_locator);
        Some(Matched::Solved)
    }

    /// Conversion-and-weaker fallbacks, attempted in a fixed order.
    fn match_conversions(
        &mut self,
        a: &Type,
        b: &Type,
        kind: TypeMatchKind,
        locator: LocatorId,
    ) -> Matched {
        // Scalar to single-element tuple promotion.
        if kind == TypeMatchKind::Conversion
            && !matches!(a, Type::Tuple { .. })
            && let Type::Tuple { elements } = b
        {
            let required: Vec<usize> = elements
                .iter()
                .enumerate()
                .filter(|(_, elem)| !elem.variadic && !elem.has_default)
                .map(|(index, _)| index)
                .collect();
            if required.len() == 1 {
                let step = self.step_locator(locator, PathStep::TupleElement(required[0]));
                self.relate(
                    TypeMatchKind::Conversion,
                    a.clone(),
                    elements[required[0]].ty.clone(),
                    step,
                );
                return Matched::Solved;
            }
        }

        // Single-element unnamed tuple unwraps to its scalar.
        if kind == TypeMatchKind::Conversion
            && let Type::Tuple { elements } = a
            && elements.len() == 1
            && elements[0].name.is_none()
            && !elements[0].variadic
        {
            self.relate(TypeMatchKind::Conversion, elements[0].ty.clone(), b.clone(), locator);
            return Matched::Solved;
        }

        // Derived-to-base class upcast, walking the superclass chain.
        if kind >= TypeMatchKind::TrivialSubtype
            && let Some(result) = self.try_upcast(a, b, locator)
        {
            return result;
        }

        // Implicit lvalue-to-rvalue load.
        if kind >= TypeMatchKind::Subtype
            && let Type::LValue { object, .. } = a
        {
            let step = self.step_locator(locator, PathStep::Load);
            self.relate(kind, (**object).clone(), b.clone(), step);
            return Matched::Solved;
        }

        // Autoclosure wrapping: a value where `@autoclosure () -> T` is
        // expected converts to the result type.
        if kind == TypeMatchKind::Conversion
            && let Type::Fn {
                input,
                output,
                flags,
            } = b
            && flags.autoclosure
            && input.is_unit()
        {
            let step = self.step_locator(locator, PathStep::FnResult);
            self.relate(TypeMatchKind::Conversion, a.clone(), (**output).clone(), step);
            return Matched::Solved;
        }

        // Existential erasure: the source must conform to every constituent.
        if kind >= TypeMatchKind::Subtype
            && let Type::Existential { protocols } = b
        {
            for proto in protocols {
                if !self.ctx.conforms_to(a, proto.decl) {
                    return Matched::Failed(self.failure(
                        FailureKind::DoesNotConform(proto.decl),
                        a,
                        b,
                        locator,
                    ));
                }
            }
            return Matched::Solved;
        }

        // Archetypes convert through their superclass bound.
        if kind >= TypeMatchKind::Subtype
            && let Type::Archetype { id, .. } = a
            && let Some(superclass) = self.ctx.decls.archetype(*id).superclass.clone()
        {
            return self.match_types(&superclass, b, kind, locator);
        }

        // User-defined conversion member, tried last: the witness's output is
        // only subtype-checked, which keeps conversion chains bounded.
        if kind == TypeMatchKind::Conversion
            && a.nominal_decl().is_some()
            && !self.ctx.lookup_member(&a.rvalue(), CONVERSION_MEMBER).is_empty()
        {
            let step = self.step_locator(locator, PathStep::ConversionMember);
            let member_var = Type::var(self.fresh_var(true));
            let out_var = Type::var(self.fresh_var(false));
            self.add_constraint(Constraint::Member {
                base: a.clone(),
                name: CONVERSION_MEMBER.to_string(),
                member: member_var.clone(),
                is_type_member: false,
                locator: step,
            });
            self.add_constraint(Constraint::Applicable {
                fn_shape: Type::func(Type::unit(), out_var.clone()),
                callee: member_var,
                locator: step,
            });
            self.relate(TypeMatchKind::Subtype, out_var, b.clone(), locator);
            return Matched::Solved;
        }

        Matched::Failed(self.failure(FailureKind::TypeMismatch, a, b, locator))
    }

    fn try_upcast(&mut self, a: &Type, b: &Type, locator: LocatorId) -> Option<Matched> {
        let target_decl = b.nominal_decl()?;
        if !matches!(self.ctx.decls.decl(target_decl).kind, DeclKind::Class(_)) {
            return None;
        }
        let mut current = self.ctx.decls.superclass_of(a);
        while let Some(superclass) = current {
            if superclass == *b {
                return Some(Matched::Solved);
            }
            if superclass.nominal_decl() == Some(target_decl) {
                // Same class at different generic arguments: arguments must
                // agree exactly.
                let args_a = superclass.generic_args().to_vec();
                let args_b = b.generic_args().to_vec();
                if args_a.len() != args_b.len() {
                    return Some(Matched::Failed(self.failure(
                        FailureKind::TypeMismatch,
                        a,
                        b,
                        locator,
                    )));
                }
                for (index, (arg_a, arg_b)) in args_a.iter().zip(args_b.iter()).enumerate() {
                    let step = self.step_locator(locator, PathStep::GenericArgument(index));
                    self.relate(TypeMatchKind::SameType, arg_a.clone(), arg_b.clone(), step);
                }
                return Some(Matched::Solved);
            }
            current = self.ctx.decls.superclass_of(&superclass);
        }
        None
    }

    fn is_class_type(&self, ty: &Type) -> bool {
        ty.nominal_decl()
            .map(|decl| matches!(self.ctx.decls.decl(decl).kind, DeclKind::Class(_)))
            .unwrap_or(false)
    }
}
