//! Constraint system bookkeeping: the owned checker context, the per
//! expression solver state, reference typing, and overload-set resolution.

use std::collections::{HashMap, VecDeque};

use crate::core::decls::{DeclId, DeclKind, DeclTable, Prelude};
use crate::core::resolve::DeclRef;
use crate::core::tree::NodeId;
use crate::core::types::{ArchetypeId, LValueQualifiers, Type, TypeVarId};

use super::conformance::ConformanceCache;
use super::constraints::{
    Constraint, Locator, LocatorId, LocatorTable, OverloadChoice, OverloadSet, PathStep,
    TypeMatchKind,
};
use super::errors::Failure;
use super::type_vars::TypeVarStore;

/// Checker-wide collaborator handles and the caches the checker owns.
///
/// The caches are written only through `&mut self`; sharing across parallel
/// solvers would need each its own context or outer synchronization.
pub struct CheckerContext<'d> {
    pub decls: &'d DeclTable,
    pub prelude: &'d Prelude,
    pub refs: &'d HashMap<NodeId, DeclRef>,
    pub conformances: ConformanceCache,
    member_cache: HashMap<(Type, String), Vec<DeclId>>,
    member_type_cache: HashMap<(Type, String), Vec<Type>>,
    ctor_cache: HashMap<Type, Vec<DeclId>>,
    /// Types of locals solved by earlier statements of the same body.
    pub local_types: HashMap<DeclId, Type>,
}

impl<'d> CheckerContext<'d> {
    pub fn new(
        decls: &'d DeclTable,
        prelude: &'d Prelude,
        refs: &'d HashMap<NodeId, DeclRef>,
    ) -> Self {
        CheckerContext {
            decls,
            prelude,
            refs,
            conformances: ConformanceCache::new(),
            member_cache: HashMap::new(),
            member_type_cache: HashMap::new(),
            ctor_cache: HashMap::new(),
            local_types: HashMap::new(),
        }
    }

    /// Cached qualified member lookup; idempotent per `(type, name)`.
    pub fn lookup_member(&mut self, base: &Type, name: &str) -> Vec<DeclId> {
        let key = (base.clone(), name.to_string());
        if let Some(hit) = self.member_cache.get(&key) {
            return hit.clone();
        }
        let result = self.decls.lookup_member(base, name);
        self.member_cache.insert(key, result.clone());
        result
    }

    pub fn lookup_member_type(&mut self, base: &Type, name: &str) -> Vec<Type> {
        let key = (base.clone(), name.to_string());
        if let Some(hit) = self.member_type_cache.get(&key) {
            return hit.clone();
        }
        let result = self.decls.lookup_member_type(base, name);
        self.member_type_cache.insert(key, result.clone());
        result
    }

    pub fn lookup_constructors(&mut self, base: &Type) -> Vec<DeclId> {
        if let Some(hit) = self.ctor_cache.get(base) {
            return hit.clone();
        }
        let result = self.decls.lookup_constructors(base);
        self.ctor_cache.insert(base.clone(), result.clone());
        result
    }
}

/// Clonable solving state; the fork search snapshots and restores these.
#[derive(Debug, Clone, Default)]
pub struct SolverState {
    pub vars: TypeVarStore,
    pub worklist: VecDeque<Constraint>,
    pub unresolved_sets: Vec<OverloadSet>,
    /// Disjunctions awaiting a fork, each a set of alternative bundles.
    pub disjunctions: Vec<(Vec<Vec<Constraint>>, LocatorId)>,
    pub choices: HashMap<LocatorId, OverloadChoice>,
    /// Accumulated fixed-score penalties (literal defaulting misses etc.).
    pub score: u32,
    /// Advancement metric used to pick the most specific failure when every
    /// fork dies.
    pub progress: u32,
}

/// One per-expression constraint system: generation writes constraints and
/// node types into it, the solver consumes them.
pub struct ConstraintSystem<'c, 'd> {
    pub ctx: &'c mut CheckerContext<'d>,
    pub locators: LocatorTable,
    pub node_types: HashMap<NodeId, Type>,
    pub node_spans: HashMap<NodeId, crate::core::diag::Span>,
    /// Opened generic reference types per (locator, decl), so re-resolving
    /// the same overload choice is idempotent.
    opened: HashMap<(LocatorId, DeclId), Type>,
    /// Per-expression type overrides for closure parameters and other
    /// bindings whose declared type is still being inferred.
    pub local_overrides: HashMap<DeclId, Type>,
    pub state: SolverState,
}

impl<'c, 'd> ConstraintSystem<'c, 'd> {
    pub fn new(ctx: &'c mut CheckerContext<'d>) -> Self {
        ConstraintSystem {
            ctx,
            locators: LocatorTable::default(),
            node_types: HashMap::new(),
            node_spans: HashMap::new(),
            opened: HashMap::new(),
            local_overrides: HashMap::new(),
            state: SolverState::default(),
        }
    }

    pub fn fresh_var(&mut self, can_bind_lvalue: bool) -> TypeVarId {
        self.state.vars.fresh(can_bind_lvalue)
    }

    pub fn intern(&mut self, locator: Locator) -> LocatorId {
        self.locators.intern(locator)
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.state.worklist.push_back(constraint);
    }

    pub fn relate(&mut self, kind: TypeMatchKind, first: Type, second: Type, locator: LocatorId) {
        self.add_constraint(Constraint::Relate {
            kind,
            first,
            second,
            locator,
        });
    }

    /// Registers an overload set. Sets with fewer than two choices resolve
    /// immediately; everything else defers to the global search.
    pub fn add_overload_set(&mut self, set: OverloadSet) -> Option<Failure> {
        match set.choices.len() {
            0 => None, // callers report the empty case themselves
            1 => {
                self.resolve_overload(&set, 0);
                None
            }
            _ => {
                self.state.unresolved_sets.push(set);
                None
            }
        }
    }

    /// Resolves choice `index` of a set by binding the set's type variable to
    /// the choice's reference type, bundled with the choice's side effects.
    /// Re-resolving the same index produces identical constraints.
    pub fn resolve_overload(&mut self, set: &OverloadSet, index: usize) {
        let choice = set.choices[index].clone();
        let bound = Type::var(set.bound_var);
        let mut bundle = Vec::new();
        match &choice {
            OverloadChoice::Decl { decl, base } | OverloadChoice::DeclViaDynamic { decl, base } => {
                let reference_ty = match base {
                    Some(base) => {
                        self.type_of_member_reference(*decl, base, set.locator, &mut bundle)
                    }
                    None => Some(self.type_of_reference(*decl, set.locator, &mut bundle)),
                };
                if let Some(reference_ty) = reference_ty {
                    bundle.insert(
                        0,
                        Constraint::Relate {
                            kind: TypeMatchKind::Bind,
                            first: bound.clone(),
                            second: reference_ty,
                            locator: set.locator,
                        },
                    );
                }
            }
            OverloadChoice::BaseType { base } => {
                bundle.push(Constraint::Relate {
                    kind: TypeMatchKind::Bind,
                    first: bound.clone(),
                    second: base.clone(),
                    locator: set.locator,
                });
            }
            OverloadChoice::TupleIndex { base, index } => {
                if let Some(element_ty) = tuple_index_type(base, *index) {
                    bundle.push(Constraint::Relate {
                        kind: TypeMatchKind::Bind,
                        first: bound.clone(),
                        second: element_ty,
                        locator: set.locator,
                    });
                }
            }
            OverloadChoice::IdentityFunction => {
                let param = Type::var(self.fresh_var(false));
                let identity = Type::func(
                    Type::tuple(vec![crate::core::types::TupleElement::unnamed(
                        param.clone(),
                    )]),
                    param,
                );
                bundle.push(Constraint::Relate {
                    kind: TypeMatchKind::Bind,
                    first: bound.clone(),
                    second: identity,
                    locator: set.locator,
                });
            }
        }
        self.state.choices.insert(set.locator, choice);
        self.state.progress += 1;
        self.add_constraint(Constraint::Conjunction {
            constraints: bundle,
            locator: set.locator,
        });
    }

    /// The type a bare declaration reference takes on, with generic
    /// signatures opened to fresh type variables. Side constraints for the
    /// opened bounds land in `side_constraints`.
    pub fn type_of_reference(
        &mut self,
        decl: DeclId,
        locator: LocatorId,
        side_constraints: &mut Vec<Constraint>,
    ) -> Type {
        match &self.ctx.decls.decl(decl).kind {
            DeclKind::Func(func) => {
                let fn_ty = func.fn_type();
                if func.generics.is_empty() {
                    fn_ty
                } else {
                    let generics: Vec<ArchetypeId> = func.generics.archetypes().collect();
                    self.open_generic(fn_ty, &generics, decl, locator, side_constraints)
                }
            }
            DeclKind::Var(var) => {
                let ty = self
                    .local_overrides
                    .get(&decl)
                    .cloned()
                    .or_else(|| self.ctx.local_types.get(&decl).cloned())
                    .unwrap_or_else(|| var.ty.clone());
                if var.settable {
                    Type::lvalue(ty, LValueQualifiers::implicit_settable())
                } else {
                    ty
                }
            }
            DeclKind::Struct(_) | DeclKind::Class(_) | DeclKind::Enum(_) => {
                let declared = self.ctx.decls.declared_type(decl);
                let generics: Vec<ArchetypeId> = self
                    .ctx
                    .decls
                    .generics_of(decl)
                    .map(|sig| sig.archetypes().collect())
                    .unwrap_or_default();
                let opened = if generics.is_empty() {
                    declared
                } else {
                    self.open_generic(declared, &generics, decl, locator, side_constraints)
                };
                Type::metatype(opened)
            }
            DeclKind::Protocol(_) | DeclKind::TypeAlias(_) => {
                Type::metatype(self.ctx.decls.declared_type(decl))
            }
            _ => Type::Error,
        }
    }

    /// Cheap viability filter for a member candidate through a base; used to
    /// prune infeasible choices before they enter an overload set, without
    /// the side effects of computing the full reference type.
    pub fn member_viable(&self, decl: DeclId, base: &Type) -> bool {
        let through_metatype = matches!(base.rvalue(), Type::Metatype { .. });
        match &self.ctx.decls.decl(decl).kind {
            DeclKind::Func(func) => func.is_static == through_metatype,
            DeclKind::Var(var) => var.is_static == through_metatype,
            DeclKind::EnumCase(_) | DeclKind::Constructor(_) => through_metatype,
            _ => false,
        }
    }

    /// The type of `base.member` for one candidate declaration, or `None`
    /// when the candidate is not viable through this base (a static member
    /// through an instance, say). Handles self-stripping, generic
    /// substitution from the base, and lvalue wrapping for settable members.
    pub fn type_of_member_reference(
        &mut self,
        decl: DeclId,
        base: &Type,
        locator: LocatorId,
        side_constraints: &mut Vec<Constraint>,
    ) -> Option<Type> {
        let base_rvalue = base.rvalue();
        let through_metatype = matches!(base_rvalue, Type::Metatype { .. });
        let instance_ty = match &base_rvalue {
            Type::Metatype { instance } => (**instance).clone(),
            other => other.clone(),
        };

        match &self.ctx.decls.decl(decl).kind {
            DeclKind::Func(func) => {
                if func.is_static != through_metatype {
                    return None;
                }
                let mut fn_ty = func.fn_type();
                fn_ty = self.substitute_self_and_base(decl, fn_ty, &instance_ty);
                if !func.generics.is_empty() {
                    let generics: Vec<ArchetypeId> = func.generics.archetypes().collect();
                    fn_ty = self.open_generic(fn_ty, &generics, decl, locator, side_constraints);
                }
                Some(fn_ty)
            }
            DeclKind::Var(var) => {
                if var.is_static != through_metatype {
                    return None;
                }
                let ty = self.substitute_self_and_base(decl, var.ty.clone(), &instance_ty);
                let base_settable = matches!(
                    base,
                    Type::LValue { qualifiers, .. } if qualifiers.settable
                );
                if var.settable && (base_settable || through_metatype) {
                    Some(Type::lvalue(ty, LValueQualifiers::implicit_settable()))
                } else {
                    Some(ty)
                }
            }
            DeclKind::EnumCase(case) => {
                if !through_metatype {
                    return None;
                }
                let owner_ty = self.ctx.decls.declared_type(case.owner);
                let owner_ty = align_instance(owner_ty, &instance_ty);
                if case.payload.is_empty() {
                    Some(owner_ty)
                } else {
                    let params = case
                        .payload
                        .iter()
                        .map(|ty| {
                            crate::core::types::TupleElement::unnamed(
                                self.ctx
                                    .decls
                                    .substitute_generic_args(&owner_ty, ty.clone()),
                            )
                        })
                        .collect();
                    Some(Type::func(Type::tuple(params), owner_ty))
                }
            }
            DeclKind::Constructor(ctor) => {
                if !through_metatype {
                    return None;
                }
                let owner_ty = align_instance(self.ctx.decls.declared_type(ctor.owner), &instance_ty);
                let params: Vec<crate::core::types::TupleElement> = ctor
                    .params
                    .iter()
                    .map(|param| crate::core::types::TupleElement {
                        name: param.name.clone(),
                        ty: self
                            .ctx
                            .decls
                            .substitute_generic_args(&instance_ty, param.ty.clone()),
                        variadic: param.variadic,
                        has_default: param.has_default,
                    })
                    .collect();
                Some(Type::func(Type::tuple(params), instance_ty))
            }
            _ => None,
        }
    }

    /// Substitutes the owner's generic arguments and, for protocol members,
    /// the protocol's `Self` archetype with the concrete base.
    fn substitute_self_and_base(&self, member: DeclId, ty: Type, instance: &Type) -> Type {
        let mut ty = self.ctx.decls.substitute_generic_args(instance, ty);
        let owner = match &self.ctx.decls.decl(member).kind {
            DeclKind::Func(func) => func.owner,
            DeclKind::Var(var) => var.owner,
            _ => None,
        };
        if let Some(owner) = owner
            && let DeclKind::Protocol(proto) = &self.ctx.decls.decl(owner).kind
        {
            let mut subst = HashMap::new();
            subst.insert(proto.self_archetype, instance.clone());
            for assoc in &proto.assoc_types {
                if let DeclKind::AssocType(assoc_decl) = &self.ctx.decls.decl(*assoc).kind {
                    let projections = self
                        .ctx
                        .decls
                        .lookup_member_type(instance, &self.ctx.decls.decl(*assoc).name);
                    if let Some(projected) = projections.first() {
                        subst.insert(assoc_decl.archetype, projected.clone());
                    }
                }
            }
            ty = ty.substitute_archetypes(&subst);
        }
        ty
    }

    /// Replaces the given archetypes with fresh type variables, emitting
    /// conformance/superclass constraints for their bounds. Cached per
    /// (locator, decl) so repeated openings are bit-identical.
    pub fn open_generic(
        &mut self,
        ty: Type,
        archetypes: &[ArchetypeId],
        decl: DeclId,
        locator: LocatorId,
        side_constraints: &mut Vec<Constraint>,
    ) -> Type {
        if let Some(opened) = self.opened.get(&(locator, decl)) {
            return opened.clone();
        }
        let mut subst: HashMap<ArchetypeId, Type> = HashMap::new();
        for (index, &archetype) in archetypes.iter().enumerate() {
            let var = Type::var(self.fresh_var(false));
            let info = self.ctx.decls.archetype(archetype);
            let bounds = info.bounds.clone();
            let superclass = info.superclass.clone();
            let appended = self
                .locators
                .get(locator)
                .appending(PathStep::GenericArgument(index));
            let step_locator = self.locators.intern(appended);
            for bound in bounds {
                side_constraints.push(Constraint::ConformsTo {
                    ty: var.clone(),
                    protocol: bound,
                    locator: step_locator,
                });
            }
            if let Some(superclass) = superclass {
                side_constraints.push(Constraint::Relate {
                    kind: TypeMatchKind::Subtype,
                    first: var.clone(),
                    second: superclass,
                    locator: step_locator,
                });
            }
            subst.insert(archetype, var);
        }
        let opened = ty.substitute_archetypes(&subst);
        self.opened.insert((locator, decl), opened.clone());
        opened
    }

    /// Current concrete form of a type under the active bindings.
    pub fn resolve(&mut self, ty: &Type) -> Type {
        self.state.vars.fixed_type_recursive(ty)
    }
}

fn tuple_index_type(base: &Type, index: usize) -> Option<Type> {
    let object = base.rvalue();
    let elements = object.tuple_elements()?;
    let element = elements.get(index)?;
    if base.is_lvalue() {
        Some(Type::lvalue(
            element.ty.clone(),
            LValueQualifiers::implicit_settable(),
        ))
    } else {
        Some(element.ty.clone())
    }
}

/// Keeps a declared owner type aligned with an already-specialized instance
/// type (`Optional<Int>.some` constructs `Optional<Int>`, not the unbound
/// declared form).
fn align_instance(declared: Type, instance: &Type) -> Type {
    match (&declared, instance) {
        (Type::BoundGeneric { decl: a, .. }, Type::BoundGeneric { decl: b, .. }) if a == b => {
            instance.clone()
        }
        _ => declared,
    }
}
