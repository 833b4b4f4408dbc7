//! Protocol conformance checking and witness matching.
//!
//! A conformance check batches every requirement failure in one pass rather
//! than stopping at the first, and its result is memoized per (type,
//! protocol) for the life of the checker context: repeated queries return
//! the identical record.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::core::decls::{DeclId, DeclKind, FuncDecl, VarDecl};
use crate::core::tree::NodeId;
use crate::core::types::{ArchetypeId, Type, TupleElement};

use super::constraints::{Locator, TypeMatchKind};
use super::match_types::Matched;
use super::ranking::at_least_as_specialized;
use super::system::{CheckerContext, ConstraintSystem};

/// A concrete declaration satisfying one protocol requirement, plus the
/// substitutions adapting its signature to the requirement's.
#[derive(Debug, Clone, PartialEq)]
pub struct Witness {
    pub decl: DeclId,
    /// False when parameter names had to be renamed to match; used only for
    /// ranking among viable candidates.
    pub exact: bool,
    /// True when the witness is the protocol's own default implementation.
    pub from_default: bool,
    pub substitutions: Vec<(ArchetypeId, Type)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conformance {
    pub protocol: DeclId,
    pub witnesses: HashMap<DeclId, Witness>,
    pub assoc_bindings: HashMap<DeclId, Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConformanceFailure {
    /// The type never declares the conformance.
    NotDeclared,
    MissingWitness { requirement: DeclId },
    AmbiguousWitness { requirement: DeclId },
    ConflictingAssociatedType { assoc: DeclId, first: Type, second: Type },
    UndeducedAssociatedType { assoc: DeclId },
}

#[derive(Debug, PartialEq)]
pub enum ConformanceCheck {
    Conforms(Conformance),
    Fails(Vec<ConformanceFailure>),
}

impl ConformanceCheck {
    pub fn conforms(&self) -> bool {
        matches!(self, ConformanceCheck::Conforms(_))
    }
}

/// Owned memoization state; single writer through the checker context.
#[derive(Debug, Default)]
pub struct ConformanceCache {
    records: HashMap<(Type, DeclId), Rc<ConformanceCheck>>,
    self_conforming: HashMap<DeclId, bool>,
    in_progress: HashSet<(Type, DeclId)>,
}

impl ConformanceCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'d> CheckerContext<'d> {
    pub fn conforms_to(&mut self, ty: &Type, protocol: DeclId) -> bool {
        self.conformance(ty, protocol).conforms()
    }

    /// Full conformance check with a cached, pointer-stable record.
    pub fn conformance(&mut self, ty: &Type, protocol: DeclId) -> Rc<ConformanceCheck> {
        let ty = ty.rvalue();
        let key = (ty.clone(), protocol);
        if let Some(hit) = self.conformances.records.get(&key) {
            return Rc::clone(hit);
        }
        if self.conformances.in_progress.contains(&key) {
            // Recursive query mid-check: assume success; the outer check
            // settles the final verdict and the cache entry.
            return Rc::new(ConformanceCheck::Conforms(Conformance {
                protocol,
                witnesses: HashMap::new(),
                assoc_bindings: HashMap::new(),
            }));
        }

        let result = match &ty {
            // Archetype conformance is decided by the declared constraint
            // set alone; nothing is derived from members.
            Type::Archetype { id, .. } => {
                let bounds = self.decls.archetype(*id).bounds.clone();
                if self.protocol_closure(&bounds).contains(&protocol) {
                    ConformanceCheck::Conforms(Conformance {
                        protocol,
                        witnesses: HashMap::new(),
                        assoc_bindings: HashMap::new(),
                    })
                } else {
                    ConformanceCheck::Fails(vec![ConformanceFailure::NotDeclared])
                }
            }
            // An existential conforms when the protocol is among its
            // constituents and every constituent self-conforms.
            Type::Existential { protocols } => {
                let constituents: Vec<DeclId> = protocols.iter().map(|p| p.decl).collect();
                let in_closure = self.protocol_closure(&constituents).contains(&protocol);
                let all_self_conform = constituents
                    .iter()
                    .all(|proto| self.self_conforms(*proto));
                if in_closure && all_self_conform {
                    ConformanceCheck::Conforms(Conformance {
                        protocol,
                        witnesses: HashMap::new(),
                        assoc_bindings: HashMap::new(),
                    })
                } else {
                    ConformanceCheck::Fails(vec![ConformanceFailure::NotDeclared])
                }
            }
            Type::Nominal { .. } | Type::BoundGeneric { .. } => {
                if !self.declares_conformance(&ty, protocol) {
                    ConformanceCheck::Fails(vec![ConformanceFailure::NotDeclared])
                } else {
                    self.conformances.in_progress.insert(key.clone());
                    let result = self.check_requirements(&ty, protocol);
                    self.conformances.in_progress.remove(&key);
                    result
                }
            }
            _ => ConformanceCheck::Fails(vec![ConformanceFailure::NotDeclared]),
        };

        let record = Rc::new(result);
        self.conformances
            .records
            .insert(key, Rc::clone(&record));
        record
    }

    /// A protocol self-conforms only when none of its requirements mention
    /// its own placeholder types outside trivial (result) positions, none
    /// are static, and it declares no associated types. Memoized.
    pub fn self_conforms(&mut self, protocol: DeclId) -> bool {
        if let Some(&hit) = self.conformances.self_conforming.get(&protocol) {
            return hit;
        }
        let DeclKind::Protocol(proto) = &self.decls.decl(protocol).kind else {
            return false;
        };
        let mut placeholder_archetypes = vec![proto.self_archetype];
        for assoc in &proto.assoc_types {
            if let DeclKind::AssocType(assoc_decl) = &self.decls.decl(*assoc).kind {
                placeholder_archetypes.push(assoc_decl.archetype);
            }
        }
        let mentions_placeholder = |ty: &Type| {
            ty.any_node(&|t| {
                matches!(t, Type::Archetype { id, .. } if placeholder_archetypes.contains(id))
            })
        };

        let mut result = proto.assoc_types.is_empty();
        if result {
            for requirement in &proto.requirements {
                match &self.decls.decl(*requirement).kind {
                    DeclKind::Func(func) => {
                        if func.is_static
                            || func.params.iter().any(|param| mentions_placeholder(&param.ty))
                        {
                            result = false;
                            break;
                        }
                    }
                    DeclKind::Var(var) => {
                        if var.is_static || mentions_placeholder(&var.ty) {
                            result = false;
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        self.conformances.self_conforming.insert(protocol, result);
        result
    }

    /// Transitive closure over protocol inheritance.
    fn protocol_closure(&self, protocols: &[DeclId]) -> HashSet<DeclId> {
        let mut closure = HashSet::new();
        let mut pending: Vec<DeclId> = protocols.to_vec();
        while let Some(proto) = pending.pop() {
            if !closure.insert(proto) {
                continue;
            }
            if let DeclKind::Protocol(decl) = &self.decls.decl(proto).kind {
                pending.extend(decl.inherited.iter().copied());
            }
        }
        closure
    }

    /// Declared conformances of a nominal type, through its superclass
    /// chain, closed over protocol inheritance.
    fn declares_conformance(&self, ty: &Type, protocol: DeclId) -> bool {
        let mut declared = Vec::new();
        let mut current = Some(ty.clone());
        while let Some(current_ty) = current {
            if let Some(decl) = current_ty.nominal_decl() {
                declared.extend(self.decls.conformances_of(decl).iter().copied());
            }
            current = self.decls.superclass_of(&current_ty);
        }
        self.protocol_closure(&declared).contains(&protocol)
    }

    fn check_requirements(&mut self, ty: &Type, protocol: DeclId) -> ConformanceCheck {
        let DeclKind::Protocol(proto) = &self.decls.decl(protocol).kind else {
            return ConformanceCheck::Fails(vec![ConformanceFailure::NotDeclared]);
        };
        let self_archetype = proto.self_archetype;
        let requirements = proto.requirements.clone();
        let assoc_types = proto.assoc_types.clone();

        let mut failures = Vec::new();
        let mut witnesses = HashMap::new();
        let mut assoc_bindings: HashMap<DeclId, Type> = HashMap::new();

        // Explicit same-named member types resolve associated types first. A
        // projection onto the conforming type's own generic parameter is a
        // legitimate binding (`Array.Element` witnesses `ArrayLiteral.Element`).
        for assoc in &assoc_types {
            let name = self.decls.decl(*assoc).name.clone();
            let projections = self.decls.lookup_member_type(ty, &name);
            if let Some(projected) = projections.first() {
                assoc_bindings.insert(*assoc, projected.clone());
            }
        }

        for requirement in requirements {
            match self.decls.decl(requirement).kind.clone() {
                DeclKind::Func(req_func) => {
                    self.check_func_requirement(
                        ty,
                        protocol,
                        requirement,
                        &req_func,
                        self_archetype,
                        &assoc_types,
                        &mut assoc_bindings,
                        &mut witnesses,
                        &mut failures,
                    );
                }
                DeclKind::Var(req_var) => {
                    self.check_var_requirement(
                        ty,
                        requirement,
                        &req_var,
                        self_archetype,
                        &assoc_types,
                        &mut assoc_bindings,
                        &mut witnesses,
                        &mut failures,
                    );
                }
                _ => {}
            }
        }

        for assoc in &assoc_types {
            if !assoc_bindings.contains_key(assoc) {
                failures.push(ConformanceFailure::UndeducedAssociatedType { assoc: *assoc });
            }
        }

        if failures.is_empty() {
            ConformanceCheck::Conforms(Conformance {
                protocol,
                witnesses,
                assoc_bindings,
            })
        } else {
            ConformanceCheck::Fails(failures)
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_func_requirement(
        &mut self,
        ty: &Type,
        protocol: DeclId,
        requirement: DeclId,
        req_func: &FuncDecl,
        self_archetype: ArchetypeId,
        assoc_types: &[DeclId],
        assoc_bindings: &mut HashMap<DeclId, Type>,
        witnesses: &mut HashMap<DeclId, Witness>,
        failures: &mut Vec<ConformanceFailure>,
    ) {
        let _ = protocol;
        let name = self.decls.decl(requirement).name.clone();
        let candidates: Vec<DeclId> = self
            .decls
            .lookup_member(ty, &name)
            .into_iter()
            .filter(|candidate| {
                matches!(
                    &self.decls.decl(*candidate).kind,
                    DeclKind::Func(func)
                        if func.is_static == req_func.is_static
                            && func.fixity == req_func.fixity
                            && !func.is_requirement
                )
            })
            .collect();

        let mut viable: Vec<(Witness, HashMap<DeclId, Type>)> = Vec::new();
        for candidate in candidates {
            if let Some(matched) = self.match_witness(
                ty,
                req_func,
                candidate,
                self_archetype,
                assoc_types,
                assoc_bindings,
            ) {
                viable.push(matched);
            }
        }

        // A protocol default is always worse than a concrete witness; it
        // only applies when nothing concrete matched.
        if viable.is_empty() && req_func.has_default_impl {
            viable.push((
                Witness {
                    decl: requirement,
                    exact: true,
                    from_default: true,
                    substitutions: Vec::new(),
                },
                HashMap::new(),
            ));
        }

        match select_best(self, viable) {
            Selection::None => failures.push(ConformanceFailure::MissingWitness { requirement }),
            Selection::Ambiguous => {
                failures.push(ConformanceFailure::AmbiguousWitness { requirement });
            }
            Selection::Unique(witness, deduced) => {
                for (assoc, deduced_ty) in deduced {
                    match assoc_bindings.get(&assoc) {
                        Some(existing) if *existing != deduced_ty => {
                            failures.push(ConformanceFailure::ConflictingAssociatedType {
                                assoc,
                                first: existing.clone(),
                                second: deduced_ty,
                            });
                        }
                        Some(_) => {}
                        None => {
                            assoc_bindings.insert(assoc, deduced_ty);
                        }
                    }
                }
                witnesses.insert(requirement, witness);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_var_requirement(
        &mut self,
        ty: &Type,
        requirement: DeclId,
        req_var: &VarDecl,
        self_archetype: ArchetypeId,
        assoc_types: &[DeclId],
        assoc_bindings: &mut HashMap<DeclId, Type>,
        witnesses: &mut HashMap<DeclId, Witness>,
        failures: &mut Vec<ConformanceFailure>,
    ) {
        let name = self.decls.decl(requirement).name.clone();
        let candidates: Vec<(DeclId, Type)> = self
            .decls
            .lookup_member(ty, &name)
            .into_iter()
            .filter_map(|candidate| match &self.decls.decl(candidate).kind {
                DeclKind::Var(var)
                    if var.is_static == req_var.is_static
                        && !var.is_requirement
                        && (var.settable || !req_var.settable) =>
                {
                    Some((candidate, var.ty.clone()))
                }
                _ => None,
            })
            .collect();

        let mut viable: Vec<(Witness, HashMap<DeclId, Type>)> = Vec::new();
        for (candidate, candidate_ty) in candidates {
            let candidate_ty = self.decls.substitute_generic_args(ty, candidate_ty);
            let mut deduced = HashMap::new();
            let (req_ty, assoc_vars, mut system) = {
                let mut system = NestedSystem::new(self);
                let req_ty = system.open_requirement_type(
                    &req_var.ty,
                    ty,
                    self_archetype,
                    assoc_types,
                    assoc_bindings,
                );
                let assoc_vars = system.assoc_vars.clone();
                (req_ty, assoc_vars, system)
            };
            if system.unify_exact(&req_ty, &candidate_ty) {
                let ok = system.read_deductions(&assoc_vars, &mut deduced);
                if ok {
                    viable.push((
                        Witness {
                            decl: candidate,
                            exact: true,
                            from_default: false,
                            substitutions: Vec::new(),
                        },
                        deduced,
                    ));
                }
            }
        }

        match select_best(self, viable) {
            Selection::None => failures.push(ConformanceFailure::MissingWitness { requirement }),
            Selection::Ambiguous => {
                failures.push(ConformanceFailure::AmbiguousWitness { requirement });
            }
            Selection::Unique(witness, deduced) => {
                for (assoc, deduced_ty) in deduced {
                    match assoc_bindings.get(&assoc) {
                        Some(existing) if *existing != deduced_ty => {
                            failures.push(ConformanceFailure::ConflictingAssociatedType {
                                assoc,
                                first: existing.clone(),
                                second: deduced_ty,
                            });
                        }
                        Some(_) => {}
                        None => {
                            assoc_bindings.insert(assoc, deduced_ty);
                        }
                    }
                }
                witnesses.insert(requirement, witness);
            }
        }
    }

    /// Matches one candidate against a function requirement: kinds, static
    /// ness, and fixity must agree exactly; signatures unify with `Self` and
    /// undeduced associated types opened to fresh variables; parameter-name
    /// mismatches downgrade the match instead of rejecting it; result types
    /// unify exactly.
    fn match_witness(
        &mut self,
        ty: &Type,
        req_func: &FuncDecl,
        candidate: DeclId,
        self_archetype: ArchetypeId,
        assoc_types: &[DeclId],
        assoc_bindings: &HashMap<DeclId, Type>,
    ) -> Option<(Witness, HashMap<DeclId, Type>)> {
        let DeclKind::Func(candidate_func) = self.decls.decl(candidate).kind.clone() else {
            return None;
        };
        if candidate_func.params.len() != req_func.params.len() {
            return None;
        }

        let mut system = NestedSystem::new(self);

        let req_input = system.open_requirement_type(
            &Type::tuple(req_func.params.clone()),
            ty,
            self_archetype,
            assoc_types,
            assoc_bindings,
        );
        let req_ret = system.open_requirement_type(
            &req_func.ret,
            ty,
            self_archetype,
            assoc_types,
            assoc_bindings,
        );
        let assoc_vars = system.assoc_vars.clone();

        // Open the candidate: substitute the owner's generic arguments, then
        // the candidate's own generic parameters become fresh variables.
        let mut candidate_input = system
            .system
            .ctx
            .decls
            .substitute_generic_args(ty, Type::tuple(candidate_func.params.clone()));
        let mut candidate_ret = system
            .system
            .ctx
            .decls
            .substitute_generic_args(ty, candidate_func.ret.clone());
        let mut generic_subst: HashMap<ArchetypeId, Type> = HashMap::new();
        let mut generic_vars: Vec<(ArchetypeId, Type)> = Vec::new();
        for archetype in candidate_func.generics.archetypes() {
            let var = Type::var(system.system.fresh_var(false));
            generic_subst.insert(archetype, var.clone());
            generic_vars.push((archetype, var));
        }
        if !generic_subst.is_empty() {
            candidate_input = candidate_input.substitute_archetypes(&generic_subst);
            candidate_ret = candidate_ret.substitute_archetypes(&generic_subst);
        }

        // Parameter names are tolerated but penalize the match.
        let mut exact = true;
        let (Type::Tuple { elements: req_params }, Type::Tuple { elements: wit_params }) =
            (&req_input, &candidate_input)
        else {
            return None;
        };
        for (req_param, wit_param) in req_params.iter().zip(wit_params.iter()) {
            if req_param.name != wit_param.name {
                exact = false;
            }
            if req_param.variadic != wit_param.variadic {
                return None;
            }
        }
        let strip = |elements: &[TupleElement]| {
            Type::tuple(
                elements
                    .iter()
                    .map(|elem| TupleElement {
                        name: None,
                        ty: elem.ty.clone(),
                        variadic: elem.variadic,
                        has_default: elem.has_default,
                    })
                    .collect(),
            )
        };
        let req_stripped = strip(req_params);
        let wit_stripped = strip(wit_params);

        if !system.unify_exact(&req_stripped, &wit_stripped) {
            return None;
        }
        // Result types must unify exactly; no covariant widening.
        if !system.unify_exact(&req_ret, &candidate_ret) {
            return None;
        }

        let mut deduced = HashMap::new();
        if !system.read_deductions(&assoc_vars, &mut deduced) {
            return None;
        }
        let substitutions: Vec<(ArchetypeId, Type)> = generic_vars
            .into_iter()
            .map(|(archetype, var)| (archetype, system.system.state.vars.apply(&var)))
            .collect();

        Some((
            Witness {
                decl: candidate,
                exact,
                from_default: false,
                substitutions,
            },
            deduced,
        ))
    }
}

enum Selection {
    None,
    Unique(Witness, HashMap<DeclId, Type>),
    Ambiguous,
}

/// Ranks viable witnesses: concrete beats protocol default, exact beats
/// renamed, then declaration specificity; a non-unique best is ambiguous.
fn select_best(
    ctx: &mut CheckerContext,
    mut viable: Vec<(Witness, HashMap<DeclId, Type>)>,
) -> Selection {
    if viable.is_empty() {
        return Selection::None;
    }
    if viable.iter().any(|(witness, _)| !witness.from_default) {
        viable.retain(|(witness, _)| !witness.from_default);
    }
    if viable.iter().any(|(witness, _)| witness.exact) {
        viable.retain(|(witness, _)| witness.exact);
    }
    if viable.len() == 1 {
        let (witness, deduced) = viable.pop().expect("one viable");
        return Selection::Unique(witness, deduced);
    }

    let mut best: Option<usize> = None;
    for index in 0..viable.len() {
        let beats_all = (0..viable.len()).filter(|j| *j != index).all(|j| {
            at_least_as_specialized(ctx, viable[index].0.decl, viable[j].0.decl)
                && !at_least_as_specialized(ctx, viable[j].0.decl, viable[index].0.decl)
        });
        if beats_all {
            best = Some(index);
            break;
        }
    }
    match best {
        Some(index) => {
            let (witness, deduced) = viable.swap_remove(index);
            Selection::Unique(witness, deduced)
        }
        None => Selection::Ambiguous,
    }
}

/// A nested, single-purpose constraint system for witness signature
/// unification.
struct NestedSystem<'c, 'd> {
    system: ConstraintSystem<'c, 'd>,
    assoc_vars: Vec<(DeclId, Type)>,
}

impl<'c, 'd> NestedSystem<'c, 'd> {
    fn new(ctx: &'c mut CheckerContext<'d>) -> Self {
        NestedSystem {
            system: ConstraintSystem::new(ctx),
            assoc_vars: Vec::new(),
        }
    }

    /// Substitutes `Self` with the conforming type and associated types with
    /// their known bindings or fresh deduction variables.
    fn open_requirement_type(
        &mut self,
        ty: &Type,
        conforming: &Type,
        self_archetype: ArchetypeId,
        assoc_types: &[DeclId],
        assoc_bindings: &HashMap<DeclId, Type>,
    ) -> Type {
        let mut subst: HashMap<ArchetypeId, Type> = HashMap::new();
        subst.insert(self_archetype, conforming.clone());
        for assoc in assoc_types {
            let DeclKind::AssocType(assoc_decl) = &self.system.ctx.decls.decl(*assoc).kind else {
                continue;
            };
            let archetype = assoc_decl.archetype;
            let replacement = match assoc_bindings.get(assoc) {
                Some(bound) => bound.clone(),
                None => {
                    let existing = self
                        .assoc_vars
                        .iter()
                        .find(|(id, _)| id == assoc)
                        .map(|(_, var)| var.clone());
                    match existing {
                        Some(var) => var,
                        None => {
                            let var = Type::var(self.system.fresh_var(false));
                            self.assoc_vars.push((*assoc, var.clone()));
                            var
                        }
                    }
                }
            };
            subst.insert(archetype, replacement);
        }
        ty.substitute_archetypes(&subst)
    }

    /// Exact unification: drives the simplifier to a fixpoint and accepts
    /// only a fully-solved system.
    fn unify_exact(&mut self, a: &Type, b: &Type) -> bool {
        let locator = self
            .system
            .intern(Locator::new(NodeId::synthetic(u32::MAX)));
        match self.system.match_types(a, b, TypeMatchKind::SameType, locator) {
            Matched::Failed(_) => return false,
            Matched::Unsolved => return false,
            _ => {}
        }
        loop {
            let mut progressed = false;
            let mut pending = std::mem::take(&mut self.system.state.worklist);
            while let Some(constraint) = pending.pop_front() {
                match super::solver::simplify(&mut self.system, constraint.clone()) {
                    Matched::Solved | Matched::TriviallySolved => progressed = true,
                    Matched::Unsolved => self.system.state.worklist.push_back(constraint),
                    Matched::Failed(_) => return false,
                }
            }
            if self.system.state.worklist.is_empty() {
                return true;
            }
            if !progressed {
                return false;
            }
        }
    }

    /// Reads associated-type deductions out of the solved system; a
    /// deduction that is still a variable is simply absent, one that is only
    /// partially resolved rejects the match.
    fn read_deductions(
        &mut self,
        assoc_vars: &[(DeclId, Type)],
        deduced: &mut HashMap<DeclId, Type>,
    ) -> bool {
        for (assoc, var) in assoc_vars {
            let resolved = self.system.state.vars.apply(var);
            if matches!(resolved, Type::Var(_)) {
                continue;
            }
            if resolved.contains_type_vars() {
                return false;
            }
            deduced.insert(*assoc, resolved);
        }
        true
    }
}
