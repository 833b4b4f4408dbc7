//! Pass 1 of name binding: collect declarations and resolve signature types.

use std::collections::HashMap;

use crate::core::decls::{
    AssocTypeDecl, ClassDecl, CtorDecl, DeclId, DeclKind, DeclTable, EnumCaseDecl, FuncDecl,
    GenericParam, GenericSig, NominalDecl, Prelude, ProtocolDecl, VarDecl,
};
use crate::core::tree::{
    Block, FuncItem, GenericParamSyntax, Item, ItemKind, Module, ParamSyntax, PatternKind,
    TypeExpr, TypeExprKind,
};
use crate::core::types::{ArchetypeId, ProtocolRef, TupleElement, Type};

use super::errors::{ResolveError, ResolveErrorKind};

#[derive(Debug, Default)]
pub(super) struct Collected {
    pub(super) types_by_name: HashMap<String, DeclId>,
    pub(super) funcs_by_name: HashMap<String, Vec<DeclId>>,
    pub(super) vars_by_name: HashMap<String, DeclId>,
    /// Bodies (top-level funcs, methods, constructors) to bind and check.
    pub(super) bodies: Vec<(DeclId, Block)>,
    /// Parameter variable declarations per callable, in order.
    pub(super) param_decls: HashMap<DeclId, Vec<(String, DeclId)>>,
    /// Type-name scope per callable, for resolving annotations in bodies.
    pub(super) scopes: HashMap<DeclId, TypeScope>,
}

/// Type names visible while resolving one signature.
#[derive(Debug, Clone, Default)]
pub(super) struct TypeScope {
    pub(super) generic_params: Vec<(String, ArchetypeId)>,
    pub(super) self_type: Option<Type>,
}

impl TypeScope {
    fn with_params(mut self, params: &[(String, ArchetypeId)]) -> Self {
        self.generic_params.extend_from_slice(params);
        self
    }
}

pub(super) fn collect_module(
    module: &Module,
    decls: &mut DeclTable,
    prelude: &Prelude,
    errors: &mut Vec<ResolveError>,
) -> Collected {
    let _ = prelude;
    let mut collected = Collected::default();

    // Seed symbol tables with the prelude's declarations.
    let seeded: Vec<(DeclId, String, bool)> = decls
        .decls()
        .map(|decl| {
            let is_type = matches!(
                decl.kind,
                DeclKind::Struct(_)
                    | DeclKind::Class(_)
                    | DeclKind::Enum(_)
                    | DeclKind::Protocol(_)
                    | DeclKind::TypeAlias(_)
            );
            (decl.id, decl.name.clone(), is_type)
        })
        .collect();
    for (id, name, is_type) in seeded {
        if is_type {
            collected.types_by_name.entry(name).or_insert(id);
        } else if matches!(&decls.decl(id).kind, DeclKind::Func(func) if func.owner.is_none()) {
            collected.funcs_by_name.entry(name).or_default().push(id);
        }
    }

    // Shell pass: register module type names before resolving any signature.
    let mut shells: HashMap<crate::core::tree::NodeId, DeclId> = HashMap::new();
    for item in &module.items {
        let (name, kind) = match &item.kind {
            ItemKind::Struct(ty) => (ty.name.clone(), DeclKind::Struct(NominalDecl::default())),
            ItemKind::Class(ty) => (ty.name.clone(), DeclKind::Class(ClassDecl::default())),
            ItemKind::Enum(en) => (en.name.clone(), DeclKind::Enum(NominalDecl::default())),
            ItemKind::Protocol(proto) => {
                let self_archetype = decls.fresh_archetype("Self", Vec::new(), None);
                (
                    proto.name.clone(),
                    DeclKind::Protocol(ProtocolDecl {
                        inherited: Vec::new(),
                        self_archetype,
                        requirements: Vec::new(),
                        assoc_types: Vec::new(),
                        literal_default: None,
                    }),
                )
            }
            _ => continue,
        };
        if collected.types_by_name.contains_key(&name) {
            errors.push(ResolveErrorKind::DuplicateDecl(name.clone()).at(item.span));
            continue;
        }
        let id = decls.add_decl(name.clone(), kind, item.span);
        if let DeclKind::Protocol(proto) = &decls.decl(id).kind {
            let self_archetype = proto.self_archetype;
            decls.archetype_mut(self_archetype).bounds.push(id);
        }
        collected.types_by_name.insert(name, id);
        shells.insert(item.id, id);
    }

    // Fill pass: resolve signatures now that every type name is known.
    for item in &module.items {
        match &item.kind {
            ItemKind::Struct(ty) | ItemKind::Class(ty) => {
                let Some(&id) = shells.get(&item.id) else {
                    continue;
                };
                fill_nominal(ty, id, module, decls, &mut collected, errors);
            }
            ItemKind::Enum(en) => {
                let Some(&id) = shells.get(&item.id) else {
                    continue;
                };
                fill_enum(en, id, decls, &mut collected, errors);
            }
            ItemKind::Protocol(proto) => {
                let Some(&id) = shells.get(&item.id) else {
                    continue;
                };
                fill_protocol(proto, id, decls, &mut collected, errors);
            }
            ItemKind::Func(func) => {
                let id = collect_func(func, None, decls, &mut collected, errors, item.span);
                collected
                    .funcs_by_name
                    .entry(func.name.clone())
                    .or_default()
                    .push(id);
            }
            ItemKind::Var(var) => {
                let scope = TypeScope::default();
                let ty = match &var.ty {
                    Some(type_expr) => {
                        resolve_type(type_expr, &scope, decls, &collected, errors)
                    }
                    None => Type::Error,
                };
                if let PatternKind::Name(name) = &var.pattern.kind {
                    let id = decls.add_decl(
                        name.clone(),
                        DeclKind::Var(VarDecl {
                            owner: None,
                            ty,
                            settable: !var.is_let,
                            is_static: false,
                            is_requirement: false,
                        }),
                        item.span,
                    );
                    collected.vars_by_name.insert(name.clone(), id);
                }
            }
            ItemKind::Init(_) | ItemKind::AssocType(_) => {
                errors.push(ResolveErrorKind::DuplicateDecl("init".into()).at(item.span));
            }
        }
    }

    collected
}

fn collect_generics(
    generics: &[GenericParamSyntax],
    scope: &TypeScope,
    decls: &mut DeclTable,
    collected: &Collected,
    errors: &mut Vec<ResolveError>,
) -> GenericSig {
    // Archetypes are created before bounds resolve so params can reference
    // each other in bound position.
    let mut params = Vec::new();
    for param in generics {
        let archetype = decls.fresh_archetype(param.name.clone(), Vec::new(), None);
        params.push(GenericParam {
            name: param.name.clone(),
            archetype,
        });
    }

    let mut inner_scope = scope.clone();
    for param in &params {
        inner_scope
            .generic_params
            .push((param.name.clone(), param.archetype));
    }

    for (syntax, param) in generics.iter().zip(&params) {
        for bound in &syntax.bounds {
            match resolve_protocol_ref(bound, decls, collected) {
                Some(proto) => decls.archetype_mut(param.archetype).bounds.push(proto),
                None => {
                    if let Some(superclass) =
                        resolve_class_ref(bound, &inner_scope, decls, collected, errors)
                    {
                        decls.archetype_mut(param.archetype).superclass = Some(superclass);
                    } else {
                        errors.push(
                            ResolveErrorKind::NotAProtocol(render_type_expr_name(bound))
                                .at(bound.span),
                        );
                    }
                }
            }
        }
    }

    GenericSig { params }
}

fn collect_params(
    params: &[ParamSyntax],
    scope: &TypeScope,
    decls: &mut DeclTable,
    collected: &Collected,
    errors: &mut Vec<ResolveError>,
) -> Vec<TupleElement> {
    params
        .iter()
        .map(|param| TupleElement {
            name: param.name.clone(),
            ty: resolve_type(&param.ty, scope, decls, collected, errors),
            variadic: param.variadic,
            has_default: param.has_default,
        })
        .collect()
}

fn register_param_decls(
    owner: DeclId,
    params: &[ParamSyntax],
    elements: &[TupleElement],
    prelude_array: Option<(DeclId, &str)>,
    decls: &mut DeclTable,
    collected: &mut Collected,
) {
    let mut param_decls = Vec::new();
    for (param, element) in params.iter().zip(elements) {
        let Some(name) = &param.name else { continue };
        // A variadic parameter binds as an array of its element type.
        let bound_ty = if element.variadic {
            match prelude_array {
                Some((array, array_name)) => {
                    Type::bound_generic(array, array_name, vec![element.ty.clone()])
                }
                None => element.ty.clone(),
            }
        } else {
            element.ty.clone()
        };
        let id = decls.add_decl(
            name.clone(),
            DeclKind::Var(VarDecl {
                owner: None,
                ty: bound_ty,
                settable: false,
                is_static: false,
                is_requirement: false,
            }),
            param.span,
        );
        param_decls.push((name.clone(), id));
    }
    collected.param_decls.insert(owner, param_decls);
}

fn collect_func(
    func: &FuncItem,
    owner: Option<DeclId>,
    decls: &mut DeclTable,
    collected: &mut Collected,
    errors: &mut Vec<ResolveError>,
    span: crate::core::diag::Span,
) -> DeclId {
    let base_scope = match owner {
        Some(owner_id) => TypeScope {
            generic_params: owner_generic_params(owner_id, decls),
            self_type: Some(decls.declared_type(owner_id)),
        },
        None => TypeScope::default(),
    };

    let generics = collect_generics(&func.generics, &base_scope, decls, collected, errors);
    let scope = base_scope.with_params(
        &generics
            .params
            .iter()
            .map(|param| (param.name.clone(), param.archetype))
            .collect::<Vec<_>>(),
    );

    let params = collect_params(&func.params, &scope, decls, collected, errors);
    let ret = match &func.ret {
        Some(ret) => resolve_type(ret, &scope, decls, collected, errors),
        None => Type::unit(),
    };

    let is_requirement = owner
        .map(|owner_id| matches!(decls.decl(owner_id).kind, DeclKind::Protocol(_)))
        .unwrap_or(false);
    let id = decls.add_decl(
        func.name.clone(),
        DeclKind::Func(FuncDecl {
            owner,
            is_static: func.is_static,
            fixity: func.fixity,
            generics,
            params: params.clone(),
            ret,
            is_requirement,
            has_default_impl: is_requirement && func.body.is_some(),
        }),
        span,
    );

    let array_name = decls.decl(find_array_decl(collected)).name.clone();
    register_param_decls(
        id,
        &func.params,
        &params,
        Some((find_array_decl(collected), array_name.as_str())),
        decls,
        collected,
    );
    collected.scopes.insert(id, scope);

    if let Some(body) = &func.body
        && !is_requirement
    {
        collected.bodies.push((id, body.clone()));
    }
    id
}

fn find_array_decl(collected: &Collected) -> DeclId {
    *collected
        .types_by_name
        .get("Array")
        .expect("prelude installs Array")
}

fn owner_generic_params(owner: DeclId, decls: &DeclTable) -> Vec<(String, ArchetypeId)> {
    match &decls.decl(owner).kind {
        DeclKind::Struct(nominal) | DeclKind::Enum(nominal) => nominal
            .generics
            .params
            .iter()
            .map(|param| (param.name.clone(), param.archetype))
            .collect(),
        DeclKind::Class(class) => class
            .generics
            .params
            .iter()
            .map(|param| (param.name.clone(), param.archetype))
            .collect(),
        DeclKind::Protocol(proto) => {
            let mut params = vec![("Self".to_string(), proto.self_archetype)];
            for assoc in &proto.assoc_types {
                if let DeclKind::AssocType(decl) = &decls.decl(*assoc).kind {
                    params.push((decls.decl(*assoc).name.clone(), decl.archetype));
                }
            }
            params
        }
        _ => Vec::new(),
    }
}

fn fill_nominal(
    ty: &crate::core::tree::TypeItem,
    id: DeclId,
    _module: &Module,
    decls: &mut DeclTable,
    collected: &mut Collected,
    errors: &mut Vec<ResolveError>,
) {
    let generics = collect_generics(&ty.generics, &TypeScope::default(), decls, collected, errors);
    let scope = TypeScope {
        generic_params: generics
            .params
            .iter()
            .map(|param| (param.name.clone(), param.archetype))
            .collect(),
        self_type: None,
    };

    let mut superclass = None;
    let mut conformances = Vec::new();
    for inherit in &ty.inherits {
        if let Some(proto) = resolve_protocol_ref(inherit, decls, collected) {
            conformances.push(proto);
        } else if let Some(class_ty) = resolve_class_ref(inherit, &scope, decls, collected, errors)
        {
            superclass = Some(class_ty);
        } else {
            errors.push(
                ResolveErrorKind::UnresolvedType(render_type_expr_name(inherit)).at(inherit.span),
            );
        }
    }

    match &mut decls.decl_mut(id).kind {
        DeclKind::Struct(nominal) => {
            nominal.generics = generics;
            nominal.conformances = conformances;
        }
        DeclKind::Class(class) => {
            class.generics = generics;
            class.superclass = superclass;
            class.conformances = conformances;
        }
        _ => {}
    }

    collect_type_members(&ty.members, id, decls, collected, errors);
    synthesize_memberwise_init(id, decls);
}

/// Structs and root classes without an explicit constructor get a
/// memberwise one built from their stored fields, in declaration order.
fn synthesize_memberwise_init(owner: DeclId, decls: &mut DeclTable) {
    let members = decls.members_of(owner).to_vec();
    let has_ctor = members
        .iter()
        .any(|member| matches!(decls.decl(*member).kind, DeclKind::Constructor(_)));
    if has_ctor {
        return;
    }
    if let DeclKind::Class(class) = &decls.decl(owner).kind
        && class.superclass.is_some()
    {
        return;
    }
    let params: Vec<TupleElement> = members
        .iter()
        .filter_map(|member| {
            let decl = decls.decl(*member);
            match &decl.kind {
                DeclKind::Var(var) if !var.is_static => Some(TupleElement {
                    name: Some(decl.name.clone()),
                    ty: var.ty.clone(),
                    variadic: false,
                    has_default: false,
                }),
                _ => None,
            }
        })
        .collect();
    let span = decls.decl(owner).span;
    let ctor = decls.add_decl(
        "init",
        DeclKind::Constructor(CtorDecl {
            owner,
            generics: GenericSig::default(),
            params,
        }),
        span,
    );
    decls.add_member(owner, ctor);
}

fn fill_enum(
    en: &crate::core::tree::EnumItem,
    id: DeclId,
    decls: &mut DeclTable,
    collected: &mut Collected,
    errors: &mut Vec<ResolveError>,
) {
    let generics = collect_generics(&en.generics, &TypeScope::default(), decls, collected, errors);
    let scope = TypeScope {
        generic_params: generics
            .params
            .iter()
            .map(|param| (param.name.clone(), param.archetype))
            .collect(),
        self_type: None,
    };

    let mut conformances = Vec::new();
    for inherit in &en.inherits {
        match resolve_protocol_ref(inherit, decls, collected) {
            Some(proto) => conformances.push(proto),
            None => errors.push(
                ResolveErrorKind::NotAProtocol(render_type_expr_name(inherit)).at(inherit.span),
            ),
        }
    }
    if let DeclKind::Enum(nominal) = &mut decls.decl_mut(id).kind {
        nominal.generics = generics;
        nominal.conformances = conformances;
    }

    for case in &en.cases {
        let payload = case
            .payload
            .iter()
            .map(|ty| resolve_type(ty, &scope, decls, collected, errors))
            .collect();
        let case_id = decls.add_decl(
            case.name.clone(),
            DeclKind::EnumCase(EnumCaseDecl { owner: id, payload }),
            case.span,
        );
        decls.add_member(id, case_id);
    }

    collect_type_members(&en.members, id, decls, collected, errors);
}

fn fill_protocol(
    proto: &crate::core::tree::ProtocolItem,
    id: DeclId,
    decls: &mut DeclTable,
    collected: &mut Collected,
    errors: &mut Vec<ResolveError>,
) {
    let mut inherited = Vec::new();
    for inherit in &proto.inherits {
        match resolve_protocol_ref(inherit, decls, collected) {
            Some(parent) => inherited.push(parent),
            None => errors.push(
                ResolveErrorKind::NotAProtocol(render_type_expr_name(inherit)).at(inherit.span),
            ),
        }
    }

    // Associated types first; requirement signatures may mention them.
    let mut assoc_types = Vec::new();
    for member in &proto.members {
        if let ItemKind::AssocType(assoc) = &member.kind {
            let archetype = decls.fresh_archetype(assoc.name.clone(), Vec::new(), None);
            let assoc_id = decls.add_decl(
                assoc.name.clone(),
                DeclKind::AssocType(AssocTypeDecl {
                    protocol: id,
                    archetype,
                }),
                member.span,
            );
            decls.add_member(id, assoc_id);
            assoc_types.push(assoc_id);
        }
    }
    if let DeclKind::Protocol(decl) = &mut decls.decl_mut(id).kind {
        decl.inherited = inherited;
        decl.assoc_types = assoc_types;
    }

    let mut requirements = Vec::new();
    for member in &proto.members {
        match &member.kind {
            ItemKind::Func(func) => {
                let func_id = collect_func(func, Some(id), decls, collected, errors, member.span);
                decls.add_member(id, func_id);
                requirements.push(func_id);
            }
            ItemKind::Var(var) => {
                let scope = TypeScope {
                    generic_params: owner_generic_params(id, decls),
                    self_type: Some(decls.declared_type(id)),
                };
                let ty = match &var.ty {
                    Some(type_expr) => resolve_type(type_expr, &scope, decls, collected, errors),
                    None => Type::Error,
                };
                if let PatternKind::Name(name) = &var.pattern.kind {
                    let var_id = decls.add_decl(
                        name.clone(),
                        DeclKind::Var(VarDecl {
                            owner: Some(id),
                            ty,
                            settable: !var.is_let,
                            is_static: var.is_static,
                            is_requirement: true,
                        }),
                        member.span,
                    );
                    decls.add_member(id, var_id);
                    requirements.push(var_id);
                }
            }
            ItemKind::AssocType(_) => {}
            _ => errors.push(ResolveErrorKind::DuplicateDecl("member".into()).at(member.span)),
        }
    }
    if let DeclKind::Protocol(decl) = &mut decls.decl_mut(id).kind {
        decl.requirements = requirements;
    }
}

fn collect_type_members(
    members: &[Item],
    owner: DeclId,
    decls: &mut DeclTable,
    collected: &mut Collected,
    errors: &mut Vec<ResolveError>,
) {
    for member in members {
        match &member.kind {
            ItemKind::Func(func) => {
                let func_id = collect_func(func, Some(owner), decls, collected, errors, member.span);
                decls.add_member(owner, func_id);
            }
            ItemKind::Var(var) => {
                let scope = TypeScope {
                    generic_params: owner_generic_params(owner, decls),
                    self_type: Some(decls.declared_type(owner)),
                };
                let ty = match &var.ty {
                    Some(type_expr) => resolve_type(type_expr, &scope, decls, collected, errors),
                    None => Type::Error,
                };
                if let PatternKind::Name(name) = &var.pattern.kind {
                    let var_id = decls.add_decl(
                        name.clone(),
                        DeclKind::Var(VarDecl {
                            owner: Some(owner),
                            ty,
                            settable: !var.is_let,
                            is_static: var.is_static,
                            is_requirement: false,
                        }),
                        member.span,
                    );
                    decls.add_member(owner, var_id);
                }
            }
            ItemKind::Init(init) => {
                let scope = TypeScope {
                    generic_params: owner_generic_params(owner, decls),
                    self_type: Some(decls.declared_type(owner)),
                };
                let params = collect_params(&init.params, &scope, decls, collected, errors);
                let ctor_id = decls.add_decl(
                    "init",
                    DeclKind::Constructor(CtorDecl {
                        owner,
                        generics: GenericSig::default(),
                        params: params.clone(),
                    }),
                    member.span,
                );
                decls.add_member(owner, ctor_id);
                let array = find_array_decl(collected);
                let array_name = decls.decl(array).name.clone();
                register_param_decls(
                    ctor_id,
                    &init.params,
                    &params,
                    Some((array, array_name.as_str())),
                    decls,
                    collected,
                );
                collected.scopes.insert(ctor_id, scope);
                if let Some(body) = &init.body {
                    collected.bodies.push((ctor_id, body.clone()));
                }
            }
            _ => errors.push(ResolveErrorKind::DuplicateDecl("member".into()).at(member.span)),
        }
    }
}

fn resolve_protocol_ref(
    expr: &TypeExpr,
    decls: &DeclTable,
    collected: &Collected,
) -> Option<DeclId> {
    if let TypeExprKind::Named { name, args } = &expr.kind
        && args.is_empty()
        && let Some(&id) = collected.types_by_name.get(name)
        && matches!(decls.decl(id).kind, DeclKind::Protocol(_))
    {
        return Some(id);
    }
    None
}

fn resolve_class_ref(
    expr: &TypeExpr,
    scope: &TypeScope,
    decls: &mut DeclTable,
    collected: &Collected,
    errors: &mut Vec<ResolveError>,
) -> Option<Type> {
    let ty = resolve_type(expr, scope, decls, collected, errors);
    match ty.nominal_decl() {
        Some(decl) if matches!(decls.decl(decl).kind, DeclKind::Class(_)) => Some(ty),
        _ => None,
    }
}

fn render_type_expr_name(expr: &TypeExpr) -> String {
    match &expr.kind {
        TypeExprKind::Named { name, .. } => name.clone(),
        TypeExprKind::SelfType => "Self".to_string(),
        TypeExprKind::Tuple { .. } => "(tuple)".to_string(),
        TypeExprKind::Fn { .. } => "(function)".to_string(),
    }
}

/// Resolves a syntactic type expression to a canonical type, expanding alias
/// sugar and mapping generic parameter names to their archetypes.
pub(super) fn resolve_type(
    expr: &TypeExpr,
    scope: &TypeScope,
    decls: &mut DeclTable,
    collected: &Collected,
    errors: &mut Vec<ResolveError>,
) -> Type {
    match &expr.kind {
        TypeExprKind::SelfType => match &scope.self_type {
            Some(ty) => ty.clone(),
            None => {
                errors.push(ResolveErrorKind::SelfTypeOutsideType.at(expr.span));
                Type::Error
            }
        },
        TypeExprKind::Named { name, args } => {
            if args.is_empty()
                && let Some((_, archetype)) = scope
                    .generic_params
                    .iter()
                    .rev()
                    .find(|(param_name, _)| param_name == name)
            {
                let archetype = *archetype;
                let display = decls.archetype(archetype).name.clone();
                return Type::archetype(archetype, display);
            }

            let Some(&decl) = collected.types_by_name.get(name) else {
                errors.push(ResolveErrorKind::UnresolvedType(name.clone()).at(expr.span));
                return Type::Error;
            };

            let resolved_args: Vec<Type> = args
                .iter()
                .map(|arg| resolve_type(arg, scope, decls, collected, errors))
                .collect();

            match &decls.decl(decl).kind {
                DeclKind::Protocol(_) => {
                    if !resolved_args.is_empty() {
                        errors.push(
                            ResolveErrorKind::TypeArgCountMismatch(name.clone(), 0, args.len())
                                .at(expr.span),
                        );
                    }
                    Type::existential(vec![ProtocolRef {
                        decl,
                        name: name.clone(),
                    }])
                }
                DeclKind::TypeAlias(alias) => {
                    if !resolved_args.is_empty() {
                        errors.push(
                            ResolveErrorKind::TypeArgCountMismatch(name.clone(), 0, args.len())
                                .at(expr.span),
                        );
                    }
                    alias.underlying.clone()
                }
                _ => {
                    let arity = decls
                        .generics_of(decl)
                        .map(|generics| generics.params.len())
                        .unwrap_or(0);
                    if arity != resolved_args.len() {
                        if resolved_args.is_empty() && arity > 0 {
                            // Unapplied generic name: leave params as their
                            // archetypes (`Array` means `Array<Element>`).
                            return decls.declared_type(decl);
                        }
                        errors.push(
                            ResolveErrorKind::TypeArgCountMismatch(
                                name.clone(),
                                arity,
                                resolved_args.len(),
                            )
                            .at(expr.span),
                        );
                        return Type::Error;
                    }
                    if resolved_args.is_empty() {
                        Type::nominal(decl, name.clone())
                    } else {
                        Type::bound_generic(decl, name.clone(), resolved_args)
                    }
                }
            }
        }
        TypeExprKind::Tuple { elements } => {
            let elements = elements
                .iter()
                .map(|elem| TupleElement {
                    name: elem.name.clone(),
                    ty: resolve_type(&elem.ty, scope, decls, collected, errors),
                    variadic: elem.variadic,
                    has_default: false,
                })
                .collect();
            Type::tuple(elements)
        }
        TypeExprKind::Fn { input, output } => {
            let input_ty = resolve_type(input, scope, decls, collected, errors);
            // A bare parameter type is a one-element tuple input.
            let input_ty = match input_ty {
                Type::Tuple { .. } => input_ty,
                other => Type::tuple(vec![TupleElement::unnamed(other)]),
            };
            let output_ty = resolve_type(output, scope, decls, collected, errors);
            Type::func(input_ty, output_ty)
        }
    }
}
