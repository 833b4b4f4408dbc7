//! Declaration model and qualified member lookup.
//!
//! The `DeclTable` is the module-system collaborator of the type checker: it
//! owns every declaration the checker can reference, the archetype registry
//! for generic parameters, and the raw (uncached) member lookup queries.
//! Caching lives with the checker context, which is the single writer.

mod prelude;

pub use prelude::{Prelude, install_prelude};

use std::collections::HashMap;

use crate::core::diag::Span;
use crate::core::tree::Fixity;
use crate::core::types::{ArchetypeId, Type, TupleElement};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

impl std::fmt::Display for DeclId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Struct(NominalDecl),
    Class(ClassDecl),
    Enum(NominalDecl),
    Protocol(ProtocolDecl),
    TypeAlias(AliasDecl),
    AssocType(AssocTypeDecl),
    Func(FuncDecl),
    Var(VarDecl),
    Constructor(CtorDecl),
    EnumCase(EnumCaseDecl),
}

#[derive(Debug, Clone, Default)]
pub struct GenericSig {
    pub params: Vec<GenericParam>,
}

impl GenericSig {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn archetypes(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.params.iter().map(|param| param.archetype)
    }
}

#[derive(Debug, Clone)]
pub struct GenericParam {
    pub name: String,
    pub archetype: ArchetypeId,
}

#[derive(Debug, Clone, Default)]
pub struct NominalDecl {
    pub generics: GenericSig,
    pub conformances: Vec<DeclId>,
}

#[derive(Debug, Clone, Default)]
pub struct ClassDecl {
    pub generics: GenericSig,
    pub superclass: Option<Type>,
    pub conformances: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct ProtocolDecl {
    pub inherited: Vec<DeclId>,
    /// The `Self` placeholder used in requirement signatures.
    pub self_archetype: ArchetypeId,
    pub requirements: Vec<DeclId>,
    pub assoc_types: Vec<DeclId>,
    /// Default type a literal-convertible protocol resolves to when inference
    /// leaves the literal otherwise unconstrained.
    pub literal_default: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub underlying: Type,
}

#[derive(Debug, Clone)]
pub struct AssocTypeDecl {
    pub protocol: DeclId,
    pub archetype: ArchetypeId,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub owner: Option<DeclId>,
    pub is_static: bool,
    pub fixity: Fixity,
    pub generics: GenericSig,
    pub params: Vec<TupleElement>,
    pub ret: Type,
    /// Set on protocol members: the declaration states a requirement.
    pub is_requirement: bool,
    /// Set on protocol members that also carry a usable default body.
    pub has_default_impl: bool,
}

impl FuncDecl {
    pub fn input_type(&self) -> Type {
        Type::tuple(self.params.clone())
    }

    pub fn fn_type(&self) -> Type {
        Type::func(self.input_type(), self.ret.clone())
    }
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub owner: Option<DeclId>,
    pub ty: Type,
    pub settable: bool,
    pub is_static: bool,
    pub is_requirement: bool,
}

#[derive(Debug, Clone)]
pub struct CtorDecl {
    pub owner: DeclId,
    pub generics: GenericSig,
    pub params: Vec<TupleElement>,
}

#[derive(Debug, Clone)]
pub struct EnumCaseDecl {
    pub owner: DeclId,
    pub payload: Vec<Type>,
}

#[derive(Debug, Clone)]
pub struct ArchetypeInfo {
    pub name: String,
    pub bounds: Vec<DeclId>,
    pub superclass: Option<Type>,
}

/// Reserved member name consulted for user-defined conversions; looked up
/// last during conversion matching so conversion chains stay bounded.
pub const CONVERSION_MEMBER: &str = "__conversion";

#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<Decl>,
    members: HashMap<DeclId, Vec<DeclId>>,
    archetypes: Vec<ArchetypeInfo>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_decl(&mut self, name: impl Into<String>, kind: DeclKind, span: Span) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Decl {
            id,
            name: name.into(),
            kind,
            span,
        });
        id
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.0 as usize]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.0 as usize]
    }

    pub fn decls(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter()
    }

    pub fn add_member(&mut self, owner: DeclId, member: DeclId) {
        self.members.entry(owner).or_default().push(member);
    }

    pub fn members_of(&self, owner: DeclId) -> &[DeclId] {
        self.members.get(&owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fresh_archetype(
        &mut self,
        name: impl Into<String>,
        bounds: Vec<DeclId>,
        superclass: Option<Type>,
    ) -> ArchetypeId {
        let id = ArchetypeId(self.archetypes.len() as u32);
        self.archetypes.push(ArchetypeInfo {
            name: name.into(),
            bounds,
            superclass,
        });
        id
    }

    pub fn archetype(&self, id: ArchetypeId) -> &ArchetypeInfo {
        &self.archetypes[id.0 as usize]
    }

    pub fn archetype_mut(&mut self, id: ArchetypeId) -> &mut ArchetypeInfo {
        &mut self.archetypes[id.0 as usize]
    }

    /// The declared type for a nominal decl: its generic parameters appear as
    /// their own archetypes (`Array<Element>` for the `Array` decl itself).
    pub fn declared_type(&self, id: DeclId) -> Type {
        let decl = self.decl(id);
        let generics = match &decl.kind {
            DeclKind::Struct(nominal) | DeclKind::Enum(nominal) => &nominal.generics,
            DeclKind::Class(class) => &class.generics,
            DeclKind::Protocol(_) => {
                return Type::existential(vec![crate::core::types::ProtocolRef {
                    decl: id,
                    name: decl.name.clone(),
                }]);
            }
            DeclKind::TypeAlias(alias) => return alias.underlying.clone(),
            _ => return Type::Error,
        };
        if generics.is_empty() {
            Type::nominal(id, decl.name.clone())
        } else {
            let args = generics
                .params
                .iter()
                .map(|param| Type::archetype(param.archetype, param.name.clone()))
                .collect();
            Type::bound_generic(id, decl.name.clone(), args)
        }
    }

    /// Generic signature of a nominal declaration, if it has one.
    pub fn generics_of(&self, id: DeclId) -> Option<&GenericSig> {
        match &self.decl(id).kind {
            DeclKind::Struct(nominal) | DeclKind::Enum(nominal) => Some(&nominal.generics),
            DeclKind::Class(class) => Some(&class.generics),
            DeclKind::Func(func) => Some(&func.generics),
            DeclKind::Constructor(ctor) => Some(&ctor.generics),
            _ => None,
        }
    }

    pub fn superclass_of(&self, ty: &Type) -> Option<Type> {
        let decl = ty.nominal_decl()?;
        match &self.decl(decl).kind {
            DeclKind::Class(class) => {
                let superclass = class.superclass.clone()?;
                Some(self.substitute_generic_args(ty, superclass))
            }
            _ => None,
        }
    }

    /// Declared protocol conformances for a nominal type (not including
    /// conformances inherited from superclasses).
    pub fn conformances_of(&self, decl: DeclId) -> &[DeclId] {
        match &self.decl(decl).kind {
            DeclKind::Struct(nominal) | DeclKind::Enum(nominal) => &nominal.conformances,
            DeclKind::Class(class) => &class.conformances,
            _ => &[],
        }
    }

    /// Substitutes the base type's generic arguments into a member-scope type
    /// (archetypes of the base's generic parameters become the bound args).
    pub fn substitute_generic_args(&self, base: &Type, member_ty: Type) -> Type {
        let Some(decl) = base.nominal_decl() else {
            return member_ty;
        };
        let Some(generics) = self.generics_of(decl) else {
            return member_ty;
        };
        let args = base.generic_args();
        if generics.is_empty() || args.is_empty() {
            return member_ty;
        }
        let subst: HashMap<ArchetypeId, Type> = generics
            .params
            .iter()
            .zip(args.iter())
            .map(|(param, arg)| (param.archetype, arg.clone()))
            .collect();
        member_ty.substitute_archetypes(&subst)
    }

    /// Qualified value-member lookup on a base type. Walks class superclass
    /// chains and, for archetypes and existentials, the protocol bounds.
    /// Results are stable in declaration order.
    pub fn lookup_member(&self, base: &Type, name: &str) -> Vec<DeclId> {
        let mut results = Vec::new();
        self.collect_members(base, name, false, &mut results);
        results
    }

    /// Qualified type-member lookup: projects associated types, aliases, and
    /// generic parameters addressed by name to their types in the context of
    /// `base` (e.g. `Element` on `Array<Double>` projects to `Double`).
    pub fn lookup_member_type(&self, base: &Type, name: &str) -> Vec<Type> {
        let mut projected = Vec::new();
        let base = base.rvalue();

        if let Some(decl) = base.nominal_decl()
            && let Some(generics) = self.generics_of(decl)
        {
            let args = base.generic_args();
            for (index, param) in generics.params.iter().enumerate() {
                if param.name == name {
                    let ty = args.get(index).cloned().unwrap_or_else(|| {
                        Type::archetype(param.archetype, param.name.clone())
                    });
                    if !projected.contains(&ty) {
                        projected.push(ty);
                    }
                }
            }
        }

        let mut decl_hits = Vec::new();
        self.collect_members(&base, name, true, &mut decl_hits);
        for hit in decl_hits {
            let ty = match &self.decl(hit).kind {
                DeclKind::AssocType(assoc) => {
                    Type::archetype(assoc.archetype, self.decl(hit).name.clone())
                }
                DeclKind::TypeAlias(alias) => {
                    self.substitute_generic_args(&base, alias.underlying.clone())
                }
                _ => continue,
            };
            if !projected.contains(&ty) {
                projected.push(ty);
            }
        }
        projected
    }

    pub fn lookup_constructors(&self, base: &Type) -> Vec<DeclId> {
        let Some(decl) = base.nominal_decl() else {
            return Vec::new();
        };
        self.members_of(decl)
            .iter()
            .copied()
            .filter(|id| matches!(self.decl(*id).kind, DeclKind::Constructor(_)))
            .collect()
    }

    fn collect_members(&self, base: &Type, name: &str, types_only: bool, out: &mut Vec<DeclId>) {
        let object = base.rvalue();
        match object {
            Type::Nominal { decl, .. } | Type::BoundGeneric { decl, .. } => {
                self.collect_nominal_members(decl, name, types_only, out);
                if let Some(superclass) = self.superclass_of(&base.rvalue()) {
                    self.collect_members(&superclass, name, types_only, out);
                }
            }
            Type::Archetype { id, .. } => {
                let bounds = self.archetype(id).bounds.clone();
                for bound in bounds {
                    self.collect_nominal_members(bound, name, types_only, out);
                }
                if let Some(superclass) = self.archetype(id).superclass.clone() {
                    self.collect_members(&superclass, name, types_only, out);
                }
            }
            Type::Existential { protocols } => {
                for proto in protocols {
                    self.collect_nominal_members(proto.decl, name, types_only, out);
                }
            }
            Type::Metatype { instance } => {
                // Static members and enum cases are addressed through the
                // metatype of the instance type.
                if let Some(decl) = instance.nominal_decl() {
                    for member in self.members_of(decl) {
                        if self.decl(*member).name != name {
                            continue;
                        }
                        let is_static_like = match &self.decl(*member).kind {
                            DeclKind::Func(func) => func.is_static,
                            DeclKind::Var(var) => var.is_static,
                            DeclKind::EnumCase(_) => true,
                            DeclKind::AssocType(_) | DeclKind::TypeAlias(_) => types_only,
                            _ => false,
                        };
                        if is_static_like && !out.contains(member) {
                            out.push(*member);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn collect_nominal_members(
        &self,
        decl: DeclId,
        name: &str,
        types_only: bool,
        out: &mut Vec<DeclId>,
    ) {
        for member in self.members_of(decl) {
            let member_decl = self.decl(*member);
            if member_decl.name != name {
                continue;
            }
            let is_type_member = matches!(
                member_decl.kind,
                DeclKind::AssocType(_) | DeclKind::TypeAlias(_)
            );
            if is_type_member == types_only && !out.contains(member) {
                out.push(*member);
            }
        }
        // Protocol member lookup also surfaces inherited requirements.
        if let DeclKind::Protocol(proto) = &self.decl(decl).kind {
            for inherited in proto.inherited.clone() {
                self.collect_nominal_members(inherited, name, types_only, out);
            }
        }
    }
}
