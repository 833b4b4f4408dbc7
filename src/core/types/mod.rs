mod render;

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::core::decls::DeclId;

/// A type-checker-introduced placeholder for an as-yet-unknown type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeVarId(pub u32);

impl std::fmt::Display for TypeVarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// An opaque stand-in for a generic parameter, bounded by protocol and
/// superclass requirements recorded in the declaration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleElement {
    pub name: Option<String>,
    pub ty: Type,
    pub variadic: bool,
    pub has_default: bool,
}

impl TupleElement {
    pub fn unnamed(ty: Type) -> Self {
        TupleElement {
            name: None,
            ty,
            variadic: false,
            has_default: false,
        }
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        TupleElement {
            name: Some(name.into()),
            ty,
            variadic: false,
            has_default: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FnFlags {
    pub autoclosure: bool,
    pub noreturn: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LValueQualifiers {
    pub implicit: bool,
    pub settable: bool,
}

impl LValueQualifiers {
    pub fn implicit_settable() -> Self {
        LValueQualifiers {
            implicit: true,
            settable: true,
        }
    }

    pub fn implicit_readonly() -> Self {
        LValueQualifiers {
            implicit: true,
            settable: false,
        }
    }

    pub fn explicit_settable() -> Self {
        LValueQualifiers {
            implicit: false,
            settable: true,
        }
    }
}

/// A protocol reference inside an existential; identity is the declaration,
/// the name is carried for display only.
#[derive(Debug, Clone, Eq)]
pub struct ProtocolRef {
    pub decl: DeclId,
    pub name: String,
}

impl PartialEq for ProtocolRef {
    fn eq(&self, other: &Self) -> bool {
        self.decl == other.decl
    }
}

impl Hash for ProtocolRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.decl.hash(state);
    }
}

/// Canonical structural type. Alias sugar is expanded during type-expression
/// resolution, so the checker only ever sees canonical forms; nominal and
/// archetype names are carried for display and ignored by equality.
#[derive(Debug, Clone, Eq)]
pub enum Type {
    /// Poisoned type for invalid references; absorbs structural matching so a
    /// single upstream error does not cascade.
    Error,

    /// Struct, class, or enum reference (protocols in value position are
    /// `Existential`).
    Nominal {
        decl: DeclId,
        name: String,
    },

    /// Nominal applied to ordered type arguments, e.g. `Array<Int>`.
    BoundGeneric {
        decl: DeclId,
        name: String,
        args: Vec<Type>,
    },

    Tuple {
        elements: Vec<TupleElement>,
    },

    Fn {
        input: Box<Type>,
        output: Box<Type>,
        flags: FnFlags,
    },

    Metatype {
        instance: Box<Type>,
    },

    Archetype {
        id: ArchetypeId,
        name: String,
    },

    /// "Some value conforming to each protocol"; an empty list is `Any`.
    Existential {
        protocols: Vec<ProtocolRef>,
    },

    LValue {
        object: Box<Type>,
        qualifiers: LValueQualifiers,
    },

    Var(TypeVarId),
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Error, Type::Error) => true,
            (Type::Nominal { decl: l, .. }, Type::Nominal { decl: r, .. }) => l == r,
            (
                Type::BoundGeneric {
                    decl: l, args: la, ..
                },
                Type::BoundGeneric {
                    decl: r, args: ra, ..
                },
            ) => l == r && la == ra,
            (Type::Tuple { elements: l }, Type::Tuple { elements: r }) => l == r,
            (
                Type::Fn {
                    input: li,
                    output: lo,
                    flags: lf,
                },
                Type::Fn {
                    input: ri,
                    output: ro,
                    flags: rf,
                },
            ) => li == ri && lo == ro && lf == rf,
            (Type::Metatype { instance: l }, Type::Metatype { instance: r }) => l == r,
            (Type::Archetype { id: l, .. }, Type::Archetype { id: r, .. }) => l == r,
            (Type::Existential { protocols: l }, Type::Existential { protocols: r }) => l == r,
            (
                Type::LValue {
                    object: lo,
                    qualifiers: lq,
                },
                Type::LValue {
                    object: ro,
                    qualifiers: rq,
                },
            ) => lo == ro && lq == rq,
            (Type::Var(l), Type::Var(r)) => l == r,
            _ => false,
        }
    }
}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Type::Error => {}
            Type::Nominal { decl, .. } => decl.hash(state),
            Type::BoundGeneric { decl, args, .. } => {
                decl.hash(state);
                args.hash(state);
            }
            Type::Tuple { elements } => elements.hash(state),
            Type::Fn {
                input,
                output,
                flags,
            } => {
                input.hash(state);
                output.hash(state);
                flags.hash(state);
            }
            Type::Metatype { instance } => instance.hash(state),
            Type::Archetype { id, .. } => id.hash(state),
            Type::Existential { protocols } => protocols.hash(state),
            Type::LValue { object, qualifiers } => {
                object.hash(state);
                qualifiers.hash(state);
            }
            Type::Var(var) => var.hash(state),
        }
    }
}

impl Type {
    pub fn unit() -> Type {
        Type::Tuple {
            elements: Vec::new(),
        }
    }

    pub fn tuple(elements: Vec<TupleElement>) -> Type {
        Type::Tuple { elements }
    }

    pub fn nominal(decl: DeclId, name: impl Into<String>) -> Type {
        Type::Nominal {
            decl,
            name: name.into(),
        }
    }

    pub fn bound_generic(decl: DeclId, name: impl Into<String>, args: Vec<Type>) -> Type {
        Type::BoundGeneric {
            decl,
            name: name.into(),
            args,
        }
    }

    pub fn func(input: Type, output: Type) -> Type {
        Type::Fn {
            input: Box::new(input),
            output: Box::new(output),
            flags: FnFlags::default(),
        }
    }

    pub fn func_with_flags(input: Type, output: Type, flags: FnFlags) -> Type {
        Type::Fn {
            input: Box::new(input),
            output: Box::new(output),
            flags,
        }
    }

    pub fn metatype(instance: Type) -> Type {
        Type::Metatype {
            instance: Box::new(instance),
        }
    }

    pub fn archetype(id: ArchetypeId, name: impl Into<String>) -> Type {
        Type::Archetype {
            id,
            name: name.into(),
        }
    }

    pub fn existential(protocols: Vec<ProtocolRef>) -> Type {
        Type::Existential { protocols }
    }

    pub fn lvalue(object: Type, qualifiers: LValueQualifiers) -> Type {
        Type::LValue {
            object: Box::new(object),
            qualifiers,
        }
    }

    pub fn var(id: TypeVarId) -> Type {
        Type::Var(id)
    }

    pub fn any() -> Type {
        Type::Existential {
            protocols: Vec::new(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.any_node(&|t| matches!(t, Type::Error))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Type::Tuple { elements } if elements.is_empty())
    }

    pub fn is_lvalue(&self) -> bool {
        matches!(self, Type::LValue { .. })
    }

    pub fn is_existential(&self) -> bool {
        matches!(self, Type::Existential { .. })
    }

    /// Strips an outer lvalue qualifier, if any.
    pub fn rvalue(&self) -> Type {
        match self {
            Type::LValue { object, .. } => (**object).clone(),
            other => other.clone(),
        }
    }

    /// A type is materializable when no lvalue appears anywhere inside it.
    pub fn is_materializable(&self) -> bool {
        !self.any_node(&|t| matches!(t, Type::LValue { .. }))
    }

    pub fn contains_type_vars(&self) -> bool {
        self.any_node(&|t| matches!(t, Type::Var(_)))
    }

    pub fn contains_var(&self, var: TypeVarId) -> bool {
        self.any_node(&|t| matches!(t, Type::Var(v) if *v == var))
    }

    pub fn contains_archetypes(&self) -> bool {
        self.any_node(&|t| matches!(t, Type::Archetype { .. }))
    }

    pub fn as_fn(&self) -> Option<(&Type, &Type, FnFlags)> {
        match self {
            Type::Fn {
                input,
                output,
                flags,
            } => Some((input, output, *flags)),
            _ => None,
        }
    }

    pub fn tuple_elements(&self) -> Option<&[TupleElement]> {
        match self {
            Type::Tuple { elements } => Some(elements),
            _ => None,
        }
    }

    /// The nominal declaration at the head of the type, if any.
    pub fn nominal_decl(&self) -> Option<DeclId> {
        match self {
            Type::Nominal { decl, .. } | Type::BoundGeneric { decl, .. } => Some(*decl),
            _ => None,
        }
    }

    pub fn generic_args(&self) -> &[Type] {
        match self {
            Type::BoundGeneric { args, .. } => args,
            _ => &[],
        }
    }

    /// Structural predicate: true when `pred` holds for this type or any type
    /// nested inside it.
    pub fn any_node(&self, pred: &dyn Fn(&Type) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Type::Error
            | Type::Nominal { .. }
            | Type::Archetype { .. }
            | Type::Existential { .. }
            | Type::Var(_) => false,
            Type::BoundGeneric { args, .. } => args.iter().any(|arg| arg.any_node(pred)),
            Type::Tuple { elements } => elements.iter().any(|elem| elem.ty.any_node(pred)),
            Type::Fn { input, output, .. } => input.any_node(pred) || output.any_node(pred),
            Type::Metatype { instance } => instance.any_node(pred),
            Type::LValue { object, .. } => object.any_node(pred),
        }
    }

    /// Rebuilds the type bottom-up, applying `f` to every node after its
    /// children have been rebuilt.
    pub fn map_nodes(&self, f: &dyn Fn(Type) -> Type) -> Type {
        let rebuilt = match self {
            Type::Error
            | Type::Nominal { .. }
            | Type::Archetype { .. }
            | Type::Existential { .. }
            | Type::Var(_) => self.clone(),
            Type::BoundGeneric { decl, name, args } => Type::BoundGeneric {
                decl: *decl,
                name: name.clone(),
                args: args.iter().map(|arg| arg.map_nodes(f)).collect(),
            },
            Type::Tuple { elements } => Type::Tuple {
                elements: elements
                    .iter()
                    .map(|elem| TupleElement {
                        name: elem.name.clone(),
                        ty: elem.ty.map_nodes(f),
                        variadic: elem.variadic,
                        has_default: elem.has_default,
                    })
                    .collect(),
            },
            Type::Fn {
                input,
                output,
                flags,
            } => Type::Fn {
                input: Box::new(input.map_nodes(f)),
                output: Box::new(output.map_nodes(f)),
                flags: *flags,
            },
            Type::Metatype { instance } => Type::Metatype {
                instance: Box::new(instance.map_nodes(f)),
            },
            Type::LValue { object, qualifiers } => Type::LValue {
                object: Box::new(object.map_nodes(f)),
                qualifiers: *qualifiers,
            },
        };
        f(rebuilt)
    }

    /// Replaces archetypes according to `subst`, leaving unmapped archetypes
    /// in place.
    pub fn substitute_archetypes(&self, subst: &HashMap<ArchetypeId, Type>) -> Type {
        self.map_nodes(&|t| match t {
            Type::Archetype { id, name } => subst
                .get(&id)
                .cloned()
                .unwrap_or(Type::Archetype { id, name }),
            other => other,
        })
    }
}
