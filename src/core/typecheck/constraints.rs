//! The constraint model: typed relations between types, provenance locators,
//! and overload choice sets.

use std::collections::HashMap;

use crate::core::decls::DeclId;
use crate::core::tree::NodeId;
use crate::core::types::{Type, TypeVarId};

/// How strictly two types must relate. The order is a strictness lattice:
/// every rewrite a stricter kind permits is also permitted by weaker kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeMatchKind {
    Bind,
    SameType,
    TrivialSubtype,
    Subtype,
    Conversion,
}

impl TypeMatchKind {
    /// True when `self` permits at least the rewrites of `other`.
    pub fn permits(self, other: TypeMatchKind) -> bool {
        self >= other
    }
}

/// One step of semantic provenance from an anchor expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    FnArgument,
    FnResult,
    Member(String),
    TupleElement(usize),
    GenericArgument(usize),
    ClosureBody,
    IfBranch(usize),
    Constructor,
    AddressOf,
    Load,
    ConversionMember,
    LiteralElement(usize),
    Witness(DeclId),
}

/// Provenance: an anchor node plus a path of semantic steps. Locators double
/// as dictionary keys, so all constraints describing the same logical
/// position must share one interned instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub anchor: NodeId,
    pub path: Vec<PathStep>,
}

impl Locator {
    pub fn new(anchor: NodeId) -> Self {
        Locator {
            anchor,
            path: Vec::new(),
        }
    }

    pub fn with_step(anchor: NodeId, step: PathStep) -> Self {
        Locator {
            anchor,
            path: vec![step],
        }
    }

    pub fn appending(&self, step: PathStep) -> Self {
        let mut path = self.path.clone();
        path.push(step);
        Locator {
            anchor: self.anchor,
            path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocatorId(pub u32);

/// Structural interner so equal locators share one identity.
#[derive(Debug, Default)]
pub struct LocatorTable {
    locators: Vec<Locator>,
    index: HashMap<Locator, LocatorId>,
}

impl LocatorTable {
    pub fn intern(&mut self, locator: Locator) -> LocatorId {
        if let Some(&id) = self.index.get(&locator) {
            return id;
        }
        let id = LocatorId(self.locators.len() as u32);
        self.locators.push(locator.clone());
        self.index.insert(locator, id);
        id
    }

    pub fn get(&self, id: LocatorId) -> &Locator {
        &self.locators[id.0 as usize]
    }
}

/// A typed relation awaiting simplification. Compound constraints carry
/// nested alternatives (`Disjunction`) or bundles (`Conjunction`).
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `first` relates to `second` under the given match kind.
    Relate {
        kind: TypeMatchKind,
        first: Type,
        second: Type,
        locator: LocatorId,
    },
    /// `(args) -> result` shape must apply to the callee type; solvable once
    /// the callee desugars to a concrete function type.
    Applicable {
        fn_shape: Type,
        callee: Type,
        locator: LocatorId,
    },
    /// The instance type must be constructible with the shape's argument
    /// tuple, binding the shape's result.
    Construction {
        fn_shape: Type,
        instance: Type,
        locator: LocatorId,
    },
    ConformsTo {
        ty: Type,
        protocol: DeclId,
        locator: LocatorId,
    },
    /// Name-based member lookup: `base.name` has type `member`.
    Member {
        base: Type,
        name: String,
        member: Type,
        is_type_member: bool,
        locator: LocatorId,
    },
    /// The type must resolve to an archetype.
    Archetype {
        ty: Type,
        locator: LocatorId,
    },
    /// Alternative constraint bundles; exactly one branch must hold.
    Disjunction {
        branches: Vec<Vec<Constraint>>,
        locator: LocatorId,
    },
    /// All bundled constraints must hold together.
    Conjunction {
        constraints: Vec<Constraint>,
        locator: LocatorId,
    },
}

impl Constraint {
    pub fn locator(&self) -> LocatorId {
        match self {
            Constraint::Relate { locator, .. }
            | Constraint::Applicable { locator, .. }
            | Constraint::Construction { locator, .. }
            | Constraint::ConformsTo { locator, .. }
            | Constraint::Member { locator, .. }
            | Constraint::Archetype { locator, .. }
            | Constraint::Disjunction { locator, .. }
            | Constraint::Conjunction { locator, .. } => *locator,
        }
    }
}

/// One candidate resolution of an ambiguous reference.
#[derive(Debug, Clone, PartialEq)]
pub enum OverloadChoice {
    /// An ordinary declaration reference, through `base` for members.
    Decl {
        decl: DeclId,
        base: Option<Type>,
    },
    /// A declaration found through dynamic lookup; ranked below direct hits.
    DeclViaDynamic {
        decl: DeclId,
        base: Option<Type>,
    },
    /// The base type itself (identity projection).
    BaseType {
        base: Type,
    },
    /// Projection of a tuple element by index.
    TupleIndex {
        base: Type,
        index: usize,
    },
    /// A synthetic identity function.
    IdentityFunction,
}

/// Binds one type variable to exactly one of N candidate choices. Sets with
/// one viable choice resolve immediately; larger sets defer to the search.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadSet {
    pub bound_var: TypeVarId,
    pub choices: Vec<OverloadChoice>,
    pub locator: LocatorId,
}
