//! Solution write-back: maps node identities to their inferred types.
//!
//! The syntax tree stays immutable; everything a later phase needs lands in
//! this side table.

use std::collections::HashMap;

use crate::core::tree::NodeId;
use crate::core::types::Type;

use super::solver::Solution;
use super::system::ConstraintSystem;

#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    types: HashMap<NodeId, Type>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId) -> Option<&Type> {
        self.types.get(&node)
    }

    pub fn insert(&mut self, node: NodeId, ty: Type) {
        self.types.insert(node, ty);
    }

    pub fn merge(&mut self, other: TypeMap) {
        self.types.extend(other.types);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Type)> {
        self.types.iter()
    }
}

/// Substitutes the winning solution into every recorded node type.
pub fn apply_solution(system: &ConstraintSystem, solution: &Solution) -> TypeMap {
    let mut map = TypeMap::new();
    for (node, ty) in &system.node_types {
        map.insert(*node, solution.type_of(ty));
    }
    map
}
