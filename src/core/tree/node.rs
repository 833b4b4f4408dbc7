//! Node identities for the syntax tree.
//!
//! Nodes never carry inferred types; semantic passes key side tables by
//! `NodeId` so the tree stays immutable after parsing.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// An id outside any parsed tree, for nested single-purpose constraint
    /// systems that have no syntactic anchor.
    pub fn synthetic(raw: u32) -> NodeId {
        NodeId(raw)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    pub fn count(&self) -> usize {
        self.next as usize
    }
}
