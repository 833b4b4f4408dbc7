//! Name binding: collects declarations out of a parsed module and binds every
//! name use to a candidate declaration list.
//!
//! The binder never performs type-based disambiguation; ambiguous references
//! stay as overload candidate sets for the type checker to choose among.
//! Results are published in a side table keyed by `NodeId`, keeping the tree
//! immutable.

mod binder;
mod collect;
mod errors;

pub use errors::{ResolveError, ResolveErrorKind};

use std::collections::HashMap;

use crate::core::decls::{DeclId, DeclTable, Prelude, install_prelude};
use crate::core::tree::{Block, Module, NodeId};

/// One resolved reference: a unique declaration, a candidate list for the
/// checker to disambiguate, or a poisoned placeholder for an unresolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclRef {
    Resolved(DeclId),
    Overloaded(Vec<DeclId>),
    Poisoned,
}

/// A function or constructor body queued for type checking.
#[derive(Debug, Clone)]
pub struct BodyToCheck {
    pub owner: DeclId,
    pub block: Block,
}

#[derive(Debug)]
pub struct ResolvedModule {
    pub module: Module,
    pub decls: DeclTable,
    pub prelude: Prelude,
    pub refs: HashMap<NodeId, DeclRef>,
    /// Resolved local type annotations, keyed by type-expression node.
    pub annotations: HashMap<NodeId, crate::core::types::Type>,
    pub bodies: Vec<BodyToCheck>,
    /// Synthesized `self` declarations per method/constructor.
    pub self_decls: HashMap<DeclId, DeclId>,
}

impl ResolvedModule {
    pub fn decl_ref(&self, node: NodeId) -> Option<&DeclRef> {
        self.refs.get(&node)
    }
}

#[cfg(test)]
#[path = "../../tests/t_resolve.rs"]
mod tests;

pub fn resolve(module: Module) -> Result<ResolvedModule, Vec<ResolveError>> {
    let mut decls = DeclTable::new();
    let prelude = install_prelude(&mut decls);

    let mut errors = Vec::new();
    let collected = collect::collect_module(&module, &mut decls, &prelude, &mut errors);
    let (refs, annotations, bodies, self_decls) =
        binder::bind_bodies(&module, &mut decls, &collected, &mut errors);

    if errors.is_empty() {
        Ok(ResolvedModule {
            module,
            decls,
            prelude,
            refs,
            annotations,
            bodies,
            self_decls,
        })
    } else {
        Err(errors)
    }
}
