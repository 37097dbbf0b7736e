//! Scope numbering pass
//!
//! Runs before any bytes are produced and gives every scope of the tree a
//! dense id in depth-first pre-order. The writer emits both the instruction
//! section and the header section in [`ScopeIds::order`], so an operand or
//! instruction naming a scope that appears later on the wire still has its id.

use crate::error::GraphError;
use ruby_ir::{ScopeRef, ScopeTree};
use std::collections::HashMap;

/// Scope to persisted-id table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeIds {
    ids: HashMap<ScopeRef, u32>,
    order: Vec<ScopeRef>,
}

impl ScopeIds {
    pub fn id_of(&self, scope: ScopeRef) -> Result<u32, GraphError> {
        self.ids
            .get(&scope)
            .copied()
            .ok_or(GraphError::UnassignedScope(scope))
    }

    /// Scopes in id order
    pub fn order(&self) -> &[ScopeRef] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub fn assign_scope_ids(tree: &ScopeTree) -> ScopeIds {
    let order = tree.depth_first();
    let ids = order
        .iter()
        .enumerate()
        .map(|(id, scope)| (*scope, id as u32))
        .collect();
    ScopeIds { ids, order }
}
