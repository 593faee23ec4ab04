//! Per-compilation node storage.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
};

use buggy::{Bug, BugExt};
use fnv::{FnvBuildHasher, FnvHasher};
use indexmap::IndexMap;
use nada_mir::{LiteralValue, NadaType};
use tracing::trace;

use crate::{
    arena::{Arena, Key},
    function::FunctionKey,
    node::{Node, NodeId, NodeKind, Stamp},
    source::SourceLocation,
    value::Value,
};

/// How far a function has been traced in this registry.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum FunctionState {
    /// The function's body is being traced.
    Tracing,
    /// The function was traced into the given definition node.
    Traced(NodeId),
}

/// Owns every node created during one compilation.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    nodes: Arena<NodeId, Node>,
    /// Dedup key to literal node.
    literals: IndexMap<String, Value, FnvBuildHasher>,
    functions: HashMap<FunctionKey, FunctionState>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The id the next registered node will receive.
    pub fn next_id(&self) -> NodeId {
        self.nodes.next_key()
    }

    /// Registers a node and returns a handle to it. The type must already
    /// have been checked.
    pub fn insert(&mut self, ty: NadaType, location: SourceLocation, kind: NodeKind) -> Value {
        let stamp = Stamp::new();
        let id = self.nodes.insert_with_key(|id| Node {
            id,
            stamp,
            ty: ty.clone(),
            location,
            kind,
        });
        trace!(%id, %location, "registered node");
        Value { id, stamp, ty }
    }

    /// Returns the node for `value`, registering it on first use.
    pub fn literal(&mut self, value: LiteralValue, location: SourceLocation) -> Value {
        let ty = value.ty();
        let key = literal_key(&value, &ty);
        if let Some(found) = self.literals.get(&key) {
            trace!(id = %found.id, %value, "reusing literal");
            return found.clone();
        }
        let handle = self.insert(
            ty,
            location,
            NodeKind::Literal {
                value,
                key: key.clone(),
            },
        );
        self.literals.insert(key, handle.clone());
        handle
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Like [`get`][Self::get], but a missing node is a bug.
    pub fn node(&self, id: NodeId) -> Result<&Node, Bug> {
        self.nodes.get(id).assume("node must be registered")
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, Bug> {
        self.nodes.get_mut(id).assume("node must be registered")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().map(|(_, node)| node)
    }

    pub fn function_state(&self, key: FunctionKey) -> Option<FunctionState> {
        self.functions.get(&key).copied()
    }

    pub fn set_function_state(&mut self, key: FunctionKey, state: FunctionState) {
        self.functions.insert(key, state);
    }

    pub fn remove_function(&mut self, key: FunctionKey) {
        self.functions.remove(&key);
    }

    /// Forgets every node registered at or after `mark`, along with the
    /// literals and functions that refer to them.
    pub fn rollback(&mut self, mark: NodeId) {
        self.nodes.truncate(mark.to_usize());
        self.literals.retain(|_, handle| handle.id < mark);
        self.functions.retain(|_, state| match state {
            FunctionState::Tracing => true,
            FunctionState::Traced(id) => *id < mark,
        });
        trace!(%mark, "rolled back registry");
    }

    /// Forgets everything. Ids start over from zero.
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.literals.clear();
        self.functions.clear();
    }
}

/// The FNV-1a hash of a literal's value and type as 16 hex digits.
pub(crate) fn literal_key(value: &LiteralValue, ty: &NadaType) -> String {
    let mut hasher = FnvHasher::default();
    value.hash(&mut hasher);
    ty.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use std::panic::Location;

    use super::*;
    use crate::source::SourceCache;

    fn here() -> SourceLocation {
        SourceLocation::capture(Location::caller(), &SourceCache::new())
    }

    #[test]
    fn test_literal_dedup() {
        let mut reg = Registry::new();
        let a = reg.literal(LiteralValue::Integer(7), here());
        let b = reg.literal(LiteralValue::Integer(7), here());
        let c = reg.literal(LiteralValue::UnsignedInteger(7), here());
        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_literal_key_is_hex() {
        let value = LiteralValue::Boolean(true);
        let key = literal_key(&value, &value.ty());
        assert_eq!(key.len(), 16);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, literal_key(&value, &value.ty()));
    }

    #[test]
    fn test_rollback_and_reset() {
        let mut reg = Registry::new();
        let zero = reg.literal(LiteralValue::Integer(0), here());
        let mark = reg.next_id();
        let one = reg.literal(LiteralValue::Integer(1), here());
        reg.set_function_state(FunctionKey::new(), FunctionState::Traced(one.id));

        reg.rollback(mark);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(one.id).is_none());
        assert!(reg.functions.is_empty());
        // The literal table no longer points at the dropped node.
        let again = reg.literal(LiteralValue::Integer(1), here());
        assert_eq!(again.id, mark);
        assert_ne!(again.stamp, one.stamp);
        assert_eq!(reg.literal(LiteralValue::Integer(0), here()), zero);

        reg.reset();
        assert_eq!(reg.len(), 0);
        assert_eq!(reg.next_id().to_usize(), 0);
    }
}
