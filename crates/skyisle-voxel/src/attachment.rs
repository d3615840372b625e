//! Out-of-band data attached to individual voxels: loot containers and
//! spawner entities.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a spawnable entity kind, e.g. `"zombie"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKind(pub String);

impl EntityKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to a resolved loot table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootHandle(pub u32);

/// Data stored alongside a voxel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Attachment {
    /// Container contents are rolled from `table` with `seed` when opened.
    Loot { table: LootHandle, seed: u64 },
    /// The voxel periodically spawns `entity`.
    Spawner { entity: EntityKind },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown loot table: {0}")]
pub struct UnknownLootTable(pub String);

/// Resolves loot-table ids from configuration to handles.
pub trait LootResolver {
    /// # Errors
    ///
    /// Returns [`UnknownLootTable`] when no table with this id exists.
    fn resolve_loot(&self, id: &str) -> Result<LootHandle, UnknownLootTable>;
}

/// A fixed set of known loot-table ids.
#[derive(Clone, Debug, Default)]
pub struct LootTableSet {
    tables: HashMap<String, LootHandle>,
    names: Vec<String>,
}

impl LootTableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table id, returning its handle. Re-adding returns the existing handle.
    pub fn insert(&mut self, id: &str) -> LootHandle {
        if let Some(handle) = self.tables.get(id) {
            return *handle;
        }
        let handle = LootHandle(self.names.len() as u32);
        self.tables.insert(id.to_string(), handle);
        self.names.push(id.to_string());
        handle
    }

    /// Id of the table behind `handle`.
    pub fn name(&self, handle: LootHandle) -> Option<&str> {
        self.names.get(handle.0 as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The loot tables referenced by the built-in catalog.
    pub fn with_defaults() -> Self {
        let mut set = Self::new();
        for id in [
            "chests/simple_dungeon",
            "chests/buried_treasure",
            "chests/shipwreck_treasure",
            "chests/abandoned_mineshaft",
            "chests/desert_pyramid",
        ] {
            set.insert(id);
        }
        set
    }
}

impl<S: AsRef<str>> FromIterator<S> for LootTableSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for id in iter {
            set.insert(id.as_ref());
        }
        set
    }
}

impl LootResolver for LootTableSet {
    fn resolve_loot(&self, id: &str) -> Result<LootHandle, UnknownLootTable> {
        self.tables
            .get(id)
            .copied()
            .ok_or_else(|| UnknownLootTable(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = LootTableSet::new();
        let a = set.insert("chests/simple_dungeon");
        let b = set.insert("chests/simple_dungeon");
        assert_eq!(a, b);
        assert_eq!(set.len(), 1);
        assert_eq!(set.name(a), Some("chests/simple_dungeon"));
    }

    #[test]
    fn test_resolve_unknown_table() {
        let set: LootTableSet = ["a", "b"].into_iter().collect();
        assert_eq!(set.resolve_loot("b"), Ok(LootHandle(1)));
        assert_eq!(
            set.resolve_loot("missing"),
            Err(UnknownLootTable("missing".into()))
        );
    }
}
