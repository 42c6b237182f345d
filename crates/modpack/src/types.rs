//! Shared type definitions for the modpack crate
//!
//! Identifiers and map aliases used by both the build-time pipeline and the
//! in-process runtime.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;
use serde::Serialize;

/// Type alias for FxHasher-based IndexMap
pub type FxIndexMap<K, V> = IndexMap<K, V, std::hash::BuildHasherDefault<FxHasher>>;

/// Type alias for FxHasher-based IndexSet
pub type FxIndexSet<T> = IndexSet<T, std::hash::BuildHasherDefault<FxHasher>>;

/// Specifier string as written in the importing module -> id it resolved to
pub type SpecifierMap = FxIndexMap<String, ModuleId>;

/// Unique identifier for a module
///
/// Ids form a dense range starting at zero in first-discovery order; the
/// entry module is always [`ModuleId::ENTRY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    /// The entry module
    pub const ENTRY: Self = Self(0);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value of the ModuleId
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_entry(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out module ids; owned by a single graph builder
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id
    pub fn allocate(&mut self) -> ModuleId {
        let id = ModuleId::new(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far
    pub fn allocated(&self) -> usize {
        self.next as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_is_dense_from_zero() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.allocate(), ModuleId::ENTRY);
        assert_eq!(ids.allocate(), ModuleId::new(1));
        assert_eq!(ids.allocate(), ModuleId::new(2));
        assert_eq!(ids.allocated(), 3);
    }

    #[test]
    fn test_module_id_display() {
        assert_eq!(ModuleId::new(7).to_string(), "7");
        assert!(ModuleId::ENTRY.is_entry());
        assert!(!ModuleId::new(3).is_entry());
    }
}
