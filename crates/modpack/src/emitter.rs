//! Bundle table emission
//!
//! A purely structural step: every module of the graph becomes one table
//! entry holding its payload and specifier map, in id order.

use std::path::PathBuf;

use log::debug;

use crate::{
    graph::ModuleGraph,
    types::{ModuleId, SpecifierMap},
};

#[derive(Debug, Clone)]
pub struct BundleEntry<P> {
    pub payload: P,
    pub specifier_map: SpecifierMap,
    /// Source path, kept for diagnostics only
    pub path: PathBuf,
}

/// Id -> (payload, specifier map); index `n` holds module `n`
#[derive(Debug, Clone)]
pub struct BundleTable<P> {
    entries: Vec<BundleEntry<P>>,
}

impl<P> BundleTable<P> {
    pub fn from_entries(entries: Vec<BundleEntry<P>>) -> Self {
        Self { entries }
    }

    pub fn get(&self, id: ModuleId) -> Option<&BundleEntry<P>> {
        self.entries.get(id.as_usize())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &BundleEntry<P>)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (ModuleId::new(index as u32), entry))
    }
}

pub fn emit<P: Clone>(graph: &ModuleGraph<P>) -> BundleTable<P> {
    let entries: Vec<BundleEntry<P>> = graph
        .modules()
        .map(|module| BundleEntry {
            payload: module.payload.clone(),
            specifier_map: module.specifier_map.clone(),
            path: module.path.clone(),
        })
        .collect();
    debug!("Emitted bundle table with {} entries", entries.len());
    BundleTable { entries }
}
