//! ModuleGraph: the set of modules reachable from one entry point
//!
//! Modules are stored densely by id (id 0 is the entry). Alongside the
//! modules the graph keeps:
//! - the canonical path -> id table that defines module identity
//! - a petgraph edge set (importer -> imported) for cycle reporting

use std::path::{Path, PathBuf};

use log::debug;
use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use rustc_hash::FxHashMap;

use crate::types::{ModuleId, SpecifierMap};

/// One physical module
#[derive(Debug, Clone)]
pub struct Module<P> {
    pub id: ModuleId,
    /// Canonical absolute path of the source file
    pub path: PathBuf,
    /// Directory relative specifiers in this module are resolved against
    pub directory: PathBuf,
    /// Static specifiers in source order, as produced by the front-end
    pub specifiers: Vec<String>,
    /// Specifier -> id of the module it resolved to
    pub specifier_map: SpecifierMap,
    pub payload: P,
    /// SHA-256 of the source bytes (hex-encoded)
    pub content_hash: String,
}

#[derive(Debug)]
pub struct ModuleGraph<P> {
    /// Indexed by `ModuleId::as_usize`
    modules: Vec<Module<P>>,
    paths: FxHashMap<PathBuf, ModuleId>,
    edges: DiGraph<ModuleId, ()>,
    node_indices: FxHashMap<ModuleId, NodeIndex>,
}

impl<P> ModuleGraph<P> {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            paths: FxHashMap::default(),
            edges: DiGraph::new(),
            node_indices: FxHashMap::default(),
        }
    }

    /// Add a module; ids must arrive densely and in order
    pub fn insert(&mut self, module: Module<P>) {
        assert_eq!(
            module.id.as_usize(),
            self.modules.len(),
            "modules must be inserted in id order"
        );
        let node = self.edges.add_node(module.id);
        self.node_indices.insert(module.id, node);
        self.paths.insert(module.path.clone(), module.id);
        self.modules.push(module);
    }

    /// Record that `from` imports `specifier`, which resolved to `to`
    ///
    /// `to` may not be inserted yet when its load is still pending.
    pub fn link(&mut self, from: ModuleId, specifier: &str, to: ModuleId) {
        if let Some(module) = self.modules.get_mut(from.as_usize()) {
            module.specifier_map.insert(specifier.to_owned(), to);
        }
    }

    /// Build the petgraph edge set from the specifier maps
    ///
    /// Called once all modules are present.
    pub(crate) fn index_edges(&mut self) {
        self.edges.clear_edges();
        for module in &self.modules {
            let from = self.node_indices[&module.id];
            for &to in module.specifier_map.values() {
                if let Some(&to) = self.node_indices.get(&to) {
                    if !self.edges.contains_edge(from, to) {
                        self.edges.add_edge(from, to, ());
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module<P>> {
        self.modules.get(id.as_usize())
    }

    pub fn entry(&self) -> Option<&Module<P>> {
        self.get(ModuleId::ENTRY)
    }

    pub fn id_for_path(&self, path: &Path) -> Option<ModuleId> {
        self.paths.get(path).copied()
    }

    /// Modules in id order
    pub fn modules(&self) -> impl Iterator<Item = &Module<P>> {
        self.modules.iter()
    }

    pub fn into_modules(self) -> Vec<Module<P>> {
        self.modules
    }

    /// Ids of the modules `id` imports, in specifier order
    pub fn dependencies(&self, id: ModuleId) -> Vec<ModuleId> {
        self.get(id)
            .map(|m| m.specifier_map.values().copied().collect())
            .unwrap_or_default()
    }

    /// Ids of the modules importing `id`
    pub fn dependents(&self, id: ModuleId) -> Vec<ModuleId> {
        let mut dependents: Vec<ModuleId> = self
            .modules
            .iter()
            .filter(|m| m.specifier_map.values().any(|&to| to == id))
            .map(|m| m.id)
            .collect();
        dependents.sort_unstable();
        dependents
    }

    /// Every import cycle: strongly connected components with more than one
    /// module, plus modules that import themselves. Each cycle is sorted by
    /// id and the list is ordered by its smallest id.
    pub fn cycles(&self) -> Vec<Vec<ModuleId>> {
        let mut cycles: Vec<Vec<ModuleId>> = tarjan_scc(&self.edges)
            .into_iter()
            .filter(|scc| {
                scc.len() > 1 || self.edges.contains_edge(scc[0], scc[0])
            })
            .map(|scc| {
                let mut ids: Vec<ModuleId> = scc.into_iter().map(|n| self.edges[n]).collect();
                ids.sort_unstable();
                ids
            })
            .collect();
        cycles.sort_unstable_by_key(|ids| ids[0]);
        debug!("Found {} import cycle(s)", cycles.len());
        cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles().is_empty()
    }
}

impl<P> Default for ModuleGraph<P> {
    fn default() -> Self {
        Self::new()
    }
}
