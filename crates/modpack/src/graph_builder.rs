//! Graph builder that discovers every module reachable from an entry point
//!
//! Traversal is breadth-first: ids are handed out in the order specifiers are
//! met, modules in queue order and specifiers in source order. Each
//! breadth-first level is loaded in parallel, but ids are reserved on the
//! builder thread before any load is dispatched, so the canonical-path table
//! stays the single place where module identity is decided.

use std::{
    collections::hash_map::Entry,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::{
    config::Config,
    error::{BundleError, ChainLink, ImportChain, Result},
    front_end::FrontEnd,
    graph::{Module, ModuleGraph},
    loader::ModuleLoader,
    resolver::ModuleResolver,
    types::{IdAllocator, ModuleId},
};

#[derive(Debug)]
pub struct DependencyGraphBuilder<F> {
    loader: ModuleLoader<F>,
    resolver: ModuleResolver,
    /// `None` loads modules on the calling thread
    pool: Option<rayon::ThreadPool>,
}

/// Mutable state of a single build
struct BuildState<P> {
    graph: ModuleGraph<P>,
    /// Canonical path -> id; the only place ids are decided
    visited: FxHashMap<PathBuf, ModuleId>,
    ids: IdAllocator,
    /// Canonical path of every reserved id, indexed by id
    paths: Vec<PathBuf>,
    /// The import edge through which each non-entry module was first discovered
    discovered_by: FxHashMap<ModuleId, (ModuleId, String)>,
}

impl<P> BuildState<P> {
    fn new() -> Self {
        Self {
            graph: ModuleGraph::new(),
            visited: FxHashMap::default(),
            ids: IdAllocator::new(),
            paths: Vec::new(),
            discovered_by: FxHashMap::default(),
        }
    }

    /// Check-and-insert `path`; returns its id and whether it was new
    fn visit(&mut self, path: PathBuf, via: Option<(ModuleId, &str)>) -> (ModuleId, bool) {
        match self.visited.entry(path) {
            Entry::Occupied(entry) => (*entry.get(), false),
            Entry::Vacant(entry) => {
                let id = self.ids.allocate();
                self.paths.push(entry.key().clone());
                entry.insert(id);
                if let Some((importer, specifier)) = via {
                    self.discovered_by
                        .insert(id, (importer, specifier.to_owned()));
                }
                (id, true)
            }
        }
    }

    /// Chain of imports from the entry module to `id`
    fn chain_to(&self, id: ModuleId) -> ImportChain {
        let mut links = Vec::new();
        let mut current = id;
        while let Some((importer, specifier)) = self.discovered_by.get(&current) {
            links.push(ChainLink {
                importer: self.paths[importer.as_usize()].clone(),
                specifier: specifier.clone(),
            });
            current = *importer;
        }
        links.reverse();
        ImportChain::from_links(links)
    }
}

impl<F: FrontEnd> DependencyGraphBuilder<F> {
    pub fn new(front_end: F, config: &Config) -> Self {
        let pool = if config.load_threads == 1 {
            None
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.load_threads)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("Failed to start loader threads, loading serially: {e}");
                    None
                }
            }
        };

        Self {
            loader: ModuleLoader::new(front_end),
            resolver: ModuleResolver::new(config),
            pool,
        }
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Build the module graph rooted at `entry`
    ///
    /// Aborts on the first error; no partial graph is returned.
    pub fn build(&self, entry: &Path) -> Result<ModuleGraph<F::Payload>> {
        let entry_path = self.resolve_entry(entry)?;
        info!("Building module graph from {}", entry_path.display());

        let mut state = BuildState::new();
        let (entry_id, _) = state.visit(entry_path.clone(), None);
        debug_assert!(entry_id.is_entry());

        let mut pending = vec![(entry_id, entry_path)];
        while !pending.is_empty() {
            let level: Vec<ModuleId> = pending.iter().map(|(id, _)| *id).collect();
            for result in self.load_level(&pending) {
                let module = result.map_err(|(id, e)| e.with_chain(state.chain_to(id)))?;
                state.graph.insert(module);
            }

            pending = Vec::new();
            for id in level {
                self.resolve_specifiers(&mut state, id, &mut pending)?;
            }
        }

        state.graph.index_edges();
        self.report_cycles(&state.graph);
        info!("Module graph complete: {} module(s)", state.graph.len());
        Ok(state.graph)
    }

    fn resolve_entry(&self, entry: &Path) -> Result<PathBuf> {
        if entry.is_file() {
            return Ok(ModuleResolver::canonicalize(entry));
        }
        self.resolver
            .resolve(&entry.to_string_lossy(), Path::new(""))
            .ok_or_else(|| BundleError::FileNotFound {
                path: entry.to_path_buf(),
                chain: ImportChain::new(),
            })
    }

    /// Load one breadth-first level; results come back in `pending` order
    #[allow(clippy::type_complexity)]
    fn load_level(
        &self,
        pending: &[(ModuleId, PathBuf)],
    ) -> Vec<std::result::Result<Module<F::Payload>, (ModuleId, BundleError)>> {
        let load = |(id, path): &(ModuleId, PathBuf)| {
            self.loader.load(*id, path).map_err(|e| (*id, e))
        };
        match &self.pool {
            Some(pool) if pending.len() > 1 => {
                debug!("Loading {} modules in parallel", pending.len());
                pool.install(|| pending.par_iter().map(load).collect())
            }
            _ => pending.iter().map(load).collect(),
        }
    }

    /// Resolve every specifier of module `id`, queueing newly discovered files
    fn resolve_specifiers(
        &self,
        state: &mut BuildState<F::Payload>,
        id: ModuleId,
        pending: &mut Vec<(ModuleId, PathBuf)>,
    ) -> Result<()> {
        let Some(module) = state.graph.get(id) else {
            return Ok(());
        };
        let directory = module.directory.clone();
        let importer = module.path.clone();
        let specifiers = module.specifiers.clone();

        for specifier in specifiers {
            let Some(path) = self.resolver.resolve(&specifier, &directory) else {
                let mut chain = state.chain_to(id);
                chain.push(importer.clone(), specifier.clone());
                return Err(BundleError::Resolution {
                    specifier,
                    importer,
                    chain,
                });
            };

            let (target, is_new) = state.visit(path.clone(), Some((id, &specifier)));
            if is_new {
                debug!("Discovered module {target}: '{specifier}' -> {}", path.display());
                pending.push((target, path));
            }
            state.graph.link(id, &specifier, target);
        }
        Ok(())
    }

    fn report_cycles(&self, graph: &ModuleGraph<F::Payload>) {
        for cycle in graph.cycles() {
            let names: Vec<String> = cycle
                .iter()
                .filter_map(|&id| graph.get(id))
                .map(|m| m.path.display().to_string())
                .collect();
            info!("Import cycle between: {}", names.join(", "));
        }
    }
}
