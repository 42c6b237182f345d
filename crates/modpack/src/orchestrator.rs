//! End-to-end bundling: build the graph, emit the table, render the script

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::{
    config::Config,
    emitter,
    front_end::{ScriptFrontEnd, ScriptPayload},
    graph::ModuleGraph,
    graph_builder::DependencyGraphBuilder,
    render::render_script,
    types::{ModuleId, SpecifierMap},
};

#[derive(Debug)]
pub struct BundleOrchestrator {
    config: Config,
}

/// Everything one bundling run produced
#[derive(Debug)]
pub struct BundleOutput {
    pub graph: ModuleGraph<ScriptPayload>,
    pub script: String,
}

/// JSON description of a bundle, written next to it on request
#[derive(Debug, Serialize)]
pub struct BundleManifest {
    pub entry: PathBuf,
    pub modules: Vec<ManifestModule>,
    pub cycles: Vec<Vec<ModuleId>>,
}

#[derive(Debug, Serialize)]
pub struct ManifestModule {
    pub id: ModuleId,
    pub path: PathBuf,
    pub content_hash: String,
    pub specifier_map: SpecifierMap,
}

impl BundleOrchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bundle the module graph rooted at `entry`
    pub fn bundle(&self, entry: &Path) -> Result<BundleOutput> {
        info!("Bundling {}", entry.display());
        let front_end = ScriptFrontEnd::new().with_minify(self.config.minify);
        let builder = DependencyGraphBuilder::new(front_end, &self.config);
        let graph = builder
            .build(entry)
            .with_context(|| format!("Failed to bundle {}", entry.display()))?;

        let cycles = graph.cycles();
        if !cycles.is_empty() {
            warn!(
                "Bundle contains {} import cycle(s); circular requires see partially initialized exports",
                cycles.len()
            );
        }

        let table = emitter::emit(&graph);
        let script = render_script(&table);
        info!("Bundled {} module(s)", graph.len());
        Ok(BundleOutput { graph, script })
    }

    /// Bundle `entry` and write the script to `output`
    ///
    /// Nothing is written unless the whole build succeeds. The script goes to
    /// a temporary file next to `output` and is renamed over it, so readers
    /// never see a partial bundle.
    pub fn bundle_to_file(&self, entry: &Path, output: &Path) -> Result<BundleOutput> {
        let bundle = self.bundle(entry)?;
        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create output directory {}", parent.display())
        })?;

        let mut staged = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
        staged
            .write_all(bundle.script.as_bytes())
            .and_then(|()| staged.flush())
            .with_context(|| format!("Failed to write bundle to {}", staged.path().display()))?;
        staged
            .persist(output)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write bundle to {}", output.display()))?;
        info!("Wrote bundle to {}", output.display());
        Ok(bundle)
    }
}

impl BundleOutput {
    pub fn manifest(&self) -> BundleManifest {
        BundleManifest {
            entry: self
                .graph
                .entry()
                .map(|m| m.path.clone())
                .unwrap_or_default(),
            modules: self
                .graph
                .modules()
                .map(|m| ManifestModule {
                    id: m.id,
                    path: m.path.clone(),
                    content_hash: m.content_hash.clone(),
                    specifier_map: m.specifier_map.clone(),
                })
                .collect(),
            cycles: self.graph.cycles(),
        }
    }

    pub fn write_manifest(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.manifest())
            .context("Failed to serialize bundle manifest")?;
        std::fs::write(path, format!("{json}\n"))
            .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
        info!("Wrote manifest to {}", path.display());
        Ok(())
    }
}
