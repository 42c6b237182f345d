//! Module loading: one file in, one module record out

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use log::debug;
use sha2::{Digest, Sha256};

use crate::{
    error::{BundleError, ImportChain, Result},
    front_end::FrontEnd,
    graph::Module,
    types::{ModuleId, SpecifierMap},
};

/// Reads module sources and hands them to a front-end
#[derive(Debug)]
pub struct ModuleLoader<F> {
    front_end: F,
}

impl<F: FrontEnd> ModuleLoader<F> {
    pub fn new(front_end: F) -> Self {
        Self { front_end }
    }

    pub fn front_end(&self) -> &F {
        &self.front_end
    }

    /// Load the module at the canonical `path` under the already reserved `id`
    ///
    /// The returned module has an empty specifier map; the graph builder
    /// fills it in as it resolves the specifiers.
    pub fn load(&self, id: ModuleId, path: &Path) -> Result<Module<F::Payload>> {
        let bytes = std::fs::read(path).map_err(|e| BundleError::from_io(path, e))?;
        let content_hash = content_hash(&bytes);

        let source = String::from_utf8(bytes).map_err(|e| BundleError::Parse {
            path: path.to_path_buf(),
            message: format!("source is not valid UTF-8: {e}"),
            chain: ImportChain::new(),
        })?;

        let parsed = self
            .front_end
            .parse_module(path, &source)
            .map_err(|e| BundleError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
                chain: ImportChain::new(),
            })?;

        debug!(
            "Loaded module {id} from {} ({} specifiers)",
            path.display(),
            parsed.specifiers.len()
        );

        Ok(Module {
            id,
            path: path.to_path_buf(),
            directory: path.parent().map_or_else(PathBuf::new, Path::to_path_buf),
            specifiers: parsed.specifiers,
            specifier_map: SpecifierMap::default(),
            payload: parsed.payload,
            content_hash,
        })
    }
}

/// SHA-256 of the source bytes, hex encoded
fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
