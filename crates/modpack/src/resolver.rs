use std::path::{Path, PathBuf};

use log::{trace, warn};

use crate::config::Config;

/// Resolves import specifiers to canonical file paths
///
/// Resolution order for a specifier joined to the importer's directory:
/// 1. The path exactly as written, if it is a file
/// 2. The path with each configured extension appended
/// 3. `index` plus each extension, if the path is a directory
#[derive(Debug, Clone)]
pub struct ModuleResolver {
    extensions: Vec<String>,
    index_files: bool,
}

impl ModuleResolver {
    pub fn new(config: &Config) -> Self {
        Self {
            extensions: config.extensions.clone(),
            index_files: config.index_files,
        }
    }

    /// Canonicalize a path that is known to exist
    ///
    /// Falls back to the given path if the filesystem refuses, so a race with
    /// a deleted file surfaces as a load error instead of a resolution error.
    pub fn canonicalize(path: &Path) -> PathBuf {
        match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) => {
                warn!("Failed to canonicalize path {}: {}", path.display(), e);
                path.to_path_buf()
            }
        }
    }

    /// Resolve `specifier` written in a module living in `importer_dir`
    ///
    /// Returns the canonical path, or `None` if no candidate file exists.
    pub fn resolve(&self, specifier: &str, importer_dir: &Path) -> Option<PathBuf> {
        if specifier.is_empty() {
            return None;
        }

        let target = importer_dir.join(specifier);
        trace!(
            "Resolving '{specifier}' from {} as {}",
            importer_dir.display(),
            target.display()
        );

        if target.is_file() {
            return Some(Self::canonicalize(&target));
        }

        if let Some(found) = self.with_extensions(&target) {
            return Some(found);
        }

        if self.index_files && target.is_dir() {
            return self.with_extensions(&target.join("index"));
        }

        None
    }

    /// Try `<path><ext>` for every configured extension
    fn with_extensions(&self, path: &Path) -> Option<PathBuf> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        self.extensions.iter().find_map(|ext| {
            let candidate = path.with_file_name(format!("{file_name}{ext}"));
            candidate.is_file().then(|| Self::canonicalize(&candidate))
        })
    }
}
