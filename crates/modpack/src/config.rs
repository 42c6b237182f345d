//! Bundler configuration
//!
//! Settings are layered, lowest precedence first: built-in defaults, the user
//! config file, `modpack.toml` in the working directory, an explicit config
//! file, then `MODPACK_*` environment variables. CLI flags are applied on top
//! by the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::dirs;

const ENV_EXTENSIONS: &str = "MODPACK_EXTENSIONS";
const ENV_LOAD_THREADS: &str = "MODPACK_LOAD_THREADS";
const ENV_MINIFY: &str = "MODPACK_MINIFY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Extensions tried, in order, when a specifier does not name a file as written
    pub extensions: Vec<String>,
    /// Resolve a directory specifier to its `index` file
    pub index_files: bool,
    /// Worker threads used to load modules; 0 picks one per core, 1 loads serially
    pub load_threads: usize,
    /// Compress and mangle module payloads
    pub minify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_owned(), ".mjs".to_owned(), ".cjs".to_owned()],
            index_files: true,
            load_threads: 0,
            minify: true,
        }
    }
}

/// A config file as written on disk; unset keys leave lower layers alone
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
    extensions: Option<Vec<String>>,
    index_files: Option<bool>,
    load_threads: Option<usize>,
    minify: Option<bool>,
}

impl Config {
    /// Load the layered configuration
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_file) = dirs::user_config_file() {
            config.merge_file_if_exists(&user_file)?;
        }

        let project_file = PathBuf::from(dirs::CONFIG_FILE_NAME);
        config.merge_file_if_exists(&project_file)?;

        if let Some(path) = explicit {
            // An explicitly named file must exist
            config.merge_file(path)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    fn merge_file_if_exists(&mut self, path: &Path) -> Result<()> {
        if path.is_file() {
            self.merge_file(path)?;
        }
        Ok(())
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        self.merge_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(())
    }

    /// Merge one TOML document into this configuration
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(content)?;
        if let Some(extensions) = file.extensions {
            self.extensions = normalize_extensions(extensions);
        }
        if let Some(index_files) = file.index_files {
            self.index_files = index_files;
        }
        if let Some(load_threads) = file.load_threads {
            self.load_threads = load_threads;
        }
        if let Some(minify) = file.minify {
            self.minify = minify;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = std::env::var(ENV_EXTENSIONS) {
            self.extensions = normalize_extensions(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect(),
            );
        }
        if let Ok(value) = std::env::var(ENV_LOAD_THREADS) {
            self.load_threads = value
                .trim()
                .parse()
                .with_context(|| format!("{ENV_LOAD_THREADS} must be a number, got '{value}'"))?;
        }
        if let Ok(value) = std::env::var(ENV_MINIFY) {
            self.minify = match value.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                other => anyhow::bail!("{ENV_MINIFY} must be true or false, got '{other}'"),
            };
        }
        Ok(())
    }
}

/// Accept both `js` and `.js`
fn normalize_extensions(extensions: Vec<String>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|ext| {
            if ext.starts_with('.') {
                ext
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.extensions, vec![".js", ".mjs", ".cjs"]);
        assert!(config.index_files);
        assert_eq!(config.load_threads, 0);
        assert!(config.minify);
    }

    #[test]
    fn test_merge_keeps_unset_keys() {
        let mut config = Config::default();
        config
            .merge_str("extensions = [\"ts\", \".js\"]\n")
            .expect("valid config");
        assert_eq!(config.extensions, vec![".ts", ".js"]);
        assert!(config.index_files);

        config
            .merge_str("index-files = false\nload-threads = 2\nminify = false\n")
            .expect("valid config");
        assert_eq!(config.extensions, vec![".ts", ".js"]);
        assert!(!config.index_files);
        assert_eq!(config.load_threads, 2);
        assert!(!config.minify);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let mut config = Config::default();
        assert!(config.merge_str("tree-shaking = true\n").is_err());
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("custom.toml");
        std::fs::write(&file, "load-threads = 4\n").expect("write config");

        // SAFETY: serialized with the other environment tests
        unsafe {
            std::env::set_var(ENV_LOAD_THREADS, "1");
            std::env::set_var(ENV_EXTENSIONS, "mjs, js");
            std::env::set_var(ENV_MINIFY, "false");
        }
        let config = Config::load(Some(&file));
        unsafe {
            std::env::remove_var(ENV_LOAD_THREADS);
            std::env::remove_var(ENV_EXTENSIONS);
            std::env::remove_var(ENV_MINIFY);
        }

        let config = config.expect("config loads");
        assert_eq!(config.load_threads, 1);
        assert_eq!(config.extensions, vec![".mjs", ".js"]);
        assert!(!config.minify);
    }

    #[test]
    #[serial]
    fn test_bad_env_value_is_an_error() {
        // SAFETY: serialized with the other environment tests
        unsafe {
            std::env::set_var(ENV_LOAD_THREADS, "many");
        }
        let result = Config::load(None);
        unsafe {
            std::env::remove_var(ENV_LOAD_THREADS);
        }
        assert!(result.is_err());
    }
}
