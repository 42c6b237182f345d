//! Build-time error types
//!
//! Every error raised while constructing the module graph carries the
//! [`ImportChain`] that led from the entry module to the failure point.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// Result type for build-time operations
pub type Result<T> = std::result::Result<T, BundleError>;

/// One import edge on the way to a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    /// Module that contains the import statement
    pub importer: PathBuf,
    /// Specifier as written in the importer
    pub specifier: String,
}

/// Path from the entry module to the module or specifier that failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportChain {
    links: Vec<ChainLink>,
}

impl ImportChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_links(links: Vec<ChainLink>) -> Self {
        Self { links }
    }

    pub fn push(&mut self, importer: impl Into<PathBuf>, specifier: impl Into<String>) {
        self.links.push(ChainLink {
            importer: importer.into(),
            specifier: specifier.into(),
        });
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The specifiers only, entry first
    pub fn specifiers(&self) -> Vec<&str> {
        self.links.iter().map(|l| l.specifier.as_str()).collect()
    }
}

impl fmt::Display for ImportChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.links.first() else {
            return write!(f, "<entry>");
        };
        write!(f, "{}", display_name(&first.importer))?;
        for link in &self.links {
            write!(f, " -> '{}'", link.specifier)?;
        }
        Ok(())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Errors that abort a build
#[derive(Debug, Error)]
pub enum BundleError {
    /// Nothing exists at a resolved absolute path
    #[error("file not found: {} (import chain: {chain})", .path.display())]
    FileNotFound { path: PathBuf, chain: ImportChain },

    /// The front-end rejected the module source
    #[error("failed to parse {}: {message} (import chain: {chain})", .path.display())]
    Parse {
        path: PathBuf,
        message: String,
        chain: ImportChain,
    },

    /// A specifier does not name an existing file relative to its importer
    #[error(
        "cannot resolve '{specifier}' from {} (import chain: {chain})",
        .importer.display()
    )]
    Resolution {
        specifier: String,
        importer: PathBuf,
        chain: ImportChain,
    },

    /// Reading a module failed for a reason other than absence
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        chain: ImportChain,
    },
}

impl BundleError {
    /// Attach the chain that led to this error
    #[must_use]
    pub fn with_chain(mut self, new_chain: ImportChain) -> Self {
        match &mut self {
            Self::FileNotFound { chain, .. }
            | Self::Parse { chain, .. }
            | Self::Resolution { chain, .. }
            | Self::Io { chain, .. } => *chain = new_chain,
        }
        self
    }

    pub fn chain(&self) -> &ImportChain {
        match self {
            Self::FileNotFound { chain, .. }
            | Self::Parse { chain, .. }
            | Self::Resolution { chain, .. }
            | Self::Io { chain, .. } => chain,
        }
    }

    /// Map an I/O failure for `path`, separating "not found" from the rest
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
                chain: ImportChain::new(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
                chain: ImportChain::new(),
            }
        }
    }
}
