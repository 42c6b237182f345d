//! Front-end collaborator interface
//!
//! A front-end turns the source text of one module into the ordered list of
//! static import specifiers it contains and an executable payload. The graph
//! builder never looks inside the payload.

mod script;

use std::path::Path;

pub(crate) use script::js_string;
pub use script::{ESM_MARKER, INTEROP_DEFAULT, INTEROP_STAR, ScriptFrontEnd, ScriptPayload};

/// Output of a front-end for one module
#[derive(Debug, Clone)]
pub struct ParsedModule<P> {
    /// Static import specifiers, deduplicated, in source order
    pub specifiers: Vec<String>,
    /// Executable form of the module body
    pub payload: P,
}

/// A front-end failed to understand a module
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the first diagnostic
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// Produces specifiers and payloads from module sources
///
/// Implementations must be pure: the same bytes always yield the same
/// output. They are called from worker threads during parallel loading.
pub trait FrontEnd: Send + Sync {
    type Payload: Send;

    fn parse_module(
        &self,
        path: &Path,
        source: &str,
    ) -> Result<ParsedModule<Self::Payload>, ParseError>;
}
