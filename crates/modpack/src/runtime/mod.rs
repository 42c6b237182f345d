//! In-process module runtime
//!
//! Executes a bundle table whose payloads are native closures, following the
//! same instance-cache protocol as the script runtime written by
//! [`crate::render`].

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::types::{ModuleId, SpecifierMap};

mod linker;
mod value;

pub use linker::{ModuleInstance, RuntimeLinker};
pub use value::{ObjectRef, Value};

/// The `module` object a payload receives
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Starts as the instance's exports object; may be reassigned
    pub exports: Value,
}

type PayloadFn =
    dyn Fn(&Require<'_>, &mut ModuleRecord, &Value) -> anyhow::Result<()> + Send + Sync;

/// A module body compiled to a native closure
#[derive(Clone)]
pub struct NativePayload(Arc<PayloadFn>);

impl NativePayload {
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&Require<'_>, &mut ModuleRecord, &Value) -> anyhow::Result<()>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(body))
    }

    pub fn call(
        &self,
        require: &Require<'_>,
        module: &mut ModuleRecord,
        exports: &Value,
    ) -> anyhow::Result<()> {
        (self.0)(require, module, exports)
    }
}

impl fmt::Debug for NativePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativePayload(..)")
    }
}

/// The module-local `require` handed to a payload
///
/// Only specifiers present in the module's specifier map can be requested.
#[derive(Debug, Clone, Copy)]
pub struct Require<'a> {
    linker: &'a RuntimeLinker<'a>,
    module: ModuleId,
    specifier_map: &'a SpecifierMap,
}

impl Require<'_> {
    pub fn call(&self, specifier: &str) -> Result<Value, RuntimeError> {
        let id = self
            .specifier_map
            .get(specifier)
            .copied()
            .ok_or_else(|| RuntimeError::UnknownSpecifier {
                module: self.module,
                specifier: specifier.to_owned(),
            })?;
        self.linker.request(id)
    }

    /// Id of the module this `require` belongs to
    pub fn module(&self) -> ModuleId {
        self.module
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A payload returned an error of its own
    #[error("module {module} failed: {source}")]
    Evaluation {
        module: ModuleId,
        #[source]
        source: anyhow::Error,
    },

    #[error("module {module} requested '{specifier}', which it never imported")]
    UnknownSpecifier { module: ModuleId, specifier: String },

    #[error("no module with id {0} in the bundle table")]
    UnknownModule(ModuleId),
}
