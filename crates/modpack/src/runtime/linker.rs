use std::cell::RefCell;

use log::trace;
use rustc_hash::FxHashMap;

use super::{ModuleRecord, NativePayload, Require, RuntimeError, Value};
use crate::{emitter::BundleTable, types::ModuleId};

/// Cached state of one module
#[derive(Debug, Clone)]
pub struct ModuleInstance {
    pub exports: Value,
    /// Execution has begun. An instance is created, already started, just
    /// before its payload runs, so every cached instance has this set; the
    /// field mirrors the text runtime's cache entry, which carries the same
    /// flag.
    pub started: bool,
    /// The payload has returned successfully
    pub loaded: bool,
}

/// Executes a bundle table of native payloads
///
/// Each module runs at most once. The instance is cached before the payload
/// runs, so a circular `require` observes the live, partially filled
/// exports object instead of recursing.
#[derive(Debug)]
pub struct RuntimeLinker<'t> {
    table: &'t BundleTable<NativePayload>,
    instances: RefCell<FxHashMap<ModuleId, ModuleInstance>>,
}

impl<'t> RuntimeLinker<'t> {
    pub fn new(table: &'t BundleTable<NativePayload>) -> Self {
        Self {
            table,
            instances: RefCell::new(FxHashMap::default()),
        }
    }

    /// Evaluate the bundle starting from the entry module
    pub fn run(&self) -> Result<Value, RuntimeError> {
        self.request(ModuleId::ENTRY)
    }

    pub fn request(&self, id: ModuleId) -> Result<Value, RuntimeError> {
        if let Some(instance) = self.instances.borrow().get(&id) {
            trace!("Module {id} already instantiated (loaded: {})", instance.loaded);
            return Ok(instance.exports.clone());
        }

        let entry = self.table.get(id).ok_or(RuntimeError::UnknownModule(id))?;
        let exports = Value::object();
        self.instances.borrow_mut().insert(
            id,
            ModuleInstance {
                exports: exports.clone(),
                started: true,
                loaded: false,
            },
        );

        trace!("Executing module {id}");
        let require = Require {
            linker: self,
            module: id,
            specifier_map: &entry.specifier_map,
        };
        let mut record = ModuleRecord {
            exports: exports.clone(),
        };
        entry
            .payload
            .call(&require, &mut record, &exports)
            .map_err(|e| match e.downcast::<RuntimeError>() {
                Ok(nested) => nested,
                Err(source) => RuntimeError::Evaluation { module: id, source },
            })?;

        let mut instances = self.instances.borrow_mut();
        let instance = instances
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownModule(id))?;
        instance.exports = record.exports;
        instance.loaded = true;
        Ok(instance.exports.clone())
    }

    /// Snapshot of a module's cached instance, if it was ever requested
    pub fn instance(&self, id: ModuleId) -> Option<ModuleInstance> {
        self.instances.borrow().get(&id).cloned()
    }
}
