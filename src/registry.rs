//! Name-keyed registry of supported operations.
//!
//! Populated once at startup and shared read-only behind an `Arc`, so
//! concurrent lookups need no locking.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GatewayError, Result};
use crate::executor::OperationHandler;
use crate::schema::ParamSchema;

/// One supported remote operation: a unique name, its argument contract,
/// and the executor bound to it. Immutable once registered.
#[derive(Clone)]
pub struct OperationDescriptor {
    pub name: String,
    pub description: String,
    pub schema: ParamSchema,
    pub handler: Arc<dyn OperationHandler>,
}

impl std::fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<OperationDescriptor>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<()> {
        if self.operations.contains_key(&descriptor.name) {
            return Err(GatewayError::DuplicateOperation(descriptor.name));
        }
        tracing::debug!(operation = %descriptor.name, "registered operation");
        self.operations
            .insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<OperationDescriptor>> {
        self.operations
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownOperation(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Descriptors sorted by name, for a stable `tools/list`.
    pub fn descriptors(&self) -> Vec<Arc<OperationDescriptor>> {
        let mut all: Vec<_> = self.operations.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }
}
