//! Schema registry
//!
//! A process-wide, read-mostly store of table schemas. Validation never
//! reads the live map: it takes a [`SchemaSnapshot`], an immutable
//! versioned view, so concurrent statements cannot observe a schema
//! mutated mid-validation. Registration copies the map (copy-on-write),
//! leaving existing snapshots untouched.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::schema::Schema;

#[derive(Default)]
struct Inner {
    version: u64,
    schemas: Arc<HashMap<String, Arc<Schema>>>,
}

/// Shared, thread-safe schema registry.
#[derive(Clone, Default)]
pub struct SchemaRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a schema under its own name.
    pub fn register(&self, schema: Schema) {
        let mut inner = self.inner.write();
        let mut schemas = (*inner.schemas).clone();
        schemas.insert(schema.name.clone(), Arc::new(schema));
        inner.schemas = Arc::new(schemas);
        inner.version += 1;
    }

    /// Removes a schema. Returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        if !inner.schemas.contains_key(name) {
            return false;
        }
        let mut schemas = (*inner.schemas).clone();
        schemas.remove(name);
        inner.schemas = Arc::new(schemas);
        inner.version += 1;
        true
    }

    /// An immutable view of the registry as of now.
    pub fn snapshot(&self) -> SchemaSnapshot {
        let inner = self.inner.read();
        SchemaSnapshot {
            version: inner.version,
            schemas: Arc::clone(&inner.schemas),
        }
    }
}

/// An immutable, versioned view of the registry. Cheap to clone and safe
/// to hold across a whole pipeline invocation.
#[derive(Clone)]
pub struct SchemaSnapshot {
    version: u64,
    schemas: Arc<HashMap<String, Arc<Schema>>>,
}

impl SchemaSnapshot {
    /// Monotonic registry version this snapshot was taken at.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn lookup(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name).map(|s| s.as_ref())
    }
}
