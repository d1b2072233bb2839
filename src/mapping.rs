//! How to find each requested field's value inside a fetch result, and the
//! per-request store those mappings are persisted into before the fetch runs.

use crate::JsonValue;
use apollo_compiler::Name;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mapping entries for one scope, keyed by response key (alias or field name).
pub type FieldMappings = IndexMap<Name, FieldMapping>;

/// Records, for one output key, where the merged fetch put the data:
/// the underlying field name (which may differ from the alias), the mappings
/// of the field's own sub-selections, and the chain of wrapper fields the
/// value is nested under relative to where this mapping was recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    pub field: Name,
    pub mappings: FieldMappings,
    pub indirect_path: Vec<Name>,
}

impl FieldMapping {
    /// Looks up this mapping's value in a fetch result object, descending
    /// through the indirection path first.
    pub fn locate<'a>(&self, result: &'a JsonValue) -> Option<&'a JsonValue> {
        let mut value = result;
        for segment in &self.indirect_path {
            value = value.as_object()?.get(segment.as_str())?;
        }
        value.as_object()?.get(self.field.as_str())
    }
}

/// One step of a response path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(Name),
    Index(usize),
}

/// Where in the response the current field resolution lives.
pub type ResponsePath = Vec<PathSegment>;

/// Request-scoped storage for compiled mappings, keyed by the response path
/// of the resolution that produced them.
///
/// Hosts may resolve sibling root fields concurrently; each resolution
/// targets a distinct path, so writes are first-write-wins and never race on
/// the same entry.
#[derive(Debug, Default)]
pub struct MappingStore {
    inner: Mutex<HashMap<ResponsePath, FieldMappings>>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the mappings for a resolution path. A path is only ever
    /// written once; a second write to the same path is ignored.
    pub fn insert(&self, path: ResponsePath, mappings: FieldMappings) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(path)
            .or_insert(mappings);
    }

    pub fn get(&self, path: &ResponsePath) -> Option<FieldMappings> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(path)
            .cloned()
    }

    /// Removes and returns the mappings for a path, for result extraction
    /// once the fetch has completed.
    pub fn take(&self, path: &ResponsePath) -> Option<FieldMappings> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(path)
    }
}
