//! Field registry.
//!
//! Holds the set of known fields drawn or selected by the user. Fields
//! are immutable once created except for renaming, and are removed only
//! on explicit request.

use crate::models::Field;
use thiserror::Error;
use tracing::debug;

/// Errors raised by registry mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A field with this id already exists.
    #[error("field id '{0}' already exists")]
    DuplicateId(String),

    /// The field polygon has fewer than three vertices.
    #[error("field '{0}' has no usable geometry")]
    EmptyGeometry(String),

    /// No field with this id is registered.
    #[error("field '{0}' not found")]
    NotFound(String),
}

/// Registry of known fields, in insertion order.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    fields: Vec<Field>,
}

impl FieldRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field, making it available for selection.
    ///
    /// Rejects duplicate ids and polygons that cannot enclose an area.
    pub fn add_field(&mut self, field: Field) -> Result<(), RegistryError> {
        if self.find(&field.id).is_some() {
            return Err(RegistryError::DuplicateId(field.id));
        }
        if !field.geometry.is_usable() {
            return Err(RegistryError::EmptyGeometry(field.id));
        }
        debug!("Registered field '{}' ({})", field.name, field.id);
        self.fields.push(field);
        Ok(())
    }

    /// Look up a field by id.
    pub fn find(&self, id: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Rename a field. Renaming is the only mutation a field supports.
    #[allow(dead_code)] // Dashboard operation, not exposed on the CLI
    pub fn rename(&mut self, id: &str, name: impl Into<String>) -> Result<(), RegistryError> {
        match self.fields.iter_mut().find(|f| f.id == id) {
            Some(field) => {
                field.name = name.into();
                Ok(())
            }
            None => Err(RegistryError::NotFound(id.to_string())),
        }
    }

    /// Remove a field. Returns whether a field was removed.
    ///
    /// Cached analysis results for the field are NOT purged; they stay
    /// in the result store, unreachable through the registry.
    #[allow(dead_code)] // Dashboard operation, not exposed on the CLI
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.id != id);
        before != self.fields.len()
    }

    /// Insert without validation, for exercising downstream geometry
    /// checks against degenerate fields.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// All registered fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the registry is empty.
    #[allow(dead_code)] // Utility accessor
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
