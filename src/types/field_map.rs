//! Immutable, validated registry of field specs.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::path::Path;

use super::FieldSpec;
use crate::{EcmError, Result};

/// Ordered set of [`FieldSpec`]s with unique names.
///
/// A `FieldMap` can only be produced by [`FieldMapBuilder::build`], and exposes no
/// mutating methods afterwards. Share it between connections with `Arc<FieldMap>`.
#[derive(Debug, Clone)]
pub struct FieldMap {
    /// Specs in registration order
    specs: Vec<FieldSpec>,
    /// Name -> position in `specs`
    index: HashMap<String, usize>,
}

impl FieldMap {
    /// Start building a new field map.
    pub fn builder() -> FieldMapBuilder {
        FieldMapBuilder::default()
    }

    /// Build a field map from specs in order, failing on the first duplicate name.
    pub fn from_specs<I>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = FieldSpec>,
    {
        let mut builder = Self::builder();
        for spec in specs {
            builder.register(spec)?;
        }
        Ok(builder.build())
    }

    /// Build a field map from a YAML sequence of field entries.
    ///
    /// ```rust
    /// use ecmwatch::FieldMap;
    ///
    /// let map = FieldMap::from_yaml(r#"
    /// - { name: RPM, offset: 11, width: 2 }
    /// - { name: TE, offset: 30, width: 2, scale: 0.1, translate: -40.0 }
    /// "#).unwrap();
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let specs: Vec<FieldSpec> = serde_yaml_ng::from_str(yaml)?;
        Self::from_specs(specs)
    }

    /// Load a YAML field table from disk.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| EcmError::io_error(path.to_path_buf(), e))?;
        Self::from_yaml(&yaml)
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Result<&FieldSpec> {
        self.index.get(name).map(|&idx| &self.specs[idx]).ok_or_else(|| EcmError::unknown_field(name))
    }

    /// All specs in registration order.
    pub fn all(&self) -> &[FieldSpec] {
        &self.specs
    }

    /// Check if a field exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the map has no fields.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Fields starting at `offset`, in registration order.
    pub fn aliases_of(&self, offset: usize) -> impl Iterator<Item = &FieldSpec> {
        self.specs.iter().filter(move |spec| spec.offset == offset)
    }

    /// Minimum packet length that contains every field.
    pub fn max_extent(&self) -> usize {
        self.specs.iter().map(FieldSpec::end).max().unwrap_or(0)
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.specs.serialize(serializer)
    }
}

/// Accumulates specs for a [`FieldMap`]; consumed by [`FieldMapBuilder::build`].
#[derive(Debug, Default)]
pub struct FieldMapBuilder {
    specs: Vec<FieldSpec>,
    index: HashMap<String, usize>,
}

impl FieldMapBuilder {
    /// Register a spec.
    ///
    /// Sharing an offset with another spec is allowed; sharing a name is not and
    /// fails with [`EcmError::DuplicateName`].
    pub fn register(&mut self, spec: FieldSpec) -> Result<&mut Self> {
        if self.index.contains_key(&spec.name) {
            return Err(EcmError::DuplicateName { name: spec.name });
        }
        self.index.insert(spec.name.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(self)
    }

    /// Validate and register a field from its raw parts.
    pub fn field(
        &mut self,
        name: &str,
        offset: i64,
        width: i64,
        scale: f64,
        translate: f64,
    ) -> Result<&mut Self> {
        self.register(FieldSpec::new(name, offset, width, scale, translate)?)
    }

    /// Freeze the registered specs into an immutable map.
    pub fn build(self) -> FieldMap {
        FieldMap { specs: self.specs, index: self.index }
    }
}
