//! Packet layouts
//!
//! Field tables are data: the built-in layouts live in static tables and are fed
//! through the same validating [`FieldMapBuilder`](crate::FieldMapBuilder) as
//! tables loaded from YAML files, so a malformed entry is rejected at startup
//! either way.

pub mod buegb;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::{FieldMap, Result};

pub use buegb::{BUEGB_PACKET_LEN, BUEGB_RT_LAYOUT, buegb_field_map};

/// Where the active field map comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldMapSource {
    /// The built-in BUEGB runtime data layout
    #[default]
    Buegb,
    /// A YAML sequence of field entries on disk
    File { path: PathBuf },
}

impl FieldMapSource {
    /// Build and validate the field map.
    pub fn load(&self) -> Result<FieldMap> {
        let map = match self {
            FieldMapSource::Buegb => buegb_field_map()?,
            FieldMapSource::File { path } => FieldMap::from_yaml_file(path)?,
        };
        info!(fields = map.len(), extent = map.max_extent(), source = ?self, "Field map loaded");
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_source_is_reference_layout() {
        let map = FieldMapSource::default().load().unwrap();
        assert!(map.contains("RPM"));
        assert_eq!(map.max_extent(), BUEGB_PACKET_LEN);
    }

    #[test]
    fn missing_file_is_io_error() {
        let source = FieldMapSource::File { path: PathBuf::from("/nonexistent/fields.yaml") };
        assert!(matches!(source.load(), Err(crate::EcmError::Io { .. })));
    }

    #[test]
    fn source_deserializes_from_yaml() {
        let source: FieldMapSource =
            serde_yaml_ng::from_str("kind: file\npath: maps/custom.yaml").unwrap();
        assert_eq!(source, FieldMapSource::File { path: PathBuf::from("maps/custom.yaml") });

        let source: FieldMapSource = serde_yaml_ng::from_str("kind: buegb").unwrap();
        assert_eq!(source, FieldMapSource::Buegb);
    }
}
