//! Workspace manifest of the folder formats
//!
//! A hidden YAML file at the export root keeps what a directory layout cannot:
//! the order of the top-level pages and the envelope fields of the export the
//! workspace was first read from. Directory listings skip it like any other
//! dot file, and a tree without one reads as before.

use super::tree_walk::write_file;
use crate::diagnostics::{Diagnostics, WarningKind};
use crate::error::{FormatError, IoResultExt};
use crate::model::{ConversionData, ResourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = ".keeper.yaml";

/// Metadata keys that describe the source export rather than this run.
pub const ENVELOPE_KEYS: &[&str] = &["exportId", "exportedAt"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Entry names of the top-level pages, in order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roots: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub envelope: BTreeMap<String, String>,
}

/// Envelope fields present in `data`'s metadata.
pub fn envelope(data: &ConversionData) -> BTreeMap<String, String> {
    ENVELOPE_KEYS
        .iter()
        .filter_map(|key| data.metadata.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

impl Manifest {
    /// Manifest for `data`, naming each root through `entry_name`. Root order
    /// is only recorded when there is more than one root.
    pub fn for_data(data: &ConversionData, entry_name: impl Fn(&str) -> Option<String>) -> Self {
        let roots = if data.roots.len() > 1 {
            data.roots.iter().filter_map(|id| entry_name(id)).collect()
        } else {
            Vec::new()
        };
        Manifest {
            roots,
            envelope: envelope(data),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.envelope.is_empty()
    }

    /// Write the manifest into `dest`. An empty manifest writes nothing.
    pub fn write(&self, dest: &Path) -> Result<(), FormatError> {
        if self.is_empty() {
            return Ok(());
        }
        let yaml =
            serde_yaml::to_string(self).map_err(|e| FormatError::SerializationError(e.to_string()))?;
        write_file(&dest.join(MANIFEST_FILE), &yaml)
    }

    /// Read the manifest of the tree at `root`. A missing file is an empty
    /// manifest; an unreadable one is reported and ignored.
    pub fn read(root: &Path, diagnostics: &mut Diagnostics) -> Result<Self, FormatError> {
        let path = root.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(Manifest::default());
        }
        let text = fs::read_to_string(&path).at_path(&path)?;
        match serde_yaml::from_str::<Manifest>(&text) {
            Ok(mut manifest) => {
                manifest
                    .envelope
                    .retain(|key, _| ENVELOPE_KEYS.contains(&key.as_str()));
                Ok(manifest)
            }
            Err(err) => {
                diagnostics.warn(
                    WarningKind::MissingOptional,
                    MANIFEST_FILE,
                    format!("manifest ignored: {err}"),
                );
                Ok(Manifest::default())
            }
        }
    }

    /// Root ids in manifest order, through the parser's own entry lookup.
    pub fn root_order(&self, id_of: impl Fn(&str) -> Option<ResourceId>) -> Vec<ResourceId> {
        self.roots.iter().filter_map(|name| id_of(name)).collect()
    }
}
