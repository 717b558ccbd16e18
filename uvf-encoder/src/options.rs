/// Encoder configuration.
use crate::error::{EncodeError, EncodeResult};
use crate::packer::FieldPolicy;
use constants::{
    DEFAULT_BINARY_NAME, DEFAULT_MANIFEST_NAME, DEFAULT_MESH_NAME, DEFAULT_RESOURCES_DIR,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Output naming and policy knobs for one encoder.
/// Every field is optional in JSON; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Face id of an unsegmented single mesh, also used as the classification name hint.
    pub mesh_name: String,
    /// Binary file name in single-mesh mode.
    pub binary_name: String,
    pub manifest_name: String,
    /// Per-mesh binary directory in batch mode, relative to the output root.
    pub resources_dir: String,
    pub field_policy: FieldPolicy,
    /// Pretty-print manifest JSON.
    pub pretty: bool,
    /// Show a progress bar during batch encodes.
    pub progress: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            mesh_name: DEFAULT_MESH_NAME.to_string(),
            binary_name: DEFAULT_BINARY_NAME.to_string(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            resources_dir: DEFAULT_RESOURCES_DIR.to_string(),
            field_policy: FieldPolicy::default(),
            pretty: false,
            progress: false,
        }
    }
}

impl EncodeOptions {
    /// Loads options from a JSON document.
    pub fn from_json_file(path: &Path) -> EncodeResult<Self> {
        let json = fs::read_to_string(path).map_err(|e| EncodeError::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}
