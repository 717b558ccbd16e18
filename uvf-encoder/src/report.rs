/// Outcome of an encode call, returned to the caller instead of kept in global state.
use crate::classify::GeometryKind;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Single,
    Batch,
}

/// Batch member that was left out of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMesh {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodeReport {
    pub operation: Operation,
    /// Vertices across all encoded meshes.
    pub point_count: usize,
    /// Triangles across all encoded meshes.
    pub triangle_count: usize,
    /// Binaries written.
    pub file_count: usize,
    /// Type groups in the manifest.
    pub group_count: usize,
    /// Geometry kind of a single-mesh encode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<GeometryKind>,
    pub manifest_path: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedMesh>,
}

impl EncodeReport {
    pub(crate) fn new(operation: Operation, manifest_path: PathBuf) -> Self {
        Self {
            operation,
            point_count: 0,
            triangle_count: 0,
            file_count: 0,
            group_count: 0,
            kind: None,
            manifest_path,
            skipped: Vec::new(),
        }
    }

    pub(crate) fn record_mesh(&mut self, points: usize, triangles: usize) {
        self.point_count += points;
        self.triangle_count += triangles;
        self.file_count += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
