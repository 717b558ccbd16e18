/// Error types for the encoding pipeline.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for encoding operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Errors raised while acquiring, packing or writing a UVF dataset.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Mesh has no vertex positions.
    #[error("mesh has no vertex positions")]
    EmptyMesh,

    /// Batch encode was handed no meshes.
    #[error("batch contains no meshes")]
    EmptyBatch,

    /// Vertex or index buffer breaks the triplet layout.
    #[error("invalid mesh: {message}")]
    InvalidMesh { message: String },

    /// Scalar field length is not a positive multiple of the vertex count.
    #[error("scalar field '{name}' has {len} values for {vertex_count} vertices")]
    MalformedField {
        name: String,
        len: usize,
        vertex_count: usize,
    },

    /// Per-triangle face index array does not cover the triangle list.
    #[error("face index array has {face_indices} entries for {triangles} triangles")]
    FaceIndexMismatch {
        triangles: usize,
        face_indices: usize,
    },

    /// Filesystem failure on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest or mesh document (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Mesh source could not be parsed.
    #[error("invalid mesh source: {message}")]
    InvalidSource { message: String },

    /// Batch label cannot name a mesh inside the output directory.
    #[error("invalid label '{label}': {reason}")]
    InvalidLabel { label: String, reason: &'static str },

    /// Mesh source has an extension no loader handles.
    #[error("unsupported mesh source format: .{extension}")]
    UnsupportedFormat { extension: String },
}

impl EncodeError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    pub fn invalid_source(message: impl Into<String>) -> Self {
        Self::InvalidSource {
            message: message.into(),
        }
    }
}
