/// Face segmentation of the index buffer.
use crate::error::{EncodeError, EncodeResult};
use crate::mesh::FaceAssignment;
use constants::{SYNTHETIC_FACE_PREFIX, TRIANGLE_ARITY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Named half-open range `[start_index, end_index)` over the flattened index buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceSegment {
    pub id: String,
    pub start_index: u64,
    pub end_index: u64,
}

impl FaceSegment {
    pub fn len(&self) -> u64 {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.start_index == self.end_index
    }
}

/// Index buffer ready for packing, plus its face ranges when segmented.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedIndices {
    pub indices: Vec<u32>,
    pub segments: Option<Vec<FaceSegment>>,
}

impl SegmentedIndices {
    fn unsegmented(triangles: &[u32]) -> Self {
        Self {
            indices: triangles.to_vec(),
            segments: None,
        }
    }
}

/// Segment id for a face key: the supplied name if present, else `uvf_Face<key>`.
pub fn face_id(key: i32, names: &[String]) -> String {
    usize::try_from(key)
        .ok()
        .and_then(|slot| names.get(slot))
        .filter(|name| !name.is_empty())
        .cloned()
        .unwrap_or_else(|| format!("{SYNTHETIC_FACE_PREFIX}{key}"))
}

/// Groups triangles by face key and lays the groups out contiguously in key order.
///
/// Without face data the triangle list passes through untouched. The face
/// array must hold exactly one key per triangle.
pub fn segment(
    triangles: &[u32],
    faces: Option<&FaceAssignment>,
) -> EncodeResult<SegmentedIndices> {
    let Some(faces) = faces else {
        return Ok(SegmentedIndices::unsegmented(triangles));
    };

    let triangle_count = triangles.len() / TRIANGLE_ARITY;
    if faces.face_index_per_triangle.len() != triangle_count {
        return Err(EncodeError::FaceIndexMismatch {
            triangles: triangle_count,
            face_indices: faces.face_index_per_triangle.len(),
        });
    }

    let mut buckets: BTreeMap<i32, Vec<u32>> = BTreeMap::new();
    for (triangle, &key) in triangles
        .chunks_exact(TRIANGLE_ARITY)
        .zip(&faces.face_index_per_triangle)
    {
        buckets.entry(key).or_default().extend_from_slice(triangle);
    }

    if buckets.is_empty() {
        warn!("face data present but no triangles were assigned, writing unsegmented indices");
        return Ok(SegmentedIndices::unsegmented(triangles));
    }

    let mut indices = Vec::with_capacity(triangles.len());
    let mut segments = Vec::with_capacity(buckets.len());
    for (key, bucket) in buckets {
        let start_index = indices.len() as u64;
        indices.extend(bucket);
        let segment = FaceSegment {
            id: face_id(key, &faces.face_name_by_index),
            start_index,
            end_index: indices.len() as u64,
        };
        debug!(
            face = %segment.id,
            start = segment.start_index,
            end = segment.end_index,
            "face segment"
        );
        segments.push(segment);
    }

    Ok(SegmentedIndices {
        indices,
        segments: Some(segments),
    })
}
