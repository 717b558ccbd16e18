/// Binary buffer packing with byte-offset bookkeeping.
use crate::error::{EncodeError, EncodeResult};
use constants::{DTYPE_FLOAT32, DTYPE_UINT32, INDICES_SECTION, POSITION_DIMENSION, POSITION_SECTION};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Element type of a packed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "uint32")]
    Uint32,
    #[serde(rename = "float32")]
    Float32,
}

impl DType {
    pub fn as_str(self) -> &'static str {
        match self {
            DType::Uint32 => DTYPE_UINT32,
            DType::Float32 => DTYPE_FLOAT32,
        }
    }

    pub fn size(self) -> u64 {
        4
    }
}

/// Placement of one section within the packed blob. `length` is in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub offset: u64,
    pub length: u64,
    pub dtype: DType,
    pub dimension: u32,
}

impl FieldInfo {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    pub fn element_count(&self) -> u64 {
        self.length / self.dtype.size()
    }

    /// Index and position sections carry no value range.
    pub fn is_geometry(&self) -> bool {
        self.name == INDICES_SECTION || self.name == POSITION_SECTION
    }
}

/// Section table in write order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OffsetTable {
    entries: Vec<FieldInfo>,
}

impl OffsetTable {
    pub fn get(&self, name: &str) -> Option<&FieldInfo> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes covered by all sections.
    pub fn total_length(&self) -> u64 {
        self.entries.last().map_or(0, FieldInfo::end)
    }
}

/// What to do with a scalar field whose length does not fit the vertex count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldPolicy {
    /// Pack it with dimension 1 and log a warning.
    #[default]
    Tolerate,
    /// Fail the encode with `MalformedField`.
    Reject,
}

/// Min/max over a scalar field, ignoring NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub fn of(values: &[f32]) -> Option<Self> {
        values
            .iter()
            .copied()
            .filter(|value| !value.is_nan())
            .fold(None, |range, value| match range {
                None => Some(Self {
                    min: value,
                    max: value,
                }),
                Some(Self { min, max }) => Some(Self {
                    min: min.min(value),
                    max: max.max(value),
                }),
            })
    }
}

/// Value ranges of every non-empty scalar field.
pub fn scalar_ranges(fields: &BTreeMap<String, Vec<f32>>) -> BTreeMap<String, ValueRange> {
    fields
        .iter()
        .filter_map(|(name, values)| ValueRange::of(values).map(|range| (name.clone(), range)))
        .collect()
}

/// Components per vertex for a field of `len` values, or `None` when `len`
/// is not a positive multiple of `vertex_count`.
pub fn field_dimension(len: usize, vertex_count: usize) -> Option<u32> {
    if vertex_count == 0 || len == 0 || len % vertex_count != 0 {
        return None;
    }
    u32::try_from(len / vertex_count).ok()
}

/// Packed bytes and the table describing them.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedBuffer {
    pub bytes: Vec<u8>,
    pub table: OffsetTable,
}

/// Serializes indices, positions and scalar fields into one little-endian blob.
///
/// Sections are appended without padding in the order indices, position,
/// then scalar fields by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferPacker {
    policy: FieldPolicy,
}

impl BufferPacker {
    pub fn new(policy: FieldPolicy) -> Self {
        Self { policy }
    }

    pub fn pack(
        &self,
        indices: &[u32],
        vertices: &[f32],
        scalar_fields: &BTreeMap<String, Vec<f32>>,
    ) -> EncodeResult<PackedBuffer> {
        let vertex_count = vertices.len() / 3;
        let scalar_bytes: usize = scalar_fields.values().map(Vec::len).sum::<usize>() * 4;
        let mut writer =
            SectionWriter::with_capacity((indices.len() + vertices.len()) * 4 + scalar_bytes);

        writer.write_u32(INDICES_SECTION, indices);
        writer.write_f32(POSITION_SECTION, vertices, POSITION_DIMENSION);

        for (name, values) in scalar_fields {
            if name == INDICES_SECTION || name == POSITION_SECTION {
                return Err(EncodeError::invalid_mesh(format!(
                    "scalar field name '{name}' collides with a geometry section"
                )));
            }

            let dimension = match field_dimension(values.len(), vertex_count) {
                Some(dimension) => dimension,
                None => self.malformed(name, values.len(), vertex_count)?,
            };
            writer.write_f32(name, values, dimension);
        }

        Ok(writer.finish())
    }

    fn malformed(&self, name: &str, len: usize, vertex_count: usize) -> EncodeResult<u32> {
        match self.policy {
            FieldPolicy::Tolerate => {
                warn!(
                    field = name,
                    len,
                    vertex_count,
                    "scalar field does not match vertex count, packing with dimension 1"
                );
                Ok(1)
            }
            FieldPolicy::Reject => Err(EncodeError::MalformedField {
                name: name.to_string(),
                len,
                vertex_count,
            }),
        }
    }
}

/// Appends sections and records where each one landed.
struct SectionWriter {
    bytes: Vec<u8>,
    entries: Vec<FieldInfo>,
}

impl SectionWriter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            entries: Vec::new(),
        }
    }

    fn write_u32(&mut self, name: &str, values: &[u32]) {
        let offset = self.bytes.len() as u64;
        for value in values {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
        self.record(name, offset, DType::Uint32, 1);
    }

    fn write_f32(&mut self, name: &str, values: &[f32], dimension: u32) {
        let offset = self.bytes.len() as u64;
        for value in values {
            self.bytes.extend_from_slice(&value.to_le_bytes());
        }
        self.record(name, offset, DType::Float32, dimension);
    }

    fn record(&mut self, name: &str, offset: u64, dtype: DType, dimension: u32) {
        let info = FieldInfo {
            name: name.to_string(),
            offset,
            length: self.bytes.len() as u64 - offset,
            dtype,
            dimension,
        };
        debug!(
            section = name,
            offset = info.offset,
            length = info.length,
            dimension,
            "packed section"
        );
        self.entries.push(info);
    }

    fn finish(self) -> PackedBuffer {
        PackedBuffer {
            bytes: self.bytes,
            table: OffsetTable {
                entries: self.entries,
            },
        }
    }
}
