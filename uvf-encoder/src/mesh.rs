/// In-memory mesh handed to the encoder by a mesh source.
use crate::error::{EncodeError, EncodeResult};
use constants::TRIANGLE_ARITY;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flattened triangle mesh with named per-vertex scalar fields.
///
/// `vertices` holds xyz triplets, `indices` holds triangle triplets. Scalar
/// fields are keyed in a `BTreeMap` so every consumer sees them in name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    #[serde(default)]
    pub indices: Vec<u32>,
    #[serde(default)]
    pub scalar_fields: BTreeMap<String, Vec<f32>>,
}

impl Mesh {
    pub fn new(vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            scalar_fields: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a scalar field.
    pub fn with_field(mut self, name: impl Into<String>, values: Vec<f32>) -> Self {
        self.scalar_fields.insert(name.into(), values);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / TRIANGLE_ARITY
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Checks the triplet layout of both buffers and refuses meshes without positions.
    pub fn validate(&self) -> EncodeResult<()> {
        if self.vertices.is_empty() {
            return Err(EncodeError::EmptyMesh);
        }
        if self.vertices.len() % 3 != 0 {
            return Err(EncodeError::invalid_mesh(format!(
                "vertex buffer length {} is not a multiple of 3",
                self.vertices.len()
            )));
        }
        if self.indices.len() % TRIANGLE_ARITY != 0 {
            return Err(EncodeError::invalid_mesh(format!(
                "index buffer length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        Ok(())
    }
}

/// Cell kinds present in the dataset the mesh was extracted from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub has_lines: bool,
    pub has_polys: bool,
}

impl Topology {
    pub fn polygons() -> Self {
        Self {
            has_lines: false,
            has_polys: true,
        }
    }

    pub fn lines() -> Self {
        Self {
            has_lines: true,
            has_polys: false,
        }
    }
}

/// Optional per-triangle face membership supplied alongside a mesh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceAssignment {
    /// Face key of each triangle, in triangle order.
    pub face_index_per_triangle: Vec<i32>,
    /// Display name per face key; missing or empty entries get a synthesized id.
    #[serde(default)]
    pub face_name_by_index: Vec<String>,
}

/// Everything a mesh source hands to the pipeline for one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMesh {
    pub mesh: Mesh,
    pub topology: Topology,
    pub faces: Option<FaceAssignment>,
}

impl SourceMesh {
    /// Wraps a mesh, deriving topology from whether it has triangles.
    pub fn from_mesh(mesh: Mesh) -> Self {
        let topology = Topology {
            has_lines: false,
            has_polys: !mesh.indices.is_empty(),
        };
        Self {
            mesh,
            topology,
            faces: None,
        }
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_faces(mut self, faces: FaceAssignment) -> Self {
        self.faces = Some(faces);
        self
    }
}

/// Incremental mesh assembly from polygon and polyline cells.
///
/// Polygons are fan-triangulated. Polyline segments `(a, b)` are stored as
/// degenerate triangles `(a, b, b)` and only used when no polygon produced
/// a triangle.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    vertices: Vec<f32>,
    poly_indices: Vec<u32>,
    line_indices: Vec<u32>,
    poly_faces: Vec<i32>,
    line_faces: Vec<i32>,
    scalar_fields: BTreeMap<String, Vec<f32>>,
    face_names: Vec<String>,
    current_face: Option<i32>,
    polygon_cells: usize,
    line_cells: usize,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, position: [f32; 3]) -> u32 {
        let index = (self.vertices.len() / 3) as u32;
        self.vertices.extend_from_slice(&position);
        index
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// Starts a new named face; cells pushed afterwards belong to it.
    pub fn begin_face(&mut self, name: impl Into<String>) -> i32 {
        let key = self.face_names.len() as i32;
        self.face_names.push(name.into());
        self.current_face = Some(key);
        key
    }

    pub fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.push_polygon(&[a, b, c]);
    }

    /// Fan-triangulates a polygon cell. Cells with fewer than 3 ids are ignored.
    pub fn push_polygon(&mut self, ids: &[u32]) {
        if ids.len() < 3 {
            return;
        }
        self.polygon_cells += 1;
        for j in 1..ids.len() - 1 {
            self.poly_indices
                .extend_from_slice(&[ids[0], ids[j], ids[j + 1]]);
            self.poly_faces.push(self.current_face.unwrap_or(0));
        }
    }

    /// Adds a polyline cell as one degenerate triangle per segment.
    pub fn push_polyline(&mut self, ids: &[u32]) {
        if ids.len() < 2 {
            return;
        }
        self.line_cells += 1;
        for pair in ids.windows(2) {
            self.line_indices
                .extend_from_slice(&[pair[0], pair[1], pair[1]]);
            self.line_faces.push(self.current_face.unwrap_or(0));
        }
    }

    pub fn set_field(&mut self, name: impl Into<String>, values: Vec<f32>) {
        self.scalar_fields.insert(name.into(), values);
    }

    pub fn build(self) -> SourceMesh {
        let topology = Topology {
            has_lines: self.line_cells > 0,
            has_polys: self.polygon_cells > 0,
        };

        let (indices, face_keys) = if self.poly_indices.is_empty() {
            (self.line_indices, self.line_faces)
        } else {
            (self.poly_indices, self.poly_faces)
        };

        let faces = self.current_face.map(|_| FaceAssignment {
            face_index_per_triangle: face_keys,
            face_name_by_index: self.face_names,
        });

        SourceMesh {
            mesh: Mesh {
                vertices: self.vertices,
                indices,
                scalar_fields: self.scalar_fields,
            },
            topology,
            faces,
        }
    }
}
