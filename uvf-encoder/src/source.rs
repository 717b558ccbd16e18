/// Mesh sources feeding the encoder: JSON mesh documents and STL files.
use crate::error::{EncodeError, EncodeResult};
use crate::mesh::{FaceAssignment, Mesh, MeshBuilder, SourceMesh, Topology};
use constants::MESH_SOURCE_EXTENSIONS;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const STL_HEADER_SIZE: usize = 80;
const STL_TRIANGLE_SIZE: usize = 50;

/// JSON mesh document accepted by [`load_mesh`].
#[derive(Debug, Deserialize)]
struct MeshDocument {
    vertices: Vec<f32>,
    #[serde(default)]
    indices: Vec<u32>,
    #[serde(default)]
    scalar_fields: BTreeMap<String, Vec<f32>>,
    has_lines: Option<bool>,
    has_polys: Option<bool>,
    face_index_per_triangle: Option<Vec<i32>>,
    #[serde(default)]
    face_name_by_index: Vec<String>,
}

impl From<MeshDocument> for SourceMesh {
    fn from(doc: MeshDocument) -> Self {
        let topology = Topology {
            has_lines: doc.has_lines.unwrap_or(false),
            has_polys: doc.has_polys.unwrap_or(!doc.indices.is_empty()),
        };
        let faces = doc.face_index_per_triangle.map(|keys| FaceAssignment {
            face_index_per_triangle: keys,
            face_name_by_index: doc.face_name_by_index,
        });

        SourceMesh {
            mesh: Mesh {
                vertices: doc.vertices,
                indices: doc.indices,
                scalar_fields: doc.scalar_fields,
            },
            topology,
            faces,
        }
    }
}

fn extension_lower(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Loads a mesh source, picking the reader from the file extension.
///
/// `dedup` merges identical STL vertices within each solid; it has no effect on JSON sources.
pub fn load_mesh(path: &Path, dedup: bool) -> EncodeResult<SourceMesh> {
    let source = match extension_lower(path).as_str() {
        "json" => load_json_mesh(path)?,
        "stl" => load_stl(path, dedup)?,
        other => {
            return Err(EncodeError::UnsupportedFormat {
                extension: other.to_string(),
            });
        }
    };

    info!(
        path = %path.display(),
        points = source.mesh.vertex_count(),
        triangles = source.mesh.triangle_count(),
        fields = source.mesh.scalar_fields.len(),
        "loaded mesh"
    );
    Ok(source)
}

pub fn load_json_mesh(path: &Path) -> EncodeResult<SourceMesh> {
    let json = fs::read_to_string(path).map_err(|e| EncodeError::io(path, e))?;
    parse_json_mesh(&json)
}

pub fn parse_json_mesh(json: &str) -> EncodeResult<SourceMesh> {
    let doc: MeshDocument = serde_json::from_str(json)?;
    Ok(doc.into())
}

/// Loads ASCII or binary STL.
///
/// Each ASCII `solid` block becomes one face named after the solid.
pub fn load_stl(path: &Path, dedup: bool) -> EncodeResult<SourceMesh> {
    let bytes = fs::read(path).map_err(|e| EncodeError::io(path, e))?;
    parse_stl(&bytes, dedup)
}

pub fn parse_stl(bytes: &[u8], dedup: bool) -> EncodeResult<SourceMesh> {
    if is_binary_stl(bytes) {
        return parse_binary_stl(bytes, dedup);
    }

    let text = String::from_utf8_lossy(bytes);
    if text.trim_start().starts_with("solid") {
        parse_ascii_stl(&text, dedup)
    } else {
        parse_binary_stl(bytes, dedup)
    }
}

/// Binary when the declared triangle count matches the file size exactly.
fn is_binary_stl(bytes: &[u8]) -> bool {
    if bytes.len() < STL_HEADER_SIZE + 4 {
        return false;
    }
    let count = read_u32(&bytes[STL_HEADER_SIZE..]) as usize;
    bytes.len() == STL_HEADER_SIZE + 4 + count * STL_TRIANGLE_SIZE
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_f32(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Vertex sink that optionally merges exact duplicates within the current solid.
struct VertexWelder {
    builder: MeshBuilder,
    dedup: bool,
    seen: HashMap<[u32; 3], u32>,
}

impl VertexWelder {
    fn new(dedup: bool) -> Self {
        Self {
            builder: MeshBuilder::new(),
            dedup,
            seen: HashMap::new(),
        }
    }

    fn begin_solid(&mut self, name: &str) {
        self.seen.clear();
        self.builder.begin_face(name);
    }

    fn vertex(&mut self, position: [f32; 3]) -> u32 {
        if !self.dedup {
            return self.builder.push_vertex(position);
        }
        let key = position.map(f32::to_bits);
        match self.seen.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.builder.push_vertex(position);
                self.seen.insert(key, index);
                index
            }
        }
    }

    fn triangle(&mut self, corners: [[f32; 3]; 3]) {
        let [a, b, c] = corners.map(|corner| self.vertex(corner));
        self.builder.push_triangle(a, b, c);
    }
}

fn parse_binary_stl(bytes: &[u8], dedup: bool) -> EncodeResult<SourceMesh> {
    if bytes.len() < STL_HEADER_SIZE + 4 {
        return Err(EncodeError::invalid_source(format!(
            "binary STL needs at least {} bytes, got {}",
            STL_HEADER_SIZE + 4,
            bytes.len()
        )));
    }

    let count = read_u32(&bytes[STL_HEADER_SIZE..]) as usize;
    let body = &bytes[STL_HEADER_SIZE + 4..];
    if body.len() < count * STL_TRIANGLE_SIZE {
        return Err(EncodeError::invalid_source(format!(
            "binary STL declares {count} triangles but holds {}",
            body.len() / STL_TRIANGLE_SIZE
        )));
    }

    let mut welder = VertexWelder::new(dedup);
    for record in body.chunks_exact(STL_TRIANGLE_SIZE).take(count) {
        // Normal (12 bytes) is skipped, then three vertices
        let corner = |at: usize| {
            [
                read_f32(&record[at..]),
                read_f32(&record[at + 4..]),
                read_f32(&record[at + 8..]),
            ]
        };
        welder.triangle([corner(12), corner(24), corner(36)]);
    }

    debug!(triangles = count, "parsed binary STL");
    Ok(welder.builder.build())
}

fn parse_ascii_stl(text: &str, dedup: bool) -> EncodeResult<SourceMesh> {
    let mut welder = VertexWelder::new(dedup);
    let mut corners: Vec<[f32; 3]> = Vec::with_capacity(3);
    let mut solids = 0usize;

    for (line_number, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword.to_lowercase().as_str() {
            "solid" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                welder.begin_solid(&name);
                solids += 1;
            }
            "facet" => corners.clear(),
            "vertex" => {
                let mut position = [0.0f32; 3];
                for slot in &mut position {
                    let token = parts.next().ok_or_else(|| {
                        EncodeError::invalid_source(format!(
                            "line {}: vertex needs three coordinates",
                            line_number + 1
                        ))
                    })?;
                    *slot = token.parse().map_err(|_| {
                        EncodeError::invalid_source(format!(
                            "line {}: invalid coordinate '{token}'",
                            line_number + 1
                        ))
                    })?;
                }
                corners.push(position);
            }
            "endfacet" => {
                if solids == 0 {
                    return Err(EncodeError::invalid_source(format!(
                        "line {}: facet outside of a solid",
                        line_number + 1
                    )));
                }
                if let [a, b, c] = corners[..] {
                    welder.triangle([a, b, c]);
                }
                corners.clear();
            }
            _ => {}
        }
    }

    debug!(solids, "parsed ASCII STL");
    Ok(welder.builder.build())
}

/// Mesh source files directly inside `dir`, labeled by file stem and sorted by file name.
pub fn discover_mesh_files(dir: &Path) -> EncodeResult<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(dir).map_err(|e| EncodeError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| EncodeError::io(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let extension = extension_lower(&path);
        if !MESH_SOURCE_EXTENSIONS.contains(&extension.as_str()) {
            continue;
        }
        let label = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        files.push((label, path));
    }

    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SOLIDS: &str = "solid lid
  facet normal 0 0 1
    outer loop
      vertex 0 0 1
      vertex 1 0 1
      vertex 0 1 1
    endloop
  endfacet
endsolid lid
solid
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 0 1
    outer loop
      vertex 1 0 0
      vertex 1 1 0
      vertex 0 1 0
    endloop
  endfacet
endsolid
";

    #[test]
    fn ascii_solids_become_faces() {
        let source = parse_stl(TWO_SOLIDS.as_bytes(), false).unwrap();
        assert_eq!(source.mesh.vertex_count(), 9);
        assert_eq!(source.mesh.triangle_count(), 3);
        assert!(source.topology.has_polys);

        let faces = source.faces.unwrap();
        assert_eq!(faces.face_index_per_triangle, vec![0, 1, 1]);
        assert_eq!(faces.face_name_by_index, vec!["lid".to_string(), String::new()]);
    }

    #[test]
    fn dedup_merges_within_a_solid_only() {
        let source = parse_stl(TWO_SOLIDS.as_bytes(), true).unwrap();
        // lid keeps 3, the second solid shares (1 0 0) and (0 1 0) between its facets
        assert_eq!(source.mesh.vertex_count(), 7);
        assert_eq!(source.mesh.indices, vec![0, 1, 2, 3, 4, 5, 4, 6, 5]);
    }

    #[test]
    fn bad_coordinate_is_reported() {
        let text = "solid x\nfacet normal 0 0 1\nouter loop\nvertex 0 zero 0\n";
        let err = parse_stl(text.as_bytes(), false).unwrap_err();
        assert!(err.to_string().contains("line 4"));
    }

    #[test]
    fn binary_stl_single_triangle() {
        let mut bytes = vec![0u8; STL_HEADER_SIZE];
        bytes.extend_from_slice(&1u32.to_le_bytes());
        for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&[0, 0]);

        let source = parse_stl(&bytes, false).unwrap();
        assert_eq!(source.mesh.vertices, vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0]);
        assert_eq!(source.mesh.indices, vec![0, 1, 2]);
        assert!(source.faces.is_none());
    }

    #[test]
    fn truncated_binary_stl_fails() {
        let mut bytes = vec![0u8; STL_HEADER_SIZE];
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 60]);
        assert!(matches!(
            parse_stl(&bytes, false),
            Err(EncodeError::InvalidSource { .. })
        ));
    }

    #[test]
    fn json_document_defaults() {
        let source = parse_json_mesh(
            r#"{"vertices":[0,0,0,1,0,0,2,0,0],"has_lines":true,"has_polys":false}"#,
        )
        .unwrap();
        assert_eq!(source.topology, Topology::lines());
        assert!(source.mesh.indices.is_empty());
        assert!(source.faces.is_none());

        let source = parse_json_mesh(
            r#"{"vertices":[0,0,0,1,0,0,0,1,0],"indices":[0,1,2],
                "scalar_fields":{"p":[1,2,3]},
                "face_index_per_triangle":[4],"face_name_by_index":[]}"#,
        )
        .unwrap();
        assert!(source.topology.has_polys);
        assert_eq!(source.mesh.scalar_fields["p"], vec![1.0, 2.0, 3.0]);
        assert_eq!(source.faces.unwrap().face_index_per_triangle, vec![4]);
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = load_mesh(Path::new("model.vtp"), false).unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedFormat { extension } if extension == "vtp"));
    }

    #[test]
    fn discovery_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_slice.json", "a_wall.STL", "notes.txt", "c_iso.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let labels: Vec<_> = discover_mesh_files(dir.path())
            .unwrap()
            .into_iter()
            .map(|(label, _)| label)
            .collect();
        assert_eq!(labels, vec!["a_wall", "b_slice", "c_iso"]);
    }
}
