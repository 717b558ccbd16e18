/// Manifest node model and hierarchy construction.
///
/// A manifest is a flat JSON array of nodes. Parent/child links are id
/// references: GeometryGroup `members`, SolidGeometry `faces`/`edges` and
/// Face `packedParentId`.
use crate::classify::GeometryKind;
use crate::error::EncodeResult;
use crate::packer::{DType, OffsetTable, ValueRange};
use crate::segment::FaceSegment;
use constants::{
    BUFFER_NUMBER, DEFAULT_FACE_ALPHA, DEFAULT_FACE_COLOR, GEOMETRY_GROUP_TYPE, IDENTITY_TRANSFORM,
    INDICES_SECTION, ROOT_GROUP_ID,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// One manifest entry, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ManifestNode {
    GeometryGroup(GeometryGroup),
    SolidGeometry(SolidGeometry),
    Face(Face),
}

impl ManifestNode {
    pub fn id(&self) -> &str {
        match self {
            ManifestNode::GeometryGroup(node) => &node.id,
            ManifestNode::SolidGeometry(node) => &node.id,
            ManifestNode::Face(node) => &node.id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ManifestNode::GeometryGroup(_) => "GeometryGroup",
            ManifestNode::SolidGeometry(_) => "SolidGeometry",
            ManifestNode::Face(_) => "Face",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryGroup {
    pub id: String,
    pub properties: GroupProperties,
    pub attributions: GroupAttributions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupProperties {
    #[serde(rename = "type")]
    pub group_type: u32,
    /// Row-major 4x4 matrix, root group only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<[f32; 16]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupAttributions {
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolidGeometry {
    pub id: String,
    pub properties: SolidProperties,
    pub attributions: GeometryAttributions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Resources>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolidProperties {
    #[serde(rename = "geomKind", skip_serializing_if = "Option::is_none")]
    pub geom_kind: Option<GeometryKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryAttributions {
    #[serde(default)]
    pub edges: Vec<String>,
    #[serde(default)]
    pub faces: Vec<String>,
    #[serde(default)]
    pub vertices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub buffers: Buffers,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buffers {
    pub path: String,
    pub sections: Vec<Section>,
    #[serde(rename = "type")]
    pub buffer_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "dType")]
    pub dtype: DType,
    pub dimension: u32,
    pub length: u64,
    pub name: String,
    pub offset: u64,
    #[serde(rename = "rangeMin", skip_serializing_if = "Option::is_none")]
    pub range_min: Option<f32>,
    #[serde(rename = "rangeMax", skip_serializing_if = "Option::is_none")]
    pub range_max: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub id: String,
    pub properties: FaceProperties,
    pub attributions: FaceAttributions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceProperties {
    pub alpha: f32,
    pub color: u32,
    #[serde(rename = "bufferLocations")]
    pub buffer_locations: BufferLocations,
    #[serde(rename = "geomKind", skip_serializing_if = "Option::is_none")]
    pub geom_kind: Option<GeometryKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BufferLocations {
    pub indices: Vec<BufferLocation>,
}

/// Half-open index range `[start_index, end_index)` in buffer `buf_num`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferLocation {
    #[serde(rename = "bufNum")]
    pub buf_num: u32,
    #[serde(rename = "startIndex")]
    pub start_index: u64,
    #[serde(rename = "endIndex")]
    pub end_index: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAttributions {
    #[serde(rename = "packedParentId")]
    pub packed_parent_id: String,
}

/// Ordered node list serialized as the manifest's top-level array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub nodes: Vec<ManifestNode>,
}

impl Manifest {
    pub fn to_json(&self, pretty: bool) -> EncodeResult<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn from_json(json: &str) -> EncodeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn find(&self, id: &str) -> Option<&ManifestNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Everything the builder needs to describe one encoded mesh.
#[derive(Debug, Clone, Copy)]
pub struct MeshEntry<'a> {
    pub kind: GeometryKind,
    pub table: &'a OffsetTable,
    pub segments: Option<&'a [FaceSegment]>,
    pub ranges: &'a BTreeMap<String, ValueRange>,
    /// Binary path as written into `resources.buffers.path`.
    pub binary_path: &'a str,
}

impl MeshEntry<'_> {
    fn index_count(&self) -> u64 {
        self.table
            .get(INDICES_SECTION)
            .map_or(0, |info| info.element_count())
    }
}

fn group_node(id: &str, members: Vec<String>, transform: Option<[f32; 16]>) -> ManifestNode {
    ManifestNode::GeometryGroup(GeometryGroup {
        id: id.to_string(),
        properties: GroupProperties {
            group_type: GEOMETRY_GROUP_TYPE,
            transform,
        },
        attributions: GroupAttributions { members },
    })
}

fn root_node(members: Vec<String>) -> ManifestNode {
    group_node(ROOT_GROUP_ID, members, Some(IDENTITY_TRANSFORM))
}

/// Renders the offset table as manifest sections, attaching value ranges to scalar sections.
pub fn sections(table: &OffsetTable, ranges: &BTreeMap<String, ValueRange>) -> Vec<Section> {
    table
        .iter()
        .map(|info| {
            let range = if info.is_geometry() {
                None
            } else {
                ranges.get(&info.name)
            };
            Section {
                dtype: info.dtype,
                dimension: info.dimension,
                length: info.length,
                name: info.name.clone(),
                offset: info.offset,
                range_min: range.map(|r| r.min),
                range_max: range.map(|r| r.max),
            }
        })
        .collect()
}

/// SolidGeometry node plus its Face nodes for one mesh.
///
/// `solid_id` is the SolidGeometry id, `mesh_face_id` the Face id used when
/// the mesh is not segmented. Segment ids are prefixed with `segment_prefix`.
fn mesh_nodes(
    solid_id: &str,
    mesh_face_id: &str,
    segment_prefix: &str,
    entry: &MeshEntry<'_>,
) -> Vec<ManifestNode> {
    let ranges: Vec<(String, u64, u64)> = match entry.segments {
        Some(segments) => segments
            .iter()
            .map(|s| (format!("{segment_prefix}{}", s.id), s.start_index, s.end_index))
            .collect(),
        None => vec![(mesh_face_id.to_string(), 0, entry.index_count())],
    };

    let face_ids: Vec<String> = ranges.iter().map(|(id, _, _)| id.clone()).collect();
    let attributions = if entry.kind.is_linear() {
        GeometryAttributions {
            edges: face_ids,
            ..Default::default()
        }
    } else {
        GeometryAttributions {
            faces: face_ids,
            ..Default::default()
        }
    };

    let mut nodes = Vec::with_capacity(ranges.len() + 1);
    nodes.push(ManifestNode::SolidGeometry(SolidGeometry {
        id: solid_id.to_string(),
        properties: SolidProperties {
            geom_kind: Some(entry.kind),
        },
        attributions,
        resources: Some(Resources {
            buffers: Buffers {
                path: entry.binary_path.to_string(),
                sections: sections(entry.table, entry.ranges),
                buffer_type: "buffers".to_string(),
            },
        }),
    }));

    nodes.extend(ranges.into_iter().map(|(id, start_index, end_index)| {
        ManifestNode::Face(Face {
            id,
            properties: FaceProperties {
                alpha: DEFAULT_FACE_ALPHA,
                color: DEFAULT_FACE_COLOR,
                buffer_locations: BufferLocations {
                    indices: vec![BufferLocation {
                        buf_num: BUFFER_NUMBER,
                        start_index,
                        end_index,
                    }],
                },
                geom_kind: Some(entry.kind),
            },
            attributions: FaceAttributions {
                packed_parent_id: solid_id.to_string(),
            },
        })
    }));

    nodes
}

/// Manifest for a single mesh: root group, one SolidGeometry named after the
/// kind's type group, and its Face nodes.
pub fn build_single(mesh_name: &str, entry: &MeshEntry<'_>) -> Manifest {
    let type_group = entry.kind.type_group_id();
    let mut nodes = vec![root_node(vec![type_group.to_string()])];
    nodes.extend(mesh_nodes(type_group, mesh_name, "", entry));
    make_face_ids_unique(&mut nodes);
    Manifest { nodes }
}

/// `base`, or `base-1`, `base-2`, ... when the id is already taken.
fn claim_id(base: &str, taken: &mut HashSet<String>) -> String {
    let mut id = base.to_string();
    let mut seq = 0;
    while taken.contains(&id) {
        seq += 1;
        id = format!("{base}-{seq}");
    }
    taken.insert(id.clone());
    id
}

/// Renames Face ids that collide with any other node id.
///
/// Group and SolidGeometry ids are kept. A colliding Face gets a numeric
/// suffix and its parent's `faces`/`edges` list is rewritten to match.
fn make_face_ids_unique(nodes: &mut [ManifestNode]) {
    let mut taken: HashSet<String> = nodes
        .iter()
        .filter(|node| !matches!(node, ManifestNode::Face(_)))
        .map(|node| node.id().to_string())
        .collect();
    let mut claimed: HashMap<String, VecDeque<String>> = HashMap::new();

    for node in nodes.iter_mut() {
        if let ManifestNode::SolidGeometry(solid) = node {
            let ids = claimed.entry(solid.id.clone()).or_default();
            let attributions = &mut solid.attributions;
            for id in attributions.faces.iter_mut().chain(attributions.edges.iter_mut()) {
                *id = claim_id(id, &mut taken);
                ids.push_back(id.clone());
            }
        }
    }

    // Faces follow their parent's list order
    for node in nodes.iter_mut() {
        if let ManifestNode::Face(face) = node {
            if let Some(id) = claimed
                .get_mut(&face.attributions.packed_parent_id)
                .and_then(VecDeque::pop_front)
            {
                face.id = id;
            }
        }
    }
}

/// Incremental builder for multi-mesh manifests.
///
/// Adds the type-group tier between the root and each SolidGeometry. Groups
/// appear in the order they are opened, members in the order they are added.
#[derive(Debug, Default)]
pub struct BatchManifestBuilder {
    groups: Vec<(String, Vec<String>, Vec<ManifestNode>)>,
}

impl BatchManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mesh under `group`, opening the group on first use.
    ///
    /// Segment ids are prefixed with `<label>_` so meshes sharing face names
    /// stay distinct.
    pub fn add_mesh(&mut self, group: &str, label: &str, face_id: &str, entry: &MeshEntry<'_>) {
        let slot = match self.groups.iter().position(|(name, _, _)| name == group) {
            Some(slot) => slot,
            None => {
                self.groups.push((group.to_string(), Vec::new(), Vec::new()));
                self.groups.len() - 1
            }
        };

        let (_, members, nodes) = &mut self.groups[slot];
        members.push(label.to_string());
        nodes.extend(mesh_nodes(label, face_id, &format!("{label}_"), entry));
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn finish(self) -> Manifest {
        let group_ids = self.groups.iter().map(|(name, _, _)| name.clone()).collect();
        let mut nodes = vec![root_node(group_ids)];

        for (name, members, geometry) in self.groups {
            nodes.push(group_node(&name, members, None));
            nodes.extend(geometry);
        }

        make_face_ids_unique(&mut nodes);
        Manifest { nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packer::BufferPacker;

    fn square_table() -> OffsetTable {
        BufferPacker::default()
            .pack(
                &[0, 1, 2, 0, 2, 3],
                &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
                &BTreeMap::new(),
            )
            .unwrap()
            .table
    }

    fn entry<'a>(
        kind: GeometryKind,
        table: &'a OffsetTable,
        ranges: &'a BTreeMap<String, ValueRange>,
    ) -> MeshEntry<'a> {
        MeshEntry {
            kind,
            table,
            segments: None,
            ranges,
            binary_path: "uvf.bin",
        }
    }

    fn solid(manifest: &Manifest) -> &SolidGeometry {
        manifest
            .nodes
            .iter()
            .find_map(|node| match node {
                ManifestNode::SolidGeometry(solid) => Some(solid),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn single_slice_has_three_nodes() {
        let table = square_table();
        let ranges = BTreeMap::new();
        let manifest = build_single("uvf", &entry(GeometryKind::Slice, &table, &ranges));

        let ids: Vec<_> = manifest.nodes.iter().map(ManifestNode::id).collect();
        assert_eq!(ids, vec!["root_group", "slices", "uvf"]);

        let ManifestNode::GeometryGroup(root) = &manifest.nodes[0] else {
            panic!("root is not a group");
        };
        assert_eq!(root.attributions.members, vec!["slices"]);
        assert_eq!(root.properties.transform, Some(IDENTITY_TRANSFORM));

        let ManifestNode::Face(face) = &manifest.nodes[2] else {
            panic!("last node is not a face");
        };
        let location = face.properties.buffer_locations.indices[0];
        assert_eq!((location.start_index, location.end_index), (0, 6));
        assert_eq!(face.attributions.packed_parent_id, "slices");
    }

    #[test]
    fn streamline_uses_edges() {
        let table = square_table();
        let ranges = BTreeMap::new();
        let manifest = build_single("lines", &entry(GeometryKind::Streamline, &table, &ranges));

        let solid = solid(&manifest);
        assert_eq!(solid.attributions.edges, vec!["lines"]);
        assert!(solid.attributions.faces.is_empty());
    }

    #[test]
    fn surfaces_use_faces() {
        let table = square_table();
        let ranges = BTreeMap::new();
        for kind in [GeometryKind::Surface, GeometryKind::Slice, GeometryKind::Isosurface] {
            let manifest = build_single("m", &entry(kind, &table, &ranges));
            let solid = solid(&manifest);
            assert_eq!(solid.attributions.faces, vec!["m"]);
            assert!(solid.attributions.edges.is_empty());
        }
    }

    #[test]
    fn segments_replace_mesh_face() {
        let table = square_table();
        let ranges = BTreeMap::new();
        let segments = vec![
            FaceSegment {
                id: "top".to_string(),
                start_index: 0,
                end_index: 3,
            },
            FaceSegment {
                id: "uvf_Face4".to_string(),
                start_index: 3,
                end_index: 6,
            },
        ];
        let mut mesh = entry(GeometryKind::Surface, &table, &ranges);
        mesh.segments = Some(&segments);
        let manifest = build_single("uvf", &mesh);

        assert_eq!(manifest.len(), 4);
        assert_eq!(solid(&manifest).attributions.faces, vec!["top", "uvf_Face4"]);
        let ManifestNode::Face(second) = &manifest.nodes[3] else {
            panic!("expected face");
        };
        assert_eq!(second.properties.buffer_locations.indices[0].start_index, 3);
    }

    #[test]
    fn scalar_sections_carry_ranges() {
        let mut fields = BTreeMap::new();
        fields.insert("temperature".to_string(), vec![1.0, 4.0, -2.0]);
        let packed = BufferPacker::default()
            .pack(&[0, 1, 2], &[0.0; 9], &fields)
            .unwrap();
        let ranges = crate::packer::scalar_ranges(&fields);
        let sections = sections(&packed.table, &ranges);

        assert!(sections[0].range_min.is_none());
        assert!(sections[1].range_max.is_none());
        assert_eq!(sections[2].name, "temperature");
        assert_eq!(sections[2].range_min, Some(-2.0));
        assert_eq!(sections[2].range_max, Some(4.0));
    }

    #[test]
    fn json_shape_matches_schema() {
        let table = square_table();
        let ranges = BTreeMap::new();
        let manifest = build_single("uvf", &entry(GeometryKind::Slice, &table, &ranges));
        let value: serde_json::Value =
            serde_json::from_str(&manifest.to_json(false).unwrap()).unwrap();

        assert_eq!(value[0]["type"], "GeometryGroup");
        assert_eq!(value[0]["properties"]["type"], 0);
        assert_eq!(value[0]["properties"]["transform"].as_array().unwrap().len(), 16);
        assert_eq!(value[1]["properties"]["geomKind"], "slice");
        assert_eq!(value[1]["resources"]["buffers"]["type"], "buffers");
        assert_eq!(value[1]["resources"]["buffers"]["sections"][0]["dType"], "uint32");
        assert_eq!(value[1]["resources"]["buffers"]["sections"][1]["length"], 48);
        assert_eq!(value[2]["properties"]["color"], 16_777_215);
        assert_eq!(value[2]["properties"]["bufferLocations"]["indices"][0]["bufNum"], 0);
        assert_eq!(value[2]["attributions"]["packedParentId"], "slices");
    }

    #[test]
    fn manifest_parses_back() {
        let table = square_table();
        let ranges = BTreeMap::new();
        let manifest = build_single("uvf", &entry(GeometryKind::Surface, &table, &ranges));
        let parsed = Manifest::from_json(&manifest.to_json(true).unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn batch_adds_type_group_tier() {
        let table = square_table();
        let ranges = BTreeMap::new();
        let mut builder = BatchManifestBuilder::new();
        let slice = MeshEntry {
            binary_path: "resources/uvf/mid_slice.bin",
            ..entry(GeometryKind::Slice, &table, &ranges)
        };
        let surface = MeshEntry {
            binary_path: "resources/uvf/top_surface.bin",
            ..entry(GeometryKind::Surface, &table, &ranges)
        };
        builder.add_mesh("slices", "mid_slice", "mid_slice_face", &slice);
        builder.add_mesh("surfaces", "top_surface", "top_surface_face", &surface);
        builder.add_mesh("slices", "low_slice", "low_slice_face", &slice);
        assert_eq!(builder.group_count(), 2);
        let manifest = builder.finish();

        let ids: Vec<_> = manifest.nodes.iter().map(ManifestNode::id).collect();
        assert_eq!(
            ids,
            vec![
                "root_group",
                "slices",
                "mid_slice",
                "mid_slice_face",
                "low_slice",
                "low_slice_face",
                "surfaces",
                "top_surface",
                "top_surface_face",
            ]
        );

        let Some(ManifestNode::GeometryGroup(slices)) = manifest.find("slices") else {
            panic!("missing slices group");
        };
        assert_eq!(slices.attributions.members, vec!["mid_slice", "low_slice"]);
        assert!(slices.properties.transform.is_none());
    }

    fn segments(ids: &[&str]) -> Vec<FaceSegment> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| FaceSegment {
                id: id.to_string(),
                start_index: 3 * i as u64,
                end_index: 3 * (i as u64 + 1),
            })
            .collect()
    }

    fn face_ids(manifest: &Manifest) -> Vec<(&str, &str)> {
        manifest
            .nodes
            .iter()
            .filter_map(|node| match node {
                ManifestNode::Face(face) => Some((
                    face.id.as_str(),
                    face.attributions.packed_parent_id.as_str(),
                )),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn batch_segment_ids_carry_the_label() {
        let table = square_table();
        let ranges = BTreeMap::new();
        let faces = segments(&["uvf_Face0", "uvf_Face1"]);
        let mut mesh = entry(GeometryKind::Slice, &table, &ranges);
        mesh.segments = Some(&faces);

        let mut builder = BatchManifestBuilder::new();
        builder.add_mesh("slices", "a_slice", "a_slice_face", &mesh);
        builder.add_mesh("slices", "b_slice", "b_slice_face", &mesh);
        let manifest = builder.finish();

        assert_eq!(
            face_ids(&manifest),
            vec![
                ("a_slice_uvf_Face0", "a_slice"),
                ("a_slice_uvf_Face1", "a_slice"),
                ("b_slice_uvf_Face0", "b_slice"),
                ("b_slice_uvf_Face1", "b_slice"),
            ]
        );
        assert_eq!(
            solid(&manifest).attributions.faces,
            vec!["a_slice_uvf_Face0", "a_slice_uvf_Face1"]
        );
    }

    #[test]
    fn colliding_face_ids_get_a_suffix() {
        let table = square_table();
        let ranges = BTreeMap::new();
        // Two solids named "lid" and one face named after the type group
        let faces = segments(&["lid", "lid", "slices"]);
        let mut mesh = entry(GeometryKind::Slice, &table, &ranges);
        mesh.segments = Some(&faces);
        let manifest = build_single("uvf", &mesh);

        assert_eq!(
            face_ids(&manifest),
            vec![("lid", "slices"), ("lid-1", "slices"), ("slices-1", "slices")]
        );
        assert_eq!(solid(&manifest).attributions.faces, vec!["lid", "lid-1", "slices-1"]);
    }

    #[test]
    fn mesh_face_never_shadows_another_label() {
        let table = square_table();
        let ranges = BTreeMap::new();
        let mesh = entry(GeometryKind::Surface, &table, &ranges);

        let mut builder = BatchManifestBuilder::new();
        builder.add_mesh("surfaces", "wall", "wall_face", &mesh);
        builder.add_mesh("surfaces", "wall_face", "wall_face_face", &mesh);
        let manifest = builder.finish();

        assert_eq!(
            face_ids(&manifest),
            vec![("wall_face-1", "wall"), ("wall_face_face", "wall_face")]
        );
        let Some(ManifestNode::SolidGeometry(wall)) = manifest.find("wall") else {
            panic!("missing wall");
        };
        assert_eq!(wall.attributions.faces, vec!["wall_face-1"]);
    }
}
