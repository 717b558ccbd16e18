/// Read-side summary of a written manifest.
use crate::classify::GeometryKind;
use crate::manifest::{Manifest, ManifestNode, SolidGeometry};
use crate::packer::DType;
use constants::{INDICES_SECTION, POSITION_SECTION, TRIANGLE_ARITY};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::{self, Write as _};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalarSummary {
    pub name: String,
    pub dtype: DType,
    pub dimension: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_max: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometrySummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<GeometryKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<String>,
    pub triangles: u64,
    pub vertices: u64,
    pub faces: Vec<String>,
    /// Face ids of line geometry.
    pub edges: Vec<String>,
    pub scalars: Vec<ScalarSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub id: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManifestSummary {
    /// Node count per `type`.
    pub node_counts: BTreeMap<String, usize>,
    pub groups: Vec<GroupSummary>,
    pub geometries: Vec<GeometrySummary>,
    pub total_triangles: u64,
    pub total_vertices: u64,
    /// Ids referenced by a parent or member list that no node carries.
    pub dangling_references: Vec<String>,
    /// Ids carried by more than one node.
    pub duplicate_ids: Vec<String>,
}

impl ManifestSummary {
    pub fn is_consistent(&self) -> bool {
        self.dangling_references.is_empty() && self.duplicate_ids.is_empty()
    }
}

fn geometry_summary(solid: &SolidGeometry) -> GeometrySummary {
    let sections = solid
        .resources
        .as_ref()
        .map(|resources| resources.buffers.sections.as_slice())
        .unwrap_or_default();

    let element_count = |name: &str| {
        sections
            .iter()
            .find(|section| section.name == name)
            .map_or(0, |section| section.length / section.dtype.size())
    };

    GeometrySummary {
        id: solid.id.clone(),
        kind: solid.properties.geom_kind,
        binary_path: solid
            .resources
            .as_ref()
            .map(|resources| resources.buffers.path.clone()),
        triangles: element_count(INDICES_SECTION) / TRIANGLE_ARITY as u64,
        vertices: element_count(POSITION_SECTION) / 3,
        faces: solid.attributions.faces.clone(),
        edges: solid.attributions.edges.clone(),
        scalars: sections
            .iter()
            .filter(|section| section.name != INDICES_SECTION && section.name != POSITION_SECTION)
            .map(|section| ScalarSummary {
                name: section.name.clone(),
                dtype: section.dtype,
                dimension: section.dimension,
                range_min: section.range_min,
                range_max: section.range_max,
            })
            .collect(),
    }
}

/// Summarizes node counts, hierarchy and buffer contents of a manifest.
pub fn inspect(manifest: &Manifest) -> ManifestSummary {
    let mut known: HashSet<&str> = HashSet::new();
    let mut duplicates: BTreeSet<&str> = BTreeSet::new();
    for node in &manifest.nodes {
        if !known.insert(node.id()) {
            duplicates.insert(node.id());
        }
    }
    let mut summary = ManifestSummary::default();
    let mut referenced: Vec<&str> = Vec::new();

    for node in &manifest.nodes {
        *summary
            .node_counts
            .entry(node.type_name().to_string())
            .or_insert(0) += 1;

        match node {
            ManifestNode::GeometryGroup(group) => {
                referenced.extend(group.attributions.members.iter().map(String::as_str));
                summary.groups.push(GroupSummary {
                    id: group.id.clone(),
                    members: group.attributions.members.clone(),
                });
            }
            ManifestNode::SolidGeometry(solid) => {
                referenced.extend(solid.attributions.faces.iter().map(String::as_str));
                referenced.extend(solid.attributions.edges.iter().map(String::as_str));
                let geometry = geometry_summary(solid);
                summary.total_triangles += geometry.triangles;
                summary.total_vertices += geometry.vertices;
                summary.geometries.push(geometry);
            }
            ManifestNode::Face(face) => {
                referenced.push(&face.attributions.packed_parent_id);
            }
        }
    }

    let mut dangling: Vec<String> = referenced
        .into_iter()
        .filter(|id| !known.contains(id))
        .map(str::to_string)
        .collect();
    dangling.sort();
    dangling.dedup();
    summary.dangling_references = dangling;
    summary.duplicate_ids = duplicates.into_iter().map(str::to_string).collect();

    summary
}

impl fmt::Display for ManifestSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();

        let counts: Vec<String> = self
            .node_counts
            .iter()
            .map(|(kind, count)| format!("{kind}: {count}"))
            .collect();
        writeln!(out, "Nodes: {}", counts.join(", "))?;

        writeln!(out, "Groups:")?;
        for group in &self.groups {
            writeln!(out, "  {} -> [{}]", group.id, group.members.join(", "))?;
        }

        writeln!(out, "Geometry:")?;
        for geometry in &self.geometries {
            let kind = geometry.kind.map_or("-", |kind| kind.as_str());
            writeln!(
                out,
                "  {} ({kind}): {} vertices, {} triangles, {} faces, {} edges",
                geometry.id,
                geometry.vertices,
                geometry.triangles,
                geometry.faces.len(),
                geometry.edges.len()
            )?;
            for face in geometry.faces.iter().chain(&geometry.edges) {
                writeln!(out, "    - {face}")?;
            }
            if let Some(path) = &geometry.binary_path {
                writeln!(out, "    binary: {path}")?;
            }
            for scalar in &geometry.scalars {
                match (scalar.range_min, scalar.range_max) {
                    (Some(min), Some(max)) => writeln!(
                        out,
                        "    {} [{} x{}]: {min} .. {max}",
                        scalar.name,
                        scalar.dtype.as_str(),
                        scalar.dimension
                    )?,
                    _ => writeln!(
                        out,
                        "    {} [{} x{}]",
                        scalar.name,
                        scalar.dtype.as_str(),
                        scalar.dimension
                    )?,
                }
            }
        }

        writeln!(
            out,
            "Total: {} vertices, {} triangles",
            self.total_vertices, self.total_triangles
        )?;
        if !self.dangling_references.is_empty() {
            writeln!(
                out,
                "Dangling references: {}",
                self.dangling_references.join(", ")
            )?;
        }
        if !self.duplicate_ids.is_empty() {
            writeln!(out, "Duplicate ids: {}", self.duplicate_ids.join(", "))?;
        }

        f.write_str(&out)
    }
}
