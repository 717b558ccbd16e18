/// Geometry kind classification from topology, planarity and naming.
use crate::bounds::MeshBounds;
use crate::mesh::{Mesh, Topology};
use constants::{ISOSURFACES_GROUP, SLICES_GROUP, STREAMLINES_GROUP, SURFACES_GROUP};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative planarity tolerance as a fraction of the bounding-box diagonal.
pub const PLANARITY_RATIO: f32 = 0.01;

/// Absolute floor added to the planarity tolerance.
pub const PLANARITY_FLOOR: f32 = 1e-6;

/// Substring marking isosurface datasets.
pub const ISO_KEYWORD: &str = "iso";

/// Classification tag attached to a whole mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Surface,
    Slice,
    Isosurface,
    Streamline,
}

impl GeometryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Surface => "surface",
            GeometryKind::Slice => "slice",
            GeometryKind::Isosurface => "isosurface",
            GeometryKind::Streamline => "streamline",
        }
    }

    /// Id of the type group meshes of this kind are filed under.
    pub fn type_group_id(self) -> &'static str {
        match self {
            GeometryKind::Surface => SURFACES_GROUP,
            GeometryKind::Slice => SLICES_GROUP,
            GeometryKind::Isosurface => ISOSURFACES_GROUP,
            GeometryKind::Streamline => STREAMLINES_GROUP,
        }
    }

    /// Line datasets reference their faces as edges.
    pub fn is_linear(self) -> bool {
        self == GeometryKind::Streamline
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts the classification rules look at.
struct Evidence<'a> {
    mesh: &'a Mesh,
    topology: Topology,
    name_hint: &'a str,
}

type Rule = (fn(&Evidence<'_>) -> bool, GeometryKind);

/// Evaluated top to bottom; first match wins, `Surface` otherwise.
const RULES: &[Rule] = &[
    (is_line_only, GeometryKind::Streamline),
    (is_near_planar, GeometryKind::Slice),
    (is_iso_named, GeometryKind::Isosurface),
];

fn is_line_only(evidence: &Evidence<'_>) -> bool {
    evidence.topology.has_lines && !evidence.topology.has_polys
}

fn is_near_planar(evidence: &Evidence<'_>) -> bool {
    let Some(bounds) = MeshBounds::from_vertices(&evidence.mesh.vertices) else {
        return false;
    };
    let diag = bounds.diagonal();
    let eps = PLANARITY_RATIO * diag + PLANARITY_FLOOR;
    diag > 0.0 && bounds.extents().iter().any(|&extent| extent < eps)
}

fn is_iso_named(evidence: &Evidence<'_>) -> bool {
    evidence.topology.has_polys
        && (contains_iso(evidence.name_hint)
            || evidence.mesh.scalar_fields.keys().any(|name| contains_iso(name)))
}

fn contains_iso(name: &str) -> bool {
    name.to_lowercase().contains(ISO_KEYWORD)
}

/// Assigns a geometry kind to a mesh. Pure and deterministic.
pub fn classify(mesh: &Mesh, topology: Topology, name_hint: &str) -> GeometryKind {
    let evidence = Evidence {
        mesh,
        topology,
        name_hint,
    };

    RULES
        .iter()
        .find(|(matches, _)| matches(&evidence))
        .map_or(GeometryKind::Surface, |&(_, kind)| kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Mesh {
        Mesh::new(
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    fn tilted_triangle() -> Mesh {
        Mesh::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.2], vec![0, 1, 2])
    }

    #[test]
    fn polyline_is_streamline() {
        let mesh = Mesh::new(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0], vec![]);
        assert_eq!(
            classify(&mesh, Topology::lines(), "uvf"),
            GeometryKind::Streamline
        );
    }

    #[test]
    fn flat_quad_is_slice() {
        assert_eq!(
            classify(&unit_square(), Topology::polygons(), "uvf"),
            GeometryKind::Slice
        );
    }

    #[test]
    fn thick_triangle_is_surface() {
        assert_eq!(
            classify(&tilted_triangle(), Topology::polygons(), "uvf"),
            GeometryKind::Surface
        );
    }

    #[test]
    fn iso_field_name_marks_isosurface() {
        let mesh = tilted_triangle().with_field("IsoValue", vec![0.5; 3]);
        assert_eq!(
            classify(&mesh, Topology::polygons(), "uvf"),
            GeometryKind::Isosurface
        );
    }

    #[test]
    fn iso_hint_marks_isosurface() {
        assert_eq!(
            classify(&tilted_triangle(), Topology::polygons(), "pressure_ISO_2"),
            GeometryKind::Isosurface
        );
    }

    #[test]
    fn iso_needs_polygons() {
        let mesh = tilted_triangle().with_field("iso", vec![0.0; 3]);
        let topology = Topology {
            has_lines: false,
            has_polys: false,
        };
        assert_eq!(classify(&mesh, topology, "iso"), GeometryKind::Surface);
    }

    #[test]
    fn planarity_wins_over_iso_naming() {
        assert_eq!(
            classify(&unit_square(), Topology::polygons(), "iso_plane"),
            GeometryKind::Slice
        );
    }

    #[test]
    fn empty_vertices_skip_slice_test() {
        let mesh = Mesh::default().with_field("iso", vec![]);
        assert_eq!(
            classify(&mesh, Topology::polygons(), ""),
            GeometryKind::Isosurface
        );
        assert_eq!(
            classify(&Mesh::default(), Topology::polygons(), ""),
            GeometryKind::Surface
        );
    }

    #[test]
    fn single_point_is_not_a_slice() {
        let mesh = Mesh::new(vec![1.0, 1.0, 1.0], vec![]);
        assert_eq!(
            classify(&mesh, Topology::default(), ""),
            GeometryKind::Surface
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let mesh = tilted_triangle();
        let first = classify(&mesh, Topology::polygons(), "hint");
        for _ in 0..10 {
            assert_eq!(classify(&mesh, Topology::polygons(), "hint"), first);
        }
    }

    #[test]
    fn kinds_map_to_type_groups() {
        assert_eq!(GeometryKind::Slice.type_group_id(), "slices");
        assert_eq!(GeometryKind::Surface.type_group_id(), "surfaces");
        assert_eq!(GeometryKind::Isosurface.type_group_id(), "isosurfaces");
        assert_eq!(GeometryKind::Streamline.type_group_id(), "streamlines");
        assert_eq!(
            serde_json::to_string(&GeometryKind::Streamline).unwrap(),
            "\"streamline\""
        );
    }
}
