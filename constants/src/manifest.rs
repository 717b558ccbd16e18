/// Manifest node identifiers and default node properties.

/// Id of the top-level group every manifest starts with.
pub const ROOT_GROUP_ID: &str = "root_group";

/// `properties.type` value written on every GeometryGroup.
pub const GEOMETRY_GROUP_TYPE: u32 = 0;

/// Row-major 4x4 identity transform attached to the root group.
pub const IDENTITY_TRANSFORM: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, //
];

/// Default face opacity.
pub const DEFAULT_FACE_ALPHA: f32 = 1.0;

/// Default face colour (0xFFFFFF, white).
pub const DEFAULT_FACE_COLOR: u32 = 0x00FF_FFFF;

/// Prefix for face ids synthesized from a numeric face key.
pub const SYNTHETIC_FACE_PREFIX: &str = "uvf_Face";

/// Suffix appended to a mesh label to form its face id in batch manifests.
pub const BATCH_FACE_SUFFIX: &str = "_face";

/// Type-group ids, one per geometry kind.
pub const SLICES_GROUP: &str = "slices";
pub const SURFACES_GROUP: &str = "surfaces";
pub const ISOSURFACES_GROUP: &str = "isosurfaces";
pub const STREAMLINES_GROUP: &str = "streamlines";
