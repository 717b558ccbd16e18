/// Binary section naming and element encoding.

/// Section holding the flattened triangle index list.
pub const INDICES_SECTION: &str = "indices";

/// Section holding vertex positions as xyz triplets.
pub const POSITION_SECTION: &str = "position";

/// dtype tag for u32 sections.
pub const DTYPE_UINT32: &str = "uint32";

/// dtype tag for f32 sections.
pub const DTYPE_FLOAT32: &str = "float32";

/// Components per vertex position.
pub const POSITION_DIMENSION: u32 = 3;

/// Indices per triangle.
pub const TRIANGLE_ARITY: usize = 3;

/// Buffer number referenced by face buffer locations. Every encode writes one buffer.
pub const BUFFER_NUMBER: u32 = 0;
