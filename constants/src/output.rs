/// Default output naming for encoded datasets.

/// Mesh id used when a single mesh is encoded without a name.
pub const DEFAULT_MESH_NAME: &str = "uvf";

/// Binary file written next to the manifest in single-mesh mode.
pub const DEFAULT_BINARY_NAME: &str = "uvf.bin";

/// Manifest file name.
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

/// Directory (relative to the output root) holding per-mesh binaries in batch mode.
pub const DEFAULT_RESOURCES_DIR: &str = "resources/uvf";

/// Extension of per-mesh binaries in batch mode.
pub const BINARY_EXTENSION: &str = "bin";

/// Mesh source extensions picked up by directory discovery.
pub const MESH_SOURCE_EXTENSIONS: &[&str] = &["json", "stl"];
