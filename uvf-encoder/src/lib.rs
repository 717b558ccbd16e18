/// UVF mesh encoder: packs meshes into binary buffers and describes them with a JSON manifest
pub mod bounds;
pub mod classify;
pub mod encoder;
pub mod error;
pub mod grouping;
pub mod inspect;
pub mod manifest;
pub mod mesh;
pub mod options;
pub mod packer;
pub mod report;
pub mod segment;
pub mod source;

pub use classify::{GeometryKind, classify};
pub use encoder::{UvfEncoder, encode_batch, encode_single};
pub use error::{EncodeError, EncodeResult};
pub use grouping::{group, group_name};
pub use inspect::{ManifestSummary, inspect};
pub use manifest::{BatchManifestBuilder, Manifest, ManifestNode, build_single};
pub use mesh::{FaceAssignment, Mesh, MeshBuilder, SourceMesh, Topology};
pub use options::EncodeOptions;
pub use packer::{BufferPacker, FieldPolicy, OffsetTable, PackedBuffer};
pub use report::{EncodeReport, Operation, SkippedMesh};
pub use segment::{FaceSegment, segment};
pub use source::{discover_mesh_files, load_mesh};
