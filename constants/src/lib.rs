/// Shared constants for the UVF encoding pipeline and its consumers.
pub mod buffer;
pub mod manifest;
pub mod output;

pub use buffer::*;
pub use manifest::*;
pub use output::*;
