//! glTF 2.0 reader (JSON and binary GLB).

mod reader;
mod schema;

pub use reader::GltfReader;
