//! Format registry and reader trait.

mod registry;
mod traits;

pub use registry::{FormatRegistry, LoadedScene};
pub use traits::FormatReader;
