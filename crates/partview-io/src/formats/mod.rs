//! Format readers.

#[cfg(feature = "stl")]
pub mod stl;

#[cfg(feature = "obj")]
pub mod obj;

#[cfg(feature = "gltf")]
pub mod gltf;

#[cfg(feature = "ply")]
pub mod ply;

#[cfg(feature = "threemf")]
pub mod threemf;
