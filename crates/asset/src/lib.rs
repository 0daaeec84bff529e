//! Asset loading: OBJ meshes, texture discovery and DDS containers.

pub mod dds;
pub mod error;
pub mod loader;
pub mod mesh;
pub mod obj;
#[cfg(feature = "tangents")]
pub mod tangents;
pub mod texture;

pub use error::{AssetError, AssetResult};
pub use loader::MeshLoader;
pub use mesh::{Geometry, Mesh, Quad, Triangle, Vertex};
pub use texture::{
    LoadedTexture, Texture, TextureData, TextureFormat, TextureHandle, TextureLoader,
    TextureRole, TextureTarget,
};
