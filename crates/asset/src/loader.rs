//! Loads OBJ files together with their texture directories.

use std::{
    fs,
    io::BufRead,
    path::{Path, PathBuf},
};

use crate::error::{AssetError, AssetResult};
use crate::mesh::{Geometry, Mesh};
use crate::obj;
use crate::texture::{self, TextureLoader};

/// Loads meshes and resolves textures under `textures_root`.
#[derive(Clone, Debug)]
pub struct MeshLoader {
    textures_root: PathBuf,
}

impl MeshLoader {
    pub fn new(textures_root: impl Into<PathBuf>) -> Self {
        Self {
            textures_root: textures_root.into(),
        }
    }

    /// Load one mesh and its textures. Any failure aborts this mesh only.
    pub fn load(&self, path: &Path, textures: &mut dyn TextureLoader) -> AssetResult<Mesh> {
        let geometry = obj::load_obj_from_path(path)?;
        self.assemble(path, geometry, textures)
    }

    /// Load OBJ text from `reader`; textures come from `<textures_root>/<name>/`.
    pub fn load_reader<R: BufRead>(
        &self,
        name: &str,
        reader: R,
        textures: &mut dyn TextureLoader,
    ) -> AssetResult<Mesh> {
        let geometry = obj::load_obj_from_reader(reader)?;
        self.assemble(Path::new(name), geometry, textures)
    }

    fn assemble(
        &self,
        path: &Path,
        geometry: Geometry,
        textures: &mut dyn TextureLoader,
    ) -> AssetResult<Mesh> {
        geometry.validate()?;
        let textures = texture::discover_textures(&self.textures_root, path, textures)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::info!(
            "Loaded mesh '{}': {} vertices, {} triangles, {} quads, {} textures",
            name,
            geometry.vertices.len(),
            geometry.triangles.len(),
            geometry.quads.len(),
            textures.len()
        );
        Ok(Mesh::new(name, geometry, textures))
    }

    /// Load every file in `dir` (sorted by name); failures are logged and skipped.
    pub fn load_dir(
        &self,
        dir: &Path,
        textures: &mut dyn TextureLoader,
    ) -> AssetResult<Vec<Mesh>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| AssetError::io(dir, e))? {
            let path = entry.map_err(|e| AssetError::io(dir, e))?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut meshes = Vec::with_capacity(files.len());
        for path in files {
            match self.load(&path, textures) {
                Ok(mesh) => meshes.push(mesh),
                Err(err) => log::error!("Failed to load mesh {}: {}", path.display(), err),
            }
        }
        Ok(meshes)
    }
}
