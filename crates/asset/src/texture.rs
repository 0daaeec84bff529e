//! Texture roles, discovery and CPU-side texel payloads.
//!
//! Textures for `name.obj` live under `<textures root>/name/`, one file per
//! role; the file stem (`diffuse`, `normal`, `specular`) names the role.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::dds;
use crate::error::{AssetError, AssetResult};

/// Semantic role of a texture; decides its unit and shader binding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Diffuse,
    Normal,
    Specular,
    /// Unrecognised role. Recorded but never bound.
    Other(String),
}

impl TextureRole {
    pub fn from_name(name: &str) -> Self {
        match name {
            "diffuse" => Self::Diffuse,
            "normal" => Self::Normal,
            "specular" => Self::Specular,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Fixed texture unit: diffuse 0, normal 1, specular 2.
    pub fn unit(&self) -> Option<u32> {
        match self {
            Self::Diffuse => Some(0),
            Self::Normal => Some(1),
            Self::Specular => Some(2),
            Self::Other(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureTarget {
    Texture2D,
    CubeMap,
}

/// Texel formats the loaders can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Bgra8,
    /// DXT1
    Bc1,
    /// DXT3
    Bc2,
    /// DXT5
    Bc3,
}

impl TextureFormat {
    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Bc1 | Self::Bc2 | Self::Bc3)
    }

    /// Bytes per 4x4 block for compressed formats, per pixel otherwise.
    pub fn bytes_per_unit(self) -> u32 {
        match self {
            Self::Rgba8 | Self::Bgra8 => 4,
            Self::Bc1 => 8,
            Self::Bc2 | Self::Bc3 => 16,
        }
    }

    /// Byte size of one mip level with the given pixel extent, `None` on overflow.
    pub fn level_size(self, width: u32, height: u32) -> Option<usize> {
        let (w, h) = (width.max(1) as usize, height.max(1) as usize);
        let units = if self.is_compressed() {
            w.div_ceil(4).checked_mul(h.div_ceil(4))?
        } else {
            w.checked_mul(h)?
        };
        units.checked_mul(self.bytes_per_unit() as usize)
    }
}

/// Largest width or height accepted from a texture file.
pub const MAX_TEXTURE_DIMENSION: u32 = 16384;

/// Levels in a complete mip chain down to 1x1.
pub fn full_mip_count(width: u32, height: u32) -> u32 {
    u32::BITS - width.max(height).max(1).leading_zeros()
}

/// Opaque handle issued by a [`TextureLoader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// What a loader reports back for one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadedTexture {
    pub handle: TextureHandle,
    pub target: TextureTarget,
    pub format: TextureFormat,
}

/// A texture attached to a mesh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub handle: TextureHandle,
    pub target: TextureTarget,
    pub format: TextureFormat,
    pub role: TextureRole,
    pub unit: Option<u32>,
}

/// Turns a texture file into a handle (usually by uploading it to the GPU).
pub trait TextureLoader {
    fn load_texture(&mut self, path: &Path) -> AssetResult<LoadedTexture>;

    /// Give back handles loaded for a mesh that then failed.
    fn discard(&mut self, _handles: &[TextureHandle]) {}
}

/// Directory holding the textures for the mesh at `mesh_path`.
pub fn texture_dir_for(textures_root: &Path, mesh_path: &Path) -> PathBuf {
    let stem = mesh_path.file_stem().unwrap_or_default();
    textures_root.join(stem)
}

/// Load every texture in the mesh's texture directory, in file-name order.
pub fn discover_textures(
    textures_root: &Path,
    mesh_path: &Path,
    loader: &mut dyn TextureLoader,
) -> AssetResult<Vec<Texture>> {
    let dir = texture_dir_for(textures_root, mesh_path);
    let mut files = Vec::new();
    for entry in fs::read_dir(&dir).map_err(|e| AssetError::io(&dir, e))? {
        let entry = entry.map_err(|e| AssetError::io(&dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut textures: Vec<Texture> = Vec::with_capacity(files.len());
    for path in files {
        let role_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let role = TextureRole::from_name(&role_name);
        let unit = role.unit();
        if unit.is_none() {
            log::warn!(
                "Texture role '{}' ({}) has no texture unit; it will not be bound",
                role_name,
                path.display()
            );
        }

        let loaded = match loader.load_texture(&path) {
            Ok(loaded) => loaded,
            Err(err) => {
                let handles: Vec<_> = textures.iter().map(|t| t.handle).collect();
                loader.discard(&handles);
                return Err(err);
            }
        };
        textures.push(Texture {
            handle: loaded.handle,
            target: loaded.target,
            format: loaded.format,
            role,
            unit,
        });
    }
    Ok(textures)
}

/// One mip level inside [`TextureData::data`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub offset: usize,
    pub len: usize,
}

/// Texture payload in CPU memory before GPU upload.
///
/// Compressed formats keep their blocks as stored on disk.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub target: TextureTarget,
    /// Mip chain of the first layer (face) only.
    pub levels: Vec<MipLevel>,
}

impl TextureData {
    /// Create a single-level RGBA8 texture with given dimensions.
    pub fn new_rgba8(width: u32, height: u32, data: Vec<u8>) -> AssetResult<Self> {
        if width > MAX_TEXTURE_DIMENSION || height > MAX_TEXTURE_DIMENSION {
            return Err(AssetError::texture(
                "<memory>",
                format!("dimensions {width}x{height} exceed {MAX_TEXTURE_DIMENSION}"),
            ));
        }
        let expected = TextureFormat::Rgba8.level_size(width, height);
        if expected != Some(data.len()) || width == 0 || height == 0 {
            return Err(AssetError::texture(
                "<memory>",
                format!(
                    "RGBA8 payload of {} bytes does not match {}x{}",
                    data.len(),
                    width,
                    height
                ),
            ));
        }
        let len = data.len();
        Ok(Self {
            data,
            width,
            height,
            format: TextureFormat::Rgba8,
            target: TextureTarget::Texture2D,
            levels: vec![MipLevel {
                width,
                height,
                offset: 0,
                len,
            }],
        })
    }

    /// 1x1 opaque white, bound where a role has no texture.
    pub fn white() -> Self {
        Self {
            data: vec![255; 4],
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
            target: TextureTarget::Texture2D,
            levels: vec![MipLevel {
                width: 1,
                height: 1,
                offset: 0,
                len: 4,
            }],
        }
    }

    /// Read a texture file: `.dds` through the DDS reader, anything else via `image`.
    pub fn load(path: impl AsRef<Path>) -> AssetResult<Self> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let is_dds = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("dds"));
        let texture = if is_dds {
            let bytes = fs::read(path).map_err(|e| AssetError::io(path, e))?;
            dds::parse(&bytes).map_err(|msg| AssetError::texture(path, msg))?
        } else {
            let img = image::open(path).map_err(|e| AssetError::texture(path, e.to_string()))?;
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self::new_rgba8(width, height, rgba.into_raw())?
        };

        log::info!(
            "Loaded texture {}x{} {:?} ({} mip levels)",
            texture.width,
            texture.height,
            texture.format,
            texture.levels.len()
        );
        Ok(texture)
    }

    #[inline]
    pub fn mip_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// Bytes of a single mip level of the first layer.
    pub fn level_bytes(&self, level: usize) -> Option<&[u8]> {
        let mip = self.levels.get(level)?;
        self.data.get(mip.offset..mip.offset + mip.len)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    /// Records requested paths and hands out sequential handles.
    #[derive(Default)]
    struct RecordingLoader {
        paths: Vec<PathBuf>,
        /// File stem that fails to load.
        fail_on: Option<&'static str>,
        discarded: Vec<TextureHandle>,
    }

    impl TextureLoader for RecordingLoader {
        fn load_texture(&mut self, path: &Path) -> AssetResult<LoadedTexture> {
            if self
                .fail_on
                .is_some_and(|stem| path.file_stem().is_some_and(|s| s == stem))
            {
                return Err(AssetError::texture(path, "bad header"));
            }
            self.paths.push(path.to_path_buf());
            Ok(LoadedTexture {
                handle: TextureHandle(self.paths.len() as u32 - 1),
                target: TextureTarget::Texture2D,
                format: TextureFormat::Bc3,
            })
        }

        fn discard(&mut self, handles: &[TextureHandle]) {
            self.discarded.extend_from_slice(handles);
        }
    }

    #[test]
    fn role_units() {
        assert_eq!(TextureRole::from_name("diffuse").unit(), Some(0));
        assert_eq!(TextureRole::from_name("normal").unit(), Some(1));
        assert_eq!(TextureRole::from_name("specular").unit(), Some(2));
        let other = TextureRole::from_name("gloss");
        assert_eq!(other.unit(), None);
        assert_eq!(other, TextureRole::Other("gloss".into()));
    }

    #[test]
    fn level_sizes() {
        assert_eq!(TextureFormat::Bc1.level_size(256, 256), Some(64 * 64 * 8));
        assert_eq!(TextureFormat::Bc3.level_size(2, 1), Some(16));
        assert_eq!(TextureFormat::Rgba8.level_size(3, 2), Some(24));
    }

    #[test]
    fn oversized_levels_do_not_wrap() {
        let size = TextureFormat::Rgba8.level_size(0x1_0000, 0x1_0000);
        assert!(size.is_none_or(|n| n == 1 << 34));
        assert_eq!(TextureFormat::Rgba8.level_size(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn full_chain_lengths() {
        assert_eq!(full_mip_count(1, 1), 1);
        assert_eq!(full_mip_count(4, 4), 3);
        assert_eq!(full_mip_count(256, 16), 9);
        assert_eq!(full_mip_count(5, 3), 3);
    }

    #[test]
    fn discovers_roles_in_name_order() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("crate");
        fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["specular.dds", "diffuse.dds", "normal.dds", "gloss.dds"] {
            fs::write(dir.join(name), b"").unwrap();
        }

        let mut loader = RecordingLoader::default();
        let textures =
            discover_textures(root.path(), Path::new("Meshes/crate.obj"), &mut loader).unwrap();

        let roles: Vec<_> = textures.iter().map(|t| t.role.clone()).collect();
        assert_eq!(
            roles,
            vec![
                TextureRole::Diffuse,
                TextureRole::Other("gloss".into()),
                TextureRole::Normal,
                TextureRole::Specular,
            ]
        );
        let units: Vec<_> = textures.iter().map(|t| t.unit).collect();
        assert_eq!(units, vec![Some(0), None, Some(1), Some(2)]);
        assert_eq!(loader.paths.len(), 4);
        assert_eq!(textures[3].handle, TextureHandle(3));
        assert_eq!(textures[0].format, TextureFormat::Bc3);
    }

    #[test]
    fn failed_texture_discards_earlier_handles() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("crate");
        fs::create_dir_all(&dir).unwrap();
        for name in ["diffuse.dds", "normal.dds", "specular.dds"] {
            fs::write(dir.join(name), b"").unwrap();
        }

        let mut loader = RecordingLoader {
            fail_on: Some("normal"),
            ..RecordingLoader::default()
        };
        let err = discover_textures(root.path(), Path::new("crate.obj"), &mut loader).unwrap_err();
        assert!(matches!(err, AssetError::Texture { .. }));
        // Only diffuse was loaded before the failure; specular was never reached.
        assert_eq!(loader.paths.len(), 1);
        assert_eq!(loader.discarded, vec![TextureHandle(0)]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let root = tempfile::tempdir().unwrap();
        let mut loader = RecordingLoader::default();
        let err = discover_textures(root.path(), Path::new("cube.obj"), &mut loader).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
    }

    #[test]
    fn rgba8_size_is_checked() {
        assert!(TextureData::new_rgba8(2, 2, vec![0; 16]).is_ok());
        assert!(TextureData::new_rgba8(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::new_rgba8(MAX_TEXTURE_DIMENSION + 1, 1, vec![0; 4]).is_err());
        let white = TextureData::white();
        assert_eq!(white.level_bytes(0), Some(&[255u8, 255, 255, 255][..]));
    }
}
