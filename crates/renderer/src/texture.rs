//! GPU texture upload and the texture loader handed to the mesh loader.

use std::path::Path;

use asset::{
    AssetResult, LoadedTexture, TextureData, TextureFormat, TextureHandle, TextureLoader,
    TextureRole, TextureTarget,
};
use wgpu::{
    AddressMode, Device, Extent3d, Features, FilterMode, Origin3d, Queue, Sampler,
    SamplerDescriptor, TexelCopyBufferLayout, TexelCopyTextureInfo, TextureAspect,
    TextureDescriptor, TextureDimension, TextureUsages, TextureView, TextureViewDescriptor,
};

/// An uploaded texture with its view and sampler.
pub struct GpuTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    pub view: TextureView,
    pub sampler: Sampler,
}

/// All textures uploaded so far; handle 0 is the 1x1 white fallback.
pub struct TextureStore {
    fallback: GpuTexture,
    /// Slot `i` holds handle `i + 1`. Released slots are `None`.
    textures: Vec<Option<GpuTexture>>,
}

impl TextureStore {
    pub fn new(device: &Device, queue: &Queue) -> Self {
        let white = TextureData::white();
        let fallback = upload(device, queue, &white, wgpu::TextureFormat::Rgba8Unorm, "Fallback");
        Self {
            fallback,
            textures: Vec::new(),
        }
    }

    #[inline]
    pub fn fallback(&self) -> TextureHandle {
        TextureHandle(0)
    }

    /// Texture for `handle`, or the fallback for unknown or released handles.
    pub fn get(&self, handle: TextureHandle) -> &GpuTexture {
        slot_index(handle)
            .and_then(|i| self.textures.get(i))
            .and_then(Option::as_ref)
            .unwrap_or(&self.fallback)
    }

    /// Textures currently held, fallback excluded.
    pub fn live(&self) -> usize {
        self.textures.iter().filter(|t| t.is_some()).count()
    }

    fn insert(&mut self, texture: GpuTexture) -> TextureHandle {
        self.textures.push(Some(texture));
        TextureHandle(self.textures.len() as u32)
    }

    /// Drop the GPU texture behind `handle`. The fallback is never released.
    fn release(&mut self, handle: TextureHandle) {
        if let Some(slot) = slot_index(handle).and_then(|i| self.textures.get_mut(i)) {
            *slot = None;
        }
    }
}

#[inline]
fn slot_index(handle: TextureHandle) -> Option<usize> {
    handle.0.checked_sub(1).map(|i| i as usize)
}

/// Uploads texture files to the GPU as the mesh loader discovers them.
pub struct GpuTextureLoader<'a> {
    pub(crate) device: &'a Device,
    pub(crate) queue: &'a Queue,
    pub(crate) store: &'a mut TextureStore,
}

impl TextureLoader for GpuTextureLoader<'_> {
    fn load_texture(&mut self, path: &Path) -> AssetResult<LoadedTexture> {
        let data = TextureData::load(path)?;
        // Normal maps hold vectors, not colours.
        let srgb = path
            .file_stem()
            .is_none_or(|stem| TextureRole::from_name(&stem.to_string_lossy()) != TextureRole::Normal);

        let max_dimension = self.device.limits().max_texture_dimension_2d;
        let handle = match gpu_format(&data, srgb, self.device.features(), max_dimension) {
            Some(format) => {
                let label = path.display().to_string();
                let texture = upload(self.device, self.queue, &data, format, &label);
                self.store.insert(texture)
            }
            None => {
                log::warn!(
                    "Cannot upload {} ({:?} {:?} {}x{}); binding fallback texture",
                    path.display(),
                    data.target,
                    data.format,
                    data.width,
                    data.height
                );
                self.store.fallback()
            }
        };

        Ok(LoadedTexture {
            handle,
            target: data.target,
            format: data.format,
        })
    }

    fn discard(&mut self, handles: &[TextureHandle]) {
        for &handle in handles {
            self.store.release(handle);
        }
        log::debug!(
            "Released {} texture(s); {} remain",
            handles.len(),
            self.store.live()
        );
    }
}

/// wgpu format for `data`, if this device can sample it as a 2D texture.
fn gpu_format(
    data: &TextureData,
    srgb: bool,
    features: Features,
    max_dimension: u32,
) -> Option<wgpu::TextureFormat> {
    if data.target != TextureTarget::Texture2D {
        return None;
    }
    if data.width > max_dimension || data.height > max_dimension {
        return None;
    }
    let format = match (data.format, srgb) {
        (TextureFormat::Rgba8, true) => wgpu::TextureFormat::Rgba8UnormSrgb,
        (TextureFormat::Rgba8, false) => wgpu::TextureFormat::Rgba8Unorm,
        (TextureFormat::Bgra8, true) => wgpu::TextureFormat::Bgra8UnormSrgb,
        (TextureFormat::Bgra8, false) => wgpu::TextureFormat::Bgra8Unorm,
        (TextureFormat::Bc1, true) => wgpu::TextureFormat::Bc1RgbaUnormSrgb,
        (TextureFormat::Bc1, false) => wgpu::TextureFormat::Bc1RgbaUnorm,
        (TextureFormat::Bc2, true) => wgpu::TextureFormat::Bc2RgbaUnormSrgb,
        (TextureFormat::Bc2, false) => wgpu::TextureFormat::Bc2RgbaUnorm,
        (TextureFormat::Bc3, true) => wgpu::TextureFormat::Bc3RgbaUnormSrgb,
        (TextureFormat::Bc3, false) => wgpu::TextureFormat::Bc3RgbaUnorm,
    };
    if data.format.is_compressed() {
        let (bw, bh) = format.block_dimensions();
        let aligned = data.width % bw == 0 && data.height % bh == 0;
        if !features.contains(Features::TEXTURE_COMPRESSION_BC) || !aligned {
            return None;
        }
    }
    Some(format)
}

fn upload(
    device: &Device,
    queue: &Queue,
    data: &TextureData,
    format: wgpu::TextureFormat,
    label: &str,
) -> GpuTexture {
    let texture = device.create_texture(&TextureDescriptor {
        label: Some(label),
        size: Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: data.mip_count(),
        sample_count: 1,
        dimension: TextureDimension::D2,
        format,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let (bw, bh) = format.block_dimensions();
    for (level, mip) in data.levels.iter().enumerate() {
        let Some(bytes) = data.level_bytes(level) else {
            break;
        };
        let blocks_wide = mip.width.div_ceil(bw);
        let blocks_high = mip.height.div_ceil(bh);
        let extent = Extent3d {
            width: mip.width,
            height: mip.height,
            depth_or_array_layers: 1,
        }
        .physical_size(format);

        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level as u32,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            bytes,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(blocks_wide * data.format.bytes_per_unit()),
                rows_per_image: Some(blocks_high),
            },
            extent,
        );
    }

    let view = texture.create_view(&TextureViewDescriptor::default());
    let sampler = device.create_sampler(&SamplerDescriptor {
        label: Some(label),
        address_mode_u: AddressMode::Repeat,
        address_mode_v: AddressMode::Repeat,
        address_mode_w: AddressMode::Repeat,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        // Trilinear only when there is a mip chain to filter across.
        mipmap_filter: if data.mip_count() > 1 {
            FilterMode::Linear
        } else {
            FilterMode::Nearest
        },
        ..Default::default()
    });

    GpuTexture {
        texture,
        view,
        sampler,
    }
}
