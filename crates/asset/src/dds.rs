//! DDS textures through the `ddsfile` container reader.
//!
//! Only the header is interpreted: dimensions, pixel format, mip count and the
//! cube-map flag. Block-compressed payloads are passed through untouched.

use ddsfile::{Caps2, D3DFormat, Dds};

use crate::texture::{
    MAX_TEXTURE_DIMENSION, MipLevel, TextureData, TextureFormat, TextureTarget, full_mip_count,
};

fn texture_format(dds: &Dds) -> Result<TextureFormat, String> {
    if dds.header10.is_some() {
        return Err("DX10 extended headers are not supported".into());
    }
    match dds.get_d3d_format() {
        Some(D3DFormat::DXT1) => Ok(TextureFormat::Bc1),
        Some(D3DFormat::DXT3) => Ok(TextureFormat::Bc2),
        Some(D3DFormat::DXT5) => Ok(TextureFormat::Bc3),
        Some(D3DFormat::A8B8G8R8 | D3DFormat::X8B8G8R8) => Ok(TextureFormat::Rgba8),
        Some(D3DFormat::A8R8G8B8 | D3DFormat::X8R8G8B8) => Ok(TextureFormat::Bgra8),
        Some(other) => Err(format!("unsupported pixel format {other:?}")),
        None => Err("unrecognised pixel format".into()),
    }
}

/// Parse a whole `.dds` file.
pub fn parse(bytes: &[u8]) -> Result<TextureData, String> {
    let mut reader = bytes;
    let dds = Dds::read(&mut reader).map_err(|e| format!("invalid DDS header: {e}"))?;

    let (width, height) = (dds.get_width(), dds.get_height());
    if width == 0 || height == 0 {
        return Err(format!("invalid dimensions {width}x{height}"));
    }
    if width > MAX_TEXTURE_DIMENSION || height > MAX_TEXTURE_DIMENSION {
        return Err(format!("dimensions {width}x{height} exceed {MAX_TEXTURE_DIMENSION}"));
    }

    let format = texture_format(&dds)?;
    let target = if dds.header.caps2.contains(Caps2::CUBEMAP) {
        TextureTarget::CubeMap
    } else {
        TextureTarget::Texture2D
    };

    let mip_count = dds.get_num_mipmap_levels().max(1);
    let full_chain = full_mip_count(width, height);
    if mip_count > full_chain {
        return Err(format!(
            "{mip_count} mip levels declared, a {width}x{height} chain has {full_chain}"
        ));
    }

    let mut levels = Vec::with_capacity(mip_count as usize);
    let mut offset = 0usize;
    let (mut w, mut h) = (width, height);
    for _ in 0..mip_count {
        let len = format
            .level_size(w, h)
            .ok_or_else(|| format!("mip level {w}x{h} is too large"))?;
        levels.push(MipLevel {
            width: w,
            height: h,
            offset,
            len,
        });
        offset = offset
            .checked_add(len)
            .ok_or_else(|| "mip chain size overflows".to_string())?;
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }

    let layers = if target == TextureTarget::CubeMap { 6 } else { 1 };
    let needed = offset
        .checked_mul(layers)
        .ok_or_else(|| "payload size overflows".to_string())?;
    if dds.data.len() < needed {
        return Err(format!(
            "truncated payload: need {needed} bytes, found {}",
            dds.data.len()
        ));
    }

    let mut data = dds.data;
    data.truncate(needed);
    Ok(TextureData {
        data,
        width,
        height,
        format,
        target,
        levels,
    })
}
