//! Entry point for freelook: logging + CLI, then hand off to the platform loop.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use platform::{CameraConfig, FovPolicy, ViewerConfig};

#[derive(Debug, Parser)]
#[command(name = "freelook", version, about = "Free-look viewer for OBJ meshes")]
struct Cli {
    /// auto | vulkan | dx12 | metal | gl
    #[arg(long, default_value = "auto")]
    gpu_backend: String,

    /// Window size as WxH.
    #[arg(long, default_value = "800x600", value_parser = parse_size)]
    size: (u32, u32),

    /// Overrides the width from --size.
    #[arg(long)]
    width: Option<u32>,

    /// Overrides the height from --size.
    #[arg(long)]
    height: Option<u32>,

    /// Show frames per second in the window title.
    #[arg(long)]
    show_fps: bool,

    #[arg(long, default_value = "Meshes")]
    meshes_dir: PathBuf,

    #[arg(long, default_value = "Textures")]
    textures_dir: PathBuf,

    /// WGSL shader used instead of the built-in one.
    #[arg(long)]
    shader: Option<PathBuf>,

    /// Unbounded scroll zoom (field of view may reach zero or below).
    #[arg(long)]
    legacy_fov: bool,
}

impl Cli {
    fn into_config(self) -> ViewerConfig {
        let width = self.width.unwrap_or(self.size.0).max(1);
        let height = self.height.unwrap_or(self.size.1).max(1);

        // Projection aspect stays 4:3 whatever the window size.
        let mut camera = CameraConfig::default();
        if self.legacy_fov {
            camera.fov_policy = FovPolicy::Legacy;
        }

        ViewerConfig {
            backends: parse_backend(&self.gpu_backend),
            show_fps: self.show_fps,
            width,
            height,
            meshes_dir: self.meshes_dir,
            textures_dir: self.textures_dir,
            shader: self.shader,
            camera,
        }
    }
}

fn parse_backend(name: &str) -> wgpu::Backends {
    match name.to_ascii_lowercase().as_str() {
        "auto" => wgpu::Backends::all(),
        "vulkan" | "vk" => wgpu::Backends::VULKAN,
        "dx12" | "d3d12" => wgpu::Backends::DX12,
        "metal" | "mtl" => wgpu::Backends::METAL,
        "gl" | "opengl" | "gles" => wgpu::Backends::GL,
        other => {
            log::warn!("Unknown backend '{other}', falling back to auto.");
            wgpu::Backends::all()
        }
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
    let w = w.trim().parse::<u32>().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h = h.trim().parse::<u32>().map_err(|e| format!("bad height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err(format!("size must be non-zero, got '{s}'"));
    }
    Ok((w, h))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config();
    log::info!(
        "Starting freelook. Backend: {:?}, show_fps={}, window_size={}x{}, meshes={}, textures={}",
        config.backends,
        config.show_fps,
        config.width,
        config.height,
        config.meshes_dir.display(),
        config.textures_dir.display()
    );

    platform::run(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
