//! Renderer: wgpu init + depth + textured mesh pipeline.
//! wgpu = 26.x, winit = 0.30.x

use std::sync::Arc;

use anyhow::{Context, Result};
use asset::Mesh;
use corelib::{CameraMatrices, FrameMeshStore, Mat4};
use wgpu::{
    BlendState, ColorTargetState, ColorWrites, CommandEncoderDescriptor, DepthBiasState,
    DepthStencilState, Device, DeviceDescriptor, Extent3d, Features, FragmentState, Instance,
    InstanceDescriptor, Limits, LoadOp, Operations, PipelineLayoutDescriptor, PowerPreference,
    PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline,
    RenderPipelineDescriptor, ShaderModuleDescriptor, ShaderSource, StoreOp, Surface,
    SurfaceConfiguration, SurfaceError, TextureDescriptor, TextureDimension, TextureFormat,
    TextureUsages, TextureView, TextureViewDescriptor, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

mod mesh;
mod texture;

pub use mesh::{GpuMesh, MeshLayouts, MeshUniform};
pub use texture::{GpuTexture, GpuTextureLoader, TextureStore};

/// Built-in WGSL used when no shader file is given.
pub const DEFAULT_SHADER: &str = include_str!("shaders/mesh.wgsl");

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Maps OpenGL clip-space depth [-1, 1] to wgpu's [0, 1].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline
    pipeline: RenderPipeline,
    layouts: MeshLayouts,
    textures: TextureStore,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an `Arc<Window>`, compiling `shader_src` (WGSL).
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        shader_src: &str,
    ) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        // DDS textures are usually BC-compressed; request it when available.
        let required_features = adapter.features() & Features::TEXTURE_COMPRESSION_BC;
        if required_features.is_empty() {
            log::warn!("Adapter lacks BC texture compression; DXT textures will use a fallback");
        }

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Freelook Device"),
                required_features,
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no supported formats")?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or_default(),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Mesh WGSL"),
            source: ShaderSource::Wgsl(shader_src.into()),
        });

        // ==== Layouts / pipeline ====
        let layouts = MeshLayouts::new(&device);
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&layouts.uniforms, &layouts.textures],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[mesh::VERTEX_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // OBJ winding is not reliable across exporters; draw both faces.
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let textures = TextureStore::new(&device, &queue);

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            layouts,
            textures,
            depth_view,
            width,
            height,
        })
    }

    /// Loader that uploads discovered textures into this state's texture store.
    pub fn texture_loader(&mut self) -> GpuTextureLoader<'_> {
        GpuTextureLoader {
            device: &self.device,
            queue: &self.queue,
            store: &mut self.textures,
        }
    }

    pub fn upload_mesh(&self, mesh: &Mesh) -> GpuMesh {
        GpuMesh::upload(&self.device, &self.layouts, &self.textures, mesh)
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Render one frame: per-mesh uniforms from the store, then one indexed draw each.
    pub fn render(
        &mut self,
        store: &FrameMeshStore<GpuMesh>,
        camera: &CameraMatrices,
    ) -> Result<(), SurfaceError> {
        for request in store.render_requests(camera) {
            let uniform = MeshUniform::new(
                OPENGL_TO_WGPU * request.mvp,
                request.model,
                request.view,
                request.mv3x3,
                request.light_position,
            );
            request.mesh.write_uniforms(&self.queue, &uniform);
        }

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.1,
                            a: 0.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            for mesh in store.meshes() {
                if mesh.index_count() > 0 {
                    mesh.draw(&mut rpass);
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use corelib::Vec4;

    use super::*;

    #[test]
    fn opengl_depth_is_remapped() {
        let near = OPENGL_TO_WGPU * Vec4::new(0.0, 0.0, -1.0, 1.0);
        let far = OPENGL_TO_WGPU * Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert!((near.z - 0.0).abs() < 1e-6);
        assert!((far.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn default_shader_declares_entry_points_and_roles() {
        for needle in ["fn vs_main", "fn fs_main", "var diffuse", "var normal", "var specular"] {
            assert!(DEFAULT_SHADER.contains(needle), "missing {needle}");
        }
    }
}
