//! GPU-side meshes: vertex/index buffers, per-mesh uniforms and texture bindings.

use std::mem::{offset_of, size_of};
use std::num::NonZeroU64;

use asset::{Mesh, Vertex};
use bytemuck::{Pod, Zeroable};
use corelib::{Mat3, Mat4, Vec3};
use wgpu::{
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, BindGroupLayoutDescriptor,
    BindGroupLayoutEntry, BindingResource, BindingType, Buffer, BufferBindingType, BufferUsages,
    Device, SamplerBindingType, ShaderStages, TextureSampleType, TextureViewDimension,
    VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode, util::DeviceExt,
};

use crate::texture::TextureStore;

/// Shader locations: 0 position, 1 uv, 2 normal, 3 tangent, 4 bitangent.
const VERTEX_ATTRIBUTES: [VertexAttribute; 5] = [
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: offset_of!(Vertex, position) as u64,
        shader_location: 0,
    },
    VertexAttribute {
        format: VertexFormat::Float32x2,
        offset: offset_of!(Vertex, tex_coord) as u64,
        shader_location: 1,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: offset_of!(Vertex, normal) as u64,
        shader_location: 2,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: offset_of!(Vertex, tangent) as u64,
        shader_location: 3,
    },
    VertexAttribute {
        format: VertexFormat::Float32x3,
        offset: offset_of!(Vertex, bitangent) as u64,
        shader_location: 4,
    },
];

pub const VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: size_of::<Vertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &VERTEX_ATTRIBUTES,
};

/// Per-mesh uniform block (`MVP`, `M`, `V`, `MV3x3`, `LightPosition_worldspace`).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshUniform {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    view: [[f32; 4]; 4],
    // WGSL mat3x3 columns are padded to 16 bytes.
    mv3x3: [[f32; 4]; 3],
    light_position: [f32; 4],
}

impl MeshUniform {
    pub fn new(mvp: Mat4, model: Mat4, view: Mat4, mv3x3: Mat3, light_position: Vec3) -> Self {
        Self {
            mvp: mvp.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            mv3x3: [
                mv3x3.x_axis.extend(0.0).to_array(),
                mv3x3.y_axis.extend(0.0).to_array(),
                mv3x3.z_axis.extend(0.0).to_array(),
            ],
            light_position: light_position.extend(1.0).to_array(),
        }
    }
}

/// Bind group layouts shared by every mesh.
pub struct MeshLayouts {
    pub uniforms: BindGroupLayout,
    pub textures: BindGroupLayout,
}

/// Texture slots in binding order; a slot index equals its texture unit.
const TEXTURE_SLOTS: u32 = 3;

impl MeshLayouts {
    pub fn new(device: &Device) -> Self {
        let uniforms = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Mesh uniforms BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(size_of::<MeshUniform>() as u64),
                },
                count: None,
            }],
        });

        let mut entries = Vec::with_capacity(TEXTURE_SLOTS as usize * 2);
        for unit in 0..TEXTURE_SLOTS {
            entries.push(BindGroupLayoutEntry {
                binding: unit,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        for unit in 0..TEXTURE_SLOTS {
            entries.push(BindGroupLayoutEntry {
                binding: TEXTURE_SLOTS + unit,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            });
        }
        let textures = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Mesh textures BGL"),
            entries: &entries,
        });

        Self { uniforms, textures }
    }
}

/// A mesh uploaded to the GPU.
pub struct GpuMesh {
    pub name: String,
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
    uniform_buf: Buffer,
    uniform_bg: BindGroup,
    texture_bg: BindGroup,
}

impl GpuMesh {
    /// Upload geometry; quads are split into triangles for the index buffer.
    pub fn upload(
        device: &Device,
        layouts: &MeshLayouts,
        textures: &TextureStore,
        mesh: &Mesh,
    ) -> Self {
        let indices = mesh.geometry.triangle_indices();
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} VB", mesh.name)),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} IB", mesh.name)),
            contents: bytemuck::cast_slice(&indices),
            usage: BufferUsages::INDEX,
        });

        let uniform_init = MeshUniform::new(
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Mat3::IDENTITY,
            Vec3::ZERO,
        );
        let uniform_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} UBO", mesh.name)),
            contents: bytemuck::bytes_of(&uniform_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let uniform_bg = device.create_bind_group(&BindGroupDescriptor {
            label: Some(&format!("{} uniforms BG", mesh.name)),
            layout: &layouts.uniforms,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: uniform_buf.as_entire_binding(),
            }],
        });

        // First texture per unit wins; empty units get the fallback.
        let slot = |unit: u32| {
            let handle = mesh
                .textures
                .iter()
                .find(|t| t.unit == Some(unit))
                .map_or(textures.fallback(), |t| t.handle);
            textures.get(handle)
        };
        let bound: Vec<_> = (0..TEXTURE_SLOTS).map(slot).collect();
        let mut entries = Vec::with_capacity(bound.len() * 2);
        for (unit, tex) in bound.iter().enumerate() {
            entries.push(BindGroupEntry {
                binding: unit as u32,
                resource: BindingResource::TextureView(&tex.view),
            });
        }
        for (unit, tex) in bound.iter().enumerate() {
            entries.push(BindGroupEntry {
                binding: TEXTURE_SLOTS + unit as u32,
                resource: BindingResource::Sampler(&tex.sampler),
            });
        }
        let texture_bg = device.create_bind_group(&BindGroupDescriptor {
            label: Some(&format!("{} textures BG", mesh.name)),
            layout: &layouts.textures,
            entries: &entries,
        });

        Self {
            name: mesh.name.clone(),
            vertex_buf,
            index_buf,
            index_count: indices.len() as u32,
            uniform_buf,
            uniform_bg,
            texture_bg,
        }
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub(crate) fn write_uniforms(&self, queue: &wgpu::Queue, uniform: &MeshUniform) {
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(uniform));
    }

    pub(crate) fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_bind_group(0, &self.uniform_bg, &[]);
        rpass.set_bind_group(1, &self.texture_bg, &[]);
        rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rpass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_matches_wgsl_layout() {
        // 3 * mat4x4 + mat3x3 (48) + vec4
        assert_eq!(size_of::<MeshUniform>(), 3 * 64 + 48 + 16);
    }

    #[test]
    fn attributes_follow_vertex_struct() {
        assert_eq!(VERTEX_LAYOUT.array_stride, 56);
        let offsets: Vec<u64> = VERTEX_ATTRIBUTES.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![20, 0, 8, 32, 44]);
    }

    #[test]
    fn mv3x3_columns_are_padded() {
        let u = MeshUniform::new(
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Mat3::from_cols(Vec3::X, Vec3::Y * 2.0, Vec3::Z * 3.0),
            Vec3::new(0.0, 0.0, 4.0),
        );
        assert_eq!(u.mv3x3[1], [0.0, 2.0, 0.0, 0.0]);
        assert_eq!(u.light_position, [0.0, 0.0, 4.0, 1.0]);
    }
}
