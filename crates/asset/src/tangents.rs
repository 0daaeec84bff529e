//! Tangent/bitangent accumulation for normal mapping.
//!
//! Off by default: loaded meshes keep a zero tangent frame unless the
//! `tangents` feature is enabled and this pass is run explicitly.

use crate::mesh::{Mesh, Triangle};

fn sub3(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add_assign3(acc: &mut [f32; 3], v: [f32; 3]) {
    for (a, b) in acc.iter_mut().zip(v) {
        *a += b;
    }
}

fn scale_diff(a: [f32; 3], sa: f32, b: [f32; 3], sb: f32, r: f32) -> [f32; 3] {
    [
        (a[0] * sa - b[0] * sb) * r,
        (a[1] * sa - b[1] * sb) * r,
        (a[2] * sa - b[2] * sb) * r,
    ]
}

/// Sum per-triangle tangent frames into their (shared) vertices.
///
/// Quads contribute through their two triangles. Triangles with zero UV area
/// are skipped. Returns the number of triangles that contributed.
pub fn accumulate_tangents(mesh: &mut Mesh) -> usize {
    let geometry = &mut mesh.geometry;
    let tris: Vec<Triangle> = geometry
        .triangles
        .iter()
        .copied()
        .chain(geometry.quads.iter().flat_map(|q| q.triangulate()))
        .collect();

    let mut used = 0;
    for tri in tris {
        let [i0, i1, i2] = tri.indices.map(|i| i as usize);
        let (v0, v1, v2) = (
            geometry.vertices[i0],
            geometry.vertices[i1],
            geometry.vertices[i2],
        );

        let delta_pos1 = sub3(v1.position, v0.position);
        let delta_pos2 = sub3(v2.position, v0.position);
        let delta_uv1 = [v1.tex_coord[0] - v0.tex_coord[0], v1.tex_coord[1] - v0.tex_coord[1]];
        let delta_uv2 = [v2.tex_coord[0] - v0.tex_coord[0], v2.tex_coord[1] - v0.tex_coord[1]];

        let det = delta_uv1[0] * delta_uv2[1] - delta_uv1[1] * delta_uv2[0];
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = scale_diff(delta_pos1, delta_uv2[1], delta_pos2, delta_uv1[1], r);
        let bitangent = scale_diff(delta_pos2, delta_uv1[0], delta_pos1, delta_uv2[0], r);

        for i in [i0, i1, i2] {
            let v = &mut geometry.vertices[i];
            add_assign3(&mut v.tangent, tangent);
            add_assign3(&mut v.bitangent, bitangent);
        }
        used += 1;
    }
    used
}
