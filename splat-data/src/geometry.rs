//! Geometry builder (§4.B). Converts a [`Scene`](crate::scene::Scene) into
//! the GPU-ready geometry buffer, identity index buffer, centroid table,
//! and (when SH is present) the packed SH side table described in §3.

use crate::scene::Scene;

/// Width of the SH side table, matching the reference's fixed-width 2D
/// layout (`height = ceil(12*V/W)`, 12 RGBA32Float texels per vertex). This
/// crate stores the same data as a flat storage buffer (permitted by the
/// design notes' "any implementation may replace this with a storage
/// buffer" clause); the width is retained only to document/compute the
/// texel coordinates a texture-backed implementation would use.
pub const SH_TABLE_WIDTH: usize = 1024;

/// Scalars per vertex slot: 3 DC + 15 rest triples * 3 channels = 48,
/// covering the maximum degree-3 case regardless of a scene's actual degree.
pub const SH_SLOT_SIZE: usize = 48;

/// How per-corner color is sourced; threaded through to the GPU as a scene
/// constant so the shader knows whether to evaluate SH, use direct color,
/// or fall back to white.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    SphericalHarmonics,
    Direct,
    None,
}

impl ColorMode {
    pub fn as_u32(self) -> u32 {
        match self {
            ColorMode::SphericalHarmonics => 0,
            ColorMode::Direct => 1,
            ColorMode::None => 2,
        }
    }
}

/// One per-corner vertex record (§3). 3*T of these make up the geometry
/// buffer; `barycentric`/`position`/`vertex_index` vary per corner while
/// `v0,v1,v2,weights_m,corner_indices` are shared by all three corners of
/// a triangle (I1).
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexRecord {
    pub position: [f32; 3],
    pub barycentric: [f32; 3],
    pub v0: [f32; 3],
    pub v1: [f32; 3],
    pub v2: [f32; 3],
    /// (w0, w1, w2, m)
    pub weights_m: [f32; 4],
    /// (this corner's vertex index, corner0 vertex index, corner1 vertex index, corner2 vertex index)
    pub indices: [u32; 4],
    /// Direct RGB in [0,1] for corners 0/1/2, shared across all three corner
    /// records of a triangle just like v0/v1/v2 (I1); unused when SH drives
    /// color (the shader evaluates SH itself from the SH table).
    pub color0: [f32; 3],
    pub color1: [f32; 3],
    pub color2: [f32; 3],
}

/// Packed SH side table: one 48-scalar slot per original vertex (§3).
#[derive(Debug, Clone)]
pub struct ShTable {
    pub data: Vec<f32>,
    pub vertex_count: usize,
}

impl ShTable {
    /// `(x, y)` texel coordinates a width-1024 RGBA32Float texture would
    /// use to store scalar `scalar_index` of `vertex_id`'s slot.
    pub fn texel_coords(vertex_id: usize, scalar_index: usize) -> (usize, usize) {
        let texel = vertex_id * (SH_SLOT_SIZE / 4) + scalar_index / 4;
        (texel % SH_TABLE_WIDTH, texel / SH_TABLE_WIDTH)
    }

    pub fn height(vertex_count: usize) -> usize {
        let texels = vertex_count * (SH_SLOT_SIZE / 4);
        texels.div_ceil(SH_TABLE_WIDTH)
    }
}

pub struct GeometryBuffers {
    pub records: Vec<VertexRecord>,
    pub index_buffer: Vec<u32>,
    /// Flattened `T x 3` centroid table.
    pub centroids: Vec<f32>,
    pub sh_table: Option<ShTable>,
    pub color_mode: ColorMode,
}

/// Builds the geometry buffer, identity index buffer, centroid table, and
/// (when present) SH table from scene data. Never reads raw pre-activation
/// weights: `m` is derived solely from `scene.opacities`, which the scene
/// contract guarantees are already activated (I4).
pub fn build_geometry(scene: &Scene) -> GeometryBuffers {
    let triangle_count = scene.triangle_indices.len();
    let mut records = Vec::with_capacity(triangle_count * 3);
    let mut centroids = Vec::with_capacity(triangle_count * 3);

    let color_mode = if scene.sh.is_some() {
        ColorMode::SphericalHarmonics
    } else if scene.colors.is_some() {
        ColorMode::Direct
    } else {
        ColorMode::None
    };

    const SELECTORS: [[f32; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for indices in &scene.triangle_indices {
        let positions: [[f32; 3]; 3] = [
            scene.vertices[indices[0] as usize],
            scene.vertices[indices[1] as usize],
            scene.vertices[indices[2] as usize],
        ];
        let weights: [f32; 3] = [
            scene.opacities[indices[0] as usize],
            scene.opacities[indices[1] as usize],
            scene.opacities[indices[2] as usize],
        ];
        let m = weights[0].min(weights[1]).min(weights[2]);

        let centroid = [
            (positions[0][0] + positions[1][0] + positions[2][0]) / 3.0,
            (positions[0][1] + positions[1][1] + positions[2][1]) / 3.0,
            (positions[0][2] + positions[1][2] + positions[2][2]) / 3.0,
        ];
        centroids.extend_from_slice(&centroid);

        let triangle_colors: [[f32; 3]; 3] = match color_mode {
            ColorMode::Direct => {
                let colors = scene.colors.as_ref().unwrap();
                std::array::from_fn(|corner| {
                    let rgb = colors[indices[corner] as usize];
                    [
                        rgb[0] as f32 / 255.0,
                        rgb[1] as f32 / 255.0,
                        rgb[2] as f32 / 255.0,
                    ]
                })
            }
            ColorMode::SphericalHarmonics => [[0.0, 0.0, 0.0]; 3],
            ColorMode::None => [[1.0, 1.0, 1.0]; 3],
        };

        for corner in 0..3 {
            let vertex_index = indices[corner];

            records.push(VertexRecord {
                position: positions[corner],
                barycentric: SELECTORS[corner],
                v0: positions[0],
                v1: positions[1],
                v2: positions[2],
                weights_m: [weights[0], weights[1], weights[2], m],
                indices: [vertex_index, indices[0], indices[1], indices[2]],
                color0: triangle_colors[0],
                color1: triangle_colors[1],
                color2: triangle_colors[2],
            });
        }
    }

    let index_buffer: Vec<u32> = (0..(triangle_count * 3) as u32).collect();

    let sh_table = scene.sh.as_ref().map(|sh| {
        let mut data = vec![0.0f32; scene.vertices.len() * SH_SLOT_SIZE];
        let rest_per_vertex = crate::sh::rest_count(sh.degree);
        for v in 0..scene.vertices.len() {
            let base = v * SH_SLOT_SIZE;
            data[base..base + 3].copy_from_slice(&sh.features_dc[v]);
            for r in 0..rest_per_vertex {
                let triple = sh.features_rest[v * rest_per_vertex + r];
                let offset = base + 3 + r * 3;
                data[offset..offset + 3].copy_from_slice(&triple);
            }
        }
        ShTable {
            data,
            vertex_count: scene.vertices.len(),
        }
    });

    GeometryBuffers {
        records,
        index_buffer,
        centroids,
        sh_table,
        color_mode,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneBuilder;

    fn quad_scene(opacities: Vec<f32>) -> Scene {
        let vertices = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ];
        let triangle_indices = vec![[0, 1, 2], [0, 2, 3]];
        SceneBuilder::new(vertices, triangle_indices, opacities)
            .build()
            .unwrap()
    }

    #[test]
    fn unrolling_produces_6_corner_records_with_correct_selectors() {
        let scene = quad_scene(vec![0.5; 4]);
        let geometry = build_geometry(&scene);
        assert_eq!(geometry.records.len(), 6);
        let expected = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        for (record, sel) in geometry.records.iter().zip(expected.iter()) {
            assert_eq!(&record.barycentric, sel);
        }
    }

    #[test]
    fn centroid_is_arithmetic_mean() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let scene = SceneBuilder::new(vertices, vec![[0, 1, 2]], vec![0.5; 3])
            .build()
            .unwrap();
        let geometry = build_geometry(&scene);
        assert!((geometry.centroids[0] - 1.0 / 3.0).abs() < 1e-4);
        assert!((geometry.centroids[1] - 1.0 / 3.0).abs() < 1e-4);
        assert!((geometry.centroids[2] - 0.0).abs() < 1e-4);
    }

    #[test]
    fn m_is_min_of_post_activation_opacities() {
        let scene = quad_scene(vec![0.2, 0.9, 0.4, 0.1]);
        let geometry = build_geometry(&scene);
        // triangle 0: vertices 0,1,2 -> opacities 0.2,0.9,0.4 -> m = 0.2
        assert!((geometry.records[0].weights_m[3] - 0.2).abs() < 1e-6);
        // triangle 1: vertices 0,2,3 -> opacities 0.2,0.4,0.1 -> m = 0.1
        assert!((geometry.records[3].weights_m[3] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn every_record_in_a_triangle_shares_v0_v1_v2_and_m() {
        let scene = quad_scene(vec![0.2, 0.9, 0.4, 0.1]);
        let geometry = build_geometry(&scene);
        for tri in 0..2 {
            let base = tri * 3;
            let a = &geometry.records[base];
            for k in 1..3 {
                let b = &geometry.records[base + k];
                assert_eq!(a.v0, b.v0);
                assert_eq!(a.v1, b.v1);
                assert_eq!(a.v2, b.v2);
                assert_eq!(a.weights_m, b.weights_m);
            }
        }
    }

    #[test]
    fn index_buffer_starts_as_identity_permutation() {
        let scene = quad_scene(vec![0.5; 4]);
        let geometry = build_geometry(&scene);
        assert_eq!(geometry.index_buffer, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn no_sh_no_color_defaults_to_white() {
        let scene = quad_scene(vec![0.5; 4]);
        let geometry = build_geometry(&scene);
        assert_eq!(geometry.color_mode, ColorMode::None);
        assert_eq!(geometry.records[0].color0, [1.0, 1.0, 1.0]);
        assert_eq!(geometry.records[0].color1, [1.0, 1.0, 1.0]);
        assert_eq!(geometry.records[0].color2, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn direct_colors_are_scaled_to_unit_range() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let scene = SceneBuilder::new(vertices, vec![[0, 1, 2]], vec![0.5; 3])
            .with_colors(vec![[255, 0, 128]; 3])
            .build()
            .unwrap();
        let geometry = build_geometry(&scene);
        assert_eq!(geometry.color_mode, ColorMode::Direct);
        for record in &geometry.records {
            for c in [record.color0, record.color1, record.color2] {
                assert!((c[0] - 1.0).abs() < 1e-6);
                assert!((c[1] - 0.0).abs() < 1e-6);
                assert!((c[2] - 128.0 / 255.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn direct_colors_distinguish_vertices_within_a_triangle() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let scene = SceneBuilder::new(vertices, vec![[0, 1, 2]], vec![0.5; 3])
            .with_colors(vec![[255, 0, 0], [0, 255, 0], [0, 0, 255]])
            .build()
            .unwrap();
        let geometry = build_geometry(&scene);
        // every corner record of the triangle carries all three vertices'
        // colors, not just its own (I1) -- the shader needs v0/v1/v2's
        // colors simultaneously to emit color0/color1/color2.
        for record in &geometry.records {
            assert_eq!(record.color0, [1.0, 0.0, 0.0]);
            assert_eq!(record.color1, [0.0, 1.0, 0.0]);
            assert_eq!(record.color2, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn sh_table_packs_dc_and_rest_in_order() {
        use crate::scene::SphericalHarmonics;
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let sh = SphericalHarmonics {
            degree: 1,
            features_dc: vec![[1.0, 2.0, 3.0]; 3],
            features_rest: vec![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6], [0.7, 0.8, 0.9]]
                .repeat(3)
                .into_iter()
                .take(9)
                .collect(),
        };
        let scene = SceneBuilder::new(vertices, vec![[0, 1, 2]], vec![0.5; 3])
            .with_sh(sh)
            .build()
            .unwrap();
        let geometry = build_geometry(&scene);
        let table = geometry.sh_table.unwrap();
        assert_eq!(table.data[0..3], [1.0, 2.0, 3.0]);
        assert_eq!(table.data[3..6], [0.1, 0.2, 0.3]);
        assert_eq!(table.data.len(), 3 * SH_SLOT_SIZE);
    }

    #[test]
    fn sh_table_texel_coords_wrap_at_table_width() {
        let (x, y) = ShTable::texel_coords(0, 0);
        assert_eq!((x, y), (0, 0));
        let (x, y) = ShTable::texel_coords(SH_TABLE_WIDTH, 0);
        assert_eq!((x, y), (0, 1));
    }
}
