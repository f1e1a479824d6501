use glam::{Mat4, Vec3};

/// Per-frame uniforms consumed by the vertex/fragment stages (§4.D, §6):
/// camera position, view/projection matrices, sigma, drawing-buffer size,
/// and the optional debug flag. Field order keeps each 16-byte-aligned
/// group self-contained for WGSL's uniform-buffer layout rules.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniforms {
    pub view_matrix: [[f32; 4]; 4],
    pub proj_matrix: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub sigma: f32,
    pub resolution: [f32; 2],
    pub debug: f32,
    pub _padding: f32,
}

impl CameraUniforms {
    pub fn new(
        view: Mat4,
        proj: Mat4,
        eye: Vec3,
        sigma: f32,
        resolution: (f32, f32),
        debug: bool,
    ) -> Self {
        Self {
            view_matrix: view.to_cols_array_2d(),
            proj_matrix: proj.to_cols_array_2d(),
            camera_pos: [eye.x, eye.y, eye.z],
            sigma,
            resolution: [resolution.0, resolution.1],
            debug: if debug { 1.0 } else { 0.0 },
            _padding: 0.0,
        }
    }
}

/// Scene-level constants that don't change per-frame: SH degree and which
/// color source the vertex shader should read (§4.B `ColorMode`).
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct SceneConstants {
    pub sh_degree: u32,
    pub color_mode: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

impl SceneConstants {
    pub fn new(sh_degree: u8, color_mode: splat_data::ColorMode) -> Self {
        Self {
            sh_degree: sh_degree as u32,
            color_mode: color_mode.as_u32(),
            _pad0: 0,
            _pad1: 0,
        }
    }
}
