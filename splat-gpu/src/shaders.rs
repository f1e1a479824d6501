//! Shader source code embedded at compile time.
//!
//! The triangle splat pipeline is a single vertex/fragment pair; both are
//! embedded via `include_str!` so they ship inside the compiled crate.

/// Triangle splat vertex shader: culling, clip-space projection, incenter,
/// and sigma-controlled edge shrinking (§4.E).
pub const TRIANGLE_VERTEX: &str = include_str!("../shaders/triangle_vertex.wgsl");

/// Triangle splat fragment shader: soft alpha, barycentric color
/// interpolation, pre-multiplied output (§4.F).
pub const TRIANGLE_FRAGMENT: &str = include_str!("../shaders/triangle_fragment.wgsl");
