//! GPU-agnostic half of the triangle splat renderer: scene validation, SH
//! evaluation, the geometry builder, and the CPU diagnostic analyzer.
//!
//! `splat-gpu` consumes [`geometry::GeometryBuffers`] to build its vertex,
//! index, and SH storage buffers; nothing in this crate touches wgpu.

pub mod diagnostic;
pub mod geometry;
pub mod scene;
pub mod sh;

pub use diagnostic::{analyze, soft_alpha, DiagnosticReport, RDistribution};
pub use geometry::{build_geometry, ColorMode, GeometryBuffers, ShTable, VertexRecord};
pub use scene::{Scene, SceneBuilder, SceneError, SphericalHarmonics};
