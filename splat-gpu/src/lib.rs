//! GPU-facing half of the triangle splat renderer: device/resource
//! management, the depth sorter actor, and the per-frame render driver.
//!
//! `splat-data` is GPU-agnostic; this crate consumes its geometry/SH tables
//! and turns them into wgpu buffers, pipelines, and draw calls.

pub mod builder;
pub mod driver;
pub mod handle;
pub mod pipeline;
pub mod resource_registry;
pub mod shaders;
pub mod sorter;
pub mod triangle_pipeline;
pub mod types;
pub mod upload;

pub use builder::{BindGroupBuildError, BindGroupBuilder, BufferBuildError, BufferBuilder, BufferUsage, BindingType, ShaderStage};
pub use driver::{FrameInputs, Mesh, RenderDriver};
pub use handle::{Handle, HandleId, ResourceType};
pub use pipeline::{PipelineBuildError, RenderPipelineBuilder};
pub use resource_registry::{ResourceRegistry, StorableResource};
pub use sorter::{SortError, SortRequest, SortResponse, SorterHandle};
pub use triangle_pipeline::{TrianglePipeline, TrianglePipelineError};
pub use types::{CameraUniforms, SceneConstants};
pub use upload::{upload_scene, UploadedScene};

use tracing::instrument;
use wgpu::{Backends, Instance};

/// Errors acquiring the GPU adapter or device.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("failed to request adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}

/// Owns the wgpu device, queue, and instance; renders straight to an
/// offscreen texture and never touches a presentation surface (§1 scopes
/// the host application shell out of this crate).
pub struct Renderer {
    instance: Instance,
    device: wgpu::Device,
    queue: wgpu::Queue,
    shader_debug_available: bool,
}

impl Renderer {
    /// Request an adapter with no compatible-surface constraint, suitable
    /// for headless/offscreen rendering. Probes for `POLYGON_MODE_LINE`
    /// (the optional shader debug feature §7 names); when the adapter
    /// lacks it, warns once and proceeds without requesting it rather than
    /// failing the whole renderer over an optional extension.
    #[instrument(level = "info", skip_all)]
    pub async fn new() -> Result<Self, RendererError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await?;

        let shader_debug_available = adapter.features().contains(wgpu::Features::POLYGON_MODE_LINE);
        let requested_features = if shader_debug_available {
            wgpu::Features::POLYGON_MODE_LINE
        } else {
            tracing::warn!("adapter lacks POLYGON_MODE_LINE; shader wireframe debug disabled");
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("splat-gpu Renderer"),
                required_features: requested_features,
                ..Default::default()
            })
            .await?;

        Ok(Self {
            instance,
            device,
            queue,
            shader_debug_available,
        })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Whether the adapter supports the optional shader wireframe debug
    /// extension (`POLYGON_MODE_LINE`). `TrianglePipeline::new`'s
    /// `wireframe_debug` parameter has no effect when this is false.
    pub fn shader_debug_available(&self) -> bool {
        self.shader_debug_available
    }
}
