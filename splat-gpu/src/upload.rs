//! Uploads a [`splat_data::GeometryBuffers`] to GPU buffers: the vertex
//! record buffer, the (initially identity) index buffer, the packed SH
//! storage buffer, and the scene constants uniform.

use splat_data::GeometryBuffers;

use crate::builder::{BufferBuildError, BufferBuilder, BufferUsage};
use crate::handle::Handle;
use crate::resource_registry::ResourceRegistry;
use crate::types::SceneConstants;

/// Placeholder SH data for scenes without spherical harmonics, so the
/// shader's storage buffer binding is always satisfied even when unused.
const EMPTY_SH_TABLE: [f32; 4] = [0.0; 4];

pub struct UploadedScene {
    pub vertex_buffer: Handle<wgpu::Buffer>,
    pub index_buffer: Handle<wgpu::Buffer>,
    pub sh_buffer: Handle<wgpu::Buffer>,
    pub scene_constants_buffer: Handle<wgpu::Buffer>,
    pub triangle_count: u32,
    /// Flattened `T x 3` centroid table, handed to the sorter each request.
    pub centroids: Vec<f32>,
}

pub fn upload_scene(
    device: &wgpu::Device,
    registry: &mut ResourceRegistry,
    geometry: &GeometryBuffers,
    sh_degree: u8,
) -> Result<UploadedScene, BufferBuildError> {
    let vertex_buffer = BufferBuilder::new(device)
        .label("splat vertex records")
        .with_pod_data(&geometry.records)
        .usage(BufferUsage::Vertex)
        .build(registry)?;

    let index_buffer = BufferBuilder::new(device)
        .label("splat index buffer")
        .with_pod_data(&geometry.index_buffer)
        .usage(BufferUsage::Index)
        .build(registry)?;

    let sh_buffer = match &geometry.sh_table {
        Some(table) => BufferBuilder::new(device)
            .label("splat sh table")
            .with_pod_data(&table.data)
            .usage(BufferUsage::Storage { read_only: true })
            .build(registry)?,
        None => BufferBuilder::new(device)
            .label("splat sh table (empty)")
            .with_pod_data(&EMPTY_SH_TABLE)
            .usage(BufferUsage::Storage { read_only: true })
            .build(registry)?,
    };

    let scene_constants = SceneConstants::new(sh_degree, geometry.color_mode);
    let scene_constants_buffer = BufferBuilder::new(device)
        .label("splat scene constants")
        .with_pod_data(std::slice::from_ref(&scene_constants))
        .usage(BufferUsage::Uniform)
        .build(registry)?;

    Ok(UploadedScene {
        vertex_buffer,
        index_buffer,
        sh_buffer,
        scene_constants_buffer,
        triangle_count: (geometry.index_buffer.len() / 3) as u32,
        centroids: geometry.centroids.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::FutureExt;
    use splat_data::{build_geometry, SceneBuilder};

    async fn create_test_device() -> (wgpu::Device, wgpu::Queue) {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::from_env_or_default());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .expect("failed to get adapter");
        adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .expect("failed to get device")
    }

    #[test]
    fn uploads_a_small_scene() {
        let (device, _queue) = create_test_device().block_on();
        let mut registry = ResourceRegistry::default();

        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let scene = SceneBuilder::new(vertices, vec![[0, 1, 2]], vec![0.5; 3])
            .build()
            .unwrap();
        let geometry = build_geometry(&scene);

        let uploaded = upload_scene(&device, &mut registry, &geometry, 0).unwrap();
        assert_eq!(uploaded.triangle_count, 1);
        assert_eq!(uploaded.centroids.len(), 3);
        assert!(registry.get(uploaded.vertex_buffer).is_some());
        assert!(registry.get(uploaded.index_buffer).is_some());
        assert!(registry.get(uploaded.sh_buffer).is_some());
        assert!(registry.get(uploaded.scene_constants_buffer).is_some());
    }
}
