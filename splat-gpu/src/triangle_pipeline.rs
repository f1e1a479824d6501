//! Wires the triangle splat WGSL (§4.E/§4.F) into a concrete wgpu
//! pipeline: bind group layout (camera uniform, scene constants uniform,
//! SH storage buffer), vertex buffer layout matching
//! `splat_data::VertexRecord`, and the pre-multiplied-alpha blend state
//! the fragment stage's output assumes.

use crate::handle::Handle;
use crate::pipeline::{PipelineBuildError, RenderPipelineBuilder};
use crate::resource_registry::ResourceRegistry;
use crate::shaders;

#[derive(Debug, thiserror::Error)]
pub enum TrianglePipelineError {
    #[error(transparent)]
    Pipeline(#[from] PipelineBuildError),
}

pub struct TrianglePipeline {
    pub pipeline: Handle<wgpu::RenderPipeline>,
    pub bind_group_layout: Handle<wgpu::BindGroupLayout>,
}

fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 10] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // barycentric
        2 => Float32x3, // v0
        3 => Float32x3, // v1
        4 => Float32x3, // v2
        5 => Float32x4, // weights_m: (w0, w1, w2, m)
        6 => Uint32x4,  // indices: (this corner, c0, c1, c2)
        7 => Float32x3, // color0
        8 => Float32x3, // color1
        9 => Float32x3, // color2
    ];

    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<splat_data::VertexRecord>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

fn bind_group_layout_descriptor() -> wgpu::BindGroupLayoutDescriptor<'static> {
    const ENTRIES: [wgpu::BindGroupLayoutEntry; 3] = [
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: true },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
    ];

    wgpu::BindGroupLayoutDescriptor {
        label: Some("triangle splat bind group layout"),
        entries: &ENTRIES,
    }
}

impl TrianglePipeline {
    /// `wireframe_debug` selects `PolygonMode::Line` over `Fill` (§7's
    /// optional shader debug extension); pass `false` unless
    /// `Renderer::shader_debug_available` confirmed the adapter supports it.
    pub fn new(
        device: &wgpu::Device,
        registry: &mut ResourceRegistry,
        color_format: wgpu::TextureFormat,
        wireframe_debug: bool,
    ) -> Result<Self, TrianglePipelineError> {
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("triangle splat vertex shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::TRIANGLE_VERTEX.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("triangle splat fragment shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::TRIANGLE_FRAGMENT.into()),
        });
        let vertex_handle = registry.insert(vertex_module);
        let fragment_handle = registry.insert(fragment_module);

        let bind_group_layout = device.create_bind_group_layout(&bind_group_layout_descriptor());
        let bind_group_layout_handle = registry.insert(bind_group_layout);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("triangle splat pipeline layout"),
            bind_group_layouts: &[registry
                .get(bind_group_layout_handle)
                .expect("bind group layout was just inserted")],
            push_constant_ranges: &[],
        });

        let pipeline = RenderPipelineBuilder::new(device)
            .with_label("triangle splat pipeline")
            .with_vertex_shader(vertex_handle)
            .with_fragment_shader(fragment_handle)
            .with_layout(pipeline_layout)
            .with_vertex_buffer(vertex_buffer_layout())
            .with_primitive(wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: if wireframe_debug {
                    wgpu::PolygonMode::Line
                } else {
                    wgpu::PolygonMode::Fill
                },
                conservative: false,
            })
            .with_fragment_target(Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            }))
            .build(registry)?;

        Ok(Self {
            pipeline,
            bind_group_layout: bind_group_layout_handle,
        })
    }

    /// Build the per-scene bind group against this pipeline's layout. Must
    /// be called with the same layout used at pipeline construction time so
    /// the resulting bind group is compatible with `self.pipeline`.
    pub fn build_bind_group(
        &self,
        device: &wgpu::Device,
        registry: &mut ResourceRegistry,
        camera_buffer: Handle<wgpu::Buffer>,
        scene_constants_buffer: Handle<wgpu::Buffer>,
        sh_buffer: Handle<wgpu::Buffer>,
    ) -> Handle<wgpu::BindGroup> {
        let layout = registry
            .get(self.bind_group_layout)
            .expect("triangle pipeline bind group layout missing from registry");
        let camera = registry
            .get(camera_buffer)
            .expect("camera uniform buffer missing from registry");
        let scene_constants = registry
            .get(scene_constants_buffer)
            .expect("scene constants buffer missing from registry");
        let sh = registry
            .get(sh_buffer)
            .expect("SH storage buffer missing from registry");

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("triangle splat bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scene_constants.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: sh.as_entire_binding(),
                },
            ],
        });

        registry.insert(bind_group)
    }
}
