use glam::{Mat4, Vec3};
use tracing::{debug, info, instrument};

use splat_data::{build_geometry, SceneBuilder};
use splat_gpu::{
    upload_scene, BufferBuilder, BufferUsage, FrameInputs, Handle, Mesh, RenderDriver,
    ResourceRegistry, TrianglePipeline,
};

const WIDTH: u32 = 1920;
const HEIGHT: u32 = 1080;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("building demo scene");
    let scene = demo_scene();
    let geometry = build_geometry(&scene);
    info!(
        triangles = scene.triangle_indices.len(),
        vertices = scene.vertices.len(),
        "scene built"
    );

    info!("acquiring GPU device");
    let renderer = pollster::block_on(splat_gpu::Renderer::new())?;
    let device = renderer.device();
    let queue = renderer.queue();

    let mut registry = ResourceRegistry::new();

    let sh_degree = scene.sh.as_ref().map(|sh| sh.degree).unwrap_or(0);
    let uploaded = upload_scene(device, &mut registry, &geometry, sh_degree)?;

    let camera = splat_gpu::CameraUniforms::new(
        Mat4::IDENTITY,
        Mat4::IDENTITY,
        Vec3::ZERO,
        scene.sigma,
        (WIDTH as f32, HEIGHT as f32),
        scene.debug,
    );
    let camera_buffer = BufferBuilder::new(device)
        .label("camera uniforms")
        .with_pod_data(std::slice::from_ref(&camera))
        .usage(BufferUsage::Uniform)
        .build(&mut registry)?;

    let wireframe_debug = scene.debug && renderer.shader_debug_available();
    let pipeline = TrianglePipeline::new(device, &mut registry, wgpu::TextureFormat::Rgba8Unorm, wireframe_debug)?;
    let bind_group = pipeline.build_bind_group(
        device,
        &mut registry,
        camera_buffer,
        uploaded.scene_constants_buffer,
        uploaded.sh_buffer,
    );

    let mesh = Mesh::new(uploaded.triangle_count, uploaded.centroids.clone());
    let mut driver = RenderDriver::new(mesh);

    let eye = Vec3::new(0.0, 0.0, 4.0);
    let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(
        std::f32::consts::FRAC_PI_4,
        WIDTH as f32 / HEIGHT as f32,
        0.1,
        100.0,
    );

    let frame_uniforms = driver.tick(&FrameInputs {
        view_matrix: view,
        proj_matrix: proj,
        camera_pos: eye,
        resolution: (WIDTH as f32, HEIGHT as f32),
        sigma: scene.sigma,
        debug: scene.debug,
    });
    queue.write_buffer(
        registry.get(camera_buffer).expect("camera buffer"),
        0,
        bytemuck::cast_slice(std::slice::from_ref(&frame_uniforms)),
    );

    // The sort dispatched by the first tick() runs on a background thread;
    // give it a moment to land so the very first frame is already ordered.
    std::thread::sleep(std::time::Duration::from_millis(150));
    driver.tick(&FrameInputs {
        view_matrix: view,
        proj_matrix: proj,
        camera_pos: eye,
        resolution: (WIDTH as f32, HEIGHT as f32),
        sigma: scene.sigma,
        debug: scene.debug,
    });

    let index_buffer = BufferBuilder::new(device)
        .label("splat sorted index buffer")
        .with_pod_data(&driver.mesh().index_buffer)
        .usage(BufferUsage::Index)
        .build(&mut registry)?;

    let output_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("splat headless output"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });

    info!("rendering frame");
    render_frame(
        device,
        queue,
        &registry,
        &pipeline,
        bind_group,
        uploaded.vertex_buffer,
        index_buffer,
        &output_texture,
        driver.mesh().index_buffer.len() as u32,
    );

    info!("reading back rendered image");
    save_texture_to_png(device, queue, &output_texture, WIDTH, HEIGHT)?;
    info!("wrote output.png");

    Ok(())
}

/// A small triangle fan with per-vertex opacity, used to exercise the
/// pipeline end to end without requiring an external scene file.
fn demo_scene() -> splat_data::Scene {
    let vertices = vec![
        [-1.0, -1.0, 0.0],
        [1.0, -1.0, 0.0],
        [1.0, 1.0, 0.0],
        [-1.0, 1.0, 0.0],
        [0.0, 0.0, 0.3],
    ];
    let triangle_indices = vec![[0, 1, 4], [1, 2, 4], [2, 3, 4], [3, 0, 4]];
    let opacities = vec![0.6, 0.6, 0.6, 0.6, 0.9];
    let colors = vec![
        [255, 80, 80],
        [80, 255, 80],
        [80, 80, 255],
        [255, 255, 80],
        [255, 255, 255],
    ];

    SceneBuilder::new(vertices, triangle_indices, opacities)
        .with_colors(colors)
        .with_sigma(1.0)
        .build()
        .expect("demo scene is valid")
}

#[instrument(skip_all, fields(index_count))]
#[allow(clippy::too_many_arguments)]
fn render_frame(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    registry: &ResourceRegistry,
    pipeline: &TrianglePipeline,
    bind_group: Handle<wgpu::BindGroup>,
    vertex_buffer: Handle<wgpu::Buffer>,
    index_buffer: Handle<wgpu::Buffer>,
    output_texture: &wgpu::Texture,
    index_count: u32,
) {
    let pipeline = registry.get(pipeline.pipeline).expect("pipeline");
    let bind_group = registry.get(bind_group).expect("bind group");
    let vertex_buffer = registry.get(vertex_buffer).expect("vertex buffer");
    let index_buffer = registry.get(index_buffer).expect("index buffer");

    let view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("splat headless encoder"),
    });

    {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("splat render pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        debug!(index_count, "drawing splat mesh");
        render_pass.draw_indexed(0..index_count, 0, 0..1);
    }

    queue.submit(Some(encoder.finish()));
}

#[instrument(skip(device, queue, texture))]
fn save_texture_to_png(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    width: u32,
    height: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let buffer_size = (width * height * 4) as u64;
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("splat headless readback"),
        size: buffer_size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("splat headless copy encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(Some(encoder.finish()));

    let buffer_slice = output_buffer.slice(..);
    let (sender, receiver) = std::sync::mpsc::channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = sender.send(result);
    });

    loop {
        let _ = device.poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: Some(std::time::Duration::from_millis(100)),
        });
        match receiver.try_recv() {
            Ok(result) => {
                result?;
                break;
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => continue,
            Err(e) => return Err(Box::new(e)),
        }
    }

    let data = buffer_slice.get_mapped_range();
    let pixels: Vec<u8> = data.iter().copied().collect();
    drop(data);
    output_buffer.unmap();

    let img = image::RgbaImage::from_raw(width, height, pixels)
        .ok_or("failed to build image from pixel data")?;
    img.save("output.png")?;

    Ok(())
}
