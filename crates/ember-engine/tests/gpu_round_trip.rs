//! `RenderBuffers` on a real wgpu device.
//!
//! Every test skips when no adapter is available (e.g. CI without a GPU or a
//! software rasterizer).

use ember_engine::backend::{BackendError, BufferId, GraphicsBackend, WgpuBackend};
use ember_engine::buffers::{
    quad_indices, BufferError, FixedLocations, PackedColor, RenderBuffers, RenderBuffersConfig,
    TexChannelSpec, Vertex,
};
use ember_engine::device::{Gpu, GpuInit};
use ember_engine::logging::{init_logging, LoggingConfig};

const TARGET_SIZE: u32 = 4;
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const SHADER: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
    @location(2) uv: vec2<f32>,
) -> VsOut {
    var out: VsOut;
    out.position = vec4<f32>(position, 1.0);
    out.color = color * vec4<f32>(1.0, 1.0, 1.0, step(0.0, uv.x));
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

struct TestContext {
    gpu: Gpu,
    rb: RenderBuffers<WgpuBackend>,
}

impl TestContext {
    fn new(max_vertices: usize, channels: &[u8]) -> Option<Self> {
        init_logging(LoggingConfig::for_tests());

        let gpu = match Gpu::new_headless_blocking(GpuInit::default()) {
            Ok(gpu) => gpu,
            Err(err) => {
                eprintln!("no wgpu adapter available, skipping: {err:#}");
                return None;
            }
        };

        let config = RenderBuffersConfig::default()
            .with_max_vertices(max_vertices)
            .with_max_render_calls(4)
            .with_tex_channels(channels.iter().map(|&d| TexChannelSpec::new(d)));

        let backend = WgpuBackend::new(gpu.device().clone(), gpu.queue().clone());
        let mut rb = RenderBuffers::new(backend);
        rb.initialize(&config, &quad_indices(max_vertices.div_ceil(4)).unwrap())
            .unwrap();

        Some(Self { gpu, rb })
    }

    fn read(&self, id: BufferId, len: u64) -> Vec<u8> {
        self.rb.backend().read_buffer(id, 0, len).unwrap()
    }
}

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn map_read(device: &wgpu::Device, buffer: &wgpu::Buffer) -> Vec<u8> {
    let slice = buffer.slice(..);
    slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
    device.poll(wgpu::PollType::wait_indefinitely()).unwrap();
    let data = slice.get_mapped_range().to_vec();
    buffer.unmap();
    data
}

#[test]
fn round_trip_four_vertices() {
    let Some(mut ctx) = TestContext::new(4, &[]) else {
        return;
    };

    for i in 0..4 {
        let p = i as f32;
        ctx.rb
            .append_vertex(&Vertex::new([p, p, p], PackedColor(0xFFFF_FFFF)))
            .unwrap();
    }
    ctx.rb.flush_to_gpu().unwrap();

    let handles = ctx.rb.handles().unwrap();
    let (positions, colors) = (handles.positions, handles.colors);

    assert_eq!(
        floats(&ctx.read(positions, 4 * 12)),
        vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]
    );
    assert!(ctx.read(colors, 4 * 4).iter().all(|&b| b == 0xFF));

    assert_eq!(ctx.rb.shutdown(), Ok(3));
    assert_eq!(ctx.rb.backend().live_buffers(), 0);
}

#[test]
fn shorter_frame_leaves_tail_untouched() {
    let Some(mut ctx) = TestContext::new(4, &[2]) else {
        return;
    };

    let uv = [0.5, 0.25];
    for i in 0..4 {
        let v = Vertex::new([9.0 + i as f32; 3], PackedColor::WHITE).with_tex_coords(&uv);
        ctx.rb.append_vertex(&v).unwrap();
    }
    ctx.rb.flush_to_gpu().unwrap();

    ctx.rb.reset().unwrap();
    ctx.rb
        .append_vertex(&Vertex::new([1.0; 3], PackedColor::TRANSPARENT).with_tex_coords(&uv))
        .unwrap();
    let stats = ctx.rb.flush_to_gpu().unwrap();
    assert_eq!(stats.bytes, 12 + 4 + 8);

    let positions = ctx.rb.handles().unwrap().positions;
    assert_eq!(
        floats(&ctx.read(positions, 4 * 12)),
        vec![1.0, 1.0, 1.0, 10.0, 10.0, 10.0, 11.0, 11.0, 11.0, 12.0, 12.0, 12.0]
    );

    // An empty frame uploads nothing and keeps the previous contents.
    ctx.rb.reset().unwrap();
    assert_eq!(ctx.rb.flush_to_gpu().unwrap().bytes, 0);
    assert_eq!(floats(&ctx.read(positions, 12)), vec![1.0, 1.0, 1.0]);
}

#[test]
fn index_buffer_is_static() {
    let Some(mut ctx) = TestContext::new(8, &[]) else {
        return;
    };
    let indices = ctx.rb.handles().unwrap().indices;

    let bytes = ctx.read(indices, 12 * 2);
    let read: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_ne_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(read, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);

    // Unaligned window inside the buffer.
    assert_eq!(
        ctx.rb.backend().read_buffer(indices, 2, 2).unwrap(),
        1u16.to_ne_bytes().to_vec()
    );

    assert_eq!(
        ctx.rb.backend_mut().upload_sub_range(indices, 0, &[0; 4]),
        Err(BackendError::ImmutableBuffer(indices.raw()))
    );
}

#[test]
fn bind_records_one_slot_per_stream() {
    let Some(mut ctx) = TestContext::new(4, &[2]) else {
        return;
    };
    ctx.rb.bind(&FixedLocations::default()).unwrap();

    let bound = ctx.rb.backend().bound();
    assert_eq!(bound.attribute_count(), 3);
    assert_eq!(bound.locations().collect::<Vec<_>>(), vec![0, 1, 2]);

    let layouts = bound.vertex_buffer_layouts();
    let strides: Vec<u64> = layouts.iter().map(|l| l.array_stride).collect();
    assert_eq!(strides, vec![12, 4, 8]);

    // Moving the streams to new locations replaces the old slots.
    ctx.rb
        .bind(&FixedLocations {
            position: 3,
            color: 4,
            tex0: 5,
        })
        .unwrap();
    let bound = ctx.rb.backend().bound();
    assert_eq!(bound.attribute_count(), 3);
    assert_eq!(bound.locations().collect::<Vec<_>>(), vec![3, 4, 5]);
}

#[test]
fn bind_without_channels_records_two_slots() {
    let Some(mut ctx) = TestContext::new(4, &[]) else {
        return;
    };
    ctx.rb.bind(&FixedLocations::default()).unwrap();

    assert_eq!(ctx.rb.backend().bound().attribute_count(), 2);
}

#[test]
fn bind_rejects_two_channels() {
    let Some(mut ctx) = TestContext::new(4, &[2, 2]) else {
        return;
    };

    assert_eq!(
        ctx.rb.bind(&FixedLocations::default()),
        Err(BufferError::UnsupportedChannelCount(2))
    );
    assert_eq!(ctx.rb.backend().bound().attribute_count(), 0);
}

#[test]
fn bound_streams_draw_a_quad() {
    let Some(mut ctx) = TestContext::new(4, &[2]) else {
        return;
    };

    let red = PackedColor::from_rgba8(255, 0, 0, 255);
    let corners = [
        ([-1.0, -1.0, 0.0], [0.0, 1.0]),
        ([1.0, -1.0, 0.0], [1.0, 1.0]),
        ([1.0, 1.0, 0.0], [1.0, 0.0]),
        ([-1.0, 1.0, 0.0], [0.0, 0.0]),
    ];
    for (position, uv) in &corners {
        ctx.rb
            .append_vertex(&Vertex::new(*position, red).with_tex_coords(uv))
            .unwrap();
    }
    ctx.rb.flush_to_gpu().unwrap();
    ctx.rb.bind(&FixedLocations::default()).unwrap();

    let device = ctx.gpu.device();
    let queue = ctx.gpu.queue();
    let bound = ctx.rb.backend().bound();

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("ember test shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER.into()),
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("ember test pipeline"),
        layout: None,
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &bound.vertex_buffer_layouts(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    });

    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("ember test target"),
        size: wgpu::Extent3d {
            width: TARGET_SIZE,
            height: TARGET_SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    // Rows are padded to the copy alignment.
    let padded_row = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("ember test readback"),
        size: u64::from(padded_row * TARGET_SIZE),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("ember test encoder"),
    });
    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ember test pass"),
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
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(&pipeline);
        bound.apply(&mut pass);
        pass.draw_indexed(0..ctx.rb.index_count() as u32, 0, 0..1);
    }
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture: &target,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &readback,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(TARGET_SIZE),
            },
        },
        wgpu::Extent3d {
            width: TARGET_SIZE,
            height: TARGET_SIZE,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let pixels = map_read(device, &readback);
    for row in 0..TARGET_SIZE as usize {
        let start = row * padded_row as usize;
        let texels = &pixels[start..start + TARGET_SIZE as usize * 4];
        for texel in texels.chunks_exact(4) {
            assert_eq!(texel, &[255, 0, 0, 255], "row {row}");
        }
    }
}
