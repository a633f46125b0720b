use std::f32::consts::TAU;

use anyhow::{Context, Result};

use ember_engine::backend::{GraphicsBackend, HeadlessBackend, WgpuBackend};
use ember_engine::buffers::{
    quad_indices, FixedLocations, PackedColor, RenderBuffers, RenderBuffersConfig, RenderCall,
    TexChannelSpec, UploadStats, Vertex, QUAD_INDICES, QUAD_VERTICES,
};
use ember_engine::device::{Gpu, GpuInit};
use ember_engine::logging::{init_logging, LoggingConfig};

const MAX_QUADS: usize = 1024;
const FRAMES: u32 = 4;

/// Corner offsets and texture coordinates, in `QUAD_INDICES` winding order.
const CORNERS: [([f32; 2], [f32; 2]); QUAD_VERTICES] = [
    ([-0.5, -0.5], [0.0, 1.0]),
    ([0.5, -0.5], [1.0, 1.0]),
    ([0.5, 0.5], [1.0, 0.0]),
    ([-0.5, 0.5], [0.0, 0.0]),
];

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RenderBuffersConfig::quads(MAX_QUADS)
        .with_tex_channels([TexChannelSpec::new(2)])
        .with_max_render_calls(16)
        .with_label("studio particles");
    let indices = quad_indices(MAX_QUADS)?;

    // A few thousand vertices per frame; any adapter will do.
    let init = GpuInit {
        power_preference: wgpu::PowerPreference::LowPower,
        ..GpuInit::default()
    };

    match Gpu::new_headless_blocking(init) {
        Ok(gpu) => {
            let info = gpu.adapter_info();
            log::info!("running on {} ({:?})", info.name, info.backend);

            let backend = WgpuBackend::new(gpu.device().clone(), gpu.queue().clone());
            let mut rb = RenderBuffers::new(backend);
            rb.initialize(&config, &indices)?;
            run_frames(&mut rb)?;
            report_wgpu(&rb)?;
            rb.shutdown()?;
        }
        Err(err) => {
            log::warn!("no GPU available ({err:#}); staging into host memory");

            let mut rb = RenderBuffers::new(HeadlessBackend::new());
            rb.initialize(&config, &indices)?;
            run_frames(&mut rb)?;
            log::info!(
                "host backend recorded {} uploads over {} buffers",
                rb.backend().uploads().len(),
                rb.backend().live_buffers()
            );
            rb.shutdown()?;
        }
    }

    Ok(())
}

fn run_frames<B: GraphicsBackend>(rb: &mut RenderBuffers<B>) -> Result<()> {
    let locations = FixedLocations::default();

    for frame in 0..FRAMES {
        rb.reset()?;
        let quads = emit_ring(rb, frame)?;
        let stats: UploadStats = rb.flush_to_gpu()?;
        rb.bind(&locations)?;

        log::info!(
            "frame {frame}: {quads} particles, {} vertices, {} bytes in {} uploads, {} render calls",
            stats.vertices,
            stats.bytes,
            stats.uploads,
            rb.num_render_calls()
        );
    }
    Ok(())
}

/// Emits a ring of particles whose size grows with `frame`.
///
/// Even and odd particles use different materials, one render call each.
fn emit_ring<B: GraphicsBackend>(rb: &mut RenderBuffers<B>, frame: u32) -> Result<usize> {
    let quads = 64 * (frame as usize + 1);
    let half = quads / 2;
    let scale = 0.02 + 0.01 * frame as f32;

    // Two contiguous runs, one per material.
    for material in 0..2 {
        for i in 0..half {
            let q = i * 2 + material;
            let angle = q as f32 / quads as f32 * TAU;
            let center = [angle.cos() * 0.8, angle.sin() * 0.8];
            let color = PackedColor::from_f32(
                0.5 + 0.5 * angle.cos(),
                0.5 + 0.5 * angle.sin(),
                material as f32,
                1.0,
            );

            for (offset, uv) in &CORNERS {
                let position = [
                    center[0] + offset[0] * scale,
                    center[1] + offset[1] * scale,
                    0.0,
                ];
                rb.append_vertex(&Vertex::new(position, color).with_tex_coords(uv))?;
            }
        }

        let start_index = (material * half * QUAD_INDICES.len()) as u32;
        let num_indices = (half * QUAD_INDICES.len()) as u32;
        rb.append_render_call(RenderCall::new(material as u32, start_index, num_indices))?;
    }

    Ok(half * 2)
}

fn report_wgpu(rb: &RenderBuffers<WgpuBackend>) -> Result<()> {
    let handles = rb.handles().context("render buffers are not live")?;
    let bytes = rb
        .backend()
        .read_buffer(handles.positions, 0, 3 * 4)
        .context("position readback failed")?;

    let first: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    log::info!("first staged position on the GPU: {first:?}");

    let bound = rb.backend().bound();
    log::info!(
        "pipeline needs {} vertex buffer layouts at locations {:?}",
        bound.vertex_buffer_layouts().len(),
        bound.locations().collect::<Vec<_>>()
    );
    Ok(())
}
