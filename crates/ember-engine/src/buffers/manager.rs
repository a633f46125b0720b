use crate::backend::{AttributeFormat, BufferDesc, BufferId, BufferKind, GraphicsBackend};

use super::config::RenderBuffersConfig;
use super::error::BufferError;
use super::index::IndexBuffer;
use super::locations::AttributeLocations;
use super::render_calls::{RenderCall, RenderCallQueue};
use super::staging::VertexStagingBuffer;
use super::vertex::{TexChannelSpec, Vertex};

/// Per-frame state of live render buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameState {
    /// Nothing staged since the last reset.
    Idle,
    /// At least one vertex or render call staged, not yet uploaded.
    Accumulating,
    /// Staged data uploaded; ready to bind and draw.
    Flushed,
}

/// Summary of one [`RenderBuffers::flush_to_gpu`] call.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct UploadStats {
    pub vertices: usize,
    /// Sub-range uploads issued (one per vertex stream).
    pub uploads: usize,
    pub bytes: u64,
}

/// Backend buffer ids of live render buffers.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferHandles<'a> {
    pub positions: BufferId,
    pub colors: BufferId,
    pub tex_channels: &'a [BufferId],
    pub indices: BufferId,
}

impl BufferHandles<'_> {
    /// Number of backend buffers owned.
    pub fn count(&self) -> usize {
        3 + self.tex_channels.len()
    }
}

#[derive(Debug)]
struct LiveBuffers<R> {
    staging: VertexStagingBuffer,
    tex_specs: Vec<TexChannelSpec>,

    positions: BufferId,
    colors: BufferId,
    tex_buffers: Vec<BufferId>,
    indices: IndexBuffer,

    render_calls: RenderCallQueue<R>,
    state: FrameState,
}

impl<R> LiveBuffers<R> {
    fn buffer_ids(&self) -> impl Iterator<Item = BufferId> + '_ {
        [self.positions, self.colors]
            .into_iter()
            .chain(self.tex_buffers.iter().copied())
            .chain(std::iter::once(self.indices.buffer()))
    }
}

#[derive(Debug)]
enum Lifecycle<R> {
    Uninitialized,
    Live(LiveBuffers<R>),
    ShutDown,
}

/// Staging and GPU upload of particle vertex streams and render calls.
///
/// Owns one CPU store and one backend buffer per vertex stream (positions,
/// packed colors, each texture channel), a static index buffer and a
/// fixed-capacity render-call queue. Everything is allocated in
/// [`initialize`](Self::initialize) and reused every frame.
///
/// Frame protocol:
/// ```text
/// reset → append_vertex / append_render_call … → flush_to_gpu → bind → draw
/// ```
/// The order is the caller's responsibility.
///
/// Buffers are released by [`shutdown`](Self::shutdown), or on drop if it was
/// never called.
pub struct RenderBuffers<B: GraphicsBackend, R = RenderCall> {
    backend: B,
    lifecycle: Lifecycle<R>,
}

impl<B: GraphicsBackend, R> RenderBuffers<B, R> {
    /// Wraps `backend`; no resources are created until `initialize`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    /// Creates every CPU store and backend buffer.
    ///
    /// This is the only allocation point. If the backend fails part-way,
    /// buffers created so far are released before returning.
    pub fn initialize(
        &mut self,
        config: &RenderBuffersConfig,
        indices: &[u16],
    ) -> Result<(), BufferError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Live(_) => return Err(BufferError::AlreadyInitialized),
            Lifecycle::ShutDown => return Err(BufferError::UseAfterShutdown),
        }

        config.validate()?;
        if indices.is_empty() {
            return Err(BufferError::InvalidConfig("index list is empty".to_string()));
        }

        let mut created = Vec::with_capacity(3 + config.tex_channels.len());
        let live = match self.create_live(config, indices, &mut created) {
            Ok(live) => live,
            Err(err) => {
                for id in created {
                    if let Err(e) = self.backend.delete_buffer(id) {
                        log::warn!("failed to release buffer #{} after init error: {e}", id.raw());
                    }
                }
                return Err(err);
            }
        };

        if usize::from(live.indices.max_index()) >= config.max_vertices {
            log::warn!(
                "index buffer references vertex {} but only {} vertices fit",
                live.indices.max_index(),
                config.max_vertices
            );
        }

        log::debug!(
            "render buffers '{}' initialized on {}: {} vertices, {} tex channels, {} indices, {} render calls",
            config.label,
            self.backend.name(),
            config.max_vertices,
            config.tex_channels.len(),
            indices.len(),
            config.max_render_calls
        );

        self.lifecycle = Lifecycle::Live(live);
        Ok(())
    }

    fn create_live(
        &mut self,
        config: &RenderBuffersConfig,
        indices: &[u16],
        created: &mut Vec<BufferId>,
    ) -> Result<LiveBuffers<R>, BufferError> {
        let staging = VertexStagingBuffer::new(config.max_vertices, &config.tex_channels)?;
        let label = &config.label;

        let mut dynamic_vertex = |name: String, size: usize| -> Result<BufferId, BufferError> {
            let id = self.backend.create_buffer(&BufferDesc::dynamic(
                &name,
                BufferKind::Vertex,
                size as u64,
            ))?;
            created.push(id);
            Ok(id)
        };

        let positions =
            dynamic_vertex(format!("{label} positions"), staging.positions().byte_capacity())?;
        let colors = dynamic_vertex(format!("{label} colors"), staging.colors().byte_capacity())?;

        let mut tex_buffers = Vec::with_capacity(staging.tex_channel_count());
        for channel in 0..staging.tex_channel_count() {
            let size = staging
                .tex_channel(channel)
                .map_or(0, |store| store.byte_capacity());
            tex_buffers.push(dynamic_vertex(format!("{label} tex{channel}"), size)?);
        }

        let indices = IndexBuffer::upload(&mut self.backend, &format!("{label} indices"), indices)?;
        created.push(indices.buffer());

        Ok(LiveBuffers {
            staging,
            tex_specs: config.tex_channels.clone(),
            positions,
            colors,
            tex_buffers,
            indices,
            render_calls: RenderCallQueue::new(config.max_render_calls),
            state: FrameState::Idle,
        })
    }

    /// Stages one vertex at the current count.
    pub fn append_vertex(&mut self, v: &Vertex<'_>) -> Result<(), BufferError> {
        let live = self.live_mut()?;
        live.staging.append_vertex(v)?;
        live.state = FrameState::Accumulating;
        Ok(())
    }

    /// Queues one render call after those already queued.
    pub fn append_render_call(&mut self, call: R) -> Result<(), BufferError> {
        let live = self.live_mut()?;
        live.render_calls.append(call)?;
        live.state = FrameState::Accumulating;
        Ok(())
    }

    /// Zeroes the vertex and render-call counts together.
    pub fn reset(&mut self) -> Result<(), BufferError> {
        let live = self.live_mut()?;
        live.staging.reset();
        live.render_calls.reset();
        live.state = FrameState::Idle;
        Ok(())
    }

    /// Same as [`reset`](Self::reset).
    #[inline]
    pub fn cleanup(&mut self) -> Result<(), BufferError> {
        self.reset()
    }

    /// Uploads the staged vertices of every stream to offset 0 of its buffer.
    ///
    /// Exactly `count × element_size` bytes are sent per stream; the rest of
    /// each GPU buffer keeps whatever it held.
    pub fn flush_to_gpu(&mut self) -> Result<UploadStats, BufferError> {
        let (backend, live) = self.live_parts()?;
        let count = live.staging.len();
        let mut stats = UploadStats {
            vertices: count,
            ..UploadStats::default()
        };

        let mut upload = |id: BufferId, bytes: &[u8]| -> Result<(), BufferError> {
            backend.upload_sub_range(id, 0, bytes)?;
            stats.uploads += 1;
            stats.bytes += bytes.len() as u64;
            Ok(())
        };

        upload(live.positions, live.staging.positions().as_bytes(count))?;
        upload(live.colors, live.staging.colors().as_bytes(count))?;
        for (channel, &id) in live.tex_buffers.iter().enumerate() {
            if let Some(store) = live.staging.tex_channel(channel) {
                upload(id, store.as_bytes(count))?;
            }
        }

        live.state = FrameState::Flushed;
        log::trace!(
            "flushed {} vertices ({} bytes in {} uploads), {} render calls",
            stats.vertices,
            stats.bytes,
            stats.uploads,
            live.render_calls.len()
        );
        Ok(stats)
    }

    /// Points the pipeline's vertex attributes and index buffer at these buffers.
    ///
    /// Position is bound as `Float32x3`, color as `Unorm8x4`, and the texture
    /// channel (when exactly one exists) as `Float32 × dimensions`. More than
    /// one channel is rejected before anything is configured. Previous pipeline
    /// state is not restored.
    pub fn bind<L>(&mut self, locations: &L) -> Result<(), BufferError>
    where
        L: AttributeLocations + ?Sized,
    {
        let (backend, live) = self.live_parts()?;
        if live.tex_specs.len() > 1 {
            return Err(BufferError::UnsupportedChannelCount(live.tex_specs.len()));
        }

        backend.configure_attribute(
            locations.position_location(),
            live.positions,
            AttributeFormat::Float32(3),
        )?;
        backend.configure_attribute(
            locations.color_location(),
            live.colors,
            AttributeFormat::Unorm8x4,
        )?;
        if let (Some(spec), Some(&id)) = (live.tex_specs.first(), live.tex_buffers.first()) {
            backend.configure_attribute(
                locations.tex0_location(),
                id,
                AttributeFormat::Float32(spec.dimensions),
            )?;
        }
        backend.bind_index_buffer(live.indices.buffer(), IndexBuffer::FORMAT)?;

        log::trace!("bound {} vertex streams", 2 + live.tex_buffers.len());
        Ok(())
    }

    /// Releases every backend buffer and returns how many were released.
    ///
    /// The manager is unusable afterwards. If some deletions fail the rest are
    /// still attempted and the first error is returned.
    pub fn shutdown(&mut self) -> Result<usize, BufferError> {
        let live = match std::mem::replace(&mut self.lifecycle, Lifecycle::ShutDown) {
            Lifecycle::Live(live) => live,
            Lifecycle::Uninitialized => {
                self.lifecycle = Lifecycle::Uninitialized;
                return Err(BufferError::UseBeforeInit);
            }
            Lifecycle::ShutDown => return Err(BufferError::UseAfterShutdown),
        };

        let (released, first_err) = release(&mut self.backend, &live);
        log::debug!("render buffers shut down, {released} buffers released");

        match first_err {
            Some(err) => Err(err.into()),
            None => Ok(released),
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    /// Render calls queued this frame, in insertion order.
    ///
    /// Empty before `initialize` and after `shutdown`: the draw loop may
    /// iterate unconditionally. Use [`frame_state`](Self::frame_state) to tell
    /// an empty frame from a dead manager.
    pub fn render_calls(&self) -> &[R] {
        match &self.lifecycle {
            Lifecycle::Live(live) => live.render_calls.as_slice(),
            _ => &[],
        }
    }

    /// Zero unless initialized, like [`render_calls`](Self::render_calls).
    pub fn num_render_calls(&self) -> usize {
        self.render_calls().len()
    }

    /// Vertices staged this frame.
    ///
    /// Zero before `initialize` and after `shutdown`.
    pub fn num_vertices(&self) -> usize {
        match &self.lifecycle {
            Lifecycle::Live(live) => live.staging.len(),
            _ => 0,
        }
    }

    /// `None` unless initialized.
    pub fn frame_state(&self) -> Option<FrameState> {
        match &self.lifecycle {
            Lifecycle::Live(live) => Some(live.state),
            _ => None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Live(_))
    }

    pub fn is_shut_down(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::ShutDown)
    }

    /// CPU staging stores.
    pub fn staging(&self) -> Option<&VertexStagingBuffer> {
        match &self.lifecycle {
            Lifecycle::Live(live) => Some(&live.staging),
            _ => None,
        }
    }

    /// Backend ids of the owned buffers.
    pub fn handles(&self) -> Option<BufferHandles<'_>> {
        match &self.lifecycle {
            Lifecycle::Live(live) => Some(BufferHandles {
                positions: live.positions,
                colors: live.colors,
                tex_channels: &live.tex_buffers,
                indices: live.indices.buffer(),
            }),
            _ => None,
        }
    }

    /// Number of indices in the static index buffer, zero unless initialized.
    pub fn index_count(&self) -> usize {
        match &self.lifecycle {
            Lifecycle::Live(live) => live.indices.len(),
            _ => 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn live_mut(&mut self) -> Result<&mut LiveBuffers<R>, BufferError> {
        match &mut self.lifecycle {
            Lifecycle::Live(live) => Ok(live),
            Lifecycle::Uninitialized => Err(BufferError::UseBeforeInit),
            Lifecycle::ShutDown => Err(BufferError::UseAfterShutdown),
        }
    }

    fn live_parts(&mut self) -> Result<(&mut B, &mut LiveBuffers<R>), BufferError> {
        match &mut self.lifecycle {
            Lifecycle::Live(live) => Ok((&mut self.backend, live)),
            Lifecycle::Uninitialized => Err(BufferError::UseBeforeInit),
            Lifecycle::ShutDown => Err(BufferError::UseAfterShutdown),
        }
    }
}

fn release<B: GraphicsBackend, R>(
    backend: &mut B,
    live: &LiveBuffers<R>,
) -> (usize, Option<crate::backend::BackendError>) {
    let mut released = 0;
    let mut first_err = None;
    for id in live.buffer_ids() {
        match backend.delete_buffer(id) {
            Ok(()) => released += 1,
            Err(e) => {
                log::warn!("failed to release buffer #{}: {e}", id.raw());
                first_err.get_or_insert(e);
            }
        }
    }
    (released, first_err)
}

impl<B: GraphicsBackend, R> Drop for RenderBuffers<B, R> {
    fn drop(&mut self) {
        if let Lifecycle::Live(live) = std::mem::replace(&mut self.lifecycle, Lifecycle::ShutDown) {
            let (released, _) = release(&mut self.backend, &live);
            log::warn!("render buffers dropped without shutdown; released {released} buffers");
        }
    }
}
