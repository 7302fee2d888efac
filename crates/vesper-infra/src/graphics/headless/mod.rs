// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The headless device shared by both backends.
//!
//! A [`HeadlessBackend`] keeps every GPU object in integer-addressed tables,
//! validates every call the way a driver's validation layer would, and keeps
//! the recorded command streams for inspection. The API-specific behaviour
//! (image layouts, fences, descriptor pool bounds) is supplied by a
//! [`BackendFlavor`].

mod command;
mod device;
mod recorder;
mod state;
mod table;

pub use command::{RecordedCommand, Submission};
pub use recorder::HeadlessRecorder;

use state::DeviceState;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard};
use vesper_core::math::Extent2D;
use vesper_core::renderer::api::*;
use vesper_core::renderer::{CommandError, ResourceError};

/// The behaviour that distinguishes one graphics API from another.
pub trait BackendFlavor: Default + Debug + Send + Sync + 'static {
    /// The family of API modelled.
    fn backend_type(&self) -> GraphicsBackendType;

    /// Limits reported to the render core.
    fn limits(&self) -> BackendLimits;

    /// The capacity enforced for a pool that asked for `requested` sets.
    /// `None` means the pool never runs out.
    fn pool_capacity(&self, requested: u32) -> Option<u32>;

    /// The layout a freshly created texture starts in.
    fn initial_layout(&self, usage: TextureUsage) -> ImageLayout;

    /// The barrier that moves `texture` from `current` to `target`, if the API needs one.
    fn barrier(
        &self,
        texture: TextureId,
        current: ImageLayout,
        target: ImageLayout,
    ) -> Option<RecordedCommand>;

    /// Checks that `texture` can be sampled in its current layout.
    fn check_sampled(&self, texture: TextureId, current: ImageLayout) -> Result<(), CommandError>;

    /// Checks that an attachment continued by a pass holds rendered contents.
    fn check_continued(
        &self,
        texture: TextureId,
        current: ImageLayout,
        expected: ImageLayout,
    ) -> Result<(), CommandError>;

    /// `true` if acquiring an image waits on the slot's fence.
    fn uses_fences(&self) -> bool;
}

/// Startup configuration of a headless backend.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessConfig {
    /// Initial swapchain extent.
    pub extent: Extent2D,
    /// Frames the CPU may record ahead of the GPU.
    pub frames_in_flight: usize,
    /// Number of swapchain images.
    pub swapchain_image_count: u32,
    /// Format of the swapchain images.
    pub swapchain_format: TextureFormat,
    /// Number of past submissions kept for inspection.
    pub submission_history: usize,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            extent: Extent2D::new(1280, 720),
            frames_in_flight: DEFAULT_FRAMES_IN_FLIGHT,
            swapchain_image_count: 3,
            swapchain_format: TextureFormat::Bgra8UnormSrgb,
            submission_history: 8,
        }
    }
}

/// Number of live objects per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveResourceCounts {
    /// Live buffers.
    pub buffers: usize,
    /// Live textures, swapchain images included.
    pub textures: usize,
    /// Live descriptor sets.
    pub descriptor_sets: usize,
    /// Live pipelines.
    pub pipelines: usize,
    /// Live framebuffers.
    pub framebuffers: usize,
    /// Live render passes.
    pub render_passes: usize,
}

/// A headless graphics device parameterized by API flavor.
#[derive(Debug)]
pub struct HeadlessBackend<F: BackendFlavor> {
    flavor: F,
    config: HeadlessConfig,
    state: Mutex<DeviceState>,
}

impl<F: BackendFlavor> HeadlessBackend<F> {
    /// Creates a backend and its initial swapchain.
    pub fn new(config: HeadlessConfig) -> Result<Self, ResourceError> {
        if config.frames_in_flight == 0 || config.swapchain_image_count == 0 {
            log::error!("Headless backend requires at least one frame in flight and one swapchain image");
            return Err(ResourceError::BackendError(
                "frames_in_flight and swapchain_image_count must be non-zero".to_string(),
            ));
        }
        let flavor = F::default();
        let state = DeviceState::new(
            config.extent,
            config.swapchain_format,
            config.swapchain_image_count,
            config.frames_in_flight,
        );
        let backend = Self {
            flavor,
            config,
            state: Mutex::new(state),
        };
        {
            let mut state = backend.lock("swapchain")?;
            backend.build_swapchain_images(&mut state, backend.config.extent);
        }
        log::info!(
            "HeadlessBackend: created {} backend at {}x{} with {} frames in flight",
            backend.flavor.backend_type(),
            backend.config.extent.width,
            backend.config.extent.height,
            backend.config.frames_in_flight
        );
        Ok(backend)
    }

    /// Creates a backend with [`HeadlessConfig::default`].
    pub fn with_defaults() -> Result<Self, ResourceError> {
        Self::new(HeadlessConfig::default())
    }

    pub(crate) fn flavor(&self) -> &F {
        &self.flavor
    }

    pub(crate) fn lock(&self, what: &str) -> Result<MutexGuard<'_, DeviceState>, ResourceError> {
        self.state
            .lock()
            .map_err(|e| ResourceError::BackendError(format!("Mutex poisoned ({what}): {e}")))
    }

    /// Locks the state for calls that cannot report an error.
    pub(crate) fn lock_infallible(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("HeadlessBackend: recovering from a poisoned state mutex");
            poisoned.into_inner()
        })
    }

    pub(crate) fn build_swapchain_images(&self, state: &mut DeviceState, extent: Extent2D) {
        let format = state.swapchain.format;
        let images = (0..state.swapchain.image_count)
            .map(|i| {
                let id = state.textures.insert(state::TextureRecord {
                    label: format!("swapchain image {i}"),
                    size: extent,
                    format,
                    usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::PRESENT,
                    layout: ImageLayout::Undefined,
                });
                TextureId(id)
            })
            .collect();
        state.swapchain.images = images;
        state.swapchain.extent = extent;
        state.swapchain.next_image = 0;
    }

    pub(crate) fn config(&self) -> &HeadlessConfig {
        &self.config
    }

    // --- Inspection and simulation ---

    /// Simulates the window being resized. The next acquire or present reports
    /// [`SwapchainStatus::ResizeRequired`].
    pub fn simulate_window_resize(&self, extent: Extent2D) {
        self.lock_infallible().swapchain.pending_resize = Some(extent);
    }

    /// The extent requested by the last simulated window resize, if not yet applied.
    pub fn pending_resize(&self) -> Option<Extent2D> {
        self.lock_infallible().swapchain.pending_resize
    }

    /// Simulates the surface moving to a display that wants a different image
    /// count or format. The next acquire or present reports
    /// [`SwapchainStatus::ResizeRequired`] and the next swapchain recreation
    /// builds `image_count` images of `format`.
    pub fn simulate_surface_change(&self, image_count: u32, format: TextureFormat) {
        let mut state = self.lock_infallible();
        state.swapchain.pending_surface = Some((image_count.max(1), format));
        if state.swapchain.pending_resize.is_none() {
            state.swapchain.pending_resize = Some(state.swapchain.extent);
        }
    }

    /// Simulates losing the surface. Every following acquire and present reports
    /// [`SwapchainStatus::Error`].
    pub fn simulate_surface_loss(&self) {
        self.lock_infallible().swapchain.lost = true;
    }

    /// The retained submissions, oldest first.
    pub fn submissions(&self) -> Vec<Submission> {
        self.lock_infallible().submissions.iter().cloned().collect()
    }

    /// The most recent submission.
    pub fn last_submission(&self) -> Option<Submission> {
        self.lock_infallible().submissions.back().cloned()
    }

    /// Number of times the buffer's contents were written after creation.
    pub fn buffer_write_count(&self, id: BufferId) -> Result<u64, ResourceError> {
        Ok(self.lock("buffers")?.buffers.get(id.0)?.write_count)
    }

    /// Number of writes that went through a staging copy.
    pub fn staging_upload_count(&self, id: BufferId) -> Result<u64, ResourceError> {
        Ok(self.lock("buffers")?.buffers.get(id.0)?.staging_uploads)
    }

    /// Reads `count` elements of `T` from the buffer, starting at byte `offset`.
    pub fn read_buffer_as<T: bytemuck::Pod>(
        &self,
        id: BufferId,
        offset: u64,
        count: usize,
    ) -> Result<Vec<T>, ResourceError> {
        let element = std::mem::size_of::<T>().max(1);
        let size = (count * element) as u64;
        let bytes = vesper_core::renderer::GraphicsBackend::read_buffer(self, id, offset, size)?;
        Ok(bytes
            .chunks_exact(element)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// The layout the texture is currently in.
    pub fn texture_layout(&self, id: TextureId) -> Result<ImageLayout, ResourceError> {
        Ok(self.lock("textures")?.textures.get(id.0)?.layout)
    }

    /// The size of a texture.
    pub fn texture_extent(&self, id: TextureId) -> Result<Extent2D, ResourceError> {
        Ok(self.lock("textures")?.textures.get(id.0)?.size)
    }

    /// The size of a framebuffer.
    pub fn framebuffer_extent(&self, id: FramebufferId) -> Result<Extent2D, ResourceError> {
        Ok(self.lock("framebuffers")?.framebuffers.get(id.0)?.extent)
    }

    /// The render pass a pipeline was built against.
    pub fn pipeline_render_pass(&self, id: PipelineId) -> Result<RenderPassId, ResourceError> {
        Ok(self.lock("pipelines")?.pipelines.get(id.0)?.render_pass)
    }

    /// Returns `true` if the framebuffer has not been destroyed.
    pub fn is_framebuffer_live(&self, id: FramebufferId) -> bool {
        self.lock_infallible().framebuffers.contains(id.0)
    }

    /// Returns `true` if the descriptor set has not been freed.
    pub fn is_descriptor_set_live(&self, id: DescriptorSetId) -> bool {
        self.lock_infallible().sets.contains(id.0)
    }

    /// The resource bound at `binding` of a descriptor set.
    pub fn descriptor_component(
        &self,
        set: DescriptorSetId,
        binding: u32,
    ) -> Result<DescriptorComponent, ResourceError> {
        let state = self.lock("descriptor sets")?;
        state
            .sets
            .get(set.0)?
            .components
            .iter()
            .find(|(b, _)| *b == binding)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                ResourceError::DescriptorMismatch(format!("set {set:?} has no binding {binding}"))
            })
    }

    /// Counts of live objects.
    pub fn live_resources(&self) -> LiveResourceCounts {
        let state = self.lock_infallible();
        LiveResourceCounts {
            buffers: state.buffers.len(),
            textures: state.textures.len(),
            descriptor_sets: state.sets.len(),
            pipelines: state.pipelines.len(),
            framebuffers: state.framebuffers.len(),
            render_passes: state.render_passes.len(),
        }
    }

    /// Number of times acquiring an image had to wait on a pending fence.
    pub fn fence_waits(&self) -> u64 {
        self.lock_infallible().fence_waits
    }

    /// Number of images presented.
    pub fn present_count(&self) -> u64 {
        self.lock_infallible().swapchain.presents
    }
}
