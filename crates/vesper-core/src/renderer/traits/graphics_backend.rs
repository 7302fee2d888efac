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

use crate::math::Extent2D;
use crate::renderer::api::*;
use crate::renderer::error::{RenderError, ResourceError};
use crate::renderer::traits::CommandRecorder;
use std::fmt::Debug;

/// The single interface the render core drives a graphics API through.
///
/// Every GPU object is created and destroyed through this trait and referred
/// to by an opaque, `Copy` handle. An explicit-API implementation and a
/// GL-style implementation sit behind it; callers never branch on which one
/// they hold.
///
/// All methods take `&self`. Implementations keep their resource tables behind
/// interior mutability so a backend can be shared as `Arc<dyn GraphicsBackend>`.
pub trait GraphicsBackend: Send + Sync + Debug + 'static {
    /// The family of API this backend drives.
    fn backend_type(&self) -> GraphicsBackendType;

    /// Limits and capabilities of the backend.
    fn limits(&self) -> BackendLimits;

    /// The number of frames the backend lets the CPU record ahead of the GPU.
    ///
    /// Every N-buffered resource in the render core has this many slots.
    fn max_frames_in_flight(&self) -> usize;

    // --- Shaders ---

    /// Creates a shader module from the provided descriptor.
    /// ## Arguments
    /// * `descriptor` - The name and stage of the shader to load.
    /// ## Returns
    /// The ID of the created shader module.
    /// ## Errors
    /// * `ResourceError` - If the shader loader does not know the name.
    fn create_shader(&self, descriptor: &ShaderDescriptor<'_>) -> Result<ShaderId, ResourceError>;

    /// Destroys the shader module associated with the given ID.
    fn destroy_shader(&self, id: ShaderId) -> Result<(), ResourceError>;

    // --- Buffers ---

    /// Creates a new GPU buffer with undefined contents.
    fn create_buffer(&self, descriptor: &BufferDescriptor<'_>) -> Result<BufferId, ResourceError>;

    /// Creates a new GPU buffer and initializes it with the provided data.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If `data` is larger than the descriptor's size.
    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor<'_>,
        data: &[u8],
    ) -> Result<BufferId, ResourceError>;

    /// Writes `data` into the buffer at `offset`.
    ///
    /// Host-visible buffers are written in place; device-local buffers go
    /// through a staging copy.
    /// ## Errors
    /// * `ResourceError::OutOfBounds` - If the write exceeds the buffer.
    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError>;

    /// Reads back `size` bytes from the buffer at `offset`.
    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError>;

    /// Destroys the buffer associated with the given ID.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    // --- Textures and samplers ---

    /// Creates a new texture.
    /// ## Errors
    /// * `ResourceError::UnsupportedFormat` - If the format cannot be used as requested.
    fn create_texture(&self, descriptor: &TextureDescriptor<'_>) -> Result<TextureId, ResourceError>;

    /// Destroys the texture associated with the given ID.
    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError>;

    /// Creates a new sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor<'_>) -> Result<SamplerId, ResourceError>;

    /// Destroys the sampler associated with the given ID.
    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    // --- Descriptors ---

    /// Creates a descriptor set layout.
    fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor<'_>,
    ) -> Result<DescriptorSetLayoutId, ResourceError>;

    /// Destroys a descriptor set layout.
    fn destroy_descriptor_set_layout(&self, id: DescriptorSetLayoutId) -> Result<(), ResourceError>;

    /// Creates a descriptor pool.
    fn create_descriptor_pool(
        &self,
        descriptor: &DescriptorPoolDescriptor<'_>,
    ) -> Result<DescriptorPoolId, ResourceError>;

    /// Destroys a descriptor pool and every set still allocated from it.
    fn destroy_descriptor_pool(&self, id: DescriptorPoolId) -> Result<(), ResourceError>;

    /// Allocates a descriptor set from `pool` and binds `components` to it.
    ///
    /// `components` are bound to the layout's bindings in order. The returned
    /// handle stays valid until the set is freed or the pool destroyed.
    /// ## Errors
    /// * `ResourceError::PoolExhausted` - If the pool is bounded and full.
    /// * `ResourceError::DescriptorMismatch` - If the components do not match the layout.
    fn create_descriptor_set(
        &self,
        pool: DescriptorPoolId,
        layout: DescriptorSetLayoutId,
        components: &[DescriptorComponent],
    ) -> Result<DescriptorSetId, ResourceError>;

    /// Replaces the resource bound at one binding of a live set.
    fn update_descriptor_set(
        &self,
        pool: DescriptorPoolId,
        set: DescriptorSetId,
        binding: u32,
        component: &DescriptorComponent,
    ) -> Result<(), ResourceError>;

    /// Frees every set in `sets`. Either all of them are freed or none is.
    fn free_descriptor_sets(
        &self,
        pool: DescriptorPoolId,
        sets: &[DescriptorSetId],
    ) -> Result<(), ResourceError>;

    // --- Passes and pipelines ---

    /// Creates a render pass description.
    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Result<RenderPassId, ResourceError>;

    /// Destroys a render pass description.
    fn destroy_render_pass(&self, id: RenderPassId) -> Result<(), ResourceError>;

    /// Creates a framebuffer compatible with a render pass.
    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor<'_>,
    ) -> Result<FramebufferId, ResourceError>;

    /// Destroys a framebuffer.
    fn destroy_framebuffer(&self, id: FramebufferId) -> Result<(), ResourceError>;

    /// Creates a graphics pipeline.
    fn create_pipeline(&self, descriptor: &PipelineDescriptor<'_>) -> Result<PipelineId, ResourceError>;

    /// Destroys a graphics pipeline.
    fn destroy_pipeline(&self, id: PipelineId) -> Result<(), ResourceError>;

    // --- Commands ---

    /// Creates a command pool.
    fn create_command_pool(&self, label: &str) -> Result<CommandPoolId, ResourceError>;

    /// Allocates `count` command buffers from a pool.
    fn allocate_command_buffers(
        &self,
        pool: CommandPoolId,
        count: usize,
    ) -> Result<Vec<CommandBufferId>, ResourceError>;

    /// Destroys a command pool and its command buffers.
    fn destroy_command_pool(&self, id: CommandPoolId) -> Result<(), ResourceError>;

    /// Starts recording into a command buffer, discarding whatever it held.
    fn begin_command_buffer(
        &self,
        command_buffer: CommandBufferId,
    ) -> Result<Box<dyn CommandRecorder + '_>, RenderError>;

    /// Submits finished command buffers for the given frame slot.
    ///
    /// The slot's fence is signalled once the GPU has consumed them.
    fn submit(&self, command_buffers: &[CommandBufferId], frame_index: usize)
        -> Result<(), RenderError>;

    // --- Swapchain ---

    /// Waits for the frame slot to be free and acquires the next swapchain image.
    fn acquire_image(&self, frame_index: usize) -> AcquiredImage;

    /// Presents a previously acquired image.
    fn present(&self, image_index: u32) -> SwapchainStatus;

    /// Recreates the swapchain at a new extent. The old swapchain images are destroyed.
    fn recreate_swapchain(&self, extent: Extent2D) -> Result<(), RenderError>;

    /// The textures backing the current swapchain images.
    fn swapchain_images(&self) -> Vec<TextureId>;

    /// The format of the swapchain images.
    fn swapchain_format(&self) -> TextureFormat;

    /// The current swapchain extent.
    fn extent(&self) -> Extent2D;

    /// The extent of the window surface, which differs from [`extent`](Self::extent)
    /// after the window was resized until the swapchain is recreated.
    fn surface_extent(&self) -> Extent2D;

    /// Blocks until the GPU has finished all submitted work.
    fn wait_idle(&self);
}
