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

use crate::renderer::api::*;
use crate::renderer::error::CommandError;

/// Records rendering commands into one command buffer.
///
/// A recorder is obtained from [`GraphicsBackend::begin_command_buffer`](super::GraphicsBackend::begin_command_buffer)
/// and consumed by [`finish`](CommandRecorder::finish). Commands are validated
/// as they are recorded, so a protocol violation surfaces at the call that
/// caused it rather than at submission.
///
/// Within a pass, a draw is expected to be recorded in this order: pipeline,
/// viewport and scissor, vertex and index buffers, push constants, descriptor
/// sets, draw. Binding descriptor sets before the push constants a pipeline
/// declares is rejected with [`CommandError::PushConstantsRequired`].
pub trait CommandRecorder {
    /// Begins a render pass instance.
    ///
    /// On an explicit backend this transitions every attachment into its
    /// attachment layout.
    fn begin_render_pass(&mut self, info: &RenderPassBeginInfo<'_>) -> Result<(), CommandError>;

    /// Ends the active render pass and transitions attachments to their final usage.
    fn end_render_pass(&mut self) -> Result<(), CommandError>;

    /// Binds a graphics pipeline. Resets the push constant state.
    fn bind_pipeline(&mut self, pipeline: PipelineId) -> Result<(), CommandError>;

    /// Sets the dynamic viewport.
    fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), CommandError>;

    /// Sets the dynamic scissor rectangle.
    fn set_scissor(&mut self, scissor: &ScissorRect) -> Result<(), CommandError>;

    /// Binds vertex buffers starting at `first_binding`.
    fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[BufferId],
    ) -> Result<(), CommandError>;

    /// Binds an index buffer.
    fn bind_index_buffer(&mut self, buffer: BufferId, format: IndexFormat) -> Result<(), CommandError>;

    /// Writes the push constant block of the bound pipeline.
    fn push_constants(&mut self, stages: ShaderStageFlags, data: &[u8]) -> Result<(), CommandError>;

    /// Binds descriptor sets starting at `first_set`.
    ///
    /// `dynamic_offsets` supplies one offset per dynamic binding across all the
    /// sets, in set order.
    fn bind_descriptor_sets(
        &mut self,
        first_set: u32,
        sets: &[DescriptorSetId],
        dynamic_offsets: &[u32],
    ) -> Result<(), CommandError>;

    /// Records a non-indexed draw.
    fn draw(&mut self, vertex_count: u32, instance_count: u32) -> Result<(), CommandError>;

    /// Records an indexed draw.
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_instance: u32,
    ) -> Result<(), CommandError>;

    /// Finishes recording and returns the recorded command buffer.
    fn finish(self: Box<Self>) -> Result<CommandBufferId, CommandError>;
}

