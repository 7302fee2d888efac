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

//! The command stream a headless backend keeps for inspection.

use vesper_core::math::Extent2D;
use vesper_core::renderer::api::{
    BufferId, CommandBufferId, DescriptorSetId, FramebufferId, ImageLayout, IndexFormat,
    PipelineId, RenderPassId, ScissorRect, ShaderStageFlags, TextureId, Viewport,
};

/// One command as it was recorded, after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// A render pass instance began.
    BeginRenderPass {
        /// The render pass.
        render_pass: RenderPassId,
        /// The framebuffer.
        framebuffer: FramebufferId,
        /// Label of the render pass.
        label: String,
        /// Size of the framebuffer.
        extent: Extent2D,
    },
    /// The active render pass ended.
    EndRenderPass,
    /// An image layout transition. Only recorded by explicit backends.
    PipelineBarrier {
        /// The transitioned texture.
        texture: TextureId,
        /// Layout before the barrier.
        from: ImageLayout,
        /// Layout after the barrier.
        to: ImageLayout,
    },
    /// A pipeline was bound.
    BindPipeline(PipelineId),
    /// The viewport was set.
    SetViewport(Viewport),
    /// The scissor was set.
    SetScissor(ScissorRect),
    /// Vertex buffers were bound.
    BindVertexBuffers {
        /// First binding slot.
        first_binding: u32,
        /// The buffers.
        buffers: Vec<BufferId>,
    },
    /// An index buffer was bound.
    BindIndexBuffer {
        /// The buffer.
        buffer: BufferId,
        /// Index format.
        format: IndexFormat,
    },
    /// Push constants were written.
    PushConstants {
        /// Stages that see the data.
        stages: ShaderStageFlags,
        /// The raw payload.
        data: Vec<u8>,
    },
    /// Descriptor sets were bound.
    BindDescriptorSets {
        /// First set index.
        first_set: u32,
        /// The sets.
        sets: Vec<DescriptorSetId>,
        /// Dynamic offsets, in set order.
        dynamic_offsets: Vec<u32>,
    },
    /// A non-indexed draw.
    Draw {
        /// Vertices per instance.
        vertex_count: u32,
        /// Instances drawn.
        instance_count: u32,
    },
    /// An indexed draw.
    DrawIndexed {
        /// Indices per instance.
        index_count: u32,
        /// Instances drawn.
        instance_count: u32,
        /// First instance index.
        first_instance: u32,
    },
}

/// A batch of command buffers submitted together for one frame slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// The frame slot the work was submitted for.
    pub frame_index: usize,
    /// The submitted command buffers, in order.
    pub command_buffers: Vec<CommandBufferId>,
    /// Every command of every buffer, concatenated in submission order.
    pub commands: Vec<RecordedCommand>,
}

impl Submission {
    /// Labels of the render passes begun, in recording order.
    pub fn pass_labels(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BeginRenderPass { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The commands recorded inside the first render pass with `label`.
    pub fn pass_commands(&self, label: &str) -> Option<&[RecordedCommand]> {
        let start = self.commands.iter().position(|c| {
            matches!(c, RecordedCommand::BeginRenderPass { label: l, .. } if l == label)
        })?;
        let len = self.commands[start..]
            .iter()
            .position(|c| matches!(c, RecordedCommand::EndRenderPass))?;
        Some(&self.commands[start..=start + len])
    }

    /// Every push constant payload recorded inside the pass with `label`.
    pub fn push_constants_in(&self, label: &str) -> Vec<&[u8]> {
        self.pass_commands(label)
            .unwrap_or(&[])
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::PushConstants { data, .. } => Some(data.as_slice()),
                _ => None,
            })
            .collect()
    }

    /// Number of draw commands of either kind.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    RecordedCommand::Draw { .. } | RecordedCommand::DrawIndexed { .. }
                )
            })
            .count()
    }
}
