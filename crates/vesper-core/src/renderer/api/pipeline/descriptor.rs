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

//! The descriptor used to create a graphics pipeline.

use super::state::{BlendMode, CullMode, DepthState};
use super::vertex::VertexBufferLayout;
use crate::renderer::api::command::RenderPassId;
use crate::renderer::api::resource::{DescriptorSetLayoutId, ShaderId};
use crate::renderer::api::util::ShaderStageFlags;
use std::borrow::Cow;

/// An opaque handle to a graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(pub usize);

/// The push constant block a pipeline declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    /// Stages that read the block.
    pub stages: ShaderStageFlags,
    /// Size of the block in bytes.
    pub size: u32,
}

/// A descriptor used to create a [`PipelineId`].
///
/// Viewport and scissor are always dynamic state, so a pipeline only depends on
/// the extent of its render pass through the pass's attachment formats.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The vertex shader.
    pub vertex_shader: ShaderId,
    /// The fragment shader; `None` for depth-only pipelines.
    pub fragment_shader: Option<ShaderId>,
    /// Layouts of the vertex buffers, in binding order.
    pub vertex_buffers: Cow<'a, [VertexBufferLayout]>,
    /// Descriptor set layouts, in set order.
    pub set_layouts: Cow<'a, [DescriptorSetLayoutId]>,
    /// The push constant block, if any.
    pub push_constant_range: Option<PushConstantRange>,
    /// The render pass the pipeline renders in.
    pub render_pass: RenderPassId,
    /// Depth state.
    pub depth: DepthState,
    /// Blend mode for every color attachment.
    pub blend: BlendMode,
    /// Face culling.
    pub cull_mode: CullMode,
}
