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

//! Backend object records and the state table they live in.

use super::command::{RecordedCommand, Submission};
use super::table::ResourceTable;
use std::collections::{HashSet, VecDeque};
use vesper_core::math::Extent2D;
use vesper_core::renderer::api::*;
use vesper_core::renderer::{ResourceError, ResourceKind};

#[derive(Debug)]
pub(crate) struct ShaderRecord {
    pub(crate) name: String,
}

#[derive(Debug)]
pub(crate) struct BufferRecord {
    pub(crate) label: String,
    pub(crate) usage: BufferUsage,
    pub(crate) host_visible: bool,
    pub(crate) data: Vec<u8>,
    pub(crate) write_count: u64,
    pub(crate) staging_uploads: u64,
}

#[derive(Debug)]
pub(crate) struct TextureRecord {
    pub(crate) label: String,
    pub(crate) size: Extent2D,
    pub(crate) format: TextureFormat,
    pub(crate) usage: TextureUsage,
    pub(crate) layout: ImageLayout,
}

#[derive(Debug)]
pub(crate) struct SetLayoutRecord {
    pub(crate) bindings: Vec<DescriptorBinding>,
}

impl SetLayoutRecord {
    pub(crate) fn dynamic_binding_count(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| b.ty == DescriptorType::DynamicUniformBuffer)
            .count()
    }
}

#[derive(Debug)]
pub(crate) struct PoolRecord {
    pub(crate) label: String,
    pub(crate) capacity: Option<u32>,
    pub(crate) sets: HashSet<usize>,
}

#[derive(Debug)]
pub(crate) struct SetRecord {
    pub(crate) pool: DescriptorPoolId,
    pub(crate) layout: DescriptorSetLayoutId,
    /// `(binding, component)` pairs in layout order.
    pub(crate) components: Vec<(u32, DescriptorComponent)>,
}

#[derive(Debug)]
pub(crate) struct RenderPassRecord {
    pub(crate) label: String,
    pub(crate) attachments: Vec<AttachmentDescriptor>,
}

#[derive(Debug)]
pub(crate) struct FramebufferRecord {
    pub(crate) render_pass: RenderPassId,
    pub(crate) attachments: Vec<TextureId>,
    pub(crate) extent: Extent2D,
}

#[derive(Debug)]
pub(crate) struct PipelineRecord {
    pub(crate) label: String,
    pub(crate) set_layouts: Vec<DescriptorSetLayoutId>,
    pub(crate) push_constant_range: Option<PushConstantRange>,
    pub(crate) render_pass: RenderPassId,
    pub(crate) vertex_buffer_count: usize,
}

#[derive(Debug)]
pub(crate) struct CommandPoolRecord {
    pub(crate) label: String,
    pub(crate) buffers: Vec<CommandBufferId>,
}

#[derive(Debug)]
pub(crate) struct CommandBufferRecord {
    pub(crate) pool: CommandPoolId,
    pub(crate) recorded: Option<Vec<RecordedCommand>>,
}

/// Per-slot fence. The headless GPU finishes work as soon as it is submitted,
/// so a fence is only ever "pending" between submit and the next acquire.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FenceRecord {
    pub(crate) pending: bool,
}

#[derive(Debug)]
pub(crate) struct SwapchainState {
    pub(crate) extent: Extent2D,
    pub(crate) format: TextureFormat,
    pub(crate) images: Vec<TextureId>,
    pub(crate) image_count: u32,
    pub(crate) next_image: u32,
    pub(crate) pending_resize: Option<Extent2D>,
    /// Image count and format applied by the next recreation.
    pub(crate) pending_surface: Option<(u32, TextureFormat)>,
    pub(crate) lost: bool,
    pub(crate) presents: u64,
}

#[derive(Debug)]
pub(crate) struct DeviceState {
    pub(crate) shaders: ResourceTable<ShaderRecord>,
    pub(crate) buffers: ResourceTable<BufferRecord>,
    pub(crate) textures: ResourceTable<TextureRecord>,
    pub(crate) samplers: ResourceTable<String>,
    pub(crate) set_layouts: ResourceTable<SetLayoutRecord>,
    pub(crate) pools: ResourceTable<PoolRecord>,
    pub(crate) sets: ResourceTable<SetRecord>,
    pub(crate) render_passes: ResourceTable<RenderPassRecord>,
    pub(crate) framebuffers: ResourceTable<FramebufferRecord>,
    pub(crate) pipelines: ResourceTable<PipelineRecord>,
    pub(crate) command_pools: ResourceTable<CommandPoolRecord>,
    pub(crate) command_buffers: ResourceTable<CommandBufferRecord>,
    pub(crate) swapchain: SwapchainState,
    pub(crate) fences: Vec<FenceRecord>,
    pub(crate) fence_waits: u64,
    pub(crate) submissions: VecDeque<Submission>,
}

impl DeviceState {
    pub(crate) fn new(
        extent: Extent2D,
        format: TextureFormat,
        image_count: u32,
        frames_in_flight: usize,
    ) -> Self {
        Self {
            shaders: ResourceTable::new(ResourceKind::Shader),
            buffers: ResourceTable::new(ResourceKind::Buffer),
            textures: ResourceTable::new(ResourceKind::Texture),
            samplers: ResourceTable::new(ResourceKind::Sampler),
            set_layouts: ResourceTable::new(ResourceKind::DescriptorSetLayout),
            pools: ResourceTable::new(ResourceKind::DescriptorPool),
            sets: ResourceTable::new(ResourceKind::DescriptorSet),
            render_passes: ResourceTable::new(ResourceKind::RenderPass),
            framebuffers: ResourceTable::new(ResourceKind::Framebuffer),
            pipelines: ResourceTable::new(ResourceKind::Pipeline),
            command_pools: ResourceTable::new(ResourceKind::CommandPool),
            command_buffers: ResourceTable::new(ResourceKind::CommandBuffer),
            swapchain: SwapchainState {
                extent,
                format,
                images: Vec::new(),
                image_count,
                next_image: 0,
                pending_resize: None,
                pending_surface: None,
                lost: false,
                presents: 0,
            },
            fences: vec![FenceRecord::default(); frames_in_flight],
            fence_waits: 0,
            submissions: VecDeque::new(),
        }
    }

    /// Checks that `component` may be bound at `binding` of a layout.
    pub(crate) fn validate_component(
        &self,
        expected: &DescriptorBinding,
        component: &DescriptorComponent,
    ) -> Result<(), ResourceError> {
        if component.descriptor_type() != expected.ty {
            return Err(ResourceError::DescriptorMismatch(format!(
                "binding {} expects {:?} but got {:?}",
                expected.binding,
                expected.ty,
                component.descriptor_type()
            )));
        }
        match component {
            DescriptorComponent::UniformBuffer { buffer, offset, size } => {
                let record = self.buffers.get(buffer.0)?;
                let capacity = record.data.len() as u64;
                if offset + size > capacity {
                    return Err(ResourceError::OutOfBounds {
                        offset: *offset,
                        size: *size,
                        capacity,
                    });
                }
                Self::require_uniform_usage(record)
            }
            DescriptorComponent::DynamicUniformBuffer {
                buffer,
                element_size,
            } => {
                let record = self.buffers.get(buffer.0)?;
                let capacity = record.data.len() as u64;
                if *element_size > capacity {
                    return Err(ResourceError::OutOfBounds {
                        offset: 0,
                        size: *element_size,
                        capacity,
                    });
                }
                Self::require_uniform_usage(record)
            }
            DescriptorComponent::CombinedImageSampler { texture, sampler } => {
                let record = self.textures.get(texture.0)?;
                self.samplers.get(sampler.0)?;
                if !record.usage.contains(TextureUsage::SAMPLED) {
                    return Err(ResourceError::DescriptorMismatch(format!(
                        "texture '{}' was not created with SAMPLED usage",
                        record.label
                    )));
                }
                Ok(())
            }
        }
    }

    fn require_uniform_usage(record: &BufferRecord) -> Result<(), ResourceError> {
        if record.usage.contains(BufferUsage::UNIFORM) {
            Ok(())
        } else {
            Err(ResourceError::DescriptorMismatch(format!(
                "buffer '{}' was not created with UNIFORM usage",
                record.label
            )))
        }
    }
}
