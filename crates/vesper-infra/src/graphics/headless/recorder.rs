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

use super::state::DeviceState;
use super::{BackendFlavor, HeadlessBackend, RecordedCommand};
use vesper_core::renderer::api::*;
use vesper_core::renderer::{CommandError, CommandRecorder, ResourceError};

#[derive(Debug, Clone, Copy)]
struct ActivePass {
    render_pass: RenderPassId,
    framebuffer: FramebufferId,
}

#[derive(Debug, Clone)]
struct BoundPipeline {
    id: PipelineId,
    push_constant_size: u32,
    push_constants_written: bool,
    set_layouts: Vec<DescriptorSetLayoutId>,
    vertex_buffer_count: usize,
}

/// Records and validates commands for a [`HeadlessBackend`].
///
/// Image layout changes are applied to the device as the commands are
/// recorded; the headless GPU executes a command buffer in recording order, so
/// the layouts seen by later recordings are the ones the GPU would see.
#[derive(Debug)]
pub struct HeadlessRecorder<'a, F: BackendFlavor> {
    backend: &'a HeadlessBackend<F>,
    command_buffer: CommandBufferId,
    commands: Vec<RecordedCommand>,
    active_pass: Option<ActivePass>,
    pipeline: Option<BoundPipeline>,
    index_buffer_bound: bool,
    vertex_buffers_bound: usize,
}

impl<'a, F: BackendFlavor> HeadlessRecorder<'a, F> {
    pub(crate) fn new(backend: &'a HeadlessBackend<F>, command_buffer: CommandBufferId) -> Self {
        Self {
            backend,
            command_buffer,
            commands: Vec::new(),
            active_pass: None,
            pipeline: None,
            index_buffer_bound: false,
            vertex_buffers_bound: 0,
        }
    }

    fn require_pass(&self) -> Result<ActivePass, CommandError> {
        self.active_pass.ok_or(CommandError::NoActivePass)
    }

    fn require_pipeline(&self) -> Result<&BoundPipeline, CommandError> {
        self.require_pass()?;
        self.pipeline.as_ref().ok_or(CommandError::NoPipelineBound)
    }

    /// Two render passes are compatible when their attachment formats match.
    fn passes_compatible(
        state: &DeviceState,
        a: RenderPassId,
        b: RenderPassId,
    ) -> Result<bool, ResourceError> {
        if a == b {
            return Ok(true);
        }
        let a = state.render_passes.get(a.0)?;
        let b = state.render_passes.get(b.0)?;
        Ok(a.attachments.len() == b.attachments.len()
            && a
                .attachments
                .iter()
                .zip(&b.attachments)
                .all(|(x, y)| x.format == y.format))
    }

    fn transition(
        &mut self,
        state: &mut DeviceState,
        texture: TextureId,
        target: ImageLayout,
    ) -> Result<(), CommandError> {
        let record = state.textures.get_mut(texture.0)?;
        if let Some(barrier) = self.backend.flavor().barrier(texture, record.layout, target) {
            record.layout = target;
            log::trace!("HeadlessRecorder: {barrier:?}");
            self.commands.push(barrier);
        }
        Ok(())
    }
}

impl<F: BackendFlavor> CommandRecorder for HeadlessRecorder<'_, F> {
    fn begin_render_pass(&mut self, info: &RenderPassBeginInfo<'_>) -> Result<(), CommandError> {
        if self.active_pass.is_some() {
            return Err(CommandError::PassAlreadyActive);
        }
        let backend = self.backend;
        let mut state = backend.lock("begin render pass")?;
        let framebuffer = state.framebuffers.get(info.framebuffer.0)?;
        let fb_pass = framebuffer.render_pass;
        let fb_attachments = framebuffer.attachments.clone();
        let extent = framebuffer.extent;
        if !Self::passes_compatible(&state, fb_pass, info.render_pass)? {
            return Err(CommandError::IncompatibleFramebuffer {
                framebuffer: info.framebuffer,
                render_pass: info.render_pass,
            });
        }
        let pass = state.render_passes.get(info.render_pass.0)?;
        let label = pass.label.clone();
        let attachments = pass.attachments.clone();
        let clears = attachments
            .iter()
            .any(|a| matches!(a.load_op, LoadOp::Clear));
        if clears && info.clear_values.len() < attachments.len() {
            return Err(CommandError::Resource(ResourceError::DescriptorMismatch(
                format!(
                    "render pass '{label}' clears attachments but only {} clear values were supplied",
                    info.clear_values.len()
                ),
            )));
        }

        for (attachment, texture) in attachments.iter().zip(&fb_attachments) {
            let required = ImageLayout::attachment_for(attachment.format);
            if attachment.is_continued() {
                let current = state.textures.get(texture.0)?.layout;
                backend
                    .flavor()
                    .check_continued(*texture, current, required)?;
            }
            self.transition(&mut state, *texture, required)?;
        }

        self.commands.push(RecordedCommand::BeginRenderPass {
            render_pass: info.render_pass,
            framebuffer: info.framebuffer,
            label,
            extent,
        });
        self.active_pass = Some(ActivePass {
            render_pass: info.render_pass,
            framebuffer: info.framebuffer,
        });
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<(), CommandError> {
        let active = self.require_pass()?;
        let backend = self.backend;
        let mut state = backend.lock("end render pass")?;
        let attachments = state.render_passes.get(active.render_pass.0)?.attachments.clone();
        let textures = state.framebuffers.get(active.framebuffer.0)?.attachments.clone();
        self.commands.push(RecordedCommand::EndRenderPass);
        for (attachment, texture) in attachments.iter().zip(textures) {
            let target = match attachment.final_usage {
                AttachmentFinalUsage::Attachment => continue,
                AttachmentFinalUsage::Sampled => ImageLayout::ShaderReadOnly,
                AttachmentFinalUsage::Present => ImageLayout::PresentSrc,
            };
            self.transition(&mut state, texture, target)?;
        }
        self.active_pass = None;
        self.pipeline = None;
        self.index_buffer_bound = false;
        self.vertex_buffers_bound = 0;
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: PipelineId) -> Result<(), CommandError> {
        let active = self.require_pass()?;
        let backend = self.backend;
        let state = backend.lock("bind pipeline")?;
        let record = state.pipelines.get(pipeline.0)?;
        if !Self::passes_compatible(&state, record.render_pass, active.render_pass)? {
            return Err(CommandError::Resource(ResourceError::DescriptorMismatch(
                format!(
                    "pipeline '{}' was not built for the active render pass",
                    record.label
                ),
            )));
        }
        self.pipeline = Some(BoundPipeline {
            id: pipeline,
            push_constant_size: record.push_constant_range.map_or(0, |r| r.size),
            push_constants_written: false,
            set_layouts: record.set_layouts.clone(),
            vertex_buffer_count: record.vertex_buffer_count,
        });
        drop(state);
        self.commands.push(RecordedCommand::BindPipeline(pipeline));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), CommandError> {
        self.require_pass()?;
        self.commands.push(RecordedCommand::SetViewport(*viewport));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: &ScissorRect) -> Result<(), CommandError> {
        self.require_pass()?;
        self.commands.push(RecordedCommand::SetScissor(*scissor));
        Ok(())
    }

    fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[BufferId],
    ) -> Result<(), CommandError> {
        self.require_pass()?;
        {
            let state = self.backend.lock("bind vertex buffers")?;
            for buffer in buffers {
                let record = state.buffers.get(buffer.0)?;
                if !record.usage.contains(BufferUsage::VERTEX) {
                    return Err(CommandError::Resource(ResourceError::DescriptorMismatch(
                        format!("buffer '{}' is not a vertex buffer", record.label),
                    )));
                }
            }
        }
        self.vertex_buffers_bound = self
            .vertex_buffers_bound
            .max(first_binding as usize + buffers.len());
        self.commands.push(RecordedCommand::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
        });
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: BufferId, format: IndexFormat) -> Result<(), CommandError> {
        self.require_pass()?;
        {
            let state = self.backend.lock("bind index buffer")?;
            let record = state.buffers.get(buffer.0)?;
            if !record.usage.contains(BufferUsage::INDEX) {
                return Err(CommandError::Resource(ResourceError::DescriptorMismatch(
                    format!("buffer '{}' is not an index buffer", record.label),
                )));
            }
        }
        self.index_buffer_bound = true;
        self.commands
            .push(RecordedCommand::BindIndexBuffer { buffer, format });
        Ok(())
    }

    fn push_constants(&mut self, stages: ShaderStageFlags, data: &[u8]) -> Result<(), CommandError> {
        let pipeline = self.require_pipeline()?;
        let size = data.len() as u32;
        if pipeline.push_constant_size == 0 || size > pipeline.push_constant_size {
            return Err(CommandError::PushConstantRange {
                pipeline: pipeline.id,
                size,
                declared: pipeline.push_constant_size,
            });
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.push_constants_written = true;
        }
        self.commands.push(RecordedCommand::PushConstants {
            stages,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn bind_descriptor_sets(
        &mut self,
        first_set: u32,
        sets: &[DescriptorSetId],
        dynamic_offsets: &[u32],
    ) -> Result<(), CommandError> {
        let pipeline = self.require_pipeline()?.clone();
        if pipeline.push_constant_size > 0 && !pipeline.push_constants_written {
            return Err(CommandError::PushConstantsRequired {
                pipeline: pipeline.id,
            });
        }
        let alignment = self
            .backend
            .flavor()
            .limits()
            .min_uniform_buffer_offset_alignment
            .max(1);
        let backend = self.backend;
        let state = backend.lock("bind descriptor sets")?;

        let mut dynamic = Vec::new();
        let mut expected_offsets = 0;
        for (i, set) in sets.iter().enumerate() {
            let record = state.sets.get(set.0)?;
            let slot = first_set as usize + i;
            match pipeline.set_layouts.get(slot) {
                Some(layout) if *layout == record.layout => {}
                _ => {
                    return Err(CommandError::Resource(ResourceError::DescriptorMismatch(
                        format!("set {set:?} does not match the pipeline layout at slot {slot}"),
                    )))
                }
            }
            expected_offsets += state.set_layouts.get(record.layout.0)?.dynamic_binding_count();
            for (_, component) in &record.components {
                match component {
                    DescriptorComponent::DynamicUniformBuffer {
                        buffer,
                        element_size,
                    } => dynamic.push((*buffer, *element_size)),
                    DescriptorComponent::CombinedImageSampler { texture, .. } => {
                        let layout = state.textures.get(texture.0)?.layout;
                        backend.flavor().check_sampled(*texture, layout)?;
                    }
                    DescriptorComponent::UniformBuffer { .. } => {}
                }
            }
        }

        if expected_offsets != dynamic_offsets.len() {
            return Err(CommandError::DynamicOffsetCount {
                expected: expected_offsets,
                actual: dynamic_offsets.len(),
            });
        }
        for ((buffer, element_size), offset) in dynamic.iter().zip(dynamic_offsets) {
            if offset % alignment != 0 {
                return Err(CommandError::MisalignedDynamicOffset {
                    offset: *offset,
                    alignment,
                });
            }
            let capacity = state.buffers.get(buffer.0)?.data.len() as u64;
            if u64::from(*offset) + element_size > capacity {
                return Err(CommandError::Resource(ResourceError::OutOfBounds {
                    offset: u64::from(*offset),
                    size: *element_size,
                    capacity,
                }));
            }
        }
        drop(state);

        self.commands.push(RecordedCommand::BindDescriptorSets {
            first_set,
            sets: sets.to_vec(),
            dynamic_offsets: dynamic_offsets.to_vec(),
        });
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) -> Result<(), CommandError> {
        let pipeline = self.require_pipeline()?;
        if self.vertex_buffers_bound < pipeline.vertex_buffer_count {
            return Err(CommandError::Resource(ResourceError::DescriptorMismatch(
                format!(
                    "pipeline expects {} vertex buffers but {} are bound",
                    pipeline.vertex_buffer_count, self.vertex_buffers_bound
                ),
            )));
        }
        self.commands.push(RecordedCommand::Draw {
            vertex_count,
            instance_count,
        });
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_instance: u32,
    ) -> Result<(), CommandError> {
        let pipeline = self.require_pipeline()?;
        if !self.index_buffer_bound {
            return Err(CommandError::MissingIndexBuffer);
        }
        if self.vertex_buffers_bound < pipeline.vertex_buffer_count {
            return Err(CommandError::Resource(ResourceError::DescriptorMismatch(
                format!(
                    "pipeline expects {} vertex buffers but {} are bound",
                    pipeline.vertex_buffer_count, self.vertex_buffers_bound
                ),
            )));
        }
        self.commands.push(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_instance,
        });
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<CommandBufferId, CommandError> {
        if self.active_pass.is_some() {
            return Err(CommandError::PassStillActive);
        }
        let HeadlessRecorder {
            backend,
            command_buffer,
            commands,
            ..
        } = *self;
        let mut state = backend.lock("finish command buffer")?;
        state.command_buffers.get_mut(command_buffer.0)?.recorded = Some(commands);
        Ok(command_buffer)
    }
}
