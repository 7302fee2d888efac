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

use super::recorder::HeadlessRecorder;
use super::state::*;
use super::{BackendFlavor, HeadlessBackend, Submission};
use std::collections::HashSet;
use vesper_core::math::Extent2D;
use vesper_core::renderer::api::*;
use vesper_core::renderer::{CommandRecorder, GraphicsBackend, RenderError, ResourceError};

fn label_of(label: &Option<std::borrow::Cow<'_, str>>) -> String {
    label.as_deref().unwrap_or("unnamed").to_string()
}

impl<F: BackendFlavor> HeadlessBackend<F> {
    fn write_into(record: &mut BufferRecord, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let capacity = record.data.len() as u64;
        let end = offset + data.len() as u64;
        if end > capacity {
            return Err(ResourceError::OutOfBounds {
                offset,
                size: data.len() as u64,
                capacity,
            });
        }
        record.data[offset as usize..end as usize].copy_from_slice(data);
        record.write_count += 1;
        if !record.host_visible {
            record.staging_uploads += 1;
        }
        Ok(())
    }
}

impl<F: BackendFlavor> GraphicsBackend for HeadlessBackend<F> {
    fn backend_type(&self) -> GraphicsBackendType {
        self.flavor().backend_type()
    }

    fn limits(&self) -> BackendLimits {
        self.flavor().limits()
    }

    fn max_frames_in_flight(&self) -> usize {
        self.config().frames_in_flight
    }

    // --- Shaders ---

    fn create_shader(&self, descriptor: &ShaderDescriptor<'_>) -> Result<ShaderId, ResourceError> {
        if descriptor.name.is_empty() {
            log::error!("HeadlessBackend: shader created without a name");
            return Err(ResourceError::BackendError(
                "shader name must not be empty".to_string(),
            ));
        }
        let mut state = self.lock("shaders")?;
        let id = state.shaders.insert(ShaderRecord {
            name: descriptor.name.to_string(),
        });
        log::debug!(
            "HeadlessBackend: created {:?} shader '{}' with ID {id}",
            descriptor.stage,
            descriptor.name
        );
        Ok(ShaderId(id))
    }

    fn destroy_shader(&self, id: ShaderId) -> Result<(), ResourceError> {
        let record = self.lock("shaders")?.shaders.remove(id.0)?;
        log::debug!("HeadlessBackend: destroyed shader '{}'", record.name);
        Ok(())
    }

    // --- Buffers ---

    fn create_buffer(&self, descriptor: &BufferDescriptor<'_>) -> Result<BufferId, ResourceError> {
        if descriptor.size == 0 {
            log::error!(
                "HeadlessBackend: buffer '{}' created with zero size",
                label_of(&descriptor.label)
            );
            return Err(ResourceError::BackendError(
                "buffer size must be non-zero".to_string(),
            ));
        }
        let mut state = self.lock("buffers")?;
        let id = state.buffers.insert(BufferRecord {
            label: label_of(&descriptor.label),
            usage: descriptor.usage,
            host_visible: descriptor.host_visible,
            data: vec![0; descriptor.size as usize],
            write_count: 0,
            staging_uploads: 0,
        });
        log::trace!(
            "HeadlessBackend: created buffer '{}' ({} bytes, {:?}) with ID {id}",
            label_of(&descriptor.label),
            descriptor.size,
            descriptor.update_frequency
        );
        Ok(BufferId(id))
    }

    fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor<'_>,
        data: &[u8],
    ) -> Result<BufferId, ResourceError> {
        if data.len() as u64 > descriptor.size {
            return Err(ResourceError::OutOfBounds {
                offset: 0,
                size: data.len() as u64,
                capacity: descriptor.size,
            });
        }
        let id = self.create_buffer(descriptor)?;
        let mut state = self.lock("buffers")?;
        let record = state.buffers.get_mut(id.0)?;
        record.data[..data.len()].copy_from_slice(data);
        Ok(id)
    }

    fn write_buffer(&self, id: BufferId, offset: u64, data: &[u8]) -> Result<(), ResourceError> {
        let mut state = self.lock("buffers")?;
        let record = state.buffers.get_mut(id.0)?;
        Self::write_into(record, offset, data).inspect_err(|e| {
            log::error!("HeadlessBackend: write to buffer {id:?} failed: {e}");
        })
    }

    fn read_buffer(&self, id: BufferId, offset: u64, size: u64) -> Result<Vec<u8>, ResourceError> {
        let state = self.lock("buffers")?;
        let record = state.buffers.get(id.0)?;
        let capacity = record.data.len() as u64;
        if offset + size > capacity {
            return Err(ResourceError::OutOfBounds {
                offset,
                size,
                capacity,
            });
        }
        Ok(record.data[offset as usize..(offset + size) as usize].to_vec())
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        self.lock("buffers")?.buffers.remove(id.0)?;
        log::trace!("HeadlessBackend: destroyed buffer {id:?}");
        Ok(())
    }

    // --- Textures and samplers ---

    fn create_texture(&self, descriptor: &TextureDescriptor<'_>) -> Result<TextureId, ResourceError> {
        if descriptor.size.is_empty() {
            log::error!(
                "HeadlessBackend: texture '{}' created with an empty extent",
                label_of(&descriptor.label)
            );
            return Err(ResourceError::BackendError(format!(
                "texture '{}' has an empty extent",
                label_of(&descriptor.label)
            )));
        }
        if descriptor.format.is_depth() && descriptor.usage.contains(TextureUsage::PRESENT) {
            return Err(ResourceError::UnsupportedFormat {
                format: descriptor.format,
                usage: "presentation",
            });
        }
        let mut state = self.lock("textures")?;
        let id = state.textures.insert(TextureRecord {
            label: label_of(&descriptor.label),
            size: descriptor.size,
            format: descriptor.format,
            usage: descriptor.usage,
            layout: self.flavor().initial_layout(descriptor.usage),
        });
        log::debug!(
            "HeadlessBackend: created texture '{}' ({}x{} {:?}) with ID {id}",
            label_of(&descriptor.label),
            descriptor.size.width,
            descriptor.size.height,
            descriptor.format
        );
        Ok(TextureId(id))
    }

    fn destroy_texture(&self, id: TextureId) -> Result<(), ResourceError> {
        let record = self.lock("textures")?.textures.remove(id.0)?;
        log::debug!("HeadlessBackend: destroyed texture '{}'", record.label);
        Ok(())
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor<'_>) -> Result<SamplerId, ResourceError> {
        let id = self
            .lock("samplers")?
            .samplers
            .insert(label_of(&descriptor.label));
        Ok(SamplerId(id))
    }

    fn destroy_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        self.lock("samplers")?.samplers.remove(id.0)?;
        Ok(())
    }

    // --- Descriptors ---

    fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor<'_>,
    ) -> Result<DescriptorSetLayoutId, ResourceError> {
        let mut seen = HashSet::new();
        if let Some(dup) = descriptor.bindings.iter().find(|b| !seen.insert(b.binding)) {
            return Err(ResourceError::DescriptorMismatch(format!(
                "layout '{}' declares binding {} twice",
                label_of(&descriptor.label),
                dup.binding
            )));
        }
        let id = self.lock("set layouts")?.set_layouts.insert(SetLayoutRecord {
            bindings: descriptor.bindings.to_vec(),
        });
        Ok(DescriptorSetLayoutId(id))
    }

    fn destroy_descriptor_set_layout(&self, id: DescriptorSetLayoutId) -> Result<(), ResourceError> {
        self.lock("set layouts")?.set_layouts.remove(id.0)?;
        Ok(())
    }

    fn create_descriptor_pool(
        &self,
        descriptor: &DescriptorPoolDescriptor<'_>,
    ) -> Result<DescriptorPoolId, ResourceError> {
        let capacity = self.flavor().pool_capacity(descriptor.max_sets);
        let id = self.lock("descriptor pools")?.pools.insert(PoolRecord {
            label: label_of(&descriptor.label),
            capacity,
            sets: HashSet::new(),
        });
        log::debug!(
            "HeadlessBackend: created descriptor pool '{}' (capacity {:?}) with ID {id}",
            label_of(&descriptor.label),
            capacity
        );
        Ok(DescriptorPoolId(id))
    }

    fn destroy_descriptor_pool(&self, id: DescriptorPoolId) -> Result<(), ResourceError> {
        let mut state = self.lock("descriptor pools")?;
        let pool = state.pools.remove(id.0)?;
        state.sets.retain(|set, _| !pool.sets.contains(&set));
        log::debug!(
            "HeadlessBackend: destroyed descriptor pool '{}' and {} sets",
            pool.label,
            pool.sets.len()
        );
        Ok(())
    }

    fn create_descriptor_set(
        &self,
        pool: DescriptorPoolId,
        layout: DescriptorSetLayoutId,
        components: &[DescriptorComponent],
    ) -> Result<DescriptorSetId, ResourceError> {
        let mut state = self.lock("descriptor sets")?;
        let bindings = state.set_layouts.get(layout.0)?.bindings.clone();
        if bindings.len() != components.len() {
            return Err(ResourceError::DescriptorMismatch(format!(
                "layout {layout:?} has {} bindings but {} components were supplied",
                bindings.len(),
                components.len()
            )));
        }
        for (binding, component) in bindings.iter().zip(components) {
            state.validate_component(binding, component)?;
        }
        let pool_record = state.pools.get(pool.0)?;
        if let Some(capacity) = pool_record.capacity {
            if pool_record.sets.len() as u32 >= capacity {
                log::error!(
                    "HeadlessBackend: descriptor pool '{}' exhausted at {capacity} sets",
                    pool_record.label
                );
                return Err(ResourceError::PoolExhausted { pool, capacity });
            }
        }
        let id = state.sets.insert(SetRecord {
            pool,
            layout,
            components: bindings
                .iter()
                .map(|b| b.binding)
                .zip(components.iter().copied())
                .collect(),
        });
        state.pools.get_mut(pool.0)?.sets.insert(id);
        Ok(DescriptorSetId(id))
    }

    fn update_descriptor_set(
        &self,
        pool: DescriptorPoolId,
        set: DescriptorSetId,
        binding: u32,
        component: &DescriptorComponent,
    ) -> Result<(), ResourceError> {
        let mut state = self.lock("descriptor sets")?;
        let record = state.sets.get(set.0)?;
        if record.pool != pool {
            return Err(ResourceError::InvalidHandle);
        }
        let expected = *state
            .set_layouts
            .get(record.layout.0)?
            .bindings
            .iter()
            .find(|b| b.binding == binding)
            .ok_or_else(|| {
                ResourceError::DescriptorMismatch(format!("set {set:?} has no binding {binding}"))
            })?;
        state.validate_component(&expected, component)?;
        let record = state.sets.get_mut(set.0)?;
        if let Some(slot) = record.components.iter_mut().find(|(b, _)| *b == binding) {
            slot.1 = *component;
        }
        Ok(())
    }

    fn free_descriptor_sets(
        &self,
        pool: DescriptorPoolId,
        sets: &[DescriptorSetId],
    ) -> Result<(), ResourceError> {
        let mut state = self.lock("descriptor sets")?;
        for set in sets {
            if state.sets.get(set.0)?.pool != pool {
                return Err(ResourceError::InvalidHandle);
            }
        }
        for set in sets {
            state.sets.remove(set.0)?;
            state.pools.get_mut(pool.0)?.sets.remove(&set.0);
        }
        log::trace!("HeadlessBackend: freed {} descriptor sets", sets.len());
        Ok(())
    }

    // --- Passes and pipelines ---

    fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor<'_>,
    ) -> Result<RenderPassId, ResourceError> {
        descriptor.validate()?;
        let id = self.lock("render passes")?.render_passes.insert(RenderPassRecord {
            label: label_of(&descriptor.label),
            attachments: descriptor.attachments.to_vec(),
        });
        log::debug!(
            "HeadlessBackend: created render pass '{}' with ID {id}",
            label_of(&descriptor.label)
        );
        Ok(RenderPassId(id))
    }

    fn destroy_render_pass(&self, id: RenderPassId) -> Result<(), ResourceError> {
        self.lock("render passes")?.render_passes.remove(id.0)?;
        Ok(())
    }

    fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor<'_>,
    ) -> Result<FramebufferId, ResourceError> {
        let mut state = self.lock("framebuffers")?;
        let pass = state.render_passes.get(descriptor.render_pass.0)?;
        if pass.attachments.len() != descriptor.attachments.len() {
            return Err(ResourceError::DescriptorMismatch(format!(
                "render pass '{}' expects {} attachments but framebuffer has {}",
                pass.label,
                pass.attachments.len(),
                descriptor.attachments.len()
            )));
        }
        for (attachment, texture) in pass.attachments.iter().zip(descriptor.attachments.iter()) {
            let texture_record = state.textures.get(texture.0)?;
            if texture_record.format != attachment.format {
                return Err(ResourceError::DescriptorMismatch(format!(
                    "texture '{}' is {:?} but render pass '{}' expects {:?}",
                    texture_record.label, texture_record.format, pass.label, attachment.format
                )));
            }
            if texture_record.size != descriptor.extent {
                return Err(ResourceError::DescriptorMismatch(format!(
                    "texture '{}' is {}x{} but the framebuffer is {}x{}",
                    texture_record.label,
                    texture_record.size.width,
                    texture_record.size.height,
                    descriptor.extent.width,
                    descriptor.extent.height
                )));
            }
        }
        let id = state.framebuffers.insert(FramebufferRecord {
            render_pass: descriptor.render_pass,
            attachments: descriptor.attachments.to_vec(),
            extent: descriptor.extent,
        });
        log::debug!(
            "HeadlessBackend: created framebuffer '{}' ({}x{}) with ID {id}",
            label_of(&descriptor.label),
            descriptor.extent.width,
            descriptor.extent.height
        );
        Ok(FramebufferId(id))
    }

    fn destroy_framebuffer(&self, id: FramebufferId) -> Result<(), ResourceError> {
        self.lock("framebuffers")?.framebuffers.remove(id.0)?;
        log::trace!("HeadlessBackend: destroyed framebuffer {id:?}");
        Ok(())
    }

    fn create_pipeline(&self, descriptor: &PipelineDescriptor<'_>) -> Result<PipelineId, ResourceError> {
        let mut state = self.lock("pipelines")?;
        state.shaders.get(descriptor.vertex_shader.0)?;
        if let Some(fragment) = descriptor.fragment_shader {
            state.shaders.get(fragment.0)?;
        }
        for layout in descriptor.set_layouts.iter() {
            state.set_layouts.get(layout.0)?;
        }
        state.render_passes.get(descriptor.render_pass.0)?;
        if let Some(range) = descriptor.push_constant_range {
            let max = self.flavor().limits().max_push_constant_size;
            if range.size > max {
                return Err(ResourceError::BackendError(format!(
                    "pipeline '{}' declares {} bytes of push constants, the limit is {max}",
                    label_of(&descriptor.label),
                    range.size
                )));
            }
        }
        let id = state.pipelines.insert(PipelineRecord {
            label: label_of(&descriptor.label),
            set_layouts: descriptor.set_layouts.to_vec(),
            push_constant_range: descriptor.push_constant_range,
            render_pass: descriptor.render_pass,
            vertex_buffer_count: descriptor.vertex_buffers.len(),
        });
        log::debug!(
            "HeadlessBackend: created pipeline '{}' with ID {id}",
            label_of(&descriptor.label)
        );
        Ok(PipelineId(id))
    }

    fn destroy_pipeline(&self, id: PipelineId) -> Result<(), ResourceError> {
        let record = self.lock("pipelines")?.pipelines.remove(id.0)?;
        log::debug!("HeadlessBackend: destroyed pipeline '{}'", record.label);
        Ok(())
    }

    // --- Commands ---

    fn create_command_pool(&self, label: &str) -> Result<CommandPoolId, ResourceError> {
        let id = self.lock("command pools")?.command_pools.insert(CommandPoolRecord {
            label: label.to_string(),
            buffers: Vec::new(),
        });
        Ok(CommandPoolId(id))
    }

    fn allocate_command_buffers(
        &self,
        pool: CommandPoolId,
        count: usize,
    ) -> Result<Vec<CommandBufferId>, ResourceError> {
        let mut state = self.lock("command buffers")?;
        state.command_pools.get(pool.0)?;
        let ids: Vec<CommandBufferId> = (0..count)
            .map(|_| {
                CommandBufferId(state.command_buffers.insert(CommandBufferRecord {
                    pool,
                    recorded: None,
                }))
            })
            .collect();
        let record = state.command_pools.get_mut(pool.0)?;
        record.buffers.extend(ids.iter().copied());
        log::debug!(
            "HeadlessBackend: allocated {count} command buffers from pool '{}'",
            record.label
        );
        Ok(ids)
    }

    fn destroy_command_pool(&self, id: CommandPoolId) -> Result<(), ResourceError> {
        let mut state = self.lock("command pools")?;
        let record = state.command_pools.remove(id.0)?;
        state.command_buffers.retain(|_, buffer| buffer.pool != id);
        log::debug!(
            "HeadlessBackend: destroyed command pool '{}' and {} buffers",
            record.label,
            record.buffers.len()
        );
        Ok(())
    }

    fn begin_command_buffer(
        &self,
        command_buffer: CommandBufferId,
    ) -> Result<Box<dyn CommandRecorder + '_>, RenderError> {
        let mut state = self.lock("command buffers")?;
        state.command_buffers.get_mut(command_buffer.0)?.recorded = None;
        Ok(Box::new(HeadlessRecorder::new(self, command_buffer)))
    }

    fn submit(
        &self,
        command_buffers: &[CommandBufferId],
        frame_index: usize,
    ) -> Result<(), RenderError> {
        let mut state = self.lock("submit")?;
        if frame_index >= state.fences.len() {
            return Err(RenderError::Internal(format!(
                "frame index {frame_index} out of range for {} frames in flight",
                state.fences.len()
            )));
        }
        let mut commands = Vec::new();
        for id in command_buffers {
            let record = state.command_buffers.get(id.0)?;
            let recorded = record.recorded.as_ref().ok_or_else(|| {
                log::error!("HeadlessBackend: command buffer {id:?} submitted before it was finished");
                RenderError::Resource(ResourceError::InvalidHandle)
            })?;
            commands.extend(recorded.iter().cloned());
        }
        state.fences[frame_index].pending = true;
        state.submissions.push_back(Submission {
            frame_index,
            command_buffers: command_buffers.to_vec(),
            commands,
        });
        while state.submissions.len() > self.config().submission_history.max(1) {
            state.submissions.pop_front();
        }
        log::trace!(
            "HeadlessBackend: submitted {} command buffers for frame slot {frame_index}",
            command_buffers.len()
        );
        Ok(())
    }

    // --- Swapchain ---

    fn acquire_image(&self, frame_index: usize) -> AcquiredImage {
        let mut state = self.lock_infallible();
        let failed = AcquiredImage {
            status: SwapchainStatus::Error,
            image_index: 0,
        };
        if state.swapchain.lost || frame_index >= state.fences.len() {
            return failed;
        }
        if self.flavor().uses_fences() && state.fences[frame_index].pending {
            state.fence_waits += 1;
        }
        state.fences[frame_index].pending = false;
        if state.swapchain.pending_resize.is_some() {
            return AcquiredImage {
                status: SwapchainStatus::ResizeRequired,
                image_index: 0,
            };
        }
        let image_count = state.swapchain.images.len() as u32;
        let image_index = state.swapchain.next_image;
        state.swapchain.next_image = (image_index + 1) % image_count.max(1);
        AcquiredImage {
            status: SwapchainStatus::Success,
            image_index,
        }
    }

    fn present(&self, image_index: u32) -> SwapchainStatus {
        let mut state = self.lock_infallible();
        if state.swapchain.lost || image_index as usize >= state.swapchain.images.len() {
            return SwapchainStatus::Error;
        }
        if let Some(texture) = state.swapchain.images.get(image_index as usize).copied() {
            if let Ok(record) = state.textures.get(texture.0) {
                if self.flavor().limits().tracks_image_layouts
                    && record.layout != ImageLayout::PresentSrc
                {
                    log::error!(
                        "HeadlessBackend: presenting swapchain image {image_index} in layout {:?}",
                        record.layout
                    );
                    return SwapchainStatus::Error;
                }
            }
        }
        state.swapchain.presents += 1;
        if state.swapchain.pending_resize.is_some() {
            SwapchainStatus::ResizeRequired
        } else {
            SwapchainStatus::Success
        }
    }

    fn recreate_swapchain(&self, extent: Extent2D) -> Result<(), RenderError> {
        if extent.is_empty() {
            return Err(RenderError::SurfaceAcquisitionFailed(format!(
                "cannot create a {}x{} swapchain",
                extent.width, extent.height
            )));
        }
        let mut state = self.lock("swapchain")?;
        let old = std::mem::take(&mut state.swapchain.images);
        for image in old {
            state.textures.remove(image.0)?;
        }
        if let Some((image_count, format)) = state.swapchain.pending_surface.take() {
            log::info!(
                "HeadlessBackend: surface changed to {image_count} images of {format:?}"
            );
            state.swapchain.image_count = image_count;
            state.swapchain.format = format;
        }
        self.build_swapchain_images(&mut state, extent);
        state.swapchain.pending_resize = None;
        log::info!(
            "HeadlessBackend: swapchain recreated at {}x{}",
            extent.width,
            extent.height
        );
        Ok(())
    }

    fn swapchain_images(&self) -> Vec<TextureId> {
        self.lock_infallible().swapchain.images.clone()
    }

    fn swapchain_format(&self) -> TextureFormat {
        self.lock_infallible().swapchain.format
    }

    fn extent(&self) -> Extent2D {
        self.lock_infallible().swapchain.extent
    }

    fn surface_extent(&self) -> Extent2D {
        let state = self.lock_infallible();
        state.swapchain.pending_resize.unwrap_or(state.swapchain.extent)
    }

    fn wait_idle(&self) {
        let mut state = self.lock_infallible();
        for fence in state.fences.iter_mut() {
            fence.pending = false;
        }
    }
}

