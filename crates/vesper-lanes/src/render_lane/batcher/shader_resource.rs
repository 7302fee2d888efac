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

use super::identifier::BatchIdentifier;
use crate::render_lane::descriptor_pool::DescriptorPool;
use crate::render_lane::error::BatchError;
use std::sync::Arc;
use vesper_core::renderer::api::*;
use vesper_core::renderer::GraphicsBackend;

/// The shape of the data a batch appends per submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchShape {
    /// Bytes of instance data per entry, zero for none.
    pub instance_element_size: u64,
    /// Entries the instance buffer holds.
    pub max_instances: u32,
    /// Each append adds an instance.
    pub instance_advance: bool,
    /// Bytes of the per-repeat uniform block, zero for none.
    pub uniform_element_size: u64,
    /// Repeats the uniform buffer holds.
    pub max_repeats: u32,
    /// Each append adds a repeat.
    pub repeat_advance: bool,
}

/// Instance and uniform buffers shared by every batch of one identifier.
///
/// Each buffer is replicated per frame in flight and mirrored by a host copy.
/// Appends write the host copy of the current slot; the slot's GPU buffer is
/// written when the batcher flushes.
#[derive(Debug)]
pub struct BatchShaderResource {
    identifier: BatchIdentifier,
    shape: BatchShape,
    uniform_stride: u64,
    instance_buffers: Vec<BufferId>,
    uniform_buffers: Vec<BufferId>,
    descriptor_sets: Vec<DescriptorSetId>,
    host_instances: Vec<Vec<u8>>,
    host_uniforms: Vec<Vec<u8>>,
    instance_cursor: u32,
    repeat_cursor: u32,
    pub(crate) users: u32,
}

impl BatchShaderResource {
    /// Allocates the per-frame buffers and, for uniform data, one descriptor set per frame.
    pub(crate) fn create(
        backend: &Arc<dyn GraphicsBackend>,
        pool: &mut DescriptorPool,
        uniform_layout: DescriptorSetLayoutId,
        identifier: BatchIdentifier,
        shape: BatchShape,
        frames_in_flight: usize,
    ) -> Result<Self, BatchError> {
        let uniform_stride = if shape.uniform_element_size > 0 {
            backend.limits().align_uniform(shape.uniform_element_size)
        } else {
            0
        };
        let mut resource = Self {
            identifier,
            shape,
            uniform_stride,
            instance_buffers: Vec::new(),
            uniform_buffers: Vec::new(),
            descriptor_sets: Vec::new(),
            host_instances: Vec::new(),
            host_uniforms: Vec::new(),
            instance_cursor: 0,
            repeat_cursor: 0,
            users: 0,
        };
        if let Err(e) = resource.allocate(backend, pool, uniform_layout, frames_in_flight) {
            resource.destroy(backend, pool);
            return Err(e);
        }
        log::debug!(
            "BatchShaderResource {identifier}: {} instance and {} uniform buffers",
            resource.instance_buffers.len(),
            resource.uniform_buffers.len()
        );
        Ok(resource)
    }

    fn allocate(
        &mut self,
        backend: &Arc<dyn GraphicsBackend>,
        pool: &mut DescriptorPool,
        uniform_layout: DescriptorSetLayoutId,
        frames_in_flight: usize,
    ) -> Result<(), BatchError> {
        let instance_bytes = self.shape.instance_element_size * u64::from(self.shape.max_instances);
        let uniform_bytes = self.uniform_stride * u64::from(self.shape.max_repeats);
        for frame in 0..frames_in_flight {
            if instance_bytes > 0 {
                let buffer = backend.create_buffer(&BufferDescriptor::for_elements(
                    format!("batch {} instances [{frame}]", self.identifier),
                    self.shape.instance_element_size,
                    u64::from(self.shape.max_instances),
                    BufferUsage::VERTEX | BufferUsage::COPY_DST,
                    UpdateFrequency::PerFrame,
                ))?;
                self.instance_buffers.push(buffer);
                self.host_instances.push(vec![0; instance_bytes as usize]);
            }
            if uniform_bytes > 0 {
                let buffer = backend.create_buffer(&BufferDescriptor::for_elements(
                    format!("batch {} uniforms [{frame}]", self.identifier),
                    self.uniform_stride,
                    u64::from(self.shape.max_repeats),
                    BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                    UpdateFrequency::PerFrame,
                ))?;
                self.uniform_buffers.push(buffer);
                self.host_uniforms.push(vec![0; uniform_bytes as usize]);
                let set = pool.create_descriptor_set(
                    uniform_layout,
                    &[DescriptorComponent::DynamicUniformBuffer {
                        buffer,
                        element_size: self.shape.uniform_element_size,
                    }],
                )?;
                self.descriptor_sets.push(set);
            }
        }
        Ok(())
    }

    /// The identifier this resource belongs to.
    pub fn identifier(&self) -> BatchIdentifier {
        self.identifier
    }

    /// The declared data shape.
    pub fn shape(&self) -> BatchShape {
        self.shape
    }

    /// Distance between repeats in the uniform buffers, zero without uniform data.
    pub fn uniform_stride(&self) -> u64 {
        self.uniform_stride
    }

    /// One instance buffer per frame in flight.
    pub fn instance_buffers(&self) -> &[BufferId] {
        &self.instance_buffers
    }

    /// One uniform buffer per frame in flight.
    pub fn uniform_buffers(&self) -> &[BufferId] {
        &self.uniform_buffers
    }

    /// One descriptor set per frame in flight, binding the slot's uniform buffer.
    pub fn descriptor_sets(&self) -> &[DescriptorSetId] {
        &self.descriptor_sets
    }

    /// Number of batches referencing this resource.
    pub fn users(&self) -> u32 {
        self.users
    }

    /// Returns `true` if anything was appended since the last reset.
    pub fn has_pending_data(&self) -> bool {
        self.instance_cursor > 0 || self.repeat_cursor > 0
    }

    /// The host copy of a slot's instance data.
    pub fn host_instances(&self, frame: usize) -> &[u8] {
        self.host_instances
            .get(frame)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn instance_cursor(&self) -> u32 {
        self.instance_cursor
    }

    pub(crate) fn repeat_cursor(&self) -> u32 {
        self.repeat_cursor
    }

    /// Writes one append into the host copies of `frame` and advances the cursors.
    /// Capacity and sizes are checked by the caller.
    pub(crate) fn append(&mut self, frame: usize, instance: &[u8], uniform: &[u8]) {
        if !instance.is_empty() {
            let offset = self.instance_cursor as usize * instance.len();
            if let Some(host) = self.host_instances.get_mut(frame) {
                host[offset..offset + instance.len()].copy_from_slice(instance);
            }
        }
        if !uniform.is_empty() {
            let offset = self.repeat_cursor as usize * self.uniform_stride as usize;
            if let Some(host) = self.host_uniforms.get_mut(frame) {
                host[offset..offset + uniform.len()].copy_from_slice(uniform);
            }
        }
        if self.shape.instance_advance {
            self.instance_cursor += 1;
        }
        if self.shape.repeat_advance {
            self.repeat_cursor += 1;
        }
    }

    /// Copies the used part of `frame`'s host data into the slot's GPU buffers.
    pub(crate) fn flush(
        &self,
        backend: &Arc<dyn GraphicsBackend>,
        frame: usize,
    ) -> Result<(), BatchError> {
        let instance_bytes = self.instance_cursor as usize * self.shape.instance_element_size as usize;
        if let (Some(buffer), Some(host)) = (self.instance_buffers.get(frame), self.host_instances.get(frame)) {
            if instance_bytes > 0 {
                backend.write_buffer(*buffer, 0, &host[..instance_bytes])?;
            }
        }
        let uniform_bytes = self.repeat_cursor as usize * self.uniform_stride as usize;
        if let (Some(buffer), Some(host)) = (self.uniform_buffers.get(frame), self.host_uniforms.get(frame)) {
            if uniform_bytes > 0 {
                backend.write_buffer(*buffer, 0, &host[..uniform_bytes])?;
            }
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.instance_cursor = 0;
        self.repeat_cursor = 0;
    }

    /// Releases the buffers and descriptor sets.
    pub(crate) fn destroy(self, backend: &Arc<dyn GraphicsBackend>, pool: &mut DescriptorPool) {
        if !self.descriptor_sets.is_empty() {
            if let Err(e) = pool.free_descriptor_sets(&self.descriptor_sets) {
                log::warn!(
                    "BatchShaderResource {}: failed to free descriptor sets: {e}",
                    self.identifier
                );
            }
        }
        for buffer in self.instance_buffers.iter().chain(&self.uniform_buffers) {
            if let Err(e) = backend.destroy_buffer(*buffer) {
                log::warn!(
                    "BatchShaderResource {}: failed to destroy buffer {buffer:?}: {e}",
                    self.identifier
                );
            }
        }
    }
}
