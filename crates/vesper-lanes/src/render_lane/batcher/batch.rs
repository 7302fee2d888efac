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
use crate::render_lane::kinds::{BatchKind, BindingPlan};
use vesper_core::asset::{MaterialId, MeshId};
use vesper_core::renderer::api::*;

/// The unit of GPU submission for one render pass.
///
/// A batch draws one (mesh, material) pair. Per-instance data lives in the
/// shared resource of its identifier; the batch only holds handles to it and
/// its own counters.
#[derive(Debug, Clone)]
pub struct Batch {
    pub(crate) identifier: BatchIdentifier,
    pub(crate) pass: RenderPassType,
    pub(crate) kind: BatchKind,
    pub(crate) mesh: MeshId,
    pub(crate) material: MaterialId,
    pub(crate) pipeline: PipelineId,
    pub(crate) bindings: BindingPlan,
    /// One list per frame in flight, excluding the scene set.
    pub(crate) descriptor_sets: Vec<Vec<DescriptorSetId>>,
    pub(crate) dynamic_uniform_stride: u32,
    pub(crate) static_vertex_buffers: Vec<BufferId>,
    /// One instance buffer per frame in flight, empty for kinds without instance data.
    pub(crate) dynamic_vertex_buffers: Vec<BufferId>,
    pub(crate) index_buffer: BufferId,
    pub(crate) index_format: IndexFormat,
    pub(crate) index_count: u32,
    pub(crate) push_constants: Option<(ShaderStageFlags, Vec<u8>)>,
    pub(crate) instance_count: u32,
    pub(crate) repeat_count: u32,
    pub(crate) max_instance_count: u32,
    pub(crate) max_repeat_count: u32,
    pub(crate) repeat_advance: bool,
    pub(crate) instance_advance: bool,
}

impl Batch {
    /// The identifier shared with the batches of the same pair in other passes.
    pub fn identifier(&self) -> BatchIdentifier {
        self.identifier
    }

    /// The pass this batch is recorded in.
    pub fn pass(&self) -> RenderPassType {
        self.pass
    }

    /// The batch kind.
    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    /// The mesh drawn.
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    /// The material drawn with.
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// The bound pipeline.
    pub fn pipeline(&self) -> PipelineId {
        self.pipeline
    }

    /// The descriptor sets the pipeline expects.
    pub fn bindings(&self) -> BindingPlan {
        self.bindings
    }

    /// The batch's descriptor sets for a frame slot. The scene set is bound in front of them.
    pub fn descriptor_sets(&self, frame: usize) -> &[DescriptorSetId] {
        self.descriptor_sets
            .get(frame)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distance in bytes between consecutive repeats in the dynamic uniform
    /// buffer, zero if the batch has no per-repeat uniform data.
    pub fn dynamic_uniform_stride(&self) -> u32 {
        self.dynamic_uniform_stride
    }

    /// The dynamic offset selecting one repeat's uniform block.
    pub fn dynamic_offset(&self, repeat: u32) -> Option<u32> {
        (self.dynamic_uniform_stride > 0).then(|| repeat * self.dynamic_uniform_stride)
    }

    /// Vertex buffers to bind for a frame slot: the mesh's, then the slot's instance buffer.
    pub fn vertex_buffers(&self, frame: usize) -> Vec<BufferId> {
        let mut buffers = self.static_vertex_buffers.clone();
        if let Some(instances) = self.dynamic_vertex_buffers.get(frame) {
            buffers.push(*instances);
        }
        buffers
    }

    /// The per-frame instance buffers.
    pub fn instance_buffers(&self) -> &[BufferId] {
        &self.dynamic_vertex_buffers
    }

    /// The index buffer and its format.
    pub fn index_buffer(&self) -> (BufferId, IndexFormat) {
        (self.index_buffer, self.index_format)
    }

    /// Indices per draw.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// The push constant payload, if the pipeline declares one.
    pub fn push_constants(&self) -> Option<(ShaderStageFlags, &[u8])> {
        self.push_constants
            .as_ref()
            .map(|(stages, data)| (*stages, data.as_slice()))
    }

    /// Entries appended to the instance buffer this frame.
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Repeats appended this frame.
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    /// The fixed instance capacity.
    pub fn max_instance_count(&self) -> u32 {
        self.max_instance_count
    }

    /// The fixed repeat capacity.
    pub fn max_repeat_count(&self) -> u32 {
        self.max_repeat_count
    }

    /// Returns `true` if nothing was appended since the last reset.
    pub fn is_empty(&self) -> bool {
        self.instance_count == 0 && self.repeat_count == 0
    }

    /// Number of draw calls recorded for this batch.
    pub fn draw_count(&self) -> u32 {
        if self.repeat_advance {
            self.repeat_count
        } else if self.instance_count > 0 {
            1
        } else {
            0
        }
    }

    /// Instances drawn by each draw call.
    pub fn instances_per_draw(&self) -> u32 {
        if self.instance_advance {
            self.instance_count
        } else {
            1
        }
    }

    pub(crate) fn reset(&mut self) {
        self.instance_count = 0;
        self.repeat_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(repeat_advance: bool, instance_advance: bool) -> Batch {
        Batch {
            identifier: BatchIdentifier(1),
            pass: RenderPassType::Opaque,
            kind: BatchKind::Static,
            mesh: MeshId(1),
            material: MaterialId(0),
            pipeline: PipelineId(0),
            bindings: BindingPlan::default(),
            descriptor_sets: vec![vec![], vec![]],
            dynamic_uniform_stride: if repeat_advance { 256 } else { 0 },
            static_vertex_buffers: vec![BufferId(0)],
            dynamic_vertex_buffers: vec![BufferId(4), BufferId(5)],
            index_buffer: BufferId(1),
            index_format: IndexFormat::Uint32,
            index_count: 6,
            push_constants: None,
            instance_count: 0,
            repeat_count: 0,
            max_instance_count: 8,
            max_repeat_count: 8,
            repeat_advance,
            instance_advance,
        }
    }

    #[test]
    fn test_instanced_batch_draws_once() {
        let mut b = batch(false, true);
        assert_eq!(b.draw_count(), 0);
        b.instance_count = 3;
        assert_eq!(b.draw_count(), 1);
        assert_eq!(b.instances_per_draw(), 3);
        assert_eq!(b.dynamic_offset(2), None);
        assert_eq!(b.vertex_buffers(1), vec![BufferId(0), BufferId(5)]);
    }

    #[test]
    fn test_repeat_batch_draws_per_repeat() {
        let mut b = batch(true, false);
        b.repeat_count = 3;
        assert_eq!(b.draw_count(), 3);
        assert_eq!(b.instances_per_draw(), 1);
        assert_eq!(b.dynamic_offset(2), Some(512));
        b.reset();
        assert!(b.is_empty());
    }
}
