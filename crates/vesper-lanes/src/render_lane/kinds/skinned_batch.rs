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

use super::{mesh_recipe, PipelineRecipe};
use crate::render_lane::batcher::BatchShape;
use vesper_core::asset::{GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::math::Mat4;
use vesper_core::renderer::api::*;

/// A skinned mesh with its current pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinnedDrawable<'a> {
    /// The mesh.
    pub mesh: MeshId,
    /// The material.
    pub material: MaterialId,
    /// Model matrix.
    pub transform: Mat4,
    /// Joint matrices, at most the batch's joint count.
    pub joints: &'a [Mat4],
}

/// Skinned meshes.
///
/// Joint matrices do not fit in instance attributes, so every drawable is a
/// separate repeat: its model matrix and joints form one uniform block, and the
/// draw selects the block with a dynamic offset.
#[derive(Debug, Clone, Copy)]
pub struct SkinnedBatch;

impl SkinnedBatch {
    /// Bytes of the uniform block of one drawable: the model matrix followed by the joints.
    pub const fn uniform_size(joint_count: u32) -> u64 {
        64 * (1 + joint_count as u64)
    }

    /// The data shape of a skinned batch.
    pub fn shape(max_repeats: u32, joint_count: u32) -> BatchShape {
        BatchShape {
            instance_element_size: 0,
            max_instances: 0,
            instance_advance: false,
            uniform_element_size: Self::uniform_size(joint_count),
            max_repeats,
            repeat_advance: true,
        }
    }

    /// The uniform block of a drawable. Joints past the pose are identity.
    ///
    /// A pose with more joints than `joint_count` yields a larger block, which
    /// the batcher rejects as a size mismatch.
    pub fn uniform(drawable: &SkinnedDrawable<'_>, joint_count: u32) -> Vec<f32> {
        let slots = (joint_count as usize).max(drawable.joints.len());
        let mut data = Vec::with_capacity(16 * (1 + slots));
        data.extend_from_slice(&drawable.transform.to_cols_array());
        for i in 0..slots {
            let joint = drawable.joints.get(i).copied().unwrap_or(Mat4::IDENTITY);
            data.extend_from_slice(&joint.to_cols_array());
        }
        data
    }
}

pub(crate) fn skinned_recipe(
    pass: RenderPassType,
    mesh: &GpuMesh,
    material: &GpuMaterial,
) -> Option<PipelineRecipe> {
    mesh_recipe(
        ShaderFamily::Skinned,
        "Skinned",
        pass,
        material,
        vec![mesh.vertex_layout.clone()],
        true,
    )
}
