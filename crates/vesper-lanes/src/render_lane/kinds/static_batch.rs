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

/// A rigid mesh placed in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticDrawable {
    /// The mesh.
    pub mesh: MeshId,
    /// The material.
    pub material: MaterialId,
    /// Model matrix.
    pub transform: Mat4,
}

/// Static meshes: one instanced draw per batch, the model matrix as a per-instance attribute.
#[derive(Debug, Clone, Copy)]
pub struct StaticBatch;

impl StaticBatch {
    /// Bytes of instance data per drawable, one column-major 4x4 matrix.
    pub const INSTANCE_SIZE: u64 = 64;

    /// The data shape of a static batch holding `max_instances` drawables.
    pub fn shape(max_instances: u32) -> BatchShape {
        BatchShape {
            instance_element_size: Self::INSTANCE_SIZE,
            max_instances,
            instance_advance: true,
            uniform_element_size: 0,
            max_repeats: 1,
            repeat_advance: false,
        }
    }

    /// The instance record of a drawable.
    pub fn instance(drawable: &StaticDrawable) -> [f32; 16] {
        drawable.transform.to_cols_array()
    }
}

/// The first shader location after the mesh's own attributes.
pub(crate) fn next_location(layout: &VertexBufferLayout) -> u32 {
    layout
        .attributes
        .iter()
        .map(|a| a.location + 1)
        .max()
        .unwrap_or(0)
}

pub(crate) fn static_recipe(
    pass: RenderPassType,
    mesh: &GpuMesh,
    material: &GpuMaterial,
) -> Option<PipelineRecipe> {
    let instances = VertexBufferLayout::instance_mat4(next_location(&mesh.vertex_layout));
    mesh_recipe(
        ShaderFamily::Static,
        "Static",
        pass,
        material,
        vec![mesh.vertex_layout.clone(), instances],
        false,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_follows_mesh_attributes() {
        let mesh = GpuMesh {
            vertex_buffer: BufferId(0),
            index_buffer: BufferId(1),
            index_count: 6,
            index_format: IndexFormat::Uint16,
            vertex_layout: VertexBufferLayout::packed(
                VertexStepMode::Vertex,
                0,
                &[VertexFormat::Float32x3, VertexFormat::Float32x3],
            ),
        };
        let recipe =
            static_recipe(RenderPassType::Opaque, &mesh, &GpuMaterial::default()).unwrap();
        assert_eq!(recipe.vertex_buffers.len(), 2);
        assert_eq!(recipe.vertex_buffers[1].attributes[0].location, 2);
        assert_eq!(recipe.vertex_buffers[1].stride, StaticBatch::INSTANCE_SIZE);
        assert!(!recipe.bindings.uniform_set);
    }

    #[test]
    fn test_instance_is_column_major() {
        let drawable = StaticDrawable {
            mesh: MeshId(0),
            material: MaterialId(0),
            transform: Mat4::from_translation(vesper_core::math::Vec3::new(1.0, 2.0, 3.0)),
        };
        let instance = StaticBatch::instance(&drawable);
        assert_eq!(&instance[12..15], &[1.0, 2.0, 3.0]);
    }
}
