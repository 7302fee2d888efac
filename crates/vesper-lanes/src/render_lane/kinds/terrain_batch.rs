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
use bytemuck::{Pod, Zeroable};
use vesper_core::asset::{GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::math::Mat4;
use vesper_core::renderer::api::*;

/// One terrain tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainTile {
    /// The tile mesh, usually shared by every tile of a terrain.
    pub mesh: MeshId,
    /// The terrain material.
    pub material: MaterialId,
    /// Model matrix of the tile.
    pub transform: Mat4,
    /// Offset (`xy`) and scale (`zw`) of the tile in the terrain's texture space.
    pub uv_offset_scale: [f32; 4],
    /// Vertical scale applied to the height map.
    pub height_scale: f32,
}

/// The uniform block of one tile.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TerrainTileUniform {
    /// Model matrix, column-major.
    pub model: [[f32; 4]; 4],
    /// Texture-space offset and scale.
    pub uv_offset_scale: [f32; 4],
    /// Height scale in `x`.
    pub params: [f32; 4],
}

impl From<&TerrainTile> for TerrainTileUniform {
    fn from(tile: &TerrainTile) -> Self {
        Self {
            model: tile.transform.to_cols_array_2d(),
            uv_offset_scale: tile.uv_offset_scale,
            params: [tile.height_scale, 0.0, 0.0, 0.0],
        }
    }
}

/// Terrain tiles, one draw per tile with its block selected by dynamic offset.
#[derive(Debug, Clone, Copy)]
pub struct TerrainBatch;

impl TerrainBatch {
    /// Bytes of the uniform block of one tile.
    pub const UNIFORM_SIZE: u64 = std::mem::size_of::<TerrainTileUniform>() as u64;

    /// The data shape of a terrain batch holding `max_tiles` tiles.
    pub fn shape(max_tiles: u32) -> BatchShape {
        BatchShape {
            instance_element_size: 0,
            max_instances: 0,
            instance_advance: false,
            uniform_element_size: Self::UNIFORM_SIZE,
            max_repeats: max_tiles,
            repeat_advance: true,
        }
    }
}

pub(crate) fn terrain_recipe(
    pass: RenderPassType,
    mesh: &GpuMesh,
    material: &GpuMaterial,
) -> Option<PipelineRecipe> {
    mesh_recipe(
        ShaderFamily::Static,
        "Terrain",
        pass,
        material,
        vec![mesh.vertex_layout.clone()],
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_uniform_layout() {
        assert_eq!(TerrainBatch::UNIFORM_SIZE, 96);
        let tile = TerrainTile {
            mesh: MeshId(2),
            material: MaterialId(5),
            transform: Mat4::IDENTITY,
            uv_offset_scale: [0.5, 0.0, 0.25, 0.25],
            height_scale: 12.0,
        };
        let uniform = TerrainTileUniform::from(&tile);
        assert_eq!(uniform.params[0], 12.0);
        assert_eq!(uniform.uv_offset_scale[2], 0.25);
    }

    #[test]
    fn test_terrain_uses_static_shaders() {
        let mesh = GpuMesh {
            vertex_buffer: BufferId(0),
            index_buffer: BufferId(1),
            index_count: 6,
            index_format: IndexFormat::Uint32,
            vertex_layout: VertexBufferLayout::packed(
                VertexStepMode::Vertex,
                0,
                &[VertexFormat::Float32x3],
            ),
        };
        let recipe =
            terrain_recipe(RenderPassType::Opaque, &mesh, &GpuMaterial::default()).unwrap();
        assert_eq!(recipe.vertex_shader, "StaticVertexShader");
        assert!(recipe.bindings.uniform_set);
    }
}
