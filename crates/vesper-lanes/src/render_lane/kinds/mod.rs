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

//! Batch-kind specific submission helpers and pipeline recipes.
//!
//! Each kind decides how a drawable maps onto batch data (instance attributes
//! or per-repeat uniform blocks) and which shaders, vertex layouts and fixed
//! function state its pipelines use in each pass.

mod gui_renderer;
mod pipelines;
mod renderer_3d;
mod skinned_batch;
mod static_batch;
mod terrain_batch;

pub use gui_renderer::*;
pub use pipelines::*;
pub use renderer_3d::*;
pub use skinned_batch::*;
pub use static_batch::*;
pub use terrain_batch::*;

use super::error::BatchError;
use bytemuck::{Pod, Zeroable};
use vesper_core::asset::{GeometryKind, GpuMaterial, GpuMesh};
use vesper_core::renderer::api::*;
use vesper_core::renderer::DirectionalLight;

/// The kind of geometry a batch draws, with kind-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Rigid meshes drawn with hardware instancing.
    Static,
    /// Skinned meshes, one draw per entity with its joints selected by offset.
    Skinned {
        /// Joint matrices per entity.
        joint_count: u32,
    },
    /// Terrain tiles, one draw per tile with its transform selected by offset.
    Terrain,
    /// Screen-space quads drawn with hardware instancing in the screen pass.
    Gui,
}

impl BatchKind {
    /// The geometry kind used to look up material pipeline overrides.
    pub fn geometry(&self) -> GeometryKind {
        match self {
            BatchKind::Static => GeometryKind::Static,
            BatchKind::Skinned { .. } => GeometryKind::Skinned,
            BatchKind::Terrain => GeometryKind::Terrain,
            BatchKind::Gui => GeometryKind::Gui,
        }
    }

    pub(crate) fn recipe(
        &self,
        pass: RenderPassType,
        mesh: &GpuMesh,
        material: &GpuMaterial,
    ) -> Result<PipelineRecipe, BatchError> {
        let recipe = match self {
            BatchKind::Static => static_recipe(pass, mesh, material),
            BatchKind::Skinned { .. } => skinned_recipe(pass, mesh, material),
            BatchKind::Terrain => terrain_recipe(pass, mesh, material),
            BatchKind::Gui => gui_recipe(pass, mesh, material),
        };
        recipe.ok_or_else(|| {
            log::error!("{self:?} batches cannot be drawn in the {pass:?} pass");
            BatchError::PipelineUnavailable {
                geometry: self.geometry(),
                pass,
                reason: "the kind is not drawn in this pass",
            }
        })
    }
}

/// Which descriptor sets a pipeline expects, in set order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BindingPlan {
    /// Set 0 is the per-frame scene uniform.
    pub scene_set: bool,
    /// The material's own set follows.
    pub material_set: bool,
    /// The batch's shared dynamic uniform block comes last.
    pub uniform_set: bool,
}

/// Everything needed to build one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PipelineRecipe {
    pub label: String,
    pub vertex_shader: String,
    pub fragment_shader: Option<String>,
    pub vertex_buffers: Vec<VertexBufferLayout>,
    pub bindings: BindingPlan,
    pub push_constant_range: Option<PushConstantRange>,
    pub depth: DepthState,
    pub blend: BlendMode,
    pub cull_mode: CullMode,
}

/// Fixed-function state of a 3D mesh pipeline per pass. `None` for the screen pass.
pub(crate) fn mesh_pass_state(pass: RenderPassType) -> Option<(DepthState, BlendMode, CullMode)> {
    match pass {
        RenderPassType::Shadow => Some((DepthState::READ_WRITE, BlendMode::Opaque, CullMode::Front)),
        RenderPassType::Opaque => Some((DepthState::READ_WRITE, BlendMode::Opaque, CullMode::Back)),
        RenderPassType::Transparent => {
            Some((DepthState::READ_ONLY, BlendMode::AlphaBlend, CullMode::None))
        }
        RenderPassType::Screen => None,
    }
}

/// Push constants of every shadow-pass mesh pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowPushConstants {
    /// Light direction in `xyz`, shadow distance in `w`.
    pub direction_distance: [f32; 4],
}

impl ShadowPushConstants {
    /// The push constant range declared by shadow pipelines.
    pub const RANGE: PushConstantRange = PushConstantRange {
        stages: ShaderStageFlags::VERTEX,
        size: std::mem::size_of::<ShadowPushConstants>() as u32,
    };

    /// Packs a light.
    pub fn from_light(light: &DirectionalLight) -> Self {
        let d = light.direction.normalize_or_zero();
        Self {
            direction_distance: [d.x, d.y, d.z, light.shadow_distance],
        }
    }
}

/// Builds the recipe shared by the 3D mesh kinds.
pub(crate) fn mesh_recipe(
    family: ShaderFamily,
    kind_label: &str,
    pass: RenderPassType,
    material: &GpuMaterial,
    vertex_buffers: Vec<VertexBufferLayout>,
    uniform_set: bool,
) -> Option<PipelineRecipe> {
    let (depth, blend, cull_mode) = mesh_pass_state(pass)?;
    let shadow = pass == RenderPassType::Shadow;
    Some(PipelineRecipe {
        label: format!("{kind_label} {pass:?}"),
        vertex_shader: mesh_shader_name(family, material.high_detail, ShaderStage::Vertex),
        fragment_shader: (!shadow)
            .then(|| mesh_shader_name(family, material.high_detail, ShaderStage::Fragment)),
        vertex_buffers,
        bindings: BindingPlan {
            scene_set: true,
            material_set: !shadow && material.set_layout.is_some(),
            uniform_set,
        },
        push_constant_range: shadow.then_some(ShadowPushConstants::RANGE),
        depth,
        blend,
        cull_mode,
    })
}
