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

use crate::renderer::api::{DescriptorSetId, DescriptorSetLayoutId, PipelineId, RenderPassType};
use std::collections::HashMap;

/// Opaque identifier of a material in the asset layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(pub u32);

/// The kind of geometry a pipeline is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Rigid, hardware-instanced meshes.
    Static,
    /// Meshes deformed by joint matrices.
    Skinned,
    /// Terrain tiles.
    Terrain,
    /// Screen-space quads.
    Gui,
}

/// Selects one pipeline of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineSlot {
    /// The geometry kind.
    pub geometry: GeometryKind,
    /// The pass the pipeline renders in.
    pub pass: RenderPassType,
}

/// A material whose textures and uniforms are already resident.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GpuMaterial {
    /// Selects the `HD` shader variant.
    pub high_detail: bool,
    /// Layout of [`descriptor_sets`](Self::descriptor_sets). `None` for materials without bindings.
    pub set_layout: Option<DescriptorSetLayoutId>,
    /// One descriptor set per frame in flight.
    pub descriptor_sets: Vec<DescriptorSetId>,
    /// Whether meshes using this material are drawn into the shadow map.
    pub casts_shadows: bool,
    /// Whether meshes using this material are drawn in the transparent pass.
    pub transparent: bool,
    /// Pipelines supplied by the asset layer. Slots left empty are built by the renderer.
    pub pipelines: HashMap<PipelineSlot, PipelineId>,
}

impl GpuMaterial {
    /// The pipeline supplied for `slot`, if any.
    pub fn pipeline(&self, slot: PipelineSlot) -> Option<PipelineId> {
        self.pipelines.get(&slot).copied()
    }

    /// The pass a non-shadow draw with this material is recorded in.
    pub fn color_pass(&self) -> RenderPassType {
        if self.transparent {
            RenderPassType::Transparent
        } else {
            RenderPassType::Opaque
        }
    }
}
