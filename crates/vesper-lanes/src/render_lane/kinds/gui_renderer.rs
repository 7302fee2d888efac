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

use super::renderer_3d::{submit_to_batches, BatchSubmission};
use super::static_batch::next_location;
use super::{BatchKind, BindingPlan, PipelineRecipe};
use crate::render_lane::batcher::{BatchIdentifier, BatchPayload, BatchShape, Batcher};
use crate::render_lane::error::BatchError;
use bytemuck::{Pod, Zeroable};
use std::sync::Arc;
use vesper_core::asset::{AssetSource, GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::renderer::api::*;
use vesper_core::renderer::{DirectionalLight, GraphicsBackend, ResourceError};

/// The mesh identifier of the shared unit quad. Never handed out by an asset layer.
pub const GUI_QUAD_MESH: MeshId = MeshId(u32::MAX);

const QUAD_VERTICES: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// A textured, tinted screen-space rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuiQuad {
    /// The material providing the texture.
    pub material: MaterialId,
    /// Position (`xy`) and size (`zw`) in normalized screen coordinates.
    pub rect: [f32; 4],
    /// Offset (`xy`) and size (`zw`) of the sampled texture region.
    pub uv_rect: [f32; 4],
    /// Linear RGBA tint.
    pub color: [f32; 4],
}

/// Per-instance attributes of one quad.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GuiQuadInstance {
    /// Screen rectangle.
    pub rect: [f32; 4],
    /// Texture rectangle.
    pub uv_rect: [f32; 4],
    /// Tint.
    pub color: [f32; 4],
}

impl From<&GuiQuad> for GuiQuadInstance {
    fn from(quad: &GuiQuad) -> Self {
        Self {
            rect: quad.rect,
            uv_rect: quad.uv_rect,
            color: quad.color,
        }
    }
}

/// Draws GUI quads over the composited frame in the screen pass.
///
/// Every quad is an instance of one shared unit quad; quads sharing a
/// material are drawn with a single instanced call.
#[derive(Debug)]
pub struct GuiRenderer {
    backend: Arc<dyn GraphicsBackend>,
    quad: GpuMesh,
    max_quads: u32,
}

impl GuiRenderer {
    /// Bytes of instance data per quad.
    pub const INSTANCE_SIZE: u64 = std::mem::size_of::<GuiQuadInstance>() as u64;

    /// Uploads the unit quad.
    pub fn new(backend: Arc<dyn GraphicsBackend>, max_quads: u32) -> Result<Self, ResourceError> {
        let vertex_buffer = backend.create_buffer_with_data(
            &BufferDescriptor::for_elements(
                "gui quad vertices",
                8,
                QUAD_VERTICES.len() as u64,
                BufferUsage::VERTEX | BufferUsage::COPY_DST,
                UpdateFrequency::Static,
            ),
            bytemuck::cast_slice(&QUAD_VERTICES),
        )?;
        let index_buffer = match backend.create_buffer_with_data(
            &BufferDescriptor::for_elements(
                "gui quad indices",
                IndexFormat::Uint16.size(),
                QUAD_INDICES.len() as u64,
                BufferUsage::INDEX | BufferUsage::COPY_DST,
                UpdateFrequency::Static,
            ),
            bytemuck::cast_slice(&QUAD_INDICES),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                if let Err(destroy_err) = backend.destroy_buffer(vertex_buffer) {
                    log::warn!("GuiRenderer: failed to release the quad vertices: {destroy_err}");
                }
                return Err(e);
            }
        };
        Ok(Self {
            backend,
            quad: GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: QUAD_INDICES.len() as u32,
                index_format: IndexFormat::Uint16,
                vertex_layout: VertexBufferLayout::packed(
                    VertexStepMode::Vertex,
                    0,
                    &[VertexFormat::Float32x2],
                ),
            },
            max_quads,
        })
    }

    /// The shared unit quad.
    pub fn quad_mesh(&self) -> &GpuMesh {
        &self.quad
    }

    /// The data shape of a GUI batch.
    pub fn shape(&self) -> BatchShape {
        BatchShape {
            instance_element_size: Self::INSTANCE_SIZE,
            max_instances: self.max_quads,
            instance_advance: true,
            uniform_element_size: 0,
            max_repeats: 1,
            repeat_advance: false,
        }
    }

    /// Submits one quad to the batch of its material.
    pub fn submit(
        &self,
        batcher: &mut Batcher,
        assets: &dyn AssetSource,
        quad: &GuiQuad,
        frame: usize,
    ) -> Result<BatchIdentifier, BatchError> {
        let Some(material) = assets.material(quad.material) else {
            log::error!("GuiRenderer: material {:?} is not resident", quad.material);
            return Err(BatchError::UnknownMaterial(quad.material));
        };
        let instance = GuiQuadInstance::from(quad);
        let light = DirectionalLight::default();
        let submission = BatchSubmission {
            kind: BatchKind::Gui,
            mesh_id: GUI_QUAD_MESH,
            material_id: quad.material,
            mesh: &self.quad,
            material,
            shape: self.shape(),
            light: &light,
        };
        submit_to_batches(
            batcher,
            &submission,
            &[RenderPassType::Screen],
            BatchPayload {
                instance: bytemuck::bytes_of(&instance),
                uniform: &[],
            },
            frame,
        )
    }

    /// Releases the quad buffers.
    pub fn destroy(&self) {
        for buffer in [self.quad.vertex_buffer, self.quad.index_buffer] {
            if let Err(e) = self.backend.destroy_buffer(buffer) {
                log::warn!("GuiRenderer: failed to destroy {buffer:?}: {e}");
            }
        }
    }
}

pub(crate) fn gui_recipe(
    pass: RenderPassType,
    mesh: &GpuMesh,
    material: &GpuMaterial,
) -> Option<PipelineRecipe> {
    if pass != RenderPassType::Screen {
        return None;
    }
    let instances = VertexBufferLayout::packed(
        VertexStepMode::Instance,
        next_location(&mesh.vertex_layout),
        &[VertexFormat::Float32x4; 3],
    );
    Some(PipelineRecipe {
        label: "Gui Screen".to_string(),
        vertex_shader: "GuiVertexShader".to_string(),
        fragment_shader: Some("GuiFragmentShader".to_string()),
        vertex_buffers: vec![mesh.vertex_layout.clone(), instances],
        bindings: BindingPlan {
            scene_set: false,
            material_set: material.set_layout.is_some(),
            uniform_set: false,
        },
        push_constant_range: None,
        depth: DepthState::DISABLED,
        blend: BlendMode::AlphaBlend,
        cull_mode: CullMode::None,
    })
}
