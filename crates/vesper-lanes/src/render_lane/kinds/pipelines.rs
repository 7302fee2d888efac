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

use super::{BatchKind, BindingPlan, PipelineRecipe};
use crate::render_lane::error::BatchError;
use ahash::AHashMap;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use vesper_core::asset::{GeometryKind, GpuMaterial, GpuMesh, PipelineSlot};
use vesper_core::renderer::api::*;
use vesper_core::renderer::{GraphicsBackend, ResourceError};

/// The two layouts of the per-frame scene set.
///
/// Color passes sample the shadow map; the shadow pass renders into it and
/// therefore binds a layout without the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneLayouts {
    /// Scene uniform and shadow map sampler.
    pub color: DescriptorSetLayoutId,
    /// Scene uniform only.
    pub shadow: DescriptorSetLayoutId,
}

/// A pipeline chosen for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPipeline {
    /// The pipeline.
    pub id: PipelineId,
    /// The descriptor sets it expects.
    pub bindings: BindingPlan,
    /// Its push constant block.
    pub push_constant_range: Option<PushConstantRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    geometry: GeometryKind,
    pass: RenderPassType,
    high_detail: bool,
    material_layout: Option<DescriptorSetLayoutId>,
    vertex_layout: VertexBufferLayout,
}

#[derive(Debug, Clone)]
struct CachedPipeline {
    id: PipelineId,
    recipe: PipelineRecipe,
    set_layouts: Vec<DescriptorSetLayoutId>,
}

/// Builds and caches the pipelines of every batch kind.
///
/// A pipeline is built the first time a (kind, pass, shader variant, material
/// layout, vertex layout) combination is requested and shared by every batch
/// that asks for the same combination afterwards. Pipelines supplied by a
/// material take priority and are never cached or destroyed here.
#[derive(Debug)]
pub struct PipelineLibrary {
    backend: Arc<dyn GraphicsBackend>,
    shaders: AHashMap<String, ShaderId>,
    render_passes: BTreeMap<RenderPassType, RenderPassId>,
    scene_layouts: Option<SceneLayouts>,
    uniform_layout: DescriptorSetLayoutId,
    cache: AHashMap<PipelineKey, CachedPipeline>,
}

impl PipelineLibrary {
    /// Creates an empty library and the layout of the batch uniform set.
    pub fn new(backend: Arc<dyn GraphicsBackend>) -> Result<Self, ResourceError> {
        let uniform_layout = backend.create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
            label: Some("batch uniform layout".into()),
            bindings: Cow::Borrowed(&[DescriptorBinding {
                binding: 0,
                ty: DescriptorType::DynamicUniformBuffer,
                visibility: ShaderStageFlags::VERTEX,
            }]),
        })?;
        Ok(Self {
            backend,
            shaders: AHashMap::new(),
            render_passes: BTreeMap::new(),
            scene_layouts: None,
            uniform_layout,
            cache: AHashMap::new(),
        })
    }

    /// Registers the render pass pipelines for `pass` are built against.
    pub fn set_render_pass(&mut self, pass: RenderPassType, render_pass: RenderPassId) {
        self.render_passes.insert(pass, render_pass);
    }

    /// The render pass registered for `pass`.
    pub fn render_pass(&self, pass: RenderPassType) -> Option<RenderPassId> {
        self.render_passes.get(&pass).copied()
    }

    /// Registers the scene set layouts bound at set 0.
    pub fn set_scene_layouts(&mut self, layouts: SceneLayouts) {
        self.scene_layouts = Some(layouts);
    }

    /// Layout of the shared dynamic uniform set of repeat batches.
    pub fn uniform_layout(&self) -> DescriptorSetLayoutId {
        self.uniform_layout
    }

    /// Number of pipelines built and cached here.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if no pipeline was built yet.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns the shader module for `name`, loading it on first use.
    pub fn shader(&mut self, name: &str, stage: ShaderStage) -> Result<ShaderId, ResourceError> {
        if let Some(id) = self.shaders.get(name) {
            return Ok(*id);
        }
        let id = self.backend.create_shader(&ShaderDescriptor {
            name: Cow::Borrowed(name),
            stage,
        })?;
        self.shaders.insert(name.to_string(), id);
        Ok(id)
    }

    /// Finds or builds the pipeline a batch of `kind` uses in `pass`.
    pub fn resolve(
        &mut self,
        kind: BatchKind,
        pass: RenderPassType,
        mesh: &GpuMesh,
        material: &GpuMaterial,
    ) -> Result<ResolvedPipeline, BatchError> {
        let recipe = kind.recipe(pass, mesh, material)?;
        let geometry = kind.geometry();
        if let Some(id) = material.pipeline(PipelineSlot { geometry, pass }) {
            return Ok(ResolvedPipeline {
                id,
                bindings: recipe.bindings,
                push_constant_range: recipe.push_constant_range,
            });
        }

        let key = PipelineKey {
            geometry,
            pass,
            high_detail: material.high_detail,
            material_layout: material.set_layout.filter(|_| recipe.bindings.material_set),
            vertex_layout: mesh.vertex_layout.clone(),
        };
        if let Some(cached) = self.cache.get(&key) {
            return Ok(ResolvedPipeline {
                id: cached.id,
                bindings: cached.recipe.bindings,
                push_constant_range: cached.recipe.push_constant_range,
            });
        }

        let Some(render_pass) = self.render_pass(pass) else {
            log::error!("PipelineLibrary: no render pass is registered for the {pass:?} pass");
            return Err(BatchError::PipelineUnavailable {
                geometry,
                pass,
                reason: "the render pass has not been created",
            });
        };
        let set_layouts = self.set_layouts(geometry, pass, &recipe.bindings, material)?;
        let id = self.build(&recipe, &set_layouts, render_pass)?;
        log::debug!("PipelineLibrary: built '{}' as {id:?}", recipe.label);
        let resolved = ResolvedPipeline {
            id,
            bindings: recipe.bindings,
            push_constant_range: recipe.push_constant_range,
        };
        self.cache.insert(
            key,
            CachedPipeline {
                id,
                recipe,
                set_layouts,
            },
        );
        Ok(resolved)
    }

    fn set_layouts(
        &self,
        geometry: GeometryKind,
        pass: RenderPassType,
        bindings: &BindingPlan,
        material: &GpuMaterial,
    ) -> Result<Vec<DescriptorSetLayoutId>, BatchError> {
        let mut layouts = Vec::with_capacity(3);
        if bindings.scene_set {
            let Some(scene) = self.scene_layouts else {
                log::error!("PipelineLibrary: scene layouts are not registered");
                return Err(BatchError::PipelineUnavailable {
                    geometry,
                    pass,
                    reason: "the scene set layouts have not been created",
                });
            };
            layouts.push(if pass == RenderPassType::Shadow {
                scene.shadow
            } else {
                scene.color
            });
        }
        if bindings.material_set {
            if let Some(layout) = material.set_layout {
                layouts.push(layout);
            }
        }
        if bindings.uniform_set {
            layouts.push(self.uniform_layout);
        }
        Ok(layouts)
    }

    fn build(
        &mut self,
        recipe: &PipelineRecipe,
        set_layouts: &[DescriptorSetLayoutId],
        render_pass: RenderPassId,
    ) -> Result<PipelineId, ResourceError> {
        let vertex_shader = self.shader(&recipe.vertex_shader, ShaderStage::Vertex)?;
        let fragment_shader = match &recipe.fragment_shader {
            Some(name) => Some(self.shader(name, ShaderStage::Fragment)?),
            None => None,
        };
        self.backend.create_pipeline(&PipelineDescriptor {
            label: Some(Cow::Borrowed(&recipe.label)),
            vertex_shader,
            fragment_shader,
            vertex_buffers: Cow::Borrowed(&recipe.vertex_buffers),
            set_layouts: Cow::Borrowed(set_layouts),
            push_constant_range: recipe.push_constant_range,
            render_pass,
            depth: recipe.depth,
            blend: recipe.blend,
            cull_mode: recipe.cull_mode,
        })
    }

    /// Rebuilds every cached pipeline of `pass` against a new render pass.
    ///
    /// Returns the (old, new) handle of every rebuilt pipeline, so batches
    /// holding the old handles can be repointed.
    pub fn rebuild_pass(
        &mut self,
        pass: RenderPassType,
        render_pass: RenderPassId,
    ) -> Result<Vec<(PipelineId, PipelineId)>, ResourceError> {
        self.set_render_pass(pass, render_pass);
        let stale: Vec<PipelineKey> = self
            .cache
            .keys()
            .filter(|key| key.pass == pass)
            .cloned()
            .collect();
        let mut replaced = Vec::with_capacity(stale.len());
        for key in stale {
            let Some(cached) = self.cache.get(&key).cloned() else {
                continue;
            };
            let id = self.build(&cached.recipe, &cached.set_layouts, render_pass)?;
            if let Err(e) = self.backend.destroy_pipeline(cached.id) {
                log::warn!("PipelineLibrary: failed to destroy {:?}: {e}", cached.id);
            }
            replaced.push((cached.id, id));
            self.cache.insert(key, CachedPipeline { id, ..cached });
        }
        log::info!(
            "PipelineLibrary: rebuilt {} pipelines of the {pass:?} pass",
            replaced.len()
        );
        Ok(replaced)
    }

    /// Destroys every cached pipeline, every loaded shader and the uniform layout.
    pub fn destroy(&mut self) {
        for (_, cached) in self.cache.drain() {
            if let Err(e) = self.backend.destroy_pipeline(cached.id) {
                log::warn!("PipelineLibrary: failed to destroy {:?}: {e}", cached.id);
            }
        }
        for (name, shader) in self.shaders.drain() {
            if let Err(e) = self.backend.destroy_shader(shader) {
                log::warn!("PipelineLibrary: failed to destroy shader '{name}': {e}");
            }
        }
        if let Err(e) = self.backend.destroy_descriptor_set_layout(self.uniform_layout) {
            log::warn!("PipelineLibrary: failed to destroy the uniform layout: {e}");
        }
    }
}
