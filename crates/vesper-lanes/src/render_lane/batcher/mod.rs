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

//! The batching engine.
//!
//! The [`Batcher`] groups submissions sharing a (mesh, material) pair into one
//! [`Batch`] per render pass. Batches of the same pair in different passes
//! share one [`BatchShaderResource`], so a shadow-casting mesh is written once
//! and drawn twice.

mod batch;
mod identifier;
mod shader_resource;

pub use batch::*;
pub use identifier::*;
pub use shader_resource::*;

use super::context::RenderContext;
use super::descriptor_pool::DescriptorPool;
use super::error::{BatchError, CapacityKind};
use super::kinds::{BatchKind, PipelineLibrary, ShadowPushConstants};
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use vesper_core::asset::{GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::renderer::api::*;
use vesper_core::renderer::{DirectionalLight, GraphicsBackend, ResourceError};

/// Everything needed to create one batch.
#[derive(Debug, Clone)]
pub struct BatchCreateInfo<'a> {
    /// Mesh identifier.
    pub mesh_id: MeshId,
    /// Material identifier.
    pub material_id: MaterialId,
    /// The resident mesh.
    pub mesh: &'a GpuMesh,
    /// The resident material.
    pub material: &'a GpuMaterial,
    /// The batch kind, which selects the pipeline recipe.
    pub kind: BatchKind,
    /// The pass the batch is recorded in.
    pub pass: RenderPassType,
    /// Draw repeats the batch holds.
    pub max_repeat: u32,
    /// Each append adds a repeat.
    pub repeat_advance: bool,
    /// Instances the batch holds.
    pub max_instance: u32,
    /// Each append adds an instance.
    pub instance_advance: bool,
    /// Bytes of instance data per append, zero for none.
    pub instance_element_size: u64,
    /// Bytes of uniform data per repeat, zero for none.
    pub uniform_element_size: u64,
    /// The shadow-casting light, used by shadow-pass batches.
    pub light: Option<DirectionalLight>,
}

impl BatchCreateInfo<'_> {
    fn shape(&self) -> BatchShape {
        BatchShape {
            instance_element_size: self.instance_element_size,
            max_instances: self.max_instance,
            instance_advance: self.instance_advance,
            uniform_element_size: self.uniform_element_size,
            max_repeats: self.max_repeat,
            repeat_advance: self.repeat_advance,
        }
    }
}

/// The data of one append.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchPayload<'a> {
    /// Instance attributes, exactly the declared instance element size.
    pub instance: &'a [u8],
    /// Uniform block, exactly the declared uniform element size.
    pub uniform: &'a [u8],
}

/// Counts of live batching objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherStats {
    /// Live batches across all passes.
    pub batches: usize,
    /// Live shared resources.
    pub shared_resources: usize,
    /// Batches with data this frame.
    pub non_empty_batches: usize,
}

/// Owns all live batches, their dedup maps and the shared resources behind them.
#[derive(Debug)]
pub struct Batcher {
    context: RenderContext,
    backend: Arc<dyn GraphicsBackend>,
    frames_in_flight: usize,
    pipelines: PipelineLibrary,
    pool: DescriptorPool,
    batches: BTreeMap<RenderPassType, Vec<Batch>>,
    index: AHashMap<(RenderPassType, BatchIdentifier), usize>,
    passes_by_identifier: AHashMap<BatchIdentifier, Vec<RenderPassType>>,
    shared: AHashMap<BatchIdentifier, BatchShaderResource>,
}

impl Batcher {
    /// Creates an empty batcher drawing identifiers from the context's registry.
    pub fn new(context: &RenderContext) -> Result<Self, BatchError> {
        let backend = context.backend().clone();
        let pipelines = PipelineLibrary::new(backend.clone())?;
        let pool = DescriptorPool::new(
            backend.clone(),
            "batch shared resources",
            context.settings().max_descriptor_sets,
        )?;
        Ok(Self {
            context: context.clone(),
            frames_in_flight: context.frames_in_flight(),
            backend,
            pipelines,
            pool,
            batches: BTreeMap::new(),
            index: AHashMap::new(),
            passes_by_identifier: AHashMap::new(),
            shared: AHashMap::new(),
        })
    }

    /// The pipeline library batches take their pipelines from.
    pub fn pipelines(&self) -> &PipelineLibrary {
        &self.pipelines
    }

    /// Mutable access to the pipeline library.
    pub fn pipelines_mut(&mut self) -> &mut PipelineLibrary {
        &mut self.pipelines
    }

    /// Number of frame-in-flight slots every shared resource is replicated over.
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Creates the batch of one (pass, mesh, material) combination.
    ///
    /// The shared resource of the pair is created with the first batch and
    /// reused by the batches of the other passes.
    ///
    /// # Errors
    ///
    /// - [`BatchError::DuplicateBatch`] if the pass already has a batch for the pair.
    /// - [`BatchError::IdentifierCollision`] if the pair's identifier is held by another pair.
    /// - [`BatchError::IncompatibleSharedResource`] if an existing batch of the pair declared
    ///   a different data shape.
    pub fn create_batch(&mut self, info: &BatchCreateInfo<'_>) -> Result<BatchIdentifier, BatchError> {
        if let Some(identifier) = self
            .context
            .identifiers()?
            .lookup(info.mesh_id, info.material_id)
        {
            if self.index.contains_key(&(info.pass, identifier)) {
                log::error!(
                    "Batcher: batch {identifier} ({:?}, {:?}) already exists in the {:?} pass",
                    info.mesh_id,
                    info.material_id,
                    info.pass
                );
                return Err(BatchError::DuplicateBatch {
                    identifier,
                    pass: info.pass,
                });
            }
        }

        let identifier = self
            .context
            .identifiers()?
            .acquire(info.mesh_id, info.material_id)?;
        match self.build_batch(identifier, info) {
            Ok(batch) => {
                self.register(batch);
                log::debug!(
                    "Batcher: created {:?} batch {identifier} in the {:?} pass",
                    info.kind,
                    info.pass
                );
                Ok(identifier)
            }
            Err(e) => {
                if let Err(release_err) = self.context.identifiers()?.release(identifier) {
                    log::warn!("Batcher: failed to release identifier {identifier}: {release_err}");
                }
                Err(e)
            }
        }
    }

    fn build_batch(
        &mut self,
        identifier: BatchIdentifier,
        info: &BatchCreateInfo<'_>,
    ) -> Result<Batch, BatchError> {
        let shape = info.shape();
        if shape.instance_advance && shape.max_instances == 0
            || shape.repeat_advance && shape.max_repeats == 0
        {
            log::error!("Batcher: batch {identifier} declared an advancing counter with zero capacity");
            return Err(BatchError::IncompatibleSharedResource {
                identifier,
                reason: "an advancing counter needs a non-zero capacity".to_string(),
            });
        }
        let material_sets = if info.material.set_layout.is_some() {
            if info.material.descriptor_sets.len() < self.frames_in_flight {
                log::error!(
                    "Batcher: material {:?} has {} descriptor sets for {} frames in flight",
                    info.material_id,
                    info.material.descriptor_sets.len(),
                    self.frames_in_flight
                );
                return Err(BatchError::Resource(ResourceError::DescriptorMismatch(format!(
                    "material {:?} needs one descriptor set per frame in flight",
                    info.material_id
                ))));
            }
            info.material.descriptor_sets.as_slice()
        } else {
            &[]
        };

        let resolved = self
            .pipelines
            .resolve(info.kind, info.pass, info.mesh, info.material)?;

        if let Some(existing) = self.shared.get(&identifier) {
            if existing.shape() != shape {
                log::error!(
                    "Batcher: batch {identifier} in the {:?} pass declared {shape:?}, existing resource has {:?}",
                    info.pass,
                    existing.shape()
                );
                return Err(BatchError::IncompatibleSharedResource {
                    identifier,
                    reason: format!("declared {shape:?}, shared resource has {:?}", existing.shape()),
                });
            }
        } else {
            let uniform_layout = self.pipelines.uniform_layout();
            let resource = BatchShaderResource::create(
                &self.backend,
                &mut self.pool,
                uniform_layout,
                identifier,
                shape,
                self.frames_in_flight,
            )?;
            self.shared.insert(identifier, resource);
        }
        let Some(shared) = self.shared.get_mut(&identifier) else {
            return Err(BatchError::UnknownIdentifier(identifier));
        };
        shared.users += 1;

        let descriptor_sets = (0..self.frames_in_flight)
            .map(|frame| {
                let mut sets = Vec::with_capacity(2);
                if resolved.bindings.material_set {
                    sets.push(material_sets[frame]);
                }
                if resolved.bindings.uniform_set {
                    if let Some(set) = shared.descriptor_sets().get(frame) {
                        sets.push(*set);
                    }
                }
                sets
            })
            .collect();

        let push_constants = resolved.push_constant_range.map(|range| {
            let light = info.light.unwrap_or_default();
            let payload = ShadowPushConstants::from_light(&light);
            (range.stages, bytemuck::bytes_of(&payload).to_vec())
        });

        Ok(Batch {
            identifier,
            pass: info.pass,
            kind: info.kind,
            mesh: info.mesh_id,
            material: info.material_id,
            pipeline: resolved.id,
            bindings: resolved.bindings,
            descriptor_sets,
            dynamic_uniform_stride: shared.uniform_stride() as u32,
            static_vertex_buffers: vec![info.mesh.vertex_buffer],
            dynamic_vertex_buffers: shared.instance_buffers().to_vec(),
            index_buffer: info.mesh.index_buffer,
            index_format: info.mesh.index_format,
            index_count: info.mesh.index_count,
            push_constants,
            instance_count: 0,
            repeat_count: 0,
            max_instance_count: shape.max_instances,
            max_repeat_count: shape.max_repeats,
            repeat_advance: shape.repeat_advance,
            instance_advance: shape.instance_advance,
        })
    }

    fn register(&mut self, batch: Batch) {
        let key = (batch.pass, batch.identifier);
        let pass_batches = self.batches.entry(batch.pass).or_default();
        self.index.insert(key, pass_batches.len());
        self.passes_by_identifier
            .entry(batch.identifier)
            .or_default()
            .push(batch.pass);
        pass_batches.push(batch);
    }

    /// Appends one submission to every batch of the identifier.
    ///
    /// The shared host copy of `current_frame` is written once. Nothing is
    /// written if any participating batch is full, so earlier entries stay
    /// intact.
    pub fn add_to_batch(
        &mut self,
        identifier: BatchIdentifier,
        payload: BatchPayload<'_>,
        current_frame: usize,
    ) -> Result<(), BatchError> {
        if current_frame >= self.frames_in_flight {
            log::error!(
                "Batcher: frame slot {current_frame} is out of range for {} frames in flight",
                self.frames_in_flight
            );
            return Err(BatchError::InvalidFrame {
                frame: current_frame,
                frames_in_flight: self.frames_in_flight,
            });
        }
        let (Some(passes), Some(shared)) = (
            self.passes_by_identifier.get(&identifier),
            self.shared.get(&identifier),
        ) else {
            log::error!("Batcher: no live batch uses identifier {identifier}");
            return Err(BatchError::UnknownIdentifier(identifier));
        };

        let shape = shared.shape();
        for (what, expected, actual) in [
            ("instance", shape.instance_element_size, payload.instance.len() as u64),
            ("uniform", shape.uniform_element_size, payload.uniform.len() as u64),
        ] {
            if expected != actual {
                log::error!(
                    "Batcher: batch {identifier} got {actual} bytes of {what} data, expected {expected}"
                );
                return Err(BatchError::ElementSizeMismatch {
                    identifier,
                    what,
                    expected,
                    actual,
                });
            }
        }

        let full = |pass: RenderPassType, kind: CapacityKind, capacity: u32| {
            log::error!(
                "Batcher: batch {identifier} in the {pass:?} pass exceeded its {kind} capacity of {capacity}"
            );
            BatchError::CapacityExceeded {
                identifier,
                pass,
                kind,
                capacity,
            }
        };
        for pass in passes {
            let Some(batch) = self.index.get(&(*pass, identifier)).and_then(|i| {
                self.batches.get(pass).and_then(|batches| batches.get(*i))
            }) else {
                continue;
            };
            if batch.instance_advance && batch.instance_count >= batch.max_instance_count {
                return Err(full(*pass, CapacityKind::Instance, batch.max_instance_count));
            }
            if batch.repeat_advance && batch.repeat_count >= batch.max_repeat_count {
                return Err(full(*pass, CapacityKind::Repeat, batch.max_repeat_count));
            }
        }
        let first_pass = passes.first().copied().unwrap_or(RenderPassType::Opaque);
        if shape.instance_advance && shared.instance_cursor() >= shape.max_instances {
            return Err(full(first_pass, CapacityKind::Instance, shape.max_instances));
        }
        if shape.repeat_advance && shared.repeat_cursor() >= shape.max_repeats {
            return Err(full(first_pass, CapacityKind::Repeat, shape.max_repeats));
        }

        let passes = passes.clone();
        if let Some(shared) = self.shared.get_mut(&identifier) {
            shared.append(current_frame, payload.instance, payload.uniform);
        }
        for pass in passes {
            let Some(i) = self.index.get(&(pass, identifier)).copied() else {
                continue;
            };
            if let Some(batch) = self.batches.get_mut(&pass).and_then(|b| b.get_mut(i)) {
                if batch.instance_advance {
                    batch.instance_count += 1;
                }
                if batch.repeat_advance {
                    batch.repeat_count += 1;
                }
            }
        }
        Ok(())
    }

    /// Flushes the host copies of `current_frame` into that slot's GPU buffers.
    ///
    /// Every shared resource with data this frame is written once, however many
    /// batches reference it. Returns the number of resources flushed.
    pub fn update_device_side_buffers(&mut self, current_frame: usize) -> Result<usize, BatchError> {
        if current_frame >= self.frames_in_flight {
            log::error!("Batcher: cannot flush frame slot {current_frame}");
            return Err(BatchError::InvalidFrame {
                frame: current_frame,
                frames_in_flight: self.frames_in_flight,
            });
        }
        let mut flushed = 0;
        for shared in self.shared.values() {
            if shared.has_pending_data() {
                shared.flush(&self.backend, current_frame)?;
                flushed += 1;
            }
        }
        log::trace!("Batcher: flushed {flushed} shared resources for frame slot {current_frame}");
        Ok(flushed)
    }

    /// Zeroes every batch's counters. Buffer contents are left in place.
    pub fn reset_for_next_frame(&mut self) {
        for batch in self.batches.values_mut().flatten() {
            batch.reset();
        }
        for shared in self.shared.values_mut() {
            shared.reset();
        }
    }

    /// The batches of one pass, in creation order.
    pub fn batches(&self, pass: RenderPassType) -> &[Batch] {
        self.batches.get(&pass).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The batches of one identifier, one per pass it participates in.
    pub fn batches_for(&self, identifier: BatchIdentifier) -> Vec<&Batch> {
        self.passes_by_identifier
            .get(&identifier)
            .into_iter()
            .flatten()
            .filter_map(|pass| self.batch(*pass, identifier))
            .collect()
    }

    /// The batch of an identifier in one pass.
    pub fn batch(&self, pass: RenderPassType, identifier: BatchIdentifier) -> Option<&Batch> {
        let i = self.index.get(&(pass, identifier))?;
        self.batches.get(&pass)?.get(*i)
    }

    /// Returns `true` if the pass has a batch for the identifier.
    pub fn contains(&self, pass: RenderPassType, identifier: BatchIdentifier) -> bool {
        self.index.contains_key(&(pass, identifier))
    }

    /// The identifier of a pair, if any batch of it is live.
    pub fn identifier_of(&self, mesh: MeshId, material: MaterialId) -> Option<BatchIdentifier> {
        self.context.identifiers().ok()?.lookup(mesh, material)
    }

    /// The shared resource of an identifier.
    pub fn shared_resource(&self, identifier: BatchIdentifier) -> Option<&BatchShaderResource> {
        self.shared.get(&identifier)
    }

    /// Updates the light packed into every shadow-pass batch's push constants.
    pub fn set_shadow_light(&mut self, light: &DirectionalLight) {
        let payload = ShadowPushConstants::from_light(light);
        let bytes = bytemuck::bytes_of(&payload);
        if let Some(batches) = self.batches.get_mut(&RenderPassType::Shadow) {
            for batch in batches {
                if let Some((_, data)) = batch.push_constants.as_mut() {
                    data.clear();
                    data.extend_from_slice(bytes);
                }
            }
        }
    }

    /// Points every batch using `old` at `new`. Returns the number of batches changed.
    pub fn replace_pipeline(&mut self, old: PipelineId, new: PipelineId) -> usize {
        let mut replaced = 0;
        for batch in self.batches.values_mut().flatten() {
            if batch.pipeline == old {
                batch.pipeline = new;
                replaced += 1;
            }
        }
        if replaced > 0 {
            log::debug!("Batcher: moved {replaced} batches from {old:?} to {new:?}");
        }
        replaced
    }

    /// Destroys every batch of an identifier and its shared resource.
    pub fn destroy_batches_for(&mut self, identifier: BatchIdentifier) -> Result<(), BatchError> {
        let Some(passes) = self.passes_by_identifier.remove(&identifier) else {
            log::error!("Batcher: no live batch uses identifier {identifier}");
            return Err(BatchError::UnknownIdentifier(identifier));
        };
        for pass in &passes {
            if let Some(i) = self.index.remove(&(*pass, identifier)) {
                if let Some(batches) = self.batches.get_mut(pass) {
                    batches.remove(i);
                    for (position, batch) in batches.iter().enumerate().skip(i) {
                        self.index.insert((*pass, batch.identifier), position);
                    }
                }
            }
        }
        if let Some(shared) = self.shared.remove(&identifier) {
            shared.destroy(&self.backend, &mut self.pool);
        }
        let mut registry = self.context.identifiers()?;
        for _ in &passes {
            registry.release(identifier)?;
        }
        log::debug!(
            "Batcher: destroyed {} batches of identifier {identifier}",
            passes.len()
        );
        Ok(())
    }

    /// Destroys every batch, for a scene switch or a swapchain image count change.
    ///
    /// Cached pipelines are kept.
    pub fn clear(&mut self) -> Result<(), BatchError> {
        let shared: Vec<_> = self.shared.drain().map(|(_, resource)| resource).collect();
        for resource in shared {
            resource.destroy(&self.backend, &mut self.pool);
        }
        let mut registry = self.context.identifiers()?;
        for batch in self.batches.values().flatten() {
            registry.release(batch.identifier)?;
        }
        drop(registry);
        let count = self.index.len();
        self.batches.clear();
        self.index.clear();
        self.passes_by_identifier.clear();
        log::info!("Batcher: cleared {count} batches");
        Ok(())
    }

    /// Counts of live batching objects.
    pub fn stats(&self) -> BatcherStats {
        BatcherStats {
            batches: self.index.len(),
            shared_resources: self.shared.len(),
            non_empty_batches: self
                .batches
                .values()
                .flatten()
                .filter(|b| !b.is_empty())
                .count(),
        }
    }

    /// Releases every batch, the cached pipelines and the descriptor pool.
    pub fn destroy(mut self) {
        if let Err(e) = self.clear() {
            log::warn!("Batcher: failed to clear batches on destroy: {e}");
        }
        self.pipelines.destroy();
        self.pool.destroy();
    }
}
