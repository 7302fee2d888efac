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

use ahash::AHashSet;
use std::sync::Arc;
use vesper_core::renderer::api::*;
use vesper_core::renderer::{GraphicsBackend, ResourceError, ResourceKind};

/// Allocates descriptor sets from one backend pool and frees them in bulk.
///
/// Set handles are `Copy`; every copy names the same backend object, and
/// freeing a set invalidates all of its copies at once. On the explicit backend
/// the pool holds at most `max_sets` sets; the GL-style backend never runs out.
#[derive(Debug)]
pub struct DescriptorPool {
    backend: Arc<dyn GraphicsBackend>,
    id: DescriptorPoolId,
    label: String,
    max_sets: u32,
    live: AHashSet<DescriptorSetId>,
}

impl DescriptorPool {
    /// Creates a pool with room for `max_sets` sets.
    pub fn new(
        backend: Arc<dyn GraphicsBackend>,
        label: &str,
        max_sets: u32,
    ) -> Result<Self, ResourceError> {
        let id = backend.create_descriptor_pool(&DescriptorPoolDescriptor {
            label: Some(label.into()),
            max_sets,
        })?;
        log::debug!("DescriptorPool '{label}': created with room for {max_sets} sets");
        Ok(Self {
            backend,
            id,
            label: label.to_string(),
            max_sets,
            live: AHashSet::new(),
        })
    }

    /// Allocates a set for `layout` with one component per binding, in binding order.
    pub fn create_descriptor_set(
        &mut self,
        layout: DescriptorSetLayoutId,
        components: &[DescriptorComponent],
    ) -> Result<DescriptorSetId, ResourceError> {
        let set = self
            .backend
            .create_descriptor_set(self.id, layout, components)
            .map_err(|e| {
                log::error!("DescriptorPool '{}': failed to allocate a set: {e}", self.label);
                e
            })?;
        self.live.insert(set);
        Ok(set)
    }

    /// Allocates one set per component list, all with the same layout.
    pub fn create_descriptor_sets(
        &mut self,
        layout: DescriptorSetLayoutId,
        components: &[Vec<DescriptorComponent>],
    ) -> Result<Vec<DescriptorSetId>, ResourceError> {
        let mut sets = Vec::with_capacity(components.len());
        for list in components {
            match self.create_descriptor_set(layout, list) {
                Ok(set) => sets.push(set),
                Err(e) => {
                    // Leave the pool as it was before the call.
                    if let Err(free_err) = self.free_descriptor_sets(&sets) {
                        log::warn!(
                            "DescriptorPool '{}': failed to release partial allocation: {free_err}",
                            self.label
                        );
                    }
                    return Err(e);
                }
            }
        }
        Ok(sets)
    }

    /// Replaces the resource bound at one binding of a live set.
    pub fn update(
        &mut self,
        set: DescriptorSetId,
        binding: u32,
        component: &DescriptorComponent,
    ) -> Result<(), ResourceError> {
        self.require_live(set)?;
        self.backend
            .update_descriptor_set(self.id, set, binding, component)
    }

    /// Frees every set in `sets`.
    ///
    /// Either all sets are freed or, if any of them is not a live set of this
    /// pool, none are.
    pub fn free_descriptor_sets(&mut self, sets: &[DescriptorSetId]) -> Result<(), ResourceError> {
        for set in sets {
            self.require_live(*set)?;
        }
        self.backend.free_descriptor_sets(self.id, sets)?;
        for set in sets {
            self.live.remove(set);
        }
        log::trace!("DescriptorPool '{}': freed {} sets", self.label, sets.len());
        Ok(())
    }

    /// Returns `true` if the set was allocated here and not yet freed.
    pub fn contains(&self, set: DescriptorSetId) -> bool {
        self.live.contains(&set)
    }

    /// Number of live sets.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no set is live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// The capacity requested at creation.
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }

    /// The backend pool handle.
    pub fn id(&self) -> DescriptorPoolId {
        self.id
    }

    /// Destroys the pool and every set allocated from it.
    pub fn destroy(self) {
        if let Err(e) = self.backend.destroy_descriptor_pool(self.id) {
            log::warn!("DescriptorPool '{}': failed to destroy: {e}", self.label);
        }
    }

    fn require_live(&self, set: DescriptorSetId) -> Result<(), ResourceError> {
        if self.live.contains(&set) {
            Ok(())
        } else {
            log::error!(
                "DescriptorPool '{}': set {set:?} is not a live set of this pool",
                self.label
            );
            Err(ResourceError::NotFound {
                kind: ResourceKind::DescriptorSet,
                id: set.0,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use vesper_infra::{ExplicitBackend, ImmediateBackend};

    fn uniform_setup(
        backend: &Arc<dyn GraphicsBackend>,
    ) -> (DescriptorSetLayoutId, Vec<DescriptorComponent>) {
        let buffer = backend
            .create_buffer(&BufferDescriptor::for_elements(
                "uniform",
                256,
                1,
                BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                UpdateFrequency::PerFrame,
            ))
            .unwrap();
        let layout = backend
            .create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
                label: None,
                bindings: Cow::Owned(vec![DescriptorBinding {
                    binding: 0,
                    ty: DescriptorType::UniformBuffer,
                    visibility: ShaderStageFlags::VERTEX,
                }]),
            })
            .unwrap();
        (
            layout,
            vec![DescriptorComponent::UniformBuffer {
                buffer,
                offset: 0,
                size: 256,
            }],
        )
    }

    #[test]
    fn test_copies_alias_one_set() {
        let backend: Arc<dyn GraphicsBackend> = Arc::new(ImmediateBackend::with_defaults().unwrap());
        let (layout, components) = uniform_setup(&backend);
        let mut pool = DescriptorPool::new(backend, "test", 4).unwrap();
        let set = pool.create_descriptor_set(layout, &components).unwrap();
        let copy = set;
        pool.free_descriptor_sets(&[set]).unwrap();
        assert!(!pool.contains(copy));
        assert!(pool.free_descriptor_sets(&[copy]).is_err());
    }

    #[test]
    fn test_free_is_all_or_nothing() {
        let backend: Arc<dyn GraphicsBackend> = Arc::new(ImmediateBackend::with_defaults().unwrap());
        let (layout, components) = uniform_setup(&backend);
        let mut pool = DescriptorPool::new(backend, "test", 4).unwrap();
        let a = pool.create_descriptor_set(layout, &components).unwrap();
        let b = pool.create_descriptor_set(layout, &components).unwrap();
        pool.free_descriptor_sets(&[a]).unwrap();
        assert!(pool.free_descriptor_sets(&[b, a]).is_err());
        assert!(pool.contains(b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_explicit_pool_exhausts_and_rolls_back() {
        let backend: Arc<dyn GraphicsBackend> = Arc::new(ExplicitBackend::with_defaults().unwrap());
        let (layout, components) = uniform_setup(&backend);
        let mut pool = DescriptorPool::new(backend, "small", 2).unwrap();
        pool.create_descriptor_set(layout, &components).unwrap();
        let result = pool.create_descriptor_sets(layout, &[components.clone(), components.clone()]);
        assert!(matches!(
            result,
            Err(ResourceError::PoolExhausted { capacity: 2, .. })
        ));
        assert_eq!(pool.len(), 1);
        pool.create_descriptor_set(layout, &components).unwrap();
    }

    #[test]
    fn test_update_swaps_a_binding() {
        let backend: Arc<dyn GraphicsBackend> = Arc::new(ImmediateBackend::with_defaults().unwrap());
        let (layout, components) = uniform_setup(&backend);
        let mut pool = DescriptorPool::new(backend.clone(), "test", 4).unwrap();
        let set = pool.create_descriptor_set(layout, &components).unwrap();
        let other = backend
            .create_buffer(&BufferDescriptor::for_elements(
                "other",
                256,
                1,
                BufferUsage::UNIFORM,
                UpdateFrequency::Static,
            ))
            .unwrap();
        let replacement = DescriptorComponent::UniformBuffer {
            buffer: other,
            offset: 0,
            size: 256,
        };
        pool.update(set, 0, &replacement).unwrap();
        assert!(pool.update(DescriptorSetId(999), 0, &replacement).is_err());
    }
}
