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

//! Descriptor set layouts, pools, sets and the resources bound through them.
//!
//! A descriptor set groups the buffers and textures a pipeline expects at one
//! binding slot. Sets are allocated from a pool against a layout and are
//! referenced by a `Copy` handle: copying a [`DescriptorSetId`] never creates a
//! second backend object.

use crate::renderer::api::resource::{BufferId, SamplerId, TextureId};
use crate::renderer::api::util::ShaderStageFlags;
use std::borrow::Cow;

/// An opaque handle to a descriptor set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetLayoutId(pub usize);

/// An opaque handle to a descriptor pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorPoolId(pub usize);

/// An opaque handle to an allocated descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorSetId(pub usize);

/// The kind of resource expected at a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// A uniform buffer bound at a fixed offset.
    UniformBuffer,
    /// A uniform buffer whose offset is supplied when the set is bound.
    DynamicUniformBuffer,
    /// A texture paired with a sampler.
    CombinedImageSampler,
}

/// One binding slot of a descriptor set layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorBinding {
    /// The binding index, matching the shader.
    pub binding: u32,
    /// The kind of resource at this binding.
    pub ty: DescriptorType,
    /// Shader stages that can see the binding.
    pub visibility: ShaderStageFlags,
}

/// A descriptor used to create a [`DescriptorSetLayoutId`].
#[derive(Debug, Clone)]
pub struct DescriptorSetLayoutDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The bindings of the layout.
    pub bindings: Cow<'a, [DescriptorBinding]>,
}

impl DescriptorSetLayoutDescriptor<'_> {
    /// Number of bindings that take a dynamic offset at bind time.
    pub fn dynamic_binding_count(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| b.ty == DescriptorType::DynamicUniformBuffer)
            .count()
    }
}

/// A resource bound to one binding of a descriptor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorComponent {
    /// A uniform buffer range.
    UniformBuffer {
        /// The buffer.
        buffer: BufferId,
        /// Start of the range in bytes.
        offset: u64,
        /// Length of the range in bytes.
        size: u64,
    },
    /// A uniform buffer range whose start moves with the bind-time dynamic offset.
    DynamicUniformBuffer {
        /// The buffer.
        buffer: BufferId,
        /// Length of one element in bytes.
        element_size: u64,
    },
    /// A sampled texture.
    CombinedImageSampler {
        /// The texture.
        texture: TextureId,
        /// The sampler.
        sampler: SamplerId,
    },
}

impl DescriptorComponent {
    /// The binding type this component satisfies.
    pub const fn descriptor_type(&self) -> DescriptorType {
        match self {
            DescriptorComponent::UniformBuffer { .. } => DescriptorType::UniformBuffer,
            DescriptorComponent::DynamicUniformBuffer { .. } => {
                DescriptorType::DynamicUniformBuffer
            }
            DescriptorComponent::CombinedImageSampler { .. } => {
                DescriptorType::CombinedImageSampler
            }
        }
    }

    /// The sampled texture, if this component is one.
    pub const fn texture(&self) -> Option<TextureId> {
        match self {
            DescriptorComponent::CombinedImageSampler { texture, .. } => Some(*texture),
            _ => None,
        }
    }
}

/// A descriptor used to create a [`DescriptorPoolId`].
#[derive(Debug, Clone)]
pub struct DescriptorPoolDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The maximum number of live sets. Backends without fixed pools may ignore it.
    pub max_sets: u32,
}
