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

//! The explicit-API backend.
//!
//! Models a Vulkan-style API: every image has a layout that must be
//! transitioned with a barrier before it is used differently, each frame slot
//! has a fence the CPU waits on before reusing the slot, and descriptor pools
//! are created with a fixed number of sets.

use super::headless::{BackendFlavor, HeadlessBackend, RecordedCommand};
use vesper_core::renderer::api::*;
use vesper_core::renderer::CommandError;

/// Dynamic uniform offsets must be multiples of this many bytes.
const UNIFORM_OFFSET_ALIGNMENT: u32 = 256;
/// The guaranteed minimum push constant size of explicit APIs.
const MAX_PUSH_CONSTANT_SIZE: u32 = 128;

/// Flavor marker for the explicit-API backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct Explicit;

/// A headless explicit-API backend.
pub type ExplicitBackend = HeadlessBackend<Explicit>;

impl BackendFlavor for Explicit {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Explicit
    }

    fn limits(&self) -> BackendLimits {
        BackendLimits {
            min_uniform_buffer_offset_alignment: UNIFORM_OFFSET_ALIGNMENT,
            max_push_constant_size: MAX_PUSH_CONSTANT_SIZE,
            tracks_image_layouts: true,
            bounded_descriptor_pools: true,
        }
    }

    fn pool_capacity(&self, requested: u32) -> Option<u32> {
        Some(requested)
    }

    fn initial_layout(&self, usage: TextureUsage) -> ImageLayout {
        // Textures that are never rendered to are uploaded at creation and left sampleable.
        if usage.contains(TextureUsage::RENDER_ATTACHMENT) {
            ImageLayout::Undefined
        } else {
            ImageLayout::ShaderReadOnly
        }
    }

    fn barrier(
        &self,
        texture: TextureId,
        current: ImageLayout,
        target: ImageLayout,
    ) -> Option<RecordedCommand> {
        (current != target).then_some(RecordedCommand::PipelineBarrier {
            texture,
            from: current,
            to: target,
        })
    }

    fn check_sampled(&self, texture: TextureId, current: ImageLayout) -> Result<(), CommandError> {
        if current == ImageLayout::ShaderReadOnly {
            Ok(())
        } else {
            Err(CommandError::InvalidImageLayout {
                texture,
                expected: ImageLayout::ShaderReadOnly,
                actual: current,
            })
        }
    }

    fn check_continued(
        &self,
        texture: TextureId,
        current: ImageLayout,
        expected: ImageLayout,
    ) -> Result<(), CommandError> {
        if current == ImageLayout::Undefined {
            Err(CommandError::InvalidImageLayout {
                texture,
                expected,
                actual: current,
            })
        } else {
            Ok(())
        }
    }

    fn uses_fences(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_only_when_layout_changes() {
        let flavor = Explicit;
        assert!(flavor
            .barrier(
                TextureId(0),
                ImageLayout::ColorAttachment,
                ImageLayout::ColorAttachment
            )
            .is_none());
        assert_eq!(
            flavor.barrier(
                TextureId(0),
                ImageLayout::ColorAttachment,
                ImageLayout::ShaderReadOnly
            ),
            Some(RecordedCommand::PipelineBarrier {
                texture: TextureId(0),
                from: ImageLayout::ColorAttachment,
                to: ImageLayout::ShaderReadOnly,
            })
        );
    }

    #[test]
    fn test_sampling_requires_shader_read_only() {
        let flavor = Explicit;
        assert!(flavor
            .check_sampled(TextureId(1), ImageLayout::ShaderReadOnly)
            .is_ok());
        assert!(matches!(
            flavor.check_sampled(TextureId(1), ImageLayout::ColorAttachment),
            Err(CommandError::InvalidImageLayout { .. })
        ));
    }

    #[test]
    fn test_uploaded_textures_start_sampleable() {
        let flavor = Explicit;
        assert_eq!(
            flavor.initial_layout(TextureUsage::SAMPLED | TextureUsage::COPY_DST),
            ImageLayout::ShaderReadOnly
        );
        assert_eq!(
            flavor.initial_layout(TextureUsage::SAMPLED | TextureUsage::RENDER_ATTACHMENT),
            ImageLayout::Undefined
        );
    }
}
