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

//! The GL-style immediate backend.
//!
//! There are no image layouts, so every transition is a no-op and any texture
//! may be sampled at any time. Descriptor "pools" are an unbounded registry of
//! binding tables, and the driver synchronizes frames implicitly.

use super::headless::{BackendFlavor, HeadlessBackend, RecordedCommand};
use vesper_core::renderer::api::*;
use vesper_core::renderer::CommandError;

/// Flavor marker for the GL-style backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

/// A headless GL-style backend.
pub type ImmediateBackend = HeadlessBackend<Immediate>;

impl BackendFlavor for Immediate {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Immediate
    }

    fn limits(&self) -> BackendLimits {
        BackendLimits {
            // GL_UNIFORM_BUFFER_OFFSET_ALIGNMENT is commonly 256 as well.
            min_uniform_buffer_offset_alignment: 256,
            // Push constants are emulated with a small uniform block.
            max_push_constant_size: 128,
            tracks_image_layouts: false,
            bounded_descriptor_pools: false,
        }
    }

    fn pool_capacity(&self, _requested: u32) -> Option<u32> {
        None
    }

    fn initial_layout(&self, _usage: TextureUsage) -> ImageLayout {
        ImageLayout::Undefined
    }

    fn barrier(
        &self,
        _texture: TextureId,
        _current: ImageLayout,
        _target: ImageLayout,
    ) -> Option<RecordedCommand> {
        None
    }

    fn check_sampled(&self, _texture: TextureId, _current: ImageLayout) -> Result<(), CommandError> {
        Ok(())
    }

    fn check_continued(
        &self,
        _texture: TextureId,
        _current: ImageLayout,
        _expected: ImageLayout,
    ) -> Result<(), CommandError> {
        Ok(())
    }

    fn uses_fences(&self) -> bool {
        false
    }
}
