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

//! Capabilities reported by a graphics backend.

/// Limits and capabilities of a graphics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendLimits {
    /// Required alignment, in bytes, of dynamic uniform buffer offsets.
    pub min_uniform_buffer_offset_alignment: u32,
    /// Largest push constant block a pipeline may declare.
    pub max_push_constant_size: u32,
    /// `true` if the backend tracks image layouts and records transitions.
    pub tracks_image_layouts: bool,
    /// `true` if descriptor pools have a fixed capacity.
    pub bounded_descriptor_pools: bool,
}

impl BackendLimits {
    /// Rounds `size` up to the dynamic uniform offset alignment.
    ///
    /// # Examples
    ///
    /// ```
    /// use vesper_core::renderer::api::BackendLimits;
    ///
    /// let limits = BackendLimits {
    ///     min_uniform_buffer_offset_alignment: 256,
    ///     max_push_constant_size: 128,
    ///     tracks_image_layouts: true,
    ///     bounded_descriptor_pools: true,
    /// };
    /// assert_eq!(limits.align_uniform(64), 256);
    /// assert_eq!(limits.align_uniform(300), 512);
    /// ```
    pub fn align_uniform(&self, size: u64) -> u64 {
        let alignment = u64::from(self.min_uniform_buffer_offset_alignment.max(1));
        size.div_ceil(alignment) * alignment
    }
}
