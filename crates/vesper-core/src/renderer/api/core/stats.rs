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

//! Statistics for the rendering system.

/// Counters for a single rendered frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// A sequential counter for rendered frames.
    pub frame_number: u64,
    /// The number of draw calls recorded for the frame.
    pub draw_calls: u32,
    /// The number of batches that issued at least one draw.
    pub batches_drawn: u32,
    /// The number of render passes recorded.
    pub render_passes: u32,
    /// The total number of instances drawn.
    pub instances_drawn: u32,
    /// The total number of triangles submitted for the frame.
    pub triangles_rendered: u64,
}

impl RenderStats {
    /// Clears the per-frame counters, keeping the frame number.
    pub fn begin_frame(&mut self, frame_number: u64) {
        *self = Self {
            frame_number,
            ..Self::default()
        };
    }
}
