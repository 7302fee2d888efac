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

//! Settings for the render core.
//!
//! Both structs deserialize from RON with every field optional, falling back
//! to [`Default`].

use serde::{Deserialize, Serialize};

/// Fixed capacities used when a batch is created for each batch kind.
///
/// Batches never grow; a submission beyond these limits is a fatal error, so
/// they must be sized for the heaviest scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchCapacities {
    /// Instances per static batch.
    pub static_instances: u32,
    /// Skinned entities (draw repeats) per skinned batch.
    pub skinned_repeats: u32,
    /// Joint matrices per skinned entity.
    pub skinned_joints: u32,
    /// Tiles (draw repeats) per terrain batch.
    pub terrain_tiles: u32,
    /// Quads per GUI batch.
    pub gui_quads: u32,
}

impl Default for BatchCapacities {
    fn default() -> Self {
        Self {
            static_instances: 1024,
            skinned_repeats: 64,
            skinned_joints: 64,
            terrain_tiles: 256,
            gui_quads: 512,
        }
    }
}

/// A collection of settings that affect the rendering process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Width and height of the square shadow map.
    pub shadow_map_size: u32,
    /// Strength of the bloom term added by the screen composite.
    pub bloom_intensity: f32,
    /// Clear color of the scene color attachment.
    pub clear_color: [f32; 4],
    /// Batch capacities per kind.
    pub capacities: BatchCapacities,
    /// Size of each descriptor pool owned by the renderer.
    pub max_descriptor_sets: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: 2048,
            bloom_intensity: 0.35,
            clear_color: [0.05, 0.05, 0.08, 1.0],
            capacities: BatchCapacities::default(),
            max_descriptor_sets: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_falls_back_to_defaults() {
        let settings: RenderSettings =
            ron::from_str("(bloom_intensity: 0.5, capacities: (gui_quads: 16))").unwrap();
        assert_eq!(settings.bloom_intensity, 0.5);
        assert_eq!(settings.capacities.gui_quads, 16);
        assert_eq!(
            settings.capacities.static_instances,
            BatchCapacities::default().static_instances
        );
        assert_eq!(settings.shadow_map_size, 2048);
    }
}
