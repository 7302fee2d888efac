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

//! Defines the light descriptors consumed by the render core.
//!
//! Lights are owned by the scene layer; the renderer only reads them when it
//! fills the per-frame scene uniforms and places the shadow camera.

use crate::math::{LinearRgba, Vec3};

/// A directional light source that illuminates from a uniform direction.
///
/// Directional lights simulate infinitely distant light sources like the sun.
/// The shadow pass renders from this light's point of view.
///
/// # Examples
///
/// ```
/// use vesper_core::renderer::light::DirectionalLight;
/// use vesper_core::math::{Vec3, Vec4};
///
/// let sun = DirectionalLight {
///     direction: Vec3::new(-0.5, -1.0, -0.3).normalize(),
///     color: Vec4::new(1.0, 0.95, 0.8, 1.0),
///     intensity: 1.0,
///     shadow_distance: 60.0,
/// };
/// assert!(sun.casts_shadows());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// The direction the light is pointing (normalized).
    pub direction: Vec3,
    /// The color of the light in linear RGB space.
    pub color: LinearRgba,
    /// The intensity multiplier for the light.
    pub intensity: f32,
    /// Half-size of the region around the camera covered by the shadow map.
    ///
    /// A value of zero disables shadows for this light.
    pub shadow_distance: f32,
}

impl DirectionalLight {
    /// Returns `true` if this light should render a shadow map.
    pub fn casts_shadows(&self) -> bool {
        self.shadow_distance > 0.0
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.0, -1.0, -0.5).normalize(),
            color: LinearRgba::ONE,
            intensity: 1.0,
            shadow_distance: 50.0,
        }
    }
}

/// Uniform ambient lighting applied to every lit surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    /// The color of the ambient term in linear RGB space.
    pub color: LinearRgba,
    /// The intensity multiplier.
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: LinearRgba::ONE,
            intensity: 0.1,
        }
    }
}
