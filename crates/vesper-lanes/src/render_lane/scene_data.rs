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

//! Per-frame scene uniforms.

use bytemuck::{Pod, Zeroable};
use vesper_core::math::{Mat4, Vec3};
use vesper_core::renderer::{AmbientLight, DirectionalLight};

/// The camera a frame is rendered from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World-to-view transform.
    pub view: Mat4,
    /// View-to-clip transform.
    pub projection: Mat4,
    /// World-space position.
    pub position: Vec3,
}

impl Camera {
    /// A perspective camera at `eye` looking at `target`, with Y up.
    pub fn look_at(eye: Vec3, target: Vec3, fov_y_radians: f32, aspect_ratio: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y_radians, aspect_ratio, 0.1, 1000.0),
            position: eye,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, 60f32.to_radians(), 16.0 / 9.0)
    }
}

/// What the scene layer hands the renderer once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SceneView {
    /// The active camera.
    pub camera: Camera,
    /// The shadow-casting sun.
    pub light: DirectionalLight,
    /// Ambient lighting.
    pub ambient: AmbientLight,
    /// Seconds since the scene started.
    pub elapsed: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
}

/// The scene uniform block bound at set 0 of every 3D pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Scene3DData {
    /// Camera projection.
    pub projection: [[f32; 4]; 4],
    /// Camera view.
    pub view: [[f32; 4]; 4],
    /// View-projection of the shadow camera.
    pub light_space: [[f32; 4]; 4],
    /// Camera position, `w` unused.
    pub camera_position: [f32; 4],
    /// Ambient color premultiplied by intensity.
    pub ambient_color: [f32; 4],
    /// Direction towards which the light shines; `w` is 1 if it casts shadows.
    pub light_direction: [f32; 4],
    /// Light color premultiplied by intensity.
    pub light_color: [f32; 4],
    /// Shadow distance in `x`, reciprocal shadow map size in `y`.
    pub shadow_params: [f32; 4],
    /// Elapsed time in `x`, frame delta in `y`.
    pub time: [f32; 4],
}

impl Scene3DData {
    /// Fills the block for one frame.
    pub fn new(view: &SceneView, shadow_map_size: u32) -> Self {
        let light = &view.light;
        let direction = light.direction.normalize_or_zero();
        let ambient = view.ambient.color * view.ambient.intensity;
        let color = light.color * light.intensity;
        Self {
            projection: view.camera.projection.to_cols_array_2d(),
            view: view.camera.view.to_cols_array_2d(),
            light_space: shadow_view_projection(light, view.camera.position).to_cols_array_2d(),
            camera_position: view.camera.position.extend(1.0).to_array(),
            ambient_color: ambient.to_array(),
            light_direction: direction
                .extend(if light.casts_shadows() { 1.0 } else { 0.0 })
                .to_array(),
            light_color: color.to_array(),
            shadow_params: [
                light.shadow_distance,
                1.0 / shadow_map_size.max(1) as f32,
                0.0,
                0.0,
            ],
            time: [view.elapsed, view.delta, 0.0, 0.0],
        }
    }
}

/// The view-projection of the shadow camera.
///
/// The light looks at `center` from `shadow_distance` away, and the
/// orthographic box covers `shadow_distance` in every direction around it.
/// Identity if the light casts no shadows.
pub fn shadow_view_projection(light: &DirectionalLight, center: Vec3) -> Mat4 {
    if !light.casts_shadows() {
        return Mat4::IDENTITY;
    }
    let direction = light.direction.normalize_or_zero();
    if direction == Vec3::ZERO {
        return Mat4::IDENTITY;
    }
    let d = light.shadow_distance;
    let up = if direction.y.abs() > 0.99 { Vec3::Z } else { Vec3::Y };
    let eye = center - direction * d;
    let view = Mat4::look_at_rh(eye, center, up);
    let projection = Mat4::orthographic_rh(-d, d, -d, d, 0.0, 2.0 * d);
    projection * view
}
