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

//! The demo scene the runtime renders: a terrain, a grid of crates, an animated
//! figure and a HUD quad.

use anyhow::Result;
use vesper_core::asset::{AssetRegistry, GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::math::{Mat4, Quat, Vec3};
use vesper_core::renderer::api::*;
use vesper_core::renderer::{DirectionalLight, GraphicsBackend};
use vesper_lanes::{
    Camera, Drawable, GuiQuad, SceneView, SkinnedDrawable, StaticDrawable, TerrainTile,
};

const CUBE: MeshId = MeshId(1);
const TILE: MeshId = MeshId(2);
const FIGURE: MeshId = MeshId(3);

const CRATE: MaterialId = MaterialId(1);
const GROUND: MaterialId = MaterialId(2);
const GHOST: MaterialId = MaterialId(3);
const HUD: MaterialId = MaterialId(4);

const GRID: i32 = 4;
const TERRAIN_TILES: i32 = 3;
const JOINTS: usize = 8;

/// Resident assets and the per-frame state of the demo.
pub struct DemoScene {
    assets: AssetRegistry,
    joints: Vec<Mat4>,
}

fn upload_mesh(
    backend: &dyn GraphicsBackend,
    label: &str,
    vertices: &[[f32; 3]],
    indices: &[u32],
) -> Result<GpuMesh> {
    let vertex_buffer = backend.create_buffer_with_data(
        &BufferDescriptor::for_elements(
            format!("{label} vertices"),
            12,
            vertices.len() as u64,
            BufferUsage::VERTEX | BufferUsage::COPY_DST,
            UpdateFrequency::Static,
        ),
        bytemuck::cast_slice(vertices),
    )?;
    let index_buffer = backend.create_buffer_with_data(
        &BufferDescriptor::for_elements(
            format!("{label} indices"),
            IndexFormat::Uint32.size(),
            indices.len() as u64,
            BufferUsage::INDEX | BufferUsage::COPY_DST,
            UpdateFrequency::Static,
        ),
        bytemuck::cast_slice(indices),
    )?;
    Ok(GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: indices.len() as u32,
        index_format: IndexFormat::Uint32,
        vertex_layout: VertexBufferLayout::packed(
            VertexStepMode::Vertex,
            0,
            &[VertexFormat::Float32x3],
        ),
    })
}

fn cube() -> (Vec<[f32; 3]>, Vec<u32>) {
    let vertices = (0..8)
        .map(|i| {
            [
                if i & 1 == 0 { -0.5 } else { 0.5 },
                if i & 2 == 0 { -0.5 } else { 0.5 },
                if i & 4 == 0 { -0.5 } else { 0.5 },
            ]
        })
        .collect();
    let indices = vec![
        0, 2, 3, 0, 3, 1, 4, 5, 7, 4, 7, 6, 0, 1, 5, 0, 5, 4, 2, 6, 7, 2, 7, 3, 0, 4, 6, 0, 6,
        2, 1, 3, 7, 1, 7, 5,
    ];
    (vertices, indices)
}

fn plane() -> (Vec<[f32; 3]>, Vec<u32>) {
    (
        vec![
            [-0.5, 0.0, -0.5],
            [0.5, 0.0, -0.5],
            [0.5, 0.0, 0.5],
            [-0.5, 0.0, 0.5],
        ],
        vec![0, 2, 1, 0, 3, 2],
    )
}

impl DemoScene {
    /// Uploads the demo meshes and registers the materials.
    pub fn load(backend: &dyn GraphicsBackend) -> Result<Self> {
        let mut assets = AssetRegistry::new();
        let (vertices, indices) = cube();
        assets.insert_mesh(CUBE, upload_mesh(backend, "cube", &vertices, &indices)?);
        assets.insert_mesh(FIGURE, upload_mesh(backend, "figure", &vertices, &indices)?);
        let (vertices, indices) = plane();
        assets.insert_mesh(TILE, upload_mesh(backend, "terrain tile", &vertices, &indices)?);

        assets.insert_material(
            CRATE,
            GpuMaterial {
                casts_shadows: true,
                ..Default::default()
            },
        );
        assets.insert_material(GROUND, GpuMaterial::default());
        assets.insert_material(
            GHOST,
            GpuMaterial {
                transparent: true,
                high_detail: true,
                ..Default::default()
            },
        );
        assets.insert_material(HUD, GpuMaterial::default());
        log::info!("DemoScene: loaded 3 meshes and 4 materials");
        Ok(Self {
            assets,
            joints: vec![Mat4::IDENTITY; JOINTS],
        })
    }

    /// The asset source submissions are resolved against.
    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    /// Advances the animation to `time` seconds.
    pub fn update(&mut self, time: f32) {
        for (i, joint) in self.joints.iter_mut().enumerate() {
            let phase = time * 2.0 + i as f32 * 0.4;
            *joint = Mat4::from_rotation_z(phase.sin() * 0.3);
        }
    }

    /// The camera, lights and timing of the frame.
    pub fn view(&self, time: f32, delta: f32, aspect_ratio: f32) -> SceneView {
        let eye = Vec3::new(time.cos() * 12.0, 6.0, time.sin() * 12.0);
        SceneView {
            camera: Camera::look_at(eye, Vec3::ZERO, 60f32.to_radians(), aspect_ratio),
            light: DirectionalLight {
                direction: Vec3::new(-0.4, -1.0, -0.3),
                shadow_distance: 30.0,
                ..Default::default()
            },
            ambient: Default::default(),
            elapsed: time,
            delta,
        }
    }

    /// Everything drawn this frame.
    pub fn drawables(&self, time: f32) -> Vec<Drawable<'_>> {
        let mut drawables = Vec::new();
        for x in 0..TERRAIN_TILES {
            for z in 0..TERRAIN_TILES {
                let offset = Vec3::new((x - 1) as f32 * 16.0, 0.0, (z - 1) as f32 * 16.0);
                let step = 1.0 / TERRAIN_TILES as f32;
                drawables.push(Drawable::Terrain(TerrainTile {
                    mesh: TILE,
                    material: GROUND,
                    transform: Mat4::from_scale_rotation_translation(
                        Vec3::new(16.0, 1.0, 16.0),
                        Quat::IDENTITY,
                        offset,
                    ),
                    uv_offset_scale: [x as f32 * step, z as f32 * step, step, step],
                    height_scale: 2.0,
                }));
            }
        }
        for x in -GRID / 2..GRID / 2 {
            for z in -GRID / 2..GRID / 2 {
                let spin = Quat::from_rotation_y(time + (x * GRID + z) as f32 * 0.25);
                drawables.push(Drawable::Static(StaticDrawable {
                    mesh: CUBE,
                    material: CRATE,
                    transform: Mat4::from_rotation_translation(
                        spin,
                        Vec3::new(x as f32 * 2.5, 0.5, z as f32 * 2.5),
                    ),
                }));
            }
        }
        drawables.push(Drawable::Skinned(SkinnedDrawable {
            mesh: FIGURE,
            material: GHOST,
            transform: Mat4::from_translation(Vec3::new(0.0, 1.5, 0.0)),
            joints: &self.joints,
        }));
        drawables.push(Drawable::Gui(GuiQuad {
            material: HUD,
            rect: [0.02, 0.02, 0.25, 0.06],
            uv_rect: [0.0, 0.0, 1.0, 1.0],
            color: [1.0, 1.0, 1.0, 0.85],
        }));
        drawables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_indices_are_in_range() {
        let (vertices, indices) = cube();
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|i| (*i as usize) < vertices.len()));
    }

    #[test]
    fn test_frame_contents() {
        let backend = vesper_infra::ImmediateBackend::with_defaults().unwrap();
        let scene = DemoScene::load(&backend).unwrap();
        let drawables = scene.drawables(0.0);
        let count = |pred: fn(&Drawable<'_>) -> bool| drawables.iter().filter(|d| pred(d)).count();
        assert_eq!(count(|d| matches!(d, Drawable::Terrain(_))), 9);
        assert_eq!(count(|d| matches!(d, Drawable::Static(_))), 16);
        assert_eq!(count(|d| matches!(d, Drawable::Skinned(_))), 1);
        assert_eq!(count(|d| matches!(d, Drawable::Gui(_))), 1);
    }
}
