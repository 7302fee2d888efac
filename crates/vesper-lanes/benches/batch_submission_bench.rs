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

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use vesper_core::asset::{AssetRegistry, GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::math::{Mat4, Vec3};
use vesper_core::renderer::api::*;
use vesper_core::renderer::GraphicsBackend;
use vesper_infra::ImmediateBackend;
use vesper_lanes::{Drawable, MasterRenderer, RenderContext, SceneView, StaticDrawable};

const MESHES: u32 = 16;
const MATERIALS: u32 = 4;

fn setup() -> (MasterRenderer, AssetRegistry) {
    let backend = Arc::new(ImmediateBackend::with_defaults().unwrap());
    let context = RenderContext::new(backend.clone(), RenderSettings::default());
    let renderer = MasterRenderer::new(&context).unwrap();

    let mut assets = AssetRegistry::new();
    for mesh in 0..MESHES {
        let vertices = backend
            .create_buffer_with_data(
                &BufferDescriptor::for_elements(
                    "bench vertices",
                    12,
                    3,
                    BufferUsage::VERTEX,
                    UpdateFrequency::Static,
                ),
                &[0; 36],
            )
            .unwrap();
        let indices = backend
            .create_buffer_with_data(
                &BufferDescriptor::for_elements(
                    "bench indices",
                    4,
                    3,
                    BufferUsage::INDEX,
                    UpdateFrequency::Static,
                ),
                bytemuck::cast_slice(&[0u32, 1, 2]),
            )
            .unwrap();
        assets.insert_mesh(
            MeshId(mesh),
            GpuMesh {
                vertex_buffer: vertices,
                index_buffer: indices,
                index_count: 3,
                index_format: IndexFormat::Uint32,
                vertex_layout: VertexBufferLayout::packed(
                    VertexStepMode::Vertex,
                    0,
                    &[VertexFormat::Float32x3],
                ),
            },
        );
    }
    for material in 0..MATERIALS {
        assets.insert_material(
            MaterialId(material),
            GpuMaterial {
                casts_shadows: material % 2 == 0,
                ..Default::default()
            },
        );
    }
    (renderer, assets)
}

fn drawables(count: u32) -> Vec<Drawable<'static>> {
    (0..count)
        .map(|i| {
            Drawable::Static(StaticDrawable {
                mesh: MeshId(i % MESHES),
                material: MaterialId(i % MATERIALS),
                transform: Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0)),
            })
        })
        .collect()
}

fn bench_submission(c: &mut Criterion) {
    let (mut renderer, assets) = setup();
    let scene = SceneView::default();

    let mut group = c.benchmark_group("Batch Submission");

    for count in [64u32, 512] {
        let frame = drawables(count);
        group.bench_function(format!("Submit and render {count} static drawables"), |b| {
            b.iter(|| {
                renderer.begin_frame().unwrap();
                for drawable in &frame {
                    black_box(renderer.submit(&assets, drawable).unwrap());
                }
                black_box(renderer.render(&scene).unwrap());
            });
        });
    }

    group.bench_function("Reset 64 live batches", |b| {
        b.iter(|| {
            renderer.batcher_mut().reset_for_next_frame();
            black_box(renderer.batcher().stats());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_submission);
criterion_main!(benches);
