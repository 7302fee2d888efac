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

use anyhow::Result;
use std::sync::Arc;
use vesper_core::asset::{AssetRegistry, GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::math::{Extent2D, Mat4, Vec3};
use vesper_core::renderer::api::*;
use vesper_core::renderer::{GraphicsBackend, ResourceError};
use vesper_infra::{ExplicitBackend, HeadlessConfig, ImmediateBackend, RecordedCommand};
use vesper_lanes::{
    DescriptorPool, Drawable, FrameError, FrameOutcome, GuiQuad, MasterRenderer, PostStage,
    RenderContext, SceneView, SkinnedDrawable, StaticDrawable, TerrainTile, GUI_QUAD_MESH,
};

// --- Test Setup: a renderer and an asset registry with a few resident assets ---

const CUBE: MeshId = MeshId(7);
const STONE: MaterialId = MaterialId(3);
const GLASS: MaterialId = MaterialId(4);
const UI: MaterialId = MaterialId(5);

const PASS_ORDER: [&str; 7] = [
    "ShadowPass",
    "OpaquePass",
    "TransparentPass",
    "PostCopyPass",
    "PostBlurHorizontalPass",
    "PostBlurVerticalPass",
    "ScreenPass",
];

fn upload_mesh(backend: &dyn GraphicsBackend) -> Result<GpuMesh> {
    let vertices: [[f32; 3]; 4] = [
        [-1.0, 0.0, -1.0],
        [1.0, 0.0, -1.0],
        [1.0, 0.0, 1.0],
        [-1.0, 0.0, 1.0],
    ];
    let indices: [u16; 6] = [0, 1, 2, 0, 2, 3];
    let vertex_buffer = backend.create_buffer_with_data(
        &BufferDescriptor::for_elements(
            "plane vertices",
            12,
            vertices.len() as u64,
            BufferUsage::VERTEX | BufferUsage::COPY_DST,
            UpdateFrequency::Static,
        ),
        bytemuck::cast_slice(&vertices),
    )?;
    let index_buffer = backend.create_buffer_with_data(
        &BufferDescriptor::for_elements(
            "plane indices",
            IndexFormat::Uint16.size(),
            indices.len() as u64,
            BufferUsage::INDEX | BufferUsage::COPY_DST,
            UpdateFrequency::Static,
        ),
        bytemuck::cast_slice(&indices),
    )?;
    Ok(GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: indices.len() as u32,
        index_format: IndexFormat::Uint16,
        vertex_layout: VertexBufferLayout::packed(
            VertexStepMode::Vertex,
            0,
            &[VertexFormat::Float32x3],
        ),
    })
}

fn assets(backend: &dyn GraphicsBackend) -> Result<AssetRegistry> {
    let mut assets = AssetRegistry::new();
    assets.insert_mesh(CUBE, upload_mesh(backend)?);
    assets.insert_material(
        STONE,
        GpuMaterial {
            casts_shadows: true,
            ..Default::default()
        },
    );
    assets.insert_material(
        GLASS,
        GpuMaterial {
            transparent: true,
            ..Default::default()
        },
    );
    assets.insert_material(UI, GpuMaterial::default());
    Ok(assets)
}

fn renderer<B: GraphicsBackend + 'static>(
    backend: &Arc<B>,
    settings: RenderSettings,
) -> Result<MasterRenderer> {
    let context = RenderContext::new(backend.clone(), settings);
    Ok(MasterRenderer::new(&context)?)
}

fn stone_at(x: f32) -> Drawable<'static> {
    Drawable::Static(StaticDrawable {
        mesh: CUBE,
        material: STONE,
        transform: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
    })
}

fn quad() -> Drawable<'static> {
    Drawable::Gui(GuiQuad {
        material: UI,
        rect: [0.05, 0.05, 0.2, 0.1],
        uv_rect: [0.0, 0.0, 1.0, 1.0],
        color: [1.0, 1.0, 1.0, 0.8],
    })
}

fn render_frame(
    renderer: &mut MasterRenderer,
    assets: &AssetRegistry,
    drawables: &[Drawable<'_>],
) -> Result<FrameOutcome> {
    let outcome = renderer.begin_frame()?;
    if outcome != FrameOutcome::Began {
        return Ok(outcome);
    }
    for drawable in drawables {
        renderer.submit(assets, drawable)?;
    }
    Ok(renderer.render(&SceneView::default())?)
}

fn read_f32(data: &[u8]) -> f32 {
    bytemuck::pod_read_unaligned(data)
}

// --- Tests ---

#[test]
fn test_passes_are_recorded_in_order() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    let outcome = render_frame(&mut renderer, &assets, &[stone_at(0.0), quad()])?;
    assert_eq!(outcome, FrameOutcome::Presented);

    let submission = backend.last_submission().expect("a frame was submitted");
    assert_eq!(submission.pass_labels(), PASS_ORDER.to_vec());
    assert_eq!(renderer.stats().render_passes, 7);
    Ok(())
}

#[test]
fn test_shadow_caster_is_written_once_and_drawn_twice() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;

    renderer.begin_frame()?;
    let id = renderer.submit(&assets, &stone_at(1.0))?;
    assert_eq!(renderer.batcher().batches_for(id).len(), 2);
    assert_eq!(renderer.batcher().stats().shared_resources, 1);
    renderer.render(&SceneView::default())?;

    let batch = renderer
        .batcher()
        .batch(RenderPassType::Shadow, id)
        .expect("shadow batch");
    assert_eq!(backend.buffer_write_count(batch.instance_buffers()[0])?, 1);

    let submission = backend.last_submission().expect("a frame was submitted");
    for pass in ["ShadowPass", "OpaquePass"] {
        let commands = submission.pass_commands(pass).expect("pass recorded");
        let draws = commands
            .iter()
            .filter(|c| matches!(c, RecordedCommand::DrawIndexed { instance_count: 1, .. }))
            .count();
        assert_eq!(draws, 1, "{pass}");
    }
    Ok(())
}

#[test]
fn test_shadow_push_constants_precede_descriptor_binds() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    render_frame(&mut renderer, &assets, &[stone_at(0.0)])?;

    let submission = backend.last_submission().expect("a frame was submitted");
    let commands = submission.pass_commands("ShadowPass").expect("shadow pass");
    let push = commands
        .iter()
        .position(|c| matches!(c, RecordedCommand::PushConstants { .. }))
        .expect("push constants recorded");
    let bind = commands
        .iter()
        .position(|c| matches!(c, RecordedCommand::BindDescriptorSets { .. }))
        .expect("descriptor sets bound");
    assert!(push < bind);
    assert_eq!(submission.push_constants_in("ShadowPass")[0].len(), 16);
    Ok(())
}

#[test]
fn test_explicit_backend_records_layout_transitions() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    render_frame(&mut renderer, &assets, &[stone_at(0.0)])?;

    assert_eq!(
        backend.texture_layout(renderer.shadow_map())?,
        ImageLayout::ShaderReadOnly
    );
    assert_eq!(
        backend.texture_layout(renderer.scene_color())?,
        ImageLayout::ShaderReadOnly
    );
    let submission = backend.last_submission().expect("a frame was submitted");
    let to_present = submission
        .commands
        .iter()
        .filter(|c| {
            matches!(
                c,
                RecordedCommand::PipelineBarrier {
                    to: ImageLayout::PresentSrc,
                    ..
                }
            )
        })
        .count();
    assert_eq!(to_present, 1);
    assert!(submission.commands.iter().any(|c| matches!(
        c,
        RecordedCommand::PipelineBarrier { texture, to: ImageLayout::ShaderReadOnly, .. }
            if *texture == renderer.scene_color()
    )));
    Ok(())
}

#[test]
fn test_immediate_backend_records_no_barriers() -> Result<()> {
    let backend = Arc::new(ImmediateBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    render_frame(&mut renderer, &assets, &[stone_at(0.0), quad()])?;

    let submission = backend.last_submission().expect("a frame was submitted");
    assert_eq!(submission.pass_labels(), PASS_ORDER.to_vec());
    assert!(!submission
        .commands
        .iter()
        .any(|c| matches!(c, RecordedCommand::PipelineBarrier { .. })));
    Ok(())
}

#[test]
fn test_screen_stage_pushes_bloom_intensity() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let settings = RenderSettings {
        bloom_intensity: 0.5,
        ..Default::default()
    };
    let mut renderer = renderer(&backend, settings)?;
    let assets = assets(backend.as_ref())?;
    render_frame(&mut renderer, &assets, &[quad()])?;

    assert_eq!(renderer.post_processing().push_constants(PostStage::Screen), Some(0.5));
    let submission = backend.last_submission().expect("a frame was submitted");
    let pushed = submission.push_constants_in("ScreenPass");
    assert_eq!(pushed.len(), 1);
    assert_eq!(read_f32(pushed[0]), 0.5);

    renderer.set_bloom_intensity(1.25);
    render_frame(&mut renderer, &assets, &[quad()])?;
    let submission = backend.last_submission().expect("a frame was submitted");
    assert_eq!(read_f32(submission.push_constants_in("ScreenPass")[0]), 1.25);
    assert_eq!(renderer.post_processing().bloom_intensity(), 1.25);
    Ok(())
}

#[test]
fn test_blur_stages_push_half_resolution() -> Result<()> {
    let backend = Arc::new(ImmediateBackend::with_defaults()?);
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    let assets = assets(backend.as_ref())?;
    render_frame(&mut renderer, &assets, &[])?;

    let submission = backend.last_submission().expect("a frame was submitted");
    let horizontal = submission.push_constants_in("PostBlurHorizontalPass");
    let vertical = submission.push_constants_in("PostBlurVerticalPass");
    assert_eq!(read_f32(horizontal[0]), 640.0);
    assert_eq!(read_f32(vertical[0]), 360.0);
    assert!(submission.push_constants_in("PostCopyPass").is_empty());
    Ok(())
}

#[test]
fn test_resize_rebuilds_framebuffers_and_keeps_batches() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    render_frame(&mut renderer, &assets, &[stone_at(0.0), quad()])?;
    let before = renderer.batcher().stats();
    let stone = renderer
        .batcher()
        .identifier_of(CUBE, STONE)
        .expect("stone batch");
    let old_framebuffers = renderer.framebuffers(RenderPassType::Opaque);

    let extent = Extent2D::new(800, 600);
    backend.simulate_window_resize(extent);
    assert_eq!(renderer.begin_frame()?, FrameOutcome::Resized);
    assert!(backend.pending_resize().is_none());
    for framebuffer in &old_framebuffers {
        assert!(!backend.is_framebuffer_live(*framebuffer));
    }
    assert_eq!(renderer.batcher().stats().batches, before.batches);
    assert_eq!(renderer.batcher().identifier_of(CUBE, STONE), Some(stone));

    let outcome = render_frame(&mut renderer, &assets, &[stone_at(0.0), quad()])?;
    assert_eq!(outcome, FrameOutcome::Presented);
    assert_eq!(renderer.batcher().stats().batches, before.batches);
    for pass in [
        RenderPassType::Opaque,
        RenderPassType::Transparent,
        RenderPassType::Screen,
    ] {
        let framebuffers = renderer.framebuffers(pass);
        assert!(!framebuffers.is_empty());
        for framebuffer in framebuffers {
            assert_eq!(backend.framebuffer_extent(framebuffer)?, extent);
        }
    }
    assert_eq!(backend.texture_extent(renderer.scene_color())?, extent);
    let blur = renderer
        .post_processing()
        .pass(PostStage::BlurHorizontal)
        .expect("blur pass");
    assert_eq!(blur.extent(), Extent2D::new(400, 300));
    let submission = backend.last_submission().expect("a frame was submitted");
    assert_eq!(read_f32(submission.push_constants_in("PostBlurHorizontalPass")[0]), 400.0);
    Ok(())
}

#[test]
fn test_resize_between_submit_and_render_keeps_instances() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    assert_eq!(renderer.begin_frame()?, FrameOutcome::Began);
    renderer.submit(&assets, &stone_at(0.0))?;
    renderer.submit(&assets, &stone_at(2.0))?;
    let stone = renderer
        .batcher()
        .identifier_of(CUBE, STONE)
        .expect("stone batch");

    renderer.handle_resize(Extent2D::new(640, 360))?;
    let counts: Vec<u32> = renderer
        .batcher()
        .batches_for(stone)
        .iter()
        .map(|batch| batch.instance_count())
        .collect();
    // One batch in the shadow pass and one in the opaque pass.
    assert_eq!(counts, vec![2, 2]);
    assert_eq!(renderer.render(&SceneView::default())?, FrameOutcome::Presented);
    Ok(())
}

#[test]
fn test_format_change_rebuilds_screen_pipelines() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    render_frame(&mut renderer, &assets, &[stone_at(0.0), quad()])?;
    let gui = renderer
        .batcher()
        .identifier_of(GUI_QUAD_MESH, UI)
        .expect("gui batch");
    let gui_pipeline = |renderer: &MasterRenderer| {
        renderer
            .batcher()
            .batch(RenderPassType::Screen, gui)
            .map(|batch| batch.pipeline())
    };
    let old_pipeline = gui_pipeline(&renderer).expect("gui batch in the screen pass");
    let batches = renderer.batcher().stats().batches;

    backend.simulate_surface_change(3, TextureFormat::Rgba8UnormSrgb);
    assert_eq!(renderer.begin_frame()?, FrameOutcome::Resized);
    assert_eq!(backend.swapchain_format(), TextureFormat::Rgba8UnormSrgb);

    let new_pipeline = gui_pipeline(&renderer).expect("gui batch kept");
    assert_ne!(new_pipeline, old_pipeline);
    let screen_pass = renderer
        .pass(RenderPassType::Screen)
        .expect("screen pass")
        .render_pass();
    assert_eq!(backend.pipeline_render_pass(new_pipeline)?, screen_pass);
    assert!(backend.pipeline_render_pass(old_pipeline).is_err());
    assert_eq!(renderer.batcher().stats().batches, batches);

    let outcome = render_frame(&mut renderer, &assets, &[stone_at(0.0), quad()])?;
    assert_eq!(outcome, FrameOutcome::Presented);
    Ok(())
}

#[test]
fn test_image_count_change_clears_batches() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    render_frame(&mut renderer, &assets, &[stone_at(0.0), quad()])?;
    assert!(renderer.batcher().stats().batches > 0);

    backend.simulate_surface_change(2, backend.swapchain_format());
    assert_eq!(renderer.begin_frame()?, FrameOutcome::Resized);
    assert_eq!(backend.swapchain_images().len(), 2);
    assert_eq!(renderer.batcher().stats().batches, 0);
    assert_eq!(renderer.batcher().identifier_of(CUBE, STONE), None);

    for _ in 0..3 {
        let outcome = render_frame(&mut renderer, &assets, &[stone_at(0.0), quad()])?;
        assert_eq!(outcome, FrameOutcome::Presented);
    }
    assert!(renderer.batcher().identifier_of(CUBE, STONE).is_some());
    assert_eq!(renderer.framebuffers(RenderPassType::Screen).len(), 2);
    Ok(())
}

#[test]
fn test_shadow_map_survives_resize() -> Result<()> {
    let backend = Arc::new(ImmediateBackend::with_defaults()?);
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    let shadow_map = renderer.shadow_map();
    renderer.handle_resize(Extent2D::new(640, 480))?;
    assert_eq!(renderer.shadow_map(), shadow_map);
    assert_eq!(backend.texture_extent(shadow_map)?, Extent2D::new(2048, 2048));

    // A minimized window leaves everything in place.
    let scene_color = renderer.scene_color();
    renderer.handle_resize(Extent2D::new(0, 0))?;
    assert_eq!(renderer.scene_color(), scene_color);
    Ok(())
}

#[test]
fn test_every_batch_kind_renders_on_the_explicit_backend() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    let joints = [Mat4::IDENTITY; 4];
    let drawables = [
        stone_at(0.0),
        stone_at(2.0),
        Drawable::Skinned(SkinnedDrawable {
            mesh: CUBE,
            material: GLASS,
            transform: Mat4::IDENTITY,
            joints: &joints,
        }),
        Drawable::Terrain(TerrainTile {
            mesh: MeshId(8),
            material: STONE,
            transform: Mat4::IDENTITY,
            uv_offset_scale: [0.0, 0.0, 1.0, 1.0],
            height_scale: 4.0,
        }),
        quad(),
    ];
    let mut assets = assets;
    assets.insert_mesh(MeshId(8), upload_mesh(backend.as_ref())?);

    for _ in 0..3 {
        let outcome = render_frame(&mut renderer, &assets, &drawables)?;
        assert_eq!(outcome, FrameOutcome::Presented);
    }
    let stats = renderer.stats().clone();
    // Static: one instanced draw per pass. Skinned: transparent only.
    // Terrain: shadow and opaque. Gui: one. Post: four.
    assert_eq!(stats.draw_calls, 2 + 1 + 2 + 1 + 4);
    assert_eq!(stats.batches_drawn, 2 + 1 + 2 + 1);
    assert_eq!(backend.present_count(), 3);
    Ok(())
}

#[test]
fn test_missing_asset_is_reported() -> Result<()> {
    let backend = Arc::new(ImmediateBackend::with_defaults()?);
    let assets = AssetRegistry::new();
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    renderer.begin_frame()?;
    let err = renderer.submit(&assets, &stone_at(0.0)).unwrap_err();
    assert!(matches!(err, FrameError::Batch(_)));
    Ok(())
}

#[test]
fn test_surface_loss_is_a_swapchain_error() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::with_defaults()?);
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    backend.simulate_surface_loss();
    assert!(matches!(
        renderer.begin_frame(),
        Err(FrameError::Swapchain("acquire"))
    ));
    Ok(())
}

#[test]
fn test_frames_in_flight_follow_the_backend() -> Result<()> {
    let backend = Arc::new(ExplicitBackend::new(HeadlessConfig {
        frames_in_flight: 3,
        ..Default::default()
    })?);
    let assets = assets(backend.as_ref())?;
    let mut renderer = renderer(&backend, RenderSettings::default())?;
    let mut slots = Vec::new();
    for _ in 0..4 {
        slots.push(renderer.current_frame());
        render_frame(&mut renderer, &assets, &[stone_at(0.0)])?;
    }
    assert_eq!(slots, vec![0, 1, 2, 0]);
    let submissions = backend.submissions();
    let frame_indices: Vec<usize> = submissions.iter().map(|s| s.frame_index).collect();
    assert_eq!(frame_indices, vec![0, 1, 2, 0]);
    assert_ne!(renderer.scene_uniform_buffer(0), renderer.scene_uniform_buffer(1));
    Ok(())
}

#[test]
fn test_descriptor_pool_capacity_depends_on_backend() -> Result<()> {
    fn fill<B: GraphicsBackend + 'static>(backend: B, sets: usize) -> Result<Vec<bool>> {
        let backend: Arc<dyn GraphicsBackend> = Arc::new(backend);
        let layout = backend.create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
            label: Some("uniform layout".into()),
            bindings: std::borrow::Cow::Owned(vec![DescriptorBinding {
                binding: 0,
                ty: DescriptorType::UniformBuffer,
                visibility: ShaderStageFlags::VERTEX,
            }]),
        })?;
        let buffer = backend.create_buffer(&BufferDescriptor::for_elements(
            "uniform",
            64,
            1,
            BufferUsage::UNIFORM,
            UpdateFrequency::PerFrame,
        ))?;
        let component = [DescriptorComponent::UniformBuffer {
            buffer,
            offset: 0,
            size: 64,
        }];
        let mut pool = DescriptorPool::new(backend, "test pool", 2)?;
        let mut results = Vec::new();
        for _ in 0..sets {
            match pool.create_descriptor_set(layout, &component) {
                Ok(_) => results.push(true),
                Err(ResourceError::PoolExhausted { capacity: 2, .. }) => results.push(false),
                Err(e) => return Err(e.into()),
            }
        }
        assert_eq!(pool.len(), results.iter().filter(|ok| **ok).count());
        Ok(results)
    }

    assert_eq!(
        fill(ExplicitBackend::with_defaults()?, 3)?,
        vec![true, true, false]
    );
    assert_eq!(
        fill(ImmediateBackend::with_defaults()?, 3)?,
        vec![true, true, true]
    );
    Ok(())
}
