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
use std::borrow::Cow;
use vesper_core::math::Extent2D;
use vesper_core::renderer::api::*;
use vesper_core::renderer::{CommandError, GraphicsBackend, ResourceError};
use vesper_infra::{
    create_backend, ExplicitBackend, HeadlessConfig, ImmediateBackend, RecordedCommand,
};

// --- Test Setup: an offscreen pass sampled by an onscreen pass ---

struct Scene {
    offscreen_pass: RenderPassId,
    screen_pass: RenderPassId,
    target: TextureId,
    offscreen_fb: FramebufferId,
    screen_fbs: Vec<FramebufferId>,
    offscreen_pipeline: PipelineId,
    screen_pipeline: PipelineId,
    sampled_set: DescriptorSetId,
    pool: DescriptorPoolId,
    layout: DescriptorSetLayoutId,
}

fn build_scene(backend: &dyn GraphicsBackend) -> Result<Scene> {
    let extent = backend.extent();
    let target = backend.create_texture(&TextureDescriptor {
        label: Some("scene color".into()),
        size: extent,
        format: TextureFormat::Rgba16Float,
        usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED,
    })?;
    let offscreen_pass = backend.create_render_pass(&RenderPassDescriptor {
        label: Some("Offscreen".into()),
        attachments: Cow::Owned(vec![AttachmentDescriptor::cleared(
            TextureFormat::Rgba16Float,
            AttachmentFinalUsage::Sampled,
        )]),
        offscreen: true,
    })?;
    let screen_pass = backend.create_render_pass(&RenderPassDescriptor {
        label: Some("Screen".into()),
        attachments: Cow::Owned(vec![AttachmentDescriptor::cleared(
            backend.swapchain_format(),
            AttachmentFinalUsage::Present,
        )]),
        offscreen: false,
    })?;
    let offscreen_fb = backend.create_framebuffer(&FramebufferDescriptor {
        label: Some("offscreen fb".into()),
        render_pass: offscreen_pass,
        attachments: Cow::Owned(vec![target]),
        extent,
    })?;
    let screen_fbs = backend
        .swapchain_images()
        .into_iter()
        .map(|image| {
            backend.create_framebuffer(&FramebufferDescriptor {
                label: Some("screen fb".into()),
                render_pass: screen_pass,
                attachments: Cow::Owned(vec![image]),
                extent,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let vs = backend.create_shader(&ShaderDescriptor {
        name: "FullscreenVertexShader".into(),
        stage: ShaderStage::Vertex,
    })?;
    let fs = backend.create_shader(&ShaderDescriptor {
        name: "CompositeFragmentShader".into(),
        stage: ShaderStage::Fragment,
    })?;
    let layout = backend.create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
        label: Some("sampled".into()),
        bindings: Cow::Owned(vec![DescriptorBinding {
            binding: 0,
            ty: DescriptorType::CombinedImageSampler,
            visibility: ShaderStageFlags::FRAGMENT,
        }]),
    })?;
    let offscreen_pipeline = backend.create_pipeline(&PipelineDescriptor {
        label: Some("offscreen".into()),
        vertex_shader: vs,
        fragment_shader: Some(fs),
        vertex_buffers: Cow::Owned(vec![]),
        set_layouts: Cow::Owned(vec![]),
        push_constant_range: None,
        render_pass: offscreen_pass,
        depth: DepthState::DISABLED,
        blend: BlendMode::Opaque,
        cull_mode: CullMode::None,
    })?;
    let screen_pipeline = backend.create_pipeline(&PipelineDescriptor {
        label: Some("screen".into()),
        vertex_shader: vs,
        fragment_shader: Some(fs),
        vertex_buffers: Cow::Owned(vec![]),
        set_layouts: Cow::Owned(vec![layout]),
        push_constant_range: Some(PushConstantRange {
            stages: ShaderStageFlags::FRAGMENT,
            size: 4,
        }),
        render_pass: screen_pass,
        depth: DepthState::DISABLED,
        blend: BlendMode::Opaque,
        cull_mode: CullMode::None,
    })?;
    let sampler = backend.create_sampler(&SamplerDescriptor::default())?;
    let pool = backend.create_descriptor_pool(&DescriptorPoolDescriptor {
        label: Some("test pool".into()),
        max_sets: 2,
    })?;
    let sampled_set = backend.create_descriptor_set(
        pool,
        layout,
        &[DescriptorComponent::CombinedImageSampler {
            texture: target,
            sampler,
        }],
    )?;
    Ok(Scene {
        offscreen_pass,
        screen_pass,
        target,
        offscreen_fb,
        screen_fbs,
        offscreen_pipeline,
        screen_pipeline,
        sampled_set,
        pool,
        layout,
    })
}

fn record_frame(
    backend: &dyn GraphicsBackend,
    scene: &Scene,
    command_buffer: CommandBufferId,
    image_index: u32,
) -> Result<CommandBufferId> {
    let clear = [ClearValue::Color([0.0, 0.0, 0.0, 1.0])];
    let viewport = Viewport::from_extent(backend.extent());
    let mut recorder = backend.begin_command_buffer(command_buffer)?;
    recorder.begin_render_pass(&RenderPassBeginInfo {
        render_pass: scene.offscreen_pass,
        framebuffer: scene.offscreen_fb,
        clear_values: &clear,
    })?;
    recorder.bind_pipeline(scene.offscreen_pipeline)?;
    recorder.set_viewport(&viewport)?;
    recorder.draw(3, 1)?;
    recorder.end_render_pass()?;

    recorder.begin_render_pass(&RenderPassBeginInfo {
        render_pass: scene.screen_pass,
        framebuffer: scene.screen_fbs[image_index as usize],
        clear_values: &clear,
    })?;
    recorder.bind_pipeline(scene.screen_pipeline)?;
    recorder.push_constants(ShaderStageFlags::FRAGMENT, &0.5f32.to_ne_bytes())?;
    recorder.bind_descriptor_sets(0, &[scene.sampled_set], &[])?;
    recorder.draw(3, 1)?;
    recorder.end_render_pass()?;
    Ok(recorder.finish()?)
}

#[test]
fn test_explicit_frame_transitions_layouts() -> Result<()> {
    let backend = ExplicitBackend::with_defaults()?;
    let scene = build_scene(&backend)?;
    let pool = backend.create_command_pool("frame")?;
    let cb = backend.allocate_command_buffers(pool, 1)?[0];

    let acquired = backend.acquire_image(0);
    assert_eq!(acquired.status, SwapchainStatus::Success);
    record_frame(&backend, &scene, cb, acquired.image_index)?;
    backend.submit(&[cb], 0)?;

    assert_eq!(
        backend.texture_layout(scene.target)?,
        ImageLayout::ShaderReadOnly
    );
    let image = backend.swapchain_images()[acquired.image_index as usize];
    assert_eq!(backend.texture_layout(image)?, ImageLayout::PresentSrc);
    assert_eq!(backend.present(acquired.image_index), SwapchainStatus::Success);

    let submission = backend.last_submission().expect("a submission");
    assert_eq!(submission.pass_labels(), vec!["Offscreen", "Screen"]);
    let barriers = submission
        .commands
        .iter()
        .filter(|c| matches!(c, RecordedCommand::PipelineBarrier { .. }))
        .count();
    // Undefined -> Color, Color -> ShaderRead, Undefined -> Color, Color -> Present.
    assert_eq!(barriers, 4);
    Ok(())
}

#[test]
fn test_immediate_frame_records_no_barriers() -> Result<()> {
    let backend = ImmediateBackend::with_defaults()?;
    let scene = build_scene(&backend)?;
    let pool = backend.create_command_pool("frame")?;
    let cb = backend.allocate_command_buffers(pool, 1)?[0];

    let acquired = backend.acquire_image(0);
    record_frame(&backend, &scene, cb, acquired.image_index)?;
    backend.submit(&[cb], 0)?;
    assert_eq!(backend.present(acquired.image_index), SwapchainStatus::Success);

    let submission = backend.last_submission().expect("a submission");
    assert!(!submission
        .commands
        .iter()
        .any(|c| matches!(c, RecordedCommand::PipelineBarrier { .. })));
    assert_eq!(submission.draw_count(), 2);
    Ok(())
}

#[test]
fn test_explicit_rejects_sampling_before_render() -> Result<()> {
    let backend = ExplicitBackend::with_defaults()?;
    let scene = build_scene(&backend)?;
    let pool = backend.create_command_pool("frame")?;
    let cb = backend.allocate_command_buffers(pool, 1)?[0];
    let clear = [ClearValue::Color([0.0; 4])];

    let mut recorder = backend.begin_command_buffer(cb)?;
    recorder.begin_render_pass(&RenderPassBeginInfo {
        render_pass: scene.screen_pass,
        framebuffer: scene.screen_fbs[0],
        clear_values: &clear,
    })?;
    recorder.bind_pipeline(scene.screen_pipeline)?;
    recorder.push_constants(ShaderStageFlags::FRAGMENT, &1.0f32.to_ne_bytes())?;
    let result = recorder.bind_descriptor_sets(0, &[scene.sampled_set], &[]);
    assert!(matches!(
        result,
        Err(CommandError::InvalidImageLayout {
            actual: ImageLayout::Undefined,
            ..
        })
    ));
    Ok(())
}

#[test]
fn test_descriptor_sets_require_push_constants_first() -> Result<()> {
    let backend = ImmediateBackend::with_defaults()?;
    let scene = build_scene(&backend)?;
    let pool = backend.create_command_pool("frame")?;
    let cb = backend.allocate_command_buffers(pool, 1)?[0];
    let clear = [ClearValue::Color([0.0; 4])];

    let mut recorder = backend.begin_command_buffer(cb)?;
    recorder.begin_render_pass(&RenderPassBeginInfo {
        render_pass: scene.screen_pass,
        framebuffer: scene.screen_fbs[0],
        clear_values: &clear,
    })?;
    recorder.bind_pipeline(scene.screen_pipeline)?;
    let result = recorder.bind_descriptor_sets(0, &[scene.sampled_set], &[]);
    assert!(matches!(
        result,
        Err(CommandError::PushConstantsRequired { .. })
    ));
    Ok(())
}

#[test]
fn test_explicit_pool_is_bounded_immediate_is_not() -> Result<()> {
    let explicit = ExplicitBackend::with_defaults()?;
    let scene = build_scene(&explicit)?;
    let sampler = explicit.create_sampler(&SamplerDescriptor::default())?;
    let component = [DescriptorComponent::CombinedImageSampler {
        texture: scene.target,
        sampler,
    }];
    // The pool holds two sets and one is taken by the scene.
    explicit.create_descriptor_set(scene.pool, scene.layout, &component)?;
    let exhausted = explicit.create_descriptor_set(scene.pool, scene.layout, &component);
    assert!(matches!(
        exhausted,
        Err(ResourceError::PoolExhausted { capacity: 2, .. })
    ));

    let immediate = ImmediateBackend::with_defaults()?;
    let scene = build_scene(&immediate)?;
    let sampler = immediate.create_sampler(&SamplerDescriptor::default())?;
    let component = [DescriptorComponent::CombinedImageSampler {
        texture: scene.target,
        sampler,
    }];
    for _ in 0..16 {
        immediate.create_descriptor_set(scene.pool, scene.layout, &component)?;
    }
    Ok(())
}

#[test]
fn test_freeing_sets_is_atomic() -> Result<()> {
    let backend = ExplicitBackend::with_defaults()?;
    let scene = build_scene(&backend)?;
    let bogus = DescriptorSetId(9999);
    let result = backend.free_descriptor_sets(scene.pool, &[scene.sampled_set, bogus]);
    assert!(result.is_err());
    assert!(backend.is_descriptor_set_live(scene.sampled_set));

    backend.free_descriptor_sets(scene.pool, &[scene.sampled_set])?;
    assert!(!backend.is_descriptor_set_live(scene.sampled_set));
    Ok(())
}

#[test]
fn test_fences_wait_only_on_reused_slots() -> Result<()> {
    let backend = ExplicitBackend::new(HeadlessConfig {
        frames_in_flight: 2,
        ..HeadlessConfig::default()
    })?;
    let scene = build_scene(&backend)?;
    let pool = backend.create_command_pool("frames")?;
    let cbs = backend.allocate_command_buffers(pool, 2)?;

    for frame in 0..4usize {
        let slot = frame % 2;
        let acquired = backend.acquire_image(slot);
        assert_eq!(acquired.status, SwapchainStatus::Success);
        record_frame(&backend, &scene, cbs[slot], acquired.image_index)?;
        backend.submit(&[cbs[slot]], slot)?;
        backend.present(acquired.image_index);
    }
    // Frames 2 and 3 reuse slots 0 and 1, each waiting on the earlier submission.
    assert_eq!(backend.fence_waits(), 2);
    assert_eq!(backend.present_count(), 4);
    Ok(())
}

#[test]
fn test_resize_is_reported_then_applied() -> Result<()> {
    let backend = ExplicitBackend::with_defaults()?;
    let old_images = backend.swapchain_images();
    backend.simulate_window_resize(Extent2D::new(800, 600));
    assert_eq!(
        backend.acquire_image(0).status,
        SwapchainStatus::ResizeRequired
    );
    backend.recreate_swapchain(Extent2D::new(800, 600))?;
    assert_eq!(backend.extent(), Extent2D::new(800, 600));
    assert_eq!(backend.acquire_image(0).status, SwapchainStatus::Success);
    let new_images = backend.swapchain_images();
    assert!(new_images.iter().all(|image| !old_images.contains(image)));
    assert_eq!(backend.texture_extent(new_images[0])?, Extent2D::new(800, 600));
    Ok(())
}

#[test]
fn test_present_of_unrendered_image_fails_on_explicit() -> Result<()> {
    let backend = ExplicitBackend::with_defaults()?;
    let acquired = backend.acquire_image(0);
    assert_eq!(backend.present(acquired.image_index), SwapchainStatus::Error);

    let immediate = ImmediateBackend::with_defaults()?;
    let acquired = immediate.acquire_image(0);
    assert_eq!(
        immediate.present(acquired.image_index),
        SwapchainStatus::Success
    );
    Ok(())
}

#[test]
fn test_surface_loss_reports_error() -> Result<()> {
    let backend = ImmediateBackend::with_defaults()?;
    backend.simulate_surface_loss();
    assert_eq!(backend.acquire_image(0).status, SwapchainStatus::Error);
    assert_eq!(backend.present(0), SwapchainStatus::Error);
    Ok(())
}

#[test]
fn test_selector_returns_requested_backend() -> Result<()> {
    for kind in [GraphicsBackendType::Explicit, GraphicsBackendType::Immediate] {
        let backend = create_backend(kind, HeadlessConfig::default())?;
        assert_eq!(backend.backend_type(), kind);
        assert_eq!(backend.limits().bounded_descriptor_pools, kind == GraphicsBackendType::Explicit);
    }
    Ok(())
}

#[test]
fn test_dynamic_offsets_are_validated() -> Result<()> {
    let backend = ExplicitBackend::with_defaults()?;
    let scene = build_scene(&backend)?;
    let alignment = u64::from(backend.limits().min_uniform_buffer_offset_alignment);
    let buffer = backend.create_buffer(&BufferDescriptor::for_elements(
        "instances",
        alignment,
        2,
        BufferUsage::UNIFORM,
        UpdateFrequency::PerFrame,
    ))?;
    let layout = backend.create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
        label: Some("dynamic".into()),
        bindings: Cow::Owned(vec![DescriptorBinding {
            binding: 0,
            ty: DescriptorType::DynamicUniformBuffer,
            visibility: ShaderStageFlags::VERTEX,
        }]),
    })?;
    let pool = backend.create_descriptor_pool(&DescriptorPoolDescriptor {
        label: None,
        max_sets: 1,
    })?;
    let set = backend.create_descriptor_set(
        pool,
        layout,
        &[DescriptorComponent::DynamicUniformBuffer {
            buffer,
            element_size: 64,
        }],
    )?;
    let vs = backend.create_shader(&ShaderDescriptor {
        name: "DynamicVertexShader".into(),
        stage: ShaderStage::Vertex,
    })?;
    let pipeline = backend.create_pipeline(&PipelineDescriptor {
        label: Some("dynamic".into()),
        vertex_shader: vs,
        fragment_shader: None,
        vertex_buffers: Cow::Owned(vec![]),
        set_layouts: Cow::Owned(vec![layout]),
        push_constant_range: None,
        render_pass: scene.offscreen_pass,
        depth: DepthState::DISABLED,
        blend: BlendMode::Opaque,
        cull_mode: CullMode::None,
    })?;
    let command_pool = backend.create_command_pool("dynamic")?;
    let cb = backend.allocate_command_buffers(command_pool, 1)?[0];
    let clear = [ClearValue::Color([0.0; 4])];
    let mut recorder = backend.begin_command_buffer(cb)?;
    recorder.begin_render_pass(&RenderPassBeginInfo {
        render_pass: scene.offscreen_pass,
        framebuffer: scene.offscreen_fb,
        clear_values: &clear,
    })?;
    recorder.bind_pipeline(pipeline)?;

    assert!(matches!(
        recorder.bind_descriptor_sets(0, &[set], &[]),
        Err(CommandError::DynamicOffsetCount { expected: 1, actual: 0 })
    ));
    assert!(matches!(
        recorder.bind_descriptor_sets(0, &[set], &[0, alignment as u32]),
        Err(CommandError::DynamicOffsetCount { expected: 1, actual: 2 })
    ));
    assert!(matches!(
        recorder.bind_descriptor_sets(0, &[set], &[4]),
        Err(CommandError::MisalignedDynamicOffset { .. })
    ));
    assert!(matches!(
        recorder.bind_descriptor_sets(0, &[set], &[(alignment * 2) as u32]),
        Err(CommandError::Resource(ResourceError::OutOfBounds { .. }))
    ));
    recorder.bind_descriptor_sets(0, &[set], &[alignment as u32])?;
    Ok(())
}

#[test]
fn test_typed_read_back_from_byte_offset() -> Result<()> {
    let backend = ImmediateBackend::with_defaults()?;
    let values: [u32; 4] = [10, 20, 30, 40];
    let buffer = backend.create_buffer_with_data(
        &BufferDescriptor::for_elements(
            "indices",
            4,
            4,
            BufferUsage::INDEX | BufferUsage::COPY_DST,
            UpdateFrequency::Static,
        ),
        bytemuck::cast_slice(&values),
    )?;
    assert_eq!(backend.read_buffer_as::<u32>(buffer, 0, 4)?, values.to_vec());
    assert_eq!(backend.read_buffer_as::<u32>(buffer, 4, 2)?, vec![20, 30]);

    // Element boundaries need not line up with the element type's alignment.
    let halves: Vec<u16> = backend.read_buffer_as(buffer, 2, 3)?;
    let expected: &[u16] = bytemuck::cast_slice(&values);
    assert_eq!(halves, expected[1..4].to_vec());
    assert!(backend.read_buffer_as::<u32>(buffer, 12, 2).is_err());
    Ok(())
}
