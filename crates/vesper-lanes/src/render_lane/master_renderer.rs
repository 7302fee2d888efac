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

//! The frame orchestrator.

use super::batcher::{BatchIdentifier, Batcher};
use super::context::RenderContext;
use super::descriptor_pool::DescriptorPool;
use super::error::FrameError;
use super::kinds::{
    GuiQuad, GuiRenderer, Renderer3D, SceneLayouts, SkinnedDrawable, StaticDrawable, TerrainTile,
};
use super::pass::{create_target, PassSize, RenderPassInstance};
use super::post_processing::{PostProcessingRenderer, POST_TARGET_FORMAT};
use super::scene_data::{Scene3DData, SceneView};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use vesper_core::asset::AssetSource;
use vesper_core::math::Extent2D;
use vesper_core::renderer::api::*;
use vesper_core::renderer::{CommandRecorder, DirectionalLight, GraphicsBackend, ResourceError};

const SHADOW_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const SCENE_UNIFORM_SIZE: u64 = std::mem::size_of::<Scene3DData>() as u64;

/// What a frame API call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// An image was acquired; drawables may now be submitted.
    Began,
    /// The frame was recorded, submitted and presented.
    Presented,
    /// The swapchain was out of date and has been recreated. After
    /// `begin_frame` this means the frame was skipped.
    Resized,
}

/// One drawable handed to [`MasterRenderer::submit`].
#[derive(Debug, Clone, Copy)]
pub enum Drawable<'a> {
    /// A rigid mesh.
    Static(StaticDrawable),
    /// A skinned mesh in its current pose.
    Skinned(SkinnedDrawable<'a>),
    /// A terrain tile.
    Terrain(TerrainTile),
    /// A screen-space quad.
    Gui(GuiQuad),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Idle,
    Recording { image_index: u32 },
}

#[derive(Debug)]
struct SceneResources {
    layouts: SceneLayouts,
    sampler: SamplerId,
    uniform_buffers: Vec<BufferId>,
    color_sets: Vec<DescriptorSetId>,
    shadow_sets: Vec<DescriptorSetId>,
}

#[derive(Debug, Clone, Copy)]
struct FrameTargets {
    shadow_map: TextureId,
    scene_color: TextureId,
    scene_depth: TextureId,
}

/// Sequences the passes of every frame.
///
/// A frame is `begin_frame`, any number of `submit` calls, then `render`.
/// `render` records the shadow, opaque and transparent passes, the
/// post-processing chain and the screen pass with the GUI into one command
/// buffer, submits it for the current frame slot, presents and advances the
/// slot.
#[derive(Debug)]
pub struct MasterRenderer {
    context: RenderContext,
    backend: Arc<dyn GraphicsBackend>,
    batcher: Batcher,
    renderer_3d: Renderer3D,
    gui: GuiRenderer,
    post: PostProcessingRenderer,
    passes: BTreeMap<RenderPassType, RenderPassInstance>,
    targets: FrameTargets,
    scene: SceneResources,
    pool: DescriptorPool,
    command_pool: CommandPoolId,
    command_buffers: Vec<CommandBufferId>,
    frames_in_flight: usize,
    current_frame: usize,
    frame_number: u64,
    swapchain_image_count: usize,
    light: DirectionalLight,
    state: FrameState,
    stats: RenderStats,
}

impl MasterRenderer {
    /// Creates every pass, target and per-frame resource.
    pub fn new(context: &RenderContext) -> Result<Self, FrameError> {
        let backend = context.backend().clone();
        let settings = context.settings().clone();
        let frames_in_flight = context.frames_in_flight();
        let extent = backend.extent();

        let mut batcher = Batcher::new(context)?;
        let mut pool = DescriptorPool::new(
            backend.clone(),
            "scene",
            (frames_in_flight * 2) as u32,
        )?;

        let layouts = SceneLayouts {
            color: backend.create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
                label: Some("scene color layout".into()),
                bindings: Cow::Owned(vec![
                    DescriptorBinding {
                        binding: 0,
                        ty: DescriptorType::UniformBuffer,
                        visibility: ShaderStageFlags::VERTEX_FRAGMENT,
                    },
                    DescriptorBinding {
                        binding: 1,
                        ty: DescriptorType::CombinedImageSampler,
                        visibility: ShaderStageFlags::FRAGMENT,
                    },
                ]),
            })?,
            shadow: backend.create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
                label: Some("scene shadow layout".into()),
                bindings: Cow::Owned(vec![DescriptorBinding {
                    binding: 0,
                    ty: DescriptorType::UniformBuffer,
                    visibility: ShaderStageFlags::VERTEX,
                }]),
            })?,
        };
        let sampler = backend.create_sampler(&SamplerDescriptor {
            label: Some("shadow sampler".into()),
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
            compare: true,
        })?;

        let shadow_extent = Extent2D::new(settings.shadow_map_size, settings.shadow_map_size);
        let targets = FrameTargets {
            shadow_map: create_target(backend.as_ref(), "shadow map", SHADOW_FORMAT, shadow_extent)?,
            scene_color: create_target(backend.as_ref(), "scene color", POST_TARGET_FORMAT, extent)?,
            scene_depth: create_target(backend.as_ref(), "scene depth", DEPTH_FORMAT, extent)?,
        };

        let depth_clear = ClearValue::DepthStencil {
            depth: 1.0,
            stencil: 0,
        };
        let mut passes = BTreeMap::new();
        let mut shadow = RenderPassInstance::new(
            backend.clone(),
            "ShadowPass",
            &[AttachmentDescriptor::cleared(
                SHADOW_FORMAT,
                AttachmentFinalUsage::Sampled,
            )],
            true,
            PassSize::Fixed(shadow_extent),
            vec![depth_clear],
        )?;
        shadow.set_targets(vec![vec![targets.shadow_map]], shadow_extent);
        passes.insert(RenderPassType::Shadow, shadow);

        let mut opaque = RenderPassInstance::new(
            backend.clone(),
            "OpaquePass",
            &[
                AttachmentDescriptor::cleared(POST_TARGET_FORMAT, AttachmentFinalUsage::Attachment),
                AttachmentDescriptor::cleared(DEPTH_FORMAT, AttachmentFinalUsage::Attachment),
            ],
            true,
            PassSize::Swapchain,
            vec![ClearValue::Color(settings.clear_color), depth_clear],
        )?;
        opaque.set_targets(vec![vec![targets.scene_color, targets.scene_depth]], extent);
        passes.insert(RenderPassType::Opaque, opaque);

        let mut transparent = RenderPassInstance::new(
            backend.clone(),
            "TransparentPass",
            &[
                AttachmentDescriptor::continued(POST_TARGET_FORMAT, AttachmentFinalUsage::Sampled),
                AttachmentDescriptor::continued(DEPTH_FORMAT, AttachmentFinalUsage::Attachment),
            ],
            true,
            PassSize::Swapchain,
            Vec::new(),
        )?;
        transparent.set_targets(vec![vec![targets.scene_color, targets.scene_depth]], extent);
        passes.insert(RenderPassType::Transparent, transparent);

        let screen = Self::create_screen_pass(&backend)?;
        let screen_pass = screen.render_pass();
        passes.insert(RenderPassType::Screen, screen);

        for (pass, instance) in &passes {
            batcher
                .pipelines_mut()
                .set_render_pass(*pass, instance.render_pass());
        }
        batcher.pipelines_mut().set_scene_layouts(layouts);

        let mut uniform_buffers = Vec::with_capacity(frames_in_flight);
        let mut color_sets = Vec::with_capacity(frames_in_flight);
        let mut shadow_sets = Vec::with_capacity(frames_in_flight);
        for frame in 0..frames_in_flight {
            let buffer = backend.create_buffer(&BufferDescriptor::for_elements(
                format!("scene uniform {frame}"),
                SCENE_UNIFORM_SIZE,
                1,
                BufferUsage::UNIFORM | BufferUsage::COPY_DST,
                UpdateFrequency::PerFrame,
            ))?;
            let uniform = DescriptorComponent::UniformBuffer {
                buffer,
                offset: 0,
                size: SCENE_UNIFORM_SIZE,
            };
            color_sets.push(pool.create_descriptor_set(
                layouts.color,
                &[
                    uniform,
                    DescriptorComponent::CombinedImageSampler {
                        texture: targets.shadow_map,
                        sampler,
                    },
                ],
            )?);
            shadow_sets.push(pool.create_descriptor_set(layouts.shadow, &[uniform])?);
            uniform_buffers.push(buffer);
        }

        let gui = GuiRenderer::new(backend.clone(), settings.capacities.gui_quads)?;
        let mut post = PostProcessingRenderer::new();
        post.initialize(context, targets.scene_color, screen_pass)?;

        let command_pool = backend.create_command_pool("master renderer")?;
        let command_buffers = backend.allocate_command_buffers(command_pool, frames_in_flight)?;

        log::info!(
            "MasterRenderer: initialized at {}x{}, {} frames in flight, shadow map {}",
            extent.width,
            extent.height,
            frames_in_flight,
            settings.shadow_map_size
        );
        Ok(Self {
            context: context.clone(),
            swapchain_image_count: backend.swapchain_images().len(),
            backend,
            batcher,
            renderer_3d: Renderer3D::new(settings.capacities),
            gui,
            post,
            passes,
            targets,
            scene: SceneResources {
                layouts,
                sampler,
                uniform_buffers,
                color_sets,
                shadow_sets,
            },
            pool,
            command_pool,
            command_buffers,
            frames_in_flight,
            current_frame: 0,
            frame_number: 0,
            light: DirectionalLight::default(),
            state: FrameState::Idle,
            stats: RenderStats::default(),
        })
    }

    fn create_screen_pass(
        backend: &Arc<dyn GraphicsBackend>,
    ) -> Result<RenderPassInstance, ResourceError> {
        let mut screen = RenderPassInstance::new(
            backend.clone(),
            "ScreenPass",
            &[AttachmentDescriptor::cleared(
                backend.swapchain_format(),
                AttachmentFinalUsage::Present,
            )],
            false,
            PassSize::Swapchain,
            vec![ClearValue::Color([0.0, 0.0, 0.0, 1.0])],
        )?;
        let images = backend
            .swapchain_images()
            .into_iter()
            .map(|image| vec![image])
            .collect();
        screen.set_targets(images, backend.extent());
        Ok(screen)
    }

    /// The shared render context.
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// The batcher holding this renderer's batches.
    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    /// Mutable access to the batcher, for scene switches.
    pub fn batcher_mut(&mut self) -> &mut Batcher {
        &mut self.batcher
    }

    /// The post-processing chain.
    pub fn post_processing(&self) -> &PostProcessingRenderer {
        &self.post
    }

    /// Changes the bloom strength composited by the screen pass, from the next
    /// recorded frame on.
    pub fn set_bloom_intensity(&mut self, intensity: f32) {
        log::debug!("MasterRenderer: bloom intensity set to {intensity}");
        self.post.set_bloom_intensity(intensity);
    }

    /// The GUI renderer and its shared quad.
    pub fn gui(&self) -> &GuiRenderer {
        &self.gui
    }

    /// The frame slot being recorded, or the next one between frames.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Frames presented so far.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Counters of the last recorded frame.
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// The render pass instance of a pass.
    pub fn pass(&self, pass: RenderPassType) -> Option<&RenderPassInstance> {
        self.passes.get(&pass)
    }

    /// The framebuffers built so far for a pass.
    pub fn framebuffers(&self, pass: RenderPassType) -> Vec<FramebufferId> {
        self.passes
            .get(&pass)
            .map(RenderPassInstance::framebuffers)
            .unwrap_or_default()
    }

    /// The shadow map sampled by the color passes.
    pub fn shadow_map(&self) -> TextureId {
        self.targets.shadow_map
    }

    /// The color attachment of the opaque and transparent passes.
    pub fn scene_color(&self) -> TextureId {
        self.targets.scene_color
    }

    /// The scene uniform buffer of a frame slot.
    pub fn scene_uniform_buffer(&self, frame: usize) -> Option<BufferId> {
        self.scene.uniform_buffers.get(frame).copied()
    }

    /// Acquires the next swapchain image and opens the frame for submissions.
    ///
    /// If the swapchain is out of date the frame is skipped: the resize path
    /// runs and [`FrameOutcome::Resized`] is returned.
    pub fn begin_frame(&mut self) -> Result<FrameOutcome, FrameError> {
        if self.state != FrameState::Idle {
            log::error!("MasterRenderer: begin_frame called while a frame is open");
            return Err(FrameError::Protocol("begin_frame called while a frame is open"));
        }
        let acquired = self.backend.acquire_image(self.current_frame);
        match acquired.status {
            SwapchainStatus::Success => {}
            SwapchainStatus::ResizeRequired => {
                log::info!("MasterRenderer: swapchain out of date on acquire, skipping the frame");
                self.handle_resize(self.backend.surface_extent())?;
                return Ok(FrameOutcome::Resized);
            }
            SwapchainStatus::Error => {
                log::error!("MasterRenderer: failed to acquire a swapchain image");
                return Err(FrameError::Swapchain("acquire"));
            }
        }
        self.batcher.reset_for_next_frame();
        self.stats.begin_frame(self.frame_number);
        self.state = FrameState::Recording {
            image_index: acquired.image_index,
        };
        log::trace!(
            "MasterRenderer: frame {} began on slot {} with image {}",
            self.frame_number,
            self.current_frame,
            acquired.image_index
        );
        Ok(FrameOutcome::Began)
    }

    /// Adds one drawable to the batches of the open frame.
    pub fn submit(
        &mut self,
        assets: &dyn AssetSource,
        drawable: &Drawable<'_>,
    ) -> Result<BatchIdentifier, FrameError> {
        if self.state == FrameState::Idle {
            log::error!("MasterRenderer: submit called outside of a frame");
            return Err(FrameError::Protocol("submit called outside of a frame"));
        }
        let frame = self.current_frame;
        let batcher = &mut self.batcher;
        let identifier = match drawable {
            Drawable::Static(d) => {
                self.renderer_3d
                    .submit_static(batcher, assets, d, &self.light, frame)?
            }
            Drawable::Skinned(d) => {
                self.renderer_3d
                    .submit_skinned(batcher, assets, d, &self.light, frame)?
            }
            Drawable::Terrain(t) => {
                self.renderer_3d
                    .submit_terrain(batcher, assets, t, &self.light, frame)?
            }
            Drawable::Gui(q) => self.gui.submit(batcher, assets, q, frame)?,
        };
        Ok(identifier)
    }

    /// Records, submits and presents the open frame, then advances the frame slot.
    pub fn render(&mut self, view: &SceneView) -> Result<FrameOutcome, FrameError> {
        let FrameState::Recording { image_index } = self.state else {
            log::error!("MasterRenderer: render called without begin_frame");
            return Err(FrameError::Protocol("render called without begin_frame"));
        };
        self.state = FrameState::Idle;
        let frame = self.current_frame;
        let backend = self.backend.clone();

        self.light = view.light;
        self.batcher.set_shadow_light(&view.light);
        self.batcher.update_device_side_buffers(frame)?;
        let scene = Scene3DData::new(view, self.context.settings().shadow_map_size);
        let Some(uniform) = self.scene.uniform_buffers.get(frame).copied() else {
            return Err(FrameError::Protocol("frame slot has no scene uniform"));
        };
        backend.write_buffer(uniform, 0, bytemuck::bytes_of(&scene))?;
        self.post.validate()?;

        let Some(command_buffer) = self.command_buffers.get(frame).copied() else {
            return Err(FrameError::Protocol("frame slot has no command buffer"));
        };
        let mut recorder = backend.begin_command_buffer(command_buffer)?;
        self.record_frame(recorder.as_mut(), image_index, view.light.casts_shadows())?;
        let command_buffer = recorder.finish()?;
        backend.submit(&[command_buffer], frame)?;
        let status = backend.present(image_index);

        log::debug!(
            "MasterRenderer: frame {} on slot {frame}: {} passes, {} batches, {} draws, {} triangles",
            self.frame_number,
            self.stats.render_passes,
            self.stats.batches_drawn,
            self.stats.draw_calls,
            self.stats.triangles_rendered
        );
        self.current_frame = (frame + 1) % self.frames_in_flight;
        self.frame_number += 1;

        match status {
            SwapchainStatus::Success => Ok(FrameOutcome::Presented),
            SwapchainStatus::ResizeRequired => {
                log::info!("MasterRenderer: swapchain out of date on present");
                self.handle_resize(backend.surface_extent())?;
                Ok(FrameOutcome::Resized)
            }
            SwapchainStatus::Error => {
                log::error!("MasterRenderer: failed to present image {image_index}");
                Err(FrameError::Swapchain("present"))
            }
        }
    }

    fn begin_pass(
        &mut self,
        pass: RenderPassType,
        recorder: &mut dyn CommandRecorder,
        image_index: u32,
    ) -> Result<Extent2D, FrameError> {
        let Some(instance) = self.passes.get_mut(&pass) else {
            log::error!("MasterRenderer: the {pass:?} pass was not created");
            return Err(FrameError::Protocol("render pass missing"));
        };
        instance.begin(recorder, image_index)?;
        self.stats.render_passes += 1;
        Ok(instance.extent())
    }

    fn record_frame(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        image_index: u32,
        casts_shadows: bool,
    ) -> Result<(), FrameError> {
        let frame = self.current_frame;
        let scene_set = |sets: &[DescriptorSetId]| sets.get(frame).copied();
        let shadow_set = scene_set(&self.scene.shadow_sets);
        let color_set = scene_set(&self.scene.color_sets);

        // The shadow pass always runs so the shadow map is sampleable.
        let extent = self.begin_pass(RenderPassType::Shadow, recorder, image_index)?;
        if casts_shadows {
            self.record_batches(RenderPassType::Shadow, recorder, extent, shadow_set)?;
        }
        recorder.end_render_pass()?;

        for pass in [RenderPassType::Opaque, RenderPassType::Transparent] {
            let extent = self.begin_pass(pass, recorder, image_index)?;
            self.record_batches(pass, recorder, extent, color_set)?;
            recorder.end_render_pass()?;
        }

        let post_passes = self.post.record_offscreen(recorder, frame)?;
        self.stats.render_passes += post_passes;
        self.stats.draw_calls += post_passes;
        self.stats.triangles_rendered += u64::from(post_passes);

        let extent = self.begin_pass(RenderPassType::Screen, recorder, image_index)?;
        self.post.record_screen(recorder, frame)?;
        self.stats.draw_calls += 1;
        self.stats.triangles_rendered += 1;
        self.record_batches(RenderPassType::Screen, recorder, extent, None)?;
        recorder.end_render_pass()?;
        Ok(())
    }

    fn record_batches(
        &mut self,
        pass: RenderPassType,
        recorder: &mut dyn CommandRecorder,
        extent: Extent2D,
        scene_set: Option<DescriptorSetId>,
    ) -> Result<(), FrameError> {
        let frame = self.current_frame;
        let viewport = Viewport::from_extent(extent);
        let scissor = ScissorRect::from_extent(extent);
        for batch in self.batcher.batches(pass) {
            if batch.is_empty() {
                continue;
            }
            recorder.bind_pipeline(batch.pipeline())?;
            recorder.set_viewport(&viewport)?;
            recorder.set_scissor(&scissor)?;
            recorder.bind_vertex_buffers(0, &batch.vertex_buffers(frame))?;
            let (index_buffer, index_format) = batch.index_buffer();
            recorder.bind_index_buffer(index_buffer, index_format)?;
            if let Some((stages, data)) = batch.push_constants() {
                recorder.push_constants(stages, data)?;
            }

            let mut sets = Vec::with_capacity(3);
            if batch.bindings().scene_set {
                sets.extend(scene_set);
            }
            sets.extend_from_slice(batch.descriptor_sets(frame));

            let instances = batch.instances_per_draw();
            for repeat in 0..batch.draw_count() {
                if !sets.is_empty() {
                    let offsets: Vec<u32> = batch.dynamic_offset(repeat).into_iter().collect();
                    recorder.bind_descriptor_sets(0, &sets, &offsets)?;
                }
                recorder.draw_indexed(batch.index_count(), instances, 0)?;
                self.stats.draw_calls += 1;
                self.stats.instances_drawn += instances;
                self.stats.triangles_rendered +=
                    u64::from(batch.index_count() / 3) * u64::from(instances);
            }
            self.stats.batches_drawn += 1;
        }
        Ok(())
    }

    /// Rebuilds everything sized by the swapchain at `extent`.
    ///
    /// Every framebuffer is destroyed and rebuilt lazily, the swapchain-sized
    /// attachments and post-processing targets are recreated and the
    /// swapchain-dependent pipelines are rebuilt. Batches keep their GPU
    /// resources, unless the number of swapchain images changed, in which case
    /// they are cleared.
    pub fn handle_resize(&mut self, extent: Extent2D) -> Result<(), FrameError> {
        if extent.is_empty() {
            log::info!("MasterRenderer: surface is {}x{}, waiting", extent.width, extent.height);
            return Ok(());
        }
        let backend = self.backend.clone();
        backend.wait_idle();
        let old_format = backend.swapchain_format();
        backend.recreate_swapchain(extent)?;
        let extent = backend.extent();

        for pass in self.passes.values_mut() {
            pass.invalidate();
        }
        for texture in [self.targets.scene_color, self.targets.scene_depth] {
            if let Err(e) = backend.destroy_texture(texture) {
                log::warn!("MasterRenderer: failed to destroy {texture:?}: {e}");
            }
        }
        self.targets.scene_color =
            create_target(backend.as_ref(), "scene color", POST_TARGET_FORMAT, extent)?;
        self.targets.scene_depth =
            create_target(backend.as_ref(), "scene depth", DEPTH_FORMAT, extent)?;
        let scene_targets = vec![vec![self.targets.scene_color, self.targets.scene_depth]];
        for pass in [RenderPassType::Opaque, RenderPassType::Transparent] {
            if let Some(instance) = self.passes.get_mut(&pass) {
                instance.set_targets(scene_targets.clone(), extent);
            }
        }
        if let Some(shadow) = self.passes.get_mut(&RenderPassType::Shadow) {
            let size = shadow.extent();
            shadow.set_targets(vec![vec![self.targets.shadow_map]], size);
        }

        if backend.swapchain_format() != old_format {
            let screen = Self::create_screen_pass(&backend)?;
            let replaced = self
                .batcher
                .pipelines_mut()
                .rebuild_pass(RenderPassType::Screen, screen.render_pass())?;
            for (old, new) in replaced {
                self.batcher.replace_pipeline(old, new);
            }
            if let Some(old) = self.passes.insert(RenderPassType::Screen, screen) {
                old.destroy();
            }
        } else if let Some(screen) = self.passes.get_mut(&RenderPassType::Screen) {
            let images = backend
                .swapchain_images()
                .into_iter()
                .map(|image| vec![image])
                .collect();
            screen.set_targets(images, extent);
        }
        let screen_pass = self
            .passes
            .get(&RenderPassType::Screen)
            .map(RenderPassInstance::render_pass)
            .ok_or(FrameError::Protocol("render pass missing"))?;
        self.post.resize(self.targets.scene_color, screen_pass)?;

        let image_count = backend.swapchain_images().len();
        if image_count != self.swapchain_image_count {
            log::info!(
                "MasterRenderer: swapchain image count changed from {} to {image_count}, clearing batches",
                self.swapchain_image_count
            );
            self.batcher.clear()?;
            self.swapchain_image_count = image_count;
        }
        log::info!("MasterRenderer: resized to {}x{}", extent.width, extent.height);
        Ok(())
    }

    /// Waits for the GPU and releases everything this renderer created.
    pub fn destroy(mut self) {
        let backend = self.backend.clone();
        backend.wait_idle();
        self.post.destroy();
        self.gui.destroy();
        self.batcher.destroy();
        for (_, pass) in std::mem::take(&mut self.passes) {
            pass.destroy();
        }
        let FrameTargets {
            shadow_map,
            scene_color,
            scene_depth,
        } = self.targets;
        for texture in [shadow_map, scene_color, scene_depth] {
            if let Err(e) = backend.destroy_texture(texture) {
                log::warn!("MasterRenderer: failed to destroy {texture:?}: {e}");
            }
        }
        for buffer in &self.scene.uniform_buffers {
            if let Err(e) = backend.destroy_buffer(*buffer) {
                log::warn!("MasterRenderer: failed to destroy {buffer:?}: {e}");
            }
        }
        self.pool.destroy();
        for layout in [self.scene.layouts.color, self.scene.layouts.shadow] {
            if let Err(e) = backend.destroy_descriptor_set_layout(layout) {
                log::warn!("MasterRenderer: failed to destroy {layout:?}: {e}");
            }
        }
        if let Err(e) = backend.destroy_sampler(self.scene.sampler) {
            log::warn!("MasterRenderer: failed to destroy the shadow sampler: {e}");
        }
        if let Err(e) = backend.destroy_command_pool(self.command_pool) {
            log::warn!("MasterRenderer: failed to destroy the command pool: {e}");
        }
        log::info!("MasterRenderer: destroyed after {} frames", self.frame_number);
    }
}
