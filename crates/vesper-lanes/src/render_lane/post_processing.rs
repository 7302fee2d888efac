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

//! The bloom post-processing chain.
//!
//! Four full-screen-triangle stages run after the transparent pass:
//!
//! | stage            | samples                    | renders into          |
//! |------------------|----------------------------|-----------------------|
//! | `Copy`           | scene color                | full-size target      |
//! | `BlurHorizontal` | copy target                | half-size target      |
//! | `BlurVertical`   | horizontal blur target     | half-size target      |
//! | `Screen`         | scene color, vertical blur | swapchain framebuffer |
//!
//! The screen stage is recorded inside the screen pass owned by the
//! [`MasterRenderer`](super::MasterRenderer), ahead of the GUI.

use super::context::RenderContext;
use super::descriptor_pool::DescriptorPool;
use super::error::PostProcessError;
use super::pass::{create_target, PassSize, RenderPassInstance};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use vesper_core::renderer::api::*;
use vesper_core::renderer::{CommandRecorder, GraphicsBackend, ResourceError};

/// Format of every intermediate post-processing target.
pub const POST_TARGET_FORMAT: TextureFormat = TextureFormat::Rgba16Float;

const POST_VERTEX_SHADER: &str = "PostVertexShader";
const FULL_SCREEN_TRIANGLE: u32 = 3;

/// One stage of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PostStage {
    /// Copies the scene color into the bloom source.
    Copy,
    /// Blurs the bloom source along X.
    BlurHorizontal,
    /// Blurs the result along Y.
    BlurVertical,
    /// Composites scene color and bloom onto the swapchain image.
    Screen,
}

impl PostStage {
    /// Every stage, in recording order.
    pub const ALL: [PostStage; 4] = [
        PostStage::Copy,
        PostStage::BlurHorizontal,
        PostStage::BlurVertical,
        PostStage::Screen,
    ];

    /// The stages rendering into their own offscreen targets.
    pub const OFFSCREEN: [PostStage; 3] = [
        PostStage::Copy,
        PostStage::BlurHorizontal,
        PostStage::BlurVertical,
    ];

    /// The label of the stage's render pass. The screen stage has none of its own.
    pub fn pass_label(&self) -> Option<&'static str> {
        match self {
            PostStage::Copy => Some("PostCopyPass"),
            PostStage::BlurHorizontal => Some("PostBlurHorizontalPass"),
            PostStage::BlurVertical => Some("PostBlurVerticalPass"),
            PostStage::Screen => None,
        }
    }

    /// The fragment shader of the stage.
    pub fn fragment_shader(&self) -> &'static str {
        match self {
            PostStage::Copy => "PostCopyFragmentShader",
            PostStage::BlurHorizontal => "PostBlurHorizontalFragmentShader",
            PostStage::BlurVertical => "PostBlurVerticalFragmentShader",
            PostStage::Screen => "PostScreenFragmentShader",
        }
    }

    /// Size of the stage's target.
    pub fn size(&self) -> PassSize {
        match self {
            PostStage::Copy | PostStage::Screen => PassSize::Swapchain,
            PostStage::BlurHorizontal | PostStage::BlurVertical => PassSize::SwapchainScaled(2),
        }
    }

    /// Bytes of push constants the stage's pipeline declares.
    fn push_constant_size(&self) -> u32 {
        match self {
            PostStage::Copy => 0,
            _ => std::mem::size_of::<f32>() as u32,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PostStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PostStage::Copy => "copy",
            PostStage::BlurHorizontal => "horizontal blur",
            PostStage::BlurVertical => "vertical blur",
            PostStage::Screen => "screen",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
struct Stage {
    pass: Option<RenderPassInstance>,
    target: Option<TextureId>,
    pipeline: Option<PipelineId>,
    descriptor_sets: Vec<DescriptorSetId>,
}

#[derive(Debug)]
struct PostResources {
    backend: Arc<dyn GraphicsBackend>,
    pool: DescriptorPool,
    sampler: SamplerId,
    source_layout: DescriptorSetLayoutId,
    composite_layout: DescriptorSetLayoutId,
    shaders: Vec<ShaderId>,
}

/// Runs the copy, blur and composite stages of every frame.
///
/// A renderer built with [`new`](Self::new) holds nothing and fails
/// [`validate`](Self::validate) until [`initialize`](Self::initialize) creates
/// the stage resources.
#[derive(Debug)]
pub struct PostProcessingRenderer {
    resources: Option<PostResources>,
    stages: [Stage; 4],
    frames_in_flight: usize,
    bloom_intensity: f32,
    scene_color: Option<TextureId>,
}

impl Default for PostProcessingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PostProcessingRenderer {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            resources: None,
            stages: std::array::from_fn(|_| Stage::default()),
            frames_in_flight: 0,
            bloom_intensity: 0.0,
            scene_color: None,
        }
    }

    /// Builds every stage.
    ///
    /// `scene_color` is the color attachment of the opaque and transparent
    /// passes; `screen_pass` is the render pass the composite is recorded in.
    pub fn initialize(
        &mut self,
        context: &RenderContext,
        scene_color: TextureId,
        screen_pass: RenderPassId,
    ) -> Result<(), PostProcessError> {
        if self.resources.is_some() {
            self.destroy();
        }
        let backend = context.backend().clone();
        self.frames_in_flight = context.frames_in_flight();
        self.bloom_intensity = context.settings().bloom_intensity;
        self.scene_color = Some(scene_color);

        let pool = DescriptorPool::new(
            backend.clone(),
            "post-processing",
            (self.frames_in_flight * PostStage::ALL.len()) as u32,
        )?;
        let sampler = backend.create_sampler(&SamplerDescriptor {
            label: Some("post-processing sampler".into()),
            filter: FilterMode::Linear,
            address_mode: AddressMode::ClampToEdge,
            compare: false,
        })?;
        let source_layout = create_sampler_layout(backend.as_ref(), "post source layout", 1)?;
        let composite_layout = create_sampler_layout(backend.as_ref(), "post composite layout", 2)?;
        let mut shaders = Vec::with_capacity(PostStage::ALL.len() + 1);
        shaders.push(backend.create_shader(&ShaderDescriptor {
            name: Cow::Borrowed(POST_VERTEX_SHADER),
            stage: ShaderStage::Vertex,
        })?);
        for stage in PostStage::ALL {
            shaders.push(backend.create_shader(&ShaderDescriptor {
                name: Cow::Borrowed(stage.fragment_shader()),
                stage: ShaderStage::Fragment,
            })?);
        }
        self.resources = Some(PostResources {
            backend: backend.clone(),
            pool,
            sampler,
            source_layout,
            composite_layout,
            shaders,
        });

        let extent = backend.extent();
        for stage in PostStage::OFFSCREEN {
            let Some(label) = stage.pass_label() else {
                continue;
            };
            let mut pass = RenderPassInstance::new(
                backend.clone(),
                label,
                &[AttachmentDescriptor::cleared(
                    POST_TARGET_FORMAT,
                    AttachmentFinalUsage::Sampled,
                )],
                true,
                stage.size(),
                vec![ClearValue::Color([0.0, 0.0, 0.0, 1.0])],
            )?;
            let size = stage.size().resolve(extent);
            let target = create_target(backend.as_ref(), label, POST_TARGET_FORMAT, size)?;
            pass.set_targets(vec![vec![target]], size);
            let pipeline = self.build_pipeline(stage, pass.render_pass())?;
            let state = &mut self.stages[stage.index()];
            state.pass = Some(pass);
            state.target = Some(target);
            state.pipeline = Some(pipeline);
        }
        self.stages[PostStage::Screen.index()].pipeline =
            Some(self.build_pipeline(PostStage::Screen, screen_pass)?);

        for stage in PostStage::ALL {
            self.allocate_sets(stage)?;
        }
        log::info!(
            "PostProcessingRenderer: initialized at {}x{} with bloom intensity {}",
            extent.width,
            extent.height,
            self.bloom_intensity
        );
        Ok(())
    }

    fn resources(&self) -> Result<&PostResources, ResourceError> {
        self.resources.as_ref().ok_or_else(|| {
            log::error!("PostProcessingRenderer: used before initialize");
            ResourceError::InvalidHandle
        })
    }

    /// The textures a stage samples, in binding order.
    fn sources(&self, stage: PostStage) -> Vec<Option<TextureId>> {
        let target = |s: PostStage| self.stages[s.index()].target;
        match stage {
            PostStage::Copy => vec![self.scene_color],
            PostStage::BlurHorizontal => vec![target(PostStage::Copy)],
            PostStage::BlurVertical => vec![target(PostStage::BlurHorizontal)],
            PostStage::Screen => vec![self.scene_color, target(PostStage::BlurVertical)],
        }
    }

    fn components(&self, stage: PostStage) -> Result<Vec<DescriptorComponent>, ResourceError> {
        let sampler = self.resources()?.sampler;
        self.sources(stage)
            .into_iter()
            .map(|texture| {
                texture
                    .map(|texture| DescriptorComponent::CombinedImageSampler { texture, sampler })
                    .ok_or(ResourceError::InvalidHandle)
            })
            .collect()
    }

    fn allocate_sets(&mut self, stage: PostStage) -> Result<(), PostProcessError> {
        let components = self.components(stage)?;
        let frames = self.frames_in_flight;
        let Some(resources) = self.resources.as_mut() else {
            return Err(ResourceError::InvalidHandle.into());
        };
        let layout = if stage == PostStage::Screen {
            resources.composite_layout
        } else {
            resources.source_layout
        };
        let sets = resources
            .pool
            .create_descriptor_sets(layout, &vec![components; frames])?;
        self.stages[stage.index()].descriptor_sets = sets;
        Ok(())
    }

    fn build_pipeline(
        &self,
        stage: PostStage,
        render_pass: RenderPassId,
    ) -> Result<PipelineId, ResourceError> {
        let resources = self.resources()?;
        let layout = if stage == PostStage::Screen {
            resources.composite_layout
        } else {
            resources.source_layout
        };
        let push_constant_size = stage.push_constant_size();
        resources.backend.create_pipeline(&PipelineDescriptor {
            label: Some(Cow::Owned(format!("Post {stage}"))),
            vertex_shader: resources.shaders[0],
            fragment_shader: Some(resources.shaders[stage.index() + 1]),
            vertex_buffers: Cow::Borrowed(&[]),
            set_layouts: Cow::Owned(vec![layout]),
            push_constant_range: (push_constant_size > 0).then_some(PushConstantRange {
                stages: ShaderStageFlags::FRAGMENT,
                size: push_constant_size,
            }),
            render_pass,
            depth: DepthState::DISABLED,
            blend: BlendMode::Opaque,
            cull_mode: CullMode::None,
        })
    }

    /// Checks that every stage can be recorded.
    ///
    /// Every stage needs a pipeline and one descriptor set per frame in
    /// flight; every stage but the screen composite needs a framebuffer target.
    pub fn validate(&self) -> Result<(), PostProcessError> {
        for stage in PostStage::ALL {
            let state = &self.stages[stage.index()];
            if state.pipeline.is_none() {
                log::error!("PostProcessingRenderer: the {stage} stage has no pipeline");
                return Err(PostProcessError::MissingPipeline(stage));
            }
            if stage != PostStage::Screen && (state.pass.is_none() || state.target.is_none()) {
                log::error!("PostProcessingRenderer: the {stage} stage has no framebuffer");
                return Err(PostProcessError::MissingFramebuffer(stage));
            }
            if self.frames_in_flight == 0 || state.descriptor_sets.len() != self.frames_in_flight {
                log::error!(
                    "PostProcessingRenderer: the {stage} stage has {} descriptor sets for {} frames",
                    state.descriptor_sets.len(),
                    self.frames_in_flight
                );
                return Err(PostProcessError::MissingDescriptorSets {
                    stage,
                    expected: self.frames_in_flight,
                    actual: state.descriptor_sets.len(),
                });
            }
        }
        Ok(())
    }

    /// The push constant payload of a stage, if its pipeline declares one.
    pub fn push_constants(&self, stage: PostStage) -> Option<f32> {
        let extent = |s: PostStage| {
            self.stages[s.index()]
                .pass
                .as_ref()
                .map(RenderPassInstance::extent)
        };
        match stage {
            PostStage::Copy => None,
            PostStage::BlurHorizontal => extent(stage).map(|e| e.width as f32),
            PostStage::BlurVertical => extent(stage).map(|e| e.height as f32),
            PostStage::Screen => Some(self.bloom_intensity),
        }
    }

    fn record_stage(
        &self,
        stage: PostStage,
        recorder: &mut dyn CommandRecorder,
        frame: usize,
    ) -> Result<(), PostProcessError> {
        let state = &self.stages[stage.index()];
        let pipeline = state
            .pipeline
            .ok_or(PostProcessError::MissingPipeline(stage))?;
        let Some(set) = state.descriptor_sets.get(frame).copied() else {
            return Err(PostProcessError::MissingDescriptorSets {
                stage,
                expected: self.frames_in_flight,
                actual: state.descriptor_sets.len(),
            });
        };
        recorder.bind_pipeline(pipeline)?;
        if let Some(value) = self.push_constants(stage) {
            recorder.push_constants(ShaderStageFlags::FRAGMENT, bytemuck::bytes_of(&value))?;
        }
        recorder.bind_descriptor_sets(0, &[set], &[])?;
        recorder.draw(FULL_SCREEN_TRIANGLE, 1)?;
        Ok(())
    }

    /// Records the copy and blur stages, each in its own pass. Returns the number of passes.
    pub fn record_offscreen(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        frame: usize,
    ) -> Result<u32, PostProcessError> {
        for stage in PostStage::OFFSCREEN {
            let Some(pass) = self.stages[stage.index()].pass.as_mut() else {
                return Err(PostProcessError::MissingFramebuffer(stage));
            };
            pass.begin(recorder, 0)?;
            self.record_stage(stage, recorder, frame)?;
            recorder.end_render_pass()?;
        }
        Ok(PostStage::OFFSCREEN.len() as u32)
    }

    /// Records the composite into the already begun screen pass.
    pub fn record_screen(
        &self,
        recorder: &mut dyn CommandRecorder,
        frame: usize,
    ) -> Result<(), PostProcessError> {
        self.record_stage(PostStage::Screen, recorder, frame)
    }

    /// Recreates the stage targets at the new swapchain extent.
    ///
    /// The descriptor sets stay allocated; their texture bindings are swapped
    /// in place. The composite pipeline is rebuilt against `screen_pass`.
    pub fn resize(
        &mut self,
        scene_color: TextureId,
        screen_pass: RenderPassId,
    ) -> Result<(), PostProcessError> {
        let backend = self.resources()?.backend.clone();
        let extent = backend.extent();
        self.scene_color = Some(scene_color);
        for stage in PostStage::OFFSCREEN {
            let state = &mut self.stages[stage.index()];
            let Some(pass) = state.pass.as_mut() else {
                return Err(PostProcessError::MissingFramebuffer(stage));
            };
            pass.invalidate();
            if let Some(old) = state.target.take() {
                if let Err(e) = backend.destroy_texture(old) {
                    log::warn!("PostProcessingRenderer: failed to destroy the {stage} target: {e}");
                }
            }
            let size = pass.size().resolve(extent);
            let target = create_target(backend.as_ref(), pass.label(), POST_TARGET_FORMAT, size)?;
            pass.set_targets(vec![vec![target]], size);
            state.target = Some(target);
        }

        for stage in PostStage::ALL {
            let components = self.components(stage)?;
            let sets = self.stages[stage.index()].descriptor_sets.clone();
            let Some(resources) = self.resources.as_mut() else {
                return Err(ResourceError::InvalidHandle.into());
            };
            for set in sets {
                for (binding, component) in components.iter().enumerate() {
                    resources.pool.update(set, binding as u32, component)?;
                }
            }
        }

        let screen = PostStage::Screen.index();
        if let Some(old) = self.stages[screen].pipeline.take() {
            if let Err(e) = backend.destroy_pipeline(old) {
                log::warn!("PostProcessingRenderer: failed to destroy the screen pipeline: {e}");
            }
        }
        self.stages[screen].pipeline = Some(self.build_pipeline(PostStage::Screen, screen_pass)?);
        log::info!(
            "PostProcessingRenderer: resized to {}x{}",
            extent.width,
            extent.height
        );
        Ok(())
    }

    /// The offscreen target of a stage.
    pub fn target(&self, stage: PostStage) -> Option<TextureId> {
        self.stages[stage.index()].target
    }

    /// The pipeline of a stage.
    pub fn pipeline(&self, stage: PostStage) -> Option<PipelineId> {
        self.stages[stage.index()].pipeline
    }

    /// The descriptor sets of a stage, one per frame in flight.
    pub fn descriptor_sets(&self, stage: PostStage) -> &[DescriptorSetId] {
        &self.stages[stage.index()].descriptor_sets
    }

    /// The render pass instance of an offscreen stage.
    pub fn pass(&self, stage: PostStage) -> Option<&RenderPassInstance> {
        self.stages[stage.index()].pass.as_ref()
    }

    /// Strength of the bloom term.
    pub fn bloom_intensity(&self) -> f32 {
        self.bloom_intensity
    }

    /// Changes the strength of the bloom term from the next recorded frame on.
    pub fn set_bloom_intensity(&mut self, intensity: f32) {
        self.bloom_intensity = intensity;
    }

    /// Releases every stage resource. The renderer is empty afterwards.
    pub fn destroy(&mut self) {
        let Some(resources) = self.resources.take() else {
            return;
        };
        let backend = resources.backend;
        for state in &mut self.stages {
            if let Some(pass) = state.pass.take() {
                pass.destroy();
            }
            if let Some(target) = state.target.take() {
                if let Err(e) = backend.destroy_texture(target) {
                    log::warn!("PostProcessingRenderer: failed to destroy {target:?}: {e}");
                }
            }
            if let Some(pipeline) = state.pipeline.take() {
                if let Err(e) = backend.destroy_pipeline(pipeline) {
                    log::warn!("PostProcessingRenderer: failed to destroy {pipeline:?}: {e}");
                }
            }
            state.descriptor_sets.clear();
        }
        resources.pool.destroy();
        for layout in [resources.source_layout, resources.composite_layout] {
            if let Err(e) = backend.destroy_descriptor_set_layout(layout) {
                log::warn!("PostProcessingRenderer: failed to destroy {layout:?}: {e}");
            }
        }
        for shader in resources.shaders {
            if let Err(e) = backend.destroy_shader(shader) {
                log::warn!("PostProcessingRenderer: failed to destroy {shader:?}: {e}");
            }
        }
        if let Err(e) = backend.destroy_sampler(resources.sampler) {
            log::warn!("PostProcessingRenderer: failed to destroy the sampler: {e}");
        }
        self.frames_in_flight = 0;
        self.scene_color = None;
    }
}

fn create_sampler_layout(
    backend: &dyn GraphicsBackend,
    label: &str,
    textures: u32,
) -> Result<DescriptorSetLayoutId, ResourceError> {
    let bindings: Vec<DescriptorBinding> = (0..textures)
        .map(|binding| DescriptorBinding {
            binding,
            ty: DescriptorType::CombinedImageSampler,
            visibility: ShaderStageFlags::FRAGMENT,
        })
        .collect();
    backend.create_descriptor_set_layout(&DescriptorSetLayoutDescriptor {
        label: Some(Cow::Borrowed(label)),
        bindings: Cow::Owned(bindings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_core::math::Extent2D;
    use vesper_infra::{HeadlessConfig, ImmediateBackend};

    fn setup(extent: Extent2D) -> (Arc<ImmediateBackend>, PostProcessingRenderer, RenderContext) {
        let backend = Arc::new(
            ImmediateBackend::new(HeadlessConfig {
                extent,
                ..Default::default()
            })
            .unwrap(),
        );
        let context = RenderContext::new(
            backend.clone(),
            RenderSettings {
                bloom_intensity: 0.5,
                ..Default::default()
            },
        );
        let scene_color =
            create_target(backend.as_ref(), "scene color", POST_TARGET_FORMAT, extent).unwrap();
        let screen = RenderPassInstance::new(
            backend.clone(),
            "ScreenPass",
            &[AttachmentDescriptor::cleared(
                backend.swapchain_format(),
                AttachmentFinalUsage::Present,
            )],
            false,
            PassSize::Swapchain,
            vec![ClearValue::Color([0.0; 4])],
        )
        .unwrap();
        let mut post = PostProcessingRenderer::new();
        post.initialize(&context, scene_color, screen.render_pass())
            .unwrap();
        (backend, post, context)
    }

    #[test]
    fn test_fresh_renderer_fails_validation() {
        let post = PostProcessingRenderer::new();
        assert!(matches!(
            post.validate(),
            Err(PostProcessError::MissingPipeline(PostStage::Copy))
        ));
    }

    #[test]
    fn test_initialized_chain_validates() {
        let (backend, post, _) = setup(Extent2D::new(800, 600));
        post.validate().unwrap();
        for stage in PostStage::ALL {
            assert_eq!(post.descriptor_sets(stage).len(), 2);
        }
        let blur = post.target(PostStage::BlurVertical).unwrap();
        assert_eq!(backend.texture_extent(blur).unwrap(), Extent2D::new(400, 300));
    }

    #[test]
    fn test_push_constants_per_stage() {
        let (_, post, _) = setup(Extent2D::new(1280, 720));
        assert_eq!(post.push_constants(PostStage::Copy), None);
        assert_eq!(post.push_constants(PostStage::BlurHorizontal), Some(640.0));
        assert_eq!(post.push_constants(PostStage::BlurVertical), Some(360.0));
        assert_eq!(post.push_constants(PostStage::Screen), Some(0.5));
    }

    #[test]
    fn test_missing_descriptor_sets_are_reported() {
        let (_, mut post, _) = setup(Extent2D::new(64, 64));
        post.stages[PostStage::BlurVertical.index()]
            .descriptor_sets
            .pop();
        assert!(matches!(
            post.validate(),
            Err(PostProcessError::MissingDescriptorSets {
                stage: PostStage::BlurVertical,
                expected: 2,
                actual: 1,
            })
        ));
    }

    #[test]
    fn test_resize_swaps_bindings_in_place() {
        let (backend, mut post, _) = setup(Extent2D::new(64, 64));
        let sets = post.descriptor_sets(PostStage::BlurHorizontal).to_vec();
        let old_copy = post.target(PostStage::Copy).unwrap();

        backend.recreate_swapchain(Extent2D::new(128, 96)).unwrap();
        let scene_color = create_target(
            backend.as_ref(),
            "scene color",
            POST_TARGET_FORMAT,
            Extent2D::new(128, 96),
        )
        .unwrap();
        let screen_pipeline = post.pipeline(PostStage::Screen).unwrap();
        let screen = backend
            .create_render_pass(&RenderPassDescriptor {
                label: Some("ScreenPass".into()),
                attachments: Cow::Owned(vec![AttachmentDescriptor::cleared(
                    backend.swapchain_format(),
                    AttachmentFinalUsage::Present,
                )]),
                offscreen: false,
            })
            .unwrap();
        post.resize(scene_color, screen).unwrap();

        assert_eq!(post.descriptor_sets(PostStage::BlurHorizontal), sets.as_slice());
        let new_copy = post.target(PostStage::Copy).unwrap();
        assert_ne!(new_copy, old_copy);
        assert_eq!(
            backend.descriptor_component(sets[0], 0).unwrap(),
            DescriptorComponent::CombinedImageSampler {
                texture: new_copy,
                sampler: post.resources.as_ref().unwrap().sampler,
            }
        );
        assert_ne!(post.pipeline(PostStage::Screen), Some(screen_pipeline));
        assert_eq!(post.push_constants(PostStage::BlurVertical), Some(48.0));
    }
}
