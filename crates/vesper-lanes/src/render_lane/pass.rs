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

use std::borrow::Cow;
use std::sync::Arc;
use vesper_core::math::Extent2D;
use vesper_core::renderer::api::*;
use vesper_core::renderer::{CommandError, CommandRecorder, GraphicsBackend, ResourceError};

/// How the framebuffers of a pass are sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassSize {
    /// A fixed size, independent of the window.
    Fixed(Extent2D),
    /// The current swapchain extent.
    Swapchain,
    /// The swapchain extent divided by the factor, rounded down and at least 1x1.
    SwapchainScaled(u32),
}

impl PassSize {
    /// The framebuffer extent for a swapchain of `swapchain` size.
    pub fn resolve(&self, swapchain: Extent2D) -> Extent2D {
        match self {
            PassSize::Fixed(extent) => *extent,
            PassSize::Swapchain => swapchain,
            PassSize::SwapchainScaled(divisor) => swapchain.downscaled(*divisor),
        }
    }
}

/// A render pass together with the framebuffers it renders into.
///
/// Framebuffers are created lazily the first time an image index is begun,
/// from the attachment lists registered with [`set_targets`](Self::set_targets).
/// Offscreen passes register one list used for every image; the screen pass
/// registers one per swapchain image.
#[derive(Debug)]
pub struct RenderPassInstance {
    backend: Arc<dyn GraphicsBackend>,
    label: String,
    render_pass: RenderPassId,
    attachments: Vec<AttachmentDescriptor>,
    size: PassSize,
    extent: Extent2D,
    targets: Vec<Vec<TextureId>>,
    framebuffers: Vec<Option<FramebufferId>>,
    clear_values: Vec<ClearValue>,
}

impl RenderPassInstance {
    /// Creates the backend render pass.
    pub fn new(
        backend: Arc<dyn GraphicsBackend>,
        label: &str,
        attachments: &[AttachmentDescriptor],
        offscreen: bool,
        size: PassSize,
        clear_values: Vec<ClearValue>,
    ) -> Result<Self, ResourceError> {
        let descriptor = RenderPassDescriptor {
            label: Some(Cow::Borrowed(label)),
            attachments: Cow::Borrowed(attachments),
            offscreen,
        };
        descriptor.validate().map_err(|e| {
            log::error!("RenderPassInstance '{label}': {e}");
            e
        })?;
        let render_pass = backend.create_render_pass(&descriptor)?;
        let extent = size.resolve(backend.extent());
        log::debug!("RenderPassInstance '{label}': created {render_pass:?}");
        Ok(Self {
            backend,
            label: label.to_string(),
            render_pass,
            attachments: attachments.to_vec(),
            size,
            extent,
            targets: Vec::new(),
            framebuffers: Vec::new(),
            clear_values,
        })
    }

    /// The debug label, which is also the label recorded when the pass begins.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The backend render pass.
    pub fn render_pass(&self) -> RenderPassId {
        self.render_pass
    }

    /// The attachment descriptions.
    pub fn attachments(&self) -> &[AttachmentDescriptor] {
        &self.attachments
    }

    /// How framebuffers are sized.
    pub fn size(&self) -> PassSize {
        self.size
    }

    /// The extent of the current framebuffers.
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Replaces the attachment lists and destroys every framebuffer built from the old ones.
    pub fn set_targets(&mut self, targets: Vec<Vec<TextureId>>, extent: Extent2D) {
        self.invalidate();
        self.framebuffers = vec![None; targets.len()];
        self.targets = targets;
        self.extent = extent;
    }

    /// Destroys every framebuffer. They are rebuilt on next use.
    pub fn invalidate(&mut self) {
        for framebuffer in self.framebuffers.iter_mut().filter_map(Option::take) {
            if let Err(e) = self.backend.destroy_framebuffer(framebuffer) {
                log::warn!("RenderPassInstance '{}': failed to destroy {framebuffer:?}: {e}", self.label);
            }
        }
    }

    /// The framebuffers built so far, indexed like the target lists.
    pub fn framebuffers(&self) -> Vec<FramebufferId> {
        self.framebuffers.iter().flatten().copied().collect()
    }

    /// Returns the framebuffer for a swapchain image, building it on first use.
    pub fn framebuffer(&mut self, image_index: u32) -> Result<FramebufferId, ResourceError> {
        let slot = if self.targets.len() == 1 {
            0
        } else {
            image_index as usize
        };
        if let Some(Some(framebuffer)) = self.framebuffers.get(slot) {
            return Ok(*framebuffer);
        }
        let Some(attachments) = self.targets.get(slot) else {
            log::error!(
                "RenderPassInstance '{}': no attachments are registered for image {image_index}",
                self.label
            );
            return Err(ResourceError::DescriptorMismatch(format!(
                "render pass '{}' has no targets for image {image_index}",
                self.label
            )));
        };
        let framebuffer = self.backend.create_framebuffer(&FramebufferDescriptor {
            label: Some(Cow::Owned(format!("{} framebuffer {slot}", self.label))),
            render_pass: self.render_pass,
            attachments: Cow::Borrowed(attachments),
            extent: self.extent,
        })?;
        log::trace!(
            "RenderPassInstance '{}': built {framebuffer:?} at {}x{}",
            self.label,
            self.extent.width,
            self.extent.height
        );
        self.framebuffers[slot] = Some(framebuffer);
        Ok(framebuffer)
    }

    /// Begins the pass on the framebuffer of `image_index` and sets a full viewport and scissor.
    pub fn begin(
        &mut self,
        recorder: &mut dyn CommandRecorder,
        image_index: u32,
    ) -> Result<(), CommandError> {
        let framebuffer = self.framebuffer(image_index)?;
        recorder.begin_render_pass(&RenderPassBeginInfo {
            render_pass: self.render_pass,
            framebuffer,
            clear_values: &self.clear_values,
        })?;
        recorder.set_viewport(&Viewport::from_extent(self.extent))?;
        recorder.set_scissor(&ScissorRect::from_extent(self.extent))
    }

    /// Destroys the framebuffers and the render pass.
    pub fn destroy(mut self) {
        self.invalidate();
        if let Err(e) = self.backend.destroy_render_pass(self.render_pass) {
            log::warn!("RenderPassInstance '{}': failed to destroy the render pass: {e}", self.label);
        }
    }
}

/// Creates a texture used as a render target and then sampled.
pub(crate) fn create_target(
    backend: &dyn GraphicsBackend,
    label: &str,
    format: TextureFormat,
    extent: Extent2D,
) -> Result<TextureId, ResourceError> {
    backend.create_texture(&TextureDescriptor {
        label: Some(Cow::Borrowed(label)),
        size: extent,
        format,
        usage: TextureUsage::RENDER_ATTACHMENT | TextureUsage::SAMPLED,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vesper_infra::ImmediateBackend;

    #[test]
    fn test_scaled_size_rounds_down() {
        let extent = Extent2D::new(1281, 721);
        assert_eq!(PassSize::SwapchainScaled(2).resolve(extent), Extent2D::new(640, 360));
        assert_eq!(PassSize::Swapchain.resolve(extent), extent);
        assert_eq!(
            PassSize::Fixed(Extent2D::new(64, 64)).resolve(extent),
            Extent2D::new(64, 64)
        );
    }

    #[test]
    fn test_framebuffers_are_lazy_and_invalidated() {
        let backend = Arc::new(ImmediateBackend::with_defaults().unwrap());
        let extent = Extent2D::new(32, 32);
        let mut pass = RenderPassInstance::new(
            backend.clone(),
            "TestPass",
            &[AttachmentDescriptor::cleared(
                TextureFormat::Rgba16Float,
                AttachmentFinalUsage::Sampled,
            )],
            true,
            PassSize::Fixed(extent),
            vec![ClearValue::Color([0.0; 4])],
        )
        .unwrap();
        let target = create_target(backend.as_ref(), "target", TextureFormat::Rgba16Float, extent)
            .unwrap();
        pass.set_targets(vec![vec![target]], extent);
        assert!(pass.framebuffers().is_empty());

        let first = pass.framebuffer(0).unwrap();
        assert_eq!(pass.framebuffer(2).unwrap(), first);
        assert!(backend.is_framebuffer_live(first));

        pass.invalidate();
        assert!(!backend.is_framebuffer_live(first));
        assert!(pass.framebuffers().is_empty());
    }

    #[test]
    fn test_missing_targets_are_reported() {
        let backend = Arc::new(ImmediateBackend::with_defaults().unwrap());
        let mut pass = RenderPassInstance::new(
            backend,
            "Empty",
            &[AttachmentDescriptor::cleared(
                TextureFormat::Depth32Float,
                AttachmentFinalUsage::Sampled,
            )],
            true,
            PassSize::Swapchain,
            vec![],
        )
        .unwrap();
        assert!(pass.framebuffer(0).is_err());
    }
}
