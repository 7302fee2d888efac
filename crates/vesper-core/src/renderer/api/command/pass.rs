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

//! Defines render passes, their attachments and the framebuffers built from them.
//!
//! A render pass describes how each attachment is used: whether its previous
//! contents are cleared or continued, and what the attachment is used for once
//! the pass ends. The explicit backend derives its layout transitions from the
//! final usage; the GL-style backend ignores it.

use crate::math::{Extent2D, Origin2D};
use crate::renderer::api::resource::TextureId;
use crate::renderer::api::util::TextureFormat;
use crate::renderer::error::ResourceError;
use std::borrow::Cow;

/// An opaque handle to a render pass description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPassId(pub usize);

/// An opaque handle to a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub usize);

/// Specifies the operation to perform on an attachment at the start of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Clear the attachment. Starts a new attachment.
    Clear,
    /// Keep the contents written by an earlier pass. Continues an attachment.
    Load,
    /// The previous contents are irrelevant.
    DontCare,
}

/// Specifies the operation to perform on an attachment at the end of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Preserve the rendered contents.
    Store,
    /// The contents may be discarded.
    Discard,
}

/// What an attachment is used for after the pass that writes it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentFinalUsage {
    /// Stays an attachment, e.g. for a following pass that continues it.
    Attachment,
    /// Sampled as a texture by a later pass.
    Sampled,
    /// Presented by the swapchain.
    Present,
}

/// Describes one attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentDescriptor {
    /// Format of the attached texture.
    pub format: TextureFormat,
    /// What happens to the existing contents when the pass begins.
    pub load_op: LoadOp,
    /// What happens to the rendered contents when the pass ends.
    pub store_op: StoreOp,
    /// Usage of the attachment after the pass ends.
    pub final_usage: AttachmentFinalUsage,
}

impl AttachmentDescriptor {
    /// A new, cleared attachment.
    pub const fn cleared(format: TextureFormat, final_usage: AttachmentFinalUsage) -> Self {
        Self {
            format,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            final_usage,
        }
    }

    /// An attachment continued from an earlier pass with its contents preserved.
    pub const fn continued(format: TextureFormat, final_usage: AttachmentFinalUsage) -> Self {
        Self {
            format,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
            final_usage,
        }
    }

    /// Returns `true` if the attachment keeps contents from an earlier pass.
    pub const fn is_continued(&self) -> bool {
        matches!(self.load_op, LoadOp::Load)
    }
}

/// A descriptor used to create a [`RenderPassId`].
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The attachments, in framebuffer order.
    pub attachments: Cow<'a, [AttachmentDescriptor]>,
    /// `true` if the pass renders to textures consumed later rather than to the swapchain.
    pub offscreen: bool,
}

impl RenderPassDescriptor<'_> {
    /// Checks that the attachment usages agree with the `offscreen` flag.
    ///
    /// An offscreen pass may not present, and an offscreen pass that leaves an
    /// attachment behind must make it sampleable or keep it as an attachment for
    /// a continuing pass.
    pub fn validate(&self) -> Result<(), ResourceError> {
        if self.attachments.is_empty() {
            return Err(ResourceError::DescriptorMismatch(format!(
                "render pass '{}' declares no attachments",
                self.label.as_deref().unwrap_or("unnamed")
            )));
        }
        let presents = self
            .attachments
            .iter()
            .any(|a| a.final_usage == AttachmentFinalUsage::Present);
        if self.offscreen && presents {
            return Err(ResourceError::DescriptorMismatch(format!(
                "offscreen render pass '{}' cannot present an attachment",
                self.label.as_deref().unwrap_or("unnamed")
            )));
        }
        if !self.offscreen && !presents {
            return Err(ResourceError::DescriptorMismatch(format!(
                "on-screen render pass '{}' must present one attachment",
                self.label.as_deref().unwrap_or("unnamed")
            )));
        }
        Ok(())
    }
}

/// A descriptor used to create a [`FramebufferId`].
#[derive(Debug, Clone)]
pub struct FramebufferDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The render pass this framebuffer is compatible with.
    pub render_pass: RenderPassId,
    /// Attached textures, in the same order as the pass attachments.
    pub attachments: Cow<'a, [TextureId]>,
    /// Size of every attachment.
    pub extent: Extent2D,
}

/// The value an attachment is cleared to when its load op is [`LoadOp::Clear`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// A color clear.
    Color([f32; 4]),
    /// A depth/stencil clear.
    DepthStencil {
        /// Depth value.
        depth: f32,
        /// Stencil value.
        stencil: u32,
    },
}

/// Everything needed to begin a render pass instance.
#[derive(Debug, Clone)]
pub struct RenderPassBeginInfo<'a> {
    /// The render pass.
    pub render_pass: RenderPassId,
    /// The framebuffer to render into.
    pub framebuffer: FramebufferId,
    /// One clear value per attachment.
    pub clear_values: &'a [ClearValue],
}

/// A viewport transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Near depth.
    pub min_depth: f32,
    /// Far depth.
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering the whole of `extent`.
    pub fn from_extent(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// A scissor rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    /// Top-left corner.
    pub origin: Origin2D,
    /// Size of the rectangle.
    pub extent: Extent2D,
}

impl ScissorRect {
    /// A scissor covering the whole of `extent`.
    pub const fn from_extent(extent: Extent2D) -> Self {
        Self {
            origin: Origin2D { x: 0, y: 0 },
            extent,
        }
    }
}

/// The render passes a batch can be recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RenderPassType {
    /// Depth-only pass from the shadow-casting light.
    Shadow,
    /// Opaque geometry into the scene color and depth attachments.
    Opaque,
    /// Blended geometry continuing the opaque attachments.
    Transparent,
    /// Screen-space GUI drawn over the composited frame.
    Screen,
}

impl RenderPassType {
    /// Every pass type, in recording order.
    pub const ALL: [RenderPassType; 4] = [
        RenderPassType::Shadow,
        RenderPassType::Opaque,
        RenderPassType::Transparent,
        RenderPassType::Screen,
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass(attachments: Vec<AttachmentDescriptor>, offscreen: bool) -> RenderPassDescriptor<'static> {
        RenderPassDescriptor {
            label: Some("test".into()),
            attachments: Cow::Owned(attachments),
            offscreen,
        }
    }

    #[test]
    fn test_offscreen_pass_cannot_present() {
        let desc = pass(
            vec![AttachmentDescriptor::cleared(
                TextureFormat::Rgba16Float,
                AttachmentFinalUsage::Present,
            )],
            true,
        );
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_screen_pass_must_present() {
        let desc = pass(
            vec![AttachmentDescriptor::cleared(
                TextureFormat::Bgra8UnormSrgb,
                AttachmentFinalUsage::Sampled,
            )],
            false,
        );
        assert!(desc.validate().is_err());

        let desc = pass(
            vec![AttachmentDescriptor::cleared(
                TextureFormat::Bgra8UnormSrgb,
                AttachmentFinalUsage::Present,
            )],
            false,
        );
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_continued_attachment() {
        let attachment =
            AttachmentDescriptor::continued(TextureFormat::Depth32Float, AttachmentFinalUsage::Attachment);
        assert!(attachment.is_continued());
        assert!(!AttachmentDescriptor::cleared(
            TextureFormat::Depth32Float,
            AttachmentFinalUsage::Sampled
        )
        .is_continued());
    }

    #[test]
    fn test_viewport_from_extent() {
        let viewport = Viewport::from_extent(Extent2D::new(640, 360));
        assert_eq!(viewport.width, 640.0);
        assert_eq!(viewport.height, 360.0);
        assert_eq!(viewport.max_depth, 1.0);
    }
}
