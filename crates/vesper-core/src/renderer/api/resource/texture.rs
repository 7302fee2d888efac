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

//! Defines data structures for textures, samplers and image layouts.

use crate::math::Extent2D;
use crate::renderer::api::util::TextureFormat;
use bitflags::bitflags;
use std::borrow::Cow;

bitflags! {
    /// The ways a texture may be used by the GPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Destination of a copy or upload.
        const COPY_DST = 1 << 0;
        /// Sampled from a shader.
        const SAMPLED = 1 << 1;
        /// Used as a color or depth attachment.
        const RENDER_ATTACHMENT = 1 << 2;
        /// Presented to the screen.
        const PRESENT = 1 << 3;
    }
}

/// The memory layout an image is currently in.
///
/// Only explicit backends track this; GL-style backends report [`ImageLayout::Undefined`]
/// for every texture and never record transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageLayout {
    /// Contents are undefined; the image has not been written yet.
    #[default]
    Undefined,
    /// Optimal for use as a color attachment.
    ColorAttachment,
    /// Optimal for use as a depth/stencil attachment.
    DepthStencilAttachment,
    /// Optimal for sampling from shaders.
    ShaderReadOnly,
    /// Ready to be presented by the swapchain.
    PresentSrc,
}

impl ImageLayout {
    /// The attachment layout a texture of `format` is rendered in.
    pub const fn attachment_for(format: TextureFormat) -> Self {
        if format.is_depth() {
            ImageLayout::DepthStencilAttachment
        } else {
            ImageLayout::ColorAttachment
        }
    }
}

/// A descriptor used to create a [`TextureId`].
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The size of the texture.
    pub size: Extent2D,
    /// The texel format.
    pub format: TextureFormat,
    /// How the texture will be used.
    pub usage: TextureUsage,
}

/// An opaque handle to a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest-neighbour filtering.
    Nearest,
    /// Bilinear filtering.
    #[default]
    Linear,
}

/// How texture coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to the edge texel.
    #[default]
    ClampToEdge,
    /// Tile the texture.
    Repeat,
}

/// A descriptor used to create a [`SamplerId`].
#[derive(Debug, Clone, Default)]
pub struct SamplerDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// Minification and magnification filter.
    pub filter: FilterMode,
    /// Addressing mode for all axes.
    pub address_mode: AddressMode,
    /// Enables depth comparison, used for shadow maps.
    pub compare: bool,
}

/// An opaque handle to a texture sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerId(pub usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_layout_follows_format() {
        assert_eq!(
            ImageLayout::attachment_for(TextureFormat::Depth32Float),
            ImageLayout::DepthStencilAttachment
        );
        assert_eq!(
            ImageLayout::attachment_for(TextureFormat::Rgba16Float),
            ImageLayout::ColorAttachment
        );
    }
}
