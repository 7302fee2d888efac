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

//! Defines common enums used across the rendering API.

use serde::{Deserialize, Serialize};

/// Specifies the format of index buffer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// Indices are 16-bit unsigned integers.
    Uint16,
    /// Indices are 32-bit unsigned integers.
    #[default]
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub const fn size(&self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// The family of graphics API a backend drives.
///
/// The render lanes never branch on this; it exists for logging and for
/// selecting a backend at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphicsBackendType {
    /// An explicit API with image layouts, fences and fixed-size descriptor pools.
    Explicit,
    /// An immediate-mode, GL-style API without explicit layouts.
    Immediate,
}

impl std::fmt::Display for GraphicsBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphicsBackendType::Explicit => f.write_str("explicit"),
            GraphicsBackendType::Immediate => f.write_str("immediate"),
        }
    }
}

/// A single programmable stage of a graphics pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// The vertex stage.
    Vertex,
    /// The fragment stage.
    Fragment,
}

/// Pixel formats for textures and render attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 8-bit RGBA, normalized.
    Rgba8Unorm,
    /// 8-bit RGBA, normalized, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, normalized, sRGB encoded. The usual swapchain format.
    Bgra8UnormSrgb,
    /// 16-bit float RGBA. Used for HDR scene color.
    Rgba16Float,
    /// 32-bit float depth.
    Depth32Float,
    /// 24-bit depth with 8-bit stencil.
    Depth24PlusStencil8,
}

impl TextureFormat {
    /// Returns `true` if this is a depth (or depth-stencil) format.
    pub const fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth32Float | TextureFormat::Depth24PlusStencil8
        )
    }

    /// Size of one texel in bytes.
    pub const fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float => 8,
        }
    }
}
