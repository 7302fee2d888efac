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

//! Provides structs for representing extents (sizes) and origins (offsets) in 2D and 3D.
//!
//! These types describe the dimensions of textures, framebuffers and the swapchain.
//! They use integer (`u32`) components, making them suitable for pixel-based sizes.

use serde::{Deserialize, Serialize};

/// A two-dimensional extent, typically representing width and height.
///
/// This is commonly used for texture dimensions, framebuffer sizes and the
/// swapchain extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if either dimension is zero (e.g. a minimized window).
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Divides both dimensions by `divisor`, never going below one pixel.
    pub fn downscaled(&self, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self {
            width: (self.width / divisor).max(1),
            height: (self.height / divisor).max(1),
        }
    }

    /// Width divided by height, or `1.0` for a degenerate extent.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Promotes this extent to a single-layer 3D extent.
    pub const fn to_3d(self) -> Extent3D {
        Extent3D {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// A three-dimensional extent, representing width, height, and depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent3D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
    /// The depth or number of array layers.
    pub depth_or_array_layers: u32,
}

impl Extent3D {
    /// Drops the depth component.
    pub const fn to_2d(self) -> Extent2D {
        Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// A two-dimensional origin, typically representing an (x, y) offset.
///
/// Used as the top-left corner of scissor rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Origin2D {
    /// The x-coordinate of the origin.
    pub x: u32,
    /// The y-coordinate of the origin.
    pub y: u32,
}
