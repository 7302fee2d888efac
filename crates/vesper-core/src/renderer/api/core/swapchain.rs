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

//! The frame protocol surface of the swapchain.

/// Outcome of acquiring or presenting a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapchainStatus {
    /// The operation succeeded.
    Success,
    /// The swapchain no longer matches the window and must be recreated.
    ResizeRequired,
    /// An unrecoverable error; the application should shut down.
    Error,
}

/// The result of [`GraphicsBackend::acquire_image`](crate::renderer::GraphicsBackend::acquire_image).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredImage {
    /// Whether an image was acquired.
    pub status: SwapchainStatus,
    /// Index of the acquired swapchain image. Only meaningful on success.
    pub image_index: u32,
}
