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

//! Runtime configuration, loaded from RON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use vesper_core::math::Extent2D;
use vesper_core::renderer::api::{GraphicsBackendType, RenderSettings};
use vesper_infra::HeadlessConfig;

/// A window resize delivered before the given frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatedResize {
    /// Frame number the resize arrives before.
    pub at_frame: u64,
    /// The new window size.
    pub extent: Extent2D,
}

/// Everything the runtime needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// The backend to create.
    pub backend: GraphicsBackendType,
    /// Initial window size.
    pub extent: Extent2D,
    /// Frames recorded ahead of the GPU.
    pub frames_in_flight: usize,
    /// Swapchain images.
    pub swapchain_images: u32,
    /// Frames to render before exiting.
    pub frame_count: u64,
    /// An optional resize to exercise the recreation path.
    pub resize: Option<SimulatedResize>,
    /// Renderer settings.
    pub render: RenderSettings,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend: GraphicsBackendType::Explicit,
            extent: Extent2D::new(1280, 720),
            frames_in_flight: 2,
            swapchain_images: 3,
            frame_count: 120,
            resize: None,
            render: RenderSettings::default(),
        }
    }
}

impl RuntimeConfig {
    /// Reads a config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config '{}'", path.display()))
    }

    /// Parses a config from RON text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.frames_in_flight > 0, "frames_in_flight must be at least 1");
        anyhow::ensure!(self.swapchain_images > 0, "swapchain_images must be at least 1");
        anyhow::ensure!(!self.extent.is_empty(), "the window extent must be non-zero");
        Ok(())
    }

    /// The startup configuration of the headless backend.
    pub fn backend_config(&self) -> HeadlessConfig {
        HeadlessConfig {
            extent: self.extent,
            frames_in_flight: self.frames_in_flight,
            swapchain_image_count: self.swapchain_images,
            ..Default::default()
        }
    }
}
