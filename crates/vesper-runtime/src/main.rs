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

//! Headless Vesper runtime.
//!
//! Loads a [`RuntimeConfig`], creates the selected backend and renders the demo
//! scene for a fixed number of frames. Any render error is fatal and ends the
//! process with a non-zero status.

mod config;
mod scene;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use config::RuntimeConfig;
use scene::DemoScene;
use std::path::PathBuf;
use std::time::Instant;
use vesper_core::renderer::api::GraphicsBackendType;
use vesper_infra::create_backend;
use vesper_lanes::{FrameOutcome, MasterRenderer, RenderContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Explicit,
    Immediate,
}

impl From<BackendArg> for GraphicsBackendType {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Explicit => GraphicsBackendType::Explicit,
            BackendArg::Immediate => GraphicsBackendType::Immediate,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about = "Renders the Vesper demo scene on a headless backend")]
struct Cli {
    /// RON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the configured backend.
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,

    /// Overrides the configured number of frames.
    #[arg(short, long)]
    frames: Option<u64>,
}

const FRAME_TIME: f32 = 1.0 / 60.0;

fn load_config(cli: &Cli) -> Result<RuntimeConfig> {
    let mut config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    if let Some(frames) = cli.frames {
        config.frame_count = frames;
    }
    Ok(config)
}

fn run(config: &RuntimeConfig) -> Result<()> {
    let backend = create_backend(config.backend, config.backend_config())
        .context("failed to create the graphics backend")?;
    let context = RenderContext::new(backend.clone(), config.render.clone());
    let mut renderer = MasterRenderer::new(&context).context("failed to create the renderer")?;
    let mut scene = DemoScene::load(backend.as_ref())?;

    let started = Instant::now();
    let mut presented = 0u64;
    let mut skipped = 0u64;
    for frame in 0..config.frame_count {
        if let Some(resize) = config.resize.filter(|r| r.at_frame == frame) {
            log::info!(
                "Window resized to {}x{} before frame {frame}",
                resize.extent.width,
                resize.extent.height
            );
            renderer.handle_resize(resize.extent)?;
        }

        let time = frame as f32 * FRAME_TIME;
        if renderer.begin_frame()? == FrameOutcome::Resized {
            skipped += 1;
            continue;
        }
        scene.update(time);
        for drawable in scene.drawables(time) {
            renderer.submit(scene.assets(), &drawable)?;
        }
        let view = scene.view(time, FRAME_TIME, backend.extent().aspect_ratio());
        match renderer.render(&view)? {
            FrameOutcome::Resized => skipped += 1,
            _ => presented += 1,
        }
        if frame % 60 == 0 {
            let stats = renderer.stats();
            log::info!(
                "Frame {}: {} passes, {} batches, {} draws, {} triangles",
                stats.frame_number,
                stats.render_passes,
                stats.batches_drawn,
                stats.draw_calls,
                stats.triangles_rendered
            );
        }
    }

    let elapsed = started.elapsed();
    log::info!(
        "Rendered {presented} frames ({skipped} skipped) in {:.2} ms, {} live batches",
        elapsed.as_secs_f64() * 1000.0,
        renderer.batcher().stats().batches
    );
    renderer.destroy();
    Ok(())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    log::info!(
        "Starting on the {} backend at {}x{} for {} frames",
        config.backend,
        config.extent.width,
        config.extent.height,
        config.frame_count
    );
    run(&config).map_err(|e| {
        log::error!("Fatal render error: {e:#}");
        e
    })
}
