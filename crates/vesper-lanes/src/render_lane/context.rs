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

use super::batcher::BatchIdentifierRegistry;
use super::error::BatchError;
use std::sync::{Arc, Mutex, MutexGuard};
use vesper_core::renderer::api::RenderSettings;
use vesper_core::renderer::{GraphicsBackend, ResourceError};

/// State shared by every component of the render core.
///
/// Holds the injected backend, the settings and the batch identifier
/// namespace. Cloning is cheap and every clone refers to the same registry, so
/// all batchers built from one context allocate identifiers from one namespace.
#[derive(Debug, Clone)]
pub struct RenderContext {
    backend: Arc<dyn GraphicsBackend>,
    settings: RenderSettings,
    identifiers: Arc<Mutex<BatchIdentifierRegistry>>,
}

impl RenderContext {
    /// Creates a context around a backend selected at startup.
    pub fn new(backend: Arc<dyn GraphicsBackend>, settings: RenderSettings) -> Self {
        log::info!(
            "RenderContext: {} backend, {} frames in flight",
            backend.backend_type(),
            backend.max_frames_in_flight()
        );
        Self {
            backend,
            settings,
            identifiers: Arc::new(Mutex::new(BatchIdentifierRegistry::new())),
        }
    }

    /// The graphics backend.
    pub fn backend(&self) -> &Arc<dyn GraphicsBackend> {
        &self.backend
    }

    /// The render settings.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Number of frames the CPU may record ahead of the GPU.
    pub fn frames_in_flight(&self) -> usize {
        self.backend.max_frames_in_flight()
    }

    /// Locks the batch identifier registry.
    pub fn identifiers(&self) -> Result<MutexGuard<'_, BatchIdentifierRegistry>, BatchError> {
        self.identifiers.lock().map_err(|e| {
            BatchError::Resource(ResourceError::BackendError(format!(
                "Mutex poisoned (batch identifiers): {e}"
            )))
        })
    }
}
