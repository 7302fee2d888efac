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

use super::explicit::ExplicitBackend;
use super::headless::HeadlessConfig;
use super::immediate::ImmediateBackend;
use std::sync::Arc;
use vesper_core::renderer::api::GraphicsBackendType;
use vesper_core::renderer::{GraphicsBackend, ResourceError};

/// Creates the backend selected at startup.
///
/// Everything downstream holds the result as `Arc<dyn GraphicsBackend>` and
/// never learns which implementation it got.
pub fn create_backend(
    kind: GraphicsBackendType,
    config: HeadlessConfig,
) -> Result<Arc<dyn GraphicsBackend>, ResourceError> {
    log::info!("Selecting the {kind} graphics backend");
    Ok(match kind {
        GraphicsBackendType::Explicit => Arc::new(ExplicitBackend::new(config)?),
        GraphicsBackendType::Immediate => Arc::new(ImmediateBackend::new(config)?),
    })
}
