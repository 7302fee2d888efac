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

//! Provides the public, backend-agnostic rendering contracts for the Vesper render core.
//!
//! This module defines the "common language" for all rendering operations. It contains
//! the abstract `traits` (like [`GraphicsBackend`] and [`CommandRecorder`]), data
//! structures (like [`BufferDescriptor`]), and error types that form the stable API
//! between the render lanes and a concrete backend.
//!
//! The 'how' is handled by a backend implementation in the `vesper-infra` crate,
//! which implements these traits. `vesper-lanes` then uses them to batch and record
//! frames without needing to know which graphics API sits underneath.

pub mod api;
pub mod error;
pub mod light;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{CommandError, RenderError, ResourceError, ResourceKind};
pub use self::light::{AmbientLight, DirectionalLight};
pub use self::traits::{CommandRecorder, GraphicsBackend};
