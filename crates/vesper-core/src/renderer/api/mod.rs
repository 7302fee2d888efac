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

//! Backend-agnostic rendering API.
//!
//! Organized into several logical sub-modules:
//!
//! - **[`core`]**: Frame protocol, backend limits, settings and statistics.
//! - **[`resource`]**: GPU handles (Buffer, Texture, Shader, Descriptor sets) and their descriptors.
//! - **[`command`]**: Command pools, render passes, framebuffers and viewport state.
//! - **[`pipeline`]**: Static pipeline state and vertex layouts.
//! - **[`util`]**: Shared enums and flag types.

pub mod command;
pub mod core;
pub mod pipeline;
pub mod resource;
pub mod util;

pub use self::command::*;
pub use self::core::*;
pub use self::pipeline::*;
pub use self::resource::*;
pub use self::util::*;
