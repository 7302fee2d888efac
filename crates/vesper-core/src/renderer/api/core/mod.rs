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

//! Frame protocol, backend limits, settings and statistics.

/// The number of frames in flight used when a backend does not impose its own.
///
/// This determines the number of slots in every N-buffered per-frame resource.
pub const DEFAULT_FRAMES_IN_FLIGHT: usize = 2;

pub mod limits;
pub mod settings;
pub mod stats;
pub mod swapchain;

pub use self::limits::*;
pub use self::settings::*;
pub use self::stats::*;
pub use self::swapchain::*;
