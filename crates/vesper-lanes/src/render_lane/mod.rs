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

//! Rendering lane - batching, pass sequencing and post-processing.

mod batcher;
mod context;
mod descriptor_pool;
mod error;
mod kinds;
mod master_renderer;
mod pass;
mod post_processing;
mod scene_data;

pub use batcher::*;
pub use context::*;
pub use descriptor_pool::*;
pub use error::*;
pub use kinds::*;
pub use master_renderer::*;
pub use pass::*;
pub use post_processing::*;
pub use scene_data::*;
