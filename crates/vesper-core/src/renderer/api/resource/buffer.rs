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

//! Defines data structures related to GPU buffer resources.

use bitflags::bitflags;
use std::borrow::Cow;

bitflags! {
    /// The ways a buffer may be used by the GPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Source of a copy operation.
        const COPY_SRC = 1 << 0;
        /// Destination of a copy or write operation.
        const COPY_DST = 1 << 1;
        /// Bound as a vertex buffer.
        const VERTEX = 1 << 2;
        /// Bound as an index buffer.
        const INDEX = 1 << 3;
        /// Bound as a uniform buffer.
        const UNIFORM = 1 << 4;
        /// Bound as a storage buffer.
        const STORAGE = 1 << 5;
    }
}

/// How often the contents of a buffer are expected to change.
///
/// Backends use this to pick a memory placement. An explicit backend keeps
/// `Static` buffers device-local and uploads through a staging copy; a
/// `PerFrame` buffer lives in host-visible memory and is N-buffered by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdateFrequency {
    /// Written once at creation, then read-only.
    #[default]
    Static,
    /// Rewritten every frame.
    PerFrame,
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// A bitmask of [`BufferUsage`] flags describing how the buffer will be used.
    pub usage: BufferUsage,
    /// How often the buffer's contents change.
    pub update_frequency: UpdateFrequency,
    /// If `true`, the CPU writes directly into the buffer's memory.
    pub host_visible: bool,
}

impl<'a> BufferDescriptor<'a> {
    /// Describes a buffer holding `count` elements of `element_size` bytes.
    pub fn for_elements(
        label: impl Into<Cow<'a, str>>,
        element_size: u64,
        count: u64,
        usage: BufferUsage,
        update_frequency: UpdateFrequency,
    ) -> Self {
        Self {
            label: Some(label.into()),
            size: element_size * count,
            usage,
            update_frequency,
            host_visible: update_frequency == UpdateFrequency::PerFrame,
        }
    }
}

/// An opaque handle to a GPU buffer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);
