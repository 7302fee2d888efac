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

//! Handles for command pools and the command buffers allocated from them.

/// An opaque handle to a command pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandPoolId(pub usize);

/// An opaque handle to a command buffer.
///
/// Command buffers are allocated up front from a pool and re-recorded every
/// time their frame slot comes around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandBufferId(pub usize);
