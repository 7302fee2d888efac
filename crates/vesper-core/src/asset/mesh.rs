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

use crate::renderer::api::{BufferId, IndexFormat, VertexBufferLayout};

/// Opaque identifier of a mesh in the asset layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// A mesh whose vertex and index data are already uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuMesh {
    /// The vertex buffer, shared by every batch drawing this mesh.
    pub vertex_buffer: BufferId,
    /// The index buffer.
    pub index_buffer: BufferId,
    /// Number of indices to draw.
    pub index_count: u32,
    /// Format of the indices.
    pub index_format: IndexFormat,
    /// Layout of one vertex.
    pub vertex_layout: VertexBufferLayout,
}

impl GpuMesh {
    /// Number of triangles drawn per instance.
    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}
