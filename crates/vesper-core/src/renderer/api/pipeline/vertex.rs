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

//! Vertex buffer layouts.

/// The format of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats.
    Float32x2,
    /// Three 32-bit floats.
    Float32x3,
    /// Four 32-bit floats.
    Float32x4,
    /// Four 32-bit unsigned integers.
    Uint32x4,
}

impl VertexFormat {
    /// Size of the attribute in bytes.
    pub const fn size(&self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 | VertexFormat::Uint32x4 => 16,
        }
    }
}

/// Whether a vertex buffer advances per vertex or per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexStepMode {
    /// Advances once per vertex.
    #[default]
    Vertex,
    /// Advances once per instance.
    Instance,
}

/// One attribute within a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader location.
    pub location: u32,
    /// Attribute format.
    pub format: VertexFormat,
    /// Byte offset inside one element.
    pub offset: u64,
}

/// The layout of one bound vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexBufferLayout {
    /// Distance between consecutive elements in bytes.
    pub stride: u64,
    /// How the buffer advances.
    pub step_mode: VertexStepMode,
    /// The attributes read from each element.
    pub attributes: Vec<VertexAttribute>,
}

impl VertexBufferLayout {
    /// Builds a tightly packed layout from consecutive attribute formats.
    pub fn packed(step_mode: VertexStepMode, first_location: u32, formats: &[VertexFormat]) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .enumerate()
            .map(|(i, format)| {
                let attribute = VertexAttribute {
                    location: first_location + i as u32,
                    format: *format,
                    offset,
                };
                offset += format.size();
                attribute
            })
            .collect();
        Self {
            stride: offset,
            step_mode,
            attributes,
        }
    }

    /// A per-instance 4x4 matrix, spread over four consecutive locations.
    pub fn instance_mat4(first_location: u32) -> Self {
        Self::packed(
            VertexStepMode::Instance,
            first_location,
            &[VertexFormat::Float32x4; 4],
        )
    }
}
