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

//! Flags representing which shader stages can access a resource binding.

use super::enums::ShaderStage;
use bitflags::bitflags;

bitflags! {
    /// Flags representing which shader stages can access a binding or push constant range.
    ///
    /// Multiple stages can be combined using bitwise operations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        /// Vertex shader stage.
        const VERTEX = 1 << 0;
        /// Fragment shader stage.
        const FRAGMENT = 1 << 1;
        /// All graphics stages (vertex + fragment).
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

impl ShaderStageFlags {
    /// Creates flags from a single shader stage.
    pub const fn from_stage(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Fragment => Self::FRAGMENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_stage_flags_union() {
        let flags = ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT;
        assert_eq!(flags, ShaderStageFlags::VERTEX_FRAGMENT);
        assert!(flags.contains(ShaderStageFlags::from_stage(ShaderStage::Vertex)));
        assert!(flags.contains(ShaderStageFlags::from_stage(ShaderStage::Fragment)));
        assert!(!ShaderStageFlags::VERTEX.contains(ShaderStageFlags::FRAGMENT));
        assert!(ShaderStageFlags::empty().is_empty());
    }
}
