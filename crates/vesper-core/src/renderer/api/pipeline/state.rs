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

//! Fixed-function pipeline state.

/// Comparison used by the depth test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    /// Passes if the incoming value is less than the stored one.
    #[default]
    Less,
    /// Passes if the incoming value is less than or equal to the stored one.
    LessEqual,
    /// Always passes.
    Always,
}

/// Depth test and write configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    /// Enables the depth test.
    pub test: bool,
    /// Enables depth writes.
    pub write: bool,
    /// The comparison function.
    pub compare: CompareFunction,
}

impl DepthState {
    /// Depth test and write, used by opaque geometry and shadow casters.
    pub const READ_WRITE: Self = Self {
        test: true,
        write: true,
        compare: CompareFunction::Less,
    };
    /// Depth test without writes, used by transparent geometry.
    pub const READ_ONLY: Self = Self {
        test: true,
        write: false,
        compare: CompareFunction::LessEqual,
    };
    /// No depth testing, used by full-screen and GUI draws.
    pub const DISABLED: Self = Self {
        test: false,
        write: false,
        compare: CompareFunction::Always,
    };
}

/// Color blending mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Overwrite the destination.
    #[default]
    Opaque,
    /// Standard alpha blending.
    AlphaBlend,
    /// Add the source to the destination.
    Additive,
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// Draw both faces.
    None,
    /// Cull back faces.
    #[default]
    Back,
    /// Cull front faces. Used by the shadow pass to reduce acne.
    Front,
}
