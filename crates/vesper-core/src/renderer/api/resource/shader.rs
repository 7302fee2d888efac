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

//! Shader handles and the shader naming contract.
//!
//! Shader sources are owned by an external loader; the render core only
//! refers to them by name. Names for mesh shaders follow
//! `"{Static|Skinned}[HD]{Vertex|Fragment}Shader"`.

use crate::renderer::api::util::ShaderStage;
use std::borrow::Cow;

/// An opaque handle to a compiled shader module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub usize);

/// A descriptor used to create a [`ShaderId`].
#[derive(Debug, Clone)]
pub struct ShaderDescriptor<'a> {
    /// The name the shader loader knows this module by.
    pub name: Cow<'a, str>,
    /// The stage the module is compiled for.
    pub stage: ShaderStage,
}

/// The vertex-layout family a mesh shader is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderFamily {
    /// Rigid geometry: static meshes and terrain.
    Static,
    /// Geometry deformed by joint matrices.
    Skinned,
}

/// Builds a mesh shader name following the loader's naming contract.
///
/// # Examples
///
/// ```
/// use vesper_core::renderer::api::{mesh_shader_name, ShaderFamily, ShaderStage};
///
/// assert_eq!(mesh_shader_name(ShaderFamily::Skinned, true, ShaderStage::Vertex), "SkinnedHDVertexShader");
/// assert_eq!(mesh_shader_name(ShaderFamily::Static, false, ShaderStage::Fragment), "StaticFragmentShader");
/// ```
pub fn mesh_shader_name(family: ShaderFamily, high_detail: bool, stage: ShaderStage) -> String {
    let family = match family {
        ShaderFamily::Static => "Static",
        ShaderFamily::Skinned => "Skinned",
    };
    let detail = if high_detail { "HD" } else { "" };
    let stage = match stage {
        ShaderStage::Vertex => "Vertex",
        ShaderStage::Fragment => "Fragment",
    };
    format!("{family}{detail}{stage}Shader")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_shader_names_cover_all_variants() {
        let names: Vec<String> = [ShaderFamily::Static, ShaderFamily::Skinned]
            .into_iter()
            .flat_map(|family| {
                [false, true].into_iter().flat_map(move |hd| {
                    [ShaderStage::Vertex, ShaderStage::Fragment]
                        .into_iter()
                        .map(move |stage| mesh_shader_name(family, hd, stage))
                })
            })
            .collect();
        assert_eq!(
            names,
            vec![
                "StaticVertexShader",
                "StaticFragmentShader",
                "StaticHDVertexShader",
                "StaticHDFragmentShader",
                "SkinnedVertexShader",
                "SkinnedFragmentShader",
                "SkinnedHDVertexShader",
                "SkinnedHDFragmentShader",
            ]
        );
    }
}
