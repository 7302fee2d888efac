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

//! Interfaces to the asset layer.
//!
//! The render core never loads or mutates assets. It looks up meshes and
//! materials that are already resident on the GPU through [`AssetSource`],
//! using opaque identifiers handed to it at submission time.

mod material;
mod mesh;
mod registry;

pub use material::*;
pub use mesh::*;
pub use registry::*;

/// Read-only access to GPU-resident meshes and materials.
pub trait AssetSource {
    /// Looks up a mesh.
    fn mesh(&self, id: MeshId) -> Option<&GpuMesh>;

    /// Looks up a material.
    fn material(&self, id: MaterialId) -> Option<&GpuMaterial>;
}
