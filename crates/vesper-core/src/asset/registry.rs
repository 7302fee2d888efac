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

use super::{AssetSource, GpuMaterial, GpuMesh, MaterialId, MeshId};
use std::collections::HashMap;

/// A map-backed [`AssetSource`].
///
/// Used by the runtime and by tests; a full engine would implement
/// [`AssetSource`] on top of its own asset database.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    meshes: HashMap<MeshId, GpuMesh>,
    materials: HashMap<MaterialId, GpuMaterial>,
}

impl AssetRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a mesh, returning the one it replaced.
    pub fn insert_mesh(&mut self, id: MeshId, mesh: GpuMesh) -> Option<GpuMesh> {
        self.meshes.insert(id, mesh)
    }

    /// Registers a material, returning the one it replaced.
    pub fn insert_material(&mut self, id: MaterialId, material: GpuMaterial) -> Option<GpuMaterial> {
        self.materials.insert(id, material)
    }

    /// Removes a mesh.
    pub fn remove_mesh(&mut self, id: MeshId) -> Option<GpuMesh> {
        self.meshes.remove(&id)
    }

    /// Removes a material.
    pub fn remove_material(&mut self, id: MaterialId) -> Option<GpuMaterial> {
        self.materials.remove(&id)
    }
}

impl AssetSource for AssetRegistry {
    fn mesh(&self, id: MeshId) -> Option<&GpuMesh> {
        self.meshes.get(&id)
    }

    fn material(&self, id: MaterialId) -> Option<&GpuMaterial> {
        self.materials.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::RenderPassType;

    #[test]
    fn test_registry_lookup() {
        let mut registry = AssetRegistry::new();
        registry.insert_material(
            MaterialId(3),
            GpuMaterial {
                transparent: true,
                ..Default::default()
            },
        );
        let material = registry.material(MaterialId(3)).unwrap();
        assert_eq!(material.color_pass(), RenderPassType::Transparent);
        assert!(registry.material(MaterialId(4)).is_none());
        assert!(registry.remove_material(MaterialId(3)).is_some());
        assert!(registry.mesh(MeshId(0)).is_none());
    }
}
