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

use super::{
    BatchKind, SkinnedBatch, SkinnedDrawable, StaticBatch, StaticDrawable, TerrainBatch,
    TerrainTile, TerrainTileUniform,
};
use crate::render_lane::batcher::{
    BatchCreateInfo, BatchIdentifier, BatchPayload, BatchShape, Batcher,
};
use crate::render_lane::error::BatchError;
use vesper_core::asset::{AssetSource, GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::renderer::api::{BatchCapacities, RenderPassType};
use vesper_core::renderer::DirectionalLight;

/// One submission, already resolved against the asset layer.
pub(crate) struct BatchSubmission<'a> {
    pub kind: BatchKind,
    pub mesh_id: MeshId,
    pub material_id: MaterialId,
    pub mesh: &'a GpuMesh,
    pub material: &'a GpuMaterial,
    pub shape: BatchShape,
    pub light: &'a DirectionalLight,
}

/// Creates the batches a submission needs in each of `passes` if they do not
/// exist yet, then appends `payload` once to all of them.
pub(crate) fn submit_to_batches(
    batcher: &mut Batcher,
    submission: &BatchSubmission<'_>,
    passes: &[RenderPassType],
    payload: BatchPayload<'_>,
    frame: usize,
) -> Result<BatchIdentifier, BatchError> {
    let mut identifier = batcher.identifier_of(submission.mesh_id, submission.material_id);
    for pass in passes {
        if identifier.is_some_and(|id| batcher.contains(*pass, id)) {
            continue;
        }
        let shape = submission.shape;
        identifier = Some(batcher.create_batch(&BatchCreateInfo {
            mesh_id: submission.mesh_id,
            material_id: submission.material_id,
            mesh: submission.mesh,
            material: submission.material,
            kind: submission.kind,
            pass: *pass,
            max_repeat: shape.max_repeats,
            repeat_advance: shape.repeat_advance,
            max_instance: shape.max_instances,
            instance_advance: shape.instance_advance,
            instance_element_size: shape.instance_element_size,
            uniform_element_size: shape.uniform_element_size,
            light: Some(*submission.light),
        })?);
    }
    let Some(identifier) = identifier else {
        return Err(BatchError::PipelineUnavailable {
            geometry: submission.kind.geometry(),
            pass: RenderPassType::Opaque,
            reason: "the submission targets no pass",
        });
    };
    batcher.add_to_batch(identifier, payload, frame)?;
    Ok(identifier)
}

pub(crate) fn resolve_assets<'a>(
    assets: &'a dyn AssetSource,
    mesh: MeshId,
    material: MaterialId,
) -> Result<(&'a GpuMesh, &'a GpuMaterial), BatchError> {
    let Some(gpu_mesh) = assets.mesh(mesh) else {
        log::error!("Renderer3D: mesh {mesh:?} is not resident");
        return Err(BatchError::UnknownMesh(mesh));
    };
    let Some(gpu_material) = assets.material(material) else {
        log::error!("Renderer3D: material {material:?} is not resident");
        return Err(BatchError::UnknownMaterial(material));
    };
    Ok((gpu_mesh, gpu_material))
}

/// Submits 3D drawables: static meshes, skinned meshes and terrain tiles.
///
/// Every drawable lands in the color pass its material selects and, if the
/// material casts shadows, in the shadow pass too. Both batches share one
/// resource, so the drawable's data is written once.
#[derive(Debug, Clone)]
pub struct Renderer3D {
    capacities: BatchCapacities,
}

impl Renderer3D {
    /// Creates a renderer sizing new batches from `capacities`.
    pub fn new(capacities: BatchCapacities) -> Self {
        Self { capacities }
    }

    /// The capacities new batches are created with.
    pub fn capacities(&self) -> &BatchCapacities {
        &self.capacities
    }

    fn passes(material: &GpuMaterial) -> Vec<RenderPassType> {
        let mut passes = Vec::with_capacity(2);
        if material.casts_shadows {
            passes.push(RenderPassType::Shadow);
        }
        passes.push(material.color_pass());
        passes
    }

    /// Submits a static mesh.
    pub fn submit_static(
        &self,
        batcher: &mut Batcher,
        assets: &dyn AssetSource,
        drawable: &StaticDrawable,
        light: &DirectionalLight,
        frame: usize,
    ) -> Result<BatchIdentifier, BatchError> {
        let (mesh, material) = resolve_assets(assets, drawable.mesh, drawable.material)?;
        let instance = StaticBatch::instance(drawable);
        let submission = BatchSubmission {
            kind: BatchKind::Static,
            mesh_id: drawable.mesh,
            material_id: drawable.material,
            mesh,
            material,
            shape: StaticBatch::shape(self.capacities.static_instances),
            light,
        };
        submit_to_batches(
            batcher,
            &submission,
            &Self::passes(material),
            BatchPayload {
                instance: bytemuck::cast_slice(&instance),
                uniform: &[],
            },
            frame,
        )
    }

    /// Submits a skinned mesh in its current pose.
    pub fn submit_skinned(
        &self,
        batcher: &mut Batcher,
        assets: &dyn AssetSource,
        drawable: &SkinnedDrawable<'_>,
        light: &DirectionalLight,
        frame: usize,
    ) -> Result<BatchIdentifier, BatchError> {
        let (mesh, material) = resolve_assets(assets, drawable.mesh, drawable.material)?;
        let joint_count = self.capacities.skinned_joints;
        let uniform = SkinnedBatch::uniform(drawable, joint_count);
        let submission = BatchSubmission {
            kind: BatchKind::Skinned { joint_count },
            mesh_id: drawable.mesh,
            material_id: drawable.material,
            mesh,
            material,
            shape: SkinnedBatch::shape(self.capacities.skinned_repeats, joint_count),
            light,
        };
        submit_to_batches(
            batcher,
            &submission,
            &Self::passes(material),
            BatchPayload {
                instance: &[],
                uniform: bytemuck::cast_slice(&uniform),
            },
            frame,
        )
    }

    /// Submits a terrain tile.
    pub fn submit_terrain(
        &self,
        batcher: &mut Batcher,
        assets: &dyn AssetSource,
        tile: &TerrainTile,
        light: &DirectionalLight,
        frame: usize,
    ) -> Result<BatchIdentifier, BatchError> {
        let (mesh, material) = resolve_assets(assets, tile.mesh, tile.material)?;
        let uniform = TerrainTileUniform::from(tile);
        let submission = BatchSubmission {
            kind: BatchKind::Terrain,
            mesh_id: tile.mesh,
            material_id: tile.material,
            mesh,
            material,
            shape: TerrainBatch::shape(self.capacities.terrain_tiles),
            light,
        };
        submit_to_batches(
            batcher,
            &submission,
            &Self::passes(material),
            BatchPayload {
                instance: &[],
                uniform: bytemuck::bytes_of(&uniform),
            },
            frame,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_casters_join_the_shadow_pass_first() {
        let material = GpuMaterial {
            casts_shadows: true,
            transparent: true,
            ..Default::default()
        };
        assert_eq!(
            Renderer3D::passes(&material),
            vec![RenderPassType::Shadow, RenderPassType::Transparent]
        );
        assert_eq!(
            Renderer3D::passes(&GpuMaterial::default()),
            vec![RenderPassType::Opaque]
        );
    }
}
