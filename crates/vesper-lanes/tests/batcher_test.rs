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

use anyhow::Result;
use std::sync::Arc;
use vesper_core::asset::{GpuMaterial, GpuMesh, MaterialId, MeshId};
use vesper_core::math::{Mat4, Vec3};
use vesper_core::renderer::api::*;
use vesper_core::renderer::GraphicsBackend;
use vesper_infra::{ExplicitBackend, ImmediateBackend};
use vesper_lanes::{
    BatchCreateInfo, BatchError, BatchIdentifier, BatchKind, BatchPayload, CapacityKind,
    MasterRenderer, RenderContext,
};

// --- Test Setup: a renderer whose batcher has every pass registered ---

fn triangle_mesh(backend: &dyn GraphicsBackend) -> Result<GpuMesh> {
    let vertices: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    let indices: [u32; 3] = [0, 1, 2];
    let vertex_buffer = backend.create_buffer_with_data(
        &BufferDescriptor::for_elements(
            "test vertices",
            12,
            3,
            BufferUsage::VERTEX | BufferUsage::COPY_DST,
            UpdateFrequency::Static,
        ),
        bytemuck::cast_slice(&vertices),
    )?;
    let index_buffer = backend.create_buffer_with_data(
        &BufferDescriptor::for_elements(
            "test indices",
            IndexFormat::Uint32.size(),
            3,
            BufferUsage::INDEX | BufferUsage::COPY_DST,
            UpdateFrequency::Static,
        ),
        bytemuck::cast_slice(&indices),
    )?;
    Ok(GpuMesh {
        vertex_buffer,
        index_buffer,
        index_count: 3,
        index_format: IndexFormat::Uint32,
        vertex_layout: VertexBufferLayout::packed(
            VertexStepMode::Vertex,
            0,
            &[VertexFormat::Float32x3],
        ),
    })
}

struct Fixture<B> {
    backend: Arc<B>,
    context: RenderContext,
    renderer: MasterRenderer,
    mesh: GpuMesh,
    material: GpuMaterial,
}

fn fixture<B: GraphicsBackend + 'static>(backend: B) -> Result<Fixture<B>> {
    let backend = Arc::new(backend);
    let context = RenderContext::new(backend.clone(), RenderSettings::default());
    let renderer = MasterRenderer::new(&context)?;
    let mesh = triangle_mesh(backend.as_ref())?;
    Ok(Fixture {
        backend,
        context,
        renderer,
        mesh,
        material: GpuMaterial::default(),
    })
}

fn static_info<'a>(
    mesh_data: &'a GpuMesh,
    material_data: &'a GpuMaterial,
    mesh: u32,
    material: u32,
    pass: RenderPassType,
    max_instance: u32,
) -> BatchCreateInfo<'a> {
    BatchCreateInfo {
        mesh_id: MeshId(mesh),
        material_id: MaterialId(material),
        mesh: mesh_data,
        material: material_data,
        kind: BatchKind::Static,
        pass,
        max_repeat: 1,
        repeat_advance: false,
        max_instance,
        instance_advance: true,
        instance_element_size: 64,
        uniform_element_size: 0,
        light: None,
    }
}

fn transform(x: f32) -> [f32; 16] {
    Mat4::from_translation(Vec3::new(x, 0.0, 0.0)).to_cols_array()
}

fn payload(record: &[f32; 16]) -> BatchPayload<'_> {
    BatchPayload {
        instance: bytemuck::cast_slice(record),
        uniform: &[],
    }
}

// --- Tests ---

#[test]
fn test_round_trip_writes_instances_in_order() -> Result<()> {
    let mut f = fixture(ExplicitBackend::with_defaults()?)?;
    let info = static_info(&f.mesh, &f.material, 7, 3, RenderPassType::Opaque, 2);
    let batcher = f.renderer.batcher_mut();
    let id = batcher.create_batch(&info)?;
    assert_eq!(id, BatchIdentifier(59));

    let (a, b) = (transform(1.0), transform(2.0));
    batcher.add_to_batch(id, payload(&a), 0)?;
    batcher.add_to_batch(id, payload(&b), 0)?;
    assert_eq!(batcher.update_device_side_buffers(0)?, 1);

    let batch = batcher.batch(RenderPassType::Opaque, id).expect("batch exists");
    assert_eq!(batch.instance_count(), 2);
    let buffer = batch.instance_buffers()[0];
    let written: Vec<f32> = f.backend.read_buffer_as(buffer, 0, 32)?;
    assert_eq!(&written[..16], &a[..]);
    assert_eq!(&written[16..], &b[..]);
    Ok(())
}

#[test]
fn test_distinct_pairs_get_distinct_identifiers() -> Result<()> {
    let mut f = fixture(ImmediateBackend::with_defaults()?)?;
    let pairs = [(7, 3), (3, 7), (7, 4), (0, 0)];
    let infos: Vec<_> = pairs
        .iter()
        .map(|(mesh, material)| {
            static_info(&f.mesh, &f.material, *mesh, *material, RenderPassType::Opaque, 1)
        })
        .collect();
    let mut ids = Vec::new();
    for info in &infos {
        ids.push(f.renderer.batcher_mut().create_batch(info)?);
    }
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), pairs.len());
    assert_eq!(
        f.renderer.batcher().identifier_of(MeshId(3), MaterialId(7)),
        Some(ids[1])
    );
    Ok(())
}

#[test]
fn test_duplicate_batch_is_rejected() -> Result<()> {
    let mut f = fixture(ImmediateBackend::with_defaults()?)?;
    let info = static_info(&f.mesh, &f.material, 7, 3, RenderPassType::Opaque, 2);
    let batcher = f.renderer.batcher_mut();
    let id = batcher.create_batch(&info)?;
    let err = batcher.create_batch(&info).unwrap_err();
    assert!(matches!(
        err,
        BatchError::DuplicateBatch {
            pass: RenderPassType::Opaque,
            ..
        }
    ));
    assert_eq!(batcher.stats().batches, 1);
    assert_eq!(f.context.identifiers()?.references(id), 1);
    Ok(())
}

#[test]
fn test_folded_identifier_collision_is_rejected() -> Result<()> {
    let mut f = fixture(ImmediateBackend::with_defaults()?)?;
    let held = static_info(&f.mesh, &f.material, 0, 0, RenderPassType::Opaque, 1);
    let colliding = static_info(&f.mesh, &f.material, 1, 65536, RenderPassType::Opaque, 1);
    let batcher = f.renderer.batcher_mut();
    batcher.create_batch(&held)?;
    let err = batcher.create_batch(&colliding).unwrap_err();
    assert!(matches!(err, BatchError::IdentifierCollision { .. }));
    assert_eq!(batcher.stats().batches, 1);
    assert_eq!(batcher.identifier_of(MeshId(1), MaterialId(65536)), None);
    Ok(())
}

#[test]
fn test_full_batch_keeps_earlier_entries() -> Result<()> {
    let mut f = fixture(ExplicitBackend::with_defaults()?)?;
    let info = static_info(&f.mesh, &f.material, 7, 3, RenderPassType::Opaque, 2);
    let batcher = f.renderer.batcher_mut();
    let id = batcher.create_batch(&info)?;
    let (a, b, c) = (transform(1.0), transform(2.0), transform(3.0));
    batcher.add_to_batch(id, payload(&a), 0)?;
    batcher.add_to_batch(id, payload(&b), 0)?;

    let err = batcher.add_to_batch(id, payload(&c), 0).unwrap_err();
    assert!(matches!(
        err,
        BatchError::CapacityExceeded {
            kind: CapacityKind::Instance,
            capacity: 2,
            ..
        }
    ));

    batcher.update_device_side_buffers(0)?;
    let batch = batcher.batch(RenderPassType::Opaque, id).expect("batch exists");
    assert_eq!(batch.instance_count(), 2);
    let written: Vec<f32> = f.backend.read_buffer_as(batch.instance_buffers()[0], 0, 32)?;
    assert_eq!(&written[16..], &b[..]);
    Ok(())
}

#[test]
fn test_frame_slots_are_isolated() -> Result<()> {
    let mut f = fixture(ExplicitBackend::with_defaults()?)?;
    let info = static_info(&f.mesh, &f.material, 7, 3, RenderPassType::Opaque, 4);
    let batcher = f.renderer.batcher_mut();
    let id = batcher.create_batch(&info)?;
    let (a, b) = (transform(1.0), transform(-1.0));

    batcher.add_to_batch(id, payload(&a), 0)?;
    batcher.update_device_side_buffers(0)?;
    batcher.reset_for_next_frame();
    batcher.add_to_batch(id, payload(&b), 1)?;
    batcher.update_device_side_buffers(1)?;

    let buffers = batcher
        .batch(RenderPassType::Opaque, id)
        .expect("batch exists")
        .instance_buffers()
        .to_vec();
    assert_eq!(buffers.len(), 2);
    assert_ne!(buffers[0], buffers[1]);
    let slot_0: Vec<f32> = f.backend.read_buffer_as(buffers[0], 0, 16)?;
    let slot_1: Vec<f32> = f.backend.read_buffer_as(buffers[1], 0, 16)?;
    assert_eq!(slot_0, a.to_vec());
    assert_eq!(slot_1, b.to_vec());
    assert_eq!(f.backend.buffer_write_count(buffers[0])?, 1);
    Ok(())
}

#[test]
fn test_reset_zeroes_every_counter() -> Result<()> {
    let mut f = fixture(ImmediateBackend::with_defaults()?)?;
    let opaque = static_info(&f.mesh, &f.material, 7, 3, RenderPassType::Opaque, 4);
    let shadow = static_info(&f.mesh, &f.material, 7, 3, RenderPassType::Shadow, 4);
    let other = static_info(&f.mesh, &f.material, 8, 3, RenderPassType::Opaque, 4);
    let batcher = f.renderer.batcher_mut();
    let id = batcher.create_batch(&opaque)?;
    batcher.create_batch(&shadow)?;
    let other_id = batcher.create_batch(&other)?;
    let record = transform(0.5);
    batcher.add_to_batch(id, payload(&record), 0)?;
    batcher.add_to_batch(id, payload(&record), 0)?;
    batcher.add_to_batch(other_id, payload(&record), 0)?;
    assert_eq!(batcher.stats().non_empty_batches, 3);

    batcher.reset_for_next_frame();
    let stats = batcher.stats();
    assert_eq!(stats.batches, 3);
    assert_eq!(stats.non_empty_batches, 0);
    for pass in [RenderPassType::Opaque, RenderPassType::Shadow] {
        for batch in batcher.batches(pass) {
            assert_eq!(batch.instance_count(), 0);
            assert_eq!(batch.repeat_count(), 0);
        }
    }
    assert!(!batcher.shared_resource(id).expect("shared").has_pending_data());
    Ok(())
}

#[test]
fn test_shared_resource_is_written_once_for_two_passes() -> Result<()> {
    let mut f = fixture(ExplicitBackend::with_defaults()?)?;
    let opaque = static_info(&f.mesh, &f.material, 7, 3, RenderPassType::Opaque, 4);
    let shadow = static_info(&f.mesh, &f.material, 7, 3, RenderPassType::Shadow, 4);
    let batcher = f.renderer.batcher_mut();
    let id = batcher.create_batch(&shadow)?;
    assert_eq!(batcher.create_batch(&opaque)?, id);

    let record = transform(4.0);
    batcher.add_to_batch(id, payload(&record), 0)?;
    assert_eq!(batcher.batches_for(id).len(), 2);
    assert!(batcher.batches_for(id).iter().all(|b| b.instance_count() == 1));
    assert_eq!(batcher.stats().shared_resources, 1);

    assert_eq!(batcher.update_device_side_buffers(0)?, 1);
    let shadow_buffers = batcher
        .batch(RenderPassType::Shadow, id)
        .expect("shadow batch")
        .instance_buffers()
        .to_vec();
    let opaque_buffers = batcher
        .batch(RenderPassType::Opaque, id)
        .expect("opaque batch")
        .instance_buffers()
        .to_vec();
    assert_eq!(shadow_buffers, opaque_buffers);
    assert_eq!(f.backend.buffer_write_count(shadow_buffers[0])?, 1);
    Ok(())
}

#[test]
fn test_unknown_identifier_is_rejected() -> Result<()> {
    let mut f = fixture(ImmediateBackend::with_defaults()?)?;
    let record = transform(0.0);
    let err = f
        .renderer
        .batcher_mut()
        .add_to_batch(BatchIdentifier(59), payload(&record), 0)
        .unwrap_err();
    assert!(matches!(err, BatchError::UnknownIdentifier(BatchIdentifier(59))));
    Ok(())
}
