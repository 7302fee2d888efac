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

//! Error types of the rendering lane.
//!
//! Every error except a swapchain `ResizeRequired` is a violated setup
//! invariant. The detecting site logs it with `log::error!` before returning,
//! and callers are expected to shut down rather than retry.

use super::batcher::BatchIdentifier;
use super::post_processing::PostStage;
use std::fmt;
use thiserror::Error;
use vesper_core::asset::{GeometryKind, MaterialId, MeshId};
use vesper_core::renderer::api::RenderPassType;
use vesper_core::renderer::{CommandError, RenderError, ResourceError};

/// The counter of a batch that ran out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    /// Hardware-instanced entries of one draw.
    Instance,
    /// Separate draws selected by a dynamic uniform offset.
    Repeat,
}

impl fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityKind::Instance => f.write_str("instance"),
            CapacityKind::Repeat => f.write_str("repeat"),
        }
    }
}

/// Errors raised while creating, filling or flushing batches.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Appending would exceed a capacity fixed at creation.
    #[error("Batch {identifier} in the {pass:?} pass is full ({kind} capacity {capacity})")]
    CapacityExceeded {
        /// The batch identifier.
        identifier: BatchIdentifier,
        /// The pass of the full batch.
        pass: RenderPassType,
        /// Which counter overflowed.
        kind: CapacityKind,
        /// The fixed capacity.
        capacity: u32,
    },

    /// A batch for this identifier already exists in the pass.
    #[error("A batch with identifier {identifier} already exists in the {pass:?} pass")]
    DuplicateBatch {
        /// The batch identifier.
        identifier: BatchIdentifier,
        /// The pass.
        pass: RenderPassType,
    },

    /// The pairing function produced a value held by another live pair.
    #[error(
        "Batch identifier {identifier} for ({mesh:?}, {material:?}) is already held by ({held_mesh:?}, {held_material:?})"
    )]
    IdentifierCollision {
        /// The colliding value.
        identifier: BatchIdentifier,
        /// Mesh of the new pair.
        mesh: MeshId,
        /// Material of the new pair.
        material: MaterialId,
        /// Mesh of the pair holding the value.
        held_mesh: MeshId,
        /// Material of the pair holding the value.
        held_material: MaterialId,
    },

    /// No live batch uses this identifier.
    #[error("No live batch uses identifier {0}")]
    UnknownIdentifier(BatchIdentifier),

    /// The asset source has no such mesh.
    #[error("Mesh {0:?} is not resident")]
    UnknownMesh(MeshId),

    /// The asset source has no such material.
    #[error("Material {0:?} is not resident")]
    UnknownMaterial(MaterialId),

    /// Submitted data does not match the element size declared at creation.
    #[error("Batch {identifier}: {what} data is {actual} bytes but {expected} were declared")]
    ElementSizeMismatch {
        /// The batch identifier.
        identifier: BatchIdentifier,
        /// Which element was mismatched.
        what: &'static str,
        /// Declared size in bytes.
        expected: u64,
        /// Submitted size in bytes.
        actual: u64,
    },

    /// A second batch for an identifier declared a different shared resource shape.
    #[error("Batch {identifier} cannot share its resources: {reason}")]
    IncompatibleSharedResource {
        /// The batch identifier.
        identifier: BatchIdentifier,
        /// What differs.
        reason: String,
    },

    /// No pipeline can be built for the kind in this pass.
    #[error("No {geometry:?} pipeline is available for the {pass:?} pass: {reason}")]
    PipelineUnavailable {
        /// The geometry kind.
        geometry: GeometryKind,
        /// The pass.
        pass: RenderPassType,
        /// Why the pipeline is unavailable.
        reason: &'static str,
    },

    /// The frame index is not a valid frame-in-flight slot.
    #[error("Frame slot {frame} is out of range for {frames_in_flight} frames in flight")]
    InvalidFrame {
        /// The rejected slot.
        frame: usize,
        /// Number of slots.
        frames_in_flight: usize,
    },

    /// A backend resource operation failed.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// A backend render operation failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Errors raised when the post-processing chain is incomplete or fails to record.
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// A stage has no pipeline.
    #[error("Post-processing stage {0} has no pipeline")]
    MissingPipeline(PostStage),

    /// An offscreen stage has no framebuffer target.
    #[error("Post-processing stage {0} has no framebuffer")]
    MissingFramebuffer(PostStage),

    /// A stage does not have one descriptor set per frame in flight.
    #[error("Post-processing stage {stage} has {actual} descriptor sets, expected {expected}")]
    MissingDescriptorSets {
        /// The stage.
        stage: PostStage,
        /// One per frame in flight.
        expected: usize,
        /// Sets present.
        actual: usize,
    },

    /// A backend resource operation failed.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Recording a stage failed.
    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

/// Errors that end a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The swapchain reported an unrecoverable error.
    #[error("Swapchain {0} failed")]
    Swapchain(&'static str),

    /// The frame API was called out of order.
    #[error("Frame protocol violation: {0}")]
    Protocol(&'static str),

    /// Batching failed.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Post-processing failed.
    #[error(transparent)]
    PostProcess(#[from] PostProcessError),

    /// A backend render operation failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Command recording failed.
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// A backend resource operation failed.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
}
