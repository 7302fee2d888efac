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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Every variant here describes a violated setup invariant or a backend failure.
//! Callers are expected to log and escalate them; none are retried.

use crate::renderer::api::{
    DescriptorPoolId, FramebufferId, ImageLayout, PipelineId, RenderPassId, TextureFormat,
    TextureId,
};
use std::fmt;

/// The category of GPU object an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A GPU buffer.
    Buffer,
    /// A texture or render attachment.
    Texture,
    /// A texture sampler.
    Sampler,
    /// A shader module.
    Shader,
    /// A graphics pipeline.
    Pipeline,
    /// A descriptor set layout.
    DescriptorSetLayout,
    /// A descriptor pool.
    DescriptorPool,
    /// A descriptor set.
    DescriptorSet,
    /// A render pass description.
    RenderPass,
    /// A framebuffer.
    Framebuffer,
    /// A command pool.
    CommandPool,
    /// A command buffer.
    CommandBuffer,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Buffer => "buffer",
            ResourceKind::Texture => "texture",
            ResourceKind::Sampler => "sampler",
            ResourceKind::Shader => "shader",
            ResourceKind::Pipeline => "pipeline",
            ResourceKind::DescriptorSetLayout => "descriptor set layout",
            ResourceKind::DescriptorPool => "descriptor pool",
            ResourceKind::DescriptorSet => "descriptor set",
            ResourceKind::RenderPass => "render pass",
            ResourceKind::Framebuffer => "framebuffer",
            ResourceKind::CommandPool => "command pool",
            ResourceKind::CommandBuffer => "command buffer",
        };
        f.write_str(name)
    }
}

/// An error related to the creation, lookup or destruction of a GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// A handle did not resolve to a live resource.
    NotFound {
        /// What kind of resource was looked up.
        kind: ResourceKind,
        /// The raw handle value.
        id: usize,
    },
    /// The handle exists but cannot be used for the requested operation.
    InvalidHandle,
    /// A resource with the same identity was already created.
    AlreadyExists {
        /// What kind of resource was created twice.
        kind: ResourceKind,
        /// A label identifying the duplicate.
        label: String,
    },
    /// A descriptor pool has no room for another set.
    PoolExhausted {
        /// The exhausted pool.
        pool: DescriptorPoolId,
        /// The pool's fixed capacity.
        capacity: u32,
    },
    /// An access fell outside of a resource's bounds.
    OutOfBounds {
        /// Byte offset of the access.
        offset: u64,
        /// Length of the access in bytes.
        size: u64,
        /// Size of the resource in bytes.
        capacity: u64,
    },
    /// Descriptor components do not match the layout they are bound against.
    DescriptorMismatch(String),
    /// The backend cannot use the format for the requested purpose.
    UnsupportedFormat {
        /// The offending format.
        format: TextureFormat,
        /// What the format was requested for.
        usage: &'static str,
    },
    /// A generic error reported by the underlying graphics backend.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound { kind, id } => {
                write!(f, "No live {kind} for handle {id}")
            }
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle"),
            ResourceError::AlreadyExists { kind, label } => {
                write!(f, "A {kind} '{label}' was already created")
            }
            ResourceError::PoolExhausted { pool, capacity } => {
                write!(f, "Descriptor pool {pool:?} exhausted (capacity {capacity})")
            }
            ResourceError::OutOfBounds {
                offset,
                size,
                capacity,
            } => write!(
                f,
                "Access of {size} bytes at offset {offset} exceeds resource size {capacity}"
            ),
            ResourceError::DescriptorMismatch(details) => {
                write!(f, "Descriptor mismatch: {details}")
            }
            ResourceError::UnsupportedFormat { format, usage } => {
                write!(f, "Format {format:?} is not supported for {usage}")
            }
            ResourceError::BackendError(msg) => write!(f, "Backend error: {msg}"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// An error raised while recording commands into a command buffer.
///
/// These describe calls made in an order the command protocol forbids.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    /// `begin_render_pass` was called while another pass was active.
    PassAlreadyActive,
    /// A draw or bind command was recorded outside of a render pass.
    NoActivePass,
    /// The command buffer was finished while a render pass was still open.
    PassStillActive,
    /// A command required a bound pipeline.
    NoPipelineBound,
    /// Descriptor sets were bound before the push constants the pipeline declares.
    PushConstantsRequired {
        /// The pipeline whose push constants are missing.
        pipeline: PipelineId,
    },
    /// The push constant payload does not fit the pipeline's declared range.
    PushConstantRange {
        /// The bound pipeline.
        pipeline: PipelineId,
        /// Size of the recorded payload.
        size: u32,
        /// Size declared by the pipeline (0 when it declares none).
        declared: u32,
    },
    /// The number of dynamic offsets does not match the dynamic bindings of the sets.
    DynamicOffsetCount {
        /// Number of dynamic bindings in the bound sets.
        expected: usize,
        /// Number of offsets supplied.
        actual: usize,
    },
    /// A dynamic offset is not a multiple of the backend's uniform alignment.
    MisalignedDynamicOffset {
        /// The supplied offset.
        offset: u32,
        /// The required alignment.
        alignment: u32,
    },
    /// A texture was sampled or attached while in the wrong image layout.
    InvalidImageLayout {
        /// The texture.
        texture: TextureId,
        /// The layout the operation requires.
        expected: ImageLayout,
        /// The layout the texture is currently in.
        actual: ImageLayout,
    },
    /// An indexed draw was recorded without an index buffer.
    MissingIndexBuffer,
    /// A framebuffer was begun with a render pass it was not created for.
    IncompatibleFramebuffer {
        /// The framebuffer.
        framebuffer: FramebufferId,
        /// The render pass it was begun with.
        render_pass: RenderPassId,
    },
    /// A handle referenced by a command is not live.
    Resource(ResourceError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::PassAlreadyActive => write!(f, "A render pass is already active"),
            CommandError::NoActivePass => write!(f, "No render pass is active"),
            CommandError::PassStillActive => {
                write!(f, "Command buffer finished with a render pass still active")
            }
            CommandError::NoPipelineBound => write!(f, "No pipeline is bound"),
            CommandError::PushConstantsRequired { pipeline } => write!(
                f,
                "Pipeline {pipeline:?} requires push constants before descriptor sets are bound"
            ),
            CommandError::PushConstantRange {
                pipeline,
                size,
                declared,
            } => write!(
                f,
                "Push constant payload of {size} bytes does not fit the {declared} bytes declared by pipeline {pipeline:?}"
            ),
            CommandError::DynamicOffsetCount { expected, actual } => write!(
                f,
                "Expected {expected} dynamic offsets but {actual} were supplied"
            ),
            CommandError::MisalignedDynamicOffset { offset, alignment } => write!(
                f,
                "Dynamic offset {offset} is not aligned to {alignment} bytes"
            ),
            CommandError::InvalidImageLayout {
                texture,
                expected,
                actual,
            } => write!(
                f,
                "Texture {texture:?} is in layout {actual:?} but {expected:?} is required"
            ),
            CommandError::MissingIndexBuffer => {
                write!(f, "Indexed draw recorded without an index buffer")
            }
            CommandError::IncompatibleFramebuffer {
                framebuffer,
                render_pass,
            } => write!(
                f,
                "Framebuffer {framebuffer:?} was not created for render pass {render_pass:?}"
            ),
            CommandError::Resource(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Resource(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for CommandError {
    fn from(err: ResourceError) -> Self {
        CommandError::Resource(err)
    }
}

/// A high-level error that can occur within the rendering system.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// An error related to a specific GPU resource.
    Resource(ResourceError),
    /// An error raised while recording commands.
    Command(CommandError),
    /// Failed to acquire the next frame from the swapchain.
    SurfaceAcquisitionFailed(String),
    /// The graphics device was lost.
    DeviceLost,
    /// An unexpected internal error.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Resource(e) => write!(f, "Resource error: {e}"),
            RenderError::Command(e) => write!(f, "Command error: {e}"),
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface: {msg}")
            }
            RenderError::DeviceLost => write!(f, "Graphics device lost"),
            RenderError::Internal(msg) => write!(f, "Internal rendering error: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(err) => Some(err),
            RenderError::Command(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::Resource(err)
    }
}

impl From<CommandError> for RenderError {
    fn from(err: CommandError) -> Self {
        RenderError::Command(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_resource_error_display() {
        let err = ResourceError::NotFound {
            kind: ResourceKind::DescriptorSet,
            id: 12,
        };
        assert_eq!(format!("{err}"), "No live descriptor set for handle 12");

        let err = ResourceError::PoolExhausted {
            pool: DescriptorPoolId(3),
            capacity: 8,
        };
        assert_eq!(
            format!("{err}"),
            "Descriptor pool DescriptorPoolId(3) exhausted (capacity 8)"
        );
    }

    #[test]
    fn test_command_error_display() {
        let err = CommandError::PushConstantsRequired {
            pipeline: PipelineId(4),
        };
        assert_eq!(
            format!("{err}"),
            "Pipeline PipelineId(4) requires push constants before descriptor sets are bound"
        );
    }

    #[test]
    fn test_render_error_from_conversions() {
        let render_err: RenderError = ResourceError::InvalidHandle.into();
        assert!(matches!(
            render_err,
            RenderError::Resource(ResourceError::InvalidHandle)
        ));
        assert!(render_err.source().is_some());

        let render_err: RenderError = CommandError::NoActivePass.into();
        assert_eq!(format!("{render_err}"), "Command error: No render pass is active");
    }

    #[test]
    fn test_command_error_wraps_resource_error() {
        let cmd_err: CommandError = ResourceError::BackendError("boom".into()).into();
        assert_eq!(format!("{cmd_err}"), "Backend error: boom");
        assert!(cmd_err.source().is_some());
    }
}
