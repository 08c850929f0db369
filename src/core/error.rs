//! Error types for imgturn.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Name the pipeline stage that failed
//! - Carry the backend's diagnostic text verbatim
//! - Short-circuit the pipeline through `?` (nothing is retried)

use crate::core::types::AccessMode;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage, used to report where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Device, context, queue and kernel acquisition.
    Init,
    /// Image loading and device image creation.
    Stage,
    /// Kernel argument binding.
    Bind,
    /// Kernel dispatch.
    Dispatch,
    /// Host/device memory transfers.
    Transfer,
    /// Conversion back to the host image and saving.
    Finalize,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::Init,
        Stage::Stage,
        Stage::Bind,
        Stage::Dispatch,
        Stage::Transfer,
        Stage::Finalize,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Stage => "stage",
            Stage::Bind => "bind",
            Stage::Dispatch => "dispatch",
            Stage::Transfer => "transfer",
            Stage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Errors produced by the transform pipeline.
///
/// Every variant is fatal to the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No GPU device available: {reason}")]
    DeviceUnavailable { reason: String },

    #[error("Failed to create device context on '{device}': {detail}")]
    ContextCreationFailed { device: String, detail: String },

    #[error("Kernel compilation failed:\n{log}")]
    CompileError { log: String },

    #[error("Kernel entry point '{entry_point}' could not be resolved: {detail}")]
    KernelResolutionError { entry_point: String, detail: String },

    #[error("Failed to bind kernel arguments: {detail}")]
    ArgumentBindingError { detail: String },

    #[error("Failed to create {access} image {width}x{height}: {detail}")]
    ImageCreationFailed {
        access: AccessMode,
        width: u32,
        height: u32,
        detail: String,
    },

    #[error("Kernel dispatch failed: {detail}")]
    DispatchFailed { detail: String },

    #[error("Transfer to/from {access} image failed: {detail}")]
    TransferError { access: AccessMode, detail: String },

    #[error("Device output differs from host reference at ({x}, {y}): expected {expected:?}, got {actual:?}")]
    VerificationFailed {
        x: u32,
        y: u32,
        expected: [u8; 4],
        actual: [u8; 4],
    },

    #[error("Failed to load image {path}: {detail}")]
    ImageLoadError { path: PathBuf, detail: String },

    #[error("Failed to save image {path}: {detail}")]
    ImageSaveError { path: PathBuf, detail: String },
}

impl PipelineError {
    /// The stage in which this error occurs.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::DeviceUnavailable { .. }
            | PipelineError::ContextCreationFailed { .. }
            | PipelineError::CompileError { .. }
            | PipelineError::KernelResolutionError { .. } => Stage::Init,
            PipelineError::ImageLoadError { .. } | PipelineError::ImageCreationFailed { .. } => {
                Stage::Stage
            }
            PipelineError::ArgumentBindingError { .. } => Stage::Bind,
            PipelineError::DispatchFailed { .. } => Stage::Dispatch,
            PipelineError::TransferError { .. } => Stage::Transfer,
            PipelineError::VerificationFailed { .. } | PipelineError::ImageSaveError { .. } => {
                Stage::Finalize
            }
        }
    }

    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::DeviceUnavailable { .. } => "DeviceUnavailable",
            PipelineError::ContextCreationFailed { .. } => "ContextCreationFailed",
            PipelineError::CompileError { .. } => "CompileError",
            PipelineError::KernelResolutionError { .. } => "KernelResolutionError",
            PipelineError::ArgumentBindingError { .. } => "ArgumentBindingError",
            PipelineError::ImageCreationFailed { .. } => "ImageCreationFailed",
            PipelineError::DispatchFailed { .. } => "DispatchFailed",
            PipelineError::TransferError { .. } => "TransferError",
            PipelineError::VerificationFailed { .. } => "VerificationFailed",
            PipelineError::ImageLoadError { .. } => "ImageLoadError",
            PipelineError::ImageSaveError { .. } => "ImageSaveError",
        }
    }
}

/// Errors describing an invalid host image layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unsupported channel count {0} (expected 1 to 4)")]
    UnsupportedChannels(u8),

    #[error("Image dimensions must be non-zero, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    #[error("Sample buffer has {actual} bytes, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Init.to_string(), "init");
        assert_eq!(Stage::Transfer.to_string(), "transfer");
        assert_eq!(Stage::ALL.len(), 6);
    }

    #[test]
    fn test_error_stage_mapping() {
        let err = PipelineError::DeviceUnavailable {
            reason: "none".to_string(),
        };
        assert_eq!(err.stage(), Stage::Init);
        assert_eq!(err.kind(), "DeviceUnavailable");

        let err = PipelineError::TransferError {
            access: AccessMode::WriteOnly,
            detail: "map failed".to_string(),
        };
        assert_eq!(err.stage(), Stage::Transfer);
        assert!(err.to_string().contains("write-only"));
    }

    #[test]
    fn test_image_creation_message_carries_diagnostic() {
        let err = PipelineError::ImageCreationFailed {
            access: AccessMode::ReadOnly,
            width: 70000,
            height: 4,
            detail: "exceeds max dimension 16384".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("70000x4"));
        assert!(msg.contains("16384"));
        assert_eq!(err.stage(), Stage::Stage);
    }
}
