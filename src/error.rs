//! Crate-wide error taxonomy.
use std::collections::TryReserveError;

use crate::pipeline::DataType;

/// Error returned by any stage of the color-layer decomposition pipeline.
#[derive(Debug)]
pub enum IconLayerError {
    /// No compute device could be acquired.
    DeviceUnavailable,
    /// A kernel's source was not found, or did not compile.
    ShaderLoadFailed(String),
    /// A builder-time operation sequence is invalid: a type mismatch or a
    /// missing prerequisite (e.g. `extract_layers` before `cluster`).
    InvalidOperationSequence(String),
    /// Specialization of [`IconLayerError::InvalidOperationSequence`] raised
    /// at append time when the predecessor's output type cannot feed the
    /// new operation's input type.
    IncompatibleDataTypes {
        /// Data type the appended operation requires as input.
        expected: DataType,
        /// Data type produced by the predecessor operation.
        got: DataType,
    },
    /// GPU submission, buffer allocation, or texture creation failed at run
    /// time; also raised when a required upstream buffer is missing from
    /// the execution context.
    ExecutionFailed(String),
    /// A split was requested on a layer with fewer than 20 visible pixels.
    TooFewVisiblePixels(usize),
    /// No spatial-weight attempt produced exactly two non-empty layers.
    SplitFailed(String),
    /// Space could not be reserved for a collection required during
    /// computation.
    Reserve(TryReserveError),
    /// The underlying GPU backend reported an error.
    Gpu(String),
    /// A general, rarely-reached error with a static description.
    General(&'static str),
}

impl std::fmt::Display for IconLayerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceUnavailable => write!(f, "no compute device is available"),
            Self::ShaderLoadFailed(name) => write!(f, "shader '{name}' failed to load or compile"),
            Self::InvalidOperationSequence(msg) => write!(f, "invalid operation sequence: {msg}"),
            Self::IncompatibleDataTypes { expected, got } => write!(
                f,
                "incompatible data types: operation expects {expected:?}, got {got:?}"
            ),
            Self::ExecutionFailed(msg) => write!(f, "execution failed: {msg}"),
            Self::TooFewVisiblePixels(n) => {
                write!(f, "layer has too few visible pixels to split ({n} < 20)")
            }
            Self::SplitFailed(msg) => write!(f, "split failed: {msg}"),
            Self::Reserve(e) => write!(f, "{e}"),
            Self::Gpu(msg) => write!(f, "gpu error: {msg}"),
            Self::General(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for IconLayerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Reserve(e) => e.source(),
            _ => None,
        }
    }
}

impl std::convert::From<TryReserveError> for IconLayerError {
    fn from(error: TryReserveError) -> Self {
        Self::Reserve(error)
    }
}

impl std::convert::From<&'static str> for IconLayerError {
    fn from(error: &'static str) -> Self {
        Self::General(error)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IconLayerError>;
