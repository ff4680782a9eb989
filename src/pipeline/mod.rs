//! Typed, reusable operation DAG (spec §4.1).
//!
//! Operations are appended one at a time through [`PipelineBuilder`]; each
//! append is checked against the declared input/output type relation so an
//! invalid sequence (e.g. `extract_layers` before any `cluster`) is rejected
//! before any GPU or CPU work runs.

mod builder;
mod context;
mod execution;
mod operation;

pub use builder::{PipelineBuilder, PipelineHandle};
pub use context::ExecutionContext;
pub use execution::Execution;
pub use operation::{MergeStrategy, Operation};

/// The type of value flowing between two consecutive operations (spec §3,
/// "Pipeline DAG").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// No input required; the operation reads directly from the buffers
    /// bound at `execute` time.
    None,
    /// Raw RGBA image.
    Rgba,
    /// Perceptual LAB buffer (plus alpha).
    Lab,
    /// Per-superpixel feature vectors.
    SuperpixelFeatures,
    /// Per-superpixel cluster assignments and centers.
    ClusterAssignments,
    /// Extracted per-cluster RGBA layers.
    Layers,
}

impl Operation {
    /// The data type this operation requires as input.
    #[must_use]
    pub fn input_type(&self) -> DataType {
        match self {
            Operation::ConvertColorSpace { .. } => DataType::None,
            Operation::Segment { .. } => DataType::Lab,
            Operation::Cluster { .. } => DataType::SuperpixelFeatures,
            Operation::AutoMerge { .. } => DataType::ClusterAssignments,
            Operation::ExtractLayers => DataType::ClusterAssignments,
        }
    }

    /// The data type this operation produces as output.
    #[must_use]
    pub fn output_type(&self) -> DataType {
        match self {
            Operation::ConvertColorSpace { .. } => DataType::Lab,
            Operation::Segment { .. } => DataType::SuperpixelFeatures,
            Operation::Cluster { .. } => DataType::ClusterAssignments,
            Operation::AutoMerge { .. } => DataType::ClusterAssignments,
            Operation::ExtractLayers => DataType::Layers,
        }
    }
}

/// Checks whether `predecessor_output` can feed an operation declaring
/// `input`, under the declared compatibility relation (spec §8).
#[must_use]
pub fn types_compatible(predecessor_output: DataType, input: DataType) -> bool {
    predecessor_output == input
}
