//! Fluent pipeline builder (spec §4.1, §6 "Pipeline builder surface").

use crate::defaults;
use crate::error::{IconLayerError, Result};

use super::operation::MergeStrategy;
use super::{types_compatible, DataType, Operation};

/// A sequence of operations, type-checked incrementally as it is built.
///
/// Appending returns a new `PipelineBuilder`; [`PipelineBuilder::copy`]
/// clones the current sequence so it can be extended independently — the
/// "copying to produce a branch" of spec §4.1. Two builders where one's
/// operation list is a prefix of the other's can be executed as parent and
/// branch (see [`super::Execution::execute_from`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineBuilder {
    operations: Vec<Operation>,
}

/// Alias used where a built-but-not-yet-executed sequence is expected,
/// matching spec §4.1's "handle" terminology.
pub type PipelineHandle = PipelineBuilder;

impl PipelineBuilder {
    /// An empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn output_type(&self) -> DataType {
        self.operations
            .last()
            .map(Operation::output_type)
            .unwrap_or(DataType::None)
    }

    fn append(mut self, op: Operation) -> Result<Self> {
        let predecessor_output = self.output_type();
        let input = op.input_type();
        if !types_compatible(predecessor_output, input) {
            return Err(IconLayerError::IncompatibleDataTypes {
                expected: input,
                got: predecessor_output,
            });
        }
        self.operations.push(op);
        Ok(self)
    }

    /// Append a color-space conversion using the crate's default channel
    /// scaling (`lightnessScale = 1.0`, `greenAxisScale = 2.0`).
    pub fn convert_color_space(self) -> Result<Self> {
        self.convert_color_space_scaled(defaults::LIGHTNESS_SCALE, defaults::GREEN_AXIS_SCALE)
    }

    /// Append a color-space conversion with explicit channel scaling (spec
    /// §6 `convertColorSpace(target: lab, scale: {l, a, b})`; the `b` scale
    /// is always `1.0` per spec §4.2).
    pub fn convert_color_space_scaled(self, lightness_scale: f64, green_axis_scale: f64) -> Result<Self> {
        self.append(Operation::ConvertColorSpace {
            lightness_scale,
            green_axis_scale,
        })
    }

    /// Append SLIC segmentation + feature extraction with default
    /// iteration count and connectivity enforcement enabled.
    pub fn segment(self, superpixels: u32, compactness: f64, depth_weight: f64) -> Result<Self> {
        self.segment_full(
            superpixels,
            compactness,
            depth_weight,
            defaults::SLIC_ITERATIONS,
            true,
        )
    }

    /// Append SLIC segmentation + feature extraction with explicit
    /// iteration count and connectivity-enforcement toggle.
    pub fn segment_full(
        self,
        superpixels: u32,
        compactness: f64,
        depth_weight: f64,
        iterations: u32,
        enforce_connectivity: bool,
    ) -> Result<Self> {
        self.append(Operation::Segment {
            superpixels,
            compactness,
            depth_weight,
            iterations,
            enforce_connectivity,
        })
    }

    /// Append k-means++ clustering using the default lightness weight
    /// (`0.35`).
    pub fn cluster(self, k: u32, seed: Option<u64>) -> Result<Self> {
        self.cluster_weighted(k, seed, defaults::LIGHTNESS_WEIGHT)
    }

    /// Append k-means++ clustering with an explicit lightness weight.
    pub fn cluster_weighted(self, k: u32, seed: Option<u64>, lightness_weight: f64) -> Result<Self> {
        self.append(Operation::Cluster {
            k,
            seed,
            lightness_weight,
        })
    }

    /// Append a cluster-merge pass using the default lightness/green-axis
    /// scale for `IterativeWeighted` pair selection.
    pub fn auto_merge(self, threshold: f64, strategy: MergeStrategy) -> Result<Self> {
        self.auto_merge_weighted(
            threshold,
            strategy,
            defaults::LIGHTNESS_WEIGHT,
            defaults::GREEN_AXIS_SCALE,
        )
    }

    /// Append a cluster-merge pass with explicit weighting parameters.
    pub fn auto_merge_weighted(
        self,
        threshold: f64,
        strategy: MergeStrategy,
        lightness_weight: f64,
        green_axis_scale: f64,
    ) -> Result<Self> {
        self.append(Operation::AutoMerge {
            threshold,
            strategy,
            lightness_weight,
            green_axis_scale,
        })
    }

    /// Append pixel-accurate layer extraction.
    pub fn extract_layers(self) -> Result<Self> {
        self.append(Operation::ExtractLayers)
    }

    /// Clone this handle so it can be extended independently (a branch).
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// The operations appended so far, in order.
    #[must_use]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether `self`'s operations are an exact prefix of `other`'s — the
    /// prerequisite for `Execution::execute_from` (spec §4.1).
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.operations.len() <= other.operations.len()
            && self.operations[..] == other.operations[..self.operations.len()]
    }
}
