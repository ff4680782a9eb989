//! Operation descriptors appended to a [`super::PipelineBuilder`].
//!
//! Each variant mirrors one call on the builder surface of spec §6. Keeping
//! these as a tagged enum (rather than one `struct` implementing a shared
//! trait, as the Metal original does with its operation protocol) lets the
//! pipeline executor dispatch on a single `match` while still giving each
//! operation its own strongly-typed parameters.

use std::sync::Arc;
use std::time::Instant;

use crate::color;
use crate::error::{IconLayerError, Result};
use crate::features;
use crate::gpu::GpuResources;
use crate::kmeans;
use crate::layer;
use crate::merge;
use crate::slic;
use crate::types::{ClusterResult, MetadataValue};

use super::context::ExecutionContext;

/// Cluster-merge strategy (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Pairwise threshold merge with path compression.
    Simple,
    /// Repeated smallest-weighted-distance merge, stopped by unweighted
    /// distance.
    IterativeWeighted,
}

/// One operation in the pipeline DAG.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// RGBA → LAB conversion with Gaussian pre-blur and channel scaling
    /// (spec §4.2).
    ConvertColorSpace {
        /// `L_out = L * lightness_scale`.
        lightness_scale: f64,
        /// Applied to `a` when `a < 0` (green-axis separation).
        green_axis_scale: f64,
    },
    /// SLIC segmentation followed by feature extraction (spec §4.3, §4.4).
    /// The builder surface exposes these as a single `segment` call; the
    /// DAG's declared output type (`SuperpixelFeatures`) reflects that.
    Segment {
        /// Target superpixel count.
        superpixels: u32,
        /// SLIC compactness, `[1, 50]`.
        compactness: f64,
        /// Reserved for a depth-weighted distance term; `0.0` disables it.
        depth_weight: f64,
        /// SLIC iteration cap.
        iterations: u32,
        /// Whether to run the connectivity-enforcement pass.
        enforce_connectivity: bool,
    },
    /// K-means++ clustering over superpixel features (spec §4.5).
    Cluster {
        /// Target cluster count.
        k: u32,
        /// Seed for the deterministic PRNG; `None` uses the crate default.
        seed: Option<u64>,
        /// Weight applied to `L` during the weighted iteration only; final
        /// centers are always recomputed unweighted (spec §4.5.A).
        lightness_weight: f64,
    },
    /// Cluster-merge pass (spec §4.6).
    AutoMerge {
        /// Perceptual distance threshold.
        threshold: f64,
        /// Which merge algorithm to run.
        strategy: MergeStrategy,
        /// Lightness/green-axis scale used only by `IterativeWeighted` to
        /// pick merge order.
        lightness_weight: f64,
        /// See `lightness_weight`.
        green_axis_scale: f64,
    },
    /// Pixel-accurate layer extraction (spec §4.7).
    ExtractLayers,
}

impl Operation {
    /// Human-readable name, used for logging and for
    /// [`IconLayerError::ShaderLoadFailed`]/`ExecutionFailed` messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ConvertColorSpace { .. } => "convert_color_space",
            Operation::Segment { .. } => "segment",
            Operation::Cluster { .. } => "cluster",
            Operation::AutoMerge { .. } => "auto_merge",
            Operation::ExtractLayers => "extract_layers",
        }
    }

    /// Run this operation against `ctx`, reading its declared input buffers
    /// and writing its declared output buffers. Suspension occurs at most
    /// once per operation, after the GPU command buffer (if any) is
    /// submitted — spec §4.1's "operation execution model".
    pub(super) async fn run(&self, ctx: &mut ExecutionContext, gpu: &Arc<GpuResources>) -> Result<()> {
        let start = Instant::now();
        tracing::debug!(operation = self.name(), "operation started");

        match self {
            Operation::ConvertColorSpace {
                lightness_scale,
                green_axis_scale,
            } => {
                let input = ctx
                    .input
                    .clone()
                    .ok_or_else(|| IconLayerError::ExecutionFailed("missing input buffer".into()))?;
                let (lab, alpha) = color::convert(gpu, &input, *lightness_scale, *green_axis_scale)
                    .await?;
                ctx.lab_image = Some(Arc::new(lab));
                ctx.alpha_buffer = Some(Arc::new(alpha));
                ctx.metadata
                    .insert("colorSpace".into(), MetadataValue::Str("lab".into()));
                ctx.metadata.insert(
                    "labScale".into(),
                    MetadataValue::Float(*lightness_scale),
                );
                ctx.metadata.insert(
                    "labColorAdjustments".into(),
                    MetadataValue::Float(*green_axis_scale),
                );
            }
            Operation::Segment {
                superpixels,
                compactness,
                depth_weight,
                iterations,
                enforce_connectivity,
            } => {
                let lab = ctx
                    .lab_image
                    .clone()
                    .ok_or_else(|| IconLayerError::ExecutionFailed("missing lab buffer".into()))?;
                let alpha = ctx
                    .alpha_buffer
                    .clone()
                    .ok_or_else(|| IconLayerError::ExecutionFailed("missing alpha buffer".into()))?;

                let label_map = slic::run(
                    &lab,
                    &alpha,
                    *superpixels,
                    *compactness,
                    *iterations,
                    *enforce_connectivity,
                )?;

                let feats = features::extract(&lab, &label_map, ctx.depth_buffer.as_deref());

                ctx.metadata.insert(
                    "superpixelCount".into(),
                    MetadataValue::UInt(u64::from(*superpixels)),
                );
                ctx.metadata
                    .insert("compactness".into(), MetadataValue::Float(*compactness));
                ctx.metadata.insert(
                    "numSLICCenters".into(),
                    MetadataValue::UInt(label_map.num_centers as u64),
                );
                ctx.metadata.insert(
                    "depthWeight".into(),
                    MetadataValue::Float(*depth_weight),
                );

                ctx.labels_buffer = Some(Arc::new(label_map));
                ctx.superpixel_features = Some(Arc::new(feats));
            }
            Operation::Cluster {
                k,
                seed,
                lightness_weight,
            } => {
                let feats = ctx.superpixel_features.clone().ok_or_else(|| {
                    IconLayerError::ExecutionFailed("missing superpixel features".into())
                })?;
                let seed = seed.unwrap_or(ctx.clustering_seed);

                let colors: Vec<_> = feats.iter().map(|f| f.lab_color).collect();
                let result = kmeans::cluster_color(&colors, *k, *lightness_weight, seed);

                apply_cluster_result(ctx, &feats, result, seed);
            }
            Operation::AutoMerge {
                threshold,
                strategy,
                lightness_weight,
                green_axis_scale,
            } => {
                let assignments = ctx.cluster_assignments.clone().ok_or_else(|| {
                    IconLayerError::ExecutionFailed("missing cluster assignments".into())
                })?;
                let centers = ctx
                    .cluster_centers
                    .clone()
                    .ok_or_else(|| IconLayerError::ExecutionFailed("missing cluster centers".into()))?;
                let feats = ctx.superpixel_features.clone().ok_or_else(|| {
                    IconLayerError::ExecutionFailed("missing superpixel features".into())
                })?;

                // The merge stage mutates the assignment buffer in place;
                // `Arc::make_mut` clones it first iff a branch/parent still
                // shares the reference (spec §5's concurrency contract).
                let mut owned_assignments = (*assignments).clone();
                let original_count = centers.len();

                let merged_centers = match strategy {
                    MergeStrategy::Simple => merge::merge_simple(
                        &centers,
                        &mut owned_assignments,
                        *threshold,
                    ),
                    MergeStrategy::IterativeWeighted => merge::merge_iterative_weighted(
                        &centers,
                        &mut owned_assignments,
                        &feats,
                        *threshold,
                        *lightness_weight,
                        *green_axis_scale,
                    ),
                };

                ctx.metadata.insert(
                    "originalClusterCount".into(),
                    MetadataValue::UInt(original_count as u64),
                );
                ctx.metadata
                    .insert("mergeThreshold".into(), MetadataValue::Float(*threshold));
                ctx.metadata.insert(
                    "clusterCount".into(),
                    MetadataValue::UInt(merged_centers.len() as u64),
                );

                ctx.cluster_assignments = Some(Arc::new(owned_assignments));
                ctx.cluster_centers = Some(Arc::new(merged_centers));
                ctx.pixel_clusters = ctx.labels_buffer.as_ref().map(|labels| {
                    Arc::new(map_assignments_to_pixels(
                        labels,
                        &feats,
                        ctx.cluster_assignments.as_ref().unwrap(),
                    ))
                });
            }
            Operation::ExtractLayers => {
                let pixel_clusters = match ctx.pixel_clusters.clone() {
                    Some(pc) => pc,
                    None => {
                        let labels = ctx.labels_buffer.clone().ok_or_else(|| {
                            IconLayerError::ExecutionFailed("missing label map".into())
                        })?;
                        let assignments = ctx.cluster_assignments.clone().ok_or_else(|| {
                            IconLayerError::ExecutionFailed("missing cluster assignments".into())
                        })?;
                        let feats = ctx.superpixel_features.clone().ok_or_else(|| {
                            IconLayerError::ExecutionFailed("missing superpixel features".into())
                        })?;
                        let pc = Arc::new(map_assignments_to_pixels(&labels, &feats, &assignments));
                        ctx.pixel_clusters = Some(pc.clone());
                        pc
                    }
                };
                let input = ctx
                    .input
                    .clone()
                    .ok_or_else(|| IconLayerError::ExecutionFailed("missing input buffer".into()))?;
                let cluster_count = ctx
                    .cluster_centers
                    .as_ref()
                    .map(|c| c.len())
                    .ok_or_else(|| IconLayerError::ExecutionFailed("missing cluster centers".into()))?;

                let layers = layer::extract(&input, &pixel_clusters, cluster_count);
                ctx.metadata
                    .insert("layerCount".into(), MetadataValue::UInt(layers.len() as u64));
                ctx.layers = layers;
            }
        }

        tracing::debug!(
            operation = self.name(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "operation finished"
        );
        Ok(())
    }
}

/// Write a clustering result into the context's well-known buffers/metadata
/// and derive the per-pixel cluster map (spec §4.5 "Mapping assignments to
/// pixels").
pub(super) fn apply_cluster_result(
    ctx: &mut ExecutionContext,
    feats: &[crate::types::SuperpixelFeature],
    result: ClusterResult,
    seed: u64,
) {
    ctx.metadata
        .insert("clusterSeed".into(), MetadataValue::UInt(seed));
    ctx.metadata.insert(
        "clusteringIterations".into(),
        MetadataValue::UInt(u64::from(result.iterations)),
    );
    ctx.metadata.insert(
        "clusteringConverged".into(),
        MetadataValue::Bool(result.converged),
    );
    ctx.metadata.insert(
        "clusterCount".into(),
        MetadataValue::UInt(result.centers.len() as u64),
    );

    let assignments = Arc::new(result.assignments);
    ctx.cluster_assignments = Some(assignments.clone());
    ctx.cluster_centers = Some(Arc::new(result.centers));
    ctx.pixel_clusters = ctx
        .labels_buffer
        .as_ref()
        .map(|labels| Arc::new(map_assignments_to_pixels(labels, feats, &assignments)));
}

/// Map superpixel→cluster assignments onto a per-pixel cluster map (spec
/// §4.5 "Mapping assignments to pixels").
///
/// `assignments` is indexed by dense position in `feats` (the order
/// clustering was run in), not by raw SLIC label — superpixels with zero
/// visible pixels are omitted from `feats` (spec §4.4 "hole in ID space is
/// preserved"), so a label-indexed lookup would silently misalign once any
/// superpixel is empty. Build a label→assignment table from `feats[i].id`
/// first, then look pixels up through that.
pub(super) fn map_assignments_to_pixels(
    labels: &crate::types::LabelMap,
    feats: &[crate::types::SuperpixelFeature],
    assignments: &[i32],
) -> Vec<i32> {
    let mut label_to_assignment = vec![-1_i32; labels.num_centers];
    for (pos, feat) in feats.iter().enumerate() {
        if let (Some(&cluster), Some(slot)) = (
            assignments.get(pos),
            label_to_assignment.get_mut(feat.id as usize),
        ) {
            *slot = cluster;
        }
    }

    labels
        .labels
        .iter()
        .map(|&label| {
            if label == crate::types::SENTINEL_LABEL {
                -1
            } else {
                label_to_assignment.get(label as usize).copied().unwrap_or(-1)
            }
        })
        .collect()
}
