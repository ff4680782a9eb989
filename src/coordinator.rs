//! High-level decomposition and layer-split workflows built on top of the
//! pipeline DAG (spec §4.8).

use std::sync::Arc;

use palette::{white_point::D65, FromColor, Lab, Srgb};

use crate::defaults;
use crate::error::{IconLayerError, Result};
use crate::gpu::GpuResources;
use crate::kmeans;
use crate::pipeline::{Execution, MergeStrategy, PipelineBuilder};
use crate::types::{ClusterCenters, LabColorParts, Layer, RgbaBuffer, ALPHA_THRESHOLD};

/// Tunables for [`ProcessingCoordinator::decompose`], defaulting to the
/// values of spec §6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposeOptions {
    /// Target superpixel count.
    pub superpixels: u32,
    /// SLIC compactness.
    pub compactness: f64,
    /// Target cluster count.
    pub clusters: u32,
    /// Weight applied to `L` during the k-means weighted iteration only.
    pub lightness_weight: f64,
    /// Cluster-merge distance threshold.
    pub merge_threshold: f64,
    /// Cluster-merge strategy.
    pub merge_strategy: MergeStrategy,
    /// Green-axis scale applied during color conversion and merge ordering.
    pub green_axis_scale: f64,
    /// Lightness channel scale applied during color conversion.
    pub lightness_scale: f64,
    /// SLIC iteration cap.
    pub slic_iterations: u32,
    /// Whether to run SLIC's connectivity-enforcement pass.
    pub enforce_connectivity: bool,
    /// Seed for the deterministic clustering PRNG.
    pub seed: u64,
}

impl Default for DecomposeOptions {
    fn default() -> Self {
        Self {
            superpixels: defaults::NUMBER_OF_SEGMENTS,
            compactness: defaults::COMPACTNESS,
            clusters: defaults::NUMBER_OF_CLUSTERS,
            lightness_weight: defaults::LIGHTNESS_WEIGHT,
            merge_threshold: defaults::AUTO_MERGE_THRESHOLD,
            merge_strategy: MergeStrategy::Simple,
            green_axis_scale: defaults::GREEN_AXIS_SCALE,
            lightness_scale: defaults::LIGHTNESS_SCALE,
            slic_iterations: defaults::SLIC_ITERATIONS,
            enforce_connectivity: true,
            seed: defaults::CLUSTERING_SEED,
        }
    }
}

/// Runs the full decomposition and single-layer split workflows against a
/// shared [`GpuResources`] handle (spec §4.8).
#[derive(Debug, Clone)]
pub struct ProcessingCoordinator {
    gpu: Arc<GpuResources>,
}

impl ProcessingCoordinator {
    /// Create a coordinator bound to `gpu`.
    #[must_use]
    pub fn new(gpu: Arc<GpuResources>) -> Self {
        Self { gpu }
    }

    /// Run convert → segment → cluster → merge → extract against `input`,
    /// returning layers sorted by descending pixel count (spec §4.8.A
    /// "full decomposition").
    pub async fn decompose(&self, input: RgbaBuffer, options: DecomposeOptions) -> Result<Vec<Layer>> {
        let pipeline = PipelineBuilder::new()
            .convert_color_space_scaled(options.lightness_scale, options.green_axis_scale)?
            .segment_full(
                options.superpixels,
                options.compactness,
                0.0,
                options.slic_iterations,
                options.enforce_connectivity,
            )?
            .cluster_weighted(options.clusters, Some(options.seed), options.lightness_weight)?
            .auto_merge_weighted(
                options.merge_threshold,
                options.merge_strategy,
                options.lightness_weight,
                options.green_axis_scale,
            )?
            .extract_layers()?;

        let execution = Execution::execute(&pipeline, &self.gpu, input, options.seed).await?;
        let mut layers = execution.context.layers;
        layers.sort_by(|a, b| b.pixel_count.cmp(&a.pixel_count));
        Ok(layers)
    }

    /// Split one extracted layer into two, by trying a small set of
    /// color/spatial k-means weightings and keeping whichever produces the
    /// most perceptually separated pair (spec §4.8.B "split workflow").
    pub fn split_layer(&self, layer: &Layer, seed: u64) -> Result<(Layer, Layer)> {
        let width = layer.rgba.width;
        let height = layer.rgba.height;

        let mut indices = Vec::new();
        let mut colors = Vec::new();
        let mut positions = Vec::new();
        let x_extent = f64::from(width.saturating_sub(1).max(1));
        let y_extent = f64::from(height.saturating_sub(1).max(1));

        for i in 0..layer.rgba.pixel_count() {
            let pixel = layer.rgba.pixel(i);
            let alpha = f32::from(pixel[3]) / 255.0;
            if alpha < ALPHA_THRESHOLD {
                continue;
            }
            let x = (i % width as usize) as f64;
            let y = (i / width as usize) as f64;
            indices.push(i);
            colors.push(srgb8_to_lab(pixel[0], pixel[1], pixel[2]));
            positions.push((x / x_extent * 100.0, y / y_extent * 100.0));
        }

        if indices.len() < defaults::MIN_SPLIT_PIXELS {
            return Err(IconLayerError::TooFewVisiblePixels(indices.len()));
        }

        let mut best: Option<(Vec<i32>, f64)> = None;
        for &spatial_weight in &defaults::SPLIT_SPATIAL_WEIGHTS {
            let result = kmeans::cluster_color_spatial(&colors, &positions, 2, 1.0, spatial_weight, seed);
            let ClusterCenters::Color5(centers) = &result.centers else {
                continue;
            };
            if centers.len() < 2 {
                continue;
            }
            let separation = centers[0].color.distance(&centers[1].color);
            if best.as_ref().map_or(true, |(_, best_sep)| separation > *best_sep) {
                best = Some((result.assignments, separation));
            }
        }

        let Some((assignments, _separation)) = best else {
            return Err(IconLayerError::SplitFailed(
                "no spatial-weight candidate produced two clusters".into(),
            ));
        };

        let mut pixel_clusters = vec![-1_i32; layer.rgba.pixel_count()];
        for (&idx, &assignment) in indices.iter().zip(&assignments) {
            pixel_clusters[idx] = assignment;
        }

        let mut split = crate::layer::extract(&layer.rgba, &pixel_clusters, 2);
        if split.len() != 2 {
            return Err(IconLayerError::SplitFailed(
                "split produced fewer than two non-empty layers".into(),
            ));
        }
        let second = split.pop().expect("checked len == 2");
        let first = split.pop().expect("checked len == 2");
        Ok((first, second))
    }
}

fn srgb8_to_lab(r: u8, g: u8, b: u8) -> LabColorParts {
    let srgb = Srgb::new(r, g, b).into_format::<f64>();
    let lab: Lab<D65, f64> = Lab::from_color(srgb);
    LabColorParts::from(lab)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone_layer() -> Layer {
        let mut rgba = RgbaBuffer::new(10, 1);
        for i in 0..5 {
            rgba.set_pixel(i, [255, 0, 0, 255]);
        }
        for i in 5..10 {
            rgba.set_pixel(i, [0, 0, 255, 255]);
        }
        Layer {
            rgba,
            pixel_count: 10,
            mean_color: LabColorParts::default(),
        }
    }

    #[test]
    fn split_rejects_too_few_visible_pixels() {
        let gpu_err = GpuResources::global();
        // Constructing a coordinator does not require a live device for
        // this CPU-only path; the `gpu` field is unused by `split_layer`.
        let _ = gpu_err;
        let mut rgba = RgbaBuffer::new(3, 1);
        rgba.set_pixel(0, [255, 0, 0, 255]);
        let layer = Layer {
            rgba,
            pixel_count: 1,
            mean_color: LabColorParts::default(),
        };
        let coordinator = ProcessingCoordinator {
            gpu: match GpuResources::global() {
                Ok(gpu) => gpu,
                Err(_) => return,
            },
        };
        let result = coordinator.split_layer(&layer, 1);
        assert!(matches!(result, Err(IconLayerError::TooFewVisiblePixels(1))));
    }

    #[test]
    fn split_separates_two_tone_layer() {
        let Ok(gpu) = GpuResources::global() else {
            return;
        };
        let coordinator = ProcessingCoordinator { gpu };
        let layer = two_tone_layer();
        let (a, b) = coordinator.split_layer(&layer, 42).expect("split should succeed");
        assert_eq!(a.pixel_count + b.pixel_count, 10);
    }
}
