//! Tunable parameter defaults (spec §6, reproduced exactly).

/// Default number of clusters for k-means.
pub const NUMBER_OF_CLUSTERS: u32 = 8;
/// Default SLIC compactness.
pub const COMPACTNESS: f64 = 25.0;
/// Default SLIC target superpixel count.
pub const NUMBER_OF_SEGMENTS: u32 = 1000;
/// Default cluster-merge threshold.
pub const AUTO_MERGE_THRESHOLD: f64 = 30.0;
/// Default lightness weight used during the weighted k-means iteration.
pub const LIGHTNESS_WEIGHT: f64 = 0.35;
/// Default green-axis scale applied during color conversion.
pub const GREEN_AXIS_SCALE: f64 = 2.0;
/// Default clustering seed.
pub const CLUSTERING_SEED: u64 = 8_675_309;

/// Default lightness channel scale (no-op) applied during color conversion.
pub const LIGHTNESS_SCALE: f64 = 1.0;
/// Default SLIC iteration cap.
pub const SLIC_ITERATIONS: u32 = 10;
/// Default k-means Lloyd-iteration cap.
pub const KMEANS_MAX_ITERATIONS: u32 = 300;
/// Default k-means convergence threshold (sum of per-center movement).
pub const KMEANS_CONVERGENCE_DISTANCE: f64 = 0.01;

/// Alpha-threshold-relative minimum visible pixel count before a split is
/// attempted (spec §7 `TooFewVisiblePixels`).
pub const MIN_SPLIT_PIXELS: usize = 20;

/// Spatial-weight candidates tried by the split workflow (spec §4.8, §9
/// resolves the source's two differing orders to ascending).
pub const SPLIT_SPATIAL_WEIGHTS: [f64; 3] = [0.3, 0.5, 0.8];
