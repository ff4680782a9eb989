//! Execution context: the typed buffer/metadata store an [`Execution`] reads
//! from and writes to (spec §3 "Execution Context", §6 "published keys").

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{
    AlphaBuffer, ClusterCenters, DepthBuffer, LabBuffer, LabelMap, Layer, MetadataValue,
    RgbaBuffer, SuperpixelFeature,
};

/// Mapping from string keys to typed buffers, plus metadata, produced and
/// consumed by [`super::Operation`]s.
///
/// Buffers are kept behind `Arc` rather than a `HashMap<String, Box<dyn
/// Any>>`: branch executions (spec §4.1 `execute(from: parentExecution)`)
/// start from a shallow copy of the parent's context, which is exactly an
/// `Arc::clone` of each field. The one operation that mutates a buffer in
/// place (the merger, on `cluster_assignments`) goes through
/// `Arc::make_mut`, which clones only when the Arc is actually shared — the
/// copy-on-write buffer the design notes call for.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// The seed used for clustering, unless an operation overrides it.
    pub clustering_seed: u64,

    /// Raw input RGBA buffer (`input`/`rgbaImage`).
    pub input: Option<Arc<RgbaBuffer>>,
    /// Optional depth buffer (`depthBuffer`).
    pub depth_buffer: Option<Arc<DepthBuffer>>,
    /// LAB buffer (`labImage`).
    pub lab_image: Option<Arc<LabBuffer>>,
    /// Alpha buffer (`alphaBuffer`).
    pub alpha_buffer: Option<Arc<AlphaBuffer>>,
    /// SLIC label map (`labelsBuffer`).
    pub labels_buffer: Option<Arc<LabelMap>>,
    /// Per-superpixel features.
    pub superpixel_features: Option<Arc<Vec<SuperpixelFeature>>>,
    /// Superpixel→cluster assignments (`clusterAssignments`).
    pub cluster_assignments: Option<Arc<Vec<i32>>>,
    /// Cluster centers (`clusterCenters`).
    pub cluster_centers: Option<Arc<ClusterCenters>>,
    /// Per-pixel cluster map (`pixelClusters`).
    pub pixel_clusters: Option<Arc<Vec<i32>>>,
    /// Extracted layers (`layer_<i>` for each entry).
    pub layers: Vec<Layer>,

    /// Scalar metadata (spec §6 "Metadata" keys).
    pub metadata: HashMap<String, MetadataValue>,
}

impl ExecutionContext {
    /// Create a context bound to `input`, with no depth map.
    #[must_use]
    pub fn from_input(input: RgbaBuffer, seed: u64) -> Self {
        let width = input.width;
        let height = input.height;
        let mut metadata = HashMap::new();
        metadata.insert("width".into(), MetadataValue::UInt(u64::from(width)));
        metadata.insert("height".into(), MetadataValue::UInt(u64::from(height)));
        Self {
            width,
            height,
            clustering_seed: seed,
            input: Some(Arc::new(input)),
            metadata,
            ..Default::default()
        }
    }

    /// Bind a depth map alongside the input (spec §4.1 `execute(input,
    /// depthMap)`).
    #[must_use]
    pub fn with_depth(mut self, depth: DepthBuffer) -> Self {
        self.depth_buffer = Some(Arc::new(depth));
        self
    }

    /// Look up a buffer by its published key (spec §6). Returns `None` for
    /// unknown keys or keys whose buffer has not been produced yet.
    #[must_use]
    pub fn buffer_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.input.is_some() {
            names.push("input".into());
            names.push("rgbaImage".into());
        }
        if self.depth_buffer.is_some() {
            names.push("depthBuffer".into());
        }
        if self.lab_image.is_some() {
            names.push("labImage".into());
        }
        if self.alpha_buffer.is_some() {
            names.push("alphaBuffer".into());
        }
        if self.labels_buffer.is_some() {
            names.push("labelsBuffer".into());
        }
        if self.cluster_assignments.is_some() {
            names.push("clusterAssignments".into());
        }
        if self.cluster_centers.is_some() {
            names.push("clusterCenters".into());
        }
        if self.pixel_clusters.is_some() {
            names.push("pixelClusters".into());
        }
        for i in 0..self.layers.len() {
            names.push(format!("layer_{i}"));
        }
        names
    }

    /// Look up a metadata value by its published key (spec §6).
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }
}
