//! GPU-accelerated decomposition of raster icons into perceptual color
//! layers.
//!
//! An image is converted to CIE L*a*b*, segmented into SLIC superpixels,
//! clustered with a seeded k-means++, optionally merged, and finally split
//! into one RGBA layer per resulting cluster. Operations are composed
//! through a small typed pipeline DAG ([`pipeline::PipelineBuilder`]) so
//! that branch executions can share a common prefix of work instead of
//! recomputing it.
//!
//! ## Usage
//!
//! ```no_run
//! # async fn run() -> icon_layers::error::Result<()> {
//! use icon_layers::gpu::GpuResources;
//! use icon_layers::pipeline::{Execution, PipelineBuilder};
//! use icon_layers::types::RgbaBuffer;
//!
//! let gpu = GpuResources::global()?;
//! let pipeline = PipelineBuilder::new()
//!     .convert_color_space()?
//!     .segment(1000, 25.0, 0.0)?
//!     .cluster(8, None)?
//!     .auto_merge(30.0, icon_layers::pipeline::MergeStrategy::Simple)?
//!     .extract_layers()?;
//!
//! let input = RgbaBuffer::new(64, 64);
//! let execution = Execution::execute(&pipeline, &gpu, input, 8_675_309).await?;
//! let _layers = execution.context.layers;
//! # Ok(())
//! # }
//! ```
#![forbid(
    absolute_paths_not_starting_with_crate,
    non_ascii_idents,
    noop_method_call,
    unsafe_code
)]
#![warn(
    missing_docs,
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

pub mod color;
pub mod coordinator;
pub mod defaults;
pub mod error;
pub mod features;
pub mod gpu;
pub mod kmeans;
pub mod layer;
pub mod merge;
pub mod pipeline;
mod rng;
mod seed;
mod slic;
pub mod types;

pub use coordinator::{DecomposeOptions, ProcessingCoordinator};
pub use error::{IconLayerError, Result};
