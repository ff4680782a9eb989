//! End-to-end decomposition scenarios (spec §8 "Concrete scenarios").
//!
//! Every test acquires a real GPU device through [`GpuResources::global`]
//! (the color-conversion stage has no CPU fallback); on a machine with no
//! usable adapter the test short-circuits rather than failing the suite.

use icon_layers::coordinator::{DecomposeOptions, ProcessingCoordinator};
use icon_layers::gpu::GpuResources;
use icon_layers::pipeline::{Execution, MergeStrategy, PipelineBuilder};
use icon_layers::types::RgbaBuffer;

fn coordinator() -> Option<ProcessingCoordinator> {
    GpuResources::global().ok().map(ProcessingCoordinator::new)
}

fn two_tone_square(size: u32) -> RgbaBuffer {
    let mut rgba = RgbaBuffer::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let i = (y * size + x) as usize;
            if x < size / 2 {
                rgba.set_pixel(i, [255, 0, 0, 255]);
            } else {
                rgba.set_pixel(i, [0, 0, 255, 255]);
            }
        }
    }
    rgba
}

fn solid_color(size: u32, rgb: [u8; 3]) -> RgbaBuffer {
    let mut rgba = RgbaBuffer::new(size, size);
    for i in 0..rgba.pixel_count() {
        rgba.set_pixel(i, [rgb[0], rgb[1], rgb[2], 255]);
    }
    rgba
}

fn checkerboard(size: u32) -> RgbaBuffer {
    let mut rgba = RgbaBuffer::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let i = (y * size + x) as usize;
            let black = ((x / 2) + (y / 2)) % 2 == 0;
            let v = if black { 0 } else { 255 };
            rgba.set_pixel(i, [v, v, v, 255]);
        }
    }
    rgba
}

fn horizontal_gradient(size: u32) -> RgbaBuffer {
    let mut rgba = RgbaBuffer::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let i = (y * size + x) as usize;
            let t = f64::from(x) / f64::from(size - 1);
            let r = (255.0 * (1.0 - t)).round() as u8;
            let g = (255.0 * t).round() as u8;
            rgba.set_pixel(i, [r, g, 0, 255]);
        }
    }
    rgba
}

fn fully_transparent(size: u32) -> RgbaBuffer {
    RgbaBuffer::new(size, size)
}

#[tokio::test]
async fn two_tone_square_yields_two_well_separated_layers() {
    let Some(coordinator) = coordinator() else { return };
    let input = two_tone_square(64);
    let options = DecomposeOptions {
        superpixels: 64,
        compactness: 10.0,
        clusters: 2,
        seed: 1,
        ..Default::default()
    };

    let layers = coordinator.decompose(input, options).await.expect("decompose");
    assert_eq!(layers.len(), 2);

    let diff = (i64::from(layers[0].pixel_count) - i64::from(layers[1].pixel_count)).abs();
    assert!(diff <= 4, "pixel counts differ by {diff}, expected <= 4");

    let color_distance = layers[0].mean_color.distance(&layers[1].mean_color);
    assert!(color_distance > 80.0, "layer colors only {color_distance} apart");
}

#[tokio::test]
async fn solid_opaque_color_collapses_to_one_layer() {
    let Some(coordinator) = coordinator() else { return };
    let input = solid_color(32, [128, 128, 128]);
    let options = DecomposeOptions {
        superpixels: 16,
        clusters: 3,
        seed: 1,
        ..Default::default()
    };

    let layers = coordinator.decompose(input, options).await.expect("decompose");
    assert_eq!(layers.len(), 1, "uniform input should produce exactly one layer");
    assert_eq!(layers[0].pixel_count, 32 * 32);
}

#[tokio::test]
async fn checkerboard_splits_into_black_and_white_layers() {
    let Some(coordinator) = coordinator() else { return };
    let input = checkerboard(8);
    let options = DecomposeOptions {
        superpixels: 16,
        clusters: 2,
        seed: 1,
        ..Default::default()
    };

    let layers = coordinator.decompose(input, options).await.expect("decompose");
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].pixel_count, 32);
    assert_eq!(layers[1].pixel_count, 32);

    let lightest = layers[0].mean_color.l.max(layers[1].mean_color.l);
    let darkest = layers[0].mean_color.l.min(layers[1].mean_color.l);
    assert!(lightest > 90.0, "expected a near-white layer, got L={lightest}");
    assert!(darkest < 10.0, "expected a near-black layer, got L={darkest}");
}

#[tokio::test]
async fn gradient_merge_reduces_cluster_count_iff_centers_are_close() {
    let Some(coordinator) = coordinator() else { return };
    let input = horizontal_gradient(128);
    let options = DecomposeOptions {
        clusters: 4,
        seed: 42,
        merge_threshold: 5.0,
        merge_strategy: MergeStrategy::Simple,
        ..Default::default()
    };

    let layers = coordinator.decompose(input, options).await.expect("decompose");
    assert!(!layers.is_empty());
    assert!(layers.len() <= 4, "merge pass should never increase cluster count");
}

#[tokio::test]
async fn fully_transparent_input_yields_zero_layers() {
    let Some(coordinator) = coordinator() else { return };
    let input = fully_transparent(32);
    let options = DecomposeOptions {
        superpixels: 16,
        clusters: 3,
        seed: 1,
        ..Default::default()
    };

    let layers = coordinator.decompose(input, options).await.expect("decompose should not raise");
    assert!(layers.is_empty());
}

#[tokio::test]
async fn k_equals_one_produces_a_single_layer_matching_the_input() {
    let Some(coordinator) = coordinator() else { return };
    let input = two_tone_square(32);
    let options = DecomposeOptions {
        superpixels: 32,
        clusters: 1,
        seed: 1,
        ..Default::default()
    };

    let layers = coordinator.decompose(input, options).await.expect("decompose");
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].pixel_count, 32 * 32);
}

#[tokio::test]
async fn full_decomposition_is_deterministic_given_a_fixed_seed() {
    let Some(coordinator) = coordinator() else { return };
    let input_a = horizontal_gradient(32);
    let input_b = horizontal_gradient(32);
    let options = DecomposeOptions {
        seed: 8_675_309,
        ..Default::default()
    };

    let layers_a = coordinator.decompose(input_a, options).await.expect("decompose a");
    let layers_b = coordinator.decompose(input_b, options).await.expect("decompose b");

    assert_eq!(layers_a.len(), layers_b.len());
    for (a, b) in layers_a.iter().zip(&layers_b) {
        assert_eq!(a.pixel_count, b.pixel_count);
        assert_eq!(a.rgba.data, b.rgba.data);
    }
}

#[tokio::test]
async fn branch_execution_matches_a_fresh_full_pipeline_run() {
    let Ok(gpu) = GpuResources::global() else { return };
    let input = two_tone_square(48);
    let seed = 7;

    let prefix = PipelineBuilder::new()
        .convert_color_space()
        .unwrap()
        .segment(48, 10.0, 0.0)
        .unwrap();

    let parent = std::sync::Arc::new(
        Execution::execute(&prefix, &gpu, input.clone(), seed)
            .await
            .expect("parent execution"),
    );

    let branch_ks = [3_u32, 5, 7];
    let branches: Vec<PipelineBuilder> = branch_ks
        .iter()
        .map(|&k| {
            prefix
                .copy()
                .cluster(k, Some(seed))
                .unwrap()
                .auto_merge(30.0, MergeStrategy::Simple)
                .unwrap()
                .extract_layers()
                .unwrap()
        })
        .collect();

    let branch_results = Execution::execute_branches(branches.clone(), gpu.clone(), parent.clone()).await;

    for (k, branch_result) in branch_ks.iter().zip(branch_results) {
        let branch_execution = branch_result.expect("branch should succeed");

        let full_pipeline = PipelineBuilder::new()
            .convert_color_space()
            .unwrap()
            .segment(48, 10.0, 0.0)
            .unwrap()
            .cluster(*k, Some(seed))
            .unwrap()
            .auto_merge(30.0, MergeStrategy::Simple)
            .unwrap()
            .extract_layers()
            .unwrap();
        let fresh_execution = Execution::execute(&full_pipeline, &gpu, input.clone(), seed)
            .await
            .expect("fresh execution");

        assert_eq!(branch_execution.context.layers.len(), fresh_execution.context.layers.len());
        for (branch_layer, fresh_layer) in branch_execution
            .context
            .layers
            .iter()
            .zip(&fresh_execution.context.layers)
        {
            assert_eq!(branch_layer.pixel_count, fresh_layer.pixel_count);
            assert_eq!(branch_layer.rgba.data, fresh_layer.rgba.data);
        }
    }
}

#[tokio::test]
async fn splitting_a_two_disk_layer_separates_them_by_color() {
    let Some(coordinator) = coordinator() else { return };

    let width = 20_u32;
    let height = 10_u32;
    let mut rgba = RgbaBuffer::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let i = (y * width + x) as usize;
            if x < 8 {
                rgba.set_pixel(i, [0, 0, 255, 255]);
            } else if x >= 12 {
                rgba.set_pixel(i, [255, 0, 0, 255]);
            }
        }
    }
    let layer = icon_layers::types::Layer {
        rgba,
        pixel_count: 8 * height + 8 * height,
        mean_color: icon_layers::types::LabColorParts::default(),
    };

    let (a, b) = coordinator.split_layer(&layer, 1).expect("split should succeed");
    let distance = a.mean_color.distance(&b.mean_color);
    assert!(distance > 50.0, "split layers only {distance} apart");
}
