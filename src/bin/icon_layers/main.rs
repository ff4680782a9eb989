mod args;
mod utils;

use crate::args::Opt;
use crate::utils::{layer_filename, save_layer};

use clap::Parser;

use icon_layers::coordinator::{DecomposeOptions, ProcessingCoordinator};
use icon_layers::defaults;
use icon_layers::gpu::GpuResources;
use icon_layers::types::RgbaBuffer;

#[tokio::main]
async fn main() {
    if let Err(e) = try_main().await {
        eprintln!("icon-layers: {e}");
        std::process::exit(1);
    }
}

async fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opt = Opt::parse();

    let output_dir = opt
        .output_dir
        .clone()
        .or_else(|| opt.input.parent().map(std::path::Path::to_path_buf))
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let stem = opt
        .input
        .file_stem()
        .ok_or("input file has no stem")?
        .to_str()
        .ok_or("input file stem is not valid UTF-8")?
        .to_string();

    let input_image = image::open(&opt.input)?.into_rgba8();
    let (width, height) = input_image.dimensions();
    let input = RgbaBuffer {
        width,
        height,
        data: input_image.into_raw(),
    };

    let gpu = GpuResources::global()?;
    let coordinator = ProcessingCoordinator::new(gpu);

    let options = DecomposeOptions {
        superpixels: opt.superpixels,
        compactness: opt.compactness,
        clusters: opt.clusters,
        lightness_weight: defaults::LIGHTNESS_WEIGHT,
        merge_threshold: opt.merge_threshold,
        merge_strategy: opt.merge_strategy.into(),
        green_axis_scale: defaults::GREEN_AXIS_SCALE,
        lightness_scale: defaults::LIGHTNESS_SCALE,
        slic_iterations: opt.iter,
        enforce_connectivity: true,
        seed: opt.seed,
    };

    let t0 = std::time::Instant::now();
    let layers = coordinator.decompose(input, options).await?;
    let elapsed = t0.elapsed();

    for (index, layer) in layers.iter().enumerate() {
        let path = layer_filename(&output_dir, &stem, index, &opt.format);
        save_layer(&path, &layer.rgba.data, layer.rgba.width, layer.rgba.height)?;
        if opt.verbose {
            println!(
                "layer {index}: {} px, mean L*a*b* ({:.1}, {:.1}, {:.1}) -> {}",
                layer.pixel_count,
                layer.mean_color.l,
                layer.mean_color.a,
                layer.mean_color.b,
                path.display()
            );
        }
    }

    if opt.verbose {
        println!("{} layers extracted in {elapsed:?}", layers.len());
    }

    Ok(())
}
