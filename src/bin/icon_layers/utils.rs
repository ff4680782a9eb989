use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder};

use icon_layers::pipeline::MergeStrategy;

#[derive(Debug, Clone, Copy)]
pub enum MergeStrategyArg {
    Simple,
    IterativeWeighted,
}

impl std::str::FromStr for MergeStrategyArg {
    type Err = icon_layers::IconLayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("simple") => Ok(Self::Simple),
            s if s.eq_ignore_ascii_case("iterative-weighted") || s.eq_ignore_ascii_case("iterative_weighted") => {
                Ok(Self::IterativeWeighted)
            }
            _ => Err(icon_layers::IconLayerError::General(
                "invalid merge strategy, expected 'simple' or 'iterative-weighted'",
            )),
        }
    }
}

impl std::fmt::Display for MergeStrategyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::IterativeWeighted => write!(f, "iterative-weighted"),
        }
    }
}

impl From<MergeStrategyArg> for MergeStrategy {
    fn from(arg: MergeStrategyArg) -> Self {
        match arg {
            MergeStrategyArg::Simple => MergeStrategy::Simple,
            MergeStrategyArg::IterativeWeighted => MergeStrategy::IterativeWeighted,
        }
    }
}

/// Build the output filename for layer `index` of `total`, in `dir`.
pub fn layer_filename(
    dir: &std::path::Path,
    stem: &str,
    index: usize,
    format: &str,
) -> std::path::PathBuf {
    let format = if format.eq_ignore_ascii_case("jpg") || format.eq_ignore_ascii_case("jpeg") {
        "jpg"
    } else {
        "png"
    };
    dir.join(format!("{stem}-layer-{index:02}.{format}"))
}

/// Save an RGBA buffer to `output`, choosing encoder by file extension.
/// JPEG has no alpha channel, so alpha is flattened over white first.
pub fn save_layer(output: &std::path::Path, rgba: &[u8], width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
    let w = std::io::BufWriter::new(std::fs::File::create(output)?);

    let is_jpg = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));

    if is_jpg {
        let rgb: Vec<u8> = rgba
            .chunks_exact(4)
            .flat_map(|p| {
                let a = f32::from(p[3]) / 255.0;
                [
                    (f32::from(p[0]) * a + 255.0 * (1.0 - a)) as u8,
                    (f32::from(p[1]) * a + 255.0 * (1.0 - a)) as u8,
                    (f32::from(p[2]) * a + 255.0 * (1.0 - a)) as u8,
                ]
            })
            .collect();
        let mut encoder = JpegEncoder::new_with_quality(w, 90);
        encoder.encode(&rgb, width, height, ColorType::Rgb8)?;
        return Ok(());
    }

    let encoder = PngEncoder::new_with_quality(w, CompressionType::Best, FilterType::Sub);
    encoder.write_image(rgba, width, height, ColorType::Rgba8)?;
    Ok(())
}
