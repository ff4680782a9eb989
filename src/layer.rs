//! Pixel-accurate layer extraction (spec §4.7).

use crate::types::{LabColorParts, Layer, RgbaBuffer, ALPHA_THRESHOLD};

/// Split `input` into one RGBA layer per cluster id in `0..cluster_count`.
/// A pixel whose `pixel_clusters` entry is negative (excluded from
/// segmentation) or doesn't match a layer's id is transparent in that
/// layer; clusters with zero opaque pixels are omitted from the result.
#[must_use]
pub fn extract(input: &RgbaBuffer, pixel_clusters: &[i32], cluster_count: usize) -> Vec<Layer> {
    let mut buffers: Vec<RgbaBuffer> = (0..cluster_count)
        .map(|_| RgbaBuffer::new(input.width, input.height))
        .collect();
    let mut color_sums = vec![LabColorParts::default(); cluster_count];
    let mut counts = vec![0_u32; cluster_count];

    for (i, &cluster) in pixel_clusters.iter().enumerate() {
        if cluster < 0 || cluster as usize >= cluster_count {
            continue;
        }
        let pixel = input.pixel(i);
        let alpha = f32::from(pixel[3]) / 255.0;
        if alpha < ALPHA_THRESHOLD {
            continue;
        }

        let idx = cluster as usize;
        buffers[idx].set_pixel(i, pixel);
        counts[idx] += 1;

        let color = srgb8_to_lab(pixel[0], pixel[1], pixel[2]);
        color_sums[idx].l += color.l;
        color_sums[idx].a += color.a;
        color_sums[idx].b += color.b;
    }

    buffers
        .into_iter()
        .zip(color_sums)
        .zip(counts)
        .filter(|(_, &count)| count > 0)
        .map(|((rgba, sum), count)| {
            let n = f64::from(count);
            Layer {
                rgba,
                pixel_count: count,
                mean_color: LabColorParts {
                    l: sum.l / n,
                    a: sum.a / n,
                    b: sum.b / n,
                },
            }
        })
        .collect()
}

fn srgb8_to_lab(r: u8, g: u8, b: u8) -> LabColorParts {
    use palette::{FromColor, Lab, Srgb};
    let srgb = Srgb::new(r, g, b).into_format::<f64>();
    let lab: Lab<palette::white_point::D65, f64> = Lab::from_color(srgb);
    LabColorParts::from(lab)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_pixels_by_cluster() {
        let mut input = RgbaBuffer::new(2, 1);
        input.set_pixel(0, [255, 0, 0, 255]);
        input.set_pixel(1, [0, 255, 0, 255]);
        let layers = extract(&input, &[0, 1], 2);
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].pixel_count, 1);
        assert_eq!(layers[0].rgba.pixel(0), [255, 0, 0, 255]);
        assert_eq!(layers[0].rgba.pixel(1), [0, 0, 0, 0]);
    }

    #[test]
    fn excludes_transparent_and_unassigned_pixels() {
        let mut input = RgbaBuffer::new(3, 1);
        input.set_pixel(0, [255, 0, 0, 0]);
        input.set_pixel(1, [0, 255, 0, 255]);
        input.set_pixel(2, [0, 0, 255, 255]);
        let layers = extract(&input, &[-1, 0, 0], 1);
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].pixel_count, 1);
    }

    #[test]
    fn empty_clusters_are_omitted() {
        let input = RgbaBuffer::new(1, 1);
        let layers = extract(&input, &[-1], 3);
        assert!(layers.is_empty());
    }
}
