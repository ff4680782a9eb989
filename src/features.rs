//! Per-superpixel feature extraction (spec §4.4).

use crate::types::{DepthBuffer, LabBuffer, LabColorParts, LabelMap, SuperpixelFeature, SENTINEL_LABEL};

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    color: LabColorParts,
    x: f64,
    y: f64,
    depth: f64,
    count: u32,
}

/// Aggregate each visible superpixel's mean LAB color, mean position, pixel
/// count, and (if `depth` is supplied) mean depth.
///
/// Superpixels with zero visible pixels are omitted; the returned vector's
/// order matches ascending label id, but the id space may have holes.
#[must_use]
pub fn extract(lab: &LabBuffer, labels: &LabelMap, depth: Option<&DepthBuffer>) -> Vec<SuperpixelFeature> {
    let mut accumulators = vec![Accumulator::default(); labels.num_centers];

    for (idx, &label) in labels.labels.iter().enumerate() {
        if label == SENTINEL_LABEL {
            continue;
        }
        let x = (idx % labels.width as usize) as f64;
        let y = (idx / labels.width as usize) as f64;
        let color = LabColorParts::from(lab.data[idx]);

        let acc = &mut accumulators[label as usize];
        acc.color.l += color.l;
        acc.color.a += color.a;
        acc.color.b += color.b;
        acc.x += x;
        acc.y += y;
        if let Some(depth) = depth {
            acc.depth += f64::from(depth.data[idx]);
        }
        acc.count += 1;
    }

    accumulators
        .into_iter()
        .enumerate()
        .filter(|(_, acc)| acc.count > 0)
        .map(|(id, acc)| {
            let n = f64::from(acc.count);
            SuperpixelFeature {
                id: id as u32,
                lab_color: LabColorParts {
                    l: acc.color.l / n,
                    a: acc.color.a / n,
                    b: acc.color.b / n,
                },
                pixel_count: acc.count,
                center_position: (acc.x / n, acc.y / n),
                average_depth: acc.depth / n,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::Lab;

    #[test]
    fn single_superpixel_mean_matches_uniform_color() {
        let lab = LabBuffer {
            width: 2,
            height: 2,
            data: vec![Lab::new(40.0, 10.0, -5.0); 4],
        };
        let labels = LabelMap {
            width: 2,
            height: 2,
            labels: vec![0, 0, 0, 0],
            num_centers: 1,
        };
        let feats = extract(&lab, &labels, None);
        assert_eq!(feats.len(), 1);
        assert_eq!(feats[0].pixel_count, 4);
        assert!((feats[0].lab_color.l - 40.0).abs() < 1e-9);
        assert!((feats[0].lab_color.a - 10.0).abs() < 1e-9);
        assert!((feats[0].lab_color.b - (-5.0)).abs() < 1e-9);
    }

    #[test]
    fn sentinel_labeled_pixels_excluded() {
        let lab = LabBuffer {
            width: 2,
            height: 1,
            data: vec![Lab::new(0.0, 0.0, 0.0), Lab::new(100.0, 0.0, 0.0)],
        };
        let labels = LabelMap {
            width: 2,
            height: 1,
            labels: vec![SENTINEL_LABEL, 0],
            num_centers: 1,
        };
        let feats = extract(&lab, &labels, None);
        assert_eq!(feats.len(), 1);
        assert_eq!(feats[0].pixel_count, 1);
        assert!((feats[0].lab_color.l - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_superpixels_are_omitted() {
        let lab = LabBuffer {
            width: 1,
            height: 1,
            data: vec![Lab::new(50.0, 0.0, 0.0)],
        };
        let labels = LabelMap {
            width: 1,
            height: 1,
            labels: vec![2],
            num_centers: 3,
        };
        let feats = extract(&lab, &labels, None);
        assert_eq!(feats.len(), 1);
        assert_eq!(feats[0].id, 2);
    }
}
