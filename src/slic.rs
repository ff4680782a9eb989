//! SLIC superpixel segmentation (spec §4.3).
//!
//! ## Reference
//!
//! *Achanta, R., Shaji, A., Smith, K., Lucchi, A., Fua, P., & Süsstrunk, S.
//! SLIC Superpixels. EPFL Technical Report no. 149300, June 2010.*

use crate::error::{IconLayerError, Result};
use crate::seed::{div_ceil_u32, init_seeds, perturb};
use crate::types::{AlphaBuffer, LabBuffer, LabColorParts, LabelMap, SlicCenter, ALPHA_THRESHOLD, SENTINEL_LABEL};

#[derive(Debug, Clone, Copy, Default)]
struct CenterAccumulator {
    color: LabColorParts,
    x: f64,
    y: f64,
    count: f64,
}

#[inline]
fn grid_interval(width: u32, height: u32, superpixels: u32) -> f64 {
    ((f64::from(width) * f64::from(height)) / f64::from(superpixels)).sqrt()
}

#[inline]
fn distance_xy(lhs: (f64, f64), rhs: (f64, f64)) -> f64 {
    (rhs.0 - lhs.0).powi(2) + (rhs.1 - lhs.1).powi(2)
}

fn in_bounds(width: i64, height: i64, x: i64, y: i64) -> Option<usize> {
    if (0..width).contains(&x) && (0..height).contains(&y) {
        usize::try_from(y * width + x).ok()
    } else {
        None
    }
}

/// Run SLIC over `lab`, excluding pixels whose `alpha` falls below
/// [`ALPHA_THRESHOLD`] from cluster assignment (spec §4.3 "visibility
/// mask"). Those pixels carry [`SENTINEL_LABEL`] in the returned map.
///
/// `compactness` is the spec's `m` weighting term, clamped to `[1, 50]`.
/// `superpixels` must be nonzero and strictly less than `width * height`.
pub fn run(
    lab: &LabBuffer,
    alpha: &AlphaBuffer,
    superpixels: u32,
    compactness: f64,
    iterations: u32,
    enforce_connectivity: bool,
) -> Result<LabelMap> {
    let width = lab.width;
    let height = lab.height;
    if width == 0 || height == 0 {
        return Err(IconLayerError::General("image dimensions must be nonzero"));
    }
    if superpixels == 0 {
        return Err(IconLayerError::General("superpixel count must be nonzero"));
    }
    if u64::from(superpixels) >= u64::from(width) * u64::from(height) {
        return Err(IconLayerError::General(
            "superpixel count must be less than the pixel count",
        ));
    }

    let m = compactness.clamp(1.0, 50.0);
    let s = grid_interval(width, height, superpixels)
        .round()
        .max(1.0) as u32;
    let m_div_s_sq = (m / f64::from(s)).powi(2);

    let mut centers = Vec::new();
    init_seeds(width, height, s, superpixels, lab, &mut centers)?;
    for center in &mut centers {
        perturb(center, i64::from(width), i64::from(height), lab);
    }

    let pixel_count = lab.data.len();
    let mut distances = vec![f64::INFINITY; pixel_count];
    let mut labels = vec![SENTINEL_LABEL; pixel_count];
    let mut accumulators = vec![CenterAccumulator::default(); centers.len()];

    let width_i = i64::from(width);
    let height_i = i64::from(height);

    for _ in 0..iterations.max(1) {
        for (center_index, center) in centers.iter().enumerate() {
            let cx = center.x as i64;
            let cy = center.y as i64;
            let s_i = i64::from(s);
            for y in (cy - s_i).max(0)..(cy + s_i).min(height_i) {
                for x in (cx - s_i).max(0)..(cx + s_i).min(width_i) {
                    let idx = (y * width_i + x) as usize;
                    if alpha.data[idx] < ALPHA_THRESHOLD {
                        continue;
                    }
                    let color = LabColorParts::from(lab.data[idx]);
                    let d_lab = color.distance_squared(&center.color);
                    let d_xy = distance_xy((f64::from(x), f64::from(y)), (center.x, center.y));
                    let distance = d_lab + m_div_s_sq * d_xy;
                    if distance < distances[idx] {
                        distances[idx] = distance;
                        labels[idx] = u32::try_from(center_index)
                            .map_err(|_| IconLayerError::General("too many superpixel centers"))?;
                    }
                }
            }
        }

        for acc in &mut accumulators {
            *acc = CenterAccumulator::default();
        }
        for y in 0..height {
            for x in 0..width {
                let idx = (y as usize) * (width as usize) + x as usize;
                if alpha.data[idx] < ALPHA_THRESHOLD {
                    continue;
                }
                let label = labels[idx];
                if label == SENTINEL_LABEL {
                    continue;
                }
                let acc = &mut accumulators[label as usize];
                let color = LabColorParts::from(lab.data[idx]);
                acc.color.l += color.l;
                acc.color.a += color.a;
                acc.color.b += color.b;
                acc.x += f64::from(x);
                acc.y += f64::from(y);
                acc.count += 1.0;
            }
        }

        for (acc, center) in accumulators.iter().zip(centers.iter_mut()) {
            if acc.count == 0.0 {
                continue;
            }
            center.color = LabColorParts {
                l: acc.color.l / acc.count,
                a: acc.color.a / acc.count,
                b: acc.color.b / acc.count,
            };
            center.x = acc.x / acc.count;
            center.y = acc.y / acc.count;
        }
    }

    let num_centers = if enforce_connectivity {
        enforce_label_connectivity(width, height, s, &mut labels) as usize
    } else {
        centers.len()
    };

    Ok(LabelMap {
        width,
        height,
        labels,
        num_centers,
    })
}

/// Relabel components disconnected from their assigned cluster to the
/// largest bordering neighbor label (spec §4.3 "connectivity enforcement").
/// Leaves [`SENTINEL_LABEL`] pixels untouched. Returns the number of
/// distinct labels in the relabeled map — the component count can differ
/// from the original SLIC center count, so callers must use this value
/// rather than assume labels stay `< centers.len()`.
fn enforce_label_connectivity(width: u32, height: u32, s: u32, labels: &mut [u32]) -> u32 {
    let width_i = i64::from(width);
    let height_i = i64::from(height);
    let cluster_threshold = (u64::from(s).pow(2) / 4) as usize;
    let mut new_labels = vec![u32::MAX; labels.len()];
    let neighbors = [(-1, 0), (0, -1), (1, 0), (0, 1)];
    let mut queue = Vec::new();
    let mut next_label = 0_u32;
    // Persists across components, like the teacher's `enforce_connectivity`:
    // a component with no already-labeled neighbor (can only happen before
    // any component has been kept) falls back to the last kept label
    // rather than its own unrelabeled (and possibly out-of-range) id.
    let mut neighbor_label = 0_u32;

    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let idx = (y * width_i + x) as usize;
            let old_label = labels[idx];
            if old_label == SENTINEL_LABEL || new_labels[idx] != u32::MAX {
                if old_label == SENTINEL_LABEL {
                    new_labels[idx] = SENTINEL_LABEL;
                }
                continue;
            }

            for &(dx, dy) in &neighbors {
                if let Some(n_idx) = in_bounds(width_i, height_i, x + dx, y + dy) {
                    let l = new_labels[n_idx];
                    if l != u32::MAX && l != SENTINEL_LABEL {
                        neighbor_label = l;
                    }
                }
            }

            queue.clear();
            queue.push((x, y));
            new_labels[idx] = next_label;
            let mut head = 0;
            while head < queue.len() {
                let (cx, cy) = queue[head];
                for &(dx, dy) in &neighbors {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if let Some(n_idx) = in_bounds(width_i, height_i, nx, ny) {
                        if labels[n_idx] == old_label && new_labels[n_idx] == u32::MAX {
                            new_labels[n_idx] = next_label;
                            queue.push((nx, ny));
                        }
                    }
                }
                head += 1;
            }

            if queue.len() <= cluster_threshold {
                for &(qx, qy) in &queue {
                    if let Some(n_idx) = in_bounds(width_i, height_i, qx, qy) {
                        new_labels[n_idx] = neighbor_label;
                    }
                }
            } else {
                next_label += 1;
            }
        }
    }

    labels.copy_from_slice(&new_labels);
    next_label
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::Lab;

    fn uniform(width: u32, height: u32) -> (LabBuffer, AlphaBuffer) {
        (
            LabBuffer {
                width,
                height,
                data: vec![Lab::new(50.0, 0.0, 0.0); (width * height) as usize],
            },
            AlphaBuffer {
                width,
                height,
                data: vec![1.0; (width * height) as usize],
            },
        )
    }

    #[test]
    fn labels_stay_within_center_count() {
        let (lab, alpha) = uniform(20, 20);
        let map = run(&lab, &alpha, 8, 10.0, 5, true).unwrap();
        for &label in &map.labels {
            assert!((label as usize) < map.num_centers);
        }
    }

    #[test]
    fn transparent_pixels_get_sentinel_label() {
        let (lab, mut alpha) = uniform(10, 10);
        for v in &mut alpha.data {
            *v = 0.0;
        }
        let map = run(&lab, &alpha, 4, 10.0, 3, false).unwrap();
        assert!(map.labels.iter().all(|&l| l == SENTINEL_LABEL));
    }

    #[test]
    fn rejects_zero_superpixels() {
        let (lab, alpha) = uniform(10, 10);
        assert!(run(&lab, &alpha, 0, 10.0, 3, false).is_err());
    }

    #[test]
    fn rejects_superpixel_count_not_below_pixel_count() {
        let (lab, alpha) = uniform(2, 2);
        assert!(run(&lab, &alpha, 4, 10.0, 3, false).is_err());
    }
}
