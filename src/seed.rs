//! Superpixel seed initialization and perturbation (spec §4.3 "Seed
//! placement").

use num_traits::ToPrimitive;

use crate::error::{IconLayerError, Result};
use crate::types::{LabBuffer, LabColorParts, SlicCenter};

/// Quotient of `lhs` and `rhs`, rounded towards positive infinity.
#[inline]
pub(crate) fn div_ceil_u32(lhs: u32, rhs: u32) -> u32 {
    let d = lhs / rhs;
    let r = lhs % rhs;
    if r > 0 { d + 1 } else { d }
}

/// Place an evenly-spaced grid of seed centers over the image (spec §4.3:
/// "seeds are placed on a regular grid with spacing `S`").
///
/// `width`, `height`, `s`, and `k` must not be `0`. Seed colors are read
/// directly from `lab`, regardless of pixel visibility: the alpha mask is
/// only consulted once SLIC starts assigning pixels to centers.
pub(crate) fn init_seeds(
    width: u32,
    height: u32,
    s: u32,
    k: u32,
    lab: &LabBuffer,
    seeds: &mut Vec<SlicCenter>,
) -> Result<()> {
    seeds.clear();
    let half_s = div_ceil_u32(s, 2);
    let mut x_seeds = div_ceil_u32(width, s);
    let mut y_seeds = div_ceil_u32(height, s);

    if u64::from(s) * u64::from(x_seeds) > u64::from(width) {
        x_seeds -= 1;
    }
    if u64::from(s) * u64::from(y_seeds) > u64::from(height) {
        y_seeds -= 1;
    }

    while u64::from(x_seeds) * u64::from(y_seeds) > u64::from(k) {
        x_seeds -= 1;
        y_seeds -= 1;
    }

    if x_seeds == 0 {
        x_seeds += 1;
    }
    if y_seeds == 0 {
        y_seeds += 1;
    }

    let x_correction = (f64::from(width) - f64::from(x_seeds) * f64::from(s)) / f64::from(x_seeds);
    let y_correction = (f64::from(height) - f64::from(y_seeds) * f64::from(s)) / f64::from(y_seeds);

    let total_seeds = usize::try_from(u64::from(x_seeds) * u64::from(y_seeds))
        .map_err(|_| IconLayerError::General("seed grid overflowed usize"))?;
    if total_seeds > seeds.capacity() {
        seeds.try_reserve_exact(total_seeds - seeds.capacity())?;
    }

    for ydx in 0..y_seeds {
        let y_correct = (f64::from(ydx) * y_correction)
            .to_u32()
            .ok_or(IconLayerError::General("could not convert y correction"))?;
        for xdx in 0..x_seeds {
            let x_correct = (f64::from(xdx) * x_correction)
                .to_u32()
                .ok_or(IconLayerError::General("could not convert x correction"))?;
            let x = xdx
                .saturating_mul(s)
                .saturating_add(half_s)
                .saturating_add(x_correct);
            let y = ydx
                .saturating_mul(s)
                .saturating_add(half_s)
                .saturating_add(y_correct);
            let i = usize::try_from(
                u64::from(y)
                    .saturating_mul(u64::from(width))
                    .saturating_add(u64::from(x)),
            )
            .map_err(|_| IconLayerError::General("seed index overflowed usize"))?;
            if x < width && y < height && i < lab.data.len() {
                seeds.push(SlicCenter {
                    x: f64::from(x),
                    y: f64::from(y),
                    color: LabColorParts::from(lab.data[i]),
                });
            }
        }
    }

    Ok(())
}

/// Move each seed to the pixel in its 3x3 neighborhood with the lowest color
/// gradient, to avoid anchoring on a noisy pixel (spec §4.3).
pub(crate) fn perturb(seed: &mut SlicCenter, width: i64, height: i64, lab: &LabBuffer) {
    let mut min = f64::INFINITY;
    let sp_x = seed.x as i64;
    let sp_y = seed.y as i64;

    for ydx in -1..=1 {
        for xdx in -1..=1 {
            let (cx, cy) = (sp_x + xdx, sp_y + ydx);
            let Some(color) = pixel_at(width, height, cx, cy, lab) else {
                continue;
            };

            let a = pixel_at(width, height, cx + 1, cy, lab).unwrap_or_default();
            let b = pixel_at(width, height, cx - 1, cy, lab).unwrap_or_default();
            let c = pixel_at(width, height, cx, cy + 1, lab).unwrap_or_default();
            let d = pixel_at(width, height, cx, cy - 1, lab).unwrap_or_default();

            let gradient = a.distance_squared(&b) + c.distance_squared(&d);
            if gradient < min {
                min = gradient;
                seed.color = color;
                seed.x = cx as f64;
                seed.y = cy as f64;
            }
        }
    }
}

fn pixel_at(width: i64, height: i64, x: i64, y: i64, lab: &LabBuffer) -> Option<LabColorParts> {
    if (0..width).contains(&x) && (0..height).contains(&y) {
        let i = usize::try_from(y * width + x).ok()?;
        lab.data.get(i).copied().map(LabColorParts::from)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use palette::Lab;

    fn lab_buffer(width: u32, height: u32) -> LabBuffer {
        LabBuffer {
            width,
            height,
            data: vec![Lab::new(50.0, 0.0, 0.0); (width * height) as usize],
        }
    }

    #[test]
    fn seeds_evenly_spaced() {
        let lab = lab_buffer(20, 20);
        let mut seeds = Vec::new();
        init_seeds(20, 20, 5, 16, &lab, &mut seeds).unwrap();
        assert!(!seeds.is_empty());
        for s in &seeds {
            assert!(s.x < 20.0 && s.y < 20.0);
        }
    }

    #[test]
    fn small_image_yields_at_least_one_seed() {
        let lab = lab_buffer(2, 2);
        let mut seeds = Vec::new();
        init_seeds(2, 2, 10, 4, &lab, &mut seeds).unwrap();
        assert!(!seeds.is_empty());
    }
}
