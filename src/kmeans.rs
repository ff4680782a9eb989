//! K-means++ clustering over superpixel features (spec §4.5).

use crate::defaults::{KMEANS_CONVERGENCE_DISTANCE, KMEANS_MAX_ITERATIONS};
use crate::rng::Lcg48;
use crate::types::{ClusterCenter3, ClusterCenter5, ClusterCenters, ClusterResult, LabColorParts};

/// Color-only (3D) k-means++ clustering.
///
/// `lightness_weight` scales the `L` term of the assignment distance during
/// Lloyd iteration only; final centers are always recomputed as the plain
/// (unweighted) mean of their assigned colors (spec §4.5.A).
#[must_use]
pub fn cluster_color(colors: &[LabColorParts], k: u32, lightness_weight: f64, seed: u64) -> ClusterResult {
    let n = colors.len();
    let k = (k as usize).min(n.max(1));
    if n == 0 || k == 0 {
        return ClusterResult {
            assignments: Vec::new(),
            centers: ClusterCenters::Color3(Vec::new()),
            iterations: 0,
            converged: true,
        };
    }

    let mut rng = Lcg48::new(seed);
    let mut centers: Vec<LabColorParts> = Vec::with_capacity(k);
    centers.push(colors[rng.next_index(n)]);
    while centers.len() < k {
        let weights: Vec<f64> = colors
            .iter()
            .map(|c| {
                centers
                    .iter()
                    .map(|center| weighted_distance_squared(c, center, lightness_weight))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let idx = rng.weighted_index(&weights);
        centers.push(colors[idx]);
    }

    let mut assignments = vec![0_i32; n];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..KMEANS_MAX_ITERATIONS {
        iterations += 1;
        for (point, assignment) in colors.iter().zip(assignments.iter_mut()) {
            *assignment = nearest_center(point, &centers, lightness_weight) as i32;
        }

        let mut sums = vec![LabColorParts::default(); k];
        let mut counts = vec![0_u32; k];
        for (point, &assignment) in colors.iter().zip(&assignments) {
            let idx = assignment as usize;
            sums[idx].l += point.l;
            sums[idx].a += point.a;
            sums[idx].b += point.b;
            counts[idx] += 1;
        }

        let mut movement = 0.0;
        for (idx, center) in centers.iter_mut().enumerate() {
            if counts[idx] == 0 {
                continue;
            }
            let n = f64::from(counts[idx]);
            let new_center = LabColorParts {
                l: sums[idx].l / n,
                a: sums[idx].a / n,
                b: sums[idx].b / n,
            };
            movement += center.distance(&new_center);
            *center = new_center;
        }

        if movement < KMEANS_CONVERGENCE_DISTANCE {
            converged = true;
            break;
        }
    }

    ClusterResult {
        assignments,
        centers: ClusterCenters::Color3(centers.into_iter().map(|color| ClusterCenter3 { color }).collect()),
        iterations,
        converged,
    }
}

/// Color+spatial (5D) k-means++ clustering, used by the split workflow
/// (spec §4.8). Seeding is color-only: the spatial component of each initial
/// center is taken from the superpixel nearest (in color) to the chosen
/// color seed.
#[must_use]
pub fn cluster_color_spatial(
    colors: &[LabColorParts],
    positions: &[(f64, f64)],
    k: u32,
    color_weight: f64,
    spatial_weight: f64,
    seed: u64,
) -> ClusterResult {
    let n = colors.len();
    let k = (k as usize).min(n.max(1));
    if n == 0 || k == 0 || positions.len() != n {
        return ClusterResult {
            assignments: Vec::new(),
            centers: ClusterCenters::Color5(Vec::new()),
            iterations: 0,
            converged: true,
        };
    }

    let mut rng = Lcg48::new(seed);
    let mut color_centers: Vec<LabColorParts> = Vec::with_capacity(k);
    let mut spatial_centers: Vec<(f64, f64)> = Vec::with_capacity(k);

    let first = rng.next_index(n);
    color_centers.push(colors[first]);
    spatial_centers.push(positions[first]);

    while color_centers.len() < k {
        let weights: Vec<f64> = colors
            .iter()
            .map(|c| {
                color_centers
                    .iter()
                    .map(|center| c.distance_squared(center))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let idx = rng.weighted_index(&weights);
        color_centers.push(colors[idx]);
        spatial_centers.push(positions[idx]);
    }

    let mut assignments = vec![0_i32; n];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..KMEANS_MAX_ITERATIONS {
        iterations += 1;
        for i in 0..n {
            let mut best = 0;
            let mut best_dist = f64::INFINITY;
            for c in 0..k {
                let dist = color_weight * colors[i].distance_squared(&color_centers[c])
                    + spatial_weight * spatial_distance_squared(positions[i], spatial_centers[c]);
                if dist < best_dist {
                    best_dist = dist;
                    best = c;
                }
            }
            assignments[i] = best as i32;
        }

        let mut color_sums = vec![LabColorParts::default(); k];
        let mut spatial_sums = vec![(0.0, 0.0); k];
        let mut counts = vec![0_u32; k];
        for i in 0..n {
            let idx = assignments[i] as usize;
            color_sums[idx].l += colors[i].l;
            color_sums[idx].a += colors[i].a;
            color_sums[idx].b += colors[i].b;
            spatial_sums[idx].0 += positions[i].0;
            spatial_sums[idx].1 += positions[i].1;
            counts[idx] += 1;
        }

        let mut movement = 0.0;
        for idx in 0..k {
            if counts[idx] == 0 {
                continue;
            }
            let cnt = f64::from(counts[idx]);
            let new_color = LabColorParts {
                l: color_sums[idx].l / cnt,
                a: color_sums[idx].a / cnt,
                b: color_sums[idx].b / cnt,
            };
            let new_spatial = (spatial_sums[idx].0 / cnt, spatial_sums[idx].1 / cnt);
            movement += color_centers[idx].distance(&new_color);
            movement += spatial_distance_squared(spatial_centers[idx], new_spatial).sqrt();
            color_centers[idx] = new_color;
            spatial_centers[idx] = new_spatial;
        }

        if movement < KMEANS_CONVERGENCE_DISTANCE {
            converged = true;
            break;
        }
    }

    let centers = color_centers
        .into_iter()
        .zip(spatial_centers)
        .map(|(color, position)| ClusterCenter5 { color, position })
        .collect();

    ClusterResult {
        assignments,
        centers: ClusterCenters::Color5(centers),
        iterations,
        converged,
    }
}

fn weighted_distance_squared(a: &LabColorParts, b: &LabColorParts, lightness_weight: f64) -> f64 {
    lightness_weight * (a.l - b.l).powi(2) + (a.a - b.a).powi(2) + (a.b - b.b).powi(2)
}

fn nearest_center(point: &LabColorParts, centers: &[LabColorParts], lightness_weight: f64) -> usize {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| (i, weighted_distance_squared(point, c, lightness_weight)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn spatial_distance_squared(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_well_separated_colors_split_into_two_clusters() {
        let colors = vec![
            LabColorParts { l: 10.0, a: 0.0, b: 0.0 },
            LabColorParts { l: 10.0, a: 0.0, b: 0.0 },
            LabColorParts { l: 90.0, a: 0.0, b: 0.0 },
            LabColorParts { l: 90.0, a: 0.0, b: 0.0 },
        ];
        let result = cluster_color(&colors, 2, 1.0, 42);
        assert_eq!(result.centers.len(), 2);
        assert_eq!(result.assignments[0], result.assignments[1]);
        assert_eq!(result.assignments[2], result.assignments[3]);
        assert_ne!(result.assignments[0], result.assignments[2]);
    }

    #[test]
    fn deterministic_given_same_seed() {
        let colors = vec![
            LabColorParts { l: 10.0, a: 5.0, b: -3.0 },
            LabColorParts { l: 85.0, a: -2.0, b: 8.0 },
            LabColorParts { l: 40.0, a: 0.0, b: 0.0 },
        ];
        let a = cluster_color(&colors, 2, 0.35, 8_675_309);
        let b = cluster_color(&colors, 2, 0.35, 8_675_309);
        assert_eq!(a.assignments, b.assignments);
    }

    #[test]
    fn centers_equal_mean_of_assigned_members() {
        let colors = vec![
            LabColorParts { l: 0.0, a: 0.0, b: 0.0 },
            LabColorParts { l: 2.0, a: 0.0, b: 0.0 },
            LabColorParts { l: 100.0, a: 0.0, b: 0.0 },
            LabColorParts { l: 98.0, a: 0.0, b: 0.0 },
        ];
        let result = cluster_color(&colors, 2, 1.0, 1);
        let ClusterCenters::Color3(centers) = &result.centers else {
            panic!("expected Color3 centers")
        };
        for (idx, center) in centers.iter().enumerate() {
            let members: Vec<_> = colors
                .iter()
                .zip(&result.assignments)
                .filter(|(_, &a)| a as usize == idx)
                .map(|(c, _)| c.l)
                .collect();
            if members.is_empty() {
                continue;
            }
            let mean = members.iter().sum::<f64>() / members.len() as f64;
            assert!((center.color.l - mean).abs() < 1e-6);
        }
    }

    #[test]
    fn empty_input_returns_empty_result() {
        let result = cluster_color(&[], 4, 0.35, 1);
        assert_eq!(result.centers.len(), 0);
        assert!(result.assignments.is_empty());
    }
}
