//! Cluster-merge strategies (spec §4.6).

use fxhash::FxHashMap;

use crate::types::{ClusterCenter3, ClusterCenter5, ClusterCenters, LabColorParts, SuperpixelFeature};

/// Pairwise threshold merge: any two clusters whose centers are within
/// `threshold` of each other are unioned (with path compression), then
/// cluster ids are compacted to `0..N`.
///
/// Merged centers are the unweighted mean of the colors (and, for 5D
/// centers, positions) of the clusters folded into them — `merge_simple`
/// has no access to per-cluster population, only the centers themselves.
#[must_use]
pub fn merge_simple(centers: &ClusterCenters, assignments: &mut [i32], threshold: f64) -> ClusterCenters {
    let n = centers.len();
    if n == 0 {
        return empty_like(centers);
    }

    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if centers.color(i).distance(&centers.color(j)) < threshold {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj] = ri;
                }
            }
        }
    }

    let roots: Vec<usize> = (0..n).map(|i| find(&mut parent, i)).collect();
    let mut compacted: Vec<i32> = vec![-1; n];
    let mut next_id = 0_i32;
    for &root in &roots {
        if compacted[root] == -1 {
            compacted[root] = next_id;
            next_id += 1;
        }
    }
    let new_count = next_id as usize;

    let mut color_sums = vec![LabColorParts::default(); new_count];
    let mut position_sums = vec![(0.0_f64, 0.0_f64); new_count];
    let mut counts = vec![0_u32; new_count];
    for i in 0..n {
        let new_id = compacted[roots[i]] as usize;
        let color = centers.color(i);
        color_sums[new_id].l += color.l;
        color_sums[new_id].a += color.a;
        color_sums[new_id].b += color.b;
        if let ClusterCenters::Color5(v) = centers {
            position_sums[new_id].0 += v[i].position.0;
            position_sums[new_id].1 += v[i].position.1;
        }
        counts[new_id] += 1;
    }

    for assignment in assignments.iter_mut() {
        if *assignment >= 0 && (*assignment as usize) < n {
            *assignment = compacted[roots[*assignment as usize]];
        }
    }

    build_centers(centers, color_sums, position_sums, counts)
}

/// Repeatedly merge the pair of clusters with the smallest weighted
/// distance, stopping once that smallest weighted distance corresponds to
/// an *unweighted* distance at or above `threshold` (spec §4.6.B). Merged
/// centers are the population-weighted mean color of all member
/// superpixels, so cluster size keeps influencing later merge order even
/// though the initial centers did not carry population data.
#[must_use]
pub fn merge_iterative_weighted(
    centers: &ClusterCenters,
    assignments: &mut [i32],
    feats: &[SuperpixelFeature],
    threshold: f64,
    lightness_weight: f64,
    green_axis_scale: f64,
) -> ClusterCenters {
    let n = centers.len();
    if n == 0 {
        return empty_like(centers);
    }

    struct Cluster {
        label: i32,
        color: LabColorParts,
        position: (f64, f64),
        population: f64,
    }

    let mut populations = vec![0.0_f64; n];
    let mut position_sums = vec![(0.0_f64, 0.0_f64); n];
    // `assignments` is indexed by dense position in `feats` (the order
    // clustering ran in), not by `feat.id` — superpixel ids can have holes
    // (spec §4.4), so the position in `feats` must be used here.
    for (pos, feat) in feats.iter().enumerate() {
        let assignment = assignments.get(pos).copied().unwrap_or(-1);
        if assignment < 0 || assignment as usize >= n {
            continue;
        }
        let idx = assignment as usize;
        populations[idx] += f64::from(feat.pixel_count);
        position_sums[idx].0 += feat.center_position.0 * f64::from(feat.pixel_count);
        position_sums[idx].1 += feat.center_position.1 * f64::from(feat.pixel_count);
    }

    let mut clusters: Vec<Cluster> = (0..n)
        .map(|i| {
            let population = populations[i].max(1.0);
            let position = if populations[i] > 0.0 {
                (position_sums[i].0 / populations[i], position_sums[i].1 / populations[i])
            } else {
                match centers {
                    ClusterCenters::Color5(v) => v[i].position,
                    ClusterCenters::Color3(_) => (0.0, 0.0),
                }
            };
            Cluster {
                label: i as i32,
                color: centers.color(i),
                position,
                population,
            }
        })
        .collect();

    loop {
        if clusters.len() <= 1 {
            break;
        }

        let mut best: Option<(usize, usize, f64, f64)> = None;
        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                let weighted = weighted_distance(&clusters[i].color, &clusters[j].color, lightness_weight, green_axis_scale);
                let unweighted = clusters[i].color.distance(&clusters[j].color);
                if best.map_or(true, |(_, _, w, _)| weighted < w) {
                    best = Some((i, j, weighted, unweighted));
                }
            }
        }

        let Some((i, j, _, unweighted)) = best else {
            break;
        };
        if unweighted >= threshold {
            break;
        }

        let total = clusters[i].population + clusters[j].population;
        let merged_color = LabColorParts {
            l: (clusters[i].color.l * clusters[i].population + clusters[j].color.l * clusters[j].population) / total,
            a: (clusters[i].color.a * clusters[i].population + clusters[j].color.a * clusters[j].population) / total,
            b: (clusters[i].color.b * clusters[i].population + clusters[j].color.b * clusters[j].population) / total,
        };
        let merged_position = (
            (clusters[i].position.0 * clusters[i].population + clusters[j].position.0 * clusters[j].population) / total,
            (clusters[i].position.1 * clusters[i].population + clusters[j].position.1 * clusters[j].population) / total,
        );

        let loser_label = clusters[j].label;
        let winner_label = clusters[i].label;
        for assignment in assignments.iter_mut() {
            if *assignment == loser_label {
                *assignment = winner_label;
            }
        }

        clusters[i].color = merged_color;
        clusters[i].position = merged_position;
        clusters[i].population = total;
        clusters.remove(j);
    }

    let mut remap = FxHashMap::default();
    for (new_id, cluster) in clusters.iter().enumerate() {
        remap.insert(cluster.label, new_id as i32);
    }
    for assignment in assignments.iter_mut() {
        if let Some(&new_id) = remap.get(assignment) {
            *assignment = new_id;
        }
    }

    match centers {
        ClusterCenters::Color3(_) => ClusterCenters::Color3(
            clusters.into_iter().map(|c| ClusterCenter3 { color: c.color }).collect(),
        ),
        ClusterCenters::Color5(_) => ClusterCenters::Color5(
            clusters
                .into_iter()
                .map(|c| ClusterCenter5 {
                    color: c.color,
                    position: c.position,
                })
                .collect(),
        ),
    }
}

fn weighted_distance(a: &LabColorParts, b: &LabColorParts, lightness_weight: f64, green_axis_scale: f64) -> f64 {
    let da = b.a - a.a;
    let da = if da < 0.0 { da * green_axis_scale } else { da };
    lightness_weight * (b.l - a.l).powi(2) + da.powi(2) + (b.b - a.b).powi(2)
}

fn empty_like(centers: &ClusterCenters) -> ClusterCenters {
    match centers {
        ClusterCenters::Color3(_) => ClusterCenters::Color3(Vec::new()),
        ClusterCenters::Color5(_) => ClusterCenters::Color5(Vec::new()),
    }
}

fn build_centers(
    centers: &ClusterCenters,
    color_sums: Vec<LabColorParts>,
    position_sums: Vec<(f64, f64)>,
    counts: Vec<u32>,
) -> ClusterCenters {
    let color_means: Vec<LabColorParts> = color_sums
        .into_iter()
        .zip(&counts)
        .map(|(sum, &count)| {
            let n = f64::from(count.max(1));
            LabColorParts {
                l: sum.l / n,
                a: sum.a / n,
                b: sum.b / n,
            }
        })
        .collect();

    match centers {
        ClusterCenters::Color3(_) => {
            ClusterCenters::Color3(color_means.into_iter().map(|color| ClusterCenter3 { color }).collect())
        }
        ClusterCenters::Color5(_) => {
            let positions: Vec<(f64, f64)> = position_sums
                .into_iter()
                .zip(&counts)
                .map(|(sum, &count)| {
                    let n = f64::from(count.max(1));
                    (sum.0 / n, sum.1 / n)
                })
                .collect();
            ClusterCenters::Color5(
                color_means
                    .into_iter()
                    .zip(positions)
                    .map(|(color, position)| ClusterCenter5 { color, position })
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color3(vals: &[(f64, f64, f64)]) -> ClusterCenters {
        ClusterCenters::Color3(
            vals.iter()
                .map(|&(l, a, b)| ClusterCenter3 {
                    color: LabColorParts { l, a, b },
                })
                .collect(),
        )
    }

    #[test]
    fn merge_simple_joins_close_centers() {
        let centers = color3(&[(10.0, 0.0, 0.0), (11.0, 0.0, 0.0), (90.0, 0.0, 0.0)]);
        let mut assignments = vec![0, 1, 2, 0, 1];
        let merged = merge_simple(&centers, &mut assignments, 5.0);
        assert_eq!(merged.len(), 2);
        assert_eq!(assignments[0], assignments[1]);
        assert_ne!(assignments[0], assignments[2]);
    }

    #[test]
    fn merge_simple_leaves_distant_centers_alone() {
        let centers = color3(&[(0.0, 0.0, 0.0), (50.0, 0.0, 0.0), (100.0, 0.0, 0.0)]);
        let mut assignments = vec![0, 1, 2];
        let merged = merge_simple(&centers, &mut assignments, 5.0);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn merge_iterative_weighted_respects_unweighted_threshold() {
        let centers = color3(&[(10.0, 0.0, 0.0), (12.0, 0.0, 0.0), (90.0, 0.0, 0.0)]);
        let feats = vec![
            SuperpixelFeature {
                id: 0,
                lab_color: LabColorParts { l: 10.0, a: 0.0, b: 0.0 },
                pixel_count: 10,
                center_position: (0.0, 0.0),
                average_depth: 0.0,
            },
            SuperpixelFeature {
                id: 1,
                lab_color: LabColorParts { l: 12.0, a: 0.0, b: 0.0 },
                pixel_count: 5,
                center_position: (1.0, 1.0),
                average_depth: 0.0,
            },
            SuperpixelFeature {
                id: 2,
                lab_color: LabColorParts { l: 90.0, a: 0.0, b: 0.0 },
                pixel_count: 20,
                center_position: (5.0, 5.0),
                average_depth: 0.0,
            },
        ];
        let mut assignments = vec![0, 1, 2];
        let merged = merge_iterative_weighted(&centers, &mut assignments, &feats, 5.0, 0.35, 2.0);
        assert_eq!(merged.len(), 2);
        assert_eq!(assignments[0], assignments[1]);
    }
}
