use std::f32::consts::TAU;

use eframe::egui::{Vec2, vec2};

use crate::history::ClusterId;
use crate::util::stable_pair;

/// Initial positions for a fresh simulation: a ring scaled by node count with
/// a small per-cluster jitter. A lone node starts on the center target.
pub fn seed_positions(cluster_ids: &[ClusterId], radii: &[f32]) -> Vec<Vec2> {
    let n = cluster_ids.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![Vec2::ZERO];
    }

    let widest = radii.iter().copied().fold(0.0_f32, f32::max);
    let base_radius = (n as f32).sqrt() * (40.0 + widest);

    cluster_ids
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let angle = (index as f32 / n as f32) * TAU;
            let (jx, jy) = stable_pair(id);
            let jitter = vec2(jx, jy) * (base_radius * 0.12);
            vec2(angle.cos(), angle.sin()) * base_radius + jitter
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_single_layouts() {
        assert!(seed_positions(&[], &[]).is_empty());
        assert_eq!(seed_positions(&[7], &[10.0]), vec![Vec2::ZERO]);
    }

    #[test]
    fn seeds_are_distinct_and_deterministic() {
        let ids = [-1, 0, 1, 2, 3];
        let radii = [8.0; 5];
        let first = seed_positions(&ids, &radii);
        assert_eq!(first, seed_positions(&ids, &radii));

        for i in 0..first.len() {
            for j in (i + 1)..first.len() {
                assert!((first[i] - first[j]).length() > 1.0);
            }
        }
    }
}
