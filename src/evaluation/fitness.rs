use crate::config::constant::MAX_RADIUS_OF_INFLUENCE;
use crate::domain::individual::Individual;
use crate::domain::types::Problem;
use crate::evaluation::geometry::{grid_union_intersect, union_intersect, Boxf};

/// Fitness strategy. Both variants score the mean per-slot `union - intersect`
/// area of the active stores' influence squares and must agree within
/// floating-point tolerance; `Grid` avoids polygon clipping entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fitness {
    Direct,
    Grid,
}

impl Fitness {
    /// Score an individual. Higher is better: large well-spread coverage with
    /// little overlap between stores active on the same slot.
    pub fn evaluate(&self, ind: &Individual, problem: &Problem) -> f64 {
        let slots = problem.rules.slot_count;
        if slots == 0 {
            return 0.0;
        }

        let positions: Vec<(f64, f64)> = ind
            .cluster
            .iter()
            .map(|id| {
                let store = problem.store(id);
                (store.lat, store.lon)
            })
            .collect();

        let mut total = 0.0;
        for slot in 0..slots {
            let column_sum: f64 = (0..ind.cluster.len()).map(|i| ind.weights[i][slot]).sum();
            if column_sum <= 0.0 {
                // No store active on this slot; defined zero contribution.
                continue;
            }

            let boxes: Vec<Boxf> = (0..ind.cluster.len())
                .filter(|&i| ind.weights[i][slot] > 0.0)
                .map(|i| {
                    let share = ind.weights[i][slot] / column_sum;
                    let radius = share.sqrt() * MAX_RADIUS_OF_INFLUENCE;
                    let (lat, lon) = positions[i];
                    Boxf::around_store(lat, lon, radius)
                })
                .collect();

            let (union, intersect) = match self {
                Fitness::Direct => union_intersect(&boxes),
                Fitness::Grid => grid_union_intersect(&boxes),
            };
            total += union - intersect;
        }

        total / slots as f64
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::domain::types::{Rules, Store, StoreConstraints};
    use crate::fixtures::data_generator::generate_problem_with;

    fn assert_close(a: f64, b: f64) {
        let scale = a.abs().max(b.abs()).max(1.0);
        assert!((a - b).abs() / scale < 1e-6, "{a} vs {b}");
    }

    #[test]
    fn strategies_agree_across_sizes() {
        let mut seed = 0;
        for store_count in [0usize, 1, 2, 5, 20] {
            for (slot_count, cap) in [(1usize, 1usize), (5, 2), (55, 14)] {
                seed += 1;
                let problem = generate_problem_with(store_count, slot_count, cap, seed);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let mut ind = Individual::new(problem.store_ids(), &problem);
                ind.fill_random(&problem, &mut rng);

                let direct = Fitness::Direct.evaluate(&ind, &problem);
                let grid = Fitness::Grid.evaluate(&ind, &problem);
                assert_close(direct, grid);
            }
        }
    }

    #[test]
    fn empty_cluster_scores_zero() {
        let problem = generate_problem_with(0, 5, 2, 42);
        let ind = Individual::new(vec![], &problem);
        assert_eq!(Fitness::Direct.evaluate(&ind, &problem), 0.0);
        assert_eq!(Fitness::Grid.evaluate(&ind, &problem), 0.0);
    }

    #[test]
    fn colocated_equal_stores_share_one_slot_for_zero_score() {
        // Three stores at the same point, equal weights, cap 1, and the same
        // single mandatory slot: all three influence squares coincide on that
        // slot, so union minus intersect is zero everywhere.
        let mut stores = HashMap::new();
        let mut constraints = HashMap::new();
        for i in 0..3 {
            let id = format!("store/{i}");
            stores.insert(
                id.clone(),
                Store {
                    id: id.clone(),
                    lon: 15.9,
                    lat: 45.8,
                    weight: 250.0,
                },
            );
            constraints.insert(
                id,
                StoreConstraints {
                    mandatory: vec![0],
                    forbidden: vec![],
                },
            );
        }
        let problem = Problem {
            stores,
            rules: Rules {
                slot_count: 4,
                cap: 1,
                max_forbidden: 3,
            },
            constraints,
        };

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ind = Individual::new(problem.store_ids(), &problem);
        ind.fill_random(&problem, &mut rng);
        ind.assert_cap(&problem);

        assert!(Fitness::Direct.evaluate(&ind, &problem).abs() < 1e-9);
        assert!(Fitness::Grid.evaluate(&ind, &problem).abs() < 1e-9);
    }

    #[test]
    fn lone_active_store_contributes_its_square() {
        let problem = generate_problem_with(1, 1, 1, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut ind = Individual::new(problem.store_ids(), &problem);
        ind.fill_random(&problem, &mut rng);

        // Single store active alone: share 1, radius MAX, square area (2r)^2.
        let expected = (2.0 * MAX_RADIUS_OF_INFLUENCE).powi(2);
        assert_close(Fitness::Direct.evaluate(&ind, &problem), expected);
        assert_close(Fitness::Grid.evaluate(&ind, &problem), expected);
    }
}
