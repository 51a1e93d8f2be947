use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;

use crate::domain::individual::Individual;
use crate::domain::types::Problem;

/// Draw from a geometric distribution with success probability `p`,
/// support {1, 2, ...}.
pub fn sample_geometric<R: Rng>(p: f64, rng: &mut R) -> usize {
    if p >= 1.0 {
        return 1;
    }
    let u: f64 = rng.gen_range(f64::EPSILON..1.0);
    (u.ln() / (1.0 - p).ln()).floor() as usize + 1
}

/// Row k-switch: swap the entire optional set, available set and weight row
/// of `k` randomly chosen stores between the parents. Rows where either side
/// has no optional slots are left untouched.
pub fn crossover_rows_kswitch<R: Rng>(a: &mut Individual, b: &mut Individual, k: usize, rng: &mut R) {
    let rows = a.cluster.len();
    let chosen = (0..rows).choose_multiple(rng, k.min(rows));
    for i in chosen {
        if a.assigned[i].is_empty() || b.assigned[i].is_empty() {
            continue;
        }
        std::mem::swap(&mut a.assigned[i], &mut b.assigned[i]);
        std::mem::swap(&mut a.available[i], &mut b.available[i]);
        std::mem::swap(&mut a.weights[i], &mut b.weights[i]);
    }
}

/// Single-point row crossover: swap all rows from a random index onward.
pub fn crossover_single_point<R: Rng>(a: &mut Individual, b: &mut Individual, rng: &mut R) {
    let rows = a.cluster.len();
    if rows == 0 {
        return;
    }
    let start = rng.gen_range(0..rows);
    for i in start..rows {
        if a.assigned[i].is_empty() || b.assigned[i].is_empty() {
            continue;
        }
        std::mem::swap(&mut a.assigned[i], &mut b.assigned[i]);
        std::mem::swap(&mut a.available[i], &mut b.available[i]);
        std::mem::swap(&mut a.weights[i], &mut b.weights[i]);
    }
}

/// Column k-switch: for `k` randomly chosen slots, every store where exactly
/// one parent holds the slot has the assignment moved across, after which the
/// count imbalance is repaired by transferring one other optional slot back.
/// Both children must satisfy the cap on every store afterwards.
pub fn crossover_columns_kswitch<R: Rng>(
    a: &mut Individual,
    b: &mut Individual,
    problem: &Problem,
    k: usize,
    rng: &mut R,
) {
    let slots = problem.rules.slot_count;
    let chosen = (0..slots).choose_multiple(rng, k.min(slots));
    for slot in chosen {
        for i in 0..a.cluster.len() {
            let in_a = a.assigned[i].contains(&slot);
            let in_b = b.assigned[i].contains(&slot);
            if in_a == in_b {
                continue;
            }
            // `from` holds the slot, `to` lacks it.
            let (from, to) = if in_a { (&mut *a, &mut *b) } else { (&mut *b, &mut *a) };
            let weight = problem.store(&from.cluster[i]).weight;

            let pos = from.assigned[i]
                .iter()
                .position(|&s| s == slot)
                .expect("slot vanished from donor row");
            from.assigned[i].remove(pos);
            from.available[i].push(slot);
            from.weights[i][slot] = 0.0;

            let pos = to.available[i]
                .iter()
                .position(|&s| s == slot)
                .unwrap_or_else(|| {
                    panic!("slot {slot} not available for store {}", to.cluster[i])
                });
            to.available[i].remove(pos);
            to.assigned[i].push(slot);
            to.weights[i][slot] = weight;

            // `to` is now one over the cap, `from` one under. Drop one other
            // optional slot from `to` and grant `from` a random available one.
            let others: Vec<usize> = (0..to.assigned[i].len())
                .filter(|&j| to.assigned[i][j] != slot)
                .collect();
            let drop_idx = match others.choose(rng) {
                Some(&j) => j,
                // No other optional slot exists; the move has to be undone.
                None => to.assigned[i].len() - 1,
            };
            let dropped = to.assigned[i].remove(drop_idx);
            to.available[i].push(dropped);
            to.weights[i][dropped] = 0.0;

            let take_idx = rng.gen_range(0..from.available[i].len());
            let taken = from.available[i].remove(take_idx);
            from.assigned[i].push(taken);
            from.weights[i][taken] = weight;
        }
    }

    a.assert_cap(problem);
    b.assert_cap(problem);
}

/// Per store with probability `prob`, swap up to `count` optional slots with
/// random available ones. No-op for a store when either set is empty.
pub fn mutate_swap<R: Rng>(
    ind: &mut Individual,
    problem: &Problem,
    prob: f64,
    count: usize,
    rng: &mut R,
) {
    for i in 0..ind.cluster.len() {
        if ind.assigned[i].is_empty() {
            continue;
        }
        if rng.gen::<f64>() >= prob {
            continue;
        }
        let weight = problem.store(&ind.cluster[i]).weight;
        for _ in 0..count {
            if ind.assigned[i].is_empty() || ind.available[i].is_empty() {
                break;
            }
            let ai = rng.gen_range(0..ind.assigned[i].len());
            let vi = rng.gen_range(0..ind.available[i].len());
            let vacated = ind.assigned[i][ai];
            let entered = ind.available[i][vi];
            ind.assigned[i][ai] = entered;
            ind.available[i][vi] = vacated;
            ind.weights[i][vacated] = 0.0;
            ind.weights[i][entered] = weight;
        }
    }
}

/// Crossover strategy, injected into the GA settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crossover {
    /// Row k-switch with k drawn geometrically, capped at store count - 1.
    RowsGeometric { p: f64 },
    /// Column k-switch with k drawn geometrically, capped at the slot count.
    ColumnsGeometric { p: f64 },
    SinglePoint,
}

impl Crossover {
    pub fn apply<R: Rng>(
        &self,
        a: &mut Individual,
        b: &mut Individual,
        problem: &Problem,
        rng: &mut R,
    ) {
        match *self {
            Crossover::RowsGeometric { p } => {
                let k = sample_geometric(p, rng).min(a.cluster.len().saturating_sub(1));
                crossover_rows_kswitch(a, b, k, rng);
            }
            Crossover::ColumnsGeometric { p } => {
                let k = sample_geometric(p, rng).min(problem.rules.slot_count);
                crossover_columns_kswitch(a, b, problem, k, rng);
            }
            Crossover::SinglePoint => crossover_single_point(a, b, rng),
        }
        a.invalidate();
        b.invalidate();
    }
}

/// Mutation strategy, injected into the GA settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mutation {
    Swap { prob: f64, count: usize },
}

impl Mutation {
    pub fn apply<R: Rng>(&self, ind: &mut Individual, problem: &Problem, rng: &mut R) {
        match *self {
            Mutation::Swap { prob, count } => mutate_swap(ind, problem, prob, count, rng),
        }
        ind.invalidate();
    }
}
