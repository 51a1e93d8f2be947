use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::types::{Cluster, Problem, SolutionRecord};

/// One candidate slot assignment for every store of a cluster.
///
/// Row `i` belongs to `cluster[i]`. `assigned` holds the optional slots chosen
/// for the store, `available` the slots that are neither mandatory, forbidden
/// nor currently assigned. `weights[i][s]` carries the store weight whenever
/// slot `s` is active (mandatory or assigned) for store `i`, else 0.
#[derive(Debug, Clone)]
pub struct Individual {
    pub cluster: Cluster,
    pub mandatory: Vec<Vec<usize>>,
    pub assigned: Vec<Vec<usize>>,
    pub available: Vec<Vec<usize>>,
    pub weights: Vec<Vec<f64>>,
    /// None marks an uncomputed or invalidated fitness.
    pub fitness: Option<f64>,
}

impl Individual {
    /// Zero-initialized rows; constructors fill them in.
    pub fn new(cluster: Cluster, problem: &Problem) -> Self {
        let n = cluster.len();
        let slots = problem.rules.slot_count;
        Individual {
            cluster,
            mandatory: vec![Vec::new(); n],
            assigned: vec![Vec::new(); n],
            available: vec![Vec::new(); n],
            weights: vec![vec![0.0; slots]; n],
            fitness: None,
        }
    }

    /// Number of active slots for row `i`.
    pub fn active_count(&self, i: usize) -> usize {
        self.mandatory[i].len() + self.assigned[i].len()
    }

    pub fn invalidate(&mut self) {
        self.fitness = None;
    }

    /// Copy mandatory slots from the constraint table and derive the
    /// available set for every row.
    fn init_rows(&mut self, problem: &Problem) {
        for i in 0..self.cluster.len() {
            let id = &self.cluster[i];
            let cons = problem.constraints_of(id);
            let weight = problem.store(id).weight;

            self.mandatory[i] = cons.mandatory.clone();
            self.available[i] = (0..problem.rules.slot_count)
                .filter(|s| !cons.mandatory.contains(s) && !cons.forbidden.contains(s))
                .collect();

            for &s in &self.mandatory[i] {
                self.weights[i][s] = weight;
            }
        }
    }

    /// Move one random available slot of row `i` into its assigned set.
    fn assign_random_available<R: Rng>(&mut self, problem: &Problem, i: usize, rng: &mut R) {
        assert!(
            !self.available[i].is_empty(),
            "store {} has no available slot left below cap {}",
            self.cluster[i],
            problem.rules.cap
        );
        let idx = rng.gen_range(0..self.available[i].len());
        let slot = self.available[i].remove(idx);
        self.assigned[i].push(slot);
        self.weights[i][slot] = problem.store(&self.cluster[i]).weight;
    }

    /// Random constructor: mandatory slots first, then uniform random optional
    /// slots from the available set until the cap is reached.
    pub fn fill_random<R: Rng>(&mut self, problem: &Problem, rng: &mut R) {
        self.init_rows(problem);
        for i in 0..self.cluster.len() {
            while self.active_count(i) < problem.rules.cap {
                self.assign_random_available(problem, i, rng);
            }
        }
        self.fitness = None;
    }

    /// Coverage-aware constructor: every slot with zero mandatory coverage
    /// across the cluster gets one optional assignee (first eligible store in
    /// a per-slot random order) before the remaining slots are filled
    /// randomly up to the cap.
    pub fn fill_heuristic<R: Rng>(&mut self, problem: &Problem, rng: &mut R) {
        self.init_rows(problem);

        let mut covered = vec![false; problem.rules.slot_count];
        for row in &self.mandatory {
            for &s in row {
                covered[s] = true;
            }
        }

        let mut order: Vec<usize> = (0..self.cluster.len()).collect();
        for slot in 0..problem.rules.slot_count {
            if covered[slot] {
                continue;
            }
            order.shuffle(rng);
            for &i in &order {
                if self.active_count(i) >= problem.rules.cap {
                    continue;
                }
                if let Some(pos) = self.available[i].iter().position(|&s| s == slot) {
                    self.available[i].remove(pos);
                    self.assigned[i].push(slot);
                    self.weights[i][slot] = problem.store(&self.cluster[i]).weight;
                    break;
                }
            }
        }

        for i in 0..self.cluster.len() {
            while self.active_count(i) < problem.rules.cap {
                self.assign_random_available(problem, i, rng);
            }
        }
        self.fitness = None;
    }

    /// Rebuild an individual for `cluster` by copying per-store rows verbatim
    /// from whichever parent owns that store.
    ///
    /// Panics when a store is absent from every parent (the dispatcher's
    /// partition contract is broken) or when a copied row misses the cap.
    pub fn merge_from_parents(cluster: Cluster, problem: &Problem, parents: &[Individual]) -> Self {
        let mut ind = Individual::new(cluster, problem);

        for i in 0..ind.cluster.len() {
            let id = ind.cluster[i].clone();
            let (parent, j) = parents
                .iter()
                .find_map(|p| p.cluster.iter().position(|other| *other == id).map(|j| (p, j)))
                .unwrap_or_else(|| panic!("store {id} missing from every merge parent"));

            ind.mandatory[i] = parent.mandatory[j].clone();
            ind.assigned[i] = parent.assigned[j].clone();
            ind.available[i] = parent.available[j].clone();
            ind.weights[i] = parent.weights[j].clone();
        }

        ind.assert_cap(problem);
        ind
    }

    /// Every store's mandatory + assigned count must equal the cap, exactly.
    /// A violation is a defect in merge/crossover logic, not a user error.
    pub fn assert_cap(&self, problem: &Problem) {
        for i in 0..self.cluster.len() {
            assert_eq!(
                self.active_count(i),
                problem.rules.cap,
                "slot count invariant broken for store {}",
                self.cluster[i]
            );
        }
    }

    /// Per store, the sorted union of mandatory and assigned slots.
    pub fn to_slot_list(&self) -> Vec<Vec<usize>> {
        (0..self.cluster.len())
            .map(|i| {
                let mut slots: Vec<usize> =
                    self.mandatory[i].iter().chain(&self.assigned[i]).copied().collect();
                slots.sort_unstable();
                slots
            })
            .collect()
    }

    /// The externally consumed form: store id -> sorted active slots.
    pub fn to_record(&self) -> SolutionRecord {
        SolutionRecord(
            self.cluster
                .iter()
                .cloned()
                .zip(self.to_slot_list())
                .collect(),
        )
    }
}
