use rand::Rng;
use tracing::{debug, info, span, Level};

use crate::config::constant::{JOIN_CLUSTER_AMOUNT, MAX_IN_CLUSTER, MAX_RADIUS_OF_INFLUENCE};
use crate::domain::individual::Individual;
use crate::domain::types::{Cluster, Problem, SolutionRecord};
use crate::evaluation::fitness::Fitness;
use crate::setup::make_clusters;
use crate::solver::genetic::engine::{optimize_cluster, Constructor, GaSettings};
use crate::solver::genetic::operators::{Crossover, Mutation};

/// Identity of a cluster inside the dispatcher. Clusters are never mutated in
/// place across rounds; a merge or a carry-over produces an entry under a
/// fresh key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterKey {
    pub round: usize,
    pub index: usize,
}

#[derive(Debug, Clone)]
struct ClusterEntry {
    key: ClusterKey,
    stores: Cluster,
    seeds: Vec<Individual>,
}

/// GA knobs shared by every per-cluster run; the constructor and generation
/// budget are filled in per round.
#[derive(Debug, Clone)]
pub struct GaTuning {
    pub population_size: usize,
    pub tournament_size: usize,
    pub elitism: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    pub fitness: Fitness,
    pub crossover: Crossover,
    pub mutation: Mutation,
}

impl GaTuning {
    fn to_settings(&self, constructor: Constructor, generations: usize) -> GaSettings {
        GaSettings {
            population_size: self.population_size,
            generations,
            tournament_size: self.tournament_size,
            elitism: self.elitism,
            crossover_probability: self.crossover_probability,
            mutation_probability: self.mutation_probability,
            constructor,
            fitness: self.fitness,
            crossover: self.crossover,
            mutation: self.mutation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// How many nearby clusters are merged into one per merge step.
    pub join_count: usize,
    /// Generation budget per round; the last entry repeats for later rounds.
    pub generation_plan: Vec<usize>,
    pub max_in_cluster: usize,
    /// Distance threshold (km) for both clustering and merge finalization.
    pub max_distance: f64,
    pub ga: GaTuning,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            join_count: JOIN_CLUSTER_AMOUNT,
            generation_plan: vec![500, 30, 10, 2],
            max_in_cluster: MAX_IN_CLUSTER,
            max_distance: MAX_RADIUS_OF_INFLUENCE,
            ga: GaTuning {
                population_size: 50,
                tournament_size: 3,
                elitism: 1,
                crossover_probability: 0.7,
                mutation_probability: 0.8,
                fitness: Fitness::Grid,
                crossover: Crossover::ColumnsGeometric { p: 0.2 },
                mutation: Mutation::Swap { prob: 0.6, count: 2 },
            },
        }
    }
}

/// Per-cluster result kept for reporting.
#[derive(Debug, Clone)]
pub struct RoundStat {
    pub key: ClusterKey,
    pub store_count: usize,
    pub best_fitness: f64,
}

#[derive(Debug)]
pub struct DispatchOutcome {
    /// The merged full-universe individual.
    pub best: Individual,
    pub record: SolutionRecord,
    pub stats: Vec<RoundStat>,
}

/// Hierarchical divide-and-conquer driver: partition the store universe into
/// geographically local clusters, optimize each, then merge clusters by
/// proximity round after round until one cluster (plus any finalized
/// side-clusters) remains.
pub fn run_dispatch<R: Rng>(
    problem: &Problem,
    settings: &DispatchSettings,
    rng: &mut R,
) -> DispatchOutcome {
    let initial = make_clusters(problem, settings.max_in_cluster, settings.max_distance, rng);
    info!("Dispatcher starting with {} clusters", initial.len());

    let mut entries: Vec<ClusterEntry> = initial
        .into_iter()
        .enumerate()
        .map(|(index, stores)| ClusterEntry {
            key: ClusterKey { round: 0, index },
            stores,
            seeds: Vec::new(),
        })
        .collect();

    let mut finalized: Vec<Individual> = Vec::new();
    let mut stats: Vec<RoundStat> = Vec::new();
    let mut round = 0;

    loop {
        let generations = settings
            .generation_plan
            .get(round)
            .or(settings.generation_plan.last())
            .copied()
            .unwrap_or(1);

        let round_span = span!(Level::INFO, "round", round, clusters = entries.len());
        let _guard = round_span.enter();

        let mut optimized: Vec<(ClusterEntry, Individual)> = Vec::new();
        for entry in std::mem::take(&mut entries) {
            let constructor = Constructor::FromParents(entry.seeds.clone());
            let best = if entry.stores.len() == 1 {
                // Trivial cluster: the fill is the unambiguous optimum.
                let mut ind = constructor.build(&entry.stores, problem, rng);
                ind.fitness = Some(settings.ga.fitness.evaluate(&ind, problem));
                ind
            } else {
                let ga = settings.ga.to_settings(constructor, generations);
                optimize_cluster(&entry.stores, problem, &ga, rng).1
            };

            let best_fitness = best.fitness.expect("optimized cluster without fitness");
            debug!(
                round = entry.key.round,
                cluster = entry.key.index,
                stores = entry.stores.len(),
                best_fitness,
                "cluster optimized"
            );
            stats.push(RoundStat {
                key: entry.key,
                store_count: entry.stores.len(),
                best_fitness,
            });
            optimized.push((entry, best));
        }

        if optimized.len() == 1 {
            let (_, best) = optimized.pop().expect("one optimized cluster");
            finalized.push(best);
            break;
        }

        entries = merge_round(problem, settings, optimized, round + 1, &mut finalized, rng);
        round += 1;
    }

    let universe = problem.store_ids();
    let best = Individual::merge_from_parents(universe, problem, &finalized);
    let record = best.to_record();
    info!(
        "Dispatcher finished after {} rounds with {} finalized clusters",
        round + 1,
        finalized.len()
    );

    DispatchOutcome { best, record, stats }
}

/// One merge step: repeatedly pick a random remaining cluster, rank the rest
/// by minimum pairwise store distance and either merge the closest group or
/// finalize the picked cluster when even the second-closest is out of reach.
fn merge_round<R: Rng>(
    problem: &Problem,
    settings: &DispatchSettings,
    mut remaining: Vec<(ClusterEntry, Individual)>,
    next_round: usize,
    finalized: &mut Vec<Individual>,
    rng: &mut R,
) -> Vec<ClusterEntry> {
    let mut next_entries: Vec<ClusterEntry> = Vec::new();
    let mut next_index = 0;

    while !remaining.is_empty() {
        if remaining.len() == 1 {
            // Nothing left to pair with; carry the cluster into the next round.
            let (entry, best) = remaining.pop().expect("one remaining cluster");
            next_entries.push(ClusterEntry {
                key: ClusterKey { round: next_round, index: next_index },
                stores: entry.stores,
                seeds: vec![best],
            });
            next_index += 1;
            break;
        }

        let picked = rng.gen_range(0..remaining.len());
        let mut ranked: Vec<(usize, f64)> = remaining
            .iter()
            .enumerate()
            .map(|(j, (entry, _))| {
                (
                    j,
                    problem.min_cluster_distance(&remaining[picked].0.stores, &entry.stores),
                )
            })
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        // ranked[0] is the picked cluster itself at distance zero.
        let take = settings.join_count.clamp(2, ranked.len());
        ranked.truncate(take);

        if ranked[1].1 > settings.max_distance {
            let (entry, best) = remaining.remove(ranked[0].0);
            debug!(
                round = entry.key.round,
                cluster = entry.key.index,
                "cluster finalized, neighbours out of reach"
            );
            finalized.push(best);
            continue;
        }

        let mut indices: Vec<usize> = ranked.iter().map(|&(j, _)| j).collect();
        indices.sort_unstable_by(|a, b| b.cmp(a));
        let mut stores: Cluster = Vec::new();
        let mut seeds: Vec<Individual> = Vec::new();
        for j in indices {
            let (entry, best) = remaining.remove(j);
            stores.extend(entry.stores);
            seeds.push(best);
        }
        debug!(
            merged = take,
            stores = stores.len(),
            "clusters merged for the next round"
        );
        next_entries.push(ClusterEntry {
            key: ClusterKey { round: next_round, index: next_index },
            stores,
            seeds,
        });
        next_index += 1;
    }

    next_entries
}
