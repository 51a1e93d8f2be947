use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, span, Level};

use crate::domain::individual::Individual;
use crate::domain::types::{Cluster, Problem};
use crate::evaluation::fitness::Fitness;
use crate::solver::genetic::operators::{Crossover, Mutation};

/// How initial individuals are built.
#[derive(Debug, Clone)]
pub enum Constructor {
    Random,
    Heuristic,
    /// Rebuild from previously optimized individuals covering the cluster.
    /// Falls back to the heuristic fill when no seeds are supplied.
    FromParents(Vec<Individual>),
}

impl Constructor {
    pub fn build<R: Rng>(&self, cluster: &Cluster, problem: &Problem, rng: &mut R) -> Individual {
        match self {
            Constructor::Random => {
                let mut ind = Individual::new(cluster.clone(), problem);
                ind.fill_random(problem, rng);
                ind
            }
            Constructor::Heuristic => {
                let mut ind = Individual::new(cluster.clone(), problem);
                ind.fill_heuristic(problem, rng);
                ind
            }
            Constructor::FromParents(seeds) if seeds.is_empty() => {
                let mut ind = Individual::new(cluster.clone(), problem);
                ind.fill_heuristic(problem, rng);
                ind
            }
            Constructor::FromParents(seeds) => {
                Individual::merge_from_parents(cluster.clone(), problem, seeds)
            }
        }
    }
}

/// Full configuration of one evolution run. Every knob is independently
/// substitutable.
#[derive(Debug, Clone)]
pub struct GaSettings {
    pub population_size: usize,
    pub generations: usize,
    pub tournament_size: usize,
    pub elitism: usize,
    pub crossover_probability: f64,
    pub mutation_probability: f64,
    pub constructor: Constructor,
    pub fitness: Fitness,
    pub crossover: Crossover,
    pub mutation: Mutation,
}

fn fitness_of(ind: &Individual) -> f64 {
    ind.fitness.expect("individual entered selection unevaluated")
}

/// Evaluate every individual whose fitness is unset or invalidated.
/// Individuals are independent, so this is the one place worth parallelizing.
fn evaluate_population(population: &mut [Individual], problem: &Problem, fitness: Fitness) {
    population.par_iter_mut().for_each(|ind| {
        if ind.fitness.is_none() {
            ind.fitness = Some(fitness.evaluate(ind, problem));
        }
    });
}

/// Tournament selection: sample `tournament_size` individuals uniformly with
/// replacement, keep the best by fitness.
fn select_tournament<'a, R: Rng>(
    population: &'a [Individual],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Individual {
    let mut best = &population[rng.gen_range(0..population.len())];
    for _ in 1..tournament_size {
        let contender = &population[rng.gen_range(0..population.len())];
        if fitness_of(contender) > fitness_of(best) {
            best = contender;
        }
    }
    best
}

/// Fixed-budget generational search over one cluster. Returns the final
/// population and the best individual encountered (maximization).
pub fn optimize_cluster<R: Rng>(
    cluster: &Cluster,
    problem: &Problem,
    settings: &GaSettings,
    rng: &mut R,
) -> (Vec<Individual>, Individual) {
    let run_span = span!(Level::DEBUG, "optimize_cluster", stores = cluster.len());
    let _guard = run_span.enter();

    let mut population: Vec<Individual> = (0..settings.population_size)
        .map(|_| settings.constructor.build(cluster, problem, rng))
        .collect();
    evaluate_population(&mut population, problem, settings.fitness);

    let mut best = population
        .iter()
        .max_by(|a, b| fitness_of(a).total_cmp(&fitness_of(b)))
        .expect("population must not be empty")
        .clone();

    for generation in 0..settings.generations {
        let offspring_count = settings.population_size - settings.elitism;
        let mut offspring: Vec<Individual> = (0..offspring_count)
            .map(|_| select_tournament(&population, settings.tournament_size, rng).clone())
            .collect();

        for pair in offspring.chunks_exact_mut(2) {
            if rng.gen::<f64>() < settings.crossover_probability {
                let (left, right) = pair.split_at_mut(1);
                settings
                    .crossover
                    .apply(&mut left[0], &mut right[0], problem, rng);
            }
        }

        for ind in offspring.iter_mut() {
            if rng.gen::<f64>() < settings.mutation_probability {
                settings.mutation.apply(ind, problem, rng);
            }
        }

        evaluate_population(&mut offspring, problem, settings.fitness);

        // Elites survive from the previous population unchanged.
        population.sort_by(|a, b| fitness_of(b).total_cmp(&fitness_of(a)));
        population.truncate(settings.elitism);
        population.extend(offspring);

        for ind in &population {
            if fitness_of(ind) > fitness_of(&best) {
                best = ind.clone();
            }
        }
        debug!(generation, best_fitness = fitness_of(&best), "generation done");
    }

    (population, best)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::fixtures::data_generator::generate_problem;

    fn settings(constructor: Constructor, generations: usize) -> GaSettings {
        GaSettings {
            population_size: 20,
            generations,
            tournament_size: 3,
            elitism: 1,
            crossover_probability: 0.7,
            mutation_probability: 0.8,
            constructor,
            fitness: Fitness::Grid,
            crossover: Crossover::ColumnsGeometric { p: 0.2 },
            mutation: Mutation::Swap { prob: 0.6, count: 2 },
        }
    }

    #[test]
    fn final_population_satisfies_invariant() {
        let problem = generate_problem(8, 51);
        let cluster = problem.store_ids();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (population, best) =
            optimize_cluster(&cluster, &problem, &settings(Constructor::Heuristic, 5), &mut rng);

        best.assert_cap(&problem);
        for ind in &population {
            ind.assert_cap(&problem);
            assert!(ind.fitness.is_some());
        }
    }

    #[test]
    fn elitism_keeps_best_fitness_monotone() {
        let problem = generate_problem(10, 53);
        let cluster = problem.store_ids();
        let mut rng = ChaCha8Rng::seed_from_u64(2);

        // Run generation by generation, reseeding from the last population,
        // and watch the best observed fitness never decrease.
        let base = settings(Constructor::Random, 1);
        let (mut population, mut best) = optimize_cluster(&cluster, &problem, &base, &mut rng);
        let mut last_best = best.fitness.unwrap();
        for _ in 0..5 {
            let seeded = GaSettings {
                constructor: Constructor::FromParents(vec![best.clone()]),
                generations: 1,
                ..base.clone()
            };
            let (next_population, next_best) =
                optimize_cluster(&cluster, &problem, &seeded, &mut rng);
            let now = next_best.fitness.unwrap();
            assert!(now >= last_best - 1e-12, "{now} < {last_best}");
            last_best = now;
            population = next_population;
            best = next_best;
        }
        assert!(!population.is_empty());
    }

    #[test]
    fn from_parents_seeds_reproduce_the_parent() {
        let problem = generate_problem(6, 59);
        let cluster = problem.store_ids();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut parent = Individual::new(cluster.clone(), &problem);
        parent.fill_heuristic(&problem, &mut rng);

        let constructor = Constructor::FromParents(vec![parent.clone()]);
        let built = constructor.build(&cluster, &problem, &mut rng);
        assert_eq!(built.to_record(), parent.to_record());
    }
}
