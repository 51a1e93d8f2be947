use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use sunday_ga::evaluation::fitness::Fitness;
use sunday_ga::fixtures::data_generator::generate_problem_with;
use sunday_ga::solver::dispatcher::{run_dispatch, DispatchSettings, GaTuning};
use sunday_ga::solver::genetic::operators::{Crossover, Mutation};

fn small_settings() -> DispatchSettings {
    DispatchSettings {
        join_count: 3,
        generation_plan: vec![6, 3, 2],
        max_in_cluster: 5,
        max_distance: 10.0,
        ga: GaTuning {
            population_size: 12,
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

#[test]
fn end_to_end_solution_respects_all_constraints() {
    let problem = generate_problem_with(18, 26, 7, 101);
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let outcome = run_dispatch(&problem, &small_settings(), &mut rng);

    assert_eq!(outcome.record.0.len(), 18);
    for (id, slots) in &outcome.record.0 {
        assert_eq!(slots.len(), problem.rules.cap, "store {id} misses the cap");
        assert!(slots.windows(2).all(|w| w[0] < w[1]), "store {id} unsorted");

        let cons = problem.constraints_of(id);
        for m in &cons.mandatory {
            assert!(slots.contains(m), "store {id} lost mandatory slot {m}");
        }
        for f in &cons.forbidden {
            assert!(!slots.contains(f), "store {id} got forbidden slot {f}");
        }
    }
}

#[test]
fn solution_record_serializes_as_flat_mapping() {
    let problem = generate_problem_with(4, 8, 3, 103);
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let outcome = run_dispatch(&problem, &small_settings(), &mut rng);

    let json = serde_json::to_string(&outcome.record).expect("record must serialize");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    let map = parsed.as_object().expect("flat object");
    assert_eq!(map.len(), 4);
    for slots in map.values() {
        assert_eq!(slots.as_array().expect("slot array").len(), 3);
    }
}

#[test]
fn both_evaluators_agree_on_the_final_answer() {
    let problem = generate_problem_with(10, 12, 4, 107);
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let outcome = run_dispatch(&problem, &small_settings(), &mut rng);

    let grid = Fitness::Grid.evaluate(&outcome.best, &problem);
    let direct = Fitness::Direct.evaluate(&outcome.best, &problem);
    let scale = grid.abs().max(direct.abs()).max(1.0);
    assert!((grid - direct).abs() / scale < 1e-6, "{grid} vs {direct}");
}
