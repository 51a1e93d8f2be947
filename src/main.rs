use std::error::Error;
use std::fs::{self, File};

use chrono::Local;
use colored::Colorize;
use csv::Writer;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sunday_ga::config::constant::{SEED, STORE_COUNT};
use sunday_ga::evaluation::fitness::Fitness;
use sunday_ga::fixtures::data_generator::generate_problem;
use sunday_ga::solver::dispatcher::{run_dispatch, DispatchSettings, RoundStat};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                .pretty(),
        )
        .init();
}

fn save_stats_csv(stats: &[RoundStat], filename: &str) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_path(filename)?;
    wtr.write_record(["round", "cluster", "stores", "best_fitness"])?;
    for stat in stats {
        wtr.write_record([
            stat.key.round.to_string(),
            stat.key.index.to_string(),
            stat.store_count.to_string(),
            stat.best_fitness.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let seed = SEED as u64;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let problem = generate_problem(STORE_COUNT, seed);
    let settings = DispatchSettings::default();

    info!(
        "Starting Sunday slot optimizer with {} stores, {} slots, cap {}",
        problem.stores.len(),
        problem.rules.slot_count,
        problem.rules.cap
    );

    let outcome = run_dispatch(&problem, &settings, &mut rng);

    // Cross-check the two evaluators on the final answer.
    let grid = Fitness::Grid.evaluate(&outcome.best, &problem);
    let direct = Fitness::Direct.evaluate(&outcome.best, &problem);
    info!("Evaluator agreement: grid {grid:.6}, direct {direct:.6}");

    let outdir = format!("results/{}", Local::now().format("%Y-%m-%d_%H-%M-%S"));
    fs::create_dir_all(&outdir)?;
    serde_json::to_writer_pretty(
        File::create(format!("{outdir}/solution.json"))?,
        &outcome.record,
    )?;
    save_stats_csv(&outcome.stats, &format!("{outdir}/cluster_fitness.csv"))?;

    println!(
        "{} , results written to {outdir}",
        format!("Final fitness: {grid:.4}").green()
    );

    Ok(())
}
