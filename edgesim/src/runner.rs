use std::convert::TryFrom;
use std::path::Path;
use std::time::Duration;

use allocation::{
    run_annealing, run_heuristic, Algorithm, AnnealingRun, Metrics, Schedule, State, Technology,
};
use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::{Itertools, MinMaxResult};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{append_result, load_devices, load_servers, RunConfig};

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    ProgressBar::new(len as u64).with_style(
        ProgressStyle::default_bar().template("{msg} {wide_bar} {pos}/{len} [{elapsed_precise}]"),
    )
}

fn summarize(states: &[State]) {
    let costs = states.iter().map(|state| state.metrics().outputs.total_cost);
    let (best, worst) = match costs.minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => return,
        MinMaxResult::OneElement(cost) => (cost, cost),
        MinMaxResult::MinMax(best, worst) => (best, worst),
    };
    let elapsed: Duration = states
        .iter()
        .map(|state| state.metrics().outputs.execution_time)
        .sum();
    log::info!(
        "{} trials in {} of total execution time; total cost between {:.6} and {:.6}",
        states.len(),
        humantime::format_duration(elapsed),
        best,
        worst
    );
}

fn report(results_dir: &Path, metrics: &Metrics) -> eyre::Result<()> {
    let path = append_result(results_dir, metrics)?;
    log::info!("{}", serde_json::to_string(metrics)?);
    log::debug!("Result appended to {}", path.display());
    Ok(())
}

/// Executes one run: loads the tables, prepares the state, runs the algorithm, and appends
/// the results. Returns the metrics of every result row written.
///
/// # Errors
///
/// Fails on unreadable input, invalid configuration, or when results cannot be written.
pub fn run(config: &RunConfig, results_dir: &Path, progress: bool) -> eyre::Result<Vec<Metrics>> {
    let technology = Technology::try_from(config.tech)?;
    let algorithm = Algorithm::parse(&config.algorithm)?;
    let delimiter = config.delimiter_byte()?;
    let seed = config.seed.unwrap_or_else(rand::random);
    log::info!("Running {} with seed {}", algorithm, seed);

    let devices = load_devices(&config.devices, delimiter, config.num_devices)?;
    let edge_servers = load_servers(&config.edge_servers, delimiter)?;
    let cloud_servers = load_servers(&config.cloud_servers, delimiter)?;
    let mut state = State::prepare(
        algorithm.to_string(),
        devices,
        edge_servers,
        cloud_servers,
        technology,
    )
    .wrap_err("unable to prepare the simulation")?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    if config.bottleneck {
        let rng = if config.random_bottleneck {
            Some(&mut rng)
        } else {
            None
        };
        state.create_bottleneck(rng);
    }

    if algorithm == Algorithm::SimulatedAnnealing {
        let annealing = AnnealingRun {
            schedule: Schedule::new(config.temperature, config.cooling_rate)?,
            heuristic: Algorithm::parse(&config.heuristic)?,
            trials: config.trials,
            seed,
        };
        let pb = progress_bar(config.trials, progress);
        pb.set_message(&format!("SA/{}", annealing.heuristic));
        let states = run_annealing(&state, &annealing, |_, _| pb.inc(1))?;
        pb.finish_and_clear();
        summarize(&states);
        states
            .iter()
            .map(|state| {
                report(results_dir, state.metrics())?;
                Ok(state.metrics().clone())
            })
            .collect()
    } else {
        run_heuristic(&mut state, algorithm, &mut rng)?;
        report(results_dir, state.metrics())?;
        Ok(vec![state.metrics().clone()])
    }
}
