use std::convert::TryFrom;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{anneal, random, Error, Greedy, Result, Schedule, SortOrder, State, Variant};

/// Allocation algorithm, named as in the result files.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::EnumString,
    strum::Display,
    Serialize,
    Deserialize,
)]
pub enum Algorithm {
    /// See [`random`].
    Random,
    /// [`Greedy`] with devices and candidates in ascending order.
    #[strum(serialize = "Greedy_AscAsc")]
    #[serde(rename = "Greedy_AscAsc")]
    GreedyAscAsc,
    /// [`Greedy`] with devices in ascending and candidates in descending order.
    #[strum(serialize = "Greedy_AscDesc")]
    #[serde(rename = "Greedy_AscDesc")]
    GreedyAscDesc,
    /// [`Greedy`] with devices in descending and candidates in ascending order.
    #[strum(serialize = "Greedy_DescAsc")]
    #[serde(rename = "Greedy_DescAsc")]
    GreedyDescAsc,
    /// [`Greedy`] with devices and candidates in descending order.
    #[strum(serialize = "Greedy_DescDesc")]
    #[serde(rename = "Greedy_DescDesc")]
    GreedyDescDesc,
    /// Simulated annealing, see [`anneal`].
    #[strum(serialize = "SA")]
    #[serde(rename = "SA")]
    SimulatedAnnealing,
}

impl Algorithm {
    /// Parses an algorithm name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAlgorithm`] if the name is not recognized.
    pub fn parse(name: &str) -> Result<Self> {
        name.parse()
            .map_err(|_| Error::UnknownAlgorithm(name.to_string()))
    }

    /// The greedy heuristic this algorithm stands for, if any.
    #[must_use]
    pub fn greedy(self) -> Option<Greedy> {
        use SortOrder::{Ascending, Descending};
        match self {
            Self::GreedyAscAsc => Some(Greedy::new(Ascending, Ascending)),
            Self::GreedyAscDesc => Some(Greedy::new(Ascending, Descending)),
            Self::GreedyDescAsc => Some(Greedy::new(Descending, Ascending)),
            Self::GreedyDescDesc => Some(Greedy::new(Descending, Descending)),
            Self::Random | Self::SimulatedAnnealing => None,
        }
    }

    /// Whether the algorithm is a constructive heuristic, usable as an annealing seed.
    #[must_use]
    pub fn is_heuristic(self) -> bool {
        self != Self::SimulatedAnnealing
    }
}

impl TryFrom<&str> for Algorithm {
    type Error = Error;
    fn try_from(name: &str) -> Result<Self> {
        Self::parse(name)
    }
}

/// Runs a random or greedy heuristic on `state` and names its metrics after it.
///
/// # Errors
///
/// Returns [`Error::UnknownAlgorithm`] for simulated annealing, which needs
/// [`run_annealing`].
pub fn run_heuristic<R: Rng + ?Sized>(
    state: &mut State,
    algorithm: Algorithm,
    rng: &mut R,
) -> Result<()> {
    match (algorithm, algorithm.greedy()) {
        (Algorithm::Random, _) => random(state, rng),
        (_, Some(greedy)) => greedy.run(state),
        _ => return Err(Error::UnknownAlgorithm(algorithm.to_string())),
    }
    let metrics = state.metrics_mut();
    metrics.algorithm = algorithm.to_string();
    metrics.variant = Variant::Heuristic;
    Ok(())
}

/// Parameters of repeated simulated annealing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnealingRun {
    /// Cooling schedule.
    pub schedule: Schedule,
    /// Heuristic producing the initial solution.
    pub heuristic: Algorithm,
    /// Number of independent trials.
    pub trials: usize,
    /// Seed from which every trial derives its own generator.
    pub seed: u64,
}

impl AnnealingRun {
    /// Generator of the given trial: seeded with the run seed, on a stream of its own.
    #[must_use]
    pub fn trial_rng(&self, trial: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(trial as u64);
        rng
    }

    fn variant(&self) -> Variant {
        Variant::MetaHeuristic {
            heuristic: self.heuristic.to_string(),
            temperature: self.schedule.temperature(),
            cooling_rate: self.schedule.cooling_rate(),
        }
    }
}

/// Runs independent annealing trials in parallel, each on its own copy of `base`.
///
/// With the random seed heuristic, every trial starts from its own random solution. Any other
/// seed heuristic runs once, and all trials start from its solution. `on_trial` is called as
/// soon as a trial finishes; the returned states are in trial order.
///
/// # Errors
///
/// Returns an error if there are no trials or the seed heuristic is simulated annealing.
pub fn run_annealing<F>(base: &State, run: &AnnealingRun, on_trial: F) -> Result<Vec<State>>
where
    F: Fn(usize, &State) + Send + Sync,
{
    if run.trials == 0 {
        return Err(Error::ZeroTrials);
    }
    if !run.heuristic.is_heuristic() {
        return Err(Error::UnknownAlgorithm(run.heuristic.to_string()));
    }
    let mut base = base.clone();
    let metrics = base.metrics_mut();
    metrics.algorithm = Algorithm::SimulatedAnnealing.to_string();
    metrics.variant = run.variant();
    if let Some(greedy) = run.heuristic.greedy() {
        greedy.run(&mut base);
    }
    log::info!(
        "Running {} annealing trials from {} solutions",
        run.trials,
        run.heuristic
    );
    Ok((0..run.trials)
        .into_par_iter()
        .map(|trial| {
            let mut rng = run.trial_rng(trial);
            let mut state = base.clone();
            if run.heuristic == Algorithm::Random {
                random(&mut state, &mut rng);
            }
            anneal(&mut state, run.schedule, &mut rng);
            log::debug!(
                "Trial {} finished with total cost {:.6}",
                trial,
                state.metrics().outputs.total_cost
            );
            on_trial(trial, &state);
            state
        })
        .collect())
}
