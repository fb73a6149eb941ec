use std::sync::Arc;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::{Device, Error, Result, Server, State};

/// Neighbor moves attempted at each temperature level, unless an improvement resets the count.
pub const ATTEMPTS_PER_LEVEL: usize = 10;

/// Candidates tried by one neighbor move before giving up.
pub const MAX_CANDIDATE_TRIES: usize = 5;

/// Annealing stops once the temperature drops to this value.
pub const TEMPERATURE_FLOOR: f64 = 1e-3;

/// Geometric cooling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    temperature: f64,
    cooling_rate: f64,
}

impl Schedule {
    /// Constructs a schedule starting at `temperature` and multiplying it by `cooling_rate`
    /// after each level.
    ///
    /// # Errors
    ///
    /// Returns an error if the temperature is not positive or the cooling rate is outside of
    /// `(0, 1)`.
    pub fn new(temperature: f64, cooling_rate: f64) -> Result<Self> {
        if !(temperature > 0.0 && temperature.is_finite()) {
            return Err(Error::InvalidTemperature(temperature));
        }
        if !(cooling_rate > 0.0 && cooling_rate < 1.0) {
            return Err(Error::InvalidCoolingRate(cooling_rate));
        }
        Ok(Self {
            temperature,
            cooling_rate,
        })
    }

    /// Initial temperature.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Cooling rate.
    #[must_use]
    pub fn cooling_rate(&self) -> f64 {
        self.cooling_rate
    }

    /// Number of temperature levels before reaching the floor.
    #[must_use]
    pub fn levels(&self) -> usize {
        let mut temperature = self.temperature;
        let mut levels = 0;
        while temperature > TEMPERATURE_FLOOR {
            temperature *= self.cooling_rate;
            levels += 1;
        }
        levels
    }
}

/// The part of the total cost that allocation can change.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cost {
    /// Non-service costs of covered, unserved devices.
    pub non_service: f64,
    /// Activation costs of active servers.
    pub servers_used: f64,
}

impl Cost {
    /// Computes the cost of a state from scratch.
    #[must_use]
    pub fn of(state: &State) -> Self {
        Self {
            non_service: state
                .devices()
                .iter()
                .filter(|d| d.is_covered() && !d.is_served())
                .map(Device::non_service_cost)
                .sum(),
            servers_used: state
                .servers()
                .iter()
                .filter(|s| s.is_active())
                .map(Server::activation_cost)
                .sum(),
        }
    }

    /// Sum of both components.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.non_service + self.servers_used
    }
}

/// Progress after one neighbor attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Temperature of the current level.
    pub temperature: f64,
    /// Cost of the current solution.
    pub current: f64,
    /// Cost of the best solution so far.
    pub best: f64,
    /// Whether the neighbor became the current solution.
    pub accepted: bool,
}

/// Copies of the entities touched by a move, enough to take it back.
struct Undo {
    device: (usize, Device),
    servers: Vec<(usize, Server)>,
}

/// Moves a random covered device to one of its other candidates, and returns the cost after
/// the move together with a way to revert it.
///
/// Up to [`MAX_CANDIDATE_TRIES`] candidates other than the current one are tried in random
/// order; the first one with enough capacity is taken. Returns `None` if nothing moved.
fn neighbor<R: Rng + ?Sized>(state: &mut State, cost: Cost, rng: &mut R) -> Option<(Cost, Undo)> {
    let position = *state.covered().choose(rng)?;
    let device = state.device(position);
    let current = device.assignment().map(|c| c.server);
    let candidates = Arc::clone(&device.candidates);
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.shuffle(rng);
    let candidate = order
        .into_iter()
        .map(|c| candidates[c])
        .filter(|c| Some(c.server) != current)
        .take(MAX_CANDIDATE_TRIES)
        .find(|c| state.can_serve(position, c))?;

    let mut undo = Undo {
        device: (position, state.device(position).clone()),
        servers: vec![(candidate.server, state.server(candidate.server).clone())],
    };
    let mut next = cost;
    if let Some(old) = current {
        undo.servers.push((old, state.server(old).clone()));
        state.release(position);
        if !state.server(old).is_active() {
            next.servers_used -= state.server(old).activation_cost();
        }
    } else {
        next.non_service -= state.device(position).non_service_cost();
    }
    let new = state.server(candidate.server);
    if !new.is_active() {
        next.servers_used += new.activation_cost();
    }
    state.assign(position, candidate);
    log::trace!(
        "Moved device {} from {:?} to {}",
        state.device(position).id(),
        current,
        candidate.server
    );
    Some((next, undo))
}

/// Runs simulated annealing from the allocation in `state`, and replaces it with the best
/// allocation found.
///
/// Worse neighbors are accepted with probability `exp(-delta / T)`, with a standard uniform
/// draw. See [`anneal_with`] for the details.
pub fn anneal<R: Rng + ?Sized>(state: &mut State, schedule: Schedule, rng: &mut R) {
    anneal_with(state, schedule, rng, &Uniform::new(0.0, 1.0), |_| {});
}

/// Runs simulated annealing with a custom source of acceptance draws and a callback invoked
/// after each neighbor attempt.
///
/// At each temperature level, up to [`ATTEMPTS_PER_LEVEL`] neighbors are generated. A
/// neighbor with lower cost is always accepted and resets the attempt counter. Otherwise, it
/// is accepted if a value drawn from `acceptance` is less than `exp(-delta / T)`. After
/// the attempts run out, the temperature is multiplied by the cooling rate, until it falls
/// to [`TEMPERATURE_FLOOR`]. The best accepted solution ends up in `state`, with metrics
/// recomputed.
pub fn anneal_with<R, D, F>(
    state: &mut State,
    schedule: Schedule,
    rng: &mut R,
    acceptance: &D,
    mut observe: F,
) where
    R: Rng + ?Sized,
    D: Distribution<f64>,
    F: FnMut(&Step),
{
    let start = Instant::now();
    let mut current = Cost::of(state);
    let mut best_cost = current;
    let mut best = state.clone();
    let mut temperature = schedule.temperature;
    while temperature > TEMPERATURE_FLOOR {
        let mut attempt = 0;
        while attempt < ATTEMPTS_PER_LEVEL {
            attempt += 1;
            let accepted = match neighbor(state, current, rng) {
                Some((next, undo)) => {
                    let delta = next.total() - current.total();
                    if delta < 0.0 {
                        attempt = 0;
                        current = next;
                        if current.total() < best_cost.total() {
                            best_cost = current;
                            best = state.clone();
                        }
                        true
                    } else if acceptance.sample(rng) < (-delta / temperature).exp() {
                        current = next;
                        true
                    } else {
                        state.restore(undo.device, &undo.servers);
                        false
                    }
                }
                None => false,
            };
            observe(&Step {
                temperature,
                current: current.total(),
                best: best_cost.total(),
                accepted,
            });
        }
        log::debug!(
            "T = {:.6}: current cost {:.6}, best cost {:.6}",
            temperature,
            current.total(),
            best_cost.total()
        );
        temperature *= schedule.cooling_rate;
    }
    *state = best;
    let elapsed = start.elapsed();
    state.add_execution_time(elapsed);
    state.recalculate_metrics();
    log::info!(
        "Annealing finished in {}: best cost {:.6}, total cost {:.6}",
        humantime::format_duration(elapsed),
        best_cost.total(),
        state.metrics().outputs.total_cost
    );
}
