use std::cmp::Reverse;
use std::fmt;
use std::time::Instant;

use ordered_float::OrderedFloat;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::State;

/// Assigns covered devices to random candidates.
///
/// Covered devices are visited in random order. For a device with `k` candidates, one of
/// `k + 1` outcomes is drawn uniformly: one of the candidates, or leaving the device
/// unserved. A drawn candidate whose server cannot serve the device is not retried.
pub fn random<R: Rng + ?Sized>(state: &mut State, rng: &mut R) {
    let start = Instant::now();
    let mut order = state.covered().to_vec();
    order.shuffle(rng);
    for position in order {
        let candidates = state.device(position).candidates();
        if candidates.is_empty() {
            continue;
        }
        let choice = rng.gen_range(0..=candidates.len());
        if let Some(&candidate) = candidates.get(choice) {
            if state.can_serve(position, &candidate) {
                state.assign(position, candidate);
            }
        }
    }
    finish(state, start, "Random");
}

fn finish(state: &mut State, start: Instant, name: &str) {
    let elapsed = start.elapsed();
    state.add_execution_time(elapsed);
    state.recalculate_metrics();
    log::info!(
        "{} finished in {}: {} devices served, total cost {:.6}",
        name,
        humantime::format_duration(elapsed),
        state.metrics().outputs.devices_served,
        state.metrics().outputs.total_cost
    );
}

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "Asc"),
            Self::Descending => write!(f, "Desc"),
        }
    }
}

/// Sorts positions by the given key. Equal keys keep their relative order.
fn sort_by<F: Fn(usize) -> f64>(positions: &mut [usize], order: SortOrder, key: F) {
    match order {
        SortOrder::Ascending => positions.sort_by_key(|&p| OrderedFloat(key(p))),
        SortOrder::Descending => positions.sort_by_key(|&p| Reverse(OrderedFloat(key(p)))),
    }
}

/// First-fit greedy assignment.
///
/// Covered devices are visited sorted by non-service cost; the candidates of each device
/// are tried sorted by response time, and the device is assigned to the first one with
/// enough capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Greedy {
    devices: SortOrder,
    candidates: SortOrder,
}

impl Greedy {
    /// Constructs a greedy heuristic with the order of devices and candidates.
    #[must_use]
    pub fn new(devices: SortOrder, candidates: SortOrder) -> Self {
        Self {
            devices,
            candidates,
        }
    }

    /// Algorithm name, e.g., `Greedy_DescAsc`.
    #[must_use]
    pub fn name(&self) -> String {
        format!("Greedy_{}{}", self.devices, self.candidates)
    }

    /// Runs the heuristic on a state with no assignments.
    pub fn run(&self, state: &mut State) {
        let start = Instant::now();
        let mut order = state.covered().to_vec();
        sort_by(&mut order, self.devices, |p| {
            state.device(p).non_service_cost()
        });
        for position in order {
            let candidates = state.device(position).candidates().to_vec();
            let mut ranking: Vec<usize> = (0..candidates.len()).collect();
            sort_by(&mut ranking, self.candidates, |c| candidates[c].response_time);
            if let Some(&choice) = ranking
                .iter()
                .find(|&&c| state.can_serve(position, &candidates[c]))
            {
                state.assign(position, candidates[choice]);
            }
        }
        finish(state, start, &self.name());
    }
}
