use std::time::Instant;

use crate::{DeviceId, State, Variant};

/// Error returned by an exact solver backend.
pub type SolverError = Box<dyn std::error::Error + Send + Sync>;

/// Allocation computed by an exact solver.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    /// Solver status, e.g., `Optimal` or `Feasible`.
    pub status: String,
    /// Objective value.
    pub objective: f64,
    /// Relative optimality gap.
    pub gap: f64,
    /// Pairs of device ID and position of the serving server in [`State::servers`].
    pub assignments: Vec<(DeviceId, usize)>,
}

/// Backend solving the allocation as a mathematical program.
pub trait ExactSolver {
    /// Model name reported as the algorithm, e.g., `Minimize_Cost`.
    fn name(&self) -> &str;

    /// Solves the allocation for a state with no assignments.
    ///
    /// # Errors
    ///
    /// Any failure of the backend.
    fn solve(&self, state: &State) -> Result<SolverOutcome, SolverError>;
}

/// Runs an exact solver and applies its allocation to `state`.
///
/// Solver failures are logged and leave the state without assignments, with status `Error`.
/// Pairs that do not refer to a covered device and one of its candidates, that would
/// exceed capacity, or that repeat a device, are skipped with a warning.
pub fn run_exact<S: ExactSolver + ?Sized>(solver: &S, state: &mut State) {
    let start = Instant::now();
    state.clear();
    let variant = match solver.solve(state) {
        Ok(outcome) => {
            apply(state, &outcome.assignments);
            Variant::Mathematical {
                status: outcome.status,
                objective: outcome.objective,
                gap: outcome.gap,
            }
        }
        Err(err) => {
            log::error!("Solver {} failed: {}", solver.name(), err);
            Variant::Mathematical {
                status: String::from("Error"),
                objective: 0.0,
                gap: 1.0,
            }
        }
    };
    let metrics = state.metrics_mut();
    metrics.algorithm = solver.name().to_string();
    metrics.variant = variant;
    let elapsed = start.elapsed();
    state.add_execution_time(elapsed);
    state.recalculate_metrics();
    log::info!(
        "{} finished in {}: total cost {:.6}",
        solver.name(),
        humantime::format_duration(elapsed),
        state.metrics().outputs.total_cost
    );
}

fn apply(state: &mut State, assignments: &[(DeviceId, usize)]) {
    for &(id, server) in assignments {
        let position = match state.device_position(id) {
            Some(position) => position,
            None => {
                log::warn!("Skipping unknown device {}", id);
                continue;
            }
        };
        let device = state.device(position);
        if device.is_served() {
            log::warn!("Skipping repeated assignment of device {}", id);
            continue;
        }
        let candidate = match device.candidates().iter().find(|c| c.server == server) {
            Some(&candidate) => candidate,
            None => {
                log::warn!("Skipping device {}: server {} is not a candidate", id, server);
                continue;
            }
        };
        if !state.can_serve(position, &candidate) {
            log::warn!("Skipping device {}: server {} is out of capacity", id, server);
            continue;
        }
        state.assign(position, candidate);
    }
}
