//! Capacity-constrained allocation of client devices to edge and cloud servers.
//!
//! A run starts from already-parsed device and server tables ([`DeviceRow`], [`ServerRow`]).
//! [`State::prepare`] runs the coverage and timing engine, after which exactly one allocation
//! algorithm mutates the state: the [`random`] heuristic, a [`Greedy`] variant, simulated
//! annealing ([`anneal`], usually through [`run_annealing`]), or an external [`ExactSolver`].
//! Every algorithm finishes by recomputing the [`Metrics`] of the final state.

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]
#![deny(unsafe_code)]

mod annealing;
mod coverage;
#[cfg(test)]
mod fixtures;
mod geo;
mod heuristic;
mod metrics;
mod model;
mod solver;
mod state;
mod technology;
mod trials;

pub use annealing::{
    anneal, anneal_with, Cost, Schedule, Step, ATTEMPTS_PER_LEVEL, MAX_CANDIDATE_TRIES,
    TEMPERATURE_FLOOR,
};
pub use coverage::{cover, Coverage, BACKBONE_RATE, INTER_DC_LATENCY, SPEED_OF_LIGHT};
pub use geo::{distance, EARTH_RADIUS};
pub use heuristic::{random, Greedy, SortOrder};
pub use metrics::{
    calculate_metrics, directory, file_name, header, row, Inputs, Metrics, Outputs, Variant,
};
pub use model::{
    Candidate, Device, DeviceId, DeviceRow, Location, Resources, Server, ServerId, ServerKind,
    ServerRow,
};
pub use solver::{run_exact, ExactSolver, SolverError, SolverOutcome};
pub use state::State;
pub use technology::{Profile, Technology};
pub use trials::{run_annealing, run_heuristic, Algorithm, AnnealingRun};

/// Error type encompassing all allocation errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Technology ID outside of the known profiles.
    #[error("Unknown technology: {0}")]
    UnknownTechnology(u8),
    /// Algorithm name that does not match any known algorithm.
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),
    /// Returned when a run would start without any devices.
    #[error("There must be at least one device.")]
    ZeroDevices,
    /// Returned when a run would start without any edge servers.
    #[error("There must be at least one edge server.")]
    ZeroEdgeServers,
    /// Returned when a run would start without any cloud servers.
    #[error("There must be at least one cloud server.")]
    ZeroCloudServers,
    /// Two device rows share the same ID.
    #[error("Duplicate device ID: {0}")]
    DuplicateDeviceId(DeviceId),
    /// Two server rows share the same ID.
    #[error("Duplicate server ID: {0}")]
    DuplicateServerId(ServerId),
    /// Initial annealing temperature must be a positive number.
    #[error("Initial temperature must be positive, got {0}")]
    InvalidTemperature(f64),
    /// Cooling rate must be strictly between 0 and 1.
    #[error("Cooling rate must be in (0, 1), got {0}")]
    InvalidCoolingRate(f64),
    /// Repeated runs require at least one trial.
    #[error("There must be at least one trial.")]
    ZeroTrials,
}

/// Result alias using [`Error`](enum.Error.html).
pub type Result<T> = std::result::Result<T, Error>;
