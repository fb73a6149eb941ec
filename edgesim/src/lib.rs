//! Batch runner of edge/cloud allocation simulations.
//!
//! Loads device and server tables from delimited text files, prepares an
//! [`allocation::State`], runs the requested algorithm, and appends one result row per run
//! (or per annealing trial) under the results directory.

#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

mod config;
pub use config::{Batch, Opt, RunConfig};

mod input;
pub use input::{load_devices, load_servers, read_table};

mod report;
pub use report::append_result;

mod runner;
pub use runner::run;

/// Errors in the run configuration that are not covered by [`allocation::Error`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The table delimiter must be a single ASCII character.
    #[error("Delimiter must be an ASCII character, got {0:?}")]
    InvalidDelimiter(char),
    /// Single runs need paths to all three input tables.
    #[error("Missing input: --{0} is required unless --config is given")]
    MissingInput(&'static str),
    /// A batch file must contain at least one run.
    #[error("Batch configuration contains no runs")]
    EmptyBatch,
}
