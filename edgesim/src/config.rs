use std::convert::TryFrom;
use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Runs edge/cloud allocation simulations.
#[derive(Parser, Debug)]
#[clap(version, author)]
pub struct Opt {
    /// Path to the device table.
    #[clap(long)]
    pub devices: Option<PathBuf>,

    /// Path to the edge server table.
    #[clap(long)]
    pub edge_servers: Option<PathBuf>,

    /// Path to the cloud server table.
    #[clap(long)]
    pub cloud_servers: Option<PathBuf>,

    /// Use only the first N devices of the device table.
    #[clap(long)]
    pub num_devices: Option<usize>,

    /// Radio technology generation, 1 through 6.
    #[clap(long, default_value = "4")]
    pub tech: u8,

    /// Algorithm: Random, Greedy_AscAsc, Greedy_AscDesc, Greedy_DescAsc, Greedy_DescDesc, or SA.
    #[clap(long, default_value = "Greedy_DescAsc")]
    pub algorithm: String,

    /// Heuristic computing the initial solution of simulated annealing.
    #[clap(long, default_value = "Random")]
    pub heuristic: String,

    /// Initial temperature of simulated annealing.
    #[clap(long, default_value = "100")]
    pub temperature: f64,

    /// Cooling rate of simulated annealing.
    #[clap(long, default_value = "0.95")]
    pub cooling_rate: f64,

    /// Number of independent simulated annealing trials.
    #[clap(long, default_value = "120")]
    pub trials: usize,

    /// Random seed. Drawn from entropy if not given.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Saturate one cloud server per covered device before allocation.
    #[clap(long)]
    pub bottleneck: bool,

    /// Pick the saturating devices at random.
    #[clap(long)]
    pub random_bottleneck: bool,

    /// Column delimiter of the input tables. Repeated spaces count as one.
    #[clap(long, default_value = " ")]
    pub delimiter: char,

    /// Directory under which result files are appended.
    #[clap(long, default_value = "Results")]
    pub results_dir: PathBuf,

    /// JSON file with an array of run configurations; replaces the single-run options.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Verbosity.
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: i32,

    /// Store the logs this file.
    #[clap(long)]
    pub log_output: Option<PathBuf>,

    /// Do not log to the stderr.
    #[clap(long)]
    pub no_stderr: bool,

    /// Do not display the progress bar.
    #[clap(long)]
    pub no_progress: bool,
}

fn default_tech() -> u8 {
    4
}

fn default_heuristic() -> String {
    String::from("Random")
}

fn default_temperature() -> f64 {
    100.0
}

fn default_cooling_rate() -> f64 {
    0.95
}

fn default_trials() -> usize {
    120
}

fn default_delimiter() -> char {
    ' '
}

/// Configuration of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path to the device table.
    pub devices: PathBuf,
    /// Path to the edge server table.
    pub edge_servers: PathBuf,
    /// Path to the cloud server table.
    pub cloud_servers: PathBuf,
    /// Use only the first N devices.
    #[serde(default)]
    pub num_devices: Option<usize>,
    /// Technology ID.
    #[serde(default = "default_tech")]
    pub tech: u8,
    /// Algorithm name.
    pub algorithm: String,
    /// Seed heuristic of simulated annealing.
    #[serde(default = "default_heuristic")]
    pub heuristic: String,
    /// Initial temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Cooling rate.
    #[serde(default = "default_cooling_rate")]
    pub cooling_rate: f64,
    /// Number of annealing trials.
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Random seed.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Whether to create the cloud bottleneck.
    #[serde(default)]
    pub bottleneck: bool,
    /// Whether the bottleneck devices are chosen at random.
    #[serde(default)]
    pub random_bottleneck: bool,
    /// Column delimiter of the input tables.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl RunConfig {
    /// Delimiter as a byte.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDelimiter`] for non-ASCII delimiters.
    pub fn delimiter_byte(&self) -> Result<u8, Error> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or(Error::InvalidDelimiter(self.delimiter))
    }
}

/// All runs requested by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Runs, executed in order.
    pub runs: Vec<RunConfig>,
    /// Root directory of result files.
    pub results_dir: PathBuf,
}

impl TryFrom<Opt> for Batch {
    type Error = eyre::Error;
    fn try_from(opt: Opt) -> eyre::Result<Self> {
        let runs = if let Some(path) = &opt.config {
            let file = File::open(path)
                .wrap_err_with(|| format!("unable to open batch config: {}", path.display()))?;
            let runs: Vec<RunConfig> =
                serde_json::from_reader(file).wrap_err("unable to parse batch config")?;
            if runs.is_empty() {
                return Err(Error::EmptyBatch.into());
            }
            runs
        } else {
            vec![RunConfig {
                devices: opt.devices.ok_or(Error::MissingInput("devices"))?,
                edge_servers: opt.edge_servers.ok_or(Error::MissingInput("edge-servers"))?,
                cloud_servers: opt
                    .cloud_servers
                    .ok_or(Error::MissingInput("cloud-servers"))?,
                num_devices: opt.num_devices,
                tech: opt.tech,
                algorithm: opt.algorithm,
                heuristic: opt.heuristic,
                temperature: opt.temperature,
                cooling_rate: opt.cooling_rate,
                trials: opt.trials,
                seed: opt.seed,
                bottleneck: opt.bottleneck || opt.random_bottleneck,
                random_bottleneck: opt.random_bottleneck,
                delimiter: opt.delimiter,
            }]
        };
        for run in &runs {
            run.delimiter_byte()?;
        }
        Ok(Self {
            runs,
            results_dir: opt.results_dir,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> eyre::Result<Batch> {
        let opt = Opt::try_parse_from(std::iter::once("edgesim").chain(args.iter().copied()))?;
        Batch::try_from(opt)
    }

    #[test]
    fn test_single_run() {
        let batch = parse(&[
            "--devices",
            "d.txt",
            "--edge-servers",
            "ec.txt",
            "--cloud-servers",
            "cc.txt",
            "--algorithm",
            "SA",
            "--random-bottleneck",
            "--seed",
            "7",
        ])
        .unwrap();
        assert_eq!(batch.results_dir, PathBuf::from("Results"));
        assert_eq!(batch.runs.len(), 1);
        let run = &batch.runs[0];
        assert_eq!(run.devices, PathBuf::from("d.txt"));
        assert_eq!(run.algorithm, "SA");
        assert_eq!(run.heuristic, "Random");
        assert_eq!(run.tech, 4);
        assert_eq!(run.trials, 120);
        assert_eq!(run.temperature, 100.0);
        assert_eq!(run.cooling_rate, 0.95);
        assert_eq!(run.seed, Some(7));
        assert!(run.bottleneck);
        assert!(run.random_bottleneck);
        assert_eq!(run.delimiter_byte().unwrap(), b' ');
    }

    #[test]
    fn test_missing_input() {
        let err = parse(&["--devices", "d.txt", "--cloud-servers", "cc.txt"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::MissingInput("edge-servers"))
        ));
    }

    #[test]
    fn test_invalid_delimiter() {
        let err = parse(&[
            "--devices",
            "d.txt",
            "--edge-servers",
            "ec.txt",
            "--cloud-servers",
            "cc.txt",
            "--delimiter",
            "§",
        ])
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::InvalidDelimiter('§'))
        ));
    }

    #[test]
    fn test_batch_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"devices": "D300.txt", "edge_servers": "EC.txt", "cloud_servers": "CC.txt",
                  "algorithm": "SA", "heuristic": "Greedy_DescAsc", "bottleneck": true}},
                {{"devices": "D400.txt", "edge_servers": "EC.txt", "cloud_servers": "CC.txt",
                  "algorithm": "Random", "tech": 5, "seed": 3, "delimiter": ";"}}
            ]"#
        )
        .unwrap();
        let batch = parse(&[
            "--config",
            file.path().to_str().unwrap(),
            "--results-dir",
            "out",
        ])
        .unwrap();
        assert_eq!(batch.results_dir, PathBuf::from("out"));
        assert_eq!(batch.runs.len(), 2);
        assert_eq!(batch.runs[0].heuristic, "Greedy_DescAsc");
        assert_eq!(batch.runs[0].trials, 120);
        assert!(batch.runs[0].bottleneck);
        assert_eq!(batch.runs[1].tech, 5);
        assert_eq!(batch.runs[1].seed, Some(3));
        assert_eq!(batch.runs[1].delimiter_byte().unwrap(), b';');
    }

    #[test]
    fn test_empty_batch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        let err = parse(&["--config", file.path().to_str().unwrap()]).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyBatch)));
    }
}
