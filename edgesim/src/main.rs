//! Edge/cloud allocation simulation application.
#![warn(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::default_trait_access)]

use std::convert::TryFrom;

use clap::Parser;
use eyre::{eyre, WrapErr};

use edgesim::{run, Batch, Opt};

fn set_up_logger(opt: &Opt) -> Result<(), fern::InitError> {
    let log_level = match opt.verbose {
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        3 => log::LevelFilter::Trace,
        _ => log::LevelFilter::Warn,
    };
    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(log_level);
    let dispatch = if let Some(path) = &opt.log_output {
        let _ = std::fs::remove_file(path);
        dispatch.chain(
            std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .append(false)
                .open(path)?,
        )
    } else {
        dispatch
    };
    let dispatch = if opt.no_stderr {
        dispatch
    } else {
        dispatch.chain(std::io::stderr())
    };
    dispatch.apply()?;
    Ok(())
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let opt = Opt::parse();
    set_up_logger(&opt)?;
    let progress = !opt.no_progress;
    let batch = Batch::try_from(opt).wrap_err("invalid configuration")?;
    let mut failed = 0;
    for (idx, config) in batch.runs.iter().enumerate() {
        log::info!(
            "Run {}/{}: {} on {}",
            idx + 1,
            batch.runs.len(),
            config.algorithm,
            config.devices.display()
        );
        if let Err(err) = run(config, &batch.results_dir, progress) {
            log::error!("Run {} failed: {:?}", idx + 1, err);
            failed += 1;
        }
    }
    if failed > 0 {
        return Err(eyre!("{} out of {} runs failed", failed, batch.runs.len()));
    }
    Ok(())
}
