use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use allocation::{directory, file_name, header, row, Metrics};
use eyre::WrapErr;

/// Appends a result row to `{results_dir}/{directory}/{file_name}`, creating the directory
/// and writing the header first if the file does not exist yet. Returns the file path.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or written.
pub fn append_result(results_dir: &Path, metrics: &Metrics) -> eyre::Result<PathBuf> {
    let dir = results_dir.join(directory(metrics));
    fs::create_dir_all(&dir)
        .wrap_err_with(|| format!("unable to create directory: {}", dir.display()))?;
    let path = dir.join(file_name(metrics));
    let new_file = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("unable to open result file: {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(file);
    if new_file {
        writer.write_record(header(metrics))?;
    }
    writer.write_record(row(metrics))?;
    writer.flush()?;
    Ok(path)
}
