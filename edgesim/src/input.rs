use std::fs::File;
use std::io::Read;
use std::path::Path;

use allocation::{DeviceRow, ServerRow};
use eyre::WrapErr;
use serde::de::DeserializeOwned;

/// Reads rows of a delimited table.
///
/// Lines starting with `#` are headers or comments and are skipped. Empty fields are dropped
/// before deserializing, so repeated delimiters (typically spaces used for alignment) count as
/// one. Columns are matched to fields by position. Rows that fail to parse are skipped with a
/// warning.
///
/// # Errors
///
/// Returns an error if the underlying reader fails.
pub fn read_table<T, R>(reader: R, delimiter: u8) -> eyre::Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.wrap_err("unable to read table")?;
        let line = record.position().map_or(0, csv::Position::line);
        let fields: csv::StringRecord = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }
        match fields.deserialize(None) {
            Ok(row) => rows.push(row),
            Err(err) => log::warn!("Skipping line {}: {}", line, err),
        }
    }
    Ok(rows)
}

fn read_file<T: DeserializeOwned>(path: &Path, delimiter: u8) -> eyre::Result<Vec<T>> {
    let file = File::open(path)
        .wrap_err_with(|| format!("unable to open table: {}", path.display()))?;
    let rows = read_table(file, delimiter)
        .wrap_err_with(|| format!("unable to read table: {}", path.display()))?;
    log::debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Loads the device table, keeping at most `limit` rows.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_devices(
    path: &Path,
    delimiter: u8,
    limit: Option<usize>,
) -> eyre::Result<Vec<DeviceRow>> {
    let mut rows: Vec<DeviceRow> = read_file(path, delimiter)?;
    if let Some(limit) = limit {
        if rows.len() < limit {
            log::warn!(
                "Requested {} devices but {} contains only {}",
                limit,
                path.display(),
                rows.len()
            );
        }
        rows.truncate(limit);
    }
    Ok(rows)
}

/// Loads an edge or cloud server table.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn load_servers(path: &Path, delimiter: u8) -> eyre::Result<Vec<ServerRow>> {
    read_file(path, delimiter)
}
