use std::{
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use fs_err::File;
use log::info;
use thiserror::Error;

use crate::schema::CourseRecord;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("No course records were provided for export")]
    EmptyBatch,
    #[error("An I/O error occurred when writing the CSV file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to serialise a course record: {0}")]
    Csv(#[from] csv::Error),
}

/// Writes `records` to `destination`, replacing any existing file.
///
/// The header row follows the schema's field order.
pub fn write_csv(
    records: &[CourseRecord],
    destination: impl AsRef<Path>,
) -> Result<PathBuf, WriteError> {
    if records.is_empty() {
        return Err(WriteError::EmptyBatch);
    }
    let path = destination.as_ref().to_owned();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(&path)?));
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("Wrote {} course rows to {path:?}", records.len());
    Ok(path)
}
