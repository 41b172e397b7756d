use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::error::{RecError, Result};
use crate::index::{IndexBuilder, RatingIndex};
use crate::types::RatingRecord;

/// Counters collected while loading a dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub duplicates: usize,
    pub users: usize,
    pub items: usize,
}

/// Reads a CSV rating dataset with columns
/// `user_id, song_id, rating, song_name, artist, genre` (extra columns are
/// ignored) and builds the rating index.
///
/// Rows that fail to parse are skipped. The load fails as
/// `DatasetUnreadable` when the file cannot be opened, a required column is
/// missing from the header, or every row is malformed.
pub fn load_ratings(path: impl AsRef<Path>) -> Result<(RatingIndex, LoadReport)> {
    let path = path.as_ref();
    tracing::info!("Loading ratings from {}", path.display());
    let reader = csv::Reader::from_path(path).map_err(|source| RecError::DatasetUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    read_index(reader, path.to_path_buf())
}

/// Same as [`load_ratings`] but over any byte stream.
pub fn load_ratings_from_reader<R: Read>(reader: R) -> Result<(RatingIndex, LoadReport)> {
    read_index(csv::Reader::from_reader(reader), PathBuf::from("<stream>"))
}

const REQUIRED_COLUMNS: [&str; 6] = ["user_id", "song_id", "rating", "song_name", "artist", "genre"];

fn unreadable(path: PathBuf, reason: String) -> RecError {
    RecError::DatasetUnreadable {
        path,
        source: csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, reason)),
    }
}

fn read_index<R: Read>(
    mut reader: csv::Reader<R>,
    path: PathBuf,
) -> Result<(RatingIndex, LoadReport)> {
    // An unreadable header means nothing in the file can be resolved.
    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(source) => return Err(RecError::DatasetUnreadable { path, source }),
    };
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(unreadable(path, format!("missing columns: {}", missing.join(", "))));
    }

    let mut builder = IndexBuilder::new();
    let mut report = LoadReport::default();

    for row in reader.records() {
        report.rows_read += 1;
        match row.map_err(malformed).and_then(|raw| parse_row(&raw, &headers)) {
            Ok(record) => {
                if builder.insert(record) {
                    report.duplicates += 1;
                }
            }
            Err(err) => {
                tracing::warn!("Skipping row: {err}");
                report.rows_skipped += 1;
            }
        }
    }

    if report.rows_read > 0 && report.rows_skipped == report.rows_read {
        return Err(unreadable(
            path,
            format!("all {} rows are malformed", report.rows_read),
        ));
    }

    let index = builder.build();
    report.users = index.user_count();
    report.items = index.item_count();
    tracing::info!(
        "Loaded {} ratings ({} users, {} songs), skipped {} rows, {} duplicates overwritten",
        index.rating_count(),
        report.users,
        report.items,
        report.rows_skipped,
        report.duplicates,
    );
    Ok((index, report))
}

fn malformed(err: csv::Error) -> RecError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    RecError::MalformedRecord {
        line,
        reason: err.to_string(),
    }
}

fn parse_row(raw: &csv::StringRecord, headers: &csv::StringRecord) -> Result<RatingRecord> {
    let line = raw.position().map(|p| p.line()).unwrap_or(0);
    let record = raw
        .deserialize::<RatingRecord>(Some(headers))
        .map_err(|err| RecError::MalformedRecord {
            line,
            reason: err.to_string(),
        })?;
    validate(record, line)
}

fn validate(record: RatingRecord, line: u64) -> Result<RatingRecord> {
    let reason = if !record.rating.is_finite() {
        Some("rating is not a finite number")
    } else if record.item_name.trim().is_empty() {
        Some("empty song_name")
    } else if record.artist.trim().is_empty() {
        Some("empty artist")
    } else if record.genre.trim().is_empty() {
        Some("empty genre")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(RecError::MalformedRecord {
            line,
            reason: format!("song {}: {reason}", record.item_id),
        }),
        None => Ok(record),
    }
}
