//! Parquet file handling for reader records

use crate::data::records::{BookInteraction, ProfileType, ReaderRecord};
use crate::error::{NetworkError, Result};
use polars::prelude::*;
use std::collections::HashMap;

/// Load reader records from a flat Parquet table of shelf entries.
///
/// Expected columns: `UserId`, `ProfileType`, `BookId`, `Title`, `Rating`,
/// `ReadCount`. Rows are grouped by user in order of first appearance.
pub fn load_reader_records(path: &str) -> Result<Vec<ReaderRecord>> {
    log::info!("Reading parquet file: {}", path);

    if !std::path::Path::new(path).exists() {
        return Err(NetworkError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path),
        )));
    }

    let df = LazyFrame::scan_parquet(path, Default::default())?.collect()?;
    log::info!("File schema: {:?}", df.schema());
    log::info!("Loaded {} shelf entries", df.height());

    let user_col = df.column("UserId")?.str()?;
    let profile_col = df.column("ProfileType")?.str()?;
    let book_col = df.column("BookId")?.str()?;
    let title_col = df.column("Title")?.str()?;
    let rating = df.column("Rating")?.cast(&DataType::Int64)?;
    let rating_col = rating.i64()?;
    let read_count = df.column("ReadCount")?.cast(&DataType::Int64)?;
    let read_count_col = read_count.i64()?;

    let mut position: HashMap<String, usize> = HashMap::new();
    let mut records: Vec<ReaderRecord> = Vec::new();
    let mut bad_rows = 0usize;

    for i in 0..df.height() {
        let Some(user) = user_col.get(i) else {
            bad_rows += 1;
            continue;
        };

        let slot = match position.get(user) {
            Some(&slot) => slot,
            None => {
                let profile_type = match profile_col.get(i).unwrap_or("error").parse() {
                    Ok(profile_type) => profile_type,
                    Err(e) => {
                        log::warn!("User {}: {}; treating profile as error", user, e);
                        ProfileType::Error
                    }
                };
                records.push(ReaderRecord {
                    reader_id: user.to_string(),
                    profile_type,
                    books: Vec::new(),
                });
                position.insert(user.to_string(), records.len() - 1);
                records.len() - 1
            }
        };

        // Profiles without books still appear as a single row with no book id
        let book_id = book_col.get(i).map(str::to_string);
        if book_id.is_none() && title_col.get(i).is_none() {
            continue;
        }

        let rating = rating_col.get(i).unwrap_or(0);
        let rating = match u8::try_from(rating) {
            Ok(rating) => rating,
            Err(_) => {
                bad_rows += 1;
                log::debug!("User {}: rating {} out of range; treating as unrated", user, rating);
                0
            }
        };

        records[slot].books.push(BookInteraction {
            book_id,
            title: title_col.get(i).map(str::to_string),
            rating,
            read_count: read_count_col.get(i).unwrap_or(0).clamp(0, i64::from(u32::MAX)) as u32,
        });
    }

    log::info!(
        "Grouped shelf entries into {} reader records ({} unusable rows)",
        records.len(),
        bad_rows
    );
    Ok(records)
}
