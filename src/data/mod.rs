//! Reader record input and preprocessing

pub mod metadata;
pub mod parquet;
pub mod preprocessing;
pub mod records;

use crate::error::Result;
use records::ReaderRecord;
use std::path::Path;

/// Load reader records, choosing the reader by file extension (`.parquet` or JSON Lines)
pub fn load_records(path: &str) -> Result<Vec<ReaderRecord>> {
    let is_parquet = Path::new(path)
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        parquet::load_reader_records(path)
    } else {
        records::load_json_lines(path)
    }
}
