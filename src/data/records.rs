//! Reader records produced by the crawler

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

/// Placeholder the crawler writes when a shelf entry has no book id
pub const MISSING_BOOK_ID: &str = "No gid";

/// Classification of a crawled reader profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Normal,
    Private,
    Empty,
    Error,
}

impl FromStr for ProfileType {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(ProfileType::Normal),
            "private" => Ok(ProfileType::Private),
            "empty" => Ok(ProfileType::Empty),
            "error" => Ok(ProfileType::Error),
            other => Err(NetworkError::MalformedRecord(format!(
                "unknown profile type {:?}",
                other
            ))),
        }
    }
}

/// One book on a reader's shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookInteraction {
    #[serde(default)]
    pub book_id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    /// 0 means the reader did not rate the book
    #[serde(default)]
    pub rating: u8,

    #[serde(default)]
    pub read_count: u32,
}

impl BookInteraction {
    pub fn new(book_id: &str, rating: u8) -> Self {
        Self {
            book_id: Some(book_id.to_string()),
            title: None,
            rating,
            read_count: 1,
        }
    }

    /// The usable book id, or an error for blank and placeholder ids
    pub fn valid_book_id(&self) -> Result<&str> {
        match self.book_id.as_deref().map(str::trim) {
            None => Err(NetworkError::MalformedRecord("missing book id".to_string())),
            Some("") => Err(NetworkError::MalformedRecord("blank book id".to_string())),
            Some(MISSING_BOOK_ID) => Err(NetworkError::MalformedRecord(format!(
                "placeholder book id {:?}",
                MISSING_BOOK_ID
            ))),
            Some(id) => Ok(id),
        }
    }
}

/// A crawled reader and the books on their read shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderRecord {
    /// Platform id; not unique and sometimes 0
    pub reader_id: String,

    pub profile_type: ProfileType,

    #[serde(default)]
    pub books: Vec<BookInteraction>,
}

impl ReaderRecord {
    pub fn normal(reader_id: &str, books: Vec<BookInteraction>) -> Self {
        Self {
            reader_id: reader_id.to_string(),
            profile_type: ProfileType::Normal,
            books,
        }
    }
}

/// Load reader records from a JSON Lines file, skipping lines that do not parse
pub fn load_json_lines<P: AsRef<Path>>(path: P) -> Result<Vec<ReaderRecord>> {
    let path = path.as_ref();
    log::info!("Reading reader records from {}", path.display());

    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ReaderRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                log::warn!("Skipping line {} of {}: {}", line_no + 1, path.display(), e);
            }
        }
    }

    log::info!("Loaded {} reader records ({} unreadable lines skipped)", records.len(), skipped);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn placeholder_and_blank_ids_are_malformed() {
        let mut interaction = BookInteraction::new("No gid", 4);
        assert!(interaction.valid_book_id().is_err());

        interaction.book_id = Some("   ".to_string());
        assert!(interaction.valid_book_id().is_err());

        interaction.book_id = None;
        assert!(interaction.valid_book_id().is_err());

        interaction.book_id = Some("1234".to_string());
        assert_eq!(interaction.valid_book_id().unwrap(), "1234");
    }

    #[test]
    fn json_lines_skip_unreadable_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"reader_id": "0", "profile_type": "normal", "books": [{{"book_id": "7", "rating": 5}}]}}"#
        )
        .unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"reader_id": "9", "profile_type": "private"}}"#).unwrap();

        let records = load_json_lines(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].books[0].rating, 5);
        assert_eq!(records[0].books[0].read_count, 0);
        assert_eq!(records[1].profile_type, ProfileType::Private);
        assert!(records[1].books.is_empty());
    }
}
