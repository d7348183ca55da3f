//! Book metadata lookup

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Auxiliary metadata for a book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    #[serde(default)]
    pub genres: Vec<String>,
    pub sales_rank: i64,
}

/// Lookup capability for book metadata; absence is a normal outcome
pub trait MetadataLookup {
    fn lookup(&self, book_id: &str) -> Option<BookMetadata>;
}

impl MetadataLookup for HashMap<String, BookMetadata> {
    fn lookup(&self, book_id: &str) -> Option<BookMetadata> {
        self.get(book_id).cloned()
    }
}

/// In-memory metadata store backed by a JSON object keyed by book id
#[derive(Debug, Clone, Default)]
pub struct MetadataStore {
    books: HashMap<String, BookMetadata>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Opening book metadata from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let books: HashMap<String, BookMetadata> = serde_json::from_str(&text)?;
        log::info!("Loaded metadata for {} books", books.len());
        Ok(Self { books })
    }

    pub fn insert(&mut self, book_id: &str, metadata: BookMetadata) {
        self.books.insert(book_id.to_string(), metadata);
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

impl MetadataLookup for MetadataStore {
    fn lookup(&self, book_id: &str) -> Option<BookMetadata> {
        self.books.lookup(book_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn store_loads_json_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"42": {{"genres": ["Fantasy", "Epic"], "sales_rank": 1200}}, "7": {{"sales_rank": 3}}}}"#
        )
        .unwrap();

        let store = MetadataStore::from_file(file.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.lookup("42").unwrap().genres, vec!["Fantasy", "Epic"]);
        assert!(store.lookup("7").unwrap().genres.is_empty());
        assert!(store.lookup("missing").is_none());
    }
}
