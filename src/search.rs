//! Builds the JSON search index consumed by client-side search.

use crate::markdown;
use crate::record::Record;
use crate::write::Artifact;
use serde::Serialize;

/// The output path of the search index relative to the site root.
pub const SEARCH_INDEX_PATH: &str = "search-index.json";

/// One record's entry in the search index.
#[derive(Debug, PartialEq, Serialize)]
pub struct SearchEntry<'a> {
    /// The record's `number`.
    pub id: u32,
    pub title: &'a str,

    /// Plain-text preview of the body.
    pub content: String,

    /// The category name.
    pub category: &'a str,
    pub labels: &'a [String],

    /// `YYYY-MM-DD`.
    pub date: String,
}

impl<'a> From<&'a Record> for SearchEntry<'a> {
    fn from(r: &'a Record) -> SearchEntry<'a> {
        SearchEntry {
            id: r.number,
            title: &r.title,
            content: markdown::preview(&r.body),
            category: &r.category.name,
            labels: &r.labels,
            date: r.date(),
        }
    }
}

/// Builds one entry per record, in the order given.
pub fn entries(records: &[Record]) -> Vec<SearchEntry<'_>> {
    records.iter().map(SearchEntry::from).collect()
}

/// Serializes the search index into an [`Artifact`] at [`SEARCH_INDEX_PATH`].
pub fn search_index(records: &[Record]) -> serde_json::Result<Artifact> {
    let bytes = serde_json::to_vec(&entries(records))?;
    Ok(Artifact::new(SEARCH_INDEX_PATH, bytes))
}
