//! Groups records by label into a [`TagIndex`].

use crate::record::Record;
use std::collections::BTreeMap;

/// One tag's entry in a [`TagIndex`].
#[derive(Debug, Default)]
pub struct TagEntry<'a> {
    /// Label occurrences across all records. A record listing the same label
    /// twice counts twice.
    pub count: usize,

    /// Records carrying the tag, in input order, each at most once.
    pub records: Vec<&'a Record>,
}

/// Maps tag names to their [`TagEntry`]. Tag names are used verbatim; no
/// case or whitespace normalization happens here. Iteration is ordered by tag
/// name.
#[derive(Debug, Default)]
pub struct TagIndex<'a> {
    tags: BTreeMap<&'a str, TagEntry<'a>>,
}

impl<'a> TagIndex<'a> {
    /// Builds the index from scratch over `records`.
    pub fn build(records: &'a [Record]) -> TagIndex<'a> {
        let mut index = TagIndex::default();
        for record in records {
            for label in &record.labels {
                let entry = index.tags.entry(label.as_str()).or_default();
                entry.count += 1;
                let already_member = entry
                    .records
                    .last()
                    .map_or(false, |last| std::ptr::eq(*last, record));
                if !already_member {
                    entry.records.push(record);
                }
            }
        }
        index
    }

    pub fn get(&self, tag: &str) -> Option<&TagEntry<'a>> {
        self.tags.get(tag)
    }

    /// The number of label occurrences for `tag`, zero if it's unknown.
    pub fn count(&self, tag: &str) -> usize {
        self.get(tag).map_or(0, |entry| entry.count)
    }

    /// The records carrying `tag`, empty if it's unknown.
    pub fn records(&self, tag: &str) -> &[&'a Record] {
        match self.get(tag) {
            Some(entry) => &entry.records,
            None => &[],
        }
    }

    /// Iterates tags in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &TagEntry<'a>)> + '_ {
        self.tags.iter().map(|(name, entry)| (*name, entry))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
