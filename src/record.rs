//! Defines the [`Record`] type, the unit of content every stage of the
//! pipeline operates on, along with its [`Category`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A discussion category. Only the name is used when building the site (it
/// groups entries in the search index); the ID is carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,
}

/// A single publishable discussion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Opaque, stable identifier from the source.
    pub id: String,

    /// Small positive integer used for output paths and about-page matching.
    /// Never reused within a run.
    pub number: u32,

    pub title: String,

    /// Raw markdown.
    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub category: Category,

    /// Tag names in source order. Duplicates are kept as-is.
    #[serde(default)]
    pub labels: Vec<String>,

    pub created_at: DateTime<Utc>,

    /// Canonical URL of the original discussion.
    #[serde(default)]
    pub url: String,
}

impl Record {
    /// The output path of the record's page relative to the site root, e.g.
    /// `post/3/index.html`.
    pub fn page_path(&self) -> String {
        format!("post/{}/index.html", self.number)
    }

    /// The site-relative link to the record's page, e.g. `/post/3/`.
    pub fn link(&self) -> String {
        format!("/post/{}/", self.number)
    }

    /// `created_at` formatted as `YYYY-MM-DD`.
    pub fn date(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }

    /// Returns true if this record is the configured about record. An
    /// `about_id` of zero or less never matches.
    pub fn is_about(&self, about_id: i64) -> bool {
        about_id > 0 && i64::from(self.number) == about_id
    }
}

/// Sorts records newest first. The sort is stable, so records sharing a
/// timestamp keep their relative order.
pub fn sort_newest_first(records: &mut [Record]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
