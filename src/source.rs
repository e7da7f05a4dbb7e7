//! Where records come from. A [`RecordSource`] produces the raw record list;
//! [`load_records`] cleans it up and falls back to [`sample_records`] when the
//! source fails, so a site can always be generated locally.

use crate::record::{Category, Record};
use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

const FENCE: &str = "```";

/// Produces the records a site is built from.
pub trait RecordSource {
    fn fetch(&self) -> Result<Vec<Record>>;
}

/// Reads records from a JSON file holding an array of records.
#[derive(Clone, Debug)]
pub struct JsonFileSource {
    pub path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileSource {
        JsonFileSource { path: path.into() }
    }
}

impl RecordSource for JsonFileSource {
    fn fetch(&self) -> Result<Vec<Record>> {
        let contents = std::fs::read(&self.path).map_err(|err| Error::Io {
            path: self.path.clone(),
            err,
        })?;
        serde_json::from_slice(&contents).map_err(|err| Error::Json {
            path: self.path.clone(),
            err,
        })
    }
}

/// Fetches records from `source` and closes any code fence a body leaves
/// open. If the fetch fails, the failure is logged and [`sample_records`] are
/// used instead.
pub fn load_records(source: &dyn RecordSource) -> Vec<Record> {
    let mut records = match source.fetch() {
        Ok(records) => {
            info!(count = records.len(), "fetched records");
            records
        }
        Err(err) => {
            warn!(%err, "fetching records failed, using sample records");
            sample_records()
        }
    };
    for record in &mut records {
        record.body = close_code_fences(&record.body);
    }
    records
}

/// Appends a closing fence line if `body` ends inside a fenced code block.
/// Any line starting with three backticks (after trimming) toggles the fence.
pub fn close_code_fences(body: &str) -> String {
    let open = body
        .split('\n')
        .filter(|line| line.trim().starts_with(FENCE))
        .count()
        % 2
        == 1;
    match open {
        true => format!("{}\n{}", body, FENCE),
        false => body.to_owned(),
    }
}

/// A small built-in record list: a welcome post, an about post (number 2)
/// and a labeled post with a code block.
pub fn sample_records() -> Vec<Record> {
    let general = Category {
        id: String::from("sample-general"),
        name: String::from("General"),
    };
    let sample = |number: u32, day: u32, title: &str, body: &str, labels: &[&str]| Record {
        id: format!("sample-{}", number),
        number,
        title: title.to_owned(),
        body: body.to_owned(),
        author: String::from("threadpress"),
        category: general.clone(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        created_at: Utc
            .with_ymd_and_hms(2024, 1, day, 12, 0, 0)
            .single()
            .unwrap_or_default(),
        url: String::new(),
    };

    vec![
        sample(
            3,
            3,
            "Highlighted code",
            "Fenced code blocks are highlighted:\n\n```rust\nfn main() {\n    println!(\"hello\");\n}\n```\n",
            &["rust", "{meta}"],
        ),
        sample(
            2,
            2,
            "About",
            "This site is generated from discussion threads.",
            &[],
        ),
        sample(
            1,
            1,
            "Welcome",
            "Welcome to the site. Posts are listed **newest first**.",
            &["meta"],
        ),
    ]
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to fetch records.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading records file `{}`: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("parsing records file `{}`: {err}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        err: serde_json::Error,
    },

    #[error("record source unavailable: {0}")]
    Unavailable(String),
}
