//! Renders records into HTML [`Artifact`]s and writes artifacts to disk.
//!
//! The [`Emitter`] methods are pure with respect to the filesystem: they only
//! produce `(path, bytes)` pairs, which [`write_artifacts`] then writes under
//! the output root. This keeps a failing emitter from touching files another
//! emitter already wrote.

use crate::config::SiteConfig;
use crate::page::paginate;
use crate::record::Record;
use crate::tag::TagIndex;
use crate::template::{self, TemplateName, Templates};
use crate::value::{self, object};
use gtmpl_value::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// One output file: a path relative to the output root and its contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Artifact {
        Artifact {
            path: path.into(),
            bytes: bytes.into(),
        }
    }
}

/// The output path of the about page.
pub const ABOUT_PATH: &str = "about/index.html";

/// The output path of the tags index.
pub const TAGS_INDEX_PATH: &str = "tags/index.html";

/// The output path of `tag`'s page.
pub fn tag_path(tag: &str) -> String {
    format!("tags/{}/index.html", tag)
}

static TAGS_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://localhost/tags/").expect("valid tags base url"));

/// The site-relative link to `tag`'s page, with the tag percent-encoded as a
/// single path segment.
pub fn tag_link(tag: &str) -> String {
    let mut url = TAGS_BASE.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(tag).push("");
    }
    url.path().to_owned()
}

/// Returns true if `tag` can be used as a single path segment.
pub fn is_path_segment(tag: &str) -> bool {
    !matches!(tag, "" | "." | "..") && !tag.contains(['/', '\\'])
}

/// Responsible for templating the HTML pages of the site.
pub struct Emitter<'a> {
    pub templates: &'a Templates,
    pub site: &'a SiteConfig,
}

impl Emitter<'_> {
    /// Renders `name` with `site` plus the given fields in scope.
    fn render<I>(&self, name: TemplateName, path: impl Into<PathBuf>, fields: I) -> Result<Artifact>
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        let value = object(std::iter::once(("site", Value::from(self.site))).chain(fields));
        let bytes = self.templates.render(name, value)?;
        Ok(Artifact::new(path, bytes))
    }

    /// Renders the paginated listing. The about record is left out before
    /// paginating. No records yields no pages.
    pub fn listing_pages(&self, records: &[Record], page_size: usize) -> Result<Vec<Artifact>> {
        let listed: Vec<Record> = records
            .iter()
            .filter(|r| !r.is_about(self.site.about_id))
            .cloned()
            .collect();
        let pages = paginate(&listed, page_size);
        debug!(records = listed.len(), pages = pages.len(), "rendering listing");
        pages
            .iter()
            .map(|page| {
                self.render(
                    TemplateName::Index,
                    page.file_path(),
                    [
                        ("records", value::records(page.records)),
                        ("pagination", Value::from(page.pagination)),
                    ],
                )
            })
            .collect()
    }

    /// Renders one page per record, the about record included.
    pub fn post_pages(&self, records: &[Record]) -> Result<Vec<Artifact>> {
        records
            .iter()
            .map(|r| self.render(TemplateName::Post, r.page_path(), [("record", Value::from(r))]))
            .collect()
    }

    /// Renders the about page with the post template. Returns `None` if the
    /// about page is disabled or no record matches.
    pub fn about_page(&self, records: &[Record]) -> Result<Option<Artifact>> {
        let about_id = self.site.about_id;
        match records.iter().find(|r| r.is_about(about_id)) {
            Some(r) => self
                .render(TemplateName::Post, ABOUT_PATH, [("record", Value::from(r))])
                .map(Some),
            None => {
                debug!(about_id, "no about record, skipping about page");
                Ok(None)
            }
        }
    }

    /// Renders the tags index followed by one page per tag. Every tag is
    /// listed in the index, but tags that can't be a path segment get no page
    /// of their own.
    pub fn tag_pages(&self, index: &TagIndex) -> Result<Vec<Artifact>> {
        let tags: Vec<Value> = index
            .iter()
            .map(|(name, entry)| {
                object([
                    ("name", Value::from(name)),
                    ("count", Value::from(entry.count as u64)),
                    ("path", Value::from(tag_link(name))),
                ])
            })
            .collect();
        let mut artifacts = vec![self.render(
            TemplateName::Tags,
            TAGS_INDEX_PATH,
            [("tags", Value::Array(tags))],
        )?];

        for (name, entry) in index.iter() {
            if !is_path_segment(name) {
                warn!(tag = name, "tag can't be used as a path, skipping its page");
                continue;
            }
            artifacts.push(self.render(
                TemplateName::Tag,
                tag_path(name),
                [
                    ("tag", Value::from(name)),
                    ("records", value::records(entry.records.iter().copied())),
                ],
            )?);
        }
        Ok(artifacts)
    }
}

/// Writes each artifact under `root`, creating parent directories as needed
/// and overwriting existing files.
pub fn write_artifacts(root: &Path, artifacts: &[Artifact]) -> Result<()> {
    let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
    for artifact in artifacts {
        let path = root.join(&artifact.path);
        if let Some(dir) = path.parent() {
            if seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                    path: dir.to_owned(),
                    err,
                })?;
            }
        }
        std::fs::write(&path, &artifact.bytes).map_err(|err| Error::Io { path, err })?;
    }
    Ok(())
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error rendering or writing pages.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Template(#[from] template::Error),

    #[error("writing `{}`: {err}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}
