//! Exports the [`Generator`], which stitches together the high-level steps of
//! building the output site, and [`build_site`], which runs it over the
//! records from a [`RecordSource`].
//!
//! The steps run in a fixed order, each one a [`Stage`]:
//!
//! 1. Make sure the output directory exists
//! 2. Write the highlight stylesheet
//! 3. Render the paginated listing, leaving out the about record
//! 4. Render a page per record
//! 5. Render the about page, if there is one
//! 6. Render the tags index and a page per tag
//! 7. Write the Atom feed
//! 8. Write the search index
//! 9. Mirror the static assets into the output directory
//!
//! The first failing stage ends the run. Files written by earlier stages are
//! left in place; rerunning regenerates everything.

use crate::config::Config;
use crate::feed::{self, feed_artifact};
use crate::highlight;
use crate::record::{sort_newest_first, Record};
use crate::search::search_index;
use crate::source::{load_records, RecordSource};
use crate::tag::TagIndex;
use crate::template::{self, Templates};
use crate::write::{self, write_artifacts, Artifact, Emitter};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

/// The output path of the highlight stylesheet relative to the site root.
pub const STYLESHEET_PATH: &str = "styles/highlight.css";

/// One step of a run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    EnsureOutput,
    Stylesheet,
    Listing,
    Posts,
    About,
    Tags,
    Feed,
    SearchIndex,
    Assets,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Stage::EnsureOutput => "ensure output directory",
            Stage::Stylesheet => "stylesheet",
            Stage::Listing => "listing",
            Stage::Posts => "posts",
            Stage::About => "about",
            Stage::Tags => "tags",
            Stage::Feed => "feed",
            Stage::SearchIndex => "search index",
            Stage::Assets => "assets",
        })
    }
}

/// Builds a site from a [`Config`]. The configuration is checked and the
/// templates are loaded up front, so a bad page size or a broken template set
/// fails before anything is written.
pub struct Generator {
    config: Config,
    templates: Templates,
}

impl Generator {
    pub fn new(config: Config) -> Result<Generator> {
        if config.page_size == 0 {
            return Err(Error::InvalidPageSize);
        }
        let templates = Templates::load(&config.template_directory)?;
        Ok(Generator { config, templates })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs every [`Stage`] over `records`, which are first sorted newest
    /// first.
    pub fn generate(&self, mut records: Vec<Record>) -> Result<()> {
        sort_newest_first(&mut records);
        let out = self.config.output_directory.as_path();
        let emitter = Emitter {
            templates: &self.templates,
            site: &self.config.site,
        };
        info!(
            records = records.len(),
            output = %out.display(),
            "generating site"
        );

        run(Stage::EnsureOutput, || {
            std::fs::create_dir_all(out).map_err(|err| write::Error::Io {
                path: out.to_owned(),
                err,
            })?;
            Ok(())
        })?;
        let mut written = run(Stage::Stylesheet, || {
            emit(out, vec![Artifact::new(STYLESHEET_PATH, highlight::stylesheet()?)])
        })?;
        written += run(Stage::Listing, || {
            emit(out, emitter.listing_pages(&records, self.config.page_size)?)
        })?;
        written += run(Stage::Posts, || emit(out, emitter.post_pages(&records)?))?;
        written += run(Stage::About, || {
            emit(out, emitter.about_page(&records)?.into_iter().collect())
        })?;
        written += run(Stage::Tags, || {
            let index = TagIndex::build(&records);
            debug!(tags = index.len(), "built tag index");
            emit(out, emitter.tag_pages(&index)?)
        })?;
        written += run(Stage::Feed, || {
            emit(
                out,
                vec![feed_artifact(
                    &self.config.site,
                    &records,
                    self.config.feed_limit,
                )?],
            )
        })?;
        written += run(Stage::SearchIndex, || {
            emit(out, vec![search_index(&records)?])
        })?;
        let assets = run(Stage::Assets, || {
            mirror_assets(&self.config.static_directory, out)
        })?;

        info!(pages = written, assets, "site generated");
        Ok(())
    }
}

/// Loads records from `source` (falling back to the built-in samples if it
/// fails) and builds the site described by `config`.
pub fn build_site(config: Config, source: &dyn RecordSource) -> Result<()> {
    let generator = Generator::new(config)?;
    generator.generate(load_records(source))
}

fn run<T>(stage: Stage, f: impl FnOnce() -> StageResult<T>) -> Result<T> {
    debug!(%stage, "running stage");
    f().map_err(|source| Error::Stage { stage, source })
}

fn emit(out: &Path, artifacts: Vec<Artifact>) -> StageResult<usize> {
    write_artifacts(out, &artifacts)?;
    debug!(count = artifacts.len(), "wrote artifacts");
    Ok(artifacts.len())
}

/// Finds the static directory: `primary` if it exists, otherwise a directory
/// of the same name one level further up.
pub fn resolve_static_dir(primary: &Path) -> Option<PathBuf> {
    if primary.is_dir() {
        return Some(primary.to_owned());
    }
    let name = primary.file_name()?;
    let fallback = match primary.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join("..").join(name),
        _ => Path::new("..").join(name),
    };
    match fallback.is_dir() {
        true => Some(fallback),
        false => None,
    }
}

/// Copies every regular file under the static directory into `out`,
/// preserving relative paths. Returns the number of files copied.
pub fn mirror_assets(static_directory: &Path, out: &Path) -> StageResult<usize> {
    let src = resolve_static_dir(static_directory)
        .ok_or_else(|| StageError::StaticDirNotFound(static_directory.to_owned()))?;
    debug!(src = %src.display(), "mirroring static assets");

    let mut copied = 0;
    for result in WalkDir::new(&src).follow_links(true) {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(&src) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let target = out.join(relative);
        if let Some(dir) = target.parent() {
            std::fs::create_dir_all(dir).map_err(|err| write::Error::Io {
                path: dir.to_owned(),
                err,
            })?;
        }
        std::fs::copy(entry.path(), &target).map_err(|err| StageError::Copy {
            from: entry.path().to_owned(),
            to: target.clone(),
            err,
        })?;
        copied += 1;
    }
    Ok(copied)
}

pub type Result<T> = std::result::Result<T, Error>;

pub type StageResult<T> = std::result::Result<T, StageError>;

/// The error type for building a site.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured page size was zero.
    #[error("page size must be greater than zero")]
    InvalidPageSize,

    /// The template set couldn't be loaded. Nothing was written.
    #[error("loading templates: {0}")]
    Templates(#[from] template::Error),

    /// A stage failed. Earlier stages' output is left in place.
    #[error("{stage}: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },
}

/// The cause of a failed [`Stage`].
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Write(#[from] write::Error),

    #[error(transparent)]
    Highlight(#[from] highlight::Error),

    #[error(transparent)]
    Feed(#[from] feed::Error),

    #[error("serializing search index: {0}")]
    Search(#[from] serde_json::Error),

    #[error("walking static directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("copying `{}` to `{}`: {err}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("static directory `{}` not found", .0.display())]
    StaticDirNotFound(PathBuf),
}
