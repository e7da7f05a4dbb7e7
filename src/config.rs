//! Loads the project configuration ([`Config`]) from a `site.yaml` file. The
//! `site` section of that file is the [`SiteConfig`], which is handed to the
//! templates as-is.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "site.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

#[derive(Deserialize)]
struct FeedLimit(usize);
impl Default for FeedLimit {
    fn default() -> Self {
        FeedLimit(10)
    }
}

/// Identifiers for the comment widget embedded in post pages. They are passed
/// through to the templates without interpretation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comments {
    #[serde(default)]
    pub repo_id: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub category_id: String,
}

/// Site-wide metadata. Immutable for the duration of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub title: String,

    /// The canonical base URL of the generated site.
    pub url: Url,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub email: String,

    /// The `number` of the record rendered as the about page. Zero or less
    /// disables the about page.
    #[serde(default)]
    pub about_id: i64,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub favicon: String,

    #[serde(default)]
    pub comments: Comments,
}

fn default_language() -> String {
    "en".to_owned()
}

impl SiteConfig {
    /// The base URL as a string without a trailing slash, suitable for
    /// prefixing site-relative links such as `/post/3/`.
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

#[derive(Deserialize)]
struct Project {
    site: SiteConfig,

    #[serde(default = "default_output")]
    output_directory: PathBuf,

    #[serde(default = "default_templates")]
    template_directory: PathBuf,

    #[serde(default = "default_static")]
    static_directory: PathBuf,

    #[serde(default = "default_records")]
    records: PathBuf,

    #[serde(default)]
    page_size: PageSize,

    #[serde(default)]
    feed_limit: FeedLimit,
}

fn default_output() -> PathBuf {
    PathBuf::from("_site")
}

fn default_templates() -> PathBuf {
    PathBuf::from("templates")
}

fn default_static() -> PathBuf {
    PathBuf::from("public")
}

fn default_records() -> PathBuf {
    PathBuf::from("records.json")
}

/// Everything needed for a run. Paths are absolute or relative to the
/// working directory; paths read from a project file are resolved against
/// the directory containing that file.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: SiteConfig,
    pub output_directory: PathBuf,
    pub template_directory: PathBuf,
    pub static_directory: PathBuf,
    pub records: PathBuf,
    pub page_size: usize,
    pub feed_limit: usize,
}

impl Config {
    /// Builds a [`Config`] with default page size and feed limit.
    pub fn new(
        site: SiteConfig,
        output_directory: impl Into<PathBuf>,
        template_directory: impl Into<PathBuf>,
        static_directory: impl Into<PathBuf>,
    ) -> Config {
        Config {
            site,
            output_directory: output_directory.into(),
            template_directory: template_directory.into(),
            static_directory: static_directory.into(),
            records: default_records(),
            page_size: PageSize::default().0,
            feed_limit: FeedLimit::default().0,
        }
    }

    /// Searches `dir` and each of its ancestors for a [`PROJECT_FILE`] and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        for ancestor in dir.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.exists() {
                return Config::from_project_file(&path);
            }
        }
        Err(Error::NotFound(dir.to_owned()))
    }

    /// Loads a [`Config`] from a project file.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project_root = path.parent().unwrap_or_else(|| Path::new("."));
        Config::from_yaml(&contents, project_root).map_err(|err| match err {
            Error::Yaml { err, .. } => Error::Yaml {
                path: path.to_owned(),
                err,
            },
            err => err,
        })
    }

    fn from_yaml(contents: &str, project_root: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_str(contents).map_err(|err| Error::Yaml {
            path: PathBuf::new(),
            err,
        })?;
        if project.page_size.0 == 0 {
            return Err(Error::InvalidPageSize);
        }
        Ok(Config {
            site: project.site,
            output_directory: project_root.join(project.output_directory),
            template_directory: project_root.join(project.template_directory),
            static_directory: project_root.join(project.static_directory),
            records: project_root.join(project.records),
            page_size: project.page_size.0,
            feed_limit: project.feed_limit.0,
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the project configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when no project file exists in the directory or any parent.
    #[error("could not find `site.yaml` in `{}` or any parent directory", .0.display())]
    NotFound(PathBuf),

    /// Returned when the project file can't be read.
    #[error("opening project file `{}`: {err}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when the project file isn't valid YAML or is missing fields.
    #[error("parsing project file `{}`: {err}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        err: serde_yaml::Error,
    },

    #[error("`page_size` must be greater than zero")]
    InvalidPageSize,
}
