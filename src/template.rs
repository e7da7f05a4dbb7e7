//! Loads the site's named templates and registers the helper functions they
//! can call.
//!
//! Each named template is read from `<template_directory>/<name>.html`. Every
//! partial in the same directory (a file named `_*.html`) is parsed ahead of
//! it, so `{{define}}` blocks in partials are available to all templates.
//!
//! Helpers available to templates:
//!
//! * `default FALLBACK VALUE`: `VALUE`, or `FALLBACK` if `VALUE` is nil or
//!   empty.
//! * `truncate TEXT N`: the first `N` characters of `TEXT`, with `...`
//!   appended if anything was cut.
//! * `markdown TEXT`: `TEXT` rendered from markdown to HTML.
//! * `trimBraces TEXT`: `TEXT` with one leading `{` and one trailing `}`
//!   removed.

use crate::markdown;
use gtmpl::{Context, Func, Template, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The templates a site must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateName {
    /// Paginated listing pages.
    Index,
    /// Post pages and the about page.
    Post,
    /// The index of all tags.
    Tags,
    /// One tag's page.
    Tag,
}

impl TemplateName {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateName::Index => "index",
            TemplateName::Post => "post",
            TemplateName::Tags => "tags",
            TemplateName::Tag => "tag",
        }
    }

    fn file_name(self) -> String {
        format!("{}.html", self.as_str())
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parsed set of named templates.
pub struct Templates {
    index: Template,
    post: Template,
    tags: Template,
    tag: Template,
}

impl Templates {
    /// Reads and parses every named template from `dir`.
    pub fn load(dir: &Path) -> Result<Templates> {
        let partials = partials(dir)?;
        let load = |name: TemplateName| {
            let mut files = partials.clone();
            files.push(dir.join(name.file_name()));
            parse_template(name, &files)
        };
        Ok(Templates {
            index: load(TemplateName::Index)?,
            post: load(TemplateName::Post)?,
            tags: load(TemplateName::Tags)?,
            tag: load(TemplateName::Tag)?,
        })
    }

    fn get(&self, name: TemplateName) -> &Template {
        match name {
            TemplateName::Index => &self.index,
            TemplateName::Post => &self.post,
            TemplateName::Tags => &self.tags,
            TemplateName::Tag => &self.tag,
        }
    }

    /// Executes the named template against `value`.
    pub fn render(&self, name: TemplateName, value: Value) -> Result<Vec<u8>> {
        let context = Context::from(value).map_err(|err| Error::Render { name, err })?;
        let mut out = Vec::new();
        self.get(name)
            .execute(&mut out, &context)
            .map_err(|err| Error::Render { name, err })?;
        Ok(out)
    }
}

/// Lists the partials in `dir`, sorted by file name.
fn partials(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|err| Error::ReadDirectory {
        path: dir.to_owned(),
        err,
    })?;
    let mut partials = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| Error::ReadDirectory {
            path: dir.to_owned(),
            err,
        })?;
        let file_name = entry.file_name();
        let file_name = file_name.to_string_lossy();
        if file_name.starts_with('_') && file_name.ends_with(".html") {
            partials.push(entry.path());
        }
    }
    partials.sort();
    Ok(partials)
}

/// Concatenates the template files as-is and parses the result into a
/// template with the helper functions registered.
fn parse_template(name: TemplateName, files: &[PathBuf]) -> Result<Template> {
    let mut contents = String::new();
    for file in files {
        let text = std::fs::read_to_string(file).map_err(|err| Error::OpenTemplateFile {
            path: file.to_owned(),
            err,
        })?;
        contents.push_str(&text);
    }

    let mut template = Template::default();
    template.add_funcs(&FUNCS);
    template
        .parse(&contents)
        .map_err(|err| Error::ParseTemplate { name, err })?;
    Ok(template)
}

const FUNCS: [(&str, Func); 4] = [
    ("default", default as Func),
    ("truncate", truncate as Func),
    ("markdown", render_markdown as Func),
    ("trimBraces", trim_braces as Func),
];

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Nil | Value::NoValue => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn string_arg<'a>(name: &str, args: &'a [Value], i: usize) -> std::result::Result<&'a str, String> {
    match args.get(i) {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Nil) | Some(Value::NoValue) => Ok(""),
        Some(other) => Err(format!("{}: expected a string, got {}", name, other)),
        None => Err(format!("{}: missing argument {}", name, i + 1)),
    }
}

fn default(args: &[Value]) -> std::result::Result<Value, String> {
    match args {
        [fallback, value] => Ok(match is_empty(value) {
            true => fallback.clone(),
            false => value.clone(),
        }),
        _ => Err(format!("default: expected 2 arguments, got {}", args.len())),
    }
}

/// Accepts its arguments in either order so both `truncate .text 10` and
/// `.text | truncate 10` work.
fn truncate(args: &[Value]) -> std::result::Result<Value, String> {
    let (text, length) = match args {
        [Value::Number(n), text] | [text, Value::Number(n)] => (text, n),
        _ => return Err("truncate: expected a string and a length".to_owned()),
    };
    let length = length
        .as_u64()
        .ok_or_else(|| "truncate: length must be a non-negative integer".to_owned())?;
    let text = string_arg("truncate", std::slice::from_ref(text), 0)?;
    Ok(Value::from(markdown::truncate(text, length as usize)))
}

fn render_markdown(args: &[Value]) -> std::result::Result<Value, String> {
    let text = string_arg("markdown", args, 0)?;
    Ok(Value::from(markdown::to_html(text)))
}

fn trim_braces(args: &[Value]) -> std::result::Result<Value, String> {
    let text = string_arg("trimBraces", args, 0)?;
    Ok(Value::from(markdown::trim_braces(text)))
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading or executing a template.
#[derive(Debug, Error)]
pub enum Error {
    #[error("reading template directory `{}`: {err}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("opening template file `{}`: {err}", path.display())]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    #[error("parsing template `{name}`: {err}")]
    ParseTemplate { name: TemplateName, err: String },

    #[error("rendering template `{name}`: {err}")]
    Render { name: TemplateName, err: String },
}
