//! Conversions from the pipeline's types into template [`Value`]s. Every
//! object uses lower snake_case keys.

use crate::config::{Comments, SiteConfig};
use crate::page::{page_link, Pagination};
use crate::record::{Category, Record};
use gtmpl_value::Value;
use std::collections::HashMap;

/// Builds a [`Value::Object`] from key/value pairs.
pub fn object<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let m: HashMap<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();
    Value::Object(m)
}

impl From<&Comments> for Value {
    fn from(c: &Comments) -> Value {
        object([
            ("repo_id", Value::from(c.repo_id.as_str())),
            ("category", Value::from(c.category.as_str())),
            ("category_id", Value::from(c.category_id.as_str())),
        ])
    }
}

/// The site's `url` is exposed without a trailing slash so templates can
/// write `{{.site.url}}{{.record.link}}`.
impl From<&SiteConfig> for Value {
    fn from(site: &SiteConfig) -> Value {
        object([
            ("title", Value::from(site.title.as_str())),
            ("url", Value::from(site.base_url())),
            ("description", Value::from(site.description.as_str())),
            ("author", Value::from(site.author.as_str())),
            ("email", Value::from(site.email.as_str())),
            ("about_id", Value::from(site.about_id)),
            ("language", Value::from(site.language.as_str())),
            ("favicon", Value::from(site.favicon.as_str())),
            ("comments", Value::from(&site.comments)),
        ])
    }
}

impl From<&Category> for Value {
    fn from(c: &Category) -> Value {
        object([
            ("id", Value::from(c.id.as_str())),
            ("name", Value::from(c.name.as_str())),
        ])
    }
}

impl From<&Record> for Value {
    fn from(r: &Record) -> Value {
        object([
            ("id", Value::from(r.id.as_str())),
            ("number", Value::from(u64::from(r.number))),
            ("title", Value::from(r.title.as_str())),
            ("body", Value::from(r.body.as_str())),
            ("author", Value::from(r.author.as_str())),
            ("category", Value::from(&r.category)),
            (
                "labels",
                Value::Array(r.labels.iter().map(|l| Value::from(l.as_str())).collect()),
            ),
            ("url", Value::from(r.url.as_str())),
            ("date", Value::from(r.date())),
            ("datetime", Value::from(r.created_at.to_rfc3339())),
            ("link", Value::from(r.link())),
        ])
    }
}

/// Besides the raw page numbers, carries `prev_link` and `next_link`, which
/// are empty when the matching `has_*` flag is false.
impl From<Pagination> for Value {
    fn from(p: Pagination) -> Value {
        let link = |present: bool, number: usize| match present {
            true => page_link(number),
            false => String::new(),
        };
        object([
            ("current_page", Value::from(p.current_page as u64)),
            ("total_pages", Value::from(p.total_pages as u64)),
            ("has_prev", Value::Bool(p.has_prev)),
            ("has_next", Value::Bool(p.has_next)),
            ("prev_page", Value::from(p.prev_page as u64)),
            ("next_page", Value::from(p.next_page as u64)),
            ("prev_link", Value::from(link(p.has_prev, p.prev_page))),
            ("next_link", Value::from(link(p.has_next, p.next_page))),
        ])
    }
}

/// Converts a list of records into a [`Value::Array`].
pub fn records<'a, I>(records: I) -> Value
where
    I: IntoIterator<Item = &'a Record>,
{
    Value::Array(records.into_iter().map(Value::from).collect())
}
