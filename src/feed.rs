//! Support for creating the site's Atom feed from a list of records.

use crate::config::SiteConfig;
use crate::markdown;
use crate::record::Record;
use crate::write::Artifact;
use atom_syndication::{Category, Entry, Feed, FixedDateTime, Generator, Link, Person, Text};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// The output path of the feed relative to the site root.
pub const FEED_PATH: &str = "atom.xml";

/// Builds the feed from the `limit` most recently created records, newest
/// first. `updated` is the newest included record's creation time.
pub fn feed(site: &SiteConfig, records: &[Record], limit: usize) -> Feed {
    let mut recent: Vec<&Record> = records.iter().collect();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    recent.truncate(limit);

    let base = site.base_url();
    let updated = recent
        .first()
        .map_or_else(DateTime::<Utc>::default, |r| r.created_at);

    Feed {
        title: Text::plain(site.title.clone()),
        id: format!("{}/", base),
        updated: updated.into(),
        authors: authors(site),
        subtitle: match site.description.is_empty() {
            true => None,
            false => Some(Text::plain(site.description.clone())),
        },
        lang: Some(site.language.clone()),
        generator: Some(Generator {
            value: env!("CARGO_PKG_NAME").to_owned(),
            uri: None,
            version: Some(env!("CARGO_PKG_VERSION").to_owned()),
        }),
        links: vec![
            link(format!("{}/", base), "alternate"),
            link(format!("{}/{}", base, FEED_PATH), "self"),
        ],
        entries: recent.into_iter().map(|r| entry(site, r)).collect(),
        ..Feed::default()
    }
}

fn entry(site: &SiteConfig, record: &Record) -> Entry {
    let url = format!("{}{}", site.base_url(), record.link());
    let created: FixedDateTime = record.created_at.into();
    let mut links = vec![link(url.clone(), "alternate")];
    if !record.url.is_empty() {
        links.push(link(record.url.clone(), "related"));
    }

    Entry {
        id: url,
        title: Text::plain(record.title.clone()),
        updated: created,
        published: Some(created),
        authors: match record.author.is_empty() {
            true => authors(site),
            false => vec![Person {
                name: record.author.clone(),
                ..Person::default()
            }],
        },
        categories: record
            .labels
            .iter()
            .map(|label| Category {
                term: label.clone(),
                ..Category::default()
            })
            .collect(),
        links,
        // Already XML-escaped, so the element carries entity-encoded HTML.
        summary: Some(Text::html(markdown::feed_summary(&record.body))),
        ..Entry::default()
    }
}

fn authors(site: &SiteConfig) -> Vec<Person> {
    match site.author.is_empty() {
        true => Vec::new(),
        false => vec![Person {
            name: site.author.clone(),
            email: match site.email.is_empty() {
                true => None,
                false => Some(site.email.clone()),
            },
            ..Person::default()
        }],
    }
}

fn link(href: String, rel: &str) -> Link {
    Link {
        href,
        rel: rel.to_owned(),
        ..Link::default()
    }
}

/// Serializes the feed for `records` into an [`Artifact`] at [`FEED_PATH`].
pub fn feed_artifact(site: &SiteConfig, records: &[Record], limit: usize) -> Result<Artifact> {
    let bytes = feed(site, records, limit).write_to(Vec::new())?;
    Ok(Artifact::new(FEED_PATH, bytes))
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating the feed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("serializing atom feed: {0}")]
    Atom(#[from] atom_syndication::Error),
}
