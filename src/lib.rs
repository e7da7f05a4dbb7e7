//! The library code for the `threadpress` static site generator, which turns
//! a list of discussion records into a blog. The architecture can be broken
//! down into three steps:
//!
//! 1. Loading records from a source ([`crate::source`])
//! 2. Deriving the site's structure: listing pages ([`crate::page`]) and the
//!    tag index ([`crate::tag`])
//! 3. Emitting and writing artifacts ([`crate::write`], [`crate::feed`],
//!    [`crate::search`])
//!
//! [`crate::build`] ties these together and runs them in a fixed order. Every
//! run is a full rebuild; nothing is carried over between runs except the
//! files in the output directory, which are overwritten.
//!
//! Markdown bodies are rendered by [`crate::markdown`], which hands fenced
//! code blocks to [`crate::highlight`]. The same module produces the
//! XML-safe feed summaries and the plain-text search previews.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod highlight;
pub mod markdown;
pub mod page;
pub mod record;
pub mod search;
pub mod source;
pub mod tag;
pub mod template;
pub mod value;
pub mod write;
