//! Converts record bodies from markdown into the forms the output artifacts
//! need: highlighted HTML for pages ([`to_html`]), an XML-safe summary for the
//! feed ([`feed_summary`]), and a plain-text preview for the search index
//! ([`preview`]).
//!
//! Nothing in here fails. A code block that can't be highlighted is rendered
//! plainly and the rest of the document is unaffected.

use crate::highlight;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// The number of characters kept by [`feed_summary`] and [`preview`].
pub const SUMMARY_LENGTH: usize = 200;

/// Appended to text cut short by [`truncate`].
pub const ELLIPSIS: &str = "...";

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// An `&` that already starts a reference XML understands.
static XML_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:amp|lt|gt|quot|apos|#[0-9]+|#x[0-9A-Fa-f]+);").expect("valid reference regex")
});

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Rewrites `\r\n` and lone `\r` line endings to `\n`.
pub fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

/// Converts markdown to HTML for embedding in a page. Headings get `id`
/// attributes derived from their text and fenced code blocks are
/// syntax-highlighted.
pub fn to_html(markdown: &str) -> String {
    to_html_with(markdown, highlight::code_block)
}

/// Like [`to_html`], rendering fenced code blocks with `code_block`.
fn to_html_with(markdown: &str, code_block: CodeBlockRenderer) -> String {
    let markdown = normalize_line_endings(markdown);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    let events = EventConverter::new(code_block).convert(Parser::new_ext(&markdown, options()));
    html::push_html(&mut out, events.into_iter());
    out
}

/// Converts markdown to HTML without any of the page-specific decoration.
fn to_plain_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options()));
    out
}

/// Renders a fenced code block from its info string and contents.
type CodeBlockRenderer = fn(&str, &str) -> String;

/// Rewrites the parser's event stream: fenced code blocks collapse into a
/// single pre-rendered HTML event, and headings are wrapped in tags carrying
/// a generated `id`.
struct EventConverter {
    code_block: CodeBlockRenderer,

    /// How many times each heading id has been handed out, so repeated
    /// headings get distinct ids.
    seen_ids: HashMap<String, usize>,
}

impl EventConverter {
    fn new(code_block: CodeBlockRenderer) -> EventConverter {
        EventConverter {
            code_block,
            seen_ids: HashMap::new(),
        }
    }

    fn convert<'a>(&mut self, parser: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut code: Option<(CowStr<'a>, String)> = None;
        let mut heading: Option<Vec<Event<'a>>> = None;

        for event in parser {
            if code.is_some() {
                match event {
                    Event::Text(t) => {
                        if let Some((_, text)) = &mut code {
                            text.push_str(&t);
                        }
                    }
                    Event::End(Tag::CodeBlock(_)) => {
                        if let Some((info, text)) = code.take() {
                            let block = (self.code_block)(&info, &text);
                            events.push(Event::Html(block.into()));
                        }
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    code = Some((info, String::new()));
                }
                Event::Start(Tag::Heading(..)) => heading = Some(Vec::new()),
                Event::End(Tag::Heading(level, ..)) => {
                    let inner = heading.take().unwrap_or_default();
                    let id = self.heading_id(&inner);
                    let level = level as u32;
                    events.push(Event::Html(format!("<h{} id=\"{}\">", level, id).into()));
                    events.extend(inner);
                    events.push(Event::Html(format!("</h{}>\n", level).into()));
                }
                event => match &mut heading {
                    Some(inner) => inner.push(event),
                    None => events.push(event),
                },
            }
        }
        events
    }

    fn heading_id(&mut self, inner: &[Event]) -> String {
        let text: String = inner
            .iter()
            .filter_map(|event| match event {
                Event::Text(t) | Event::Code(t) => Some(&**t),
                _ => None,
            })
            .collect::<Vec<&str>>()
            .join(" ");
        let mut base = slug::slugify(text);
        if base.is_empty() {
            base = "section".to_owned();
        }
        let count = self.seen_ids.entry(base.clone()).or_insert(0);
        *count += 1;
        match *count {
            1 => base,
            n => format!("{}-{}", base, n - 1),
        }
    }
}

/// Removes everything that looks like an HTML tag.
pub fn strip_tags(html: &str) -> String {
    TAG.replace_all(html, "").into_owned()
}

/// Cuts `text` down to `length` characters, appending [`ELLIPSIS`] if anything
/// was removed.
pub fn truncate(text: &str, length: usize) -> String {
    match text.char_indices().nth(length) {
        None => text.to_owned(),
        Some((end, _)) => format!("{}{}", &text[..end], ELLIPSIS),
    }
}

/// Strips one leading `{` and one trailing `}` from a tag name for display.
pub fn trim_braces(text: &str) -> &str {
    let text = text.strip_prefix('{').unwrap_or(text);
    text.strip_suffix('}').unwrap_or(text)
}

/// Returns true for characters allowed in an XML 1.0 document.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Escapes the five predefined XML entities and encodes newlines as `&#10;`.
/// An `&` that already begins a predefined entity or character reference is
/// left alone, so escaping escaped text is a no-op.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for (i, c) in text.char_indices() {
        match c {
            '&' if XML_REFERENCE.is_match(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            c => out.push(c),
        }
    }
    out
}

/// Renders `markdown`, strips the tags and decodes HTML entities.
fn plain_text(markdown: &str) -> String {
    let text = strip_tags(&to_plain_html(markdown));
    html_escape::decode_html_entities(&text).into_owned()
}

/// Produces the feed summary of a markdown body: rendered, stripped of tags,
/// decoded, truncated to [`SUMMARY_LENGTH`] characters, with characters XML
/// forbids replaced by spaces, then escaped for XML.
pub fn feed_summary(markdown: &str) -> String {
    let text = plain_text(markdown);
    let text = truncate(text.trim(), SUMMARY_LENGTH);
    let text: String = text
        .chars()
        .map(|c| if is_xml_char(c) { c } else { ' ' })
        .collect();
    escape_xml(&text)
}

/// Produces the plain-text search preview of a markdown body: rendered,
/// stripped of tags, with entities decoded, truncated to [`SUMMARY_LENGTH`]
/// characters.
pub fn preview(markdown: &str) -> String {
    // Decoding `&lt;` can surface new tags.
    let text = strip_tags(&plain_text(markdown));
    truncate(text.trim(), SUMMARY_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!("a\nb\nc\n", normalize_line_endings("a\r\nb\rc\n"));
    }

    #[test]
    fn test_to_html_crlf_matches_lf() {
        let lf = to_html("# Title\n\nparagraph one\nline two\n\n- a\n- b\n");
        let crlf = to_html("# Title\r\n\r\nparagraph one\r\nline two\r\n\r\n- a\r\n- b\r\n");
        assert_eq!(lf, crlf);
    }

    #[test]
    fn test_to_html_heading_ids() {
        let html = to_html("# Hello World\n\n## Hello World\n\n### `code` title\n");
        assert!(html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(html.contains(r#"<h2 id="hello-world-1">Hello World</h2>"#));
        assert!(html.contains(r#"<h3 id="code-title"><code>code</code> title</h3>"#));
    }

    #[test]
    fn test_to_html_highlights_fenced_blocks_only() {
        let html = to_html("```rust title=main.rs\nlet x = 1;\n```\n\n    indented\n");
        assert!(html.contains(r#"<pre class="hl-code"><code class="language-rust">"#));
        assert!(html.contains("<pre><code>indented\n</code></pre>"));
    }

    #[test]
    fn test_to_html_language_prefix() {
        let html = to_html("```language-python\nprint(1)\n```\n");
        assert!(html.contains(r#"<code class="language-python">"#));
    }

    #[test]
    fn test_to_html_inline_markup() {
        let html = to_html("some *emphasis* and [a link](https://example.org)\n");
        assert!(html.contains("<em>emphasis</em>"));
        assert!(html.contains(r#"<a href="https://example.org">a link</a>"#));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!("hi there", strip_tags("<p class=\"x\">hi <b>there</b></p>"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!("abc", truncate("abc", 3));
        assert_eq!("ab...", truncate("abc", 2));
        assert_eq!("日本...", truncate("日本語", 2));
        assert_eq!("", truncate("", 0));
    }

    #[test]
    fn test_trim_braces() {
        assert_eq!("tag", trim_braces("{tag}"));
        assert_eq!("{tag}", trim_braces("{{tag}}"));
        assert_eq!("tag", trim_braces("tag"));
        assert_eq!("", trim_braces("{}"));
    }

    #[test]
    fn test_is_xml_char() {
        assert!(is_xml_char('\t'));
        assert!(is_xml_char('a'));
        assert!(is_xml_char('\u{10000}'));
        assert!(!is_xml_char('\u{0}'));
        assert!(!is_xml_char('\u{8}'));
        assert!(!is_xml_char('\u{FFFE}'));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            "a &amp; b &lt;c&gt; &quot;d&quot; &apos;e&apos;&#10;f",
            escape_xml("a & b <c> \"d\" 'e'\nf")
        );
        assert_eq!("&amp; &#10; &#x41; &amp;nbsp;", escape_xml("&amp; &#10; &#x41; &nbsp;"));
    }

    #[test]
    fn test_feed_summary_is_xml_safe() {
        let summary = feed_summary("# Title\n\nFish & \"chips\" <em>now</em>\nnext\u{1}line\n");
        for forbidden in ['<', '>', '"', '\'', '\n', '\u{1}'] {
            assert!(!summary.contains(forbidden), "{:?} in {}", forbidden, summary);
        }
        let unescaped = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;", "&#10;"]
            .iter()
            .fold(summary.clone(), |text, entity| text.replace(entity, ""));
        assert!(!unescaped.contains('&'));
        assert!(summary.starts_with("Title&#10;"));
        assert!(summary.contains("next line"));
    }

    #[test]
    fn test_feed_summary_truncates() {
        let summary = feed_summary(&"x".repeat(500));
        assert_eq!(format!("{}{}", "x".repeat(SUMMARY_LENGTH), ELLIPSIS), summary);
    }

    #[test]
    fn test_feed_summary_idempotent_on_escaped_text() {
        for input in ["plain words only", "Fish &amp; chips", "a &lt;tag&gt; here"] {
            let once = feed_summary(input);
            assert_eq!(once, feed_summary(&once), "input: {}", input);
        }
    }

    #[test]
    fn test_feed_summary_does_not_split_entities() {
        let summary = feed_summary(&format!("{} & tail", "a".repeat(197)));
        assert!(summary.ends_with("&amp; ..."), "{}", summary);
        assert!(!summary.contains("&amp;a"));

        assert_eq!("caf\u{e9} &amp; more", feed_summary("caf&eacute; &amp; more"));
    }

    #[test]
    fn test_preview_decodes_html_entities() {
        let preview = preview("Tom &amp; Jerry\n\n<div>caf&eacute;&nbsp;ok&hellip;</div>\n");
        assert_eq!("Tom & Jerry\ncaf\u{e9}\u{a0}ok\u{2026}", preview);
    }

    #[test]
    fn test_failed_code_block_stays_local() {
        fn flaky(info: &str, code: &str) -> String {
            highlight::code_block_with(info, code, |lang, code| match lang {
                "broken" => Err(String::from("no lexer")),
                lang => highlight::highlighted(lang, code).map_err(|err| err.to_string()),
            })
        }
        let html = to_html_with("```broken\na < b\n```\n\n```rust\nfn main() {}\n```\n", flaky);
        assert!(html.contains(&highlight::plain_code_block("broken", "a < b\n")));
        assert!(html.contains(r#"<pre class="hl-code"><code class="language-rust">"#));
    }

    #[test]
    fn test_preview() {
        let preview = preview("Use `a < b` &amp; **bold**\n\n<div>raw</div>\n");
        assert_eq!("Use a < b & bold\nraw", preview);
    }

    #[test]
    fn test_preview_truncates_without_tags() {
        let body = format!("<span>{}</span>", "word ".repeat(100));
        let preview = preview(&body);
        assert!(preview.chars().count() <= SUMMARY_LENGTH + ELLIPSIS.len());
        assert!(preview.ends_with(ELLIPSIS));
        assert!(!preview.contains('<'));
    }
}
