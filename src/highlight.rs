//! Syntax highlighting for fenced code blocks and the matching stylesheet.
//!
//! The syntax and theme registries are loaded once per process and only ever
//! read afterwards. Highlighted blocks are emitted with CSS classes rather than
//! inline colors so the light and dark themes can share one document; the
//! stylesheet from [`stylesheet`] supplies the colors.

use pulldown_cmark::escape::escape_html;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::debug;

/// Prefix for every class emitted by the highlighter, so highlight rules can't
/// collide with the site's own stylesheet.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// The theme used for the unscoped (default) half of the stylesheet.
pub const LIGHT_THEME: &str = "InspiredGitHub";

/// The theme used for the half scoped under [`DARK_SCOPE`].
pub const DARK_THEME: &str = "base16-ocean.dark";

/// Attribute selector under which the dark rules apply.
pub const DARK_SCOPE: &str = r#"[data-theme="dark"]"#;

/// Declarations that replace the themes' "invalid" token rules. Lexers flag
/// plenty of ordinary text as invalid and the themes paint it loudly.
const NEUTRAL_ERROR_RULE: &str = "color: inherit;\n background-color: transparent;";

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

static CSS_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid comment regex"));
static CSS_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)([^{}]+)\{([^}]*)\}").expect("valid rule regex"));

/// Extracts the language tag from a fenced code block's info string: the first
/// whitespace-delimited token with any `language-` prefix removed.
pub fn language_tag(info: &str) -> &str {
    let token = info.split_whitespace().next().unwrap_or("");
    token.strip_prefix("language-").unwrap_or(token)
}

/// Picks a syntax for a code block: by name or extension first, then by
/// inspecting the code's first line, then plain text.
fn resolve_syntax(lang: &str, code: &str) -> &'static SyntaxReference {
    let syntaxes: &'static SyntaxSet = &SYNTAXES;
    let by_name = match lang.is_empty() {
        true => None,
        false => syntaxes.find_syntax_by_token(lang),
    };
    by_name
        .or_else(|| {
            code.lines()
                .next()
                .and_then(|first| syntaxes.find_syntax_by_first_line(first))
        })
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text())
}

/// Renders a fenced code block as highlighted HTML. If highlighting fails the
/// block is rendered the way an unhighlighted code block would be; the failure
/// never escapes this function.
pub fn code_block(info: &str, code: &str) -> String {
    code_block_with(info, code, highlighted)
}

/// Like [`code_block`], with `highlight` standing in for the highlighter.
pub(crate) fn code_block_with<E, F>(info: &str, code: &str, highlight: F) -> String
where
    E: fmt::Display,
    F: FnOnce(&str, &str) -> Result<String, E>,
{
    let lang = language_tag(info);
    match highlight(lang, code) {
        Ok(html) => html,
        Err(err) => {
            debug!(lang, %err, "highlighting failed, rendering plain code block");
            plain_code_block(lang, code)
        }
    }
}

pub(crate) fn highlighted(lang: &str, code: &str) -> Result<String, syntect::Error> {
    let syntax = resolve_syntax(lang, code);
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    let mut html = String::from(r#"<pre class="hl-code">"#);
    push_code_open(&mut html, lang);
    html.push_str(&generator.finalize());
    html.push_str("</code></pre>\n");
    Ok(html)
}

/// The default rendering of a fenced code block, matching what the markdown
/// renderer itself would emit.
pub fn plain_code_block(lang: &str, code: &str) -> String {
    let mut html = String::from("<pre>");
    push_code_open(&mut html, lang);
    // Writing into a String can't fail.
    let _ = escape_html(&mut html, code);
    html.push_str("</code></pre>\n");
    html
}

fn push_code_open(html: &mut String, lang: &str) {
    match lang.is_empty() {
        true => html.push_str("<code>"),
        false => {
            html.push_str(r#"<code class="language-"#);
            let _ = escape_html(&mut *html, lang);
            html.push_str(r#"">"#);
        }
    }
}

fn theme(name: &str) -> Result<&'static Theme, Error> {
    let themes: &'static ThemeSet = &THEMES;
    themes
        .themes
        .get(name)
        .ok_or_else(|| Error::MissingTheme(name.to_owned()))
}

/// Builds the merged highlight stylesheet: the light theme unscoped, followed
/// by the dark theme with every selector scoped under [`DARK_SCOPE`]. Rules
/// for invalid tokens are neutralized in both halves.
pub fn stylesheet() -> Result<String, Error> {
    let light = css_for_theme_with_class_style(theme(LIGHT_THEME)?, CLASS_STYLE)?;
    let dark = css_for_theme_with_class_style(theme(DARK_THEME)?, CLASS_STYLE)?;

    let mut css = format!("/* light: {} */\n", LIGHT_THEME);
    css.push_str(&rewrite_rules(&light, None));
    css.push_str(&format!("\n/* dark: {}, scoped to {} */\n", DARK_THEME, DARK_SCOPE));
    css.push_str(&rewrite_rules(&dark, Some(DARK_SCOPE)));
    Ok(css)
}

/// Re-emits each rule of `css`, optionally prefixing every selector with
/// `scope`, and replacing the body of any rule that targets invalid tokens.
fn rewrite_rules(css: &str, scope: Option<&str>) -> String {
    let css = CSS_COMMENT.replace_all(css, "");
    let mut out = String::with_capacity(css.len() * 2);
    for rule in CSS_RULE.captures_iter(&css) {
        let selectors: Vec<&str> = rule[1]
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if selectors.is_empty() {
            continue;
        }
        let body = match selectors.iter().any(|s| s.contains(".hl-invalid")) {
            true => NEUTRAL_ERROR_RULE,
            false => rule[2].trim(),
        };
        let selectors: Vec<String> = selectors
            .iter()
            .map(|s| match scope {
                Some(scope) => format!("{} {}", scope, s),
                None => s.to_string(),
            })
            .collect();
        out.push_str(&selectors.join(",\n"));
        out.push_str(" {\n ");
        out.push_str(body);
        out.push_str("\n}\n");
    }
    out
}

/// Represents a problem building the highlight stylesheet.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("highlight theme `{0}` is not available")]
    MissingTheme(String),

    #[error("generating highlight css: {0}")]
    Css(#[from] syntect::Error),
}
