//! Turns a post into a single narratable string.
//!
//! Script and style blocks are dropped with their bodies, remaining markup is
//! stripped, whitespace is collapsed and the handful of entities blog HTML
//! commonly carries are decoded.

use crate::post::Post;
use once_cell::sync::Lazy;
use regex::Regex;

const FIELD_SEPARATOR: &str = ". ";

static RE_SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());
static RE_STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Entities decoded after tag stripping. `&amp;` goes last so `&amp;lt;`
/// stays a literal `&lt;` instead of turning into `<`.
const ENTITIES: [(&str, &str); 7] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&amp;", "&"),
];

/// Build the text read aloud for `post`: title, excerpt and sanitized body,
/// skipping any part that ends up empty.
pub fn prepare_narration(post: &Post) -> String {
    let body = sanitize_html(&post.content);
    let parts = [
        post.title.trim(),
        post.excerpt.as_deref().map(str::trim).unwrap_or_default(),
        body.as_str(),
    ];
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(FIELD_SEPARATOR)
}

/// Reduce an HTML fragment to plain text.
pub fn sanitize_html(html: &str) -> String {
    let without_scripts = RE_SCRIPT_BLOCK.replace_all(html, "");
    let without_styles = RE_STYLE_BLOCK.replace_all(&without_scripts, "");
    let without_tags = RE_TAG.replace_all(&without_styles, "");
    let collapsed = RE_WHITESPACE.replace_all(&without_tags, " ");
    decode_entities(&collapsed).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    let mut decoded = text.to_string();
    for (entity, replacement) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }
    decoded
}
