//! Usage extraction from HTML and JSX-like sources.
//!
//! Extraction is a best-effort scan: it never fails, and markup that does
//! not match a pattern simply contributes nothing.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Class names, ids, tags and data-attributes observed in markup.
///
/// `tags` are lowercased. `attributes` hold data-attribute names WITHOUT
/// the `data-` prefix (`data-theme` → `theme`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageInfo {
    pub classes: BTreeSet<String>,
    pub ids: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub attributes: BTreeSet<String>,
}

static HTML_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|[\s<"'])class\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static HTML_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|[\s<"'])id\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([a-zA-Z][\w-]*)").unwrap());
static DATA_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s<]data-([\w-]+)").unwrap());

static JSX_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[\s<{(,])(?:className|class)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});
static JSX_TEMPLATE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"className\s*=\s*\{\s*`((?:[^`\\]|\\.)*)`\s*\}").unwrap());
static JSX_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([a-zA-Z][\w.-]*)").unwrap());

/// Placeholder for interpolated template spans; never appears in markup.
const INTERPOLATION: char = '\u{0}';

impl UsageInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan rendered HTML.
    pub fn from_html(html: &str) -> Self {
        let mut usage = Self::new();

        for value in quoted_values(&HTML_CLASS, html) {
            usage.add_classes(value);
        }
        for value in quoted_values(&HTML_ID, html) {
            usage.add_id(value);
        }
        for cap in HTML_TAG.captures_iter(html) {
            usage.tags.insert(cap[1].to_ascii_lowercase());
        }
        usage.add_data_attributes(html);

        usage
    }

    /// Scan JSX-like component source.
    ///
    /// Uppercase-initial tags are components, not DOM elements, and are
    /// skipped. Template-literal class tokens touching a `${...}`
    /// interpolation are not statically known and are skipped too.
    pub fn from_jsx(source: &str) -> Self {
        let mut usage = Self::new();

        for value in quoted_values(&JSX_CLASS, source) {
            usage.add_classes(value);
        }
        for cap in JSX_TEMPLATE_CLASS.captures_iter(source) {
            let masked = mask_interpolations(&cap[1]);
            for token in masked.split_whitespace() {
                if !token.contains(INTERPOLATION) {
                    usage.classes.insert(token.to_string());
                }
            }
        }
        for value in quoted_values(&HTML_ID, source) {
            usage.add_id(value);
        }
        for cap in JSX_TAG.captures_iter(source) {
            let (Some(open), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let tag = name.as_str();
            // `Array<string>`, `a<b`: only an element when it closes somewhere.
            if follows_identifier(source, open.start())
                && !is_closed_element(source, tag, name.end())
            {
                continue;
            }
            let dom_tag = tag.starts_with(|c: char| c.is_ascii_lowercase()) && !tag.contains('.');
            if dom_tag {
                usage.tags.insert(tag.to_string());
            }
        }
        usage.add_data_attributes(source);

        usage
    }

    /// Union `other` into `self`.
    pub fn merge(&mut self, other: UsageInfo) {
        self.classes.extend(other.classes);
        self.ids.extend(other.ids);
        self.tags.extend(other.tags);
        self.attributes.extend(other.attributes);
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.ids.is_empty()
            && self.tags.is_empty()
            && self.attributes.is_empty()
    }

    fn add_classes(&mut self, value: &str) {
        self.classes
            .extend(value.split_whitespace().map(str::to_string));
    }

    fn add_id(&mut self, value: &str) {
        let id = value.trim();
        if !id.is_empty() {
            self.ids.insert(id.to_string());
        }
    }

    fn add_data_attributes(&mut self, markup: &str) {
        for cap in DATA_ATTR.captures_iter(markup) {
            self.attributes.insert(cap[1].to_string());
        }
    }
}

impl Extend<UsageInfo> for UsageInfo {
    fn extend<I: IntoIterator<Item = UsageInfo>>(&mut self, iter: I) {
        for usage in iter {
            self.merge(usage);
        }
    }
}

impl FromIterator<UsageInfo> for UsageInfo {
    fn from_iter<I: IntoIterator<Item = UsageInfo>>(iter: I) -> Self {
        let mut merged = UsageInfo::new();
        merged.extend(iter);
        merged
    }
}

/// Values of a regex with a double-quoted (group 1) and single-quoted
/// (group 2) alternative.
fn quoted_values<'a>(re: &'a Regex, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    re.captures_iter(text)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)))
        .map(|m| m.as_str())
}

/// Replace each brace-balanced `${...}` span with [`INTERPOLATION`].
fn mask_interpolations(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut depth = 1usize;
            for inner in chars.by_ref() {
                match inner {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            out.push(INTERPOLATION);
        } else {
            out.push(c);
        }
    }
    out
}

fn follows_identifier(source: &str, at: usize) -> bool {
    source[..at]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// `</tag` appears, or the tag opened at `after` self-closes.
fn is_closed_element(source: &str, tag: &str, after: usize) -> bool {
    if source.contains(&format!("</{tag}")) {
        return true;
    }
    let rest = &source[after..];
    rest.find(['<', '>'])
        .is_some_and(|i| rest[i..].starts_with('>') && rest[..i].trim_end().ends_with('/'))
}
