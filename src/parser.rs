//! Miniature CSS parser.
//!
//! Handles the subset the styling layer emits: flat rules, at-rules with
//! one level of nested rules, `prop: value;` declarations. Malformed
//! fragments are skipped, never reported. Helpers return `Option` so the
//! parser stays total.

use tracing::debug;

use crate::ast::{CssNode, Declaration};

/// Parse a stylesheet into an ordered node list.
pub fn parse(css: &str) -> Vec<CssNode> {
    let source = strip_comments(css);
    parse_blocks(&source, false)
}

/// Parse a declaration body (`a: b; c: d`) into declarations.
///
/// Segments without a `:` or with an empty property are dropped.
pub fn parse_declarations(text: &str) -> Vec<Declaration> {
    split_top_level(text, b';')
        .into_iter()
        .filter_map(parse_declaration)
        .collect()
}

fn parse_declaration(segment: &str) -> Option<Declaration> {
    let segment = segment.trim();
    if segment.is_empty() {
        return None;
    }
    let (property, value) = segment.split_once(':')?;
    let property = property.trim();
    if property.is_empty() {
        return None;
    }
    Some(Declaration::new(property, value.trim()))
}

// ---------------------------------------------------------------------------
// Block scanning
// ---------------------------------------------------------------------------

/// One `<header>{<body>}` match.
struct Block<'a> {
    header: &'a str,
    body: &'a str,
}

/// Result of scanning for the next block.
enum Scan<'a> {
    Block(Block<'a>, &'a str),
    /// A `;`-terminated fragment outside any block.
    Statement(&'a str, &'a str),
    End,
}

/// Parse a sequence of blocks. Inside at-rule bodies, loose
/// `prop: value;` statements become declaration nodes.
fn parse_blocks(text: &str, allow_declarations: bool) -> Vec<CssNode> {
    let mut nodes = Vec::new();
    let mut rest = text;

    loop {
        match next_block(rest) {
            Scan::Block(block, tail) => {
                if let Some(node) = block_to_node(block) {
                    nodes.push(node);
                }
                rest = tail;
            }
            Scan::Statement(statement, tail) => {
                let statement = statement.trim();
                if allow_declarations {
                    if let Some(decl) = parse_declaration(statement) {
                        nodes.push(CssNode::Declaration(decl));
                    }
                } else if !statement.is_empty() {
                    debug!(statement, "skipping block-less statement");
                }
                rest = tail;
            }
            Scan::End => {
                if allow_declarations {
                    if let Some(decl) = parse_declaration(rest) {
                        nodes.push(CssNode::Declaration(decl));
                    }
                }
                break;
            }
        }
    }

    nodes
}

fn block_to_node(block: Block<'_>) -> Option<CssNode> {
    let header = block.header.trim();
    if header.is_empty() {
        return None;
    }

    if let Some(at) = header.strip_prefix('@') {
        let split = at
            .find(|c: char| c.is_whitespace() || c == '(')
            .unwrap_or(at.len());
        let (name, params) = at.split_at(split);
        if name.is_empty() {
            return None;
        }
        let children = if find_top_level(block.body, b'{').is_some() {
            parse_blocks(block.body, true)
        } else {
            parse_declarations(block.body)
                .into_iter()
                .map(CssNode::Declaration)
                .collect()
        };
        return Some(CssNode::at_rule(name, params.trim(), children));
    }

    Some(CssNode::rule(header, parse_declarations(block.body)))
}

fn next_block(text: &str) -> Scan<'_> {
    let bytes = text.as_bytes();
    let mut state = ScanState::default();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if state.consume(b) {
            i += 1;
            continue;
        }
        match b {
            b';' => return Scan::Statement(&text[..i], &text[i + 1..]),
            // Stray closing brace at this level.
            b'}' => return Scan::Statement(&text[..i], &text[i + 1..]),
            b'{' => {
                let Some(close) = matching_brace(text, i) else {
                    debug!("dropping unterminated block");
                    return Scan::End;
                };
                let block = Block {
                    header: &text[..i],
                    body: &text[i + 1..close],
                };
                return Scan::Block(block, &text[close + 1..]);
            }
            _ => {}
        }
        i += 1;
    }

    Scan::End
}

/// Index of the `}` matching the `{` at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut state = ScanState::default();
    let mut depth = 0usize;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if state.consume(b) {
            continue;
        }
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Quote / paren aware scanning
// ---------------------------------------------------------------------------

/// Tracks string literals and parentheses so delimiters inside
/// `url(...)` or `"..."` are not treated as structure.
#[derive(Default)]
struct ScanState {
    quote: Option<u8>,
    escaped: bool,
    parens: usize,
}

impl ScanState {
    /// Feed one byte. Returns `true` when the byte is inside a string or
    /// parentheses (or is a quote / paren itself) and must not be
    /// interpreted as a delimiter.
    fn consume(&mut self, b: u8) -> bool {
        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if b == b'\\' {
                self.escaped = true;
            } else if b == q {
                self.quote = None;
            }
            return true;
        }
        match b {
            b'"' | b'\'' => {
                self.quote = Some(b);
                true
            }
            b'(' => {
                self.parens += 1;
                true
            }
            b')' => {
                self.parens = self.parens.saturating_sub(1);
                true
            }
            _ => self.parens > 0,
        }
    }
}

fn split_top_level(text: &str, delimiter: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut state = ScanState::default();
    let mut start = 0;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if state.consume(b) {
            continue;
        }
        if b == delimiter {
            parts.push(&text[start..i]);
            start = i + 1;
        }
    }
    parts.push(&text[start..]);
    parts
}

fn find_top_level(text: &str, needle: u8) -> Option<usize> {
    let mut state = ScanState::default();
    text.as_bytes()
        .iter()
        .enumerate()
        .find(|&(_, &b)| !state.consume(b) && b == needle)
        .map(|(i, _)| i)
}

/// Remove `/* ... */` comments outside string literals.
fn strip_comments(css: &str) -> String {
    if !css.contains("/*") {
        return css.to_string();
    }

    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut quote: Option<u8> = None;
    let mut segment_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'/' && bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&css[segment_start..i]);
                let end = css[i + 2..].find("*/").map_or(bytes.len(), |e| i + 2 + e + 2);
                i = end;
                segment_start = end;
                continue;
            }
            None => {}
        }
        i += 1;
    }
    if segment_start < bytes.len() {
        out.push_str(&css[segment_start..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("   \n ").is_empty());
    }

    #[test]
    fn test_simple_rules() {
        let nodes = parse(".btn { color: red; padding: 4px } .btn:hover{color:blue}");
        assert_eq!(
            nodes,
            vec![
                CssNode::rule(
                    ".btn",
                    vec![
                        Declaration::new("color", "red"),
                        Declaration::new("padding", "4px")
                    ]
                ),
                CssNode::rule(".btn:hover", vec![Declaration::new("color", "blue")]),
            ]
        );
    }

    #[test]
    fn test_selector_list_is_opaque() {
        let nodes = parse(".a, .b > span { margin: 0 }");
        assert_eq!(nodes[0].selector(), Some(".a, .b > span"));
    }

    #[test]
    fn test_malformed_declarations_dropped() {
        let decls = parse_declarations("color red; : blue; ;; margin: 0");
        assert_eq!(decls, vec![Declaration::new("margin", "0")]);
    }

    #[test]
    fn test_value_keeps_colons_after_first() {
        let decls = parse_declarations("background: url(http://x.test/a.png)");
        assert_eq!(decls[0].value, "url(http://x.test/a.png)");
    }

    #[test]
    fn test_semicolon_inside_url_and_string() {
        let decls =
            parse_declarations(r#"background: url(data:image/png;base64,AAA); content: "a;b""#);
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].value, "url(data:image/png;base64,AAA)");
        assert_eq!(decls[1].value, r#""a;b""#);
    }

    #[test]
    fn test_media_with_nested_rules() {
        let nodes = parse("@media (max-width: 600px) { .a { color: red } .b { color: blue } }");
        match &nodes[0] {
            CssNode::AtRule {
                name,
                params,
                children,
            } => {
                assert_eq!(name, "media");
                assert_eq!(params, "(max-width: 600px)");
                assert_eq!(children.len(), 2);
                assert!(children.iter().all(CssNode::is_rule));
            }
            other => panic!("expected at-rule, got {other:?}"),
        }
    }

    #[test]
    fn test_font_face_body_is_declarations() {
        let nodes = parse("@font-face { font-family: Inter; src: url(inter.woff2) }");
        match &nodes[0] {
            CssNode::AtRule { name, children, .. } => {
                assert_eq!(name, "font-face");
                assert_eq!(
                    children[0],
                    CssNode::Declaration(Declaration::new("font-family", "Inter"))
                );
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected at-rule, got {other:?}"),
        }
    }

    #[test]
    fn test_at_rule_without_space_before_params() {
        let nodes = parse("@media(print){.a{color:red}}");
        match &nodes[0] {
            CssNode::AtRule { name, params, .. } => {
                assert_eq!(name, "media");
                assert_eq!(params, "(print)");
            }
            other => panic!("expected at-rule, got {other:?}"),
        }
    }

    #[test]
    fn test_keyframes() {
        let nodes = parse("@keyframes spin { from { transform: rotate(0deg) } to { transform: rotate(360deg) } }");
        match &nodes[0] {
            CssNode::AtRule {
                params, children, ..
            } => {
                assert_eq!(params, "spin");
                assert_eq!(children[1].selector(), Some("to"));
            }
            other => panic!("expected at-rule, got {other:?}"),
        }
    }

    #[test]
    fn test_statement_at_rules_are_skipped() {
        let nodes = parse("@import url(reset.css); .a { color: red }");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].selector(), Some(".a"));
    }

    #[test]
    fn test_comments_stripped() {
        let nodes = parse("/* header */ .a { /* note */ color: red; }");
        assert_eq!(nodes, vec![CssNode::rule(".a", vec![Declaration::new("color", "red")])]);
    }

    #[test]
    fn test_comment_marker_inside_string_kept() {
        let nodes = parse(r#".a { content: "/* not a comment */" }"#);
        match &nodes[0] {
            CssNode::Rule { children, .. } => {
                assert_eq!(children[0].value, r#""/* not a comment */""#)
            }
            other => panic!("expected rule, got {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_block_dropped() {
        let nodes = parse(".a { color: red } .b { color: blue");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_stray_closing_brace_skipped() {
        let nodes = parse("} .a { color: red }");
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn test_empty_rule_kept() {
        let nodes = parse(".a {}");
        assert_eq!(nodes, vec![CssNode::rule(".a", vec![])]);
    }
}
