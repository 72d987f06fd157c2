//! Node list → CSS text.

use crate::ast::{CssNode, Declaration};

const INDENT: &str = "  ";

/// Stringify nodes as CSS.
///
/// Pretty mode puts one declaration per line with two-space indentation.
/// Minified mode drops all non-essential whitespace, including the space
/// before `(`-led at-rule params (`@media(print)`), and the trailing `;`
/// before `}`. Selectors and params are otherwise verbatim.
pub fn stringify(nodes: &[CssNode], minify: bool) -> String {
    let mut out = String::new();
    if minify {
        write_minified(&mut out, nodes);
    } else {
        write_pretty(&mut out, nodes, 0);
    }
    out
}

fn write_minified(out: &mut String, nodes: &[CssNode]) {
    for (i, node) in nodes.iter().enumerate() {
        match node {
            CssNode::Declaration(decl) => {
                push_declaration(out, decl, ":");
                let followed = i + 1 < nodes.len();
                if followed {
                    out.push(';');
                }
            }
            CssNode::Rule { selector, children } => {
                out.push_str(selector);
                out.push('{');
                for (j, decl) in children.iter().enumerate() {
                    if j > 0 {
                        out.push(';');
                    }
                    push_declaration(out, decl, ":");
                }
                out.push('}');
            }
            CssNode::AtRule {
                name,
                params,
                children,
            } => {
                out.push('@');
                out.push_str(name);
                if !params.is_empty() {
                    if !params.starts_with('(') {
                        out.push(' ');
                    }
                    out.push_str(params);
                }
                out.push('{');
                write_minified(out, children);
                out.push('}');
            }
        }
    }
}

fn write_pretty(out: &mut String, nodes: &[CssNode], depth: usize) {
    let pad = INDENT.repeat(depth);
    for node in nodes {
        match node {
            CssNode::Declaration(decl) => {
                out.push_str(&pad);
                push_declaration(out, decl, ": ");
                out.push_str(";\n");
            }
            CssNode::Rule { selector, children } => {
                out.push_str(&pad);
                out.push_str(selector);
                out.push_str(" {\n");
                for decl in children {
                    out.push_str(&pad);
                    out.push_str(INDENT);
                    push_declaration(out, decl, ": ");
                    out.push_str(";\n");
                }
                out.push_str(&pad);
                out.push_str("}\n");
            }
            CssNode::AtRule {
                name,
                params,
                children,
            } => {
                out.push_str(&pad);
                out.push('@');
                out.push_str(name);
                if !params.is_empty() {
                    out.push(' ');
                    out.push_str(params);
                }
                out.push_str(" {\n");
                write_pretty(out, children, depth + 1);
                out.push_str(&pad);
                out.push_str("}\n");
            }
        }
    }
}

fn push_declaration(out: &mut String, decl: &Declaration, separator: &str) {
    out.push_str(&decl.property);
    out.push_str(separator);
    out.push_str(&decl.value);
}
