//! Line-number support
//!
//! Rewrites highlighted markup into a two-column table, one row per line.
//! Spans that cross a newline are closed at the end of the line and reopened
//! on the next one so every row is balanced markup.

use super::{CodeElement, Token, tokenize};
use crate::loader::{Module, ModuleLoader, loader};

const TABLE_NAME: &str = "hljs-ln";
const LINE_NAME: &str = "hljs-ln-line";
const CODE_BLOCK_NAME: &str = "hljs-ln-code";
const NUMBERS_BLOCK_NAME: &str = "hljs-ln-numbers";
const NUMBER_LINE_NAME: &str = "hljs-ln-n";
const DATA_ATTR_NAME: &str = "data-line-number";

/// Line-number extension installed on an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumbers {
    /// Number single-line blocks too
    pub single_line: bool,
    pub start_from: usize,
}

impl Default for LineNumbers {
    fn default() -> Self {
        Self {
            single_line: false,
            start_from: 1,
        }
    }
}

impl LineNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module loader whose default export is this extension
    pub fn loader(self) -> ModuleLoader<LineNumbers> {
        loader(move || async move { Ok(Module::new(self)) })
    }

    /// Add line numbers to a highlighted block in place
    pub fn block(&self, element: &mut CodeElement) {
        if let Some(table) = self.render(element.inner_html()) {
            element.set_inner_html(table);
        }
    }

    /// Table markup for `html`, or `None` when the block is left alone
    pub fn render(&self, html: &str) -> Option<String> {
        let balanced = duplicate_multiline_nodes(html);
        let mut lines: Vec<&str> = balanced.split('\n').collect();

        // A trailing newline doesn't make an extra row
        if lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        if lines.len() > 1 || (self.single_line && !lines.is_empty()) {
            Some(self.table(&lines))
        } else {
            None
        }
    }

    fn table(&self, lines: &[&str]) -> String {
        let mut html = format!("<table class=\"{}\"><tbody>", TABLE_NAME);
        for (i, line) in lines.iter().enumerate() {
            let n = i + self.start_from;
            let line = line.strip_suffix('\r').unwrap_or(line);
            let content = if line.is_empty() { " " } else { line };
            html.push_str(&format!(
                "<tr><td class=\"{line_name} {numbers}\" {attr}=\"{n}\">\
                 <div class=\"{number}\" {attr}=\"{n}\"></div></td>\
                 <td class=\"{line_name} {code}\" {attr}=\"{n}\">{content}</td></tr>",
                line_name = LINE_NAME,
                numbers = NUMBERS_BLOCK_NAME,
                number = NUMBER_LINE_NAME,
                code = CODE_BLOCK_NAME,
                attr = DATA_ATTR_NAME,
            ));
        }
        html.push_str("</tbody></table>");
        html
    }
}

/// Close open tags before each newline and reopen them after it
fn duplicate_multiline_nodes(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut open: Vec<(&str, &str)> = Vec::new();

    for token in tokenize(html) {
        match token {
            Token::Text(text) => {
                let mut parts = text.split('\n');
                if let Some(first) = parts.next() {
                    out.push_str(first);
                }
                for part in parts {
                    for (name, _) in open.iter().rev() {
                        out.push_str(&format!("</{}>", name));
                    }
                    out.push('\n');
                    for (_, raw) in &open {
                        out.push_str(raw);
                    }
                    out.push_str(part);
                }
            }
            Token::Open { name, raw } => {
                open.push((name, raw));
                out.push_str(raw);
            }
            Token::Close { name } => {
                open.pop();
                out.push_str(&format!("</{}>", name));
            }
            Token::Void { raw, .. } => out.push_str(raw),
        }
    }

    out
}
