//! Syntax highlighter using Tree-sitter
//!
//! Parses a snippet with a grammar, classifies nodes and renders the result
//! as escaped markup with one `<span>` per classified node.

use tree_sitter::{Parser, TreeCursor};

use super::languages::Grammar;
use crate::config::HighlightConfig;
use crate::engine::escape_html;
use crate::error::EngineError;

/// Error nodes cost this many classified nodes of relevance
const ERROR_PENALTY: u32 = 3;

/// A classified byte range of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
    pub kind: HighlightKind,
}

/// Types of syntax elements for highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    Keyword,
    String,
    Number,
    Comment,
    Function,
    Type,
    Variable,
    Operator,
    Punctuation,
    Property,
    Constant,
    Namespace,
    Parameter,
    Label,
    Default,
}

impl HighlightKind {
    /// Map a Tree-sitter node type to a highlight kind
    pub fn from_node_type(node_type: &str, dialect: &str) -> Self {
        match node_type {
            "comment" | "line_comment" | "block_comment" | "doc_comment" => HighlightKind::Comment,

            "string"
            | "string_literal"
            | "raw_string"
            | "raw_string_literal"
            | "char_literal"
            | "string_content"
            | "escape_sequence"
            | "interpreted_string_literal"
            | "template_string" => HighlightKind::String,

            "number" | "integer" | "float" | "integer_literal" | "float_literal"
            | "number_literal" => HighlightKind::Number,

            "keyword" | "storage_class" | "visibility_modifier" | "mutable_specifier" => {
                HighlightKind::Keyword
            }

            "type_identifier" | "primitive_type" | "predefined_type" => HighlightKind::Type,

            "identifier" | "variable" | "field_identifier" | "shorthand_field_identifier" => {
                HighlightKind::Variable
            }

            "property" | "property_identifier" => HighlightKind::Property,

            "true" | "false" | "null" | "none" | "nil" | "boolean" | "undefined" => {
                HighlightKind::Constant
            }

            "lifetime" | "label" | "loop_label" | "statement_identifier" => HighlightKind::Label,

            "attribute_item" | "inner_attribute_item" | "decorator" => HighlightKind::Namespace,

            _ => Self::from_dialect(node_type, dialect),
        }
    }

    fn from_dialect(node_type: &str, dialect: &str) -> Self {
        let keywords: &[&str] = match dialect {
            "rust" => &[
                "let", "fn", "pub", "mod", "use", "struct", "enum", "trait", "impl", "for",
                "loop", "while", "if", "else", "match", "return", "break", "continue", "async",
                "await", "const", "static", "mut", "ref", "self", "super", "crate", "where", "as",
                "in", "dyn", "move", "type", "unsafe", "extern",
            ],
            "python" => &[
                "def", "class", "if", "elif", "else", "for", "while", "try", "except", "finally",
                "with", "as", "import", "from", "return", "yield", "raise", "pass", "break",
                "continue", "lambda", "and", "or", "not", "in", "is", "global", "nonlocal",
                "assert", "async", "await",
            ],
            "javascript" | "typescript" | "tsx" => &[
                "function", "const", "let", "var", "if", "else", "for", "while", "do", "switch",
                "case", "default", "break", "continue", "return", "throw", "try", "catch",
                "finally", "class", "extends", "new", "this", "super", "import", "export", "from",
                "async", "await", "yield", "typeof", "instanceof", "in", "of", "delete", "void",
                "interface", "type", "enum", "implements", "public", "private", "protected",
                "readonly", "abstract", "static",
            ],
            "go" => &[
                "func", "package", "import", "type", "struct", "interface", "map", "chan", "if",
                "else", "for", "range", "switch", "case", "default", "select", "break",
                "continue", "return", "go", "defer", "var", "const", "fallthrough",
            ],
            _ => &[],
        };

        if keywords.contains(&node_type) {
            return HighlightKind::Keyword;
        }

        match (dialect, node_type) {
            ("rust", "!") => HighlightKind::Function,
            (_, "=" | "==" | "!=" | "+" | "-" | "*" | "/" | "<" | ">" | "&&" | "||" | "=>" | "->") => {
                HighlightKind::Operator
            }
            (_, ";" | "," | "." | ":" | "::") => HighlightKind::Punctuation,
            _ => HighlightKind::Default,
        }
    }

    /// Class scope used in the markup, `None` for unclassified text
    pub fn scope(&self) -> Option<&'static str> {
        match self {
            HighlightKind::Keyword => Some("keyword"),
            HighlightKind::String => Some("string"),
            HighlightKind::Number => Some("number"),
            HighlightKind::Comment => Some("comment"),
            HighlightKind::Function => Some("title function_"),
            HighlightKind::Type => Some("type"),
            HighlightKind::Variable => Some("variable"),
            HighlightKind::Operator => Some("operator"),
            HighlightKind::Punctuation => Some("punctuation"),
            HighlightKind::Property => Some("property"),
            HighlightKind::Constant => Some("literal"),
            HighlightKind::Namespace => Some("meta"),
            HighlightKind::Parameter => Some("params"),
            HighlightKind::Label => Some("symbol"),
            HighlightKind::Default => None,
        }
    }
}

/// Outcome of parsing and classifying one snippet
#[derive(Debug, Clone, Default)]
pub struct Highlighted {
    pub highlights: Vec<Highlight>,
    /// Kind of the root node
    pub top: String,
    pub error_nodes: u32,
    pub has_error: bool,
}

impl Highlighted {
    pub fn relevance(&self) -> u32 {
        (self.highlights.len() as u32).saturating_sub(self.error_nodes * ERROR_PENALTY)
    }
}

/// Parse `source` with `grammar` and collect highlights
pub fn highlight_source(
    grammar: &Grammar,
    dialect: &str,
    source: &str,
) -> Result<Highlighted, EngineError> {
    let mut parser = Parser::new();
    parser
        .set_language(grammar.language())
        .map_err(|e| EngineError::Parser(e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| EngineError::Parser("parsing was cancelled".to_string()))?;

    let root = tree.root_node();
    let mut highlighted = Highlighted {
        top: root.kind().to_string(),
        has_error: root.has_error(),
        ..Default::default()
    };

    let mut cursor = tree.walk();
    walk_tree(&mut cursor, dialect, &mut highlighted);
    Ok(highlighted)
}

fn walk_tree(cursor: &mut TreeCursor, dialect: &str, out: &mut Highlighted) {
    loop {
        let node = cursor.node();
        if node.is_error() || node.is_missing() {
            out.error_nodes += 1;
        }

        let kind = HighlightKind::from_node_type(node.kind(), dialect);
        let whole = kind != HighlightKind::Default
            && (node.child_count() == 0 || is_highlightable_parent(node.kind()));

        if whole {
            if node.start_byte() < node.end_byte() {
                out.highlights.push(Highlight {
                    start: node.start_byte(),
                    end: node.end_byte(),
                    kind,
                });
            }
        } else if cursor.goto_first_child() {
            walk_tree(cursor, dialect, out);
            cursor.goto_parent();
        }

        if !cursor.goto_next_sibling() {
            break;
        }
    }
}

/// Check if a parent node type should be highlighted as a whole
fn is_highlightable_parent(node_type: &str) -> bool {
    matches!(
        node_type,
        "string"
            | "string_literal"
            | "raw_string"
            | "raw_string_literal"
            | "interpreted_string_literal"
            | "template_string"
            | "comment"
            | "line_comment"
            | "block_comment"
            | "attribute_item"
            | "inner_attribute_item"
            | "decorator"
    )
}

/// Apply the output options to finished markup. Only text is rewritten, tags
/// are copied as they are.
pub fn fix_markup(markup: &str, config: &HighlightConfig) -> String {
    if config.tab_replace.is_none() && !config.use_br {
        return markup.to_string();
    }

    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(c);
            }
            '>' => {
                in_tag = false;
                out.push(c);
            }
            '\t' if !in_tag => match &config.tab_replace {
                Some(tab) => out.push_str(tab),
                None => out.push(c),
            },
            '\n' if !in_tag && config.use_br => out.push_str("<br>"),
            _ => out.push(c),
        }
    }
    out
}

/// Escaped markup for `source` with a span per highlight
///
/// Offsets in the markup's text match `source` byte for byte; output options
/// are applied later by [`fix_markup`].
pub fn render_markup(source: &str, highlights: &[Highlight], config: &HighlightConfig) -> String {
    let mut out = String::with_capacity(source.len() * 2);
    let mut pos = 0;

    for h in highlights {
        if h.start < pos {
            continue;
        }
        let Some(scope) = h.kind.scope() else {
            continue;
        };
        out.push_str(&escape_html(source.get(pos..h.start).unwrap_or("")));
        out.push_str(&format!(
            "<span class=\"{}{}\">{}</span>",
            config.class_prefix,
            scope,
            escape_html(source.get(h.start..h.end).unwrap_or(""))
        ));
        pos = h.end;
    }

    out.push_str(&escape_html(source.get(pos..).unwrap_or("")));
    out
}
