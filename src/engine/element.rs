//! Code block element and the small amount of HTML handling it needs

/// A code block being highlighted: its class list and inner markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeElement {
    classes: Vec<String>,
    html: String,
}

impl CodeElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a block holding plain text
    pub fn with_text(text: &str) -> Self {
        let mut element = Self::new();
        element.set_text_content(text);
        element
    }

    /// Create a block holding existing markup
    pub fn with_html(html: impl Into<String>) -> Self {
        Self {
            classes: Vec::new(),
            html: html.into(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    /// Text with all markup stripped and entities decoded
    pub fn text_content(&self) -> String {
        let mut text = String::with_capacity(self.html.len());
        for token in tokenize(&self.html) {
            if let Token::Text(t) = token {
                text.push_str(&unescape_html(t));
            }
        }
        text
    }

    pub fn set_text_content(&mut self, text: &str) {
        self.html = escape_html(text);
    }

    pub fn inner_html(&self) -> &str {
        &self.html
    }

    pub fn set_inner_html(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !class.is_empty() && !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Language requested through a `language-*` or `lang-*` class
    pub fn language_class(&self) -> Option<&str> {
        self.classes.iter().find_map(|c| {
            c.strip_prefix("language-")
                .or_else(|| c.strip_prefix("lang-"))
                .filter(|lang| !lang.is_empty())
        })
    }

    /// Blocks marked `nohighlight` / `no-highlight` are skipped
    pub fn is_excluded(&self) -> bool {
        self.has_class("nohighlight") || self.has_class("no-highlight")
    }

    /// Tag name of the first child element, if any
    pub fn first_element_tag(&self) -> Option<&str> {
        tokenize(&self.html).into_iter().find_map(|token| match token {
            Token::Open { name, .. } | Token::Void { name, .. } => Some(name),
            _ => None,
        })
    }
}

/// A piece of tokenized markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Text(&'a str),
    Open { name: &'a str, raw: &'a str },
    Close { name: &'a str },
    /// Self-closing or void element such as `<br>`
    Void { name: &'a str, raw: &'a str },
}

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "wbr", "input", "col"];

/// Split markup into text runs and tags. Comments and doctypes are dropped.
pub(crate) fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(rest));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(&rest[..lt]));
        }

        let tag_src = &rest[lt..];
        let Some(gt) = tag_src.find('>') else {
            // Unterminated tag, keep it as text
            tokens.push(Token::Text(tag_src));
            break;
        };
        let raw = &tag_src[..=gt];
        rest = &tag_src[gt + 1..];

        if raw.starts_with("<!") {
            continue;
        }
        if let Some(inner) = raw.strip_prefix("</") {
            tokens.push(Token::Close {
                name: tag_name(inner),
            });
            continue;
        }

        let name = tag_name(&raw[1..]);
        if raw.ends_with("/>") || VOID_ELEMENTS.contains(&name.to_ascii_lowercase().as_str()) {
            tokens.push(Token::Void { name, raw });
        } else {
            tokens.push(Token::Open { name, raw });
        }
    }

    tokens
}

fn tag_name(src: &str) -> &str {
    let end = src
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(src.len());
    &src[..end]
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub(crate) fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let c = match &rest[1..semi] {
                "amp" => '&',
                "lt" => '<',
                "gt" => '>',
                "quot" => '"',
                "apos" | "#39" | "#x27" => '\'',
                "nbsp" => '\u{a0}',
                entity => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)?
                }
            };
            Some((c, semi))
        });

        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
