//! Merge-HTML plugin
//!
//! Code blocks may carry markup of their own (`<mark>`, `<br>`, links). After
//! an element is highlighted the highlighted markup would replace it, so this
//! plugin weaves the original tags back into the result.

use std::collections::VecDeque;

use super::{CodeElement, HighlightPlugin, HighlightResult, Token, escape_html, tokenize, unescape_html};

/// Re-applies an element's original markup on top of the highlighted markup
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeHtmlPlugin;

impl HighlightPlugin for MergeHtmlPlugin {
    fn after_highlight_element(
        &self,
        element: &CodeElement,
        result: &mut HighlightResult,
        text: &str,
    ) {
        let original = node_stream(element.inner_html());
        if original.is_empty() {
            return;
        }
        let Some(value) = result.value.as_deref() else {
            return;
        };
        let highlighted = node_stream(value);
        result.value = Some(merge_streams(original, highlighted, text));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Start,
    Stop,
    Void,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeEvent {
    kind: EventKind,
    /// Byte offset in the text content
    offset: usize,
    name: String,
    raw: String,
}

impl NodeEvent {
    fn render_open(&self) -> String {
        self.raw.clone()
    }

    fn render_close(&self) -> String {
        format!("</{}>", self.name)
    }

    fn render(&self) -> String {
        match self.kind {
            EventKind::Start | EventKind::Void => self.render_open(),
            EventKind::Stop => self.render_close(),
        }
    }
}

/// Tag events positioned by text offset
fn node_stream(html: &str) -> VecDeque<NodeEvent> {
    let mut events = VecDeque::new();
    let mut offset = 0;

    for token in tokenize(html) {
        match token {
            Token::Text(t) => offset += unescape_html(t).len(),
            Token::Open { name, raw } => events.push_back(NodeEvent {
                kind: EventKind::Start,
                offset,
                name: name.to_string(),
                raw: raw.to_string(),
            }),
            Token::Void { name, raw } => events.push_back(NodeEvent {
                kind: EventKind::Void,
                offset,
                name: name.to_string(),
                raw: raw.to_string(),
            }),
            Token::Close { name } => events.push_back(NodeEvent {
                kind: EventKind::Stop,
                offset,
                name: name.to_string(),
                raw: String::new(),
            }),
        }
    }

    events
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Original,
    Highlighted,
}

fn select_stream(original: &VecDeque<NodeEvent>, highlighted: &VecDeque<NodeEvent>) -> Stream {
    match (original.front(), highlighted.front()) {
        (Some(_), None) => Stream::Original,
        (None, _) => Stream::Highlighted,
        (Some(o), Some(h)) => {
            if o.offset != h.offset {
                if o.offset < h.offset {
                    Stream::Original
                } else {
                    Stream::Highlighted
                }
            } else if h.kind == EventKind::Start {
                // Original tags open outside highlighted ones at the same offset
                Stream::Original
            } else {
                Stream::Highlighted
            }
        }
    }
}

fn text_slice(text: &str, from: usize, to: usize) -> &str {
    let to = to.min(text.len());
    let from = from.min(to);
    text.get(from..to).unwrap_or("")
}

fn merge_streams(
    mut original: VecDeque<NodeEvent>,
    mut highlighted: VecDeque<NodeEvent>,
    text: &str,
) -> String {
    let mut processed = 0;
    let mut result = String::new();
    let mut node_stack: Vec<NodeEvent> = Vec::new();

    while !original.is_empty() || !highlighted.is_empty() {
        let stream = select_stream(&original, &highlighted);
        let next_offset = match stream {
            Stream::Original => original.front().map(|e| e.offset),
            Stream::Highlighted => highlighted.front().map(|e| e.offset),
        }
        .unwrap_or(processed);

        result.push_str(&escape_html(text_slice(text, processed, next_offset)));
        processed = next_offset.max(processed);

        if stream == Stream::Original {
            // Close highlighted spans, emit every original tag at this offset, reopen
            for node in node_stack.iter().rev() {
                result.push_str(&node.render_close());
            }
            while let Some(event) = original.pop_front() {
                result.push_str(&event.render());
                let again = select_stream(&original, &highlighted) == Stream::Original
                    && original.front().is_some_and(|e| e.offset == processed);
                if !again {
                    break;
                }
            }
            for node in &node_stack {
                result.push_str(&node.render_open());
            }
        } else if let Some(event) = highlighted.pop_front() {
            match event.kind {
                EventKind::Start => node_stack.push(event.clone()),
                EventKind::Stop => {
                    node_stack.pop();
                }
                EventKind::Void => {}
            }
            result.push_str(&event.render());
        }
    }

    result.push_str(&escape_html(text_slice(text, processed, text.len())));
    result
}
