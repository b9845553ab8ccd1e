//! Highlighting engine capability surface
//!
//! Everything the loader and the service need from an engine goes through the
//! `HighlightEngine` trait. The built-in implementation lives in `crate::syntax`;
//! any other engine can be published through the readiness gate as long as it
//! implements this trait.

mod element;
mod line_numbers;
mod merge;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use serde::Serialize;

pub use element::CodeElement;
pub(crate) use element::{escape_html, tokenize, unescape_html, Token};
pub use line_numbers::LineNumbers;
pub use merge::MergeHtmlPlugin;

use crate::config::HighlightConfig;
use crate::error::EngineError;
use crate::syntax::Grammar;

/// Shared reference to a loaded engine
pub type EngineHandle = Arc<dyn HighlightEngine>;

/// Result of a highlighting call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HighlightResult {
    pub language: Option<String>,
    pub second_best: Option<Box<HighlightResult>>,
    /// Kind of the top-level node the highlighter finished in
    pub top: Option<String>,
    pub value: Option<String>,
    pub relevance: Option<u32>,
    /// Set when illegal syntax was found and not ignored
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub illegal: bool,
}

/// Public description of a registered language
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    pub name: String,
    pub aliases: Vec<String>,
}

/// Code and language handed to `before_highlight` hooks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest {
    pub code: String,
    pub language: String,
}

/// Engine plugin hooks. All hooks are optional.
pub trait HighlightPlugin: Send + Sync {
    fn before_highlight(&self, _request: &mut HighlightRequest) {}

    fn after_highlight(&self, _result: &mut HighlightResult) {}

    /// Called before the result is written back into `element`. The value's
    /// text still matches `text`: tab replacement and `<br>` come later.
    fn after_highlight_element(
        &self,
        _element: &CodeElement,
        _result: &mut HighlightResult,
        _text: &str,
    ) {
    }
}

/// Capabilities of a loaded highlighting engine
pub trait HighlightEngine: Send + Sync {
    /// Highlight `code` as `language` (a name or an alias)
    fn highlight(
        &self,
        code: &str,
        language: &str,
        ignore_illegals: bool,
    ) -> Result<HighlightResult, EngineError>;

    /// Highlight with language detection, optionally restricted to `language_subset`
    fn highlight_auto(&self, code: &str, language_subset: Option<&[String]>) -> HighlightResult;

    /// Highlight a code block in place, using its `language-*` class when present
    fn highlight_element(&self, element: &mut CodeElement);

    /// Highlight every block that hasn't been highlighted yet
    fn init_highlighting(&self, blocks: &mut [CodeElement]) {
        for block in blocks.iter_mut().filter(|b| !b.has_class("hljs")) {
            self.highlight_element(block);
        }
    }

    fn configure(&self, config: &HighlightConfig);

    fn register_language(&self, name: &str, grammar: Grammar);

    fn list_languages(&self) -> Vec<String>;

    fn get_language(&self, name: &str) -> Option<LanguageInfo>;

    fn add_plugin(&self, plugin: Arc<dyn HighlightPlugin>);

    /// Install line-number support. Engines without support ignore it.
    fn extend_line_numbers(&self, _line_numbers: LineNumbers) {}

    /// Line-number support, if installed
    fn line_numbers(&self) -> Option<LineNumbers> {
        None
    }

    /// Number the lines of a highlighted block. `None` without line-number support.
    fn line_numbers_block(&self, element: &mut CodeElement) -> Option<()> {
        let line_numbers = self.line_numbers()?;
        line_numbers.block(element);
        Some(())
    }
}
