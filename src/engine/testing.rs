//! In-memory engine for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    CodeElement, HighlightEngine, HighlightPlugin, HighlightResult, LanguageInfo, LineNumbers,
    escape_html,
};
use crate::config::HighlightConfig;
use crate::error::EngineError;
use crate::syntax::Grammar;

/// Records every call; highlighting just escapes the input
#[derive(Default)]
pub(crate) struct FakeEngine {
    pub languages: Mutex<Vec<String>>,
    pub plugins: AtomicUsize,
    pub config: Mutex<Option<HighlightConfig>>,
    pub line_numbers: Mutex<Option<LineNumbers>>,
    pub calls: AtomicUsize,
}

impl FakeEngine {
    pub fn with_languages(names: &[&str]) -> Self {
        let engine = Self::default();
        *engine.languages.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
        engine
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.load(Ordering::SeqCst)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn result(&self, code: &str, language: &str) -> HighlightResult {
        HighlightResult {
            language: Some(language.to_string()),
            value: Some(escape_html(code)),
            relevance: Some(code.len() as u32),
            ..Default::default()
        }
    }
}

impl HighlightEngine for FakeEngine {
    fn highlight(
        &self,
        code: &str,
        language: &str,
        _ignore_illegals: bool,
    ) -> Result<HighlightResult, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.languages.lock().unwrap().iter().any(|l| l == language) {
            return Err(EngineError::UnknownLanguage(language.to_string()));
        }
        Ok(self.result(code, language))
    }

    fn highlight_auto(&self, code: &str, language_subset: Option<&[String]>) -> HighlightResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let language = match language_subset.and_then(|s| s.first()) {
            Some(name) => Some(name.clone()),
            None => self.languages.lock().unwrap().first().cloned(),
        };
        match language {
            Some(language) => self.result(code, &language),
            None => HighlightResult {
                value: Some(escape_html(code)),
                relevance: Some(0),
                ..Default::default()
            },
        }
    }

    fn highlight_element(&self, element: &mut CodeElement) {
        let text = element.text_content();
        let result = self.highlight_auto(&text, None);
        element.set_inner_html(result.value.unwrap_or_default());
        element.add_class("hljs");
    }

    fn configure(&self, config: &HighlightConfig) {
        *self.config.lock().unwrap() = Some(config.clone());
    }

    fn register_language(&self, name: &str, _grammar: Grammar) {
        self.languages.lock().unwrap().push(name.to_string());
    }

    fn list_languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }

    fn get_language(&self, name: &str) -> Option<LanguageInfo> {
        self.languages
            .lock()
            .unwrap()
            .iter()
            .find(|l| *l == name)
            .map(|l| LanguageInfo {
                name: l.clone(),
                aliases: Vec::new(),
            })
    }

    fn add_plugin(&self, _plugin: Arc<dyn HighlightPlugin>) {
        self.plugins.fetch_add(1, Ordering::SeqCst);
    }

    fn extend_line_numbers(&self, line_numbers: LineNumbers) {
        *self.line_numbers.lock().unwrap() = Some(line_numbers);
    }

    fn line_numbers(&self) -> Option<LineNumbers> {
        *self.line_numbers.lock().unwrap()
    }
}

/// Statically linked grammar for tests
pub(crate) fn rust_grammar() -> Grammar {
    Grammar::new(tree_sitter_rust::LANGUAGE.into())
}
