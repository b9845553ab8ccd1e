//! Tree-sitter highlighting engine

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::highlighter::{fix_markup, highlight_source, render_markup};
use super::languages::{Grammar, installed_grammars, symbol_name};
use crate::config::HighlightConfig;
use crate::engine::{
    CodeElement, EngineHandle, HighlightEngine, HighlightPlugin, HighlightRequest,
    HighlightResult, LanguageInfo, LineNumbers, escape_html,
};
use crate::error::{EngineError, ImportError};
use crate::loader::{Module, ModuleLoader, loader};

#[derive(Default)]
struct EngineState {
    languages: BTreeMap<String, Grammar>,
    /// Alias -> registered name
    aliases: HashMap<String, String>,
    config: HighlightConfig,
    plugins: Vec<Arc<dyn HighlightPlugin>>,
    line_numbers: Option<LineNumbers>,
}

impl EngineState {
    fn resolve(&self, name: &str) -> Option<(String, Grammar)> {
        let name = name.to_lowercase();
        let canonical = if self.languages.contains_key(&name) {
            name
        } else {
            self.aliases.get(&name)?.clone()
        };
        let grammar = self.languages.get(&canonical)?.clone();
        Some((canonical, grammar))
    }
}

/// Highlighting engine backed by tree-sitter grammars
#[derive(Default)]
pub struct TreeSitterEngine {
    state: RwLock<EngineState>,
}

impl TreeSitterEngine {
    /// Engine with no languages registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with every grammar library installed in `dir`
    pub fn with_installed(dir: &Path) -> Result<Self, ImportError> {
        let engine = Self::new();
        for name in installed_grammars(dir)? {
            match Grammar::load(&name, dir) {
                Ok(Some(grammar)) => engine.register_language(&name, grammar),
                Ok(None) => tracing::warn!(
                    "Grammar library {} does not export {}",
                    name,
                    symbol_name(&name)
                ),
                Err(e) => tracing::warn!("Skipping grammar {}: {}", name, e),
            }
        }
        Ok(engine)
    }

    /// Producer of the core library: an engine without languages
    pub fn core_loader() -> ModuleLoader<EngineHandle> {
        loader(|| async {
            let engine: EngineHandle = Arc::new(TreeSitterEngine::new());
            Ok(Module::new(engine))
        })
    }

    /// Producer of the full library: an engine with every grammar in `dir`
    pub fn full_loader(dir: impl Into<PathBuf>) -> ModuleLoader<EngineHandle> {
        let dir = dir.into();
        loader(move || {
            let dir = dir.clone();
            async move {
                let engine = tokio::task::spawn_blocking(move || Self::with_installed(&dir))
                    .await
                    .map_err(|e| ImportError::failed("full library", e))??;
                let engine: EngineHandle = Arc::new(engine);
                Ok(Module::new(engine))
            }
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn plugins(&self) -> Vec<Arc<dyn HighlightPlugin>> {
        self.read().plugins.clone()
    }

    /// Highlight without running plugins
    fn highlight_with(
        &self,
        name: &str,
        grammar: &Grammar,
        code: &str,
        ignore_illegals: bool,
    ) -> Result<HighlightResult, EngineError> {
        let config = self.read().config.clone();
        let highlighted = highlight_source(grammar, name, code)?;

        if highlighted.has_error && !ignore_illegals {
            return Ok(HighlightResult {
                language: Some(name.to_string()),
                top: Some(highlighted.top),
                value: Some(escape_html(code)),
                relevance: Some(0),
                illegal: true,
                ..Default::default()
            });
        }

        Ok(HighlightResult {
            language: Some(name.to_string()),
            relevance: Some(highlighted.relevance()),
            value: Some(render_markup(code, &highlighted.highlights, &config)),
            top: Some(highlighted.top),
            ..Default::default()
        })
    }

    fn plaintext(&self, code: &str) -> HighlightResult {
        HighlightResult {
            value: Some(escape_html(code)),
            relevance: Some(0),
            ..Default::default()
        }
    }

    /// Highlight with plugins, before the output options are applied
    fn highlight_unformatted(
        &self,
        code: &str,
        language: &str,
        ignore_illegals: bool,
    ) -> Result<HighlightResult, EngineError> {
        let plugins = self.plugins();
        let mut request = HighlightRequest {
            code: code.to_string(),
            language: language.to_string(),
        };
        for plugin in &plugins {
            plugin.before_highlight(&mut request);
        }

        let (name, grammar) = self
            .read()
            .resolve(&request.language)
            .ok_or_else(|| EngineError::UnknownLanguage(request.language.clone()))?;

        let mut result = self.highlight_with(&name, &grammar, &request.code, ignore_illegals)?;
        for plugin in &plugins {
            plugin.after_highlight(&mut result);
        }
        Ok(result)
    }

    fn highlight_auto_unformatted(
        &self,
        code: &str,
        language_subset: Option<&[String]>,
    ) -> HighlightResult {
        let candidates: Vec<(String, Grammar)> = {
            let state = self.read();
            let subset = language_subset
                .map(<[String]>::to_vec)
                .or_else(|| state.config.languages.clone());
            match subset {
                Some(names) => names.iter().filter_map(|n| state.resolve(n)).collect(),
                None => state
                    .languages
                    .iter()
                    .map(|(name, grammar)| (name.clone(), grammar.clone()))
                    .collect(),
            }
        };

        let mut results = vec![self.plaintext(code)];
        for (name, grammar) in &candidates {
            match self.highlight_with(name, grammar, code, true) {
                Ok(result) => results.push(result),
                Err(e) => tracing::debug!("Auto-detection skipped {}: {}", name, e),
            }
        }

        // Stable, so plaintext stays ahead on ties
        results.sort_by(|a, b| b.relevance.cmp(&a.relevance));

        let mut results = results.into_iter();
        let mut best = results.next().unwrap_or_default();
        best.second_best = results.next().map(Box::new);
        best
    }

    fn formatted(&self, mut result: HighlightResult) -> HighlightResult {
        let config = self.read().config.clone();
        format_result(&mut result, &config);
        result
    }
}

fn format_result(result: &mut HighlightResult, config: &HighlightConfig) {
    if let Some(value) = &mut result.value {
        *value = fix_markup(value, config);
    }
    if let Some(second) = &mut result.second_best {
        format_result(second, config);
    }
}

impl HighlightEngine for TreeSitterEngine {
    fn highlight(
        &self,
        code: &str,
        language: &str,
        ignore_illegals: bool,
    ) -> Result<HighlightResult, EngineError> {
        self.highlight_unformatted(code, language, ignore_illegals)
            .map(|result| self.formatted(result))
    }

    fn highlight_auto(&self, code: &str, language_subset: Option<&[String]>) -> HighlightResult {
        self.formatted(self.highlight_auto_unformatted(code, language_subset))
    }

    fn highlight_element(&self, element: &mut CodeElement) {
        if element.is_excluded() {
            return;
        }

        let text = element.text_content();
        let requested = element.language_class().map(str::to_string);

        let mut result = match requested {
            Some(language) => match self.highlight_unformatted(&text, &language, true) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!("{}, falling back to auto-detection", e);
                    self.highlight_auto_unformatted(&text, None)
                }
            },
            None => self.highlight_auto_unformatted(&text, None),
        };

        // Plugins see offsets into `text`, so formatting comes after them
        for plugin in self.plugins() {
            plugin.after_highlight_element(element, &mut result, &text);
        }
        let result = self.formatted(result);

        element.set_inner_html(result.value.unwrap_or_default());
        element.add_class("hljs");
        if let Some(language) = &result.language {
            element.add_class(&format!("language-{}", language));
        }
    }

    fn configure(&self, config: &HighlightConfig) {
        self.write().config = config.clone();
    }

    fn register_language(&self, name: &str, grammar: Grammar) {
        let name = name.to_lowercase();
        let mut state = self.write();
        for alias in grammar.aliases() {
            state.aliases.insert(alias.to_lowercase(), name.clone());
        }
        state.languages.insert(name, grammar);
    }

    fn list_languages(&self) -> Vec<String> {
        self.read().languages.keys().cloned().collect()
    }

    fn get_language(&self, name: &str) -> Option<LanguageInfo> {
        let (name, grammar) = self.read().resolve(name)?;
        Some(LanguageInfo {
            name,
            aliases: grammar.aliases().to_vec(),
        })
    }

    fn add_plugin(&self, plugin: Arc<dyn HighlightPlugin>) {
        self.write().plugins.push(plugin);
    }

    fn extend_line_numbers(&self, line_numbers: LineNumbers) {
        self.write().line_numbers = Some(line_numbers);
    }

    fn line_numbers(&self) -> Option<LineNumbers> {
        self.read().line_numbers
    }
}
