use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineHandle, LineNumbers};
use crate::loader::ModuleLoader;
use crate::syntax::Grammar;

/// Global engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// Replaces TAB characters in the output
    pub tab_replace: Option<String>,
    /// Emit `<br>` instead of newlines
    pub use_br: bool,
    /// Prefix for the class names in the generated markup
    pub class_prefix: String,
    /// Restricts auto-detection to these languages
    pub languages: Option<Vec<String>>,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            tab_replace: None,
            use_br: false,
            class_prefix: "hljs-".to_string(),
            languages: None,
        }
    }
}

/// How to obtain the highlighting engine
///
/// Either a full library, or a core library plus an explicit map of language
/// loaders. Which combinations are valid is decided by `loader::resolve`.
#[derive(Clone, Default)]
pub struct HighlightOptions {
    pub full_library_loader: Option<ModuleLoader<EngineHandle>>,
    pub core_library_loader: Option<ModuleLoader<EngineHandle>>,
    pub languages: BTreeMap<String, ModuleLoader<Grammar>>,
    pub line_numbers_loader: Option<ModuleLoader<LineNumbers>>,
    pub config: Option<HighlightConfig>,
}

impl HighlightOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn full_library(mut self, loader: ModuleLoader<EngineHandle>) -> Self {
        self.full_library_loader = Some(loader);
        self
    }

    pub fn core_library(mut self, loader: ModuleLoader<EngineHandle>) -> Self {
        self.core_library_loader = Some(loader);
        self
    }

    /// Add a language loader. A second loader for the same name replaces the first.
    pub fn language(mut self, name: impl Into<String>, loader: ModuleLoader<Grammar>) -> Self {
        self.languages.insert(name.into(), loader);
        self
    }

    pub fn line_numbers(mut self, loader: ModuleLoader<LineNumbers>) -> Self {
        self.line_numbers_loader = Some(loader);
        self
    }

    pub fn config(mut self, config: HighlightConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn has_line_numbers(&self) -> bool {
        self.line_numbers_loader.is_some()
    }
}

impl fmt::Debug for HighlightOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightOptions")
            .field("full_library_loader", &self.full_library_loader.is_some())
            .field("core_library_loader", &self.core_library_loader.is_some())
            .field("languages", &self.languages.keys().collect::<Vec<_>>())
            .field("line_numbers_loader", &self.line_numbers_loader.is_some())
            .field("config", &self.config)
            .finish()
    }
}
