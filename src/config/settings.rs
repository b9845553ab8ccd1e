use std::path::PathBuf;

use crate::config::HighlightConfig;

/// Whether the tool loads every installed grammar or only the listed ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Full,
    Core,
}

impl LoadMode {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "full" => Some(LoadMode::Full),
            "core" => Some(LoadMode::Core),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoadMode::Full => "full",
            LoadMode::Core => "core",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Html,
    Json,
}

impl OutputFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "html" => Some(OutputFormat::Html),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// Command line tool settings that can be customized via Rhai config
#[derive(Debug, Clone)]
pub struct Settings {
    // Loading
    pub grammars_dir: PathBuf,
    pub mode: LoadMode,
    pub languages: Vec<String>,

    // Output
    pub line_numbers: bool,
    pub single_line_numbers: bool,
    pub format: OutputFormat,
    pub load_timeout_ms: u64,

    // Passed through to the engine
    pub engine: HighlightConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grammars_dir: Self::default_grammars_dir(),
            mode: LoadMode::Full,
            languages: Vec::new(),

            line_numbers: false,
            single_line_numbers: false,
            format: OutputFormat::Html,
            load_timeout_ms: 5_000,

            engine: HighlightConfig::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// `~/.config/lark/grammars`, shared with the editor
    pub fn default_grammars_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".config").join("lark").join("grammars"))
            .unwrap_or_else(|| PathBuf::from("grammars"))
    }
}
