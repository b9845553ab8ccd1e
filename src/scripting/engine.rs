//! The Rhai scripting engine for lark-highlight
//!
//! Provides the `lark` namespace:
//! - `lark::highlight::*` - loading and output settings

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use rhai::{Engine, Scope};

use super::api;
use crate::config::Settings;
use crate::error::ScriptError;

/// Evaluates config scripts into `Settings`
pub struct ScriptEngine {
    engine: Engine,
    settings: Arc<RwLock<Settings>>,
}

impl ScriptEngine {
    /// Create a new script engine with fresh settings
    pub fn new() -> Self {
        let settings = Arc::new(RwLock::new(Settings::default()));
        let engine = Self::create_engine(Arc::clone(&settings));

        Self { engine, settings }
    }

    /// Create the Rhai engine with the `lark` namespace
    fn create_engine(settings: Arc<RwLock<Settings>>) -> Engine {
        let mut engine = Engine::new();

        // Safety limits
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);

        let mut lark_module = rhai::Module::new();
        let highlight_module = api::highlight::create_module(Arc::clone(&settings));
        lark_module.set_sub_module("highlight", highlight_module);

        // Register `lark` as a static module (accessible as lark::*)
        engine.register_static_module("lark", lark_module.into());

        engine.register_fn("print", |msg: &str| {
            tracing::info!(target: "rhai", "{}", msg);
        });

        engine
    }

    /// Load and execute a config file
    pub fn load_file(&mut self, path: &Path) -> Result<(), ScriptError> {
        let content = std::fs::read_to_string(path)?;
        self.eval(&content)
    }

    /// Evaluate a Rhai script string
    pub fn eval(&mut self, script: &str) -> Result<(), ScriptError> {
        let ast = self
            .engine
            .compile(script)
            .map_err(|e| ScriptError::Parse(e.to_string()))?;

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| ScriptError::Eval(e.to_string()))?;

        Ok(())
    }

    /// Get the current settings (cloned)
    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the config directory path
    /// Uses ~/.config/lark/ on all platforms, shared with the editor
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("lark"))
    }

    /// Get the default config file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("highlight.rhai"))
    }

    /// Load the default config file if it exists
    pub fn load_default(&mut self) -> Result<(), ScriptError> {
        if let Some(config_file) = Self::config_file() {
            if config_file.exists() {
                return self.load_file(&config_file);
            }
        }
        Ok(()) // No config file is fine
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::{LoadMode, OutputFormat};

    #[test]
    fn test_set_mode_and_languages() {
        let mut engine = ScriptEngine::new();
        engine
            .eval(
                r#"
                lark::highlight::set_mode("core");
                lark::highlight::add_language("rust");
                lark::highlight::add_language("go");
                lark::highlight::add_language("rust");
            "#,
            )
            .unwrap();

        let settings = engine.settings();
        assert_eq!(settings.mode, LoadMode::Core);
        assert_eq!(settings.languages, vec!["rust".to_string(), "go".to_string()]);
    }

    #[test]
    fn test_unknown_mode_is_an_error() {
        let mut engine = ScriptEngine::new();
        let err = engine
            .eval(r#"lark::highlight::set_mode("partial");"#)
            .unwrap_err();
        assert!(matches!(err, ScriptError::Eval(_)));
        assert_eq!(engine.settings().mode, LoadMode::Full);
    }

    #[test]
    fn test_engine_options() {
        let mut engine = ScriptEngine::new();
        engine
            .eval(
                r#"
                lark::highlight::set_class_prefix("hl-");
                lark::highlight::set_tab_replace("    ");
                lark::highlight::set_use_br(true);
                lark::highlight::set_detect_languages(["rust", "python"]);
            "#,
            )
            .unwrap();

        let config = engine.settings().engine;
        assert_eq!(config.class_prefix, "hl-");
        assert_eq!(config.tab_replace.as_deref(), Some("    "));
        assert!(config.use_br);
        assert_eq!(
            config.languages,
            Some(vec!["rust".to_string(), "python".to_string()])
        );
    }

    #[test]
    fn test_output_options() {
        let mut engine = ScriptEngine::new();
        engine
            .eval(
                r#"
                lark::highlight::set_line_numbers(true);
                lark::highlight::set_single_line_numbers(true);
                lark::highlight::set_format("json");
                lark::highlight::set_load_timeout(250);
                lark::highlight::set_grammars_dir("/opt/grammars");
            "#,
            )
            .unwrap();

        let settings = engine.settings();
        assert!(settings.line_numbers);
        assert!(settings.single_line_numbers);
        assert_eq!(settings.format, OutputFormat::Json);
        assert_eq!(settings.load_timeout_ms, 250);
        assert_eq!(settings.grammars_dir, PathBuf::from("/opt/grammars"));
    }

    #[test]
    fn test_get_mode_and_list_grammars() {
        let mut engine = ScriptEngine::new();
        engine
            .eval(
                r#"
                lark::highlight::set_grammars_dir("/definitely/not/here");
                if lark::highlight::get_mode() != "full" {
                    throw "unexpected mode";
                }
                if lark::highlight::list_grammars().len() != 0 {
                    throw "unexpected grammars";
                }
            "#,
            )
            .unwrap();
    }

    #[test]
    fn test_parse_error() {
        let mut engine = ScriptEngine::new();
        let err = engine.eval("lark::highlight::set_mode(").unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let mut engine = ScriptEngine::new();
        let err = engine
            .load_file(Path::new("/definitely/not/here.rhai"))
            .unwrap_err();
        assert!(matches!(err, ScriptError::Io(_)));
    }
}
