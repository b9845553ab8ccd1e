//! lark::highlight - grammars, load mode and output options
//!
//! Usage in Rhai:
//! ```rhai
//! lark::highlight::set_mode("core");
//! lark::highlight::add_language("rust");
//! lark::highlight::set_line_numbers(true);
//! lark::highlight::set_class_prefix("hl-");
//! ```

use rhai::plugin::*;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::config::{LoadMode, OutputFormat, Settings};

/// Create the highlight module with access to settings
pub fn create_module(settings: Arc<RwLock<Settings>>) -> rhai::Module {
    let mut module = rhai::Module::new();

    // set_grammars_dir(path: &str)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_grammars_dir", move |path: &str| {
            if let Ok(mut settings) = s.write() {
                settings.grammars_dir = PathBuf::from(path);
            }
            Ok(())
        });
    }

    // set_mode(mode: &str) - "full" or "core"
    {
        let s = Arc::clone(&settings);
        module.set_native_fn(
            "set_mode",
            move |mode: &str| -> Result<(), Box<EvalAltResult>> {
                let mode = LoadMode::parse(mode)
                    .ok_or_else(|| format!("Unknown load mode: {}", mode))?;
                if let Ok(mut settings) = s.write() {
                    settings.mode = mode;
                }
                Ok(())
            },
        );
    }

    // get_mode() -> String
    {
        let s = Arc::clone(&settings);
        module.set_native_fn(
            "get_mode",
            move || -> Result<String, Box<EvalAltResult>> {
                Ok(s
                    .read()
                    .map(|s| s.mode.name().to_string())
                    .unwrap_or_default())
            },
        );
    }

    // add_language(name: &str)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("add_language", move |name: &str| {
            if let Ok(mut settings) = s.write() {
                if !settings.languages.iter().any(|l| l == name) {
                    settings.languages.push(name.to_string());
                }
            }
            Ok(())
        });
    }

    // set_detect_languages(names: Array) - restricts auto-detection
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_detect_languages", move |names: rhai::Array| {
            let names: Vec<String> = names
                .into_iter()
                .filter_map(|n| n.into_string().ok())
                .collect();
            if let Ok(mut settings) = s.write() {
                settings.engine.languages = Some(names);
            }
            Ok(())
        });
    }

    // set_line_numbers(enabled: bool)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_line_numbers", move |enabled: bool| {
            if let Ok(mut settings) = s.write() {
                settings.line_numbers = enabled;
            }
            Ok(())
        });
    }

    // set_single_line_numbers(enabled: bool)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_single_line_numbers", move |enabled: bool| {
            if let Ok(mut settings) = s.write() {
                settings.single_line_numbers = enabled;
            }
            Ok(())
        });
    }

    // set_format(format: &str) - "html" or "json"
    {
        let s = Arc::clone(&settings);
        module.set_native_fn(
            "set_format",
            move |format: &str| -> Result<(), Box<EvalAltResult>> {
                let format = OutputFormat::parse(format)
                    .ok_or_else(|| format!("Unknown output format: {}", format))?;
                if let Ok(mut settings) = s.write() {
                    settings.format = format;
                }
                Ok(())
            },
        );
    }

    // set_load_timeout(ms: i64)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_load_timeout", move |ms: i64| {
            if let Ok(mut settings) = s.write() {
                settings.load_timeout_ms = ms.max(1) as u64;
            }
            Ok(())
        });
    }

    // set_class_prefix(prefix: &str)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_class_prefix", move |prefix: &str| {
            if let Ok(mut settings) = s.write() {
                settings.engine.class_prefix = prefix.to_string();
            }
            Ok(())
        });
    }

    // set_tab_replace(replacement: &str)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_tab_replace", move |replacement: &str| {
            if let Ok(mut settings) = s.write() {
                settings.engine.tab_replace = Some(replacement.to_string());
            }
            Ok(())
        });
    }

    // set_use_br(enabled: bool)
    {
        let s = Arc::clone(&settings);
        module.set_native_fn("set_use_br", move |enabled: bool| {
            if let Ok(mut settings) = s.write() {
                settings.engine.use_br = enabled;
            }
            Ok(())
        });
    }

    // list_grammars() -> Array
    {
        let s = Arc::clone(&settings);
        module.set_native_fn(
            "list_grammars",
            move || -> Result<rhai::Array, Box<EvalAltResult>> {
                let dir = s
                    .read()
                    .map(|s| s.grammars_dir.clone())
                    .unwrap_or_else(|_| Settings::default_grammars_dir());
                let names = crate::syntax::installed_grammars(&dir).unwrap_or_default();
                Ok(names.into_iter().map(rhai::Dynamic::from).collect())
            },
        );
    }

    module
}
