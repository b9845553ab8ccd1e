//! Grammar modules
//!
//! Grammars are shared libraries in the grammars directory
//! (`~/.config/lark/grammars/lib<name>.<ext>`), each exporting
//! `tree_sitter_<name>`. That symbol is the module's default export: a library
//! without it resolves to a module that contributes nothing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::{Library, Symbol};

use crate::error::ImportError;
use crate::loader::{Module, ModuleLoader, loader};

/// A tree-sitter language plus the aliases it answers to
#[derive(Clone)]
pub struct Grammar {
    language: tree_sitter::Language,
    aliases: Vec<String>,
    // Keeps the shared library mapped for as long as the language is in use
    _library: Option<Arc<Library>>,
}

impl Grammar {
    /// Wrap a statically linked language
    pub fn new(language: tree_sitter::Language) -> Self {
        Self {
            language,
            aliases: Vec::new(),
            _library: None,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn language(&self) -> &tree_sitter::Language {
        &self.language
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Load `name` from `dir`
    ///
    /// `Ok(None)` means the library exists but doesn't export the language.
    pub fn load(name: &str, dir: &Path) -> Result<Option<Self>, ImportError> {
        let lib_path = library_path(dir, name);
        if !lib_path.exists() {
            return Err(ImportError::Library {
                path: lib_path.display().to_string(),
                reason: "grammar not installed".to_string(),
            });
        }

        // Load the dynamic library
        let library = unsafe { Library::new(&lib_path) }.map_err(|e| ImportError::Library {
            path: lib_path.display().to_string(),
            reason: e.to_string(),
        })?;

        // Get the language function
        let func_name = symbol_name(name);
        let language = unsafe {
            let func: Symbol<unsafe extern "C" fn() -> tree_sitter::Language> =
                match library.get(func_name.as_bytes()) {
                    Ok(func) => func,
                    Err(_) => return Ok(None),
                };
            func()
        };

        Ok(Some(Self {
            language,
            aliases: default_aliases(name).iter().map(|a| a.to_string()).collect(),
            _library: Some(Arc::new(library)),
        }))
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("aliases", &self.aliases)
            .field("dynamic", &self._library.is_some())
            .finish()
    }
}

/// Library path for a grammar
pub fn library_path(dir: &Path, name: &str) -> PathBuf {
    #[cfg(target_os = "macos")]
    let ext = "dylib";
    #[cfg(target_os = "windows")]
    let ext = "dll";
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let ext = "so";

    dir.join(format!("lib{}.{}", name, ext))
}

/// Exported language function for a grammar
pub fn symbol_name(name: &str) -> String {
    format!("tree_sitter_{}", name.replace('-', "_"))
}

/// Names of the grammar libraries installed in `dir`, sorted
pub fn installed_grammars(dir: &Path) -> Result<Vec<String>, ImportError> {
    let probe = library_path(Path::new(""), "x");
    let ext = probe
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("so")
        .to_string();

    let entries = std::fs::read_dir(dir).map_err(|e| ImportError::Library {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ext.as_str()) {
                return None;
            }
            let stem = path.file_stem()?.to_str()?;
            stem.strip_prefix("lib").map(str::to_string)
        })
        .collect();
    names.sort();
    Ok(names)
}

/// Module loader for a single grammar library
pub fn grammar_loader(name: impl Into<String>, dir: impl Into<PathBuf>) -> ModuleLoader<Grammar> {
    let name = name.into();
    let dir = dir.into();
    loader(move || {
        let name = name.clone();
        let dir = dir.clone();
        async move {
            let module_name = name.clone();
            let grammar = tokio::task::spawn_blocking(move || Grammar::load(&name, &dir))
                .await
                .map_err(|e| ImportError::failed(module_name, e))??;
            Ok(Module::from(grammar))
        }
    })
}

/// Aliases a grammar answers to besides its own name
pub fn default_aliases(name: &str) -> &'static [&'static str] {
    match name {
        "rust" => &["rs"],
        "python" => &["py", "py3", "python3", "pyw"],
        "javascript" => &["js", "jsx", "mjs", "cjs"],
        "typescript" => &["ts", "mts", "cts"],
        "go" => &["golang"],
        "c" => &["h"],
        "cpp" => &["c++", "cc", "cxx", "hpp", "hh"],
        "bash" => &["sh", "shell", "zsh"],
        "json" => &["jsonc"],
        "markdown" => &["md"],
        "ruby" => &["rb"],
        "yaml" => &["yml"],
        "html" => &["htm", "xhtml"],
        "c-sharp" => &["cs", "csharp"],
        "kotlin" => &["kt", "kts"],
        _ => &[],
    }
}
