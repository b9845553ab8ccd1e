//! Error types
//!
//! Configuration errors are detected before anything is loaded and are never
//! retryable. Import and load errors are swallowed at the readiness gate and
//! only ever reach the log (or whoever drives `HighlightLoader::load` directly).

use thiserror::Error;

/// Contradictory or incomplete `HighlightOptions`
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("The full library and the core library were imported, only one of them should be imported!")]
    ConflictingLoaders,

    #[error("The highlighting languages were imported they are not needed!")]
    RedundantLanguages,

    #[error("The highlighting languages were not imported!")]
    MissingLanguages,

    #[error("The core library was not imported!")]
    MissingCoreLoader,

    #[error("Highlight library was not imported!")]
    NoLoaderConfigured,
}

/// A deferred module fetch that rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Failed to import module {module}: {reason}")]
    Failed { module: String, reason: String },

    #[error("Failed to open library {path}: {reason}")]
    Library { path: String, reason: String },
}

impl ImportError {
    pub fn failed<E: std::fmt::Display>(module: impl Into<String>, e: E) -> Self {
        Self::Failed {
            module: module.into(),
            reason: e.to_string(),
        }
    }
}

/// Everything the load routine can end with
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("The {loader} library loader produced no engine")]
    MissingEngine { loader: &'static str },
}

/// Failures reported by a highlighting engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Unknown language: \"{0}\"")]
    UnknownLanguage(String),

    #[error("Parser error: {0}")]
    Parser(String),
}

/// Config script failures
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Script parse error: {0}")]
    Parse(String),

    #[error("Script error: {0}")]
    Eval(String),
}

pub type Result<T> = std::result::Result<T, LoadError>;
