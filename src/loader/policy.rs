//! Library resolution policy
//!
//! Decides what to import from `HighlightOptions`, rejecting contradictory
//! or incomplete options before anything is fetched.

use std::fmt;

use super::module::ModuleLoader;
use crate::config::HighlightOptions;
use crate::engine::EngineHandle;
use crate::error::ConfigError;
use crate::syntax::Grammar;

/// What the loader will import
#[derive(Clone)]
pub enum LoadPlan {
    /// Full library with every language built in
    Full(ModuleLoader<EngineHandle>),
    /// Core library, then every language registered under its key
    Core {
        core: ModuleLoader<EngineHandle>,
        languages: Vec<(String, ModuleLoader<Grammar>)>,
    },
}

impl LoadPlan {
    pub fn is_full(&self) -> bool {
        matches!(self, LoadPlan::Full(_))
    }

    /// Language names the plan registers, in load order
    pub fn language_names(&self) -> Vec<&str> {
        match self {
            LoadPlan::Full(_) => Vec::new(),
            LoadPlan::Core { languages, .. } => {
                languages.iter().map(|(name, _)| name.as_str()).collect()
            }
        }
    }
}

impl fmt::Debug for LoadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPlan::Full(_) => f.write_str("LoadPlan::Full"),
            LoadPlan::Core { .. } => f
                .debug_struct("LoadPlan::Core")
                .field("languages", &self.language_names())
                .finish(),
        }
    }
}

/// Validate `options` and pick a plan. The first failing rule wins.
pub fn resolve(options: &HighlightOptions) -> Result<LoadPlan, ConfigError> {
    let full = options.full_library_loader.as_ref();
    let core = options.core_library_loader.as_ref();
    let has_languages = !options.languages.is_empty();

    if full.is_some() && core.is_some() {
        return Err(ConfigError::ConflictingLoaders);
    }
    if full.is_some() && has_languages {
        return Err(ConfigError::RedundantLanguages);
    }
    if core.is_some() && !has_languages {
        return Err(ConfigError::MissingLanguages);
    }
    if core.is_none() && has_languages {
        return Err(ConfigError::MissingCoreLoader);
    }

    if let Some(full) = full {
        return Ok(LoadPlan::Full(full.clone()));
    }
    if let Some(core) = core {
        let languages = options
            .languages
            .iter()
            .map(|(name, loader)| (name.clone(), loader.clone()))
            .collect();
        return Ok(LoadPlan::Core {
            core: core.clone(),
            languages,
        });
    }

    Err(ConfigError::NoLoaderConfigured)
}
