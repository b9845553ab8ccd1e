//! Module importer
//!
//! A module loader is a producer of deferred modules: each call starts a fresh,
//! independent fetch. Importing awaits the fetch and hands back the module's
//! default export. A module without one contributes nothing, which is not an
//! error.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::error::ImportError;

/// A resolved module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module<T> {
    default: Option<T>,
}

impl<T> Module<T> {
    /// Module whose default export is `value`
    pub fn new(value: T) -> Self {
        Self {
            default: Some(value),
        }
    }

    /// Module without a default export
    pub fn empty() -> Self {
        Self { default: None }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn into_default(self) -> Option<T> {
        self.default
    }
}

impl<T> Default for Module<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Option<T>> for Module<T> {
    fn from(default: Option<T>) -> Self {
        Self { default }
    }
}

pub type ModuleFuture<T> = BoxFuture<'static, Result<Module<T>, ImportError>>;

/// Producer of a deferred module
pub type ModuleLoader<T> = Arc<dyn Fn() -> ModuleFuture<T> + Send + Sync>;

/// Wrap an async closure as a `ModuleLoader`
pub fn loader<T, F, Fut>(f: F) -> ModuleLoader<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Module<T>, ImportError>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Start the fetch and extract the default export
///
/// `Ok(None)` means the module resolved without a default export.
pub async fn import_module<T>(name: &str, loader: &ModuleLoader<T>) -> Result<Option<T>, ImportError> {
    let module = loader().await?;
    let export = module.into_default();
    if export.is_none() {
        tracing::warn!("Module {} has no default export, skipping", name);
    }
    Ok(export)
}
