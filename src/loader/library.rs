//! Library loader
//!
//! Drives the load routine: resolve the options, import the engine (and its
//! languages), attach plugins, optionally install line numbers, then publish
//! to the readiness gate. The routine runs at most once per loader.

use std::sync::Arc;

use futures::future::try_join_all;

use super::ambient::Ambient;
use super::gate::{GateStatus, ReadyGate};
use super::module::import_module;
use super::policy::{LoadPlan, resolve};
use crate::config::HighlightOptions;
use crate::engine::{EngineHandle, MergeHtmlPlugin};
use crate::error::{ConfigError, ImportError, LoadError};

#[derive(Debug)]
pub struct HighlightLoader {
    options: HighlightOptions,
    gate: ReadyGate,
    ambient: Ambient,
}

impl HighlightLoader {
    /// Loader backed by the process-wide ambient slot
    pub fn new(options: HighlightOptions) -> Self {
        Self::with_ambient(options, Ambient::process())
    }

    /// Loader backed by `ambient`. An engine already installed there is
    /// published immediately.
    pub fn with_ambient(options: HighlightOptions, ambient: Ambient) -> Self {
        let gate = ReadyGate::new();
        if let Some(engine) = ambient.engine() {
            tracing::debug!("Found an ambient highlighting engine, skipping load");
            gate.publish(engine);
        }
        Self {
            options,
            gate,
            ambient,
        }
    }

    pub fn options(&self) -> &HighlightOptions {
        &self.options
    }

    pub fn gate(&self) -> &ReadyGate {
        &self.gate
    }

    pub fn status(&self) -> GateStatus {
        self.gate.status()
    }

    /// Wait for the engine
    pub async fn ready(&self) -> EngineHandle {
        self.gate.ready().await
    }

    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce(EngineHandle) + Send + 'static,
    {
        self.gate.on_ready(callback);
    }

    /// Validate the options and spawn the load routine
    ///
    /// Configuration errors are returned here, before anything is fetched,
    /// and again on every later call. Import failures only reach the log.
    ///
    /// # Panics
    ///
    /// Spawns onto the current tokio runtime, so it panics when called
    /// outside of one.
    pub fn start(self: &Arc<Self>) -> Result<(), ConfigError> {
        match self.gate.status() {
            GateStatus::Empty => {}
            GateStatus::Failed(_) => return resolve(&self.options).map(|_| ()),
            GateStatus::Loading | GateStatus::Ready => return Ok(()),
        }

        if let Err(e) = resolve(&self.options) {
            tracing::error!("{}", e);
            self.gate.fail(e.to_string());
            return Err(e);
        }

        let loader = Arc::clone(self);
        tokio::spawn(async move {
            // Already logged
            let _ = loader.load().await;
        });
        Ok(())
    }

    /// Run the load routine to completion
    ///
    /// Returns `Ok` without doing anything if loading already started.
    pub async fn load(&self) -> Result<(), LoadError> {
        if !self.gate.begin_loading() {
            tracing::debug!("Highlighting library already loading or loaded");
            return Ok(());
        }

        match self.load_engine().await {
            Ok(engine) => {
                self.gate.publish(engine);
                tracing::info!("Highlighting library ready");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to load the highlighting library: {}", e);
                self.gate.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn load_engine(&self) -> Result<EngineHandle, LoadError> {
        let plan = resolve(&self.options)?;
        tracing::debug!("Loading highlighting library: {:?}", plan);

        let engine = match plan {
            LoadPlan::Full(full) => import_module("full library", &full)
                .await?
                .ok_or(LoadError::MissingEngine { loader: "full" })?,
            LoadPlan::Core { core, languages } => {
                let engine = import_module("core library", &core)
                    .await?
                    .ok_or(LoadError::MissingEngine { loader: "core" })?;

                let loads = languages.into_iter().map(|(name, loader)| {
                    let engine = Arc::clone(&engine);
                    async move {
                        if let Some(grammar) = import_module(&name, &loader).await? {
                            engine.register_language(&name, grammar);
                        }
                        Ok::<_, ImportError>(())
                    }
                });
                try_join_all(loads).await?;
                engine
            }
        };

        engine.add_plugin(Arc::new(MergeHtmlPlugin));

        if let Some(line_numbers_loader) = &self.options.line_numbers_loader {
            // The line-number module extends whatever engine is ambient
            self.ambient.install(Arc::clone(&engine));
            if let Some(line_numbers) = import_module("line numbers", line_numbers_loader).await? {
                engine.extend_line_numbers(line_numbers);
            }
        }

        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::{Barrier, Notify};

    use crate::engine::testing::{FakeEngine, rust_grammar};
    use crate::engine::{HighlightEngine, LineNumbers};
    use crate::loader::{Module, ModuleLoader, loader};
    use crate::syntax::Grammar;

    type Events = Arc<Mutex<Vec<String>>>;

    fn engine_loader(engine: &Arc<FakeEngine>, events: &Events, tag: &str) -> ModuleLoader<EngineHandle> {
        let engine = Arc::clone(engine);
        let events = Arc::clone(events);
        let tag = tag.to_string();
        loader(move || {
            let engine: EngineHandle = engine.clone();
            let events = Arc::clone(&events);
            let tag = tag.clone();
            async move {
                events.lock().unwrap().push(tag);
                Ok(Module::new(engine))
            }
        })
    }

    fn grammar(events: &Events, tag: &str) -> ModuleLoader<Grammar> {
        let events = Arc::clone(events);
        let tag = tag.to_string();
        loader(move || {
            let events = Arc::clone(&events);
            let tag = tag.clone();
            async move {
                events.lock().unwrap().push(tag);
                Ok(Module::new(rust_grammar()))
            }
        })
    }

    fn counting<T: Send + 'static>(calls: &Arc<AtomicUsize>) -> ModuleLoader<T> {
        let calls = Arc::clone(calls);
        loader(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ImportError::failed("counted", "should not be fetched")) }
        })
    }

    fn isolated(options: HighlightOptions) -> Arc<HighlightLoader> {
        Arc::new(HighlightLoader::with_ambient(options, Ambient::isolated()))
    }

    async fn wait_for(loader: &HighlightLoader) -> Option<EngineHandle> {
        tokio::time::timeout(Duration::from_secs(5), loader.ready())
            .await
            .ok()
    }

    #[tokio::test]
    async fn test_core_with_languages_loads_concurrently() {
        let engine = Arc::new(FakeEngine::default());
        let events: Events = Default::default();
        let barrier = Arc::new(Barrier::new(2));

        // Each language load only finishes once the other one has started
        let language = |tag: &'static str| {
            let events = Arc::clone(&events);
            let barrier = Arc::clone(&barrier);
            loader(move || {
                let events = Arc::clone(&events);
                let barrier = Arc::clone(&barrier);
                async move {
                    barrier.wait().await;
                    events.lock().unwrap().push(tag.to_string());
                    Ok(Module::new(rust_grammar()))
                }
            })
        };

        let options = HighlightOptions::new()
            .core_library(engine_loader(&engine, &events, "core"))
            .language("python", language("python"))
            .language("go", language("go"));
        let l = isolated(options);
        l.start().unwrap();

        let ready = wait_for(&l).await.expect("engine never became ready");
        let ready_again = l.ready().await;
        assert!(Arc::ptr_eq(&ready, &ready_again));

        let mut registered = engine.list_languages();
        registered.sort();
        assert_eq!(registered, vec!["go".to_string(), "python".to_string()]);
        assert_eq!(events.lock().unwrap()[0], "core");
        assert_eq!(events.lock().unwrap().len(), 3);
        assert_eq!(engine.plugin_count(), 1);
        assert_eq!(l.status(), GateStatus::Ready);
    }

    #[tokio::test]
    async fn test_conflicting_loaders_fail_before_fetching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = HighlightOptions::new()
            .full_library(counting(&calls))
            .core_library(counting(&calls));
        let l = isolated(options);

        assert_eq!(l.start(), Err(ConfigError::ConflictingLoaders));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // Every caller sees the error, not only the first
        assert_eq!(l.start(), Err(ConfigError::ConflictingLoaders));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(matches!(l.status(), GateStatus::Failed(_)));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), l.ready())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_line_numbers_load_after_core_and_languages() {
        let engine = Arc::new(FakeEngine::default());
        let events: Events = Default::default();
        let release = Arc::new(Notify::new());
        let ambient = Ambient::isolated();

        let line_numbers = {
            let events = Arc::clone(&events);
            let release = Arc::clone(&release);
            let ambient = ambient.clone();
            loader(move || {
                let events = Arc::clone(&events);
                let release = Arc::clone(&release);
                let ambient = ambient.clone();
                async move {
                    release.notified().await;
                    let tag = if ambient.engine().is_some() {
                        "line-numbers (ambient)"
                    } else {
                        "line-numbers"
                    };
                    events.lock().unwrap().push(tag.to_string());
                    Ok(Module::new(LineNumbers::new()))
                }
            })
        };

        let options = HighlightOptions::new()
            .core_library(engine_loader(&engine, &events, "core"))
            .language("rust", grammar(&events, "rust"))
            .line_numbers(line_numbers);
        let l = Arc::new(HighlightLoader::with_ambient(options, ambient));
        l.start().unwrap();

        // Core and languages finish, line numbers are still pending
        while events.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(l.status(), GateStatus::Loading);
        assert!(!l.gate().is_ready());

        release.notify_one();
        let ready = wait_for(&l).await.expect("engine never became ready");

        assert_eq!(
            *events.lock().unwrap(),
            vec!["core", "rust", "line-numbers (ambient)"]
        );
        assert!(ready.line_numbers().is_some());
        assert_eq!(engine.line_numbers.lock().unwrap().as_ref(), Some(&LineNumbers::new()));
    }

    #[tokio::test]
    async fn test_ambient_engine_skips_loading() {
        let ambient = Ambient::isolated();
        let existing = Arc::new(FakeEngine::default());
        ambient.install(existing.clone());

        let calls = Arc::new(AtomicUsize::new(0));
        let options = HighlightOptions::new().full_library(counting(&calls));
        let l = Arc::new(HighlightLoader::with_ambient(options, ambient));

        assert_eq!(l.status(), GateStatus::Ready);
        l.start().unwrap();
        let ready = l.ready().await;
        let existing: EngineHandle = existing.clone();
        assert!(Arc::ptr_eq(&ready, &existing));

        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ambient_engine_gets_no_plugins() {
        let ambient = Ambient::isolated();
        let existing = Arc::new(FakeEngine::default());
        ambient.install(existing.clone());

        let l = HighlightLoader::with_ambient(HighlightOptions::new(), ambient);
        assert!(l.load().await.is_ok());
        assert_eq!(existing.plugin_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_import_stalls_the_gate() {
        let options = HighlightOptions::new().full_library(loader(|| async {
            Err(ImportError::failed("full library", "connection reset"))
        }));
        let l = isolated(options);

        let err = l.load().await.unwrap_err();
        assert!(matches!(err, LoadError::Import(_)));
        assert!(matches!(l.status(), GateStatus::Failed(_)));
        assert!(
            tokio::time::timeout(Duration::from_millis(50), l.ready())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_failed_language_stalls_the_gate() {
        let engine = Arc::new(FakeEngine::default());
        let events: Events = Default::default();
        let options = HighlightOptions::new()
            .core_library(engine_loader(&engine, &events, "core"))
            .language("rust", grammar(&events, "rust"))
            .language("go", loader(|| async { Err(ImportError::failed("go", "404")) }));
        let l = isolated(options);

        assert!(l.load().await.is_err());
        assert!(!l.gate().is_ready());
    }

    #[tokio::test]
    async fn test_start_after_failed_import_is_quiet() {
        let calls = Arc::new(AtomicUsize::new(0));
        let options = HighlightOptions::new().full_library(counting(&calls));
        let l = isolated(options);

        assert!(l.load().await.is_err());
        assert_eq!(l.start(), Ok(()));
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_engine_without_default_export_fails() {
        let options = HighlightOptions::new().full_library(loader(|| async { Ok(Module::empty()) }));
        let l = isolated(options);
        assert_eq!(
            l.load().await,
            Err(LoadError::MissingEngine { loader: "full" })
        );
    }

    #[tokio::test]
    async fn test_language_without_default_export_counts_as_done() {
        let engine = Arc::new(FakeEngine::default());
        let events: Events = Default::default();
        let options = HighlightOptions::new()
            .core_library(engine_loader(&engine, &events, "core"))
            .language("rust", grammar(&events, "rust"))
            .language("empty", loader(|| async { Ok(Module::empty()) }));
        let l = isolated(options);

        l.load().await.unwrap();
        assert!(l.gate().is_ready());
        assert_eq!(engine.list_languages(), vec!["rust".to_string()]);
    }

    #[tokio::test]
    async fn test_load_runs_once() {
        let engine = Arc::new(FakeEngine::default());
        let events: Events = Default::default();
        let options = HighlightOptions::new().full_library(engine_loader(&engine, &events, "full"));
        let l = isolated(options);

        l.load().await.unwrap();
        l.load().await.unwrap();
        l.start().unwrap();
        tokio::task::yield_now().await;

        assert_eq!(*events.lock().unwrap(), vec!["full"]);
        assert_eq!(engine.plugin_count(), 1);
    }
}
