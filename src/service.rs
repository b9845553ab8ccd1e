//! Highlighting service
//!
//! Async facade over the loaded engine. Every operation waits for the
//! readiness gate, then delegates. If the engine never loads, operations never
//! complete; wrap them in `tokio::time::timeout` when that matters.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::config::HighlightConfig;
use crate::engine::{CodeElement, EngineHandle, HighlightResult, LanguageInfo};
use crate::error::EngineError;
use crate::loader::HighlightLoader;
use crate::syntax::Grammar;

#[derive(Clone)]
pub struct HighlightService {
    loader: Arc<HighlightLoader>,
    engine: Arc<OnceLock<EngineHandle>>,
}

impl HighlightService {
    /// Service over `loader`. The loader's global config is applied as soon
    /// as the engine is ready.
    pub fn new(loader: Arc<HighlightLoader>) -> Self {
        let engine = Arc::new(OnceLock::new());
        let config = loader.options().config.clone();

        let slot = Arc::clone(&engine);
        loader.on_ready(move |loaded| {
            if let Some(config) = &config {
                apply_config(&loaded, config);
            }
            let _ = slot.set(loaded);
        });

        Self { loader, engine }
    }

    pub fn loader(&self) -> &Arc<HighlightLoader> {
        &self.loader
    }

    /// The engine, once it's ready
    pub fn engine(&self) -> Option<EngineHandle> {
        self.engine.get().cloned()
    }

    async fn ready(&self) -> EngineHandle {
        self.loader.ready().await
    }

    /// Highlight `code` as `language` (a name or an alias)
    pub async fn highlight(
        &self,
        code: &str,
        language: &str,
        ignore_illegals: bool,
    ) -> Result<HighlightResult, EngineError> {
        self.ready().await.highlight(code, language, ignore_illegals)
    }

    /// Highlight with language detection. A subset overrides the configured one.
    pub async fn highlight_auto(
        &self,
        code: &str,
        language_subset: Option<&[String]>,
    ) -> HighlightResult {
        self.ready().await.highlight_auto(code, language_subset)
    }

    pub async fn highlight_element(&self, element: &mut CodeElement) {
        self.ready().await.highlight_element(element);
    }

    /// Highlight every block not highlighted yet
    pub async fn init_highlighting(&self, blocks: &mut [CodeElement]) {
        self.ready().await.init_highlighting(blocks);
    }

    pub async fn configure(&self, config: &HighlightConfig) {
        apply_config(&self.ready().await, config);
    }

    pub async fn register_language(&self, name: &str, grammar: Grammar) -> EngineHandle {
        let engine = self.ready().await;
        engine.register_language(name, grammar);
        engine
    }

    pub async fn list_languages(&self) -> Vec<String> {
        self.ready().await.list_languages()
    }

    /// Look up a language by name or alias
    pub async fn get_language(&self, name: &str) -> Option<LanguageInfo> {
        self.ready().await.get_language(name)
    }

    /// Add line numbers to a highlighted block
    ///
    /// `None` when the engine has no line-number support.
    pub async fn line_numbers_block(&self, element: &mut CodeElement) -> Option<()> {
        self.ready().await.line_numbers_block(element)
    }
}

impl fmt::Debug for HighlightService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighlightService")
            .field("loader", &self.loader)
            .field("engine", &self.engine.get().is_some())
            .finish()
    }
}

fn apply_config(engine: &EngineHandle, config: &HighlightConfig) {
    engine.configure(config);
    if engine.list_languages().is_empty() {
        tracing::error!("No languages were registered!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::config::HighlightOptions;
    use crate::engine::{HighlightEngine, LineNumbers};
    use crate::engine::testing::{FakeEngine, rust_grammar};
    use crate::loader::{Ambient, Module, loader};

    fn service_for(engine: &Arc<FakeEngine>, config: Option<HighlightConfig>) -> HighlightService {
        let engine = Arc::clone(engine);
        let mut options = HighlightOptions::new().full_library(loader(move || {
            let engine: EngineHandle = engine.clone();
            async move { Ok(Module::new(engine)) }
        }));
        if let Some(config) = config {
            options = options.config(config);
        }
        let l = Arc::new(HighlightLoader::with_ambient(options, Ambient::isolated()));
        HighlightService::new(l)
    }

    #[tokio::test]
    async fn test_operations_wait_for_ready() {
        let engine = Arc::new(FakeEngine::with_languages(&["rust"]));
        let service = service_for(&engine, None);

        let pending = {
            let service = service.clone();
            tokio::spawn(async move { service.list_languages().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());
        assert!(service.engine().is_none());

        service.loader().start().unwrap();
        assert_eq!(pending.await.unwrap(), vec!["rust".to_string()]);
        assert!(service.engine().is_some());
    }

    #[tokio::test]
    async fn test_config_applied_on_ready() {
        let engine = Arc::new(FakeEngine::with_languages(&["rust"]));
        let config = HighlightConfig {
            class_prefix: "x-".to_string(),
            ..Default::default()
        };
        let service = service_for(&engine, Some(config.clone()));
        service.loader().load().await.unwrap();

        assert_eq!(*engine.config.lock().unwrap(), Some(config));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_config_applied_before_loader_waiters_wake() {
        let engine = Arc::new(FakeEngine::with_languages(&["rust"]));
        let config = HighlightConfig {
            tab_replace: Some("  ".to_string()),
            ..Default::default()
        };
        let service = service_for(&engine, Some(config.clone()));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let loader = Arc::clone(service.loader());
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    loader.ready().await;
                    engine.config.lock().unwrap().clone()
                })
            })
            .collect();
        // Service callback plus the four waiters
        while service.loader().gate().pending() < 5 {
            tokio::task::yield_now().await;
        }

        service.loader().start().unwrap();
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Some(config.clone()));
        }
    }

    #[tokio::test]
    async fn test_delegates_to_engine() {
        let engine = Arc::new(FakeEngine::with_languages(&["rust"]));
        let service = service_for(&engine, None);
        service.loader().load().await.unwrap();

        let result = service.highlight("a<b", "rust", false).await.unwrap();
        assert_eq!(result.value.as_deref(), Some("a&lt;b"));
        assert_eq!(
            service.highlight("x", "go", false).await,
            Err(EngineError::UnknownLanguage("go".to_string()))
        );

        let subset = vec!["python".to_string()];
        let auto = service.highlight_auto("x", Some(&subset)).await;
        assert_eq!(auto.language.as_deref(), Some("python"));

        service.register_language("go", rust_grammar()).await;
        assert!(service.get_language("go").await.is_some());

        let mut blocks = vec![CodeElement::with_text("x"), CodeElement::with_text("y")];
        service.init_highlighting(&mut blocks).await;
        assert!(blocks.iter().all(|b| b.has_class("hljs")));
    }

    #[tokio::test]
    async fn test_repeated_calls_delegate_each_time() {
        let engine = Arc::new(FakeEngine::with_languages(&["rust"]));
        let service = service_for(&engine, None);
        service.loader().load().await.unwrap();

        let first = service.highlight("let x;", "rust", false).await;
        let second = service.highlight("let x;", "rust", false).await;
        assert_eq!(first, second);
        assert_eq!(engine.call_count(), 2);
    }

    #[tokio::test]
    async fn test_line_numbers_block_needs_support() {
        let engine = Arc::new(FakeEngine::with_languages(&["rust"]));
        let service = service_for(&engine, None);
        service.loader().load().await.unwrap();

        let mut element = CodeElement::with_text("a\nb");
        assert_eq!(service.line_numbers_block(&mut element).await, None);
        assert_eq!(element.inner_html(), "a\nb");

        engine.extend_line_numbers(LineNumbers::new());
        assert_eq!(service.line_numbers_block(&mut element).await, Some(()));
        assert_eq!(element.first_element_tag(), Some("table"));
    }

    #[tokio::test]
    async fn test_never_ready_never_resolves() {
        let service = HighlightService::new(Arc::new(HighlightLoader::with_ambient(
            HighlightOptions::new(),
            Ambient::isolated(),
        )));
        assert!(service.loader().start().is_err());
        let waited =
            tokio::time::timeout(Duration::from_millis(50), service.list_languages()).await;
        assert!(waited.is_err());
    }
}
