//! Code block binding
//!
//! Owns a code block and keeps its markup in sync with the code fed to it.
//! Every highlight result is also sent to subscribers.

use std::sync::Arc;

use futures::channel::mpsc;

use crate::engine::{CodeElement, HighlightResult};
use crate::service::HighlightService;

const LINE_NUMBERS_CLASS: &str = "hljs-line-numbers";

#[derive(Debug)]
pub struct HighlightBinding {
    service: Arc<HighlightService>,
    element: CodeElement,
    code: Option<String>,
    line_numbers: bool,
    subscribers: Vec<mpsc::UnboundedSender<HighlightResult>>,
}

impl HighlightBinding {
    pub fn new(service: Arc<HighlightService>) -> Self {
        Self {
            service,
            element: CodeElement::new().with_class("hljs"),
            code: None,
            line_numbers: false,
            subscribers: Vec::new(),
        }
    }

    /// Request line numbers. Only honored when a line-number loader is configured.
    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    pub fn element(&self) -> &CodeElement {
        &self.element
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Receive every highlight result from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<HighlightResult> {
        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// Feed new code to the block
    ///
    /// Empty or unchanged code is ignored and yields `None`. Otherwise the
    /// block is re-highlighted with language detection, restricted to
    /// `languages` when given.
    pub async fn set_code(
        &mut self,
        code: &str,
        languages: Option<&[String]>,
    ) -> Option<HighlightResult> {
        if code.is_empty() || self.code.as_deref() == Some(code) {
            return None;
        }
        self.code = Some(code.to_string());

        self.element.set_text_content(code);
        let result = self.service.highlight_auto(code, languages).await;
        self.element
            .set_inner_html(result.value.clone().unwrap_or_default());

        if self.line_numbers && self.service.loader().options().has_line_numbers() {
            self.add_line_numbers().await;
        }

        self.emit(&result);
        Some(result)
    }

    async fn add_line_numbers(&mut self) {
        if self
            .service
            .line_numbers_block(&mut self.element)
            .await
            .is_none()
        {
            return;
        }
        // Single-line blocks are left without a table
        if self.element.first_element_tag() == Some("table") {
            self.element.add_class(LINE_NUMBERS_CLASS);
        }
    }

    fn emit(&mut self, result: &HighlightResult) {
        self.subscribers
            .retain(|s| s.unbounded_send(result.clone()).is_ok());
    }
}
