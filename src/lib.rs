//! Lazy loading and readiness for a syntax-highlighting engine
//!
//! `HighlightOptions` describes how to obtain the engine: a full library, or a
//! core library plus language modules. `HighlightLoader` validates the options,
//! imports the modules and publishes the engine through a readiness gate.
//! `HighlightService` and `HighlightBinding` wait on that gate before doing any
//! work.

pub mod binding;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod logging;
pub mod scripting;
pub mod service;
pub mod syntax;

pub use binding::HighlightBinding;
pub use config::{HighlightConfig, HighlightOptions};
pub use engine::{EngineHandle, HighlightEngine, HighlightResult};
pub use error::{ConfigError, EngineError, ImportError, LoadError};
pub use loader::HighlightLoader;
pub use service::HighlightService;
