//! Configuration
//!
//! - `HighlightOptions` says how the engine is obtained and is handed to the loader once
//! - `HighlightConfig` is the engine's global configuration, passed through verbatim
//! - `Settings` drive the command line tool and come from a Rhai script

mod options;
mod settings;

pub use options::{HighlightConfig, HighlightOptions};
pub use settings::{LoadMode, OutputFormat, Settings};
