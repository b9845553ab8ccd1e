//! Scripting module - Rhai runtime for configuration
//!
//! Functions are exposed under the `lark` namespace, like the editor's:
//! - `lark::highlight::*` - grammars, load mode, output options

mod api;
mod engine;

pub use engine::ScriptEngine;
