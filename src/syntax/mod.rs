//! Built-in highlighting engine using Tree-sitter
//!
//! Grammars are shared libraries installed in `~/.config/lark/grammars/`,
//! the same directory the editor installs them to.

mod engine;
mod highlighter;
mod languages;

pub use engine::TreeSitterEngine;
pub use highlighter::{Highlight, HighlightKind};
pub use languages::{Grammar, default_aliases, grammar_loader, installed_grammars, library_path};
