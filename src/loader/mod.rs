//! Lazy library loading
//!
//! `resolve` validates the options, the importer fetches modules, and the
//! readiness gate holds the engine once it's loaded. `HighlightLoader` ties
//! them together.

mod ambient;
mod gate;
mod library;
mod module;
mod policy;

pub use ambient::Ambient;
pub use gate::{GateStatus, ReadyGate};
pub use library::HighlightLoader;
pub use module::{Module, ModuleFuture, ModuleLoader, import_module, loader};
pub use policy::{LoadPlan, resolve};
