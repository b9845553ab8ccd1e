//! Ambient engine slot
//!
//! An engine that was already loaded elsewhere in the process can be installed
//! here. A loader created while the slot is filled publishes that engine
//! right away and imports nothing.

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::engine::EngineHandle;

#[derive(Clone, Default)]
pub struct Ambient {
    slot: Arc<RwLock<Option<EngineHandle>>>,
}

impl Ambient {
    /// The process-wide slot
    pub fn process() -> Self {
        static PROCESS: OnceLock<Ambient> = OnceLock::new();
        PROCESS.get_or_init(Ambient::default).clone()
    }

    /// A slot shared with nobody else
    pub fn isolated() -> Self {
        Self::default()
    }

    pub fn engine(&self) -> Option<EngineHandle> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Expose `engine`. Replaces whatever was installed before.
    pub fn install(&self, engine: EngineHandle) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(engine);
    }
}

impl fmt::Debug for Ambient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ambient")
            .field("engine", &self.engine().is_some())
            .finish()
    }
}
