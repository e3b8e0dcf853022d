//! Keyed cache of loaded models
//!
//! Each path gets its own slot. Loading happens under the slot's lock, so
//! concurrent requests for one path load it once while other paths proceed
//! independently. A failed load removes its slot again, so unresolvable
//! paths leave nothing behind.

use crate::model_loader::{LoadedModel, ModelLoader};
use parking_lot::Mutex;
use polarscore_core::Result;
use std::collections::HashMap;
use std::sync::Arc;

type Slot = Arc<Mutex<Option<Arc<LoadedModel>>>>;

/// Memoizing wrapper around another loader
pub struct CachingLoader<L> {
    inner: L,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<L: ModelLoader> CachingLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    /// Forget the model loaded for `path`, returning whether one was cached
    pub fn invalidate(&self, path: &str) -> bool {
        let slot = self.slots.lock().remove(path);
        let was_loaded = slot.map_or(false, |slot| slot.lock().is_some());
        if was_loaded {
            tracing::info!("Evicted cached model '{}'", path);
        }
        was_loaded
    }

    /// Number of paths with a loaded model
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of paths currently holding a slot, loaded or in flight
    pub fn tracked_paths(&self) -> usize {
        self.slots.lock().len()
    }

    /// Drop `slot` from the map unless it has already been replaced
    fn discard(&self, path: &str, slot: &Slot) {
        let mut slots = self.slots.lock();
        if slots.get(path).map_or(false, |current| Arc::ptr_eq(current, slot)) {
            slots.remove(path);
        }
    }

    fn is_current(&self, path: &str, slot: &Slot) -> bool {
        self.slots
            .lock()
            .get(path)
            .map_or(false, |current| Arc::ptr_eq(current, slot))
    }

    fn slot(&self, path: &str) -> Slot {
        self.slots
            .lock()
            .entry(path.to_string())
            .or_default()
            .clone()
    }
}

impl<L: ModelLoader> ModelLoader for CachingLoader<L> {
    fn load(&self, path: &str) -> Result<Arc<LoadedModel>> {
        loop {
            let slot = self.slot(path);
            let mut cached = slot.lock();

            if let Some(model) = cached.as_ref() {
                tracing::debug!("Model cache hit for '{}'", path);
                return Ok(Arc::clone(model));
            }

            // The slot was discarded by a failed load while we waited on it
            if !self.is_current(path, &slot) {
                continue;
            }

            tracing::debug!("Model cache miss for '{}'", path);
            return match self.inner.load(path) {
                Ok(model) => {
                    *cached = Some(Arc::clone(&model));
                    Ok(model)
                }
                Err(e) => {
                    self.discard(path, &slot);
                    Err(e)
                }
            };
        }
    }

    fn clear(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().drain().map(|(_, slot)| slot).collect();
        let released = slots.iter().filter(|slot| slot.lock().is_some()).count();
        tracing::info!("Cleared model cache ({} models released)", released);
        released
    }
}
