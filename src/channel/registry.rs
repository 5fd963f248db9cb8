//! Routing-key → handler registry shared between the read loop and
//! sensor lifecycle events.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::PayloadHandler;

/// Thread-safe mapping of routing keys to payload handlers.
///
/// At most one handler is active per key; registering a second handler
/// for the same key replaces the first (last-writer-wins). Clones share
/// the same underlying map, so the read loop and registration calls can
/// hold their own handles.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    handlers: Arc<RwLock<HashMap<String, PayloadHandler>>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `sensor_id`, replacing any previous handler
    /// for the same key.
    pub fn register(&self, sensor_id: &str, handler: PayloadHandler) {
        let mut handlers = self.handlers.write().expect("registry lock poisoned");
        handlers.insert(sensor_id.to_string(), handler);
    }

    /// Remove the handler for `sensor_id`, if registered.
    pub fn deregister(&self, sensor_id: &str) {
        let mut handlers = self.handlers.write().expect("registry lock poisoned");
        handlers.remove(sensor_id);
    }

    /// Invoke the handler registered for `sensor_id` with the payload
    /// tokens of one frame.
    ///
    /// Returns `false` when no handler is registered for the key; the
    /// caller drops the frame.
    ///
    /// The handler is cloned out of the map before the call so dispatch
    /// never holds the registry lock while user code runs.
    pub fn dispatch(&self, sensor_id: &str, tokens: &[&str]) -> bool {
        let handler = {
            let handlers = self.handlers.read().expect("registry lock poisoned");
            handlers.get(sensor_id).cloned()
        };

        match handler {
            Some(handler) => {
                handler(tokens);
                true
            }
            None => false,
        }
    }

    /// Whether a handler is currently registered for `sensor_id`.
    #[must_use]
    pub fn is_registered(&self, sensor_id: &str) -> bool {
        let handlers = self.handlers.read().expect("registry lock poisoned");
        handlers.contains_key(sensor_id)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        let handlers = self.handlers.read().expect("registry lock poisoned");
        handlers.len()
    }

    /// Whether the registry has no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().expect("registry lock poisoned");
        f.debug_struct("CallbackRegistry")
            .field("keys", &handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
