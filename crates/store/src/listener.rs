use core::fmt;
use std::sync::Arc;

use agora_primitives::entry::{ContentHash, StoreEntry};

/// Observer of committed store mutations.
///
/// Callbacks run synchronously on the store's task, after the map and the
/// ledger have been updated; they must not block.
pub trait StoreListener: Send + Sync + 'static {
    fn on_added(&self, hash: &ContentHash, entry: &StoreEntry);

    fn on_removed(&self, hash: &ContentHash, entry: &StoreEntry);
}

#[derive(Clone, Default)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn StoreListener>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ListenerRegistry {
    pub fn register(&mut self, listener: Arc<dyn StoreListener>) {
        self.listeners.push(listener);
    }

    pub fn notify_added(&self, hash: &ContentHash, entry: &StoreEntry) {
        for listener in &self.listeners {
            listener.on_added(hash, entry);
        }
    }

    pub fn notify_removed(&self, hash: &ContentHash, entry: &StoreEntry) {
        for listener in &self.listeners {
            listener.on_removed(hash, entry);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
