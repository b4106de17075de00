use std::cell::RefCell;
use std::collections::HashMap;

use ringlink_rpc::Unsubscribe;
use tracing::warn;

/// A keyed registry of live listener teardowns.
///
/// Every `on_*_changed` subscription the core takes out is registered here under a string key
/// (`"track:{id}:mute"`, `"focus:selected_track"`, ...) so it can be torn down individually, in
/// bulk by prefix (a track leaving the ring), or all at once (`destroy`).
#[derive(Default)]
pub struct SubscriptionGroup {
    entries: RefCell<HashMap<String, Unsubscribe>>,
}

impl SubscriptionGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `unsub` under `key`. If something was already registered under that key, it's
    /// torn down first — callers never have to remove-then-add by hand.
    pub async fn add(&self, key: impl Into<String>, unsub: Unsubscribe) {
        let key = key.into();
        let prior = self.entries.borrow_mut().insert(key.clone(), unsub);
        if let Some(prior) = prior {
            if let Err(err) = prior().await {
                warn!(key, error = %err, "failed to tear down prior subscription before replacing it");
            }
        }
    }

    pub async fn remove(&self, key: &str) {
        let unsub = self.entries.borrow_mut().remove(key);
        if let Some(unsub) = unsub {
            if let Err(err) = unsub().await {
                warn!(key, error = %err, "failed to unsubscribe");
            }
        }
    }

    /// Tears down every entry whose key starts with `prefix`, e.g. `"track:{id}:"` when a track
    /// leaves the ring. Callers are responsible for including whatever separator keeps the prefix
    /// from matching a sibling id (`"track:a:"`, not `"track:a"`).
    pub async fn remove_by_prefix(&self, prefix: &str) {
        let keys: Vec<String> = self
            .entries
            .borrow()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        for key in keys {
            self.remove(&key).await;
        }
    }

    /// Tears down everything, concurrently — used on shutdown, where ordering between entries
    /// doesn't matter and there may be dozens of them.
    pub async fn clear(&self) {
        let entries: Vec<(String, Unsubscribe)> = self.entries.borrow_mut().drain().collect();
        let teardowns = entries.into_iter().map(|(key, unsub)| async move {
            if let Err(err) = unsub().await {
                warn!(key, error = %err, "failed to unsubscribe during clear");
            }
        });
        futures::future::join_all(teardowns).await;
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}
