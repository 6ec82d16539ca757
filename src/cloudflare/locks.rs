use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

/// Serializes edge operations per domain within this process.
///
/// Entries are created on first use and never removed; the map grows with
/// the number of distinct domains touched.
#[derive(Clone, Default)]
pub struct DomainLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, domain: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = match self.inner.lock() {
                Ok(map) => map,
                Err(poisoned) => poisoned.into_inner(),
            };
            map.entry(domain.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
