//! Shared bridge state

use crate::registry::RouteTable;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared state between the registry refresh loop and the fetch jobs.
#[derive(Clone, Default)]
pub struct AppState {
    /// Current route table from the registry
    pub routes: Arc<RwLock<RouteTable>>,

    /// Last relayed timestamp per (race, vehicle key)
    last_seen: Arc<RwLock<HashMap<(String, String), i64>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the newest timestamp for a vehicle.
    ///
    /// Returns false when `at` repeats the stored timestamp, meaning the
    /// feed has produced nothing new and the fix should not be relayed
    /// again.
    pub async fn mark_seen(&self, race: &str, vehicle: &str, at: i64) -> bool {
        let mut last_seen = self.last_seen.write().await;
        let key = (race.to_string(), vehicle.to_string());
        match last_seen.get(&key) {
            Some(&previous) if previous == at => false,
            _ => {
                last_seen.insert(key, at);
                true
            }
        }
    }
}
