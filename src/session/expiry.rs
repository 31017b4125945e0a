//! Expiry manager: timed session teardown and route swapping.
//!
//! Each scheduled teardown captures the session generation it was created
//! for. When it fires it only removes the session if the store still holds
//! that generation, so a newer login for the same client survives a stale
//! timer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::session::{ClientIdentity, RouteTable, SessionStore};

/// Clients holding each protected path, with the generation they hold it at.
type Holders = HashMap<String, HashMap<ClientIdentity, u64>>;

/// Schedules and executes session teardown.
#[derive(Clone)]
pub struct ExpiryManager {
    store: Arc<dyn SessionStore>,
    routes: Arc<dyn RouteTable>,
    holders: Arc<Mutex<Holders>>,
}

impl ExpiryManager {
    pub fn new(store: Arc<dyn SessionStore>, routes: Arc<dyn RouteTable>) -> Self {
        Self {
            store,
            routes,
            holders: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bind `path` for `client` and tear the session down after `timeout`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(
        &self,
        client: ClientIdentity,
        path: &str,
        generation: u64,
        timeout: Duration,
    ) -> JoinHandle<()> {
        self.hold(&client, path, generation);

        tracing::info!(
            client = %client,
            path = %path,
            timeout_secs = timeout.as_secs(),
            "Setting session timeout"
        );

        let manager = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            manager.teardown(&client, generation);
        })
    }

    /// Record `client` as a holder of `path` and make sure it is bound.
    pub fn hold(&self, client: &ClientIdentity, path: &str, generation: u64) {
        let mut holders = self.holders.lock();
        holders
            .entry(path.to_string())
            .or_default()
            .insert(client.clone(), generation);
        self.routes.bind(path);
    }

    /// Tear down the session of `client` if it is still at `generation`.
    ///
    /// Returns whether anything was removed.
    pub fn teardown(&self, client: &ClientIdentity, generation: u64) -> bool {
        let mut holders = self.holders.lock();
        if !self.store.compare_and_swap(client, generation, None) {
            tracing::debug!(
                client = %client,
                generation,
                "Skipping stale session teardown"
            );
            return false;
        }

        self.release(&mut holders, client, generation);
        tracing::info!(client = %client, "Session cleared");
        true
    }

    /// Tear down the current session of `client` immediately (logout).
    pub fn expire_now(&self, client: &ClientIdentity) -> bool {
        let mut holders = self.holders.lock();
        match self.store.delete(client) {
            Some(record) => {
                self.release(&mut holders, client, record.generation);
                tracing::info!(client = %client, "Session cleared on logout");
                true
            }
            None => {
                tracing::warn!(client = %client, "No session found");
                false
            }
        }
    }

    /// Drop `client` from every path it holds at or below `generation` and
    /// unbind paths left without holders.
    fn release(&self, holders: &mut Holders, client: &ClientIdentity, generation: u64) {
        let mut emptied = Vec::new();
        for (path, clients) in holders.iter_mut() {
            if clients.get(client).is_some_and(|held| *held <= generation) {
                clients.remove(client);
            }
            if clients.is_empty() {
                emptied.push(path.clone());
            }
        }

        for path in emptied {
            holders.remove(&path);
            self.routes.unbind(&path);
        }
    }
}
