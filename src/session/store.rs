//! Session store: issued sessions and failure counters per client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::session::{ClientIdentity, SessionRecord};

/// Process-local session state.
///
/// Implementations must be safe for concurrent use from many requests and
/// must hold any internal lock only briefly.
pub trait SessionStore: Send + Sync {
    /// Current session for `client`, if any.
    fn get(&self, client: &ClientIdentity) -> Option<SessionRecord>;

    /// Store `record` for `client`, returning the record it replaced.
    fn put(&self, client: ClientIdentity, record: SessionRecord) -> Option<SessionRecord>;

    /// Remove the session for `client`, whatever its generation.
    fn delete(&self, client: &ClientIdentity) -> Option<SessionRecord>;

    /// Replace the session for `client` only if its generation is `expected`.
    ///
    /// `replacement = None` deletes. Returns whether the swap happened.
    fn compare_and_swap(
        &self,
        client: &ClientIdentity,
        expected: u64,
        replacement: Option<SessionRecord>,
    ) -> bool;

    /// Allocate the next session generation.
    fn next_generation(&self) -> u64;

    /// Increment the failure counter for `client`, returning the new count.
    fn record_failure(&self, client: &ClientIdentity) -> u32;

    /// Reset the failure counter for `client` to zero.
    fn reset_failures(&self, client: &ClientIdentity);

    /// Current failure count for `client`.
    fn failures(&self, client: &ClientIdentity) -> u32;
}

/// Clients whose failures are tracked at once before the stalest is dropped.
pub const DEFAULT_FAILURE_CAPACITY: usize = 10_000;

struct FailureCount {
    count: u32,
    last_failure: Instant,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<ClientIdentity, SessionRecord>,
    failures: HashMap<ClientIdentity, FailureCount>,
}

/// In-memory [`SessionStore`] behind a single mutex.
///
/// Failure counters are bounded: once `failure_capacity` clients are
/// tracked, a new one displaces the client whose last failure is oldest.
pub struct MemorySessionStore {
    inner: Mutex<Inner>,
    generation: AtomicU64,
    failure_capacity: usize,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_failure_capacity(DEFAULT_FAILURE_CAPACITY)
    }

    pub fn with_failure_capacity(failure_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            generation: AtomicU64::new(0),
            failure_capacity: failure_capacity.max(1),
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().sessions.is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, client: &ClientIdentity) -> Option<SessionRecord> {
        self.inner.lock().sessions.get(client).cloned()
    }

    fn put(&self, client: ClientIdentity, record: SessionRecord) -> Option<SessionRecord> {
        self.inner.lock().sessions.insert(client, record)
    }

    fn delete(&self, client: &ClientIdentity) -> Option<SessionRecord> {
        self.inner.lock().sessions.remove(client)
    }

    fn compare_and_swap(
        &self,
        client: &ClientIdentity,
        expected: u64,
        replacement: Option<SessionRecord>,
    ) -> bool {
        let mut inner = self.inner.lock();
        match inner.sessions.get(client) {
            Some(current) if current.generation == expected => {
                match replacement {
                    Some(record) => {
                        inner.sessions.insert(client.clone(), record);
                    }
                    None => {
                        inner.sessions.remove(client);
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn record_failure(&self, client: &ClientIdentity) -> u32 {
        let mut inner = self.inner.lock();
        let now = Instant::now();

        if let Some(entry) = inner.failures.get_mut(client) {
            entry.count = entry.count.saturating_add(1);
            entry.last_failure = now;
            return entry.count;
        }

        if inner.failures.len() >= self.failure_capacity {
            let stalest = inner
                .failures
                .iter()
                .min_by_key(|(_, entry)| entry.last_failure)
                .map(|(identity, _)| identity.clone());
            if let Some(stalest) = stalest {
                tracing::debug!(client = %stalest, "Dropping stalest failure counter");
                inner.failures.remove(&stalest);
            }
        }

        inner.failures.insert(
            client.clone(),
            FailureCount {
                count: 1,
                last_failure: now,
            },
        );
        1
    }

    fn reset_failures(&self, client: &ClientIdentity) {
        self.inner.lock().failures.remove(client);
    }

    fn failures(&self, client: &ClientIdentity) -> u32 {
        self.inner
            .lock()
            .failures
            .get(client)
            .map_or(0, |entry| entry.count)
    }
}
