//! Resolution cache with request coalescing.
//!
//! Concurrent lookups of the same key share one fetch: the first caller
//! registers a broadcast channel and spawns the fetch, later callers
//! subscribe to it. The fetch runs on its own task, so a caller that is
//! cancelled or times out does not cancel it and the outcome is still
//! cached for everyone else.
//!
//! Entries are evicted least-recently-used first through a tick-ordered
//! `BTreeMap` index.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::debug;

use super::Resolved;
use crate::error::ResolveError;
use crate::model::ArkivRef;

/// Outcome of resolving one reference. Failures are cached too.
pub type ResolutionResult = Result<Resolved, ResolveError>;

/// Identifies one cached resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    reference: String,
    caller_chain: u64,
}

impl CacheKey {
    /// Builds a key from the effective reference (current entity already
    /// filled in) and the caller's chain.
    pub fn new(effective: &ArkivRef, caller_chain: u64) -> Self {
        Self { reference: effective.to_string(), caller_chain }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn caller_chain(&self) -> u64 {
        self.caller_chain
    }
}

/// Counters and sizes for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Lookups that joined a fetch already in flight.
    pub coalesced: u64,
    pub evictions: u64,
    pub entries: usize,
    pub in_flight: usize,
}

struct CacheEntry {
    result: ResolutionResult,
    expires_at: Instant,
    tick: u64,
}

#[derive(Default)]
struct CacheState {
    entries: FxHashMap<CacheKey, CacheEntry>,
    /// Last-use tick -> key, oldest first.
    lru: BTreeMap<u64, CacheKey>,
    in_flight: FxHashMap<CacheKey, broadcast::Sender<ResolutionResult>>,
    next_tick: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.next_tick += 1;
        self.next_tick
    }

    /// Returns a fresh entry and marks it used; drops it if expired.
    fn lookup(&mut self, key: &CacheKey, now: Instant) -> Option<ResolutionResult> {
        let (old_tick, expired) = match self.entries.get(key) {
            Some(entry) => (entry.tick, entry.expires_at <= now),
            None => return None,
        };
        self.lru.remove(&old_tick);
        if expired {
            self.entries.remove(key);
            return None;
        }

        let tick = self.tick();
        self.lru.insert(tick, key.clone());
        let entry = self.entries.get_mut(key)?;
        entry.tick = tick;
        Some(entry.result.clone())
    }

    fn insert(&mut self, key: CacheKey, result: ResolutionResult, ttl: Duration, capacity: usize) {
        let tick = self.tick();
        let entry = CacheEntry { result, expires_at: Instant::now() + ttl, tick };
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            self.lru.remove(&previous.tick);
        }
        self.lru.insert(tick, key);

        while self.entries.len() > capacity {
            let Some((_, oldest)) = self.lru.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
            self.stats.evictions += 1;
            debug!(reference = %oldest.reference, caller_chain = oldest.caller_chain, "evicted cached resolution");
        }
    }

    fn remove(&mut self, key: &CacheKey) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.lru.remove(&entry.tick);
                true
            }
            None => false,
        }
    }
}

struct CacheInner {
    state: Mutex<CacheState>,
    capacity: usize,
    positive_ttl: Duration,
    negative_ttl: Duration,
}

impl CacheInner {
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns an in-flight registration. Completing it caches and broadcasts the
/// result; dropping it without completing (task panic, runtime shutdown)
/// unregisters the key so waiters see [`ResolveError::Aborted`].
struct InFlightGuard {
    inner: Arc<CacheInner>,
    key: CacheKey,
    sender: Option<broadcast::Sender<ResolutionResult>>,
}

impl InFlightGuard {
    fn complete(mut self, result: ResolutionResult) {
        let Some(sender) = self.sender.take() else {
            return;
        };
        let ttl = if result.is_ok() { self.inner.positive_ttl } else { self.inner.negative_ttl };
        {
            let mut state = self.inner.lock();
            state.in_flight.remove(&self.key);
            state.insert(self.key.clone(), result.clone(), ttl, self.inner.capacity);
        }
        // No receivers left is fine: the result is cached.
        let _ = sender.send(result);
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.sender.take().is_some() {
            self.inner.lock().in_flight.remove(&self.key);
        }
    }
}

/// Shared resolution cache. Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct ResolutionCache {
    inner: Arc<CacheInner>,
}

impl ResolutionCache {
    pub fn new(capacity: usize, positive_ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                state: Mutex::new(CacheState::default()),
                capacity: capacity.max(1),
                positive_ttl,
                negative_ttl,
            }),
        }
    }

    /// Returns the cached result for `key`, joins a fetch already in flight,
    /// or spawns `resolve` and waits for it.
    pub async fn get_or_resolve<F, Fut>(&self, key: CacheKey, resolve: F) -> ResolutionResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolutionResult> + Send + 'static,
    {
        let (mut receiver, leader) = {
            let mut state = self.inner.lock();
            if let Some(result) = state.lookup(&key, Instant::now()) {
                state.stats.hits += 1;
                debug!(reference = %key.reference, ok = result.is_ok(), "resolution cache hit");
                return result;
            }
            match state.in_flight.get(&key) {
                Some(sender) => {
                    let receiver = sender.subscribe();
                    state.stats.coalesced += 1;
                    debug!(reference = %key.reference, "joining in-flight resolution");
                    (receiver, None)
                }
                None => {
                    let (sender, receiver) = broadcast::channel(1);
                    state.in_flight.insert(key.clone(), sender.clone());
                    state.stats.misses += 1;
                    (receiver, Some(sender))
                }
            }
        };

        if let Some(sender) = leader {
            let guard = InFlightGuard { inner: Arc::clone(&self.inner), key, sender: Some(sender) };
            let fetch = resolve();
            tokio::spawn(async move {
                let result = fetch.await;
                guard.complete(result);
            });
        }

        receiver.recv().await.unwrap_or(Err(ResolveError::Aborted))
    }

    /// Returns a fresh cached result without resolving.
    pub fn get(&self, key: &CacheKey) -> Option<ResolutionResult> {
        self.inner.lock().lookup(key, Instant::now())
    }

    /// Drops one entry. Returns true if it was cached.
    pub fn evict(&self, key: &CacheKey) -> bool {
        self.inner.lock().remove(key)
    }

    /// Drops every cached entry. Fetches in flight are unaffected.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.entries.clear();
        state.lru.clear();
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut state = self.inner.lock();
        let expired: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            state.remove(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock();
        CacheStats {
            entries: state.entries.len(),
            in_flight: state.in_flight.len(),
            ..state.stats
        }
    }
}
