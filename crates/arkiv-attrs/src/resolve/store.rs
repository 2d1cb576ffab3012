//! The entity store interface the resolver reads through, and an in-memory
//! implementation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::model::{EntityKey, EntitySnapshot};

/// Failure reported by an entity store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("entity not found")]
    NotFound,

    #[error("chain {chain_id} is not known to this store")]
    UnknownChain { chain_id: u64 },

    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Read access to entities, possibly across chains.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetches one entity by chain and key.
    async fn fetch_entity(&self, chain_id: u64, key: &EntityKey) -> Result<EntitySnapshot, StoreError>;

    /// The entity being read, used for references without an entity key.
    fn current_entity_context(&self) -> Option<EntitySnapshot>;
}

#[derive(Default)]
struct StoreState {
    entities: FxHashMap<(u64, String), EntitySnapshot>,
    chains: FxHashSet<u64>,
    unavailable: FxHashMap<u64, String>,
    current: Option<EntitySnapshot>,
}

/// In-memory store keyed by chain and lowercase entity key.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
    fetches: AtomicUsize,
    latency: Option<Duration>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reachable chain with no entities.
    pub fn with_chain(self, chain_id: u64) -> Self {
        self.write().chains.insert(chain_id);
        self
    }

    /// Delays every fetch, to let concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Stores an entity, registering its chain.
    pub fn insert(&self, chain_id: u64, entity: EntitySnapshot) {
        let mut state = self.write();
        state.chains.insert(chain_id);
        state.entities.insert((chain_id, entity.key.normalized()), entity);
    }

    /// Removes an entity, returning it if present.
    pub fn remove(&self, chain_id: u64, key: &EntityKey) -> Option<EntitySnapshot> {
        self.write().entities.remove(&(chain_id, key.normalized()))
    }

    /// Sets the entity used for references without a key.
    pub fn set_current(&self, entity: Option<EntitySnapshot>) {
        self.write().current = entity;
    }

    /// Makes fetches on `chain_id` fail as unavailable, or clears that state.
    pub fn set_unavailable(&self, chain_id: u64, reason: Option<&str>) {
        let mut state = self.write();
        match reason {
            Some(reason) => {
                state.unavailable.insert(chain_id, reason.to_string());
            }
            None => {
                state.unavailable.remove(&chain_id);
            }
        }
    }

    /// Number of `fetch_entity` calls served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn fetch_entity(&self, chain_id: u64, key: &EntityKey) -> Result<EntitySnapshot, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.read();
        if let Some(reason) = state.unavailable.get(&chain_id) {
            return Err(StoreError::Unavailable { reason: reason.clone() });
        }
        if !state.chains.contains(&chain_id) {
            return Err(StoreError::UnknownChain { chain_id });
        }
        state
            .entities
            .get(&(chain_id, key.normalized()))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn current_entity_context(&self) -> Option<EntitySnapshot> {
        self.read().current.clone()
    }
}
