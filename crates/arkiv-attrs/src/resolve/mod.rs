//! Reference resolution against an entity store.
//!
//! A reference is first made *effective*: a missing entity key is filled
//! from the store's current entity. Resolution then goes through the
//! [`ResolutionCache`], which coalesces concurrent lookups and remembers
//! both successes and failures.
//!
//! What a reference yields depends on its target:
//!
//! - `$payload`: the entity payload, gated by content type then size
//! - `$field`: a system metadata field
//! - `#name`: a custom attribute, decoded by its name's category

pub mod cache;
pub mod config;
pub mod payload;
pub mod store;

pub use cache::{CacheKey, CacheStats, ResolutionCache, ResolutionResult};
pub use config::ResolverConfig;
pub use payload::Payload;
pub use store::{EntityStore, InMemoryStore, StoreError};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::codec;
use crate::error::{ConfigError, ResolveError};
use crate::model::{
    ArkivRef, AttributeValue, Category, ChainId, EntitySnapshot, Scope, SystemField, WireValue,
};

/// A successfully resolved value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// A decoded custom attribute.
    Attribute(AttributeValue),
    /// A system metadata field as stored.
    System(WireValue),
    /// A payload that passed its gates.
    Payload(Payload),
}

/// Resolves references with caching and coalescing. Cheap to clone.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn EntityStore>,
    config: Arc<ResolverConfig>,
    cache: ResolutionCache,
}

impl Resolver {
    /// Validates `config` and builds a resolver over `store`.
    pub fn new(store: Arc<dyn EntityStore>, config: ResolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = ResolutionCache::new(
            config.cache_capacity,
            config.positive_ttl(),
            config.negative_ttl(),
        );
        info!(
            max_payload_bytes = config.max_payload_bytes,
            allowed_content_types = config.allowed_content_types.len(),
            cache_capacity = config.cache_capacity,
            positive_ttl_ms = config.positive_ttl_ms,
            negative_ttl_ms = config.negative_ttl_ms,
            max_reference_depth = config.max_reference_depth,
            "Resolver initialized"
        );
        Ok(Self { store, config: Arc::new(config), cache })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// Resolves `reference` for a caller on `caller_chain`.
    pub async fn resolve(&self, reference: &ArkivRef, caller_chain: u64) -> ResolutionResult {
        let mut current = self.effective(reference)?;
        let mut depth = 0;
        loop {
            match self.resolve_once(&current, caller_chain).await? {
                Resolved::Attribute(AttributeValue::Reference(next))
                    if depth < self.config.max_reference_depth =>
                {
                    depth += 1;
                    let next = next.relative_to(&current);
                    debug!(from = %current, to = %next, depth, "following nested reference");
                    current = next;
                }
                resolved => return Ok(resolved),
            }
        }
    }

    /// Like [`Resolver::resolve`], but gives up after `timeout`.
    ///
    /// Only this caller sees the timeout; the fetch keeps running and its
    /// result is cached for later lookups.
    pub async fn resolve_with_timeout(
        &self,
        reference: &ArkivRef,
        caller_chain: u64,
        timeout: Duration,
    ) -> ResolutionResult {
        tokio::time::timeout(timeout, self.resolve(reference, caller_chain))
            .await
            .unwrap_or_else(|_| {
                debug!(reference = %reference, ?timeout, "resolution timed out");
                Err(ResolveError::Timeout { after: timeout })
            })
    }

    /// Parses and resolves a reference string.
    pub async fn resolve_str(&self, reference: &str, caller_chain: u64) -> ResolutionResult {
        let reference: ArkivRef = reference.parse()?;
        self.resolve(&reference, caller_chain).await
    }

    /// Fills a missing entity key from the store's current entity.
    fn effective(&self, reference: &ArkivRef) -> Result<ArkivRef, ResolveError> {
        if reference.entity.is_some() {
            return Ok(reference.clone());
        }
        match self.store.current_entity_context() {
            Some(entity) => Ok(reference.clone().of_entity(entity.key)),
            None => Err(ResolveError::NotFound { reference: reference.to_string() }),
        }
    }

    async fn resolve_once(&self, effective: &ArkivRef, caller_chain: u64) -> ResolutionResult {
        let key = CacheKey::new(effective, caller_chain);
        let store = Arc::clone(&self.store);
        let config = Arc::clone(&self.config);
        let reference = effective.clone();
        self.cache
            .get_or_resolve(key, move || fetch_and_select(store, config, reference, caller_chain))
            .await
    }
}

async fn fetch_and_select(
    store: Arc<dyn EntityStore>,
    config: Arc<ResolverConfig>,
    reference: ArkivRef,
    caller_chain: u64,
) -> ResolutionResult {
    let routed = reference
        .chain
        .as_ref()
        .map(ChainId::value)
        .filter(|chain| *chain != caller_chain);
    let chain = routed.unwrap_or(caller_chain);

    let Some(key) = reference.entity.as_ref() else {
        return Err(ResolveError::NotFound { reference: reference.to_string() });
    };

    debug!(reference = %reference, chain, routed = routed.is_some(), "fetching entity");
    let entity = match store.fetch_entity(chain, key).await {
        Ok(entity) => entity,
        Err(StoreError::NotFound) => {
            return Err(ResolveError::NotFound { reference: reference.to_string() });
        }
        Err(err) if routed.is_some() => {
            debug!(chain, error = %err, "routed chain unreachable");
            return Err(ResolveError::ChainMismatch { requested: chain, caller: caller_chain });
        }
        Err(err) => return Err(ResolveError::StoreUnavailable { reason: err.to_string() }),
    };

    select(&entity, &reference, &config)
}

/// Picks the value a reference targets out of a fetched entity.
pub fn select(entity: &EntitySnapshot, reference: &ArkivRef, config: &ResolverConfig) -> ResolutionResult {
    let not_found = || ResolveError::NotFound { reference: reference.to_string() };

    if reference.is_payload() {
        return payload::gate_payload(entity, &config.allowed_content_types, config.max_payload_bytes)
            .map(Resolved::Payload);
    }

    match reference.scope {
        Scope::System => SystemField::from_name(&reference.name)
            .and_then(|field| entity.system_field(field))
            .map(Resolved::System)
            .ok_or_else(not_found),
        Scope::Custom => {
            let wire = entity.attributes.get(&reference.name).ok_or_else(not_found)?;
            codec::decode(Category::infer(&reference.name), wire)
                .map(Resolved::Attribute)
                .map_err(|source| ResolveError::ValidationFailed {
                    name: reference.name.clone(),
                    source,
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::model::{EntityKey, GeoCoordinate};
    use bytes::Bytes;

    const CALLER: u64 = 1;

    fn key(s: &str) -> EntityKey {
        EntityKey::parse(s).unwrap()
    }

    fn profile() -> EntitySnapshot {
        EntitySnapshot::new(key("0xabc"))
            .with_owner("0xowner")
            .with_blocks(10, 12, 1000)
            .with_payload(Bytes::from_static(b"{\"bio\":\"hi\"}"), "application/json")
            .with_attribute("createdAt", "2024-03-15T14:30:00+05:30")
            .with_attribute("homeLat", 138_856_613u64)
            .with_attribute("languages", "[en,de]")
            .with_attribute("homepageUrl", "ftp://not-a-web-link")
            .with_attribute("avatarRef", "arkiv:0xdef#imageUrl")
    }

    fn avatar() -> EntitySnapshot {
        EntitySnapshot::new(key("0xdef"))
            .with_attribute("imageUrl", "https://cdn.example/a.png")
            .with_attribute("selfRef", "arkiv:#selfRef")
    }

    fn store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.insert(CALLER, profile());
        store.insert(CALLER, avatar());
        Arc::new(store)
    }

    fn resolver_with(store: Arc<InMemoryStore>, config: ResolverConfig) -> Resolver {
        Resolver::new(store, config).unwrap()
    }

    fn resolver(store: Arc<InMemoryStore>) -> Resolver {
        resolver_with(store, ResolverConfig::default())
    }

    #[tokio::test]
    async fn test_custom_attributes() {
        let resolver = resolver(store());

        let created = resolver.resolve_str("arkiv:0xabc#createdAt", CALLER).await.unwrap();
        let Resolved::Attribute(AttributeValue::Timestamp(ts)) = created else {
            panic!("expected timestamp, got {created:?}");
        };
        assert_eq!(ts.offset_min, 330);

        assert_eq!(
            resolver.resolve_str("arkiv:0xABC#homeLat", CALLER).await.unwrap(),
            Resolved::Attribute(AttributeValue::Geo(GeoCoordinate::latitude(48.856613).unwrap()))
        );
        assert_eq!(
            resolver.resolve_str("arkiv:0xabc#languages", CALLER).await.unwrap(),
            Resolved::Attribute(AttributeValue::TokenArray(vec!["en".into(), "de".into()]))
        );
    }

    #[tokio::test]
    async fn test_missing_attribute_and_entity() {
        let resolver = resolver(store());
        assert!(matches!(
            resolver.resolve_str("arkiv:0xabc#nickname", CALLER).await,
            Err(ResolveError::NotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve_str("arkiv:0x999#nickname", CALLER).await,
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_stored_value() {
        let resolver = resolver(store());
        let err = resolver.resolve_str("arkiv:0xabc#homepageUrl", CALLER).await.unwrap_err();
        assert!(matches!(
            err,
            ResolveError::ValidationFailed { ref name, source: CodecError::InvalidUrl { .. } }
                if name == "homepageUrl"
        ));
    }

    #[tokio::test]
    async fn test_system_fields() {
        let resolver = resolver(store());
        assert_eq!(
            resolver.resolve_str("arkiv:0xabc$owner", CALLER).await.unwrap(),
            Resolved::System(WireValue::from("0xowner"))
        );
        assert_eq!(
            resolver.resolve_str("arkiv:0xabc$expiresAtBlock", CALLER).await.unwrap(),
            Resolved::System(WireValue::Uint(1000))
        );
        assert_eq!(
            resolver.resolve_str("arkiv:0xabc$key", CALLER).await.unwrap(),
            Resolved::System(WireValue::from("0xabc"))
        );
        assert!(matches!(
            resolver.resolve_str("arkiv:0xabc$balance", CALLER).await,
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_relative_reference_uses_current_entity() {
        let store = store();
        let resolver = resolver(Arc::clone(&store));
        assert!(matches!(
            resolver.resolve_str("arkiv:$owner", CALLER).await,
            Err(ResolveError::NotFound { .. })
        ));

        store.set_current(Some(profile()));
        assert_eq!(
            resolver.resolve_str("$owner", CALLER).await.unwrap(),
            Resolved::System(WireValue::from("0xowner"))
        );

        // A different current entity is a different cache key.
        store.set_current(Some(avatar()));
        assert_eq!(
            resolver.resolve_str("#imageUrl", CALLER).await.unwrap(),
            Resolved::Attribute(AttributeValue::Url("https://cdn.example/a.png".into()))
        );
    }

    #[tokio::test]
    async fn test_payload_gating() {
        let resolver = resolver(store());
        let resolved = resolver.resolve_str("arkiv:0xabc$payload", CALLER).await.unwrap();
        let Resolved::Payload(payload) = resolved else {
            panic!("expected payload, got {resolved:?}");
        };
        assert_eq!(payload.content_type, "application/json");
        assert_eq!(payload.bytes, Bytes::from_static(b"{\"bio\":\"hi\"}"));

        // Legacy spelling, only when unqualified.
        let current = store();
        current.set_current(Some(profile()));
        let legacy = self::resolver(current);
        assert!(matches!(
            legacy.resolve_str("#payload", CALLER).await,
            Ok(Resolved::Payload(_))
        ));
        assert!(matches!(
            legacy.resolve_str("arkiv:0xabc#payload", CALLER).await,
            Err(ResolveError::NotFound { .. })
        ));

        let strict = resolver_with(
            store(),
            ResolverConfig { max_payload_bytes: 4, ..ResolverConfig::default() },
        );
        assert_eq!(
            strict.resolve_str("arkiv:0xabc$payload", CALLER).await,
            Err(ResolveError::SizeExceeded { size: 12, limit: 4 })
        );

        let text_only = resolver_with(
            store(),
            ResolverConfig {
                allowed_content_types: ["text/plain".to_string()].into_iter().collect(),
                ..ResolverConfig::default()
            },
        );
        assert_eq!(
            text_only.resolve_str("arkiv:0xabc$payload", CALLER).await,
            Err(ResolveError::ContentTypeRejected { content_type: "application/json".into() })
        );
    }

    #[tokio::test]
    async fn test_chain_routing() {
        let store = store();
        store.insert(137, EntitySnapshot::new(key("0x77")).with_owner("0xpolygon"));
        let resolver = resolver(Arc::clone(&store));

        assert_eq!(
            resolver.resolve_str("arkiv:137:0x77$owner", CALLER).await.unwrap(),
            Resolved::System(WireValue::from("0xpolygon"))
        );
        // Same chain as the caller is not routed.
        assert!(resolver.resolve_str("arkiv:1:0xabc$owner", CALLER).await.is_ok());
        assert_eq!(
            resolver.resolve_str("arkiv:999:0xabc$owner", CALLER).await,
            Err(ResolveError::ChainMismatch { requested: 999, caller: CALLER })
        );

        store.set_unavailable(137, Some("rpc down"));
        assert_eq!(
            resolver.resolve_str("arkiv:137:0x77$key", CALLER).await,
            Err(ResolveError::ChainMismatch { requested: 137, caller: CALLER })
        );
    }

    #[tokio::test]
    async fn test_store_unavailable_on_own_chain() {
        let store = store();
        store.set_unavailable(CALLER, Some("rpc down"));
        let resolver = resolver(store);
        assert!(matches!(
            resolver.resolve_str("arkiv:0xabc$owner", CALLER).await,
            Err(ResolveError::StoreUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_parse_errors_surface() {
        let resolver = resolver(store());
        assert!(matches!(
            resolver.resolve_str("arkiv:0xabc", CALLER).await,
            Err(ResolveError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_nested_references() {
        let flat = resolver(store());
        assert_eq!(
            flat.resolve_str("arkiv:0xabc#avatarRef", CALLER).await.unwrap(),
            Resolved::Attribute(AttributeValue::Reference("arkiv:0xdef#imageUrl".parse().unwrap()))
        );

        let following = resolver_with(
            store(),
            ResolverConfig { max_reference_depth: 2, ..ResolverConfig::default() },
        );
        assert_eq!(
            following.resolve_str("arkiv:0xabc#avatarRef", CALLER).await.unwrap(),
            Resolved::Attribute(AttributeValue::Url("https://cdn.example/a.png".into()))
        );

        // A self-reference stops at the depth cap.
        assert_eq!(
            following.resolve_str("arkiv:0xdef#selfRef", CALLER).await.unwrap(),
            Resolved::Attribute(AttributeValue::Reference(ArkivRef::custom("selfRef")))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolutions_fetch_once() {
        let store = Arc::new(
            InMemoryStore::new().with_latency(Duration::from_millis(20)),
        );
        store.insert(CALLER, profile());
        let resolver = resolver(Arc::clone(&store));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = resolver.clone();
                tokio::spawn(async move { resolver.resolve_str("arkiv:0xabc$owner", CALLER).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(Resolved::System(WireValue::from("0xowner"))));
        }
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_poison_other_callers() {
        let store = Arc::new(
            InMemoryStore::new().with_latency(Duration::from_millis(100)),
        );
        store.insert(CALLER, profile());
        let resolver = resolver(Arc::clone(&store));
        let reference: ArkivRef = "arkiv:0xabc$owner".parse().unwrap();

        let (impatient, patient) = tokio::join!(
            resolver.resolve_with_timeout(&reference, CALLER, Duration::from_millis(10)),
            resolver.resolve(&reference, CALLER),
        );
        assert_eq!(impatient, Err(ResolveError::Timeout { after: Duration::from_millis(10) }));
        assert_eq!(patient, Ok(Resolved::System(WireValue::from("0xowner"))));
        assert_eq!(store.fetch_count(), 1);

        // The timed-out caller retries and hits the cache.
        assert!(resolver.resolve_with_timeout(&reference, CALLER, Duration::from_millis(10)).await.is_ok());
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_cache_expires() {
        let store = store();
        let resolver = resolver(Arc::clone(&store));
        let reference = "arkiv:0x42$owner";

        assert!(matches!(resolver.resolve_str(reference, CALLER).await, Err(ResolveError::NotFound { .. })));
        store.insert(CALLER, EntitySnapshot::new(key("0x42")).with_owner("0xlate"));
        assert!(matches!(resolver.resolve_str(reference, CALLER).await, Err(ResolveError::NotFound { .. })));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(
            resolver.resolve_str(reference, CALLER).await,
            Ok(Resolved::System(WireValue::from("0xlate")))
        );
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ResolverConfig { cache_capacity: 0, ..ResolverConfig::default() };
        assert!(matches!(
            Resolver::new(store(), config),
            Err(ConfigError::Invalid { field: "cache_capacity", .. })
        ));
    }
}
