//! Sequential counter identifiers such as `SKU-00042`.
//!
//! Each allocation is one atomic increment-and-fetch against the shared
//! [`CounterStore`]. There is no retry and no in-process locking: the store's
//! atomicity alone makes every returned value unique per namespace. Nothing
//! is cached locally, so any number of processes can allocate concurrently.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::CounterConfig;
use crate::store::CounterStore;
use crate::IdentError;

/// Widest padding honoured; a `u64` count never needs more digits.
pub const MAX_PAD_WIDTH: usize = 20;

/// Allocates `{namespace}-{zero-padded count}` identifiers.
#[derive(Clone)]
pub struct CounterAllocator {
    store: Arc<dyn CounterStore>,
    config: CounterConfig,
}

impl CounterAllocator {
    /// Creates an allocator over `store`.
    pub fn new(store: Arc<dyn CounterStore>, config: CounterConfig) -> Self {
        Self { store, config }
    }

    /// Allocates the next identifier in `namespace`.
    ///
    /// The count is zero-padded to `pad_width` digits. Counts that need more
    /// digits are rendered in full rather than truncated. Widths above
    /// [`MAX_PAD_WIDTH`] are treated as `MAX_PAD_WIDTH`.
    ///
    /// Fails with [`IdentError::StoreUnavailable`] if the store cannot
    /// complete the increment; no fallback value is produced.
    pub async fn allocate(&self, namespace: &str, pad_width: usize) -> Result<String, IdentError> {
        if namespace.trim().is_empty() {
            return Err(IdentError::InvalidNamespace(namespace.to_string()));
        }

        let count = match self.store.increment(namespace).await {
            Ok(count) => count,
            Err(e) => {
                warn!(namespace, error = %e, "Counter increment failed");
                return Err(e);
            }
        };

        let pad_width = pad_width.min(MAX_PAD_WIDTH);
        let id = format!("{namespace}-{count:0pad_width$}");
        debug!(namespace, count, id = %id, "Allocated counter identifier");
        Ok(id)
    }

    /// Allocates with the configured default pad width.
    pub async fn allocate_default(&self, namespace: &str) -> Result<String, IdentError> {
        self.allocate(namespace, self.config.default_pad_width).await
    }

    /// Returns the last issued count for `namespace` without allocating.
    pub async fn current(&self, namespace: &str) -> Result<Option<u64>, IdentError> {
        self.store.current(namespace).await
    }
}

/// A parsed counter identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterId {
    namespace: String,
    sequence: u64,
}

impl CounterId {
    /// Parses `{namespace}-{digits}`, splitting on the last `-`.
    pub fn parse(s: &str) -> Result<Self, IdentError> {
        let malformed = || IdentError::MalformedIdentifier(s.to_string());

        let (namespace, digits) = s.rsplit_once('-').ok_or_else(malformed)?;
        if namespace.trim().is_empty()
            || digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let sequence = digits.parse().map_err(|_| malformed())?;

        Ok(Self {
            namespace: namespace.to_string(),
            sequence,
        })
    }

    /// The namespace (prefix) part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl std::str::FromStr for CounterId {
    type Err = IdentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A best-effort display label for something not yet persisted.
///
/// Not unique and not durable. It is a separate type so it cannot be passed
/// where an allocated identifier is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionalLabel(String);

impl ProvisionalLabel {
    /// Returns the label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProvisionalLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds `{prefix}-{last six digits of the unix time in seconds}`.
pub fn provisional_label(prefix: &str, clock: &dyn Clock) -> ProvisionalLabel {
    let secs = clock.now().timestamp().rem_euclid(1_000_000);
    ProvisionalLabel(format!("{prefix}-{secs:06}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use proptest::prelude::*;

    fn allocator() -> (Arc<MemoryStore>, CounterAllocator) {
        let store = Arc::new(MemoryStore::new());
        let allocator = CounterAllocator::new(store.clone(), CounterConfig::default());
        (store, allocator)
    }

    #[tokio::test]
    async fn test_sku_after_prior_count() {
        let (store, allocator) = allocator();
        store.seed_counter("SKU", 41);

        let id = allocator.allocate("SKU", 5).await.unwrap();
        assert_eq!(id, "SKU-00042");
        assert_eq!(store.current("SKU").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_first_allocation_creates_counter() {
        let (_, allocator) = allocator();
        assert_eq!(allocator.current("ORD").await.unwrap(), None);
        assert_eq!(allocator.allocate_default("ORD").await.unwrap(), "ORD-00001");
        assert_eq!(allocator.current("ORD").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_padding_grows_instead_of_truncating() {
        let (store, allocator) = allocator();
        store.seed_counter("SKU", 99_999);
        assert_eq!(allocator.allocate("SKU", 5).await.unwrap(), "SKU-100000");

        assert_eq!(allocator.allocate("SKU", 0).await.unwrap(), "SKU-100001");
    }

    #[tokio::test]
    async fn test_pad_width_is_capped() {
        let (store, allocator) = allocator();
        assert_eq!(
            allocator.allocate("SKU", usize::MAX).await.unwrap(),
            "SKU-00000000000000000001"
        );

        store.seed_counter("SKU", u64::MAX - 1);
        let id = allocator.allocate("SKU", MAX_PAD_WIDTH).await.unwrap();
        assert_eq!(id, format!("SKU-{}", u64::MAX));
        assert_eq!(id.len(), "SKU-".len() + MAX_PAD_WIDTH);
    }

    #[tokio::test]
    async fn test_empty_namespace_rejected_without_store_access() {
        let (store, allocator) = allocator();
        let err = allocator.allocate("  ", 5).await.unwrap_err();
        assert!(matches!(err, IdentError::InvalidNamespace(_)));
        assert_eq!(store.increment_count(), 0);
    }

    #[tokio::test]
    async fn test_store_unavailable_is_propagated() {
        let (store, allocator) = allocator();
        store.seed_counter("SKU", 41);
        store.set_unavailable(true);

        let err = allocator.allocate("SKU", 5).await.unwrap_err();
        assert!(err.is_store_unavailable());

        store.set_unavailable(false);
        assert_eq!(store.current("SKU").await.unwrap(), Some(41));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_never_repeat() {
        let (_, allocator) = allocator();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let allocator = allocator.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..50 {
                    ids.push(allocator.allocate("SKU", 5).await.unwrap());
                }
                ids
            }));
        }

        let mut counts = Vec::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                counts.push(CounterId::parse(&id).unwrap().sequence());
            }
        }
        counts.sort_unstable();
        let expected: Vec<u64> = (1..=800).collect();
        assert_eq!(counts, expected);
    }

    #[test]
    fn test_counter_id_parse() {
        let id: CounterId = "SKU-00042".parse().unwrap();
        assert_eq!(id.namespace(), "SKU");
        assert_eq!(id.sequence(), 42);

        let id = CounterId::parse("GIFT-CARD-7").unwrap();
        assert_eq!(id.namespace(), "GIFT-CARD");
        assert_eq!(id.sequence(), 7);

        for bad in ["", "SKU", "SKU-", "-00042", "SKU-42a", "SKU-+42"] {
            assert!(
                matches!(CounterId::parse(bad), Err(IdentError::MalformedIdentifier(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_provisional_label() {
        let clock = FixedClock::from_millis(1_700_000_123_456);
        let label = provisional_label("SKU", &clock);
        assert_eq!(label.as_str(), "SKU-000123");
        assert_eq!(label.to_string(), "SKU-000123");
    }

    proptest! {
        #[test]
        fn prop_sequential_allocations_strictly_increase(n in 1usize..64, seed in 0u64..1_000_000) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (store, allocator) = allocator();
            store.seed_counter("SKU", seed);

            let counts: Vec<u64> = rt.block_on(async {
                let mut counts = Vec::new();
                for _ in 0..n {
                    let id = allocator.allocate("SKU", 5).await.unwrap();
                    counts.push(CounterId::parse(&id).unwrap().sequence());
                }
                counts
            });

            prop_assert_eq!(counts.len(), n);
            prop_assert_eq!(counts[0], seed + 1);
            prop_assert!(counts.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }
}
