//! Allocator configuration.
//!
//! Configuration is stateless and shared by all concurrent callers. It can
//! be deserialized as part of a larger service config or loaded from
//! environment variables:
//!
//! - `IDENT_SLUG_MAX_ATTEMPTS` (default 10)
//! - `IDENT_SLUG_ENTROPY_HEX_LEN` (default 6)
//! - `IDENT_NAME_UNIQUE_TYPES` (comma-separated entity types, default none)
//! - `IDENT_COUNTER_PAD_WIDTH` (default 5)

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use serde::Deserialize;

/// Default number of random-suffix attempts after a slug conflict.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Default length of the random hex suffix.
pub const DEFAULT_ENTROPY_HEX_LEN: NonZeroUsize = match NonZeroUsize::new(6) {
    Some(len) => len,
    None => unreachable!(),
};

/// Default zero-padding width for counter identifiers.
pub const DEFAULT_PAD_WIDTH: usize = 5;

/// Top-level allocator configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    pub slug: SlugConfig,
    pub counter: CounterConfig,
}

impl AllocatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable values fall back to their defaults, as does an
    /// entropy length of zero.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_attempts = lookup("IDENT_SLUG_MAX_ATTEMPTS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let entropy_hex_len = lookup("IDENT_SLUG_ENTROPY_HEX_LEN")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_ENTROPY_HEX_LEN);

        let name_unique_types = lookup("IDENT_NAME_UNIQUE_TYPES")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(|t| (t.to_string(), true))
                    .collect()
            })
            .unwrap_or_default();

        let default_pad_width = lookup("IDENT_COUNTER_PAD_WIDTH")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_PAD_WIDTH);

        Self {
            slug: SlugConfig {
                max_attempts,
                entropy_hex_len,
                name_unique_types,
            },
            counter: CounterConfig { default_pad_width },
        }
    }
}

/// Slug allocator settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SlugConfig {
    /// Random-suffix attempts before the timestamp fallback.
    pub max_attempts: u32,

    /// Hex characters in each random suffix. Zero is rejected on
    /// deserialization, since every retry would repeat `base-`.
    pub entropy_hex_len: NonZeroUsize,

    /// Entity type -> "source name is already unique upstream".
    ///
    /// Types flagged `true` skip the uniqueness probe entirely. Absent
    /// types are probed.
    pub name_unique_types: BTreeMap<String, bool>,
}

impl SlugConfig {
    /// Flags `entity_type` as name-unique.
    #[must_use]
    pub fn with_name_unique(mut self, entity_type: impl Into<String>) -> Self {
        self.name_unique_types.insert(entity_type.into(), true);
        self
    }

    /// Returns true if slugs of `entity_type` need no uniqueness probe.
    pub fn is_name_unique(&self, entity_type: &str) -> bool {
        self.name_unique_types
            .get(entity_type)
            .copied()
            .unwrap_or(false)
    }
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            entropy_hex_len: DEFAULT_ENTROPY_HEX_LEN,
            name_unique_types: BTreeMap::new(),
        }
    }
}

/// Counter allocator settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Zero-padding width used by `allocate_default`.
    pub default_pad_width: usize,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            default_pad_width: DEFAULT_PAD_WIDTH,
        }
    }
}
