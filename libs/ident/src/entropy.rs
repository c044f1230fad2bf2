//! Random byte sources for slug retry suffixes.
//!
//! Concurrent allocators racing on the same base slug rely on these bytes to
//! diverge, so the production source must be cryptographically strong.
//! Tests inject [`FixedRandom`] to make suffixes predictable.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Source of random bytes.
pub trait RandomSource: Send + Sync {
    /// Fills `buf` with random bytes.
    fn fill_bytes(&self, buf: &mut [u8]);
}

/// Production source backed by the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        rand::rng().fill(buf);
    }
}

/// Deterministic source that replays a fixed byte sequence, wrapping around
/// when it runs out.
#[derive(Debug)]
pub struct FixedRandom {
    bytes: Vec<u8>,
    cursor: AtomicUsize,
}

impl FixedRandom {
    /// Creates a source replaying `bytes`. An empty sequence yields zeros.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            cursor: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for FixedRandom {
    fn fill_bytes(&self, buf: &mut [u8]) {
        if self.bytes.is_empty() {
            buf.fill(0);
            return;
        }
        let start = self.cursor.fetch_add(buf.len(), Ordering::Relaxed);
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.bytes[(start + i) % self.bytes.len()];
        }
    }
}

/// Returns exactly `len` lowercase hex characters drawn from `source`.
pub fn random_hex(source: &dyn RandomSource, len: usize) -> String {
    let mut bytes = vec![0u8; len.div_ceil(2)];
    source.fill_bytes(&mut bytes);
    let mut encoded = hex::encode(bytes);
    encoded.truncate(len);
    encoded
}
