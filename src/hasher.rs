//! Hasher: deterministic, process-local 64-bit hashing over raw key bytes.
//!
//! The mixing function is a multiply-xor ("folded multiply") over 8-byte
//! little-endian chunks, with the input length and a seed folded in and a
//! final avalanche step. Results are stable for the lifetime of a process
//! only; no cross-run guarantee is made.

use core::hash::BuildHasher;
use std::collections::hash_map::RandomState;
use std::sync::OnceLock;

const P0: u64 = 0xa076_1d64_78bd_642f;
const P1: u64 = 0xe703_7ed1_a0b4_28db;
const P2: u64 = 0x8ebc_6af0_9c88_c6e3;

/// Hashes raw key bytes to a 64-bit digest.
///
/// Implemented by [`PocketHasher`]; tests and benches may plug in their own
/// implementation through `PocketMap::with_hasher`.
pub trait ByteHasher {
    fn hash_bytes(&self, bytes: &[u8]) -> u64;
}

/// Default hasher. Cloning keeps the seed, so a copied map probes identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PocketHasher {
    seed: u64,
}

impl PocketHasher {
    /// Hasher with a fixed seed; digests are reproducible within a process.
    pub const fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for PocketHasher {
    /// Hasher seeded once per process from the standard library's random state.
    fn default() -> Self {
        static SEED: OnceLock<u64> = OnceLock::new();
        let seed = *SEED.get_or_init(|| RandomState::new().hash_one(P2));
        Self::with_seed(seed)
    }
}

#[inline]
fn fold_mul(a: u64, b: u64) -> u64 {
    let r = (a as u128).wrapping_mul(b as u128);
    (r as u64) ^ ((r >> 64) as u64)
}

#[inline]
fn read_u64(chunk: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..chunk.len()].copy_from_slice(chunk);
    u64::from_le_bytes(buf)
}

impl ByteHasher for PocketHasher {
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        let mut h = self.seed ^ P0 ^ (bytes.len() as u64).wrapping_mul(P1);
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            h = fold_mul(h ^ read_u64(chunk), P1);
        }
        let tail = chunks.remainder();
        if !tail.is_empty() {
            h = fold_mul(h ^ read_u64(tail), P2);
        }
        fold_mul(h ^ P0, (bytes.len() as u64) ^ P1)
    }
}
