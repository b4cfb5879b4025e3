//! Seeded key hashing and the cached-fingerprint escape hatch.
//!
//! Every map draws one 32-bit seed at construction and keys SipHash-1-3 with
//! it, so probe order differs between map instances and hash flooding against
//! a known layout is not practical. The seed is stable for the map's
//! lifetime, which is what makes [`Fingerprint`] caching sound: the hash a
//! fingerprint carries is a pure function of `(key, seed)` and survives any
//! number of resizes.

use core::hash::Hasher;

use siphasher::sip::SipHasher13;

/// Spreads the 32-bit seed across the second SipHash key.
const SEED_SPREAD: u64 = 0x9e37_79b9_7f4a_7c15;

/// A cached `(hash, seed)` pair for one key against one map.
///
/// Obtained from [`Map::fingerprint`] and consumed by the `*_with_hint`
/// operations, which skip rehashing the key bytes. A fingerprint is only
/// meaningful to the map instance that produced it, but against that map it
/// may be cached indefinitely: growth and shrink events do not invalidate it.
///
/// A fingerprint deliberately carries no bucket index. The home bucket
/// depends on the map's current mask and is re-derived on every use.
///
/// [`Map::fingerprint`]: crate::Map::fingerprint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fingerprint {
    pub(crate) hash: u64,
    pub(crate) seed: u32,
}

impl Fingerprint {
    /// Reassembles a fingerprint from a previously exported pair.
    #[inline]
    pub fn new(hash: u64, seed: u32) -> Self {
        Self { hash, seed }
    }

    /// The 64-bit hash of the key under the owning map's seed.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The seed of the map that produced this fingerprint.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }
}

/// Hashes `key` under `seed`. Deterministic for a fixed pair.
#[inline]
pub(crate) fn hash_key(key: &[u8], seed: u32) -> u64 {
    let k = u64::from(seed);
    let mut hasher = SipHasher13::new_with_keys(k, k.wrapping_mul(SEED_SPREAD));
    hasher.write(key);
    hasher.finish()
}

/// The per-slot tag is the top byte of the hash. The home bucket comes from
/// the low bits, so the tag stays uncorrelated with table position and a tag
/// mismatch rejects a slot without touching the key bytes.
#[inline(always)]
pub(crate) fn tag_of(hash: u64) -> u8 {
    (hash >> 56) as u8
}
