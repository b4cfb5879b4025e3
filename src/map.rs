//! A byte-string keyed map using Robin Hood open addressing.
//!
//! Robin Hood hashing is linear probing with one twist: during insertion, a
//! probing candidate that is further from its home bucket than the slot's
//! current occupant evicts the occupant and the probe continues with the
//! displaced entry. This equalizes probe lengths across keys, which bounds
//! the worst case and lets lookups stop early: once the probe reaches a slot
//! whose occupant is closer to home than the probe has traveled, the key
//! cannot exist further along.
//!
//! ## Design
//!
//! The table is a single contiguous array of slots whose length is always a
//! power of two, so the home bucket is computed as `hash & mask` with no
//! division. Each occupied slot records its distance from its home bucket
//! ("dib", biased so 1 means "at home"), a one-byte tag, the owned key bytes,
//! and the value. An empty slot is simply `None`; the abstract `dib == 0`
//! empty marker of the classic formulation maps onto the niche of the
//! `Option`.
//!
//! Tags are the top byte of the hash. It is important that tags are not
//! derived from the lower bits, as those select the home bucket and would
//! make tags correlate with their location in the table, defeating their
//! purpose of rejecting mismatched slots without a key comparison. The full
//! 64-bit hash is also cached per entry so that a resize transplants entries
//! without re-reading any key bytes.
//!
//! Deletion uses backward shifting instead of tombstones: after a slot is
//! vacated, subsequent entries that are not already at home move back one
//! position each until an empty slot or an at-home occupant ends the run.
//! The table therefore never accumulates deletion debris, and lookup cost
//! stays bounded by the longest live displacement rather than growing with
//! deletion history.
//!
//! The table doubles when an insertion would reach the growth threshold
//! (three-quarters full by default, tunable via the `load-factor-*`
//! features) and, when constructed shrinkable, halves when a deletion leaves
//! it under one-tenth full, never dropping below its initial capacity. A
//! resize builds the replacement array completely before publishing it, so
//! no partially rehashed state is ever observable.
//!
//! The `*_with_hint` operations take a [`Fingerprint`] captured earlier and
//! never rehash the key. The home bucket is always re-derived from the
//! current mask at the point of use; a fingerprint carries nothing that a
//! resize could invalidate.
//!
//! There is no internal synchronization. The map is single-writer by
//! contract; concurrent callers must serialize externally or shard.

use core::fmt::Debug;
use core::mem;

use cfg_if::cfg_if;
use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::hash::hash_key;
use crate::hash::tag_of;
use crate::hash::Fingerprint;

cfg_if! {
    if #[cfg(feature = "load-factor-sixty")] {
        const GROW_LF: f64 = 0.60;
    } else if #[cfg(feature = "load-factor-eighty-five")] {
        const GROW_LF: f64 = 0.85;
    } else {
        const GROW_LF: f64 = 0.75;
    }
}

const SHRINK_LF: f64 = 0.10;

/// Minimum bucket count. Capacity hints round up from here, and shrinking
/// never goes below it.
const FLOOR: usize = 16;

#[inline(always)]
fn grow_threshold(capacity: usize) -> usize {
    (capacity as f64 * GROW_LF) as usize
}

#[inline(always)]
fn shrink_threshold(capacity: usize) -> usize {
    (capacity as f64 * SHRINK_LF) as usize
}

fn empty_slots<V>(capacity: usize) -> Box<[Option<Entry<V>>]> {
    (0..capacity).map(|_| None).collect()
}

/// Construction options for [`Map`].
///
/// A zeroed `Options` (the `Default`) gives a 16-bucket, non-shrinkable map.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Lower bound on the initial bucket count. Rounded up to the next power
    /// of two and clamped at a floor of 16. Zero means the floor.
    pub initial_capacity: usize,
    /// When true, deletions may halve the table once it falls under the
    /// shrink threshold. The table never shrinks below its initial capacity.
    pub shrinkable: bool,
}

/// An occupied slot. `dib` is the distance from the entry's home bucket,
/// biased so that 1 means the entry sits in its home. A `u16` cannot wrap at
/// the load factors the table operates under.
#[derive(Clone, Debug)]
struct Entry<V> {
    hash: u64,
    dib: u16,
    tag: u8,
    key: Box<[u8]>,
    value: V,
}

/// A byte-string keyed map using Robin Hood open addressing with
/// backward-shift deletion.
///
/// Keys are owned byte strings compared bytewise; the map takes a copy on
/// insertion. Values are stored by value and never inspected. Lookups,
/// insertions, and deletions are amortized constant time; `scan` and `iter`
/// visit entries in an implementation-defined order that is not stable
/// across mutations.
///
/// # Examples
///
/// ```rust
/// use rh_hash::Map;
///
/// let mut map: Map<u64> = Map::new();
/// assert!(map.set(b"alpha", 1).is_none());
/// assert_eq!(map.set(b"alpha", 2), Some(1));
/// assert_eq!(map.get(b"alpha"), Some(&2));
/// assert_eq!(map.delete(b"alpha"), Some(2));
/// assert_eq!(map.get(b"alpha"), None);
/// ```
#[derive(Clone)]
pub struct Map<V> {
    slots: Box<[Option<Entry<V>>]>,
    mask: usize,
    len: usize,
    grow_at: usize,
    shrink_at: usize,
    min_capacity: usize,
    shrinkable: bool,
    seed: u32,
}

impl<V> Default for Map<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Debug> Debug for Map<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in self.iter() {
            map.entry(&String::from_utf8_lossy(key), value);
        }
        map.finish()
    }
}

impl<V> Map<V> {
    /// Creates an empty map with default options: 16 buckets, not
    /// shrinkable.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Creates an empty map with the given options.
    ///
    /// The actual initial capacity is the smallest power of two that is at
    /// least `max(initial_capacity, 16)`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::Map;
    /// use rh_hash::Options;
    ///
    /// let map: Map<u64> = Map::with_options(Options {
    ///     initial_capacity: 500,
    ///     shrinkable: true,
    /// });
    /// assert_eq!(map.capacity(), 512);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_options(opts: Options) -> Self {
        let capacity = opts.initial_capacity.max(FLOOR).next_power_of_two();
        let seed = OsRng.try_next_u32().unwrap_or(0x9e37_79b9);
        Self::with_capacity_and_seed(capacity, opts.shrinkable, seed)
    }

    fn with_capacity_and_seed(capacity: usize, shrinkable: bool, seed: u32) -> Self {
        Self {
            slots: empty_slots(capacity),
            mask: capacity - 1,
            len: 0,
            grow_at: grow_threshold(capacity),
            shrink_at: shrink_threshold(capacity),
            min_capacity: capacity,
            shrinkable,
            seed,
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current bucket count. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Computes the fingerprint of `key` against this map's seed.
    ///
    /// Pure: does not touch the table. The returned [`Fingerprint`] may be
    /// cached for the lifetime of this map and fed to the `*_with_hint`
    /// operations; it stays valid across growth and shrink events.
    #[inline]
    pub fn fingerprint(&self, key: &[u8]) -> Fingerprint {
        Fingerprint {
            hash: hash_key(key, self.seed),
            seed: self.seed,
        }
    }

    #[inline(always)]
    fn home_bucket(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }

    /// Linear probe for `key`. Returns the slot index of the entry, or
    /// `None` once an empty slot or a closer-to-home occupant proves the key
    /// absent.
    fn probe_find(&self, key: &[u8], hash: u64) -> Option<usize> {
        let tag = tag_of(hash);
        let mut index = self.home_bucket(hash);
        let mut dist: u16 = 1;
        loop {
            match &self.slots[index] {
                None => return None,
                Some(entry) => {
                    if entry.dib < dist {
                        return None;
                    }
                    if entry.tag == tag && *entry.key == *key {
                        return Some(index);
                    }
                }
            }
            index = (index + 1) & self.mask;
            dist += 1;
        }
    }

    /// Returns a reference to the value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::Map;
    ///
    /// let mut map: Map<&str> = Map::new();
    /// map.set(b"k", "v");
    /// assert_eq!(map.get(b"k"), Some(&"v"));
    /// assert_eq!(map.get(b"missing"), None);
    /// ```
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        self.get_with_hint(key, self.fingerprint(key))
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let index = self.probe_find(key, hash_key(key, self.seed))?;
        self.slots[index].as_mut().map(|entry| &mut entry.value)
    }

    /// Like [`get`](Self::get), but uses a cached fingerprint instead of
    /// rehashing the key. The caller is trusted to supply a fingerprint
    /// produced by this map for this key.
    pub fn get_with_hint(&self, key: &[u8], hint: Fingerprint) -> Option<&V> {
        debug_assert_eq!(hint.seed, self.seed, "fingerprint from another map");
        let index = self.probe_find(key, hint.hash)?;
        self.slots[index].as_ref().map(|entry| &entry.value)
    }

    /// Inserts or replaces the value for `key`, returning the previous value
    /// when the key was already present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::Map;
    ///
    /// let mut map: Map<u64> = Map::new();
    /// assert_eq!(map.set(b"k", 1), None);
    /// assert_eq!(map.set(b"k", 2), Some(1));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn set(&mut self, key: &[u8], value: V) -> Option<V> {
        let hint = self.fingerprint(key);
        self.set_with_hint(key, hint, value)
    }

    /// Like [`set`](Self::set), but uses a cached fingerprint instead of
    /// rehashing the key.
    pub fn set_with_hint(&mut self, key: &[u8], hint: Fingerprint, value: V) -> Option<V> {
        debug_assert_eq!(hint.seed, self.seed, "fingerprint from another map");
        if self.len + 1 >= self.grow_at {
            self.resize(self.capacity() * 2);
        }
        let hash = hint.hash;
        let tag = tag_of(hash);
        let mut index = self.home_bucket(hash);
        let mut dist: u16 = 1;
        loop {
            match &mut self.slots[index] {
                None => break,
                Some(entry) => {
                    if entry.dib < dist {
                        break;
                    }
                    if entry.tag == tag && *entry.key == *key {
                        return Some(mem::replace(&mut entry.value, value));
                    }
                }
            }
            index = (index + 1) & self.mask;
            dist += 1;
        }
        // The key is not resident; `index` is either empty or held by an
        // occupant closer to home than `dist`.
        self.place_from(
            Entry {
                hash,
                dib: dist,
                tag,
                key: key.into(),
                value,
            },
            index,
        );
        self.len += 1;
        None
    }

    /// Robin Hood displacement starting at `index`, where `candidate.dib` is
    /// the candidate's probe distance at `index`. Whenever the candidate is
    /// further from home than a slot's occupant, they swap and the probe
    /// continues with the displaced entry.
    fn place_from(&mut self, mut candidate: Entry<V>, mut index: usize) {
        loop {
            match &mut self.slots[index] {
                None => {
                    self.slots[index] = Some(candidate);
                    return;
                }
                Some(entry) => {
                    if entry.dib < candidate.dib {
                        mem::swap(entry, &mut candidate);
                    }
                }
            }
            index = (index + 1) & self.mask;
            candidate.dib += 1;
        }
    }

    /// Removes `key`, returning its value when it was present.
    ///
    /// Absent keys leave the map untouched. A successful removal pulls the
    /// displaced entries behind the vacated slot one step back toward their
    /// homes, so the table never carries tombstones.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::Map;
    ///
    /// let mut map: Map<u64> = Map::new();
    /// map.set(b"k", 9);
    /// assert_eq!(map.delete(b"k"), Some(9));
    /// assert_eq!(map.delete(b"k"), None);
    /// ```
    pub fn delete(&mut self, key: &[u8]) -> Option<V> {
        let hint = self.fingerprint(key);
        self.delete_with_hint(key, hint)
    }

    /// Like [`delete`](Self::delete), but uses a cached fingerprint instead
    /// of rehashing the key.
    pub fn delete_with_hint(&mut self, key: &[u8], hint: Fingerprint) -> Option<V> {
        debug_assert_eq!(hint.seed, self.seed, "fingerprint from another map");
        let mut index = self.probe_find(key, hint.hash)?;
        let removed = self.slots[index].take()?;
        // Backward shift: each successor that is not already at home moves
        // one slot closer, until an empty slot or an at-home occupant ends
        // the displaced run.
        loop {
            let next = (index + 1) & self.mask;
            match self.slots[next].take() {
                Some(mut entry) if entry.dib > 1 => {
                    entry.dib -= 1;
                    self.slots[index] = Some(entry);
                    index = next;
                }
                boundary => {
                    self.slots[next] = boundary;
                    break;
                }
            }
        }
        self.len -= 1;
        if self.shrinkable && self.len < self.shrink_at && self.capacity() > self.min_capacity {
            self.resize(self.capacity() / 2);
        }
        Some(removed.value)
    }

    /// Walks every entry in table order, calling `visit` with the key bytes
    /// and value. Returning `false` from the visitor stops the scan.
    ///
    /// The order is implementation-defined and not stable across mutations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rh_hash::Map;
    ///
    /// let mut map: Map<u64> = Map::new();
    /// map.set(b"a", 1);
    /// map.set(b"b", 2);
    ///
    /// let mut visited = 0;
    /// map.scan(|_key, _value| {
    ///     visited += 1;
    ///     true
    /// });
    /// assert_eq!(visited, 2);
    /// ```
    pub fn scan<F>(&self, mut visit: F)
    where
        F: FnMut(&[u8], &V) -> bool,
    {
        for slot in self.slots.iter() {
            if let Some(entry) = slot {
                if !visit(&entry.key[..], &entry.value) {
                    return;
                }
            }
        }
    }

    /// Returns an iterator over `(key, value)` pairs in an arbitrary order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
        }
    }

    /// Drops every entry while keeping the current allocation.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.len = 0;
    }

    /// Collects probe-distance statistics over the resident entries.
    pub fn probe_stats(&self) -> ProbeStats {
        let mut stats = ProbeStats {
            capacity: self.capacity(),
            histogram: vec![0; HISTOGRAM_BUCKETS],
            ..ProbeStats::default()
        };
        let mut total: u64 = 0;
        for entry in self.slots.iter().flatten() {
            stats.len += 1;
            total += u64::from(entry.dib);
            stats.max_dib = stats.max_dib.max(entry.dib);
            let bucket = usize::from(entry.dib - 1).min(HISTOGRAM_BUCKETS - 1);
            stats.histogram[bucket] += 1;
        }
        if stats.len > 0 {
            stats.mean_dib = total as f64 / stats.len as f64;
        }
        stats
    }

    /// Replaces the bucket array with one of `new_capacity` slots and
    /// transplants every entry against the new mask. The replacement is
    /// fully built before it is published, and the transplant cannot trigger
    /// a further resize.
    fn resize(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.max(self.min_capacity);
        if new_capacity == self.capacity() {
            return;
        }
        let mut next = Self {
            slots: empty_slots(new_capacity),
            mask: new_capacity - 1,
            len: self.len,
            grow_at: grow_threshold(new_capacity),
            shrink_at: shrink_threshold(new_capacity),
            min_capacity: self.min_capacity,
            shrinkable: self.shrinkable,
            seed: self.seed,
        };
        for slot in mem::take(&mut self.slots).into_vec() {
            if let Some(mut entry) = slot {
                entry.dib = 1;
                let home = next.home_bucket(entry.hash);
                next.place_from(entry, home);
            }
        }
        *self = next;
    }
}

/// Immutable iterator over the entries of a [`Map`].
pub struct Iter<'a, V> {
    slots: core::slice::Iter<'a, Option<Entry<V>>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some(entry) = slot {
                return Some((&entry.key[..], &entry.value));
            }
        }
        None
    }
}

const HISTOGRAM_BUCKETS: usize = 16;

/// Probe-distance statistics for a [`Map`], from [`Map::probe_stats`].
#[derive(Clone, Debug, Default)]
pub struct ProbeStats {
    /// Number of resident entries.
    pub len: usize,
    /// Bucket count at collection time.
    pub capacity: usize,
    /// Longest probe distance of any resident entry (1 = at home).
    pub max_dib: u16,
    /// Mean probe distance across resident entries.
    pub mean_dib: f64,
    /// Entry counts by probe distance; `histogram[d]` counts entries with
    /// `dib == d + 1`, with the final bucket aggregating everything longer.
    pub histogram: Vec<usize>,
}

impl ProbeStats {
    /// Occupied fraction of the table.
    pub fn load_factor(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.len as f64 / self.capacity as f64
        }
    }

    /// Prints the statistics to stdout.
    pub fn print(&self) {
        println!("entries:     {}", self.len);
        println!("buckets:     {}", self.capacity);
        println!("load factor: {:.3}", self.load_factor());
        println!("max probe:   {}", self.max_dib);
        println!("mean probe:  {:.3}", self.mean_dib);
        println!("probe distance distribution:");
        for (bucket, &count) in self.histogram.iter().enumerate() {
            if count == 0 {
                continue;
            }
            if bucket + 1 == self.histogram.len() {
                println!("  {:>3}+: {}", bucket + 1, count);
            } else {
                println!("  {:>4}: {}", bucket + 1, count);
            }
        }
    }
}
