//! End-to-end scenarios: randomized set/replace/delete churn against
//! shuffled decimal-string keys, scan behavior, fingerprint stability across
//! resize events, and the shrinkable round trip.

use rand::seq::SliceRandom;
use rh_hash::Map;
use rh_hash::Options;

/// A shuffled permutation of `0..n` as decimal strings.
fn random_keys(n: usize) -> Vec<String> {
    let mut keys: Vec<String> = (0..n).map(|i| i.to_string()).collect();
    keys.shuffle(&mut rand::rng());
    keys
}

/// The decimal string of `parse(s) + x`.
fn addstr(s: &str, x: u64) -> String {
    (s.parse::<u64>().unwrap() + x).to_string()
}

#[test]
fn empty_map_behaviors() {
    let mut map: Map<String> = Map::new();
    assert_eq!(map.get(b"999"), None);
    assert_eq!(map.delete(b"999"), None);
    assert_eq!(map.len(), 0);
    assert!(map.is_empty());
}

/// The full churn flow against several constructions: fill, verify, replace,
/// delete half, verify both halves, double-delete, scan-verify, scan
/// short-circuit, drain the rest.
#[test]
fn randomized_churn() {
    const N: usize = 1000;
    let variants = [
        Options::default(),
        Options {
            initial_capacity: N / 2,
            shrinkable: false,
        },
        Options {
            initial_capacity: N / 3,
            shrinkable: true,
        },
    ];
    for opts in variants {
        let mut keys = random_keys(N);
        let mut map: Map<String> = Map::with_options(opts);

        assert_eq!(map.get(b"999"), None);
        assert_eq!(map.delete(b"999"), None);
        assert_eq!(map.len(), 0);

        // Set a bunch of items.
        for k in &keys {
            assert_eq!(map.set(k.as_bytes(), k.clone()), None);
        }
        assert_eq!(map.len(), N);

        // Retrieve all the items in a fresh order.
        keys.shuffle(&mut rand::rng());
        for k in &keys {
            assert_eq!(map.get(k.as_bytes()), Some(k));
        }

        // Replace all the items.
        keys.shuffle(&mut rand::rng());
        for k in &keys {
            assert_eq!(map.set(k.as_bytes(), addstr(k, 1)), Some(k.clone()));
        }
        assert_eq!(map.len(), N);
        keys.shuffle(&mut rand::rng());
        for k in &keys {
            assert_eq!(map.get(k.as_bytes()), Some(&addstr(k, 1)));
        }

        // Remove half the items.
        keys.shuffle(&mut rand::rng());
        for k in &keys[..N / 2] {
            assert_eq!(map.delete(k.as_bytes()), Some(addstr(k, 1)));
        }
        assert_eq!(map.len(), N / 2);

        // The removed half is gone; the other half kept its updated value.
        for k in &keys[..N / 2] {
            assert_eq!(map.get(k.as_bytes()), None);
        }
        for k in &keys[N / 2..] {
            assert_eq!(map.get(k.as_bytes()), Some(&addstr(k, 1)));
        }

        // Deleting the removed half again is a no-op.
        for k in &keys[..N / 2] {
            assert_eq!(map.delete(k.as_bytes()), None);
        }
        assert_eq!(map.len(), N / 2);

        // Scan sees every remaining pair with its updated value.
        let mut scanned = 0;
        map.scan(|key, value| {
            let key = std::str::from_utf8(key).unwrap();
            assert_eq!(*value, addstr(key, 1));
            scanned += 1;
            true
        });
        assert_eq!(scanned, N / 2);

        // A visitor that stops immediately is called exactly once.
        let mut visited = 0;
        map.scan(|_, _| {
            visited += 1;
            false
        });
        assert_eq!(visited, 1);

        // Drain the rest.
        for k in &keys[N / 2..] {
            assert_eq!(map.delete(k.as_bytes()), Some(addstr(k, 1)));
        }
        assert_eq!(map.len(), 0);
    }
}

#[test]
fn grow_and_retrieve_thousand() {
    let mut map: Map<String> = Map::with_options(Options {
        initial_capacity: 500,
        shrinkable: false,
    });
    for k in random_keys(1000) {
        assert_eq!(map.set(k.as_bytes(), k.clone()), None);
    }
    assert_eq!(map.len(), 1000);
    for i in 0..1000 {
        let k = i.to_string();
        assert_eq!(map.get(k.as_bytes()), Some(&k));
    }
}

/// Insert far past the initial capacity, then delete everything; a
/// shrinkable map hands the space back down to its initial footprint.
#[test]
fn shrinkable_round_trip() {
    const N: usize = 10_000;
    let mut map: Map<String> = Map::with_options(Options {
        initial_capacity: 16,
        shrinkable: true,
    });
    let keys = random_keys(N);
    for k in &keys {
        map.set(k.as_bytes(), k.clone());
    }
    assert_eq!(map.len(), N);
    for k in &keys {
        assert_eq!(map.delete(k.as_bytes()), Some(k.clone()));
    }
    assert_eq!(map.len(), 0);
    assert!(map.capacity() <= 64, "capacity {}", map.capacity());
    for k in &keys {
        assert_eq!(map.get(k.as_bytes()), None);
    }
}

/// Fingerprints recorded against an almost-empty map keep resolving after
/// the table has grown and shrunk underneath them.
#[test]
fn fingerprints_stable_across_resizes() {
    let mut map: Map<usize> = Map::with_options(Options {
        initial_capacity: 16,
        shrinkable: true,
    });
    let keys = random_keys(5000);
    let hints: Vec<_> = keys.iter().map(|k| map.fingerprint(k.as_bytes())).collect();

    for (i, k) in keys.iter().enumerate() {
        assert_eq!(map.set_with_hint(k.as_bytes(), hints[i], i), None);
    }
    let grown = map.capacity();
    assert!(grown > 16);
    for (i, k) in keys.iter().enumerate() {
        assert_eq!(map.get_with_hint(k.as_bytes(), hints[i]), Some(&i));
    }

    // Delete through the hint path until the table shrinks, then make sure
    // the survivors still resolve through both paths.
    for (i, k) in keys.iter().enumerate().skip(100) {
        assert_eq!(map.delete_with_hint(k.as_bytes(), hints[i]), Some(i));
    }
    assert!(map.capacity() < grown);
    for (i, k) in keys.iter().enumerate().take(100) {
        assert_eq!(map.get_with_hint(k.as_bytes(), hints[i]), Some(&i));
        assert_eq!(map.get(k.as_bytes()), Some(&i));
    }
}
