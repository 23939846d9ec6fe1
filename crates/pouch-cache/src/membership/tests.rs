//! Unit tests for the membership set

use super::*;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

#[test]
fn test_hash_matches_reference_values() {
    assert_eq!(MembershipSet::hash(""), 0);
    assert_eq!(MembershipSet::hash("a"), 97);
    assert_eq!(MembershipSet::hash("ab"), 97 * 31 + 98);
    // Astral characters hash as two UTF-16 code units
    assert_eq!(MembershipSet::hash("😀"), 0xD83D * 31 + 0xDE00);
    // Wraps instead of overflowing
    let long = "z".repeat(64);
    let _ = MembershipSet::hash(&long);
}

#[test]
fn test_size_below_two_is_rejected() {
    assert!(matches!(
        MembershipSet::new(1),
        Err(PouchError::ConfigValidation { .. })
    ));
    assert!(MembershipSet::new(0).is_err());
    assert!(MembershipSet::new(2).is_ok());
}

#[test]
fn test_add_then_has() {
    let set = MembershipSet::new(16).unwrap();
    assert!(!set.has("lodash"));

    set.add("lodash").unwrap();
    assert!(set.has("lodash"));
    assert!(!set.has("react"));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_duplicate_add_does_not_consume_capacity() {
    let set = MembershipSet::new(4).unwrap();
    for _ in 0..10 {
        set.add("same").unwrap();
    }
    assert_eq!(set.len(), 1);
}

#[test]
fn test_colliding_keys_are_probed() {
    // With N = 4, "a" (97), "q" (113) and "A" (65) all start at row 1, col 0
    let set = MembershipSet::new(4).unwrap();
    set.add("a").unwrap();
    set.add("q").unwrap();

    assert!(set.has("a"));
    assert!(set.has("q"));
    assert!(!set.has("A"));
}

#[test]
fn test_capacity_exceeded_on_extra_distinct_key() {
    let set = MembershipSet::new(8).unwrap();
    for key in ["a", "b", "c", "d", "e", "f", "g", "h"] {
        set.add(key).unwrap();
    }
    assert_eq!(set.len(), 8);

    match set.add("i") {
        Err(PouchError::CapacityExceeded { capacity }) => assert_eq!(capacity, 8),
        other => panic!("expected CapacityExceeded, got {:?}", other),
    }

    // Existing keys stay claimable and visible once full
    assert!(!set.claim("a").unwrap());
    assert!(set.has("h"));
}

#[test]
fn test_empty_key_is_never_found() {
    let set = MembershipSet::new(8).unwrap();
    set.add("").unwrap();
    assert!(!set.has(""));
}

#[test]
fn test_zero_hash_keys_use_no_capacity() {
    let set = MembershipSet::new(2).unwrap();
    for _ in 0..5 {
        assert!(!set.claim("").unwrap());
    }
    assert!(set.is_empty());

    assert!(set.claim("a").unwrap());
    assert!(set.claim("b").unwrap());
    assert_eq!(set.len(), 2);
}

#[test]
fn test_claim_reports_first_insert_only() {
    let set = MembershipSet::new(8).unwrap();
    assert!(set.claim("react").unwrap());
    assert!(!set.claim("react").unwrap());
}

#[test]
fn test_concurrent_claims_have_single_winner() {
    let set = Arc::new(MembershipSet::new(64).unwrap());
    let winners = Arc::new(AtomicUsize::new(0));

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let set = Arc::clone(&set);
            let winners = Arc::clone(&winners);
            scope.spawn(move || {
                for i in 0..32 {
                    if set.claim(&format!("pkg-{}", i)).unwrap() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    assert_eq!(winners.load(Ordering::SeqCst), 32);
    assert_eq!(set.len(), 32);
    for i in 0..32 {
        assert!(set.has(&format!("pkg-{}", i)));
    }
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn every_added_key_is_found(keys in prop::collection::hash_set("[a-z@/.-]{1,24}", 1..16)) {
            let set = MembershipSet::new(256).unwrap();
            for key in &keys {
                set.add(key).unwrap();
            }
            for key in &keys {
                prop_assert!(set.has(key), "missing {}", key);
            }
            prop_assert!(set.len() <= keys.len());
        }
    }
}
