//! Integration tests for identifier issuance

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use modelbase_foundation::{
    EntityIdentity, ErrorKind, IdentityCell, IdentityGenerator, MAX_SESSION_ID,
};

// =============================================================================
// Generator
// =============================================================================

#[test]
fn ids_are_scoped_by_session_and_service() {
    let a = IdentityGenerator::new(2, 3).unwrap();
    let b = IdentityGenerator::new(2, 4).unwrap();
    let id_a = a.next().unwrap();
    let id_b = b.next().unwrap();

    assert_ne!(id_a, id_b);
    assert!(a.owns(id_a));
    assert!(!a.owns(id_b));
    assert!(!a.owns(0));
    assert_eq!(id_a >> 48, 2);
    assert_eq!((id_a >> 32) & 0xffff, 3);
}

#[test]
fn ids_fit_a_signed_integer() {
    let generator = IdentityGenerator::new(MAX_SESSION_ID, u16::MAX).unwrap();
    let id = generator.next().unwrap();
    assert!(i64::try_from(id).is_ok());
}

#[test]
fn oversized_session_rejected() {
    let err = IdentityGenerator::new(MAX_SESSION_ID + 1, 0).unwrap_err();
    assert!(err.is_precondition());
}

#[test]
fn concurrent_issuance_is_unique_and_increasing_per_thread() {
    let generator = Arc::new(IdentityGenerator::new(1, 1).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let generator = Arc::clone(&generator);
            thread::spawn(move || {
                (0..1_000)
                    .map(|_| generator.next().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        let ids = handle.join().unwrap();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert!(seen.insert(id));
        }
    }
    assert_eq!(seen.len(), 8_000);
}

// =============================================================================
// Cell
// =============================================================================

#[test]
fn cell_must_be_installed_before_use() {
    let cell = IdentityCell::new();
    assert!(!cell.is_installed());
    assert!(matches!(
        cell.next().unwrap_err().kind,
        ErrorKind::PreconditionViolation(_)
    ));

    let generator = Arc::new(IdentityGenerator::new(1, 1).unwrap());
    cell.install(Arc::clone(&generator)).unwrap();
    cell.install(Arc::clone(&generator)).unwrap();
    assert!(cell.next().is_ok());

    let other = Arc::new(IdentityGenerator::new(1, 1).unwrap());
    assert!(cell.install(other).unwrap_err().is_precondition());
}

// =============================================================================
// Identities
// =============================================================================

#[test]
fn identity_states() {
    assert!(!EntityIdentity::UNASSIGNED.is_assigned());
    assert!(EntityIdentity::new(5, 0).is_assigned());
    assert!(!EntityIdentity::new(5, 0).is_stored());
    assert!(EntityIdentity::new(5, 9).is_stored());
    assert!(format!("{}", EntityIdentity::new(5, 9)).contains('5'));
}
