use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::workflows::loan::display_code::{
    allocate, DisplayCodeAllocator, RandomDisplayCodes, ReserveOutcome, MAX_ALLOCATION_ATTEMPTS,
};
use crate::workflows::loan::error::WorkflowError;
use crate::workflows::loan::repository::RepositoryError;

/// Allocator double that reports conflicts for the first `conflicts`
/// reservation attempts.
struct ConflictingCodes {
    conflicts: usize,
    attempts: AtomicUsize,
    generated: Mutex<Vec<String>>,
}

impl ConflictingCodes {
    fn new(conflicts: usize) -> Self {
        Self {
            conflicts,
            attempts: AtomicUsize::new(0),
            generated: Mutex::new(Vec::new()),
        }
    }
}

impl DisplayCodeAllocator for ConflictingCodes {
    fn generate(&self) -> String {
        let mut guard = self.generated.lock().expect("mutex poisoned");
        let code = format!("LN-FIXED{:03}", guard.len());
        guard.push(code.clone());
        code
    }

    fn reserve(&self, _candidate: &str) -> Result<ReserveOutcome, RepositoryError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        if attempt < self.conflicts {
            Ok(ReserveOutcome::Conflict)
        } else {
            Ok(ReserveOutcome::Reserved)
        }
    }
}

struct BrokenStore;

impl DisplayCodeAllocator for BrokenStore {
    fn generate(&self) -> String {
        "LN-BROKEN00".to_string()
    }

    fn reserve(&self, _candidate: &str) -> Result<ReserveOutcome, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

#[test]
fn first_candidate_wins_without_conflicts() {
    let allocator = ConflictingCodes::new(0);
    let code = allocate(&allocator).expect("allocation succeeds");
    assert_eq!(code, "LN-FIXED000");
    assert_eq!(allocator.generated.lock().expect("mutex poisoned").len(), 1);
}

#[test]
fn conflicts_are_retried_with_fresh_candidates() {
    let allocator = ConflictingCodes::new(3);
    let code = allocate(&allocator).expect("allocation succeeds");
    assert_eq!(code, "LN-FIXED003");
    assert_eq!(allocator.generated.lock().expect("mutex poisoned").len(), 4);
}

#[test]
fn exhausted_retry_budget_is_an_internal_error() {
    let allocator = ConflictingCodes::new(MAX_ALLOCATION_ATTEMPTS);
    let result = allocate(&allocator);
    assert!(matches!(result, Err(WorkflowError::Internal(_))));
    assert_eq!(
        allocator.attempts.load(Ordering::Relaxed),
        MAX_ALLOCATION_ATTEMPTS
    );
}

#[test]
fn reservation_store_errors_propagate() {
    let result = allocate(&BrokenStore);
    assert!(matches!(result, Err(WorkflowError::Internal(_))));
}

#[test]
fn random_codes_use_the_unambiguous_charset() {
    let allocator = RandomDisplayCodes::default();
    for _ in 0..50 {
        let code = allocator.generate();
        let suffix = code.strip_prefix("LN-").expect("LN- prefix");
        assert_eq!(suffix.len(), 8);
        for ch in suffix.chars() {
            assert!(
                ch.is_ascii_uppercase() || ch.is_ascii_digit(),
                "unexpected character {ch:?} in {code}"
            );
            assert!(
                !matches!(ch, '0' | 'O' | '1' | 'I'),
                "ambiguous glyph {ch:?} in {code}"
            );
        }
    }
}

#[test]
fn random_codes_reject_duplicate_reservations() {
    let allocator = RandomDisplayCodes::default();
    assert_eq!(
        allocator.reserve("LN-ABCD2345").expect("reserve"),
        ReserveOutcome::Reserved
    );
    assert_eq!(
        allocator.reserve("LN-ABCD2345").expect("reserve"),
        ReserveOutcome::Conflict
    );
}
