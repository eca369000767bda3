use std::collections::HashSet;
use std::sync::Mutex;

use rand::Rng;

use super::error::WorkflowError;
use super::repository::RepositoryError;

/// Attempts before giving up on finding an unreserved candidate.
pub const MAX_ALLOCATION_ATTEMPTS: usize = 8;

/// Outcome of attempting to reserve a candidate code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved,
    Conflict,
}

/// Pluggable source of human-readable display codes: generation and
/// reservation are separate so the bounded retry loop can be exercised
/// against a deterministic test double.
pub trait DisplayCodeAllocator: Send + Sync {
    fn generate(&self) -> String;
    fn reserve(&self, candidate: &str) -> Result<ReserveOutcome, RepositoryError>;
}

/// Generate-then-reserve with a bounded retry budget.
pub fn allocate(allocator: &dyn DisplayCodeAllocator) -> Result<String, WorkflowError> {
    for _ in 0..MAX_ALLOCATION_ATTEMPTS {
        let candidate = allocator.generate();
        match allocator.reserve(&candidate)? {
            ReserveOutcome::Reserved => return Ok(candidate),
            ReserveOutcome::Conflict => continue,
        }
    }
    Err(WorkflowError::Internal(format!(
        "no unique display code after {MAX_ALLOCATION_ATTEMPTS} attempts"
    )))
}

// Ambiguous glyphs (0/O, 1/I) excluded.
const CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 8;

/// Default allocator producing `LN-XXXXXXXX` candidates and tracking
/// reservations in memory.
#[derive(Debug, Default)]
pub struct RandomDisplayCodes {
    reserved: Mutex<HashSet<String>>,
}

impl DisplayCodeAllocator for RandomDisplayCodes {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..CODE_LENGTH)
            .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
            .collect();
        format!("LN-{suffix}")
    }

    fn reserve(&self, candidate: &str) -> Result<ReserveOutcome, RepositoryError> {
        let mut guard = self.reserved.lock().expect("code mutex poisoned");
        if guard.insert(candidate.to_string()) {
            Ok(ReserveOutcome::Reserved)
        } else {
            Ok(ReserveOutcome::Conflict)
        }
    }
}
