//! Session-expiry coordination.
//!
//! Any request path that observes a 401 marks the shared flag. The first
//! marker wins the right to surface the "session expired" prompt; later
//! failures only observe the expired state. Re-login clears the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Three-state session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    Unauthenticated,
    Expired,
}

/// Process-wide expiry flag, cheap to clone and share across request paths.
#[derive(Debug, Clone, Default)]
pub struct ExpiryFlag {
    expired: Arc<AtomicBool>,
}

impl ExpiryFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session expired. Returns `true` only for the caller that
    /// flipped the flag, so concurrent failures produce exactly one prompt.
    pub fn mark_expired(&self) -> bool {
        self.expired
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Clear the flag on logout or successful re-login.
    pub fn clear(&self) {
        self.expired.store(false, Ordering::SeqCst);
    }

    /// Derive the lifecycle state from the flag and the session store's view.
    pub fn state(&self, authenticated: bool) -> AuthState {
        if self.is_expired() {
            AuthState::Expired
        } else if authenticated {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }
}
