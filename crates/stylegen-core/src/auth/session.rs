//! ============================================================================
//! Auth Session - credential lifecycle state machine
//! ============================================================================
//! Tracks the authentication status of the running process:
//!
//!   WAITING --(verify)--> VERIFYING --> SUCCESS | ERROR
//!   SUCCESS --(logout)--> WAITING
//!
//! A previously stored credential resumes the session as SUCCESS without
//! re-validation. The store is shared with the generation client; writes are
//! last-write-wins since callers serialize verify/logout through user events.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::store::CredentialStore;
use crate::types::redact_credential;

use super::normalize::normalize;

/// Authentication status of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// No attempt made, or state reset
    Waiting,
    /// Validation in flight
    Verifying,
    /// Canonical credential accepted and persisted
    Success,
    /// Validation rejected the input; stored credential unchanged
    Error,
}

/// Session holding the current authentication status, composing the key
/// normalizer and the shared credential store
pub struct AuthSession {
    status: AuthStatus,
    store: Arc<dyn CredentialStore>,
}

impl AuthSession {
    /// Construct the session, resuming as SUCCESS when a credential is
    /// already stored from a previous run.
    pub fn resume(store: Arc<dyn CredentialStore>) -> Self {
        let status = match store.get() {
            Ok(Some(key)) => {
                info!("Resuming session with stored credential {}", redact_credential(&key));
                AuthStatus::Success
            }
            Ok(None) => AuthStatus::Waiting,
            Err(e) => {
                warn!("Failed to read stored credential: {}", e);
                AuthStatus::Waiting
            }
        };

        Self { status, store }
    }

    /// Validate and persist a raw credential. Runs the full
    /// WAITING -> VERIFYING -> SUCCESS | ERROR transition and returns true
    /// iff the session landed in SUCCESS.
    pub fn verify(&mut self, raw: &str) -> bool {
        self.status = AuthStatus::Verifying;

        let check = normalize(raw);
        if !check.accepted {
            self.status = AuthStatus::Error;
            return false;
        }

        match self.store.set(&check.canonical) {
            Ok(()) => {
                info!("Credential accepted: {}", redact_credential(&check.canonical));
                self.status = AuthStatus::Success;
                true
            }
            Err(e) => {
                warn!("Failed to persist credential: {}", e);
                self.status = AuthStatus::Error;
                false
            }
        }
    }

    /// Return to WAITING and erase the stored credential. Always succeeds;
    /// storage errors during erase are logged and swallowed.
    pub fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to erase stored credential: {}", e);
        }
        self.status = AuthStatus::Waiting;
    }

    /// Read-only accessor for the stored canonical credential
    pub fn current_credential(&self) -> Option<String> {
        self.store.get().ok().flatten()
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == AuthStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use anyhow::{anyhow, Result};

    fn session() -> AuthSession {
        AuthSession::resume(Arc::new(MemoryCredentialStore::new()))
    }

    #[test]
    fn test_starts_waiting_with_empty_store() {
        let session = session();
        assert_eq!(session.status(), AuthStatus::Waiting);
        assert!(!session.is_authenticated());
        assert_eq!(session.current_credential(), None);
    }

    #[test]
    fn test_verify_dash_key_roundtrip() {
        let mut session = session();
        assert!(session.verify("sk-12345abcdef"));
        assert_eq!(session.status(), AuthStatus::Success);
        assert_eq!(session.current_credential().as_deref(), Some("sk-12345abcdef"));
    }

    #[test]
    fn test_verify_colon_key_stores_stripped_form() {
        let mut session = session();
        assert!(session.verify("sk:67890ghijkl"));
        assert_eq!(session.current_credential().as_deref(), Some("67890ghijkl"));
    }

    #[test]
    fn test_verify_rejection_writes_nothing() {
        let mut session = session();
        assert!(!session.verify("12345abcdef"));
        assert_eq!(session.status(), AuthStatus::Error);
        assert_eq!(session.current_credential(), None);
    }

    #[test]
    fn test_logout_clears_store_and_resets() {
        let mut session = session();
        session.verify("sk-abc");
        session.logout();
        assert_eq!(session.status(), AuthStatus::Waiting);
        assert_eq!(session.current_credential(), None);
    }

    #[test]
    fn test_logout_from_waiting_is_harmless() {
        let mut session = session();
        session.logout();
        assert_eq!(session.status(), AuthStatus::Waiting);
    }

    #[test]
    fn test_resume_with_stored_credential() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.set("sk-from-last-run").unwrap();

        let session = AuthSession::resume(store);
        assert_eq!(session.status(), AuthStatus::Success);
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_revalidation_overwrites_previous_credential() {
        let mut session = session();
        session.verify("sk-first");
        session.verify("sk:second");
        assert_eq!(session.current_credential().as_deref(), Some("second"));
    }

    /// Store that fails every write, for the storage-error transition
    struct BrokenStore;

    impl CredentialStore for BrokenStore {
        fn get(&self) -> Result<Option<String>> {
            Ok(None)
        }
        fn set(&self, _canonical: &str) -> Result<()> {
            Err(anyhow!("disk full"))
        }
        fn clear(&self) -> Result<()> {
            Err(anyhow!("disk full"))
        }
    }

    #[test]
    fn test_storage_write_failure_lands_in_error() {
        let mut session = AuthSession::resume(Arc::new(BrokenStore));
        assert!(!session.verify("sk-valid-but-unpersistable"));
        assert_eq!(session.status(), AuthStatus::Error);
    }

    #[test]
    fn test_logout_swallows_storage_errors() {
        let mut session = AuthSession::resume(Arc::new(BrokenStore));
        session.logout();
        assert_eq!(session.status(), AuthStatus::Waiting);
    }
}
