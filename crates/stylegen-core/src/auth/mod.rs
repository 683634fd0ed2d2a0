//! ============================================================================
//! Auth Module - credential validation and session state
//! ============================================================================
//! Composes the pure key normalizer with the persistent credential store:
//! - normalize: validate/canonicalize a user-supplied API key
//! - AuthSession: WAITING/VERIFYING/SUCCESS/ERROR lifecycle
//! ============================================================================

mod normalize;
mod session;

pub use normalize::{normalize, KeyCheck};
pub use session::{AuthSession, AuthStatus};
