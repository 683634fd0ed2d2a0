//! ============================================================================
//! Key Normalizer - credential validation and canonicalization
//! ============================================================================
//! Pure validation of user-supplied API keys. Two prefix markers are
//! recognized: `sk-` keys are stored verbatim, `sk:` keys have the marker
//! stripped before storage. The full 3-character marker is required; a bare
//! `sk` prefix is not enough.
//! ============================================================================

/// Dash-style prefix marker, retained in the canonical form
const DASH_MARKER: &str = "sk-";

/// Colon-style prefix marker, dropped from the canonical form
const COLON_MARKER: &str = "sk:";

/// Outcome of validating a raw credential string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCheck {
    pub accepted: bool,
    /// Canonical form to store and transmit; empty when rejected
    pub canonical: String,
}

/// Validate and canonicalize a user-supplied credential.
///
/// Deterministic and side-effect free. Surrounding whitespace is trimmed
/// before the marker check.
pub fn normalize(input: &str) -> KeyCheck {
    let trimmed = input.trim();

    if trimmed.starts_with(DASH_MARKER) {
        KeyCheck {
            accepted: true,
            canonical: trimmed.to_string(),
        }
    } else if trimmed.starts_with(COLON_MARKER) {
        KeyCheck {
            accepted: true,
            canonical: trimmed[COLON_MARKER.len()..].to_string(),
        }
    } else {
        KeyCheck {
            accepted: false,
            canonical: String::new(),
        }
    }
}
