//! ============================================================================
//! Core Types for StyleGen
//! ============================================================================
//! Defines the data structures shared across the auth session, the workflow
//! state machine, and the style-transfer executor. These types are serialized
//! to JSON for display layers and diagnostics.
//! ============================================================================

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Reference to a source image: a remote URL or a data URL built from raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef(String);

impl ImageRef {
    /// Wrap an already-formed reference (http(s) URL or data URL).
    pub fn from_url(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Build a data-URL reference from raw image bytes.
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Mutually exclusive style selection: a catalog identifier or a free-text
/// prompt. Selecting one form replaces the other entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleChoice {
    /// Preset style from the catalog, by identifier
    Catalog(String),
    /// User-written style prompt
    Custom(String),
}

impl StyleChoice {
    /// The descriptor rendered into the generation directive.
    pub fn descriptor(&self) -> &str {
        match self {
            StyleChoice::Catalog(id) => id,
            StyleChoice::Custom(text) => text,
        }
    }
}

/// A generated image reference returned by the style-transfer service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Retrievable URL of the rendered output
    pub url: String,
    /// True when this is the demo-mode placeholder (the source image echoed
    /// back after an authorization failure)
    pub demo_fallback: bool,
}

/// Error taxonomy for the generation client
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum GenerationError {
    #[error("Unauthorized: the generation service rejected the API key")]
    Unauthorized,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error {code}: {message}")]
    Api { code: String, message: String },
}

/// Number of leading characters left visible when redacting a credential
const REDACT_VISIBLE_CHARS: usize = 5;

/// Render a credential for logs and terminal output without exposing it.
pub fn redact_credential(key: &str) -> String {
    if key.chars().count() <= REDACT_VISIBLE_CHARS {
        return "*".repeat(key.chars().count());
    }
    let prefix: String = key.chars().take(REDACT_VISIBLE_CHARS).collect();
    format!("{}***", prefix)
}
