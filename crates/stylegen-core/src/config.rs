//! ============================================================================
//! Configuration for StyleGen
//! ============================================================================
//! Runtime configuration for the generation client. Defaults mirror the
//! hosted deployment; every field can be overridden through STYLEGEN_*
//! environment variables (loaded via dotenvy by the binaries).
//! ============================================================================

use serde::{Deserialize, Serialize};

/// Default upstream base URL of the image-generation service
pub const DEFAULT_API_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Images endpoint, relative to the base URL
pub const IMAGES_ENDPOINT: &str = "/images/generations";

/// Default image-to-image generation model
pub const DEFAULT_IMAGE_MODEL: &str = "doubao-seedream-4-0-250828";

/// Default output resolution class
pub const DEFAULT_OUTPUT_SIZE: &str = "2K";

/// Default transport-level timeout in seconds. The generation contract itself
/// imposes no deadline; this only bounds the HTTP client.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the generation service
    pub api_base_url: String,
    /// Model identifier sent with every request
    pub image_model: String,
    /// Resolution class string for the rendered output
    pub output_size: String,
    /// Whether the service should watermark the rendered output
    pub watermark: bool,
    /// Demo deployments substitute a placeholder result instead of surfacing
    /// authorization errors
    pub demo_mode: bool,
    /// Fallback key used when no credential is stored (demo traffic)
    pub demo_api_key: Option<String>,
    /// Transport-level timeout for the HTTP client
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: std::env::var("STYLEGEN_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            image_model: std::env::var("STYLEGEN_IMAGE_MODEL")
                .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string()),
            output_size: std::env::var("STYLEGEN_OUTPUT_SIZE")
                .unwrap_or_else(|_| DEFAULT_OUTPUT_SIZE.to_string()),
            watermark: true,
            demo_mode: std::env::var("STYLEGEN_DEMO_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            demo_api_key: std::env::var("STYLEGEN_DEMO_API_KEY").ok(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}
