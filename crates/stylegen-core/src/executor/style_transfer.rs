//! ============================================================================
//! Style Transfer Executor - image-to-image generation via the hosted API
//! ============================================================================
//! Builds and issues the single outbound request per generation:
//! - Renders the style directive from a fixed preamble + the descriptor
//! - Resolves the credential from the store, falling back to the demo key
//! - Normalizes failures into the GenerationError taxonomy
//!
//! No retry, no backoff: the caller owns retries, and the workflow guarantees
//! one outstanding call at a time.
//! ============================================================================

use anyhow::{anyhow, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, IMAGES_ENDPOINT};
use crate::store::CredentialStore;
use crate::types::{GeneratedImage, GenerationError, ImageRef, StyleChoice};

/// Fixed preamble prepended to every style directive sent upstream
const STYLE_PROMPT_PREAMBLE: &str =
    "Redraw the provided image in the following style, keeping the original \
     composition and subject intact: ";

/// Executor for style-transfer generation
pub struct StyleTransferExecutor {
    client: reqwest::Client,
    config: AppConfig,
    store: Arc<dyn CredentialStore>,
}

impl StyleTransferExecutor {
    /// Create a new executor sharing the process-wide credential store
    pub fn new(config: AppConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            client,
            config,
            store,
        })
    }

    /// Apply a style to a source image, returning the generated image
    /// reference. Issues exactly one request per invocation.
    pub async fn transform(
        &self,
        image: &ImageRef,
        style: &StyleChoice,
    ) -> Result<GeneratedImage, GenerationError> {
        let credential = self.resolve_credential()?;
        let url = format!(
            "{}{}",
            self.config.api_base_url.trim_end_matches('/'),
            IMAGES_ENDPOINT
        );

        let request = GenerationRequest {
            model: self.config.image_model.clone(),
            prompt: format!("{}{}", STYLE_PROMPT_PREAMBLE, style.descriptor()),
            image: image.as_str().to_string(),
            size: self.config.output_size.clone(),
            response_format: "url".to_string(),
            watermark: self.config.watermark,
        };

        info!("Submitting style transfer: {}", style.descriptor());

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", credential))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return self.handle_unauthorized(image);
        }

        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(decode_api_error(status, &body));
        }

        let generated = decode_generation_response(&body)?;
        debug!("Style transfer complete: {}", generated.url);
        Ok(generated)
    }

    /// Resolve the credential for the outbound call: the stored canonical
    /// key, else the configured demo fallback.
    fn resolve_credential(&self) -> Result<String, GenerationError> {
        match self.store.get() {
            Ok(Some(key)) => return Ok(key),
            Ok(None) => {}
            Err(e) => warn!("Failed to read stored credential: {}", e),
        }

        self.config
            .demo_api_key
            .clone()
            .ok_or(GenerationError::Unauthorized)
    }

    /// Demo deployments swallow authorization failures: the rejected key is
    /// dropped from storage and the caller receives the source image back as
    /// a placeholder result. Production surfaces UNAUTHORIZED.
    fn handle_unauthorized(
        &self,
        image: &ImageRef,
    ) -> Result<GeneratedImage, GenerationError> {
        if !self.config.demo_mode {
            return Err(GenerationError::Unauthorized);
        }

        if let Err(e) = self.store.clear() {
            warn!("Failed to clear rejected credential: {}", e);
        }
        info!("Demo mode: substituting placeholder result for unauthorized request");

        Ok(GeneratedImage {
            url: image.as_str().to_string(),
            demo_fallback: true,
        })
    }
}

/// Decode a 2xx response body into the generated image reference. The first
/// element of the result collection must carry a URL; anything else is an
/// invalid response, never a silent fallback.
fn decode_generation_response(body: &str) -> Result<GeneratedImage, GenerationError> {
    let parsed: GenerationResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::InvalidResponse(format!("undecodable body: {}", e)))?;

    let url = parsed
        .data
        .into_iter()
        .next()
        .and_then(|item| item.url)
        .ok_or_else(|| {
            GenerationError::InvalidResponse("no image reference in response".to_string())
        })?;

    Ok(GeneratedImage {
        url,
        demo_fallback: false,
    })
}

/// Map a non-2xx body onto the structured API error, falling back to the
/// bare status code when the payload is not the expected shape.
fn decode_api_error(status: StatusCode, body: &str) -> GenerationError {
    if let Ok(payload) = serde_json::from_str::<ApiErrorResponse>(body) {
        GenerationError::Api {
            code: payload
                .error
                .code
                .unwrap_or_else(|| status.as_u16().to_string()),
            message: payload.error.message,
        }
    } else {
        GenerationError::Api {
            code: status.as_u16().to_string(),
            message: status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        }
    }
}

// ============================================================================
// Generation API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerationRequest {
    model: String,
    prompt: String,
    image: String,
    size: String,
    response_format: String,
    watermark: bool,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    #[serde(default)]
    data: Vec<GenerationItem>,
}

#[derive(Debug, Deserialize)]
struct GenerationItem {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;

    fn demo_config() -> AppConfig {
        AppConfig {
            api_base_url: "http://127.0.0.1:9".into(),
            image_model: "test-model".into(),
            output_size: "2K".into(),
            watermark: true,
            demo_mode: true,
            demo_api_key: Some("test-key-for-demo".into()),
            request_timeout_secs: 1,
        }
    }

    fn production_config() -> AppConfig {
        AppConfig {
            demo_mode: false,
            demo_api_key: None,
            ..demo_config()
        }
    }

    #[test]
    fn test_decode_response_takes_first_result() {
        let body = r#"{"data":[{"url":"https://cdn.example.com/out.png"},{"url":"https://cdn.example.com/ignored.png"}]}"#;
        let generated = decode_generation_response(body).unwrap();
        assert_eq!(generated.url, "https://cdn.example.com/out.png");
        assert!(!generated.demo_fallback);
    }

    #[test]
    fn test_decode_response_empty_collection_is_invalid() {
        let err = decode_generation_response(r#"{"data":[]}"#).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[test]
    fn test_decode_response_missing_url_is_invalid() {
        let err = decode_generation_response(r#"{"data":[{"b64_json":"abc"}]}"#).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[test]
    fn test_decode_response_garbage_body_is_invalid() {
        let err = decode_generation_response("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
    }

    #[test]
    fn test_decode_api_error_structured_payload() {
        let body = r#"{"error":{"message":"quota exhausted","code":"QUOTA"}}"#;
        let err = decode_api_error(StatusCode::TOO_MANY_REQUESTS, body);
        match err {
            GenerationError::Api { code, message } => {
                assert_eq!(code, "QUOTA");
                assert_eq!(message, "quota exhausted");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_api_error_unstructured_payload_falls_back_to_status() {
        let err = decode_api_error(StatusCode::BAD_GATEWAY, "upstream down");
        match err {
            GenerationError::Api { code, .. } => assert_eq!(code, "502"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unauthorized_in_production_surfaces_error() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.set("sk-rejected").unwrap();
        let executor = StyleTransferExecutor::new(production_config(), store.clone()).unwrap();

        let image = ImageRef::from_url("https://example.com/in.png");
        let err = executor.handle_unauthorized(&image).unwrap_err();
        assert!(matches!(err, GenerationError::Unauthorized));
        // Stored credential untouched in production
        assert_eq!(store.get().unwrap().as_deref(), Some("sk-rejected"));
    }

    #[test]
    fn test_unauthorized_in_demo_mode_clears_store_and_echoes_input() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.set("sk-rejected").unwrap();
        let executor = StyleTransferExecutor::new(demo_config(), store.clone()).unwrap();

        let image = ImageRef::from_url("https://example.com/in.png");
        let generated = executor.handle_unauthorized(&image).unwrap();

        assert!(generated.demo_fallback);
        assert_eq!(generated.url, "https://example.com/in.png");
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_credential_resolution_prefers_stored_key() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.set("sk-stored").unwrap();
        let executor = StyleTransferExecutor::new(demo_config(), store).unwrap();
        assert_eq!(executor.resolve_credential().unwrap(), "sk-stored");
    }

    #[test]
    fn test_credential_resolution_falls_back_to_demo_key() {
        let store = Arc::new(MemoryCredentialStore::new());
        let executor = StyleTransferExecutor::new(demo_config(), store).unwrap();
        assert_eq!(executor.resolve_credential().unwrap(), "test-key-for-demo");
    }

    #[test]
    fn test_credential_resolution_without_any_key_is_unauthorized() {
        let store = Arc::new(MemoryCredentialStore::new());
        let executor = StyleTransferExecutor::new(production_config(), store).unwrap();
        assert!(matches!(
            executor.resolve_credential().unwrap_err(),
            GenerationError::Unauthorized
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerationRequest {
            model: "test-model".into(),
            prompt: format!("{}{}", STYLE_PROMPT_PREAMBLE, "oil"),
            image: "data:image/png;base64,YWJj".into(),
            size: "2K".into(),
            response_format: "url".into(),
            watermark: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["response_format"], "url");
        assert_eq!(value["watermark"], true);
        assert!(value["prompt"].as_str().unwrap().ends_with("oil"));
    }
}
