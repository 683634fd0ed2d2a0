// ============================================================================
// stylegen-proxy — passthrough proxy for the StyleGen API
// ============================================================================
// Forwards every /api/* request to the upstream generation service, copying
// the bearer token from the incoming Authorization header. Requests without
// a token are refused with 401 before touching the upstream; any proxying
// failure maps to a structured 500 body.
// ============================================================================

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Default upstream generation service
const DEFAULT_UPSTREAM: &str = "https://api.stylegen.ai";

/// StyleGen API passthrough proxy
#[derive(Parser)]
#[command(
    name = "stylegen-proxy",
    version,
    about = "Forward /api requests to the StyleGen upstream"
)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8787")]
    listen: String,

    /// Upstream base URL (default: STYLEGEN_UPSTREAM_URL or the hosted service)
    #[arg(long)]
    upstream: Option<String>,
}

/// Shared proxy state
struct ProxyState {
    http: reqwest::Client,
    upstream: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let upstream = cli
        .upstream
        .or_else(|| std::env::var("STYLEGEN_UPSTREAM_URL").ok())
        .unwrap_or_else(|| DEFAULT_UPSTREAM.to_string());

    let state = Arc::new(ProxyState {
        http: reqwest::Client::new(),
        upstream: upstream.trim_end_matches('/').to_string(),
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&cli.listen)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen))?;
    info!("Proxy listening on {} -> {}", cli.listen, upstream);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Build the proxy router
fn router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/api/*path", any(passthrough))
        .with_state(state)
}

/// Forward one request to the upstream, mirroring its status and JSON body
async fn passthrough(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    Path(path): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "Missing API key", "NO_API_KEY");
    };

    let url = format!("{}/{}", state.upstream, path);
    debug!("{} {} -> {}", method, path, url);

    let mut request = state
        .http
        .request(method.clone(), &url)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json");

    if method != Method::GET && method != Method::HEAD && !body.is_empty() {
        request = request.body(body);
    }

    match forward(request).await {
        Ok((status, payload)) => (status, Json(payload)).into_response(),
        Err(e) => {
            error!("Proxy request failed: {}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Proxy service error",
                "PROXY_ERROR",
            )
        }
    }
}

/// Issue the upstream request and decode its JSON body
async fn forward(request: reqwest::RequestBuilder) -> Result<(StatusCode, serde_json::Value)> {
    let response = request.send().await.context("Upstream unreachable")?;
    let status = StatusCode::from_u16(response.status().as_u16())
        .context("Upstream returned an unmappable status")?;
    let payload = response
        .json::<serde_json::Value>()
        .await
        .context("Upstream body was not JSON")?;
    Ok((status, payload))
}

/// Extract the bearer token from the Authorization header. A header without
/// the `Bearer ` prefix is used as-is, matching the upstream contract.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Structured error body: { "error": ..., "code": ... }
fn error_response(status: StatusCode, message: &str, code: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": message,
            "code": code,
        })),
    )
        .into_response()
}
