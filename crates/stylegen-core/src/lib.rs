//! ============================================================================
//! STYLEGEN-CORE: credential gate + style-transfer workflow
//! ============================================================================
//! This crate holds all the backend logic for StyleGen:
//! - API-key validation/normalization and the auth session lifecycle
//! - Persistent credential storage via redb
//! - The style-transfer generation client (one request per invocation)
//! - The four-stage Upload/Style/Generating/Result workflow machine
//! ============================================================================

pub mod auth;
pub mod config;
pub mod executor;
pub mod store;
pub mod types;
pub mod workflow;

// Re-export main types for convenience
pub use auth::{normalize, AuthSession, AuthStatus, KeyCheck};
pub use config::AppConfig;
pub use executor::StyleTransferExecutor;
pub use store::{CredentialStore, MemoryCredentialStore, RedbCredentialStore};
pub use types::{redact_credential, GeneratedImage, GenerationError, ImageRef, StyleChoice};
pub use workflow::{
    apply, WorkflowController, WorkflowEvent, WorkflowState, WorkflowStep,
    MAX_SIMULATED_PROGRESS, PROGRESS_TICK_MS,
};
