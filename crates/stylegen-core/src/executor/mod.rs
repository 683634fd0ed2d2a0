//! ============================================================================
//! Executor Module - outbound calls to the generation service
//! ============================================================================
//! Contains the style-transfer executor, the single side-effecting edge of
//! the workflow.
//! ============================================================================

mod style_transfer;

pub use style_transfer::StyleTransferExecutor;
