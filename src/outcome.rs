//! Stage result records: the uniform success/failure shapes the acquisition
//! and generation stages report.
//!
//! Invariants, enforced by the constructors:
//! - success implies the payload (text or artifact path) is present, and
//!   text payloads are non-empty
//! - failure implies an error message is present
//!
//! Records live only for the duration of one invocation and are never
//! persisted; the manifest is the only durable trace of a run.

use std::path::PathBuf;

/// Outcome of a text acquisition stage (PDF extraction or transcript fetch).
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub success: bool,
    /// Acquired text. Present and non-empty exactly when `success`.
    pub text: Option<String>,
    /// Name of the provider that produced the text.
    pub provider: Option<&'static str>,
    pub error: Option<String>,
    /// Per-provider attempt log for diagnostics.
    pub details: Option<String>,
}

impl ExtractionResult {
    pub fn succeeded(text: String, provider: &'static str, details: Option<String>) -> Self {
        debug_assert!(!text.is_empty(), "success requires non-empty text");
        Self {
            success: true,
            text: Some(text),
            provider: Some(provider),
            error: None,
            details,
        }
    }

    pub fn failed(error: String, details: Option<String>) -> Self {
        Self {
            success: false,
            text: None,
            provider: None,
            error: Some(error),
            details,
        }
    }
}

/// Outcome of an artifact generation stage (image or lyrics).
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub success: bool,
    /// Path of the written artifact. Present exactly when `success`.
    pub artifact_path: Option<PathBuf>,
    /// Name of the provider that produced the artifact.
    pub provider: Option<&'static str>,
    pub error: Option<String>,
    /// Per-provider attempt log for diagnostics.
    pub details: Option<String>,
}

impl GenerationResult {
    pub fn succeeded(
        artifact_path: PathBuf,
        provider: &'static str,
        details: Option<String>,
    ) -> Self {
        Self {
            success: true,
            artifact_path: Some(artifact_path),
            provider: Some(provider),
            error: None,
            details,
        }
    }

    pub fn failed(error: String, details: Option<String>) -> Self {
        Self {
            success: false,
            artifact_path: None,
            provider: None,
            error: Some(error),
            details,
        }
    }
}
