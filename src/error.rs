//! Error types for the musegen library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`MusegenError`] — **Fatal**: the flow cannot produce an artifact at all
//!   (bad input, every provider exhausted, output not writable). Returned as
//!   `Err(MusegenError)` from the top-level `generate_*` functions.
//!
//! * [`crate::fallback::ProviderFailure`] — **Non-fatal**: a single provider
//!   attempt produced nothing usable. Stored inside
//!   [`crate::fallback::ProviderAttempt`] so the chain can move on to the next
//!   provider and still report every failure when the whole chain is
//!   exhausted.
//!
//! The separation keeps provider hiccups invisible to callers until no
//! provider is left, at which point the fatal error carries the complete
//! attempt log.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the musegen library.
///
/// Per-provider failures use [`crate::fallback::ProviderFailure`] and are
/// aggregated into [`MusegenError::AllProvidersFailed`] only when a chain is
/// exhausted.
#[derive(Debug, Error)]
pub enum MusegenError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The user supplied nothing (or only whitespace) where input is required.
    #[error("No {what} provided.\nEnter a value when prompted, or pass it as an argument.")]
    EmptyInput { what: &'static str },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL for this flow.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    // ── Download errors ───────────────────────────────────────────────────
    /// URL uses a scheme other than http/https. Checked before any network I/O.
    #[error("Unsupported URL scheme '{scheme}' in '{url}'\nOnly http:// and https:// URLs can be fetched.")]
    UnsupportedScheme { url: String, scheme: String },

    /// The server answered with a non-success status code.
    #[error("Server returned HTTP {status} for '{url}'")]
    HttpStatus { url: String, status: u16 },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file was fetched or opened, but its leading bytes do not match the
    /// expected signature.
    #[error("File is not a valid {expected} file: '{path}'\nFirst bytes: {magic:?}")]
    SignatureMismatch {
        path: PathBuf,
        expected: &'static str,
        magic: Vec<u8>,
    },

    // ── Chain errors ──────────────────────────────────────────────────────
    /// Every provider in a chain failed or was unavailable.
    ///
    /// `report` lists each provider with its failure reason or missing
    /// prerequisite, followed by remediation hints.
    #[error("No {task} provider produced a usable result.\n{report}")]
    AllProvidersFailed { task: &'static str, report: String },

    /// Extraction succeeded but no description could be picked from the text.
    #[error("Extracted text contains no usable description.\nThe document may be empty, image-only without OCR, or too short.")]
    NoUsableDescription,

    /// Audio was fetched but no speech-to-text backend is configured.
    ///
    /// An intentional terminal outcome of the transcript chain: the caption
    /// lookup found nothing and the audio path cannot go further on its own.
    #[error("Audio for '{input}' was downloaded ({detail}), but no transcription backend is configured.\nPublish captions for the video, or supply a transcript file instead of a URL.")]
    TranscriptionNotConfigured { input: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The local poster renderer could not produce its image.
    #[error("Poster rendering failed: {detail}")]
    RenderFailed { detail: String },

    /// Could not create or write an output artifact or manifest.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_scheme_display() {
        let e = MusegenError::UnsupportedScheme {
            url: "ftp://host/file.pdf".into(),
            scheme: "ftp".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ftp"), "got: {msg}");
        assert!(msg.contains("http://"), "got: {msg}");
    }

    #[test]
    fn all_providers_failed_display_carries_report() {
        let e = MusegenError::AllProvidersFailed {
            task: "image generation",
            report: "- openai-images: HTTP 401\n- stability: not available (STABILITY_API_KEY unset)".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("image generation"));
        assert!(msg.contains("openai-images"));
        assert!(msg.contains("stability"));
    }

    #[test]
    fn transcription_not_configured_display() {
        let e = MusegenError::TranscriptionNotConfigured {
            input: "https://youtu.be/abc123".into(),
            detail: "4.2 MiB of audio".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("no transcription backend"));
        assert!(msg.contains("abc123"));
    }

    #[test]
    fn signature_mismatch_display() {
        let e = MusegenError::SignatureMismatch {
            path: PathBuf::from("/tmp/x.bin"),
            expected: "PDF",
            magic: vec![0x50, 0x4b, 0x03, 0x04],
        };
        assert!(e.to_string().contains("PDF"));
    }

    #[test]
    fn empty_input_display_names_the_field() {
        let e = MusegenError::EmptyInput { what: "PDF path or URL" };
        assert!(e.to_string().contains("PDF path or URL"));
    }
}
