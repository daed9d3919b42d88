//! Pipeline stages for the poster and lyrics flows.
//!
//! Each submodule owns one stage. Stages run strictly one after another;
//! every provider inside a stage is awaited to completion before the next is
//! considered.
//!
//! ## Data Flow
//!
//! ```text
//! poster:  input ──▶ pdf ─────▶ describe ──▶ image ──▶ manifest
//!          (path/URL) (text ladder) (picker)   (providers + local render)
//!
//! lyrics:  input ──▶ transcript ──▶ lyrics ──▶ manifest
//!          (path/URL) (captions/yt-dlp) (templater)
//! ```
//!
//! 1. [`input`]      — canonicalise the user-supplied path or URL to a local
//!    file, downloads guarded by temp-file scopes
//! 2. [`pdf`]        — text extraction ladder with the gated OCR second pass
//! 3. [`image`]      — remote image providers with the local poster renderer
//!    as the guaranteed terminal fallback
//! 4. [`transcript`] — caption fetch, then audio download that ends in the
//!    explicit "transcription not configured" outcome

use std::process::Stdio;
use tokio::process::Command;

pub mod image;
pub mod input;
pub mod pdf;
pub mod transcript;

/// Probe an external command for availability checks.
///
/// A command counts as present when it can be spawned at all; its exit
/// status does not matter.
pub(crate) async fn command_exists(cmd: &str, probe_arg: &str) -> Result<(), String> {
    match Command::new(cmd)
        .arg(probe_arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(_) => Ok(()),
        Err(e) => Err(format!("'{cmd}' is not runnable: {e}")),
    }
}
