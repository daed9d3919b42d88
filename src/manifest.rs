//! Manifest writing: the durable trace of a successful run.
//!
//! A manifest is a small text file written next to the artifact, recording
//! when it was generated, where the artifact lives, and the source text that
//! drove it. It is written once and never read back by this crate.

use crate::error::MusegenError;
use std::path::{Path, PathBuf};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::debug;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]Z");

/// A run manifest, rendered as a small markdown-ish text block.
pub struct Manifest<'a> {
    /// Headline naming the flow.
    pub kind: &'a str,
    /// Label for the artifact path line (`Image`, `Lyrics`).
    pub artifact_label: &'a str,
    /// Section heading for the source text.
    pub source_label: &'a str,
    pub artifact_path: &'a Path,
    pub source_text: &'a str,
}

impl<'a> Manifest<'a> {
    pub fn for_poster(artifact_path: &'a Path, description: &'a str) -> Self {
        Self {
            kind: "PDF → Image Manifest",
            artifact_label: "Image",
            source_label: "Description Used",
            artifact_path,
            source_text: description,
        }
    }

    pub fn for_lyrics(artifact_path: &'a Path, transcript: &'a str) -> Self {
        Self {
            kind: "Transcript → Lyrics Manifest",
            artifact_label: "Lyrics",
            source_label: "Source Used",
            artifact_path,
            source_text: transcript,
        }
    }

    /// Write the manifest next to the artifact, returning its path.
    ///
    /// The timestamp is the current UTC time, formatted
    /// `YYYY-MM-DD HH:MM:SSZ`.
    pub async fn write(&self) -> Result<PathBuf, MusegenError> {
        let timestamp = OffsetDateTime::now_utc()
            .format(TIMESTAMP_FORMAT)
            .map_err(|e| MusegenError::Internal(format!("Timestamp formatting failed: {e}")))?;
        let manifest_path = manifest_path_for(self.artifact_path);
        write_bytes_atomic(&manifest_path, self.render(&timestamp).as_bytes()).await?;
        debug!("Wrote manifest {}", manifest_path.display());
        Ok(manifest_path)
    }

    fn render(&self, timestamp: &str) -> String {
        format!(
            "# {kind}\n# Generated: {timestamp}\n# {label}: {path}\n\n## {source}\n\n{text}\n",
            kind = self.kind,
            label = self.artifact_label,
            path = self.artifact_path.display(),
            source = self.source_label,
            text = self.source_text,
        )
    }
}

/// Manifest file path for an artifact: `<stem>_manifest.txt` in the same
/// directory.
pub fn manifest_path_for(artifact: &Path) -> PathBuf {
    let stem = artifact
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("artifact");
    artifact.with_file_name(format!("{stem}_manifest.txt"))
}

/// Atomic write: temp sibling file + rename, so a crash never leaves a
/// partial artifact behind.
pub(crate) async fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<(), MusegenError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| MusegenError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = tmp_sibling(path);
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| MusegenError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| MusegenError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

fn tmp_sibling(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => path.with_extension(format!("{ext}.tmp")),
        None => path.with_extension("tmp"),
    }
}
