//! Input resolution: normalise a user-supplied path or URL to a local file.
//!
//! PDF backends need a file-system path, so URLs are fetched to a guarded
//! temp file first. The temp file lives inside [`ResolvedInput`] and is
//! deleted when it drops, on every exit path. Local files are validated for
//! existence, readability and the `%PDF-` signature before any backend runs.

use crate::config::Config;
use crate::download::{self, DownloadedFile, PDF_SIGNATURE};
use crate::error::MusegenError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The resolved input, either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL, fetched to a temp file that is removed on drop.
    Downloaded(DownloadedFile),
}

impl ResolvedInput {
    /// Path to the file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded(f) => f.path(),
        }
    }
}

/// Resolve a PDF path or URL to a readable local PDF file.
///
/// Anything scheme-qualified goes through the downloader, which rejects
/// non-http(s) schemes before any network I/O.
pub async fn resolve_pdf_input(input: &str, config: &Config) -> Result<ResolvedInput, MusegenError> {
    if input.contains("://") {
        info!("Fetching PDF from URL: {input}");
        let file =
            download::fetch_to_temp(input, config.download_timeout_secs, Some(&PDF_SIGNATURE))
                .await?;
        Ok(ResolvedInput::Downloaded(file))
    } else {
        resolve_local_pdf(input)
    }
}

/// Resolve a local path, validating existence and PDF magic bytes.
fn resolve_local_pdf(path_str: &str) -> Result<ResolvedInput, MusegenError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(MusegenError::FileNotFound { path });
    }

    // Check read permission by attempting to open.
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 5];
            if f.read_exact(&mut magic).is_ok() && magic != *PDF_SIGNATURE.magic {
                return Err(MusegenError::SignatureMismatch {
                    path,
                    expected: PDF_SIGNATURE.label,
                    magic: magic.to_vec(),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(MusegenError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(MusegenError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Read a local transcript file.
pub async fn read_transcript_file(path: &Path) -> Result<String, MusegenError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            debug!(
                "Read transcript file {} ({} chars)",
                path.display(),
                text.chars().count()
            );
            Ok(text)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MusegenError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(MusegenError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(MusegenError::InvalidInput {
            input: path.display().to_string(),
            reason: format!("could not read file: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_local_file_is_reported() {
        let err = resolve_local_pdf("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, MusegenError::FileNotFound { .. }));
    }

    #[test]
    fn unsupported_scheme_is_routed_to_the_downloader() {
        let config = Config::default();
        let err = tokio_test::block_on(resolve_pdf_input("ftp://host/doc.pdf", &config))
            .unwrap_err();
        match err {
            MusegenError::UnsupportedScheme { scheme, .. } => assert_eq!(scheme, "ftp"),
            other => panic!("expected UnsupportedScheme, got {other:?}"),
        }
    }

    #[test]
    fn non_pdf_local_file_fails_the_signature_check() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 definitely a zip").unwrap();

        let err = resolve_local_pdf(f.path().to_str().unwrap()).unwrap_err();
        match err {
            MusegenError::SignatureMismatch { magic, .. } => {
                assert_eq!(&magic[..2], b"PK");
            }
            other => panic!("expected SignatureMismatch, got {other:?}"),
        }
    }

    #[test]
    fn pdf_magic_passes_resolution() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n").unwrap();

        let resolved = resolve_local_pdf(f.path().to_str().unwrap()).unwrap();
        assert_eq!(resolved.path(), f.path());
    }

    #[test]
    fn transcript_read_maps_not_found() {
        let err =
            tokio_test::block_on(read_transcript_file(Path::new("/no/such/transcript.txt")))
                .unwrap_err();
        assert!(matches!(err, MusegenError::FileNotFound { .. }));
    }
}
