//! HTTP download helper: fetch a remote file into a guarded temp file.
//!
//! Only `http://` and `https://` URLs are accepted, and the scheme is
//! rejected before any network activity. The body is streamed to disk in
//! chunks, and an optional magic-byte signature is checked once the first
//! bytes arrive. The temp file is removed automatically on every failure
//! path; callers keep it alive by holding the returned [`DownloadedFile`].

use crate::error::MusegenError;
use futures::StreamExt;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Expected leading bytes for a downloaded file format.
pub struct Signature {
    /// Human-readable format name for error messages.
    pub label: &'static str,
    /// Bytes the file must start with.
    pub magic: &'static [u8],
    /// Temp-file suffix, so downstream tools see a familiar extension.
    pub suffix: &'static str,
}

/// PDF files start with `%PDF-`.
pub const PDF_SIGNATURE: Signature = Signature {
    label: "PDF",
    magic: b"%PDF-",
    suffix: ".pdf",
};

/// A downloaded temp file. Deleted from disk when this value drops.
#[derive(Debug)]
pub struct DownloadedFile {
    file: NamedTempFile,
    bytes: u64,
}

impl DownloadedFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Total bytes written to disk.
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }
}

/// Download `url` into a temp file, optionally verifying its signature.
///
/// # Errors
/// - [`MusegenError::EmptyInput`] for a blank URL
/// - [`MusegenError::UnsupportedScheme`] for anything but http/https
/// - [`MusegenError::HttpStatus`] for non-2xx responses
/// - [`MusegenError::DownloadTimeout`] / [`MusegenError::DownloadFailed`]
///   for network failures
/// - [`MusegenError::SignatureMismatch`] when the first bytes do not match
pub async fn fetch_to_temp(
    url: &str,
    timeout_secs: u64,
    signature: Option<&Signature>,
) -> Result<DownloadedFile, MusegenError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(MusegenError::EmptyInput {
            what: "download URL",
        });
    }

    match url_scheme(url) {
        Some(scheme) if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") => {}
        other => {
            return Err(MusegenError::UnsupportedScheme {
                url: url.to_string(),
                scheme: other.unwrap_or("none").to_string(),
            });
        }
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MusegenError::Internal(format!("HTTP client construction failed: {e}")))?;

    debug!("Downloading {url} (timeout {timeout_secs}s)");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_network_error(url, timeout_secs, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MusegenError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let suffix = signature.map(|s| s.suffix).unwrap_or(".bin");
    let mut file = tempfile::Builder::new()
        .prefix("musegen-dl-")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| MusegenError::DownloadFailed {
            url: url.to_string(),
            reason: format!("could not create temp file: {e}"),
        })?;

    let magic_len = signature.map(|s| s.magic.len()).unwrap_or(0);
    let mut head: Vec<u8> = Vec::with_capacity(magic_len);
    let mut total: u64 = 0;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| classify_network_error(url, timeout_secs, e))?;
        if head.len() < magic_len {
            let need = magic_len - head.len();
            head.extend_from_slice(&chunk[..need.min(chunk.len())]);
        }
        file.write_all(&chunk)
            .map_err(|e| MusegenError::DownloadFailed {
                url: url.to_string(),
                reason: format!("could not write temp file: {e}"),
            })?;
        total += chunk.len() as u64;
    }
    file.flush().map_err(|e| MusegenError::DownloadFailed {
        url: url.to_string(),
        reason: format!("could not flush temp file: {e}"),
    })?;

    if let Some(sig) = signature {
        if !head.starts_with(sig.magic) {
            // NamedTempFile removes itself when this error drops it.
            return Err(MusegenError::SignatureMismatch {
                path: file.path().to_path_buf(),
                expected: sig.label,
                magic: head,
            });
        }
    }

    info!("Downloaded {total} bytes from {url}");
    Ok(DownloadedFile { file, bytes: total })
}

fn classify_network_error(url: &str, timeout_secs: u64, e: reqwest::Error) -> MusegenError {
    if e.is_timeout() {
        MusegenError::DownloadTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        }
    } else {
        MusegenError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

fn url_scheme(url: &str) -> Option<&str> {
    url.split_once("://").map(|(scheme, _)| scheme)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_url_is_rejected() {
        let err = tokio_test::block_on(fetch_to_temp("   ", 5, None)).unwrap_err();
        assert!(matches!(err, MusegenError::EmptyInput { .. }));
    }

    #[test]
    fn non_http_schemes_are_rejected_before_any_network_use() {
        for (url, scheme) in [
            ("ftp://host/file.pdf", "ftp"),
            ("file:///etc/passwd", "file"),
            ("FTP://host/file.pdf", "FTP"),
        ] {
            let err = tokio_test::block_on(fetch_to_temp(url, 5, None)).unwrap_err();
            match err {
                MusegenError::UnsupportedScheme { scheme: got, .. } => assert_eq!(got, scheme),
                other => panic!("expected UnsupportedScheme, got {other:?}"),
            }
        }
    }

    #[test]
    fn scheme_less_input_reports_none() {
        let err = tokio_test::block_on(fetch_to_temp("not-a-url", 5, None)).unwrap_err();
        match err {
            MusegenError::UnsupportedScheme { scheme, .. } => assert_eq!(scheme, "none"),
            other => panic!("expected UnsupportedScheme, got {other:?}"),
        }
    }

    #[test]
    fn pdf_signature_matches_the_header_bytes() {
        assert_eq!(PDF_SIGNATURE.magic, b"%PDF-");
        assert_eq!(PDF_SIGNATURE.suffix, ".pdf");
    }

    #[test]
    fn url_scheme_parses_common_shapes() {
        assert_eq!(url_scheme("https://x.test/a.pdf"), Some("https"));
        assert_eq!(url_scheme("http://x.test"), Some("http"));
        assert_eq!(url_scheme("ftp://x"), Some("ftp"));
        assert_eq!(url_scheme("/local/path.pdf"), None);
    }
}
