//! PDF text extraction: an ordered ladder of backends from cheap to heavy.
//!
//! The ladder is `quick-parse` (pure Rust, always available) →
//! `poppler-layout` (`pdftotext -layout`, best on column layouts) →
//! `pdfium-text` (native library, most tolerant of odd PDFs) → `ocr`
//! (rasterise with pdfium, read with `tesseract`).
//!
//! OCR runs as a second phase: it is attempted only when the text ladder
//! produced fewer than `ocr_trigger_len` usable characters, and its output
//! replaces the earlier result only under the pick-longer rule in
//! [`ocr_supersedes`]. Scanned documents thus get a real chance while
//! born-digital ones never pay the OCR cost.
//!
//! Native parsers run inside `spawn_blocking`: they are CPU-bound, and
//! `pdf-extract` is known to panic on malformed files, which the task
//! boundary converts into an ordinary provider failure.

use crate::config::Config;
use crate::describe;
use crate::error::MusegenError;
use crate::fallback::{FallbackChain, Provider, ProviderAttempt, ProviderFailure, Verdict};
use crate::pipeline::command_exists;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Winning text plus provenance for the extraction stage.
#[derive(Debug)]
pub struct PdfExtraction {
    /// Raw text from the winning provider, not yet normalized.
    pub text: String,
    pub provider: &'static str,
    pub attempts: Vec<ProviderAttempt>,
}

/// Extract text from a local PDF file through the provider ladder.
pub async fn extract_pdf_text(path: &Path, config: &Config) -> Result<PdfExtraction, MusegenError> {
    let input = path.to_str().ok_or_else(|| MusegenError::InvalidInput {
        input: path.display().to_string(),
        reason: "path is not valid UTF-8".to_string(),
    })?;

    let accept = |text: &String| text_verdict(text, config.min_text_len);

    let text_chain = build_text_chain(config);
    let mut outcome = text_chain.run(input, &accept).await;

    let best_len = outcome
        .winner
        .as_ref()
        .map(|w| normalized_len(&w.payload))
        .unwrap_or(0);

    if best_len < config.ocr_trigger_len {
        info!(
            best_len,
            trigger = config.ocr_trigger_len,
            "text result below OCR trigger, attempting OCR"
        );
        let ocr_chain = FallbackChain::new("PDF OCR").with(Box::new(OcrRasterize::from_config(config)));
        let ocr_outcome = ocr_chain.run(input, &accept).await;

        if let Some(ocr_winner) = ocr_outcome.winner {
            let ocr_len = normalized_len(&ocr_winner.payload);
            if ocr_supersedes(best_len, ocr_len) {
                info!(ocr_len, best_len, "OCR output supersedes the text result");
                outcome.winner = Some(ocr_winner);
            } else {
                debug!(ocr_len, best_len, "OCR output discarded under the pick-longer rule");
            }
        }
        outcome.attempts.extend(ocr_outcome.attempts);
    }

    match outcome.winner {
        Some(winner) => {
            debug!(
                provider = winner.provider,
                chars = winner.payload.chars().count(),
                "PDF extraction winner"
            );
            Ok(PdfExtraction {
                text: winner.payload,
                provider: winner.provider,
                attempts: outcome.attempts,
            })
        }
        None => {
            // Reported through the full ladder so the OCR hint is included.
            let full_chain = text_chain.with(Box::new(OcrRasterize::from_config(config)));
            Err(full_chain.exhaustion_error(outcome.attempts))
        }
    }
}

fn build_text_chain(config: &Config) -> FallbackChain<String> {
    FallbackChain::new("PDF text extraction")
        .with(Box::new(QuickParse))
        .with(Box::new(PopplerLayout::from_config(config)))
        .with(Box::new(PdfiumText::from_config(config)))
}

/// Pick-longer rule: OCR output replaces the text-parser result only when
/// strictly longer. Lengths are normalized character counts. A heuristic
/// carried over as an explicit policy; review before relying on it for
/// documents where OCR noise could outweigh short genuine text.
pub fn ocr_supersedes(best_len: usize, ocr_len: usize) -> bool {
    ocr_len > best_len
}

fn text_verdict(text: &str, min_len: usize) -> Verdict {
    let len = normalized_len(text);
    if len >= min_len {
        Verdict::Usable
    } else {
        Verdict::Rejected(format!("usable text too short ({len} chars, need {min_len})"))
    }
}

fn normalized_len(text: &str) -> usize {
    describe::normalize_whitespace(text).chars().count()
}

// ── quick-parse ──────────────────────────────────────────────────────────

/// Pure-Rust parser (`pdf-extract`). No external requirements, but it reads
/// the whole document and gives up on exotic encodings.
struct QuickParse;

#[async_trait]
impl Provider<String> for QuickParse {
    fn name(&self) -> &'static str {
        "quick-parse"
    }

    async fn availability(&self) -> Result<(), String> {
        Ok(())
    }

    async fn attempt(&self, input: &str) -> Result<String, ProviderFailure> {
        let path = PathBuf::from(input);
        let parsed = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&path)).await;
        match parsed {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ProviderFailure::with_detail(
                "pure-Rust parser failed",
                e.to_string(),
            )),
            Err(e) => Err(ProviderFailure::with_detail(
                "parser task panicked",
                e.to_string(),
            )),
        }
    }
}

// ── poppler-layout ───────────────────────────────────────────────────────

/// Layout-aware extraction via the poppler `pdftotext` command.
struct PopplerLayout {
    cmd: String,
    max_pages: usize,
}

impl PopplerLayout {
    fn from_config(config: &Config) -> Self {
        Self {
            cmd: config.pdftotext_cmd.clone(),
            max_pages: config.max_pages,
        }
    }
}

#[async_trait]
impl Provider<String> for PopplerLayout {
    fn name(&self) -> &'static str {
        "poppler-layout"
    }

    async fn availability(&self) -> Result<(), String> {
        command_exists(&self.cmd, "-v").await
    }

    async fn attempt(&self, input: &str) -> Result<String, ProviderFailure> {
        let output = Command::new(&self.cmd)
            .arg("-layout")
            .arg("-nopgbrk")
            .arg("-l")
            .arg(self.max_pages.to_string())
            .arg(input)
            .arg("-")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProviderFailure::with_detail("could not run pdftotext", e.to_string()))?;

        if !output.status.success() {
            return Err(ProviderFailure::with_detail(
                format!("pdftotext exited with {}", output.status),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn remediation(&self) -> Option<&'static str> {
        Some("install poppler-utils (provides pdftotext) for layout-aware extraction")
    }
}

// ── pdfium-text ──────────────────────────────────────────────────────────

/// Native pdfium text extraction. Skipped when no pdfium shared library can
/// be bound.
struct PdfiumText {
    lib_path: Option<PathBuf>,
    max_pages: usize,
}

impl PdfiumText {
    fn from_config(config: &Config) -> Self {
        Self {
            lib_path: config.pdfium_lib_path.clone(),
            max_pages: config.max_pages,
        }
    }
}

#[async_trait]
impl Provider<String> for PdfiumText {
    fn name(&self) -> &'static str {
        "pdfium-text"
    }

    async fn availability(&self) -> Result<(), String> {
        probe_pdfium(self.lib_path.clone()).await
    }

    async fn attempt(&self, input: &str) -> Result<String, ProviderFailure> {
        let path = PathBuf::from(input);
        let lib_path = self.lib_path.clone();
        let max_pages = self.max_pages;

        let result = tokio::task::spawn_blocking(move || {
            extract_with_pdfium(&path, lib_path.as_deref(), max_pages)
        })
        .await;
        match result {
            Ok(r) => r,
            Err(e) => Err(ProviderFailure::with_detail(
                "pdfium task panicked",
                e.to_string(),
            )),
        }
    }

    fn remediation(&self) -> Option<&'static str> {
        Some("install a pdfium shared library, or point PDFIUM_LIB_PATH at one")
    }
}

fn extract_with_pdfium(
    path: &Path,
    lib_path: Option<&Path>,
    max_pages: usize,
) -> Result<String, ProviderFailure> {
    let pdfium = bind_pdfium(lib_path).map_err(ProviderFailure::new)?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ProviderFailure::with_detail("pdfium could not open the PDF", format!("{e:?}")))?;

    let mut pages_text = Vec::new();
    for page in document.pages().iter().take(max_pages) {
        match page.text() {
            Ok(text) => pages_text.push(text.all()),
            Err(e) => debug!("skipping unreadable page: {e:?}"),
        }
    }
    Ok(pages_text.join("\n\n"))
}

/// Bind pdfium from the configured path or the usual system locations.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, String> {
    let bindings = match lib_path {
        Some(path) => Pdfium::bind_to_library(path)
            .map_err(|e| format!("could not bind pdfium at '{}': {e:?}", path.display()))?,
        None => Pdfium::bind_to_system_library()
            .map_err(|e| format!("no pdfium library found on this system: {e:?}"))?,
    };
    Ok(Pdfium::new(bindings))
}

async fn probe_pdfium(lib_path: Option<PathBuf>) -> Result<(), String> {
    tokio::task::spawn_blocking(move || bind_pdfium(lib_path.as_deref()).map(|_| ()))
        .await
        .map_err(|e| format!("pdfium probe panicked: {e}"))?
}

// ── ocr ──────────────────────────────────────────────────────────────────

/// Rasterise pages with pdfium and read them with the `tesseract` command.
/// The heavy road: needs both pdfium and tesseract, so it sits last.
struct OcrRasterize {
    lib_path: Option<PathBuf>,
    tesseract_cmd: String,
    max_pages: usize,
    max_rendered_pixels: u32,
}

impl OcrRasterize {
    fn from_config(config: &Config) -> Self {
        Self {
            lib_path: config.pdfium_lib_path.clone(),
            tesseract_cmd: config.tesseract_cmd.clone(),
            max_pages: config.max_pages,
            max_rendered_pixels: config.max_rendered_pixels,
        }
    }

    async fn run_tesseract(&self, image_path: &Path) -> Result<String, ProviderFailure> {
        let output = Command::new(&self.tesseract_cmd)
            .arg(image_path)
            .arg("stdout")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProviderFailure::with_detail("could not run tesseract", e.to_string()))?;

        if !output.status.success() {
            return Err(ProviderFailure::with_detail(
                format!("tesseract exited with {}", output.status),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Provider<String> for OcrRasterize {
    fn name(&self) -> &'static str {
        "ocr"
    }

    async fn availability(&self) -> Result<(), String> {
        command_exists(&self.tesseract_cmd, "--version").await?;
        probe_pdfium(self.lib_path.clone()).await
    }

    async fn attempt(&self, input: &str) -> Result<String, ProviderFailure> {
        let path = PathBuf::from(input);
        let lib_path = self.lib_path.clone();
        let max_pages = self.max_pages;
        let max_px = self.max_rendered_pixels;

        // Page images live in a scoped temp dir, removed when the attempt
        // ends on any path.
        let temp_dir = tempfile::tempdir().map_err(|e| {
            ProviderFailure::with_detail("could not create temp dir for page images", e.to_string())
        })?;
        let dir = temp_dir.path().to_path_buf();

        let page_images = tokio::task::spawn_blocking(move || {
            rasterize_pages(&path, lib_path.as_deref(), max_pages, max_px, &dir)
        })
        .await
        .map_err(|e| ProviderFailure::with_detail("rasterisation task panicked", e.to_string()))??;

        let mut page_texts = Vec::new();
        for (page_no, image_path) in &page_images {
            match self.run_tesseract(image_path).await {
                Ok(text) => {
                    debug!(page = page_no, chars = text.len(), "OCR page done");
                    page_texts.push(text);
                }
                Err(failure) => {
                    warn!(page = page_no, reason = %failure, "tesseract failed on page");
                }
            }
        }

        if page_texts.is_empty() {
            return Err(ProviderFailure::new("OCR produced no text on any page"));
        }
        Ok(page_texts.join("\n\n"))
    }

    fn remediation(&self) -> Option<&'static str> {
        Some("install tesseract to enable OCR of scanned documents")
    }
}

/// Render the first pages to PNG files for OCR.
fn rasterize_pages(
    path: &Path,
    lib_path: Option<&Path>,
    max_pages: usize,
    max_pixels: u32,
    dir: &Path,
) -> Result<Vec<(usize, PathBuf)>, ProviderFailure> {
    let pdfium = bind_pdfium(lib_path).map_err(ProviderFailure::new)?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ProviderFailure::with_detail("pdfium could not open the PDF", format!("{e:?}")))?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::new();
    for (idx, page) in document.pages().iter().take(max_pages).enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ProviderFailure::with_detail(
                format!("rasterisation of page {} failed", idx + 1),
                format!("{e:?}"),
            )
        })?;
        let image = bitmap.as_image();
        let png_path = dir.join(format!("page-{}.png", idx + 1));
        image
            .save_with_format(&png_path, image::ImageFormat::Png)
            .map_err(|e| {
                ProviderFailure::with_detail(
                    format!("could not write page {} image", idx + 1),
                    e.to_string(),
                )
            })?;
        debug!(
            "Rasterised page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push((idx + 1, png_path));
    }
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_longer_rule() {
        assert!(ocr_supersedes(0, 1));
        assert!(ocr_supersedes(100, 250));
        assert!(!ocr_supersedes(100, 100));
        assert!(!ocr_supersedes(100, 40));
    }

    #[test]
    fn verdict_rejects_whitespace_only_text() {
        assert!(matches!(text_verdict("   \n\t  ", 1), Verdict::Rejected(_)));
        assert!(matches!(text_verdict("a", 1), Verdict::Usable));
        assert!(matches!(text_verdict("hi", 5), Verdict::Rejected(_)));
        assert!(matches!(text_verdict("hello", 5), Verdict::Usable));
    }

    #[test]
    fn ladder_has_three_text_providers() {
        let config = Config::default();
        let chain = build_text_chain(&config);
        assert_eq!(chain.task(), "PDF text extraction");
        assert_eq!(chain.len(), 3);
    }
}
