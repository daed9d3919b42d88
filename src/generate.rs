//! End-to-end entry points for the two pipelines.
//!
//! Both flows run strictly sequentially: resolve the input, run the
//! relevant provider chain, write the artifact, write the manifest. Each
//! returns a run report carrying the per-stage outcome records alongside
//! the artifact and manifest paths.

use crate::config::Config;
use crate::describe;
use crate::error::MusegenError;
use crate::fallback::attempt_summary;
use crate::lyrics;
use crate::manifest::{self, Manifest};
use crate::outcome::{ExtractionResult, GenerationResult};
use crate::pipeline::{image, input, pdf, transcript};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Everything a completed poster run produced.
#[derive(Debug)]
pub struct PosterRun {
    /// Outcome record for the text extraction stage.
    pub extraction: ExtractionResult,
    /// Outcome record for the image generation stage.
    pub generation: GenerationResult,
    /// The description fed to the image providers.
    pub description: String,
    pub artifact_path: PathBuf,
    pub manifest_path: PathBuf,
    pub total_duration_ms: u64,
}

/// Everything a completed lyrics run produced.
#[derive(Debug)]
pub struct LyricsRun {
    /// Outcome record for the transcript retrieval stage.
    pub retrieval: ExtractionResult,
    /// The rendered song text, as written to the artifact.
    pub lyrics: String,
    /// The style actually used (unknown styles fall back to "pop").
    pub style: &'static str,
    pub artifact_path: PathBuf,
    pub manifest_path: PathBuf,
    pub total_duration_ms: u64,
}

/// Turn a PDF into a generated poster image.
///
/// This is the primary entry point for the poster flow.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL to a PDF
/// * `output` — Where the PNG artifact is written
/// * `config` — Pipeline configuration
///
/// # Errors
/// Returns `Err(MusegenError)` when the input is empty or unreadable, when
/// every extraction provider fails, when no description can be picked from
/// the extracted text, or when the artifact or manifest cannot be written.
/// The image chain itself ends in a local renderer and only fails on I/O.
pub async fn generate_poster(
    input: impl AsRef<str>,
    output: impl AsRef<Path>,
    config: &Config,
) -> Result<PosterRun, MusegenError> {
    let total_start = Instant::now();
    let input = input.as_ref().trim();
    let output = output.as_ref();
    if input.is_empty() {
        return Err(MusegenError::EmptyInput {
            what: "PDF path or URL",
        });
    }
    info!("Starting poster run: {}", input);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_pdf_input(input, config).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Extract text ─────────────────────────────────────────────
    let extracted = pdf::extract_pdf_text(&pdf_path, config).await?;
    let extraction = ExtractionResult::succeeded(
        extracted.text.clone(),
        extracted.provider,
        Some(attempt_summary(&extracted.attempts)),
    );
    info!(
        "Extracted {} chars via {}",
        extracted.text.chars().count(),
        extracted.provider
    );

    // ── Step 3: Pick a description ───────────────────────────────────────
    let normalized = describe::normalize_whitespace(&extracted.text);
    let description = describe::pick_description(&normalized);
    if description.is_empty() {
        return Err(MusegenError::NoUsableDescription);
    }
    debug!("Description: {} chars", description.chars().count());

    // ── Step 4: Generate the image ───────────────────────────────────────
    let generated = image::generate_image(&description, output, config).await?;
    let generation = GenerationResult::succeeded(
        generated.artifact_path.clone(),
        generated.provider,
        Some(attempt_summary(&generated.attempts)),
    );

    // ── Step 5: Write the manifest ───────────────────────────────────────
    let manifest_path = Manifest::for_poster(&generated.artifact_path, &description)
        .write()
        .await?;

    let total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Poster run complete: {} via {} in {}ms",
        generated.artifact_path.display(),
        generated.provider,
        total_duration_ms
    );

    Ok(PosterRun {
        extraction,
        generation,
        description,
        artifact_path: generated.artifact_path,
        manifest_path,
        total_duration_ms,
    })
}

/// Turn a video transcript into templated song lyrics.
///
/// # Arguments
/// * `source` — Video URL, bare video id, or path to a local transcript file
/// * `style` — Song style; unrecognized values fall back to "pop"
/// * `output` — Where the lyrics text artifact is written
/// * `config` — Pipeline configuration
///
/// # Errors
/// Returns `Err(MusegenError)` when the source is empty, when a local
/// transcript file is unreadable or blank, when every transcript provider
/// fails, or when the artifact or manifest cannot be written. A successful
/// audio download without a transcription backend surfaces as
/// [`MusegenError::TranscriptionNotConfigured`].
pub async fn generate_lyrics(
    source: impl AsRef<str>,
    style: &str,
    output: impl AsRef<Path>,
    config: &Config,
) -> Result<LyricsRun, MusegenError> {
    let total_start = Instant::now();
    let source = source.as_ref().trim();
    let output = output.as_ref();
    if source.is_empty() {
        return Err(MusegenError::EmptyInput {
            what: "video URL, video id, or transcript file",
        });
    }
    let style = lyrics::canonical_style(style);
    info!("Starting lyrics run: {} (style: {})", source, style);

    // ── Step 1: Obtain a transcript ──────────────────────────────────────
    // An existing local file is the transcript; no provider chain runs.
    let source_path = Path::new(source);
    let (transcript, retrieval) = if source_path.is_file() {
        let text = input::read_transcript_file(source_path).await?;
        if text.trim().is_empty() {
            return Err(MusegenError::InvalidInput {
                input: source.to_string(),
                reason: "transcript file is empty".to_string(),
            });
        }
        info!("Read transcript from local file: {}", source);
        let record = ExtractionResult::succeeded(text.clone(), "local-file", None);
        (text, record)
    } else {
        let fetched = transcript::fetch_transcript(source, config).await?;
        info!(
            "Retrieved {} chars via {}",
            fetched.transcript.chars().count(),
            fetched.provider
        );
        let record = ExtractionResult::succeeded(
            fetched.transcript.clone(),
            fetched.provider,
            Some(attempt_summary(&fetched.attempts)),
        );
        (fetched.transcript, record)
    };

    // ── Step 2: Render lyrics ────────────────────────────────────────────
    let normalized = describe::normalize_whitespace(&transcript);
    let lyrics_text = lyrics::render_lyrics(&normalized, style);

    // ── Step 3: Write the artifact ───────────────────────────────────────
    manifest::write_bytes_atomic(output, lyrics_text.as_bytes()).await?;

    // ── Step 4: Write the manifest ───────────────────────────────────────
    let manifest_path = Manifest::for_lyrics(output, &transcript).write().await?;

    let total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Lyrics run complete: {} in {}ms",
        output.display(),
        total_duration_ms
    );

    Ok(LyricsRun {
        retrieval,
        lyrics: lyrics_text,
        style,
        artifact_path: output.to_path_buf(),
        manifest_path,
        total_duration_ms,
    })
}

/// Synchronous wrapper around [`generate_poster`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_poster_sync(
    input: impl AsRef<str>,
    output: impl AsRef<Path>,
    config: &Config,
) -> Result<PosterRun, MusegenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MusegenError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(generate_poster(input, output, config))
}

/// Synchronous wrapper around [`generate_lyrics`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_lyrics_sync(
    source: impl AsRef<str>,
    style: &str,
    output: impl AsRef<Path>,
    config: &Config,
) -> Result<LyricsRun, MusegenError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| MusegenError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(generate_lyrics(source, style, output, config))
}
