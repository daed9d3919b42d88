//! # musegen
//!
//! Turn PDFs into poster images and video transcripts into song lyrics,
//! with layered provider fallbacks that keep both flows usable offline.
//!
//! ## Why this crate?
//!
//! Remote generation APIs work until a credential is missing, a call times
//! out, or a document turns out to be scanned. Every stage here runs through
//! an ordered provider chain that tries the best tool first and degrades
//! gracefully: PDF text extraction ends in OCR, image generation ends in a
//! deterministic local poster renderer that always succeeds, and transcript
//! retrieval reports exactly which prerequisite is missing when it cannot go
//! further.
//!
//! ## Pipeline Overview
//!
//! ```text
//! poster   PDF (path or URL)
//!           │
//!           ├─ 1. Input     resolve local file or download from URL
//!           ├─ 2. Extract   quick-parse → poppler-layout → pdfium-text → ocr
//!           ├─ 3. Describe  normalize text, pick a description section
//!           ├─ 4. Generate  openai-images → stability → poster-render
//!           └─ 5. Manifest  artifact + <stem>_manifest.txt
//!
//! lyrics   video URL / id / transcript file
//!           │
//!           ├─ 1. Source    local file, or captions → audio-download
//!           ├─ 2. Template  fixed verse/chorus/bridge song structure
//!           └─ 3. Manifest  artifact + <stem>_manifest.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use musegen::{generate_poster, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Remote image providers are auto-detected from OPENAI_API_KEY /
//!     // STABILITY_API_KEY; without them the local renderer still succeeds.
//!     let config = Config::from_env()?;
//!     let run = generate_poster("document.pdf", "generated_image.png", &config).await?;
//!     println!("{}", run.artifact_path.display());
//!     eprintln!(
//!         "extracted via {:?}, generated via {:?}",
//!         run.extraction.provider, run.generation.provider
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `musegen` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! musegen = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod describe;
pub mod download;
pub mod error;
pub mod fallback;
pub mod generate;
pub mod lyrics;
pub mod manifest;
pub mod outcome;
pub mod pipeline;
pub mod render;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Config, ConfigBuilder, ImageSize};
pub use error::MusegenError;
pub use fallback::{FallbackChain, Provider, ProviderAttempt, ProviderFailure, Verdict};
pub use generate::{
    generate_lyrics, generate_lyrics_sync, generate_poster, generate_poster_sync, LyricsRun,
    PosterRun,
};
pub use manifest::{manifest_path_for, Manifest};
pub use outcome::{ExtractionResult, GenerationResult};
