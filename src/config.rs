//! Configuration types for the poster and lyrics flows.
//!
//! All pipeline behaviour is controlled through [`Config`], built via its
//! [`ConfigBuilder`] or loaded from the environment with [`Config::from_env`].
//! Keeping every knob in one struct means chains are constructed from one
//! validated value instead of each provider reading the environment on its
//! own, and a run can be reproduced by logging a single struct.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::MusegenError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration shared by the poster and lyrics pipelines.
///
/// Built via [`Config::builder()`], [`Config::from_env()`] or
/// [`Config::default()`].
///
/// # Example
/// ```rust
/// use musegen::Config;
///
/// let config = Config::builder()
///     .max_pages(3)
///     .image_size(512, 512)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct Config {
    /// OpenAI API key. Presence enables the `openai-images` provider;
    /// absence means that provider is skipped, never an error.
    pub openai_api_key: Option<String>,

    /// Stability API key. Presence enables the `stability` provider.
    pub stability_api_key: Option<String>,

    /// Model override for remote image generation. `None` uses each
    /// provider's default model.
    pub image_model: Option<String>,

    /// Pixel dimensions of generated images. Default: 1024×1024.
    ///
    /// Applies to remote providers (sent as `WIDTHxHEIGHT`) and to the local
    /// poster renderer alike, so a fallback artifact has the same geometry as
    /// a remote one.
    pub image_size: ImageSize,

    /// Maximum PDF pages read during text extraction. Default: 5.
    ///
    /// Descriptions live on the first pages of real documents; reading a
    /// 400-page manual end-to-end buys nothing and makes the OCR fallback
    /// painfully slow.
    pub max_pages: usize,

    /// Maximum rendered page dimension (width or height) in pixels when
    /// rasterising for OCR. Default: 2000.
    ///
    /// A safety cap: an A0 poster page could otherwise rasterise to a
    /// 13 000 × 18 000 px image and exhaust memory before tesseract ever
    /// runs.
    pub max_rendered_pixels: u32,

    /// Character-length bar under which OCR is attempted even though a text
    /// parser returned something. Default: 200.
    ///
    /// A scanned PDF often yields a few dozen junk characters from embedded
    /// metadata; genuine body text is comfortably longer.
    pub ocr_trigger_len: usize,

    /// Minimum usable length for extracted text after normalization.
    /// Default: 1 (any non-empty text).
    pub min_text_len: usize,

    /// Command used for the layout-aware extraction backend. Default: `pdftotext`.
    pub pdftotext_cmd: String,

    /// Command used for the OCR backend. Default: `tesseract`.
    pub tesseract_cmd: String,

    /// Command used to fetch audio in the transcript chain. Default: `yt-dlp`.
    pub ytdlp_cmd: String,

    /// Explicit path to a pdfium shared library. `None` searches the usual
    /// system locations. When no library can be bound the pdfium-backed
    /// providers are skipped.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Caption language requested from the timed-text endpoint. Default: `en`.
    pub caption_lang: String,

    /// Download timeout for URL inputs in seconds. Default: 30.
    pub download_timeout_secs: u64,

    /// Per-call timeout for remote API requests (image generation, caption
    /// lookup) in seconds. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            stability_api_key: None,
            image_model: None,
            image_size: ImageSize::default(),
            max_pages: 5,
            max_rendered_pixels: 2000,
            ocr_trigger_len: 200,
            min_text_len: 1,
            pdftotext_cmd: "pdftotext".to_string(),
            tesseract_cmd: "tesseract".to_string(),
            ytdlp_cmd: "yt-dlp".to_string(),
            pdfium_lib_path: None,
            caption_lang: "en".to_string(),
            download_timeout_secs: 30,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // API keys are redacted so a debug-logged config never leaks secrets.
        f.debug_struct("Config")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<set>"))
            .field("stability_api_key", &self.stability_api_key.as_ref().map(|_| "<set>"))
            .field("image_model", &self.image_model)
            .field("image_size", &self.image_size)
            .field("max_pages", &self.max_pages)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_trigger_len", &self.ocr_trigger_len)
            .field("min_text_len", &self.min_text_len)
            .field("pdftotext_cmd", &self.pdftotext_cmd)
            .field("tesseract_cmd", &self.tesseract_cmd)
            .field("ytdlp_cmd", &self.ytdlp_cmd)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("caption_lang", &self.caption_lang)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Create a new builder for `Config`.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// Every recognized variable is read here and nowhere else:
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `OPENAI_API_KEY` | enables the `openai-images` provider |
    /// | `STABILITY_API_KEY` | enables the `stability` provider |
    /// | `MUSEGEN_IMAGE_MODEL` | remote model override |
    /// | `MUSEGEN_IMAGE_SIZE` | `WIDTHxHEIGHT`, e.g. `512x512` |
    /// | `MUSEGEN_PDFTOTEXT` | pdftotext command override |
    /// | `MUSEGEN_TESSERACT` | tesseract command override |
    /// | `MUSEGEN_YTDLP` | yt-dlp command override |
    /// | `MUSEGEN_CAPTION_LANG` | caption language code |
    /// | `PDFIUM_LIB_PATH` | explicit pdfium shared-library path |
    ///
    /// An empty value is treated the same as an unset variable.
    pub fn from_env() -> Result<Self, MusegenError> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Environment loading with an injectable lookup, for tests.
    pub(crate) fn from_env_with(
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, MusegenError> {
        let non_empty = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let mut config = Self::default();
        config.openai_api_key = non_empty("OPENAI_API_KEY");
        config.stability_api_key = non_empty("STABILITY_API_KEY");
        config.image_model = non_empty("MUSEGEN_IMAGE_MODEL");
        if let Some(size) = non_empty("MUSEGEN_IMAGE_SIZE") {
            config.image_size = size
                .parse()
                .map_err(|e: String| MusegenError::InvalidConfig(e))?;
        }
        if let Some(cmd) = non_empty("MUSEGEN_PDFTOTEXT") {
            config.pdftotext_cmd = cmd;
        }
        if let Some(cmd) = non_empty("MUSEGEN_TESSERACT") {
            config.tesseract_cmd = cmd;
        }
        if let Some(cmd) = non_empty("MUSEGEN_YTDLP") {
            config.ytdlp_cmd = cmd;
        }
        if let Some(lang) = non_empty("MUSEGEN_CAPTION_LANG") {
            config.caption_lang = lang;
        }
        config.pdfium_lib_path = non_empty("PDFIUM_LIB_PATH").map(PathBuf::from);

        Ok(config)
    }

    /// True when the OpenAI image provider has a credential.
    pub fn has_openai_credential(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// True when the Stability image provider has a credential.
    pub fn has_stability_credential(&self) -> bool {
        self.stability_api_key.is_some()
    }
}

/// Builder for [`Config`].
#[derive(Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.openai_api_key = Some(key.into());
        self
    }

    pub fn stability_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.stability_api_key = Some(key.into());
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = Some(model.into());
        self
    }

    pub fn image_size(mut self, width: u32, height: u32) -> Self {
        self.config.image_size = ImageSize { width, height };
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n.max(1);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_trigger_len(mut self, len: usize) -> Self {
        self.config.ocr_trigger_len = len;
        self
    }

    pub fn min_text_len(mut self, len: usize) -> Self {
        self.config.min_text_len = len.max(1);
        self
    }

    pub fn pdftotext_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.pdftotext_cmd = cmd.into();
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.tesseract_cmd = cmd.into();
        self
    }

    pub fn ytdlp_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.ytdlp_cmd = cmd.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn caption_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.caption_lang = lang.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<Config, MusegenError> {
        let c = &self.config;
        if c.image_size.width == 0 || c.image_size.height == 0 {
            return Err(MusegenError::InvalidConfig(format!(
                "Image dimensions must be nonzero, got {}",
                c.image_size
            )));
        }
        if c.max_pages == 0 {
            return Err(MusegenError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.download_timeout_secs == 0 || c.api_timeout_secs == 0 {
            return Err(MusegenError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Image size ───────────────────────────────────────────────────────────

/// Pixel dimensions for generated images, parsed from `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
        }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl std::str::FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (w, h) = lower
            .split_once('x')
            .ok_or_else(|| format!("Image size must be WIDTHxHEIGHT, got '{s}'"))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| format!("Invalid image width '{w}'"))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| format!("Invalid image height '{h}'"))?;
        if width == 0 || height == 0 {
            return Err(format!("Image dimensions must be nonzero, got '{s}'"));
        }
        Ok(Self { width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.image_size, ImageSize { width: 1024, height: 1024 });
        assert_eq!(config.max_pages, 5);
        assert_eq!(config.download_timeout_secs, 30);
        assert!(!config.has_openai_credential());
    }

    #[test]
    fn image_size_parses_both_cases() {
        assert_eq!(
            "512x768".parse::<ImageSize>().unwrap(),
            ImageSize { width: 512, height: 768 }
        );
        assert_eq!(
            "1024X1024".parse::<ImageSize>().unwrap(),
            ImageSize { width: 1024, height: 1024 }
        );
        assert!("1024".parse::<ImageSize>().is_err());
        assert!("0x100".parse::<ImageSize>().is_err());
        assert!("axb".parse::<ImageSize>().is_err());
    }

    #[test]
    fn builder_clamps_floor_values() {
        let config = Config::builder()
            .max_pages(0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(config.max_pages, 1);
        assert_eq!(config.max_rendered_pixels, 100);
    }

    #[test]
    fn build_rejects_zero_dimensions() {
        let err = Config::builder().image_size(0, 512).build().unwrap_err();
        assert!(err.to_string().contains("nonzero"));
    }

    #[test]
    fn from_env_reads_each_recognized_variable() {
        let config = Config::from_env_with(|name| match name {
            "OPENAI_API_KEY" => Some("sk-test".into()),
            "MUSEGEN_IMAGE_SIZE" => Some("256x256".into()),
            "MUSEGEN_TESSERACT" => Some("/opt/bin/tesseract".into()),
            _ => None,
        })
        .unwrap();

        assert!(config.has_openai_credential());
        assert!(!config.has_stability_credential());
        assert_eq!(config.image_size, ImageSize { width: 256, height: 256 });
        assert_eq!(config.tesseract_cmd, "/opt/bin/tesseract");
        assert_eq!(config.pdftotext_cmd, "pdftotext");
    }

    #[test]
    fn from_env_treats_blank_credential_as_absent() {
        let config = Config::from_env_with(|name| match name {
            "OPENAI_API_KEY" => Some("   ".into()),
            _ => None,
        })
        .unwrap();
        assert!(!config.has_openai_credential());
    }

    #[test]
    fn from_env_rejects_malformed_size() {
        let err = Config::from_env_with(|name| match name {
            "MUSEGEN_IMAGE_SIZE" => Some("huge".into()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, MusegenError::InvalidConfig(_)));
    }

    #[test]
    fn debug_redacts_credentials() {
        let config = Config::builder().openai_api_key("sk-secret-123").build().unwrap();
        let repr = format!("{config:?}");
        assert!(!repr.contains("sk-secret-123"), "got: {repr}");
        assert!(repr.contains("<set>"));
    }
}
