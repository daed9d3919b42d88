//! Image generation: remote providers first, local poster renderer last.
//!
//! The ladder is `openai-images` → `stability` → `poster-render`. The
//! remote providers are gated on their credentials; with no keys configured
//! both are skipped and the local renderer still produces an artifact, which
//! is why this stage can never be the reason a run fails on a healthy disk.
//!
//! Every provider writes the final artifact itself (atomic temp + rename)
//! and hands back its path; acceptance then checks the file exists with
//! nonzero size.

use crate::config::{Config, ImageSize};
use crate::error::MusegenError;
use crate::fallback::{FallbackChain, Provider, ProviderAttempt, ProviderFailure, Verdict};
use crate::manifest::write_bytes_atomic;
use crate::render;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const OPENAI_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const OPENAI_DEFAULT_MODEL: &str = "gpt-image-1";
const STABILITY_DEFAULT_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";

/// Written artifact plus provenance for the image stage.
#[derive(Debug)]
pub struct ImageGeneration {
    pub artifact_path: PathBuf,
    pub provider: &'static str,
    pub attempts: Vec<ProviderAttempt>,
}

/// Generate an image for `description`, writing it to `output`.
pub async fn generate_image(
    description: &str,
    output: &Path,
    config: &Config,
) -> Result<ImageGeneration, MusegenError> {
    let chain = build_image_chain(output, config);
    let outcome = chain.run(description, artifact_verdict).await;

    match outcome.winner {
        Some(winner) => {
            info!(
                provider = winner.provider,
                path = %winner.payload.display(),
                "image artifact written"
            );
            Ok(ImageGeneration {
                artifact_path: winner.payload,
                provider: winner.provider,
                attempts: outcome.attempts,
            })
        }
        None => Err(chain.exhaustion_error(outcome.attempts)),
    }
}

fn build_image_chain(output: &Path, config: &Config) -> FallbackChain<PathBuf> {
    FallbackChain::new("image generation")
        .with(Box::new(OpenAiImages::from_config(output, config)))
        .with(Box::new(Stability::from_config(output, config)))
        .with(Box::new(PosterRender::from_config(output, config)))
}

fn artifact_verdict(path: &PathBuf) -> Verdict {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Verdict::Usable,
        Ok(_) => Verdict::Rejected("artifact file is empty".to_string()),
        Err(e) => Verdict::Rejected(format!("artifact file missing: {e}")),
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderFailure> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderFailure::with_detail("HTTP client construction failed", e.to_string()))
}

fn api_failure(provider: &str, timeout_secs: u64, e: reqwest::Error) -> ProviderFailure {
    if e.is_timeout() {
        ProviderFailure::new(format!("{provider} request timed out after {timeout_secs}s"))
    } else {
        ProviderFailure::with_detail(format!("{provider} request failed"), e.to_string())
    }
}

/// First bytes of an error body, enough to diagnose without flooding logs.
fn body_excerpt(body: &str) -> String {
    let excerpt: String = body.chars().take(200).collect();
    excerpt.trim().to_string()
}

// ── openai-images ────────────────────────────────────────────────────────

/// OpenAI image generation. Skipped unless `OPENAI_API_KEY` is configured.
struct OpenAiImages {
    api_key: Option<String>,
    model: String,
    size: ImageSize,
    timeout_secs: u64,
    output: PathBuf,
}

impl OpenAiImages {
    fn from_config(output: &Path, config: &Config) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            model: config
                .image_model
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_MODEL.to_string()),
            size: config.image_size,
            timeout_secs: config.api_timeout_secs,
            output: output.to_path_buf(),
        }
    }
}

#[derive(Deserialize)]
struct OpenAiImageResponse {
    data: Vec<OpenAiImageDatum>,
}

#[derive(Deserialize)]
struct OpenAiImageDatum {
    b64_json: Option<String>,
}

#[async_trait]
impl Provider<PathBuf> for OpenAiImages {
    fn name(&self) -> &'static str {
        "openai-images"
    }

    async fn availability(&self) -> Result<(), String> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err("OPENAI_API_KEY is not set".to_string()),
        }
    }

    async fn attempt(&self, input: &str) -> Result<PathBuf, ProviderFailure> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderFailure::new("OPENAI_API_KEY is not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "prompt": input,
            "n": 1,
            "size": self.size.to_string(),
        });

        let client = http_client(self.timeout_secs)?;
        let response = client
            .post(OPENAI_IMAGES_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| api_failure("OpenAI", self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::with_detail(
                format!("OpenAI returned HTTP {}", status.as_u16()),
                body_excerpt(&body),
            ));
        }

        let parsed: OpenAiImageResponse = response
            .json()
            .await
            .map_err(|e| ProviderFailure::with_detail("OpenAI response was not valid JSON", e.to_string()))?;
        let b64 = parsed
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| ProviderFailure::new("OpenAI response carried no image payload"))?;

        let bytes = STANDARD
            .decode(b64.as_bytes())
            .map_err(|e| ProviderFailure::with_detail("image payload was not valid base64", e.to_string()))?;

        write_bytes_atomic(&self.output, &bytes)
            .await
            .map_err(|e| ProviderFailure::with_detail("could not write artifact", e.to_string()))?;
        debug!(bytes = bytes.len(), "OpenAI image written");
        Ok(self.output.clone())
    }

    fn remediation(&self) -> Option<&'static str> {
        Some("set OPENAI_API_KEY to enable OpenAI image generation")
    }
}

// ── stability ────────────────────────────────────────────────────────────

/// Stability text-to-image. Skipped unless `STABILITY_API_KEY` is configured.
struct Stability {
    api_key: Option<String>,
    engine: String,
    size: ImageSize,
    timeout_secs: u64,
    output: PathBuf,
}

impl Stability {
    fn from_config(output: &Path, config: &Config) -> Self {
        Self {
            api_key: config.stability_api_key.clone(),
            engine: config
                .image_model
                .clone()
                .unwrap_or_else(|| STABILITY_DEFAULT_ENGINE.to_string()),
            size: config.image_size,
            timeout_secs: config.api_timeout_secs,
            output: output.to_path_buf(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.stability.ai/v1/generation/{}/text-to-image",
            self.engine
        )
    }
}

#[derive(Deserialize)]
struct StabilityResponse {
    artifacts: Vec<StabilityArtifact>,
}

#[derive(Deserialize)]
struct StabilityArtifact {
    base64: String,
}

#[async_trait]
impl Provider<PathBuf> for Stability {
    fn name(&self) -> &'static str {
        "stability"
    }

    async fn availability(&self) -> Result<(), String> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err("STABILITY_API_KEY is not set".to_string()),
        }
    }

    async fn attempt(&self, input: &str) -> Result<PathBuf, ProviderFailure> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderFailure::new("STABILITY_API_KEY is not set"))?;

        let body = serde_json::json!({
            "text_prompts": [{ "text": input }],
            "width": self.size.width,
            "height": self.size.height,
            "samples": 1,
        });

        let client = http_client(self.timeout_secs)?;
        let response = client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| api_failure("Stability", self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderFailure::with_detail(
                format!("Stability returned HTTP {}", status.as_u16()),
                body_excerpt(&body),
            ));
        }

        let parsed: StabilityResponse = response.json().await.map_err(|e| {
            ProviderFailure::with_detail("Stability response was not valid JSON", e.to_string())
        })?;
        let artifact = parsed
            .artifacts
            .into_iter()
            .next()
            .ok_or_else(|| ProviderFailure::new("Stability response carried no artifacts"))?;

        let bytes = STANDARD.decode(artifact.base64.as_bytes()).map_err(|e| {
            ProviderFailure::with_detail("image payload was not valid base64", e.to_string())
        })?;

        write_bytes_atomic(&self.output, &bytes)
            .await
            .map_err(|e| ProviderFailure::with_detail("could not write artifact", e.to_string()))?;
        debug!(bytes = bytes.len(), "Stability image written");
        Ok(self.output.clone())
    }

    fn remediation(&self) -> Option<&'static str> {
        Some("set STABILITY_API_KEY to enable Stability image generation")
    }
}

// ── poster-render ────────────────────────────────────────────────────────

/// Local offline renderer. Always available, so the chain cannot end
/// without an artifact unless the disk itself fails.
struct PosterRender {
    size: ImageSize,
    output: PathBuf,
}

impl PosterRender {
    fn from_config(output: &Path, config: &Config) -> Self {
        Self {
            size: config.image_size,
            output: output.to_path_buf(),
        }
    }
}

#[async_trait]
impl Provider<PathBuf> for PosterRender {
    fn name(&self) -> &'static str {
        "poster-render"
    }

    async fn availability(&self) -> Result<(), String> {
        Ok(())
    }

    async fn attempt(&self, input: &str) -> Result<PathBuf, ProviderFailure> {
        let png = render::poster_png(input, self.size)
            .map_err(|e| ProviderFailure::with_detail("poster rendering failed", e.to_string()))?;

        write_bytes_atomic(&self.output, &png)
            .await
            .map_err(|e| ProviderFailure::with_detail("could not write artifact", e.to_string()))?;
        debug!(bytes = png.len(), "local poster written");
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_orders_remote_before_local() {
        let config = Config::default();
        let chain = build_image_chain(Path::new("out.png"), &config);
        assert_eq!(chain.task(), "image generation");
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn artifact_verdict_requires_nonzero_file() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.png");
        assert!(matches!(artifact_verdict(&missing), Verdict::Rejected(_)));

        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(artifact_verdict(&empty), Verdict::Rejected(_)));

        let full = dir.path().join("full.png");
        std::fs::write(&full, b"\x89PNG").unwrap();
        assert!(matches!(artifact_verdict(&full), Verdict::Usable));
    }

    #[test]
    fn without_credentials_the_local_renderer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("generated_image.png");
        let config = Config::default();

        let generation = tokio_test::block_on(generate_image(
            "A lighthouse on a cliff at dusk.",
            &output,
            &config,
        ))
        .unwrap();

        assert_eq!(generation.provider, "poster-render");
        assert!(output.exists());
        assert!(std::fs::metadata(&output).unwrap().len() > 0);

        // Both remote providers were skipped for missing credentials.
        let summary = crate::fallback::attempt_summary(&generation.attempts);
        assert!(summary.contains("openai-images: not available"), "got: {summary}");
        assert!(summary.contains("stability: not available"), "got: {summary}");
        assert!(summary.contains("poster-render: ok"), "got: {summary}");
    }

    #[test]
    fn excerpt_caps_long_bodies() {
        let long = "x".repeat(500);
        assert_eq!(body_excerpt(&long).len(), 200);
        assert_eq!(body_excerpt("  short  "), "short");
    }
}
