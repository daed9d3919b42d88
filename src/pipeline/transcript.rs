//! Transcript retrieval: published captions first, audio download second.
//!
//! The `captions` provider reads the public timed-text endpoint and needs no
//! credential. The `audio-download` provider can fetch the audio track with
//! `yt-dlp`, but this crate ships no speech-to-text backend, so a successful
//! download ends in the explicit [`MusegenError::TranscriptionNotConfigured`]
//! outcome. That failure is terminal: it reaches the caller verbatim instead
//! of being folded into the aggregated exhaustion report, because "we got
//! the audio but cannot transcribe it" is an answer, not a malfunction.

use crate::config::Config;
use crate::error::MusegenError;
use crate::fallback::{FallbackChain, Provider, ProviderAttempt, ProviderFailure, Verdict};
use crate::pipeline::command_exists;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

static RE_VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|shorts/|embed/)|youtu\.be/)([A-Za-z0-9_-]{11})")
        .unwrap()
});
static RE_BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Winning transcript plus provenance for the transcript stage.
#[derive(Debug)]
pub struct TranscriptFetch {
    pub transcript: String,
    pub provider: &'static str,
    pub attempts: Vec<ProviderAttempt>,
}

/// Retrieve a transcript for a video URL or bare video id.
pub async fn fetch_transcript(
    source: &str,
    config: &Config,
) -> Result<TranscriptFetch, MusegenError> {
    let chain = build_transcript_chain(config);
    let outcome = chain.run(source, transcript_verdict).await;

    match outcome.winner {
        Some(winner) => {
            debug!(
                provider = winner.provider,
                chars = winner.payload.chars().count(),
                "transcript retrieved"
            );
            Ok(TranscriptFetch {
                transcript: winner.payload,
                provider: winner.provider,
                attempts: outcome.attempts,
            })
        }
        None => Err(chain.exhaustion_error(outcome.attempts)),
    }
}

fn build_transcript_chain(config: &Config) -> FallbackChain<String> {
    FallbackChain::new("transcript retrieval")
        .with(Box::new(Captions::from_config(config)))
        .with(Box::new(AudioDownload::from_config(config)))
}

fn transcript_verdict(text: &String) -> Verdict {
    if text.trim().is_empty() {
        Verdict::Rejected("transcript is empty".to_string())
    } else {
        Verdict::Usable
    }
}

/// Extract the 11-character video id from common URL shapes or a bare id.
pub fn parse_video_id(source: &str) -> Option<String> {
    let s = source.trim();
    if let Some(caps) = RE_VIDEO_ID.captures(s) {
        return Some(caps[1].to_string());
    }
    if RE_BARE_ID.is_match(s) {
        return Some(s.to_string());
    }
    None
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

// ── captions ─────────────────────────────────────────────────────────────

/// Published caption tracks via the public timed-text endpoint.
struct Captions {
    lang: String,
    timeout_secs: u64,
}

impl Captions {
    fn from_config(config: &Config) -> Self {
        Self {
            lang: config.caption_lang.clone(),
            timeout_secs: config.api_timeout_secs,
        }
    }
}

#[derive(Deserialize)]
struct TimedTextResponse {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Deserialize)]
struct TimedTextEvent {
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Concatenate caption segments into one transcript string.
fn join_events(response: TimedTextResponse) -> String {
    let mut transcript = String::new();
    for event in response.events {
        for seg in event.segs {
            transcript.push_str(&seg.utf8);
        }
    }
    transcript.trim().to_string()
}

#[async_trait]
impl Provider<String> for Captions {
    fn name(&self) -> &'static str {
        "captions"
    }

    async fn availability(&self) -> Result<(), String> {
        Ok(())
    }

    async fn attempt(&self, input: &str) -> Result<String, ProviderFailure> {
        let id = parse_video_id(input)
            .ok_or_else(|| ProviderFailure::new("not a recognizable video URL or id"))?;

        let url = format!(
            "https://www.youtube.com/api/timedtext?v={id}&lang={}&fmt=json3",
            self.lang
        );
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| {
                ProviderFailure::with_detail("HTTP client construction failed", e.to_string())
            })?;

        let response = client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderFailure::new(format!(
                    "caption request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ProviderFailure::with_detail("caption request failed", e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderFailure::new(format!(
                "caption endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        // The endpoint answers 200 with an empty body when the video has no
        // caption track in the requested language.
        let body = response
            .text()
            .await
            .map_err(|e| ProviderFailure::with_detail("caption body unreadable", e.to_string()))?;
        if body.trim().is_empty() {
            return Err(ProviderFailure::new(format!(
                "no '{}' captions published for this video",
                self.lang
            )));
        }

        let parsed: TimedTextResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderFailure::with_detail("caption payload was not valid json3", e.to_string())
        })?;
        let transcript = join_events(parsed);
        if transcript.is_empty() {
            return Err(ProviderFailure::new("caption track contained no text"));
        }
        Ok(transcript)
    }

    fn remediation(&self) -> Option<&'static str> {
        Some("use a video with published captions, or pass a local transcript file instead")
    }
}

// ── audio-download ───────────────────────────────────────────────────────

/// Fetch the audio track with `yt-dlp`. There is no speech-to-text backend
/// behind it, so success turns into the terminal "transcription not
/// configured" outcome. The downloaded audio lives in a scoped temp dir and
/// is always removed.
struct AudioDownload {
    cmd: String,
}

impl AudioDownload {
    fn from_config(config: &Config) -> Self {
        Self {
            cmd: config.ytdlp_cmd.clone(),
        }
    }
}

#[async_trait]
impl Provider<String> for AudioDownload {
    fn name(&self) -> &'static str {
        "audio-download"
    }

    async fn availability(&self) -> Result<(), String> {
        command_exists(&self.cmd, "--version").await
    }

    async fn attempt(&self, input: &str) -> Result<String, ProviderFailure> {
        let id = parse_video_id(input)
            .ok_or_else(|| ProviderFailure::new("not a recognizable video URL or id"))?;
        let url = watch_url(&id);

        let temp_dir = tempfile::tempdir().map_err(|e| {
            ProviderFailure::with_detail("could not create temp dir for audio", e.to_string())
        })?;
        let template = temp_dir.path().join("audio.%(ext)s");

        let output = Command::new(&self.cmd)
            .arg("-x")
            .arg("-f")
            .arg("bestaudio")
            .arg("--no-playlist")
            .arg("-o")
            .arg(&template)
            .arg(&url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ProviderFailure::with_detail("could not run yt-dlp", e.to_string()))?;

        if !output.status.success() {
            return Err(ProviderFailure::with_detail(
                format!("yt-dlp exited with {}", output.status),
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let audio_bytes = dir_total_bytes(temp_dir.path());
        if audio_bytes == 0 {
            return Err(ProviderFailure::new("yt-dlp wrote no audio file"));
        }

        info!(
            bytes = audio_bytes,
            "audio downloaded, but no transcription backend is configured"
        );
        // The audio is deleted with the temp dir; only the size survives as
        // evidence in the error detail.
        Err(ProviderFailure::terminal(
            "audio downloaded but no transcription backend is configured",
            MusegenError::TranscriptionNotConfigured {
                input: input.to_string(),
                detail: format!("{} of audio", human_size(audio_bytes)),
            },
        ))
    }

    fn remediation(&self) -> Option<&'static str> {
        Some("install yt-dlp to allow the audio-download fallback to run")
    }
}

fn dir_total_bytes(dir: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;
    let b = bytes as f64;
    if b >= MIB {
        format!("{:.1} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{bytes} B")
    }
}
