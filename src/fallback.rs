//! Ordered provider chains: the fallback engine behind every pipeline stage.
//!
//! ## Why a chain instead of nested retries?
//!
//! Each stage of the pipeline (PDF text extraction, image generation,
//! transcript retrieval) has several interchangeable backends of very
//! different reliability: pure-Rust parsers, external commands that may not
//! be installed, remote APIs that need credentials. Modelling them as a flat
//! priority list of [`Provider`]s keeps the policy in one place: check the
//! prerequisite, attempt once, judge the payload, move on. No provider is
//! retried; unreliability is handled by breadth (the next backend), not
//! depth.
//!
//! The chain records a [`ProviderAttempt`] for everything it touched. A
//! provider whose prerequisite is missing is skipped and logged as not
//! available; providers after the winning one are never attempted and never
//! appear in the log. When nothing wins, [`FallbackChain::exhaustion_error`]
//! turns the log into one fatal error naming every provider with its reason
//! and collecting remediation hints.

use crate::error::MusegenError;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info, warn};

// ── Provider contract ────────────────────────────────────────────────────

/// One concrete backend for an extraction or generation step.
///
/// `T` is the payload the chain is trying to obtain: extracted text for the
/// PDF and transcript chains, an artifact path for the image chain.
#[async_trait]
pub trait Provider<T>: Send + Sync {
    /// Short stable name used in logs and attempt reports.
    fn name(&self) -> &'static str;

    /// Check prerequisites without doing any work.
    ///
    /// `Err(reason)` means a capability or credential is missing; the chain
    /// records the provider as skipped and never calls
    /// [`attempt`](Provider::attempt).
    async fn availability(&self) -> Result<(), String>;

    /// Run the backend against the shared input.
    async fn attempt(&self, input: &str) -> Result<T, ProviderFailure>;

    /// One-line hint included in the exhaustion report, telling the user how
    /// to make this provider work next time.
    fn remediation(&self) -> Option<&'static str> {
        None
    }
}

// ── Failure and attempt records ──────────────────────────────────────────

/// A provider ran but produced no usable payload.
///
/// Non-fatal: the chain records it and tries the next provider. Only when
/// the whole chain is exhausted do these failures surface, aggregated into
/// [`MusegenError::AllProvidersFailed`].
#[derive(Debug)]
pub struct ProviderFailure {
    /// Human-readable cause, kept to one line.
    pub reason: String,
    /// Longer diagnostic, e.g. an stderr excerpt or HTTP body fragment.
    pub detail: Option<String>,
    /// When set, chain exhaustion surfaces this error verbatim instead of
    /// the aggregated report. Used by outcomes that are answers in their own
    /// right, not mere misfires.
    pub terminal: Option<MusegenError>,
}

impl ProviderFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            detail: None,
            terminal: None,
        }
    }

    pub fn with_detail(reason: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            detail: Some(detail.into()),
            terminal: None,
        }
    }

    /// A failure that ends the conversation: `error` is returned as-is when
    /// the chain is exhausted, carrying its own remediation text.
    pub fn terminal(reason: impl Into<String>, error: MusegenError) -> Self {
        Self {
            reason: reason.into(),
            detail: None,
            terminal: Some(error),
        }
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.reason, detail),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// What happened to one provider during a chain run.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Payload accepted; the chain stopped here.
    Succeeded,
    /// Provider ran but failed, or its payload was rejected as unusable.
    Failed(ProviderFailure),
    /// Prerequisite missing; the provider was never run.
    Skipped { reason: String },
}

/// One entry of the chain's attempt log.
#[derive(Debug)]
pub struct ProviderAttempt {
    pub provider: &'static str,
    pub outcome: AttemptOutcome,
}

/// Render the attempt log as a compact single-line diagnostic.
///
/// Used for the `details` field of result records and for log lines, e.g.
/// `quick-parse: failed (empty output); poppler-layout: not available
/// (pdftotext not found); pdfium-text: ok`.
pub fn attempt_summary(attempts: &[ProviderAttempt]) -> String {
    attempts
        .iter()
        .map(|a| match &a.outcome {
            AttemptOutcome::Succeeded => format!("{}: ok", a.provider),
            AttemptOutcome::Failed(failure) => format!("{}: failed ({})", a.provider, failure),
            AttemptOutcome::Skipped { reason } => {
                format!("{}: not available ({})", a.provider, reason)
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

// ── Acceptance ───────────────────────────────────────────────────────────

/// Decision of a domain acceptance predicate over a candidate payload.
pub enum Verdict {
    /// The payload is usable; the chain stops.
    Usable,
    /// The payload is not good enough; the chain continues. The string is
    /// recorded as the failure reason.
    Rejected(String),
}

// ── Chain ────────────────────────────────────────────────────────────────

/// The payload and origin of a successful chain run.
#[derive(Debug)]
pub struct Winner<T> {
    pub provider: &'static str,
    pub payload: T,
}

/// Everything a chain run produced: the winner (if any) plus the log of
/// every provider that was attempted or skipped before the run ended.
#[derive(Debug)]
pub struct ChainOutcome<T> {
    pub winner: Option<Winner<T>>,
    pub attempts: Vec<ProviderAttempt>,
}

impl<T> ChainOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.winner.is_some()
    }
}

/// An ordered list of providers for one pipeline stage.
pub struct FallbackChain<T> {
    task: &'static str,
    providers: Vec<Box<dyn Provider<T>>>,
}

impl<T> FallbackChain<T> {
    /// Create an empty chain. `task` names the stage in logs and errors,
    /// e.g. `"PDF text extraction"`.
    pub fn new(task: &'static str) -> Self {
        Self {
            task,
            providers: Vec::new(),
        }
    }

    /// Append a provider at the lowest priority so far.
    pub fn with(mut self, provider: Box<dyn Provider<T>>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn task(&self) -> &'static str {
        self.task
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Run providers in order until `accept` deems a payload usable.
    ///
    /// Strictly sequential: one provider finishes (or is skipped) before the
    /// next starts. The returned log covers exactly the providers the run
    /// reached.
    pub async fn run<A>(&self, input: &str, accept: A) -> ChainOutcome<T>
    where
        A: Fn(&T) -> Verdict,
    {
        let mut attempts = Vec::new();

        for provider in &self.providers {
            let name = provider.name();

            if let Err(reason) = provider.availability().await {
                debug!(task = self.task, provider = name, %reason, "provider skipped");
                attempts.push(ProviderAttempt {
                    provider: name,
                    outcome: AttemptOutcome::Skipped { reason },
                });
                continue;
            }

            info!(task = self.task, provider = name, "attempting provider");
            match provider.attempt(input).await {
                Ok(payload) => match accept(&payload) {
                    Verdict::Usable => {
                        info!(task = self.task, provider = name, "provider succeeded");
                        attempts.push(ProviderAttempt {
                            provider: name,
                            outcome: AttemptOutcome::Succeeded,
                        });
                        return ChainOutcome {
                            winner: Some(Winner {
                                provider: name,
                                payload,
                            }),
                            attempts,
                        };
                    }
                    Verdict::Rejected(reason) => {
                        warn!(task = self.task, provider = name, %reason, "payload rejected");
                        attempts.push(ProviderAttempt {
                            provider: name,
                            outcome: AttemptOutcome::Failed(ProviderFailure::new(reason)),
                        });
                    }
                },
                Err(failure) => {
                    warn!(
                        task = self.task,
                        provider = name,
                        reason = %failure,
                        "provider failed"
                    );
                    attempts.push(ProviderAttempt {
                        provider: name,
                        outcome: AttemptOutcome::Failed(failure),
                    });
                }
            }
        }

        ChainOutcome {
            winner: None,
            attempts,
        }
    }

    /// Turn an exhausted run's log into the fatal error for this stage.
    ///
    /// A terminal [`ProviderFailure`] wins over the aggregated report; the
    /// first one found (in priority order) is returned verbatim. Otherwise
    /// the report lists every logged provider and appends deduplicated
    /// remediation hints from the providers that did not succeed.
    pub fn exhaustion_error(&self, attempts: Vec<ProviderAttempt>) -> MusegenError {
        let mut report = String::from("Attempts:\n");
        for attempt in &attempts {
            let line = match &attempt.outcome {
                AttemptOutcome::Succeeded => format!("  - {}: ok\n", attempt.provider),
                AttemptOutcome::Failed(failure) => {
                    format!("  - {}: {}\n", attempt.provider, failure)
                }
                AttemptOutcome::Skipped { reason } => {
                    format!("  - {}: not available ({})\n", attempt.provider, reason)
                }
            };
            report.push_str(&line);
        }

        let mut hints: Vec<&'static str> = Vec::new();
        for provider in &self.providers {
            let succeeded = attempts.iter().any(|a| {
                a.provider == provider.name() && matches!(a.outcome, AttemptOutcome::Succeeded)
            });
            if succeeded {
                continue;
            }
            if let Some(hint) = provider.remediation() {
                if !hints.contains(&hint) {
                    hints.push(hint);
                }
            }
        }
        if !hints.is_empty() {
            report.push_str("Hints:\n");
            for hint in hints {
                report.push_str("  - ");
                report.push_str(hint);
                report.push('\n');
            }
        }

        // A terminal failure is the answer itself; surface it unchanged.
        for attempt in attempts {
            if let AttemptOutcome::Failed(failure) = attempt.outcome {
                if let Some(error) = failure.terminal {
                    return error;
                }
            }
        }

        MusegenError::AllProvidersFailed {
            task: self.task,
            report: report.trim_end().to_string(),
        }
    }
}
