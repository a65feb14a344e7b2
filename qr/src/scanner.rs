//! Camera scanning loop.
//!
//! The scanner is a small state machine:
//!
//! ```text
//! Idle -> Capturing -> Decoding -> Submitting -> (Idle | Error)
//!            ^            |                           |
//!            +------------+---------------------------+
//! ```
//!
//! Each tick of the poll interval grabs the latest frame, decodes it off the async
//! runtime, and if a code comes out, submits it and waits for the answer before the next
//! tick is looked at. A successful check-in releases the camera and ends the run. A
//! rejection is published as [`ScannerState::Error`] and capturing resumes, so the user
//! can present another code without restarting.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::decode::{Frame, decode_frame};
use crate::error::{ExtractError, ScanError};
use crate::extract::extract_code;
use crate::pattern::CodePattern;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(250);
pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerState {
    Idle,
    Capturing,
    Decoding,
    Submitting,
    Error(String),
}

/// How a code reached the submitter. Sent as `check_in_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMethod {
    Qr,
    Manual,
}

impl EntryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMethod::Qr => "qr",
            EntryMethod::Manual => "manual",
        }
    }
}

/// Class details echoed back by a successful check-in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct AttendanceSummary {
    pub id: i64,
    pub class_id: i64,
    pub class_name: String,
    pub class_date: String,
    pub class_time: String,
    pub discipline: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CheckInConfirmation {
    pub message: String,
    #[serde(default)]
    pub already_checked_in: bool,
    #[serde(default)]
    pub attendance: Option<AttendanceSummary>,
}

/// Rejection kinds as reported by the check-in endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    InvalidFormat,
    CodeNotFound,
    CodeExpiredOrInactive,
    ClassResolutionFailed,
    Unauthorized,
    #[serde(other)]
    Transient,
}

impl RejectionKind {
    /// Problems with the code itself, as opposed to the session or the network.
    pub fn is_bad_code(&self) -> bool {
        matches!(
            self,
            RejectionKind::InvalidFormat
                | RejectionKind::CodeNotFound
                | RejectionKind::CodeExpiredOrInactive
                | RejectionKind::ClassResolutionFailed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CheckInRejection {
    pub kind: RejectionKind,
    pub message: String,
}

impl CheckInRejection {
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    CheckedIn(CheckInConfirmation),
    /// Cancelled before any check-in succeeded.
    Stopped {
        last_rejection: Option<CheckInRejection>,
    },
}

#[derive(Debug, Error)]
pub enum ManualEntryError {
    #[error("Invalid code format: {0}")]
    InvalidFormat(#[from] ExtractError),
    #[error(transparent)]
    Rejected(#[from] CheckInRejection),
    #[error(transparent)]
    Clipboard(#[from] ScanError),
}

/// A live camera.
#[async_trait]
pub trait FrameSource: Send {
    async fn start(&mut self) -> Result<(), ScanError>;

    /// Most recent frame, or `None` if nothing new is available yet.
    async fn latest_frame(&mut self) -> Result<Option<Frame>, ScanError>;

    /// Releases the device. Must be idempotent.
    fn stop(&mut self);
}

#[async_trait]
pub trait Clipboard: Send {
    async fn read_text(&mut self) -> Result<Option<String>, ScanError>;
}

#[async_trait]
pub trait CheckInSubmitter: Send + Sync {
    async fn submit(
        &self,
        code: &str,
        at: DateTime<Utc>,
        method: EntryMethod,
    ) -> Result<CheckInConfirmation, CheckInRejection>;
}

pub struct Scanner<F, S> {
    frames: F,
    submitter: S,
    pattern: CodePattern,
    interval: Duration,
    retry_cooldown: Duration,
    state: watch::Sender<ScannerState>,
}

impl<F, S> Scanner<F, S>
where
    F: FrameSource,
    S: CheckInSubmitter,
{
    pub fn new(frames: F, submitter: S, pattern: CodePattern) -> Self {
        let (state, _) = watch::channel(ScannerState::Idle);
        Self {
            frames,
            submitter,
            pattern,
            interval: DEFAULT_SCAN_INTERVAL,
            retry_cooldown: DEFAULT_RETRY_COOLDOWN,
            state,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// How long a rejected code is ignored while it stays in front of the camera.
    pub fn with_retry_cooldown(mut self, cooldown: Duration) -> Self {
        self.retry_cooldown = cooldown;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ScannerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ScannerState {
        self.state.borrow().clone()
    }

    pub fn into_parts(self) -> (F, S) {
        (self.frames, self.submitter)
    }

    fn set_state(&self, next: ScannerState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn release(&mut self) {
        self.frames.stop();
        self.set_state(ScannerState::Idle);
    }

    /// Runs the capture loop until a check-in succeeds or `stop` is cancelled.
    ///
    /// Cancelling releases the camera straight away. A submission already in flight is
    /// still awaited and, if it succeeds, reported as [`ScanOutcome::CheckedIn`].
    pub async fn run(&mut self, stop: CancellationToken) -> Result<ScanOutcome, ScanError> {
        if let Err(e) = self.frames.start().await {
            self.set_state(ScannerState::Error(e.to_string()));
            return Err(e);
        }
        self.set_state(ScannerState::Capturing);
        tracing::debug!(interval_ms = self.interval.as_millis() as u64, "Scanner started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_rejection: Option<CheckInRejection> = None;
        let mut cooldown: Option<(String, Instant)> = None;

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => {
                    self.release();
                    return Ok(ScanOutcome::Stopped { last_rejection });
                }
                _ = ticker.tick() => {}
            }
            // A rejection stays on screen for one tick.
            self.set_state(ScannerState::Capturing);

            let frame = match self.frames.latest_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(e) => {
                    self.frames.stop();
                    self.set_state(ScannerState::Error(e.to_string()));
                    return Err(e);
                }
            };

            self.set_state(ScannerState::Decoding);
            let decoded = tokio::task::spawn_blocking(move || decode_frame(&frame))
                .await
                .map_err(|e| ScanError::Decoder(e.to_string()));
            let decoded = match decoded {
                Ok(decoded) => decoded,
                Err(e) => {
                    self.frames.stop();
                    self.set_state(ScannerState::Error(e.to_string()));
                    return Err(e);
                }
            };

            let Some(text) = decoded else {
                self.set_state(ScannerState::Capturing);
                continue;
            };
            let code = match extract_code(&text, &self.pattern) {
                Ok(code) => code,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring QR symbol without a code");
                    self.set_state(ScannerState::Capturing);
                    continue;
                }
            };
            if let Some((rejected, until)) = &cooldown {
                if *rejected == code && Instant::now() < *until {
                    self.set_state(ScannerState::Capturing);
                    continue;
                }
            }

            self.set_state(ScannerState::Submitting);
            match self.submit_scanned(&code, &stop).await {
                Ok(confirmation) => {
                    self.release();
                    tracing::info!(code = %code, "Check-in confirmed");
                    return Ok(ScanOutcome::CheckedIn(confirmation));
                }
                Err(rejection) => {
                    tracing::info!(code = %code, kind = ?rejection.kind, "Check-in rejected");
                    self.set_state(ScannerState::Error(rejection.message.clone()));
                    cooldown = Some((code, Instant::now() + self.retry_cooldown));
                    last_rejection = Some(rejection);
                    if stop.is_cancelled() {
                        self.release();
                        return Ok(ScanOutcome::Stopped { last_rejection });
                    }
                }
            }
        }
    }

    /// Awaits one submission. If `stop` fires meanwhile the camera is released at once,
    /// but the submission itself is left to finish.
    async fn submit_scanned(
        &mut self,
        code: &str,
        stop: &CancellationToken,
    ) -> Result<CheckInConfirmation, CheckInRejection> {
        let submission = self.submitter.submit(code, Utc::now(), EntryMethod::Qr);
        tokio::pin!(submission);

        let mut released = false;
        loop {
            tokio::select! {
                result = &mut submission => return result,
                _ = stop.cancelled(), if !released => {
                    self.frames.stop();
                    released = true;
                }
            }
        }
    }

    /// Submits typed text with method `manual`.
    pub async fn submit_manual(
        &self,
        text: &str,
    ) -> Result<CheckInConfirmation, ManualEntryError> {
        let code = extract_code(text, &self.pattern)?;
        self.set_state(ScannerState::Submitting);
        match self.submitter.submit(&code, Utc::now(), EntryMethod::Manual).await {
            Ok(confirmation) => {
                self.set_state(ScannerState::Idle);
                Ok(confirmation)
            }
            Err(rejection) => {
                self.set_state(ScannerState::Error(rejection.message.clone()));
                Err(rejection.into())
            }
        }
    }

    /// Reads the clipboard and submits its contents as a manual entry.
    pub async fn paste_from<C: Clipboard>(
        &self,
        clipboard: &mut C,
    ) -> Result<CheckInConfirmation, ManualEntryError> {
        let text = clipboard.read_text().await?.unwrap_or_default();
        self.submit_manual(&text).await
    }
}
