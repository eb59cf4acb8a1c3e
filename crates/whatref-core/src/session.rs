//! Guess session state machine.
//!
//! One [`GuessSession`] tracks the attempts made on a single uploaded
//! image:
//!
//! ```text
//! Idle ──submit──▶ Analyzing ──ok──▶ Analyzed ──guess again──▶ Retrying
//!   ▲                  │                ▲                          │
//!   └──────error───────┘                └──────ok (< ceiling)──────┤
//!                                        Exhausted ◀──ok (= ceiling)┘
//! ```
//!
//! Session attributes are only written after the remote call returns
//! successfully. A failed, timed-out, or cancelled call leaves the session
//! exactly as it was before the request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::gateway::InferenceGateway;
use crate::models::{AnalysisResult, HistoryEntry, NormalizedImage, UploadedImage};
use crate::normalizer::ImageNormalizer;
use crate::prompt::{build_prompt, PromptMode};
use crate::traits::HistoryStore;

/// Lifecycle state of a guess session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No image analyzed yet.
    Idle,
    /// First analysis of a new image in flight.
    Analyzing,
    /// A result is available and guess-again is allowed.
    Analyzed,
    /// A guess-again call is in flight.
    Retrying,
    /// The attempt ceiling was reached; the last result stays viewable.
    Exhausted,
}

impl SessionState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Analyzing | Self::Retrying)
    }
}

/// Shared collaborators used by every session.
#[derive(Clone)]
pub struct SessionServices {
    pub gateway: InferenceGateway,
    pub normalizer: ImageNormalizer,
    pub history: Arc<dyn HistoryStore>,
    /// Guess-again attempts allowed beyond the first analysis.
    pub max_retries: u32,
}

impl SessionServices {
    pub fn new(
        gateway: InferenceGateway,
        normalizer: ImageNormalizer,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            gateway,
            normalizer,
            history,
            max_retries: defaults::MAX_GUESS_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Serializable view of a session for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub state: SessionState,
    pub attempt_count: u32,
    pub attempts_left: u32,
    pub prior_guesses: Vec<String>,
    pub user_hint: String,
    pub current_result: Option<AnalysisResult>,
}

/// Restores the pre-call state when dropped unless disarmed.
///
/// Dropping the in-flight future therefore never leaves a session stuck
/// in `Analyzing` or `Retrying`.
struct InFlight<'a> {
    state: &'a mut SessionState,
    restore: SessionState,
}

impl<'a> InFlight<'a> {
    fn enter(state: &'a mut SessionState, in_flight: SessionState) -> Self {
        let restore = *state;
        *state = in_flight;
        Self { state, restore }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.state = self.restore;
    }
}

/// One user-initiated identification effort on one image.
pub struct GuessSession {
    id: Uuid,
    services: Arc<SessionServices>,
    state: SessionState,
    image: Option<NormalizedImage>,
    thumbnail: Option<String>,
    attempt_count: u32,
    prior_guesses: Vec<String>,
    user_hint: String,
    current_result: Option<AnalysisResult>,
}

impl GuessSession {
    pub fn new(services: Arc<SessionServices>) -> Self {
        Self {
            id: Uuid::now_v7(),
            services,
            state: SessionState::Idle,
            image: None,
            thumbnail: None,
            attempt_count: 0,
            prior_guesses: Vec::new(),
            user_hint: String::new(),
            current_result: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    pub fn attempts_left(&self) -> u32 {
        self.services.max_retries.saturating_sub(self.attempt_count)
    }

    pub fn prior_guesses(&self) -> &[String] {
        &self.prior_guesses
    }

    pub fn user_hint(&self) -> &str {
        &self.user_hint
    }

    pub fn current_result(&self) -> Option<&AnalysisResult> {
        self.current_result.as_ref()
    }

    pub fn image(&self) -> Option<&NormalizedImage> {
        self.image.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            state: self.state,
            attempt_count: self.attempt_count,
            attempts_left: self.attempts_left(),
            prior_guesses: self.prior_guesses.clone(),
            user_hint: self.user_hint.clone(),
            current_result: self.current_result.clone(),
        }
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.image = None;
        self.thumbnail = None;
        self.attempt_count = 0;
        self.prior_guesses.clear();
        self.user_hint.clear();
        self.current_result = None;
    }

    /// Start over with a new image and run the first analysis.
    ///
    /// Valid from any state. On error the session is left `Idle`.
    pub async fn submit_new_image(&mut self, upload: UploadedImage) -> Result<&AnalysisResult> {
        self.reset();

        let services = Arc::clone(&self.services);
        let outcome = {
            let _in_flight = InFlight::enter(&mut self.state, SessionState::Analyzing);
            analyze_new_image(&services, upload).await
        };
        let (image, thumbnail, result) = outcome?;

        info!(
            subsystem = "session",
            op = "submit_new_image",
            session_id = %self.id,
            attempt = 0,
            is_failure = result.is_failure,
            "First analysis complete"
        );

        self.image = Some(image);
        self.thumbnail = thumbnail;
        self.state = if self.services.max_retries == 0 {
            SessionState::Exhausted
        } else {
            SessionState::Analyzed
        };
        self.record_history(&result).await;
        Ok(&*self.current_result.insert(result))
    }

    /// Ask for a different identification of the same image.
    ///
    /// `user_hint`, when given, replaces the stored hint for this and later
    /// attempts. Rejected with [`Error::GuessLimitReached`] once the
    /// ceiling is reached.
    pub async fn request_guess_again(
        &mut self,
        user_hint: Option<&str>,
    ) -> Result<&AnalysisResult> {
        if self.state.is_in_flight() {
            return Err(Error::SessionBusy(
                "An analysis is already in progress for this image".to_string(),
            ));
        }
        match self.state {
            SessionState::Analyzed => {}
            SessionState::Exhausted => {
                return Err(Error::GuessLimitReached(
                    defaults::GUESS_LIMIT_MESSAGE.to_string(),
                ))
            }
            _ => {
                return Err(Error::InvalidState(
                    "Upload an image before asking for another guess".to_string(),
                ))
            }
        }
        if self.attempt_count >= self.services.max_retries {
            return Err(Error::GuessLimitReached(
                defaults::GUESS_LIMIT_MESSAGE.to_string(),
            ));
        }

        let (image, current) = match (self.image.as_ref(), self.current_result.as_ref()) {
            (Some(image), Some(current)) => (image, current),
            _ => {
                return Err(Error::Internal(
                    "Analyzed session has no image or result".to_string(),
                ))
            }
        };

        let hint = user_hint.map(str::to_string).unwrap_or_else(|| self.user_hint.clone());
        let mut guesses = self.prior_guesses.clone();
        guesses.push(current.raw_text.clone());
        let prompt = build_prompt(PromptMode::Retry, &guesses, &hint);

        let services = Arc::clone(&self.services);
        let outcome = {
            let _in_flight = InFlight::enter(&mut self.state, SessionState::Retrying);
            services.gateway.analyze(image, &prompt).await
        };
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    subsystem = "session",
                    op = "guess_again",
                    session_id = %self.id,
                    attempt = self.attempt_count + 1,
                    error = %e,
                    "Guess again failed, session unchanged"
                );
                return Err(e);
            }
        };

        self.prior_guesses = guesses;
        self.attempt_count += 1;
        self.user_hint = hint;
        self.state = if self.attempt_count >= self.services.max_retries {
            SessionState::Exhausted
        } else {
            SessionState::Analyzed
        };

        info!(
            subsystem = "session",
            op = "guess_again",
            session_id = %self.id,
            attempt = self.attempt_count,
            attempts_left = self.attempts_left(),
            is_failure = result.is_failure,
            "Guess again complete"
        );

        self.record_history(&result).await;
        Ok(&*self.current_result.insert(result))
    }

    /// Append a successful result to history; failures are only logged.
    async fn record_history(&self, result: &AnalysisResult) {
        let Some(entry) = HistoryEntry::from_result(result, self.thumbnail.clone()) else {
            return;
        };
        if let Err(e) = self.services.history.append(entry).await {
            warn!(
                subsystem = "session",
                component = "history",
                session_id = %self.id,
                error = %e,
                "Failed to record history entry"
            );
        }
    }
}

async fn analyze_new_image(
    services: &SessionServices,
    upload: UploadedImage,
) -> Result<(NormalizedImage, Option<String>, AnalysisResult)> {
    let normalizer = services.normalizer.clone();
    let (image, thumbnail) = tokio::task::spawn_blocking(move || {
        let image = normalizer.normalize(&upload)?;
        let thumbnail = match normalizer.thumbnail(&image) {
            Ok(thumb) => Some(thumb),
            Err(e) => {
                warn!(error = %e, "Thumbnail generation failed");
                None
            }
        };
        Ok::<_, Error>((image, thumbnail))
    })
    .await
    .map_err(|e| Error::Internal(format!("Image normalization task failed: {}", e)))??;

    let prompt = build_prompt(PromptMode::FirstAttempt, &[], "");
    let result = services.gateway.analyze(&image, &prompt).await?;
    Ok((image, thumbnail, result))
}
