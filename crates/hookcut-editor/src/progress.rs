//! Render progress feedback for a single clip.
//!
//! The server only reports whether a render is done, so progress is
//! synthesized: a fast optimistic ramp, a slow creep while polling, then a
//! short rush to 100 once the clip is rendered.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use hookcut_models::{ClipId, ClipRenderStatus, ClipStatusView};

use crate::error::{EditorError, EditorResult};

pub const RAMP_DURATION: Duration = Duration::from_secs(30);
pub const RAMP_TICK: Duration = Duration::from_millis(300);
pub const RAMP_START: f64 = 5.0;
pub const RAMP_END: f64 = 85.0;
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const CREEP_PER_ATTEMPT: f64 = 0.3;
pub const CREEP_CAP: f64 = 92.0;
pub const MAX_POLL_ATTEMPTS: u32 = 60;
pub const FINISH_DURATION: Duration = Duration::from_millis(800);
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

pub const TIMEOUT_MESSAGE: &str = "Video generation is taking longer than expected. Please try again.";
pub const FAILED_MESSAGE: &str = "Video generation failed. Please try again.";

/// Progress during the initial ramp, `elapsed` since the save.
pub fn ramp_progress(elapsed: Duration) -> f64 {
    let fraction = (elapsed.as_secs_f64() / RAMP_DURATION.as_secs_f64()).min(1.0);
    RAMP_START + fraction * (RAMP_END - RAMP_START)
}

/// Progress after `attempts` unfinished polls.
pub fn creep_progress(attempts: u32) -> f64 {
    (RAMP_END + attempts as f64 * CREEP_PER_ATTEMPT).min(CREEP_CAP)
}

/// Progress while animating from `from` to 100.
pub fn finish_progress(from: f64, elapsed: Duration) -> f64 {
    let fraction = (elapsed.as_secs_f64() / FINISH_DURATION.as_secs_f64()).min(1.0);
    from + (100.0 - from) * fraction
}

/// What the editor shows about the current render.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationState {
    Idle,
    Generating { progress: f64 },
    Completed { video_url: Option<String> },
    Failed { message: String },
}

impl GenerationState {
    pub fn is_generating(&self) -> bool {
        matches!(self, GenerationState::Generating { .. })
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            GenerationState::Generating { progress } => Some(*progress),
            GenerationState::Completed { .. } => Some(100.0),
            _ => None,
        }
    }
}

/// Source of a clip's render status.
#[async_trait]
pub trait ClipStatusSource: Send + Sync {
    async fn fetch_status(&self, clip_id: &ClipId) -> EditorResult<ClipStatusView>;
}

/// Reads `GET {base_url}/api/clips/{id}/status`.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    http: reqwest::Client,
    base_url: String,
    bearer: Option<String>,
}

impl HttpStatusSource {
    pub fn new(base_url: impl Into<String>, bearer: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer,
        }
    }
}

#[async_trait]
impl ClipStatusSource for HttpStatusSource {
    async fn fetch_status(&self, clip_id: &ClipId) -> EditorResult<ClipStatusView> {
        let url = format!("{}/api/clips/{}/status", self.base_url, clip_id);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| EditorError::StatusRequest(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(EditorError::StatusHttp(status.as_u16()));
        }
        response
            .json::<ClipStatusView>()
            .await
            .map_err(|e| EditorError::StatusRequest(e.to_string()))
    }
}

/// Drives the progress state for one render, from save to completion.
pub struct StatusPoller<S> {
    source: S,
}

impl<S: ClipStatusSource> StatusPoller<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run until the render completes, fails or times out. Every state change
    /// is passed to `on_update`; the final state is also returned.
    pub async fn run<F>(&self, clip_id: &ClipId, mut on_update: F) -> GenerationState
    where
        F: FnMut(&GenerationState) + Send,
    {
        let started = Instant::now();
        let mut emit = |state: GenerationState| {
            on_update(&state);
            state
        };

        emit(GenerationState::Generating {
            progress: RAMP_START,
        });

        let mut ticker = interval(RAMP_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let elapsed = started.elapsed();
            if elapsed >= RAMP_DURATION {
                break;
            }
            emit(GenerationState::Generating {
                progress: ramp_progress(elapsed),
            });
        }

        let mut progress = RAMP_END;
        for attempt in 1..=MAX_POLL_ATTEMPTS {
            match self.source.fetch_status(clip_id).await {
                Ok(view) => match view.status {
                    ClipRenderStatus::Rendered => {
                        return self.finish(progress, view.video_url, &mut emit).await;
                    }
                    ClipRenderStatus::Failed => {
                        debug!(clip_id = %clip_id, "render reported failed");
                        return emit(GenerationState::Failed {
                            message: FAILED_MESSAGE.to_string(),
                        });
                    }
                    _ => {}
                },
                Err(e) => {
                    warn!(clip_id = %clip_id, error = %e, "status poll failed");
                    return emit(GenerationState::Failed {
                        message: e.to_string(),
                    });
                }
            }
            progress = creep_progress(attempt);
            emit(GenerationState::Generating { progress });
            if attempt < MAX_POLL_ATTEMPTS {
                sleep(POLL_INTERVAL).await;
            }
        }

        emit(GenerationState::Failed {
            message: TIMEOUT_MESSAGE.to_string(),
        })
    }

    async fn finish<E>(&self, from: f64, video_url: Option<String>, emit: &mut E) -> GenerationState
    where
        E: FnMut(GenerationState) -> GenerationState,
    {
        let started = Instant::now();
        let mut frames = interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            frames.tick().await;
            let elapsed = started.elapsed();
            if elapsed >= FINISH_DURATION {
                break;
            }
            emit(GenerationState::Generating {
                progress: finish_progress(from, elapsed),
            });
        }
        emit(GenerationState::Generating { progress: 100.0 });
        emit(GenerationState::Completed { video_url })
    }
}
