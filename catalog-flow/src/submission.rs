use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{error::Result, models::MovieReview, service::MovieService};

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    /// Holds the server message, possibly empty.
    Succeeded(String),
    /// Holds the error text.
    Failed(String),
}

#[derive(Debug)]
struct Inner {
    state: SubmissionState,
    // Bumped by `reset`; a response from an older epoch is not published.
    epoch: u64,
}

/// Lifecycle of review submissions for one mounted form.
///
/// Each form owns its own instance, so results never leak between forms.
#[derive(Clone)]
pub struct ReviewSubmission {
    service: Arc<dyn MovieService>,
    inner: Arc<RwLock<Inner>>,
}

impl ReviewSubmission {
    pub fn new(service: Arc<dyn MovieService>) -> Self {
        Self {
            service,
            inner: Arc::new(RwLock::new(Inner {
                state: SubmissionState::Idle,
                epoch: 0,
            })),
        }
    }

    /// Post `review`, moving through `Submitting` to `Succeeded` or `Failed`.
    ///
    /// If [`reset`](Self::reset) ran while the request was in flight, the
    /// state returns to `Idle` instead and the result is only handed back to
    /// the caller.
    pub async fn submit_review(&self, review: MovieReview) -> Result<String> {
        self.begin(review).await.send().await
    }

    /// Enter `Submitting` for `review` without sending it yet.
    pub async fn begin(&self, review: MovieReview) -> PendingSubmission {
        let epoch = {
            let mut inner = self.inner.write().await;
            inner.state = SubmissionState::Submitting;
            inner.epoch
        };
        info!(movie_id = %review.id, score = review.score, "Submitting review");

        PendingSubmission {
            submission: self.clone(),
            epoch,
            review,
        }
    }

    /// Clear any message or error. An in-flight submission stays `Submitting`.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        inner.epoch += 1;
        if inner.state != SubmissionState::Submitting {
            inner.state = SubmissionState::Idle;
        }
    }

    pub async fn state(&self) -> SubmissionState {
        self.inner.read().await.state.clone()
    }

    pub async fn is_submitting(&self) -> bool {
        self.inner.read().await.state == SubmissionState::Submitting
    }

    pub async fn response_message(&self) -> Option<String> {
        match &self.inner.read().await.state {
            SubmissionState::Succeeded(message) => Some(message.clone()),
            _ => None,
        }
    }

    pub async fn error(&self) -> Option<String> {
        match &self.inner.read().await.state {
            SubmissionState::Failed(error) => Some(error.clone()),
            _ => None,
        }
    }
}

/// A review already marked `Submitting`, waiting to be sent.
pub struct PendingSubmission {
    submission: ReviewSubmission,
    epoch: u64,
    review: MovieReview,
}

impl PendingSubmission {
    pub fn review(&self) -> &MovieReview {
        &self.review
    }

    pub async fn send(self) -> Result<String> {
        let Self {
            submission,
            epoch,
            review,
        } = self;
        let result = submission.service.submit_review(&review).await;

        let mut inner = submission.inner.write().await;
        let current = inner.epoch == epoch;
        if !current {
            debug!(movie_id = %review.id, "Submission finished after reset, result not shown");
        }

        match result {
            Ok(message) => {
                inner.state = if current {
                    SubmissionState::Succeeded(message.clone())
                } else {
                    SubmissionState::Idle
                };
                Ok(message)
            }
            Err(e) => {
                warn!(movie_id = %review.id, "Review submission failed: {}", e);
                inner.state = if current {
                    SubmissionState::Failed(e.to_string())
                } else {
                    SubmissionState::Idle
                };
                Err(e)
            }
        }
    }
}
