//! Review form bound to one movie.
//!
//! The form comes in two presentations picked from the viewport signal:
//! inline below the table, or a modal overlay on narrow screens. Both share
//! the same fields, validation and submission lifecycle; the modal adds an
//! overlay whose close control only reports `close_form` once its closing
//! transition has finished.
//!
//! Score rule: the field only ever holds ASCII digits, so a valid score is a
//! non-empty, finite, non-negative number. The same rule filters keystrokes
//! and is checked again on submit.

use std::sync::Arc;
use tracing::debug;

use crate::{
    config::DEFAULT_COMMENT_LIMIT,
    error::{CatalogError, Result, ValidationError},
    models::{Movie, MovieReview},
    submission::{PendingSubmission, ReviewSubmission, SubmissionState},
};

pub const SUBMISSION_FAILED_MESSAGE: &str = "Review submission failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormVariant {
    Inline,
    Modal,
}

impl FormVariant {
    pub fn for_viewport(narrow: bool) -> Self {
        if narrow {
            FormVariant::Modal
        } else {
            FormVariant::Inline
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalOverlay {
    Open,
    /// Close requested, transition still running.
    Closing,
    Closed,
}

pub type CloseFormCallback = Arc<dyn Fn() + Send + Sync>;

/// Whether `text` may stand in the score field at all.
pub fn accepts_score_input(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_digit())
}

pub fn parse_score(text: &str) -> std::result::Result<f64, ValidationError> {
    if text.is_empty() || !accepts_score_input(text) {
        return Err(ValidationError::InvalidScore);
    }
    text.parse::<f64>()
        .ok()
        .filter(|score| score.is_finite())
        .ok_or(ValidationError::InvalidScore)
}

/// Comments must stay strictly below `limit` characters.
pub fn check_comment_length(comment: &str, limit: usize) -> std::result::Result<(), ValidationError> {
    let length = comment.chars().count();
    if length >= limit {
        return Err(ValidationError::CommentTooLong { limit, length });
    }
    Ok(())
}

/// Everything a surface needs to draw the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormView {
    pub variant: FormVariant,
    pub title: String,
    pub score: String,
    pub comment: String,
    pub score_error: Option<String>,
    pub comment_error: Option<String>,
    pub submit_enabled: bool,
    pub busy: bool,
    pub response_message: Option<String>,
    pub failure_message: Option<&'static str>,
    pub open: bool,
}

pub struct ReviewForm {
    movie: Movie,
    variant: FormVariant,
    score: String,
    comment: String,
    score_invalid: bool,
    comment_limit: usize,
    submission: ReviewSubmission,
    overlay: ModalOverlay,
    on_close: Option<CloseFormCallback>,
}

impl ReviewForm {
    pub fn new(movie: Movie, variant: FormVariant, submission: ReviewSubmission) -> Self {
        Self {
            movie,
            variant,
            score: String::new(),
            comment: String::new(),
            score_invalid: false,
            comment_limit: DEFAULT_COMMENT_LIMIT,
            submission,
            overlay: ModalOverlay::Open,
            on_close: None,
        }
    }

    pub fn with_comment_limit(mut self, comment_limit: usize) -> Self {
        self.comment_limit = comment_limit;
        self
    }

    pub fn on_close(mut self, callback: CloseFormCallback) -> Self {
        self.on_close = Some(callback);
        self
    }

    pub fn movie(&self) -> &Movie {
        &self.movie
    }

    pub fn variant(&self) -> FormVariant {
        self.variant
    }

    /// Switch presentation, keeping the typed fields.
    pub fn set_variant(&mut self, variant: FormVariant) {
        if self.variant != variant {
            self.variant = variant;
            self.overlay = ModalOverlay::Open;
        }
    }

    pub fn score(&self) -> &str {
        &self.score
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn submission(&self) -> &ReviewSubmission {
        &self.submission
    }

    /// Replace the score text. Returns `false` and leaves the field untouched
    /// when `text` contains anything but digits.
    pub async fn input_score(&mut self, text: &str) -> bool {
        if !accepts_score_input(text) {
            return false;
        }
        self.score = text.to_string();
        self.submission.reset().await;
        true
    }

    /// Replace the comment text, cut at the comment limit.
    pub async fn input_comment(&mut self, text: &str) {
        self.comment = text.chars().take(self.comment_limit).collect();
        self.submission.reset().await;
    }

    pub fn comment_valid(&self) -> bool {
        check_comment_length(&self.comment, self.comment_limit).is_ok()
    }

    fn validation_error_shown(&self) -> bool {
        self.score_invalid || !self.comment_valid()
    }

    pub async fn can_submit(&self) -> bool {
        self.comment_valid() && !self.submission.is_submitting().await
    }

    /// Validate the fields and build the review to send. Marks the score
    /// field invalid when it does not parse.
    pub async fn prepare(&mut self) -> Result<MovieReview> {
        let score = match parse_score(&self.score) {
            Ok(score) => {
                self.score_invalid = false;
                score
            }
            Err(e) => {
                self.score_invalid = true;
                debug!(movie_id = %self.movie.id, score = %self.score, "Rejected review score");
                return Err(e.into());
            }
        };
        check_comment_length(&self.comment, self.comment_limit)?;
        if self.submission.is_submitting().await {
            return Err(CatalogError::InProgress);
        }

        Ok(MovieReview {
            id: self.movie.id.clone(),
            score,
            comment: self.comment.clone(),
        })
    }

    /// Validate and mark the submission running. The returned request can be
    /// sent while the busy form is being drawn; hand its result to
    /// [`finish`](Self::finish).
    pub async fn start_submit(&mut self) -> Result<PendingSubmission> {
        let review = self.prepare().await?;
        Ok(self.submission.begin(review).await)
    }

    /// Apply a finished submission. Fields are cleared only when the success
    /// was published; a result dropped by an edit or a movie change leaves
    /// the current text alone.
    pub async fn finish(&mut self, result: &Result<String>) {
        let published = matches!(self.submission.state().await, SubmissionState::Succeeded(_));
        if result.is_ok() && published {
            self.score.clear();
            self.comment.clear();
        }
    }

    /// Validate, submit and apply the result.
    pub async fn submit(&mut self) -> Result<String> {
        let pending = self.start_submit().await?;
        let result = pending.send().await;
        self.finish(&result).await;
        result
    }

    /// Point the form at `movie`. A different movie clears the fields, the
    /// validation state and the previous submission result.
    pub async fn bind_movie(&mut self, movie: &Movie) {
        if movie.id != self.movie.id {
            self.score.clear();
            self.comment.clear();
            self.score_invalid = false;
            self.submission.reset().await;
        }
        self.movie = movie.clone();
    }

    pub fn overlay(&self) -> ModalOverlay {
        self.overlay
    }

    /// The modal's close control. Starts the closing transition; the inline
    /// form has no close control and ignores this.
    pub fn close(&mut self) -> bool {
        if self.variant != FormVariant::Modal || self.overlay != ModalOverlay::Open {
            return false;
        }
        self.overlay = ModalOverlay::Closing;
        true
    }

    /// The overlay finished its closing transition: only now is `close_form`
    /// reported.
    pub fn transition_exited(&mut self) -> bool {
        if self.overlay != ModalOverlay::Closing {
            return false;
        }
        self.overlay = ModalOverlay::Closed;
        if let Some(callback) = &self.on_close {
            callback();
        }
        true
    }

    pub async fn view(&self) -> FormView {
        let state = self.submission.state().await;
        let busy = state == SubmissionState::Submitting;

        let response_message = match &state {
            SubmissionState::Succeeded(message)
                if !message.is_empty() && !self.validation_error_shown() =>
            {
                Some(message.clone())
            }
            _ => None,
        };
        let failure_message = match state {
            SubmissionState::Failed(_) => Some(SUBMISSION_FAILED_MESSAGE),
            _ => None,
        };

        FormView {
            variant: self.variant,
            title: match self.variant {
                FormVariant::Inline => format!("Review \"{}\"", self.movie.title),
                FormVariant::Modal => self.movie.title.clone(),
            },
            score: self.score.clone(),
            comment: self.comment.clone(),
            score_error: self
                .score_invalid
                .then(|| ValidationError::InvalidScore.to_string()),
            comment_error: (!self.comment_valid()).then(|| {
                format!("The comment should not exceed {} chars.", self.comment_limit)
            }),
            submit_enabled: self.comment_valid() && !busy,
            busy,
            response_message,
            failure_message,
            open: self.variant == FormVariant::Inline || self.overlay != ModalOverlay::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawMovie;
    use crate::service::{Endpoint, InMemoryMovieService};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn movie(id: &str) -> Movie {
        Movie::from_raw(RawMovie {
            id: id.to_string(),
            reviews: vec![4.0],
            title: format!("Movie {id}"),
            film_company_id: String::new(),
            cost: Value::Null,
            release_year: Value::Null,
        })
    }

    fn form(service: &InMemoryMovieService, variant: FormVariant) -> ReviewForm {
        let submission = ReviewSubmission::new(Arc::new(service.clone()));
        ReviewForm::new(movie("1"), variant, submission)
    }

    #[test]
    fn test_variant_follows_viewport() {
        assert_eq!(FormVariant::for_viewport(true), FormVariant::Modal);
        assert_eq!(FormVariant::for_viewport(false), FormVariant::Inline);
    }

    #[test]
    fn test_parse_score() {
        assert_eq!(parse_score("7"), Ok(7.0));
        assert_eq!(parse_score("007"), Ok(7.0));
        assert_eq!(parse_score(""), Err(ValidationError::InvalidScore));
        assert_eq!(parse_score("abc"), Err(ValidationError::InvalidScore));
        assert_eq!(parse_score("-1"), Err(ValidationError::InvalidScore));
        assert_eq!(parse_score("7.5"), Err(ValidationError::InvalidScore));
    }

    #[test]
    fn test_comment_length_boundary() {
        assert!(check_comment_length(&"x".repeat(99), 100).is_ok());
        assert_eq!(
            check_comment_length(&"x".repeat(100), 100),
            Err(ValidationError::CommentTooLong {
                limit: 100,
                length: 100
            })
        );
    }

    #[tokio::test]
    async fn test_score_keystrokes_limited_to_digits() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let mut form = form(&service, FormVariant::Inline);

        assert!(form.input_score("7").await);
        assert!(!form.input_score("7a").await);
        assert_eq!(form.score(), "7");
        assert!(form.input_score("").await);
        assert_eq!(form.score(), "");
    }

    #[tokio::test]
    async fn test_comment_input_is_capped() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let mut form = form(&service, FormVariant::Inline);

        form.input_comment(&"x".repeat(150)).await;
        assert_eq!(form.comment().chars().count(), 100);
        assert!(!form.comment_valid());
        assert!(!form.can_submit().await);

        form.input_comment(&"x".repeat(99)).await;
        assert!(form.comment_valid());
        assert!(form.can_submit().await);
    }

    #[tokio::test]
    async fn test_empty_score_blocks_submit_without_request() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let mut form = form(&service, FormVariant::Inline);

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, CatalogError::Validation(ValidationError::InvalidScore)));
        assert_eq!(service.calls(Endpoint::SubmitReview).await, 0);

        let view = form.view().await;
        assert_eq!(view.score_error.as_deref(), Some("Score is not valid."));
    }

    #[tokio::test]
    async fn test_rejected_letters_leave_score_empty_and_invalid() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let mut form = form(&service, FormVariant::Inline);

        assert!(!form.input_score("abc").await);
        assert!(form.submit().await.unwrap_err().is_validation());
        assert_eq!(service.calls(Endpoint::SubmitReview).await, 0);
    }

    #[tokio::test]
    async fn test_comment_at_limit_blocks_submit() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let mut form = form(&service, FormVariant::Inline);
        form.input_score("7").await;

        form.input_comment(&"x".repeat(100)).await;
        assert!(form.submit().await.unwrap_err().is_validation());
        assert_eq!(service.calls(Endpoint::SubmitReview).await, 0);
        let view = form.view().await;
        assert!(!view.submit_enabled);
        assert_eq!(
            view.comment_error.as_deref(),
            Some("The comment should not exceed 100 chars.")
        );

        form.input_comment(&"x".repeat(99)).await;
        form.submit().await.unwrap();
        assert_eq!(service.calls(Endpoint::SubmitReview).await, 1);
    }

    #[tokio::test]
    async fn test_successful_submit_clears_fields_and_shows_message() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        service.set_response_message(Some("Thanks!")).await;
        let mut form = form(&service, FormVariant::Inline);
        form.input_score("7").await;
        form.input_comment("Loved it").await;

        let message = form.submit().await.unwrap();
        assert_eq!(message, "Thanks!");

        let view = form.view().await;
        assert_eq!(view.response_message.as_deref(), Some("Thanks!"));
        assert_eq!(view.score, "");
        assert_eq!(view.comment, "");
        assert!(view.failure_message.is_none());

        let sent = service.submitted().await;
        assert_eq!(
            sent,
            vec![MovieReview {
                id: "1".into(),
                score: 7.0,
                comment: "Loved it".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_fields() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        service.fail_next(Endpoint::SubmitReview, "connection refused").await;
        let mut form = form(&service, FormVariant::Modal);
        form.input_score("3").await;
        form.input_comment("Meh").await;

        assert!(form.submit().await.unwrap_err().is_network());

        let view = form.view().await;
        assert_eq!(view.failure_message, Some("Review submission failed."));
        assert!(view.response_message.is_none());
        assert_eq!(view.score, "3");
        assert_eq!(view.comment, "Meh");
    }

    #[tokio::test]
    async fn test_message_hidden_while_validation_error_shown() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        service.set_response_message(Some("Thanks!")).await;
        let mut form = form(&service, FormVariant::Inline);
        form.input_score("7").await;
        form.submit().await.unwrap();

        // Fields are empty again, so an immediate resubmit fails validation.
        assert!(form.submit().await.is_err());
        let view = form.view().await;
        assert!(view.score_error.is_some());
        assert!(view.response_message.is_none());
    }

    #[tokio::test]
    async fn test_editing_clears_previous_result() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        service.set_response_message(Some("Thanks!")).await;
        let mut form = form(&service, FormVariant::Inline);
        form.input_score("7").await;
        form.submit().await.unwrap();

        form.input_comment("another").await;
        assert!(form.view().await.response_message.is_none());
    }

    #[tokio::test]
    async fn test_rebinding_to_other_movie_clears_failure() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        service.fail_next(Endpoint::SubmitReview, "boom").await;
        let mut form = form(&service, FormVariant::Inline);
        form.input_score("7").await;
        assert!(form.submit().await.is_err());
        assert!(form.view().await.failure_message.is_some());

        form.bind_movie(&movie("2")).await;
        let view = form.view().await;
        assert_eq!(form.movie().id, "2");
        assert_eq!(view.title, "Review \"Movie 2\"");
        assert!(view.failure_message.is_none());
        assert_eq!(view.score, "");
    }

    #[tokio::test]
    async fn test_rebinding_to_other_movie_clears_validation_error() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let mut form = form(&service, FormVariant::Inline);
        assert!(form.submit().await.is_err());
        assert!(form.view().await.score_error.is_some());

        form.bind_movie(&movie("2")).await;
        assert!(form.view().await.score_error.is_none());
    }

    #[tokio::test]
    async fn test_rebinding_same_movie_keeps_fields() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let mut form = form(&service, FormVariant::Inline);
        form.input_score("5").await;

        form.bind_movie(&movie("1")).await;
        assert_eq!(form.score(), "5");
    }

    #[tokio::test]
    async fn test_modal_reports_close_after_transition() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = closed.clone();
        let mut form = form(&service, FormVariant::Modal).on_close(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!form.transition_exited());
        assert!(form.close());
        assert_eq!(form.overlay(), ModalOverlay::Closing);
        assert_eq!(closed.load(Ordering::SeqCst), 0);
        assert!(form.view().await.open);

        assert!(form.transition_exited());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(!form.view().await.open);

        assert!(!form.transition_exited());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_inline_form_has_no_close_control() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let mut form = form(&service, FormVariant::Inline);

        assert!(!form.close());
        assert_eq!(form.overlay(), ModalOverlay::Open);
        assert!(form.view().await.open);
    }

    #[tokio::test]
    async fn test_modal_title_is_plain() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        let form = form(&service, FormVariant::Modal);
        assert_eq!(form.view().await.title, "Movie 1");
    }

    #[tokio::test]
    async fn test_busy_while_submission_in_flight() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        service
            .delay_next(Endpoint::SubmitReview, Duration::from_millis(100))
            .await;
        let mut form = form(&service, FormVariant::Inline);
        form.input_score("8").await;

        let pending = form.start_submit().await.unwrap();
        let request = tokio::spawn(pending.send());
        tokio::time::sleep(Duration::from_millis(20)).await;

        let view = form.view().await;
        assert!(view.busy);
        assert!(!view.submit_enabled);
        assert!(!form.can_submit().await);
        assert!(matches!(
            form.submit().await,
            Err(CatalogError::InProgress)
        ));

        let result = request.await.unwrap();
        form.finish(&result).await;
        let view = form.view().await;
        assert!(!view.busy);
        assert!(view.submit_enabled);
    }

    #[tokio::test]
    async fn test_edit_during_submission_keeps_new_text() {
        let service = InMemoryMovieService::new(Vec::new(), None);
        service.set_response_message(Some("Thanks!")).await;
        service
            .delay_next(Endpoint::SubmitReview, Duration::from_millis(100))
            .await;
        let mut form = form(&service, FormVariant::Inline);
        form.input_score("6").await;
        form.input_comment("first draft").await;

        let pending = form.start_submit().await.unwrap();
        let request = tokio::spawn(pending.send());
        tokio::time::sleep(Duration::from_millis(20)).await;
        form.input_comment("typed during flight").await;

        let result = request.await.unwrap();
        assert_eq!(result.as_deref().unwrap(), "Thanks!");
        form.finish(&result).await;

        let view = form.view().await;
        assert_eq!(view.comment, "typed during flight");
        assert_eq!(view.score, "6");
        assert!(view.response_message.is_none());
        assert_eq!(form.submission().state().await, SubmissionState::Idle);
    }
}
