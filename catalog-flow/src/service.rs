use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    config::DEFAULT_COMMENT_LIMIT,
    error::{CatalogError, Result, ValidationError},
    models::{CompanyIndex, Movie, MovieCompany, MovieReview, RawMovie},
};

/// Remote API behind the catalog: two collections and one write endpoint.
#[async_trait]
pub trait MovieService: Send + Sync {
    /// All movies with their averaged review score.
    async fn fetch_movies(&self) -> Result<Vec<Movie>>;

    /// Companies keyed by id. A missing payload is an empty index.
    async fn fetch_companies(&self) -> Result<CompanyIndex>;

    /// Post a review and return the server's message, `""` when it sends none.
    async fn submit_review(&self, review: &MovieReview) -> Result<String>;
}

/// Reject an over-long comment before any request is made.
pub fn check_comment(review: &MovieReview, limit: usize) -> Result<()> {
    let length = review.comment.chars().count();
    if length > limit {
        return Err(ValidationError::CommentTooLong { limit, length }.into());
    }
    Ok(())
}

#[cfg(feature = "http")]
pub use http::HttpMovieService;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::models::{SubmitReviewRequest, SubmitReviewResponse};

    /// [`MovieService`] backed by the movie HTTP API.
    #[derive(Clone)]
    pub struct HttpMovieService {
        client: reqwest::Client,
        config: ServiceConfig,
    }

    impl HttpMovieService {
        pub fn new(config: ServiceConfig) -> Self {
            Self::with_client(reqwest::Client::new(), config)
        }

        /// Reuse an existing [`reqwest::Client`] and its connection pool.
        pub fn with_client(client: reqwest::Client, config: ServiceConfig) -> Self {
            Self { client, config }
        }

        pub fn config(&self) -> &ServiceConfig {
            &self.config
        }

        async fn busy_pause(&self) {
            if !self.config.busy_delay.is_zero() {
                tokio::time::sleep(self.config.busy_delay).await;
            }
        }

        /// Turn a non-2xx response into [`CatalogError::Api`].
        async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                return Err(CatalogError::Api {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(response)
        }

        async fn get_text(&self, path: &str) -> Result<String> {
            self.busy_pause().await;
            let url = self.config.endpoint(path);
            debug!(%url, "GET");

            let response = self.client.get(&url).send().await?;
            let response = Self::ensure_success(response).await?;
            Ok(response.text().await?)
        }
    }

    #[async_trait]
    impl MovieService for HttpMovieService {
        async fn fetch_movies(&self) -> Result<Vec<Movie>> {
            let body = self.get_text("movies").await?;
            let raw: Vec<RawMovie> = serde_json::from_str(&body)?;
            info!(count = raw.len(), "Fetched movies");
            Ok(raw.into_iter().map(Movie::from_raw).collect())
        }

        async fn fetch_companies(&self) -> Result<CompanyIndex> {
            let body = self.get_text("movieCompanies").await?;
            let companies: Vec<MovieCompany> = if body.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Option<Vec<MovieCompany>>>(&body)?.unwrap_or_default()
            };
            info!(count = companies.len(), "Fetched movie companies");
            Ok(companies.into_iter().collect())
        }

        async fn submit_review(&self, review: &MovieReview) -> Result<String> {
            check_comment(review, self.config.comment_limit)?;
            self.busy_pause().await;

            let url = self.config.endpoint("submitReview");
            debug!(%url, movie_id = %review.id, "POST");
            let response = self
                .client
                .post(&url)
                .json(&SubmitReviewRequest { review })
                .send()
                .await?;
            let body = Self::ensure_success(response).await?.text().await?;

            if body.trim().is_empty() {
                return Ok(String::new());
            }
            let message = match serde_json::from_str::<SubmitReviewResponse>(&body) {
                Ok(parsed) => parsed.message.unwrap_or_default(),
                Err(e) => {
                    warn!("Review response was not a message object: {}", e);
                    String::new()
                }
            };
            info!(movie_id = %review.id, "Review submitted");
            Ok(message)
        }
    }
}

/// The three calls a [`MovieService`] makes, used to script the in-memory double.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Movies,
    Companies,
    SubmitReview,
}

#[derive(Default)]
struct Script {
    failures: HashMap<Endpoint, String>,
    delays: HashMap<Endpoint, Duration>,
    calls: HashMap<Endpoint, usize>,
}

struct Fixture {
    movies: Vec<RawMovie>,
    companies: Option<Vec<MovieCompany>>,
    response_message: Option<String>,
    submitted: Vec<MovieReview>,
    script: Script,
}

/// In-memory [`MovieService`] with scriptable failures and delays.
#[derive(Clone)]
pub struct InMemoryMovieService {
    fixture: Arc<Mutex<Fixture>>,
    comment_limit: usize,
}

impl InMemoryMovieService {
    pub fn new(movies: Vec<RawMovie>, companies: Option<Vec<MovieCompany>>) -> Self {
        Self {
            fixture: Arc::new(Mutex::new(Fixture {
                movies,
                companies,
                response_message: None,
                submitted: Vec::new(),
                script: Script::default(),
            })),
            comment_limit: DEFAULT_COMMENT_LIMIT,
        }
    }

    pub fn with_comment_limit(mut self, comment_limit: usize) -> Self {
        self.comment_limit = comment_limit;
        self
    }

    pub async fn set_movies(&self, movies: Vec<RawMovie>) {
        self.fixture.lock().await.movies = movies;
    }

    pub async fn set_response_message(&self, message: Option<&str>) {
        self.fixture.lock().await.response_message = message.map(str::to_string);
    }

    /// Make the next call to `endpoint` fail with a network error.
    pub async fn fail_next(&self, endpoint: Endpoint, reason: impl Into<String>) {
        self.fixture
            .lock()
            .await
            .script
            .failures
            .insert(endpoint, reason.into());
    }

    /// Hold the next call to `endpoint` for `delay`. The response is captured
    /// before the pause, so later fixture changes do not leak into it.
    pub async fn delay_next(&self, endpoint: Endpoint, delay: Duration) {
        self.fixture
            .lock()
            .await
            .script
            .delays
            .insert(endpoint, delay);
    }

    pub async fn calls(&self, endpoint: Endpoint) -> usize {
        self.fixture
            .lock()
            .await
            .script
            .calls
            .get(&endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub async fn submitted(&self) -> Vec<MovieReview> {
        self.fixture.lock().await.submitted.clone()
    }

    async fn begin(&self, endpoint: Endpoint) -> (Option<String>, Option<Duration>) {
        let mut fixture = self.fixture.lock().await;
        *fixture.script.calls.entry(endpoint).or_default() += 1;
        let failure = fixture.script.failures.remove(&endpoint);
        let delay = fixture.script.delays.remove(&endpoint);
        (failure, delay)
    }

    async fn settle(failure: Option<String>, delay: Option<Duration>) -> Result<()> {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(reason) => Err(CatalogError::Network(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MovieService for InMemoryMovieService {
    async fn fetch_movies(&self) -> Result<Vec<Movie>> {
        let (failure, delay) = self.begin(Endpoint::Movies).await;
        let movies = self.fixture.lock().await.movies.clone();
        Self::settle(failure, delay).await?;
        Ok(movies.into_iter().map(Movie::from_raw).collect())
    }

    async fn fetch_companies(&self) -> Result<CompanyIndex> {
        let (failure, delay) = self.begin(Endpoint::Companies).await;
        let companies = self.fixture.lock().await.companies.clone();
        Self::settle(failure, delay).await?;
        Ok(companies.unwrap_or_default().into_iter().collect())
    }

    async fn submit_review(&self, review: &MovieReview) -> Result<String> {
        check_comment(review, self.comment_limit)?;
        let (failure, delay) = self.begin(Endpoint::SubmitReview).await;
        let message = self.fixture.lock().await.response_message.clone();
        Self::settle(failure, delay).await?;
        self.fixture.lock().await.submitted.push(review.clone());
        Ok(message.unwrap_or_default())
    }
}
