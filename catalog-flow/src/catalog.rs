//! Catalog state: the joined movie and company collections behind the list.
//!
//! [`CatalogStore`] is the only writer of the [`CatalogSnapshot`]. A load
//! fetches both collections concurrently and commits them together; if either
//! request fails the snapshot is reset to empty and the error is kept for the
//! banner. Overlapping loads are ordered by a generation counter: only the
//! most recently started load may commit, older results are dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::{
    error::Result,
    models::{CompanyIndex, Movie},
    service::MovieService,
};

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogStatus {
    /// Nothing requested yet.
    Idle,
    Loading,
    Loaded,
    /// The last load failed; holds the error text.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    pub movies: Vec<Movie>,
    pub companies: CompanyIndex,
    pub status: CatalogStatus,
}

impl CatalogSnapshot {
    fn empty(status: CatalogStatus) -> Self {
        Self {
            movies: Vec::new(),
            companies: CompanyIndex::new(),
            status,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == CatalogStatus::Loading
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            CatalogStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self::empty(CatalogStatus::Idle)
    }
}

/// How a finished load affected the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed,
    /// A newer load started while this one was in flight; its result was dropped.
    Superseded,
}

#[derive(Clone)]
pub struct CatalogStore {
    service: Arc<dyn MovieService>,
    state: Arc<RwLock<CatalogSnapshot>>,
    generation: Arc<AtomicU64>,
}

impl CatalogStore {
    pub fn new(service: Arc<dyn MovieService>) -> Self {
        Self {
            service,
            state: Arc::new(RwLock::new(CatalogSnapshot::default())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fetch movies and companies and replace the snapshot.
    ///
    /// Errors are stored in the snapshot and also returned. A superseded
    /// load returns `Ok(LoadOutcome::Superseded)` whatever its own result was.
    pub async fn load(&self) -> Result<LoadOutcome> {
        self.begin_load().await.run().await
    }

    /// Claim the next generation and enter `Loading` without fetching yet.
    ///
    /// The generation is bumped under the same lock that writes `Loading`, so
    /// an older load can never put a newer committed snapshot back into
    /// `Loading`.
    pub async fn begin_load(&self) -> PendingLoad {
        let mut state = self.state.write().await;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *state = CatalogSnapshot::empty(CatalogStatus::Loading);
        info!(generation, "Loading catalog");

        PendingLoad {
            store: self.clone(),
            generation,
        }
    }

    /// Same as [`load`](Self::load); exposed for the refresh control.
    pub async fn reload(&self) -> Result<LoadOutcome> {
        self.load().await
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.state.read().await.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading()
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error().map(str::to_string)
    }
}

/// A load that has entered `Loading` and still has to fetch.
pub struct PendingLoad {
    store: CatalogStore,
    generation: u64,
}

impl PendingLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run(self) -> Result<LoadOutcome> {
        let Self { store, generation } = self;
        let result = tokio::try_join!(
            store.service.fetch_movies(),
            store.service.fetch_companies()
        );

        let mut state = store.state.write().await;
        if store.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding result of superseded catalog load");
            return Ok(LoadOutcome::Superseded);
        }

        match result {
            Ok((movies, companies)) => {
                info!(
                    generation,
                    movies = movies.len(),
                    companies = companies.len(),
                    "Catalog loaded"
                );
                *state = CatalogSnapshot {
                    movies,
                    companies,
                    status: CatalogStatus::Loaded,
                };
                Ok(LoadOutcome::Committed)
            }
            Err(e) => {
                error!(generation, "Failed to load catalog: {}", e);
                *state = CatalogSnapshot::empty(CatalogStatus::Failed(e.to_string()));
                Err(e)
            }
        }
    }
}
