use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    catalog::{CatalogStore, LoadOutcome, PendingLoad},
    config::DEFAULT_COMMENT_LIMIT,
    error::Result,
    list_view::{CatalogRow, ListView, SortDirection, TableHeader},
    models::Movie,
    review_form::{FormVariant, FormView, ReviewForm},
    service::MovieService,
    submission::ReviewSubmission,
};

pub const PAGE_HEADING: &str = "Welcome to Movie database!";
pub const LOAD_ERROR_MESSAGE: &str =
    "Failed to load data (movie or company data wasn't received).";

/// Snapshot of the whole page for a rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub heading: &'static str,
    pub busy: bool,
    /// Replaces the table when the last load failed.
    pub error_banner: Option<&'static str>,
    /// `Total movies: N`; absent while the error banner is shown.
    pub total: Option<String>,
    pub header: TableHeader,
    pub rows: Vec<CatalogRow>,
    pub form: Option<FormView>,
}

/// The catalog page: table, selection and the review form for the
/// selected movie.
pub struct CatalogPage {
    service: Arc<dyn MovieService>,
    catalog: CatalogStore,
    list: ListView,
    form: Option<ReviewForm>,
    narrow: bool,
    comment_limit: usize,
}

impl CatalogPage {
    pub fn new(service: Arc<dyn MovieService>) -> Self {
        Self {
            catalog: CatalogStore::new(service.clone()),
            service,
            list: ListView::new(),
            form: None,
            narrow: false,
            comment_limit: DEFAULT_COMMENT_LIMIT,
        }
    }

    pub fn with_comment_limit(mut self, comment_limit: usize) -> Self {
        self.comment_limit = comment_limit;
        self
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    /// Drop the selection and the form, then fetch the catalog.
    pub async fn load(&mut self) -> Result<LoadOutcome> {
        self.begin_load().await.run().await
    }

    /// Drop the selection and the form and put the catalog into `Loading`.
    /// The page renders busy until the returned load has run.
    pub async fn begin_load(&mut self) -> PendingLoad {
        self.list.clear_selection();
        self.sync_form().await;
        self.catalog.begin_load().await
    }

    pub async fn reload(&mut self) -> Result<LoadOutcome> {
        info!("Reloading catalog");
        self.load().await
    }

    /// Row click by movie id. Unknown ids leave the selection unchanged.
    pub async fn click_row(&mut self, id: &str) -> Option<Movie> {
        let snapshot = self.catalog.snapshot().await;
        let movie = snapshot.movies.iter().find(|m| m.id == id)?;
        self.list.select(Some(movie));
        debug!(movie_id = ?self.list.selected().map(|m| m.id.as_str()), "Selection changed");
        self.sync_form().await;
        self.list.selected().cloned()
    }

    pub async fn clear_selection(&mut self) {
        self.list.clear_selection();
        self.sync_form().await;
    }

    pub fn selected(&self) -> Option<&Movie> {
        self.list.selected()
    }

    pub fn toggle_sort(&mut self) -> SortDirection {
        self.list.toggle_sort()
    }

    pub fn is_narrow(&self) -> bool {
        self.narrow
    }

    /// Viewport signal from the surface.
    pub fn set_narrow(&mut self, narrow: bool) {
        self.narrow = narrow;
        if let Some(form) = &mut self.form {
            form.set_variant(FormVariant::for_viewport(narrow));
        }
    }

    pub fn form(&self) -> Option<&ReviewForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut ReviewForm> {
        self.form.as_mut()
    }

    /// The modal's close control.
    pub fn close_form(&mut self) -> bool {
        self.form.as_mut().is_some_and(|form| form.close())
    }

    /// The overlay finished closing; unmount the form and drop the selection.
    pub async fn finish_close_transition(&mut self) -> bool {
        let exited = self
            .form
            .as_mut()
            .is_some_and(|form| form.transition_exited());
        if exited {
            self.clear_selection().await;
        }
        exited
    }

    // Mount, rebind or unmount the form to follow the selection.
    async fn sync_form(&mut self) {
        let Some(movie) = self.list.selected().cloned() else {
            if self.form.take().is_some() {
                debug!("Review form unmounted");
            }
            return;
        };
        let variant = FormVariant::for_viewport(self.narrow);

        match &mut self.form {
            Some(form) => {
                form.bind_movie(&movie).await;
                form.set_variant(variant);
            }
            None => {
                debug!(movie_id = %movie.id, ?variant, "Review form mounted");
                let submission = ReviewSubmission::new(self.service.clone());
                self.form = Some(
                    ReviewForm::new(movie, variant, submission)
                        .with_comment_limit(self.comment_limit),
                );
            }
        }
    }

    pub async fn view(&self) -> PageView {
        let snapshot = self.catalog.snapshot().await;
        let failed = snapshot.error().is_some();

        let form = match &self.form {
            Some(form) => Some(form.view().await),
            None => None,
        };

        PageView {
            heading: PAGE_HEADING,
            busy: snapshot.is_loading(),
            error_banner: failed.then_some(LOAD_ERROR_MESSAGE),
            total: (!failed).then(|| format!("Total movies: {}", snapshot.movies.len())),
            header: self.list.header(),
            rows: if failed {
                Vec::new()
            } else {
                self.list.rows(&snapshot.movies, &snapshot.companies)
            },
            form,
        }
    }
}
