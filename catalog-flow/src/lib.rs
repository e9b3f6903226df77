//! Data access and view-state core of the movie catalog client.
//!
//! The pieces, leaves first:
//! * [`service`] fetches movies and companies and posts reviews.
//! * [`catalog`] owns the joined catalog snapshot and its load lifecycle.
//! * [`submission`] owns one form's review submission lifecycle.
//! * [`list_view`] sorts the table and tracks the selected movie.
//! * [`review_form`] validates and submits the review fields.
//! * [`page`] composes all of the above into a renderable view.

pub mod catalog;
pub mod config;
pub mod error;
pub mod list_view;
pub mod models;
pub mod page;
pub mod review_form;
pub mod service;
pub mod submission;

// Re-export commonly used types
pub use catalog::{CatalogSnapshot, CatalogStatus, CatalogStore, LoadOutcome, PendingLoad};
pub use config::ServiceConfig;
pub use error::{CatalogError, Result, ValidationError};
pub use list_view::{CatalogRow, ListView, SortDirection};
pub use models::{CompanyId, CompanyIndex, Movie, MovieCompany, MovieReview, RawMovie};
pub use page::{CatalogPage, PageView};
pub use review_form::{FormVariant, FormView, ModalOverlay, ReviewForm};
#[cfg(feature = "http")]
pub use service::HttpMovieService;
pub use service::{Endpoint, InMemoryMovieService, MovieService};
pub use submission::{PendingSubmission, ReviewSubmission, SubmissionState};
