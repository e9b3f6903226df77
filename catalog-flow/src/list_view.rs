use std::sync::Arc;

use crate::models::{CompanyIndex, Movie};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

/// Stable sort by averaged score. Equal scores keep their relative order.
pub fn sort_movies(movies: &mut [Movie], direction: SortDirection) {
    movies.sort_by(|a, b| match direction {
        SortDirection::Ascending => a.average_review.total_cmp(&b.average_review),
        SortDirection::Descending => b.average_review.total_cmp(&a.average_review),
    });
}

/// Called with the new selection whenever it changes.
pub type SelectionListener = Arc<dyn Fn(Option<&Movie>) + Send + Sync>;

/// One rendered table row.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRow {
    pub id: String,
    pub title: String,
    pub average_review: f64,
    /// Averaged score with one decimal, e.g. `4.0`.
    pub score: String,
    /// Company name, empty when the movie's company is unknown.
    pub company: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableHeader {
    pub columns: [&'static str; 3],
    /// Index into `columns` of the sortable column.
    pub sort_column: usize,
    pub direction: SortDirection,
}

/// Sort direction and current selection of the movie table.
#[derive(Default)]
pub struct ListView {
    direction: SortDirection,
    selected: Option<Movie>,
    listener: Option<SelectionListener>,
}

impl ListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_selection_change(mut self, listener: SelectionListener) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn toggle_sort(&mut self) -> SortDirection {
        self.direction = self.direction.toggled();
        self.direction
    }

    pub fn selected(&self) -> Option<&Movie> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.as_ref().is_some_and(|m| m.id == id)
    }

    /// Apply a row click. `None` clears; clicking the selected movie again
    /// clears; any other movie becomes the selection.
    pub fn select(&mut self, movie: Option<&Movie>) -> Option<&Movie> {
        let next = match movie {
            Some(movie) if self.is_selected(&movie.id) => None,
            Some(movie) => Some(movie.clone()),
            None => None,
        };

        let changed = match (&self.selected, &next) {
            (Some(current), Some(next)) => current.id != next.id,
            (None, None) => false,
            _ => true,
        };
        self.selected = next;

        if changed {
            if let Some(listener) = &self.listener {
                listener(self.selected.as_ref());
            }
        }
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.select(None);
    }

    pub fn header(&self) -> TableHeader {
        TableHeader {
            columns: ["Title", "Reviews", "Company"],
            sort_column: 1,
            direction: self.direction,
        }
    }

    /// Rows for `movies` in the current sort order. The input is not reordered.
    pub fn rows(&self, movies: &[Movie], companies: &CompanyIndex) -> Vec<CatalogRow> {
        let mut visible = movies.to_vec();
        sort_movies(&mut visible, self.direction);

        visible
            .into_iter()
            .map(|movie| CatalogRow {
                selected: self.is_selected(&movie.id),
                company: companies.name_of(&movie.film_company_id).to_string(),
                score: format!("{:.1}", movie.average_review),
                average_review: movie.average_review,
                title: movie.title,
                id: movie.id,
            })
            .collect()
    }
}
