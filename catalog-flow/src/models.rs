use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Movie record exactly as `GET /movies` returns it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMovie {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub reviews: Vec<f64>,
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub film_company_id: String,
    #[serde(default)]
    pub cost: Value,
    #[serde(default)]
    pub release_year: Value,
}

/// A movie with its averaged review score.
///
/// `average_review` is derived once when the record is fetched and is never
/// serialized back to the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub reviews: Vec<f64>,
    #[serde(skip_serializing)]
    pub average_review: f64,
    pub film_company_id: String,
    pub cost: Value,
    pub release_year: Value,
}

impl Movie {
    pub fn from_raw(raw: RawMovie) -> Self {
        let average_review = average(&raw.reviews);
        Self {
            id: raw.id,
            title: raw.title,
            reviews: raw.reviews,
            average_review,
            film_company_id: raw.film_company_id,
            cost: raw.cost,
            release_year: raw.release_year,
        }
    }
}

/// Arithmetic mean of the scores, `0.0` for an empty slice.
pub fn average(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Company identifier. The API sends either strings or numbers; both are
/// normalized to the decimal string so lookups from `Movie::film_company_id`
/// compare like with like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CompanyId(String);

impl CompanyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CompanyId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(CompanyId)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieCompany {
    pub id: CompanyId,
    pub name: String,
}

/// Companies keyed by id for constant-time lookup from a movie.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompanyIndex {
    companies: HashMap<CompanyId, MovieCompany>,
}

impl CompanyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&MovieCompany> {
        self.companies.get(&CompanyId::new(id))
    }

    /// Display name for a company id; an unknown id yields `""`.
    pub fn name_of(&self, id: &str) -> &str {
        self.get(id).map(|c| c.name.as_str()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MovieCompany> {
        self.companies.values()
    }
}

// Later duplicates replace earlier ones, so every id maps to exactly one company.
impl FromIterator<MovieCompany> for CompanyIndex {
    fn from_iter<I: IntoIterator<Item = MovieCompany>>(iter: I) -> Self {
        Self {
            companies: iter.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }
}

/// A review as it is posted to the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieReview {
    /// Target movie id.
    pub id: String,
    pub score: f64,
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitReviewRequest<'a> {
    pub review: &'a MovieReview,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmitReviewResponse {
    #[serde(default)]
    pub message: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}
