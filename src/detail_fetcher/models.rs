//! Detail record returned by a [`super::DetailFetcher`].

/// One member of a title's cast, in source billing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastEntry {
    pub person_id: String,
    pub name: String,
    /// Display string, already coerced from whatever structure the source used.
    pub role: String,
}

impl CastEntry {
    pub fn new(person_id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            person_id: person_id.into(),
            name: name.into(),
            role: role.into(),
        }
    }
}

/// Full metadata for one title.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TitleDetail {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub directors: Vec<String>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    /// Minutes.
    pub runtime: Option<f64>,
    pub cast: Vec<CastEntry>,
}
