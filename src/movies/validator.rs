//! Field validation for movie input and list queries.

use chrono::{Datelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use super::model::Movie;

/// Earliest year a movie can be from.
pub const MIN_YEAR: i32 = 1888;
/// Longest accepted title, in bytes.
pub const MAX_TITLE_BYTES: usize = 500;
/// Most genres a movie can be tagged with.
pub const MAX_GENRES: usize = 5;

/// Collects per-field validation failures. Only the first failure for each
/// field is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no failures were recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record `message` for `field` unless one is already recorded.
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Record `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add_error(field, message);
        }
    }

    /// The recorded failure for `field`, if any.
    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }
}

/// True if every value in `values` is distinct.
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}

/// Check a movie against the catalogue rules.
pub fn validate_movie(v: &mut Validator, movie: &Movie) {
    v.check(!movie.title.is_empty(), "title", "must be provided");
    v.check(
        movie.title.len() <= MAX_TITLE_BYTES,
        "title",
        format!("must not be more than {} bytes long", MAX_TITLE_BYTES),
    );

    v.check(movie.year != 0, "year", "must be provided");
    v.check(
        movie.year >= MIN_YEAR,
        "year",
        format!("must be greater than {}", MIN_YEAR),
    );
    v.check(
        movie.year <= Utc::now().year(),
        "year",
        "must not be in the future",
    );

    v.check(!movie.runtime.is_zero(), "runtime", "must be provided");
    v.check(movie.runtime.minutes() > 0, "runtime", "must be a positive integer");

    v.check(!movie.genres.is_empty(), "genres", "must contain at least 1 genre");
    v.check(
        movie.genres.len() <= MAX_GENRES,
        "genres",
        format!("must not contain more than {} genres", MAX_GENRES),
    );
    v.check(unique(&movie.genres), "genres", "must not contain duplicate values");
}
