//! Query-string filters, sorting and pagination for movie listings.

use serde::{Deserialize, Serialize};

use super::validator::Validator;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE: u32 = 10_000_000;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Columns a listing may be sorted by.
const SORT_SAFELIST: &[&str] = &["id", "title", "year", "runtime"];

/// Raw listing parameters as they arrive in the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
    pub genres: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub sort: Option<String>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// Validated listing filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filters {
    /// Case-insensitive title substring; empty matches everything
    pub title: String,
    /// Genres a movie must all carry
    pub genres: Vec<String>,
    pub page: u32,
    pub page_size: u32,
    /// Sort column, always one of the safelisted names
    sort_column: &'static str,
    direction: SortDirection,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            title: String::new(),
            genres: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_column: "id",
            direction: SortDirection::Ascending,
        }
    }
}

impl Filters {
    /// Parse and validate raw query parameters.
    ///
    /// On failure the returned validator holds one message per bad field.
    pub fn from_query(query: ListQuery) -> Result<Self, Validator> {
        let mut v = Validator::new();
        let mut filters = Filters::default();

        filters.title = query.title.unwrap_or_default();
        filters.genres = query
            .genres
            .map(|g| {
                g.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if let Some(page) = read_int(&mut v, "page", query.page) {
            v.check(page > 0, "page", "must be greater than zero");
            v.check(
                page <= i64::from(MAX_PAGE),
                "page",
                "must be a maximum of 10 million",
            );
            filters.page = page.clamp(1, i64::from(MAX_PAGE)) as u32;
        }

        if let Some(page_size) = read_int(&mut v, "page_size", query.page_size) {
            v.check(page_size > 0, "page_size", "must be greater than zero");
            v.check(
                page_size <= i64::from(MAX_PAGE_SIZE),
                "page_size",
                "must be a maximum of 100",
            );
            filters.page_size = page_size.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32;
        }

        if let Some(sort) = query.sort.filter(|s| !s.is_empty()) {
            let (column, direction) = match sort.strip_prefix('-') {
                Some(column) => (column, SortDirection::Descending),
                None => (sort.as_str(), SortDirection::Ascending),
            };
            match SORT_SAFELIST.iter().find(|c| **c == column) {
                Some(column) => {
                    filters.sort_column = column;
                    filters.direction = direction;
                }
                None => v.add_error("sort", "invalid sort value"),
            }
        }

        if v.is_valid() {
            Ok(filters)
        } else {
            Err(v)
        }
    }

    pub fn sort_column(&self) -> &'static str {
        self.sort_column
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.direction
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }
}

fn read_int(v: &mut Validator, field: &str, raw: Option<String>) -> Option<i64> {
    let raw = raw.filter(|s| !s.is_empty())?;
    match raw.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            v.add_error(field, "must be an integer value");
            None
        }
    }
}

/// Pagination details returned alongside a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
}

impl Metadata {
    /// Compute metadata for `total_records` matches. Empty when nothing
    /// matched.
    pub fn calculate(total_records: u64, page: u32, page_size: u32) -> Self {
        if total_records == 0 {
            return Self::default();
        }

        Self {
            current_page: Some(page),
            page_size: Some(page_size),
            first_page: Some(1),
            last_page: Some(total_records.div_ceil(u64::from(page_size))),
            total_records: Some(total_records),
        }
    }
}
