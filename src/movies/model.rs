//! Movie entity and its JSON representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Message returned when a runtime value is not of the form `"<n> mins"`.
pub const INVALID_RUNTIME_FORMAT: &str = "invalid runtime format";

/// A movie record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Movie {
    /// Unique id assigned by the store
    pub id: i64,
    /// When the record was created; never exposed over the API
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
    pub title: String,
    /// Release year
    #[serde(skip_serializing_if = "is_zero")]
    pub year: i32,
    /// Running time
    #[serde(skip_serializing_if = "Runtime::is_zero")]
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    /// Incremented on every update, starting at 1
    pub version: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

/// Running time in minutes, encoded in JSON as `"<n> mins"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Runtime(pub i32);

impl Runtime {
    pub fn minutes(self) -> i32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mins", self.0)
    }
}

impl Serialize for Runtime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Runtime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;

        let mut parts = raw.split(' ');
        let (Some(minutes), Some("mins"), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(serde::de::Error::custom(INVALID_RUNTIME_FORMAT));
        };

        minutes
            .parse::<i32>()
            .map(Runtime)
            .map_err(|_| serde::de::Error::custom(INVALID_RUNTIME_FORMAT))
    }
}

/// Fields accepted when creating a movie.
///
/// Missing fields decode to their zero value and are reported by
/// validation rather than by the decoder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewMovie {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl NewMovie {
    /// Build an unsaved movie record from the input.
    pub fn into_movie(self) -> Movie {
        Movie {
            id: 0,
            created_at: Utc::now(),
            title: self.title,
            year: self.year,
            runtime: self.runtime,
            genres: self.genres,
            version: 0,
        }
    }
}

/// Fields accepted when partially updating a movie. Absent fields are left
/// unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub year: Option<i32>,
    pub runtime: Option<Runtime>,
    pub genres: Option<Vec<String>>,
}

impl MovieUpdate {
    /// Overwrite the fields present in this update.
    pub fn apply(self, movie: &mut Movie) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(year) = self.year {
            movie.year = year;
        }
        if let Some(runtime) = self.runtime {
            movie.runtime = runtime;
        }
        if let Some(genres) = self.genres {
            movie.genres = genres;
        }
    }
}
