//! Movie persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::{debug, info};

use super::filters::{Filters, Metadata};
use super::model::{Movie, Runtime};

/// Errors raised by a movie store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// The record changed (or vanished) since it was read
    #[error("edit conflict")]
    EditConflict,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored row could not be turned back into a movie
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: i64, reason: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage backend for movie records.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Persist a new movie. The returned record carries the assigned id,
    /// creation time and version 1.
    async fn insert(&self, movie: &Movie) -> StoreResult<Movie>;

    /// Fetch a movie by id.
    async fn get(&self, id: i64) -> StoreResult<Movie>;

    /// Save changes to `movie` if it is still at `movie.version`.
    ///
    /// Returns the record with its new version, or `EditConflict` when the
    /// stored version differs or the record was deleted.
    async fn update(&self, movie: &Movie) -> StoreResult<Movie>;

    /// Delete a movie by id.
    async fn delete(&self, id: i64) -> StoreResult<()>;

    /// List movies matching `filters`, with pagination metadata.
    async fn list(&self, filters: &Filters) -> StoreResult<(Vec<Movie>, Metadata)>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS movies (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT    NOT NULL,
    title      TEXT    NOT NULL,
    year       INTEGER NOT NULL,
    runtime    INTEGER NOT NULL CHECK (runtime >= 0),
    genres     TEXT    NOT NULL CHECK (json_array_length(genres) BETWEEN 1 AND 5),
    version    INTEGER NOT NULL DEFAULT 1
);
";

const SELECT_COLUMNS: &str = "id, created_at, title, year, runtime, genres, version";

/// SQLite-backed movie store.
pub struct SqliteMovieStore {
    conn: Mutex<Connection>,
}

impl SqliteMovieStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &str) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        info!(path = %path, "Opened movie database");
        Self::with_connection(conn)
    }

    /// A private database that lives as long as the store.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Raw column values for one movie row.
struct MovieRow {
    id: i64,
    created_at: String,
    title: String,
    year: i32,
    runtime: i32,
    genres: String,
    version: i32,
}

impl MovieRow {
    /// Read the movie columns starting at `offset`.
    fn read(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            created_at: row.get(offset + 1)?,
            title: row.get(offset + 2)?,
            year: row.get(offset + 3)?,
            runtime: row.get(offset + 4)?,
            genres: row.get(offset + 5)?,
            version: row.get(offset + 6)?,
        })
    }

    fn into_movie(self) -> StoreResult<Movie> {
        let created_at = self
            .created_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| StoreError::Corrupt {
                id: self.id,
                reason: format!("bad created_at: {}", e),
            })?;
        let genres = serde_json::from_str(&self.genres).map_err(|e| StoreError::Corrupt {
            id: self.id,
            reason: format!("bad genres: {}", e),
        })?;

        Ok(Movie {
            id: self.id,
            created_at,
            title: self.title,
            year: self.year,
            runtime: Runtime(self.runtime),
            genres,
            version: self.version,
        })
    }
}

#[async_trait]
impl MovieStore for SqliteMovieStore {
    async fn insert(&self, movie: &Movie) -> StoreResult<Movie> {
        let genres = serde_json::to_string(&movie.genres)?;
        let created_at = Utc::now();

        let conn = self.conn.lock();
        let (id, version): (i64, i32) = conn.query_row(
            "INSERT INTO movies (created_at, title, year, runtime, genres)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, version",
            params![
                created_at.to_rfc3339(),
                movie.title,
                movie.year,
                movie.runtime.minutes(),
                genres
            ],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        debug!(id, title = %movie.title, "Inserted movie");

        Ok(Movie {
            id,
            created_at,
            version,
            ..movie.clone()
        })
    }

    async fn get(&self, id: i64) -> StoreResult<Movie> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("SELECT {} FROM movies WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                |row| MovieRow::read(row, 0),
            )
            .optional()?;

        row.ok_or(StoreError::NotFound)?.into_movie()
    }

    async fn update(&self, movie: &Movie) -> StoreResult<Movie> {
        let genres = serde_json::to_string(&movie.genres)?;

        let conn = self.conn.lock();
        let version: Option<i32> = conn
            .query_row(
                "UPDATE movies
                 SET title = ?1, year = ?2, runtime = ?3, genres = ?4, version = version + 1
                 WHERE id = ?5 AND version = ?6
                 RETURNING version",
                params![
                    movie.title,
                    movie.year,
                    movie.runtime.minutes(),
                    genres,
                    movie.id,
                    movie.version
                ],
                |row| row.get(0),
            )
            .optional()?;

        let version = version.ok_or(StoreError::EditConflict)?;
        debug!(id = movie.id, version, "Updated movie");

        Ok(Movie {
            version,
            ..movie.clone()
        })
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        if id < 1 {
            return Err(StoreError::NotFound);
        }

        let conn = self.conn.lock();
        let affected = conn.execute("DELETE FROM movies WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        debug!(id, "Deleted movie");
        Ok(())
    }

    async fn list(&self, filters: &Filters) -> StoreResult<(Vec<Movie>, Metadata)> {
        let wanted_genres = serde_json::to_string(&filters.genres)?;

        // Sort column comes from a fixed safelist, never from raw input
        let sql = format!(
            "SELECT COUNT(*) OVER(), {columns}
             FROM movies
             WHERE (?1 = '' OR instr(lower(title), lower(?1)) > 0)
               AND NOT EXISTS (
                   SELECT 1 FROM json_each(?2) AS wanted
                   WHERE wanted.value NOT IN (SELECT value FROM json_each(movies.genres))
               )
             ORDER BY {column} {direction}, id ASC
             LIMIT ?3 OFFSET ?4",
            columns = SELECT_COLUMNS,
            column = filters.sort_column(),
            direction = filters.sort_direction().as_sql(),
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                filters.title,
                wanted_genres,
                filters.limit(),
                filters.offset() as i64
            ],
            |row| Ok((row.get::<_, i64>(0)?, MovieRow::read(row, 1)?)),
        )?;

        let mut total_records = 0;
        let mut movies = Vec::new();
        for row in rows {
            let (total, movie) = row?;
            total_records = total.max(0) as u64;
            movies.push(movie.into_movie()?);
        }

        let metadata = Metadata::calculate(total_records, filters.page, filters.page_size);
        Ok((movies, metadata))
    }
}
