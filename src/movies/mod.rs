//! Movie records: entity, validation, listing filters and storage.

mod filters;
mod model;
mod store;
mod validator;

pub use filters::{Filters, ListQuery, Metadata, SortDirection};
pub use model::{Movie, MovieUpdate, NewMovie, Runtime, INVALID_RUNTIME_FORMAT};
pub use store::{MovieStore, SqliteMovieStore, StoreError, StoreResult};
pub use validator::{unique, validate_movie, Validator};
