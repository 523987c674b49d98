//! Movie CRUD handlers.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, instrument};

use super::error::ApiError;
use super::json::decode;
use super::state::AppState;
use crate::movies::{validate_movie, Filters, ListQuery, MovieUpdate, NewMovie, Validator};

/// Header a client may send to make an update conditional on the version
/// it last read.
const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

/// Parse a path id, treating anything but a positive integer as missing.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::NotFound),
    }
}

/// GET /v1/movies
#[instrument(skip_all)]
pub async fn list_movies(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let filters = Filters::from_query(query).map_err(ApiError::Validation)?;
    let (movies, metadata) = state.movies.list(&filters).await?;

    Ok(Json(json!({ "movies": movies, "metadata": metadata })).into_response())
}

/// POST /v1/movies
#[instrument(skip_all)]
pub async fn create_movie(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let input: NewMovie = decode(body, state.max_body_bytes)?;
    let movie = input.into_movie();

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    if !v.is_valid() {
        return Err(ApiError::Validation(v));
    }

    let movie = state.movies.insert(&movie).await?;
    info!(id = movie.id, title = %movie.title, "Movie created");

    let location = format!("/v1/movies/{}", movie.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "movie": movie })),
    )
        .into_response())
}

/// GET /v1/movies/:id
#[instrument(skip_all, fields(id = %id))]
pub async fn show_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let movie = state.movies.get(id).await?;

    Ok(Json(json!({ "movie": movie })).into_response())
}

/// PATCH /v1/movies/:id
#[instrument(skip_all, fields(id = %id))]
pub async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let mut movie = state.movies.get(id).await?;

    if let Some(expected) = headers.get(EXPECTED_VERSION_HEADER) {
        if expected.as_bytes() != movie.version.to_string().as_bytes() {
            return Err(ApiError::EditConflict);
        }
    }

    let update: MovieUpdate = decode(body, state.max_body_bytes)?;
    update.apply(&mut movie);

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    if !v.is_valid() {
        return Err(ApiError::Validation(v));
    }

    let movie = state.movies.update(&movie).await?;
    info!(id = movie.id, version = movie.version, "Movie updated");

    Ok(Json(json!({ "movie": movie })).into_response())
}

/// DELETE /v1/movies/:id
#[instrument(skip_all, fields(id = %id))]
pub async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    state.movies.delete(id).await?;
    info!(id, "Movie deleted");

    Ok(Json(json!({ "message": "movie successfully deleted" })).into_response())
}
