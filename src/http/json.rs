//! Request body decoding with client-friendly error messages.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use super::error::ApiError;
use crate::movies::INVALID_RUNTIME_FORMAT;

/// Decode a JSON request body.
///
/// `body` is the raw extractor result so that oversized bodies are
/// reported in the same envelope as malformed ones.
pub fn decode<T: DeserializeOwned>(
    body: Result<Bytes, BytesRejection>,
    max_bytes: usize,
) -> Result<T, ApiError> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BadRequest(format!("body must not be larger than {} bytes", max_bytes))
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::BadRequest("body must not be empty".to_string()));
    }

    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(describe(&e)))
}

fn describe(e: &serde_json::Error) -> String {
    let message = e.to_string();
    match e.classify() {
        Category::Eof => "body contains badly-formed JSON".to_string(),
        Category::Syntax if message.starts_with("trailing characters") => {
            "body must only contain a single JSON value".to_string()
        }
        Category::Syntax => format!(
            "body contains badly-formed JSON (at line {} column {})",
            e.line(),
            e.column()
        ),
        Category::Data => {
            if let Some(field) = unknown_field(&message) {
                format!("body contains unknown key \"{}\"", field)
            } else if message.contains(INVALID_RUNTIME_FORMAT) {
                INVALID_RUNTIME_FORMAT.to_string()
            } else {
                format!(
                    "body contains incorrect JSON type (at line {} column {})",
                    e.line(),
                    e.column()
                )
            }
        }
        Category::Io => "body could not be read".to_string(),
    }
}

/// Pull the field name out of serde's "unknown field `x`, expected ..." message.
fn unknown_field(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("unknown field `")?;
    rest.split('`').next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movies::NewMovie;

    fn decode_str(body: &str) -> Result<NewMovie, ApiError> {
        decode(Ok(Bytes::from(body.to_string())), 1024)
    }

    fn message(result: Result<NewMovie, ApiError>) -> String {
        match result {
            Err(ApiError::BadRequest(msg)) => msg,
            other => panic!("expected bad request, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_valid_body() {
        let movie = decode_str(r#"{"title":"Moana","year":2016,"runtime":"107 mins","genres":["animation"]}"#)
            .unwrap();
        assert_eq!(movie.title, "Moana");
        assert_eq!(movie.runtime.minutes(), 107);
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(message(decode_str("")), "body must not be empty");
        assert_eq!(message(decode_str("  \n")), "body must not be empty");
    }

    #[test]
    fn test_badly_formed() {
        assert_eq!(message(decode_str(r#"{"title": "Moana""#)), "body contains badly-formed JSON");
        assert!(message(decode_str(r#"{"title" "Moana"}"#)).starts_with("body contains badly-formed JSON (at line 1"));
    }

    #[test]
    fn test_multiple_values() {
        assert_eq!(
            message(decode_str(r#"{"title":"Moana"} {"title":"Frozen"}"#)),
            "body must only contain a single JSON value"
        );
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            message(decode_str(r#"{"title":"Moana","rating":"PG"}"#)),
            "body contains unknown key \"rating\""
        );
    }

    #[test]
    fn test_wrong_type() {
        assert!(message(decode_str(r#"{"title":123}"#)).starts_with("body contains incorrect JSON type"));
    }

    #[test]
    fn test_bad_runtime() {
        assert_eq!(message(decode_str(r#"{"runtime":"107 minutes"}"#)), "invalid runtime format");
    }
}
