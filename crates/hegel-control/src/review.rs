//! `POST /review`: validate a list of files and ask the UI to open them.

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use futures::future::join_all;
use hegel_pty::{SessionEvent, SharedSink};
use serde_json::{json, Value};

/// Largest request body accepted before the read is abandoned.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Why a review request was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// The body is not the expected shape. Surfaced as `400`.
    #[error("{0}")]
    Validation(String),
    /// Well-formed request naming files that do not exist. Surfaced as `404`.
    #[error("files not found: {}", .0.join(", "))]
    MissingFiles(Vec<String>),
    /// Anything else. Surfaced as `500`.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        match self {
            ReviewError::Validation(message) => {
                log::debug!("rejected review request: {message}");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ReviewError::MissingFiles(missing) => {
                log::debug!("review request names missing files: {missing:?}");
                (StatusCode::NOT_FOUND, Json(json!({ "missing": missing }))).into_response()
            }
            ReviewError::Internal(message) => {
                log::error!("review request failed: {message}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": message })),
                )
                    .into_response()
            }
        }
    }
}

fn invalid(message: impl Into<String>) -> ReviewError {
    ReviewError::Validation(message.into())
}

/// Parse a review body: a JSON object whose `files` field is a non-empty
/// array of strings. Order is preserved.
pub fn parse_review_request(body: &[u8]) -> Result<Vec<String>, ReviewError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| invalid(format!("Invalid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| invalid("Request body must be a JSON object"))?;
    let files = object
        .get("files")
        .ok_or_else(|| invalid("Missing required field: files"))?;
    let files = files
        .as_array()
        .ok_or_else(|| invalid("Field 'files' must be an array"))?;
    if files.is_empty() {
        return Err(invalid("Field 'files' must not be empty"));
    }

    files
        .iter()
        .enumerate()
        .map(|(index, file)| {
            file.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(format!("files[{index}] must be a string")))
        })
        .collect()
}

/// Check every path concurrently and return those that do not exist, in
/// request order. Paths that cannot be checked count as missing.
pub async fn find_missing(files: &[String]) -> Vec<String> {
    let checks = files.iter().map(|file| async move {
        let exists = tokio::fs::try_exists(file).await.unwrap_or(false);
        (file, exists)
    });
    join_all(checks)
        .await
        .into_iter()
        .filter(|(_, exists)| !exists)
        .map(|(file, _)| file.clone())
        .collect()
}

#[derive(Clone)]
struct ReviewState {
    sink: SharedSink,
}

async fn review(State(state): State<ReviewState>, body: Body) -> Result<Json<Value>, ReviewError> {
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ReviewError::Internal(format!("failed to read request body: {e}")))?;

    let files = parse_review_request(&bytes)?;

    let missing = find_missing(&files).await;
    if !missing.is_empty() {
        return Err(ReviewError::MissingFiles(missing));
    }

    log::info!("review requested for {} file(s)", files.len());
    state.sink.emit(SessionEvent::ReviewRequested { files });
    Ok(Json(json!({ "success": true })))
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

/// Unrouted requests: the method is checked before the path.
async fn fallback(method: Method) -> Response {
    if method != Method::POST {
        return method_not_allowed();
    }
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// The control-plane router. Review notifications go to `sink`.
pub fn router(sink: SharedSink) -> Router {
    Router::new()
        .route(
            "/review",
            post(review).fallback(|| async { method_not_allowed() }),
        )
        .fallback(fallback)
        .with_state(ReviewState { sink })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_message(body: &str) -> String {
        match parse_review_request(body.as_bytes()) {
            Err(ReviewError::Validation(message)) => message,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_valid_request_keeps_order() {
        let files = parse_review_request(br#"{"files": ["/b.md", "/a.md"]}"#).unwrap();
        assert_eq!(files, vec!["/b.md", "/a.md"]);
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let files = parse_review_request(br#"{"files": ["/a.md"], "note": 1}"#).unwrap();
        assert_eq!(files, vec!["/a.md"]);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(validation_message("not valid json{").starts_with("Invalid JSON"));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        assert!(validation_message(r#"{"other": "data"}"#).contains("Missing required field"));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert_eq!(
            validation_message(r#"["/a.md"]"#),
            "Request body must be a JSON object"
        );
    }

    #[test]
    fn test_parse_rejects_non_array_files() {
        assert_eq!(
            validation_message(r#"{"files": "/a.md"}"#),
            "Field 'files' must be an array"
        );
    }

    #[test]
    fn test_parse_rejects_empty_array() {
        assert_eq!(
            validation_message(r#"{"files": []}"#),
            "Field 'files' must not be empty"
        );
    }

    #[test]
    fn test_parse_names_offending_index() {
        assert_eq!(
            validation_message(r#"{"files": ["/a.md", 7, "/c.md"]}"#),
            "files[1] must be a string"
        );
    }

    #[tokio::test]
    async fn test_find_missing_returns_only_missing_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("a.md");
        std::fs::write(&present, "# a").unwrap();
        let gone_1 = dir.path().join("gone-1.md").display().to_string();
        let gone_2 = dir.path().join("gone-2.md").display().to_string();

        let files = vec![gone_1.clone(), present.display().to_string(), gone_2.clone()];
        assert_eq!(find_missing(&files).await, vec![gone_1, gone_2]);
    }
}
