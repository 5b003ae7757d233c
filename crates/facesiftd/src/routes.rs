//! HTTP interface of the facesift daemon.
//!
//! | route | purpose |
//! |-------|---------|
//! | `GET /face_search` | upload form |
//! | `POST /face_search` | search with multipart field `face_image` |
//! | `GET /load_photos` | list the photo collection |
//! | `GET /download/{filename}` | photo as an attachment |
//! | `GET /static/photos/{filename}` | photo inline (`view_url` target) |
//! | `GET /status` | daemon status |

use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header::{self, HeaderValue};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use facesift_core::{MatchResult, PhotoRecord};
use facesift_photos::formats;
use serde::Serialize;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::engine::{Engine, SearchOutcome};
use crate::error::ApiError;

const UPLOAD_FIELD: &str = "face_image";
const NO_FACE_MESSAGE: &str = "No face detected";

const SEARCH_FORM: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Face search</title></head>
<body>
<h1>Face search</h1>
<form method="post" action="/face_search" enctype="multipart/form-data">
  <input type="file" name="face_image" accept="image/*" required>
  <button type="submit">Search</button>
</form>
</body>
</html>
"#;

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<Vec<MatchResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PhotoListResponse {
    photos: Vec<PhotoRecord>,
    count: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    version: &'static str,
    photo_dir: String,
    photo_count: usize,
    distance_threshold: f32,
    model_version: Option<String>,
}

pub fn router(engine: Engine, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/face_search", get(search_form).post(face_search))
        .route("/load_photos", get(load_photos))
        .route("/download/{filename}", get(download))
        .route("/static/photos/{filename}", get(view))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

async fn search_form() -> Html<&'static str> {
    Html(SEARCH_FORM)
}

async fn face_search(
    State(engine): State<Engine>,
    mut multipart: Multipart,
) -> Result<Json<SearchResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let upload = upload.ok_or_else(|| ApiError::BadRequest(format!("missing `{UPLOAD_FIELD}` file")))?;
    tracing::info!(bytes = upload.len(), "face search requested");

    let response = match engine.search(upload.to_vec()).await? {
        SearchOutcome::NoFace => SearchResponse {
            error: Some(NO_FACE_MESSAGE.to_string()),
            results: None,
            count: None,
        },
        SearchOutcome::Matches(results) => SearchResponse {
            error: None,
            count: Some(results.len()),
            results: Some(results),
        },
    };
    Ok(Json(response))
}

async fn load_photos(State(engine): State<Engine>) -> Result<Json<PhotoListResponse>, ApiError> {
    let photos = engine.list_photos().await?;
    Ok(Json(PhotoListResponse {
        count: photos.len(),
        photos,
    }))
}

async fn download(
    State(engine): State<Engine>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = engine.read_photo(filename.clone()).await?;
    tracing::debug!(filename = %filename, bytes = bytes.len(), "download");
    Ok(photo_response(&filename, bytes, Some(attachment(&filename))))
}

async fn view(
    State(engine): State<Engine>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = engine.read_photo(filename.clone()).await?;
    Ok(photo_response(&filename, bytes, None))
}

async fn status(State(engine): State<Engine>) -> Result<Json<StatusResponse>, ApiError> {
    let photo_count = engine.list_photos().await?.len();
    let status = engine.status();
    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        photo_dir: status.photo_dir.display().to_string(),
        photo_count,
        distance_threshold: status.distance_threshold,
        model_version: status.model_version,
    }))
}

fn photo_response(filename: &str, bytes: Vec<u8>, disposition: Option<HeaderValue>) -> Response {
    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static(formats::content_type(filename)))],
        bytes,
    )
        .into_response();
    if let Some(disposition) = disposition {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
    }
    response
}

/// `Content-Disposition: attachment` with an ASCII fallback name and the
/// exact UTF-8 name in `filename*` (RFC 6266).
fn attachment(filename: &str) -> HeaderValue {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(filename.len());
    for byte in filename.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }

    HeaderValue::from_str(&format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
