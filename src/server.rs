//! HTTP surface: the page, the state endpoint, and the two actions.
//!
//! Every action responds with the full [`StateView`], on success and on
//! failure, so the page can show a retained analysis under a new error.

use crate::controller::{StateView, ViewController};
use crate::error::LeafError;
use crate::page;
use crate::validate::{ImageSource, UploadedImage, MAX_UPLOAD_BYTES};
use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Room for multipart framing on top of the largest accepted file. Uploads
/// past [`MAX_UPLOAD_BYTES`] are cut off by the intake loop before reaching
/// this, so the validator reports them.
const BODY_LIMIT: usize = MAX_UPLOAD_BYTES as usize + 4 * 1024 * 1024;

pub struct AppState {
    pub controller: ViewController,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/api/state", get(get_state))
        .route("/api/upload", post(upload_image))
        .route("/api/reanalyze", post(reanalyze))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateView> {
    Json(state.controller.view())
}

async fn upload_image(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let outcome = match read_upload(multipart).await {
        Ok(file) => {
            let task_state = state.clone();
            run_to_completion(async move { task_state.controller.select(file).await }).await
        }
        Err(e) => Err(state.controller.reject(e)),
    };
    respond(&state, outcome)
}

async fn reanalyze(State(state): State<Arc<AppState>>) -> Response {
    let task_state = state.clone();
    let outcome = run_to_completion(async move { task_state.controller.reanalyze().await }).await;
    respond(&state, outcome)
}

/// Run a transition on its own task so a dropped request cannot abandon it.
/// If the task dies anyway, the controller has already left `Loading`.
async fn run_to_completion<F>(transition: F) -> Result<(), LeafError>
where
    F: Future<Output = Result<(), LeafError>> + Send + 'static,
{
    match tokio::spawn(transition).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Transition task failed: {}", e);
            Err(LeafError::Interrupted)
        }
    }
}

fn respond(state: &AppState, outcome: Result<(), LeafError>) -> Response {
    let status = match &outcome {
        Ok(()) => StatusCode::OK,
        Err(e) => status_for(e),
    };
    (status, Json(state.controller.view())).into_response()
}

pub fn status_for(e: &LeafError) -> StatusCode {
    match e {
        LeafError::InvalidType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        LeafError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        LeafError::ReadFailure { .. } | LeafError::NoImage => StatusCode::BAD_REQUEST,
        LeafError::Busy => StatusCode::CONFLICT,
        LeafError::Analysis(_) => StatusCode::BAD_GATEWAY,
        LeafError::Bootstrap { .. } | LeafError::Interrupted => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Pull the first file out of the form.
///
/// Buffering stops once the running length passes [`MAX_UPLOAD_BYTES`]; the
/// returned length still exceeds the limit so validation rejects it as too
/// large instead of the read failing.
async fn read_upload(mut multipart: Multipart) -> Result<UploadedImage, LeafError> {
    while let Some(mut field) = multipart.next_field().await.map_err(read_failure)? {
        if field.file_name().is_none() && field.name() != Some("image") {
            continue;
        }

        let media_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let mut buf = Vec::new();
        let mut len: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(read_failure)? {
            len += chunk.len() as u64;
            if len > MAX_UPLOAD_BYTES {
                break;
            }
            buf.extend_from_slice(&chunk);
        }

        return Ok(UploadedImage {
            media_type,
            len,
            source: ImageSource::Memory(Bytes::from(buf)),
        });
    }

    Err(LeafError::ReadFailure {
        detail: "request contained no file".into(),
    })
}

fn read_failure(e: MultipartError) -> LeafError {
    LeafError::ReadFailure {
        detail: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisError;

    #[test]
    fn every_error_maps_to_a_client_or_gateway_status() {
        let cases = [
            (
                LeafError::InvalidType {
                    media_type: "text/plain".into(),
                },
                415,
            ),
            (LeafError::TooLarge { size: 1, limit: 0 }, 413),
            (LeafError::ReadFailure { detail: String::new() }, 400),
            (LeafError::NoImage, 400),
            (LeafError::Busy, 409),
            (LeafError::Analysis(AnalysisError::Unavailable), 502),
            (LeafError::Bootstrap { detail: String::new() }, 500),
            (LeafError::Interrupted, 500),
        ];
        for (e, code) in cases {
            assert_eq!(status_for(&e).as_u16(), code, "{e:?}");
        }
    }
}
