use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{info, warn};

use platelens_core::{
    DetectionResult, EnhancementResult, ExtractionResult, ImageRef, PipelineRun, PlateLensError,
    ValidationResult,
};
use platelens_logging::redact_sensitive_data;
use platelens_pipeline::Pipeline;

/// Shared application state for API handlers.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/analyze/stream", post(analyze_stream))
        .route("/api/detect", post(detect))
        .route("/api/enhance", post(enhance))
        .route("/api/extract", post(extract))
        .route("/api/validate", post(validate))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// JSON error body `{ "error": message }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// A model call failed or returned something unusable.
    fn upstream(error: anyhow::Error) -> Self {
        let message = redact_sensitive_data(&format!("{error:#}"));
        warn!(error = %message, "Stage request failed");
        Self {
            status: StatusCode::BAD_GATEWAY,
            message,
        }
    }
}

impl From<PlateLensError> for ApiError {
    fn from(error: PlateLensError) -> Self {
        match error {
            PlateLensError::InvalidInput(_) | PlateLensError::InvalidImage(_) => {
                Self::bad_request(error.to_string())
            }
            other => Self::upstream(anyhow::Error::new(other)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBody {
    /// `data:<mime>;base64,<payload>`
    pub image: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceBody {
    pub image: String,
    #[serde(default)]
    pub is_blurry: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateBody {
    pub text: String,
}

fn accept_image(uri: &str) -> Result<ImageRef, ApiError> {
    Ok(platelens_media::accept_data_uri(uri)?)
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "platelens",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.pipeline.analyzer().provider_name(),
    }))
}

/// Run the whole pipeline and return the final snapshot.
///
/// Stage failures are part of the run (`stage: "errored"`), not HTTP errors.
async fn analyze(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ImageBody>, JsonRejection>,
) -> ApiResult<PipelineRun> {
    let Json(body) = body?;
    let image = accept_image(&body.image)?;
    let run = state.pipeline.run(Some(&image)).await;
    info!(run_id = %run.id, stage = %run.stage, "Analysis finished");
    Ok(Json(run))
}

/// Run the whole pipeline, streaming each snapshot as an SSE `run` event.
async fn analyze_stream(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ImageBody>, JsonRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let Json(body) = body?;
    let image = accept_image(&body.image)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        let run = pipeline.run_with_updates(Some(&image), Some(&tx)).await;
        info!(run_id = %run.id, stage = %run.stage, "Streamed analysis finished");
    });

    let stream = UnboundedReceiverStream::new(rx).filter_map(|run| async move {
        match Event::default().event("run").json_data(&run) {
            Ok(event) => Some(Ok(event)),
            Err(e) => {
                warn!(error = %e, "Failed to encode run snapshot");
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new()))
}

async fn detect(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ImageBody>, JsonRejection>,
) -> ApiResult<DetectionResult> {
    let Json(body) = body?;
    let image = accept_image(&body.image)?;
    let result = state
        .pipeline
        .analyzer()
        .detect(&image)
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(result))
}

async fn enhance(
    State(state): State<Arc<AppState>>,
    body: Result<Json<EnhanceBody>, JsonRejection>,
) -> ApiResult<EnhancementResult> {
    let Json(body) = body?;
    let image = accept_image(&body.image)?;
    let result = state.pipeline.analyzer().enhance(&image, body.is_blurry).await;
    Ok(Json(result))
}

async fn extract(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ImageBody>, JsonRejection>,
) -> ApiResult<ExtractionResult> {
    let Json(body) = body?;
    let image = accept_image(&body.image)?;
    let result = state
        .pipeline
        .analyzer()
        .extract(&image)
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(result))
}

async fn validate(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ValidateBody>, JsonRejection>,
) -> ApiResult<ValidationResult> {
    let Json(body) = body?;
    let result = state
        .pipeline
        .analyzer()
        .validate(&body.text)
        .await
        .map_err(ApiError::upstream)?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use platelens_core::{Capability, Stage};
    use platelens_understanding::{MockReply, MockVisionModel, PlateAnalyzer};
    use tower::ServiceExt;

    const PHOTO_URI: &str = "data:image/jpeg;base64,/9j/4AAQ";

    fn app(mock: MockVisionModel) -> Router {
        let pipeline = Pipeline::new(PlateAnalyzer::new(Arc::new(mock)));
        build_router(
            Arc::new(AppState {
                pipeline: Arc::new(pipeline),
            }),
            1024 * 1024,
        )
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_provider() {
        let response = app(MockVisionModel::new())
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"], "mock");
    }

    #[tokio::test]
    async fn analyze_returns_completed_run() {
        let response = app(MockVisionModel::new())
            .oneshot(post_json("/api/analyze", json!({ "image": PHOTO_URI })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let run = read_json(response).await;
        assert_eq!(run["stage"], "complete");
        assert_eq!(run["progress"], 100);
        assert_eq!(run["extraction"]["text"], "MH12AB1234");
        assert_eq!(run["validation"]["isValid"], true);
        // No crop came back, so the original photo is the plate image.
        assert_eq!(run["detection"]["plateImage"], PHOTO_URI);
    }

    #[tokio::test]
    async fn stage_failure_is_reported_inside_the_run() {
        let mock = MockVisionModel::new().on(Capability::ExtractText, MockReply::fail("quota exhausted"));
        let response = app(mock)
            .oneshot(post_json("/api/analyze", json!({ "image": PHOTO_URI })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let run: PipelineRun = serde_json::from_value(read_json(response).await).unwrap();
        assert_eq!(run.stage, Stage::Errored);
        assert!(run.detection.is_some());
        assert!(run.error.unwrap().summary.starts_with("Failed at step: Extracting text..."));
    }

    #[tokio::test]
    async fn non_image_upload_is_bad_request() {
        let response = app(MockVisionModel::new())
            .oneshot(post_json(
                "/api/analyze",
                json!({ "image": "data:text/plain;base64,aGVsbG8=" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"], platelens_media::INVALID_FILE_TYPE);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request_with_error_field() {
        let response = app(MockVisionModel::new())
            .oneshot(post_json("/api/detect", json!({ "picture": PHOTO_URI })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn enhance_without_blur_flag_passes_through() {
        let mock = Arc::new(MockVisionModel::new());
        let pipeline = Pipeline::new(PlateAnalyzer::new(mock.clone()));
        let app = build_router(
            Arc::new(AppState {
                pipeline: Arc::new(pipeline),
            }),
            1024 * 1024,
        );
        let response = app
            .oneshot(post_json("/api/enhance", json!({ "image": PHOTO_URI })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["processedImage"], PHOTO_URI);
        assert_eq!(mock.calls_for(Capability::EnhancePlate), 0);
    }

    #[tokio::test]
    async fn extract_failure_is_bad_gateway() {
        let mock = MockVisionModel::new().on(Capability::ExtractText, MockReply::text("not json"));
        let response = app(mock)
            .oneshot(post_json("/api/extract", json!({ "image": PHOTO_URI })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn validate_endpoint_returns_verdict() {
        let mock = MockVisionModel::new().on(
            Capability::ValidateFormat,
            MockReply::json(json!({ "isValidFormat": false, "validationMessage": "Missing RTO code." })),
        );
        let response = app(mock)
            .oneshot(post_json("/api/validate", json!({ "text": "MH AB 1234" })))
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["isValid"], false);
        assert_eq!(body["message"], "Missing RTO code.");
    }

    #[tokio::test]
    async fn stream_emits_run_events_until_complete() {
        let response = app(MockVisionModel::new())
            .oneshot(post_json("/api/analyze/stream", json!({ "image": PHOTO_URI })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let stages: Vec<String> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(|data| serde_json::from_str::<Value>(data).unwrap()["stage"].to_string())
            .collect();
        assert!(text.contains("event: run"));
        assert_eq!(stages.first().map(String::as_str), Some("\"idle\""));
        assert_eq!(stages.last().map(String::as_str), Some("\"complete\""));
    }
}
