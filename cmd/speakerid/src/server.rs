//! HTTP front end.
//!
//! Endpoints:
//! - GET  /  - Upload form
//! - POST /  - multipart upload (field `file`), renders the prediction

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use minijinja::{context, Environment};
use speakerid_predict::{PredictError, Prediction, Predictor};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::upload::UploadStore;

const INDEX_HTML: &str = include_str!("templates/index.html");

/// Name of the multipart field carrying the audio file.
pub const UPLOAD_FIELD: &str = "file";

/// Shared, read-only state handed to every request.
pub struct AppState {
    predictor: Arc<Predictor>,
    uploads: UploadStore,
    keep_uploads: bool,
    templates: Environment<'static>,
}

impl AppState {
    /// Creates the state and compiles the page template.
    pub fn new(
        predictor: Arc<Predictor>,
        uploads: UploadStore,
        keep_uploads: bool,
    ) -> Result<Self, minijinja::Error> {
        let mut templates = Environment::new();
        templates.add_template("index.html", INDEX_HTML)?;
        Ok(Self {
            predictor,
            uploads,
            keep_uploads,
            templates,
        })
    }

    fn render(&self, prediction: Option<&str>) -> Result<Html<String>, AppError> {
        let page = self
            .templates
            .get_template("index.html")?
            .render(context! { prediction => prediction })?;
        Ok(Html(page))
    }
}

/// Request failures that cannot be rendered as a prediction line.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error("prediction failed: {0}")]
    Predict(#[from] PredictError),

    #[error("template: {0}")]
    Template(#[from] minijinja::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Multipart(e) => e.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{self}");
        } else {
            warn!("{self}");
        }
        let page = format!(
            "<!DOCTYPE html><html><body><h1>{}</h1></body></html>",
            status
        );
        (status, Html(page)).into_response()
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index).post(predict))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves `app` until the process exits.
pub async fn serve(addr: SocketAddr, app: Router) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server started at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    state.render(None)
}

async fn predict(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Html<String>, AppError> {
    let mut stored: Option<PathBuf> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let client_name = field.file_name().map(str::to_owned);
        let data = field.bytes().await?;
        let path = state.uploads.save(client_name.as_deref(), &data).await?;
        info!(
            "upload {:?} ({} bytes) stored as {}",
            client_name.unwrap_or_default(),
            data.len(),
            path.display()
        );
        stored = Some(path);
        break;
    }
    let path = stored
        .ok_or_else(|| AppError::BadRequest(format!("missing {UPLOAD_FIELD:?} field")))?;

    let predictor = state.predictor.clone();
    let job_path = path.clone();
    let result = tokio::task::spawn_blocking(move || predictor.predict_file(&job_path))
        .await
        .map_err(|e| AppError::Internal(format!("prediction task: {e}")))?;

    if !state.keep_uploads {
        if let Err(e) = state.uploads.remove(&path).await {
            warn!("remove {}: {e}", path.display());
        }
    }

    let prediction = result?;
    match &prediction {
        Prediction::Speaker(label) => info!("predicted speaker {label}"),
        Prediction::ExtractionFailure => warn!("{}: no features extracted", path.display()),
        Prediction::DecodeFailure(reason) => warn!("{}: {reason}", path.display()),
    }
    state.render(Some(&prediction.message()))
}
