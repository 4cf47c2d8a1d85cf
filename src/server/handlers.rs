use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{info, warn};

use crate::data;
use crate::font::FontBook;
use crate::settings::Settings;
use crate::upload::sign::{SignOptions, SignedUpload};
use crate::upload::{self, AssetHostUpload, UploadReceipt, UploadRequest};

use super::error::ServerError;
use super::models::{RenderRequest, RenderResponse, SignUploadQuery, UploadPayload};
use super::page::render_single_quote_page;
use super::render::{NO_IMAGE_DATA, render_request};
use super::state::ServerState;

/// Data URLs of full-size photos are well past axum's 2 MB default.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

pub async fn run_server(settings: Settings, addr: String) -> Result<()> {
    let fonts = Arc::new(FontBook::new(settings.fonts_dir.as_deref()));
    let state = Arc::new(build_state(settings, fonts)?);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    info!("listening on {}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub(crate) fn build_state(settings: Settings, fonts: Arc<FontBook>) -> Result<ServerState> {
    let uploader = upload::build_upload_service(&settings)?;
    let signer = match AssetHostUpload::from_settings(&settings.asset_host) {
        Ok(signer) => Some(signer),
        Err(err) => {
            warn!("upload signing disabled: {}", err);
            None
        }
    };
    Ok(ServerState {
        settings,
        uploader,
        signer,
        fonts,
    })
}

pub(crate) fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/sign-upload", get(sign_upload))
        .route("/api/upload", post(upload_image))
        .route("/api/render", post(render))
        .route("/uploaded/:bucket/:file", get(uploaded_file))
        .route("/single-quote/:bucket/:image", get(single_quote))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

async fn sign_upload(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SignUploadQuery>,
) -> Result<Json<SignedUpload>, ServerError> {
    let signer = state
        .signer
        .as_ref()
        .ok_or_else(|| ServerError::internal("asset host credentials are not configured"))?;
    let signed = signer.sign(SignOptions {
        context: query.context,
        public_id: query.public_id,
        exif: query.exif,
        image_metadata: query.image_metadata,
    })?;
    Ok(Json(signed))
}

async fn upload_image(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<UploadPayload>,
) -> Result<Json<UploadReceipt>, ServerError> {
    let Some(image_data) = payload
        .image_data
        .filter(|value| !value.trim().is_empty())
    else {
        return Err(ServerError::bad_request(NO_IMAGE_DATA));
    };
    let image = data::parse_data_url(&image_data)
        .map_err(|err| ServerError::bad_request(err.to_string()))?;
    let receipt = state
        .uploader
        .upload(UploadRequest {
            bytes: image.bytes,
            mime: image.mime,
            quote: payload.quote,
        })
        .await?;
    Ok(Json(receipt))
}

async fn render(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, ServerError> {
    let response = render_request(state.as_ref(), payload).await?;
    Ok(Json(response))
}

async fn uploaded_file(
    State(state): State<Arc<ServerState>>,
    Path((bucket, file)): Path<(String, String)>,
) -> Result<Response<Body>, ServerError> {
    let path = state
        .uploader
        .local_path(&bucket, &file)
        .filter(|path| path.is_file())
        .ok_or_else(|| ServerError::not_found("upload not found"))?;
    let image = tokio::task::spawn_blocking(move || data::load_image(&path))
        .await
        .map_err(|err| ServerError::internal(format!("read task failed: {}", err)))??;
    Ok(([(header::CONTENT_TYPE, image.mime)], image.bytes).into_response())
}

async fn single_quote(
    State(state): State<Arc<ServerState>>,
    Path((bucket, image)): Path<(String, String)>,
) -> Result<Html<String>, ServerError> {
    if !upload::is_safe_segment(&bucket) || !upload::is_safe_segment(&image) {
        return Err(ServerError::bad_request("invalid quote path"));
    }
    let image_url = state.uploader.public_url(&bucket, &image);
    Ok(Html(render_single_quote_page(&image_url, &bucket, &image)?))
}
