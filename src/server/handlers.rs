use super::error::ApiError;
use super::state::AppState;
use crate::config::PageSelection;
use crate::converter::RequestOptions;
use crate::error::Pdf2HtmlError;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Query, Request, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const X_CONVERTER: HeaderName = HeaderName::from_static("x-converter");
pub const X_PAGE_COUNT: HeaderName = HeaderName::from_static("x-page-count");

const NO_CACHE: [(HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
    (header::PRAGMA, "no-cache"),
];

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    version: &'static str,
    app: &'a str,
    converter: &'static str,
    workers: usize,
    uptime_secs: u64,
}

#[derive(Debug, Serialize)]
struct StartingResponse {
    status: &'static str,
}

/// `GET /health`: 200 once startup checks passed, 503 before.
pub async fn health(State(state): State<AppState>) -> Response {
    if !state.is_ready() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            NO_CACHE,
            Json(StartingResponse { status: "starting" }),
        )
            .into_response();
    }

    let body = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        app: &state.app_name,
        converter: state.converter.kind().as_str(),
        workers: state.workers,
        uptime_secs: state.uptime().as_secs(),
    };
    (NO_CACHE, Json(body)).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuery {
    pub pages: Option<String>,
}

/// An upload after body parsing.
#[derive(Debug, Default)]
struct Upload {
    pdf: Bytes,
    pages: Option<String>,
    password: Option<String>,
}

/// `POST /convert`: multipart `file` part or the raw PDF as the body.
pub async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
    request: Request,
) -> Result<Response, ApiError> {
    if !state.is_ready() {
        return Err(ApiError::unavailable("Service is starting"));
    }

    let Upload {
        pdf,
        pages,
        password,
    } = read_upload(request, &state).await?;
    if pdf.is_empty() {
        return Err(Pdf2HtmlError::EmptyInput.into());
    }

    let pages = pages
        .or(query.pages)
        .map(|p| p.parse::<PageSelection>())
        .transpose()?;
    let options = RequestOptions {
        pages,
        password,
    };

    let start = Instant::now();
    let size = pdf.len();
    let deadline = state
        .request_timeout
        .map(|limit| (limit, tokio::time::Instant::now() + limit));
    let timed_out = |limit: Duration| {
        ApiError::from(Pdf2HtmlError::Timeout {
            secs: limit.as_secs(),
        })
    };

    // Slot waiting counts toward the deadline.
    let acquire = state.slots.clone().acquire_owned();
    let permit = match deadline {
        Some((limit, at)) => tokio::time::timeout_at(at, acquire)
            .await
            .map_err(|_| timed_out(limit))?,
        None => acquire.await,
    }
    .map_err(|_| ApiError::unavailable("Service is shutting down"))?;

    // The permit lives in the task: a conversion that outlives the deadline
    // keeps its slot until it really finishes.
    let converter = state.converter.clone();
    let task = tokio::spawn(async move {
        let result = converter.convert_bytes(pdf.to_vec(), options).await;
        drop(permit);
        result
    });
    let joined = match deadline {
        Some((limit, at)) => match tokio::time::timeout_at(at, task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    timeout_secs = limit.as_secs(),
                    input_bytes = size,
                    "Conversion timed out, it keeps its slot until it finishes"
                );
                return Err(timed_out(limit));
            }
        },
        None => task.await,
    };
    let output = joined.map_err(|e| {
        ApiError::from(Pdf2HtmlError::Internal(format!(
            "conversion task failed: {e}"
        )))
    })??;

    info!(
        converter = %output.converter,
        pages = output.stats.processed_pages,
        failed_pages = output.stats.failed_pages,
        input_bytes = size,
        html_bytes = output.html.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Converted upload"
    );

    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        ),
        (
            X_CONVERTER,
            HeaderValue::from_static(output.converter.as_str()),
        ),
        (
            X_PAGE_COUNT,
            HeaderValue::from(output.stats.processed_pages),
        ),
    ];
    Ok((headers, output.html).into_response())
}

async fn read_upload(request: Request, state: &AppState) -> Result<Upload, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"));

    if !is_multipart {
        let pdf = Bytes::from_request(request, state)
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        return Ok(Upload {
            pdf,
            ..Default::default()
        });
    }

    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
    let multipart_error = |e: axum::extract::multipart::MultipartError| {
        ApiError::new(e.status(), e.body_text())
    };

    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => upload.pdf = field.bytes().await.map_err(multipart_error)?,
            "pages" => upload.pages = Some(field.text().await.map_err(multipart_error)?),
            "password" => upload.password = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }
    Ok(upload)
}
