//! Request handlers for the conversion API.

use std::path::Path;

use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::error::ConvertError;
use crate::model::ParsedMessage;
use crate::{parser, render};

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
pub(super) struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Maps a conversion failure onto an API response. Malformed input is the
/// client's fault; everything else is ours.
fn conversion_error(err: ConvertError) -> ApiError {
    tracing::error!("conversion failed: {err}");
    match err {
        ConvertError::Parse(_) => bad_request(err.to_string()),
        _ => internal_error(err.to_string()),
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    let status = err.status();
    (
        status,
        Json(ErrorBody {
            error: err.body_text(),
        }),
    )
}

/// GET `/`: the embedded upload page.
pub(super) async fn index() -> Html<&'static str> {
    Html(include_str!("../../assets/index.html"))
}

/// GET `/health`
pub(super) async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST `/api/parse-eml`: returns the parsed message as JSON.
pub(super) async fn parse_eml(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ParsedMessage>, ApiError> {
    let upload = read_upload(multipart).await?;
    tracing::info!(
        "parsing upload '{}' ({} bytes)",
        upload.filename,
        upload.data.len()
    );

    let parsed = tokio::task::spawn_blocking(move || -> crate::error::Result<ParsedMessage> {
        let workdir = scratch_dir(state.upload_dir.as_deref())?;
        let eml_path = workdir.path().join("upload.eml");
        std::fs::write(&eml_path, &upload.data).map_err(|e| ConvertError::io(&eml_path, e))?;
        parser::parse_file(&eml_path)
    })
    .await
    .map_err(|e| internal_error(format!("conversion task failed: {e}")))?
    .map_err(conversion_error)?;

    Ok(Json(parsed))
}

/// POST `/api/convert-to-pdf`: streams back the rendered document.
pub(super) async fn convert_to_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let upload = read_upload(multipart).await?;
    tracing::info!(
        "converting upload '{}' ({} bytes)",
        upload.filename,
        upload.data.len()
    );

    let pdf_name = pdf_filename(&upload.filename);
    let pdf_bytes = tokio::task::spawn_blocking(move || -> crate::error::Result<Vec<u8>> {
        let workdir = scratch_dir(state.upload_dir.as_deref())?;
        let eml_path = workdir.path().join("upload.eml");
        std::fs::write(&eml_path, &upload.data).map_err(|e| ConvertError::io(&eml_path, e))?;
        let parsed = parser::parse_file(&eml_path)?;
        let pdf_path = workdir.path().join("output.pdf");
        render::render_pdf_file(&parsed, &pdf_path)?;
        std::fs::read(&pdf_path).map_err(|e| ConvertError::io(&pdf_path, e))
    })
    .await
    .map_err(|e| internal_error(format!("conversion task failed: {e}")))?
    .map_err(conversion_error)?;

    tracing::info!("produced '{}' ({} bytes)", pdf_name, pdf_bytes.len());
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{pdf_name}\""),
        ),
    ];
    Ok((headers, pdf_bytes))
}

struct Upload {
    filename: String,
    data: Bytes,
}

/// Pulls the `file` field out of the multipart form and validates it.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(bad_request("no file selected"));
        }
        if !filename.to_lowercase().ends_with(".eml") {
            return Err(bad_request("the uploaded file must be a .eml message"));
        }
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            return Err(bad_request("the uploaded file is empty"));
        }
        return Ok(Upload { filename, data });
    }
    Err(bad_request("no file field in the upload"))
}

/// Per-request scratch directory, removed when the handle drops.
fn scratch_dir(base: Option<&Path>) -> crate::error::Result<tempfile::TempDir> {
    let parent = base
        .map(Path::to_path_buf)
        .unwrap_or_else(std::env::temp_dir);
    std::fs::create_dir_all(&parent).map_err(|e| ConvertError::io(&parent, e))?;
    tempfile::Builder::new()
        .prefix("eml2pdf-")
        .tempdir_in(&parent)
        .map_err(|e| ConvertError::io(&parent, e))
}

/// Derives the download filename: upload stem plus `.pdf`, restricted to
/// characters that are safe inside a quoted Content-Disposition value.
fn pdf_filename(upload_name: &str) -> String {
    let bare = upload_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(upload_name);
    let cut = bare.len().saturating_sub(4);
    let stem = if bare.is_char_boundary(cut) && bare[cut..].eq_ignore_ascii_case(".eml") {
        &bare[..cut]
    } else {
        bare
    };
    let safe: String = stem
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | '\\'))
        .collect();
    let safe = safe.trim();
    if safe.is_empty() {
        "converted.pdf".to_string()
    } else {
        format!("{safe}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Test 1: download name swaps the extension ───
    #[test]
    fn test_pdf_filename_basic() {
        assert_eq!(pdf_filename("saluti.eml"), "saluti.pdf");
        assert_eq!(pdf_filename("Deposito Atti.EML"), "Deposito Atti.pdf");
    }

    // ─── Test 2: path components and header-hostile characters drop out ───
    #[test]
    fn test_pdf_filename_sanitized() {
        assert_eq!(pdf_filename("a\"b.eml"), "ab.pdf");
        assert_eq!(pdf_filename("dir/posta.eml"), "posta.pdf");
        assert_eq!(pdf_filename("C:\\mail\\posta.eml"), "posta.pdf");
    }

    // ─── Test 3: unusable names fall back to a fixed one ───
    #[test]
    fn test_pdf_filename_fallback() {
        assert_eq!(pdf_filename(".eml"), "converted.pdf");
        assert_eq!(pdf_filename("\u{7}\u{8}.eml"), "converted.pdf");
    }
}
