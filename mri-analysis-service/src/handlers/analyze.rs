use crate::models::AnalyzeResponse;
use crate::services::imaging;
use crate::startup::AppState;
use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        State,
    },
    http::StatusCode,
    Json,
};
use image::RgbImage;
use service_core::error::AppError;

/// Multipart part carrying the image.
const FILE_FIELD: &str = "file";
/// Optional text part with free-form patient history.
const HISTORY_FIELD: &str = "patient_history";

struct Upload {
    file_name: String,
    content_type: String,
    bytes: Bytes,
    patient_history: Option<String>,
}

pub async fn analyze_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let multipart = multipart.map_err(|rejection| {
        AppError::BadRequest(anyhow::anyhow!(rejection.body_text()))
    })?;
    let upload = read_upload(multipart).await?;

    tracing::info!(
        file_name = %upload.file_name,
        content_type = %upload.content_type,
        size = upload.bytes.len(),
        with_history = upload.patient_history.is_some(),
        "MRI upload received"
    );

    let bytes = upload.bytes;
    let (image_base64, rgb) = tokio::task::spawn_blocking(move || prepare_image(&bytes))
        .await
        .map_err(anyhow::Error::from)
        .and_then(|prepared| prepared)
        .context("Analysis failed")?;

    let analysis = state
        .analyzer
        .analyze(&rgb, upload.patient_history.as_deref())
        .await;

    Ok(Json(AnalyzeResponse {
        success: true,
        image_base64,
        analysis,
    }))
}

/// Decode the upload, returning the original re-encoded as base64 PNG and an
/// RGB8 copy for the model.
fn prepare_image(bytes: &[u8]) -> anyhow::Result<(String, RgbImage)> {
    let image = imaging::decode(bytes).context("Failed to decode image")?;
    let rgb = imaging::normalize_rgb(&image).into_owned();
    let encoded = imaging::encode_png_base64(&image).context("Failed to encode image")?;
    Ok((encoded, rgb))
}

/// Collect the image part and optional history; rejects a non-image media
/// type before the image body is read.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut file: Option<(String, String, Bytes)> = None;
    let mut patient_history = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);

        match name.as_deref() {
            Some(HISTORY_FIELD) => {
                let text = field.text().await.map_err(multipart_error)?;
                patient_history = Some(text).filter(|t| !t.trim().is_empty());
            }
            Some(FILE_FIELD) if file.is_none() => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                if !content_type.starts_with("image/") {
                    tracing::warn!(content_type = %content_type, "Rejected non-image upload");
                    return Err(AppError::BadRequest(anyhow::anyhow!("File must be an image")));
                }

                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes));
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring multipart field");
            }
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

    Ok(Upload {
        file_name,
        content_type,
        bytes,
        patient_history,
    })
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(anyhow::anyhow!(
            "Failed to read multipart body: {}",
            err.body_text()
        ))
    }
}
