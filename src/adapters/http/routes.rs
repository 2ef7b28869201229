use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, HeaderValue},
    response::IntoResponse,
    Json,
};
use chrono::Local;
use tracing::debug;

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{
    download_name, ConfigResponse, DetectResponse, HealthResponse, ThresholdSlider, TumorsResponse,
};
use crate::application::services::Upload;
use crate::domain::errors::DomainError;
use crate::domain::model::ConfidenceThreshold;

const FILE_FIELDS: [&str; 3] = ["file", "files", "file[]"];
const THRESHOLD_FIELD: &str = "threshold";
const DETECTION_COUNT: HeaderName = HeaderName::from_static("x-detection-count");

struct UploadForm {
    uploads: Vec<Upload>,
    threshold: ConfidenceThreshold,
}

async fn read_form(st: &HttpState, mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut uploads = Vec::new();
    let mut threshold = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == THRESHOLD_FIELD {
            let text = field.text().await?;
            let value: f32 = text
                .trim()
                .parse()
                .map_err(|_| DomainError::InvalidInput(format!("threshold is not a number: {text:?}")))?;
            threshold = Some(ConfidenceThreshold::new(value)?);
        } else if FILE_FIELDS.contains(&name.as_str()) {
            let file_name = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("upload-{}", uploads.len() + 1));
            let bytes = field.bytes().await?.to_vec();
            debug!(%file_name, size = bytes.len(), "received upload");
            uploads.push(Upload { file_name, bytes });
        } else {
            debug!(field = %name, "ignoring unknown form field");
        }
    }

    if uploads.is_empty() {
        return Err(DomainError::InvalidInput("no image uploaded, send it in a `file` field".into()).into());
    }
    let threshold = match threshold {
        Some(t) => t,
        None => ConfidenceThreshold::new(st.ui.default_threshold)?,
    };
    Ok(UploadForm { uploads, threshold })
}

pub async fn get_config(State(st): State<HttpState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        model: st.analysis.model().name.clone(),
        threshold: ThresholdSlider {
            min: st.ui.min_threshold,
            max: st.ui.max_threshold,
            default: st.ui.default_threshold,
            step: st.ui.step,
        },
        accepted_formats: vec!["jpg".into(), "jpeg".into(), "png".into()],
        class_names: st.analysis.class_names().to_vec(),
    })
}

pub async fn list_tumors() -> Json<TumorsResponse> {
    Json(TumorsResponse::default())
}

pub async fn health(State(st): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse { ok: true, model: st.analysis.model().name.clone() })
}

/// Analyzes every uploaded file; per-file failures are reported inline.
pub async fn detect(State(st): State<HttpState>, multipart: Multipart) -> Result<Json<DetectResponse>, ApiError> {
    let form = read_form(&st, multipart).await?;
    let results = st.analysis.analyze_batch(form.uploads, form.threshold).await;
    Ok(Json(DetectResponse::from_results(results, Local::now())))
}

/// Returns the annotated JPEG of the first uploaded file as a download.
pub async fn annotate(State(st): State<HttpState>, multipart: Multipart) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(&st, multipart).await?;
    let Some(upload) = form.uploads.into_iter().next() else {
        return Err(DomainError::InvalidInput("no image uploaded".into()).into());
    };
    let outcome = st.analysis.analyze(upload, form.threshold).await?;

    let disposition = format!("attachment; filename=\"{}\"", download_name(Local::now()));
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| DomainError::OperationFailed(format!("content-disposition: {e}")))?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
        (header::CONTENT_DISPOSITION, disposition),
        (DETECTION_COUNT, HeaderValue::from(outcome.report.detections.len())),
    ];
    Ok((headers, outcome.annotated_jpeg))
}
