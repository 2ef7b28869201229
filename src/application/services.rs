use std::sync::Arc;
use std::time::Instant;

use image::{ImageFormat, RgbImage};
use tracing::{debug, info, warn};

use crate::{
    application::ports::{AnnotatorPort, DetectorPort},
    domain::{
        detection::filter_by_confidence,
        errors::{DomainError, DomainResult},
        model::{ConfidenceThreshold, ModelId, YoloParams},
        report::{collect_findings, summarize_detections, AnalysisReport},
    },
};

/// Raw uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub annotated_jpeg: Vec<u8>,
}

/// Decodes an uploaded JPEG or PNG into RGB. Other formats are rejected.
pub fn decode_upload(bytes: &[u8]) -> DomainResult<RgbImage> {
    if bytes.is_empty() {
        return Err(DomainError::InvalidInput("empty upload".into()));
    }
    let format = image::guess_format(bytes)
        .map_err(|_| DomainError::Decode("unrecognized image data".into()))?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Png => {}
        other => {
            return Err(DomainError::UnsupportedFormat(format!(
                "{other:?}, only JPEG and PNG are accepted"
            )))
        }
    }
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| DomainError::Decode(e.to_string()))?;
    Ok(img.to_rgb8())
}

/// Orquestador del análisis: decodificar, detectar y anotar, una imagen cada vez.
#[derive(Clone)]
pub struct AnalysisService {
    detector: Arc<dyn DetectorPort>,
    annotator: Arc<dyn AnnotatorPort>,
    params: YoloParams,
}

impl AnalysisService {
    pub fn new(detector: Arc<dyn DetectorPort>, annotator: Arc<dyn AnnotatorPort>, params: YoloParams) -> Self {
        Self { detector, annotator, params }
    }

    pub fn model(&self) -> &ModelId {
        self.detector.model()
    }

    pub fn class_names(&self) -> &[String] {
        self.detector.class_names()
    }

    pub async fn analyze(&self, upload: Upload, threshold: ConfidenceThreshold) -> DomainResult<AnalysisOutcome> {
        let Upload { file_name, bytes } = upload;

        let image = tokio::task::spawn_blocking(move || decode_upload(&bytes))
            .await
            .map_err(|e| DomainError::OperationFailed(format!("decode task: {e}")))??;
        let image = Arc::new(image);
        let (width, height) = image.dimensions();
        debug!(%file_name, width, height, "image decoded");

        let params = self.params.with_threshold(threshold);
        let t_infer = Instant::now();
        let detections = self.detector.detect(image.clone(), params).await?;
        let infer_ms = t_infer.elapsed().as_secs_f32() * 1000.0;

        // score >= umbral, sea cual sea el adaptador
        let detections = filter_by_confidence(detections, threshold.value());

        let annotator = self.annotator.clone();
        let to_draw = detections.clone();
        let annotated_jpeg = tokio::task::spawn_blocking(move || {
            let annotated = annotator.annotate(&image, &to_draw);
            annotator.encode_jpeg(&annotated)
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("annotate task: {e}")))??;

        let findings = collect_findings(&detections);
        let summary = summarize_detections(&detections);
        info!(
            %file_name,
            threshold = threshold.value(),
            detections = detections.len(),
            infer_ms,
            "analysis finished: {}",
            if summary.is_empty() { "no tumor detected" } else { summary.as_str() }
        );

        Ok(AnalysisOutcome {
            report: AnalysisReport {
                file_name,
                width,
                height,
                threshold: threshold.value(),
                infer_ms,
                detections,
                findings,
                summary,
            },
            annotated_jpeg,
        })
    }

    /// Analiza cada fichero en orden. Un fichero que falla no detiene a los demás.
    pub async fn analyze_batch(
        &self,
        uploads: Vec<Upload>,
        threshold: ConfidenceThreshold,
    ) -> Vec<(String, DomainResult<AnalysisOutcome>)> {
        let mut out = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let name = upload.file_name.clone();
            let result = self.analyze(upload, threshold).await;
            if let Err(e) = &result {
                warn!(file_name = %name, "analysis failed: {e}");
            }
            out.push((name, result));
        }
        out
    }
}
