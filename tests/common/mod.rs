use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder, Rgb, RgbImage};

use mri_tumor_detector::{
    adapters::{
        http::{router, state::HttpState},
        render::annotator::ImageprocAnnotator,
    },
    application::{ports::DetectorPort, services::AnalysisService},
    config::{AppConfig, RenderConfig},
    domain::{
        detection::Detection,
        errors::DomainResult,
        model::{ModelId, YoloParams},
    },
};

pub const BOUNDARY: &str = "----mri-test-boundary";

/// Returns the same raw candidates for every image, ignoring the threshold.
pub struct StubDetector {
    pub model: ModelId,
    pub names: Vec<String>,
    pub candidates: Vec<Detection>,
}

#[async_trait]
impl DetectorPort for StubDetector {
    fn model(&self) -> &ModelId {
        &self.model
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }

    async fn detect(&self, _image: Arc<RgbImage>, _params: YoloParams) -> DomainResult<Vec<Detection>> {
        Ok(self.candidates.clone())
    }
}

pub fn det(label: &str, class_id: usize, score: f32, x1: f32, y1: f32) -> Detection {
    Detection { x1, y1, x2: x1 + 12.0, y2: y1 + 12.0, score, class_id, label: label.into() }
}

pub fn candidates() -> Vec<Detection> {
    vec![
        det("glioma", 0, 0.91, 4.0, 4.0),
        det("pituitary", 2, 0.55, 30.0, 30.0),
        det("glioma", 0, 0.40, 40.0, 5.0),
        det("meningioma", 1, 0.12, 10.0, 40.0),
    ]
}

pub fn app_with(candidates: Vec<Detection>) -> Router {
    let config = AppConfig::default();
    let detector = StubDetector {
        model: ModelId { name: "stub".into(), onnx_path: "stub.onnx".into() },
        names: config.model.class_names.clone(),
        candidates,
    };
    let annotator = ImageprocAnnotator::with_font(&RenderConfig::default(), None);
    let analysis = AnalysisService::new(Arc::new(detector), Arc::new(annotator), config.yolo_params());
    let state = HttpState { analysis: Arc::new(analysis), ui: Arc::new(config.ui.clone()) };
    router(state, config.max_upload_bytes)
}

pub fn app() -> Router {
    app_with(candidates())
}

pub fn png(w: u32, h: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), w, h, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
