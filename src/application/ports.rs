use std::sync::Arc;

use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{
    detection::Detection,
    errors::DomainResult,
    model::{ModelId, YoloParams},
};

#[async_trait]
pub trait DetectorPort: Send + Sync {
    fn model(&self) -> &ModelId;
    fn class_names(&self) -> &[String];
    /// Runs the model once. Detections are in `image` pixel coordinates.
    async fn detect(&self, image: Arc<RgbImage>, params: YoloParams) -> DomainResult<Vec<Detection>>;
}

pub trait AnnotatorPort: Send + Sync {
    fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage;
    fn encode_jpeg(&self, image: &RgbImage) -> DomainResult<Vec<u8>>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
