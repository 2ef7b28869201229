use async_trait::async_trait;
use image::RgbImage;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use crate::adapters::onnx::yolo_engine::OnnxYoloEngine;
use crate::application::ports::DetectorPort;
use crate::domain::{
    detection::Detection,
    errors::{DomainError, DomainResult},
    model::{ModelId, YoloParams},
};

/// `DetectorPort` backed by an ONNX Runtime session.
///
/// The session needs exclusive access while running, so concurrent requests
/// queue on the mutex. Inference runs on the blocking pool.
pub struct OnnxDetector {
    model: ModelId,
    names: Vec<String>,
    engine: Arc<Mutex<OnnxYoloEngine>>,
}

impl OnnxDetector {
    pub fn load(model: ModelId, names: Vec<String>, intra_threads: usize) -> DomainResult<Self> {
        let engine = OnnxYoloEngine::load(&model.onnx_path, intra_threads, names.clone())
            .map_err(|e| DomainError::ModelLoad(format!("{}: {e:#}", model.onnx_path)))?;
        Ok(Self { model, names, engine: Arc::new(Mutex::new(engine)) })
    }
}

#[async_trait]
impl DetectorPort for OnnxDetector {
    fn model(&self) -> &ModelId {
        &self.model
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }

    async fn detect(&self, image: Arc<RgbImage>, params: YoloParams) -> DomainResult<Vec<Detection>> {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || {
            let mut engine = engine
                .lock()
                .map_err(|_| DomainError::OperationFailed("inference session lock poisoned".into()))?;
            let detections = engine.infer(&image, &params).map_err(|e| {
                error!("❌ inference failed: {e:#}");
                DomainError::OperationFailed(format!("inference failed: {e}"))
            })?;
            debug!(count = detections.len(), conf = params.conf_threshold, "inference done");
            Ok(detections)
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("inference task: {e}")))?
    }
}
