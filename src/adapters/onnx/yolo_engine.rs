use anyhow::{anyhow, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{info, warn};

use crate::domain::detection::{non_max_suppression, Detection};
use crate::domain::model::YoloParams;

/// Letterbox padding value, as in the Ultralytics exporters.
const PAD_VALUE: f32 = 144.0 / 255.0;
/// Rows 0..4 of the output head hold `cx, cy, w, h`.
const CXYWH_OFFSET: usize = 4;

pub struct OnnxYoloEngine {
    session: Session,
    names: Vec<String>,
    warned_class_count: bool,
}

impl OnnxYoloEngine {
    pub fn load(path: &str, intra_threads: usize, names: Vec<String>) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(intra_threads.max(1))?;

        // CUDA is optional: registered when available, CPU otherwise.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let session = builder.commit_from_file(path)?;
        info!(path, classes = names.len(), "✅ YOLO session ready");

        Ok(Self { session, names, warned_class_count: false })
    }

    pub fn infer(&mut self, rgb: &RgbImage, params: &YoloParams) -> Result<Vec<Detection>> {
        let (input, ratio) = letterbox(rgb, params.input_size);

        let input_tensor = Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 || dims[0] != 1 {
            return Err(anyhow!("unexpected YOLO output shape {:?}, expected [1, 4 + nc, N]", dims));
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        let nc = dims[1].saturating_sub(CXYWH_OFFSET);
        if nc != self.names.len() && !self.warned_class_count {
            warn!(
                model_classes = nc,
                configured_names = self.names.len(),
                "class count mismatch, unnamed classes are labelled class_<id>"
            );
            self.warned_class_count = true;
        }

        Ok(decode_predictions(view, ratio, rgb.dimensions(), params, &self.names))
    }
}

/// Resizes keeping aspect ratio into a square `size × size` NCHW tensor, image at the top-left.
/// Returns the tensor and the scale factor applied to the image.
pub fn letterbox(rgb: &RgbImage, size: u32) -> (Array4<f32>, f32) {
    let (w0, h0) = rgb.dimensions();
    let ratio = (size as f32 / w0 as f32).min(size as f32 / h0 as f32);
    let w = ((w0 as f32 * ratio).round() as u32).clamp(1, size);
    let h = ((h0 as f32 * ratio).round() as u32).clamp(1, size);
    let resized = image::imageops::resize(rgb, w, h, FilterType::Triangle);

    let sz = size as usize;
    let mut input = Array4::<f32>::from_elem((1, 3, sz, sz), PAD_VALUE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        input[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }
    (input, ratio)
}

/// Turns a `[4 + nc, N]` YOLOv8 head into detections in original-image coordinates.
pub fn decode_predictions(
    preds: ArrayView2<f32>,
    ratio: f32,
    (w0, h0): (u32, u32),
    params: &YoloParams,
    names: &[String],
) -> Vec<Detection> {
    if preds.shape()[0] <= CXYWH_OFFSET || ratio <= 0.0 {
        return Vec::new();
    }
    let (w0, h0) = (w0 as f32, h0 as f32);

    let mut candidates = Vec::new();
    for pred in preds.axis_iter(Axis(1)) {
        let best = pred
            .slice(s![CXYWH_OFFSET..])
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1));
        let Some((class_id, score)) = best else { continue };
        if score < params.conf_threshold {
            continue;
        }

        let cx = pred[0] / ratio;
        let cy = pred[1] / ratio;
        let w = pred[2] / ratio;
        let h = pred[3] / ratio;

        candidates.push(Detection {
            x1: (cx - w / 2.0).clamp(0.0, w0),
            y1: (cy - h / 2.0).clamp(0.0, h0),
            x2: (cx + w / 2.0).clamp(0.0, w0),
            y2: (cy + h / 2.0).clamp(0.0, h0),
            score,
            class_id,
            label: label_for(class_id, names),
        });
    }

    let mut kept = non_max_suppression(candidates, params.iou_threshold);
    kept.truncate(params.max_detections);
    kept
}

fn label_for(class_id: usize, names: &[String]) -> String {
    names.get(class_id).cloned().unwrap_or_else(|| format!("class_{class_id}"))
}
