use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{info, warn};

use crate::application::ports::AnnotatorPort;
use crate::config::{RenderConfig, MAX_BORDER_WIDTH};
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};

/// Gap between the top of a box and the bottom of its label.
const LABEL_GAP: i32 = 10;

pub fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path).with_context(|| format!("cannot read font {}", path.display()))?;
    FontVec::try_from_vec(data).with_context(|| format!("cannot parse font {}", path.display()))
}

/// Draws detection boxes and captions with imageproc.
pub struct ImageprocAnnotator {
    font: Option<FontVec>,
    scale: PxScale,
    border_width: u32,
    border_color: Rgb<u8>,
    text_color: Rgb<u8>,
    jpeg_quality: u8,
}

impl ImageprocAnnotator {
    /// Without a usable font only the boxes are drawn.
    pub fn new(cfg: &RenderConfig) -> Self {
        let font = match &cfg.font_path {
            Some(path) => match load_font(path) {
                Ok(font) => {
                    info!(font = %path.display(), "label font loaded");
                    Some(font)
                }
                Err(e) => {
                    warn!("⚠️ {e:#}; labels will not be drawn");
                    None
                }
            },
            None => {
                warn!("⚠️ no label font configured; labels will not be drawn");
                None
            }
        };
        Self::with_font(cfg, font)
    }

    pub fn with_font(cfg: &RenderConfig, font: Option<FontVec>) -> Self {
        Self {
            font,
            scale: PxScale::from(cfg.font_size),
            border_width: cfg.border_width.clamp(1, MAX_BORDER_WIDTH),
            border_color: Rgb(cfg.border_color),
            text_color: Rgb(cfg.text_color),
            jpeg_quality: cfg.jpeg_quality.clamp(1, 100),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_one(&self, image: &mut RgbImage, det: &Detection) {
        let x1 = det.x1.round() as i32;
        let y1 = det.y1.round() as i32;
        let x2 = det.x2.round() as i32;
        let y2 = det.y2.round() as i32;
        if x2 <= x1 || y2 <= y1 {
            return;
        }
        let (w, h) = ((x2 - x1) as u32, (y2 - y1) as u32);

        for i in 0..self.border_width {
            let offset = Rect::at(x1 - i as i32, y1 - i as i32).of_size(w + 2 * i, h + 2 * i);
            draw_hollow_rect_mut(image, offset, self.border_color);
        }

        if let Some(font) = &self.font {
            let text = det.caption();
            let (_, text_h) = text_size(self.scale, font, &text);
            let y = (y1 - LABEL_GAP - text_h as i32).max(0);
            draw_text_mut(image, self.text_color, x1.max(0), y, self.scale, font, &text);
        }
    }
}

impl AnnotatorPort for ImageprocAnnotator {
    fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut out = image.clone();
        for det in detections {
            self.draw_one(&mut out, det);
        }
        out
    }

    fn encode_jpeg(&self, image: &RgbImage) -> DomainResult<Vec<u8>> {
        let mut jpeg = Vec::new();
        let mut enc = JpegEncoder::new_with_quality(&mut jpeg, self.jpeg_quality);
        enc.encode(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
            .map_err(|e| DomainError::OperationFailed(format!("jpeg encoding: {e}")))?;
        Ok(jpeg)
    }
}
