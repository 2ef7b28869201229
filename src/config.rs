use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::model::{ModelId, YoloParams};

/// Common locations of a TrueType font for box labels.
pub(crate) const FONT_CANDIDATES: [&str; 4] = [
    "assets/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// Widest box border accepted, in pixels.
pub const MAX_BORDER_WIDTH: u32 = 64;

#[derive(Parser, Debug, Default)]
#[command(name = "mri-tumor-detector")]
#[command(about = "Brain tumor detection on MRI images, served as a web page")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8501
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// YOLOv8 detection model exported to ONNX
    #[arg(short, long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// TrueType font used for box labels
    #[arg(long, value_name = "FILE")]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub bind: String,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub model: ModelConfig,
    pub render: RenderConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub input_size: u32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub class_names: Vec<String>,
    pub intra_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub font_path: Option<PathBuf>,
    pub font_size: f32,        //pixels
    pub border_width: u32,     //pixels
    pub border_color: [u8; 3], //RGB
    pub text_color: [u8; 3],   //RGB
    pub jpeg_quality: u8,
}

/// Confidence slider shown on the page.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UiConfig {
    pub min_threshold: f32,
    pub max_threshold: f32,
    pub default_threshold: f32,
    pub step: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8501".into(),
            static_dir: "static".into(),
            max_upload_bytes: 20 * 1024 * 1024,
            model: ModelConfig::default(),
            render: RenderConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/best.onnx".into(),
            input_size: 640,
            iou_threshold: 0.7,
            max_detections: 300,
            class_names: ["glioma", "meningioma", "pituitary", "tumor"]
                .into_iter()
                .map(String::from)
                .collect(),
            intra_threads: 4,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size: 24.0,
            border_width: 2,
            border_color: [255, 0, 0],
            text_color: [255, 255, 255],
            jpeg_quality: 90,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            min_threshold: 0.1,
            max_threshold: 1.0,
            default_threshold: 0.25,
            step: 0.01,
        }
    }
}

impl AppConfig {
    /// Defaults, then the TOML file if given, then command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        if let Some(bind) = &cli.bind {
            config.bind = bind.clone();
        }
        if let Some(model) = &cli.model {
            config.model.path = model.clone();
        }
        if let Some(font) = &cli.font {
            config.render.font_path = Some(font.clone());
        }
        if config.render.font_path.is_none() {
            config.render.font_path = FONT_CANDIDATES.iter().map(PathBuf::from).find(|p| p.is_file());
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid configuration file {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        let ui = &self.ui;
        if !(0.0..=1.0).contains(&ui.min_threshold)
            || !(0.0..=1.0).contains(&ui.max_threshold)
            || ui.min_threshold > ui.max_threshold
        {
            bail!("ui thresholds must satisfy 0 <= min_threshold <= max_threshold <= 1");
        }
        if !(ui.min_threshold..=ui.max_threshold).contains(&ui.default_threshold) {
            bail!("ui.default_threshold must lie between min_threshold and max_threshold");
        }
        if ui.step <= 0.0 {
            bail!("ui.step must be positive");
        }
        if !(0.0..=1.0).contains(&self.model.iou_threshold) {
            bail!("model.iou_threshold must be within [0, 1]");
        }
        if self.model.input_size == 0 || self.model.input_size % 32 != 0 {
            bail!("model.input_size must be a positive multiple of 32");
        }
        if self.model.max_detections == 0 {
            bail!("model.max_detections must be positive");
        }
        if self.model.class_names.is_empty() {
            bail!("model.class_names must not be empty");
        }
        if !(1..=MAX_BORDER_WIDTH).contains(&self.render.border_width) {
            bail!("render.border_width must be between 1 and {MAX_BORDER_WIDTH}");
        }
        if self.render.font_size <= 0.0 {
            bail!("render.font_size must be positive");
        }
        if self.max_upload_bytes == 0 {
            bail!("max_upload_bytes must be positive");
        }
        Ok(())
    }

    pub fn model_id(&self) -> ModelId {
        let onnx_path = self.model.path.to_string_lossy().to_string();
        let name = self
            .model
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "yolo".into());
        ModelId { name, onnx_path }
    }

    pub fn yolo_params(&self) -> YoloParams {
        YoloParams {
            input_size: self.model.input_size,
            conf_threshold: self.ui.default_threshold,
            iou_threshold: self.model.iou_threshold,
            max_detections: self.model.max_detections,
        }
    }
}
