use base64::{prelude::BASE64_STANDARD, Engine};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{
    application::services::AnalysisOutcome,
    domain::{
        detection::Detection,
        errors::DomainResult,
        report::Finding,
        tumor::{TumorInfo, TUMOR_INFO},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDto {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub threshold: f32,
    pub infer_ms: f32,
    pub detections: Vec<Detection>,
    pub findings: Vec<Finding>,
    pub summary: String,
    /// `data:image/jpeg;base64,...`
    pub annotated_image: String,
    pub download_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileErrorDto {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileResultDto {
    Report(ReportDto),
    Error(FileErrorDto),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub results: Vec<FileResultDto>,
}

impl DetectResponse {
    pub fn from_results(results: Vec<(String, DomainResult<AnalysisOutcome>)>, now: DateTime<Local>) -> Self {
        let results = results
            .into_iter()
            .map(|(file_name, res)| match res {
                Ok(outcome) => FileResultDto::Report(ReportDto::from_outcome(outcome, now)),
                Err(e) => FileResultDto::Error(FileErrorDto { file_name, error: e.to_string() }),
            })
            .collect();
        Self { results }
    }
}

impl ReportDto {
    pub fn from_outcome(outcome: AnalysisOutcome, now: DateTime<Local>) -> Self {
        let r = outcome.report;
        Self {
            file_name: r.file_name,
            width: r.width,
            height: r.height,
            threshold: r.threshold,
            infer_ms: r.infer_ms,
            detections: r.detections,
            findings: r.findings,
            summary: r.summary,
            annotated_image: jpeg_data_url(&outcome.annotated_jpeg),
            download_name: download_name(now),
        }
    }
}

pub fn jpeg_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(jpeg))
}

/// `tumor_result_20240131_235959.jpg`
pub fn download_name(now: DateTime<Local>) -> String {
    now.format("tumor_result_%Y%m%d_%H%M%S.jpg").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSlider {
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub step: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub model: String,
    pub threshold: ThresholdSlider,
    pub accepted_formats: Vec<String>,
    pub class_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TumorsResponse {
    pub tumors: &'static [TumorInfo],
}

impl Default for TumorsResponse {
    fn default() -> Self {
        Self { tumors: &TUMOR_INFO }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model: String,
}
