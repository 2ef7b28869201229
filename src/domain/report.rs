use std::fmt;

use serde::{Deserialize, Serialize};

use super::detection::Detection;
use super::tumor::{title_case, TumorClass, FALLBACK_DESCRIPTION};

/// One distinct tumor class found in an image, with its description.
///
/// Stored descriptions open with the class name themselves, so only unknown
/// labels are rendered as `Title: description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub label: String,
    pub title: String,
    pub description: String,
    pub known: bool,
}

impl Finding {
    pub fn for_label(label: &str) -> Self {
        match label.parse::<TumorClass>() {
            Ok(class) => {
                let info = class.info();
                Self {
                    label: label.to_string(),
                    title: info.title.to_string(),
                    description: info.description.to_string(),
                    known: true,
                }
            }
            Err(()) => Self {
                label: label.to_string(),
                title: title_case(label.trim()),
                description: FALLBACK_DESCRIPTION.to_string(),
                known: false,
            },
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.known {
            f.write_str(&self.description)
        } else {
            write!(f, "{}: {}", self.title, self.description)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    pub threshold: f32,
    pub infer_ms: f32,
    pub detections: Vec<Detection>,
    pub findings: Vec<Finding>,
    pub summary: String,
}

/// Labels are compared and reported lowercased.
fn normalized_label(det: &Detection) -> String {
    det.label.trim().to_lowercase()
}

/// Distinct labels in first-seen order, each paired with its description.
pub fn collect_findings(detections: &[Detection]) -> Vec<Finding> {
    let mut out: Vec<Finding> = Vec::new();
    for det in detections {
        let label = normalized_label(det);
        if out.iter().any(|f| f.label == label) {
            continue;
        }
        out.push(Finding::for_label(&label));
    }
    out
}

/// Human summary such as `2 glioma, 1 pituitary`, in first-seen order.
pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for det in detections {
        let label = normalized_label(det);
        match counts.iter().position(|(l, _)| *l == label) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((label, 1)),
        }
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}
