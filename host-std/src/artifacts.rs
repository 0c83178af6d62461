//! JSON stand-ins for the label and report collaborators.
//!
//! The station has no image or PDF encoder. Labels and reports are written
//! as the JSON request/plan a real renderer would consume.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sorter_scanner::error::{Error, Result};
use sorter_scanner::label::{LabelImage, LabelRenderer, LabelRequest};
use sorter_scanner::report::{ReportBuilder, ReportDocument, ReportPlan};

pub const JSON_MIME: &str = "application/json";

pub struct JsonLabels;

impl LabelRenderer for JsonLabels {
    fn render(&self, request: &LabelRequest) -> Result<LabelImage> {
        if request.code.chars().any(|c| !c.is_ascii() || c.is_ascii_control()) {
            // Code 128 only covers printable ASCII.
            return Err(Error::collaborator(
                "label renderer",
                format!("cannot encode {:?} as Code 128", request.code),
            ));
        }
        Ok(LabelImage {
            bytes: serde_json::to_vec_pretty(request)?,
            mime_type: JSON_MIME.to_string(),
        })
    }
}

pub struct JsonReports;

impl ReportBuilder for JsonReports {
    fn build(&self, plan: &ReportPlan) -> Result<ReportDocument> {
        Ok(ReportDocument {
            file_name: Path::new(&plan.file_name)
                .with_extension("json")
                .to_string_lossy()
                .into_owned(),
            bytes: serde_json::to_vec_pretty(plan)?,
            page_count: plan.pages.len(),
        })
    }
}

/// Where an artifact named `file_name` lands. JSON content gets a `.json`
/// extension whatever the requested name.
pub fn artifact_path(dir: &Path, file_name: &str, mime_type: &str) -> PathBuf {
    let path = dir.join(file_name);
    if mime_type == JSON_MIME {
        path.with_extension("json")
    } else {
        path
    }
}

pub fn write_artifact(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |operation: &'static str, source: std::io::Error| Error::Io {
        operation,
        path: path.display().to_string(),
        source,
    };
    let mut file = fs::File::create(path).map_err(|e| io_err("create", e))?;
    file.write_all(bytes).map_err(|e| io_err("write", e))?;
    Ok(())
}
