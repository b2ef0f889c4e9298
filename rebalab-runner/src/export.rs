//! JSON artifacts: calibration reports out, parameter sets back in.
//!
//! Reports carry a `schema_version`; files from a newer schema are rejected
//! on load. `read_params` accepts either a full report (taking its best
//! parameters) or a bare `{ "name": value }` parameter object.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use rebalab_core::ParamSet;

use crate::calibrate::CalibrationReport;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFile {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(flatten)]
    pub report: CalibrationReport,
}

impl ReportFile {
    pub fn new(report: CalibrationReport) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: None,
            report,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }
}

/// Serialize a report to pretty JSON.
pub fn export_json(file: &ReportFile) -> Result<String> {
    serde_json::to_string_pretty(file).context("failed to serialize calibration report")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ReportFile> {
    let file: ReportFile =
        serde_json::from_str(json).context("failed to deserialize calibration report")?;
    if file.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            file.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(file)
}

pub fn write_report(file: &ReportFile, path: &Path) -> Result<()> {
    let json = export_json(file)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Parameters from a report file or a bare parameter object.
pub fn read_params(path: &Path) -> Result<ParamSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?;
    if value.get("schema_version").is_some() {
        return Ok(import_json(&text)?.report.optimization.best_params);
    }
    serde_json::from_value(value)
        .with_context(|| format!("{} is neither a report nor a parameter object", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{OptimizationResult, TraceEntry};

    fn report() -> CalibrationReport {
        let best = ParamSet::new().with("sensitivity", 0.02).with("variant", "PAMR1");
        CalibrationReport {
            strategy: "pamr".into(),
            dataset_hash: Some("abc".into()),
            benchmark: None,
            optimization: OptimizationResult {
                best_params: best.clone(),
                best_value: Some(0.12),
                evaluations: 1,
                elapsed_secs: 0.5,
                interrupted: false,
                trace: vec![TraceEntry {
                    evaluation: 1,
                    value: 0.12,
                    params: best,
                    note: None,
                }],
            },
            interrupted: false,
        }
    }

    #[test]
    fn report_round_trips_through_json() {
        let file = ReportFile::new(report()).with_run_id("r1");
        let json = export_json(&file).unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        assert_eq!(import_json(&json).unwrap(), file);
    }

    #[test]
    fn newer_schema_rejected() {
        let mut file = ReportFile::new(report());
        file.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&file).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn params_read_from_report_or_bare_object() {
        let dir = tempfile::tempdir().unwrap();

        let report_path = dir.path().join("out/report.json");
        write_report(&ReportFile::new(report()), &report_path).unwrap();
        let params = read_params(&report_path).unwrap();
        assert_eq!(params.number("sensitivity").unwrap(), 0.02);

        let bare_path = dir.path().join("params.json");
        std::fs::write(&bare_path, r#"{ "sensitivity": 0.07, "variant": "PAMR2" }"#).unwrap();
        let params = read_params(&bare_path).unwrap();
        assert_eq!(params.choice("variant").unwrap(), "PAMR2");
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(read_params(&path).is_err());
    }
}
