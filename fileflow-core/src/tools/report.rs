use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::tools::types::{Report, ReportSink};

/// Writes each report as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileReportSink {
    dir: PathBuf,
}

impl JsonFileReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn report_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl ReportSink for JsonFileReportSink {
    async fn persist(&self, report: Report) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|err| {
            Error::Storage(format!(
                "failed to create report directory '{}': {err}",
                self.dir.display()
            ))
        })?;

        let path = self.report_path(&report.id);
        let body = serde_json::to_vec_pretty(&report)?;
        tokio::fs::write(&path, body).await.map_err(|err| {
            Error::Storage(format!(
                "failed to write report '{}': {err}",
                path.display()
            ))
        })?;

        tracing::info!(report_id = %report.id, path = %path.display(), "report written");
        Ok(report.id)
    }
}
