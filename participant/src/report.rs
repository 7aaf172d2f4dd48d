use std::{fs, io, path::PathBuf};

/// Local validation attempt, written on every `perform_run_input_validation`.
pub const LOCAL_VALIDATION_REPORT: &str = "local_validation_report.json";
/// Local fit output, written on every successful `perform_regression`.
pub const LOCAL_REGRESSION_OUTPUT: &str = "local_regression_output.json";
/// The pooled validation report broadcast by the coordinator.
pub const GLOBAL_VALIDATION_REPORT: &str = "global_validation_report.json";
/// The pooled regression results broadcast by the coordinator.
pub const GLOBAL_REGRESSION_RESULTS: &str = "global_regression_results.json";
/// The averaged global model of the iterative variant.
pub const GLOBAL_MODEL: &str = "global_model.json";

/// Persistence collaborator for human-readable records.
///
/// Every phase leaves a record of its decision through this seam; rendering
/// and destination are outside the core.
pub trait ReportSink: Send + Sync {
    fn persist(&self, name: &str, record: &serde_json::Value) -> io::Result<()>;
}

/// Writes each record as pretty-printed JSON under one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ReportSink for DirectorySink {
    fn persist(&self, name: &str, record: &serde_json::Value) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let rendered = serde_json::to_vec_pretty(record)?;
        fs::write(self.path_for(name), rendered)
    }
}

/// Discards every record. For setups where no local persistence is wanted.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn persist(&self, _name: &str, _record: &serde_json::Value) -> io::Result<()> {
        Ok(())
    }
}
