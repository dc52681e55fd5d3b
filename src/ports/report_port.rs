//! Run reporting port.

use crate::domain::error::NinetraderError;
use crate::domain::orchestrator::RunSummary;

/// Port for persisting the trade log and run summary.
pub trait ReportPort {
    fn write(&self, summary: &RunSummary, output_path: &str) -> Result<(), NinetraderError>;
}
