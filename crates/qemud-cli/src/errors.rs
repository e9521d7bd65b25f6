//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;

use qemud_driver::DriverError;
use thiserror::Error;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("failed to read descriptor {}: {source}", path.display())]
    ReadDescriptor { path: PathBuf, source: io::Error },
    #[error("failed to write output: {0}")]
    Emit(io::Error),
}
