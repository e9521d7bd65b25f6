//! Single reporting entry point for failed operations.
//!
//! Every failure, whether it came from a failure frame, a malformed packet,
//! a reply mismatch or a local check, is turned into one [`ErrorReport`] and
//! handed to the injected [`ErrorSink`].

use std::sync::Arc;

use tracing::warn;

use crate::REPORT_TARGET;
use crate::error::{DriverError, ErrorCode};

/// Structured description of a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Error classification.
    pub code: ErrorCode,
    /// Human readable message.
    pub message: String,
    /// Name of the domain or network involved, when known.
    pub object: Option<String>,
}

/// Receives error reports on behalf of the host application.
pub trait ErrorSink: Send + Sync {
    /// Records one report.
    fn report(&self, report: &ErrorReport);
}

/// Sink that emits each report as a `tracing` warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, report: &ErrorReport) {
        warn!(
            target: REPORT_TARGET,
            code = %report.code,
            object = report.object.as_deref().unwrap_or_default(),
            "{}",
            report.message
        );
    }
}

/// Converts driver errors into reports.
#[derive(Clone)]
pub struct ErrorTranslator {
    sink: Arc<dyn ErrorSink>,
}

impl ErrorTranslator {
    /// Builds a translator forwarding to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ErrorSink>) -> Self {
        Self { sink }
    }

    /// Reports `error`, attributing it to `object` when given.
    pub fn report(&self, error: &DriverError, object: Option<&str>) {
        self.sink.report(&ErrorReport {
            code: error.code(),
            message: error.to_string(),
            object: object.map(str::to_owned),
        });
    }

    /// Reports the error carried by `result`, if any, and passes it on.
    pub fn check<T>(&self, result: Result<T, DriverError>, object: Option<&str>) -> Result<T, DriverError> {
        result.inspect_err(|error| self.report(error, object))
    }
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for ErrorTranslator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("ErrorTranslator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use qemud_protocol::{Failure, ProtocolError};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ErrorReport>>);

    impl ErrorSink for Recorder {
        fn report(&self, report: &ErrorReport) {
            self.0.lock().expect("lock reports").push(report.clone());
        }
    }

    #[test]
    fn every_origin_reaches_the_same_sink() {
        let recorder = Arc::new(Recorder::default());
        let translator = ErrorTranslator::new(recorder.clone());
        let errors = [
            DriverError::Remote(Failure {
                code: 12,
                message: Some(String::from("no such domain")),
            }),
            DriverError::Malformed {
                source: ProtocolError::Oversized {
                    size: 9000,
                    max: 5008,
                },
            },
            DriverError::UnexpectedReply {
                expected: 1,
                received: 2,
            },
        ];
        for error in &errors {
            translator.report(error, Some("guest"));
        }

        let reports = recorder.0.lock().expect("lock reports");
        let codes: Vec<_> = reports.iter().map(|report| report.code).collect();
        assert_eq!(
            codes,
            [ErrorCode::Remote(12), ErrorCode::Internal, ErrorCode::Internal]
        );
        assert_eq!(reports.first().map(|r| r.message.as_str()), Some("no such domain"));
        assert!(reports.iter().all(|r| r.object.as_deref() == Some("guest")));
    }

    #[test]
    fn check_leaves_success_unreported() {
        let recorder = Arc::new(Recorder::default());
        let translator = ErrorTranslator::new(recorder.clone());
        let value = translator.check(Ok::<_, DriverError>(5), None);
        assert_eq!(value.ok(), Some(5));
        assert!(recorder.0.lock().expect("lock reports").is_empty());
    }
}
