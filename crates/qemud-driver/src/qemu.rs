//! The QEMU backend: opens sessions against the supervisor daemon.

use std::sync::Arc;

use qemud_config::{DRIVER_SCHEME, EndpointSelector, default_uri};
use tracing::debug;
use url::Url;

use crate::DISPATCH_TARGET;
use crate::driver::{Backend, OpenFlags, Session};
use crate::error::DriverError;
use crate::launcher::{DaemonLauncher, SystemLauncher};
use crate::report::{ErrorSink, ErrorTranslator, TracingSink};
use crate::session::QemuSession;
use crate::transport::{RetryPolicy, connect};

/// Name the backend registers under.
pub const DRIVER_NAME: &str = "QEMU";

/// Backend for `qemu://` identifiers.
#[derive(Clone)]
pub struct QemuDriver {
    launcher: Arc<dyn DaemonLauncher>,
    sink: Arc<dyn ErrorSink>,
    retry: RetryPolicy,
}

impl QemuDriver {
    /// Builds a backend with an explicit launcher and error sink.
    #[must_use]
    pub fn new(launcher: Arc<dyn DaemonLauncher>, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            launcher,
            sink,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the autostart bounds.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Opens a session for `uri`, reporting failures unless `flags.quiet`
    /// applies.
    pub fn connect(&self, uri: &str, flags: OpenFlags) -> Result<QemuSession, DriverError> {
        let translator = ErrorTranslator::new(Arc::clone(&self.sink));
        let result = self.establish(uri, flags, translator.clone());
        if let Err(error) = &result {
            if !(flags.quiet && error.is_unrecognised_uri()) {
                translator.report(error, None);
            }
        }
        result
    }

    /// Opens a session for network management.
    ///
    /// Identifiers for other backends, or none at all, fall back to the
    /// default: the system daemon for the superuser, the session daemon
    /// otherwise.
    pub fn connect_network(
        &self,
        uri: Option<&str>,
        flags: OpenFlags,
    ) -> Result<QemuSession, DriverError> {
        let own = uri.filter(|candidate| {
            Url::parse(candidate).is_ok_and(|url| url.scheme() == DRIVER_SCHEME)
        });
        self.connect(own.unwrap_or_else(|| default_uri()), flags)
    }

    fn establish(
        &self,
        uri: &str,
        flags: OpenFlags,
        translator: ErrorTranslator,
    ) -> Result<QemuSession, DriverError> {
        let selector: EndpointSelector = uri.parse()?;
        let access = flags.access();
        let address = selector.resolve(access)?;
        debug!(
            target: DISPATCH_TARGET,
            %uri,
            %address,
            "opening supervisor connection"
        );
        let stream = connect(&address, Some(self.launcher.as_ref()), self.retry)?;
        Ok(QemuSession::new(
            Box::new(stream),
            address,
            access,
            translator,
        ))
    }
}

impl Default for QemuDriver {
    fn default() -> Self {
        Self::new(Arc::new(SystemLauncher::default()), Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for QemuDriver {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("QemuDriver")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Backend for QemuDriver {
    fn name(&self) -> &'static str {
        DRIVER_NAME
    }

    fn scheme(&self) -> &'static str {
        DRIVER_SCHEME
    }

    fn open(&self, uri: &str, flags: OpenFlags) -> Result<Box<dyn Session>, DriverError> {
        self.connect(uri, flags)
            .map(|session| Box::new(session) as Box<dyn Session>)
    }

    fn open_network(
        &self,
        uri: Option<&str>,
        flags: OpenFlags,
    ) -> Result<Box<dyn Session>, DriverError> {
        self.connect_network(uri, flags)
            .map(|session| Box::new(session) as Box<dyn Session>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::launcher::LaunchError;
    use crate::report::ErrorReport;
    use rstest::rstest;

    struct NoLaunch;

    impl DaemonLauncher for NoLaunch {
        fn ensure_running(&self) -> Result<(), LaunchError> {
            Err(LaunchError::InvalidArgument {
                argument: String::from("disabled"),
            })
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ErrorReport>>);

    impl ErrorSink for Recorder {
        fn report(&self, report: &ErrorReport) {
            self.0.lock().expect("lock reports").push(report.clone());
        }
    }

    fn driver(recorder: &Arc<Recorder>) -> QemuDriver {
        QemuDriver::new(Arc::new(NoLaunch), Arc::clone(recorder) as Arc<dyn ErrorSink>)
    }

    #[rstest]
    #[case::foreign("xen:///system")]
    #[case::unparseable("not a uri")]
    fn quiet_open_does_not_report_foreign_identifiers(#[case] uri: &str) {
        let recorder = Arc::new(Recorder::default());
        let flags = OpenFlags {
            quiet: true,
            ..OpenFlags::default()
        };
        assert!(driver(&recorder).connect(uri, flags).is_err());
        assert!(recorder.0.lock().expect("lock reports").is_empty());
    }

    #[test]
    fn loud_open_reports_foreign_identifiers() {
        let recorder = Arc::new(Recorder::default());
        let error = driver(&recorder)
            .connect("xen:///system", OpenFlags::default())
            .expect_err("foreign scheme");
        assert!(error.is_unrecognised_uri());
        assert_eq!(recorder.0.lock().expect("lock reports").len(), 1);
    }

    #[test]
    fn quiet_open_still_reports_bad_paths() {
        let recorder = Arc::new(Recorder::default());
        let flags = OpenFlags {
            quiet: true,
            ..OpenFlags::default()
        };
        assert!(driver(&recorder).connect("qemu:///elsewhere", flags).is_err());
        assert_eq!(recorder.0.lock().expect("lock reports").len(), 1);
    }
}
