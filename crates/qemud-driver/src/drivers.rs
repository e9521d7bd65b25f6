//! Registry of backends, built once and read-only afterwards.

use std::sync::Arc;

use url::Url;

use crate::driver::{Backend, OpenFlags, Session};
use crate::error::DriverError;
use crate::qemu::QemuDriver;

/// Looks backends up by name or URI scheme.
#[derive(Default)]
pub struct DriverRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl DriverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing the built-in QEMU backend.
    #[must_use]
    pub fn with_default_backends() -> Self {
        Self {
            backends: vec![Arc::new(QemuDriver::default())],
        }
    }

    /// Adds a backend; names must be unique.
    pub fn register(&mut self, backend: Arc<dyn Backend>) -> Result<(), DriverError> {
        let name = backend.name();
        if self.lookup(name).is_some() {
            return Err(DriverError::DuplicateDriver { name });
        }
        self.backends.push(backend);
        Ok(())
    }

    /// Finds a backend by display name or scheme, ignoring case.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|backend| {
            backend.name().eq_ignore_ascii_case(name) || backend.scheme().eq_ignore_ascii_case(name)
        })
    }

    /// Opens `uri` with the backend owning its scheme.
    pub fn open(&self, uri: &str, flags: OpenFlags) -> Result<Box<dyn Session>, DriverError> {
        let backend = Url::parse(uri)
            .ok()
            .and_then(|url| {
                self.backends
                    .iter()
                    .find(|backend| backend.scheme() == url.scheme())
            })
            .ok_or_else(|| DriverError::NoDriver {
                uri: uri.to_owned(),
            })?;
        backend.open(uri, flags)
    }

    /// Names of registered backends, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.backends.iter().map(|backend| backend.name())
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_list()
            .entries(self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("QEMU")]
    #[case("qemu")]
    fn finds_builtin_backend(#[case] name: &str) {
        let registry = DriverRegistry::with_default_backends();
        let backend = registry.lookup(name).expect("qemu backend");
        assert_eq!(backend.name(), "QEMU");
        assert_eq!(backend.scheme(), "qemu");
    }

    #[test]
    fn rejects_duplicate_registration() {
        let mut registry = DriverRegistry::with_default_backends();
        let result = registry.register(Arc::new(QemuDriver::default()));
        assert!(matches!(
            result,
            Err(DriverError::DuplicateDriver { name: "QEMU" })
        ));
        assert_eq!(registry.names().count(), 1);
    }

    #[rstest]
    #[case("xen:///system")]
    #[case("garbage")]
    fn unknown_schemes_have_no_driver(#[case] uri: &str) {
        let registry = DriverRegistry::with_default_backends();
        assert!(matches!(
            registry.open(uri, OpenFlags::default()),
            Err(DriverError::NoDriver { .. })
        ));
    }
}
