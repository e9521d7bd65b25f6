//! Client-side handles for remote domains and networks.

use std::fmt;

use qemud_protocol::{DomainInfo, RunState, Uuid};

use crate::error::DriverError;

/// Runtime id the daemon uses for a domain that is not running.
pub const NOT_RUNNING: i32 = -1;

/// A remote domain, keyed by name and UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    name: String,
    uuid: Uuid,
    id: i32,
}

impl Domain {
    pub(crate) fn new(name: String, uuid: Uuid, id: i32) -> Self {
        Self { name, uuid, id }
    }

    /// Domain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Domain UUID.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Runtime id, or `None` while the domain is not running.
    #[must_use]
    pub const fn id(&self) -> Option<i32> {
        if self.id == NOT_RUNNING {
            None
        } else {
            Some(self.id)
        }
    }

    pub(crate) const fn raw_id(&self) -> i32 {
        self.id
    }

    pub(crate) const fn set_id(&mut self, id: i32) {
        self.id = id;
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} ({})", self.name, self.uuid)
    }
}

/// A remote virtual network, keyed by name and UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    name: String,
    uuid: Uuid,
}

impl Network {
    pub(crate) fn new(name: String, uuid: Uuid) -> Self {
        Self { name, uuid }
    }

    /// Network name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Network UUID.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl fmt::Display for Network {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} ({})", self.name, self.uuid)
    }
}

/// Domain state as seen by the management library.
///
/// The daemon only reports three of these; the rest exist for other
/// backends sharing the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    NoState,
    Running,
    Blocked,
    Paused,
    Shutdown,
    Shutoff,
    Crashed,
}

impl From<RunState> for DomainState {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Running => Self::Running,
            RunState::Paused => Self::Paused,
            RunState::Stopped => Self::Shutoff,
        }
    }
}

impl fmt::Display for DomainState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::NoState => "no state",
            Self::Running => "running",
            Self::Blocked => "blocked",
            Self::Paused => "paused",
            Self::Shutdown => "in shutdown",
            Self::Shutoff => "shut off",
            Self::Crashed => "crashed",
        })
    }
}

/// Runtime information for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainRunInfo {
    pub state: DomainState,
    /// Maximum memory in kilobytes.
    pub max_memory: u32,
    /// Current memory in kilobytes.
    pub memory: u32,
    pub virt_cpus: u32,
    /// CPU time used, in nanoseconds.
    pub cpu_time: u64,
}

impl TryFrom<DomainInfo> for DomainRunInfo {
    type Error = DriverError;

    fn try_from(info: DomainInfo) -> Result<Self, Self::Error> {
        let state = RunState::from_raw(info.run_state)
            .ok_or(DriverError::UnknownRunState {
                raw: info.run_state,
            })?
            .into();
        Ok(Self {
            state,
            max_memory: info.max_memory,
            memory: info.memory,
            virt_cpus: info.virt_cpus,
            cpu_time: info.cpu_time,
        })
    }
}
