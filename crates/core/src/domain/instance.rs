// Service Instance Domain Model

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Instance ID (opaque, assigned by the operations service)
pub type InstanceId = String;

/// Lifecycle status of a service instance
///
/// Running and suspended variants are "actionable": the instance has not
/// reached a terminal state and is a termination candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    // Running variants
    ReadyToRun,
    Active,
    Dehydrated,
    InBreakpoint,

    // Suspended variants
    SuspendedResumable,
    SuspendedNotResumable,

    // Terminal
    Completed,
    Terminated,
}

impl InstanceStatus {
    /// Every running sub-state
    pub const RUNNING_ALL: [InstanceStatus; 4] = [
        InstanceStatus::ReadyToRun,
        InstanceStatus::Active,
        InstanceStatus::Dehydrated,
        InstanceStatus::InBreakpoint,
    ];

    /// Every suspended sub-state
    pub const SUSPENDED_ALL: [InstanceStatus; 2] = [
        InstanceStatus::SuspendedResumable,
        InstanceStatus::SuspendedNotResumable,
    ];

    pub fn is_running(&self) -> bool {
        Self::RUNNING_ALL.contains(self)
    }

    pub fn is_suspended(&self) -> bool {
        Self::SUSPENDED_ALL.contains(self)
    }

    /// Running or suspended in any sub-variant
    pub fn is_actionable(&self) -> bool {
        self.is_running() || self.is_suspended()
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_actionable()
    }

    /// All actionable statuses (running ∪ suspended)
    pub fn actionable() -> impl Iterator<Item = InstanceStatus> {
        Self::RUNNING_ALL
            .into_iter()
            .chain(Self::SUSPENDED_ALL)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::ReadyToRun => "READY_TO_RUN",
            InstanceStatus::Active => "ACTIVE",
            InstanceStatus::Dehydrated => "DEHYDRATED",
            InstanceStatus::InBreakpoint => "IN_BREAKPOINT",
            InstanceStatus::SuspendedResumable => "SUSPENDED_RESUMABLE",
            InstanceStatus::SuspendedNotResumable => "SUSPENDED_NOT_RESUMABLE",
            InstanceStatus::Completed => "COMPLETED",
            InstanceStatus::Terminated => "TERMINATED",
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstanceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "READY_TO_RUN" => Ok(InstanceStatus::ReadyToRun),
            "ACTIVE" => Ok(InstanceStatus::Active),
            "DEHYDRATED" => Ok(InstanceStatus::Dehydrated),
            "IN_BREAKPOINT" => Ok(InstanceStatus::InBreakpoint),
            "SUSPENDED_RESUMABLE" => Ok(InstanceStatus::SuspendedResumable),
            "SUSPENDED_NOT_RESUMABLE" => Ok(InstanceStatus::SuspendedNotResumable),
            "COMPLETED" => Ok(InstanceStatus::Completed),
            "TERMINATED" => Ok(InstanceStatus::Terminated),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Service class (what kind of work the instance performs)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceClass {
    Orchestration,
    Messaging,
    RoutingFailure,
    IsolatedAdapter,
    Other,
}

impl std::fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceClass::Orchestration => write!(f, "ORCHESTRATION"),
            ServiceClass::Messaging => write!(f, "MESSAGING"),
            ServiceClass::RoutingFailure => write!(f, "ROUTING_FAILURE"),
            ServiceClass::IsolatedAdapter => write!(f, "ISOLATED_ADAPTER"),
            ServiceClass::Other => write!(f, "OTHER"),
        }
    }
}

impl FromStr for ServiceClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ORCHESTRATION" => Ok(ServiceClass::Orchestration),
            "MESSAGING" => Ok(ServiceClass::Messaging),
            "ROUTING_FAILURE" => Ok(ServiceClass::RoutingFailure),
            "ISOLATED_ADAPTER" => Ok(ServiceClass::IsolatedAdapter),
            "OTHER" => Ok(ServiceClass::Other),
            other => Err(DomainError::UnknownClass(other.to_string())),
        }
    }
}

/// One unit of in-flight work tracked by the operations service
///
/// Materialized fresh on each scan. `status` is the value observed at scan
/// time and may be stale by the time termination is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: InstanceId,
    pub class: ServiceClass,
    pub service_type: String,
    pub status: InstanceStatus,
    pub created_at: i64, // epoch ms
    pub error_description: Option<String>,
}

impl ServiceInstance {
    /// Create a new instance record
    ///
    /// # Arguments
    ///
    /// * `id` - Instance ID as reported by the operations service
    /// * `class` - Service class
    /// * `service_type` - Fully qualified service (workflow) type name
    /// * `status` - Status observed at scan time
    /// * `created_at` - Creation timestamp in epoch ms
    pub fn new(
        id: impl Into<String>,
        class: ServiceClass,
        service_type: impl Into<String>,
        status: InstanceStatus,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            class,
            service_type: service_type.into(),
            status,
            created_at,
            error_description: None,
        }
    }

    /// Attach the error text reported for a faulted instance
    pub fn with_error(mut self, description: impl Into<String>) -> Self {
        self.error_description = Some(description.into());
        self
    }

    pub fn is_actionable(&self) -> bool {
        self.status.is_actionable()
    }

    /// Creation time as RFC 3339
    pub fn creation_time(&self) -> String {
        format_epoch_millis(self.created_at)
    }
}

/// Epoch ms as RFC 3339 in UTC, or the raw number when out of range
pub fn format_epoch_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| millis.to_string())
}
