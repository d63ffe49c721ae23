//! The event a tick emits for one property (§4.4 step 3, §8 scenario 3).

use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ValidationWarning,
    ReadSoftFail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ValidationWarning,
            message: message.into(),
        }
    }

    pub fn read_soft_fail(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::ReadSoftFail,
            message: message.into(),
        }
    }
}

/// `PropertyChanged { name, value, timestamp }` from §4.4 step 3, carrying
/// the non-fatal warnings (§4.3 step 4) and freeze write-back status
/// (§4.4 step 4 / §8 scenario 3) produced alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub name: String,
    pub value: PropertyValue,
    pub timestamp_ms: u64,
    pub warnings: Vec<Warning>,
    pub freeze_enforced: bool,
}

impl ChangeEvent {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp_ms: now_ms(),
            warnings: Vec::new(),
            freeze_enforced: false,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_freeze_enforced(mut self, enforced: bool) -> Self {
        self.freeze_enforced = enforced;
        self
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
