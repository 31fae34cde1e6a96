use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Byte limit shared by `sid`, `user_info.name`, and `user_info.mail`.
pub const MAX_FIELD_LEN: usize = 32;

pub(crate) fn check_len(field: &'static str, value: &str) -> Result<(), StoreError> {
    if value.len() > MAX_FIELD_LEN {
        return Err(StoreError::Oversize { field, value: value.to_string(), limit: MAX_FIELD_LEN });
    }
    Ok(())
}

/// Lifecycle state of a student's codespace, as tracked by the
/// controller and persisted on the record.
///
/// `Suspended` at the orchestrator layer is never observed here — it
/// is projected to `Stopped` before it reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodespaceStatus {
    Stopped,
    Starting,
    Running,
    Failed,
    Deleted,
}

impl Default for CodespaceStatus {
    fn default() -> Self {
        Self::Stopped
    }
}

impl fmt::Display for CodespaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognized codespace status {0:?}")]
pub struct ParseStatusError(String);

impl FromStr for CodespaceStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(Self::Stopped),
            "starting" => Ok(Self::Starting),
            "running" => Ok(Self::Running),
            "failed" => Ok(Self::Failed),
            "deleted" => Ok(Self::Deleted),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Owner-editable profile fields, set via the student surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mail: String,
}

impl UserInfo {
    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        check_len("name", &self.name)?;
        check_len("mail", &self.mail)?;
        Ok(())
    }
}

/// The codespace subfields mutated by the lifecycle controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodespaceInfo {
    #[serde(default)]
    pub status: CodespaceStatus,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub time_quota: i64,
    #[serde(default)]
    pub time_used: i64,
    #[serde(default)]
    pub last_start: i64,
    #[serde(default)]
    pub last_stop: i64,
    #[serde(default)]
    pub last_active: i64,
    #[serde(default)]
    pub last_watch: i64,
}

impl Default for CodespaceInfo {
    fn default() -> Self {
        Self {
            status: CodespaceStatus::Stopped,
            url: String::new(),
            time_quota: 0,
            time_used: 0,
            last_start: 0,
            last_stop: 0,
            last_active: 0,
            last_watch: 0,
        }
    }
}

/// A student record: identity, credential, profile, and codespace
/// lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub sid: String,
    #[serde(default)]
    pub pwd_hash: String,
    #[serde(default)]
    pub user_info: UserInfo,
    #[serde(default)]
    pub codespace: CodespaceInfo,
}

impl Student {
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            pwd_hash: String::new(),
            user_info: UserInfo::default(),
            codespace: CodespaceInfo::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_and_parse_round_trip() {
        for status in [
            CodespaceStatus::Stopped,
            CodespaceStatus::Starting,
            CodespaceStatus::Running,
            CodespaceStatus::Failed,
            CodespaceStatus::Deleted,
        ] {
            assert_eq!(status.to_string().parse::<CodespaceStatus>().unwrap(), status);
        }
    }

    #[test]
    fn rejects_unknown_status() {
        assert!("paused".parse::<CodespaceStatus>().is_err());
    }

    #[test]
    fn default_status_is_stopped() {
        assert_eq!(CodespaceStatus::default(), CodespaceStatus::Stopped);
    }
}
