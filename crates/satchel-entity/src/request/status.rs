//! Request kind, reason and status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use satchel_core::error::AppError;

/// Whether a request asks for content to be present or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_request_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    /// Import the node's files onto this device.
    Download,
    /// Delete the node's files from this device.
    Removal,
}

impl RequestKind {
    /// The kind that cancels this one for the same source and node.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Download => Self::Removal,
            Self::Removal => Self::Download,
        }
    }

    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Removal => "removal",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "download" => Ok(Self::Download),
            "removal" | "remove" => Ok(Self::Removal),
            other => Err(AppError::validation(format!(
                "Unknown request kind: '{other}'"
            ))),
        }
    }
}

/// Why a request exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_request_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestReason {
    /// A user asked for it directly.
    UserInitiated,
    /// It was derived from assignments delivered by a sync.
    SyncInitiated,
}

impl RequestReason {
    /// Return the reason as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserInitiated => "user_initiated",
            Self::SyncInitiated => "sync_initiated",
        }
    }
}

impl fmt::Display for RequestReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestReason {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user_initiated" | "user" => Ok(Self::UserInitiated),
            "sync_initiated" | "sync" => Ok(Self::SyncInitiated),
            other => Err(AppError::validation(format!(
                "Unknown request reason: '{other}'"
            ))),
        }
    }
}

/// Processing status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for a reconciliation pass.
    Pending,
    /// Being processed by the current pass.
    InProgress,
    /// Done.
    Completed,
    /// The last attempt failed; the next pass tries again.
    Failed,
}

impl RequestStatus {
    /// Statuses a pass still has to act on.
    pub const INCOMPLETE: [RequestStatus; 2] = [Self::Failed, Self::Pending];

    /// Whether the next pass should pick this request up.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }

    /// Return the status as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::validation(format!(
                "Unknown request status: '{other}'"
            ))),
        }
    }
}
