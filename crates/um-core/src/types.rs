//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid suggestion decision value.
    #[error("invalid suggestion decision: {value}")]
    InvalidDecision { value: String },

    /// Invalid permission kind value.
    #[error("invalid permission kind: {value}")]
    InvalidPermissionKind { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated application package identifier.
    ///
    /// Package IDs must be non-empty strings. They identify the application
    /// whose foreground time is being tracked (e.g., "com.example.reader").
    PackageId, "package ID"
);

define_string_id!(
    /// A validated suggestion prompt identifier.
    ///
    /// Suggestion IDs must be non-empty strings. They tie a shown prompt to
    /// the user's later decision about it.
    SuggestionId, "suggestion ID"
);

/// A synthetic session identifier.
///
/// Assigned sequentially during a single projection pass. Not stable across
/// input sets: the same event log can yield different IDs when the grace
/// period changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle state of the monitoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Started,
    Stopped,
}

/// A permission the monitoring service depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    UsageAccess,
    Overlay,
    Notification,
}

impl PermissionKind {
    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UsageAccess => "usage_access",
            Self::Overlay => "overlay",
            Self::Notification => "notification",
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PermissionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "usage_access" => Ok(Self::UsageAccess),
            "overlay" => Ok(Self::Overlay),
            "notification" => Ok(Self::Notification),
            _ => Err(ValidationError::InvalidPermissionKind {
                value: s.to_string(),
            }),
        }
    }
}

/// The reported state of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Revoked,
}

/// The user's response to a suggestion prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Snoozed,
    Dismissed,
    DisabledForSession,
}

impl Decision {
    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snoozed => "snoozed",
            Self::Dismissed => "dismissed",
            Self::DisabledForSession => "disabled_for_session",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Decision {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snoozed" => Ok(Self::Snoozed),
            "dismissed" => Ok(Self::Dismissed),
            "disabled_for_session" => Ok(Self::DisabledForSession),
            _ => Err(ValidationError::InvalidDecision {
                value: s.to_string(),
            }),
        }
    }
}
