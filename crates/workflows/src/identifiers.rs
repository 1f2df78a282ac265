//! Newtype domain identifiers.
//!
//! Every remote object the handler refers to is represented as a distinct
//! newtype, so an [`EnvironmentId`] cannot be passed where an
//! [`AdvancedTaskId`] is expected even though the API numbers both.

use serde::{Deserialize, Serialize};

/// Declares an API-assigned integer id that encodes as a bare JSON number.
macro_rules! api_id {
    ($(#[$attr:meta])* $name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

api_id! {
    /// Identifies a project. Carried as `meta.projectId` on incoming events.
    ProjectId
}

api_id! {
    /// Identifies an environment (one deployed branch or pull request of a project).
    EnvironmentId
}

api_id! {
    /// Identifies an advanced task definition: the automation a workflow runs.
    AdvancedTaskId
}

api_id! {
    /// Identifies one task run created by a successful workflow invocation.
    TaskId
}

/// An environment name within a project (e.g. `"main"`, `"pr-42"`).
///
/// Carried as `meta.environment` on incoming events. Never empty: an empty
/// name is treated the same as a missing one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EnvironmentName(String);

impl EnvironmentName {
    /// Returns `None` for an empty name.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (!name.is_empty()).then_some(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
