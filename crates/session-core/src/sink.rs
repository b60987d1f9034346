//! Sink data model
//!
//! A sink is one discoverable receiver device. Sinks are created by the
//! platform discovery collaborator and never mutated afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CastError, Result};

/// Control category prefix used to build cast selectors
pub const CAST_CONTROL_CATEGORY: &str = "CATEGORY_CAST";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a receiver device
    SinkId
);

string_id!(
    /// Identifier of a party interested in sinks (the source URN in practice)
    RequesterId
);

string_id!(
    /// Receiver-side application identity shared by many requesters
    ApplicationId
);

impl ApplicationId {
    /// Application ids are non-empty ASCII alphanumeric strings
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }

    /// Build the platform selector for this application, if the id is valid
    pub fn selector(&self) -> Option<SinkSelector> {
        self.try_selector().ok()
    }

    /// Like [`ApplicationId::selector`], reporting why the id was rejected
    pub fn try_selector(&self) -> Result<SinkSelector> {
        if !self.is_valid() {
            return Err(CastError::InvalidApplicationId {
                application_id: self.0.clone(),
            });
        }
        Ok(SinkSelector::new(format!(
            "{}/{}",
            CAST_CONTROL_CATEGORY,
            self.0.to_ascii_uppercase()
        )))
    }
}

/// One discoverable receiver device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sink {
    /// Unique device id
    pub id: SinkId,
    /// Name shown to users
    pub friendly_name: String,
    /// Route provider that reported the device
    pub route_provider_id: String,
}

impl Sink {
    pub fn new(
        id: impl Into<SinkId>,
        friendly_name: impl Into<String>,
        route_provider_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            friendly_name: friendly_name.into(),
            route_provider_id: route_provider_id.into(),
        }
    }
}

/// Platform filter describing which sinks a discovery registration wants
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SinkSelector {
    /// Control category the platform matches routes against
    pub control_category: String,
}

impl SinkSelector {
    pub fn new(control_category: impl Into<String>) -> Self {
        Self {
            control_category: control_category.into(),
        }
    }
}

impl fmt::Display for SinkSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.control_category)
    }
}
