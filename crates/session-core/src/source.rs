//! Media source URNs
//!
//! Requesters identify what they want to present with a source URN of the
//! form `cast:<APP_ID>?clientId=<id>&autoJoinPolicy=<policy>`. The
//! application id decides which discovery session the requester joins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CastError, Result};
use crate::sink::{ApplicationId, RequesterId, SinkSelector};

const CAST_SCHEME: &str = "cast:";

/// Which pages may join an existing session started from this source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutoJoinPolicy {
    PageScoped,
    OriginScoped,
    #[default]
    TabAndOriginScoped,
}

impl AutoJoinPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutoJoinPolicy::PageScoped => "page_scoped",
            AutoJoinPolicy::OriginScoped => "origin_scoped",
            AutoJoinPolicy::TabAndOriginScoped => "tab_and_origin_scoped",
        }
    }
}

impl FromStr for AutoJoinPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "page_scoped" => Ok(AutoJoinPolicy::PageScoped),
            "origin_scoped" => Ok(AutoJoinPolicy::OriginScoped),
            "tab_and_origin_scoped" => Ok(AutoJoinPolicy::TabAndOriginScoped),
            other => Err(format!("unknown autoJoinPolicy '{}'", other)),
        }
    }
}

impl fmt::Display for AutoJoinPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed media source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    /// The original URN, also used as the requester id
    pub source_id: String,
    /// Receiver application the source targets
    pub application_id: ApplicationId,
    /// Page-side client id, if the page supplied one
    pub client_id: Option<String>,
    /// Auto-join policy for existing sessions
    pub auto_join_policy: AutoJoinPolicy,
}

impl MediaSource {
    /// Parse a `cast:` source URN
    ///
    /// An invalid application id is not a parse error; it only makes
    /// [`MediaSource::selector`] return `None`.
    pub fn parse(source_id: &str) -> Result<Self> {
        let rest = source_id
            .strip_prefix(CAST_SCHEME)
            .ok_or_else(|| CastError::invalid_source(source_id, "missing 'cast:' scheme"))?;

        let (app_part, query) = match rest.split_once('?') {
            Some((app, query)) => (app, Some(query)),
            None => (rest, None),
        };

        let mut client_id = None;
        let mut auto_join_policy = AutoJoinPolicy::default();

        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "clientId" if !value.is_empty() => client_id = Some(value.to_string()),
                "autoJoinPolicy" => {
                    auto_join_policy = value
                        .parse()
                        .map_err(|reason: String| CastError::invalid_source(source_id, reason))?;
                }
                _ => {
                    tracing::debug!("Ignoring source parameter '{}' in {}", key, source_id);
                }
            }
        }

        Ok(Self {
            source_id: source_id.to_string(),
            application_id: ApplicationId::new(app_part),
            client_id,
            auto_join_policy,
        })
    }

    /// Requester id used when this source observes sinks
    pub fn requester_id(&self) -> RequesterId {
        RequesterId::new(self.source_id.clone())
    }

    /// Platform selector for the source's application, if resolvable
    pub fn selector(&self) -> Option<SinkSelector> {
        self.application_id.selector()
    }
}

impl FromStr for MediaSource {
    type Err = CastError;

    fn from_str(s: &str) -> Result<Self> {
        MediaSource::parse(s)
    }
}
