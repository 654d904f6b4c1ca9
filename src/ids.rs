//! Dispatch correlation ids.
//!
//! Every [`RouteMatch::dispatch`](crate::router::RouteMatch::dispatch) runs in
//! a span named by a [`DispatchId`]. Callers that already carry a correlation
//! id (an upstream `X-Request-ID`, a queue message id) pass it to
//! [`RouteMatch::dispatch_with_id`](crate::router::RouteMatch::dispatch_with_id)
//! so log lines line up across systems.

use std::fmt;
use std::str::FromStr;

use ulid::Ulid;

/// ULID-backed dispatch identifier; ids sort by creation time.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct DispatchId(Ulid);

impl DispatchId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Keep `upstream` when it is a valid ULID; otherwise mint a new id.
    pub fn parse_or_new(upstream: Option<&str>) -> Self {
        upstream
            .map(str::trim)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for DispatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for DispatchId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}
