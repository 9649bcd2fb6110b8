use serde::{Deserialize, Serialize};

use crate::Protocol;

/// What the redirector should do with traffic addressed to a route's virtual IP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// Send matching connections to the local proxy.
    #[default]
    Redirect,
    /// Resolve the name but leave the traffic alone.
    DontRedirect,
}

/// A single virtual name → real endpoint entry of a route table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Virtual DNS name (e.g. `"web.default.svc.cluster.local"`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub proto: Protocol,
    /// Virtual address the name resolves to on this workstation.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip: String,
    /// Comma separated port list, empty means every port.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub port: String,
    /// Real endpoint (`host:port`) the proxy forwards to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(default)]
    pub action: RouteAction,
}

impl Route {
    /// Returns `true` if `name` refers to this route, ignoring case and the trailing dot.
    pub fn matches_name(&self, name: &str) -> bool {
        if self.name.is_empty() {
            return false;
        }
        let lhs = self.name.trim_end_matches('.');
        let rhs = name.trim_end_matches('.');
        lhs.eq_ignore_ascii_case(rhs)
    }

    /// Returns `true` if connections to this route must go through the proxy.
    #[inline]
    pub fn is_redirect(&self) -> bool {
        self.action == RouteAction::Redirect && !self.ip.is_empty()
    }
}
