//! Data types for Mackerel API requests and responses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role memberships of a host: service name to role names.
pub type Roles = BTreeMap<String, Vec<String>>;

/// A host registered on Mackerel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Host {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_identifier: String,
    #[serde(rename = "type")]
    pub host_type: String,
    /// One of the [`HostStatus`] values, kept as received.
    pub status: String,
    pub memo: String,
    pub roles: Roles,
    pub is_retired: bool,
    pub created_at: i64,
    pub meta: HostMeta,
    pub interfaces: Vec<Interface>,
}

/// Lifecycle status of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Working,
    Standby,
    Maintenance,
    Poweroff,
    Retired,
}

impl HostStatus {
    /// Statuses a live host can be in. Used when looking hosts up by
    /// custom identifier so retired hosts never match.
    pub const ACTIVE: [Self; 4] = [
        Self::Working,
        Self::Standby,
        Self::Maintenance,
        Self::Poweroff,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Standby => "standby",
            Self::Maintenance => "maintenance",
            Self::Poweroff => "poweroff",
            Self::Retired => "retired",
        }
    }
}

impl fmt::Display for HostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown host status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown host status: {0}")]
pub struct ParseHostStatusError(pub String);

impl FromStr for HostStatus {
    type Err = ParseHostStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(Self::Working),
            "standby" => Ok(Self::Standby),
            "maintenance" => Ok(Self::Maintenance),
            "poweroff" => Ok(Self::Poweroff),
            "retired" => Ok(Self::Retired),
            other => Err(ParseHostStatusError(other.to_string())),
        }
    }
}

/// Agent-reported host metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HostMeta {
    #[serde(rename = "agent-revision", skip_serializing_if = "String::is_empty")]
    pub agent_revision: String,
    #[serde(rename = "agent-version", skip_serializing_if = "String::is_empty")]
    pub agent_version: String,
    #[serde(rename = "agent-name", skip_serializing_if = "String::is_empty")]
    pub agent_name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub block_device: BTreeMap<String, BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cpu: Vec<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub filesystem: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub kernel: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub memory: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud: Option<Cloud>,
}

/// Cloud provider metadata attached to a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Cloud {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider: String,
    #[serde(rename = "metadata", skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// A network interface of a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Interface {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ipv6_addresses: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mac_address: String,
}

/// A check monitor reported alongside a host.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckConfig {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub memo: String,
}

/// Body of the create-host and update-host requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateHostParam {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub custom_identifier: String,
    pub meta: HostMeta,
    pub interfaces: Vec<Interface>,
    pub role_fullnames: Vec<String>,
    pub checks: Vec<CheckConfig>,
}

/// Updating a host takes the same shape as creating one.
pub type UpdateHostParam = CreateHostParam;

/// Filter for listing hosts. Empty members are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindHostsParam {
    pub service: String,
    pub roles: Vec<String>,
    pub name: String,
    pub statuses: Vec<HostStatus>,
    pub custom_identifier: String,
}

impl FindHostsParam {
    /// Query pairs in the order the API documents them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if !self.service.is_empty() {
            pairs.push(("service", self.service.as_str()));
        }
        for role in &self.roles {
            pairs.push(("role", role.as_str()));
        }
        if !self.name.is_empty() {
            pairs.push(("name", self.name.as_str()));
        }
        for status in &self.statuses {
            pairs.push(("status", status.as_str()));
        }
        if !self.custom_identifier.is_empty() {
            pairs.push(("customIdentifier", self.custom_identifier.as_str()));
        }
        pairs
    }
}

/// A single metric data point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricValue {
    pub name: String,
    /// Unix time in seconds.
    pub time: i64,
    pub value: Value,
}

/// A metric data point bound to a host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostMetricValue {
    #[serde(rename = "hostId")]
    pub host_id: String,
    #[serde(flatten)]
    pub metric: MetricValue,
}

/// A graph definition for a family of custom metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphDefsParam {
    pub name: String,
    pub display_name: String,
    pub unit: String,
    pub metrics: Vec<GraphDefsMetric>,
}

/// One metric line within a graph definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphDefsMetric {
    pub name: String,
    pub display_name: String,
    pub is_stacked: bool,
}

/// Response from the host detail endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HostResponse {
    pub host: Host,
}

/// Response from the host list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HostsResponse {
    #[serde(default)]
    pub hosts: Vec<Host>,
}

/// Response from the create/update host endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct HostIdResponse {
    pub id: String,
}
