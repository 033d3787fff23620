//! Wire model for the alert API
//!
//! These types are decoded straight from response bodies. Filters are typed
//! per kind instead of being walked as untyped JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The criteria an alert matches against
///
/// Only the `ip` kind is understood. Other kinds present in a response are
/// ignored on decode and never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// IP addresses or CIDR blocks
    #[serde(default)]
    pub ip: Vec<String>,
}

impl FilterSet {
    /// Build a filter set from a list of networks
    pub fn networks<I, S>(networks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ip: networks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ip.is_empty()
    }
}

/// An alert as reported by the remote service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Remote-assigned identifier
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Creation timestamp, verbatim from the remote service
    #[serde(default)]
    pub created: String,

    /// Enabled triggers keyed by trigger name
    #[serde(default)]
    pub triggers: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub has_triggers: bool,

    #[serde(default)]
    pub expires: i64,

    #[serde(default)]
    pub expiration: Option<serde_json::Value>,

    #[serde(default)]
    pub filters: FilterSet,

    #[serde(default)]
    pub size: u64,
}

impl AlertRecord {
    /// Names of the triggers enabled on this alert
    pub fn trigger_names(&self) -> Vec<String> {
        self.triggers.keys().cloned().collect()
    }
}

/// Body of a create request
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateAlertBody<'a> {
    pub name: &'a str,
    pub filters: &'a FilterSet,
}

/// Body of a replace-filters request
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReplaceFiltersBody<'a> {
    pub filters: &'a FilterSet,
}

/// Domain information reported by the DNS domain endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    pub domain: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub subdomains: Vec<String>,

    #[serde(default)]
    pub data: Vec<DomainRecord>,

    /// Whether the remote service has more records than it returned
    #[serde(default)]
    pub more: bool,
}

/// A single DNS record seen for a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    #[serde(default)]
    pub subdomain: String,

    #[serde(rename = "type", default)]
    pub record_type: String,

    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub last_seen: String,
}
