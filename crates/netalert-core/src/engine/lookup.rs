//! Read-only lookups by id or domain

use super::AlertEngine;
use crate::error::Result;
use crate::model::{AlertRecord, DomainInfo};
use serde::{Deserialize, Serialize};

/// Flattened view of a remote alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub id: String,
    pub name: String,

    /// First monitored network, if any
    pub network: Option<String>,

    pub networks: Vec<String>,
    pub enabled: bool,

    /// Names of the enabled triggers, sorted
    pub triggers: Vec<String>,

    pub created_at: String,
}

impl From<AlertRecord> for AlertSummary {
    fn from(record: AlertRecord) -> Self {
        let triggers = record.trigger_names();
        Self {
            network: record.filters.ip.first().cloned(),
            networks: record.filters.ip,
            id: record.id,
            name: record.name,
            enabled: record.has_triggers,
            triggers,
            created_at: record.created,
        }
    }
}

impl AlertEngine {
    /// Look up an alert by id without tracking it
    pub async fn describe_alert(&self, id: &str) -> Result<AlertSummary> {
        let record = self.client.fetch(id.trim()).await?;
        Ok(AlertSummary::from(record))
    }

    /// Look up what the remote service knows about a domain
    pub async fn describe_domain(&self, domain: &str) -> Result<DomainInfo> {
        self.client.domain_info(domain.trim()).await
    }
}
