//! Lifecycle of domain-backed alerts
//!
//! A domain alert is an ordinary remote alert whose filters are the
//! addresses a domain resolved to at creation time, and whose name records
//! the domain:
//!
//! ```text
//! __domain: example.com
//! __domain: example.com (office mail)
//! ```
//!
//! Changing the domain replaces the remote alert: the new domain is resolved
//! first, then the old alert is deleted and a new one created.

use super::{
    AlertEngine, Annotations, Outcome, Phase, Warning, WarningKind, attached, require_id,
};
use crate::config::DomainAlertConfig;
use crate::error::{Error, Result};
use crate::model::{AlertRecord, FilterSet};
use crate::resolve::resolve_filters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Prefix of every remote alert name managed as a domain alert
pub const DOMAIN_ALERT_PREFIX: &str = "__domain: ";

/// Remote alert name for a domain and optional custom name
pub fn domain_alert_name(domain: &str, name: Option<&str>) -> String {
    match name.filter(|n| !n.is_empty()) {
        Some(name) => format!("{}{} ({})", DOMAIN_ALERT_PREFIX, domain, name),
        None => format!("{}{}", DOMAIN_ALERT_PREFIX, domain),
    }
}

/// Recover the domain and custom name from a remote alert name
///
/// Returns None if the name was not produced by [`domain_alert_name`].
pub fn parse_domain_alert_name(remote_name: &str) -> Option<(String, Option<String>)> {
    let rest = remote_name.strip_prefix(DOMAIN_ALERT_PREFIX)?;

    let (domain, name) = match rest.split_once(" (") {
        Some((domain, tail)) => {
            let name = tail.strip_suffix(')')?;
            (domain, Some(name.to_string()))
        }
        None => (rest, None),
    };

    if domain.is_empty() {
        return None;
    }
    Some((domain.to_string(), name))
}

/// Last known state of a domain-backed alert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainAlertSnapshot {
    pub id: String,
    pub domain: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    pub enabled: bool,

    #[serde(default)]
    pub triggers: Vec<String>,

    #[serde(default)]
    pub notifiers: Vec<String>,

    #[serde(default)]
    pub slack_notifications: Vec<String>,

    /// Addresses the domain resolved to when the alert was created
    #[serde(default)]
    pub networks: Vec<String>,

    #[serde(default)]
    pub created_at: String,
}

impl DomainAlertSnapshot {
    pub fn imported(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }

    fn annotations(&self) -> Annotations {
        Annotations::new(&self.triggers, &self.notifiers, &self.slack_notifications)
    }
}

fn desired_annotations(config: &DomainAlertConfig) -> Annotations {
    Annotations::new(&config.triggers, &config.notifiers, &config.slack_notifications)
}

fn same_domain(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

impl AlertEngine {
    /// Resolve, then create the remote alert; no annotations
    async fn create_domain_remote(
        &self,
        config: &DomainAlertConfig,
    ) -> Result<(AlertRecord, FilterSet)> {
        let domain = config.domain.trim();
        let filters = resolve_filters(self.resolver.as_ref(), domain).await?;
        let name = domain_alert_name(domain, config.name.as_deref());
        let record = self.client.create(&name, &filters).await?;
        Ok((record, filters))
    }

    fn domain_snapshot(
        config: &DomainAlertConfig,
        record: AlertRecord,
        filters: FilterSet,
        failed: &Annotations,
    ) -> DomainAlertSnapshot {
        DomainAlertSnapshot {
            id: record.id,
            domain: config.domain.trim().to_string(),
            name: config.name.clone(),
            description: config.description.clone(),
            enabled: config.enabled.unwrap_or(true),
            triggers: attached(&config.triggers, &failed.triggers),
            notifiers: attached(&config.notifiers, &failed.notifiers),
            slack_notifications: attached(
                &config.slack_notifications,
                &failed.slack_notifications,
            ),
            networks: filters.ip,
            created_at: record.created,
        }
    }

    /// Resolve a domain and create an alert over its addresses
    ///
    /// A domain that resolves to nothing fails before any remote call.
    pub async fn create_domain_alert(
        &self,
        config: &DomainAlertConfig,
    ) -> Result<Outcome<DomainAlertSnapshot>> {
        config.validate()?;

        self.transition(None, Phase::Absent, Phase::Creating);

        let (record, filters) = match self.create_domain_remote(config).await {
            Ok(created) => created,
            Err(e) => {
                self.transition(None, Phase::Creating, Phase::Absent);
                return Err(e);
            }
        };

        let mut warnings = Vec::new();
        let failed = self
            .attach_annotations(&record.id, &desired_annotations(config), &mut warnings)
            .await;

        let snapshot = Self::domain_snapshot(config, record, filters, &failed);
        self.transition(Some(&snapshot.id), Phase::Creating, Phase::Present);
        Ok(Outcome::new(snapshot, warnings))
    }

    /// Refresh a domain alert snapshot from the remote service
    ///
    /// Only the creation time and enabled flag are synced. A snapshot with
    /// no domain (fresh from import) recovers domain and name from the
    /// remote alert name.
    pub async fn read_domain_alert(
        &self,
        prior: &DomainAlertSnapshot,
    ) -> Result<DomainAlertSnapshot> {
        let id = require_id(&prior.id, "read")?;
        let record = self.client.fetch(id).await?;

        let mut snapshot = prior.clone();
        snapshot.created_at = record.created;
        snapshot.enabled = record.has_triggers;

        if snapshot.domain.is_empty() {
            match parse_domain_alert_name(&record.name) {
                Some((domain, name)) => {
                    snapshot.domain = domain;
                    snapshot.name = name;
                    snapshot.networks = record.filters.ip;
                }
                None => debug!(
                    alert_id = %id,
                    name = %record.name,
                    "Alert name does not carry a domain"
                ),
            }
        }

        Ok(snapshot)
    }

    /// Converge a domain alert on `desired`
    ///
    /// With the domain unchanged this behaves like a plain alert update
    /// (additive annotations, no filter change, remote name kept in the
    /// snapshot). A changed domain recreates the alert under a new id.
    ///
    /// # Returns
    ///
    /// - `Err(Error::ReplacementFailed)`: The domain changed, the old alert
    ///   was deleted and creating the new one failed. `prior.id` is gone;
    ///   the domain alert is absent and must be created again.
    pub async fn update_domain_alert(
        &self,
        prior: &DomainAlertSnapshot,
        desired: &DomainAlertConfig,
    ) -> Result<Outcome<DomainAlertSnapshot>> {
        let id = require_id(&prior.id, "update")?;
        desired.validate()?;

        if !same_domain(&prior.domain, &desired.domain) {
            return self.recreate_domain_alert(id, desired).await;
        }

        self.transition(Some(id), Phase::Present, Phase::Updating);

        let mut warnings = Vec::new();

        if desired.name != prior.name {
            self.record_warning(
                id,
                &mut warnings,
                Warning::new(
                    WarningKind::RenameNotApplied,
                    id,
                    format!(
                        "remote name stays {:?}",
                        domain_alert_name(&prior.domain, prior.name.as_deref())
                    ),
                ),
            );
        }

        let previous = prior.annotations();
        let wanted = desired_annotations(desired);

        self.report_unremovable(id, &wanted.removed_since(&previous), &mut warnings);
        let failed = self
            .attach_annotations(id, &wanted.added_since(&previous), &mut warnings)
            .await;

        let snapshot = DomainAlertSnapshot {
            id: prior.id.clone(),
            domain: prior.domain.clone(),
            name: prior.name.clone(),
            description: desired.description.clone(),
            enabled: desired.enabled.unwrap_or(prior.enabled),
            triggers: attached(&desired.triggers, &failed.triggers),
            notifiers: attached(&desired.notifiers, &failed.notifiers),
            slack_notifications: attached(
                &desired.slack_notifications,
                &failed.slack_notifications,
            ),
            networks: prior.networks.clone(),
            created_at: prior.created_at.clone(),
        };

        self.transition(Some(id), Phase::Updating, Phase::Present);
        info!(alert_id = %id, warnings = warnings.len(), "Updated domain alert");
        Ok(Outcome::new(snapshot, warnings))
    }

    /// Replace the alert of a domain that changed
    ///
    /// The new domain is resolved before anything is deleted, so a domain
    /// that does not resolve leaves the old alert in place.
    ///
    /// Once the old alert is deleted there is no way back: if the create
    /// then fails, the error is wrapped in `Error::ReplacementFailed` naming
    /// the deleted id and the alert is left absent. When the delete itself
    /// failed the old alert still exists and the create error is returned
    /// unwrapped.
    async fn recreate_domain_alert(
        &self,
        old_id: &str,
        desired: &DomainAlertConfig,
    ) -> Result<Outcome<DomainAlertSnapshot>> {
        self.transition(Some(old_id), Phase::Present, Phase::Updating);

        let domain = desired.domain.trim();
        let filters = match resolve_filters(self.resolver.as_ref(), domain).await {
            Ok(filters) => filters,
            Err(e) => {
                self.transition(Some(old_id), Phase::Updating, Phase::Present);
                return Err(e);
            }
        };

        let mut warnings = Vec::new();

        self.transition(Some(old_id), Phase::Updating, Phase::Deleting);
        let old_deleted = match self.client.delete(old_id).await {
            Ok(()) => true,
            Err(e) => {
                self.record_warning(
                    old_id,
                    &mut warnings,
                    Warning::new(WarningKind::StaleAlertNotDeleted, old_id, e.to_string()),
                );
                false
            }
        };
        self.transition(Some(old_id), Phase::Deleting, Phase::Absent);

        self.transition(None, Phase::Absent, Phase::Creating);
        let name = domain_alert_name(domain, desired.name.as_deref());
        let record = match self.client.create(&name, &filters).await {
            Ok(record) => record,
            Err(e) => {
                self.transition(None, Phase::Creating, Phase::Absent);
                if !old_deleted {
                    return Err(e);
                }
                warn!(
                    old_alert_id = %old_id,
                    domain = %domain,
                    error = %e,
                    "Old alert deleted but its replacement was not created"
                );
                return Err(Error::replacement_failed(old_id, e));
            }
        };

        let failed = self
            .attach_annotations(&record.id, &desired_annotations(desired), &mut warnings)
            .await;

        let snapshot = Self::domain_snapshot(desired, record, filters, &failed);
        self.transition(Some(&snapshot.id), Phase::Creating, Phase::Present);

        info!(
            old_alert_id = %old_id,
            alert_id = %snapshot.id,
            domain = %snapshot.domain,
            "Recreated domain alert"
        );
        Ok(Outcome::new(snapshot, warnings))
    }

    /// Delete a domain alert; an alert that is already gone counts as deleted
    pub async fn delete_domain_alert(&self, prior: &DomainAlertSnapshot) -> Result<()> {
        let id = require_id(&prior.id, "delete")?;

        self.transition(Some(id), Phase::Present, Phase::Deleting);
        match self.client.delete(id).await {
            Ok(()) => {
                self.transition(Some(id), Phase::Deleting, Phase::Absent);
                Ok(())
            }
            Err(e) => {
                self.transition(Some(id), Phase::Deleting, Phase::Present);
                Err(e)
            }
        }
    }

    /// Start tracking an existing domain alert by id
    pub fn import_domain_alert(&self, id: &str) -> Result<DomainAlertSnapshot> {
        let id = require_id(id.trim(), "import")?;
        Ok(DomainAlertSnapshot::imported(id))
    }
}
