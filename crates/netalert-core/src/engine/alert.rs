//! Lifecycle of plain network alerts

use super::{
    AlertEngine, Annotations, Outcome, Phase, Warning, WarningKind, attached, require_id,
};
use crate::config::AlertConfig;
use crate::error::Result;
use crate::model::FilterSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Last known state of a network alert
///
/// Snapshots are owned by the caller between steps. An empty `id` means the
/// alert is not (or no longer) tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSnapshot {
    pub id: String,
    pub name: String,
    pub networks: Vec<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub enabled: bool,

    #[serde(default)]
    pub triggers: Vec<String>,

    #[serde(default)]
    pub notifiers: Vec<String>,

    #[serde(default)]
    pub slack_notifications: Vec<String>,

    /// Creation timestamp as reported by the remote service
    #[serde(default)]
    pub created_at: String,
}

impl AlertSnapshot {
    /// A snapshot carrying only an id; the next read fills in the rest
    pub fn imported(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn is_tracked(&self) -> bool {
        !self.id.is_empty()
    }

    pub(super) fn annotations(&self) -> Annotations {
        Annotations::new(&self.triggers, &self.notifiers, &self.slack_notifications)
    }
}

fn desired_annotations(config: &AlertConfig) -> Annotations {
    Annotations::new(&config.triggers, &config.notifiers, &config.slack_notifications)
}

impl AlertEngine {
    /// Create an alert and attach its triggers and notifiers
    ///
    /// The create call is the only fatal step. Annotation failures come back
    /// as warnings next to a snapshot that already carries the new id.
    pub async fn create_alert(&self, config: &AlertConfig) -> Result<Outcome<AlertSnapshot>> {
        config.validate()?;

        self.transition(None, Phase::Absent, Phase::Creating);

        let filters = FilterSet::networks(config.networks.iter().cloned());
        let record = match self.client.create(&config.name, &filters).await {
            Ok(record) => record,
            Err(e) => {
                self.transition(None, Phase::Creating, Phase::Absent);
                return Err(e);
            }
        };

        let mut warnings = Vec::new();
        let failed = self
            .attach_annotations(&record.id, &desired_annotations(config), &mut warnings)
            .await;

        let snapshot = AlertSnapshot {
            id: record.id,
            name: config.name.clone(),
            networks: config.networks.clone(),
            description: config.description.clone(),
            tags: config.tags.clone(),
            enabled: config.enabled.unwrap_or(true),
            triggers: attached(&config.triggers, &failed.triggers),
            notifiers: attached(&config.notifiers, &failed.notifiers),
            slack_notifications: attached(
                &config.slack_notifications,
                &failed.slack_notifications,
            ),
            created_at: record.created,
        };

        self.transition(Some(&snapshot.id), Phase::Creating, Phase::Present);
        Ok(Outcome::new(snapshot, warnings))
    }

    /// Refresh a snapshot from the remote service
    ///
    /// Name, networks, creation time and the enabled flag are taken from the
    /// remote record. Triggers and notifiers keep their local values, which
    /// only ever list what attached successfully.
    ///
    /// # Returns
    ///
    /// - `Err(Error::AlertNotFound)`: The alert no longer exists remotely
    pub async fn read_alert(&self, prior: &AlertSnapshot) -> Result<AlertSnapshot> {
        let id = require_id(&prior.id, "read")?;
        let record = self.client.fetch(id).await?;

        let mut snapshot = prior.clone();
        if !record.name.is_empty() {
            snapshot.name = record.name;
        }
        if !record.filters.is_empty() {
            snapshot.networks = record.filters.ip;
        }
        snapshot.created_at = record.created;
        snapshot.enabled = record.has_triggers;

        debug!(alert_id = %id, "Read alert");
        Ok(snapshot)
    }

    /// Converge an existing alert on `desired`
    ///
    /// - Changed networks are replaced wholesale; a failure here aborts.
    /// - Triggers and notifiers new relative to `prior` are attached.
    /// - Dropped triggers and notifiers, and a changed name, are reported as
    ///   warnings because the remote API cannot apply them.
    ///
    /// There is no read-back. The returned snapshot keeps the remote name,
    /// so a rename is warned about on every update until the configuration
    /// goes back to it or the alert is recreated. Annotations that failed to
    /// attach are left out of the snapshot and retried by the next update.
    pub async fn update_alert(
        &self,
        prior: &AlertSnapshot,
        desired: &AlertConfig,
    ) -> Result<Outcome<AlertSnapshot>> {
        let id = require_id(&prior.id, "update")?;
        desired.validate()?;

        self.transition(Some(id), Phase::Present, Phase::Updating);
        let result = self.apply_alert_update(id, prior, desired).await;
        self.transition(Some(id), Phase::Updating, Phase::Present);

        result
    }

    async fn apply_alert_update(
        &self,
        id: &str,
        prior: &AlertSnapshot,
        desired: &AlertConfig,
    ) -> Result<Outcome<AlertSnapshot>> {
        let mut warnings = Vec::new();

        if desired.networks != prior.networks {
            let filters = FilterSet::networks(desired.networks.iter().cloned());
            self.client.replace_filters(id, &filters).await?;
        }

        if desired.name != prior.name {
            self.record_warning(
                id,
                &mut warnings,
                Warning::new(
                    WarningKind::RenameNotApplied,
                    id,
                    format!(
                        "remote name stays {:?}; recreate the alert to use {:?}",
                        prior.name, desired.name
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

        let snapshot = AlertSnapshot {
            id: prior.id.clone(),
            name: prior.name.clone(),
            networks: desired.networks.clone(),
            description: desired.description.clone(),
            tags: desired.tags.clone(),
            enabled: desired.enabled.unwrap_or(prior.enabled),
            triggers: attached(&desired.triggers, &failed.triggers),
            notifiers: attached(&desired.notifiers, &failed.notifiers),
            slack_notifications: attached(
                &desired.slack_notifications,
                &failed.slack_notifications,
            ),
            created_at: prior.created_at.clone(),
        };

        info!(alert_id = %id, warnings = warnings.len(), "Updated alert");
        Ok(Outcome::new(snapshot, warnings))
    }

    /// Delete an alert; an alert that is already gone counts as deleted
    pub async fn delete_alert(&self, prior: &AlertSnapshot) -> Result<()> {
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

    /// Start tracking an existing alert by id
    ///
    /// Nothing is dispatched; existence is checked by the next read.
    pub fn import_alert(&self, id: &str) -> Result<AlertSnapshot> {
        let id = require_id(id.trim(), "import")?;
        Ok(AlertSnapshot::imported(id))
    }
}
