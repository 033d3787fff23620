//! Reconciliation engine
//!
//! The AlertEngine is responsible for:
//! - Turning a desired configuration into the remote calls that realize it
//! - Ordering those calls (identity first, annotations after)
//! - Deciding which failures abort an operation and which become warnings
//! - Reporting lifecycle transitions for monitoring/logging
//!
//! ## Architecture
//!
//! ```text
//!   desired config + prior snapshot
//!                │
//!                ▼
//!        ┌──────────────┐        ┌──────────────┐
//!        │ AlertEngine  │───────▶│ NameResolver │ (domain alerts)
//!        └──────────────┘        └──────────────┘
//!                │
//!                ▼
//!        ┌──────────────┐        ┌──────────────┐        ┌───────────┐
//!        │ AlertClient  │───────▶│  Dispatcher  │───────▶│ Transport │
//!        └──────────────┘        └──────────────┘        └───────────┘
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! Absent ──create──▶ Creating ──▶ Present ──update──▶ Updating ──▶ Present
//!                                    │
//!                                    └──delete──▶ Deleting ──▶ Absent
//! ```
//!
//! ## Failure policy
//!
//! Identity operations (create, fetch, replace filters, delete) abort the
//! step and leave the caller's prior snapshot untouched. Annotation
//! operations (add trigger, add notifier) never abort: once an alert id
//! exists, re-running the whole create would duplicate the alert, so a
//! failed annotation is reported as a [`Warning`] and can be repaired by a
//! later update.

mod alert;
mod domain;
mod lookup;

pub use alert::AlertSnapshot;
pub use domain::{DOMAIN_ALERT_PREFIX, DomainAlertSnapshot, domain_alert_name, parse_domain_alert_name};
pub use lookup::AlertSummary;

use crate::client::AlertClient;
use crate::config::{EngineConfig, NetalertConfig};
use crate::error::{Error, Result};
use crate::traits::{NameResolver, Transport};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Lifecycle phase of a managed alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Absent,
    Creating,
    Present,
    Updating,
    Deleting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Absent => "absent",
            Phase::Creating => "creating",
            Phase::Present => "present",
            Phase::Updating => "updating",
            Phase::Deleting => "deleting",
        };
        f.write_str(name)
    }
}

/// What a non-fatal failure was about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// add-trigger was rejected or failed
    TriggerNotAdded,
    /// add-notifier was rejected or failed
    NotifierNotAdded,
    /// add-notifier for a Slack notifier was rejected or failed
    SlackNotifierNotAdded,
    /// The alert replaced by a domain change could not be deleted
    StaleAlertNotDeleted,
    /// A trigger or notifier was dropped from the configuration but stays
    /// attached remotely
    AnnotationNotRemovable,
    /// The name changed locally; the remote API has no rename verb
    RenameNotApplied,
}

impl WarningKind {
    fn summary(&self) -> &'static str {
        match self {
            WarningKind::TriggerNotAdded => "Could not add trigger",
            WarningKind::NotifierNotAdded => "Could not add notifier",
            WarningKind::SlackNotifierNotAdded => "Could not add Slack notifier",
            WarningKind::StaleAlertNotDeleted => "Could not delete old alert",
            WarningKind::AnnotationNotRemovable => "Cannot detach from alert",
            WarningKind::RenameNotApplied => "Rename not applied",
        }
    }
}

/// A non-fatal failure reported next to a successful result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    /// The trigger, notifier, or alert the warning is about
    pub subject: String,
    pub detail: String,
}

impl Warning {
    pub fn new(kind: WarningKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind.summary(), self.subject, self.detail)
    }
}

/// A successful result plus the warnings collected on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Events emitted by the AlertEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileEvent {
    /// An alert moved between lifecycle phases
    PhaseChanged {
        /// None until the remote service has assigned an id
        alert_id: Option<String>,
        from: Phase,
        to: Phase,
    },

    /// A non-fatal failure was recorded
    Warning {
        alert_id: String,
        warning: Warning,
    },
}

/// Triggers and notifiers of one alert
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Annotations {
    pub triggers: Vec<String>,
    pub notifiers: Vec<String>,
    pub slack_notifications: Vec<String>,
}

impl Annotations {
    pub fn new(triggers: &[String], notifiers: &[String], slack_notifications: &[String]) -> Self {
        Self {
            triggers: distinct(triggers),
            notifiers: distinct(notifiers),
            slack_notifications: distinct(slack_notifications),
        }
    }

    /// Entries in `self` that `prior` does not have
    pub fn added_since(&self, prior: &Annotations) -> Annotations {
        Annotations {
            triggers: missing_from(&self.triggers, &prior.triggers),
            notifiers: missing_from(&self.notifiers, &prior.notifiers),
            slack_notifications: missing_from(
                &self.slack_notifications,
                &prior.slack_notifications,
            ),
        }
    }

    /// Entries in `prior` that `self` dropped
    pub fn removed_since(&self, prior: &Annotations) -> Annotations {
        prior.added_since(self)
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty() && self.notifiers.is_empty() && self.slack_notifications.is_empty()
    }
}

/// `values` with the entries that failed to attach left out
pub(crate) fn attached(values: &[String], failed: &[String]) -> Vec<String> {
    missing_from(values, failed)
}

fn distinct(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(value) {
            out.push(value.clone());
        }
    }
    out
}

fn missing_from(values: &[String], other: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|value| !other.contains(value))
        .cloned()
        .collect()
}

fn require_id<'a>(id: &'a str, action: &str) -> Result<&'a str> {
    if id.is_empty() {
        return Err(Error::invalid_input(format!(
            "alert ID is empty, cannot {}",
            action
        )));
    }
    Ok(id)
}

/// Reconciliation engine for alerts and domain alerts
///
/// Every entry point runs to completion on the caller's task. The only
/// point of suspension that matters for ordering is the dispatcher's
/// throttle, which serializes all engines sharing a throttle.
pub struct AlertEngine {
    client: AlertClient,

    /// Resolver for domain alerts
    resolver: Arc<dyn NameResolver>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcileEvent>,
}

impl AlertEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields
    /// reconciliation events
    pub fn new(
        client: AlertClient,
        resolver: Arc<dyn NameResolver>,
        config: EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            client,
            resolver,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Build the client and engine from a full configuration
    pub fn from_config(
        config: &NetalertConfig,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn NameResolver>,
    ) -> Result<(Self, mpsc::Receiver<ReconcileEvent>)> {
        config.validate()?;
        let client = AlertClient::from_config(&config.client, transport)?;
        Self::new(client, resolver, config.engine.clone())
    }

    pub fn client(&self) -> &AlertClient {
        &self.client
    }

    /// Attach triggers and notifiers, downgrading every failure to a warning
    ///
    /// Returns the entries that did not attach. They must stay out of the
    /// stored snapshot so the next update attempts them again.
    async fn attach_annotations(
        &self,
        alert_id: &str,
        annotations: &Annotations,
        warnings: &mut Vec<Warning>,
    ) -> Annotations {
        let mut failed = Annotations::default();
        if annotations.is_empty() {
            return failed;
        }

        for trigger in &annotations.triggers {
            if let Err(e) = self.client.add_trigger(alert_id, trigger).await {
                self.record_warning(
                    alert_id,
                    warnings,
                    Warning::new(WarningKind::TriggerNotAdded, trigger, e.to_string()),
                );
                failed.triggers.push(trigger.clone());
            }
        }

        for notifier in &annotations.notifiers {
            if let Err(e) = self.client.add_notifier(alert_id, notifier).await {
                self.record_warning(
                    alert_id,
                    warnings,
                    Warning::new(WarningKind::NotifierNotAdded, notifier, e.to_string()),
                );
                failed.notifiers.push(notifier.clone());
            }
        }

        for notifier in &annotations.slack_notifications {
            if let Err(e) = self.client.add_slack_notifier(alert_id, notifier).await {
                self.record_warning(
                    alert_id,
                    warnings,
                    Warning::new(WarningKind::SlackNotifierNotAdded, notifier, e.to_string()),
                );
                failed.slack_notifications.push(notifier.clone());
            }
        }

        failed
    }

    /// Warn about annotations dropped from the configuration
    ///
    /// Nothing is dispatched: the remote API has no detach verb.
    fn report_unremovable(
        &self,
        alert_id: &str,
        removed: &Annotations,
        warnings: &mut Vec<Warning>,
    ) {
        if removed.is_empty() {
            return;
        }

        let detail = format!(
            "remains attached to alert {}; the remote API cannot detach it",
            alert_id
        );

        let entries = removed
            .triggers
            .iter()
            .map(|t| format!("trigger {}", t))
            .chain(removed.notifiers.iter().map(|n| format!("notifier {}", n)))
            .chain(
                removed
                    .slack_notifications
                    .iter()
                    .map(|n| format!("Slack notifier {}", n)),
            );

        for subject in entries {
            self.record_warning(
                alert_id,
                warnings,
                Warning::new(WarningKind::AnnotationNotRemovable, subject, detail.clone()),
            );
        }
    }

    fn record_warning(&self, alert_id: &str, warnings: &mut Vec<Warning>, warning: Warning) {
        warn!(alert_id = %alert_id, "{}", warning);
        self.emit_event(ReconcileEvent::Warning {
            alert_id: alert_id.to_string(),
            warning: warning.clone(),
        });
        warnings.push(warning);
    }

    fn transition(&self, alert_id: Option<&str>, from: Phase, to: Phase) {
        match to {
            Phase::Present | Phase::Absent => {
                info!(alert_id = alert_id.unwrap_or("-"), %from, %to, "Alert phase changed")
            }
            _ => debug!(alert_id = alert_id.unwrap_or("-"), %from, %to, "Alert phase changed"),
        }

        self.emit_event(ReconcileEvent::PhaseChanged {
            alert_id: alert_id.map(str::to_string),
            from,
            to,
        });
    }

    /// Emit a reconciliation event
    fn emit_event(&self, event: ReconcileEvent) {
        // A full channel means the consumer is behind; drop rather than block
        // reconciliation. A closed channel means nobody is listening.
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}
