// # Embedded usage of netalert-core
//
// Runs one full lifecycle of a network alert (and optionally a domain alert)
// against the live alert API.
//
// ## Usage
//
// ```bash
// SHODAN_API_KEY=your_key \
// NETALERT_DEMO_NETWORK=198.51.100.0/24 \
// NETALERT_DEMO_DOMAIN=example.com \
// cargo run -p netalert-demos --bin embedded_usage
// ```
//
// ## Environment Variables
//
// Required:
// - `SHODAN_API_KEY`: API key
//
// Optional:
// - `SHODAN_BASE_URL`, `SHODAN_RATE_LIMIT`, `SHODAN_TIMEOUT_SECS`
// - `NETALERT_DEMO_NETWORK`: Network to monitor (default: 198.51.100.0/24)
// - `NETALERT_DEMO_DOMAIN`: Also run a domain alert lifecycle for this domain
// - `NETALERT_DEMO_TRIGGER`: Trigger to attach (default: malware)

use anyhow::{Context, Result};
use netalert_core::config::{AlertConfig, ClientConfig, DomainAlertConfig, NetalertConfig};
use netalert_core::engine::{AlertEngine, Outcome, ReconcileEvent};
use netalert_core::resolve::SystemResolver;
use netalert_transport_http::HttpTransport;
use std::env;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

fn log_warnings<T>(step: &str, outcome: &Outcome<T>) {
    for warning in &outcome.warnings {
        warn!(step, "{}", warning);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install tracing subscriber")?;

    let client_config = ClientConfig::from_env().context("invalid client configuration")?;
    let transport = HttpTransport::from_config(&client_config)?;
    let config = NetalertConfig::new(client_config);

    let (engine, mut events) =
        AlertEngine::from_config(&config, Arc::new(transport), Arc::new(SystemResolver))?;

    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ReconcileEvent::PhaseChanged { alert_id, from, to } => {
                    info!(alert_id = alert_id.as_deref().unwrap_or("-"), %from, %to, "phase");
                }
                ReconcileEvent::Warning { alert_id, warning } => {
                    warn!(alert_id = %alert_id, "{}", warning);
                }
            }
        }
    });

    let network = env::var("NETALERT_DEMO_NETWORK").unwrap_or_else(|_| "198.51.100.0/24".to_string());
    let trigger = env::var("NETALERT_DEMO_TRIGGER").unwrap_or_else(|_| "malware".to_string());

    // Plain alert: create, read, grow, delete
    let desired = AlertConfig::new("netalert demo", [network.clone()])
        .with_triggers(vec![trigger.clone()]);

    let created = engine.create_alert(&desired).await?;
    log_warnings("create", &created);
    info!(alert_id = %created.value.id, "Alert created");

    let current = engine.read_alert(&created.value).await?;
    info!(
        alert_id = %current.id,
        networks = ?current.networks,
        enabled = current.enabled,
        "Alert read back"
    );

    let grown = desired.with_triggers(vec![trigger.clone(), "open_database".to_string()]);
    let updated = engine.update_alert(&current, &grown).await?;
    log_warnings("update", &updated);

    let summary = engine.describe_alert(&updated.value.id).await?;
    info!(triggers = ?summary.triggers, "Alert triggers after update");

    engine.delete_alert(&updated.value).await?;

    // Domain alert, if a domain was given
    if let Ok(domain) = env::var("NETALERT_DEMO_DOMAIN") {
        let desired = DomainAlertConfig::new(domain.clone())
            .with_name("demo")
            .with_triggers(vec![trigger]);

        let created = engine.create_domain_alert(&desired).await?;
        log_warnings("create domain", &created);
        info!(
            alert_id = %created.value.id,
            domain = %created.value.domain,
            networks = ?created.value.networks,
            "Domain alert created"
        );

        match engine.describe_domain(&domain).await {
            Ok(info) => info!(records = info.data.len(), subdomains = info.subdomains.len(), "Domain info"),
            Err(e) => warn!(error = %e, "Domain info unavailable"),
        }

        engine.delete_domain_alert(&created.value).await?;
    }

    drop(engine);
    event_logger.await.context("event logger panicked")?;

    info!("Demo finished");
    Ok(())
}
