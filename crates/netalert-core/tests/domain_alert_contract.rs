//! Contract Test: Domain Alerts
//!
//! Constraints verified:
//! - A domain is resolved before any remote call; no addresses, no call
//! - The remote name records the domain (and custom name)
//! - A domain change replaces the alert: delete old, then create new
//! - A failed resolution on domain change leaves the old alert untouched
//! - A failed create after the old alert is deleted reports the lost id
//! - Annotations that failed to attach are retried by the next update
//! - Import recovers the domain from the remote name
//!
//! If this test fails, domain-backed alerts are broken.

mod common;

use common::*;
use netalert_core::config::DomainAlertConfig;
use netalert_core::engine::{Phase, ReconcileEvent, WarningKind};
use netalert_core::error::Error;
use netalert_core::traits::Method;

fn resolver() -> StaticResolver {
    StaticResolver::new()
        .with("example.com", &[[93, 184, 215, 14]])
        .with("example.org", &[[93, 184, 215, 34], [93, 184, 215, 35]])
        .with("empty.example", &[])
}

fn web() -> DomainAlertConfig {
    DomainAlertConfig::new("example.com")
        .with_name("web")
        .with_triggers(strings(&["malware"]))
        .with_notifiers(strings(&["default"]))
}

#[tokio::test(start_paused = true)]
async fn create_resolves_and_names_the_alert() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let outcome = engine.create_domain_alert(&web()).await.unwrap();
    let snapshot = outcome.value;

    assert!(outcome.warnings.is_empty());
    assert_eq!(snapshot.domain, "example.com");
    assert_eq!(snapshot.networks, strings(&["93.184.215.14"]));
    assert!(snapshot.enabled);

    let stored = remote.alert(&snapshot.id).unwrap();
    assert_eq!(stored.name, "__domain: example.com (web)");
    assert_eq!(stored.networks, strings(&["93.184.215.14"]));
    assert!(stored.triggers.contains("malware"));
    assert!(stored.notifiers.contains("default"));
}

#[tokio::test(start_paused = true)]
async fn zero_addresses_fail_before_any_call() {
    let remote = FakeRemote::new();
    let (engine, mut events) = engine_with(remote.clone(), resolver());

    let err = engine
        .create_domain_alert(&DomainAlertConfig::new("empty.example"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Resolution { .. }));
    assert_eq!(remote.call_count(), 0);
    assert_eq!(engine.client().dispatcher().throttle().last_dispatch().await, None);

    let phases: Vec<_> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            ReconcileEvent::PhaseChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(phases, vec![Phase::Creating, Phase::Absent]);
}

#[tokio::test(start_paused = true)]
async fn unresolvable_domain_fails_before_any_call() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let result = engine
        .create_domain_alert(&DomainAlertConfig::new("nowhere.invalid"))
        .await;

    assert!(matches!(result, Err(Error::Resolution { .. })));
    assert_eq!(remote.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn domain_change_deletes_old_then_creates_new() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    let calls_before = remote.call_count();

    let mut desired = web();
    desired.domain = "example.org".to_string();
    let outcome = engine.update_domain_alert(&created, &desired).await.unwrap();
    let updated = outcome.value;

    assert!(outcome.warnings.is_empty());
    assert_ne!(updated.id, created.id);
    assert_eq!(updated.domain, "example.org");
    assert_eq!(updated.networks, strings(&["93.184.215.34", "93.184.215.35"]));

    let calls = remote.calls();
    let replacement = &calls[calls_before..];
    assert_eq!(replacement[0].method, Method::Delete);
    assert!(replacement[0].path.ends_with(&created.id));
    assert_eq!(replacement[1].method, Method::Post);
    assert_eq!(replacement[1].path, "/shodan/alert");

    assert!(remote.alert(&created.id).is_none());
    let stored = remote.alert(&updated.id).unwrap();
    assert_eq!(stored.name, "__domain: example.org (web)");
    // The new alert carries every annotation, not just the changed ones
    assert!(stored.triggers.contains("malware"));
    assert!(stored.notifiers.contains("default"));
}

#[tokio::test(start_paused = true)]
async fn domain_change_to_unresolvable_domain_keeps_old_alert() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    let calls_before = remote.call_count();

    let mut desired = web();
    desired.domain = "empty.example".to_string();
    let err = engine.update_domain_alert(&created, &desired).await.unwrap_err();

    assert!(matches!(err, Error::Resolution { .. }));
    assert_eq!(remote.call_count(), calls_before);
    assert!(remote.alert(&created.id).is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_replacement_reports_the_deleted_id() {
    let remote = FakeRemote::new();
    let (engine, mut events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    remote.fail_on(Method::Post, "/shodan/alert", 500, "upstream failure");
    drain_events(&mut events);

    let mut desired = web();
    desired.domain = "example.org".to_string();
    let err = engine.update_domain_alert(&created, &desired).await.unwrap_err();

    match &err {
        Error::ReplacementFailed { old_id, source } => {
            assert_eq!(old_id, &created.id);
            assert_eq!(source.status(), Some(500));
        }
        other => panic!("expected ReplacementFailed, got {other:?}"),
    }
    assert_eq!(err.status(), Some(500));
    assert!(remote.alert(&created.id).is_none());
    assert_eq!(remote.alert_count(), 0);

    let last_phase = drain_events(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            ReconcileEvent::PhaseChanged { to, .. } => Some(to),
            _ => None,
        })
        .last();
    assert_eq!(last_phase, Some(Phase::Absent));
}

#[tokio::test(start_paused = true)]
async fn failed_create_after_stale_delete_failure_is_unwrapped() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    remote.fail_on(Method::Delete, &created.id, 500, "upstream failure");
    remote.fail_on(Method::Post, "/shodan/alert", 500, "upstream failure");

    let mut desired = web();
    desired.domain = "example.org".to_string();
    let err = engine.update_domain_alert(&created, &desired).await.unwrap_err();

    assert!(matches!(err, Error::Remote { .. }));
    assert!(remote.alert(&created.id).is_some());
}

#[tokio::test(start_paused = true)]
async fn stale_alert_delete_failure_is_a_warning() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    remote.fail_on(Method::Delete, &created.id, 500, "upstream failure");

    let mut desired = web();
    desired.domain = "example.org".to_string();
    let outcome = engine.update_domain_alert(&created, &desired).await.unwrap();

    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::StaleAlertNotDeleted);
    assert_eq!(outcome.warnings[0].subject, created.id);
    assert!(remote.alert(&created.id).is_some());
    assert!(remote.alert(&outcome.value.id).is_some());
}

#[tokio::test(start_paused = true)]
async fn unchanged_domain_update_is_additive() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    let calls_before = remote.call_count();

    let desired = web()
        .with_notifiers(strings(&["default", "pager"]))
        .with_slack_notifications(strings(&["slack-ops"]));
    let outcome = engine.update_domain_alert(&created, &desired).await.unwrap();

    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.value.id, created.id);

    let calls = remote.calls();
    let paths: Vec<_> = calls[calls_before..].iter().map(|c| c.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            format!("/shodan/alert/{}/notifier/pager", created.id),
            format!("/shodan/alert/{}/notifier/slack-ops", created.id),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn notifier_failed_on_create_is_attached_by_next_update() {
    let remote = FakeRemote::new();
    remote.fail_on(Method::Put, "/notifier/", 400, r#"{"error": "Invalid notifier"}"#);
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let outcome = engine.create_domain_alert(&web()).await.unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::NotifierNotAdded);
    assert!(outcome.value.notifiers.is_empty());

    remote.clear_failures();
    let current = engine.read_domain_alert(&outcome.value).await.unwrap();
    let notifier_calls_before = remote.calls_matching(Method::Put, "/notifier/").len();

    let updated = engine.update_domain_alert(&current, &web()).await.unwrap();

    assert!(updated.warnings.is_empty());
    assert_eq!(
        remote.calls_matching(Method::Put, "/notifier/").len() - notifier_calls_before,
        1
    );
    assert!(remote.alert(&current.id).unwrap().notifiers.contains("default"));
    assert_eq!(updated.value.notifiers, strings(&["default"]));
}

#[tokio::test(start_paused = true)]
async fn rename_keeps_the_remote_name_in_the_snapshot() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    let calls_before = remote.call_count();

    let desired = web().with_name("mail");
    let outcome = engine.update_domain_alert(&created, &desired).await.unwrap();

    assert_eq!(remote.call_count(), calls_before);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].kind, WarningKind::RenameNotApplied);
    assert_eq!(outcome.value.name.as_deref(), Some("web"));
    assert_eq!(
        remote.alert(&created.id).unwrap().name,
        "__domain: example.com (web)"
    );
}

#[tokio::test(start_paused = true)]
async fn domain_comparison_ignores_case() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    let calls_before = remote.call_count();

    let mut desired = web();
    desired.domain = "EXAMPLE.com".to_string();
    let outcome = engine.update_domain_alert(&created, &desired).await.unwrap();

    assert_eq!(outcome.value.id, created.id);
    assert_eq!(remote.call_count(), calls_before);
}

#[tokio::test(start_paused = true)]
async fn import_then_read_recovers_domain() {
    let remote = FakeRemote::new();
    remote.seed_alert(
        "DOMAIN01",
        StoredAlert {
            name: "__domain: example.com (office)".to_string(),
            networks: strings(&["93.184.215.14"]),
            created: "2023-11-02T08:15:00.000000".to_string(),
            ..StoredAlert::default()
        },
    );
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let imported = engine.import_domain_alert("DOMAIN01").unwrap();
    let read = engine.read_domain_alert(&imported).await.unwrap();

    assert_eq!(read.domain, "example.com");
    assert_eq!(read.name.as_deref(), Some("office"));
    assert_eq!(read.networks, strings(&["93.184.215.14"]));
    assert_eq!(read.created_at, "2023-11-02T08:15:00.000000");
    assert!(!read.enabled);
}

#[tokio::test(start_paused = true)]
async fn read_keeps_local_domain() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;
    let read = engine.read_domain_alert(&created).await.unwrap();

    assert_eq!(read.domain, created.domain);
    assert_eq!(read.name, created.name);
    assert_eq!(read.created_at, created.created_at);
    assert!(read.enabled, "the alert has a trigger attached");
}

#[tokio::test(start_paused = true)]
async fn delete_domain_alert_is_idempotent() {
    let remote = FakeRemote::new();
    let (engine, _events) = engine_with(remote.clone(), resolver());

    let created = engine.create_domain_alert(&web()).await.unwrap().value;

    tokio_test::assert_ok!(engine.delete_domain_alert(&created).await);
    tokio_test::assert_ok!(engine.delete_domain_alert(&created).await);
    assert_eq!(remote.alert_count(), 0);
}
