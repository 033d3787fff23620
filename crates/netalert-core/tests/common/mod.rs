//! Test doubles and common utilities for contract tests
//!
//! `FakeRemote` emulates the alert API in memory: it assigns ids, stores
//! alerts, answers 404 for unknown ids, and records every call with the
//! (paused) clock reading at which it arrived.

#![allow(dead_code)]

use netalert_core::config::EngineConfig;
use netalert_core::engine::{AlertEngine, ReconcileEvent};
use netalert_core::error::{Error, Result};
use netalert_core::traits::{ApiRequest, ApiResponse, Method, NameResolver, Transport};
use netalert_core::{AlertClient, Dispatcher, Throttle};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

pub const TEST_API_KEY: &str = "test_key";

/// One request as seen by the fake remote
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub at: Instant,
}

/// An alert as stored by the fake remote
#[derive(Debug, Clone, Default)]
pub struct StoredAlert {
    pub name: String,
    pub networks: Vec<String>,
    pub triggers: BTreeSet<String>,
    pub notifiers: BTreeSet<String>,
    pub created: String,
}

impl StoredAlert {
    fn to_json(&self, id: &str) -> Value {
        let triggers: serde_json::Map<String, Value> = self
            .triggers
            .iter()
            .map(|t| (t.clone(), json!({})))
            .collect();

        json!({
            "id": id,
            "name": self.name,
            "created": self.created,
            "triggers": triggers,
            "has_triggers": !self.triggers.is_empty(),
            "expires": 0,
            "expiration": null,
            "filters": {"ip": self.networks},
            "size": self.networks.len(),
        })
    }
}

struct Failure {
    method: Method,
    path_fragment: String,
    status: u16,
    body: String,
}

#[derive(Default)]
struct RemoteState {
    next_id: usize,
    alerts: BTreeMap<String, StoredAlert>,
    domains: HashMap<String, Value>,
    failures: Vec<Failure>,
    calls: Vec<RecordedCall>,
}

/// In-memory emulation of the alert API
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<RemoteState>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer matching requests with `status` and `body` instead of serving them
    pub fn fail_on(&self, method: Method, path_fragment: &str, status: u16, body: &str) {
        self.state.lock().unwrap().failures.push(Failure {
            method,
            path_fragment: path_fragment.to_string(),
            status,
            body: body.to_string(),
        });
    }

    /// Stop injecting failures
    pub fn clear_failures(&self) {
        self.state.lock().unwrap().failures.clear();
    }

    /// Seed an alert that exists before the test starts
    pub fn seed_alert(&self, id: &str, alert: StoredAlert) {
        self.state
            .lock()
            .unwrap()
            .alerts
            .insert(id.to_string(), alert);
    }

    pub fn seed_domain_info(&self, domain: &str, info: Value) {
        self.state
            .lock()
            .unwrap()
            .domains
            .insert(domain.to_string(), info);
    }

    pub fn alert(&self, id: &str) -> Option<StoredAlert> {
        self.state.lock().unwrap().alerts.get(id).cloned()
    }

    pub fn alert_count(&self) -> usize {
        self.state.lock().unwrap().alerts.len()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls with the given method whose path contains `fragment`
    pub fn calls_matching(&self, method: Method, fragment: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path.contains(fragment))
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    fn serve(state: &mut RemoteState, request: &ApiRequest) -> ApiResponse {
        let segments: Vec<&str> = request.path.trim_start_matches('/').split('/').collect();

        match (request.method, segments.as_slice()) {
            (Method::Post, ["shodan", "alert"]) => {
                let body = request.body.clone().unwrap_or(Value::Null);
                state.next_id += 1;
                let id = format!("ALERT{:04}", state.next_id);
                let alert = StoredAlert {
                    name: body["name"].as_str().unwrap_or_default().to_string(),
                    networks: networks_of(&body),
                    triggers: BTreeSet::new(),
                    notifiers: BTreeSet::new(),
                    created: format!("2024-03-01T12:00:{:02}.000000", state.next_id),
                };
                let response = alert.to_json(&id);
                state.alerts.insert(id, alert);
                ok(response)
            }
            (Method::Get, ["shodan", "alert", id, "info"]) => match state.alerts.get(*id) {
                Some(alert) => ok(alert.to_json(id)),
                None => not_found(),
            },
            (Method::Post, ["shodan", "alert", id]) => match state.alerts.get_mut(*id) {
                Some(alert) => {
                    let body = request.body.clone().unwrap_or(Value::Null);
                    alert.networks = networks_of(&body);
                    ok(alert.to_json(id))
                }
                None => not_found(),
            },
            (Method::Delete, ["shodan", "alert", id]) => match state.alerts.remove(*id) {
                Some(_) => ok(json!({"success": true})),
                None => not_found(),
            },
            (Method::Put, ["shodan", "alert", id, "trigger", trigger]) => {
                match state.alerts.get_mut(*id) {
                    Some(alert) => {
                        alert.triggers.insert(trigger.to_string());
                        ok(json!({"success": true}))
                    }
                    None => not_found(),
                }
            }
            (Method::Put, ["shodan", "alert", id, "notifier", notifier]) => {
                match state.alerts.get_mut(*id) {
                    Some(alert) => {
                        alert.notifiers.insert(notifier.to_string());
                        ok(json!({"success": true}))
                    }
                    None => not_found(),
                }
            }
            (Method::Get, ["dns", "domain", domain]) => match state.domains.get(*domain) {
                Some(info) => ok(info.clone()),
                None => ApiResponse::new(404, r#"{"error": "No information available"}"#),
            },
            _ => ApiResponse::new(400, r#"{"error": "Invalid request"}"#),
        }
    }
}

fn networks_of(body: &Value) -> Vec<String> {
    body["filters"]["ip"]
        .as_array()
        .map(|ips| {
            ips.iter()
                .filter_map(|ip| ip.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn ok(body: Value) -> ApiResponse {
    ApiResponse::new(200, body.to_string())
}

fn not_found() -> ApiResponse {
    ApiResponse::new(404, r#"{"error": "Alert not found"}"#)
}

#[async_trait::async_trait]
impl Transport for FakeRemote {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut state = self.state.lock().unwrap();

        state.calls.push(RecordedCall {
            method: request.method,
            path: request.path.clone(),
            body: request.body.clone(),
            at: Instant::now(),
        });

        if request.query_param("key") != Some(TEST_API_KEY) {
            return Ok(ApiResponse::new(401, r#"{"error": "Invalid API key"}"#));
        }

        if let Some(failure) = state
            .failures
            .iter()
            .find(|f| f.method == request.method && request.path.contains(&f.path_fragment))
        {
            return Ok(ApiResponse::new(failure.status, failure.body.clone()));
        }

        Ok(Self::serve(&mut state, &request))
    }

    fn transport_name(&self) -> &'static str {
        "fake-remote"
    }
}

/// Resolver answering from a fixed table
#[derive(Default)]
pub struct StaticResolver {
    answers: HashMap<String, Vec<IpAddr>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, domain: &str, addresses: &[[u8; 4]]) -> Self {
        self.answers.insert(
            domain.to_string(),
            addresses.iter().map(|a| IpAddr::from(*a)).collect(),
        );
        self
    }
}

#[async_trait::async_trait]
impl NameResolver for StaticResolver {
    async fn lookup(&self, domain: &str) -> Result<Vec<IpAddr>> {
        self.answers
            .get(domain)
            .cloned()
            .ok_or_else(|| Error::resolution(domain, "no such host"))
    }
}

/// Build an engine over the fake remote with a one-second throttle
pub fn engine_with(
    remote: Arc<FakeRemote>,
    resolver: StaticResolver,
) -> (AlertEngine, mpsc::Receiver<ReconcileEvent>) {
    engine_on_throttle(remote, resolver, Throttle::new(1))
}

pub fn engine_on_throttle(
    remote: Arc<FakeRemote>,
    resolver: StaticResolver,
    throttle: Throttle,
) -> (AlertEngine, mpsc::Receiver<ReconcileEvent>) {
    let client = AlertClient::new(TEST_API_KEY, Dispatcher::new(remote, throttle))
        .expect("client construction succeeds");

    AlertEngine::new(client, Arc::new(resolver), EngineConfig::default())
        .expect("engine construction succeeds")
}

/// Everything emitted so far
pub fn drain_events(rx: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
