//! Remote alert client
//!
//! [`AlertClient`] issues the alert lifecycle operations (create, fetch,
//! replace filters, delete) and the annotation operations (add trigger, add
//! notifier). Each method is one HTTP exchange through the [`Dispatcher`];
//! nothing here retries.
//!
//! ## Status handling
//!
//! | Operation       | Success  | Special case                 |
//! |-----------------|----------|------------------------------|
//! | create          | 200      |                              |
//! | fetch           | 200      | 404 -> `Error::AlertNotFound` |
//! | replace filters | 200      |                              |
//! | delete          | 200, 404 | already gone counts as done  |
//! | add trigger     | 200      |                              |
//! | add notifier    | 200      |                              |
//!
//! Every other status becomes `Error::Remote` with the raw body attached.
//!
//! ## Annotations are append-only
//!
//! The remote API has no verb to detach a trigger or notifier. From this
//! client's point of view the trigger and notifier sets of an alert only grow.

use crate::config::ClientConfig;
use crate::dispatch::{Dispatcher, Throttle};
use crate::error::{Error, Operation, Result};
use crate::model::{AlertRecord, CreateAlertBody, DomainInfo, FilterSet, ReplaceFiltersBody};
use crate::traits::{ApiRequest, ApiResponse, CREDENTIAL_PARAM, Method, Transport};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Client for the remote alert API
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
#[derive(Clone)]
pub struct AlertClient {
    /// API key, sent as the `key` query parameter
    /// ⚠️ NEVER log this value
    api_key: String,

    dispatcher: Dispatcher,

    /// Fired by the owner to abandon in-flight and queued requests
    cancel: CancellationToken,
}

impl fmt::Debug for AlertClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertClient")
            .field("api_key", &"<REDACTED>")
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

impl AlertClient {
    /// Create a client over an existing dispatcher
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: If the API key is empty
    pub fn new(api_key: impl Into<String>, dispatcher: Dispatcher) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::config("API key cannot be empty"));
        }

        Ok(Self {
            api_key,
            dispatcher,
            cancel: CancellationToken::new(),
        })
    }

    /// Create a client with its own throttle built from configuration
    pub fn from_config(config: &ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let throttle = Throttle::new(config.rate_limit_secs());
        Self::new(config.api_key.clone(), Dispatcher::new(transport, throttle))
    }

    /// Use `token` to abandon this client's requests
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Create a new alert
    ///
    /// The response body is authoritative for the new id and creation time.
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /shodan/alert?key=<key>
    /// {"name": "...", "filters": {"ip": [...]}}
    /// ```
    pub async fn create(&self, name: &str, filters: &FilterSet) -> Result<AlertRecord> {
        if name.is_empty() {
            return Err(Error::invalid_input("alert name cannot be empty"));
        }
        if filters.is_empty() {
            return Err(Error::invalid_input(format!(
                "alert {} has an empty filter set",
                name
            )));
        }

        let body = serde_json::to_value(CreateAlertBody { name, filters })?;
        let request = self.request(Method::Post, "/shodan/alert".to_string()).with_body(body);

        let response = self.send(request).await?;
        let alert: AlertRecord = expect_ok(Operation::CreateAlert, name, response)?;

        info!(alert_id = %alert.id, name = %name, "Created alert");
        Ok(alert)
    }

    /// Fetch an alert by id
    ///
    /// # Returns
    ///
    /// - `Err(Error::AlertNotFound)`: The remote service answered 404
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /shodan/alert/:id/info?key=<key>
    /// ```
    pub async fn fetch(&self, id: &str) -> Result<AlertRecord> {
        check_segment("alert ID", id)?;

        let request = self.request(Method::Get, format!("/shodan/alert/{}/info", id));
        let response = self.send(request).await?;

        if response.status == 404 {
            return Err(Error::alert_not_found(id));
        }

        expect_ok(Operation::FetchAlert, id, response)
    }

    /// Replace the filter set of an alert wholesale
    ///
    /// An empty id is rejected before anything is dispatched.
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /shodan/alert/:id?key=<key>
    /// {"filters": {"ip": [...]}}
    /// ```
    pub async fn replace_filters(&self, id: &str, filters: &FilterSet) -> Result<()> {
        check_segment("alert ID", id)?;
        if filters.is_empty() {
            return Err(Error::invalid_input(format!(
                "refusing to replace filters of alert {} with an empty set",
                id
            )));
        }

        let body = serde_json::to_value(ReplaceFiltersBody { filters })?;
        let request = self
            .request(Method::Post, format!("/shodan/alert/{}", id))
            .with_body(body);

        let response = self.send(request).await?;
        expect_status_ok(Operation::ReplaceFilters, id, response)?;

        info!(alert_id = %id, networks = filters.ip.len(), "Replaced alert filters");
        Ok(())
    }

    /// Delete an alert
    ///
    /// Deleting an alert that is already gone succeeds: the goal is absence.
    ///
    /// # API Call
    ///
    /// ```http
    /// DELETE /shodan/alert/:id?key=<key>
    /// ```
    pub async fn delete(&self, id: &str) -> Result<()> {
        check_segment("alert ID", id)?;

        let request = self.request(Method::Delete, format!("/shodan/alert/{}", id));
        let response = self.send(request).await?;

        match response.status {
            200 => {
                info!(alert_id = %id, "Deleted alert");
                Ok(())
            }
            404 => {
                debug!(alert_id = %id, "Alert already absent");
                Ok(())
            }
            status => Err(Error::remote(Operation::DeleteAlert, id, status, response.body)),
        }
    }

    /// Enable a trigger on an alert
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /shodan/alert/:id/trigger/:trigger?key=<key>
    /// ```
    pub async fn add_trigger(&self, id: &str, trigger: &str) -> Result<()> {
        check_segment("alert ID", id)?;
        check_segment("trigger name", trigger)?;

        let request = self.request(Method::Put, format!("/shodan/alert/{}/trigger/{}", id, trigger));
        let response = self.send(request).await?;
        expect_status_ok(Operation::AddTrigger, format!("{}/{}", id, trigger), response)?;

        debug!(alert_id = %id, trigger = %trigger, "Added trigger");
        Ok(())
    }

    /// Attach a notifier to an alert
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /shodan/alert/:id/notifier/:notifier?key=<key>
    /// ```
    pub async fn add_notifier(&self, id: &str, notifier_id: &str) -> Result<()> {
        check_segment("alert ID", id)?;
        check_segment("notifier ID", notifier_id)?;

        let request = self.request(
            Method::Put,
            format!("/shodan/alert/{}/notifier/{}", id, notifier_id),
        );
        let response = self.send(request).await?;
        expect_status_ok(Operation::AddNotifier, format!("{}/{}", id, notifier_id), response)?;

        debug!(alert_id = %id, notifier = %notifier_id, "Added notifier");
        Ok(())
    }

    /// Attach a Slack notifier to an alert
    ///
    /// Slack channels are ordinary notifier ids configured in the account.
    pub async fn add_slack_notifier(&self, id: &str, notifier_id: &str) -> Result<()> {
        self.add_notifier(id, notifier_id).await
    }

    /// Look up what the remote service knows about a domain
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /dns/domain/:domain?key=<key>
    /// ```
    pub async fn domain_info(&self, domain: &str) -> Result<DomainInfo> {
        check_segment("domain", domain)?;

        let request = self.request(Method::Get, format!("/dns/domain/{}", domain));
        let response = self.send(request).await?;
        expect_ok(Operation::DomainInfo, domain, response)
    }

    fn request(&self, method: Method, path: String) -> ApiRequest {
        ApiRequest::new(method, path).with_query(CREDENTIAL_PARAM, self.api_key.as_str())
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.dispatcher
            .dispatch_with_cancel(request, &self.cancel)
            .await
    }
}

/// Reject values that cannot be placed in a URL path segment as-is
fn check_segment(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::invalid_input(format!("{} cannot be empty", what)));
    }
    if value
        .chars()
        .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
    {
        return Err(Error::invalid_input(format!(
            "{} contains characters not allowed in a path: {:?}",
            what, value
        )));
    }
    Ok(())
}

fn expect_status_ok(
    operation: Operation,
    target: impl Into<String>,
    response: ApiResponse,
) -> Result<ApiResponse> {
    if response.is_ok() {
        Ok(response)
    } else {
        Err(Error::remote(operation, target, response.status, response.body))
    }
}

fn expect_ok<T: DeserializeOwned>(
    operation: Operation,
    target: impl Into<String>,
    response: ApiResponse,
) -> Result<T> {
    let response = expect_status_ok(operation, target, response)?;
    Ok(serde_json::from_str(&response.body)?)
}
