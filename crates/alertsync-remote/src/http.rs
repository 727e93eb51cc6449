//! Backend speaking a Grafana-style alert rule provisioning API
//!
//! | Operation     | Request                        |
//! |---------------|--------------------------------|
//! | `list_rules`  | `GET {rules_path}`             |
//! | `get_rule`    | `GET {rules_path}/{uid}`       |
//! | `upsert_rule` | `PUT {rules_path}/{uid}`       |
//! | `delete_rule` | `DELETE {rules_path}/{uid}`    |
//!
//! Status mapping: 404 is `NotFound`, 409 and 412 are `Conflict`, 5xx is a
//! retried transport error and any other 4xx is `Rejected`.

use async_trait::async_trait;
use reqwest::header::{
    ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, IF_MATCH, IF_NONE_MATCH,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tokio::time::Instant;

use alertsync_model::AlertRule;

use crate::backend::{Precondition, RemoteRule, RuleBackend};
use crate::{BackendConfig, RemoteError, Result, RetryPolicy, TransportKind};

const ORG_ID_HEADER: HeaderName = HeaderName::from_static("x-grafana-org-id");

/// Longest error body excerpt kept in error messages
const MAX_BODY_EXCERPT: usize = 200;

/// HTTP client for one alerting backend and organization
pub struct HttpBackend {
    client: Client,
    collection: Url,
    retry: RetryPolicy,
}

impl HttpBackend {
    /// Build a backend from connection settings.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Config` if the base URL is not an absolute
    /// http(s) URL or the token cannot be sent as a header.
    pub fn new(config: &BackendConfig, retry: RetryPolicy) -> Result<Self> {
        let collection = Url::parse(&config.collection_url())
            .map_err(|e| RemoteError::Config(format!("invalid backend URL: {e}")))?;
        if !matches!(collection.scheme(), "http" | "https") {
            return Err(RemoteError::Config(format!(
                "unsupported URL scheme '{}'",
                collection.scheme()
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = config.token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                RemoteError::Config("token contains characters not allowed in a header".into())
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        if let Some(org_id) = config.org_id {
            headers.insert(ORG_ID_HEADER, HeaderValue::from(org_id));
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .user_agent(concat!("alertsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Config(format!("failed to build HTTP client: {e}")))?;

        tracing::debug!(url = %collection, org_id = ?config.org_id, "Configured HTTP backend");

        Ok(Self {
            client,
            collection,
            retry,
        })
    }

    fn rule_url(&self, uid: &str) -> Result<Url> {
        let mut url = self.collection.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Config(format!("cannot append to {}", self.collection)))?
            .push(uid);
        Ok(url)
    }

    async fn list_once(&self) -> Result<Vec<RemoteRule>> {
        let response = send(self.client.get(self.collection.clone())).await?;
        let response = check_status(response, None).await?;
        decode(response).await
    }

    async fn get_once(&self, uid: &str) -> Result<RemoteRule> {
        let response = send(self.client.get(self.rule_url(uid)?)).await?;
        let response = check_status(response, Some(uid)).await?;
        decode(response).await
    }

    async fn upsert_once(&self, rule: &AlertRule, precondition: Precondition) -> Result<()> {
        let mut request = self.client.put(self.rule_url(&rule.uid)?).json(rule);
        request = match precondition {
            Precondition::Unconditional => request,
            Precondition::MustNotExist => request.header(IF_NONE_MATCH, "*"),
            Precondition::Version(version) => request.header(IF_MATCH, format!("\"{version}\"")),
        };
        let response = send(request).await?;
        check_status(response, Some(&rule.uid)).await?;
        Ok(())
    }

    async fn delete_once(&self, uid: &str) -> Result<()> {
        let response = send(self.client.delete(self.rule_url(uid)?)).await?;
        check_status(response, Some(uid)).await?;
        Ok(())
    }
}

#[async_trait]
impl RuleBackend for HttpBackend {
    async fn list_rules(&self, deadline: Instant) -> Result<Vec<RemoteRule>> {
        let this = self;
        let rules = self
            .retry
            .run("list_rules", deadline, || async move { this.list_once().await })
            .await?;
        tracing::debug!(count = rules.len(), "Listed remote rules");
        Ok(rules)
    }

    async fn get_rule(&self, uid: &str, deadline: Instant) -> Result<RemoteRule> {
        let this = self;
        self.retry
            .run("get_rule", deadline, || async move { this.get_once(uid).await })
            .await
    }

    async fn upsert_rule(
        &self,
        rule: &AlertRule,
        precondition: Precondition,
        deadline: Instant,
    ) -> Result<()> {
        let this = self;
        self.retry
            .run("upsert_rule", deadline, || async move {
                this.upsert_once(rule, precondition).await
            })
            .await
    }

    async fn delete_rule(&self, uid: &str, deadline: Instant) -> Result<()> {
        let this = self;
        self.retry
            .run("delete_rule", deadline, || async move { this.delete_once(uid).await })
            .await
    }
}

async fn send(request: RequestBuilder) -> Result<Response> {
    request.send().await.map_err(|e| transport_error(&e))
}

fn transport_error(err: &reqwest::Error) -> RemoteError {
    let kind = if err.is_timeout() {
        TransportKind::Timeout
    } else {
        TransportKind::Connection
    };
    // reqwest includes the full URL in its message; keep only host and path
    let target = err
        .url()
        .map(|u| format!("{}{}", u.host_str().unwrap_or_default(), u.path()))
        .unwrap_or_default();
    let message = if err.is_timeout() {
        format!("request to {target} timed out")
    } else {
        format!("request to {target} failed: {}", root_cause(err))
    };
    RemoteError::Transport { kind, message }
}

fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

async fn check_status(response: Response, uid: Option<&str>) -> Result<Response> {
    let status = response.status();
    tracing::debug!(url = %response.url().path(), %status, "Backend responded");
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = excerpt(&body, status);
    let uid = uid.unwrap_or("<collection>").to_string();

    Err(match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound { uid },
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
            RemoteError::Conflict { uid, message }
        }
        s if s.is_server_error() => RemoteError::server_error(s.as_u16(), message),
        s => RemoteError::Rejected {
            status: s.as_u16(),
            message,
        },
    })
}

/// First part of an error body, or the status reason when empty
fn excerpt(body: &str, status: StatusCode) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(&e))?;
    serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(e.to_string()))
}
