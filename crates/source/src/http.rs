//! `reqwest`-backed [`UpstreamApi`].

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use tmplsync_core::config::UpstreamConfig;
use tmplsync_core::{DateWindow, ExternalId, RawTemplate};

use crate::api::UpstreamApi;
use crate::error::SourceError;

/// HTTP client for the template-management service.
///
/// A single `reqwest::Client` is shared across calls (connection pooling);
/// the per-request timeout comes from [`UpstreamConfig::timeout`].
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    templates_url: String,
    existing_ids_url: String,
    login_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    login_user: LoginUser,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    token: Option<String>,
}

impl HttpUpstream {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            templates_url: config.templates_url.clone(),
            existing_ids_url: config.existing_ids_url.clone(),
            login_url: config.login_url.clone(),
        })
    }

    /// Authenticated GET returning the decoded JSON array.
    async fn get_array(
        &self,
        url: &str,
        token: Option<&str>,
        window: &DateWindow,
    ) -> Result<Vec<Value>, SourceError> {
        let mut request = self.client.get(url).query(&window.query());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        debug!(url = %url, window = %window, authenticated = token.is_some(), "upstream GET");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        match response.json::<Value>().await? {
            Value::Array(items) => Ok(items),
            other => Err(SourceError::Decode(format!(
                "{url} returned {} instead of an array",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Decode each record independently, separating successes from rejects.
///
/// One malformed record never blocks the rest of the batch.
pub fn parse_records(items: Vec<Value>) -> (Vec<RawTemplate>, Vec<(usize, serde_json::Error)>) {
    let mut records = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawTemplate>(item) {
            Ok(record) => records.push(record),
            Err(e) => rejected.push((index, e)),
        }
    }

    (records, rejected)
}

/// Identifiers may arrive as strings or numbers; anything else is skipped.
pub fn parse_ids(items: Vec<Value>) -> Vec<ExternalId> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            other => {
                warn!(value = %other, "skipping non-scalar existing id");
                None
            }
        })
        .collect()
}

#[async_trait]
impl UpstreamApi for HttpUpstream {
    async fn login(&self, username: &str, password: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .post(&self.login_url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Login(format!("{} returned {status}: {body}", self.login_url)));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Login(format!("unreadable login response: {e}")))?;

        body.login_user
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SourceError::Login("login response carried no token".into()))
    }

    async fn templates(
        &self,
        token: Option<&str>,
        window: &DateWindow,
    ) -> Result<Vec<RawTemplate>, SourceError> {
        let items = self.get_array(&self.templates_url, token, window).await?;
        let (records, rejected) = parse_records(items);
        for (index, error) in &rejected {
            warn!(index, error = %error, "skipping malformed upstream template");
        }
        Ok(records)
    }

    async fn existing_ids(
        &self,
        token: Option<&str>,
        window: &DateWindow,
    ) -> Result<Vec<ExternalId>, SourceError> {
        let items = self.get_array(&self.existing_ids_url, token, window).await?;
        Ok(parse_ids(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_records_partial_success() {
        let items = vec![
            json!({ "id": "A", "name": "First" }),
            json!({ "name": "no id" }),
            json!("not an object"),
            json!({ "id": 7, "questions": null }),
        ];

        let (records, rejected) = parse_records(items);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "A");
        assert_eq!(records[1].id, "7");
        assert_eq!(rejected.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn parse_ids_accepts_strings_and_numbers() {
        let ids = parse_ids(vec![json!("A"), json!(12), json!(null), json!({ "id": "B" }), json!("")]);
        assert_eq!(ids, vec!["A".to_string(), "12".to_string()]);
    }

    #[test]
    fn login_response_shape() {
        let body: LoginResponse =
            serde_json::from_value(json!({ "loginUser": { "token": "abc", "name": "svc" } })).unwrap();
        assert_eq!(body.login_user.token.as_deref(), Some("abc"));
    }

    #[test]
    fn from_config_keeps_urls() {
        let config = UpstreamConfig {
            templates_url: "http://upstream/templates".into(),
            existing_ids_url: "http://upstream/templates/external-ids".into(),
            login_url: "http://upstream/login".into(),
            username: None,
            password: None,
            timeout_secs: 5,
        };
        let api = HttpUpstream::from_config(&config).unwrap();
        assert_eq!(api.templates_url, "http://upstream/templates");
        assert_eq!(api.login_url, "http://upstream/login");
    }
}
