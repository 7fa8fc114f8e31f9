//! DNSPod API client.
//!
//! DNSPod speaks form-encoded POST requests and answers JSON with a status
//! envelope (`code == "1"` means success). Responses are not always
//! schema-consistent, so every record field tolerates absence and numeric
//! fields may arrive as strings or numbers.


use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://dnsapi.cn";

/// Parameters sent with every DNSPod request: authentication plus the
/// locale/formatting flags the API expects.
#[derive(Debug, Clone)]
pub struct CommonParams {
    pub login_token: String,
    pub format: String,
    pub lang: String,
    pub error_on_empty: String,
    pub domain: String,
    /// Preferred over `domain` when known.
    pub domain_id: Option<i64>,
}

impl CommonParams {
    pub(crate) fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![("login_token".to_string(), self.login_token.clone())];
        if !self.format.is_empty() {
            form.push(("format".to_string(), self.format.clone()));
        }
        if !self.lang.is_empty() {
            form.push(("lang".to_string(), self.lang.clone()));
        }
        if !self.error_on_empty.is_empty() {
            form.push(("error_on_empty".to_string(), self.error_on_empty.clone()));
        }
        match self.domain_id {
            Some(id) => form.push(("domain_id".to_string(), id.to_string())),
            None => form.push(("domain".to_string(), self.domain.clone())),
        }
        form
    }
}

/// The status envelope present on every DNSPod response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// A DNS record as DNSPod reports it. All fields are optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordData {
    #[serde(default, deserialize_with = "de_loose_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub line: String,
    #[serde(default, deserialize_with = "de_loose_string")]
    pub line_id: String,
    #[serde(default, deserialize_with = "de_loose_string")]
    pub ttl: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordInfoResponse {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub record: RecordData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordListResponse {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub records: Vec<RecordData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordModifyResponse {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub record: RecordData,
}

/// Fallback shape when a response does not match the expected schema.
#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    status: Status,
}

/// Accept a string or a number, normalized to a string.
fn de_loose_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Ok(String::new()),
    }
}

/// Search filter for `Record.List`.
#[derive(Debug, Clone)]
pub struct RecordListParams {
    pub sub_domain: String,
    pub record_type: String,
    pub offset: u32,
    pub length: u32,
}

/// Fields sent to `Record.Modify`. The update intent of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyParams {
    pub sub_domain: String,
    pub record_type: String,
    pub record_line: String,
    /// Takes precedence over `record_line` when non-empty.
    pub record_line_id: String,
    pub value: String,
    pub mx: Option<u16>,
    pub ttl: Option<u32>,
    pub status: String,
    /// `None` leaves the record's weight untouched; `Some(0)` sets it to zero.
    pub weight: Option<u32>,
}

/// The provider capability the reconciliation loop consumes.
#[async_trait]
pub trait DnspodApi: Send + Sync {
    async fn record_info(
        &self,
        common: &CommonParams,
        record_id: i64,
    ) -> Result<RecordInfoResponse>;

    async fn record_list(
        &self,
        common: &CommonParams,
        params: &RecordListParams,
    ) -> Result<RecordListResponse>;

    async fn record_modify(
        &self,
        common: &CommonParams,
        record_id: i64,
        params: &ModifyParams,
    ) -> Result<RecordModifyResponse>;
}

/// Options for constructing a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub user_agent: String,
    pub http_timeout: Duration,
}

/// HTTP implementation of [`DnspodApi`].
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl Client {
    pub fn new(options: ClientOptions) -> Self {
        let mut base_url = options.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            base_url = DEFAULT_BASE_URL.to_string();
        }

        let http = reqwest::Client::builder()
            .timeout(options.http_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url,
            user_agent: options.user_agent,
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::new(ClientOptions {
            base_url: config.base_url.clone(),
            user_agent: config.user_agent.clone(),
            http_timeout: config.http_timeout,
        })
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DdnsError::Network(format!(
                "dnspod http {}: {}",
                status.as_u16(),
                truncate(&body, 512)
            )));
        }

        match serde_json::from_str::<T>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                // The schema is partially untrusted: before declaring the
                // response garbage, see if at least the status envelope is
                // there and carries an error we can surface.
                if let Ok(envelope) = serde_json::from_str::<StatusEnvelope>(&body) {
                    if envelope.status.code != "1" {
                        return Err(api_error(&envelope.status));
                    }
                }
                Err(DdnsError::Network(format!(
                    "decode response: {e} (body={})",
                    truncate(&body, 512)
                )))
            }
        }
    }
}

#[async_trait]
impl DnspodApi for Client {
    async fn record_info(
        &self,
        common: &CommonParams,
        record_id: i64,
    ) -> Result<RecordInfoResponse> {
        let mut form = common.to_form();
        form.push(("record_id".to_string(), record_id.to_string()));

        let out: RecordInfoResponse = self.post_form("/Record.Info", &form).await?;
        check_status(&out.status)?;
        Ok(out)
    }

    async fn record_list(
        &self,
        common: &CommonParams,
        params: &RecordListParams,
    ) -> Result<RecordListResponse> {
        let mut form = common.to_form();
        if !params.sub_domain.is_empty() {
            form.push(("sub_domain".to_string(), params.sub_domain.clone()));
        }
        if !params.record_type.is_empty() {
            form.push(("record_type".to_string(), params.record_type.to_uppercase()));
        }
        form.push(("offset".to_string(), params.offset.to_string()));
        form.push(("length".to_string(), params.length.to_string()));

        let out: RecordListResponse = self.post_form("/Record.List", &form).await?;
        check_status(&out.status)?;
        Ok(out)
    }

    async fn record_modify(
        &self,
        common: &CommonParams,
        record_id: i64,
        params: &ModifyParams,
    ) -> Result<RecordModifyResponse> {
        let mut form = common.to_form();
        form.push(("record_id".to_string(), record_id.to_string()));
        if !params.sub_domain.is_empty() {
            form.push(("sub_domain".to_string(), params.sub_domain.clone()));
        }
        form.push(("record_type".to_string(), params.record_type.to_uppercase()));
        if !params.record_line_id.is_empty() {
            form.push(("record_line_id".to_string(), params.record_line_id.clone()));
        } else {
            form.push(("record_line".to_string(), params.record_line.clone()));
        }
        form.push(("value".to_string(), params.value.clone()));
        if params.record_type.eq_ignore_ascii_case("MX") {
            if let Some(mx) = params.mx {
                form.push(("mx".to_string(), mx.to_string()));
            }
        }
        if let Some(ttl) = params.ttl {
            if ttl > 0 {
                form.push(("ttl".to_string(), ttl.to_string()));
            }
        }
        if !params.status.is_empty() {
            form.push(("status".to_string(), params.status.clone()));
        }
        if let Some(weight) = params.weight {
            form.push(("weight".to_string(), weight.to_string()));
        }

        let out: RecordModifyResponse = self.post_form("/Record.Modify", &form).await?;
        check_status(&out.status)?;
        Ok(out)
    }
}

fn check_status(status: &Status) -> Result<()> {
    if status.code != "1" {
        return Err(api_error(status));
    }
    Ok(())
}

fn api_error(status: &Status) -> DdnsError {
    DdnsError::Api {
        code: status.code.clone(),
        message: status.message.clone(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
