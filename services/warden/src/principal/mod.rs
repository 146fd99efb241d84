//! Principal-validity oracle.
//!
//! # Purpose
//! Before assigning roles to a principal, warden asks the identity service
//! whether that principal exists and is active. The call is a credentialed
//! HTTP request with a bounded timeout; any failure fails the assignment.
//!
//! # Notes
//! [`StaticPrincipalDirectory`] serves development setups without an
//! identity service, and tests.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

pub const API_KEY_HEADER: &str = "X-Internal-API-Key";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("principal directory request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("principal directory timed out after {0:?}")]
    Timeout(Duration),
    #[error("principal directory returned status {0}")]
    Status(u16),
}

#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn is_principal_active(&self, principal_id: &str) -> Result<bool, DirectoryError>;
}

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    user_id: &'a str,
}

/// Envelope returned by the identity service; `code == 0` means active.
#[derive(Debug, Deserialize)]
struct ValidateResponse {
    code: i64,
    #[serde(default)]
    msg: String,
}

/// Calls `POST {base_url}/api/users/validate`.
#[derive(Debug, Clone)]
pub struct HttpPrincipalDirectory {
    client: reqwest::Client,
    validate_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpPrincipalDirectory {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            validate_url: format!("{}/api/users/validate", base_url.trim_end_matches('/')),
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl PrincipalDirectory for HttpPrincipalDirectory {
    async fn is_principal_active(&self, principal_id: &str) -> Result<bool, DirectoryError> {
        let mut request = self
            .client
            .post(&self.validate_url)
            .json(&ValidateRequest {
                user_id: principal_id,
            });
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        let call = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(DirectoryError::Status(status.as_u16()));
            }
            Ok(response.json::<ValidateResponse>().await?)
        };
        let body = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(DirectoryError::Timeout(self.timeout)),
        };
        if body.code != 0 {
            tracing::info!(principal_id, code = body.code, msg = %body.msg, "principal rejected by directory");
        }
        Ok(body.code == 0)
    }
}

/// Answers from a fixed allow-list, or accepts everyone.
#[derive(Debug, Clone, Default)]
pub struct StaticPrincipalDirectory {
    allowed: Option<HashSet<String>>,
}

impl StaticPrincipalDirectory {
    pub fn allow_all() -> Self {
        Self { allowed: None }
    }

    pub fn only<I, S>(principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: Some(principals.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl PrincipalDirectory for StaticPrincipalDirectory {
    async fn is_principal_active(&self, principal_id: &str) -> Result<bool, DirectoryError> {
        Ok(self
            .allowed
            .as_ref()
            .is_none_or(|allowed| allowed.contains(principal_id)))
    }
}
