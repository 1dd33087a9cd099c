//! HTTP transport seam
//!
//! The toolkit composes endpoint paths and interprets status codes; the
//! wire itself sits behind the `Transport` trait. Production code uses
//! the blocking reqwest client with Okapi-style headers. Tests substitute
//! an in-memory platform.

use std::time::Duration;

use serde_json::Value;

use crate::core::auth::TokenProvider;
use crate::core::error::FolioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn is_mutating(self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// What came back from the platform for one request.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request to the platform. Retry for transient transport faults is
/// handled below this interface; errors that surface here are final.
pub trait Transport: Send + Sync {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Reply, FolioError>;
}

/// Production transport: blocking HTTP against an Okapi gateway.
pub struct OkapiTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    tenant: String,
    tokens: Box<dyn TokenProvider>,
}

impl OkapiTransport {
    pub fn new(
        base_url: impl Into<String>,
        tenant: impl Into<String>,
        tokens: Box<dyn TokenProvider>,
    ) -> Result<Self, FolioError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant: tenant.into(),
            tokens,
        })
    }
}

impl Transport for OkapiTransport {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Reply, FolioError> {
        let token = self.tokens.get_token()?;
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "platform request");

        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        request = request
            .header("x-okapi-token", token)
            .header("x-okapi-tenant", &self.tenant)
            .header("content-type", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        tracing::debug!(status, "platform reply");

        if status == 401 {
            self.tokens.invalidate();
            return Err(FolioError::AuthExpired);
        }
        Ok(Reply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mutating() {
        assert!(!Method::Get.is_mutating());
        assert!(Method::Post.is_mutating());
        assert!(Method::Put.is_mutating());
        assert!(Method::Delete.is_mutating());
    }

    #[test]
    fn test_reply_success_range() {
        assert!(Reply { status: 200, body: String::new() }.is_success());
        assert!(Reply { status: 204, body: String::new() }.is_success());
        assert!(!Reply { status: 404, body: String::new() }.is_success());
        assert!(!Reply { status: 500, body: String::new() }.is_success());
    }
}
