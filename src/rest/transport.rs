use crate::core::{ResourceError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    #[default]
    Get,
    Post,
    Patch,
    Delete,
    Put,
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Put => "PUT",
        };
        f.write_str(verb)
    }
}

impl From<HttpVerb> for reqwest::Method {
    fn from(verb: HttpVerb) -> Self {
        match verb {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Patch => reqwest::Method::PATCH,
            HttpVerb::Delete => reqwest::Method::DELETE,
            HttpVerb::Put => reqwest::Method::PUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestRequest {
    pub verb: HttpVerb,
    pub url: String,
}

/// Status and decoded body of a reply. The body is `Null` for non-ok replies.
#[derive(Debug, Clone, PartialEq)]
pub struct RestReply {
    pub status: u16,
    pub body: Value,
}

impl RestReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends REST requests on behalf of a resource read
#[async_trait]
pub trait RestTransport: Send + Sync {
    async fn send(&self, request: RestRequest) -> Result<RestReply>;
}

/// Default transport over a shared `reqwest` client
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RestTransport for ReqwestTransport {
    async fn send(&self, request: RestRequest) -> Result<RestReply> {
        let response = self
            .client
            .request(request.verb.into(), &request.url)
            .header(reqwest::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| ResourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(RestReply {
                status: status.as_u16(),
                body: Value::Null,
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ResourceError::Transport(e.to_string()))?;
        Ok(RestReply {
            status: status.as_u16(),
            body,
        })
    }
}
