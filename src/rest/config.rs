use super::transport::{HttpVerb, ReqwestTransport, RestReply, RestRequest, RestTransport};
use crate::config::{
    DEFAULT_ID_KEY, ManyResourceResponse, ReadPagination, ReadRequest, ReadResponse,
    ResourceConfig, TemplateFn,
};
use crate::core::{ResourceError, Result};
use log::{debug, warn};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Inputs of a URL template
#[derive(Debug, Clone, Copy)]
pub struct RestUrlOptions<'a> {
    pub origin: &'a str,
    pub name: &'a str,
    pub id: Option<&'a str>,
    pub pagination: Option<ReadPagination>,
}

pub type UrlFn = Arc<dyn Fn(&RestUrlOptions<'_>) -> String + Send + Sync>;

/// How one REST operation is issued
#[derive(Clone)]
pub struct RestOperationConfig {
    pub optimistic: bool,
    pub verb: HttpVerb,
    pub url: UrlFn,
}

impl Default for RestOperationConfig {
    /// `GET {origin}/{name}`
    fn default() -> Self {
        Self {
            optimistic: true,
            verb: HttpVerb::Get,
            url: Arc::new(|options: &RestUrlOptions<'_>| format!("{}/{}", options.origin, options.name)),
        }
    }
}

impl fmt::Debug for RestOperationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestOperationConfig")
            .field("optimistic", &self.optimistic)
            .field("verb", &self.verb)
            .finish_non_exhaustive()
    }
}

impl RestOperationConfig {
    pub fn verb(mut self, verb: HttpVerb) -> Self {
        self.verb = verb;
        self
    }

    pub fn url<F>(mut self, url: F) -> Self
    where
        F: Fn(&RestUrlOptions<'_>) -> String + Send + Sync + 'static,
    {
        self.url = Arc::new(url);
        self
    }

    pub fn optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = optimistic;
        self
    }
}

/// Builder of a resource configuration backed by a REST endpoint
///
/// # Examples
///
/// ```
/// use rustresources::rest::{HttpVerb, RestOperationConfig, RestResource};
///
/// let config = RestResource::new("https://api.example.com", "users")
///     .id_key("uuid")
///     .many_read(Some(RestOperationConfig::default().verb(HttpVerb::Post)))
///     .into_config()
///     .unwrap();
/// assert_eq!(config.id_key, "uuid");
/// ```
pub struct RestResource<S> {
    origin: String,
    name: String,
    id_key: String,
    template: TemplateFn<S>,
    many_read: Option<RestOperationConfig>,
    transport: Arc<dyn RestTransport>,
}

impl<S> fmt::Debug for RestResource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestResource")
            .field("origin", &self.origin)
            .field("name", &self.name)
            .field("id_key", &self.id_key)
            .field("many_read", &self.many_read)
            .finish_non_exhaustive()
    }
}

impl RestResource<Value> {
    /// Raw JSON records read with `GET {origin}/{name}`
    pub fn new(origin: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            name: name.into(),
            id_key: DEFAULT_ID_KEY.to_string(),
            template: Arc::new(|value: Value| value),
            many_read: Some(RestOperationConfig::default()),
            transport: Arc::new(ReqwestTransport::default()),
        }
    }
}

impl<S: 'static> RestResource<S> {
    /// Turn raw records into entities with `template`
    pub fn template<T, F>(self, template: F) -> RestResource<T>
    where
        F: Fn(Value) -> T + Send + Sync + 'static,
    {
        RestResource {
            origin: self.origin,
            name: self.name,
            id_key: self.id_key,
            template: Arc::new(template),
            many_read: self.many_read,
            transport: self.transport,
        }
    }

    pub fn id_key(mut self, id_key: &str) -> Self {
        self.id_key = id_key.to_string();
        self
    }

    /// Configure the read-many operation; `None` disables it
    pub fn many_read(mut self, operation: Option<RestOperationConfig>) -> Self {
        self.many_read = operation;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn RestTransport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.origin.trim().is_empty() {
            return Err(ResourceError::Configuration("origin cannot be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ResourceError::Configuration("name cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn into_config(self) -> Result<ResourceConfig<S>> {
        self.validate()?;
        let RestResource {
            origin,
            name,
            id_key,
            template,
            many_read,
            transport,
        } = self;

        let read = move |request: ReadRequest| -> Result<ReadResponse> {
            let Some(operation) = &many_read else {
                return Err(ResourceError::Configuration(format!(
                    "ReadMany Resource Operation not supported for {}",
                    name
                )));
            };
            let url = (operation.url)(&RestUrlOptions {
                origin: &origin,
                name: &name,
                id: None,
                pagination: request.pagination,
            });
            let request = RestRequest {
                verb: operation.verb,
                url,
            };
            let transport = Arc::clone(&transport);
            Ok(ReadResponse::deferred(async move {
                Ok(fetch_many(transport.as_ref(), request).await)
            }))
        };

        Ok(ResourceConfig {
            id_key,
            template,
            read: Arc::new(read),
        })
    }
}

async fn fetch_many(transport: &dyn RestTransport, request: RestRequest) -> ManyResourceResponse {
    debug!("{} {}", request.verb, request.url);
    let url = request.url.clone();
    match transport.send(request).await {
        Ok(reply) if reply.is_ok() => decode_many(reply, &url),
        Ok(reply) => {
            warn!("{} answered with status {}", url, reply.status);
            ManyResourceResponse::failed()
        }
        Err(err) => {
            warn!("Request to {} failed: {}", url, err);
            ManyResourceResponse::failed()
        }
    }
}

/// A JSON array is the data itself; an object may carry `data` and `total`.
fn decode_many(reply: RestReply, url: &str) -> ManyResourceResponse {
    match reply.body {
        Value::Array(data) => ManyResourceResponse::success(data),
        Value::Object(mut body) => match body.remove("data") {
            Some(Value::Array(data)) => ManyResourceResponse {
                data,
                total: body.get("total").and_then(Value::as_u64),
                success: true,
            },
            _ => {
                warn!("{} returned an object without a data array", url);
                ManyResourceResponse::failed()
            }
        },
        _ => {
            warn!("{} returned neither an array nor an object", url);
            ManyResourceResponse::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_array_body() {
        let response = decode_many(RestReply::ok(json!([{"id": 1}, {"id": 2}])), "u");
        assert!(response.success);
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.total, None);
    }

    #[test]
    fn test_decode_envelope_body() {
        let response = decode_many(RestReply::ok(json!({"data": [{"id": 1}], "total": 30})), "u");
        assert!(response.success);
        assert_eq!(response.total, Some(30));
    }

    #[test]
    fn test_decode_unexpected_body_fails() {
        assert!(!decode_many(RestReply::ok(json!("nope")), "u").success);
        assert!(!decode_many(RestReply::ok(json!({"items": []})), "u").success);
    }

    #[test]
    fn test_default_url_template() {
        let operation = RestOperationConfig::default();
        let url = (operation.url)(&RestUrlOptions {
            origin: "https://api.example.com",
            name: "users",
            id: None,
            pagination: None,
        });
        assert_eq!(url, "https://api.example.com/users");
        assert_eq!(operation.verb, HttpVerb::Get);
        assert!(operation.optimistic);
    }

    #[test]
    fn test_empty_origin_is_rejected() {
        let result = RestResource::new("", "users").into_config();
        assert!(matches!(result, Err(ResourceError::Configuration(_))));
    }
}
