use crate::core::{ResourceError, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Default business-identifier field on raw records
pub const DEFAULT_ID_KEY: &str = "id";

/// Result of one read-many invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManyResourceResponse {
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub success: bool,
}

impl ManyResourceResponse {
    pub fn success(data: Vec<Value>) -> Self {
        Self {
            data,
            total: None,
            success: true,
        }
    }

    pub fn failed() -> Self {
        Self {
            data: Vec::new(),
            total: None,
            success: false,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }
}

/// Page window handed to `read`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPagination {
    pub offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadRequest {
    /// Caller-supplied options forwarded untouched from `get_or_read`
    pub options: Option<Value>,
    pub pagination: Option<ReadPagination>,
}

/// A read answers immediately or later.
pub enum ReadResponse {
    Ready(ManyResourceResponse),
    Deferred(BoxFuture<'static, Result<ManyResourceResponse>>),
}

impl ReadResponse {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<ManyResourceResponse>> + Send + 'static,
    {
        ReadResponse::Deferred(Box::pin(future))
    }

    pub async fn resolve(self) -> Result<ManyResourceResponse> {
        match self {
            ReadResponse::Ready(response) => Ok(response),
            ReadResponse::Deferred(future) => future.await,
        }
    }
}

impl fmt::Debug for ReadResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadResponse::Ready(response) => f.debug_tuple("Ready").field(response).finish(),
            ReadResponse::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

pub type ReadFn = Arc<dyn Fn(ReadRequest) -> Result<ReadResponse> + Send + Sync>;
pub type TemplateFn<S> = Arc<dyn Fn(Value) -> S + Send + Sync>;

/// How to fetch and normalize one kind of entity
///
/// # Examples
///
/// ```
/// use rustresources::config::{ManyResourceResponse, ResourceConfig};
/// use serde_json::json;
///
/// let config = ResourceConfig::json(|_request| {
///     ManyResourceResponse::success(vec![json!({ "id": "a" })]).with_total(1)
/// })
/// .id_key("id");
/// assert!(config.validate().is_ok());
/// ```
pub struct ResourceConfig<S> {
    pub id_key: String,
    /// Runs while the resource partition is write-locked; must not use the store.
    pub template: TemplateFn<S>,
    /// Runs while the resource partition is write-locked; must not use the
    /// store synchronously. Defer the actual fetch with a future.
    pub read: ReadFn,
}

impl<S> Clone for ResourceConfig<S> {
    fn clone(&self) -> Self {
        Self {
            id_key: self.id_key.clone(),
            template: Arc::clone(&self.template),
            read: Arc::clone(&self.read),
        }
    }
}

impl<S> fmt::Debug for ResourceConfig<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceConfig")
            .field("id_key", &self.id_key)
            .finish_non_exhaustive()
    }
}

impl<S> ResourceConfig<S> {
    /// Create a configuration from a template and a raw read function
    pub fn new<T, R>(template: T, read: R) -> Self
    where
        T: Fn(Value) -> S + Send + Sync + 'static,
        R: Fn(ReadRequest) -> Result<ReadResponse> + Send + Sync + 'static,
    {
        Self {
            id_key: DEFAULT_ID_KEY.to_string(),
            template: Arc::new(template),
            read: Arc::new(read),
        }
    }

    /// Read synchronously
    pub fn with_read<T, R>(template: T, read: R) -> Self
    where
        T: Fn(Value) -> S + Send + Sync + 'static,
        R: Fn(ReadRequest) -> ManyResourceResponse + Send + Sync + 'static,
    {
        Self::new(template, move |request| Ok(ReadResponse::Ready(read(request))))
    }

    /// Read through a future
    pub fn with_async_read<T, R, F>(template: T, read: R) -> Self
    where
        T: Fn(Value) -> S + Send + Sync + 'static,
        R: Fn(ReadRequest) -> F + Send + Sync + 'static,
        F: Future<Output = Result<ManyResourceResponse>> + Send + 'static,
    {
        Self::new(template, move |request| Ok(ReadResponse::deferred(read(request))))
    }

    /// Set the business-identifier field name
    pub fn id_key(mut self, id_key: &str) -> Self {
        self.id_key = id_key.to_string();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.id_key.trim().is_empty() {
            return Err(ResourceError::Configuration(
                "id_key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl ResourceConfig<Value> {
    /// Raw JSON records with an identity template and a synchronous read
    pub fn json<R>(read: R) -> Self
    where
        R: Fn(ReadRequest) -> ManyResourceResponse + Send + Sync + 'static,
    {
        Self::with_read(|value| value, read)
    }

    /// Raw JSON records with an identity template and an asynchronous read
    pub fn json_async<R, F>(read: R) -> Self
    where
        R: Fn(ReadRequest) -> F + Send + Sync + 'static,
        F: Future<Output = Result<ManyResourceResponse>> + Send + 'static,
    {
        Self::with_async_read(|value| value, read)
    }
}

/// Business id of a raw record as a map key. Strings are used as-is, numbers
/// and booleans by their JSON text; anything else has no usable id.
pub fn business_id(record: &Value, id_key: &str) -> Option<String> {
    match record.get(id_key)? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        Value::Bool(id) => Some(id.to_string()),
        _ => None,
    }
}
