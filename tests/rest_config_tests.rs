/// REST resource configuration tests
///
/// Reads issued through a recording transport instead of the network.
/// Run with: cargo test --test rest_config_tests
use async_trait::async_trait;
use rustresources::rest::{RestReply, RestRequest, RestTransport};
use rustresources::{
    GetOrReadOptions, HttpVerb, InitiatorId, ResourceEngine, ResourceError, RestOperationConfig,
    RestResource, StatusOptions, Store,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

struct MockTransport {
    reply: Result<RestReply, ResourceError>,
    requests: Mutex<Vec<RestRequest>>,
}

impl MockTransport {
    fn replying(reply: Result<RestReply, ResourceError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<RestRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RestTransport for MockTransport {
    async fn send(&self, request: RestRequest) -> rustresources::Result<RestReply> {
        self.requests.lock().unwrap().push(request);
        self.reply.clone()
    }
}

async fn read_all(engine: &ResourceEngine<Value>) -> (Option<Vec<Value>>, bool) {
    let resource = engine.resource(InitiatorId::new("rest"), None);
    resource.get_or_read(GetOrReadOptions::default()).unwrap();
    engine.settle().await.unwrap();
    let data = resource
        .get_or_read(GetOrReadOptions::default())
        .unwrap()
        .map(|records| records.iter().map(|record| record.as_ref().clone()).collect());
    (data, resource.is_failed(StatusOptions::default()).unwrap())
}

#[tokio::test]
async fn test_default_read_is_get_origin_slash_name() {
    let transport = MockTransport::replying(Ok(RestReply::ok(json!([{"id": 1}, {"id": 2}]))));
    let config = RestResource::new("https://api.example.com", "users")
        .transport(transport.clone())
        .into_config()
        .unwrap();
    let engine = ResourceEngine::new(config, Store::new()).unwrap();

    let (data, failed) = read_all(&engine).await;

    assert_eq!(data, Some(vec![json!({"id": 1}), json!({"id": 2})]));
    assert!(!failed);
    assert_eq!(
        transport.requests(),
        vec![RestRequest {
            verb: HttpVerb::Get,
            url: "https://api.example.com/users".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_custom_id_key_and_template() {
    #[derive(Debug, PartialEq)]
    struct User {
        uuid: String,
        name: String,
    }

    let transport = MockTransport::replying(Ok(RestReply::ok(json!([
        {"uuid": "x-1", "name": "Ada"},
        {"uuid": "x-2", "name": "Linus"}
    ]))));
    let config = RestResource::new("https://api.example.com", "users")
        .id_key("uuid")
        .template(|value: Value| User {
            uuid: value["uuid"].as_str().unwrap_or_default().to_string(),
            name: value["name"].as_str().unwrap_or_default().to_uppercase(),
        })
        .transport(transport)
        .into_config()
        .unwrap();
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("rest"), None);

    resource.get_or_read(GetOrReadOptions::default()).unwrap();
    engine.settle().await.unwrap();

    let ada = resource
        .with_partition(|partition| partition.entity_by_business_id("x-1"))
        .unwrap()
        .unwrap();
    assert_eq!(
        *ada,
        User {
            uuid: "x-1".to_string(),
            name: "ADA".to_string(),
        }
    );
}

#[tokio::test]
async fn test_envelope_body_reports_total() {
    let transport = MockTransport::replying(Ok(RestReply::ok(json!({
        "data": [{"id": 1}, {"id": 2}],
        "total": 12
    }))));
    let operation = RestOperationConfig::default().url(|options| {
        match options.pagination {
            Some(window) => format!(
                "{}/{}?offset={}&limit={}",
                options.origin, options.name, window.offset, window.size
            ),
            None => format!("{}/{}", options.origin, options.name),
        }
    });
    let config = RestResource::new("https://api.example.com", "items")
        .many_read(Some(operation))
        .transport(transport.clone())
        .into_config()
        .unwrap();
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("rest"), None);

    resource.get_or_read(GetOrReadOptions::page(2, 2)).unwrap();
    engine.settle().await.unwrap();

    assert_eq!(resource.page().total().unwrap(), Some(6));
    assert_eq!(
        transport.requests()[0].url,
        "https://api.example.com/items?offset=2&limit=2"
    );
}

#[tokio::test]
async fn test_verb_is_configurable() {
    let transport = MockTransport::replying(Ok(RestReply::ok(json!([]))));
    let config = RestResource::new("https://api.example.com", "search")
        .many_read(Some(RestOperationConfig::default().verb(HttpVerb::Post)))
        .transport(transport.clone())
        .into_config()
        .unwrap();
    let engine = ResourceEngine::new(config, Store::new()).unwrap();

    let (data, _) = read_all(&engine).await;

    assert_eq!(data, Some(vec![]));
    assert_eq!(transport.requests()[0].verb, HttpVerb::Post);
}

#[tokio::test]
async fn test_non_ok_reply_is_a_failed_read() {
    let transport = MockTransport::replying(Ok(RestReply {
        status: 503,
        body: Value::Null,
    }));
    let config = RestResource::new("https://api.example.com", "users")
        .transport(transport)
        .into_config()
        .unwrap();
    let engine = ResourceEngine::new(config, Store::new()).unwrap();

    let (data, failed) = read_all(&engine).await;

    assert!(failed);
    assert_eq!(data, None);
}

#[tokio::test]
async fn test_transport_error_is_a_failed_read() {
    let transport =
        MockTransport::replying(Err(ResourceError::Transport("connection refused".to_string())));
    let config = RestResource::new("https://api.example.com", "users")
        .transport(transport)
        .into_config()
        .unwrap();
    let engine = ResourceEngine::new(config, Store::new()).unwrap();

    let (_, failed) = read_all(&engine).await;
    assert!(failed);
}

#[tokio::test]
async fn test_disabled_read_is_a_configuration_error() {
    let transport = MockTransport::replying(Ok(RestReply::ok(json!([]))));
    let config = RestResource::new("https://api.example.com", "users")
        .many_read(None)
        .transport(transport.clone())
        .into_config()
        .unwrap();
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("rest"), None);

    let err = resource.get_or_read(GetOrReadOptions::default()).unwrap_err();

    assert_eq!(
        err,
        ResourceError::Configuration("ReadMany Resource Operation not supported for users".to_string())
    );
    assert!(!resource.is_failed(StatusOptions::default()).unwrap());
    assert!(!resource.is_loading(StatusOptions::default()).unwrap());
    assert!(transport.requests().is_empty());
}
