/// Resource engine tests
///
/// Read lifecycle of `get_or_read`: dispatch, caching, failure recording and
/// isolation between consumers.
/// Run with: cargo test --test resource_engine_tests
use rustresources::core::{ActionKey, SyntheticId};
use rustresources::store::{Operation, Partition};
use rustresources::{
    Action, GetOrReadOptions, InitiatorId, ManyResourceResponse, ResourceConfig, ResourceEngine,
    ResourceError, Status, StatusOptions, Store,
};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

fn counted<F>(respond: F) -> (ResourceConfig<Value>, Arc<AtomicUsize>)
where
    F: Fn(&rustresources::ReadRequest) -> ManyResourceResponse + Send + Sync + 'static,
{
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let config = ResourceConfig::json(move |request| {
        counter.fetch_add(1, Ordering::SeqCst);
        respond(&request)
    });
    (config, calls)
}

/// Reads that stay pending until `gate` gets a permit
fn gated(records: Vec<Value>) -> (ResourceConfig<Value>, Arc<AtomicUsize>, Arc<Semaphore>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let counter = Arc::clone(&calls);
    let waiter = Arc::clone(&gate);
    let config = ResourceConfig::json_async(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        let waiter = Arc::clone(&waiter);
        let records = records.clone();
        async move {
            let _permit = waiter.acquire().await;
            Ok(ManyResourceResponse::success(records))
        }
    });
    (config, calls, gate)
}

fn snapshot(engine: &ResourceEngine<Value>) -> Partition<Value> {
    engine.store().snapshot(&engine.path_prefix()).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
struct Todo {
    id: String,
    title: String,
    done: bool,
}

fn todo(value: Value) -> Todo {
    Todo {
        id: value["id"].as_str().unwrap_or_default().to_string(),
        title: value["title"].as_str().unwrap_or("untitled").to_string(),
        done: value["done"].as_bool().unwrap_or(false),
    }
}

#[tokio::test]
async fn test_first_read_returns_none_then_templated_data() {
    let config = ResourceConfig::with_read(todo, |_| {
        ManyResourceResponse::success(vec![json!({"id": "a"})]).with_total(1)
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    assert_eq!(resource.get_or_read(GetOrReadOptions::default()).unwrap(), None);
    assert!(resource.is_loading(StatusOptions::default()).unwrap());

    engine.settle().await.unwrap();

    let todos = resource.get_or_read(GetOrReadOptions::default()).unwrap().unwrap();
    assert_eq!(
        todos,
        vec![Arc::new(Todo {
            id: "a".to_string(),
            title: "untitled".to_string(),
            done: false,
        })]
    );
    assert!(!resource.is_loading(StatusOptions::default()).unwrap());
}

#[tokio::test]
async fn test_cached_result_is_returned_without_new_read() {
    let (config, calls) = counted(|_| {
        ManyResourceResponse::success(vec![json!({"id": 1}), json!({"id": 2})])
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    resource.get_or_read(GetOrReadOptions::default()).unwrap();
    engine.settle().await.unwrap();

    let first = resource.get_or_read(GetOrReadOptions::default()).unwrap().unwrap();
    let second = resource.get_or_read(GetOrReadOptions::default()).unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pending_read_is_not_dispatched_twice() {
    let (config, calls, gate) = gated(vec![json!({"id": "a"})]);
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    for _ in 0..3 {
        assert_eq!(resource.get_or_read(GetOrReadOptions::default()).unwrap(), None);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    gate.add_permits(1);
    engine.settle().await.unwrap();

    assert_eq!(
        resource.get_or_read(GetOrReadOptions::default()).unwrap().map(|data| data.len()),
        Some(1)
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pending_paginated_read_is_not_dispatched_twice() {
    let (config, calls, gate) = gated(vec![json!({"id": "a"})]);
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    assert_eq!(resource.get_or_read(GetOrReadOptions::page(1, 10)).unwrap(), None);
    assert_eq!(resource.get_or_read(GetOrReadOptions::page(1, 10)).unwrap(), None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    gate.add_permits(1);
    engine.settle().await.unwrap();
    assert!(resource.get_or_read(GetOrReadOptions::page(1, 10)).unwrap().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_synchronous_read_error_marks_failed() {
    let config: ResourceConfig<Value> = ResourceConfig::new(
        |value| value,
        |_| Err(ResourceError::ReadFailed("backend down".to_string())),
    );
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let initiator = InitiatorId::new("list");
    let resource = engine.resource(initiator.clone(), None);

    assert_eq!(resource.get_or_read(GetOrReadOptions::default()).unwrap(), None);

    assert!(resource.is_failed(StatusOptions::action(Action::Read)).unwrap());
    assert!(!resource.is_loading(StatusOptions::default()).unwrap());
    let lists = snapshot(&engine).status_lists(ActionKey::READ_MANY).cloned().unwrap();
    assert_eq!(lists.failed, vec![initiator]);
    assert!(lists.loading.is_empty());
    assert!(lists.completed.is_empty());
}

#[tokio::test]
async fn test_rejected_read_marks_failed_after_settling() {
    let config = ResourceConfig::json_async(|_| async {
        Err(ResourceError::ReadFailed("rejected".to_string()))
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    resource.get_or_read(GetOrReadOptions::default()).unwrap();
    assert!(resource.is_loading(StatusOptions::default()).unwrap());

    engine.settle().await.unwrap();
    assert!(resource.is_failed(StatusOptions::default()).unwrap());
    assert!(!resource.is_loading(StatusOptions::default()).unwrap());
}

#[tokio::test]
async fn test_failed_read_leaves_only_the_failed_status_behind() {
    let (config, _) = counted(|_| ManyResourceResponse {
        data: vec![json!({"id": "ignored"})],
        total: Some(10),
        success: false,
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let initiator = InitiatorId::new("list");
    let resource = engine.resource(initiator.clone(), None);
    let before = snapshot(&engine);

    resource.get_or_read(GetOrReadOptions::page(1, 10)).unwrap();
    engine.settle().await.unwrap();

    let mut expected = before.clone();
    Operation::SetStatus {
        key: ActionKey::READ_MANY,
        initiator,
        status: Some(Status::Failed),
        index: None,
    }
    .apply(&mut expected);
    assert_eq!(snapshot(&engine), expected);
}

#[tokio::test]
async fn test_failure_after_success_keeps_loaded_data() {
    let (config, _) = counted(|request| match request.pagination {
        Some(window) if window.offset == 0 => {
            ManyResourceResponse::success(vec![json!({"id": "first"})]).with_total(2)
        }
        _ => ManyResourceResponse::failed(),
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    resource.get_or_read(GetOrReadOptions::page(1, 1)).unwrap();
    engine.settle().await.unwrap();
    let loaded = snapshot(&engine);

    resource.get_or_read(GetOrReadOptions::page(2, 1)).unwrap();
    engine.settle().await.unwrap();
    let after = snapshot(&engine);

    assert!(resource.is_failed(StatusOptions::default()).unwrap());
    assert_eq!(after.data, loaded.data);
    assert_eq!(after.pagination, loaded.pagination);
    assert_eq!(after.meta.pagination, loaded.meta.pagination);
}

#[tokio::test]
async fn test_every_record_gets_one_synthetic_id() {
    let (config, _) = counted(|_| {
        ManyResourceResponse::success(vec![
            json!({"id": "a", "n": 1}),
            json!({"id": "b", "n": 2}),
            json!({"id": "c", "n": 3}),
        ])
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    resource.get_or_read(GetOrReadOptions::default()).unwrap();
    engine.settle().await.unwrap();

    let partition = snapshot(&engine);
    assert_eq!(partition.order.len(), 1);
    let batch = &partition.order[0].ids;
    let distinct: HashSet<SyntheticId> = batch.iter().copied().collect();
    assert_eq!(distinct.len(), 3);

    for id in ["a", "b", "c"] {
        let synthetic = partition.id_map.get(id).copied().unwrap();
        assert!(batch.contains(&synthetic));
        assert_eq!(partition.data.get(&synthetic).unwrap()["id"], json!(id));
        assert!(
            partition.meta.items.get(&synthetic).unwrap().read.completed
                == vec![InitiatorId::new("list")]
        );
    }
}

#[tokio::test]
async fn test_refetch_mints_fresh_ids_and_remaps() {
    let (config, calls) = counted(|_| ManyResourceResponse::success(vec![json!({"id": "a"})]));
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let first = engine.resource(InitiatorId::new("first"), None);
    let second = engine.resource(InitiatorId::new("second"), None);

    first.get_or_read(GetOrReadOptions::default()).unwrap();
    engine.settle().await.unwrap();
    let original = snapshot(&engine).id_map.get("a").copied().unwrap();

    second.get_or_read(GetOrReadOptions::default()).unwrap();
    engine.settle().await.unwrap();
    let partition = snapshot(&engine);
    let remapped = partition.id_map.get("a").copied().unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_ne!(original, remapped);
    assert_eq!(partition.data.len(), 2);
    assert_eq!(partition.entity_by_business_id("a").unwrap()["id"], json!("a"));
    assert_eq!(second.get_or_read(GetOrReadOptions::default()).unwrap().unwrap().len(), 1);
}

#[tokio::test]
async fn test_consumers_converge_independently() {
    let (config, calls, gate) = gated(vec![json!({"id": "a"})]);
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let left = engine.resource(InitiatorId::new("left"), None);
    let right = engine.resource(InitiatorId::new("right"), None);

    left.get_or_read(GetOrReadOptions::default()).unwrap();
    right.get_or_read(GetOrReadOptions::default()).unwrap();

    let lists = snapshot(&engine).status_lists(ActionKey::READ_MANY).cloned().unwrap();
    assert_eq!(lists.loading, vec![InitiatorId::new("left"), InitiatorId::new("right")]);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    gate.add_permits(1);
    engine.settle().await.unwrap();

    let lists = snapshot(&engine).status_lists(ActionKey::READ_MANY).cloned().unwrap();
    assert!(lists.loading.is_empty());
    assert!(lists.failed.is_empty());
    assert_eq!(lists.completed.len(), 2);
    assert!(left.get_or_read(GetOrReadOptions::default()).unwrap().is_some());
    assert!(right.get_or_read(GetOrReadOptions::default()).unwrap().is_some());
}

#[tokio::test]
async fn test_one_consumer_failing_does_not_affect_another() {
    let (config, _) = counted(|request| match &request.options {
        Some(options) if options["fail"] == json!(true) => ManyResourceResponse::failed(),
        _ => ManyResourceResponse::success(vec![json!({"id": "a"})]),
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let healthy = engine.resource(InitiatorId::new("healthy"), None);
    let broken = engine.resource(InitiatorId::new("broken"), None);

    healthy.get_or_read(GetOrReadOptions::default()).unwrap();
    broken
        .get_or_read(GetOrReadOptions::default().with_options(json!({"fail": true})))
        .unwrap();
    engine.settle().await.unwrap();

    assert!(broken.is_failed(StatusOptions::default()).unwrap());
    assert!(!healthy.is_failed(StatusOptions::default()).unwrap());
    assert!(healthy.is_completed(StatusOptions::default()).unwrap());
}

#[tokio::test]
async fn test_failed_consumer_reads_again() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&attempts);
    let config = ResourceConfig::json(move |_| {
        if seen.fetch_add(1, Ordering::SeqCst) == 0 {
            ManyResourceResponse::failed()
        } else {
            ManyResourceResponse::success(vec![json!({"id": "a"})])
        }
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    resource.get_or_read(GetOrReadOptions::default()).unwrap();
    engine.settle().await.unwrap();
    assert!(resource.is_failed(StatusOptions::default()).unwrap());

    assert_eq!(resource.get_or_read(GetOrReadOptions::default()).unwrap(), None);
    engine.settle().await.unwrap();
    assert!(!resource.is_failed(StatusOptions::default()).unwrap());
    assert_eq!(resource.get_or_read(GetOrReadOptions::default()).unwrap().unwrap().len(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_options_are_forwarded_to_read() {
    let received = Arc::new(std::sync::Mutex::new(None));
    let sink = Arc::clone(&received);
    let config = ResourceConfig::json(move |request| {
        *sink.lock().unwrap() = request.options.clone();
        ManyResourceResponse::success(vec![])
    });
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    resource
        .get_or_read(GetOrReadOptions::default().with_options(json!({"filter": "open"})))
        .unwrap();
    engine.settle().await.unwrap();

    assert_eq!(*received.lock().unwrap(), Some(json!({"filter": "open"})));
    assert_eq!(resource.get_or_read(GetOrReadOptions::default()).unwrap(), Some(vec![]));
}

#[tokio::test]
async fn test_invalidator_fires_when_data_arrives() {
    let (config, _) = counted(|_| ManyResourceResponse::success(vec![json!({"id": "a"})]));
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let renders = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&renders);
    let resource = engine.resource(
        InitiatorId::new("list"),
        Some(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    );

    resource.get_or_read(GetOrReadOptions::default()).unwrap();
    let before = renders.load(Ordering::SeqCst);
    engine.settle().await.unwrap();

    assert!(renders.load(Ordering::SeqCst) > before);
}

#[test]
fn test_empty_id_key_is_rejected_by_engine() {
    let config = ResourceConfig::json(|_| ManyResourceResponse::success(vec![])).id_key("");
    let result = ResourceEngine::new(config, Store::new());
    assert!(matches!(result, Err(ResourceError::Configuration(_))));
}

#[test]
fn test_read_outside_a_runtime_is_fatal() {
    let (config, _) = counted(|_| ManyResourceResponse::success(vec![]));
    let engine = ResourceEngine::new(config, Store::new()).unwrap();
    let resource = engine.resource(InitiatorId::new("list"), None);

    let result = resource.get_or_read(GetOrReadOptions::default());
    assert!(matches!(result, Err(ResourceError::Runtime(_))));
    assert!(!resource.is_loading(StatusOptions::default()).unwrap());
    assert!(!resource.is_failed(StatusOptions::default()).unwrap());
}

#[test]
fn test_engines_sharing_a_store_use_separate_partitions() {
    let store: Store<Value> = Store::new();
    let (users, _) = counted(|_| ManyResourceResponse::success(vec![]));
    let (posts, _) = counted(|_| ManyResourceResponse::success(vec![]));
    let users = ResourceEngine::new(users, store.clone()).unwrap();
    let posts = ResourceEngine::new(posts, store.clone()).unwrap();

    assert_ne!(users.path_prefix(), posts.path_prefix());
    assert!(store.contains(&users.path_prefix()).unwrap());
    assert!(store.contains(&posts.path_prefix()).unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_consumers_never_lose_entities() {
    const CONSUMERS: usize = 8;

    for _ in 0..200 {
        let barrier = Arc::new(tokio::sync::Barrier::new(CONSUMERS));
        let config = ResourceConfig::json_async(move |request| {
            let barrier = Arc::clone(&barrier);
            async move {
                barrier.wait().await;
                let id = request.options.unwrap_or_default()["n"].clone();
                Ok(ManyResourceResponse::success(vec![json!({ "id": id })]))
            }
        });
        let engine = ResourceEngine::new(config, Store::new()).unwrap();
        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|n| engine.resource(InitiatorId::new(format!("consumer-{}", n)), None))
            .collect();

        for (n, consumer) in consumers.iter().enumerate() {
            consumer
                .get_or_read(GetOrReadOptions::default().with_options(json!({ "n": n })))
                .unwrap();
        }
        engine.settle().await.unwrap();

        let partition = snapshot(&engine);
        assert_eq!(partition.data.len(), CONSUMERS);
        assert_eq!(partition.id_map.len(), CONSUMERS);
        assert_eq!(partition.meta.items.len(), CONSUMERS);
        let lists = partition.status_lists(ActionKey::READ_MANY).cloned().unwrap();
        assert_eq!(lists.completed.len(), CONSUMERS);
        assert!(lists.loading.is_empty());
    }
}
