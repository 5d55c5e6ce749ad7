//! Search-index connector against an in-process stand-in cluster.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, head, post};
use axum::{Json, Router};
use logsentinel::config::{AnalyzerConfig, IndexConfig};
use logsentinel::index::{IndexClient, TimeRange};
use logsentinel::pipeline::{analyze_index, FetchRequest};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeIndex {
    existing: Mutex<Vec<String>>,
    created: Mutex<Vec<(String, Value)>>,
    searches: Mutex<Vec<(String, Value)>>,
    bulk_bodies: Mutex<Vec<String>>,
}

type Shared = Arc<FakeIndex>;

async fn info() -> Json<Value> {
    Json(json!({ "cluster_name": "test-cluster", "version": { "number": "8.12.0" } }))
}

async fn index_exists(State(state): State<Shared>, Path(index): Path<String>) -> StatusCode {
    if state.existing.lock().unwrap().contains(&index) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn create_index(
    State(state): State<Shared>,
    Path(index): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.existing.lock().unwrap().push(index.clone());
    state.created.lock().unwrap().push((index.clone(), body));
    Json(json!({ "acknowledged": true, "index": index }))
}

async fn search(
    State(state): State<Shared>,
    Path(index): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.searches.lock().unwrap().push((index, body));

    let mut hits: Vec<Value> = (0..11)
        .map(|i| {
            json!({
                "_id": format!("doc-{i}"),
                "_source": {
                    "@timestamp": format!("2024-03-04T10:{i:02}:00Z"),
                    "message": if i == 0 { "Failed password for root" } else { "session opened" },
                    "log": { "level": "info" },
                    "source": { "ip": format!("10.0.0.{}", i % 3) }
                }
            })
        })
        .collect();
    hits.push(json!({ "_id": "no-message", "_source": { "@timestamp": "2024-03-04T11:00:00Z" } }));

    Json(json!({ "hits": { "total": { "value": hits.len() }, "hits": hits } }))
}

async fn bulk(State(state): State<Shared>, body: String) -> Json<Value> {
    let actions = body.lines().count() / 2;
    state.bulk_bodies.lock().unwrap().push(body);
    let items: Vec<Value> = (0..actions)
        .map(|_| json!({ "index": { "status": 201, "result": "created" } }))
        .collect();
    Json(json!({ "errors": false, "items": items }))
}

async fn spawn_fake_index() -> (String, Shared) {
    let state: Shared = Arc::new(FakeIndex::default());
    let app = Router::new()
        .route("/", get(info))
        .route("/_bulk", post(bulk))
        .route("/{index}", head(index_exists).put(create_index))
        .route("/{index}/_search", post(search))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn index_config(url: String) -> IndexConfig {
    IndexConfig {
        hosts: vec![url],
        timeout_secs: 5,
        ..IndexConfig::default()
    }
}

#[tokio::test]
async fn test_connect_reports_cluster() {
    let (url, _state) = spawn_fake_index().await;
    let client = IndexClient::connect(&index_config(url)).await.unwrap();
    assert_eq!(client.ping().await.unwrap(), "test-cluster");
}

#[tokio::test]
async fn test_fetch_builds_query_and_keeps_ids() {
    let (url, state) = spawn_fake_index().await;
    let client = IndexClient::connect(&index_config(url)).await.unwrap();

    let docs = client
        .fetch_logs("filebeat-*", Some(&TimeRange::since("24h")), None, 50)
        .await
        .unwrap();
    assert_eq!(docs.len(), 12);
    assert_eq!(docs[0]["_id"], "doc-0");

    let searches = state.searches.lock().unwrap();
    let (index, body) = &searches[0];
    assert_eq!(index, "filebeat-*");
    assert_eq!(body["size"], 50);
    assert_eq!(body["query"]["bool"]["must"][0], json!({ "match_all": {} }));
    assert_eq!(
        body["query"]["bool"]["filter"][0]["range"]["@timestamp"]["gte"],
        "now-24h"
    );
}

#[tokio::test]
async fn test_analyze_and_write_back() {
    let (url, state) = spawn_fake_index().await;
    let client = IndexClient::connect(&index_config(url)).await.unwrap();

    let request = FetchRequest {
        index_pattern: "filebeat-*".into(),
        time_range: None,
        query: Some(json!({ "match": { "process.name": "sshd" } })),
        size: 100,
    };
    let analysis = analyze_index(&client, &request, &AnalyzerConfig::default())
        .await
        .unwrap();

    // The message-less document is skipped.
    assert_eq!(analysis.records.len(), 11);
    assert_eq!(analysis.records[0].record().doc_id.as_deref(), Some("doc-0"));
    assert_eq!(analysis.records[0].record().source, "10.0.0.0");
    assert_eq!(analysis.records[0].record().severity, "INFO");

    let outcome = client
        .write_analysis_results(&analysis.records, "security-analysis")
        .await
        .unwrap();
    assert_eq!(outcome.indexed, 11);
    assert_eq!(outcome.failed, 0);

    // A second write reuses the index instead of recreating it.
    client
        .write_analysis_results(&analysis.records, "security-analysis")
        .await
        .unwrap();

    let created = state.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, "security-analysis");
    assert_eq!(
        created[0].1["mappings"]["properties"]["source_ip"]["type"],
        "ip"
    );

    let bodies = state.bulk_bodies.lock().unwrap();
    let first: Vec<Value> = bodies[0]
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(first.len(), 22);
    assert_eq!(first[0]["index"]["_id"], "doc-0");
    assert_eq!(first[1]["source_ip"], "10.0.0.0");
    assert_eq!(first[1]["log_level"], "INFO");
    assert_eq!(first[1]["@timestamp"], "2024-03-04T10:00:00");
    assert!(first[1]["analysis_timestamp"].is_string());
}
