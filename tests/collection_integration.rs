//! Integration tests for the collection engine.
//!
//! Each test spins up a stub server that plays both roles the engine talks
//! to: the central server (metrics listing and measurement submission) and a
//! vendor API. A full scheduler cycle then runs over real HTTP.

use std::sync::{Arc, Mutex};

use axum::extract::Json;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use surveyor::adapters;
use surveyor::{CollectorRegistry, EngineConfig, Scheduler};

// =============================================================================
// Test Helpers
// =============================================================================

/// Collected POST bodies from the measurement endpoint.
type Submissions = Arc<Mutex<Vec<Value>>>;

/// Start a stub server hosting the central endpoints and a fake Jenkins.
///
/// Returns the base URL and the measurement submissions received so far.
async fn start_stub_server(metrics: Value) -> (String, Submissions) {
    let submissions: Submissions = Arc::new(Mutex::new(Vec::new()));

    let metrics_json = metrics.clone();
    let received = Arc::clone(&submissions);
    let app = Router::new()
        .route(
            "/api/metrics",
            get(move || {
                let metrics = metrics_json.clone();
                async move { Json(metrics) }
            }),
        )
        .route(
            "/api/measurements",
            post(move |Json(body): Json<Value>| {
                let received = Arc::clone(&received);
                async move {
                    received.lock().unwrap().push(body);
                    StatusCode::OK
                }
            }),
        )
        .route(
            "/jenkins/api/json",
            get(|| async {
                Json(json!({
                    "jobs": [
                        {"name": "app", "url": "https://ci.example.org/job/app/",
                         "buildable": true,
                         "lastBuild": {"timestamp": 946684800000i64, "result": "FAILURE"}},
                        {"name": "lib", "url": "https://ci.example.org/job/lib/",
                         "buildable": true,
                         "lastBuild": {"timestamp": 946684800000i64, "result": "SUCCESS"}}
                    ]
                }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), submissions)
}

fn scheduler_for(base_url: &str) -> Scheduler {
    let config = EngineConfig::new(&format!("{base_url}/api")).expect("valid config");
    let registry = Arc::new(CollectorRegistry::with_default_adapters());
    let definitions = Arc::new(adapters::default_definitions());
    Scheduler::new(config, registry, definitions).expect("scheduler")
}

const METRIC_UUID: &str = "10000000-0000-0000-0000-000000000001";
const REPORT_UUID: &str = "20000000-0000-0000-0000-000000000001";
const SOURCE_A: &str = "30000000-0000-0000-0000-00000000000a";
const SOURCE_B: &str = "30000000-0000-0000-0000-00000000000b";

// =============================================================================
// Cycle Tests
// =============================================================================

#[tokio::test]
async fn test_cycle_collects_and_submits() {
    // One stub plays the vendor, a second one the central server; the
    // vendor's address is only known after binding.
    let (vendor_url, _vendor) = start_stub_server(json!({})).await;
    let metrics = json!({
        METRIC_UUID: {
            "type": "failed_jobs",
            "addition": "sum",
            "reportUuid": REPORT_UUID,
            "sources": {
                SOURCE_A: {"type": "jenkins", "parameters": {"url": format!("{vendor_url}/jenkins")}}
            }
        }
    });
    let (base_url, submissions) = start_stub_server(metrics).await;

    scheduler_for(&base_url).run_cycle().await;

    let submitted = submissions.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    let measurement = &submitted[0];
    assert_eq!(measurement["metricUuid"], METRIC_UUID);
    assert_eq!(measurement["reportUuid"], REPORT_UUID);
    assert_eq!(measurement["value"], "1");

    let source = &measurement["sources"][0];
    assert_eq!(source["sourceUuid"], SOURCE_A);
    assert_eq!(source["value"], "1");
    assert_eq!(source["total"], "2");
    assert_eq!(source["entities"][0]["key"], "app");
    assert!(source.get("connectionError").is_none());
    assert!(source.get("parseError").is_none());
}

#[tokio::test]
async fn test_failing_source_does_not_affect_its_peer() {
    // Source B points at a closed port; its failure must stay local while
    // the metric-level value becomes null.
    let (vendor_url, _vendor) = start_stub_server(json!({})).await;
    let metrics = json!({
        METRIC_UUID: {
            "type": "failed_jobs",
            "addition": "sum",
            "reportUuid": REPORT_UUID,
            "sources": {
                SOURCE_A: {"type": "jenkins", "parameters": {"url": format!("{vendor_url}/jenkins")}},
                SOURCE_B: {"type": "jenkins", "parameters": {"url": "http://127.0.0.1:9/jenkins"}}
            }
        }
    });
    let (base_url, submissions) = start_stub_server(metrics).await;

    scheduler_for(&base_url).run_cycle().await;

    let submitted = submissions.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    let measurement = &submitted[0];
    assert_eq!(measurement["value"], Value::Null);

    let sources = measurement["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    let ok = sources.iter().find(|s| s["sourceUuid"] == SOURCE_A).unwrap();
    let failed = sources.iter().find(|s| s["sourceUuid"] == SOURCE_B).unwrap();

    assert_eq!(ok["value"], "1");
    assert!(ok.get("connectionError").is_none());

    assert_eq!(failed["value"], Value::Null);
    assert_eq!(failed["entities"], json!([]));
    let error = failed["connectionError"].as_str().unwrap();
    assert!(!error.is_empty());
    // Addresses are scrubbed before the error is stored.
    assert!(!error.contains("127.0.0.1"), "{error}");
}

#[tokio::test]
async fn test_resubmission_is_identical() {
    let (vendor_url, _vendor) = start_stub_server(json!({})).await;
    let metrics = json!({
        METRIC_UUID: {
            "type": "failed_jobs",
            "reportUuid": REPORT_UUID,
            "sources": {
                SOURCE_A: {"type": "jenkins", "parameters": {"url": format!("{vendor_url}/jenkins")}}
            }
        }
    });
    let (base_url, submissions) = start_stub_server(metrics).await;
    let scheduler = scheduler_for(&base_url);

    scheduler.run_cycle().await;
    scheduler.run_cycle().await;

    let submitted = submissions.lock().unwrap();
    assert_eq!(submitted.len(), 2);
    assert_eq!(
        serde_json::to_string(&submitted[0]).unwrap(),
        serde_json::to_string(&submitted[1]).unwrap()
    );
}

#[tokio::test]
async fn test_unknown_source_kind_skips_only_that_metric() {
    let (vendor_url, _vendor) = start_stub_server(json!({})).await;
    let broken_metric = "40000000-0000-0000-0000-000000000001";
    let metrics = json!({
        broken_metric: {
            "type": "failed_jobs",
            "reportUuid": REPORT_UUID,
            "sources": {
                SOURCE_A: {"type": "teamcity", "parameters": {"url": "https://tc.example.org"}}
            }
        },
        METRIC_UUID: {
            "type": "failed_jobs",
            "reportUuid": REPORT_UUID,
            "sources": {
                SOURCE_B: {"type": "jenkins", "parameters": {"url": format!("{vendor_url}/jenkins")}}
            }
        }
    });
    let (base_url, submissions) = start_stub_server(metrics).await;

    scheduler_for(&base_url).run_cycle().await;

    let submitted = submissions.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0]["metricUuid"], METRIC_UUID);
}

#[tokio::test]
async fn test_listing_failure_skips_cycle() {
    let (base_url, submissions) = start_stub_server(json!({})).await;
    // Point the scheduler at a path the stub does not serve.
    let config = EngineConfig::new(&format!("{base_url}/nowhere")).expect("valid config");
    let registry = Arc::new(CollectorRegistry::with_default_adapters());
    let definitions = Arc::new(adapters::default_definitions());
    let scheduler = Scheduler::new(config, registry, definitions).expect("scheduler");

    scheduler.run_cycle().await;

    assert!(submissions.lock().unwrap().is_empty());
}
