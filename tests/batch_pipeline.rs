//! End-to-end batch runs against a mock sample service.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio::net::TcpListener;

use route_forge::batch::{
    run_batch, BatchConfig, HttpSampleClient, LocalSampleClient, FAILURES_FILE, METADATA_FILE,
};
use route_forge::cache::MemoryCacheStore;
use route_forge::orchestrator::{DatasetRow, SolvedSample};
use route_forge::service::{GenerateRequest, GenerateResponse, GenerateService};

const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="40" viewBox="0 0 40 40"><rect x="0" y="0" width="40" height="40" fill="#ffffff"/><circle cx="20" cy="20" r="6" fill="#444444" stroke="#bd0f0f" stroke-width="2"/></svg>"##;

async fn mock_generate(Json(request): Json<GenerateRequest>) -> Response {
    let index: usize = request.problem_id["sample-".len()..]
        .parse()
        .unwrap_or_default();
    match index {
        1 | 2 | 4 => {
            let sample = SolvedSample {
                boundary_connection_pairs: Vec::new(),
                routed_paths: Vec::new(),
                connection_pair_svg: SVG.to_string(),
                routed_svg: SVG.to_string(),
            };
            Json(GenerateResponse::success(sample, 1, request.seed)).into_response()
        }
        3 => Json(GenerateResponse::failure("no solution", 3)).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "solver crashed").into_response(),
    }
}

async fn spawn_mock() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/generate", post(mock_generate));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/generate", addr)
}

#[tokio::test]
async fn test_five_samples_two_workers_mixed_outcomes() {
    let endpoint = spawn_mock().await;
    let out = tempfile::tempdir().unwrap();
    let client = Arc::new(HttpSampleClient::new(endpoint.clone(), Duration::from_secs(10)).unwrap());

    let summary = run_batch(
        BatchConfig {
            sample_count: 5,
            output_dir: out.path().to_path_buf(),
            concurrency: 2,
            seed_offset: 0,
            image_width: 64,
        },
        client,
    )
    .await
    .unwrap();

    let manifest = std::fs::read_to_string(&summary.dataset_path).unwrap();
    let ids: Vec<String> = manifest
        .lines()
        .map(|line| serde_json::from_str::<DatasetRow>(line).unwrap().id)
        .collect();
    assert_eq!(ids, vec!["sample-000001", "sample-000002", "sample-000004"]);

    let failures: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join(FAILURES_FILE)).unwrap())
            .unwrap();
    let failures = failures.as_array().unwrap();
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0]["problemId"], "sample-000003");
    assert_eq!(failures[0]["reason"], "no solution");
    assert_eq!(failures[1]["problemId"], "sample-000005");

    let metadata: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join(METADATA_FILE)).unwrap())
            .unwrap();
    assert_eq!(metadata["generated_samples"], 3);
    assert_eq!(metadata["failed_samples"], 2);
    assert_eq!(metadata["sample_count"], 5);
    assert_eq!(metadata["endpoint"], endpoint.as_str());

    for id in &ids {
        assert!(out
            .path()
            .join(format!("images/connection-pairs/{}.png", id))
            .exists());
        assert!(out.path().join(format!("images/routed/{}.svg", id)).exists());
    }
}

#[tokio::test]
async fn test_in_process_run_replays_from_cache() {
    let cache = Arc::new(MemoryCacheStore::new());
    let config = |dir: &std::path::Path| BatchConfig {
        sample_count: 2,
        output_dir: dir.to_path_buf(),
        concurrency: 2,
        seed_offset: 10,
        image_width: 64,
    };

    let first_dir = tempfile::tempdir().unwrap();
    let first = run_batch(
        config(first_dir.path()),
        Arc::new(LocalSampleClient::new(GenerateService::with_defaults(cache.clone()))),
    )
    .await
    .unwrap();
    assert_eq!(first.metadata.cache_misses, 2);
    assert_eq!(first.metadata.cache_hits, 0);

    let second_dir = tempfile::tempdir().unwrap();
    let second = run_batch(
        config(second_dir.path()),
        Arc::new(LocalSampleClient::new(GenerateService::with_defaults(cache))),
    )
    .await
    .unwrap();
    assert_eq!(second.metadata.cache_hits, 2);
    assert_eq!(second.metadata.cache_hit_ratio, 1.0);
    assert_eq!(first.rows, second.rows);
}
