//! Push delivery endpoint tests: the submit → deliver → redeliver lifecycle.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use aeroguard_core::{JobQueue, JobState, OptimizerError, StatusStore};
use common::{fixtures, TestConfig, TestFixture};

#[tokio::test]
async fn test_full_lifecycle_with_redelivery() {
    let fixture = TestFixture::new().await;
    fixture
        .optimizer
        .set_output_url("https://storage.example.com/rosters/R.csv")
        .await;

    // Submit: X is QUEUED
    let job_id = fixture.submit("2024-01-01").await;
    let status_path = format!("/api/v1/jobs/{}/status", job_id);
    assert_eq!(fixture.get(&status_path).await.body["status"], "QUEUED");

    // Deliver: optimizer returns R, X is DONE(R)
    let (response, payload) = fixture.deliver_next().await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "done");
    assert_eq!(response.body["job_id"], job_id.as_str());

    let status = fixture.get(&status_path).await.body;
    assert_eq!(status["status"], "DONE");
    assert_eq!(status["output_url"], "https://storage.example.com/rosters/R.csv");

    let calls = fixture.optimizer.recorded_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].flights_gcs, "gs://aeroguard-inputs/flights.csv");
    assert_eq!(calls[0].crew_gcs, "gs://aeroguard-inputs/crew.csv");
    assert_eq!(calls[0].start_date, "2024-01-01");

    // Redeliver the same message: still DONE(R), optimizer not called again
    let response = fixture.push(&payload, "redelivery-1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "duplicate");

    let status = fixture.get(&status_path).await.body;
    assert_eq!(status["status"], "DONE");
    assert_eq!(status["output_url"], "https://storage.example.com/rosters/R.csv");
    assert_eq!(fixture.optimizer.call_count().await, 1);

    // Bad scheme: rejected, no id, no entry
    let response = fixture
        .post(
            "/api/v1/jobs",
            json!({
                "flights_gcs": "ftp://in/flights.csv",
                "crew_gcs": "gs://aeroguard-inputs/crew.csv",
                "start_date": "2024-01-02",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body.get("job_id").is_none());
    assert_eq!(fixture.store.counts().unwrap().total(), 1);
}

#[tokio::test]
async fn test_optimizer_failure_marks_failed_and_acks() {
    let fixture = TestFixture::new().await;
    fixture
        .optimizer
        .set_next_error(OptimizerError::Status {
            status: 500,
            body: "solver crashed".to_string(),
        })
        .await;

    let job_id = fixture.submit("2024-01-01").await;
    let (response, _) = fixture.deliver_next().await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "failed");

    let status = fixture.store.get(&job_id).unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.output_url, None);
}

#[tokio::test]
async fn test_optimizer_timeout_marks_failed() {
    let fixture = TestFixture::with_config(TestConfig {
        optimizer_timeout: Duration::from_millis(50),
        ..Default::default()
    })
    .await;
    fixture.optimizer.set_delay(Duration::from_secs(5)).await;

    let job_id = fixture.submit("2024-01-01").await;

    let started = std::time::Instant::now();
    let (response, _) = fixture.deliver_next().await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "failed");
    assert_eq!(fixture.store.get(&job_id).unwrap().state, JobState::Failed);
}

#[tokio::test]
async fn test_redelivery_after_failure_is_duplicate() {
    let fixture = TestFixture::new().await;
    fixture
        .optimizer
        .set_next_error(OptimizerError::Transport("connection refused".to_string()))
        .await;

    let job_id = fixture.submit("2024-01-01").await;
    let (_, payload) = fixture.deliver_next().await;

    let response = fixture.push(&payload, "redelivery-1").await;
    assert_eq!(response.body["outcome"], "duplicate");
    assert_eq!(fixture.store.get(&job_id).unwrap().state, JobState::Failed);
    assert_eq!(fixture.optimizer.call_count().await, 1);
}

#[tokio::test]
async fn test_malformed_payload_is_acked_without_status() {
    let fixture = TestFixture::new().await;

    let response = fixture.push(b"{not json", "m-1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "dropped");

    let response = fixture.push(br#"{"flights_gcs": "gs://a/b"}"#, "m-2").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "dropped");

    assert_eq!(fixture.store.counts().unwrap().total(), 0);
    assert_eq!(fixture.optimizer.call_count().await, 0);
}

#[tokio::test]
async fn test_push_without_message_is_acked() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/v1/deliveries/push", json!({"subscription": "s"}))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "dropped");

    let response = fixture
        .post(
            "/api/v1/deliveries/push",
            json!({"message": {"messageId": "m-1"}}),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "dropped");

    let response = fixture.post_raw("/api/v1/deliveries/push", "garbage").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "dropped");

    assert_eq!(fixture.store.counts().unwrap().total(), 0);
}

#[tokio::test]
async fn test_push_for_unsubmitted_job_is_processed() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .push(&fixtures::queue_payload("pushed-directly"), "m-1")
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["outcome"], "done");
    assert_eq!(
        fixture.store.get("pushed-directly").unwrap().state,
        JobState::Done
    );
}

#[tokio::test]
async fn test_push_refused_without_worker() {
    let fixture = TestFixture::with_config(TestConfig::without_worker()).await;
    fixture.submit("2024-01-01").await;

    let (response, _) = fixture.deliver_next().await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(fixture.optimizer.call_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_deliveries_of_distinct_jobs() {
    let fixture = TestFixture::new().await;
    fixture.optimizer.set_delay(Duration::from_millis(20)).await;

    let first = fixture.submit("2024-01-01").await;
    let second = fixture.submit("2024-01-02").await;

    let a = fixture.queue.receive().await.unwrap().unwrap();
    let b = fixture.queue.receive().await.unwrap().unwrap();

    let (ra, rb) = tokio::join!(
        fixture.push(&a.payload, &a.message_id),
        fixture.push(&b.payload, &b.message_id)
    );

    assert_eq!(ra.body["outcome"], "done");
    assert_eq!(rb.body["outcome"], "done");
    assert_eq!(fixture.store.get(&first).unwrap().state, JobState::Done);
    assert_eq!(fixture.store.get(&second).unwrap().state, JobState::Done);
    assert_eq!(fixture.optimizer.call_count().await, 2);
}
