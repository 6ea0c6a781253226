//! Common test utilities for in-process API testing with mocks.
//!
//! The fixture builds the real router over in-memory stores and a
//! [`MockOptimizer`], so tests drive the whole submit → deliver → poll flow
//! without a broker or optimizer service.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use aeroguard_core::{
    create_authenticator, testing::MockOptimizer, AuthConfig, AuthMethod, Config, DispatchWorker,
    InMemoryQueue, JobQueue, LocalStatusReporter, MemoryStatusStore, Optimizer, PushRequest,
    ServerConfig, StatusReporter, StatusStore,
};
use aeroguard_server::state::AppState;

/// Re-export fixtures for test convenience
pub use aeroguard_core::testing::fixtures;

/// API key accepted by fixtures built with [`TestConfig::with_api_key`].
pub const TEST_API_KEY: &str = "test-key";

/// Test fixture with an in-process router and controllable collaborators.
pub struct TestFixture {
    pub router: Router,
    pub store: Arc<MemoryStatusStore>,
    pub queue: Arc<InMemoryQueue>,
    /// Mock optimizer - configure results, failures and delays
    pub optimizer: Arc<MockOptimizer>,
    api_key: Option<String>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Require this API key on protected routes
    pub api_key: Option<String>,
    /// Serve the push endpoint
    pub enable_worker: bool,
    pub optimizer_timeout: Duration,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            enable_worker: true,
            optimizer_timeout: Duration::from_secs(5),
        }
    }
}

impl TestConfig {
    pub fn with_api_key() -> Self {
        Self {
            api_key: Some(TEST_API_KEY.to_string()),
            ..Default::default()
        }
    }

    pub fn without_worker() -> Self {
        Self {
            enable_worker: false,
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let auth = match &test_config.api_key {
            Some(key) => AuthConfig {
                method: AuthMethod::ApiKey,
                api_key: Some(key.clone()),
            },
            None => AuthConfig {
                method: AuthMethod::None,
                api_key: None,
            },
        };

        let config = Config {
            auth: auth.clone(),
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            store: Default::default(),
            queue: Default::default(),
            submission: Default::default(),
            optimizer: Default::default(),
            worker: Default::default(),
        };

        let authenticator = Arc::from(create_authenticator(&auth).expect("Invalid auth config"));
        let store = Arc::new(MemoryStatusStore::new());
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(60)));
        let optimizer = Arc::new(MockOptimizer::new());

        let reporter: Arc<dyn StatusReporter> =
            Arc::new(LocalStatusReporter::new(Arc::clone(&store) as Arc<dyn StatusStore>));

        let mut state = AppState::new(
            config,
            authenticator,
            Arc::clone(&store) as Arc<dyn StatusStore>,
            Arc::clone(&reporter),
            Arc::clone(&queue) as Arc<dyn JobQueue>,
        );

        if test_config.enable_worker {
            state = state.with_worker(Arc::new(DispatchWorker::new(
                reporter,
                Arc::clone(&optimizer) as Arc<dyn Optimizer>,
                test_config.optimizer_timeout,
                2,
            )));
        }

        let router = aeroguard_server::api::create_router(Arc::new(state));

        Self {
            router,
            store,
            queue,
            optimizer,
            api_key: test_config.api_key,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, None).await
    }

    /// Send a POST request with JSON body and the fixture's API key, if any.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let key = self.api_key.clone();
        self.request("POST", path, Some(body), key.as_deref()).await
    }

    /// Send a POST request with an explicit API key (or none).
    pub async fn post_with_key(&self, path: &str, body: Value, key: Option<&str>) -> TestResponse {
        self.request("POST", path, Some(body), key).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Submit a job and return its id.
    pub async fn submit(&self, start_date: &str) -> String {
        let response = self.post("/api/v1/jobs", job_body(start_date)).await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "{:?}", response.body);
        response.body["job_id"].as_str().unwrap().to_string()
    }

    /// Lease the next queued message and push it to the delivery endpoint.
    ///
    /// Returns the push response and the payload that was delivered.
    pub async fn deliver_next(&self) -> (TestResponse, Vec<u8>) {
        let delivery = self
            .queue
            .receive()
            .await
            .unwrap()
            .expect("queue is empty");
        let response = self.push(&delivery.payload, &delivery.message_id).await;
        (response, delivery.payload)
    }

    /// Push a raw payload as the broker would.
    pub async fn push(&self, payload: &[u8], message_id: &str) -> TestResponse {
        let body = serde_json::to_value(PushRequest::wrap(payload, message_id)).unwrap();
        self.request("POST", "/api/v1/deliveries/push", Some(body), None)
            .await
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        api_key: Option<&str>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        if let Some(key) = api_key {
            request_builder = request_builder.header("x-api-key", key);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// A valid submission body.
pub fn job_body(start_date: &str) -> Value {
    json!({
        "flights_gcs": "gs://aeroguard-inputs/flights.csv",
        "crew_gcs": "gs://aeroguard-inputs/crew.csv",
        "start_date": start_date,
    })
}
