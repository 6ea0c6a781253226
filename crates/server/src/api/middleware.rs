//! Authentication and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use aeroguard_core::{AuthError, AuthMethod, Caller, Credentials};

use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Authentication middleware for the routes that change job state.
///
/// Reads the key from `x-api-key` or `Authorization: Bearer` and checks it
/// with the configured authenticator. Rejected requests get 401 and never
/// reach the handler.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();

    if authenticator.method() == AuthMethod::None {
        request.extensions_mut().insert(Caller::anonymous());
        return Ok(next.run(request).await);
    }

    let mut credentials = Credentials::from_headers(
        request
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v))),
    );
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        credentials = credentials.with_source_ip(addr.ip());
    }

    match authenticator.authenticate(&credentials).await {
        Ok(caller) => {
            request.extensions_mut().insert(caller);
            Ok(next.run(request).await)
        }
        Err(AuthError::MissingKey) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["missing_key"]).inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(AuthError::InvalidKey) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["invalid_key"]).inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(AuthError::Misconfigured(e)) => {
            tracing::error!("Authenticator misconfigured: {}", e);
            AUTH_FAILURES_TOTAL.with_label_values(&["internal_error"]).inc();
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Extractor for the caller placed in request extensions by [`auth_middleware`].
///
/// Falls back to the anonymous caller on routes without the middleware.
#[derive(Debug, Clone)]
pub struct AuthCaller(pub Caller);

impl<S> FromRequestParts<S> for AuthCaller
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let caller = parts
            .extensions
            .get::<Caller>()
            .cloned()
            .unwrap_or_else(Caller::anonymous);
        std::future::ready(Ok(AuthCaller(caller)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeroguard_core::{
        create_authenticator, AuthConfig, Config, InMemoryQueue, LocalStatusReporter,
        MemoryStatusStore, ServerConfig, StatusReporter, StatusStore,
    };
    use axum::{http::header, middleware, routing::get, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    async fn caller_handler(AuthCaller(caller): AuthCaller) -> String {
        caller.subject
    }

    fn create_test_state(auth: AuthConfig) -> Arc<AppState> {
        let authenticator: Arc<dyn aeroguard_core::Authenticator> =
            Arc::from(create_authenticator(&auth).unwrap());
        let config = Config {
            auth,
            server: ServerConfig::default(),
            store: Default::default(),
            queue: Default::default(),
            submission: Default::default(),
            optimizer: Default::default(),
            worker: Default::default(),
        };
        let store: Arc<dyn StatusStore> = Arc::new(MemoryStatusStore::new());
        let reporter: Arc<dyn StatusReporter> =
            Arc::new(LocalStatusReporter::new(Arc::clone(&store)));
        let queue = Arc::new(InMemoryQueue::new(Duration::from_secs(60)));

        Arc::new(AppState::new(config, authenticator, store, reporter, queue))
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/test", get(caller_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    fn api_key_auth() -> AuthConfig {
        AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("secret-key".to_string()),
        }
    }

    #[tokio::test]
    async fn test_none_auth_allows_all() {
        let state = create_test_state(AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        });

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_key_header_valid() {
        let request = Request::builder()
            .uri("/test")
            .header("x-api-key", "secret-key")
            .body(Body::empty())
            .unwrap();

        let response = app(create_test_state(api_key_auth()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer secret-key")
            .body(Body::empty())
            .unwrap();

        let response = app(create_test_state(api_key_auth()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_key_invalid() {
        let request = Request::builder()
            .uri("/test")
            .header("x-api-key", "wrong-key")
            .body(Body::empty())
            .unwrap();

        let response = app(create_test_state(api_key_auth()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_key_missing() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app(create_test_state(api_key_auth()))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
