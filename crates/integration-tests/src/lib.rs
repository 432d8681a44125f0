//! Integration test harness for the Vinoteca checkout service.
//!
//! Tests drive the real router in-process with `tower::ServiceExt::oneshot`.
//! Sessions live in a `MemoryStore`, the database pool connects lazily and is
//! never used by the checkout routes, and the rate service is a small axum
//! server bound to an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vinoteca-integration-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;
use vinoteca_storefront::config::{ShippingRatesConfig, StorefrontConfig};
use vinoteca_storefront::{AppState, app, db, middleware};

/// What the fake rate service answers.
#[derive(Debug, Clone)]
pub enum RateReply {
    /// 200 with this JSON array of methods.
    Methods(Value),
    /// This status with a plain-text body.
    Failure(StatusCode, String),
}

/// A rate service on `127.0.0.1` that counts its calls.
pub struct FakeRateService {
    pub url: Url,
    calls: Arc<AtomicUsize>,
}

impl FakeRateService {
    /// Start a rate service that always answers `reply`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(reply: RateReply) -> Self {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let router = Router::new().route(
            "/rates",
            post(move || {
                let reply = reply.clone();
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    match reply {
                        RateReply::Methods(methods) => axum::Json(methods).into_response(),
                        RateReply::Failure(status, message) => (status, message).into_response(),
                    }
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake rate service");
        let addr: SocketAddr = listener
            .local_addr()
            .expect("Fake rate service has no address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            url: Url::parse(&format!("http://{addr}/rates")).expect("Valid fake rate URL"),
            calls,
        }
    }

    /// Number of quote requests received so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Configuration pointing at `rates_url`, with test secrets.
#[must_use]
pub fn test_config(rates_url: Url) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://vinoteca@localhost/vinoteca_test"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("k7Qp2Lx9Vb4Nc8Zm1Rt6Hy3Jw5Ds0Fg".repeat(3)),
        shipping_rates: ShippingRatesConfig {
            url: rates_url,
            token: None,
            timeout: Duration::from_secs(5),
        },
        messages_path: None,
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A response with its body decoded as JSON (`Null` when empty).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `Location` header, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

/// One browser: the router plus the session cookie it was given.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    /// Build the storefront app against a fake rate service.
    ///
    /// # Panics
    ///
    /// Panics if the app cannot be assembled.
    #[must_use]
    pub fn new(rates_url: Url) -> Self {
        let config = test_config(rates_url);
        let pool = db::create_lazy_pool(&config.database_url).expect("Valid test database URL");
        let session_layer = middleware::create_session_layer(MemoryStore::default(), &config)
            .expect("Test session secret is a valid key");
        let state = AppState::new(&config, pool).expect("Failed to build app state");

        Self {
            router: app(state, session_layer),
            cookie: None,
        }
    }

    /// Send a GET request.
    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None).await
    }

    /// Send a POST request with a JSON body.
    pub async fn post(&mut self, path: &str, body: Value) -> TestResponse {
        self.send(Method::POST, path, Some(body)).await
    }

    async fn send(&mut self, method: Method, path: &str, body: Option<Value>) -> TestResponse {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("Valid test request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Readable response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}
