//! End-to-end behavior of the gateway pipeline over an in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderValue, Method, StatusCode};

use edge_gateway::config::parse_config;
use edge_gateway::error::GatewayError;
use edge_gateway::filter::{FilterAction, GatewayFilter};
use edge_gateway::http::{GatewayRequest, GatewayResponse, Transport};
use edge_gateway::resilience::{CircuitState, Fallback, FallbackError};
use edge_gateway::Gateway;

mod common;

use common::{Outcome, ScriptedTransport};

fn gateway(raw: &str, transport: Arc<ScriptedTransport>) -> Gateway {
    let config = parse_config(raw).unwrap();
    let transport: Arc<dyn Transport> = transport;
    Gateway::from_config(config, transport).unwrap()
}

fn get(path: &str) -> GatewayRequest {
    GatewayRequest::new(Method::GET, path)
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers_after_two_failures() {
    let transport = ScriptedTransport::new(vec![
        Outcome::Fail("connection refused"),
        Outcome::Fail("connection reset"),
        Outcome::Respond(200, "sample"),
    ]);
    let gw = gateway(
        r#"
        [[routes]]
        id = "sample-api"
        path = "/sample-api/**"
        uri = "http://backend.local:8000"
        policies = ["sample-api"]

        [policies.retry.sample-api]
        max_attempts = 3
        wait_duration_ms = 10
        "#,
        transport.clone(),
    );

    let resp = gw.handle(get("/sample-api/ping")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body_text(), "sample");
    assert_eq!(transport.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_uses_fallback() {
    let transport = ScriptedTransport::with_default(Vec::new(), Outcome::Fail("down"));
    let gw = gateway(
        r#"
        [[routes]]
        id = "sample-api"
        path = "/sample-api/**"
        uri = "http://backend.local:8000"
        policies = ["sample-api"]
        fallback = "hardcoded"

        [policies.retry.sample-api]
        max_attempts = 5
        wait_duration_ms = 1000
        backoff = "exponential"

        [fallbacks.hardcoded]
        status = 503
        body = "{route} unavailable: {error}"
        "#,
        transport.clone(),
    );

    let resp = gw.handle(get("/sample-api/ping")).await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(resp.body_text().starts_with("sample-api unavailable:"));
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn test_circuit_breaker_opens_and_short_circuits_to_fallback() {
    let transport = ScriptedTransport::new(vec![Outcome::Fail("down"), Outcome::Fail("down")]);
    let gw = gateway(
        r#"
        [[routes]]
        id = "circuit"
        path = "/circuit/**"
        uri = "http://backend.local:8000"
        policies = ["default"]
        fallback = "hardcoded"

        [policies.circuit_breaker.default]
        failure_rate_threshold = 50.0
        sliding_window_size = 2
        wait_duration_in_open_state_ms = 60000
        permitted_calls_in_half_open_state = 1

        [fallbacks.hardcoded]
        body = "fallback-response"
        "#,
        transport.clone(),
    );

    for _ in 0..2 {
        let resp = gw.handle(get("/circuit/any")).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body_text(), "fallback-response");
    }
    assert_eq!(transport.calls(), 2);

    let breaker = gw
        .policies("circuit")
        .and_then(|stack| stack.circuit_breaker.as_ref())
        .unwrap();
    assert_eq!(breaker.state(), CircuitState::Open);
    assert_eq!(breaker.name(), "circuit/default");

    let resp = gw.handle(get("/circuit/any")).await;
    assert_eq!(resp.body_text(), "fallback-response");
    assert_eq!(transport.calls(), 2, "open circuit must not reach downstream");
}

const AUTH_CONFIG: &str = r#"
    [[routes]]
    id = "api"
    path = "/api/**"
    uri = "http://backend.local:8000"
    require_auth = true

    [[routes]]
    id = "health"
    path = "/api/health"
    uri = "http://backend.local:8000"

    [[routes]]
    id = "admin"
    path = "/admin/**"
    uri = "http://backend.local:8000"
    required_role = "admin"

    [[auth.credentials]]
    token = "user-token"
    principal = "alice"
    role = "user"
"#;

#[tokio::test]
async fn test_missing_authorization_is_rejected_before_dispatch() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(AUTH_CONFIG, transport.clone());

    let resp = gw.handle(get("/api/orders")).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.header("www-authenticate"), Some("Bearer"));
    assert!(resp.body_text().contains("AUTH_REQUIRED"));

    let resp = gw
        .handle(get("/api/orders").with_header("authorization", "Bearer nope"))
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(transport.calls(), 0);

    let resp = gw
        .handle(get("/api/orders").with_header("authorization", "Bearer user-token"))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_auth_follows_route_specificity_and_roles() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(AUTH_CONFIG, transport.clone());

    // The exact unprotected route wins over the protected glob.
    let resp = gw.handle(get("/api/health")).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = gw
        .handle(get("/admin/users").with_header("authorization", "Bearer user-token"))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_unmatched_path_is_not_found() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(
        r#"
        [[routes]]
        id = "get"
        path = "/get"
        uri = "http://httpbin.org:80"
        "#,
        transport.clone(),
    );

    let request = get("/nowhere");
    let request_id = request.id.clone();
    let resp = gw.handle(request).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert!(resp.body_text().contains("ROUTE_NOT_FOUND"));
    assert_eq!(resp.header("x-request-id"), Some(request_id.as_str()));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_rewrite_and_request_injection() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(
        r#"
        [[routes]]
        id = "currency-conversion-new"
        path = "/currency-conversion-new/**"
        uri = "http://backend.local:8100"
        rewrite = { regex = "/currency-conversion-new/(?<segment>.*)", replacement = "/currency-conversion-feign/${segment}" }

        [routes.add_request_headers]
        MyHeader = "MyURI"

        [routes.add_request_params]
        Param = "MyValue"
        "#,
        transport.clone(),
    );

    let request = get("/currency-conversion-new/from/USD/to/INR/quantity/10")
        .with_header("connection", "keep-alive");
    let request_id = request.id.clone();
    let resp = gw.handle(request).await;
    assert_eq!(resp.status, StatusCode::OK);

    let sent = transport.last_request().unwrap();
    assert_eq!(
        sent.url.as_str(),
        "http://backend.local:8100/currency-conversion-feign/from/USD/to/INR/quantity/10?Param=MyValue"
    );
    assert_eq!(sent.headers.get("myheader").unwrap(), "MyURI");
    assert_eq!(sent.headers.get("x-request-id").unwrap(), request_id.as_str());
    assert!(sent.headers.get("connection").is_none());
}

#[tokio::test]
async fn test_locator_resolves_service_round_robin() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(
        r#"
        [discovery.services]
        CURRENCY-EXCHANGE = ["10.0.0.1:8000", "10.0.0.2:8000"]

        [discovery.locator]
        enabled = true
        lower_case_service_id = true
        "#,
        transport.clone(),
    );

    for _ in 0..3 {
        let resp = gw.handle(get("/currency-exchange/from/USD/to/INR")).await;
        assert_eq!(resp.status, StatusCode::OK);
    }

    let urls: Vec<String> = transport
        .requests()
        .iter()
        .map(|r| r.url.to_string())
        .collect();
    assert_eq!(
        urls,
        vec![
            "http://10.0.0.1:8000/from/USD/to/INR",
            "http://10.0.0.2:8000/from/USD/to/INR",
            "http://10.0.0.1:8000/from/USD/to/INR",
        ]
    );
}

#[tokio::test]
async fn test_unknown_service_renders_resolution_failure() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(
        r#"
        [[routes]]
        id = "ghost"
        path = "/ghost/**"
        uri = "lb://ghost-service"
        "#,
        transport.clone(),
    );

    let resp = gw.handle(get("/ghost/x")).await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(resp.body_text().contains("RESOLUTION_FAILURE"));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_time_limiter_renders_timeout() {
    let transport = ScriptedTransport::new(vec![Outcome::Delay(Duration::from_secs(5), 200)]);
    let gw = gateway(
        r#"
        [[routes]]
        id = "slow"
        path = "/slow/**"
        uri = "http://backend.local:8000"
        policies = ["fast"]

        [policies.time_limiter.fast]
        timeout_ms = 100
        "#,
        transport.clone(),
    );

    let resp = gw.handle(get("/slow/op")).await;
    assert_eq!(resp.status, StatusCode::GATEWAY_TIMEOUT);
    assert!(resp.body_text().contains("TIMEOUT"));
}

#[tokio::test(start_paused = true)]
async fn test_bulkhead_rejects_excess_concurrency() {
    let transport = ScriptedTransport::new(vec![Outcome::Delay(Duration::from_secs(1), 200)]);
    let gw = gateway(
        r#"
        [[routes]]
        id = "narrow"
        path = "/narrow/**"
        uri = "http://backend.local:8000"
        policies = ["narrow"]

        [policies.bulkhead.narrow]
        max_concurrent_calls = 1
        max_queue_wait_ms = 0
        "#,
        transport.clone(),
    );

    let (first, second) = futures_util::future::join(
        gw.handle(get("/narrow/a")),
        gw.handle(get("/narrow/b")),
    )
    .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(second.body_text().contains("BULKHEAD_FULL"));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_rate_limiter_rejects_over_limit() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(
        r#"
        [[routes]]
        id = "limited"
        path = "/limited/**"
        uri = "http://backend.local:8000"
        policies = ["limited"]

        [policies.rate_limiter.limited]
        limit_for_period = 2
        limit_refresh_period_ms = 60000
        admission_timeout_ms = 0
        "#,
        transport.clone(),
    );

    let mut statuses = Vec::new();
    for _ in 0..3 {
        statuses.push(gw.handle(get("/limited/x")).await.status);
    }
    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_server_errors_pass_through_unguarded_routes() {
    let transport = ScriptedTransport::new(vec![Outcome::Respond(503, "busy")]);
    let gw = gateway(
        r#"
        [[routes]]
        id = "plain"
        path = "/plain/**"
        uri = "http://backend.local:8000"
        "#,
        transport.clone(),
    );

    let resp = gw.handle(get("/plain/x")).await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.body_text(), "busy");
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_are_retried_on_guarded_routes() {
    let transport = ScriptedTransport::new(vec![
        Outcome::Respond(503, "busy"),
        Outcome::Respond(502, "bad"),
    ]);
    let gw = gateway(
        r#"
        [[routes]]
        id = "guarded"
        path = "/guarded/**"
        uri = "http://backend.local:8000"
        policies = ["retry"]

        [policies.retry.retry]
        max_attempts = 3
        wait_duration_ms = 50
        "#,
        transport.clone(),
    );

    let resp = gw.handle(get("/guarded/x")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(transport.calls(), 3);
}

struct BrokenFallback;

impl Fallback for BrokenFallback {
    fn name(&self) -> &str {
        "broken"
    }

    fn respond(
        &self,
        _request: &GatewayRequest,
        _route_id: &str,
        _failure: &GatewayError,
    ) -> Result<GatewayResponse, FallbackError> {
        Err(FallbackError {
            name: "broken".into(),
            reason: "template store offline".into(),
        })
    }
}

#[tokio::test]
async fn test_failing_fallback_is_internal_error() {
    let transport = ScriptedTransport::with_default(Vec::new(), Outcome::Fail("down"));
    let config = parse_config(
        r#"
        [[routes]]
        id = "fragile"
        path = "/fragile/**"
        uri = "http://backend.local:8000"
        fallback = "broken"

        [fallbacks.broken]
        body = "never used"
        "#,
    )
    .unwrap();
    let gw = Gateway::builder(config, transport.clone())
        .fallback("broken", Arc::new(BrokenFallback))
        .build()
        .unwrap();

    let resp = gw.handle(get("/fragile/x")).await;
    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.body_text().contains("FALLBACK_FAILURE"));
}

struct EdgeTagFilter;

#[async_trait]
impl GatewayFilter for EdgeTagFilter {
    fn name(&self) -> &str {
        "edge-tag"
    }

    fn order(&self) -> i32 {
        10
    }

    async fn on_request(&self, request: &mut GatewayRequest) -> FilterAction {
        request
            .headers
            .insert("x-edge", HeaderValue::from_static("tagged"));
        FilterAction::Continue
    }

    async fn on_response(&self, _request: &GatewayRequest, response: &mut GatewayResponse) {
        response
            .headers
            .insert("x-edge-seen", HeaderValue::from_static("1"));
    }
}

#[tokio::test]
async fn test_custom_filter_sees_both_phases() {
    let transport = ScriptedTransport::new(Vec::new());
    let config = parse_config(
        r#"
        [[routes]]
        id = "all"
        path = "/**"
        uri = "http://backend.local:8000"
        "#,
    )
    .unwrap();
    let gw = Gateway::builder(config, transport.clone())
        .filter(Arc::new(EdgeTagFilter))
        .build()
        .unwrap();
    assert_eq!(gw.filters().names(), vec!["logging", "edge-tag"]);

    let resp = gw.handle(get("/anything")).await;
    assert_eq!(resp.header("x-edge-seen"), Some("1"));
    let sent = transport.last_request().unwrap();
    assert_eq!(sent.headers.get("x-edge").unwrap(), "tagged");
}

const TRAVERSAL_CONFIG: &str = r#"
    [[routes]]
    id = "public"
    path = "/public/**"
    uri = "http://backend.local:8000"

    [[routes]]
    id = "admin"
    path = "/admin/**"
    uri = "http://backend.local:8000"
    required_role = "admin"
"#;

#[tokio::test]
async fn test_dot_segments_cannot_escape_into_protected_routes() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(TRAVERSAL_CONFIG, transport.clone());

    for path in [
        "/admin/secret",
        "/public/../admin/secret",
        "/public/%2e%2e/admin/secret",
        "/public/.%2E/admin/secret",
        "/public/./../admin/secret",
    ] {
        let resp = gw.handle(get(path)).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED, "{}", path);
    }
    assert_eq!(transport.calls(), 0);

    let resp = gw.handle(get("/public/docs/../index")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        transport.last_request().unwrap().url.as_str(),
        "http://backend.local:8000/public/index"
    );
}

#[tokio::test]
async fn test_untouched_query_is_forwarded_verbatim() {
    let transport = ScriptedTransport::new(Vec::new());
    let gw = gateway(TRAVERSAL_CONFIG, transport.clone());

    let resp = gw.handle(get("/public/search?flag&q=a%20b")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        transport.last_request().unwrap().url.as_str(),
        "http://backend.local:8000/public/search?flag&q=a%20b"
    );
}
