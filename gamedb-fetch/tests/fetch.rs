use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tokio::time::Duration;

use gamedb_fetch::{
    ChallengeSolver, DEFAULT_USER_AGENT, FetchClient, FetchConfig, FetchError, FetchRequest,
    FlareSolverr, Solution, SolutionStore, UserAgent,
};

type Hits = Arc<AtomicUsize>;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fast_client() -> FetchClient {
    FetchClient::new(FetchConfig {
        base_backoff: Duration::from_millis(5),
        ..FetchConfig::default()
    })
    .unwrap()
}

fn header_or_none(headers: &HeaderMap, name: header::HeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string()
}

// -- Retries --

async fn flaky(State(hits): State<Hits>) -> Response {
    if hits.fetch_add(1, Ordering::SeqCst) < 2 {
        (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response()
    } else {
        (StatusCode::OK, "ok").into_response()
    }
}

async fn always_down(State(hits): State<Hits>) -> StatusCode {
    hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::BAD_GATEWAY
}

async fn missing(State(hits): State<Hits>) -> StatusCode {
    hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::NOT_FOUND
}

fn retry_app(hits: Hits) -> Router {
    Router::new()
        .route("/flaky", get(flaky))
        .route("/down", get(always_down))
        .route("/missing", get(missing))
        .with_state(hits)
}

#[tokio::test]
async fn recovers_after_transient_statuses() {
    let hits = Hits::default();
    let base = spawn(retry_app(hits.clone())).await;

    let resp = fast_client()
        .fetch(&FetchRequest::get(format!("{base}/flaky")))
        .await
        .unwrap();

    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "ok");
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn backoff_waits_one_then_two_seconds() {
    let hits = Hits::default();
    let base = spawn(retry_app(hits.clone())).await;
    let client = FetchClient::new(FetchConfig::default()).unwrap();

    let started = std::time::Instant::now();
    let resp = client
        .fetch(&FetchRequest::get(format!("{base}/flaky")))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(resp.status, 200);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert!(elapsed >= Duration::from_secs(3), "waited {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "waited {elapsed:?}");
}

#[tokio::test]
async fn exhausted_budget_is_transient() {
    let hits = Hits::default();
    let base = spawn(retry_app(hits.clone())).await;

    let err = fast_client()
        .fetch(&FetchRequest::get(format!("{base}/down")).retries(2))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transient(_)), "got {err:?}");
    assert!(err.is_retryable());
    // Budget N means N + 1 attempts.
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn zero_budget_makes_one_attempt() {
    let hits = Hits::default();
    let base = spawn(retry_app(hits.clone())).await;

    let result = fast_client()
        .fetch(&FetchRequest::get(format!("{base}/down")).retries(0))
        .await;

    assert!(result.is_err());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_retryable_status_returns_immediately() {
    let hits = Hits::default();
    let base = spawn(retry_app(hits.clone())).await;

    let resp = fast_client()
        .fetch(&FetchRequest::get(format!("{base}/missing")))
        .await
        .unwrap();

    assert_eq!(resp.status, 404);
    assert!(!resp.is_success());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn connection_refused_is_transient() {
    // Bind and drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = fast_client()
        .fetch(&FetchRequest::get(format!("http://{addr}/")).retries(1))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transient(_)), "got {err:?}");
}

#[tokio::test]
async fn invalid_url_is_rejected_before_sending() {
    let err = fast_client()
        .fetch(&FetchRequest::get("not a url"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl { .. }));
}

// -- Headers, cookies and bodies --

async fn echo_agent(headers: HeaderMap) -> String {
    header_or_none(&headers, header::USER_AGENT)
}

async fn echo_cookie(headers: HeaderMap) -> String {
    header_or_none(&headers, header::COOKIE)
}

async fn echo_body(headers: HeaderMap, body: String) -> String {
    format!("{}|{}", header_or_none(&headers, header::CONTENT_TYPE), body)
}

async fn latin1() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=iso-8859-1")],
        vec![0x63u8, 0x61, 0x66, 0xe9],
    )
        .into_response()
}

fn echo_app() -> Router {
    Router::new()
        .route("/ua", get(echo_agent))
        .route("/cookie", get(echo_cookie))
        .route("/body", post(echo_body))
        .route("/latin1", get(latin1))
}

#[tokio::test]
async fn default_user_agent_is_browser_like() {
    let base = spawn(echo_app()).await;
    let resp = fast_client()
        .fetch(&FetchRequest::get(format!("{base}/ua")))
        .await
        .unwrap();
    assert_eq!(resp.text(), DEFAULT_USER_AGENT);
}

#[tokio::test]
async fn empty_user_agent_sends_none() {
    let base = spawn(echo_app()).await;
    let client = fast_client();

    let omitted = client
        .fetch(&FetchRequest::get(format!("{base}/ua")).user_agent(UserAgent::Omit))
        .await
        .unwrap();
    assert_eq!(omitted.text(), "none");

    let empty = client
        .fetch(&FetchRequest::get(format!("{base}/ua")).user_agent(UserAgent::Custom(String::new())))
        .await
        .unwrap();
    assert_eq!(empty.text(), "none");
}

#[tokio::test]
async fn custom_user_agent_is_sent() {
    let base = spawn(echo_app()).await;
    let resp = fast_client()
        .fetch(
            &FetchRequest::get(format!("{base}/ua"))
                .user_agent(UserAgent::Custom("gamedb-test/1.0".into())),
        )
        .await
        .unwrap();
    assert_eq!(resp.text(), "gamedb-test/1.0");
}

#[tokio::test]
async fn stored_solution_is_merged_into_request() {
    let base = spawn(echo_app()).await;

    let mut store = SolutionStore::in_memory();
    let mut cookies = BTreeMap::new();
    cookies.insert("cf_clearance".to_string(), "abc".to_string());
    store
        .insert(
            &base,
            Solution {
                user_agent: "Solved/1.0".to_string(),
                cookies,
            },
        )
        .unwrap();
    let client = fast_client().with_solutions(store);

    let ua = client
        .fetch(&FetchRequest::get(format!("{base}/ua")))
        .await
        .unwrap();
    assert_eq!(ua.text(), "Solved/1.0");

    let cookie = client
        .fetch(&FetchRequest::get(format!("{base}/cookie")).cookie("session", "42"))
        .await
        .unwrap();
    assert_eq!(cookie.text(), "session=42; cf_clearance=abc");
}

#[tokio::test]
async fn bodies_carry_their_content_type() {
    let base = spawn(echo_app()).await;
    let client = fast_client();

    let raw = client
        .fetch(&FetchRequest::post(format!("{base}/body")).raw_body("text/plain", "fields *;"))
        .await
        .unwrap();
    assert_eq!(raw.text(), "text/plain|fields *;");

    let form = client
        .fetch(&FetchRequest::post(format!("{base}/body")).form_body([("a", "1"), ("b", "2")]))
        .await
        .unwrap();
    assert_eq!(form.text(), "application/x-www-form-urlencoded|a=1&b=2");

    let json = client
        .fetch(
            &FetchRequest::post(format!("{base}/body"))
                .json_body(serde_json::json!({"name": "Hades"})),
        )
        .await
        .unwrap();
    assert_eq!(json.text(), r#"application/json|{"name":"Hades"}"#);
}

#[tokio::test]
async fn declared_charset_is_honored() {
    let base = spawn(echo_app()).await;
    let resp = fast_client()
        .fetch(&FetchRequest::get(format!("{base}/latin1")))
        .await
        .unwrap();
    assert_eq!(resp.text(), "café");
}

// -- Anti-bot challenges --

#[derive(Default)]
struct FakeSolver {
    calls: AtomicUsize,
    origins: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl ChallengeSolver for FakeSolver {
    async fn solve(&self, origin: &str) -> Result<Solution, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.origins.lock().unwrap().push(origin.to_string());
        let mut cookies = BTreeMap::new();
        cookies.insert("cf_clearance".to_string(), "ok".to_string());
        Ok(Solution {
            user_agent: "Solved/1.0".to_string(),
            cookies,
        })
    }
}

async fn guarded(State(hits): State<Hits>, headers: HeaderMap) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    let cookie = header_or_none(&headers, header::COOKIE);
    if cookie.contains("cf_clearance=ok") {
        (StatusCode::OK, "welcome").into_response()
    } else {
        (StatusCode::FORBIDDEN, [("cf-ray", "8a1b2c3d")], "challenge").into_response()
    }
}

async fn always_guarded(State(hits): State<Hits>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    (StatusCode::FORBIDDEN, [("cf-mitigated", "challenge")], "challenge").into_response()
}

fn guarded_app(hits: Hits) -> Router {
    Router::new()
        .route("/guarded", get(guarded))
        .route("/always", get(always_guarded))
        .with_state(hits)
}

#[tokio::test]
async fn challenge_is_solved_and_persisted() {
    let hits = Hits::default();
    let base = spawn(guarded_app(hits.clone())).await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("solution.json");

    let solver = Arc::new(FakeSolver::default());
    let client = FetchClient::new(FetchConfig {
        base_backoff: Duration::from_millis(5),
        solution_path: Some(path.clone()),
        ..FetchConfig::default()
    })
    .unwrap()
    .with_solver(solver.clone());

    let resp = client
        .fetch(&FetchRequest::get(format!("{base}/guarded")))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.text(), "welcome");
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    // The solver sees the origin, not the full request path.
    assert_eq!(*solver.origins.lock().unwrap(), vec![base.clone()]);

    let reloaded = SolutionStore::load(&path);
    let solution = reloaded.get(&base).unwrap();
    assert_eq!(solution.user_agent, "Solved/1.0");
    assert_eq!(solution.cookies.get("cf_clearance").unwrap(), "ok");

    // Later requests reuse the solution without asking the solver.
    client
        .fetch(&FetchRequest::get(format!("{base}/guarded")))
        .await
        .unwrap();
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn challenge_reissues_exactly_once() {
    let hits = Hits::default();
    let base = spawn(guarded_app(hits.clone())).await;
    let solver = Arc::new(FakeSolver::default());
    let client = fast_client().with_solver(solver.clone());

    let resp = client
        .fetch(&FetchRequest::get(format!("{base}/always")))
        .await
        .unwrap();
    assert_eq!(resp.status, 403);
    assert!(resp.is_challenge());
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn challenge_without_solver_is_returned() {
    let hits = Hits::default();
    let base = spawn(guarded_app(hits.clone())).await;

    let resp = fast_client()
        .fetch(&FetchRequest::get(format!("{base}/guarded")))
        .await
        .unwrap();
    assert_eq!(resp.status, 403);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

// -- FlareSolverr --

async fn solver_error_page() -> Response {
    let body = format!("{}é — erreur interne", "a".repeat(199));
    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
}

async fn solver_ok(body: String) -> Response {
    let request: serde_json::Value = serde_json::from_str(&body).unwrap();
    let reply = serde_json::json!({
        "status": "ok",
        "message": "",
        "solution": {
            "userAgent": "Solver/2.0",
            "cookies": [{"name": "cf_clearance", "value": request["url"]}],
        },
    });
    (StatusCode::OK, reply.to_string()).into_response()
}

#[tokio::test]
async fn flaresolverr_solution_is_parsed() {
    let base = spawn(Router::new().route("/v1", post(solver_ok))).await;
    let solver = FlareSolverr::new(format!("{base}/v1")).unwrap();

    let solution = solver.solve("https://www.1337x.to").await.unwrap();
    assert_eq!(solution.user_agent, "Solver/2.0");
    assert_eq!(solution.cookies.get("cf_clearance").unwrap(), "https://www.1337x.to");
}

#[tokio::test]
async fn flaresolverr_non_json_reply_is_an_error() {
    let base = spawn(Router::new().route("/v1", post(solver_error_page))).await;
    let solver = FlareSolverr::new(format!("{base}/v1")).unwrap();

    let err = solver.solve("https://www.1337x.to").await.unwrap_err();
    let FetchError::Solver(message) = err else {
        panic!("expected a solver error, got {err:?}");
    };
    assert!(message.contains("aaaé"), "{message}");
    assert!(!message.contains("erreur"), "{message}");
}
