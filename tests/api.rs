mod common;

use common::*;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

use quoteboard::db::SqliteStore;
use quoteboard::model::QuoteMode;
use quoteboard::server::{build_router, AppState};

const SECRET: &str = "s3cret-cron-token";

struct TestApp {
    base: String,
    http: Client,
    store: Arc<SqliteStore>,
}

impl TestApp {
    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(format!("{}{path}", self.base))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(format!("{}{path}", self.base))
    }

    fn cron(&self, secret: Option<&str>) -> RequestBuilder {
        let req = self.post("/api/jobs/send-quotes");
        match secret {
            Some(s) => req.header("x-cron-secret", s),
            None => req,
        }
    }
}

async fn spawn_app(secret: Option<&str>) -> TestApp {
    let store = Arc::new(setup_store().await);
    let (providers, _, _) = registry();
    let state = AppState {
        store: store.clone(),
        providers: Arc::new(providers),
        sender: Arc::new(RecordingSender::default()),
        cron_secret: secret.map(str::to_string),
        missing_settings: if secret.is_some() {
            vec![]
        } else {
            vec!["server.cron_secret"]
        },
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    TestApp {
        base: format!("http://{addr}"),
        http: Client::new(),
        store,
    }
}

async fn call(req: RequestBuilder) -> (StatusCode, Value) {
    let res = req.send().await.unwrap();
    let status = res.status();
    let body = res.json::<Value>().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app(Some(SECRET)).await;
    let (status, body) = call(app.get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "quoteboard");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn cron_route_requires_configured_secret() {
    let app = spawn_app(None).await;
    let (status, body) = call(app.cron(Some("anything"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ok"], false);
    assert_eq!(body["setupRequired"], true);
    assert_eq!(body["missing"], json!(["server.cron_secret"]));
}

#[tokio::test]
async fn cron_route_rejects_wrong_or_missing_secret() {
    let app = spawn_app(Some(SECRET)).await;
    let (status, body) = call(app.cron(Some("nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["ok"], false);

    let (status, _) = call(app.cron(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cron_route_runs_a_batch() {
    let app = spawn_app(Some(SECRET)).await;
    add_board(&app.store, "lobby", QuoteMode::DailyScript, 60).await;

    let (status, body) = call(app.cron(Some(SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(
        body["result"],
        json!({ "scanned": 1, "due": 1, "sent": 1, "failed": 0 })
    );

    // Nothing is due right after a send
    let (_, body) = call(app.cron(Some(SECRET))).await;
    assert_eq!(body["result"]["due"], 0);
}

#[tokio::test]
async fn test_send_without_settings_is_not_found() {
    let app = spawn_app(Some(SECRET)).await;
    let (status, body) = call(app.post("/api/test-send").json(&json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("No active board"));
}

#[tokio::test]
async fn test_send_rejects_malformed_body() {
    let app = spawn_app(Some(SECRET)).await;
    let req = app
        .post("/api/test-send")
        .header("content-type", "application/json")
        .body("{oops");
    let (status, body) = call(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn settings_then_test_send_then_logs() {
    let app = spawn_app(Some(SECRET)).await;

    let (status, body) = call(app.get("/api/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["settings"].is_null());

    let (status, body) = call(app.post("/api/settings").json(&json!({
        "boardName": "Kitchen",
        "apiKey": "kitchen-write-key",
        "mode": "RICK_MORTY",
    })))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["boardName"], "Kitchen");
    assert_eq!(body["settings"]["mode"], "RICK_MORTY");
    assert_eq!(body["settings"]["intervalMinutes"], 60);
    assert_eq!(body["settings"]["hasApiSecret"], false);
    assert_ne!(body["settings"]["apiKeyMasked"], "kitchen-write-key");

    let (status, body) = call(app.post("/api/test-send")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"], "Quote delivered to Vestaboard.");
    assert_eq!(body["quote"]["ref"], "rm-0");
    assert!(body["quote"]["text"].is_string());

    let (status, body) = call(app.get("/api/logs?limit=abc")).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "SUCCESS");
    assert_eq!(items[0]["boardName"], "Kitchen");
    assert_eq!(items[0]["quoteRef"], "rm-0");
}

#[tokio::test]
async fn logs_limit_is_clamped() {
    let app = spawn_app(Some(SECRET)).await;
    add_board(&app.store, "hall", QuoteMode::DailyScript, 60).await;
    for _ in 0..3 {
        let (status, _) = call(app.post("/api/test-send").json(&json!({}))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = call(app.get("/api/logs?limit=0")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (_, body) = call(app.get("/api/logs?limit=1000")).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn first_settings_save_needs_api_key() {
    let app = spawn_app(Some(SECRET)).await;
    let (status, body) = call(app.post("/api/settings").json(&json!({ "boardName": "Den" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("API key"));
}

#[tokio::test]
async fn invalid_settings_list_issues() {
    let app = spawn_app(Some(SECRET)).await;
    let (status, body) = call(app.post("/api/settings").json(&json!({
        "apiKey": "long-enough-key",
        "intervalMinutes": 5000,
        "timezone": "X",
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], false);
    assert_eq!(body["issues"].as_array().unwrap().len(), 2);
}
