//! End-to-end tests of the HTTP API
//!
//! Requests go through the full router (path normalization, CORS, auth
//! extractor) via `tower::ServiceExt::oneshot`; no socket is opened.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

use wishbot::api::{create_app, ApiState};
use wishcore::{config, create_pool, InitDataVerifier};

const BOT_TOKEN: &str = "123456:TEST-token-for-api-tests";
const UNAUTHORIZED: &str = "Could not validate credentials";

struct TestApp {
    _dir: TempDir,
    app: NormalizePath<Router>,
    verifier: Arc<InitDataVerifier>,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.sqlite");
        let pool = Arc::new(create_pool(path.to_str().unwrap()).unwrap());
        let verifier = Arc::new(InitDataVerifier::new(BOT_TOKEN));
        let app = create_app(ApiState::new(pool, verifier.clone()));
        Self { _dir: dir, app, verifier }
    }

    fn init_data_at(&self, telegram_id: i64, first_name: &str, auth_date: i64) -> String {
        let mut fields = BTreeMap::new();
        fields.insert("auth_date".to_string(), auth_date.to_string());
        fields.insert("query_id".to_string(), "AAHdF6IQAAAAAN0XohDhrOrc".to_string());
        fields.insert(
            "user".to_string(),
            json!({"id": telegram_id, "first_name": first_name, "language_code": "ru"}).to_string(),
        );
        self.verifier.encode_signed(&fields)
    }

    fn init_data(&self, telegram_id: i64, first_name: &str) -> String {
        self.init_data_at(telegram_id, first_name, chrono::Utc::now().timestamp())
    }

    async fn send(&self, method: Method, uri: &str, init_data: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(init_data) = init_data {
            builder = builder.header(config::auth::INIT_DATA_HEADER, init_data);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    async fn get(&self, uri: &str, auth: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(auth), None).await
    }

    async fn post(&self, uri: &str, auth: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(auth), Some(body)).await
    }

    async fn put(&self, uri: &str, auth: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(auth), Some(body)).await
    }

    async fn delete(&self, uri: &str, auth: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(auth), None).await
    }

    async fn create_wish(&self, auth: &str, title: &str) -> i64 {
        let (status, wish) = self.post("/api/wishes", auth, json!({"title": title})).await;
        assert_eq!(status, StatusCode::CREATED);
        wish["id"].as_i64().unwrap()
    }

    /// Creates a group owned by `owner` and joins every user in `members`
    async fn create_group(&self, owner: &str, members: &[&str]) -> i64 {
        let (status, group) = self.post("/api/groups", owner, json!({"name": "Семья"})).await;
        assert_eq!(status, StatusCode::CREATED);
        let group_id = group["id"].as_i64().unwrap();
        let code = group["invite_code"].as_str().unwrap().to_string();

        for member in members {
            let (status, _) = self
                .post(&format!("/api/groups/{}/join", group_id), member, json!({"invite_code": code}))
                .await;
            assert_eq!(status, StatusCode::OK);
        }
        group_id
    }
}

#[tokio::test]
async fn test_health_needs_no_auth() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], config::VERSION);
}

#[tokio::test]
async fn test_missing_header_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/user/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"detail": UNAUTHORIZED}));
}

#[tokio::test]
async fn test_rejections_share_one_body() {
    let app = TestApp::new();

    let tampered = app.init_data(1001, "Alice").replace("Alice", "Mallory");
    let expired = app.init_data_at(1001, "Alice", chrono::Utc::now().timestamp() - 2 * 3600);
    let foreign = InitDataVerifier::new("999:other-bot").encode_signed(&BTreeMap::from([
        ("auth_date".to_string(), chrono::Utc::now().timestamp().to_string()),
        ("user".to_string(), json!({"id": 1001, "first_name": "Alice"}).to_string()),
    ]));

    for init_data in [tampered.as_str(), expired.as_str(), foreign.as_str(), "garbage", ""] {
        let (status, body) = app.get("/api/user/profile", init_data).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "accepted {:?}", init_data);
        assert_eq!(body, json!({"detail": UNAUTHORIZED}));
    }
}

#[tokio::test]
async fn test_profile_is_created_on_first_request() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");

    let (status, profile) = app.get("/api/user/profile", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["telegram_id"], 1001);
    assert_eq!(profile["first_name"], "Alice");
    assert_eq!(profile["wishes_count"], 0);

    let (status, updated) = app
        .put("/api/user/profile", &alice, json!({"birthday": "1990-05-17", "first_name": "  Алиса "}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["first_name"], "Алиса");
    assert_eq!(updated["birthday"], "1990-05-17");

    // Profile edits survive the next request: the API never overwrites names from initData
    let (_, profile) = app.get("/api/user/profile", &alice).await;
    assert_eq!(profile["first_name"], "Алиса");

    let (status, body) = app.put("/api/user/profile", &alice, json!({"birthday": "17.05.1990"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_wish_lifecycle() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");
    let bob = app.init_data(1002, "Bob");

    let (status, wish) = app
        .post("/api/wishes", &alice, json!({"title": " Велосипед ", "price": 25000, "currency": "rub"}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(wish["title"], "Велосипед");
    assert_eq!(wish["currency"], "RUB");
    assert_eq!(wish["priority"], 2);
    assert_eq!(wish["status"], "active");
    let wish_id = wish["id"].as_i64().unwrap();
    let uri = format!("/api/wishes/{}", wish_id);

    let (status, updated) = app.put(&uri, &alice, json!({"title": "Горный велосипед", "price": null})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Горный велосипед");
    assert_eq!(updated["price"], Value::Null);

    let (status, body) = app.get(&uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Wish not found"}));
    let (status, _) = app.delete(&uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, completed) = app
        .send(Method::PATCH, &format!("{}/complete", uri), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "completed");
    assert!(completed["completed_at"].is_string());

    let (_, active) = app.get("/api/wishes", &alice).await;
    assert_eq!(active["total"], 0);
    let (_, done) = app.get("/api/wishes?status=completed", &alice).await;
    assert_eq!(done["total"], 1);

    let (status, body) = app.delete(&uri, &alice).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    let (status, _) = app.get(&uri, &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wish_validation_errors_are_bad_requests() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");

    let (status, _) = app.post("/api/wishes", &alice, json!({"title": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/api/wishes", &alice, json!({"title": "Книга", "priority": 7})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.post("/api/wishes", &alice, json!({"price": 10})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/wishes/not-a-number", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/wishes?page=0", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wish_pagination_and_search() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");
    for title in ["Книга", "Настольная игра", "Книжная полка"] {
        app.create_wish(&alice, title).await;
    }

    let (status, page) = app.get("/api/wishes?page=1&page_size=2", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["total"], 3);
    assert_eq!(page["total_pages"], 2);

    let (_, page) = app.get("/api/wishes?page=2&page_size=2", &alice).await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (_, found) = app.get("/api/wishes?search=%D0%9A%D0%9D%D0%98%D0%96", &alice).await;
    assert_eq!(found["total"], 1);
    assert_eq!(found["items"][0]["title"], "Книжная полка");
}

#[tokio::test]
async fn test_trailing_slash_reaches_same_route() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");
    app.create_wish(&alice, "Книга").await;

    let (status, page) = app.get("/api/wishes/", &alice).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, body) = app.get("/api/nothing-here", &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Not Found"}));
}

#[tokio::test]
async fn test_public_profile_and_wishes() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");
    let bob = app.init_data(1002, "Bob");

    let (_, wish) = app
        .post("/api/wishes", &alice, json!({"title": "Плед", "notes": "синий, не серый"}))
        .await;
    app.post("/api/wishes", &alice, json!({"title": "Секрет", "is_public": false})).await;
    let alice_id = wish["user_id"].as_i64().unwrap();

    let (status, user) = app.get(&format!("/api/user/{}", alice_id), &bob).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["first_name"], "Alice");
    assert!(user.get("telegram_id").is_none());

    let (_, seen_by_bob) = app.get(&format!("/api/user/{}/wishes", alice_id), &bob).await;
    let seen_by_bob = seen_by_bob.as_array().unwrap();
    assert_eq!(seen_by_bob.len(), 1);
    assert_eq!(seen_by_bob[0]["notes"], Value::Null);

    let (_, seen_by_alice) = app.get(&format!("/api/user/{}/wishes", alice_id), &alice).await;
    assert_eq!(seen_by_alice[0]["notes"], "синий, не серый");

    let (status, _) = app.get("/api/user/999999", &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_group_membership_rules() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");
    let bob = app.init_data(1002, "Bob");

    let (status, group) = app.post("/api/groups", &alice, json!({"name": "Друзья"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(group["invite_code"].as_str().unwrap().len(), 16);
    let group_id = group["id"].as_i64().unwrap();
    let group_uri = format!("/api/groups/{}", group_id);
    let join_uri = format!("{}/join", group_uri);

    let (status, body) = app.get(&group_uri, &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"detail": "Not a member of this group"}));

    let (status, _) = app.post(&join_uri, &bob, json!({"invite_code": "wrong-code"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let code = group["invite_code"].clone();
    let (status, membership) = app.post(&join_uri, &bob, json!({"invite_code": code})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(membership["role"], "member");

    let (status, body) = app.post(&join_uri, &bob, json!({"invite_code": code})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"detail": "Already a member of this group"}));

    let (_, members) = app.get(&format!("{}/members", group_uri), &bob).await;
    let roles: Vec<&str> = members.as_array().unwrap().iter().map(|m| m["role"].as_str().unwrap()).collect();
    assert_eq!(roles, vec!["owner", "member"]);

    let (status, _) = app.put(&group_uri, &bob, json!({"name": "Захват"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, renamed) = app.put(&group_uri, &alice, json!({"name": "Лучшие друзья"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Лучшие друзья");

    let (_, bobs_groups) = app.get("/api/groups", &bob).await;
    assert_eq!(bobs_groups[0]["member_count"], 2);
}

#[tokio::test]
async fn test_reservations_stay_hidden_from_the_wish_owner() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");
    let bob = app.init_data(1002, "Bob");
    let carol = app.init_data(1003, "Carol");

    let wish_id = app.create_wish(&alice, "Кофемолка").await;
    let group_id = app.create_group(&alice, &[&bob, &carol]).await;
    let group_wishes = format!("/api/groups/{}/wishes", group_id);

    let (status, reservation) = app
        .post(
            "/api/reservations",
            &bob,
            json!({"wish_id": wish_id, "group_id": group_id, "notes": "куплю в субботу"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let reservation_id = reservation["id"].as_i64().unwrap();

    let (status, body) = app
        .post("/api/reservations", &carol, json!({"wish_id": wish_id, "group_id": group_id}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"detail": "Wish is already reserved in this group"}));

    let (status, _) = app
        .post("/api/reservations", &alice, json!({"wish_id": wish_id, "group_id": group_id}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, seen_by_alice) = app.get(&group_wishes, &alice).await;
    assert_eq!(seen_by_alice[0]["is_reserved"], false);
    assert_eq!(seen_by_alice[0]["reserved_by"], Value::Null);

    let (_, seen_by_carol) = app.get(&group_wishes, &carol).await;
    assert_eq!(seen_by_carol[0]["is_reserved"], true);
    assert_eq!(seen_by_carol[0]["reservation_notes"], Value::Null);

    let (_, seen_by_bob) = app.get(&group_wishes, &bob).await;
    assert_eq!(seen_by_bob[0]["reservation_notes"], "куплю в субботу");

    let (_, mine) = app.get("/api/reservations", &bob).await;
    assert_eq!(mine[0]["wish_title"], "Кофемолка");

    let reservation_uri = format!("/api/reservations/{}", reservation_id);
    let (status, _) = app.delete(&reservation_uri, &carol).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&reservation_uri, &bob).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, seen_by_carol) = app.get(&group_wishes, &carol).await;
    assert_eq!(seen_by_carol[0]["is_reserved"], false);
}

#[tokio::test]
async fn test_outsider_cannot_reserve() {
    let app = TestApp::new();
    let alice = app.init_data(1001, "Alice");
    let mallory = app.init_data(1666, "Mallory");

    let wish_id = app.create_wish(&alice, "Часы").await;
    let group_id = app.create_group(&alice, &[]).await;

    let (status, _) = app
        .post("/api/reservations", &mallory, json!({"wish_id": wish_id, "group_id": group_id}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/api/groups/{}/wishes", group_id), &mallory).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
