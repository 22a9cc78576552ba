//! End-to-end tests: build the full router over temp storage with a stub
//! classifier and drive it with `oneshot` requests.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use food_recognition_api::{
    config::Config,
    models::prediction::Classification,
    routes::create_routes,
    services::{
        classifier::{Classifier, ClassifierError},
        food_catalog::FoodCatalog,
        imaging::DecodedImage,
    },
    state::AppState,
};

const BOUNDARY: &str = "food-test-boundary";

const CATALOG: &str = r#"{
    "pho": {
        "name_en": "Pho",
        "region": "north",
        "description_vn": "Món nước với bánh phở và thịt bò",
        "description_en": "Rice noodle soup with beef",
        "ingredients_vn": "Bánh phở, thịt bò, hành",
        "ingredients_en": "Rice noodles, beef, scallions",
        "related": ["bun_cha", "bun_bo_hue"]
    },
    "bun_cha": {
        "name_en": "Bun cha",
        "region": "north",
        "description_vn": "Bún với chả nướng",
        "ingredients_vn": "Bún, thịt lợn nướng"
    },
    "banh_xeo": {
        "region": "south",
        "description_vn": "Bánh xèo giòn nhân tôm",
        "description_en": "Crispy pancake with shrimp",
        "ingredients_vn": "Bột gạo, tôm, giá"
    }
}"#;

/// Always answers `pho`.
struct StubClassifier;

#[async_trait]
impl Classifier for StubClassifier {
    async fn classify(
        &self,
        _image: &DecodedImage,
        _top_k: usize,
    ) -> Result<Classification, ClassifierError> {
        Ok(Classification {
            label: "pho".to_string(),
            confidence: 92.5,
            alternatives: vec![
                "bun_cha".to_string(),
                "banh_xeo".to_string(),
                "bun_bo_hue".to_string(),
            ],
        })
    }
}

struct TestApp {
    router: Router,
    _dir: TempDir,
}

struct Reply {
    status: StatusCode,
    headers: header::HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            data_dir: dir.path().to_path_buf(),
            bcrypt_cost: 4,
            ..Config::default()
        };
        adjust(&mut config);
        let catalog = FoodCatalog::from_json(CATALOG).unwrap();
        let state = AppState::new(
            &config,
            "integration-test-secret-key-0123456789",
            catalog,
            Arc::new(StubClassifier),
        );

        Self {
            router: create_routes(state),
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn register(&self, username: &str, password: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/register",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    async fn login(&self, username: &str, password: &str) -> Reply {
        self.call(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// Register and log in, returning the access and refresh tokens.
    async fn sign_up(&self, username: &str, password: &str) -> (String, String) {
        assert_eq!(self.register(username, password).await.status, StatusCode::OK);
        let reply = self.login(username, password).await;
        assert_eq!(reply.status, StatusCode::OK);
        (
            reply.body["access_token"].as_str().unwrap().to_string(),
            reply.body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    async fn predict(&self, token: Option<&str>, image: &[u8]) -> Reply {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"dish.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(
            format!(
                "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"lang\"\r\n\r\nEN\r\n--{BOUNDARY}--\r\n"
            )
            .as_bytes(),
        );

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    async fn history(&self, token: &str) -> Reply {
        self.call(Method::GET, "/api/history", Some(token), None).await
    }
}

fn dish_png() -> Vec<u8> {
    let img = RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 8) as u8, (y * 10) as u8, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = TestApp::new();
    let reply = app.call(Method::GET, "/api/health", None, None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
    assert_eq!(reply.body["success"], true);
}

#[tokio::test]
async fn authenticated_predictions_are_recorded_for_their_owner_only() {
    let app = TestApp::new();
    let (token, _) = app.sign_up("alice", "pw123").await;

    let reply = app.predict(Some(&token), &dish_png()).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["food_name"], "pho");
    assert_eq!(reply.body["food_info"]["name"], "Pho");
    assert_eq!(reply.body["related"].as_array().unwrap().len(), 3);

    let history = app.history(&token).await;
    assert_eq!(history.status, StatusCode::OK);
    assert_eq!(history.body["username"], "alice");
    let records = history.body["history"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["food_name"], "pho");
    assert!(records[0]["image_base64"].is_string());

    // Anonymous predictions are served but never recorded.
    let anonymous = app.predict(None, &dish_png()).await;
    assert_eq!(anonymous.status, StatusCode::OK);
    let history = app.history(&token).await;
    assert_eq!(history.body["history"].as_array().unwrap().len(), 1);

    // Another user sees nothing of alice's and cannot delete her records.
    let (bob, _) = app.sign_up("bob", "pw456").await;
    let record_id = records[0]["_id"].as_str().unwrap().to_string();
    let bobs = app.history(&bob).await;
    assert!(bobs.body["history"].as_array().unwrap().is_empty());
    let stolen = app
        .call(
            Method::DELETE,
            &format!("/api/history/{record_id}"),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(stolen.status, StatusCode::NOT_FOUND);

    let deleted = app
        .call(
            Method::DELETE,
            &format!("/api/history/{record_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["deleted_by"], "alice");
    assert!(
        app.history(&token).await.body["history"]
            .as_array()
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn anonymous_predict_quota_is_enforced_independently() {
    let app = TestApp::new();
    let image = dish_png();

    for _ in 0..5 {
        assert_eq!(app.predict(None, &image).await.status, StatusCode::OK);
    }
    let limited = app.predict(None, &image).await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(limited.body["error"], "rate_limited");
    assert!(limited.headers.contains_key(header::RETRY_AFTER));

    // Signing in switches to the authenticated quota.
    let (token, _) = app.sign_up("carol", "pw789").await;
    assert_eq!(app.predict(Some(&token), &image).await.status, StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_runs_before_image_validation() {
    let app = TestApp::new();
    for _ in 0..5 {
        let reply = app.predict(None, b"not an image").await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"], "invalid_image");
    }
    let reply = app.predict(None, b"not an image").await;
    assert_eq!(reply.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn history_requires_a_valid_access_token() {
    let app = TestApp::new();

    let missing = app.call(Method::GET, "/api/history", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.body["message"], "Missing or invalid authorization header");

    let garbage = app.history("not-a-token").await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
    assert_eq!(garbage.body["message"], "Invalid or expired token");

    // A refresh token is not an access token.
    let (_, refresh) = app.sign_up("dave", "pw123").await;
    let wrong_kind = app.history(&refresh).await;
    assert_eq!(wrong_kind.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_mints_a_working_access_token() {
    let app = TestApp::new();
    let (access, refresh) = app.sign_up("erin", "pw123").await;

    let reply = app
        .call(
            Method::POST,
            "/api/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["token_type"], "Bearer");
    assert_eq!(reply.body["expires_in"], 900);
    let fresh = reply.body["access_token"].as_str().unwrap();
    assert_eq!(app.history(fresh).await.status, StatusCode::OK);

    // Access tokens cannot be used to refresh.
    let misuse = app
        .call(
            Method::POST,
            "/api/refresh",
            None,
            Some(json!({ "refresh_token": access })),
        )
        .await;
    assert_eq!(misuse.status, StatusCode::UNAUTHORIZED);

    let empty = app
        .call(Method::POST, "/api/refresh", None, Some(json!({})))
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn registration_and_login_errors() {
    let app = TestApp::new();
    assert_eq!(app.register("frank", "pw123").await.status, StatusCode::OK);

    let duplicate = app.register("frank", "other1").await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.body["message"], "Username already exists");

    let case_variant = app.register("Frank", "other1").await;
    assert_eq!(case_variant.status, StatusCode::BAD_REQUEST);
    assert_eq!(case_variant.body["message"], "Username already exists");
    assert_eq!(app.login("Frank", "other1").await.status, StatusCode::UNAUTHORIZED);

    let missing = app.register("", "pw123").await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);

    let wrong = app.login("frank", "nope-nope").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["message"], "Invalid username or password");

    let unknown = app.login("ghost", "pw123").await;
    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);

    let ok = app.login("frank", "pw123").await;
    assert_eq!(ok.body["username"], "frank");
}

#[tokio::test]
async fn register_quota_is_distinct_from_conflicts() {
    let app = TestApp::new();
    for i in 0..5 {
        let reply = app.register("same_name", "pw123").await;
        let expected = if i == 0 {
            StatusCode::OK
        } else {
            StatusCode::BAD_REQUEST
        };
        assert_eq!(reply.status, expected);
    }
    let limited = app.register("other_name", "pw123").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn history_delete_unknown_or_malformed_id_is_not_found() {
    let app = TestApp::new();
    let (token, _) = app.sign_up("gina", "pw123").await;

    let unknown = app
        .call(
            Method::DELETE,
            "/api/history/550e8400-e29b-41d4-a716-446655440000",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.body["message"], "Item not found");

    let malformed = app
        .call(Method::DELETE, "/api/history/abc", Some(&token), None)
        .await;
    assert_eq!(malformed.status, StatusCode::NOT_FOUND);

    let purge = app
        .call(Method::DELETE, "/api/history", Some(&token), None)
        .await;
    assert_eq!(purge.status, StatusCode::OK);
    assert_eq!(purge.body["message"], "History deleted");
}

#[tokio::test]
async fn food_search_and_detail() {
    let app = TestApp::new();

    let reply = app
        .call(
            Method::GET,
            "/api/foods/search?region=north&per_page=1&page=2&lang=EN",
            None,
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["foods"][0]["id"], "bun_cha");
    assert_eq!(reply.body["pagination"]["total"], 2);
    assert_eq!(reply.body["pagination"]["has_prev"], true);
    assert_eq!(reply.body["pagination"]["has_next"], false);

    let by_text = app
        .call(Method::GET, "/api/foods/search?search=SHRIMP&lang=EN", None, None)
        .await;
    assert_eq!(by_text.body["foods"][0]["id"], "banh_xeo");

    let bad_region = app
        .call(Method::GET, "/api/foods/search?region=west", None, None)
        .await;
    assert_eq!(bad_region.status, StatusCode::BAD_REQUEST);

    let detail = app
        .call(Method::GET, "/api/food/pho?lang=EN", None, None)
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["food"]["ingredients"], "Rice noodles, beef, scallions");

    let vn = app.call(Method::GET, "/api/food/pho", None, None).await;
    assert_eq!(vn.body["food"]["name"], "pho");

    let blank_lang = app.call(Method::GET, "/api/food/pho?lang=", None, None).await;
    assert_eq!(blank_lang.status, StatusCode::OK);
    assert_eq!(blank_lang.body["food"]["name"], "pho");

    let blank_search = app
        .call(Method::GET, "/api/foods/search?lang=&region=", None, None)
        .await;
    assert_eq!(blank_search.status, StatusCode::OK);
    assert_eq!(blank_search.body["pagination"]["total"], 3);

    let missing = app.call(Method::GET, "/api/food/pizza", None, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["message"], "Food not found");
}

#[tokio::test]
async fn unknown_paths_get_json_not_found() {
    let app = TestApp::new();
    let reply = app.call(Method::GET, "/api/nope", None, None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["success"], false);
    assert_eq!(reply.body["error"], "not_found");
}

#[tokio::test]
async fn predict_without_image_is_rejected() {
    let app = TestApp::new();
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"lang\"\r\n\r\nVN\r\n--{BOUNDARY}--\r\n"
    );
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();

    let reply = app.send(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "No image provided");
}

#[tokio::test]
async fn oversized_upload_is_payload_too_large() {
    let app = TestApp::with_config(|config| config.max_upload_bytes = 16 * 1024);

    let reply = app.predict(None, &vec![0u8; 64 * 1024]).await;
    assert_eq!(reply.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(reply.body["error"], "payload_too_large");

    let small = app.predict(None, &dish_png()).await;
    assert_eq!(small.status, StatusCode::OK);
}
