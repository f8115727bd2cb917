#![allow(dead_code)]

use anyhow::Result;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tower::ServiceExt;

use lightbox::config::AppConfig;
use lightbox::infra::db::Db;
use lightbox::infra::storage::BlobStore;
use lightbox::AppState;

pub const DEFAULT_PASSWORD: &str = "testpassword123";
pub const STORAGE_PUBLIC_URL: &str = "https://acct.blob.example.net";

// ---------------------------------------------------------------------------
// MemoryStore — in-memory BlobStore standing in for S3
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<BTreeMap<(String, String), Bytes>>>,
}

impl MemoryStore {
    pub fn insert(&self, container: &str, name: &str, data: impl Into<Bytes>) {
        self.objects
            .lock()
            .unwrap()
            .insert((container.to_string(), name.to_string()), data.into());
    }

    pub fn object(&self, container: &str, name: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(&(container.to_string(), name.to_string()))
            .cloned()
    }

    pub fn names(&self, container: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, name)| name.clone())
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(
        &self,
        container: &str,
        name: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<()> {
        self.insert(container, name, data);
        Ok(())
    }

    async fn get(&self, container: &str, name: &str) -> Result<Bytes> {
        self.object(container, name)
            .ok_or_else(|| anyhow::anyhow!("no such object: {}/{}", container, name))
    }

    async fn list_names(&self, container: &str) -> Result<Vec<String>> {
        Ok(self.names(container))
    }
}

// ---------------------------------------------------------------------------
// TestApp — shared, lazily initialized once per test binary
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub blobs: MemoryStore,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub token: String,
}

static TEST_APP: OnceCell<TestApp> = OnceCell::const_new();

/// Get (or lazily create) the shared TestApp instance.
pub async fn app() -> &'static TestApp {
    TEST_APP
        .get_or_init(|| async { TestApp::setup().await })
        .await
}

impl TestApp {
    async fn setup() -> Self {
        // One database file per test binary; remove leftovers from prior runs.
        let db_path =
            std::env::temp_dir().join(format!("lightbox_test_{}.db", std::process::id()));
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", db_path.display(), suffix));
        }

        let config = AppConfig {
            http_addr: "127.0.0.1:0".into(),
            app_mode: "api".into(),
            database_url: format!("sqlite://{}", db_path.display()),
            s3_endpoint: "http://localhost:4566".into(),
            s3_region: "us-east-1".into(),
            storage_public_url: STORAGE_PUBLIC_URL.into(),
            original_container: "original".into(),
            thumbnail_container: "thumbnail".into(),
            db_max_connections: 5,
            db_connect_timeout_seconds: 30,
            db_busy_timeout_seconds: 5,
            session_ttl_hours: 24,
            upload_max_bytes: 10 * 1024 * 1024,
        };

        let db = Db::connect(&config).await.expect("Db::connect failed");
        let blobs = MemoryStore::default();

        let state = AppState {
            db,
            storage: Arc::new(blobs.clone()),
            storage_public_url: config.storage_public_url.clone(),
            original_container: config.original_container.clone(),
            thumbnail_container: config.thumbnail_container.clone(),
            session_ttl_hours: config.session_ttl_hours,
            upload_max_bytes: config.upload_max_bytes,
        };

        let router = lightbox::http::router(state.clone());

        TestApp {
            router,
            state,
            blobs,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helpers
    // ------------------------------------------------------------------

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        self.send(request).await
    }

    /// Send a request with an arbitrary raw body (used for multipart).
    pub async fn request_raw(
        &self,
        method: Method,
        path: &str,
        content_type: &str,
        body: Vec<u8>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost")
            .header("content-type", content_type);

        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            builder = builder.header("Authorization", auth);
        }

        let request = builder.body(Body::from(body)).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    /// Upload a file through the multipart endpoint.
    pub async fn upload_file(
        &self,
        token: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        caption: Option<&str>,
    ) -> TestResponse {
        const BOUNDARY: &str = "lightbox-test-boundary";

        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n\
                 Content-Type: {}\r\n\r\n",
                BOUNDARY, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
        if let Some(caption) = caption {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\n{}\r\n",
                    BOUNDARY, caption
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        self.request_raw(
            Method::POST,
            "/upload",
            &format!("multipart/form-data; boundary={}", BOUNDARY),
            body,
            Some(token),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    /// Create a user directly in the DB and log in via the API for a token.
    pub async fn create_user(&self, suffix: &str) -> TestUser {
        let username = format!("user_{}", suffix);
        let email = format!("{}@example.com", suffix);

        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        let hash = Argon2::default()
            .hash_password(DEFAULT_PASSWORD.as_bytes(), &salt)
            .expect("password hash failed")
            .to_string();

        // Commit explicitly: a RETURNING insert stays pending on the pooled
        // connection until the transaction ends.
        let mut tx = self.state.db.pool().begin().await.expect("begin failed");
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(&username)
        .bind(&email)
        .bind(&hash)
        .fetch_one(&mut *tx)
        .await
        .expect("insert test user failed");
        tx.commit().await.expect("commit failed");

        let resp = self
            .post_json(
                "/login",
                json!({ "username": username, "password": DEFAULT_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK, "login for test user failed");
        let token = resp.json()["token"].as_str().expect("token").to_string();

        TestUser {
            id,
            username,
            email,
            token,
        }
    }
}

// ---------------------------------------------------------------------------
// Image fixtures
// ---------------------------------------------------------------------------

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_fixture(width, height, image::ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_fixture(width, height, image::ImageFormat::Jpeg)
}

fn encode_fixture(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([120, 80, 200]),
    ));
    let mut cursor = std::io::Cursor::new(Vec::new());
    img.write_to(&mut cursor, format).expect("encode fixture");
    cursor.into_inner()
}
