#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! These tests run against the REAL application router and state, backed by
//! a live PostgreSQL and Redis. When `DATABASE_URL` is not configured the
//! tests skip themselves instead of failing, so the unit suite stays green
//! on machines without the infrastructure.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use corso::models::role::well_known;
use corso::models::{Course, CourseForm, Role, Subject};
use corso::{AppState, Config};

/// Whether the integration environment is configured.
pub fn integration_env_available() -> bool {
    std::env::var("DATABASE_URL").is_ok()
}

/// Report a skipped test. Callers early-return when this returns true.
pub fn skip_without_database(test: &str) -> bool {
    if integration_env_available() {
        return false;
    }
    eprintln!("skipping {test}: DATABASE_URL not set");
    true
}

/// Test application wrapper using the real routes and state.
pub struct TestApp {
    router: Router,
    pub db: PgPool,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with full initialization.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let config = Config::from_env().expect("Failed to load config");

        let state = AppState::new(&config)
            .await
            .expect("Failed to initialize AppState");

        let db = state.db().clone();

        let session_layer = corso::session::create_session_layer(
            &config.redis_url,
            tower_sessions::cookie::SameSite::Strict,
        )
        .await
        .expect("Failed to create session layer");

        // Must match the router assembled in main.rs
        let router = Router::new()
            .merge(corso::routes::auth::router())
            .merge(corso::routes::manage::router())
            .merge(corso::routes::module::router())
            .merge(corso::routes::content::router())
            .merge(corso::routes::order::router())
            .merge(corso::routes::catalog::router())
            .merge(corso::routes::health::router())
            .layer(session_layer)
            .layer(tower_http::trace::TraceLayer::new_for_http())
            .with_state(state.clone());

        Self { router, db, state }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a request with cookies from a previous response.
    pub async fn request_with_cookies(
        &self,
        mut request: Request<Body>,
        cookies: &str,
    ) -> Response {
        if !cookies.is_empty() {
            request.headers_mut().insert(
                header::COOKIE,
                cookies.parse().expect("Invalid cookie header"),
            );
        }
        self.request(request).await
    }

    /// GET a path with cookies and return the response.
    pub async fn get(&self, path: &str, cookies: &str) -> Response {
        self.request_with_cookies(
            Request::get(path).body(Body::empty()).unwrap(),
            cookies,
        )
        .await
    }

    /// POST an urlencoded form with cookies.
    pub async fn post_form(&self, path: &str, body: String, cookies: &str) -> Response {
        self.request_with_cookies(
            Request::post(path)
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
            cookies,
        )
        .await
    }

    /// POST a JSON body with cookies.
    pub async fn post_json(&self, path: &str, body: serde_json::Value, cookies: &str) -> Response {
        self.request_with_cookies(
            Request::post(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            cookies,
        )
        .await
    }

    /// Login via the JSON API and return session cookies.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .request(
                Request::post("/user/login/json")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({
                            "username": username,
                            "password": password
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await;

        assert_eq!(
            response.status(),
            axum::http::StatusCode::OK,
            "Login failed for user '{username}' (status {})",
            response.status()
        );

        extract_cookies(&response)
    }

    /// Create a test user directly in the database.
    pub async fn create_test_user(&self, username: &str, password: &str) -> Uuid {
        use argon2::{
            Argon2,
            password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
        };

        // Minimal Argon2 params for test speed
        let password = password.to_owned();
        let password_hash = tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            let params = argon2::Params::new(4 * 1024, 1, 1, None)
                .expect("test Argon2 params are valid");
            let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .expect("Failed to hash password")
                .to_string()
        })
        .await
        .expect("Argon2 hashing task panicked");

        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, pass, mail, status, is_admin)
            VALUES ($1, $2, $3, $4, 1, FALSE)
            ON CONFLICT (name) DO UPDATE SET pass = $3
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(&password_hash)
        .bind(format!("{username}@example.com"))
        .execute(&self.db)
        .await
        .expect("Failed to create test user");

        // The upsert may have kept an earlier id
        sqlx::query_scalar("SELECT id FROM users WHERE name = $1")
            .bind(username)
            .fetch_one(&self.db)
            .await
            .expect("Failed to fetch test user id")
    }

    /// Create an instructor (a user holding the course permissions) and log
    /// them in, returning (user id, session cookies).
    pub async fn create_and_login_instructor(&self, username: &str) -> (Uuid, String) {
        let user_id = self.create_test_user(username, "test-password").await;

        Role::assign_to_user(&self.db, user_id, well_known::INSTRUCTOR_ROLE_ID)
            .await
            .expect("Failed to assign instructor role");
        self.state.permissions().invalidate_user(user_id);

        let cookies = self.login(username, "test-password").await;
        (user_id, cookies)
    }

    /// Create a subject with a unique slug.
    pub async fn create_subject(&self, title: &str) -> Subject {
        let slug = format!("{}-{}", title.to_lowercase().replace(' ', "-"), short_id());
        Subject::create(&self.db, title, &slug)
            .await
            .expect("Failed to create subject")
    }

    /// Create a course owned by the given user.
    pub async fn create_course(&self, owner_id: Uuid, subject_id: Uuid, title: &str) -> Course {
        let form = CourseForm {
            subject_id,
            title: title.to_string(),
            slug: format!("{}-{}", title.to_lowercase().replace(' ', "-"), short_id()),
            overview: format!("{title} overview"),
        };
        Course::create(&self.db, owner_id, &form)
            .await
            .expect("Failed to create course")
    }
}

/// Extract Set-Cookie headers from a response for use in subsequent requests.
pub fn extract_cookies(response: &Response) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Read a response body to a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// Pull the CSRF token out of a rendered form.
pub fn extract_csrf_token(html: &str) -> String {
    let marker = r#"name="_token" value=""#;
    let start = html
        .find(marker)
        .map(|i| i + marker.len())
        .expect("No CSRF token in page");
    let end = html[start..].find('"').expect("Unterminated token value");
    html[start..start + end].to_string()
}

/// A short unique suffix for slugs and usernames.
pub fn short_id() -> String {
    Uuid::now_v7().simple().to_string()[..12].to_string()
}

/// Fetch a form page with the given session cookies and return its CSRF
/// token for the follow-up POST.
pub async fn form_token(app: &TestApp, path: &str, cookies: &str) -> String {
    let response = app.get(path, cookies).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let html = body_string(response).await;
    extract_csrf_token(&html)
}
