use serde_json::{json, Value};
use tempfile::TempDir;

use volunteerhub::config::Config;
use volunteerhub::state::AppState;
use volunteerhub::storage::Storage;
use volunteerhub::{db, routes};

/// A real server on an ephemeral port with a throwaway data directory.
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub data_dir: TempDir,
}

pub async fn spawn() -> TestServer {
    let data_dir = TempDir::new().unwrap();

    let mut config = Config::default();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.auth.admin_username = Some("admin".to_string());
    config.auth.admin_password = Some("admin-pass".to_string());
    config.database.path = Some(data_dir.path().join("test.db"));
    config.storage.root = Some(data_dir.path().join("files"));

    let storage = Storage::new(config.storage_root());
    storage.init().unwrap();

    let pool = db::create_pool(config.db_path()).unwrap();
    db::run_migrations(&pool).unwrap();
    db::ensure_admin(&pool, &config.auth).unwrap();

    let state = AppState {
        db: pool,
        config,
        storage,
        notifier: None,
    };
    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        data_dir,
    }
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a fresh user and return a bearer token for them.
    pub async fn register_and_login(&self, username: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/users"))
            .json(&json!({
                "firstname": "Test",
                "lastname": "User",
                "username": username,
                "password": "password123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "register failed for {}", username);

        self.login(username, "password123").await
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login failed for {}", username);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", "admin-pass").await
    }

    /// Create an event as `token` and walk it to APPROVED via the admin.
    pub async fn approved_event(&self, token: &str, name: &str) -> String {
        let event = self.create_event(token, name).await;
        let id = event["id"].as_str().unwrap().to_string();

        let response = self
            .client
            .post(self.url(&format!("/api/events/{}/submit", id)))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let admin = self.admin_token().await;
        let response = self
            .client
            .post(self.url(&format!("/api/admin/events/{}/approve", id)))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        id
    }

    pub async fn create_event(&self, token: &str, name: &str) -> Value {
        let now = chrono::Utc::now();
        let response = self
            .client
            .post(self.url("/api/events"))
            .bearer_auth(token)
            .json(&json!({
                "name": name,
                "description": "integration test event",
                "dateDeadline": now + chrono::Duration::days(1),
                "startDate": now + chrono::Duration::days(2),
                "endDate": now + chrono::Duration::days(3),
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "event create failed");
        response.json().await.unwrap()
    }
}
