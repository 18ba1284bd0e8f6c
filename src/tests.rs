//! Integration tests for the queue backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::feed::{ChangeFeed, ChangeKind, Table};
use crate::{create_router, AppState};

const API_KEY: &str = "test-api-key";
const ADMIN_KEY: &str = "test-admin-key";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool, ChangeFeed::new(64)));

        // Create config
        let mut config = Config {
            api_psk: Some(API_KEY.to_string()),
            admin_psk: Some(ADMIN_KEY.to_string()),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            ..Config::default()
        };
        adjust(&mut config);
        let psk = config.api_psk.clone();

        let state = AppState {
            repo: repo.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            repo,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn get_as(&self, path: &str, account_id: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(self.url(path))
            .header("x-account-id", account_id)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post_as(&self, path: &str, account_id: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .header("x-account-id", account_id)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn delete(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .delete(self.url(path))
            .header("x-admin-key", ADMIN_KEY)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn create_account(&self, name: &str, desk: &str, role: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/accounts"))
            .header("x-admin-key", ADMIN_KEY)
            .json(&json!({
                "email": format!("{}@example.com", name.to_lowercase()),
                "name": name,
                "deskInfo": desk,
                "role": role
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_ticket(&self) -> Value {
        let (status, body) = self.post("/api/tickets", json!({})).await;
        assert_eq!(status, 200);
        body["data"].clone()
    }

    async fn create_service_type(&self, name: &str) -> String {
        let (status, body) = self.post("/api/service-types", json!({ "name": name })).await;
        assert_eq!(status, 200);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

// ==================== AUTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_auth_missing_and_invalid_psk() {
    let fixture = TestFixture::new().await;
    let client = Client::new();

    let resp = client
        .get(fixture.url("/api/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = client
        .get(fixture.url("/api/snapshot"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client
        .get(fixture.url("/api/snapshot"))
        .header("Authorization", format!("Bearer {}", API_KEY))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_no_psk_allows_all() {
    let fixture = TestFixture::with_config(|c| c.api_psk = None).await;

    let (status, body) = fixture.get("/api/snapshot").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["schemaVersion"], 1);
}

// ==================== TICKETS ====================

#[tokio::test]
async fn test_tickets_are_numbered_per_day() {
    let fixture = TestFixture::new().await;

    let first = fixture.create_ticket().await;
    let second = fixture.create_ticket().await;
    assert_eq!(first["number"], "#001");
    assert_eq!(second["number"], "#002");
    assert_eq!(first["status"], "waiting");
    assert!(first["calledAt"].is_null());

    let (status, body) = fixture.get("/api/tickets").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let id = first["id"].as_str().unwrap();
    let (status, body) = fixture.get(&format!("/api/queue/kiosk/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["number"], "#001");
    assert_eq!(body["data"]["called"], false);
}

#[tokio::test]
async fn test_call_requires_identity() {
    let fixture = TestFixture::new().await;
    let ticket = fixture.create_ticket().await;
    let id = ticket["id"].as_str().unwrap();

    let (status, body) = fixture
        .post(&format!("/api/tickets/{}/call", id), json!({}))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    let viewer = fixture.create_account("Vera", "", "viewer").await;
    let (status, body) = fixture
        .post_as(&format!("/api/tickets/{}/call", id), &viewer, json!({}))
        .await;
    assert_eq!(status, 403);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (_, body) = fixture.get(&format!("/api/tickets/{}", id)).await;
    assert_eq!(body["data"]["status"], "waiting");
}

#[tokio::test]
async fn test_ticket_lifecycle() {
    let fixture = TestFixture::new().await;
    let maria = fixture.create_account("Maria", "Desk 3", "attendant").await;
    let general = fixture.create_service_type("General").await;
    let ticket = fixture.create_ticket().await;
    let id = ticket["id"].as_str().unwrap();

    // Completing a waiting ticket skips a step
    let (status, body) = fixture
        .post_as(
            &format!("/api/tickets/{}/complete", id),
            &maria,
            json!({ "serviceTypeId": general }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    assert_eq!(body["error"]["details"]["currentStatus"], "waiting");

    let (status, body) = fixture
        .post_as(&format!("/api/tickets/{}/call", id), &maria, json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "called");
    assert_eq!(body["data"]["attendantRef"], maria.as_str());
    let called_at = body["data"]["calledAt"].clone();
    assert!(!called_at.is_null());

    // Second call loses
    let (status, body) = fixture
        .post_as(&format!("/api/tickets/{}/call", id), &maria, json!({}))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["details"]["attemptedStatus"], "called");

    let (_, body) = fixture.get(&format!("/api/queue/kiosk/{}", id)).await;
    assert_eq!(body["data"]["called"], true);
    assert_eq!(body["data"]["desk"], "Desk 3");
    assert_eq!(body["data"]["attendantLabel"], "Maria");

    // Service type is required before completion
    let (status, body) = fixture
        .post_as(&format!("/api/tickets/{}/complete", id), &maria, json!({}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = fixture
        .post_as(
            &format!("/api/tickets/{}/complete", id),
            &maria,
            json!({ "serviceTypeId": "unknown" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = fixture
        .post_as(
            &format!("/api/tickets/{}/complete", id),
            &maria,
            json!({ "serviceTypeId": general }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["serviceTypeRef"], general.as_str());
    assert_eq!(body["data"]["calledAt"], called_at);

    // Terminal
    let (status, _) = fixture
        .post_as(&format!("/api/tickets/{}/call", id), &maria, json!({}))
        .await;
    assert_eq!(status, 409);

    let (_, body) = fixture.get("/api/tickets").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_completion_without_service_type_when_optional() {
    let fixture = TestFixture::with_config(|c| c.require_service_type = false).await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let ticket = fixture.create_ticket().await;
    let id = ticket["id"].as_str().unwrap();

    fixture
        .post_as(&format!("/api/tickets/{}/call", id), &ana, json!({}))
        .await;
    let (status, body) = fixture
        .post_as(&format!("/api/tickets/{}/complete", id), &ana, json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "completed");
    assert!(body["data"]["serviceTypeRef"].is_null());
}

// ==================== QUEUE VIEWS ====================

#[tokio::test]
async fn test_call_next_serves_oldest_first() {
    let fixture = TestFixture::new().await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let bruno = fixture.create_account("Bruno", "Desk 2", "attendant").await;

    let first = fixture.create_ticket().await;
    let second = fixture.create_ticket().await;

    let (status, body) = fixture.post_as("/api/queue/call-next", &ana, json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"], first["id"]);

    // One ticket in service per attendant
    let (status, body) = fixture.post_as("/api/queue/call-next", &ana, json!({})).await;
    assert_eq!(status, 409);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = fixture
        .post_as("/api/queue/call-next", &bruno, json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["id"], second["id"]);

    let carla = fixture.create_account("Carla", "Desk 4", "attendant").await;
    let (status, body) = fixture
        .post_as("/api/queue/call-next", &carla, json!({}))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_operator_view() {
    let fixture = TestFixture::new().await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    for _ in 0..3 {
        fixture.create_ticket().await;
    }

    let (status, body) = fixture.get("/api/queue/operator").await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    let (_, body) = fixture.get_as("/api/queue/operator", &ana).await;
    assert_eq!(body["data"]["waitingCount"], 3);
    assert!(body["data"]["current"].is_null());

    fixture.post_as("/api/queue/call-next", &ana, json!({})).await;

    let (_, body) = fixture.get_as("/api/queue/operator", &ana).await;
    let waiting = body["data"]["waiting"].as_array().unwrap();
    assert_eq!(body["data"]["waitingCount"], 2);
    assert_eq!(waiting[0]["number"], "#002");
    assert_eq!(waiting[1]["number"], "#003");
    assert_eq!(body["data"]["current"]["number"], "#001");
}

#[tokio::test]
async fn test_display_view_tracks_latest_call() {
    let fixture = TestFixture::new().await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let bruno = fixture.create_account("Bruno", "Desk 2", "attendant").await;
    for _ in 0..2 {
        fixture.create_ticket().await;
    }

    let (_, body) = fixture.get("/api/queue/display").await;
    assert!(body["data"]["current"].is_null());
    assert!(body["data"]["announcement"].is_null());

    fixture.post_as("/api/queue/call-next", &ana, json!({})).await;
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    fixture.post_as("/api/queue/call-next", &bruno, json!({})).await;

    let (_, body) = fixture.get("/api/queue/display").await;
    assert_eq!(body["data"]["current"]["number"], "#002");
    assert_eq!(body["data"]["current"]["desk"], "Desk 2");
    assert_eq!(body["data"]["history"][0]["number"], "#001");
    assert_eq!(
        body["data"]["announcement"]["text"],
        "Ticket #002. Desk 2, Bruno"
    );
}

#[tokio::test]
async fn test_report_scoping() {
    let fixture = TestFixture::new().await;
    let admin = fixture.create_account("Root", "", "super_admin").await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let bruno = fixture.create_account("Bruno", "Desk 2", "attendant").await;
    let general = fixture.create_service_type("General").await;

    for _ in 0..3 {
        fixture.create_ticket().await;
    }
    for attendant in [&ana, &bruno] {
        let (_, body) = fixture
            .post_as("/api/queue/call-next", attendant, json!({}))
            .await;
        let id = body["data"]["id"].as_str().unwrap().to_string();
        if attendant == &ana {
            fixture
                .post_as(
                    &format!("/api/tickets/{}/complete", id),
                    attendant,
                    json!({ "serviceTypeId": general }),
                )
                .await;
        }
    }

    let (status, body) = fixture.get("/api/reports/queue").await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    let (status, body) = fixture.get_as("/api/reports/queue", &admin).await;
    assert_eq!(status, 200);
    let report = &body["data"];
    assert_eq!(report["totalCreated"], 3);
    assert_eq!(report["totalHandled"], 2);
    assert_eq!(report["inProgress"], 1);
    assert_eq!(report["efficiency"], 67);
    assert_eq!(report["serviceStats"][0]["count"], 1);
    assert_eq!(report["attendantStats"][0]["name"], "Ana");
    assert_eq!(report["attendantStats"][0]["count"], 1);

    // An attendant only ever sees their own tickets
    let (_, body) = fixture
        .get_as(&format!("/api/reports/queue?attendantId={}", ana), &bruno)
        .await;
    assert_eq!(body["data"]["totalCreated"], 1);
    assert_eq!(body["data"]["inProgress"], 1);

    let (status, body) = fixture
        .get_as("/api/reports/queue?from=2026-02-10&to=2026-02-01", &admin)
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// ==================== SERVICE TYPES ====================

#[tokio::test]
async fn test_deleting_service_type_keeps_completed_tickets() {
    let fixture = TestFixture::new().await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let general = fixture.create_service_type("General").await;
    let ticket = fixture.create_ticket().await;
    let id = ticket["id"].as_str().unwrap();

    fixture
        .post_as(&format!("/api/tickets/{}/call", id), &ana, json!({}))
        .await;
    fixture
        .post_as(
            &format!("/api/tickets/{}/complete", id),
            &ana,
            json!({ "serviceTypeId": general }),
        )
        .await;

    let (status, _) = fixture
        .delete(&format!("/api/service-types/{}", general))
        .await;
    assert_eq!(status, 200);

    let (_, body) = fixture.get(&format!("/api/tickets/{}", id)).await;
    assert_eq!(body["data"]["serviceTypeRef"], general.as_str());

    let (_, body) = fixture.get("/api/service-types").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, _) = fixture.post("/api/service-types", json!({ "name": " " })).await;
    assert_eq!(status, 400);
}

// ==================== ACCOUNTS ====================

#[tokio::test]
async fn test_account_removal_keeps_ticket_references() {
    let fixture = TestFixture::new().await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let ticket = fixture.create_ticket().await;
    let id = ticket["id"].as_str().unwrap();
    fixture
        .post_as(&format!("/api/tickets/{}/call", id), &ana, json!({}))
        .await;

    let (status, body) = fixture.delete(&format!("/api/accounts/{}", ana)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["completed"], true);
    let steps: Vec<&str> = body["data"]["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["step"].as_str().unwrap())
        .collect();
    assert_eq!(
        steps,
        vec!["deactivate_account", "delete_profile", "delete_account"]
    );

    let (status, _) = fixture.get(&format!("/api/accounts/{}", ana)).await;
    assert_eq!(status, 404);

    let (_, body) = fixture.get(&format!("/api/tickets/{}", id)).await;
    assert_eq!(body["data"]["attendantRef"], ana.as_str());

    // A removed account can no longer act
    let (status, _) = fixture.post_as("/api/queue/call-next", &ana, json!({})).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_account_provisioning_requires_admin_key() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post("/api/accounts", json!({ "name": "Ana" }))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = fixture
        .client
        .post(fixture.url("/api/accounts"))
        .header("x-admin-key", ADMIN_KEY)
        .json(&json!({ "role": "attendant" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let (status, body) = fixture
        .put(&format!("/api/accounts/{}", ana), json!({ "deskInfo": "Desk 9" }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["profile"]["deskInfo"], "Desk 9");
    assert_eq!(body["data"]["profile"]["name"], "Ana");
}

#[tokio::test]
async fn test_role_change_requires_admin_key() {
    let fixture = TestFixture::new().await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let path = format!("/api/accounts/{}", ana);

    let (status, body) = fixture
        .put(&path, json!({ "role": "super_admin" }))
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (_, body) = fixture.get(&path).await;
    assert_eq!(body["data"]["profile"]["role"], "attendant");

    let resp = fixture
        .client
        .put(fixture.url(&path))
        .header("x-admin-key", ADMIN_KEY)
        .json(&json!({ "role": "super_admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["profile"]["role"], "super_admin");
}

#[tokio::test]
async fn test_partial_account_removal_reports_failed_step() {
    let fixture = TestFixture::new().await;
    let ana = fixture.create_account("Ana", "Desk 1", "attendant").await;
    let path = format!("/api/accounts/{}", ana);

    sqlx::query(
        "CREATE TRIGGER keep_profiles BEFORE DELETE ON profiles
         BEGIN SELECT RAISE(ABORT, 'profiles are locked'); END",
    )
    .execute(fixture.repo.pool())
    .await
    .unwrap();

    let (status, body) = fixture.delete(&path).await;
    assert_eq!(status, 500);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("DeleteProfile"));

    // The first step stays applied: the account can no longer act.
    let (status, _) = fixture.post_as("/api/queue/call-next", &ana, json!({})).await;
    assert_eq!(status, 401);

    sqlx::query("DROP TRIGGER keep_profiles")
        .execute(fixture.repo.pool())
        .await
        .unwrap();

    let (status, body) = fixture.delete(&path).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["completed"], true);
    let (status, _) = fixture.get(&path).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_missing_admin_key_is_configuration_error() {
    let fixture = TestFixture::with_config(|c| c.admin_psk = None).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/accounts"))
        .header("x-admin-key", "anything")
        .json(&json!({ "name": "Ana" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    assert_eq!(body["error"]["message"], "System configuration error");
}

// ==================== SIGNAGE ====================

#[tokio::test]
async fn test_display_playlist_and_player() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post(
            "/api/displays",
            json!({
                "name": "Lobby",
                "location": "Ground floor",
                "resolution": { "width": 1920, "height": 1080 },
                "orientation": "portrait",
                "sizeInches": 55.0
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["displayMode"], "playlist");
    assert_eq!(body["data"]["orientation"], "portrait");
    let display = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = fixture.post("/api/playlists", json!({ "name": "Promo" })).await;
    let playlist = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = fixture
        .post(
            &format!("/api/playlists/{}/slides", playlist),
            json!({ "url": "https://cdn.example.com/a.png", "duration": 0 }),
        )
        .await;
    assert_eq!(status, 400);

    for (url, duration) in [("a.png", 10), ("b.png", 5)] {
        let (status, _) = fixture
            .post(
                &format!("/api/playlists/{}/slides", playlist),
                json!({ "url": format!("https://cdn.example.com/{}", url), "duration": duration }),
            )
            .await;
        assert_eq!(status, 200);
    }

    let (status, body) = fixture
        .put(
            &format!("/api/displays/{}/playlist", display),
            json!({ "playlistId": playlist }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["assignedPlaylistId"], playlist.as_str());

    let (_, body) = fixture.get(&format!("/api/displays/{}/player", display)).await;
    let player = &body["data"];
    assert_eq!(player["playlist"]["slides"].as_array().unwrap().len(), 2);
    assert_eq!(player["position"]["cycleSeconds"], 15);
    assert!(player["queue"].is_null());

    let (_, body) = fixture.get("/api/summary").await;
    assert_eq!(body["data"]["activeScreens"], 1);
    assert_eq!(body["data"]["playlists"], 1);

    let (status, _) = fixture
        .put(
            &format!("/api/displays/{}", display),
            json!({ "displayMode": "queue" }),
        )
        .await;
    assert_eq!(status, 200);
    let (_, body) = fixture.get(&format!("/api/displays/{}/player", display)).await;
    assert!(body["data"]["queue"].is_object());

    let (status, _) = fixture.delete(&format!("/api/playlists/{}", playlist)).await;
    assert_eq!(status, 200);
    let (_, body) = fixture.get(&format!("/api/displays/{}", display)).await;
    assert!(body["data"]["assignedPlaylistId"].is_null());

    let (status, _) = fixture.delete(&format!("/api/displays/{}", display)).await;
    assert_eq!(status, 200);
    let (status, _) = fixture.get(&format!("/api/displays/{}", display)).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_slide_update_and_delete() {
    let fixture = TestFixture::new().await;
    let (_, body) = fixture.post("/api/playlists", json!({ "name": "Menu" })).await;
    let playlist = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = fixture
        .post(
            &format!("/api/playlists/{}/slides", playlist),
            json!({ "url": "https://cdn.example.com/a.png", "duration": 8 }),
        )
        .await;
    let slide = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = fixture
        .put(&format!("/api/slides/{}", slide), json!({ "duration": 12 }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["duration"], 12);

    let (status, _) = fixture.delete(&format!("/api/slides/{}", slide)).await;
    assert_eq!(status, 200);
    let (_, body) = fixture.get(&format!("/api/playlists/{}", playlist)).await;
    assert!(body["data"]["slides"].as_array().unwrap().is_empty());
}

// ==================== CHANGE FEED ====================

#[tokio::test]
async fn test_mutations_reach_feed_subscribers() {
    let fixture = TestFixture::new().await;
    let mut events = fixture.repo.feed().subscribe();

    let (_, before) = fixture.get("/api/snapshot/revision").await;
    let before = before["data"]["revisionId"].as_i64().unwrap();

    let ticket = fixture.create_ticket().await;

    let event = tokio::time::timeout(tokio::time::Duration::from_secs(2), events.recv())
        .await
        .expect("no change event")
        .unwrap();
    assert_eq!(event.table, Table::Tickets);
    assert_eq!(event.kind, ChangeKind::Insert);
    assert_eq!(event.id, ticket["id"].as_str().unwrap());
    assert_eq!(event.revision_id, before + 1);

    let (_, after) = fixture.get("/api/snapshot/revision").await;
    assert_eq!(after["data"]["revisionId"].as_i64().unwrap(), before + 1);

    let (_, snapshot) = fixture.get("/api/snapshot").await;
    assert_eq!(snapshot["revisionId"].as_i64().unwrap(), before + 1);
    assert_eq!(snapshot["data"]["tickets"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_feed_rejects_unknown_tables() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/feed?tables=orders").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
