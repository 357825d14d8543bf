use std::net::SocketAddr;

use configs::{AppConfig, StorageBackend};
use reqwest::StatusCode as HttpStatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

const MASTER: &str = "test-master";

struct TestApp {
    base_url: String,
    _frontend: tempfile::TempDir,
}

fn test_config(frontend_dir: &str) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.backend = StorageBackend::Database;
    cfg.database.url = "sqlite::memory:".into();
    cfg.auth.master_key = MASTER.into();
    cfg.keys.inline = Some(r#"{"keys":[{"key":"key1","user":"alice"},{"key":"key2","user":"bob"}]}"#.into());
    cfg.server.frontend_dir = frontend_dir.into();
    cfg
}

async fn start_server() -> anyhow::Result<TestApp> {
    let frontend = tempfile::tempdir()?;
    std::fs::write(frontend.path().join("index.html"), "<html>admin</html>")?;
    let cfg = test_config(&frontend.path().to_string_lossy());

    let app = server::startup::build_app(&cfg).await?;
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    let base_url = format!("http://{}:{}", addr.ip(), addr.port());

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await { eprintln!("server error: {}", e); }
    });

    Ok(TestApp { base_url, _frontend: frontend })
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn e2e_public_health() -> anyhow::Result<()> {
    let app = start_server().await?;
    let res = client().get(format!("{}/health", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn e2e_submit_list_note_delete() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let res = c
        .post(format!("{}/api/add-id", app.base_url))
        .json(&json!({"id": "ABC123", "apiKey": "key1"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?["inserted"], 1);

    // duplicate is accepted but does not insert
    let res = c
        .post(format!("{}/api/add-id", app.base_url))
        .header("x-api-key", "key2")
        .json(&json!({"id": "ABC123"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?["inserted"], 0);

    let page: Value = c.get(format!("{}/api/list-full", app.base_url)).send().await?.json().await?;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["id"], "ABC123");
    assert_eq!(page["items"][0]["added_by"], "alice");
    assert_eq!(page["items"][0]["note"], "");

    let res = c
        .post(format!("{}/api/note", app.base_url))
        .json(&json!({"id": "ABC123", "note": "checked", "masterKey": MASTER}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);

    let found: Value = c
        .get(format!("{}/api/search", app.base_url))
        .query(&[("query", "CHECK")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(found["items"][0]["note"], "checked");

    let res = c
        .post(format!("{}/api/delete-multiple", app.base_url))
        .header("x-master-key", MASTER)
        .json(&json!({"ids": ["ABC123", "missing"]}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    assert_eq!(res.json::<Value>().await?["deleted"], 1);

    let ids: Value = c.get(format!("{}/api/highlight-list", app.base_url)).send().await?.json().await?;
    assert_eq!(ids["ids"], json!([]));
    Ok(())
}

#[tokio::test]
async fn e2e_rejects_bad_credentials() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let res = c
        .post(format!("{}/api/add-id", app.base_url))
        .json(&json!({"id": "X1", "apiKey": "nope"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::FORBIDDEN);
    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);

    let res = c
        .post(format!("{}/api/add-id", app.base_url))
        .json(&json!({"apiKey": "key1"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::BAD_REQUEST);

    let res = c
        .post(format!("{}/api/clear-all", app.base_url))
        .json(&json!({"masterKey": "wrong"}))
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::FORBIDDEN);

    let res = c.get(format!("{}/api/export", app.base_url)).send().await?;
    assert_eq!(res.status(), HttpStatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn e2e_export_then_import_is_idempotent() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    for id in ["E1", "E2"] {
        c.post(format!("{}/api/add-id", app.base_url))
            .json(&json!({"id": id, "apiKey": "key2"}))
            .send()
            .await?
            .error_for_status()?;
    }

    let res = c
        .get(format!("{}/api/export", app.base_url))
        .query(&[("masterKey", MASTER)])
        .send()
        .await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let disposition = res
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("ids_export.json"));
    let exported = res.bytes().await?.to_vec();

    let form = reqwest::multipart::Form::new()
        .text("masterKey", MASTER)
        .part("file", reqwest::multipart::Part::bytes(exported).file_name("ids_export.json"));
    let res = c.post(format!("{}/api/import", app.base_url)).multipart(form).send().await?;
    assert_eq!(res.status(), HttpStatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["imported"], 0);
    assert_eq!(body["skipped"], 2);

    let page: Value = c.get(format!("{}/api/list-full", app.base_url)).send().await?.json().await?;
    assert_eq!(page["total"], 2);
    Ok(())
}

#[tokio::test]
async fn e2e_serves_admin_page_and_openapi() -> anyhow::Result<()> {
    let app = start_server().await?;
    let c = client();

    let page = c.get(format!("{}/", app.base_url)).send().await?;
    assert_eq!(page.status(), HttpStatusCode::OK);
    assert!(page.text().await?.contains("admin"));

    let doc: Value = c.get(format!("{}/api-docs/openapi.json", app.base_url)).send().await?.json().await?;
    assert!(doc["paths"].get("/api/add-id").is_some());
    Ok(())
}
