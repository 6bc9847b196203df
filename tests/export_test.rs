//! Remote export against locally bound servers

use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::Query;
use axum::http::Request;
use axum::routing::post;
use axum::{Json, Router};
use tempfile::TempDir;
use tower::ServiceExt;

use wildrank_server::config::Config;
use wildrank_server::server::routes::PasswordQuery;
use wildrank_server::server::{create_router, AppState, SharedState};
use wildrank_server::transfer::TransferResponse;

fn test_state(dir: &Path, password: Option<&str>) -> SharedState {
    let mut config = Config::default();
    config.store.upload_dir = dir.join("uploads");
    config.store.app_dir = dir.join("app");
    config.store.temp_archive = dir.join("tmp.zip");
    config.export.timeout_secs = 5;
    config.auth.password = password.map(str::to_string);
    Arc::new(AppState::new(config).expect("state"))
}

/// Serve `app` on an ephemeral port and return its address
async fn spawn_remote(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

fn seed_results(state: &SharedState) {
    for name in [
        "pit-2024miket-111.json",
        "pit-2024miket-112.json",
        "match-2024miket-qm1-111.json",
        "match-2024miket-qm1-112.json",
        "note-2024miket-qm1-111.json",
        "match-2023miket-qm1-111.json",
        "teams-2024miket.json",
    ] {
        state.store.write(name, b"{}").unwrap();
    }
}

async fn export(state: &SharedState, query: &str) -> TransferResponse {
    let request = Request::builder()
        .uri(format!("/export?{}", query))
        .body(Body::empty())
        .unwrap();
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_export_into_another_server() {
    let local_dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let local = test_state(local_dir.path(), None);
    let remote = test_state(remote_dir.path(), Some("abc"));
    seed_results(&local);

    let addr = spawn_remote(create_router(remote.clone())).await;
    let response = export(
        &local,
        &format!("to={}&password=abc&event_id=2024miket&results=true", addr),
    )
    .await;

    assert_eq!(response, TransferResponse { success: true, count: 5 });
    assert_eq!(
        remote.store.list().unwrap(),
        vec![
            "match-2024miket-qm1-111.json",
            "match-2024miket-qm1-112.json",
            "note-2024miket-qm1-111.json",
            "pit-2024miket-111.json",
            "pit-2024miket-112.json",
        ]
    );
    assert!(!local_dir.path().join("tmp.zip").exists());
}

#[tokio::test]
async fn test_remote_credential_failure_is_reported() {
    let local_dir = TempDir::new().unwrap();
    let remote_dir = TempDir::new().unwrap();
    let local = test_state(local_dir.path(), None);
    let remote = test_state(remote_dir.path(), Some("abc"));
    seed_results(&local);

    let addr = spawn_remote(create_router(remote.clone())).await;
    let response = export(
        &local,
        &format!("to={}&password=xyz&event_id=2024miket&results=true", addr),
    )
    .await;

    assert_eq!(response, TransferResponse { success: false, count: -1 });
    assert!(remote.store.list().unwrap().is_empty());
}

#[tokio::test]
async fn test_partial_acknowledgement_is_failure() {
    let local_dir = TempDir::new().unwrap();
    let local = test_state(local_dir.path(), None);
    seed_results(&local);

    let seen = Arc::new(Mutex::new(None::<String>));
    let recorder = seen.clone();
    let remote = Router::new().route(
        "/",
        post(move |Query(query): Query<PasswordQuery>| {
            let recorder = recorder.clone();
            async move {
                *recorder.lock().unwrap() = query.password;
                Json(TransferResponse { success: true, count: 4 })
            }
        }),
    );
    let addr = spawn_remote(remote).await;

    let response = export(
        &local,
        &format!("to=http://{}&password=pw&event_id=2024miket&results=true", addr),
    )
    .await;

    assert_eq!(response, TransferResponse { success: false, count: 4 });
    assert_eq!(seen.lock().unwrap().as_deref(), Some("pw"));
    assert!(!local_dir.path().join("tmp.zip").exists());
}

#[tokio::test]
async fn test_export_to_own_address() {
    let dir = TempDir::new().unwrap();
    let state = test_state(dir.path(), None);
    seed_results(&state);

    // the ingest half of this export needs the transfer lock of the same server
    let addr = spawn_remote(create_router(state.clone())).await;
    let started = std::time::Instant::now();
    let response = export(
        &state,
        &format!("to={}&event_id=2024miket&results=true", addr),
    )
    .await;

    assert_eq!(response, TransferResponse { success: true, count: 5 });
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(state.store.list().unwrap().len(), 7);
    assert!(!dir.path().join("tmp.zip").exists());
}

#[tokio::test]
async fn test_unreachable_destination() {
    let local_dir = TempDir::new().unwrap();
    let local = test_state(local_dir.path(), None);
    seed_results(&local);

    let response = export(&local, "to=127.0.0.1:9&event_id=2024miket&pictures=true").await;
    assert_eq!(response, TransferResponse { success: false, count: -3 });
    assert!(!local_dir.path().join("tmp.zip").exists());
}
