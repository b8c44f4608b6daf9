//! Global library HTTP client tests against a mock server.

mod common;

use std::sync::Arc;

use library_core::{Family, InstanceRole};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rehab_library_sync::db::SqliteRepository;
use rehab_library_sync::global::{GlobalSource, HttpGlobalClient};
use rehab_library_sync::storage::LocalBlobStore;
use rehab_library_sync::{SyncEngine, SyncError};

use common::fixtures;

/// Test the bearer token is sent with every request.
#[tokio::test]
async fn test_bearer_token_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/languages"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([fixtures::language(1, "en")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpGlobalClient::new(&server.uri(), Some("secret-token".to_string()));
    let payload = client.fetch_collection(Family::Languages).await.unwrap();
    assert_eq!(payload[0]["code"], "en");
}

/// Test endpoints use the hyphenated collection names.
#[tokio::test]
async fn test_collection_endpoint_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/screening-questionnaires"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpGlobalClient::new(&format!("{}/", server.uri()), None);
    let payload = client
        .fetch_collection(Family::ScreeningQuestionnaires)
        .await
        .unwrap();
    assert_eq!(payload, json!({"data": []}));
}

/// Test the bulk file lookup sends ids as one comma-separated parameter.
#[tokio::test]
async fn test_lookup_files_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("ids", "3,9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"id": 3, "file_name": "a.png", "content_type": "image/png"},
            {"id": 9, "filename": "b.pdf", "content_type": "application/pdf"}
        ]})))
        .mount(&server)
        .await;

    let client = HttpGlobalClient::new(&server.uri(), None);
    let files = client.lookup_files(&[3, 9]).await.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[1].file_name, "b.pdf");

    // No request for an empty lookup
    assert!(client.lookup_files(&[]).await.unwrap().is_empty());
}

/// Test file downloads return the raw bytes.
#[tokio::test]
async fn test_download_file_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files/3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 255]))
        .mount(&server)
        .await;

    let client = HttpGlobalClient::new(&server.uri(), None);
    assert_eq!(client.download_file(3).await.unwrap(), vec![0u8, 1, 2, 255]);
}

/// Test non-success responses surface as backend errors.
#[tokio::test]
async fn test_server_error_maps_to_backend() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/faqs"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&server)
        .await;

    let client = HttpGlobalClient::new(&server.uri(), None);
    let err = client.fetch_collection(Family::Faqs).await.unwrap_err();
    match err {
        SyncError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "database down");
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

/// Test an unreachable service is a network error.
#[tokio::test]
async fn test_unreachable_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = HttpGlobalClient::new(&uri, None);
    let err = client.fetch_collection(Family::Faqs).await.unwrap_err();
    assert!(matches!(err, SyncError::Network(_)));
    assert!(err.is_fetch_failure());
}

/// Test a full exercise run over HTTP, files included.
#[tokio::test]
async fn test_engine_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/exercises"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [fixtures::exercise(8, "Bridge", &[], &[5])]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("ids", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "file_name": "bridge.png", "content_type": "image/png"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/files/5"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bridge".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let blob_root = tempfile::tempdir().unwrap();
    let engine = SyncEngine::new(
        SqliteRepository::open_in_memory().unwrap(),
        Arc::new(HttpGlobalClient::new(&server.uri(), None)),
        Arc::new(LocalBlobStore::new(blob_root.path())),
        InstanceRole::Organization,
    );

    let report = engine.sync_exercises().await.unwrap();
    assert_eq!(report.created, 1);

    // Second run reuses the stored file without new file requests
    engine.sync_exercises().await.unwrap();

    let file = &engine.repository().all_files().unwrap()[0];
    assert_eq!(file.path, format!("exercise/{}/bridge.png", file.id));
    assert_eq!(
        std::fs::read(blob_root.path().join(&file.path)).unwrap(),
        b"bridge"
    );
}
