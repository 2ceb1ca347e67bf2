//! Integration tests for the admin API client against a mock HTTP server.

use secrecy::Secret;
use serde_json::json;
use service_core::retry::RetryConfig;
use std::time::Duration;
use tenant_reset::config::ApiConfig;
use tenant_reset::models::JobHandle;
use tenant_reset::services::{AdminApi, AdminApiClient, ApiError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// base64("admin:s3cret")
const BASIC_AUTH: &str = "Basic YWRtaW46czNjcmV0";

fn client(server: &MockServer, max_retries: u32) -> AdminApiClient {
    let config = ApiConfig {
        base_url: format!("{}/api", server.uri()),
        username: "admin".to_string(),
        api_key: Secret::new("s3cret".to_string()),
        timeout: Duration::from_secs(5),
        max_retries,
    };

    let retry = RetryConfig {
        max_retries,
        initial_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        ..RetryConfig::default()
    };

    AdminApiClient::new(config).unwrap().with_retry_config(retry)
}

#[tokio::test]
async fn current_user_sends_basic_auth_and_reads_pk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/current/"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pk": 42,
            "username": "admin",
            "email": "admin@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let caller = client(&server, 0).current_user().await.unwrap();
    assert_eq!(caller.user_id, 42);
}

#[tokio::test]
async fn current_user_accepts_body_with_pk_and_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/current/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pk": 7,
            "id": 7,
            "username": "admin"
        })))
        .mount(&server)
        .await;

    let caller = client(&server, 0).current_user().await.unwrap();
    assert_eq!(caller.user_id, 7);
}

#[tokio::test]
async fn current_user_without_identifier_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/current/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "username": "admin" })))
        .mount(&server)
        .await;

    let err = client(&server, 0).current_user().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn rejected_credentials_surface_status_and_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users/current/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Invalid username/password." })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3).current_user().await.unwrap_err();
    match &err {
        ApiError::Status { status, .. } => assert_eq!(*status, 401),
        other => panic!("expected status error, got {:?}", other),
    }
    assert!(err.payload().unwrap().contains("Invalid username/password."));
}

#[tokio::test]
async fn lists_organizations_with_brief_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/organizations/"))
        .and(query_param("brief", "true"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "organizations": [
                { "id": 1, "name": "Demo", "parent_id": null, "org_id": 100, "user_role": "admin" },
                { "id": 7, "name": "Child", "parent_id": 1, "org_id": 700, "user_role": "member" }
            ]
        })))
        .mount(&server)
        .await;

    let organizations = client(&server, 0).list_organizations().await.unwrap();

    assert_eq!(organizations.len(), 2);
    assert_eq!(organizations[1].id, 7);
    assert_eq!(organizations[1].name, "Child");
    assert_eq!(organizations[1].parent_id, Some(1));
    assert_eq!(organizations[1].org_code, Some(700));
    assert_eq!(organizations[1].caller_role.as_deref(), Some("member"));
}

#[tokio::test]
async fn listing_is_retried_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/organizations/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/organizations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "organizations": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let organizations = client(&server, 2).list_organizations().await.unwrap();
    assert!(organizations.is_empty());
}

#[tokio::test]
async fn delete_returns_progress_key_and_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/organizations/12/"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "progress_key": "abc-123" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/organizations/13/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, 3);
    let handle = api.delete_organization(12).await.unwrap();
    assert_eq!(handle, Some(JobHandle::new("abc-123")));

    let err = api.delete_organization(13).await.unwrap_err();
    assert_eq!(err.payload(), Some("upstream down"));
}

#[tokio::test]
async fn deleting_missing_organization_reports_already_gone() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/organizations/5/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = client(&server, 3).delete_organization(5).await.unwrap();
    assert_eq!(handle, None);
}

#[tokio::test]
async fn reads_fractional_job_progress() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/abc-123/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "progress": 37.5 })))
        .mount(&server)
        .await;

    let percent = client(&server, 0)
        .job_progress(&JobHandle::new("abc-123"))
        .await
        .unwrap();
    assert_eq!(percent, 37.5);
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/progress/job/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server, 2)
        .job_progress(&JobHandle::new("job"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "got {:?}", err);
}
