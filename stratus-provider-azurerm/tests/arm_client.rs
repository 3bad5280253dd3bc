//! ARM client behaviour against a mocked management endpoint

use std::time::Duration;

use serde_json::json;
use stratus_provider_azurerm::client::{ArmClient, ArmError};
use stratus_provider_azurerm::config::{ProviderBlock, ProviderConfig};
use wiremock::matchers::{bearer_token, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZONE: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/dnsZones/contoso.com";

fn client(server: &MockServer) -> ArmClient {
    let config = ProviderConfig::for_endpoint(&server.uri(), "sub", "test-token").unwrap();
    ArmClient::new(&config)
        .unwrap()
        .with_retry_base_delay(Duration::from_millis(1))
}

#[tokio::test]
async fn get_sends_token_and_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .and(query_param("api-version", "2018-05-01"))
        .and(bearer_token("test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "contoso.com"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server).get(ZONE, "2018-05-01").await.unwrap();
    assert_eq!(body.unwrap()["name"], "contoso.com");
}

#[tokio::test]
async fn get_missing_resource_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "ResourceNotFound", "message": "not found"}
        })))
        .mount(&server)
        .await;

    assert!(client(&server).get(ZONE, "2018-05-01").await.unwrap().is_none());
}

#[tokio::test]
async fn api_errors_carry_the_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": "InvalidRequestContent", "message": "bad zone"}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .put(ZONE, "2018-05-01", &json!({"location": "global"}))
        .await
        .unwrap_err();
    match err {
        ArmError::Api { status, code, message } => {
            assert_eq!(status, 400);
            assert_eq!(code, "InvalidRequestContent");
            assert_eq!(message, "bad zone");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn throttled_requests_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "contoso.com"})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server).get(ZONE, "2018-05-01").await.unwrap();
    assert!(body.is_some());
}

#[tokio::test]
async fn retries_give_up_after_the_limit() {
    let server = MockServer::start().await;
    // the default limit is three retries after the first attempt
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let err = client(&server).get(ZONE, "2018-05-01").await.unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn conflicts_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {"code": "Conflict", "message": "zone has record sets"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).delete(ZONE, "2018-05-01").await.unwrap_err();
    assert_eq!(err.status(), Some(409));
}

#[tokio::test]
async fn list_follows_next_link() {
    let server = MockServer::start().await;
    let zones = "/subscriptions/sub/providers/Microsoft.Network/dnszones";
    Mock::given(method("GET"))
        .and(path(zones))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "a.com"}, {"name": "b.com"}],
            "nextLink": format!("{}/page2?api-version=2018-05-01&$skiptoken=x", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"name": "c.com"}]
        })))
        .mount(&server)
        .await;

    let items = client(&server).list(zones, "2018-05-01").await.unwrap();
    let names: Vec<&str> = items.iter().filter_map(|z| z["name"].as_str()).collect();
    assert_eq!(names, vec!["a.com", "b.com", "c.com"]);
}

#[tokio::test]
async fn put_waits_for_async_operation() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/op1", server.uri());
    Mock::given(method("PUT"))
        .and(path(ZONE))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Azure-AsyncOperation", operation.as_str())
                .set_body_json(json!({"name": "contoso.com"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "InProgress"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "Succeeded"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .put_then_poll(ZONE, "2018-05-01", &json!({"location": "global"}))
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_async_operation_is_an_error() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/op2", server.uri());
    Mock::given(method("PUT"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": {"code": "QuotaExceeded", "message": "no more zones"}
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .put_then_poll(ZONE, "2018-05-01", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ArmError::OperationFailed { ref code, .. } if code == "QuotaExceeded"));
}

#[tokio::test]
async fn delete_polls_location_until_gone() {
    let server = MockServer::start().await;
    let location = format!("{}/operationResults/del1", server.uri());
    Mock::given(method("DELETE"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationResults/del1"))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operationResults/del1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).delete_then_poll(ZONE, "2018-05-01").await.unwrap();
}

#[tokio::test]
async fn delete_of_missing_resource_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    client(&server).delete_then_poll(ZONE, "2018-05-01").await.unwrap();
}

#[tokio::test]
async fn client_secret_tokens_are_cached() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/tenant/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "issued-token",
            "expires_in": "3600"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .and(bearer_token("issued-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let block = ProviderBlock {
        subscription_id: Some("sub".into()),
        tenant_id: Some("tenant".into()),
        client_id: Some("client".into()),
        client_secret: Some("secret".into()),
        endpoint: Some(server.uri()),
        authority_host: Some(server.uri()),
        ..Default::default()
    };
    let config = ProviderConfig::resolve_with(&block, |_| None).unwrap();
    let client = ArmClient::new(&config).unwrap();

    client.get(ZONE, "2018-05-01").await.unwrap();
    client.get(ZONE, "2018-05-01").await.unwrap();
}
