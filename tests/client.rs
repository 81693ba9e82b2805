use std::time::Duration;

use kollus::{ApiClient, ApiClientBuilder, ClientError, Params, ServiceAccount, UploadUrlRequest};
use reqwest::Method;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn builder(server: &MockServer) -> ApiClientBuilder {
    ApiClientBuilder::new("example.com", 0)
        .api_domain(server.address().to_string())
        .service_account(ServiceAccount::new("key", "token"))
}

fn connected(server: &MockServer) -> ApiClient {
    let mut client = builder(server).build();
    client.connect().unwrap();
    client
}

fn upload_files(keys: std::ops::Range<u32>) -> Vec<Value> {
    keys.map(|i| json!({"upload_file_key": format!("f{i}"), "transcoding_stage": 2}))
        .collect()
}

#[tokio::test]
async fn categories_are_listed_with_token_and_force_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/0/media/category"))
        .and(query_param("access_token", "token"))
        .and(query_param("force", "1"))
        .and(query_param("order", "name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"count": 2, "items": [
                {"id": 1, "name": "Lectures", "key": "c1", "parent_id": false, "level": 0},
                {"id": 2, "name": "Week 1", "key": "c2", "parent_id": 1, "level": 1}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connected(&server);
    let mut params = Params::new();
    params.insert("order".into(), "name".into());
    let categories = client.get_categories(&params, true).await.unwrap();

    let names: Vec<_> = categories.iter().map(|c| c.name.clone().unwrap()).collect();
    assert_eq!(names, vec!["Lectures", "Week 1"]);
    assert_eq!(categories.get(0).unwrap().parent_id, None);
    assert_eq!(categories.get(1).unwrap().parent_id, Some(1));
}

#[tokio::test]
async fn single_wrapped_item_becomes_one_element_list() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"count": 1, "items": {"item": [{"id": 7, "key": "only"}]}}
        })))
        .mount(&server)
        .await;

    let categories = connected(&server)
        .get_categories(&Params::new(), false)
        .await
        .unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories.get(0).unwrap().key.as_deref(), Some("only"));
}

#[tokio::test]
async fn malformed_listing_envelope_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"items": {"unexpected": true}}
        })))
        .mount(&server)
        .await;

    let err = connected(&server)
        .get_categories(&Params::new(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse { .. }));
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn non_200_is_attempted_three_times_then_surfaced() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/category"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .expect(3)
        .mount(&server)
        .await;

    let err = connected(&server)
        .get_categories(&Params::new(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse { .. }));
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn retry_stops_at_first_200() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/category"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/0/media/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"count": 0, "items": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let categories = connected(&server)
        .get_categories(&Params::new(), false)
        .await
        .unwrap();
    assert!(categories.is_empty());
}

#[tokio::test]
async fn attempt_budget_is_configurable() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/category"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = builder(&server).max_attempts(1).build();
    client.connect().unwrap();
    assert!(client.get_categories(&Params::new(), false).await.is_err());
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/category"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "http://elsewhere.invalid/"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let err = connected(&server)
        .get_categories(&Params::new(), false)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(302));
}

#[tokio::test]
async fn remote_error_flag_carries_message_and_status() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 1,
            "message": "Invalid access token."
        })))
        .mount(&server)
        .await;

    let err = connected(&server)
        .get_categories(&Params::new(), false)
        .await
        .unwrap_err();
    match err {
        ClientError::Remote { message, status } => {
            assert_eq!(message, "Invalid access token.");
            assert_eq!(status, 200);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn remote_error_without_message_uses_raw_body() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/category"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"error":true}"#))
        .mount(&server)
        .await;

    let err = connected(&server)
        .get_categories(&Params::new(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Remote { ref message, .. } if message == r#"{"error":true}"#));
}

#[tokio::test]
async fn timeout_override_applies_per_request() {
    let server = MockServer::start().await;
    Mock::given(path("/0/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {}}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let err = connected(&server)
        .request(
            Method::GET,
            "slow",
            &Params::new(),
            &Params::new(),
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Http(ref e) if e.is_timeout()));
}

#[tokio::test]
async fn upload_url_posts_credentials_and_flags() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/0/media_auth/upload/create_url.json"))
        .and(body_string_contains("access_token=token"))
        .and(body_string_contains("title=demo"))
        .and(body_string_contains("is_encryption_upload=0"))
        .and(body_string_contains("is_audio_upload=1"))
        .and(body_string_contains("expire_time=600"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {
                "upload_url": "http://upload.example.com/u/abc",
                "progress_url": "http://upload.example.com/p/abc",
                "upload_file_key": "abc",
                "will_be_expired_at": 1700000600
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = UploadUrlRequest {
        title: Some("demo".into()),
        is_audio_upload: true,
        ..Default::default()
    };
    let url = connected(&server)
        .get_upload_url_response(&request)
        .await
        .unwrap();
    assert_eq!(url.upload_file_key.as_deref(), Some("abc"));
    assert_eq!(url.will_be_expired_at, Some(1700000600));

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(!body.contains("category_key"), "{body}");
}

#[tokio::test]
async fn upload_url_uses_dedicated_upload_domain() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/create_url"))
        .and(body_string_contains("category_key=c1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"upload_url": "http://upload.example.com/u/1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = builder(&server)
        .upload_api_domain(server.address().to_string())
        .build();
    client.connect().unwrap();

    let request = UploadUrlRequest {
        category_key: Some("c1".into()),
        ..Default::default()
    };
    let url = client.get_upload_url_response(&request).await.unwrap();
    assert_eq!(url.upload_url.as_deref(), Some("http://upload.example.com/u/1"));
}

#[tokio::test]
async fn upload_url_without_result_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media_auth/upload/create_url.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 0})))
        .mount(&server)
        .await;

    let err = connected(&server)
        .get_upload_url_response(&UploadUrlRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse { .. }));
}

#[tokio::test]
async fn upload_files_are_merged_in_page_order() {
    let server = MockServer::start().await;
    for (page, keys) in [("1", 0..10), ("2", 10..20), ("3", 20..25)] {
        Mock::given(path("/0/media/upload_file"))
            .and(query_param("page", page))
            .and(query_param("per_page", "10"))
            .and(query_param("access_token", "token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 0,
                "result": {"per_page": 10, "count": 25, "items": upload_files(keys)}
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut params = Params::new();
    params.insert("per_page".into(), "10".into());
    let files = connected(&server).get_upload_files(&params, false).await.unwrap();

    let keys: Vec<_> = files
        .iter()
        .map(|f| f.upload_file_key.clone().unwrap())
        .collect();
    let expected: Vec<_> = (0..25).map(|i| format!("f{i}")).collect();
    assert_eq!(keys, expected);
}

#[tokio::test]
async fn upload_files_default_to_100_per_page() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/upload_file"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"per_page": 100, "count": 100, "items": upload_files(0..100)}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let files = connected(&server)
        .get_upload_files(&Params::new(), false)
        .await
        .unwrap();
    assert_eq!(files.len(), 100);
}

#[tokio::test]
async fn failed_page_aborts_the_whole_listing() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/upload_file"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"per_page": 2, "count": 4, "items": upload_files(0..2)}
        })))
        .mount(&server)
        .await;
    Mock::given(path("/0/media/upload_file"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 1,
            "message": "Temporarily unavailable."
        })))
        .mount(&server)
        .await;

    let err = connected(&server)
        .get_upload_files(&Params::new(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Remote { .. }));
}

#[tokio::test]
async fn page_reports_totals() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/upload_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"per_page": 10, "count": 95, "items": upload_files(0..10)}
        })))
        .mount(&server)
        .await;

    let page = connected(&server)
        .find_upload_files_by_page(1, &Params::new(), false)
        .await
        .unwrap();
    assert_eq!(page.count, 95);
    assert_eq!(page.per_page, 10);
    assert_eq!(page.pages(), 10);
    assert_eq!(page.items.len(), 10);
}

#[tokio::test]
async fn zero_per_page_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(path("/0/media/upload_file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": 0,
            "result": {"per_page": 0, "count": 3, "items": []}
        })))
        .mount(&server)
        .await;

    let err = connected(&server)
        .find_upload_files_by_page(1, &Params::new(), false)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse { .. }));
}
