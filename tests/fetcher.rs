use appcrawler::{Error, RequestFetcher, RetryPolicy};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher(max_retries: Option<u32>) -> RequestFetcher {
    RequestFetcher::with_client(reqwest::Client::new(), RetryPolicy::immediate(max_retries))
}

#[tokio::test]
async fn returns_decoded_body_with_query_params() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/appdetails/"))
        .and(query_param("appids", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"10": {"success": true}})))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/api/appdetails/", server.uri());
    let body = fetcher(Some(0))
        .fetch(&url, &[("appids", "10".to_string())])
        .await
        .unwrap();

    assert_eq!(body, json!({"10": {"success": true}}));
}

#[tokio::test]
async fn retries_through_rate_limiting() {
    let server = MockServer::start().await;
    Mock::given(path("/flaky"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let body = fetcher(None)
        .fetch(&format!("{}/flaky", server.uri()), &[])
        .await
        .unwrap();

    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn empty_and_null_bodies_are_retried() {
    let server = MockServer::start().await;
    Mock::given(path("/sparse"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/sparse"))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/sparse"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(path("/sparse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1])))
        .mount(&server)
        .await;

    let body = fetcher(Some(5))
        .fetch(&format!("{}/sparse", server.uri()), &[])
        .await
        .unwrap();

    assert_eq!(body, json!([1]));
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn permanent_failure_terminates_with_bounded_retries() {
    let server = MockServer::start().await;
    Mock::given(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let err = fetcher(Some(3))
        .fetch(&format!("{}/down", server.uri()), &[])
        .await
        .unwrap_err();

    match err {
        Error::RetriesExhausted { attempts, last_error, .. } => {
            assert_eq!(attempts, 4);
            assert!(last_error.contains("503"), "{last_error}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn transport_failure_terminates_with_bounded_retries() {
    // Nothing listens on the discard port.
    let err = fetcher(Some(1))
        .fetch("http://127.0.0.1:9/", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { attempts: 2, .. }));
}

#[tokio::test]
async fn malformed_url_is_not_retried() {
    let err = fetcher(None).fetch("not a url", &[]).await.unwrap_err();
    assert!(matches!(err, Error::Url(_)));
}

#[tokio::test]
async fn rate_limited_responses_wait_between_retries() {
    let server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    let policy = RetryPolicy {
        empty_response_delay: Duration::from_millis(150),
        max_delay: Duration::from_secs(1),
        ..RetryPolicy::immediate(None)
    };

    let started = Instant::now();
    RequestFetcher::with_client(reqwest::Client::new(), policy)
        .fetch(&format!("{}/slow", server.uri()), &[])
        .await
        .unwrap();

    assert!(started.elapsed() >= Duration::from_millis(300), "{:?}", started.elapsed());
}

#[tokio::test]
async fn transport_failures_wait_between_retries() {
    let policy = RetryPolicy {
        max_retries: Some(2),
        transport_delay: Duration::from_millis(150),
        max_delay: Duration::from_secs(1),
        ..RetryPolicy::immediate(None)
    };

    let started = Instant::now();
    let err = RequestFetcher::with_client(reqwest::Client::new(), policy)
        .fetch("http://127.0.0.1:9/", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RetriesExhausted { attempts: 3, .. }));
    assert!(started.elapsed() >= Duration::from_millis(300), "{:?}", started.elapsed());
}
