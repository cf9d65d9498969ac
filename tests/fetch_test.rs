use product_bot::config::HttpConfig;
use product_bot::error::FetchError;
use product_bot::utils::http::{create_client, fetch_html};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_config(user_agents: &[&str], max_attempts: u32) -> HttpConfig {
    HttpConfig {
        timeout_seconds: 5,
        max_attempts,
        retry_delay_ms: 0,
        pool_max_idle_per_host: 1,
        user_agents: user_agents.iter().map(|s| s.to_string()).collect(),
    }
}

fn page_url(server: &MockServer, page: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), page)).unwrap()
}

#[tokio::test]
async fn returns_body_on_first_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let http = http_config(&["First/1.0"], 3);
    let client = create_client(&http).unwrap();
    let page = fetch_html(&client, &page_url(&server, "/shop"), &http).await.unwrap();

    assert_eq!(page.html, "<html>ok</html>");
    assert_eq!(page.attempts, 1);
    assert_eq!(page.status.as_u16(), 200);
}

#[tokio::test]
async fn retries_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(ResponseTemplate::new(200).set_body_string("second time lucky"))
        .mount(&server)
        .await;

    let http = http_config(&["First/1.0", "Second/2.0"], 4);
    let client = create_client(&http).unwrap();
    let page = fetch_html(&client, &page_url(&server, "/shop"), &http).await.unwrap();

    assert_eq!(page.html, "second time lucky");
    assert_eq!(page.attempts, 2);
}

#[tokio::test]
async fn rotates_user_agents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shop"))
        .and(header("user-agent", "Second/2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello second agent"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let http = http_config(&["First/1.0", "Second/2.0"], 4);
    let client = create_client(&http).unwrap();
    let page = fetch_html(&client, &page_url(&server, "/shop"), &http).await.unwrap();

    assert_eq!(page.html, "hello second agent");
    assert_eq!(page.attempts, 2);
}

#[tokio::test]
async fn permanent_error_skips_remaining_agents_for_that_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let http = http_config(&["First/1.0", "Second/2.0"], 4);
    let client = create_client(&http).unwrap();
    let err = fetch_html(&client, &page_url(&server, "/missing"), &http)
        .await
        .unwrap_err();

    // one plain-http attempt, then both agents over https
    match err {
        FetchError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected exhausted error, got {:?}", other),
    }
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let http = http_config(&["First/1.0", "Second/2.0"], 3);
    let client = create_client(&http).unwrap();
    let err = fetch_html(&client, &page_url(&server, "/down"), &http)
        .await
        .unwrap_err();

    assert!(err.is_transient());
    match err {
        FetchError::Exhausted { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected exhausted error, got {:?}", other),
    }
}
