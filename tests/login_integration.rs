//! Integration tests for a single login exchange against a mock portal.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::cookie::Jar;
use wiremock::matchers::{body_string, header, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

use scraper_session::{
    Context, Credentials, HttpClient, LOGIN_USER_AGENT, LoginErrorKind, LoginOutcome,
    SessionTarget, login,
};
mod support;
use support::socket_guard::start_mock_server_or_skip;

fn target_for(server_uri: &str) -> SessionTarget {
    SessionTarget::new(format!("{server_uri}/login.php"), format!("{server_uri}/"))
}

fn client_with_jar() -> (HttpClient, Arc<Jar>) {
    let jar = Arc::new(Jar::default());
    let client = HttpClient::with_cookie_jar(Arc::clone(&jar)).unwrap();
    (client, jar)
}

// ---- Wire contract ----

#[tokio::test]
async fn test_login_posts_form_with_expected_headers() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let referer = format!("{}/", mock_server.uri());

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("referer", referer.as_str()))
        .and(header_exists("user-agent"))
        .and(body_string(
            "action=login&username=testuser&password=p%40ss+w%26rd",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>welcome</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _jar) = client_with_jar();
    let credentials = Credentials::new("testuser", "p@ss w&rd");
    let result = login(
        &Context::background(),
        &client,
        &target_for(&mock_server.uri()),
        &credentials,
    )
    .await;
    assert!(result.is_ok(), "login should succeed: {result:?}");

    // The UA contains commas, so compare the raw header instead of a matcher
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let user_agent = requests[0].headers.get("user-agent").unwrap();
    assert_eq!(user_agent.to_str().unwrap(), LOGIN_USER_AGENT);
}

// ---- Status classification ----

#[tokio::test]
async fn test_login_rejected_with_401() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _jar) = client_with_jar();
    let err = login(
        &Context::background(),
        &client,
        &target_for(&mock_server.uri()),
        &Credentials::new("testuser", "wrong"),
    )
    .await
    .unwrap_err();

    assert!(err.is_login_rejected());
    assert_eq!(err.status(), Some(401));
    let msg = err.to_string();
    assert!(msg.contains("status code: 401"), "Expected status in: {msg}");
}

#[tokio::test]
async fn test_login_no_content_status_is_not_success() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    // 204 is a success class code but not the 200 the portal sends on login
    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let (client, _jar) = client_with_jar();
    let err = login(
        &Context::background(),
        &client,
        &target_for(&mock_server.uri()),
        &Credentials::new("testuser", "testpass"),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), LoginErrorKind::UnexpectedStatus);
    assert_eq!(err.status(), Some(204));
}

#[tokio::test]
async fn test_login_repeated_attempts_classify_identically() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (client, _jar) = client_with_jar();
    let target = target_for(&mock_server.uri());
    let credentials = Credentials::new("testuser", "testpass");

    let mut outcomes = Vec::new();
    for _ in 0..3 {
        let result = login(&Context::background(), &client, &target, &credentials).await;
        outcomes.push(LoginOutcome::classify(&result));
    }
    assert!(
        outcomes
            .iter()
            .all(|outcome| *outcome == LoginOutcome::UnexpectedStatus(403)),
        "outcomes differ: {outcomes:?}"
    );
}

// ---- No request is sent ----

#[tokio::test]
async fn test_login_invalid_url_sends_nothing() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (client, _jar) = client_with_jar();
    let target = SessionTarget::new("http://invalid url", mock_server.uri());
    let err = login(
        &Context::background(),
        &client,
        &target,
        &Credentials::new("testuser", "testpass"),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), LoginErrorKind::RequestConstruction);
    assert!(err.to_string().contains("failed to create new request"));
}

#[tokio::test]
async fn test_login_cancelled_context_sends_nothing() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let ctx = Context::background();
    ctx.cancel();

    let (client, _jar) = client_with_jar();
    let err = login(
        &ctx,
        &client,
        &target_for(&mock_server.uri()),
        &Credentials::new("testuser", "testpass"),
    )
    .await
    .unwrap_err();

    assert!(err.is_canceled(), "got: {err}");
    assert!(err.to_string().contains("failed to request"));
}

// ---- Deadline ----

#[tokio::test]
async fn test_login_deadline_cuts_slow_server_short() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let ctx = Context::background().with_timeout(Duration::from_millis(50));
    let (client, _jar) = client_with_jar();
    let started = Instant::now();
    let err = login(
        &ctx,
        &client,
        &target_for(&mock_server.uri()),
        &Credentials::new("testuser", "testpass"),
    )
    .await
    .unwrap_err();

    assert!(err.is_deadline_exceeded(), "got: {err}");
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "login did not return near the deadline: {:?}",
        started.elapsed()
    );
}

// ---- Session cookie ----

#[tokio::test]
async fn test_login_session_cookie_sent_on_follow_up_request() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("POST"))
        .and(path("/login.php"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", "PHPSESSID=abc123; Path=/"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/members/list.php"))
        .and(header("cookie", "PHPSESSID=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string("member data"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _jar) = client_with_jar();
    login(
        &Context::background(),
        &client,
        &target_for(&mock_server.uri()),
        &Credentials::new("testuser", "testpass"),
    )
    .await
    .unwrap();

    let response = client
        .inner()
        .get(format!("{}/members/list.php", mock_server.uri()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "member data");
}
