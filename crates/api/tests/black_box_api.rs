use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{COOKIE, HeaderValue, LOCATION, SET_COOKIE};
use smbridge_api::app::build_app_with;
use smbridge_api::app::services::build_services_with;
use smbridge_auth::{AccountStore, LocalAccount, Settings, UserSettings};
use smbridge_core::AccountId;
use smbridge_infra::InMemoryAccountDirectory;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(settings: Settings) -> Self {
        // Same router as prod, bound to an ephemeral port.
        Self::spawn_app(smbridge_api::app::build_app(settings)).await
    }

    async fn spawn_app(app: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn settings() -> Settings {
    Settings {
        user: UserSettings {
            username_mapping: Some("HTTP_SM_USER".to_string()),
            user_mapping: Some("HTTP_SM_USER".to_string()),
            mail_mapping: Some("HTTP_SM_MAIL".to_string()),
            role_mapping: Some("editor:HTTP_SM_GROUPS,~=,edit".to_string()),
            role_evaluate_everytime: true,
            ..Default::default()
        },
        logout_url: Some("https://sso.example.org/logout".to_string()),
        siteminder_cookie: Some("SMSESSION".to_string()),
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// `name=value` pair of the cookie `name` set by the response, if any.
fn set_cookie(res: &reqwest::Response, name: &str) -> Option<String> {
    res.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
}

fn location(res: &reqwest::Response) -> &str {
    res.headers()[LOCATION].to_str().unwrap()
}

async fn login(server: &TestServer, client: &reqwest::Client, user: &str) -> String {
    let res = client
        .get(server.url("/siteminder/login"))
        .header("sm-user", user)
        .header("sm-mail", format!("{user}@corp.example"))
        .header("sm-groups", "edit-team")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/");
    set_cookie(&res, "smbridge_session").expect("session cookie issued")
}

#[tokio::test]
async fn login_registers_account_and_whoami_reports_it() {
    let server = TestServer::spawn(settings()).await;
    let client = client();

    let cookie = login(&server, &client, "alice").await;

    let res = client
        .get(server.url("/"))
        .header("sm-user", "alice")
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(set_cookie(&res, "smbridge_session").is_none());

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["account"]["username"], "alice");
    assert_eq!(body["account"]["email"], "alice@corp.example");
    assert_eq!(body["account"]["roles"], serde_json::json!(["editor"]));
    assert_eq!(body["account"]["authname"], "alice");
}

#[tokio::test]
async fn anonymous_requests_are_not_logged_in() {
    let server = TestServer::spawn(settings()).await;
    let client = client();

    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, serde_json::json!({ "authenticated": false }));

    let res = client.get(server.url("/siteminder/login")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/");
    assert!(set_cookie(&res, "smbridge_session").is_none());
}

#[tokio::test]
async fn username_collision_still_redirects_with_notice() {
    let mut settings = settings();
    settings.user.user_mapping = Some("HTTP_SM_DISPLAYNAME".to_string());
    let directory = Arc::new(InMemoryAccountDirectory::new());
    directory.insert(LocalAccount::new(AccountId::new(), "bob").unwrap());
    let services = build_services_with(settings, directory.clone());
    let server = TestServer::spawn_app(build_app_with(services)).await;

    let res = client()
        .get(server.url("/siteminder/login"))
        .header("sm-user", "alice")
        .header("sm-displayname", "bob")
        .header("sm-mail", "alice@corp.example")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/");
    assert!(set_cookie(&res, "smbridge_session").is_some());
    let notices: Vec<_> = res
        .headers()
        .get_all("x-smbridge-notice")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert_eq!(
        notices,
        vec!["Error synchronizing username: an account with username 'bob' already exists."]
    );
    assert!(directory.load_by_username("alice").is_some());
}

#[tokio::test]
async fn utf8_attributes_reach_the_account() {
    let server = TestServer::spawn(settings()).await;
    let client = client();

    let res = client
        .get(server.url("/siteminder/login"))
        .header("sm-user", "jose")
        .header(
            "sm-mail",
            HeaderValue::from_bytes("josé@corp.example".as_bytes()).unwrap(),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert!(res.headers().get("x-smbridge-notice").is_none());
    let cookie = set_cookie(&res, "smbridge_session").unwrap();

    let res = client
        .get(server.url("/"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["account"]["email"], "josé@corp.example");
}

#[tokio::test]
async fn identity_switch_destroys_session_and_redirects_to_login() {
    let server = TestServer::spawn(settings()).await;
    let client = client();
    let alice = login(&server, &client, "alice").await;

    let res = client
        .get(server.url("/"))
        .header("sm-user", "bob")
        .header(COOKIE, &alice)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "/siteminder/login");
    assert_eq!(set_cookie(&res, "smbridge_session").as_deref(), Some("smbridge_session="));

    // The old cookie no longer resolves to a session.
    let res = client
        .get(server.url("/"))
        .header(COOKIE, &alice)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], false);

    let bob = login(&server, &client, "bob").await;
    assert_ne!(bob, alice);
}

#[tokio::test]
async fn session_survives_requests_without_asserted_identity() {
    let server = TestServer::spawn(settings()).await;
    let client = client();
    let cookie = login(&server, &client, "alice").await;

    let res = client
        .get(server.url("/"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], true);
}

#[tokio::test]
async fn logout_redirects_with_referrer_and_expires_cookies() {
    let server = TestServer::spawn(settings()).await;
    let client = client();
    let cookie = login(&server, &client, "alice").await;

    let res = client
        .get(server.url("/siteminder/logout"))
        .header("sm-user", "alice")
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        location(&res),
        format!("https://sso.example.org/logout?referrer={}", server.base_url)
    );
    assert_eq!(set_cookie(&res, "SMSESSION").as_deref(), Some("SMSESSION="));
    assert_eq!(set_cookie(&res, "smbridge_session").as_deref(), Some("smbridge_session="));

    let res = client
        .get(server.url("/"))
        .header(COOKIE, &cookie)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn logout_without_url_returns_no_content() {
    let mut settings = settings();
    settings.logout_url = None;
    let server = TestServer::spawn(settings).await;

    let res = client().get(server.url("/siteminder/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn(settings()).await;
    let res = client().get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}
