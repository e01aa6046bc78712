use axum::http::{header, HeaderMap, HeaderValue};
use chrono::Utc;
use folio::config::PublicConfig;
use folio::supabase::cookies::is_removal;
use folio::supabase::{AuthChangeEvent, BackendClient, ClientError, RequestCookies};
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_json, header as header_is, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COOKIE_NAME: &str = "sb-127-auth-token";

fn config(server: &MockServer) -> PublicConfig {
    PublicConfig {
        url: Url::parse(&server.uri()).unwrap(),
        anon_key: "anon".to_string(),
    }
}

fn session_body(access: &str, refresh: &str, expires_at: i64) -> Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": expires_at,
        "user": {
            "id": "5b1c2f6e-8a57-4a3e-9d6c-7f0e2b9d4a11",
            "aud": "authenticated",
            "role": "authenticated",
            "email": "me@example.com"
        }
    })
}

/// Cookies as a browser would send them back after the given response.
fn replay(cookies: &RequestCookies) -> RequestCookies {
    let pairs: Vec<String> = cookies
        .take_pending()
        .into_iter()
        .filter(|c| !is_removal(c))
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&pairs.join("; ")).unwrap(),
    );
    RequestCookies::from_headers(&headers)
}

async fn signed_in_cookies(server: &MockServer, expires_at: i64) -> RequestCookies {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header_is("apikey", "anon"))
        .and(body_json(json!({ "email": "me@example.com", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("at-1", "rt-1", expires_at)))
        .mount(server)
        .await;

    let cookies = RequestCookies::new();
    let client = BackendClient::request_scoped(&config(server), cookies.clone());
    client
        .auth()
        .sign_in_with_password("me@example.com", "hunter2")
        .await
        .unwrap();
    cookies
}

#[tokio::test]
async fn test_sign_in_persists_session_in_cookies() {
    let server = MockServer::start().await;
    let cookies = signed_in_cookies(&server, Utc::now().timestamp() + 3600).await;

    let value = cookies.get(COOKIE_NAME).expect("session cookie");
    assert!(value.starts_with("base64-"));

    let header = cookies.take_pending().remove(0).to_string();
    assert!(header.starts_with(COOKIE_NAME));
    assert!(header.contains("Path=/"));
    assert!(header.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_next_request_uses_session_from_cookies() {
    let server = MockServer::start().await;
    let cookies = signed_in_cookies(&server, Utc::now().timestamp() + 3600).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .and(header_is("apikey", "anon"))
        .and(header_is("authorization", "Bearer at-1"))
        .and(query_param("is_active", "eq.true"))
        .and(query_param("order", "display_order.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let next = BackendClient::request_scoped(&config(&server), replay(&cookies));
    let rows: Vec<Value> = next
        .from("services")
        .select("*")
        .eq("is_active", true)
        .order("display_order", true)
        .fetch_many()
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_anonymous_request_sends_anon_key_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/blog_tags"))
        .and(header_is("authorization", "Bearer anon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "rust" }])))
        .expect(1)
        .mount(&server)
        .await;

    let client = BackendClient::public(&config(&server));
    let rows: Vec<Value> = client.from("blog_tags").select("*").fetch_many().await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_no_rows_is_none_for_optional_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/portfolio_projects"))
        .and(header_is("accept", "application/vnd.pgrst.object+json"))
        .respond_with(ResponseTemplate::new(406).set_body_json(json!({
            "code": "PGRST116",
            "message": "JSON object requested, multiple (or no) rows returned",
            "details": "The result contains 0 rows",
            "hint": null
        })))
        .mount(&server)
        .await;

    let client = BackendClient::public(&config(&server));
    let row: Option<Value> = client
        .from("portfolio_projects")
        .select("*")
        .eq("slug", "missing")
        .fetch_optional()
        .await
        .unwrap();
    assert!(row.is_none());

    let err = client
        .from("portfolio_projects")
        .select("*")
        .fetch_one::<Value>()
        .await
        .unwrap_err();
    match err {
        ClientError::Api(e) => {
            assert_eq!(e.code.as_deref(), Some("PGRST116"));
            assert_eq!(e.status, Some(406));
        }
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_expiring_session_is_refreshed_into_cookies() {
    let server = MockServer::start().await;
    let cookies = signed_in_cookies(&server, Utc::now().timestamp() + 5).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .and(body_json(json!({ "refresh_token": "rt-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body(
            "at-2",
            "rt-2",
            Utc::now().timestamp() + 3600,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let next_cookies = replay(&cookies);
    let client = BackendClient::request_scoped(&config(&server), next_cookies.clone());
    let mut events = client.auth().subscribe();

    let session = client.auth().get_session().await.unwrap().unwrap();
    assert_eq!(session.access_token, "at-2");
    assert_eq!(events.recv().await.unwrap().event, AuthChangeEvent::TokenRefreshed);

    let written = next_cookies.take_pending();
    assert!(written.iter().any(|c| c.name() == COOKIE_NAME && !is_removal(c)));
}

#[tokio::test]
async fn test_rejected_refresh_clears_cookies() {
    let server = MockServer::start().await;
    let cookies = signed_in_cookies(&server, Utc::now().timestamp() - 10).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used"
        })))
        .mount(&server)
        .await;

    let next_cookies = replay(&cookies);
    let client = BackendClient::request_scoped(&config(&server), next_cookies.clone());

    let err = client.auth().get_session().await.unwrap_err();
    assert!(matches!(err, ClientError::Api(ref e) if e.status == Some(400)));

    assert!(next_cookies.get(COOKIE_NAME).is_none());
    let written = next_cookies.take_pending();
    assert!(written.iter().all(is_removal));
}

#[tokio::test]
async fn test_sign_out_revokes_and_clears() {
    let server = MockServer::start().await;
    let cookies = signed_in_cookies(&server, Utc::now().timestamp() + 3600).await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header_is("authorization", "Bearer at-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let next_cookies = replay(&cookies);
    let client = BackendClient::request_scoped(&config(&server), next_cookies.clone());
    client.auth().sign_out().await.unwrap();

    assert!(client.auth().get_session().await.unwrap().is_none());
}
