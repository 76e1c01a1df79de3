//! Client tests against a fake appliance served on localhost.

use std::net::SocketAddr;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde_json::{Value, json};

use bigip_client::{AuthMode, BigIpClient, ClientOptions, Credentials, Endpoint, Error, StatsKind};

const TOKEN: &str = "fake-token";
// base64("admin:secret")
const BASIC_HEADER: &str = "Basic YWRtaW46c2VjcmV0";

fn authorized(headers: &HeaderMap) -> bool {
    let token_ok = headers
        .get("x-f5-auth-token")
        .is_some_and(|v| v.as_bytes() == TOKEN.as_bytes());
    let basic_ok = headers
        .get("authorization")
        .is_some_and(|v| v.as_bytes() == BASIC_HEADER.as_bytes());
    token_ok || basic_ok
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] == "admin"
        && body["password"] == "secret"
        && body["loginProviderName"] == "tmos"
    {
        (StatusCode::OK, Json(json!({ "token": { "token": TOKEN } })))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "code": 401 })))
    }
}

async fn pool_stats(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "code": 401 })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "entries": {
                "https://localhost/mgmt/tm/ltm/pool/~Common~web/stats": {
                    "nestedStats": {
                        "entries": {
                            "serverside.curConns": { "value": 3 },
                            "tmName": { "description": "/Common/web" }
                        }
                    }
                }
            }
        })),
    )
}

async fn spawn_appliance() -> SocketAddr {
    let router = Router::new()
        .route("/mgmt/shared/authn/login", post(login))
        .route("/mgmt/tm/ltm/pool/stats", get(pool_stats))
        .route(
            "/mgmt/tm/ltm/node/stats",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn client(addr: SocketAddr, password: &str, mode: AuthMode) -> BigIpClient {
    let endpoint = Endpoint::parse(&format!("http://{}", addr)).unwrap();
    BigIpClient::new(
        endpoint,
        Credentials::new("admin", password),
        mode,
        ClientOptions::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_token_auth_fetches_stats() {
    let addr = spawn_appliance().await;
    let client = client(addr, "secret", AuthMode::Token);

    let session = client.connect().await.unwrap();
    let entries = session.stats(StatsKind::Pool).await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "web");
    assert_eq!(entries[0].values.get("serverside.curConns"), Some(&3.0));
}

#[tokio::test]
async fn test_basic_auth_fetches_stats() {
    let addr = spawn_appliance().await;
    let client = client(addr, "secret", AuthMode::Basic);

    let session = client.connect().await.unwrap();
    let entries = session.stats(StatsKind::Pool).await.unwrap();

    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_token_login_rejected() {
    let addr = spawn_appliance().await;
    let client = client(addr, "wrong", AuthMode::Token);

    let result = client.connect().await;
    assert!(matches!(result, Err(Error::Authentication(user)) if user == "admin"));
}

#[tokio::test]
async fn test_basic_auth_rejected_on_query() {
    let addr = spawn_appliance().await;
    let client = client(addr, "wrong", AuthMode::Basic);

    // Basic auth has no login round trip, the rejection shows up on the query.
    let session = client.connect().await.unwrap();
    let result = session.stats(StatsKind::Pool).await;
    assert!(matches!(result, Err(Error::Authentication(_))));
}

#[tokio::test]
async fn test_server_error_surfaces_status() {
    let addr = spawn_appliance().await;
    let client = client(addr, "secret", AuthMode::Basic);

    let session = client.connect().await.unwrap();
    let result = session.stats(StatsKind::Node).await;
    match result {
        Err(Error::Status { status, url }) => {
            assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
            assert!(url.ends_with("/mgmt/tm/ltm/node/stats"));
        }
        other => panic!("expected status error, got {:?}", other.map(|e| e.len())),
    }
}

#[tokio::test]
async fn test_unreachable_appliance() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(addr, "secret", AuthMode::Token);
    let result = client.connect().await;
    assert!(matches!(result, Err(Error::Http(_))));
    assert!(!result.err().is_some_and(|e| e.is_timeout()));
}

#[tokio::test]
async fn test_silent_appliance_reports_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let endpoint = Endpoint::parse(&format!("http://{}", addr)).unwrap();
    let client = BigIpClient::new(
        endpoint,
        Credentials::new("admin", "secret"),
        AuthMode::Token,
        ClientOptions {
            timeout: std::time::Duration::from_millis(200),
            verify_tls: false,
        },
    )
    .unwrap();

    match client.connect().await {
        Err(e) => assert!(e.is_timeout(), "expected timeout, got {:?}", e),
        Ok(_) => panic!("expected login to time out"),
    }
}
