use axum::Router;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;

use super::*;

async fn flavored(headers: HeaderMap, body: &'static str) -> (StatusCode, &'static str) {
    match headers.get("Metadata-Flavor").and_then(|v| v.to_str().ok()) {
        Some("Google") => (StatusCode::OK, body),
        _ => (StatusCode::FORBIDDEN, ""),
    }
}

async fn spawn_metadata_server() -> String {
    let app = Router::new()
        .route(
            "/instance/name",
            get(|h: HeaderMap| flavored(h, "us-west1-a\n")),
        )
        .route(
            "/instance/network-interfaces/0/ip",
            get(|h: HeaderMap| flavored(h, "10.0.0.7")),
        )
        .route(
            "/instance/network-interfaces/0/access-configs/0/external-ip",
            get(|h: HeaderMap| flavored(h, "34.1.2.3")),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn metadata_identity_sends_flavor_header_and_trims() {
    let base = spawn_metadata_server().await;
    let identity = MetadataIdentity::with_base_url(&base, Duration::from_secs(2)).unwrap();

    let host = identity.host().await.unwrap();
    assert_eq!(
        host,
        Host {
            name: "us-west1-a".to_string(),
            endpoint: "34.1.2.3".to_string(),
            private: "10.0.0.7".to_string(),
        }
    );
}

#[tokio::test]
async fn metadata_identity_reports_missing_values_as_upstream() {
    let base = spawn_metadata_server().await;
    let identity = MetadataIdentity::with_base_url(&base, Duration::from_secs(2)).unwrap();

    let err = identity.identity(IdentityKind::ProjectId).await.unwrap_err();
    assert!(matches!(err, RelayError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn static_identity_answers_from_config() {
    let identity = StaticIdentity::new(
        Host {
            name: "europe-west2-b".to_string(),
            endpoint: "1.1.1.1".to_string(),
            private: String::new(),
        },
        "relay-project",
    );

    assert_eq!(
        identity.identity(IdentityKind::ProjectId).await.unwrap(),
        "relay-project"
    );
    assert_eq!(
        identity.identity(IdentityKind::Name).await.unwrap(),
        "europe-west2-b"
    );
    assert!(matches!(
        identity.identity(IdentityKind::PrivateIp).await,
        Err(RelayError::Validation(_))
    ));
}
