// Integration tests for the ValidateToken RPC
//
// Each test starts identity-service in-process on an ephemeral port, behind
// the same mTLS setup used in deployment, and talks to it through the
// grpc-clients AuthClient that cart-service uses.

use chrono::{Duration as ChronoDuration, Utc};
use crypto_core::{Principal, RejectReason, TokenCodec};
use futures::future::join_all;
use grpc_clients::{AuthClient, AuthClientConfig, AuthError};
use grpc_tls::{generate_dev_certificates, CertificateBundle, MtlsClientConfig, MtlsServerConfig};
use identity_service::security::{InMemoryUserDirectory, TokenIssuer, UserDirectory};
use identity_service::UserAuthService;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

const SECRET: &[u8] = b"integration-secret-for-identity-service";

fn codec() -> Arc<TokenCodec> {
    Arc::new(TokenCodec::new(SECRET, ChronoDuration::hours(1)).unwrap())
}

fn principal(id: i32) -> Principal {
    Principal::new(id, format!("user{id}@example.com"), id % 2 == 0).unwrap()
}

async fn start_identity_service(service: UserAuthService, bundle: &CertificateBundle) -> SocketAddr {
    grpc_tls::install_crypto_provider();
    let server_tls = MtlsServerConfig::from_pem(
        bundle.ca_cert.clone(),
        bundle.server_cert.clone(),
        bundle.server_key.clone(),
    )
    .unwrap()
    .build_server_tls();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = Server::builder()
        .tls_config(server_tls)
        .unwrap()
        .add_service(service.into_server());

    tokio::spawn(async move {
        router
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    addr
}

fn mtls_client(addr: SocketAddr, bundle: &CertificateBundle) -> AuthClient {
    let tls = MtlsClientConfig::from_pem(
        bundle.ca_cert.clone(),
        bundle.client_cert.clone(),
        bundle.client_key.clone(),
        "localhost",
    )
    .unwrap();
    let config = AuthClientConfig::development(format!("https://127.0.0.1:{}", addr.port()))
        .with_tls(tls)
        .with_request_timeout(Duration::from_secs(3));
    AuthClient::new(&config).unwrap()
}

struct Harness {
    client: AuthClient,
    codec: Arc<TokenCodec>,
}

async fn harness(directory: Option<Arc<dyn UserDirectory>>) -> Harness {
    let bundle = generate_dev_certificates().unwrap();
    let codec = codec();
    let mut service = UserAuthService::new(Arc::clone(&codec));
    if let Some(directory) = directory {
        service = service.with_directory(directory);
    }
    let addr = start_identity_service(service, &bundle).await;
    Harness {
        client: mtls_client(addr, &bundle),
        codec,
    }
}

#[tokio::test]
async fn issued_token_round_trips_over_mtls() {
    let h = harness(None).await;
    let issued = TokenIssuer::new(Arc::clone(&h.codec))
        .issue(&principal(42))
        .unwrap();

    let identity = h.client.validate(&issued.access_token).await.unwrap();
    assert_eq!(identity.subject_id(), 42);
    assert_eq!(identity.contact(), "user42@example.com");
    assert!(identity.privileged());

    let bearer = format!("Bearer {}", issued.access_token);
    assert_eq!(h.client.validate(&bearer).await.unwrap().subject_id(), 42);
}

#[tokio::test]
async fn rejections_carry_their_reason() {
    let h = harness(None).await;
    let now = Utc::now();

    let expired = h
        .codec
        .encode(&principal(1), now - ChronoDuration::hours(2))
        .unwrap();
    let future = h
        .codec
        .encode(&principal(1), now + ChronoDuration::minutes(10))
        .unwrap();
    let foreign = TokenCodec::new(b"some-other-deployment-secret-value!!", ChronoDuration::hours(1))
        .unwrap()
        .encode(&principal(1), now)
        .unwrap();

    let cases = [
        ("not.a.jwt", RejectReason::Malformed),
        ("", RejectReason::Malformed),
        ("Basic dXNlcjpwYXNz", RejectReason::Malformed),
        (expired.as_str(), RejectReason::Expired),
        (future.as_str(), RejectReason::NotYetValid),
        (foreign.as_str(), RejectReason::SignatureInvalid),
    ];
    for (token, reason) in cases {
        assert_eq!(
            h.client.validate(token).await,
            Err(AuthError::Rejected(reason)),
            "token {token:?}"
        );
    }
}

#[tokio::test]
async fn deleted_subject_is_revoked() {
    let directory = Arc::new(InMemoryUserDirectory::with_subjects([5, 6]));
    let h = harness(Some(directory.clone() as Arc<dyn UserDirectory>)).await;
    let token = h.codec.encode(&principal(5), Utc::now()).unwrap();

    assert_eq!(h.client.validate(&token).await.unwrap().subject_id(), 5);

    directory.remove(5);
    assert_eq!(
        h.client.validate(&token).await,
        Err(AuthError::Rejected(RejectReason::Revoked))
    );
}

#[tokio::test]
async fn concurrent_validations_are_independent() {
    let h = Arc::new(harness(None).await);
    let now = Utc::now();

    let calls = (1..=120).map(|id| {
        let h = Arc::clone(&h);
        let token = if id % 10 == 0 {
            h.codec
                .encode(&principal(id), now - ChronoDuration::hours(3))
                .unwrap()
        } else {
            h.codec.encode(&principal(id), now).unwrap()
        };
        async move { (id, h.client.validate(&token).await) }
    });

    for (id, result) in join_all(calls).await {
        if id % 10 == 0 {
            assert_eq!(result, Err(AuthError::Rejected(RejectReason::Expired)));
        } else {
            let identity = result.unwrap();
            assert_eq!(identity.subject_id(), id);
            assert_eq!(identity.privileged(), id % 2 == 0);
        }
    }
}

#[tokio::test]
async fn caller_without_client_certificate_is_refused() {
    let bundle = generate_dev_certificates().unwrap();
    let addr = start_identity_service(UserAuthService::new(codec()), &bundle).await;

    // Plaintext against a TLS listener never reaches the handler.
    let config = AuthClientConfig::development(format!("http://127.0.0.1:{}", addr.port()))
        .with_request_timeout(Duration::from_secs(2));
    let client = AuthClient::new(&config).unwrap();
    let token = codec().encode(&principal(1), Utc::now()).unwrap();

    let err = client.validate(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::Unavailable(_)), "{err:?}");
}
