//! End-to-end exercises of the session/request engine and the challenge
//! handlers against a mock ACME server, covering the nonce-bootstrap and
//! http-01 scenarios that no in-module unit test reaches.

use std::sync::Arc;

use acme_session::crypto::AccountKey;
use acme_session::session::{AcmeVersion, Session};
use acme_session::store::{ArtifactStore, MemoryArtifactStore};
use acme_session::{authz::Authz, challenge};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn directory_body(base: &str) -> serde_json::Value {
    serde_json::json!({
        "new-authz": format!("{base}/new-authz"),
        "new-cert": format!("{base}/new-cert"),
        "new-reg": format!("{base}/new-reg"),
        "revoke-cert": format!("{base}/revoke-cert"),
    })
}

/// Decode a signed request body's `protected` header and return its `nonce` field.
fn nonce_from_request(request: &wiremock::Request) -> String {
    let jws: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    let protected_b64 = jws["protected"].as_str().unwrap();
    let protected_bytes = URL_SAFE_NO_PAD.decode(protected_b64).unwrap();
    let protected: serde_json::Value = serde_json::from_slice(&protected_bytes).unwrap();
    protected["nonce"].as_str().unwrap().to_string()
}

/// S2: a session with no cached nonce bootstraps one via HEAD before signing
/// its first POST, and the signed request carries that nonce.
#[tokio::test]
async fn nonce_bootstraps_via_head_before_first_signed_post() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(directory_body(&base)))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/new-reg"))
        .respond_with(ResponseTemplate::new(200).insert_header("Replay-Nonce", "N1"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/new-authz"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", format!("{base}/authz/1").as_str())
                .insert_header("Replay-Nonce", "N2")
                .set_body_json(serde_json::json!({
                    "identifier": {"type": "dns", "value": "example.com"},
                    "status": "pending",
                    "challenges": [],
                })),
        )
        .mount(&server)
        .await;

    let (key, _) = AccountKey::generate().unwrap();
    let store: Arc<dyn ArtifactStore> = Arc::new(MemoryArtifactStore::new());
    let mut session = Session::new(format!("{base}/directory"), key, store, AcmeVersion::V2).unwrap();

    let authz = Authz::register(&mut session, "example.com").await.unwrap();
    assert_eq!(authz.url, format!("{base}/authz/1"));

    let requests = server.received_requests().await.unwrap();
    let register_post = requests
        .iter()
        .find(|r| r.method.to_string().eq_ignore_ascii_case("post") && r.url.path() == "/new-authz")
        .expect("new-authz POST was recorded");
    assert_eq!(nonce_from_request(register_post), "N1");

    let head_count = requests
        .iter()
        .filter(|r| r.method.to_string().eq_ignore_ascii_case("head") && r.url.path() == "/new-reg")
        .count();
    assert_eq!(head_count, 1, "nonce should be bootstrapped exactly once");
}

/// S3: registering an authz and running the http-01 handler end-to-end
/// writes the key authorization into the artifact store and notifies the
/// server once.
#[tokio::test]
async fn http_01_handler_runs_end_to_end_against_mock_server() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_json(directory_body(&base)))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/new-reg"))
        .respond_with(ResponseTemplate::new(200).insert_header("Replay-Nonce", "N1"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/new-authz"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", format!("{base}/authz/1").as_str())
                .insert_header("Replay-Nonce", "N2")
                .set_body_json(serde_json::json!({
                    "identifier": {"type": "dns", "value": "example.com"},
                    "status": "pending",
                    "challenges": [
                        {"type": "http-01", "uri": format!("{base}/chal/1"), "token": "TOKEN1"},
                    ],
                })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chal/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Replay-Nonce", "N3")
                .set_body_json(serde_json::json!({"type": "http-01", "status": "pending"})),
        )
        .mount(&server)
        .await;

    let (key, _) = AccountKey::generate().unwrap();
    let store = Arc::new(MemoryArtifactStore::new());
    let store_handle: Arc<dyn ArtifactStore> = store.clone();
    let mut session = Session::new(format!("{base}/directory"), key, store_handle, AcmeVersion::V2).unwrap();

    let mut authz = Authz::register(&mut session, "example.com").await.unwrap();
    challenge::respond(&mut session, &mut authz, &["http-01".to_string()])
        .await
        .unwrap();

    assert_eq!(authz.dir.as_deref(), Some("example.com"));

    let expected = acme_session::jose::key_authorization(session.account_key(), "TOKEN1").unwrap();
    let saved = store
        .load(
            acme_session::store::Group::Challenges,
            "example.com",
            acme_session::store::HTTP01,
            acme_session::store::Kind::Text,
        )
        .await
        .unwrap();
    assert_eq!(saved.as_deref(), Some(expected.as_bytes()));

    let requests = server.received_requests().await.unwrap();
    let notify_count = requests
        .iter()
        .filter(|r| r.method.to_string().eq_ignore_ascii_case("post") && r.url.path() == "/chal/1")
        .count();
    assert_eq!(notify_count, 1, "server should be notified exactly once");
}
