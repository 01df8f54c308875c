use std::sync::Arc;

use axum::Router;
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use notify_api::auth::jwks::JwksClient;
use notify_api::config::Config;
use notify_api::dispatch::store::{MemoryNotificationStore, NotificationStore};
use notify_api::kv::{KeyValueStore, MemoryStore};
use notify_api::AppState;
use signet_common::SnowflakeGenerator;

pub const TEST_ISSUER: &str = "https://login.test";

/// Test signing keys derived from a fixed seed, mirroring the issuer's dev
/// key derivation.
pub struct TestSigningKeys {
    pub kid: String,
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl TestSigningKeys {
    pub fn from_seed(seed: &str) -> Self {
        let hash = Sha256::digest(seed.as_bytes());
        let mut secret_bytes = [0u8; 32];
        secret_bytes.copy_from_slice(&hash);

        let signing_key = SigningKey::from_bytes(&secret_bytes);
        let verifying_key: VerifyingKey = (&signing_key).into();

        let secret = signing_key.to_bytes();
        let public_bytes = verifying_key.to_bytes();

        let pkcs8_der = wrap_ed25519_private_pkcs8(&secret);
        let encoding = EncodingKey::from_ed_der(&pkcs8_der);
        let decoding = DecodingKey::from_ed_der(&public_bytes);

        let kid_hash = Sha256::digest(public_bytes);
        let kid = format!(
            "idp-{}",
            kid_hash
                .iter()
                .map(|b| format!("{:02x}", b))
                .collect::<String>()[..8]
                .to_string()
        );

        Self {
            kid,
            encoding,
            decoding,
        }
    }
}

fn wrap_ed25519_private_pkcs8(secret: &[u8; 32]) -> Vec<u8> {
    let mut der = Vec::with_capacity(48);
    der.extend_from_slice(&[0x30, 0x2e]);
    der.extend_from_slice(&[0x02, 0x01, 0x00]);
    der.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    der.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    der.extend_from_slice(secret);
    der
}

#[derive(Debug, Serialize, Deserialize)]
struct TestAccessClaims {
    iss: String,
    sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tenant: Option<String>,
    iat: i64,
    exp: i64,
}

/// Mint a valid access token for a test user.
pub fn mint_access_token(
    keys: &TestSigningKeys,
    user_id: &str,
    tenant: Option<&str>,
) -> String {
    let now = chrono::Utc::now();
    let claims = TestAccessClaims {
        iss: TEST_ISSUER.to_string(),
        sub: user_id.to_string(),
        tenant: tenant.map(str::to_string),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::seconds(300)).timestamp(),
    };

    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(keys.kid.clone());

    jsonwebtoken::encode(&header, &claims, &keys.encoding).expect("mint test token")
}

/// Mint an already-expired access token.
pub fn mint_expired_token(keys: &TestSigningKeys, user_id: &str) -> String {
    let now = chrono::Utc::now();
    let claims = TestAccessClaims {
        iss: TEST_ISSUER.to_string(),
        sub: user_id.to_string(),
        tenant: None,
        iat: (now - chrono::Duration::seconds(600)).timestamp(),
        exp: (now - chrono::Duration::seconds(300)).timestamp(),
    };

    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = Some(keys.kid.clone());

    jsonwebtoken::encode(&header, &claims, &keys.encoding).expect("mint expired token")
}

/// Build a test AppState with in-memory stores and a static JWKS key.
pub fn test_state() -> (AppState, TestSigningKeys) {
    let config = Config {
        issuer_url: TEST_ISSUER.to_string(),
        redis_url: None,
        port: 0,
        default_tenant: "default".to_string(),
        worker_id: 0,
    };

    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let store: Arc<dyn NotificationStore> = Arc::new(MemoryNotificationStore::new(Arc::new(
        SnowflakeGenerator::new(0),
    )));

    let signing_keys = TestSigningKeys::from_seed("dev-seed-do-not-use-in-production");

    // Pre-load the JWKS client with the test key so it doesn't hit the network.
    let jwks = JwksClient::with_static_key(&signing_keys.kid, signing_keys.decoding.clone());

    let state = AppState::build(Arc::new(config), kv, store, jwks);
    (state, signing_keys)
}

/// Build the full application router wired to the test state.
pub fn test_app() -> (Router, AppState, TestSigningKeys) {
    let (state, keys) = test_state();
    let app = notify_api::routes::router().with_state(state.clone());
    (app, state, keys)
}

/// Register a live hub connection the way the WebSocket loop does: transport
/// channel first, then presence registration.
pub async fn connect_hub(
    state: &AppState,
    tenant: &str,
    user_id: &str,
    connection_id: &str,
) -> (
    notify_api::hub::session::HubSession,
    tokio::sync::mpsc::UnboundedReceiver<notify_api::hub::transport::HubFrame>,
) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    state.hub.connect(connection_id, tx);

    let principal = notify_api::hub::session::HubPrincipal {
        subject: user_id.to_string(),
        tenant: Some(tenant.to_string()),
    };
    let session = state
        .sessions
        .on_connected(connection_id, Some(&principal), None)
        .await;
    assert!(session.is_registered());
    (session, rx)
}
