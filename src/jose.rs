//! JSON Web Signature (Flattened Serialization) and JWK thumbprints for the
//! ECDSA P-256 account key.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use crate::crypto::{sha256_digest_hex, AccountKey};
use crate::error::AcmeError;

fn b64(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// An EC P-256 JSON Web Key, serialized with lexicographically ordered keys
/// (`crv`, `kty`, `x`, `y`) so its bytes are stable for thumbprinting.
#[derive(Debug, Clone, Serialize)]
pub struct Jwk {
    pub crv: &'static str,
    pub kty: &'static str,
    pub x: String,
    pub y: String,
}

impl Jwk {
    pub fn from_account_key(key: &AccountKey) -> Result<Self, AcmeError> {
        let point = key.public_key_point();
        // Uncompressed SEC1 point: 0x04 || X (32 bytes) || Y (32 bytes).
        if point.len() != 65 || point[0] != 0x04 {
            return Err(AcmeError::InvalidArgument(
                "account key public point is not an uncompressed P-256 point".into(),
            ));
        }
        Ok(Jwk {
            crv: "P-256",
            kty: "EC",
            x: b64(&point[1..33]),
            y: b64(&point[33..65]),
        })
    }
}

/// RFC 7638 JWK thumbprint: base64url(SHA-256(canonical JWK JSON)).
pub fn thumbprint(key: &AccountKey) -> Result<String, AcmeError> {
    let jwk = Jwk::from_account_key(key)?;
    // Field order here is the canonical order for an EC JWK: crv, kty, x, y.
    let canonical = serde_json::json!({
        "crv": jwk.crv,
        "kty": jwk.kty,
        "x": jwk.x,
        "y": jwk.y,
    });
    let bytes = serde_json::to_vec(&canonical)?;
    let digest = ring::digest::digest(&ring::digest::SHA256, &bytes);
    Ok(b64(digest.as_ref()))
}

/// `key authorization = token || "." || thumbprint`.
pub fn key_authorization(key: &AccountKey, token: &str) -> Result<String, AcmeError> {
    Ok(format!("{token}.{}", thumbprint(key)?))
}

/// The digest fed into a `tls-sni-01` self-signed certificate's subject, as the
/// hex SHA-256 of the key authorization.
pub fn key_authorization_digest_hex(key: &AccountKey, token: &str) -> Result<String, AcmeError> {
    Ok(sha256_digest_hex(key_authorization(key, token)?.as_bytes()))
}

/// A Flattened JSON Serialization JWS, ready to be POSTed as `application/jose+json`.
#[derive(Debug, Serialize)]
pub struct Jws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

/// Who signs a request: by account key + kid once registered, or by account
/// key + embedded JWK beforehand (new-account only).
pub enum SigningIdentity<'a> {
    Jwk,
    Kid(&'a str),
}

/// Build and sign a Flattened JSON Serialization JWS over `payload` (or an
/// empty payload for POST-as-GET), addressed at `url`, consuming `nonce`.
pub fn sign(
    key: &AccountKey,
    identity: SigningIdentity<'_>,
    url: &str,
    nonce: &str,
    payload: Option<&Value>,
) -> Result<Jws, AcmeError> {
    let mut protected = serde_json::Map::new();
    protected.insert("alg".to_string(), Value::String("ES256".to_string()));
    protected.insert("nonce".to_string(), Value::String(nonce.to_string()));
    protected.insert("url".to_string(), Value::String(url.to_string()));
    match identity {
        SigningIdentity::Jwk => {
            let jwk = Jwk::from_account_key(key)?;
            protected.insert("jwk".to_string(), serde_json::to_value(&jwk)?);
        }
        SigningIdentity::Kid(kid) => {
            protected.insert("kid".to_string(), Value::String(kid.to_string()));
        }
    }
    let protected_b64 = b64(&serde_json::to_vec(&Value::Object(protected))?);
    let payload_b64 = match payload {
        Some(p) => b64(&serde_json::to_vec(p)?),
        None => String::new(),
    };

    let signing_input = format!("{protected_b64}.{payload_b64}");
    let raw_sig = key.sign(signing_input.as_bytes())?;

    Ok(Jws {
        protected: protected_b64,
        payload: payload_b64,
        signature: b64(&raw_sig),
    })
}
