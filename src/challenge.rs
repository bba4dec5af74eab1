//! Selects a challenge from those a server offers and drives its handler.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::authz::Authz;
use crate::error::AcmeError;
use crate::jose;
use crate::session::{AcmeVersion, Session};

pub mod handlers;

/// One selected challenge: its position in the server's list, type, callback
/// URI, token, and (once computed) key authorization.
#[derive(Debug, Clone)]
pub struct Cha {
    pub index: usize,
    pub typ: String,
    pub uri: String,
    pub token: String,
    pub key_authz: Option<String>,
}

/// Pick the first-preferred challenge type that the server actually offers.
///
/// Scans `preferences` in order; for each, scans `offered` for a
/// case-insensitive type match. Independent of the order challenges appear
/// in `offered`.
pub fn select(preferences: &[String], offered: &[Value]) -> Result<Cha, AcmeError> {
    for pref in preferences {
        for (index, candidate) in offered.iter().enumerate() {
            let ty = candidate.get("type").and_then(Value::as_str).unwrap_or("");
            if ty.eq_ignore_ascii_case(pref) {
                let uri = candidate
                    .get("uri")
                    .or_else(|| candidate.get("url"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let token = candidate
                    .get("token")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return Ok(Cha {
                    index,
                    typ: ty.to_string(),
                    uri,
                    token,
                    key_authz: None,
                });
            }
        }
    }
    let offered_types: Vec<&str> = offered
        .iter()
        .filter_map(|c| c.get("type").and_then(Value::as_str))
        .collect();
    log::warn!("no offered challenge matches preferences {preferences:?}; offered {offered_types:?}");
    Err(AcmeError::InvalidArgument(format!(
        "no offered challenge matches preferences {preferences:?}; offered {offered_types:?}"
    )))
}

/// Compute (or reuse) `cha`'s key authorization. Returns the value plus
/// whether it changed, since a change means the server must be re-notified.
pub fn setup_key_authz(
    cha: &mut Cha,
    account_key: &crate::crypto::AccountKey,
) -> Result<(String, bool), AcmeError> {
    let candidate = jose::key_authorization(account_key, &cha.token)?;
    let changed = cha.key_authz.as_deref() != Some(candidate.as_str());
    if changed {
        cha.key_authz = Some(candidate.clone());
    }
    Ok((candidate, changed))
}

async fn notify_server(session: &mut Session, cha: &Cha, key_authz: &str) -> Result<(), AcmeError> {
    let payload = match session.version() {
        AcmeVersion::V1 => serde_json::json!({
            "resource": "challenge",
            "keyAuthorization": key_authz,
        }),
        AcmeVersion::V2 => serde_json::json!({ "keyAuthorization": key_authz }),
    };
    session.post(&cha.uri, &payload).await?;
    log::debug!("{}: notified server for challenge {}", session.short_name(), cha.uri);
    Ok(())
}

type Handler =
    for<'a> fn(&'a mut Cha, &'a mut Authz, &'a mut Session) -> Pin<Box<dyn Future<Output = Result<(), AcmeError>> + Send + 'a>>;

fn handler_for(typ: &str) -> Option<Handler> {
    match typ.to_ascii_lowercase().as_str() {
        "http-01" => Some(|cha, authz, session| Box::pin(handlers::http_01(cha, authz, session))),
        "tls-alpn-01" => Some(|cha, authz, session| Box::pin(handlers::tls_alpn_01(cha, authz, session))),
        "tls-sni-01" => Some(|cha, authz, session| Box::pin(handlers::tls_sni_01(cha, authz, session))),
        _ => None,
    }
}

/// Select a challenge from `authz`'s offered list (in `preferences` order)
/// and invoke its handler.
pub async fn respond(
    session: &mut Session,
    authz: &mut Authz,
    preferences: &[String],
) -> Result<(), AcmeError> {
    let offered = authz
        .resource
        .get("challenges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut cha = select(preferences, &offered)?;
    let handler = handler_for(&cha.typ)
        .ok_or_else(|| AcmeError::NotImplemented(format!("no handler for challenge type {}", cha.typ)))?;
    handler(&mut cha, authz, session).await
}
