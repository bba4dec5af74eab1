//! The three challenge handlers: `http-01`, `tls-alpn-01`, `tls-sni-01`.
//!
//! Each computes (or reuses) the key authorization, materializes its
//! artifact(s) into the session's [`ArtifactStore`](crate::store::ArtifactStore),
//! and notifies the server only when something actually changed.

use crate::authz::Authz;
use crate::crypto;
use crate::error::AcmeError;
use crate::session::Session;
use crate::store::{Group, Kind};

use super::{notify_server, setup_key_authz, Cha};

/// `tls-sni-01`'s hashed challenge DNS names all live under this suffix.
pub const TLSSNI01_DNS_SUFFIX: &str = ".acme.invalid";

pub async fn http_01(cha: &mut Cha, authz: &mut Authz, session: &mut Session) -> Result<(), AcmeError> {
    let (key_authz, mut notify) = setup_key_authz(cha, session.account_key())?;
    let store = session.store().clone();

    let existing = store
        .load(Group::Challenges, &authz.domain, crate::store::HTTP01, Kind::Text)
        .await?;
    if existing.as_deref() != Some(key_authz.as_bytes()) {
        store
            .save(Group::Challenges, &authz.domain, crate::store::HTTP01, Kind::Text, key_authz.as_bytes())
            .await?;
        notify = true;
    }
    authz.dir = Some(authz.domain.clone());

    if notify {
        notify_server(session, cha, &key_authz).await?;
    }
    Ok(())
}

pub async fn tls_alpn_01(cha: &mut Cha, authz: &mut Authz, session: &mut Session) -> Result<(), AcmeError> {
    let (key_authz, mut notify) = setup_key_authz(cha, session.account_key())?;
    let store = session.store().clone();

    let existing_cert = store
        .load(Group::Challenges, &authz.domain, crate::store::TLS_ALPN_01_CERT, Kind::Cert)
        .await?;
    let reuse = existing_cert
        .as_deref()
        .map(|der| crypto::cert_covers_domain(der, &authz.domain).unwrap_or(false))
        .unwrap_or(false);

    if !reuse {
        let cert = crypto::cert_make_tls_alpn_01(&authz.domain, &key_authz)?;
        store
            .save(Group::Challenges, &authz.domain, crate::store::TLS_ALPN_01_PKEY, Kind::PKey, &cert.key_der)
            .await?;
        store
            .save(Group::Challenges, &authz.domain, crate::store::TLS_ALPN_01_CERT, Kind::Cert, &cert.cert_der)
            .await?;
        notify = true;
    }
    authz.dir = Some(authz.domain.clone());

    if notify {
        notify_server(session, cha, &key_authz).await?;
    }
    Ok(())
}

pub async fn tls_sni_01(cha: &mut Cha, authz: &mut Authz, session: &mut Session) -> Result<(), AcmeError> {
    let (key_authz, mut notify) = setup_key_authz(cha, session.account_key())?;
    let dhex = crypto::sha256_digest_hex(key_authz.as_bytes());
    if dhex.len() != 64 {
        return Err(AcmeError::General(format!(
            "tls-sni-01 digest has unexpected length {}",
            dhex.len()
        )));
    }
    let challenge_dns = format!("{}.{}{TLSSNI01_DNS_SUFFIX}", &dhex[0..32], &dhex[32..64]);

    let store = session.store().clone();
    let existing_cert = store
        .load(Group::Challenges, &challenge_dns, crate::store::TLS_SNI_01_CERT, Kind::Cert)
        .await?;
    let reuse = existing_cert
        .as_deref()
        .map(|der| crypto::cert_covers_domain(der, &challenge_dns).unwrap_or(false))
        .unwrap_or(false);

    if !reuse {
        let cert = crypto::cert_self_sign(&authz.domain, &[challenge_dns.clone()])?;
        store
            .save(Group::Challenges, &challenge_dns, crate::store::TLS_SNI_01_PKEY, Kind::PKey, &cert.key_der)
            .await?;
        store
            .save(Group::Challenges, &challenge_dns, crate::store::TLS_SNI_01_CERT, Kind::Cert, &cert.cert_der)
            .await?;
        notify = true;
    }
    authz.dir = Some(challenge_dns);

    if notify {
        notify_server(session, cha, &key_authz).await?;
    }
    Ok(())
}
