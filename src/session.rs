//! The entry point for talking to an ACME server: owns the HTTP client,
//! account key, resolved directory, and nonce cache.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::crypto::AccountKey;
use crate::directory::{Directory, RawDirectory};
use crate::error::AcmeError;
use crate::jose::SigningIdentity;
use crate::nonce::NonceCache;
use crate::request::{self, Method, Request, ResponseBody};
use crate::store::ArtifactStore;

/// ACME has two incompatible payload/field conventions in the wild; the
/// session picks one up front and the request engine and challenge dispatcher
/// both read it off `Session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcmeVersion {
    V1,
    V2,
}

pub struct Session {
    server_url: String,
    short_name: String,
    account_key: AccountKey,
    directory: Option<Directory>,
    nonce: NonceCache,
    http: reqwest::Client,
    store: Arc<dyn ArtifactStore>,
    version: AcmeVersion,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("server_url", &self.server_url)
            .field("short_name", &self.short_name)
            .field("account_key", &self.account_key)
            .field("directory", &self.directory)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

fn short_name_for(url: &str) -> String {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or(url);
    let start = host.len().saturating_sub(16);
    host[start..].to_string()
}

fn build_http_client() -> Result<reqwest::Client, AcmeError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| rustls::pki_types::TrustAnchor {
        subject: ta.subject.clone(),
        subject_public_key_info: ta.subject_public_key_info.clone(),
        name_constraints: ta.name_constraints.clone(),
    }));
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    reqwest::Client::builder()
        .use_preconfigured_tls(tls_config)
        .build()
        .map_err(AcmeError::Http)
}

impl Session {
    pub fn new(
        server_url: impl Into<String>,
        account_key: AccountKey,
        store: Arc<dyn ArtifactStore>,
        version: AcmeVersion,
    ) -> Result<Self, AcmeError> {
        let server_url = server_url.into();
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(AcmeError::invalid_argument(format!(
                "server url {server_url} is not absolute"
            )));
        }
        let short_name = short_name_for(&server_url);
        let http = build_http_client()?;
        Ok(Session {
            server_url,
            short_name,
            account_key,
            directory: None,
            nonce: NonceCache::new(),
            http,
            store,
            version,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn version(&self) -> AcmeVersion {
        self.version
    }

    pub fn account_key(&self) -> &AccountKey {
        &self.account_key
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub fn directory(&self) -> Option<&Directory> {
        self.directory.as_ref()
    }

    /// Fetch and validate the server's directory document. Idempotent.
    pub async fn setup(&mut self) -> Result<(), AcmeError> {
        if self.directory.is_some() {
            return Ok(());
        }
        let server_url = self.server_url.clone();
        let raw: RawDirectory = self.get_json(&server_url).await?;
        let directory = Directory::from_raw(raw)?;
        log::debug!("{}: resolved acme directory", self.short_name);
        self.directory = Some(directory);
        Ok(())
    }

    /// Ensure `self.nonce` holds a value, harvesting one via HEAD if not.
    async fn ensure_nonce(&mut self) -> Result<String, AcmeError> {
        if let Some(n) = self.nonce.take() {
            return Ok(n);
        }
        self.setup().await?;
        let new_reg = self.directory.as_ref().unwrap().new_reg.clone();
        let req = Request::new(Method::Head, &new_reg);
        let raw = request::dispatch(&self.http, &req).await?;
        self.nonce.refresh(request::replay_nonce(&raw.headers).as_deref());
        self.nonce
            .take()
            .ok_or(AcmeError::MissingHeader("Replay-Nonce"))
    }

    /// Issue an unsigned GET, returning the tagged response body.
    pub async fn get(&mut self, url: &str) -> Result<ResponseBody, AcmeError> {
        let req = Request::new(Method::Get, url);
        let raw = request::dispatch(&self.http, &req).await?;
        self.nonce.refresh(request::replay_nonce(&raw.headers).as_deref());
        request::handle_response(raw)
    }

    /// GET and deserialize the body as `T`.
    pub async fn get_json<T: DeserializeOwned>(&mut self, url: &str) -> Result<T, AcmeError> {
        match self.get(url).await? {
            ResponseBody::Json(value) => Ok(serde_json::from_value(value)?),
            ResponseBody::Raw(_) => Err(AcmeError::InvalidArgument(format!(
                "expected a JSON body from {url}"
            ))),
        }
    }

    /// Issue a signed POST, running the full nonce-bootstrap/sign/dispatch
    /// sequence. Returns the tagged body plus the response headers (callers
    /// like [`crate::authz::Authz::register`] need `Location`).
    pub async fn post(
        &mut self,
        url: &str,
        payload: &Value,
    ) -> Result<(ResponseBody, HeaderMap), AcmeError> {
        self.setup().await?;
        let nonce = self.ensure_nonce().await?;

        let mut req = Request::new(Method::Post, url);
        req.protected_headers
            .insert("nonce".to_string(), Value::String(nonce));
        req.sign_with(Some(payload), &self.account_key, SigningIdentity::Jwk)?;

        let raw = request::dispatch(&self.http, &req).await?;
        self.nonce.refresh(request::replay_nonce(&raw.headers).as_deref());
        let headers = raw.headers.clone();
        let body = request::handle_response(raw)?;
        Ok((body, headers))
    }
}
