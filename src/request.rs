//! Constructs, signs, sends, and classifies the response of a single ACME
//! HTTP exchange.

use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::crypto::AccountKey;
use crate::error::AcmeError;
use crate::jose::{self, Jws, SigningIdentity};
use crate::problem::{self, ProblemDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
}

/// Resolve a method name the way a wire-level dispatcher would, so that an
/// unrecognized method classifies as `NotImplemented` rather than panicking.
/// `Method` itself is exhaustive, so production code never needs this path;
/// it exists to exercise that classification directly.
pub fn method_from_str(s: &str) -> Result<Method, AcmeError> {
    match s.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::Get),
        "HEAD" => Ok(Method::Head),
        "POST" => Ok(Method::Post),
        other => Err(AcmeError::NotImplemented(format!("http method {other}"))),
    }
}

/// One outbound ACME call: method, target, and (for POST) the signed body.
pub struct Request {
    pub method: Method,
    pub url: String,
    pub protected_headers: serde_json::Map<String, Value>,
    pub signed_body: Option<Jws>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
            protected_headers: serde_json::Map::new(),
            signed_body: None,
        }
    }

    /// Serialize `payload`, sign it per the installed protected headers
    /// (`nonce` must already be set), and store the result as `signed_body`.
    pub fn sign_with(
        &mut self,
        payload: Option<&Value>,
        key: &AccountKey,
        identity: SigningIdentity<'_>,
    ) -> Result<(), AcmeError> {
        let nonce = self
            .protected_headers
            .get("nonce")
            .and_then(Value::as_str)
            .ok_or(AcmeError::MissingHeader("nonce"))?
            .to_string();
        let jws = jose::sign(key, identity, &self.url, &nonce, payload)?;
        self.signed_body = Some(jws);
        Ok(())
    }
}

/// The body of a successful (2xx) response, tagged by how it parsed.
pub enum ResponseBody {
    Json(Value),
    Raw(Vec<u8>),
}

pub struct RawResponse {
    pub status: reqwest::StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Send `req` over `client`, producing the raw status/headers/body. Does not
/// interpret the result; that is `handle_response`'s job.
pub async fn dispatch(client: &reqwest::Client, req: &Request) -> Result<RawResponse, AcmeError> {
    let builder = match req.method {
        Method::Get => client.get(&req.url),
        Method::Head => client.head(&req.url),
        Method::Post => {
            let jws = req
                .signed_body
                .as_ref()
                .ok_or_else(|| AcmeError::InvalidArgument("POST without a signed body".into()))?;
            let body = serde_json::to_string(jws)?;
            client
                .post(&req.url)
                .header("Content-Type", "application/jose+json")
                .body(body)
        }
    };
    let response = builder.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok(RawResponse { status, headers, body })
}

/// Extract `Replay-Nonce` from a response's headers, if present.
pub fn replay_nonce(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Replay-Nonce")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Interpret a completed HTTP exchange per the success/problem split: 2xx
/// bodies are parsed as JSON when possible and fall back to raw bytes;
/// anything else is classified into an [`AcmeError`].
pub fn handle_response(raw: RawResponse) -> Result<ResponseBody, AcmeError> {
    if raw.status.is_success() {
        if raw.body.is_empty() {
            return Ok(ResponseBody::Raw(raw.body));
        }
        let is_json = raw
            .headers
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);
        if is_json {
            let value: Value = serde_json::from_slice(&raw.body)?;
            return Ok(ResponseBody::Json(value));
        }
        return Ok(ResponseBody::Raw(raw.body));
    }
    Err(inspect_problem(&raw))
}

/// Classify a failed response into an [`AcmeError`], logging `type`/`detail`
/// when an RFC 7807 problem document is present.
fn inspect_problem(raw: &RawResponse) -> AcmeError {
    let is_problem_json = raw
        .headers
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains("application/problem+json"))
        .unwrap_or(false);

    if is_problem_json {
        if let Ok(doc) = serde_json::from_slice::<ProblemDocument>(&raw.body) {
            if let Some(ty) = &doc.ty {
                log::warn!(
                    "acme server returned problem type={ty} detail={}",
                    doc.detail.as_deref().unwrap_or("")
                );
                return problem::classify(ty);
            }
        }
    }
    problem::classify_status(raw.status.as_u16())
}
