use thiserror::Error;

/// The protocol-level classification of an ACME failure.
///
/// These map directly onto the five outcomes the problem classifier can produce
/// (see [`crate::problem`]), plus two more that arise from plain HTTP status codes
/// or from unsupported operations.
#[derive(Error, Debug)]
pub enum AcmeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("again later: {0}")]
    AgainLater(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("acme server problem: {0}")]
    General(String),

    #[error("acme service response is missing {0} header")]
    MissingHeader(&'static str),

    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid key pair: {0}")]
    KeyRejected(#[from] ring::error::KeyRejected),

    #[error("crypto error: {0}")]
    Crypto(#[from] ring::error::Unspecified),

    #[error("certificate generation error: {0}")]
    Rcgen(#[from] rcgen::Error),

    #[error("certificate parsing error: {0}")]
    CertParse(String),

    #[error("tls configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AcmeError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        AcmeError::InvalidArgument(msg.into())
    }
}
