//! An async ACME (Automatic Certificate Management Environment) client core:
//! the signed-request session, the nonce and directory caches, and the
//! authorization/challenge state machine used to prove control of a domain
//! before a certificate is issued.
//!
//! This crate stops at "I have a signed certificate chain and private key
//! bytes" and at "here is the artifact store state needed to keep serving
//! challenges." It does not serve TLS traffic, does not schedule renewals,
//! and does not decide how a challenge response reaches the outside world —
//! those are a caller's concern, built on top of [`Session`], [`Authz`], and
//! [`store::ArtifactStore`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use acme_session::crypto::AccountKey;
//! use acme_session::session::{AcmeVersion, Session};
//! use acme_session::store::MemoryArtifactStore;
//!
//! # async fn run() -> Result<(), acme_session::error::AcmeError> {
//! let (account_key, _pkcs8) = AccountKey::generate()?;
//! let store = Arc::new(MemoryArtifactStore::new());
//! let mut session = Session::new(
//!     "https://acme-staging.example.org/directory",
//!     account_key,
//!     store,
//!     AcmeVersion::V2,
//! )?;
//! session.setup().await?;
//! # Ok(())
//! # }
//! ```

pub mod authz;
pub mod challenge;
pub mod crypto;
pub mod directory;
pub mod error;
pub mod jose;
pub mod nonce;
pub mod problem;
pub mod request;
pub mod session;
pub mod store;

pub use authz::{Authz, AuthzState};
pub use crypto::AccountKey;
pub use directory::Directory;
pub use error::AcmeError;
pub use session::{AcmeVersion, Session};
