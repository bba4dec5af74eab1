//! The ACME directory: the server's resolved endpoint manifest.

use serde::Deserialize;

use crate::error::AcmeError;

/// Directory endpoints as resolved from the server's directory document.
///
/// Immutable after a successful [`Session::setup`](crate::session::Session::setup).
#[derive(Debug, Clone)]
pub struct Directory {
    pub new_authz: String,
    pub new_cert: String,
    pub new_reg: String,
    pub revoke_cert: String,
}

/// Raw directory JSON, tolerant of missing fields (completeness is checked by
/// [`Directory::from_raw`], not by serde).
#[derive(Debug, Deserialize, Default)]
pub struct RawDirectory {
    #[serde(rename = "new-authz")]
    pub new_authz: Option<String>,
    #[serde(rename = "new-cert")]
    pub new_cert: Option<String>,
    #[serde(rename = "new-reg")]
    pub new_reg: Option<String>,
    #[serde(rename = "revoke-cert")]
    pub revoke_cert: Option<String>,
}

impl Directory {
    /// All four endpoints must be present; a partially-populated directory is
    /// rejected wholesale as `InvalidArgument`.
    pub fn from_raw(raw: RawDirectory) -> Result<Self, AcmeError> {
        match (raw.new_authz, raw.new_cert, raw.new_reg, raw.revoke_cert) {
            (Some(new_authz), Some(new_cert), Some(new_reg), Some(revoke_cert)) => Ok(Directory {
                new_authz,
                new_cert,
                new_reg,
                revoke_cert,
            }),
            _ => Err(AcmeError::invalid_argument(
                "acme directory is missing one or more of new-authz/new-cert/new-reg/revoke-cert",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_directory_succeeds() {
        let raw: RawDirectory = serde_json::from_value(serde_json::json!({
            "new-authz": "u1",
            "new-cert": "u2",
            "new-reg": "u3",
            "revoke-cert": "u4",
        }))
        .unwrap();
        let dir = Directory::from_raw(raw).unwrap();
        assert_eq!(dir.new_authz, "u1");
        assert_eq!(dir.revoke_cert, "u4");
    }

    #[test]
    fn missing_field_is_invalid_argument() {
        // S1: revoke-cert is missing.
        let raw: RawDirectory = serde_json::from_value(serde_json::json!({
            "new-authz": "u1",
            "new-cert": "u2",
            "new-reg": "u3",
        }))
        .unwrap();
        assert!(matches!(
            Directory::from_raw(raw),
            Err(AcmeError::InvalidArgument(_))
        ));
    }
}
