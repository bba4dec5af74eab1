//! Classifies ACME `urn:ietf:params:acme:error:*` problem types into [`AcmeError`] variants.
//!
//! The type string has its longest matching `urn:ietf:params:` or `urn:` prefix
//! stripped, then is matched case-insensitively against a fixed table.

use crate::error::AcmeError;

const PREFIXES: &[&str] = &["urn:ietf:params:", "urn:"];

struct ProblemEntry {
    suffix: &'static str,
    kind: fn(String) -> AcmeError,
}

const PROBLEMS: &[ProblemEntry] = &[
    ProblemEntry { suffix: "acme:error:badCSR", kind: AcmeError::InvalidArgument },
    ProblemEntry { suffix: "acme:error:badSignatureAlgorithm", kind: AcmeError::InvalidArgument },
    ProblemEntry { suffix: "acme:error:malformed", kind: AcmeError::InvalidArgument },
    ProblemEntry { suffix: "acme:error:badRevocationReason", kind: AcmeError::InvalidArgument },
    ProblemEntry { suffix: "acme:error:invalidContact", kind: AcmeError::BadRequest },
    ProblemEntry { suffix: "acme:error:rateLimited", kind: AcmeError::BadRequest },
    ProblemEntry { suffix: "acme:error:rejectedIdentifier", kind: AcmeError::BadRequest },
    ProblemEntry { suffix: "acme:error:unsupportedIdentifier", kind: AcmeError::BadRequest },
    ProblemEntry { suffix: "acme:error:unauthorized", kind: AcmeError::Forbidden },
    ProblemEntry { suffix: "acme:error:userActionRequired", kind: AcmeError::AgainLater },
    ProblemEntry { suffix: "acme:error:badNonce", kind: AcmeError::General },
    ProblemEntry { suffix: "acme:error:unsupportedContact", kind: AcmeError::General },
    ProblemEntry { suffix: "acme:error:serverInternal", kind: AcmeError::General },
    ProblemEntry { suffix: "acme:error:caa", kind: AcmeError::General },
    ProblemEntry { suffix: "acme:error:dns", kind: AcmeError::General },
    ProblemEntry { suffix: "acme:error:connection", kind: AcmeError::General },
    ProblemEntry { suffix: "acme:error:tls", kind: AcmeError::General },
    ProblemEntry { suffix: "acme:error:incorrectResponse", kind: AcmeError::General },
];

/// An RFC 7807 `application/problem+json` error document.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProblemDocument {
    #[serde(rename = "type")]
    pub ty: Option<String>,
    pub detail: Option<String>,
}

fn strip_prefix(ty: &str) -> &str {
    for prefix in PREFIXES {
        if let Some(stripped) = ty.strip_prefix(prefix) {
            return stripped;
        }
    }
    ty
}

/// Classify a problem `type` URI into an [`AcmeError`]. Unknown types default
/// to [`AcmeError::General`].
pub fn classify(ty: &str) -> AcmeError {
    let stripped = strip_prefix(ty);
    for entry in PROBLEMS {
        if entry.suffix.eq_ignore_ascii_case(stripped) {
            return (entry.kind)(ty.to_string());
        }
    }
    AcmeError::General(ty.to_string())
}

/// Classify a plain HTTP status code that did not come with a problem document.
pub fn classify_status(status: u16) -> AcmeError {
    match status {
        400 => AcmeError::InvalidArgument(format!("http status {status}")),
        403 => AcmeError::Forbidden(format!("http status {status}")),
        404 => AcmeError::NotFound(format!("http status {status}")),
        other => AcmeError::General(format!("http status {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_entries() {
        for ty in [
            "urn:ietf:params:acme:error:badCSR",
            "urn:ietf:params:acme:error:badSignatureAlgorithm",
            "urn:ietf:params:acme:error:malformed",
            "urn:ietf:params:acme:error:badRevocationReason",
        ] {
            assert!(matches!(classify(ty), AcmeError::InvalidArgument(_)), "{ty}");
        }
    }

    #[test]
    fn bad_request_entries() {
        for ty in [
            "urn:ietf:params:acme:error:invalidContact",
            "urn:ietf:params:acme:error:rateLimited",
            "urn:ietf:params:acme:error:rejectedIdentifier",
            "urn:ietf:params:acme:error:unsupportedIdentifier",
        ] {
            assert!(matches!(classify(ty), AcmeError::BadRequest(_)), "{ty}");
        }
    }

    #[test]
    fn forbidden_and_again_later() {
        assert!(matches!(
            classify("urn:ietf:params:acme:error:unauthorized"),
            AcmeError::Forbidden(_)
        ));
        assert!(matches!(
            classify("urn:ietf:params:acme:error:userActionRequired"),
            AcmeError::AgainLater(_)
        ));
    }

    #[test]
    fn general_entries_and_unknown() {
        for ty in [
            "urn:ietf:params:acme:error:badNonce",
            "urn:ietf:params:acme:error:unsupportedContact",
            "urn:ietf:params:acme:error:serverInternal",
            "urn:ietf:params:acme:error:caa",
            "urn:ietf:params:acme:error:dns",
            "urn:ietf:params:acme:error:connection",
            "urn:ietf:params:acme:error:tls",
            "urn:ietf:params:acme:error:incorrectResponse",
            "urn:ietf:params:acme:error:somethingWeveNeverHeardOf",
            "totally-unrelated-string",
        ] {
            assert!(matches!(classify(ty), AcmeError::General(_)), "{ty}");
        }
    }

    #[test]
    fn strips_urn_prefix_variants() {
        assert!(matches!(
            classify("urn:acme:error:unauthorized"),
            AcmeError::Forbidden(_)
        ));
        assert!(matches!(
            classify("acme:error:unauthorized"),
            AcmeError::Forbidden(_)
        ));
    }

    #[test]
    fn case_insensitive_match() {
        assert!(matches!(
            classify("urn:ietf:params:ACME:ERROR:UNAUTHORIZED"),
            AcmeError::Forbidden(_)
        ));
    }

    #[test]
    fn status_fallback() {
        assert!(matches!(classify_status(400), AcmeError::InvalidArgument(_)));
        assert!(matches!(classify_status(403), AcmeError::Forbidden(_)));
        assert!(matches!(classify_status(404), AcmeError::NotFound(_)));
        assert!(matches!(classify_status(500), AcmeError::General(_)));
    }
}
