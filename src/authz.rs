//! An authorization: one domain's proof-of-control bundle, plus its
//! challenge state machine transitions.

use serde_json::Value;

use crate::error::AcmeError;
use crate::request::ResponseBody;
use crate::session::{AcmeVersion, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzState {
    Unknown,
    Pending,
    Valid,
    Invalid,
}

impl AuthzState {
    fn from_status(status: &str) -> Option<Self> {
        match status {
            "pending" => Some(AuthzState::Pending),
            "valid" => Some(AuthzState::Valid),
            "invalid" => Some(AuthzState::Invalid),
            _ => None,
        }
    }

    fn to_code(self) -> i64 {
        match self {
            AuthzState::Unknown => 0,
            AuthzState::Pending => 1,
            AuthzState::Valid => 2,
            AuthzState::Invalid => 3,
        }
    }

    fn from_code(code: i64) -> Self {
        match code {
            1 => AuthzState::Pending,
            2 => AuthzState::Valid,
            3 => AuthzState::Invalid,
            _ => AuthzState::Unknown,
        }
    }
}

/// One domain's authorization: the server resource, the caller's local view
/// of its state, and the challenge directory the active handler is using.
#[derive(Debug, Clone)]
pub struct Authz {
    pub domain: String,
    pub url: String,
    pub resource: Value,
    pub state: AuthzState,
    pub dir: Option<String>,
}

impl Authz {
    pub fn new(domain: impl Into<String>) -> Self {
        Authz {
            domain: domain.into(),
            url: String::new(),
            resource: Value::Null,
            state: AuthzState::Unknown,
            dir: None,
        }
    }

    /// POST `new-authz` for `domain`, reading the created resource's
    /// `Location` header and body.
    pub async fn register(session: &mut Session, domain: &str) -> Result<Authz, AcmeError> {
        let new_authz = session
            .directory()
            .ok_or_else(|| AcmeError::InvalidArgument("session has no resolved directory".into()))?
            .new_authz
            .clone();

        let mut payload = serde_json::json!({
            "identifier": { "type": "dns", "value": domain },
        });
        if session.version() == AcmeVersion::V1 {
            payload["resource"] = Value::String("new-authz".to_string());
        }

        let (body, headers) = session.post(&new_authz, &payload).await?;
        let location = headers
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .ok_or(AcmeError::MissingHeader("Location"))?
            .to_string();

        let resource = match body {
            ResponseBody::Json(v) => v,
            ResponseBody::Raw(_) => {
                return Err(AcmeError::InvalidArgument(
                    "new-authz response was not JSON".into(),
                ))
            }
        };

        log::debug!("{}: registered authz for {domain} at {location}", session.short_name());
        Ok(Authz {
            domain: domain.to_string(),
            url: location,
            resource,
            state: AuthzState::Unknown,
            dir: None,
        })
    }

    /// Refresh `state`/`domain`/`resource` from the server's current view.
    pub async fn update(&mut self, session: &mut Session) -> Result<(), AcmeError> {
        let resource: Value = session.get_json(&self.url).await?;

        if let Some(value) = resource.get("identifier").and_then(|i| i.get("value")).and_then(Value::as_str) {
            self.domain = value.to_string();
        }

        let status = resource.get("status").and_then(Value::as_str);
        let state = match status.and_then(AuthzState::from_status) {
            Some(state) => state,
            None => {
                log::error!(
                    "{}: authz {} has unrecognized status {:?}",
                    session.short_name(),
                    self.url,
                    status
                );
                return Err(AcmeError::InvalidArgument(format!(
                    "authz response has unrecognized status {status:?}"
                )));
            }
        };
        match state {
            AuthzState::Pending => log::debug!("{}: authz {} pending", session.short_name(), self.url),
            AuthzState::Valid => log::debug!("{}: authz {} valid", session.short_name(), self.url),
            AuthzState::Invalid => log::warn!("{}: authz {} invalid", session.short_name(), self.url),
            AuthzState::Unknown => unreachable!("from_status never yields Unknown"),
        }
        self.state = state;
        self.resource = resource;
        Ok(())
    }

    /// POST `{"status":"deactivated"}` to the authz URL.
    pub async fn deactivate(&mut self, session: &mut Session) -> Result<(), AcmeError> {
        let payload = serde_json::json!({ "status": "deactivated" });
        session.post(&self.url, &payload).await?;
        log::debug!("{}: deactivated authz {}", session.short_name(), self.url);
        Ok(())
    }
}

/// On-disk authz record: `domain`, `location`, `dir`, integer `state` code.
pub fn to_json(authz: &Authz) -> Value {
    serde_json::json!({
        "domain": authz.domain,
        "location": authz.url,
        "dir": authz.dir,
        "state": authz.state.to_code(),
    })
}

pub fn from_json(value: &Value) -> Result<Authz, AcmeError> {
    let domain = value
        .get("domain")
        .and_then(Value::as_str)
        .ok_or_else(|| AcmeError::InvalidArgument("authz record missing domain".into()))?
        .to_string();
    let url = value
        .get("location")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let dir = value.get("dir").and_then(Value::as_str).map(str::to_string);
    let state = value
        .get("state")
        .and_then(Value::as_i64)
        .map(AuthzState::from_code)
        .unwrap_or(AuthzState::Unknown);
    Ok(Authz {
        domain,
        url,
        resource: Value::Null,
        state,
        dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_preserves_domain_url_dir_state() {
        let mut authz = Authz::new("example.com");
        authz.url = "https://acme.test/authz/1".to_string();
        authz.dir = Some("example.com".to_string());
        authz.state = AuthzState::Valid;

        let json = to_json(&authz);
        let restored = from_json(&json).unwrap();

        assert_eq!(restored.domain, authz.domain);
        assert_eq!(restored.url, authz.url);
        assert_eq!(restored.dir, authz.dir);
        assert_eq!(restored.state, authz.state);
    }

    #[test]
    fn from_json_defaults_missing_state_to_unknown() {
        let json = serde_json::json!({ "domain": "example.com", "location": "u" });
        let authz = from_json(&json).unwrap();
        assert_eq!(authz.state, AuthzState::Unknown);
        assert_eq!(authz.dir, None);
    }

    #[test]
    fn from_json_requires_domain() {
        let json = serde_json::json!({ "location": "u" });
        assert!(matches!(from_json(&json), Err(AcmeError::InvalidArgument(_))));
    }
}
