use serde::{Deserialize, Serialize};

use crate::recognition::domain::identity::Identity;

/// Transition announced to the presentation layer.
///
/// Serializes as `{"login": {"user": 2}}` / `{"logout": {"user": 2}}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionEvent {
    Login { user: Identity },
    Logout { user: Identity },
}

impl SessionEvent {
    pub fn user(&self) -> Identity {
        match self {
            SessionEvent::Login { user } | SessionEvent::Logout { user } => *user,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Login { .. } => "login",
            SessionEvent::Logout { .. } => "logout",
        }
    }

    /// One-line JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_wire_format() {
        let event = SessionEvent::Login {
            user: Identity::Known(2),
        };
        assert_eq!(event.to_json().unwrap(), r#"{"login":{"user":2}}"#);
    }

    #[test]
    fn test_logout_of_stranger_wire_format() {
        let event = SessionEvent::Logout {
            user: Identity::Unknown,
        };
        assert_eq!(event.to_json().unwrap(), r#"{"logout":{"user":-1}}"#);
    }

    #[test]
    fn test_parses_wire_format() {
        let event: SessionEvent = serde_json::from_str(r#"{"logout":{"user":3}}"#).unwrap();
        assert_eq!(event.kind(), "logout");
        assert_eq!(event.user(), Identity::Known(3));
    }
}
