use serde::{Deserialize, Serialize};

use crate::actions::{Action, ErrorKind, Reply};
use crate::types::UserId;

/// One inbound call: the caller resolved by the transport plus the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<UserId>,
    #[serde(flatten)]
    pub action: Action,
}

impl Request {
    pub fn new(caller: Option<UserId>, action: Action) -> Self {
        Self { caller, action }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default() + "\n"
    }

    /// Decodes one JSON line. Malformed input becomes an `InvalidInput` reply
    /// the caller can send straight back.
    pub fn from_line(line: &str) -> Result<Self, Reply> {
        serde_json::from_str(line.trim())
            .map_err(|e| Reply::error(ErrorKind::InvalidInput, format!("malformed request: {e}")))
    }
}

impl Reply {
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default() + "\n"
    }

    pub fn from_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_carries_caller_and_action() {
        let request = Request::new(
            Some(4),
            Action::SendRequest {
                friend_id: Some(9),
            },
        );
        let line = request.to_line();
        assert!(line.ends_with('\n'));
        assert_eq!(Request::from_line(&line).unwrap(), request);
    }

    #[test]
    fn bad_id_type_is_invalid_input() {
        let reply = Request::from_line(r#"{"action":"send_request","friend_id":"nine"}"#)
            .unwrap_err();
        match reply {
            Reply::Error { kind, .. } => assert_eq!(kind, ErrorKind::InvalidInput),
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn unknown_action_is_invalid_input() {
        assert!(Request::from_line(r#"{"action":"delete_everything"}"#).is_err());
    }
}
