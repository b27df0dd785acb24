use serde::{Deserialize, Serialize};

/// Author of a stored transcript entry.
///
/// Only two roles are persisted. App notices (errors, greetings, help text)
/// are shown by the frontend but never enter a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_bot(self) -> bool {
        self == Role::Bot
    }

    /// Label used in transcripts and summaries.
    pub fn display_label(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Bot => "NEXUS",
        }
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            // "assistant" shows up in hand-edited imports
            "bot" | "assistant" => Ok(Role::Bot),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub personality: String,
}

impl Message {
    pub fn new(
        role: Role,
        text: impl Into<String>,
        model: impl Into<String>,
        personality: impl Into<String>,
    ) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: now_millis(),
            model: model.into(),
            personality: personality.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_bot(&self) -> bool {
        self.role.is_bot()
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_as_plain_strings() {
        let msg = Message {
            role: Role::Bot,
            text: "hi".into(),
            timestamp: 1,
            model: "gpt4".into(),
            personality: "friendly".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "bot");
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn assistant_alias_is_accepted_on_import() {
        assert_eq!(Role::try_from("assistant").unwrap(), Role::Bot);
        assert!(Role::try_from("system").is_err());
    }

    #[test]
    fn missing_snapshot_fields_default_to_empty() {
        let msg: Message =
            serde_json::from_str(r#"{"role":"user","text":"x","timestamp":5}"#).unwrap();
        assert!(msg.is_user());
        assert!(msg.model.is_empty());
        assert!(msg.personality.is_empty());
    }
}
