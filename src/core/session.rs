//! Conversation sessions and the current-session pointer.
//!
//! A [`ChatHistory`] owns every stored [`ChatSession`] keyed by an opaque id of
//! the form `chat_<epoch-millis>`. Whenever a current session is set it is
//! guaranteed to exist in the mapping, and deleting the current session
//! immediately allocates a replacement.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::core::message::{now_millis, Message, Role};

pub const DEFAULT_TITLE: &str = "New Chat";
pub const TITLE_MAX_GRAPHEMES: usize = 30;
const TITLE_ELLIPSIS: &str = "...";

/// How many stored messages accompany an outbound request.
pub const CONTEXT_WINDOW: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub title: String,
    /// Creation time, epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub personality: String,
}

impl ChatSession {
    pub fn new(timestamp: i64, model: impl Into<String>, personality: impl Into<String>) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            timestamp,
            messages: Vec::new(),
            model: model.into(),
            personality: personality.into(),
        }
    }

    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Result of [`ChatHistory::append_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Stored,
    /// Memory is disabled; nothing was recorded.
    Skipped,
}

/// Result of [`ChatHistory::delete_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The current session was deleted and a fresh one took its place.
    ReplacedCurrent { new_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotFound(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotFound(id) => write!(f, "Chat '{id}' not found"),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, Clone)]
pub struct ChatHistory {
    sessions: BTreeMap<String, ChatSession>,
    current: Option<String>,
    memory_enabled: bool,
    last_issued: i64,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::from_sessions(BTreeMap::new())
    }

    pub fn from_sessions(sessions: BTreeMap<String, ChatSession>) -> Self {
        let last_issued = sessions
            .keys()
            .filter_map(|id| parse_id_millis(id))
            .max()
            .unwrap_or(0);
        Self {
            sessions,
            current: None,
            memory_enabled: true,
            last_issued,
        }
    }

    pub fn sessions(&self) -> &BTreeMap<String, ChatSession> {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn memory_enabled(&self) -> bool {
        self.memory_enabled
    }

    pub fn set_memory_enabled(&mut self, enabled: bool) {
        self.memory_enabled = enabled;
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn current(&self) -> Option<&ChatSession> {
        self.current.as_deref().and_then(|id| self.sessions.get(id))
    }

    /// Allocate a new empty session and make it current. Returns its id.
    pub fn create_session(&mut self, model: &str, personality: &str) -> String {
        let (id, created) = self.allocate_id();
        self.sessions
            .insert(id.clone(), ChatSession::new(created, model, personality));
        self.current = Some(id.clone());
        id
    }

    /// Make `id` current if no session is current yet.
    pub fn ensure_current(&mut self, model: &str, personality: &str) -> String {
        match self.current.clone() {
            Some(id) => id,
            None => self.create_session(model, personality),
        }
    }

    /// Switch the current pointer to `id` and return the session for replay.
    pub fn load_session(&mut self, id: &str) -> Result<&ChatSession, SessionError> {
        if !self.sessions.contains_key(id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        self.current = Some(id.to_string());
        self.sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    pub fn append_message(
        &mut self,
        id: &str,
        message: Message,
    ) -> Result<AppendOutcome, SessionError> {
        if !self.memory_enabled {
            return Ok(AppendOutcome::Skipped);
        }

        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        let is_user = message.role == Role::User;
        let title_source = is_user.then(|| message.text.clone());
        session.messages.push(message);

        if let Some(text) = title_source {
            if session.user_message_count() == 1 {
                session.title = derive_title(&text);
            }
        }

        Ok(AppendOutcome::Stored)
    }

    /// Remove a session. Deleting the current session creates a fresh one so
    /// a current session always exists afterwards.
    pub fn delete_session(
        &mut self,
        id: &str,
        model: &str,
        personality: &str,
    ) -> Result<DeleteOutcome, SessionError> {
        if self.sessions.remove(id).is_none() {
            return Err(SessionError::NotFound(id.to_string()));
        }

        if self.current.as_deref() == Some(id) {
            self.current = None;
            let new_id = self.create_session(model, personality);
            return Ok(DeleteOutcome::ReplacedCurrent { new_id });
        }

        Ok(DeleteOutcome::Deleted)
    }

    /// Last `limit` messages of the current session, oldest first.
    pub fn recent_window(&self, limit: usize) -> &[Message] {
        match self.current() {
            Some(session) => {
                let start = session.messages.len().saturating_sub(limit);
                &session.messages[start..]
            }
            None => &[],
        }
    }

    /// Sessions ordered newest-first by creation timestamp.
    pub fn list_newest_first(&self) -> Vec<(&str, &ChatSession)> {
        let mut entries: Vec<(&str, &ChatSession)> = self
            .sessions
            .iter()
            .map(|(id, session)| (id.as_str(), session))
            .collect();
        entries.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then(b.0.cmp(a.0)));
        entries
    }

    pub fn most_recent_id(&self) -> Option<String> {
        self.list_newest_first()
            .first()
            .map(|(id, _)| (*id).to_string())
    }

    /// Insert imported sessions; incoming ids overwrite existing ones.
    pub fn merge(&mut self, incoming: BTreeMap<String, ChatSession>) -> usize {
        let count = incoming.len();
        for (id, session) in incoming {
            self.note_issued_id(&id);
            self.sessions.insert(id, session);
        }
        count
    }

    fn allocate_id(&mut self) -> (String, i64) {
        let now = now_millis();
        let millis = if now > self.last_issued {
            now
        } else {
            self.last_issued + 1
        };
        self.last_issued = millis;
        (format!("chat_{millis}"), now)
    }

    fn note_issued_id(&mut self, id: &str) {
        if let Some(millis) = parse_id_millis(id) {
            self.last_issued = self.last_issued.max(millis);
        }
    }
}

fn parse_id_millis(id: &str) -> Option<i64> {
    id.strip_prefix("chat_")?.parse().ok()
}

/// Title derived from the first user message: at most 30 characters, with
/// `...` appended when the text was longer.
pub fn derive_title(text: &str) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(TITLE_MAX_GRAPHEMES).collect();
    if graphemes.next().is_some() {
        format!("{head}{TITLE_ELLIPSIS}")
    } else {
        head
    }
}
