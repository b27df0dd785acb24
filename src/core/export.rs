//! Export and import of chat history.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::analytics::AnalyticsCounters;
use crate::core::session::ChatSession;
use crate::ui::html::{escape_html, format_message};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported export format '{0}'. Available formats: markdown, all, json, html, pdf")]
    UnknownFormat(String),

    #[error("PDF export is not implemented")]
    PdfNotImplemented,

    #[error("No chat to export")]
    NoChat,

    #[error("Failed to encode export: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to import data: {0}")]
    Import(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Current chat as Markdown.
    Markdown,
    /// Every chat as one Markdown document.
    All,
    Json,
    Html,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::All => "all",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "all" => Ok(ExportFormat::All),
            "json" => Ok(ExportFormat::Json),
            "html" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

/// A rendered export ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub contents: String,
}

impl ExportArtifact {
    /// Write into `dir`, returning the full path.
    pub fn write_to(&self, dir: &std::path::Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.contents).map_err(|source| ExportError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub personality: String,
    pub model: String,
    pub memory_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub chat_history: BTreeMap<String, ChatSession>,
    pub settings: ExportSettings,
    pub analytics: AnalyticsCounters,
    /// ISO-8601, UTC.
    pub export_date: String,
}

/// Settings accepted on import. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    pub personality: Option<String>,
    pub model: Option<String>,
    pub memory_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportData {
    #[serde(default)]
    pub chat_history: Option<BTreeMap<String, ChatSession>>,
    #[serde(default)]
    pub settings: Option<ImportSettings>,
}

pub fn parse_import(text: &str) -> Result<ImportData, ExportError> {
    serde_json::from_str(text).map_err(|e| ExportError::Import(e.to_string()))
}

pub fn read_import(path: &std::path::Path) -> Result<ImportData, ExportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ExportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_import(&text)
}

pub fn export_json(
    chat_history: &BTreeMap<String, ChatSession>,
    settings: ExportSettings,
    analytics: &AnalyticsCounters,
) -> Result<ExportArtifact, ExportError> {
    let now = Utc::now();
    let document = ExportDocument {
        chat_history: chat_history.clone(),
        settings,
        analytics: analytics.clone(),
        export_date: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    };

    Ok(ExportArtifact {
        file_name: format!("nexus-export-{}.json", now.timestamp_millis()),
        contents: serde_json::to_string_pretty(&document)?,
    })
}

fn local_time(millis: i64) -> Option<DateTime<Local>> {
    DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(&Local))
}

fn format_date(millis: i64) -> String {
    local_time(millis)
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn format_time(millis: i64) -> String {
    local_time(millis)
        .map(|date| date.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn role_heading(session: &ChatSession, index: usize) -> String {
    let message = &session.messages[index];
    format!(
        "**{}** ({})",
        message.role.display_label(),
        format_time(message.timestamp)
    )
}

/// File name derived from a chat title: ASCII alphanumerics kept, the rest
/// replaced by `-`, lowercased.
pub fn title_slug(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// One chat as Markdown.
pub fn export_markdown_chat(session: &ChatSession) -> ExportArtifact {
    let mut data = format!(
        "# {}\n\n**Date:** {}\n\n",
        session.title,
        format_date(session.timestamp)
    );
    for (index, message) in session.messages.iter().enumerate() {
        let _ = write!(data, "## {}\n\n{}\n\n", role_heading(session, index), message.text);
    }

    ExportArtifact {
        file_name: format!("{}.md", title_slug(&session.title)),
        contents: data,
    }
}

/// Every chat as one Markdown document, newest first.
pub fn export_markdown_all(chats: &[(&str, &ChatSession)]) -> ExportArtifact {
    let now = Utc::now();
    let mut data = String::from("# NEXUS AI Assistant Export\n\n");
    let _ = write!(
        data,
        "**Export Date:** {}\n**Total Conversations:** {}\n\n",
        format_date(now.timestamp_millis()),
        chats.len()
    );

    for (_, session) in chats {
        let _ = write!(
            data,
            "## {}\n\n**Date:** {}\n**Model:** {}\n**Personality:** {}\n\n",
            session.title,
            format_date(session.timestamp),
            non_empty_or_unknown(&session.model),
            non_empty_or_unknown(&session.personality),
        );
        for (index, message) in session.messages.iter().enumerate() {
            let _ = write!(data, "### {}\n\n{}\n\n", role_heading(session, index), message.text);
        }
        data.push_str("---\n\n");
    }

    ExportArtifact {
        file_name: format!("nexus-export-{}.md", now.timestamp_millis()),
        contents: data,
    }
}

fn non_empty_or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "Unknown"
    } else {
        value
    }
}

/// One chat as a standalone HTML page rendered through the message formatter.
pub fn export_html_chat(session: &ChatSession) -> ExportArtifact {
    let title = escape_html(&session.title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<p class=\"chat-date\">{}</p>\n",
        escape_html(&format_date(session.timestamp))
    );
    for message in &session.messages {
        let _ = write!(
            html,
            "<section class=\"message {}\">\n<header>{} ({})</header>\n{}\n</section>\n",
            message.role.as_str(),
            message.role.display_label(),
            escape_html(&format_time(message.timestamp)),
            format_message(&message.text)
        );
    }
    html.push_str("</body>\n</html>\n");

    ExportArtifact {
        file_name: format!("{}.html", title_slug(&session.title)),
        contents: html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{Message, Role};
    use crate::core::session::ChatHistory;

    fn sample_history() -> ChatHistory {
        let mut history = ChatHistory::new();
        let id = history.create_session("gpt4", "friendly");
        history
            .append_message(&id, Message::new(Role::User, "What is <Rust>?", "gpt4", "friendly"))
            .unwrap();
        history
            .append_message(
                &id,
                Message::new(Role::Bot, "A **systems** language.", "gpt4", "friendly"),
            )
            .unwrap();
        history
    }

    fn settings() -> ExportSettings {
        ExportSettings {
            personality: "friendly".to_string(),
            model: "gpt4".to_string(),
            memory_enabled: true,
        }
    }

    #[test]
    fn json_export_then_import_preserves_sessions() {
        let history = sample_history();
        let artifact =
            export_json(history.sessions(), settings(), &AnalyticsCounters::default()).unwrap();
        assert!(artifact.file_name.starts_with("nexus-export-"));
        assert!(artifact.file_name.ends_with(".json"));

        let imported = parse_import(&artifact.contents).unwrap();
        let chats = imported.chat_history.expect("history present");
        assert_eq!(&chats, history.sessions());

        let mut fresh = ChatHistory::new();
        assert_eq!(fresh.merge(chats), 1);
        assert_eq!(fresh.sessions(), history.sessions());

        let imported_settings = imported.settings.expect("settings present");
        assert_eq!(imported_settings.model.as_deref(), Some("gpt4"));
        assert_eq!(imported_settings.memory_enabled, Some(true));
    }

    #[test]
    fn json_export_date_is_iso_utc() {
        let artifact =
            export_json(&BTreeMap::new(), settings(), &AnalyticsCounters::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&artifact.contents).unwrap();
        let date = value["exportDate"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(date).is_ok());
        assert!(date.ends_with('Z'));
        assert_eq!(value["settings"]["memoryEnabled"], true);
    }

    #[test]
    fn import_accepts_partial_documents() {
        let data = parse_import(r#"{"settings":{"model":"claude"}}"#).unwrap();
        assert!(data.chat_history.is_none());
        assert_eq!(data.settings.unwrap().model.as_deref(), Some("claude"));

        assert!(matches!(parse_import("[1,2"), Err(ExportError::Import(_))));
    }

    #[test]
    fn markdown_chat_export_lists_messages_in_order() {
        let history = sample_history();
        let session = history.current().unwrap();
        let artifact = export_markdown_chat(session);

        assert_eq!(artifact.file_name, "what-is--rust--.md");
        assert!(artifact.contents.starts_with("# What is <Rust>?\n\n**Date:** "));
        let you = artifact.contents.find("## **You** (").unwrap();
        let nexus = artifact.contents.find("## **NEXUS** (").unwrap();
        assert!(you < nexus);
        assert!(artifact.contents.contains("A **systems** language.\n\n"));
    }

    #[test]
    fn markdown_full_export_counts_conversations() {
        let history = sample_history();
        let artifact = export_markdown_all(&history.list_newest_first());
        assert!(artifact.contents.contains("**Total Conversations:** 1\n"));
        assert!(artifact.contents.contains("**Model:** gpt4\n"));
        assert!(artifact.contents.contains("### **You** ("));
        assert!(artifact.contents.ends_with("---\n\n"));
    }

    #[test]
    fn html_export_escapes_and_renders() {
        let history = sample_history();
        let artifact = export_html_chat(history.current().unwrap());
        assert_eq!(artifact.file_name, "what-is--rust--.html");
        assert!(artifact.contents.contains("<h1>What is &lt;Rust&gt;?</h1>"));
        assert!(artifact.contents.contains("<strong>systems</strong>"));
        assert!(!artifact.contents.contains("<Rust>"));
    }

    #[test]
    fn export_format_parsing() {
        assert_eq!("MD".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert_eq!("all".parse::<ExportFormat>().unwrap(), ExportFormat::All);
        assert!(matches!(
            "docx".parse::<ExportFormat>(),
            Err(ExportError::UnknownFormat(name)) if name == "docx"
        ));
    }
}
