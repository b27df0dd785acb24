//! The application context.
//!
//! [`App`] owns the chat history, the active provider and personality, the
//! persisted settings and the in-flight exchange. It is mutated only from the
//! chat loop; network work runs on spawned tasks that report back through the
//! [`ChatStreamService`] channel.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::analytics::AnalyticsCounters;
use crate::core::chat_stream::ChatStreamService;
use crate::core::code_runner::CodeRunner;
use crate::core::config::Config;
use crate::core::export::{
    export_html_chat, export_json, export_markdown_all, export_markdown_chat, ExportArtifact,
    ExportError, ExportFormat, ExportSettings, ImportData,
};
use crate::core::message::{Message, Role};
use crate::core::personality::{
    find_personality, personality_or_default, Personality, DEFAULT_PERSONALITY,
};
use crate::core::providers::{ExchangeError, ProviderKind};
use crate::core::session::{AppendOutcome, ChatHistory};
use crate::core::store::{BehaviorConfig, SettingsBlob, Store, Theme, UserProfile, DEFAULT_MODEL};
use crate::ui::html::format_message;

pub mod exchange;
pub mod frontend;
pub mod input;

pub use exchange::summary_prompt;
pub use frontend::{Frontend, MessageView, NotifyKind, Suggestion};
pub use input::{InputOutcome, PendingAction};

pub const APOLOGY: &str =
    "I apologize, but I'm experiencing technical difficulties. Please try again in a moment.";

/// Looks up a credential environment variable.
pub type EnvLookup = fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Everything needed to build an [`App`].
pub struct AppInit {
    pub config: Config,
    pub store: Store,
    pub frontend: Box<dyn Frontend>,
    pub stream_service: ChatStreamService,
    pub runner: Arc<dyn CodeRunner>,
    /// `--provider` from the command line.
    pub provider: Option<String>,
    /// `--personality` from the command line.
    pub personality: Option<String>,
    /// `--no-stream` forces single-shot responses.
    pub disable_streaming: bool,
    /// Where `/export` writes files.
    pub export_dir: PathBuf,
}

/// State of the single allowed in-flight exchange.
#[derive(Default)]
pub struct ExchangeState {
    pub client: reqwest::Client,
    pub is_processing: bool,
    pub current_stream_id: u64,
    pub cancel_token: Option<CancellationToken>,
    /// Text accumulated from the current exchange.
    pub reply: String,
    pub failed: bool,
    pub started_at: Option<Instant>,
}

pub struct App {
    pub history: ChatHistory,
    pub current_model: String,
    pub current_personality: String,
    pub behavior: BehaviorConfig,
    pub analytics: AnalyticsCounters,
    pub command_usage: BTreeMap<String, u64>,
    pub pinned: BTreeSet<String>,
    pub user_profile: UserProfile,
    pub theme: Theme,
    pub config: Config,
    pub exchange: ExchangeState,
    pub pending_confirmation: Option<PendingAction>,
    pub export_dir: PathBuf,
    pub env_lookup: EnvLookup,
    store: Store,
    frontend: Box<dyn Frontend>,
    stream_service: ChatStreamService,
    runner: Arc<dyn CodeRunner>,
}

/// Stable id for the message at `index` of chat `chat_id`.
pub fn pin_id(chat_id: &str, index: usize) -> String {
    format!("{chat_id}#{index}")
}

fn valid_model(id: &str) -> Option<String> {
    ProviderKind::from_id(id).map(|kind| kind.id().to_string())
}

fn valid_personality(id: &str) -> Option<String> {
    find_personality(id).map(|personality| personality.id.to_string())
}

impl App {
    pub fn new(init: AppInit) -> Self {
        let AppInit {
            config,
            store,
            frontend,
            stream_service,
            runner,
            provider,
            personality,
            disable_streaming,
            export_dir,
        } = init;

        let saved = store.load_saved_settings();
        let first_run = saved.is_none();
        let settings = saved.unwrap_or_default();

        // command line, then saved settings, then config.toml defaults
        let current_model = provider
            .as_deref()
            .and_then(valid_model)
            .or_else(|| (!first_run).then(|| valid_model(&settings.current_model)).flatten())
            .or_else(|| config.default_provider.as_deref().and_then(valid_model))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let current_personality = personality
            .as_deref()
            .and_then(valid_personality)
            .or_else(|| {
                (!first_run)
                    .then(|| valid_personality(&settings.current_personality))
                    .flatten()
            })
            .or_else(|| config.default_personality.as_deref().and_then(valid_personality))
            .unwrap_or_else(|| DEFAULT_PERSONALITY.to_string());

        let mut history = ChatHistory::from_sessions(settings.chat_history);
        history.set_memory_enabled(settings.memory_enabled);

        let pinned = store
            .load_pinned()
            .unwrap_or(settings.pinned_messages)
            .into_iter()
            .collect();
        let user_profile = store.load_user_profile().unwrap_or(settings.user_profile);
        let theme = store.load_theme();

        let mut behavior = settings.config;
        if disable_streaming {
            behavior.streaming_enabled = false;
        }
        debug!(
            max_retries = behavior.max_retries,
            retry_delay = behavior.retry_delay,
            "retry settings are stored but exchanges are never retried"
        );
        info!(
            model = %current_model,
            personality = %current_personality,
            chats = history.len(),
            "app initialized"
        );

        Self {
            history,
            current_model,
            current_personality,
            behavior,
            analytics: settings.analytics,
            command_usage: settings.command_usage,
            pinned,
            user_profile,
            theme,
            config,
            exchange: ExchangeState::default(),
            pending_confirmation: None,
            export_dir,
            env_lookup: process_env,
            store,
            frontend,
            stream_service,
            runner,
        }
    }

    /// Resume the most recent chat, or open a fresh one with a greeting.
    pub fn startup(&mut self) {
        match self.history.most_recent_id() {
            Some(id) => {
                if let Err(e) = self.history.load_session(&id) {
                    warn!("{e}");
                }
                self.replay_current();
            }
            None => {
                self.start_new_chat();
            }
        }
    }

    /// Cancel any in-flight exchange and persist everything.
    pub fn shutdown(&mut self) {
        if let Some(token) = self.exchange.cancel_token.take() {
            token.cancel();
        }
        self.exchange.is_processing = false;
        self.save();
        info!("app shut down");
    }

    pub fn personality(&self) -> &'static Personality {
        personality_or_default(&self.current_personality)
    }

    pub fn is_processing(&self) -> bool {
        self.exchange.is_processing
    }

    pub fn notify(&mut self, kind: NotifyKind, message: &str) {
        self.frontend.notify(kind, message);
    }

    pub fn notice(&mut self, text: &str) {
        self.frontend.show_notice(text);
    }

    pub fn show_suggestions(&mut self, suggestions: &[Suggestion]) {
        self.frontend.show_suggestions(suggestions);
    }

    /// Show an entry that is not stored in any session.
    pub fn show_display_only(&mut self, role: Role, text: &str) {
        let view = MessageView {
            role,
            text,
            html: format_message(text),
            timestamp: crate::core::message::now_millis(),
            persisted: false,
            pinned: false,
        };
        self.frontend.show_message(&view);
    }

    fn show_message(&mut self, message: &Message, persisted: bool) {
        let view = MessageView {
            role: message.role,
            text: &message.text,
            html: format_message(&message.text),
            timestamp: message.timestamp,
            persisted,
            pinned: false,
        };
        self.frontend.show_message(&view);
    }

    /// Clear the transcript and re-render the current chat in stored order.
    pub fn replay_current(&mut self) {
        self.frontend.clear_transcript();
        let Some(id) = self.history.current_id() else {
            return;
        };
        let Some(session) = self.history.get(id) else {
            return;
        };

        for (index, message) in session.messages.iter().enumerate() {
            let view = MessageView {
                role: message.role,
                text: &message.text,
                html: format_message(&message.text),
                timestamp: message.timestamp,
                persisted: true,
                pinned: self.pinned.contains(&pin_id(id, index)),
            };
            self.frontend.show_message(&view);
        }
    }

    pub fn show_greeting(&mut self) {
        let greeting = self.personality().greeting;
        self.show_display_only(Role::Bot, greeting);
    }

    /// Create an empty chat, make it current and greet.
    pub fn start_new_chat(&mut self) -> String {
        let id = self
            .history
            .create_session(&self.current_model, &self.current_personality);
        self.frontend.clear_transcript();
        self.show_greeting();
        self.save();
        id
    }

    /// Append to `chat_id`. Returns whether the message was stored.
    fn record_message(&mut self, chat_id: &str, message: Message) -> bool {
        match self.history.append_message(chat_id, message) {
            Ok(AppendOutcome::Stored) => true,
            Ok(AppendOutcome::Skipped) => false,
            Err(e) => {
                warn!("{e}");
                false
            }
        }
    }

    pub fn settings_snapshot(&self) -> SettingsBlob {
        SettingsBlob {
            chat_history: self.history.sessions().clone(),
            current_personality: self.current_personality.clone(),
            current_model: self.current_model.clone(),
            memory_enabled: self.history.memory_enabled(),
            config: self.behavior.clone(),
            analytics: self.analytics.clone(),
            command_usage: self.command_usage.clone(),
            pinned_messages: self.pinned.iter().cloned().collect(),
            user_profile: self.user_profile.clone(),
        }
    }

    /// Persist the settings blob. Failures are logged and reported, never fatal.
    pub fn save(&mut self) {
        let snapshot = self.settings_snapshot();
        if let Err(e) = self.store.save_settings(&snapshot) {
            warn!("{e}");
            self.frontend
                .notify(NotifyKind::Warning, "Failed to save settings");
        }
    }

    pub fn save_pinned(&mut self) {
        let pinned: Vec<String> = self.pinned.iter().cloned().collect();
        if let Err(e) = self.store.save_pinned(&pinned) {
            warn!("{e}");
        }
        self.save();
    }

    pub fn save_profile(&mut self) {
        if let Err(e) = self.store.save_user_profile(&self.user_profile) {
            warn!("{e}");
        }
        self.save();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(e) = self.store.save_theme(theme) {
            warn!("{e}");
        }
    }

    /// Switch provider. History is left untouched.
    pub fn set_model(&mut self, id: &str) -> Result<ProviderKind, ExchangeError> {
        let kind =
            ProviderKind::from_id(id).ok_or_else(|| ExchangeError::UnknownProvider(id.to_string()))?;
        self.current_model = kind.id().to_string();
        info!(model = %kind, "model switched");
        self.save();
        Ok(kind)
    }

    pub fn set_personality(&mut self, id: &str) -> Option<&'static Personality> {
        let personality = find_personality(id)?;
        self.current_personality = personality.id.to_string();
        info!(personality = personality.id, "personality switched");
        self.save();
        Some(personality)
    }

    pub fn set_memory_enabled(&mut self, enabled: bool) {
        self.history.set_memory_enabled(enabled);
        self.save();
    }

    /// Toggle the pin on the current chat's last message. Returns the id and
    /// whether it is now pinned.
    pub fn toggle_pin_last(&mut self) -> Option<(String, bool)> {
        let chat_id = self.history.current_id()?.to_string();
        let count = self.history.get(&chat_id)?.messages.len();
        let id = pin_id(&chat_id, count.checked_sub(1)?);

        let pinned = if self.pinned.remove(&id) {
            false
        } else {
            self.pinned.insert(id.clone());
            true
        };
        self.save_pinned();
        Some((id, pinned))
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            personality: self.current_personality.clone(),
            model: self.current_model.clone(),
            memory_enabled: self.history.memory_enabled(),
        }
    }

    /// Render the current chat, or everything, in `format`.
    pub fn render_export(&self, format: ExportFormat) -> Result<ExportArtifact, ExportError> {
        match format {
            ExportFormat::Markdown => self
                .history
                .current()
                .map(export_markdown_chat)
                .ok_or(ExportError::NoChat),
            ExportFormat::Html => self
                .history
                .current()
                .map(export_html_chat)
                .ok_or(ExportError::NoChat),
            ExportFormat::All => Ok(export_markdown_all(&self.history.list_newest_first())),
            ExportFormat::Json => {
                export_json(self.history.sessions(), self.export_settings(), &self.analytics)
            }
            ExportFormat::Pdf => Err(ExportError::PdfNotImplemented),
        }
    }

    /// Merge imported chats, then apply any imported settings. Returns the
    /// number of chats merged.
    pub fn apply_import(&mut self, data: ImportData) -> usize {
        let merged = data
            .chat_history
            .map(|chats| self.history.merge(chats))
            .unwrap_or(0);

        if let Some(settings) = data.settings {
            if let Some(personality) = settings.personality.as_deref() {
                if self.set_personality(personality).is_none() {
                    warn!("ignoring unknown imported personality '{personality}'");
                }
            }
            if let Some(model) = settings.model.as_deref() {
                if let Err(e) = self.set_model(model) {
                    warn!("ignoring imported model: {e}");
                }
            }
            if let Some(enabled) = settings.memory_enabled {
                self.history.set_memory_enabled(enabled);
            }
        }

        self.save();
        merged
    }

    /// Run a snippet through the code runner and show its output.
    pub async fn run_code(&mut self, language: &str, code: &str) {
        let runner = Arc::clone(&self.runner);
        self.notify(NotifyKind::Info, &format!("Running {language} code..."));

        match runner.run(language, code).await {
            Ok(output) => {
                let text = format!("```\n{}\n```", output.display());
                self.show_display_only(Role::Bot, &text);
                if !output.success {
                    self.notify(NotifyKind::Warning, "Code exited with an error");
                }
            }
            Err(e) => self.notify(NotifyKind::Error, &format!("Error: {e}")),
        }
    }
}
