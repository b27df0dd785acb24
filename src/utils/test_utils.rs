#[cfg(test)]
use crate::core::app::{App, AppInit, Frontend, MessageView, NotifyKind, Suggestion};
#[cfg(test)]
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
#[cfg(test)]
use crate::core::code_runner::{CodeRunner, RunError, RunOutput};
#[cfg(test)]
use crate::core::config::Config;
#[cfg(test)]
use crate::core::message::{Message, Role};
#[cfg(test)]
use crate::core::store::{MemoryStore, Store};
#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use tokio::sync::mpsc;

/// Everything an [`App`] asked its frontend to do, in order.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum FrontendEvent {
    Notify(NotifyKind, String),
    Message {
        role: Role,
        text: String,
        persisted: bool,
        pinned: bool,
    },
    Partial(String),
    Notice(String),
    Suggestions(Vec<String>),
    Clear,
    Processing(bool),
}

#[cfg(test)]
#[derive(Clone, Default)]
pub struct RecordingFrontend {
    events: Arc<Mutex<Vec<FrontendEvent>>>,
}

#[cfg(test)]
impl RecordingFrontend {
    pub fn events(&self) -> Vec<FrontendEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn take(&self) -> Vec<FrontendEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn notifications(&self, kind: NotifyKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FrontendEvent::Notify(k, text) if k == kind => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FrontendEvent::Notice(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Texts of the messages shown since the last transcript clear.
    pub fn transcript(&self) -> Vec<(Role, String)> {
        let mut transcript = Vec::new();
        for event in self.events() {
            match event {
                FrontendEvent::Clear => transcript.clear(),
                FrontendEvent::Message { role, text, .. } => transcript.push((role, text)),
                _ => {}
            }
        }
        transcript
    }

    fn push(&self, event: FrontendEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
impl Frontend for RecordingFrontend {
    fn notify(&mut self, kind: NotifyKind, message: &str) {
        self.push(FrontendEvent::Notify(kind, message.to_string()));
    }

    fn show_message(&mut self, view: &MessageView<'_>) {
        self.push(FrontendEvent::Message {
            role: view.role,
            text: view.text.to_string(),
            persisted: view.persisted,
            pinned: view.pinned,
        });
    }

    fn show_partial(&mut self, text: &str, _html: &str) {
        self.push(FrontendEvent::Partial(text.to_string()));
    }

    fn show_notice(&mut self, text: &str) {
        self.push(FrontendEvent::Notice(text.to_string()));
    }

    fn show_suggestions(&mut self, suggestions: &[Suggestion]) {
        self.push(FrontendEvent::Suggestions(
            suggestions.iter().map(|s| s.command.clone()).collect(),
        ));
    }

    fn clear_transcript(&mut self) {
        self.push(FrontendEvent::Clear);
    }

    fn set_processing(&mut self, processing: bool) {
        self.push(FrontendEvent::Processing(processing));
    }
}

/// Code runner that echoes its input instead of spawning interpreters.
#[cfg(test)]
pub struct EchoRunner;

#[cfg(test)]
#[async_trait]
impl CodeRunner for EchoRunner {
    async fn run(&self, language: &str, code: &str) -> Result<RunOutput, RunError> {
        Ok(RunOutput {
            stdout: format!("{language}: {code}"),
            stderr: String::new(),
            success: true,
        })
    }
}

#[cfg(test)]
pub struct TestHarness {
    pub app: App,
    pub frontend: RecordingFrontend,
    pub store: MemoryStore,
    pub rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    pub service: ChatStreamService,
    pub export_dir: tempfile::TempDir,
}

#[cfg(test)]
impl TestHarness {
    /// Drain stream messages into the app until the current exchange ends.
    pub async fn drain_exchange(&mut self) {
        while self.app.is_processing() {
            let Some((message, stream_id)) = self.rx.recv().await else {
                break;
            };
            self.app.handle_stream_message(message, stream_id);
        }
    }
}

#[cfg(test)]
pub fn create_test_harness_with(config: Config, store: MemoryStore) -> TestHarness {
    let frontend = RecordingFrontend::default();
    let (service, rx) = ChatStreamService::new();
    let export_dir = tempfile::tempdir().unwrap();

    let mut app = App::new(AppInit {
        config,
        store: Store::new(store.clone()),
        frontend: Box::new(frontend.clone()),
        stream_service: service.clone(),
        runner: Arc::new(EchoRunner),
        provider: None,
        personality: None,
        disable_streaming: false,
        export_dir: export_dir.path().to_path_buf(),
    });
    app.env_lookup = |_| None;

    TestHarness {
        app,
        frontend,
        store,
        rx,
        service,
        export_dir,
    }
}

#[cfg(test)]
pub fn create_test_harness() -> TestHarness {
    create_test_harness_with(Config::default(), MemoryStore::new())
}

/// Config pointing every provider at `url` with a fixed key.
#[cfg(test)]
pub fn config_for_server(url: &str) -> Config {
    let mut config = Config::default();
    for id in ["gemini", "gpt4", "claude"] {
        let entry = config.providers.entry(id.to_string()).or_default();
        entry.url = Some(url.to_string());
        entry.api_key = Some("test-key".to_string());
    }
    config
}

#[cfg(test)]
pub fn create_test_message(role: Role, text: &str) -> Message {
    Message::new(role, text, "gemini", "professional")
}
