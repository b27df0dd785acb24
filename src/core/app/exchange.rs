use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{App, InputOutcome, NotifyKind, APOLOGY};
use crate::core::chat_stream::{ExchangeParams, StreamMessage};
use crate::core::message::{Message, Role};
use crate::core::providers::{build_request, HttpRequest, ProviderConfig, RequestOptions};
use crate::core::session::CONTEXT_WINDOW;
use crate::ui::html::format_message;

/// Prompt asking the provider to summarize `messages`.
pub fn summary_prompt(messages: &[Message]) -> String {
    let conversation = messages
        .iter()
        .map(|message| {
            let speaker = match message.role {
                Role::User => "User",
                Role::Bot => "NEXUS",
            };
            format!("{speaker}: {}", message.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Please provide a concise summary of this conversation:\n\n{conversation}\n\nSummary:"
    )
}

impl App {
    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.exchange.current_stream_id == stream_id
    }

    /// Resolve the active provider and build the outbound request. Failures
    /// are reported to the user and yield `None`.
    fn prepare_request(&mut self, history: &[Message], outbound: &str) -> Option<HttpRequest> {
        let built = ProviderConfig::resolve_with_env(&self.config, &self.current_model, self.env_lookup)
            .and_then(|provider| {
                let options = RequestOptions {
                    temperature: self.behavior.temperature,
                    max_tokens: self.behavior.max_tokens,
                    stream: self.behavior.streaming_enabled,
                };
                build_request(
                    &provider,
                    self.personality().system_prompt,
                    history,
                    outbound,
                    options,
                )
            });

        match built {
            Ok(request) => Some(request),
            Err(e) => {
                self.notify(NotifyKind::Error, &e.to_string());
                None
            }
        }
    }

    /// Record a user message and start the exchange for it.
    pub(crate) fn send_message(&mut self, text: &str) -> InputOutcome {
        if self.exchange.is_processing {
            debug!("exchange in flight; message ignored");
            return InputOutcome::Busy;
        }

        // the window is taken before the new message is appended
        let window = self.history.recent_window(CONTEXT_WINDOW).to_vec();
        let Some(request) = self.prepare_request(&window, text) else {
            return InputOutcome::Handled;
        };
        let chat_id = self
            .history
            .ensure_current(&self.current_model, &self.current_personality);

        let message = Message::new(
            Role::User,
            text,
            &self.current_model,
            &self.current_personality,
        );
        let persisted = self.record_message(&chat_id, message.clone());
        self.show_message(&message, persisted);
        self.analytics.record_sent(text);

        let stream_id = self.start_exchange(request);
        self.save();
        InputOutcome::ExchangeStarted(stream_id)
    }

    /// Ask the provider for a summary of the current chat.
    pub fn summarize_current(&mut self) -> Option<u64> {
        if self.exchange.is_processing {
            debug!("exchange in flight; summary ignored");
            return None;
        }

        let prompt = match self.history.current() {
            Some(session) if !session.messages.is_empty() => summary_prompt(&session.messages),
            _ => {
                self.notify(NotifyKind::Error, "No chat to summarize");
                return None;
            }
        };

        let request = self.prepare_request(&[], &prompt)?;
        self.show_display_only(Role::User, "Summarize this chat");
        Some(self.start_exchange(request))
    }

    fn start_exchange(&mut self, request: HttpRequest) -> u64 {
        self.exchange.current_stream_id += 1;
        let stream_id = self.exchange.current_stream_id;
        let cancel_token = CancellationToken::new();

        self.exchange.cancel_token = Some(cancel_token.clone());
        self.exchange.is_processing = true;
        self.exchange.reply.clear();
        self.exchange.failed = false;
        self.exchange.started_at = Some(Instant::now());
        self.frontend.set_processing(true);

        info!(stream_id, provider = %request.kind, stream = request.stream, "exchange started");
        self.stream_service.spawn_exchange(ExchangeParams {
            client: self.exchange.client.clone(),
            request,
            cancel_token,
            stream_id,
        });
        stream_id
    }

    /// Apply one message from the exchange task. Messages from superseded
    /// exchanges are dropped.
    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) {
        if !self.is_current_stream(stream_id) || !self.exchange.is_processing {
            debug!(stream_id, "dropping message from stale exchange");
            return;
        }

        match message {
            StreamMessage::Chunk(delta) => {
                if self.exchange.failed {
                    return;
                }
                self.exchange.reply.push_str(&delta);
                let html = format_message(&self.exchange.reply);
                self.frontend.show_partial(&self.exchange.reply, &html);
            }
            StreamMessage::Error(text) => {
                if !self.exchange.failed {
                    self.exchange.failed = true;
                    self.notify(NotifyKind::Error, &text);
                }
            }
            StreamMessage::End => self.finish_exchange(),
        }
    }

    fn finish_exchange(&mut self) {
        let reply = std::mem::take(&mut self.exchange.reply);
        let failed = std::mem::take(&mut self.exchange.failed);
        let started_at = self.exchange.started_at.take();
        self.exchange.is_processing = false;
        self.exchange.cancel_token = None;
        self.frontend.set_processing(false);

        if failed {
            // partial text from a failed exchange is never committed
            self.show_display_only(Role::Bot, APOLOGY);
            return;
        }

        if reply.trim().is_empty() {
            self.notify(NotifyKind::Error, "Invalid response format");
            self.show_display_only(Role::Bot, APOLOGY);
            return;
        }

        if let Some(started_at) = started_at {
            let elapsed = started_at.elapsed().as_millis() as u64;
            self.analytics.record_response_time(elapsed);
            debug!(elapsed_ms = elapsed, "exchange completed");
        }

        let chat_id = self
            .history
            .ensure_current(&self.current_model, &self.current_personality);
        let message = Message::new(
            Role::Bot,
            reply,
            &self.current_model,
            &self.current_personality,
        );
        let persisted = self.record_message(&chat_id, message.clone());
        self.show_message(&message, persisted);
        self.save();
    }
}
