use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::providers::{
    extract_error_summary, format_api_error, parse_reply, reply_from_value, ExchangeError,
    HttpRequest, ProviderKind,
};

#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// One framed server-sent-event record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseEvent {
    Data(String),
    Done,
}

/// Line framing for a `text/event-stream` body.
///
/// Bytes are buffered until a newline arrives, so a record split across
/// network chunks is decoded once complete. Only `data:` lines produce events.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => events.extend(decode_line(line)),
                Err(e) => warn!("Invalid UTF-8 in stream: {e}"),
            }
            self.buffer.drain(..=newline_pos);
        }

        events
    }

    /// Decode whatever is left once the body ends without a trailing newline.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        match std::str::from_utf8(&rest) {
            Ok(line) => decode_line(line).into_iter().collect(),
            Err(e) => {
                warn!("Invalid UTF-8 in stream: {e}");
                Vec::new()
            }
        }
    }
}

fn decode_line(line: &str) -> Option<SseEvent> {
    let payload = line.trim().strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(payload.to_string()))
}

/// What a single stream record contributes to the reply.
#[derive(Debug, PartialEq)]
enum RecordOutcome {
    Delta(String),
    Skip,
    Failure(ExchangeError),
}

fn decode_record(kind: ProviderKind, payload: &str) -> RecordOutcome {
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(e) => {
            debug!("Skipping malformed stream record: {e}");
            return RecordOutcome::Skip;
        }
    };

    if value.get("error").is_some() {
        let summary = extract_error_summary(&value).unwrap_or_else(|| payload.trim().to_string());
        return RecordOutcome::Failure(ExchangeError::Provider(format!("API Error: {summary}")));
    }

    let delta = reply_from_value(kind, value);
    if delta.is_empty() {
        RecordOutcome::Skip
    } else {
        RecordOutcome::Delta(delta)
    }
}

pub struct ExchangeParams {
    pub client: reqwest::Client,
    pub request: HttpRequest,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

/// Runs provider exchanges on background tasks and reports back over a
/// channel tagged with the exchange's stream id.
///
/// Every exchange ends with exactly one [`StreamMessage::End`], preceded by at
/// most one [`StreamMessage::Error`]. A cancelled exchange sends nothing more.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_exchange(&self, params: ExchangeParams) -> tokio::task::JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let ExchangeParams {
                client,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = run_exchange(&client, request, &tx, stream_id) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "exchange cancelled");
                }
            }
        })
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id));
    }
}

async fn run_exchange(
    client: &reqwest::Client,
    request: HttpRequest,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    let send = |message: StreamMessage| {
        let _ = tx.send((message, stream_id));
    };
    let fail = |error: ExchangeError| {
        warn!(stream_id, "exchange failed: {error}");
        send(StreamMessage::Error(error.to_string()));
        send(StreamMessage::End);
    };

    let HttpRequest {
        kind,
        url,
        headers,
        body,
        stream,
    } = request;

    debug!(stream_id, provider = %kind, stream, "sending request");
    let mut http_request = client.post(&url);
    for (name, value) in headers {
        http_request = http_request.header(name, value);
    }

    let response = match http_request.json(&body).send().await {
        Ok(response) => response,
        Err(e) => return fail(ExchangeError::Transport(e.to_string())),
    };

    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return fail(ExchangeError::Http {
            status: status.as_u16(),
            body: format_api_error(&error_text),
        });
    }

    if !stream {
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return fail(ExchangeError::Transport(e.to_string())),
        };
        return match decode_full_body(kind, &text) {
            Ok(reply) => {
                if !reply.is_empty() {
                    send(StreamMessage::Chunk(reply));
                }
                send(StreamMessage::End);
            }
            Err(error) => fail(error),
        };
    }

    let mut body_stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = body_stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return fail(ExchangeError::Interrupted(e.to_string())),
        };

        for event in decoder.push(&chunk) {
            if let Some(finished) = apply_event(kind, event, &send) {
                return match finished {
                    Ok(()) => send(StreamMessage::End),
                    Err(error) => fail(error),
                };
            }
        }
    }

    for event in decoder.finish() {
        if let Some(Err(error)) = apply_event(kind, event, &send) {
            return fail(error);
        }
    }
    send(StreamMessage::End);
}

/// Forward one event. Returns `Some` when the stream is finished.
fn apply_event(
    kind: ProviderKind,
    event: SseEvent,
    send: &impl Fn(StreamMessage),
) -> Option<Result<(), ExchangeError>> {
    match event {
        SseEvent::Done => Some(Ok(())),
        SseEvent::Data(payload) => match decode_record(kind, &payload) {
            RecordOutcome::Delta(text) => {
                send(StreamMessage::Chunk(text));
                None
            }
            RecordOutcome::Skip => None,
            RecordOutcome::Failure(error) => Some(Err(error)),
        },
    }
}

fn decode_full_body(kind: ProviderKind, text: &str) -> Result<String, ExchangeError> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
        if value.get("error").is_some() {
            let summary = extract_error_summary(&value).unwrap_or_else(|| text.trim().to_string());
            return Err(ExchangeError::Provider(format!("API Error: {summary}")));
        }
    }
    parse_reply(kind, text).ok_or(ExchangeError::InvalidResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn decoder_handles_spacing_variants() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(
            b"data: {\"a\":1}\ndata:{\"b\":2}\nevent: ping\n: comment\n\ndata:[DONE]\n",
        );
        assert_eq!(
            events,
            vec![
                SseEvent::Data("{\"a\":1}".to_string()),
                SseEvent::Data("{\"b\":2}".to_string()),
                SseEvent::Done,
            ]
        );
    }

    #[test]
    fn decoder_buffers_records_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"choices\":[{\"de").is_empty());
        assert!(decoder.push(b"lta\":{\"content\":\"Hel").is_empty());
        let events = decoder.push(b"lo\"}}]}\r\ndata: [DO");
        assert_eq!(
            events,
            vec![SseEvent::Data(
                r#"{"choices":[{"delta":{"content":"Hello"}}]}"#.to_string()
            )]
        );
        assert!(decoder.push(b"NE]").is_empty());
        assert_eq!(decoder.finish(), vec![SseEvent::Done]);
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn decoder_skips_invalid_utf8_lines() {
        let mut decoder = SseDecoder::new();
        let mut bytes = b"data: \xff\xfe\n".to_vec();
        bytes.extend_from_slice(b"data: ok\n");
        assert_eq!(
            decoder.push(&bytes),
            vec![SseEvent::Data("ok".to_string())]
        );
    }

    #[test]
    fn decode_record_routes_errors_and_skips_noise() {
        assert_eq!(
            decode_record(ProviderKind::Gpt4, r#"{"choices":[{"delta":{"content":"Hi"}}]}"#),
            RecordOutcome::Delta("Hi".to_string())
        );
        assert_eq!(decode_record(ProviderKind::Gpt4, "{not json"), RecordOutcome::Skip);
        assert_eq!(
            decode_record(ProviderKind::Claude, r#"{"type":"message_stop"}"#),
            RecordOutcome::Skip
        );
        assert_eq!(
            decode_record(
                ProviderKind::Claude,
                r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#
            ),
            RecordOutcome::Failure(ExchangeError::Provider("API Error: Overloaded".to_string()))
        );
    }

    #[test]
    fn decode_full_body_reports_invalid_format() {
        assert_eq!(
            decode_full_body(ProviderKind::Gemini, "<html>oops</html>"),
            Err(ExchangeError::InvalidResponse)
        );
        assert_eq!(
            decode_full_body(
                ProviderKind::Gemini,
                r#"{"candidates":[{"content":{"parts":[{"text":"Hello"}]}}]}"#
            ),
            Ok("Hello".to_string())
        );
    }

    fn request_for(server: &MockServer, kind: ProviderKind, stream: bool) -> HttpRequest {
        HttpRequest {
            kind,
            url: format!("{}/v1/chat", server.uri()),
            headers: vec![("Authorization".to_string(), "Bearer test-key".to_string())],
            body: json!({"messages": []}),
            stream,
        }
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        loop {
            let (message, _) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for stream")
                .expect("channel closed");
            let done = message == StreamMessage::End;
            messages.push(message);
            if done {
                return messages;
            }
        }
    }

    fn spawn(service: &ChatStreamService, request: HttpRequest, stream_id: u64) {
        service.spawn_exchange(ExchangeParams {
            client: reqwest::Client::new(),
            request,
            cancel_token: CancellationToken::new(),
            stream_id,
        });
    }

    #[tokio::test]
    async fn streaming_exchange_forwards_deltas_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: not-json\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let (service, mut rx) = ChatStreamService::new();
        spawn(&service, request_for(&server, ProviderKind::Gpt4, true), 7);

        assert_eq!(
            collect(&mut rx).await,
            vec![
                StreamMessage::Chunk("Hel".to_string()),
                StreamMessage::Chunk("lo".to_string()),
                StreamMessage::End,
            ]
        );
    }

    #[tokio::test]
    async fn non_success_status_yields_single_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .set_body_json(json!({"error": {"message": "rate limited"}})),
            )
            .mount(&server)
            .await;

        let (service, mut rx) = ChatStreamService::new();
        spawn(&service, request_for(&server, ProviderKind::Gpt4, true), 1);

        assert_eq!(
            collect(&mut rx).await,
            vec![
                StreamMessage::Error("API request failed: 429 - rate limited".to_string()),
                StreamMessage::End,
            ]
        );
    }

    #[tokio::test]
    async fn stream_error_record_aborts_exchange() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Par\"}}\n\n",
            "event: error\n",
            "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"never\"}}\n\n",
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let (service, mut rx) = ChatStreamService::new();
        spawn(&service, request_for(&server, ProviderKind::Claude, true), 3);

        assert_eq!(
            collect(&mut rx).await,
            vec![
                StreamMessage::Chunk("Par".to_string()),
                StreamMessage::Error("API Error: Overloaded".to_string()),
                StreamMessage::End,
            ]
        );
    }

    #[tokio::test]
    async fn single_shot_exchange_sends_whole_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Bonjour"}], "role": "model"}}]
            })))
            .mount(&server)
            .await;

        let (service, mut rx) = ChatStreamService::new();
        spawn(&service, request_for(&server, ProviderKind::Gemini, false), 2);

        assert_eq!(
            collect(&mut rx).await,
            vec![StreamMessage::Chunk("Bonjour".to_string()), StreamMessage::End]
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_transport_error() {
        let (service, mut rx) = ChatStreamService::new();
        let request = HttpRequest {
            kind: ProviderKind::Gpt4,
            url: "http://127.0.0.1:9/unreachable".to_string(),
            headers: Vec::new(),
            body: json!({}),
            stream: true,
        };
        spawn(&service, request, 4);

        let messages = collect(&mut rx).await;
        assert_eq!(messages.len(), 2);
        assert!(
            matches!(&messages[0], StreamMessage::Error(text) if text.starts_with("Network error:"))
        );
    }

    #[tokio::test]
    async fn cancelled_exchange_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("data: [DONE]\n", "text/event-stream")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let (service, mut rx) = ChatStreamService::new();
        let cancel_token = CancellationToken::new();
        let handle = service.spawn_exchange(ExchangeParams {
            client: reqwest::Client::new(),
            request: request_for(&server, ProviderKind::Gpt4, true),
            cancel_token: cancel_token.clone(),
            stream_id: 5,
        });
        cancel_token.cancel();
        handle.await.expect("task panicked");

        drop(service);
        assert!(rx.recv().await.is_none());
    }
}
