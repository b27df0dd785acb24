//! Main chat loop
//!
//! Lines typed on stdin and messages from the exchange task are multiplexed
//! on one task that owns the [`App`]. Nothing else mutates it.

mod setup;

pub use self::setup::{bootstrap_app, AppHandle, ChatOptions};

use std::error::Error;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::core::app::{App, InputOutcome};
use crate::ui::terminal::TerminalFrontend;

const MIN_AUTOSAVE_MS: u64 = 1_000;
const WELCOME: &str = "Type a message and press Enter. /help lists commands; /quit or Ctrl+D leaves.";

#[derive(Debug)]
pub enum UiEvent {
    Line(String),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Quit,
}

fn spawn_input_reader(event_tx: mpsc::UnboundedSender<UiEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let event = match lines.next_line().await {
                Ok(Some(line)) => UiEvent::Line(line),
                Ok(None) => UiEvent::Eof,
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    UiEvent::Eof
                }
            };
            let done = matches!(event, UiEvent::Eof);
            if event_tx.send(event).is_err() || done {
                break;
            }
        }
    })
}

fn autosave_interval(app: &App) -> Interval {
    let period = Duration::from_millis(app.behavior.auto_save_interval.max(MIN_AUTOSAVE_MS));
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Apply one line of input, running code snippets inline.
pub async fn handle_line(app: &mut App, line: &str) -> LoopAction {
    match app.submit_input(line) {
        InputOutcome::Quit => LoopAction::Quit,
        InputOutcome::RunCode { language, code } => {
            app.run_code(&language, &code).await;
            LoopAction::Continue
        }
        InputOutcome::Busy => {
            debug!("input dropped while a reply is pending");
            LoopAction::Continue
        }
        InputOutcome::Ignored | InputOutcome::Handled | InputOutcome::ExchangeStarted(_) => {
            LoopAction::Continue
        }
    }
}

pub async fn run_chat(options: ChatOptions) -> Result<(), Box<dyn Error>> {
    let AppHandle {
        mut app,
        mut stream_rx,
        ..
    } = bootstrap_app(&options, Box::new(TerminalFrontend::stdout()))?;

    app.startup();
    app.notice(WELCOME);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let reader = spawn_input_reader(event_tx);
    let mut autosave = autosave_interval(&app);

    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(UiEvent::Line(line)) => {
                    if handle_line(&mut app, &line).await == LoopAction::Quit {
                        break;
                    }
                }
                Some(UiEvent::Eof) | None => break,
            },
            Some((message, stream_id)) = stream_rx.recv() => {
                app.handle_stream_message(message, stream_id);
            }
            _ = autosave.tick() => {
                if app.behavior.auto_save {
                    debug!("auto-save");
                    app.save();
                }
            }
        }
    }

    reader.abort();
    app.shutdown();
    Ok(())
}
