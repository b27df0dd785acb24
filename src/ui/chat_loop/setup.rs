use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::app::{App, AppInit, Frontend};
use crate::core::chat_stream::{ChatStreamService, StreamMessage};
use crate::core::code_runner::ProcessRunner;
use crate::core::config::{path_display, Config};
use crate::core::store::{FileStore, Store};
use crate::logging;

/// Process-level choices that shape the app before it starts.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub provider: Option<String>,
    pub personality: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub disable_streaming: bool,
}

impl ChatOptions {
    /// Load `config.toml` and layer `--data-dir` over it.
    pub fn load_config(&self) -> Result<(Config, PathBuf), Box<dyn Error>> {
        let mut config = Config::load()?;
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        let data_dir = config.resolve_data_dir()?;
        Ok((config, data_dir))
    }
}

pub struct AppHandle {
    pub app: App,
    pub stream_rx: mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    pub data_dir: PathBuf,
}

/// Build the application state from config, the data directory store and
/// command-line options.
pub fn bootstrap_app(
    options: &ChatOptions,
    frontend: Box<dyn Frontend>,
) -> Result<AppHandle, Box<dyn Error>> {
    let (config, data_dir) = options.load_config()?;

    if let Some(path) = logging::init_or_warn(&data_dir) {
        debug!(log = %path_display(&path), "logging initialized");
    }

    let store = Store::new(FileStore::new(&data_dir));
    let (stream_service, stream_rx) = ChatStreamService::new();
    let export_dir = std::env::current_dir().unwrap_or_else(|_| data_dir.clone());

    let app = App::new(AppInit {
        config,
        store,
        frontend,
        stream_service,
        runner: Arc::new(ProcessRunner::default()),
        provider: options.provider.clone(),
        personality: options.personality.clone(),
        disable_streaming: options.disable_streaming,
        export_dir,
    });

    Ok(AppHandle {
        app,
        stream_rx,
        data_dir,
    })
}
