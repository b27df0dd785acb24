//! NEXUS is a terminal chat client for remote LLM APIs with selectable
//! personalities, locally persisted chat history and streamed replies.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the application context, chat sessions, the provider
//!   adapter, stream decoding, persistence, export and import.
//! - [`ui`] prints the transcript and runs the interactive loop that drives
//!   user input and display updates.
//! - [`commands`] implements slash-command parsing and dispatch used by the
//!   chat loop.
//! - [`api`] defines the request and response payloads of the three
//!   supported backends.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
