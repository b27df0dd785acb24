//! Terminal interface for interactive chat sessions.
//!
//! - [`chat_loop`]: the loop that feeds typed lines to [`crate::core::app`]
//!   and applies replies arriving from [`crate::core::chat_stream`].
//! - [`terminal`]: the [`crate::core::app::Frontend`] that prints the
//!   transcript, notifications and listings.
//! - [`html`]: the message formatter shared by the transcript and HTML export.
//!
//! Ownership boundary: this layer presents and captures interaction state,
//! while [`crate::core`] owns domain logic and backend coordination.

pub mod chat_loop;
pub mod html;
pub mod terminal;
