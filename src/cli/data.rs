//! Non-interactive commands over the saved chats and settings.

use std::error::Error;
use std::path::{Path, PathBuf};

use crate::core::app::App;
use crate::core::config::path_display;
use crate::core::export::{read_import, ExportFormat};
use crate::core::store::UserProfile;
use crate::ui::chat_loop::{bootstrap_app, ChatOptions};
use crate::ui::terminal::TerminalFrontend;

fn open_app(options: &ChatOptions) -> Result<App, Box<dyn Error>> {
    let handle = bootstrap_app(options, Box::new(TerminalFrontend::stdout()))?;
    Ok(handle.app)
}

/// Export `chat` (or the most recent chat) into `output`.
pub fn export_to(
    app: &mut App,
    format: &str,
    chat: Option<&str>,
    output: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let format: ExportFormat = format.parse()?;
    let chat = chat
        .map(str::to_string)
        .or_else(|| app.history.most_recent_id());
    if let Some(id) = chat {
        app.history.load_session(&id)?;
    }

    let artifact = app.render_export(format)?;
    Ok(artifact.write_to(output)?)
}

pub fn run_export(
    options: &ChatOptions,
    format: &str,
    chat: Option<String>,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut app = open_app(options)?;
    let output = output.unwrap_or_else(|| app.export_dir.clone());
    let path = export_to(&mut app, format, chat.as_deref(), &output)?;
    println!("Exported to {}", path_display(&path));
    Ok(())
}

pub fn run_import(options: &ChatOptions, file: &Path) -> Result<(), Box<dyn Error>> {
    let mut app = open_app(options)?;
    let data = read_import(file)?;
    let merged = app.apply_import(data);
    println!("Imported {merged} chats from {}", path_display(file));
    Ok(())
}

pub fn chat_listing(app: &App) -> String {
    let chats = app.history.list_newest_first();
    if chats.is_empty() {
        return "No saved chats.".to_string();
    }

    let mut listing = String::new();
    for (id, session) in chats {
        let date = chrono::DateTime::from_timestamp_millis(session.timestamp)
            .map(|date| {
                date.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_default();
        listing.push_str(&format!(
            "{id}  {date}  {} ({} messages)\n",
            session.title,
            session.messages.len()
        ));
    }
    listing.trim_end().to_string()
}

pub fn run_chats(options: &ChatOptions) -> Result<(), Box<dyn Error>> {
    let app = open_app(options)?;
    println!("{}", chat_listing(&app));
    Ok(())
}

pub fn run_profile(
    options: &ChatOptions,
    name: Option<String>,
    image: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut app = open_app(options)?;
    let changed = name.is_some() || image.is_some();

    if let Some(name) = name {
        app.user_profile.name = name;
    }
    if let Some(image) = image {
        app.user_profile.image = UserProfile::image_data_url(&image)?;
    }
    if changed {
        app.save_profile();
    }

    let image = if app.user_profile.image.starts_with("data:") {
        "(embedded image)"
    } else {
        app.user_profile.image.as_str()
    };
    println!("Name:  {}\nImage: {image}", app.user_profile.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use crate::utils::test_utils::{create_test_harness, create_test_message};

    #[test]
    fn export_to_writes_requested_chat() {
        let mut harness = create_test_harness();
        let first = harness.app.start_new_chat();
        harness
            .app
            .history
            .append_message(&first, create_test_message(Role::User, "first chat"))
            .unwrap();
        harness.app.start_new_chat();

        let output = harness.export_dir.path().to_path_buf();
        let path = export_to(&mut harness.app, "md", Some(&first), &output).unwrap();

        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.contains("first chat"));
    }

    #[test]
    fn export_to_rejects_unknown_chat() {
        let mut harness = create_test_harness();
        let output = harness.export_dir.path().to_path_buf();
        let err = export_to(&mut harness.app, "json", Some("chat_1"), &output).unwrap_err();
        assert_eq!(err.to_string(), "Chat 'chat_1' not found");
    }

    #[test]
    fn listing_shows_titles_newest_first() {
        let mut harness = create_test_harness();
        assert_eq!(chat_listing(&harness.app), "No saved chats.");

        let older = harness.app.start_new_chat();
        harness
            .app
            .history
            .append_message(&older, create_test_message(Role::User, "older"))
            .unwrap();
        let newer = harness.app.start_new_chat();
        harness
            .app
            .history
            .append_message(&newer, create_test_message(Role::User, "newer"))
            .unwrap();

        let listing = chat_listing(&harness.app);
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&newer));
        assert!(lines[1].contains("older (1 messages)"));
    }
}
