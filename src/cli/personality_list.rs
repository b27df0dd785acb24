use crate::core::personality::{all_personalities, DEFAULT_PERSONALITY};
use crate::ui::chat_loop::ChatOptions;

pub fn personality_listing(selected: &str) -> String {
    let mut listing = String::from("Personalities:\n\n");
    for personality in all_personalities() {
        let marker = if personality.id.eq_ignore_ascii_case(selected) {
            "*"
        } else {
            " "
        };
        listing.push_str(&format!(
            "{marker} {:<13} {}\n",
            personality.id, personality.name
        ));
    }
    listing.push_str("\n* = selected personality");
    listing
}

pub fn list_personalities(options: &ChatOptions) {
    let configured = options
        .load_config()
        .ok()
        .and_then(|(config, _)| config.default_personality);
    let selected = options
        .personality
        .clone()
        .or(configured)
        .unwrap_or_else(|| DEFAULT_PERSONALITY.to_string());
    println!("{}", personality_listing(&selected));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_marks_selected() {
        let listing = personality_listing("friendly");
        assert!(listing.contains("* friendly"));
        assert!(listing.contains("  professional"));
        let marked = listing
            .lines()
            .filter(|line| line.starts_with("* ") && !line.starts_with("* ="))
            .count();
        assert_eq!(marked, 1);
    }
}
