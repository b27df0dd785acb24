//! Built-in personality catalog.
//!
//! A personality is an immutable system prompt plus greeting. The catalog is
//! fixed at compile time; the active entry is tracked by id on the [`App`].
//!
//! [`App`]: crate::core::app::App

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Personality {
    pub id: &'static str,
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub greeting: &'static str,
}

pub const DEFAULT_PERSONALITY: &str = "professional";

const PERSONALITIES: &[Personality] = &[
    Personality {
        id: "professional",
        name: "Professional",
        system_prompt: "You are NEXUS, a professional AI assistant. Respond in a formal, precise, and business-oriented manner. Use clear, concise language and provide structured, actionable information.",
        greeting: "Greetings. I'm NEXUS, your professional AI assistant. How may I assist you with your business needs today?",
    },
    Personality {
        id: "friendly",
        name: "Friendly",
        system_prompt: "You are NEXUS, a friendly and approachable AI assistant. Use warm, casual language and be conversational. Show enthusiasm and empathy in your responses.",
        greeting: "Hey there! I'm NEXUS, your friendly AI companion. I'm excited to help you out today! What can we work on together?",
    },
    Personality {
        id: "sarcastic",
        name: "Sarcastic",
        system_prompt: "You are NEXUS, a witty and slightly sarcastic AI assistant. Use humor, clever remarks, and playful sarcasm while still being helpful. Keep it light and entertaining.",
        greeting: "Well, well, well... Look who's back for more of my brilliant insights. I'm NEXUS, and I suppose I can spare some time to help you out. What's the situation?",
    },
    Personality {
        id: "creative",
        name: "Creative",
        system_prompt: "You are NEXUS, a creative and imaginative AI assistant. Think outside the box, use vivid language, and approach problems with artistic flair. Be inspiring and innovative in your responses.",
        greeting: "Welcome to the realm of infinite possibilities! I'm NEXUS, your creative companion. Let's paint some ideas together and bring your imagination to life!",
    },
];

pub fn all_personalities() -> &'static [Personality] {
    PERSONALITIES
}

/// Find a personality by id (case-insensitive).
pub fn find_personality(id: &str) -> Option<&'static Personality> {
    PERSONALITIES
        .iter()
        .find(|personality| personality.id.eq_ignore_ascii_case(id))
}

/// Look up `id`, falling back to the default entry for unknown ids.
pub fn personality_or_default(id: &str) -> &'static Personality {
    find_personality(id).unwrap_or(&PERSONALITIES[0])
}

pub fn personality_ids() -> Vec<&'static str> {
    PERSONALITIES.iter().map(|p| p.id).collect()
}
