//! Canned assistant replies
//!
//! Messages are classified by keyword, case-insensitively. When a message
//! matches several categories the first rule in `RULES` wins.

use webos_protocol::AiResponse;

pub const SUGGESTIONS: [&str; 4] = [
    "Tell me more",
    "Show me examples",
    "Create a plan",
    "Set up automation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    System,
    Creative,
    Task,
    General,
}

/// Keyword rules in priority order
const RULES: &[(Intent, &[&str])] = &[
    (Intent::System, &["system"]),
    (Intent::Creative, &["create", "generate"]),
    (Intent::Task, &["help", "task"]),
];

pub fn classify(message: &str) -> Intent {
    let lower = message.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map_or(Intent::General, |(intent, _)| *intent)
}

pub fn respond(message: &str) -> AiResponse {
    let response = match classify(message) {
        Intent::General => "I'm here to help! I can assist with tasks, answer questions, generate content, and manage your WebOS system. What would you like to do?".to_string(),
        Intent::Task => format!(
            "I can help you with \"{}\". Here are some suggestions: 1) Break it down into smaller steps, 2) Find relevant resources, 3) Set up reminders, 4) Create a plan of action.",
            message
        ),
        Intent::System => "I can help you manage your WebOS system. I can adjust settings, organize your apps, manage files, and optimize performance. What specific system task do you need help with?".to_string(),
        Intent::Creative => format!(
            "For \"{}\", I can help you brainstorm ideas, create outlines, generate content, or provide inspiration. Would you like me to start with any of these approaches?",
            message
        ),
    };

    AiResponse {
        response,
        suggestions: SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
    }
}
