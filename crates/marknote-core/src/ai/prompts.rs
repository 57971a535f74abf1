//! Task prompts and in-note AI triggers.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text operations offered on a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiTask {
    Improve,
    Summarize,
    Translate { target_language: String },
    Chat,
    Writer,
    Generate,
}

impl AiTask {
    fn system_prompt(&self) -> String {
        match self {
            Self::Improve => "You are a careful text editor. Improve the user's text so it is \
                clearer, more fluent and more accurate. Keep the original meaning and style and \
                answer in the language of the text."
                .to_string(),
            Self::Summarize => "You write concise, accurate summaries that keep the key \
                information and main points. Answer in the language of the text."
                .to_string(),
            Self::Translate { target_language } => format!(
                "You are a professional translator. Translate the user's text into \
                 {target_language}, keeping tone, style and Markdown formatting."
            ),
            Self::Chat => "You are a helpful assistant. Answer concisely and clearly.".to_string(),
            Self::Writer => "You are a writing assistant. Polish, expand or rewrite the content \
                as requested and reply with the improved content only, without commentary."
                .to_string(),
            Self::Generate => {
                "You are a content writer. Produce high quality content for the request."
                    .to_string()
            }
        }
    }

    fn user_prompt(&self, text: &str) -> String {
        match self {
            Self::Improve => format!("Improve the following text:\n\n{text}"),
            Self::Summarize => format!("Summarize the following text:\n\n{text}"),
            Self::Translate { target_language } => {
                format!("Translate the following text into {target_language}:\n\n{text}")
            }
            Self::Chat | Self::Writer | Self::Generate => text.to_string(),
        }
    }

    /// Messages to send for `text`.
    pub fn messages(&self, text: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(self.user_prompt(text)),
        ]
    }
}

/// Trigger keyword found in note text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Chat,
    Writer,
}

impl TriggerKind {
    pub const fn task(self) -> AiTask {
        match self {
            Self::Chat => AiTask::Chat,
            Self::Writer => AiTask::Writer,
        }
    }
}

/// A `@chat ...` or `@writer ...` request inside a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiTrigger {
    pub kind: TriggerKind,
    /// Text after the keyword up to the end of the line, trimmed
    pub prompt: String,
    /// Byte range covering the keyword and its prompt
    pub range: Range<usize>,
}

fn trigger_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)(?:^| )(@chat|@writer)([^\n]*)").expect("trigger pattern is valid")
    })
}

/// Find the last trigger starting at or before `cursor` (anywhere when
/// `cursor` is `None`). A trigger must begin a line or follow a space and
/// carry a non-empty prompt.
pub fn detect_trigger(text: &str, cursor: Option<usize>) -> Option<AiTrigger> {
    let limit = cursor.unwrap_or(text.len());
    trigger_pattern()
        .captures_iter(text)
        .filter_map(|captures| {
            let keyword = captures.get(1)?;
            let rest = captures.get(2)?;
            let prompt = rest.as_str().trim();
            if prompt.is_empty() || keyword.start() > limit {
                return None;
            }
            let kind = if keyword.as_str() == "@chat" {
                TriggerKind::Chat
            } else {
                TriggerKind::Writer
            };
            Some(AiTrigger {
                kind,
                prompt: prompt.to_string(),
                range: keyword.start()..rest.end(),
            })
        })
        .last()
}

/// Replace the trigger with the formatted reply.
pub fn insert_reply(text: &str, trigger: &AiTrigger, reply: &str) -> String {
    let formatted = format!("\n\n**AI reply:**\n\n{}\n\n---\n", reply.trim());
    let mut output = String::with_capacity(text.len() + formatted.len());
    output.push_str(&text[..trigger.range.start]);
    output.push_str(&formatted);
    output.push_str(&text[trigger.range.end..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn translate_prompt_names_target_language() {
        let messages = AiTask::Translate {
            target_language: "French".into(),
        }
        .messages("hello");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("French"));
        assert!(messages[1].content.ends_with("hello"));
    }

    #[test]
    fn detects_trigger_at_line_start() {
        let text = "# Notes\n@chat what is a tombstone?\nmore";
        let trigger = detect_trigger(text, None).unwrap();
        assert_eq!(trigger.kind, TriggerKind::Chat);
        assert_eq!(trigger.prompt, "what is a tombstone?");
        assert_eq!(&text[trigger.range.clone()], "@chat what is a tombstone?");
    }

    #[test]
    fn requires_space_or_line_start_before_keyword() {
        assert!(detect_trigger("mail me@chat hello", None).is_none());
        let trigger = detect_trigger("please @writer tidy this up", None).unwrap();
        assert_eq!(trigger.kind, TriggerKind::Writer);
        assert_eq!(trigger.prompt, "tidy this up");
    }

    #[test]
    fn ignores_triggers_without_prompt_or_after_cursor() {
        assert!(detect_trigger("@chat   \nbody", None).is_none());

        let text = "@chat first\n@writer second";
        let trigger = detect_trigger(text, Some(3)).unwrap();
        assert_eq!(trigger.prompt, "first");
        assert_eq!(detect_trigger(text, None).unwrap().prompt, "second");
    }

    #[test]
    fn reply_replaces_trigger_line() {
        let text = "intro\n@chat say hi\noutro";
        let trigger = detect_trigger(text, None).unwrap();
        let updated = insert_reply(text, &trigger, " Hi! ");
        assert_eq!(updated, "intro\n\n\n**AI reply:**\n\nHi!\n\n---\n\noutro");
    }
}
