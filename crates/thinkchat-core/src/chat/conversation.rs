//! In-memory conversation history for a chat session.

use crate::providers::gemini::GeneratedImage;
use crate::providers::{ChatContentBlock, ChatMessage};

/// Who authored a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One entry in the conversation.
///
/// Image entries carry the generated payload alongside a textual caption so
/// the history can still be replayed to text-only endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnMessage {
    pub role: Role,
    pub content: String,
    pub image: Option<GeneratedImage>,
    /// Prompt that produced the image, present on image entries only.
    pub prompt: Option<String>,
}

/// Ordered conversation history.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    entries: Vec<TurnMessage>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[TurnMessage] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.entries.push(TurnMessage {
            role: Role::User,
            content: content.into(),
            image: None,
            prompt: None,
        });
    }

    pub fn push_model(&mut self, content: impl Into<String>) {
        self.entries.push(TurnMessage {
            role: Role::Model,
            content: content.into(),
            image: None,
            prompt: None,
        });
    }

    pub fn push_model_image(
        &mut self,
        caption: impl Into<String>,
        prompt: impl Into<String>,
        image: GeneratedImage,
    ) {
        self.entries.push(TurnMessage {
            role: Role::Model,
            content: caption.into(),
            image: Some(image),
            prompt: Some(prompt.into()),
        });
    }

    /// Appends text to the most recent model entry.
    ///
    /// No-op when the history is empty or ends with a user entry.
    pub fn append_to_last_model(&mut self, text: &str) {
        if let Some(last) = self.entries.last_mut()
            && last.role == Role::Model
        {
            last.content.push_str(text);
        }
    }

    /// Drops every entry at or after `len`, restoring an earlier checkpoint.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Converts the history into provider messages.
    ///
    /// `attachments` are attached to the final user entry as inline-data
    /// blocks. Generated-image entries are replayed as their caption text.
    #[must_use]
    pub fn to_provider_messages(
        &self,
        attachments: &[crate::chat::Attachment],
    ) -> Vec<ChatMessage> {
        let last_user_idx = self
            .entries
            .iter()
            .rposition(|entry| entry.role == Role::User);

        self.entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                if entry.role == Role::Model {
                    return ChatMessage::model(entry.content.clone());
                }
                if Some(idx) == last_user_idx && !attachments.is_empty() {
                    let mut blocks = Vec::new();
                    if !entry.content.trim().is_empty() {
                        blocks.push(ChatContentBlock::Text(entry.content.clone()));
                    }
                    blocks.extend(attachments.iter().map(|a| ChatContentBlock::InlineData {
                        mime_type: a.mime_type.clone(),
                        data: a.data.clone(),
                    }));
                    return ChatMessage::user_blocks(blocks);
                }
                ChatMessage::user(entry.content.clone())
            })
            .collect()
    }
}
