//! Chat session: turn orchestration over conversation, provider, and events.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use futures_util::StreamExt;

use crate::chat::{
    Attachment, ChatEvent, ChatEventTx, Conversation, ErrorKind, EventSender, MAX_ATTACHMENTS,
    ResponseAggregator,
};
use crate::config::Config;
use crate::personalization::{Personalization, build_system_instruction};
use crate::providers::gemini::{GeminiClient, GeminiConfig};
use crate::providers::{ChatContentBlock, ChatMessage, ProviderError, ProviderStream, StreamEvent};
use crate::store::Store;

/// How a submitted prompt is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatMode {
    #[default]
    Chat,
    Image,
    Summarize,
}

impl FromStr for ChatMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "chat" => Ok(ChatMode::Chat),
            "image" => Ok(ChatMode::Image),
            "summarize" => Ok(ChatMode::Summarize),
            other => Err(anyhow!(
                "Unknown mode '{other}' (expected chat, image, or summarize)"
            )),
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Chat => write!(f, "chat"),
            ChatMode::Image => write!(f, "image"),
            ChatMode::Summarize => write!(f, "summarize"),
        }
    }
}

/// Orchestrates chat turns: validation, provider calls, conversation updates,
/// and event emission.
///
/// One turn runs at a time; a turn that fails leaves the conversation exactly
/// as it was before the turn began.
pub struct ChatSession {
    conversation: Conversation,
    config: Config,
    store: Store,
    busy: bool,
}

impl ChatSession {
    #[must_use]
    pub fn new(config: Config, store: Store) -> Self {
        Self {
            conversation: Conversation::new(),
            config,
            store,
            busy: false,
        }
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Runs one turn: pushes the user entry, calls the provider, streams
    /// events to `tx`, and returns the final assistant reply.
    ///
    /// Returns `Ok(None)` when the turn completed but produced no text
    /// (an empty stream never creates an assistant entry).
    ///
    /// # Errors
    /// Returns an error on invalid input or provider failure. On provider
    /// failure the conversation is rolled back to its pre-turn length and an
    /// `Error` event is emitted before returning.
    pub async fn send(
        &mut self,
        prompt: &str,
        mode: ChatMode,
        attachments: &[Attachment],
        tx: ChatEventTx,
    ) -> Result<Option<String>> {
        if self.busy {
            bail!("A turn is already in progress");
        }
        validate_turn(prompt, mode, attachments)?;

        self.busy = true;
        let sender = EventSender::new(tx);
        let result = self.run_turn(prompt, mode, attachments, &sender).await;
        self.busy = false;
        result
    }

    async fn run_turn(
        &mut self,
        prompt: &str,
        mode: ChatMode,
        attachments: &[Attachment],
        sender: &EventSender,
    ) -> Result<Option<String>> {
        let checkpoint = self.conversation.len();
        sender.send_important(ChatEvent::TurnStarted).await;
        self.conversation.push_user(prompt);

        let outcome = match mode {
            ChatMode::Image => self.run_image_turn(prompt, sender).await,
            ChatMode::Chat | ChatMode::Summarize => {
                self.run_text_turn(prompt, mode, attachments, sender).await
            }
        };

        match outcome {
            Ok(final_text) => {
                sender
                    .send_important(ChatEvent::TurnCompleted {
                        final_text: final_text.clone(),
                    })
                    .await;
                Ok(final_text)
            }
            Err(err) => {
                self.conversation.truncate(checkpoint);
                Err(emit_error(err, sender).await)
            }
        }
    }

    async fn run_text_turn(
        &mut self,
        prompt: &str,
        mode: ChatMode,
        attachments: &[Attachment],
        sender: &EventSender,
    ) -> Result<Option<String>> {
        let messages = match mode {
            // Summarize sends a single wrapped message without history.
            ChatMode::Summarize => vec![summarize_message(prompt, attachments)],
            _ => self.conversation.to_provider_messages(attachments),
        };

        let personalization = Personalization::load(self.store.clone());
        let system = build_system_instruction(
            self.config.base_system_prompt(),
            personalization.settings(),
            personalization.memory(),
        );

        let client = self.client()?;
        let stream = client.send_messages_stream(&messages, Some(&system)).await?;
        self.consume_stream(stream, sender).await
    }

    async fn run_image_turn(
        &mut self,
        prompt: &str,
        sender: &EventSender,
    ) -> Result<Option<String>> {
        let client = self.client()?;
        let response = client
            .generate_image(&self.config.image_model, prompt)
            .await?;

        let image = response
            .images
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("The image model returned no image data"))?;

        let caption = if response.text_parts.is_empty() {
            format!("Generated image for: {prompt}")
        } else {
            response.text_parts.join("\n")
        };

        self.conversation
            .push_model_image(caption.clone(), prompt, image.clone());
        sender
            .send_important(ChatEvent::ImageGenerated { image })
            .await;
        Ok(Some(caption))
    }

    async fn consume_stream(
        &mut self,
        mut stream: ProviderStream,
        sender: &EventSender,
    ) -> Result<Option<String>> {
        let mut aggregator = ResponseAggregator::new();

        while let Some(event) = stream.next().await {
            match event.map_err(anyhow::Error::new)? {
                StreamEvent::TextDelta { text } if !text.is_empty() => {
                    if aggregator.push_fragment(&text) {
                        self.conversation.push_model(text.as_str());
                    } else {
                        self.conversation.append_to_last_model(&text);
                    }
                    sender.send_delta(ChatEvent::AssistantDelta { text });
                }
                StreamEvent::Error {
                    error_type,
                    message,
                } => {
                    return Err(anyhow::Error::new(ProviderError::api_error(
                        &error_type,
                        &message,
                    )));
                }
                StreamEvent::MessageCompleted => break,
                StreamEvent::MessageStart { .. }
                | StreamEvent::MessageDelta { .. }
                | StreamEvent::TextDelta { .. } => {}
            }
        }

        let final_text = aggregator.finish();
        if let Some(text) = &final_text {
            sender
                .send_important(ChatEvent::AssistantCompleted { text: text.clone() })
                .await;
        }
        Ok(final_text)
    }

    fn client(&self) -> Result<GeminiClient> {
        let config = GeminiConfig::from_env(
            self.config.model.clone(),
            self.config.max_output_tokens,
            self.config.providers.gemini.effective_base_url(),
            self.config.providers.gemini.effective_api_key(),
        )
        .map_err(|err| {
            anyhow::Error::new(InitializationError {
                message: format!("{err:#}"),
            })
        })?;
        Ok(GeminiClient::new(config))
    }
}

/// The provider client could not be constructed; fatal to sending until the
/// configuration is corrected.
#[derive(Debug)]
struct InitializationError {
    message: String,
}

impl fmt::Display for InitializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InitializationError {}

fn validate_turn(prompt: &str, mode: ChatMode, attachments: &[Attachment]) -> Result<()> {
    // Chat turns may carry attachments without text; the other modes feed
    // the prompt straight into the request, so it must be present.
    let blank = prompt.trim().is_empty();
    match mode {
        ChatMode::Chat => {
            if blank && attachments.is_empty() {
                bail!("Prompt must not be empty");
            }
        }
        ChatMode::Image | ChatMode::Summarize => {
            if blank {
                bail!("Prompt must not be empty");
            }
        }
    }
    if attachments.len() > MAX_ATTACHMENTS {
        bail!("Too many attachments: {} (max {MAX_ATTACHMENTS})", attachments.len());
    }
    if mode == ChatMode::Image && !attachments.is_empty() {
        bail!("Attachments are not supported in image mode");
    }
    Ok(())
}

fn summarize_message(input: &str, attachments: &[Attachment]) -> ChatMessage {
    let wrapped = format!("Please summarize the following text:\n\n---\n\n{input}");
    if attachments.is_empty() {
        return ChatMessage::user(wrapped);
    }

    let mut blocks = vec![ChatContentBlock::Text(wrapped)];
    blocks.extend(attachments.iter().map(|a| ChatContentBlock::InlineData {
        mime_type: a.mime_type.clone(),
        data: a.data.clone(),
    }));
    ChatMessage::user_blocks(blocks)
}

/// Sends an error event and returns the original error, preserving the full
/// chain (including `ProviderError` details) for callers.
async fn emit_error(err: anyhow::Error, sender: &EventSender) -> anyhow::Error {
    let event = if let Some(provider_err) = err.downcast_ref::<ProviderError>() {
        ChatEvent::Error {
            kind: provider_err.kind.clone().into(),
            message: provider_err.message.clone(),
            details: provider_err.details.clone(),
        }
    } else if err.downcast_ref::<InitializationError>().is_some() {
        ChatEvent::Error {
            kind: ErrorKind::Initialization,
            message: err.to_string(),
            details: None,
        }
    } else {
        ChatEvent::Error {
            kind: ErrorKind::Internal,
            message: err.to_string(),
            details: None,
        }
    };
    sender.send_important(event).await;
    err
}
