//! Chat session event types for streaming consumers.
//!
//! This module defines the contract for events emitted while a turn runs.
//! Consumers receive them over a bounded channel; high-volume deltas are
//! delivered best-effort, lifecycle events reliably.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::providers::ProviderErrorKind;
use crate::providers::gemini::GeneratedImage;

/// Events emitted by a chat session during a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Turn has started processing.
    TurnStarted,

    /// Incremental text fragment from the assistant.
    AssistantDelta { text: String },

    /// Complete response text from the assistant.
    AssistantCompleted { text: String },

    /// An image was generated (image mode only).
    ImageGenerated { image: GeneratedImage },

    /// An error occurred during the turn. The conversation has already been
    /// rolled back to its pre-turn state when this is emitted.
    Error {
        kind: ErrorKind,
        message: String,
        details: Option<String>,
    },

    /// Turn completed successfully.
    TurnCompleted {
        /// Full assistant reply, `None` when the stream produced no text.
        final_text: Option<String>,
    },
}

/// Error categories for `ChatEvent::Error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// HTTP status error (4xx, 5xx)
    HttpStatus,
    /// Connection/request timeout
    Timeout,
    /// Response parsing failed
    Parse,
    /// API-level error from provider
    ApiError,
    /// Provider client could not be constructed (missing key, bad base URL)
    Initialization,
    /// Internal/unknown error
    Internal,
}

impl From<ProviderErrorKind> for ErrorKind {
    fn from(kind: ProviderErrorKind) -> Self {
        match kind {
            ProviderErrorKind::HttpStatus => ErrorKind::HttpStatus,
            ProviderErrorKind::Timeout => ErrorKind::Timeout,
            ProviderErrorKind::Parse => ErrorKind::Parse,
            ProviderErrorKind::ApiError => ErrorKind::ApiError,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::HttpStatus => write!(f, "http_status"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Parse => write!(f, "parse"),
            ErrorKind::ApiError => write!(f, "api_error"),
            ErrorKind::Initialization => write!(f, "initialization"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Channel-based event sender (async, bounded).
///
/// Events are wrapped in `Arc` for efficient cloning to multiple consumers.
pub type ChatEventTx = mpsc::Sender<Arc<ChatEvent>>;

/// Channel-based event receiver (async, bounded).
pub type ChatEventRx = mpsc::Receiver<Arc<ChatEvent>>;

/// Default channel capacity for event streams.
///
/// Set higher (128) to accommodate best-effort delta sends without blocking.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Creates a bounded event channel with the default capacity.
#[must_use]
pub fn create_event_channel() -> (ChatEventTx, ChatEventRx) {
    mpsc::channel(DEFAULT_EVENT_CHANNEL_CAPACITY)
}

/// Event sender wrapper that provides best-effort and reliable send modes.
///
/// Use `send_delta()` for high-volume events (`AssistantDelta`) that can be
/// dropped if the consumer is slow. Use `send_important()` for events that
/// must be delivered (completion, errors).
#[derive(Clone)]
pub struct EventSender {
    tx: ChatEventTx,
}

impl EventSender {
    #[must_use]
    pub fn new(tx: ChatEventTx) -> Self {
        Self { tx }
    }

    /// Best-effort send: never awaits, drops if channel is full.
    pub fn send_delta(&self, ev: ChatEvent) {
        let _ = self.tx.try_send(Arc::new(ev));
    }

    /// Reliable send: awaits delivery.
    pub async fn send_important(&self, ev: ChatEvent) {
        let _ = self.tx.send(Arc::new(ev)).await;
    }
}
