//! Generation provider implementations.

pub mod gemini;
pub mod shared;

pub use shared::{
    ChatContentBlock, ChatMessage, MessageContent, ProviderError, ProviderErrorKind,
    ProviderResult, ProviderStream, StreamEvent, resolve_api_key, resolve_base_url,
};
