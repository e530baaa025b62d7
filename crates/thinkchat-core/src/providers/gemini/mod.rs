//! Gemini provider (Generative Language API).

mod api;
mod sse;

pub use api::{GeminiClient, GeminiConfig, GenerateImageResponse, GeneratedImage};
pub use sse::GeminiSseParser;
