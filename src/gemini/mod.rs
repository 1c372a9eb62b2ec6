//! Gemini `generateContent` client: function calling, system instructions, retry.

pub mod client;
mod convert;
pub mod retry;
pub mod types;

pub use client::{GeminiClient, GeminiError, LanguageModel, ModelRequest};
pub use retry::RetryPolicy;
