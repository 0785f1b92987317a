//! Gemini API integration for the operator assistant.
//!
//! Only single-turn `generateContent` calls are made: a prompt, a system
//! instruction and a temperature in, plain text out.

mod client;
mod error;
mod types;

pub use client::GeminiClient;
pub use error::GeminiError;
pub use types::{GenerateContentRequest, GenerateContentResponse, Prompt};

use std::future::Future;
use std::sync::Arc;

/// A generative-text backend.
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for one prompt.
    fn generate(&self, prompt: &Prompt) -> impl Future<Output = Result<String, GeminiError>> + Send;
}

impl<T: TextGenerator> TextGenerator for Arc<T> {
    fn generate(&self, prompt: &Prompt) -> impl Future<Output = Result<String, GeminiError>> + Send {
        (**self).generate(prompt)
    }
}
