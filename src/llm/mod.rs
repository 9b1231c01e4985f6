pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

use anyhow::Result;

pub use client::ChatClient;
pub use error::LlmError;
pub use prompt::LISTING_SYSTEM_PROMPT;
pub use types::{ChatRequest, ChatResponseRaw, Message};

pub trait ListingGenerator {
    /// Turn OCR text into a listing reply (human-readable block + trailing JSON).
    /// The system instruction is fixed by the implementation, never per call.
    fn generate(&self, text: &str) -> Result<String>;
}
