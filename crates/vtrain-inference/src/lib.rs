//! Inference provider client for VTrain.
//!
//! The pipeline talks to models exclusively through [`InferenceClient`], so
//! tests can substitute a scripted fake for the HTTP implementation.

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::{InferenceClient, InferenceConfig, OpenAiClient};
pub use error::{InferenceError, InferenceResult};
pub use retry::RetryPolicy;
pub use types::{ChatMessage, CompletionRequest, ContentPart, Role};
