//! Async client for the AI Relay API: chat completions, embeddings, model
//! listing and billing, with retrying dispatch and lazy SSE streaming.
//!
//! # Example
//! ```no_run
//! use ai_relay_sdk::{ChatCompletionRequest, Client, Message};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ai_relay_sdk::Error> {
//!     let client = Client::from_env()?;
//!     let request = ChatCompletionRequest::new("relay-small", vec![Message::user("Hello!")])
//!         .max_tokens(256);
//!
//!     let mut stream = client.chat().completions().create_stream(&request)?;
//!     while let Some(chunk) = stream.next().await {
//!         if let Some(text) = chunk?.text() {
//!             print!("{text}");
//!         }
//!     }
//!
//!     let result = stream.finalize()?;
//!     println!("\nTokens: {} total", result.usage.total_tokens);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod resources;
pub mod sse;
pub mod stream;
pub mod types;

pub use client::{Client, ClientBuilder};
pub use config::TransportConfig;
pub use dispatch::{Dispatcher, RequestDescriptor};
pub use error::Error;
pub use reqwest::Method;
pub use stream::{ChatCompletionStream, EventStream};
pub use types::*;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;
