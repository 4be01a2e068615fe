//! Thin namespace wrappers over the dispatcher and event streams.
//!
//! Each namespace borrows the [`Client`](crate::Client) and only knows its
//! endpoint paths and payload types.

pub mod billing;
pub mod chat;
pub mod embeddings;
pub mod models;

pub use billing::Billing;
pub use chat::{Chat, Completions};
pub use embeddings::Embeddings;
pub use models::Models;
