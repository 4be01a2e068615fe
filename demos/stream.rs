//! Streaming chat completion.
//!
//! Run with: AI_RELAY_API_KEY=... cargo run --example stream

use ai_relay_sdk::{ChatCompletionRequest, Client, Message};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Client::from_env()?;

    let request = ChatCompletionRequest::new(
        "relay-small",
        vec![
            Message::system("You are a helpful assistant. Be concise."),
            Message::user("Write a haiku about Rust programming."),
        ],
    )
    .max_tokens(256)
    .temperature(0.7);

    println!("Streaming...\n");

    let mut stream = client.chat().completions().create_stream(&request)?;
    while let Some(chunk) = stream.next().await {
        if let Some(text) = chunk?.text() {
            print!("{}", text);
        }
    }

    let result = stream.finalize()?;

    println!("\n\n--- Stats ---");
    println!("Model: {}", result.model);
    println!("Prompt tokens: {}", result.usage.prompt_tokens);
    println!("Completion tokens: {}", result.usage.completion_tokens);
    println!("Finish reason: {:?}", result.finish_reason);

    Ok(())
}
