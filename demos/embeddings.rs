//! Embeddings, model listing and billing, with typed error handling.
//!
//! Run with: AI_RELAY_API_KEY=... cargo run --example embeddings

use ai_relay_sdk::{Client, EmbeddingRequest, Error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Client::from_env()?;

    let models = client.models().list().await?;
    for model in &models.data {
        println!("model: {}", model.id);
    }

    let request = EmbeddingRequest::new(
        "relay-embed",
        vec!["ownership".to_string(), "borrowing".to_string()],
    );
    match client.embeddings().create(&request).await {
        Ok(response) => {
            for item in &response.data {
                println!("#{}: {} dimensions", item.index, item.embedding.len());
            }
        }
        Err(Error::RateLimited { retry_after, .. }) => {
            println!("rate limited, retry after {:?}", retry_after);
        }
        Err(Error::InsufficientCredits { .. }) => {
            let billing = client.billing().info().await?;
            println!("out of credits, balance: {:?}", billing.balance);
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
