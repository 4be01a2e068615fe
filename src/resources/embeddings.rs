use crate::client::{to_body, Client};
use crate::dispatch::RequestDescriptor;
use crate::error::Error;
use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// `client.embeddings()`
pub struct Embeddings<'a> {
    client: &'a Client,
}

impl<'a> Embeddings<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Embed one input or a batch.
    pub async fn create(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, Error> {
        let body = to_body(request, "embedding request")?;
        self.client
            .call(RequestDescriptor::post("/embeddings", body), "embedding response")
            .await
    }
}
