use crate::client::{to_body, Client};
use crate::dispatch::RequestDescriptor;
use crate::error::Error;
use crate::stream::ChatCompletionStream;
use crate::types::{ChatCompletion, ChatCompletionRequest};
use serde_json::Value;

const COMPLETIONS_PATH: &str = "/chat/completions";

/// `client.chat()`
pub struct Chat<'a> {
    client: &'a Client,
}

impl<'a> Chat<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn completions(&self) -> Completions<'a> {
        Completions {
            client: self.client,
        }
    }
}

/// `client.chat().completions()`
pub struct Completions<'a> {
    client: &'a Client,
}

impl Completions<'_> {
    /// Create a completion and wait for the whole response.
    ///
    /// Any `stream` flag on the request is dropped; use
    /// [`create_stream`](Self::create_stream) for incremental output.
    pub async fn create(&self, request: &ChatCompletionRequest) -> Result<ChatCompletion, Error> {
        let mut body = to_body(request, "chat completion request")?;
        if let Value::Object(fields) = &mut body {
            fields.remove("stream");
        }

        self.client
            .call(
                RequestDescriptor::post(COMPLETIONS_PATH, body),
                "chat completion",
            )
            .await
    }

    /// Prepare a streamed completion.
    ///
    /// No request is sent until the first chunk is pulled. Connection
    /// failures and non-2xx statuses surface from that first pull.
    pub fn create_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionStream, Error> {
        let body = to_body(request, "chat completion request")?;
        let events = self.client.stream_events(COMPLETIONS_PATH, body);
        Ok(ChatCompletionStream::new(events))
    }
}
