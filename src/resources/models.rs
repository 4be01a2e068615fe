use crate::client::Client;
use crate::dispatch::RequestDescriptor;
use crate::error::Error;
use crate::types::{Model, ModelList};
use url::form_urlencoded::byte_serialize;

/// `client.models()`
pub struct Models<'a> {
    client: &'a Client,
}

impl<'a> Models<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// List the models available to this key.
    pub async fn list(&self) -> Result<ModelList, Error> {
        self.client
            .call(RequestDescriptor::get("/models"), "model list")
            .await
    }

    /// Fetch one model by id.
    ///
    /// The id is percent-encoded as a single path segment.
    pub async fn retrieve(&self, id: &str) -> Result<Model, Error> {
        let path = model_path(id)?;
        self.client
            .call(RequestDescriptor::get(path), "model")
            .await
    }
}

fn model_path(id: &str) -> Result<String, Error> {
    // URL parsing collapses dot segments even when escaped.
    if matches!(id, "" | "." | "..") {
        return Err(Error::config(format!("invalid model id {id:?}")));
    }
    // byte_serialize writes spaces as '+' and escapes a literal '+' as %2B.
    let segment: String = byte_serialize(id.as_bytes()).collect();
    Ok(format!("/models/{}", segment.replace('+', "%20")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_path_plain_id() {
        assert_eq!(model_path("relay-small.v2_1").unwrap(), "/models/relay-small.v2_1");
    }

    #[test]
    fn test_model_path_escapes_reserved_characters() {
        assert_eq!(model_path("org/model").unwrap(), "/models/org%2Fmodel");
        assert_eq!(model_path("m?v=1#x").unwrap(), "/models/m%3Fv%3D1%23x");
        assert_eq!(model_path("a b+c").unwrap(), "/models/a%20b%2Bc");
        assert_eq!(model_path("../billing").unwrap(), "/models/..%2Fbilling");
    }

    #[test]
    fn test_model_path_rejects_dot_segments() {
        for id in ["", ".", ".."] {
            let err = model_path(id).unwrap_err();
            assert_eq!(err.status(), None, "{id:?} should be rejected");
        }
    }
}
