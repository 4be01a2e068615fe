use crate::client::Client;
use crate::dispatch::RequestDescriptor;
use crate::error::Error;
use crate::types::BillingInfo;

/// `client.billing()`
pub struct Billing<'a> {
    client: &'a Client,
}

impl<'a> Billing<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Current balance of the account behind the API key.
    pub async fn info(&self) -> Result<BillingInfo, Error> {
        self.client
            .call(RequestDescriptor::get("/billing"), "billing info")
            .await
    }
}
