use std::fmt;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::{OrderRequest, OrderResponse};
use crate::errors::{Error, Result};
use crate::http::{Request, Response};
use crate::menu::MenuClient;

/// Minutes until a submitted order is ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreparationTime(pub u32);

impl PreparationTime {
    pub fn minutes(&self) -> u32 {
        self.0
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.0) * 60)
    }
}

impl fmt::Display for PreparationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => write!(f, "1 minute"),
            minutes => write!(f, "{} minutes", minutes),
        }
    }
}

impl From<OrderResponse> for PreparationTime {
    fn from(response: OrderResponse) -> Self {
        PreparationTime(response.preparation_time)
    }
}

impl MenuClient {
    /// Build the checkout request: a JSON POST of `{"menuIds": [...]}` to the order endpoint
    pub fn order_request(&self, menu_ids: &[u32]) -> Result<Request> {
        let url = self.builder.order_url()?;
        let body = serde_json::to_vec(&OrderRequest {
            menu_ids: menu_ids.to_vec(),
        })?;
        Ok(Request::post(url, body).with_header("Content-Type", "application/json"))
    }

    /// Submit the order and return how long it will take to prepare.
    ///
    /// Fails with `OrderRequestFailed` when the status is not 200, `BadResponse` when there is
    /// no status at all, and `Decode` when the answer lacks a valid `preparation_time`.
    pub async fn submit_order(&self, menu_ids: &[u32]) -> Result<PreparationTime> {
        let request = self.order_request(menu_ids)?;
        let response = self.fetcher.send(request).await?;
        let preparation_time = decode_order_response(&response)?;
        debug!(items = menu_ids.len(), %preparation_time, "order accepted");
        Ok(preparation_time)
    }

    /// Callback twin of [`MenuClient::submit_order`]
    pub fn submit_order_with<F>(&self, menu_ids: &[u32], on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<PreparationTime>) + Send + 'static,
    {
        let client = self.clone();
        let menu_ids = menu_ids.to_vec();
        self.fetcher.complete_with(
            async move { client.submit_order(&menu_ids).await },
            on_complete,
        )
    }
}

fn decode_order_response(response: &Response) -> Result<PreparationTime> {
    match response.status {
        None => Err(Error::BadResponse),
        Some(200) => {
            let order: OrderResponse = serde_json::from_slice(&response.body)?;
            Ok(order.into())
        }
        Some(code) => Err(Error::OrderRequestFailed(code)),
    }
}
