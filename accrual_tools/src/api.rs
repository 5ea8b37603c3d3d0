use std::{fmt::Debug, sync::Arc};

use backon::Retryable;
use log::*;
use reqwest::{header::RETRY_AFTER, Client, Response, StatusCode};
use url::Url;

use crate::{
    config::AccrualConfig,
    data_objects::{AccrualLookup, AccrualResponse},
    helpers::parse_retry_after,
    AccrualApiError,
};

/// The order lookup path, relative to the service's base URL.
pub const GET_ORDER_PATH: &str = "api/orders/";

#[derive(Clone)]
pub struct AccrualApi {
    config: AccrualConfig,
    base: Url,
    client: Arc<Client>,
}

impl Debug for AccrualApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccrualApi ({})", self.base)
    }
}

impl AccrualApi {
    pub fn new(config: AccrualConfig) -> Result<Self, AccrualApiError> {
        let base = config.parse_base_url()?;
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| AccrualApiError::Initialization(e.to_string()))?;
        Ok(Self { config, base, client: Arc::new(client) })
    }

    pub fn config(&self) -> &AccrualConfig {
        &self.config
    }

    pub fn url(&self, order_number: &str) -> Result<Url, AccrualApiError> {
        self.base
            .join(&format!("{GET_ORDER_PATH}{order_number}"))
            .map_err(|e| AccrualApiError::InvalidUrl(format!("No lookup URL for order {order_number}. {e}")))
    }

    /// Looks up a single order on the accrual service.
    ///
    /// Connection failures and timeouts are retried according to the configured [`crate::RetryPolicy`]. Any HTTP
    /// response, including `429` and `5xx`, is returned to the caller after a single request.
    pub async fn fetch_order(&self, order_number: &str) -> Result<AccrualLookup, AccrualApiError> {
        let url = self.url(order_number)?;
        trace!("🌐️ Fetching accrual for order {order_number} from {url}");
        let response = self.send_with_retry(&url).await.map_err(|e| AccrualApiError::RestRequestError(e.to_string()))?;
        let status = response.status();
        match status {
            StatusCode::OK => {
                let body = response.json::<AccrualResponse>().await.map_err(|e| {
                    AccrualApiError::JsonError(format!("Could not decode accrual for order {order_number}. {e}"))
                })?;
                if body.order != order_number {
                    warn!("🌐️ Asked for order {order_number}, but the accrual service answered for {}", body.order);
                }
                trace!("🌐️ Order {order_number} is {} on the accrual service", body.status);
                Ok(AccrualLookup::Registered(body))
            },
            StatusCode::NO_CONTENT => {
                trace!("🌐️ Order {order_number} is not registered with the accrual service");
                Ok(AccrualLookup::NotRegistered)
            },
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER))?;
                debug!("🌐️ Accrual service is throttling requests. Retry after {}s", retry_after.as_secs());
                Ok(AccrualLookup::Throttled { retry_after })
            },
            _ => {
                let message = response.text().await.unwrap_or_default();
                Err(AccrualApiError::QueryError { status: status.as_u16(), message })
            },
        }
    }

    async fn send_with_retry(&self, url: &Url) -> Result<Response, reqwest::Error> {
        (|| async { self.client.get(url.clone()).send().await })
            .retry(self.config.retry.backoff())
            .when(is_retryable)
            .notify(|e, delay| warn!("🌐️ Accrual service request failed ({e}). Retrying in {delay:?}"))
            .await
    }
}

/// Only failures to reach the service are retried. Anything the service actually said is final.
fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}
