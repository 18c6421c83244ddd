use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER},
    Client,
    StatusCode,
};

use crate::{
    accrual::{AccrualError, AccrualQueryResult},
    db_types::OrderNumber,
    traits::AccrualOracle,
};

/// An HTTP client for the accrual system.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct AccrualClient {
    base_url: String,
    client: Client,
}

impl AccrualClient {
    /// Creates a new client for the accrual system at `base_url`. A bare `host:port` is given an `http://` scheme,
    /// and trailing slashes are dropped.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AccrualError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent("Gophermart Order Poller")
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| AccrualError::Initialization(e.to_string()))?;
        let base_url = normalize_base_url(base_url);
        if base_url.is_empty() {
            return Err(AccrualError::Initialization("The accrual system address is empty".to_string()));
        }
        debug!("🛰️ Accrual client will query {base_url}");
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn order_url(&self, number: OrderNumber) -> String {
        format!("{}/api/orders/{number}", self.base_url)
    }

    /// Asks the accrual system for the status of a single order.
    pub async fn fetch_order_status(&self, number: OrderNumber) -> Result<AccrualQueryResult, AccrualError> {
        let url = self.order_url(number);
        trace!("🛰️ GET {url}");
        let res = self.client.get(url).send().await?;
        let status = res.status();
        match status {
            StatusCode::OK => {
                let result = res.json::<AccrualQueryResult>().await?;
                if result.order != number {
                    warn!("🛰️ Asked for order {number}, but the accrual system answered for {}", result.order);
                    return Err(AccrualError::InvalidResponse(format!(
                        "Response is for order {}, not {number}",
                        result.order
                    )));
                }
                trace!("🛰️ Order {number} is {} with accrual {:?}", result.status, result.accrual);
                Ok(result)
            },
            StatusCode::NO_CONTENT => Err(AccrualError::NoContent),
            StatusCode::NOT_FOUND => Err(AccrualError::NotFound),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = res.headers().get(RETRY_AFTER).and_then(|v| v.to_str().ok()).and_then(parse_retry_after);
                debug!("🛰️ Rate limited while querying order {number}. Retry after: {retry_after:?}");
                Err(AccrualError::RateLimited(retry_after))
            },
            other => {
                let body = res.text().await.unwrap_or_default();
                debug!("🛰️ Accrual system returned {other} for order {number}. {body}");
                Err(AccrualError::Internal(other.as_u16()))
            },
        }
    }
}

impl AccrualOracle for AccrualClient {
    async fn query(&self, number: OrderNumber) -> Result<AccrualQueryResult, AccrualError> {
        self.fetch_order_status(number).await
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Parses the value of a `Retry-After` header, which is either a number of seconds or an HTTP date.
///
/// Dates in the past give a zero delay. Anything unparsable gives `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let delay = (date - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    Some(delay)
}
