// src/api_handler.rs

use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking JSON client for one REST service, retrying on HTTP 429.
pub struct ApiHandler {
    client: Client,
    base_url: String,
}

impl ApiHandler {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("snp-prioritizer/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, query);
        let response = self.send_with_retry(&url, query, MAX_ATTEMPTS)?;
        Ok(response.json()?)
    }

    fn send_with_retry(&self, url: &str, query: &[(&str, &str)], max_attempts: u32) -> Result<Response> {
        let mut attempts = 0;

        loop {
            let response = self.client.get(url).query(query).send()?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                attempts += 1;
                if attempts >= max_attempts {
                    bail!("exceeded {} retries for {}", max_attempts, url);
                }
                let wait_time = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!("Rate limited by {}; waiting {}s before retrying", self.base_url, wait_time);
                thread::sleep(Duration::from_secs(wait_time));
                continue;
            }

            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "request to {} failed with status {}: {}",
                url,
                status,
                error_text.trim()
            ));
        }
    }
}
