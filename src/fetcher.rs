use crate::error::{Error, Result};
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

/// How the fetcher waits between attempts and when it gives up.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// `None` retries forever.
    pub max_retries: Option<u32>,
    pub transport_delay: Duration,
    pub empty_response_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: None,
            transport_delay: Duration::from_secs(5),
            empty_response_delay: Duration::from_secs(10),
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests and local mocks.
    pub fn immediate(max_retries: Option<u32>) -> Self {
        Self {
            max_retries,
            transport_delay: Duration::ZERO,
            empty_response_delay: Duration::ZERO,
            backoff_factor: 1.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based), scaled from `base`.
    pub fn delay_for(&self, base: Duration, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = base.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }

    pub fn allows_retry(&self, retries_so_far: u32) -> bool {
        self.max_retries.is_none_or(|max| retries_so_far < max)
    }

    /// The retry number to use next, or `None` once the budget is spent.
    /// Saturates so an unlimited policy can run indefinitely.
    pub fn next_retry(&self, retries_so_far: u32) -> Option<u32> {
        self.allows_retry(retries_so_far)
            .then(|| retries_so_far.saturating_add(1))
    }
}

enum Failure {
    Transport(reqwest::Error),
    Empty(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Transport(e) => write!(f, "transport failure: {}", e),
            Failure::Empty(reason) => write!(f, "no usable response: {}", reason),
        }
    }
}

/// Issues GET requests and decodes JSON bodies, retrying per [`RetryPolicy`].
#[derive(Clone)]
pub struct RequestFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl RequestFetcher {
    pub fn new(user_agent: &str, timeout: Duration, policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self::with_client(client, policy))
    }

    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// A malformed `url` fails immediately; every other failure is retried
    /// until the policy runs out.
    pub async fn fetch(&self, url: &str, params: &[(&str, String)]) -> Result<Value> {
        let target = Url::parse(url)?;
        let mut retries = 0u32;

        loop {
            let failure = match self.attempt(&target, params).await {
                Ok(body) => return Ok(body),
                Err(failure) => failure,
            };

            let Some(next) = self.policy.next_retry(retries) else {
                let attempts = retries.saturating_add(1);
                log::error!("Giving up on {} after {} attempts", url, attempts);
                return Err(Error::RetriesExhausted {
                    url: url.to_string(),
                    attempts,
                    last_error: failure.to_string(),
                });
            };
            retries = next;

            match &failure {
                Failure::Transport(e) => {
                    log::warn!("Request to {} failed: {}", url, e);
                    let delay = self.policy.delay_for(self.policy.transport_delay, retries);
                    countdown(delay).await;
                }
                Failure::Empty(reason) => {
                    let delay = self
                        .policy
                        .delay_for(self.policy.empty_response_delay, retries);
                    log::warn!(
                        "No response from {} ({}), waiting {:.1}s...",
                        url,
                        reason,
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                }
            }
            log::info!("Retrying {} (retry {}).", url, retries);
        }
    }

    async fn attempt(
        &self,
        url: &Url,
        params: &[(&str, String)],
    ) -> std::result::Result<Value, Failure> {
        let res = self
            .client
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(Failure::Transport)?;

        let status = res.status();
        if !status.is_success() {
            return Err(Failure::Empty(format!("HTTP {}", status)));
        }

        let body = res.text().await.map_err(Failure::Transport)?;
        log::debug!("{} returned {} bytes", url, body.len());
        if body.trim().is_empty() {
            return Err(Failure::Empty("empty body".to_string()));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(Value::Null) => Err(Failure::Empty("null body".to_string())),
            Ok(value) => Ok(value),
            Err(e) => Err(Failure::Empty(format!("undecodable body: {}", e))),
        }
    }
}

async fn countdown(delay: Duration) {
    let whole = delay.as_secs();
    for remaining in (1..=whole).rev() {
        log::info!("Waiting... ({})", remaining);
        sleep(Duration::from_secs(1)).await;
    }
    let rest = delay.saturating_sub(Duration::from_secs(whole));
    if !rest.is_zero() {
        sleep(rest).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_factor_keeps_delay_fixed() {
        let policy = RetryPolicy::default();
        for retry in 1..10 {
            assert_eq!(
                policy.delay_for(policy.transport_delay, retry),
                Duration::from_secs(5)
            );
        }
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
            ..RetryPolicy::default()
        };
        let base = Duration::from_secs(5);
        assert_eq!(policy.delay_for(base, 1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(base, 2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(base, 3), Duration::from_secs(20));
        assert_eq!(policy.delay_for(base, 4), Duration::from_secs(30));
        assert_eq!(policy.delay_for(base, 500), Duration::from_secs(30));
    }

    #[test]
    fn unlimited_policy_always_allows_retry() {
        let policy = RetryPolicy::default();
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(u32::MAX));
    }

    #[test]
    fn bounded_policy_stops_at_limit() {
        let policy = RetryPolicy::immediate(Some(2));
        assert!(policy.allows_retry(0));
        assert!(policy.allows_retry(1));
        assert!(!policy.allows_retry(2));
        assert_eq!(policy.next_retry(1), Some(2));
        assert_eq!(policy.next_retry(2), None);
    }

    #[test]
    fn unlimited_retry_count_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_retry(u32::MAX - 1), Some(u32::MAX));
        assert_eq!(policy.next_retry(u32::MAX), Some(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_waits_the_full_delay() {
        let started = tokio::time::Instant::now();
        countdown(Duration::from_millis(2500)).await;
        assert!(started.elapsed() >= Duration::from_millis(2500));
    }
}
