//! SNS subscription confirmation.
//!
//! When a topic subscription is created SNS posts a `SubscriptionConfirmation`
//! envelope whose `SubscribeURL` must be fetched once to activate delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;

use bounce_common::error::AppError;

/// Issues the one-shot confirmation request.
#[async_trait]
pub trait SubscriptionConfirmer: Send + Sync {
    async fn confirm(&self, url: &str) -> Result<(), AppError>;
}

/// Confirms subscriptions with a plain GET, discarding the response body.
#[derive(Debug, Clone)]
pub struct HttpConfirmer {
    client: reqwest::Client,
}

impl HttpConfirmer {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SubscriptionConfirmer for HttpConfirmer {
    async fn confirm(&self, url: &str) -> Result<(), AppError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Confirmation(e.to_string()))?;

        tracing::info!(url, status = %response.status(), "Subscription confirmation sent");
        Ok(())
    }
}

/// Whether `url` points at `domain` or one of its subdomains.
pub fn is_trusted_url(url: &str, domain: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    let host = host.to_ascii_lowercase();
    let domain = domain.trim_start_matches('.').to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}
