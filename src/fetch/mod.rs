use std::{num::NonZeroU32, sync::OnceLock, time::Duration};

use async_trait::async_trait;
use governor::{
    clock::{QuantaClock, QuantaInstant},
    middleware::NoOpMiddleware,
    state::InMemoryState,
};
use reqwest::{Client, StatusCode};
use tracing::{instrument, Level};
use url::Url;

use crate::{cache::Credentials, config::Config, error::Error};

/// Source of raw infoscreen pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &Url, credentials: &Credentials) -> crate::Result<String>;
}

pub fn make_client(config: &Config) -> crate::Result<Client> {
    Ok(Client::builder()
        .gzip(true)
        .timeout(config.fetch_timeout())
        .build()?)
}

/// The infoscreen url with the query that selects days and the news column.
pub fn infoscreen_url(config: &Config) -> crate::Result<Url> {
    let mut url = Url::parse(&config.base_url)?;
    url.query_pairs_mut()
        .append_pair("type", "student")
        .append_pair("days", &config.days.to_string())
        .append_pair("future", "0")
        .append_pair("news", if config.show_news { "1" } else { "0" })
        .append_pair("ticker", "anfang")
        .append_pair("absent", "")
        .append_pair("absent2", "1");
    Ok(url)
}

static RATE_LIMIT: u32 = 5;
static DELAY_JITTER: u64 = 1;
static RATE_LIMITER: OnceLock<
    governor::RateLimiter<
        governor::state::NotKeyed,
        InMemoryState,
        QuantaClock,
        NoOpMiddleware<QuantaInstant>,
    >,
> = OnceLock::new();

#[async_trait]
impl PageFetcher for Client {
    #[instrument(skip(self, url, credentials), fields(
        user = %credentials.username(),
    ), level = Level::TRACE)]
    async fn fetch_page(&self, url: &Url, credentials: &Credentials) -> crate::Result<String> {
        let rate_limiter = RATE_LIMITER.get_or_init(|| {
            governor::RateLimiter::direct(governor::Quota::per_second(
                NonZeroU32::new(RATE_LIMIT).unwrap_or(NonZeroU32::MIN),
            ))
        });
        let retry_jitter = governor::Jitter::new(Duration::ZERO, Duration::from_secs(DELAY_JITTER));
        rate_limiter.until_ready_with_jitter(retry_jitter).await;

        let start = std::time::Instant::now();
        let res = self
            .get(url.clone())
            .basic_auth(credentials.username(), Some(credentials.password()))
            .send()
            .await?;
        match res.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                log::warn!("Infoscreen rejected credentials of {}", credentials.username());
                return Err(Error::Unauthorized);
            }
            status => {
                log::error!("Failed to fetch infoscreen: {status}");
                return Err(Error::Status(status));
            }
        }
        let text = res.text().await?;
        log::trace!("Got text of infoscreen page in \t {:?}", start.elapsed());
        Ok(text)
    }
}
