//! Cached daily prices and the current-hour price.

use std::future::Future;
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use kjeller_providers::{TibberClient, TibberError};
use kjeller_types::{PricePoint, price_at};

use crate::metrics::write_price;

/// Something that can produce today's hourly prices.
pub trait PriceSource {
    fn fetch_today(&self) -> impl Future<Output = Result<Vec<PricePoint>, TibberError>> + Send;
}

impl PriceSource for TibberClient {
    fn fetch_today(&self) -> impl Future<Output = Result<Vec<PricePoint>, TibberError>> + Send {
        TibberClient::fetch_today(self)
    }
}

#[derive(Debug, Default)]
pub struct PriceTracker {
    prices: Option<Vec<PricePoint>>,
    current: Option<f64>,
}

impl PriceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing is cached or the cached list is not for `today`.
    ///
    /// The date of the first slot is taken in the offset Tibber published it
    /// with; `today` is the local date.
    #[must_use]
    pub fn is_stale(&self, today: NaiveDate) -> bool {
        self.prices
            .as_deref()
            .and_then(<[PricePoint]>::first)
            .is_none_or(|first| first.date() != today)
    }

    /// Refetch when stale, then resolve the price for `now`.
    ///
    /// A failed fetch clears the cache so the next cycle tries again; the
    /// current price is then unknown.
    pub async fn refresh<S: PriceSource>(
        &mut self,
        source: &S,
        now: DateTime<FixedOffset>,
        price_file: Option<&Path>,
    ) {
        if self.is_stale(now.date_naive()) {
            match source.fetch_today().await {
                Ok(prices) => self.prices = Some(prices),
                Err(e) => {
                    tracing::error!("Tibber api error {e}");
                    self.prices = None;
                }
            }
        }

        self.current = self
            .prices
            .as_deref()
            .and_then(|prices| price_at(prices, now.with_timezone(&Utc)));

        match self.current {
            Some(price) => {
                tracing::info!("Electricity price {price} KwH");
                if let Some(path) = price_file
                    && let Err(e) = write_price(path, price)
                {
                    tracing::warn!("{e}");
                }
            }
            None => tracing::debug!("No electricity price for the current hour"),
        }
    }

    #[must_use]
    pub fn current_price(&self) -> Option<f64> {
        self.current
    }

    #[must_use]
    pub fn prices(&self) -> Option<&[PricePoint]> {
        self.prices.as_deref()
    }

    /// Whether the current price is at or above `cutoff`.
    ///
    /// An unknown price, a price of exactly zero, or no cut-off never exceed.
    #[must_use]
    #[allow(clippy::float_cmp)] // zero means no published price
    pub fn exceeds_max_price(&self, cutoff: Option<f64>) -> bool {
        let (Some(price), Some(cutoff)) = (self.current, cutoff) else {
            tracing::info!("Tibber price not available or no cut off");
            return false;
        };
        if price == 0.0 {
            tracing::info!("Tibber price not available or no cut off");
            return false;
        }
        price >= cutoff
    }
}
