//! Hourly electricity prices.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta, Utc};

/// Length of one price slot in minutes.
pub const PRICE_SLOT_MINUTES: i64 = 60;

fn slot_length() -> TimeDelta {
    TimeDelta::minutes(PRICE_SLOT_MINUTES)
}

/// Total price (energy + tax) for one hour starting at `starts_at`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub total: f64,
    pub starts_at: DateTime<FixedOffset>,
}

impl PricePoint {
    #[must_use]
    pub const fn new(total: f64, starts_at: DateTime<FixedOffset>) -> Self {
        Self { total, starts_at }
    }

    /// `starts_at <= instant < starts_at + 1h`.
    #[must_use]
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        let start = self.starts_at.with_timezone(&Utc);
        start <= instant && instant < start + slot_length()
    }

    /// Calendar date of the slot in the offset the price was published with.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.starts_at.date_naive()
    }
}

/// Returns the total of the slot covering `instant`, if any.
#[must_use]
pub fn price_at(prices: &[PricePoint], instant: DateTime<Utc>) -> Option<f64> {
    prices.iter().find(|p| p.covers(instant)).map(|p| p.total)
}

/// Predict whether the consumption for the current hour will reach
/// `max_hourly` if `current` (kW) keeps running for the rest of the hour.
///
/// `minute` is the minute of the current hour (0-59).
#[must_use]
pub fn predict_hourly_consumption(
    accumulated: f64,
    current: f64,
    max_hourly: f64,
    minute: u32,
) -> bool {
    let remaining = f64::from(60_u32.saturating_sub(minute)) / 60.0;
    accumulated + current * remaining >= max_hourly
}
