//! Calendar-day bucketing with running totals.
//!
//! Records are grouped by the UTC date of their timestamp. Within a date
//! order does not matter. The rollup walks dates in ascending order once
//! and carries every measure forward, so for each bucket `i > 0`:
//! `cumulative[i] == cumulative[i - 1] + daily[i]`.
//!
//! Sums are exact [`Decimal`]s. Currency values are rounded only when a
//! response is shaped, never while accumulating.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// UTC calendar date of an instant; the only grouping key
pub fn date_key(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Round a currency amount to cents, half away from zero, always carrying two decimals
pub fn round_currency(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Integral count carried in a measure
pub fn as_count(value: Decimal) -> i64 {
    value.trunc().to_i64().unwrap_or(0)
}

/// Inclusive range of calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// `end - days_back ..= end`, i.e. `days_back + 1` dates; clamps at the
    /// earliest representable date
    pub fn trailing(end: NaiveDate, days_back: u32) -> Self {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days_back)))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, end)
    }

    /// The `days` most recent dates ending at `end`
    pub fn last_days(end: NaiveDate, days: u32) -> Self {
        Self::trailing(end, days.saturating_sub(1))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Midnight UTC of the first date
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn len(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

/// A source record contributing named deltas at one instant
pub trait TimestampedRecord {
    type Measure;

    /// `None` skips the record
    fn timestamp(&self) -> Option<DateTime<Utc>>;

    fn measures(&self) -> Vec<(Self::Measure, Decimal)>;
}

/// One calendar date of a rolled-up series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateBucket<K: Ord> {
    pub date: NaiveDate,
    /// Sums of records on this date; measures without records are absent
    pub daily: BTreeMap<K, Decimal>,
    /// Running totals including this date, for every measure of the series
    pub cumulative: BTreeMap<K, Decimal>,
}

impl<K: Ord> DateBucket<K> {
    pub fn daily(&self, key: &K) -> Decimal {
        self.daily.get(key).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn cumulative(&self, key: &K) -> Decimal {
        self.cumulative.get(key).copied().unwrap_or(Decimal::ZERO)
    }

    /// `YYYY-MM-DD`
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Buckets in ascending date order plus the final running totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateSeries<K: Ord> {
    pub buckets: Vec<DateBucket<K>>,
    pub totals: BTreeMap<K, Decimal>,
}

impl<K: Ord> AggregateSeries<K> {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DateBucket<K>> {
        self.buckets.iter()
    }

    /// Final running total of a measure (its offset when nothing was recorded)
    pub fn total(&self, key: &K) -> Decimal {
        self.totals.get(key).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Folds timestamped deltas into a [`AggregateSeries`].
///
/// A windowed aggregator pre-creates every date of its window and ignores
/// records outside it. A sparse aggregator creates dates as records arrive.
#[derive(Debug, Clone)]
pub struct DateBucketAggregator<K: Ord> {
    window: Option<DateWindow>,
    offsets: BTreeMap<K, Decimal>,
    days: BTreeMap<NaiveDate, BTreeMap<K, Decimal>>,
}

impl<K: Ord + Clone> DateBucketAggregator<K> {
    /// Buckets only for dates that received records
    pub fn sparse() -> Self {
        Self {
            window: None,
            offsets: BTreeMap::new(),
            days: BTreeMap::new(),
        }
    }

    /// Every date of `window`, zero-filled
    pub fn windowed(window: DateWindow) -> Self {
        Self {
            window: Some(window),
            offsets: BTreeMap::new(),
            days: window.dates().map(|d| (d, BTreeMap::new())).collect(),
        }
    }

    /// Starting value of a measure's running total, e.g. entities that
    /// existed before the window began
    pub fn with_offset(mut self, key: K, offset: Decimal) -> Self {
        self.offsets.insert(key, offset);
        self
    }

    pub fn window(&self) -> Option<DateWindow> {
        self.window
    }

    /// Add `delta` to `key` on the date of `at`; `false` when outside the window
    pub fn add(&mut self, at: DateTime<Utc>, key: K, delta: Decimal) -> bool {
        self.add_on(date_key(at), key, delta)
    }

    pub fn add_on(&mut self, date: NaiveDate, key: K, delta: Decimal) -> bool {
        if let Some(window) = &self.window {
            if !window.contains(date) {
                return false;
            }
        }
        *self
            .days
            .entry(date)
            .or_default()
            .entry(key)
            .or_insert(Decimal::ZERO) += delta;
        true
    }

    /// Add every measure of each record; returns how many records landed
    pub fn ingest<R, I>(&mut self, records: I) -> usize
    where
        R: TimestampedRecord<Measure = K>,
        I: IntoIterator<Item = R>,
    {
        let mut accepted = 0;
        for record in records {
            let Some(at) = record.timestamp() else {
                continue;
            };
            let date = date_key(at);
            if self.window.is_some_and(|w| !w.contains(date)) {
                continue;
            }
            for (key, delta) in record.measures() {
                self.add_on(date, key, delta);
            }
            accepted += 1;
        }
        accepted
    }

    /// Single ascending pass producing daily and cumulative values
    pub fn rollup(&self) -> AggregateSeries<K> {
        let keys: BTreeSet<K> = self
            .offsets
            .keys()
            .chain(self.days.values().flat_map(|day| day.keys()))
            .cloned()
            .collect();

        let mut running: BTreeMap<K, Decimal> = keys
            .iter()
            .map(|k| (k.clone(), self.offsets.get(k).copied().unwrap_or(Decimal::ZERO)))
            .collect();

        let mut buckets = Vec::with_capacity(self.days.len());
        for (date, day) in &self.days {
            for (key, total) in running.iter_mut() {
                if let Some(delta) = day.get(key) {
                    *total += *delta;
                }
            }
            buckets.push(DateBucket {
                date: *date,
                daily: day.clone(),
                cumulative: running.clone(),
            });
        }

        AggregateSeries {
            buckets,
            totals: running,
        }
    }
}
