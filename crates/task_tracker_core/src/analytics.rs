//! crates/task_tracker_core/src/analytics.rs
//!
//! Turns an owner's task history into the three analytics views: the
//! overview card, the per-day productivity series and the category
//! breakdown. Every view is recomputed from the store on each call.

use std::collections::HashMap;

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use crate::domain::{CategoryBucket, Overview, ProductivityPoint};
use crate::ports::{PortResult, TaskStore};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("An analytics window must cover at least one day")]
    EmptyWindow,
    #[error("Window starts on {start} but ends on {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
    #[error("Window falls outside the supported calendar range")]
    OutOfRange,
}

//=========================================================================================
// Day Arithmetic
//=========================================================================================

/// The calendar day `ts` falls on under `offset`.
pub fn local_date(ts: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Inclusive UTC bounds of a local calendar day: midnight up to one
/// microsecond before the next midnight.
pub fn day_bounds(day: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = day.and_time(NaiveTime::MIN);
    let start = Utc.from_utc_datetime(
        &(local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))),
    );
    let end = start + Duration::days(1) - Duration::microseconds(1);
    (start, end)
}

/// Rounds `part / whole` to a whole percentage, half-up, capped at 100.
/// An empty `whole` yields 0.
pub fn completion_rate(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rate = (part as f64 / whole as f64 * 100.0).round();
    rate.min(100.0) as u8
}

//=========================================================================================
// Window
//=========================================================================================

/// An inclusive, day-aligned range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    first_day: NaiveDate,
    last_day: NaiveDate,
    offset: FixedOffset,
}

impl Window {
    /// Covers `first_day` through `last_day` under `offset`.
    pub fn new(
        first_day: NaiveDate,
        last_day: NaiveDate,
        offset: FixedOffset,
    ) -> Result<Self, WindowError> {
        if first_day > last_day {
            return Err(WindowError::Inverted {
                start: first_day,
                end: last_day,
            });
        }
        let (start, _) = day_bounds(first_day, offset);
        let (_, end) = day_bounds(last_day, offset);
        Ok(Self {
            start,
            end,
            first_day,
            last_day,
            offset,
        })
    }

    /// The `days` trailing calendar days ending with the day `now` falls on.
    pub fn trailing_days(
        days: u32,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Self, WindowError> {
        if days == 0 {
            return Err(WindowError::EmptyWindow);
        }
        let today = local_date(now, offset);
        let first_day = today
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or(WindowError::OutOfRange)?;
        Self::new(first_day, today, offset)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }

    /// `ceil((end - start) in days)`, never less than one.
    pub fn span_days(&self) -> f64 {
        let millis = (self.end - self.start).num_milliseconds() as f64;
        (millis / MILLIS_PER_DAY).ceil().max(1.0)
    }

    /// Every calendar day in the window, oldest first. The iterator is
    /// lazy and can be cloned to restart from the same position.
    pub fn days(&self) -> DayRange {
        DayRange {
            next: Some(self.first_day),
            last: self.last_day,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DayRange {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for DayRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let day = self.next.filter(|day| *day <= self.last)?;
        self.next = day.succ_opt();
        Some(day)
    }
}

//=========================================================================================
// Aggregator
//=========================================================================================

/// Computes analytics for one owner against any [`TaskStore`].
///
/// Holds no state of its own; calling the same view twice against an
/// unchanged store gives the same answer.
pub struct Analytics<'a> {
    store: &'a dyn TaskStore,
    offset: FixedOffset,
}

impl<'a> Analytics<'a> {
    pub fn new(store: &'a dyn TaskStore, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    pub fn trailing_window(&self, days: u32, now: DateTime<Utc>) -> Result<Window, WindowError> {
        Window::trailing_days(days, now, self.offset)
    }

    /// Window-scoped creation and completion totals, the global active
    /// count, and the streak as of `now`.
    pub async fn overview(
        &self,
        owner: Uuid,
        window: &Window,
        now: DateTime<Utc>,
    ) -> PortResult<Overview> {
        let tasks_created = self
            .store
            .count_created_between(owner, window.start(), window.end())
            .await?;
        let tasks_completed = self
            .store
            .count_completed_between(owner, window.start(), window.end())
            .await?;
        // Deliberately not windowed.
        let active_tasks = self.store.count_active(owner).await?;
        let streak = self.streak(owner, now).await?;

        let average_per_day = (tasks_created as f64 / window.span_days() * 10.0).round() / 10.0;

        Ok(Overview {
            tasks_created,
            tasks_completed,
            active_tasks,
            completion_rate: completion_rate(tasks_completed, tasks_created),
            streak,
            average_per_day,
        })
    }

    /// One point per day of the window, built from a single ranged fetch.
    pub async fn productivity(
        &self,
        owner: Uuid,
        window: &Window,
    ) -> PortResult<Vec<ProductivityPoint>> {
        let activity = self
            .store
            .list_activity_between(owner, window.start(), window.end())
            .await?;

        let mut created: HashMap<NaiveDate, u64> = HashMap::new();
        let mut completed: HashMap<NaiveDate, u64> = HashMap::new();
        for item in activity {
            if window.contains(item.created_at) {
                *created
                    .entry(local_date(item.created_at, window.offset()))
                    .or_default() += 1;
            }
            if let Some(completed_at) = item.completed_at.filter(|ts| window.contains(*ts)) {
                *completed
                    .entry(local_date(completed_at, window.offset()))
                    .or_default() += 1;
            }
        }

        let points = window
            .days()
            .map(|day| {
                let created = created.get(&day).copied().unwrap_or(0);
                let completed = completed.get(&day).copied().unwrap_or(0);
                ProductivityPoint {
                    date: day,
                    label: day.format("%b %d").to_string(),
                    created,
                    completed,
                    completion_rate: completion_rate(completed, created),
                }
            })
            .collect();
        Ok(points)
    }

    /// Categories of tasks created in the window, largest first.
    pub async fn categories(
        &self,
        owner: Uuid,
        window: &Window,
    ) -> PortResult<Vec<CategoryBucket>> {
        let counts = self
            .store
            .category_counts_between(owner, window.start(), window.end())
            .await?;

        let mut buckets: Vec<CategoryBucket> = counts
            .into_iter()
            .filter(|c| c.count > 0 && !c.category.is_empty())
            .map(|c| CategoryBucket {
                completion_rate: completion_rate(c.completed, c.count),
                category: c.category,
                count: c.count,
                completed: c.completed,
            })
            .collect();
        // Stable, so equal counts keep the store's first-seen order.
        buckets.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(buckets)
    }

    /// Consecutive days with at least one completion, counting back from
    /// today. A day without completions today means a streak of zero.
    pub async fn streak(&self, owner: Uuid, now: DateTime<Utc>) -> PortResult<u32> {
        let mut streak = 0;
        let mut cursor = local_date(now, self.offset);
        loop {
            let done = self
                .store
                .count_completed_on_day(owner, cursor, self.offset)
                .await?;
            if done == 0 {
                break;
            }
            streak += 1;
            match cursor.pred_opt() {
                Some(prev) => cursor = prev,
                None => break,
            }
        }
        Ok(streak)
    }
}
