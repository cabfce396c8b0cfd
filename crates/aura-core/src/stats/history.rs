//! Per-day completion counters and the weekly/monthly views built on them.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Net task completions per day. Entries are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(BTreeMap<NaiveDate, u32>);

/// Two aligned series for a chart: the current period and the one before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSeries {
    pub labels: Vec<&'static str>,
    pub current: Vec<u32>,
    pub previous: Vec<u32>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate) -> u32 {
        self.0.get(&date).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.0.iter().map(|(d, c)| (*d, *c))
    }

    /// Add one completion on `date`; returns the new count.
    pub fn increment(&mut self, date: NaiveDate) -> u32 {
        let count = self.0.entry(date).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Remove one completion on `date`, floored at zero; returns the new count.
    pub fn decrement(&mut self, date: NaiveDate) -> u32 {
        let count = self.0.entry(date).or_insert(0);
        *count = count.saturating_sub(1);
        *count
    }

    /// Monday-to-Sunday counts for the week containing `today` and the week before.
    pub fn weekly(&self, today: NaiveDate) -> PeriodSeries {
        let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let current = (0..7)
            .map(|i| self.get(monday + Duration::days(i)))
            .collect();
        let previous = (0..7)
            .map(|i| self.get(monday + Duration::days(i - 7)))
            .collect();
        PeriodSeries {
            labels: WEEKDAY_LABELS.to_vec(),
            current,
            previous,
        }
    }

    /// January-to-December totals for the year of `today` and the year before.
    pub fn monthly(&self, today: NaiveDate) -> PeriodSeries {
        let year = today.year();
        let mut current = vec![0u32; 12];
        let mut previous = vec![0u32; 12];
        for (date, count) in self.iter() {
            let month = date.month0() as usize;
            if date.year() == year {
                current[month] = current[month].saturating_add(count);
            } else if date.year() == year - 1 {
                previous[month] = previous[month].saturating_add(count);
            }
        }
        PeriodSeries {
            labels: MONTH_LABELS.to_vec(),
            current,
            previous,
        }
    }

    /// Consecutive positive days ending today, or ending yesterday when
    /// nothing has been completed yet today.
    pub fn current_run(&self, today: NaiveDate) -> u32 {
        let mut day = if self.get(today) > 0 {
            today
        } else {
            today - Duration::days(1)
        };
        let mut run = 0;
        while self.get(day) > 0 {
            run += 1;
            day -= Duration::days(1);
        }
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn decrement_floors_at_zero() {
        let mut h = History::new();
        let d = date(2024, 1, 1);
        assert_eq!(h.decrement(d), 0);
        assert_eq!(h.increment(d), 1);
        assert_eq!(h.decrement(d), 0);
        assert_eq!(h.decrement(d), 0);
    }

    #[test]
    fn serializes_as_date_keyed_map() {
        let mut h = History::new();
        h.increment(date(2024, 1, 2));
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"2024-01-02":1}"#);
        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn weekly_aligns_on_monday() {
        let mut h = History::new();
        // 2024-01-03 is a Wednesday.
        h.increment(date(2024, 1, 3));
        h.increment(date(2024, 1, 3));
        h.increment(date(2023, 12, 25)); // previous Monday
        let series = h.weekly(date(2024, 1, 5));
        assert_eq!(series.current, vec![0, 0, 2, 0, 0, 0, 0]);
        assert_eq!(series.previous, vec![1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(series.labels[0], "Mon");
    }

    #[test]
    fn monthly_splits_years() {
        let mut h = History::new();
        h.increment(date(2024, 2, 10));
        h.increment(date(2023, 2, 11));
        h.increment(date(2022, 2, 11));
        let series = h.monthly(date(2024, 6, 1));
        assert_eq!(series.current[1], 1);
        assert_eq!(series.previous[1], 1);
        assert_eq!(series.current.iter().sum::<u32>(), 1);
    }

    #[test]
    fn current_run_counts_back_from_yesterday() {
        let mut h = History::new();
        h.increment(date(2024, 1, 1));
        h.increment(date(2024, 1, 2));
        assert_eq!(h.current_run(date(2024, 1, 3)), 2);
        h.increment(date(2024, 1, 3));
        assert_eq!(h.current_run(date(2024, 1, 3)), 3);
        assert_eq!(h.current_run(date(2024, 1, 5)), 0);
    }
}
