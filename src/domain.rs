use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Work,
}

impl Category {
    pub const ALL: [Category; 1] = [Category::Work];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Work => "work",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == raw)
            .ok_or_else(|| format!("unknown category: {raw}"))
    }
}

/// Tracked time per calendar date and category.
///
/// Date entries are created lazily by [`DurationLedger::accumulate`], so a
/// date never maps to an empty set of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationLedger {
    days: BTreeMap<NaiveDate, BTreeMap<Category, Duration>>,
}

impl DurationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn accumulate(&mut self, date: NaiveDate, category: Category, delta: Duration) {
        debug_assert!(delta >= Duration::zero(), "negative delta: {delta}");
        let delta = delta.max(Duration::zero());

        let categories = self.days.entry(date).or_default();
        *categories.entry(category).or_insert_with(Duration::zero) += delta;
    }

    pub fn get(&self, date: NaiveDate, category: Category) -> Option<Duration> {
        self.days.get(&date)?.get(&category).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (NaiveDate, Category, Duration)> + '_ {
        self.days.iter().flat_map(|(date, categories)| {
            categories
                .iter()
                .map(move |(category, duration)| (*date, *category, *duration))
        })
    }

    pub fn total_for_day(&self, date: NaiveDate, category: Category) -> Duration {
        self.get(date, category).unwrap_or_else(Duration::zero)
    }

    /// Sum over `first..=last`.
    pub fn total_between(&self, first: NaiveDate, last: NaiveDate, category: Category) -> Duration {
        if last < first {
            return Duration::zero();
        }

        self.days
            .range(first..=last)
            .filter_map(|(_, categories)| categories.get(&category))
            .fold(Duration::zero(), |total, duration| total + *duration)
    }
}

pub fn week_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let week = day.week(Weekday::Mon);
    (week.first_day(), week.last_day())
}

pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(day);
    (first, last)
}
