use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A recipe picked fewer than this many days ago counts as recently eaten.
pub const RECENT_WINDOW_DAYS: i64 = 7;

pub const DEFAULT_MIN_SUGGESTIONS: usize = 5;
pub const DEFAULT_MAX_SUGGESTIONS: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub category: String,
}

impl Recipe {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
        }
    }
}

/// One row of the pick history.
///
/// `date` is `None` when the stored value could not be parsed. `category` is
/// `None` when the row was saved without one; see
/// [`crate::history::backfill_categories`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: Option<NaiveDate>,
    pub recipe: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
}

impl HistoryEntry {
    pub fn new(date: NaiveDate, recipe: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            date: Some(date),
            recipe: recipe.into(),
            category: Some(category.into()),
        }
    }
}

/// A catalog recipe joined with its most recent pick.
///
/// `last_eaten` and `days_since` are both `None` for a recipe that was never
/// picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub category: String,
    pub last_eaten: Option<NaiveDate>,
    pub days_since: Option<i64>,
}

impl Candidate {
    #[must_use]
    pub fn from_recipe(recipe: &Recipe, last_eaten: Option<NaiveDate>, today: NaiveDate) -> Self {
        Self {
            name: recipe.name.clone(),
            category: recipe.category.clone(),
            last_eaten,
            days_since: last_eaten.map(|d| days_between(d, today)),
        }
    }

    #[must_use]
    pub fn is_recent(&self) -> bool {
        self.days_since.is_some_and(|d| d < RECENT_WINDOW_DAYS)
    }

    /// Sort key where larger means "longer since eaten". Never-eaten ranks highest.
    #[must_use]
    pub fn staleness(&self) -> i64 {
        self.days_since.unwrap_or(i64::MAX)
    }
}

/// A history row prepared for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryView {
    pub date: Option<NaiveDate>,
    pub recipe: String,
    pub category: Option<String>,
    pub days_ago: Option<i64>,
}

/// How many suggestions to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecommendOptions {
    min_count: usize,
    max_count: usize,
}

impl RecommendOptions {
    pub fn new(min_count: usize, max_count: usize) -> Result<Self> {
        if min_count == 0 {
            bail!("Minimum suggestion count must be at least 1");
        }
        if min_count > max_count {
            bail!("Minimum suggestion count ({min_count}) exceeds maximum ({max_count})");
        }
        Ok(Self {
            min_count,
            max_count,
        })
    }

    #[must_use]
    pub fn min_count(&self) -> usize {
        self.min_count
    }

    #[must_use]
    pub fn max_count(&self) -> usize {
        self.max_count
    }
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            min_count: DEFAULT_MIN_SUGGESTIONS,
            max_count: DEFAULT_MAX_SUGGESTIONS,
        }
    }
}

/// Named windows for browsing history. Weeks start on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryRange {
    #[default]
    All,
    CurrentWeek,
    PreviousWeek,
    CurrentMonth,
    PreviousMonth,
}

pub const HISTORY_RANGES: &[&str] = &[
    "all",
    "current-week",
    "previous-week",
    "current-month",
    "previous-month",
];

impl HistoryRange {
    /// Inclusive date window relative to `today`, or `None` for [`HistoryRange::All`].
    #[must_use]
    pub fn bounds(self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let month_start = today - Duration::days(i64::from(today.day0()));
        match self {
            Self::All => None,
            Self::CurrentWeek => Some((week_start, today)),
            Self::PreviousWeek => Some((
                week_start - Duration::days(7),
                week_start - Duration::days(1),
            )),
            Self::CurrentMonth => Some((month_start, today)),
            Self::PreviousMonth => {
                let prev_end = month_start - Duration::days(1);
                let prev_start = prev_end - Duration::days(i64::from(prev_end.day0()));
                Some((prev_start, prev_end))
            }
        }
    }

    #[must_use]
    pub fn contains(self, date: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (self.bounds(today), date) {
            (None, _) => true,
            (Some((start, end)), Some(d)) => d >= start && d <= end,
            (Some(_), None) => false,
        }
    }
}

impl FromStr for HistoryRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "all" => Ok(Self::All),
            "current-week" | "week" => Ok(Self::CurrentWeek),
            "previous-week" | "last-week" => Ok(Self::PreviousWeek),
            "current-month" | "month" => Ok(Self::CurrentMonth),
            "previous-month" | "last-month" => Ok(Self::PreviousMonth),
            _ => bail!(
                "Invalid history range '{s}'. Must be one of: {}",
                HISTORY_RANGES.join(", ")
            ),
        }
    }
}

/// Whole days from `date` to `today`; negative when `date` is in the future.
#[must_use]
pub fn days_between(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days()
}

/// Lookup key for recipe names and categories: trimmed and lowercased.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[must_use]
pub fn same_name(a: &str, b: &str) -> bool {
    name_key(a) == name_key(b)
}
