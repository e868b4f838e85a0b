//! Play-time statistics shown in the parent panel
//!
//! A [`GameStatistic`] records one play session. The parent panel shows the
//! total played time for the selected [`StatisticsTab`] window and today's
//! play time per category against the child's daily limit.
//!
//! Every window ends today, inclusive: daily covers today only, weekly the
//! last 7 days and monthly the last 30.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::services::ChildProfile;

/// Daily limit used when a child's limit is unset
pub const FALLBACK_LIMIT_MINUTES: u32 = 60;

/// One play session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStatistic {
    /// Game name
    pub game: String,
    /// Category of the game, if it has one
    pub category: Option<String>,
    /// Minutes played
    pub play_time_minutes: u32,
    /// Stars earned
    pub stars: u32,
    /// Day the session was played
    pub date: NaiveDate,
}

/// Time window of the statistics tabs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsTab {
    /// Today
    #[default]
    Daily,
    /// The last 7 days
    Weekly,
    /// The last 30 days
    Monthly,
}

impl StatisticsTab {
    /// Tabs in display order
    pub const ALL: [StatisticsTab; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    /// Number of days in the window, today included
    pub fn days(self) -> u64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }

    /// Tab at display position `index`
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// First day of the window ending on `today`
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(self.days() - 1))
            .unwrap_or(NaiveDate::MIN)
    }

    fn contains(self, date: NaiveDate, today: NaiveDate) -> bool {
        date >= self.start(today) && date <= today
    }
}

/// Today's play time in one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    /// Category name
    pub category: String,
    /// Minutes played today
    pub played_minutes: u32,
    /// Today's limit for the child
    pub limit_minutes: u32,
}

/// Minutes played within `tab`'s window
pub fn total_played(stats: &[GameStatistic], tab: StatisticsTab, today: NaiveDate) -> u32 {
    stats
        .iter()
        .filter(|s| tab.contains(s.date, today))
        .map(|s| s.play_time_minutes)
        .sum()
}

/// Minutes played per game within `tab`'s window, by game name
pub fn play_time_by_game(
    stats: &[GameStatistic],
    tab: StatisticsTab,
    today: NaiveDate,
) -> BTreeMap<String, u32> {
    let mut grouped = BTreeMap::new();
    for s in stats.iter().filter(|s| tab.contains(s.date, today)) {
        *grouped.entry(s.game.clone()).or_insert(0) += s.play_time_minutes;
    }
    grouped
}

/// The child's limit for `today`
///
/// Saturday and Sunday use the weekend limit. A zero limit falls back to
/// [`FALLBACK_LIMIT_MINUTES`].
pub fn daily_limit(child: &ChildProfile, today: NaiveDate) -> u32 {
    let limit = match today.weekday() {
        Weekday::Sat | Weekday::Sun => child.weekend_limit_minutes,
        _ => child.weekday_limit_minutes,
    };
    if limit == 0 {
        FALLBACK_LIMIT_MINUTES
    } else {
        limit
    }
}

/// Today's play time per category, sorted by category name
///
/// Sessions of uncategorized games are left out.
pub fn daily_category_summaries(
    stats: &[GameStatistic],
    child: &ChildProfile,
    today: NaiveDate,
) -> Vec<CategorySummary> {
    let limit_minutes = daily_limit(child, today);
    let mut grouped: BTreeMap<&str, u32> = BTreeMap::new();
    for s in stats.iter().filter(|s| s.date == today) {
        if let Some(category) = &s.category {
            *grouped.entry(category.as_str()).or_insert(0) += s.play_time_minutes;
        }
    }
    grouped
        .into_iter()
        .map(|(category, played_minutes)| CategorySummary {
            category: category.to_string(),
            played_minutes,
            limit_minutes,
        })
        .collect()
}
