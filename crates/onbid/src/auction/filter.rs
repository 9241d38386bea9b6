use super::domain::{CaseRow, DateRange, PriorityTier};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Selector value meaning "no restriction" for single-choice filters.
pub const ALL: &str = "전체";

/// Conjunction of the sidebar predicates. Every field left at its default is
/// inactive and matches all rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFilter {
    pub region: Option<String>,
    pub auction_type: Option<String>,
    pub status: Option<String>,
    /// Case-insensitive substring of the assigned officer.
    pub officer: Option<String>,
    pub stages: Vec<String>,
    pub tiers: Vec<PriorityTier>,
    /// Rows without a bid deadline always pass.
    pub max_due_days: Option<i64>,
    pub date_range: Option<DateRange>,
}

impl CaseFilter {
    pub fn matches(&self, row: &CaseRow) -> bool {
        let record = &row.record;

        if !selector_matches(self.region.as_deref(), &record.region)
            || !selector_matches(self.auction_type.as_deref(), &record.auction_type)
            || !selector_matches(self.status.as_deref(), &record.status)
        {
            return false;
        }

        if let Some(needle) = self.officer_needle() {
            let matched = record
                .officer
                .as_deref()
                .is_some_and(|officer| officer.to_lowercase().contains(&needle));
            if !matched {
                return false;
            }
        }

        if !self.stages.is_empty() && !self.stages.iter().any(|stage| stage == &record.stage) {
            return false;
        }

        if !self.tiers.is_empty() && !self.tiers.contains(&row.priority_tier) {
            return false;
        }

        if let (Some(limit), Some(due)) = (self.max_due_days, row.due_days) {
            if due > limit {
                return false;
            }
        }

        if let Some(range) = &self.date_range {
            if let Some(from) = range.from {
                if !record.bid_start.is_some_and(|start| start >= from) {
                    return false;
                }
            }
            if let Some(to) = range.to {
                if !record.bid_end.is_some_and(|end| end <= to) {
                    return false;
                }
            }
        }

        true
    }

    pub fn apply<'a>(&self, rows: &'a [CaseRow]) -> Vec<&'a CaseRow> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }

    pub fn active_predicates(&self) -> usize {
        [
            is_selector_active(self.region.as_deref()),
            is_selector_active(self.auction_type.as_deref()),
            is_selector_active(self.status.as_deref()),
            self.officer_needle().is_some(),
            !self.stages.is_empty(),
            !self.tiers.is_empty(),
            self.max_due_days.is_some(),
            self.date_range.is_some(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    fn officer_needle(&self) -> Option<String> {
        self.officer
            .as_deref()
            .filter(|needle| !needle.trim().is_empty())
            .map(str::to_lowercase)
    }
}

fn is_selector_active(selected: Option<&str>) -> bool {
    selected
        .map(str::trim)
        .is_some_and(|value| !value.is_empty() && value != ALL)
}

fn selector_matches(selected: Option<&str>, value: &str) -> bool {
    match selected.map(str::trim) {
        Some(wanted) if is_selector_active(Some(wanted)) => wanted == value,
        _ => true,
    }
}

/// Column the results table is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    BidStart,
    BidEnd,
    AmountTotal,
    PriorityScore,
    DueDays,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bid_start" | "start_date" => Ok(Self::BidStart),
            "bid_end" | "end_date" => Ok(Self::BidEnd),
            "amount_total" | "amount" => Ok(Self::AmountTotal),
            "priority_score" | "score" => Ok(Self::PriorityScore),
            "due_days" => Ok(Self::DueDays),
            other => Err(format!("cannot sort by '{other}'")),
        }
    }
}

impl SortKey {
    fn value(self, row: &CaseRow) -> Option<f64> {
        match self {
            Self::BidStart => row.record.bid_start.map(day_number),
            Self::BidEnd => row.record.bid_end.map(day_number),
            Self::AmountTotal => Some(row.record.amount_total),
            Self::PriorityScore => Some(row.priority_score),
            Self::DueDays => row.due_days.map(|days| days as f64),
        }
    }
}

fn day_number(date: chrono::NaiveDate) -> f64 {
    f64::from(chrono::Datelike::num_days_from_ce(&date))
}

/// Stable sort of a view; missing values go last in either direction.
pub fn sort_rows(rows: &mut [&CaseRow], key: SortKey, descending: bool) {
    rows.sort_by(|left, right| match (key.value(left), key.value(right)) {
        (Some(a), Some(b)) => {
            let ordering = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
