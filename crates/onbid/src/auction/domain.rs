use super::parser::format_number;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentinel for categorical columns that were absent or blank in the source.
pub const UNSPECIFIED: &str = "미지정";

pub const ASSET_REAL_ESTATE: &str = "부동산";
pub const ASSET_DEPOSIT: &str = "예금";
pub const ASSET_VEHICLE: &str = "차량";
pub const ASSET_OTHER: &str = "기타";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriorityTier {
    A,
    B,
    C,
}

impl PriorityTier {
    pub const fn ordered() -> [Self; 3] {
        [Self::A, Self::B, Self::C]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown priority tier '{0}' (expected A, B or C)")]
pub struct UnknownTier(pub String);

impl FromStr for PriorityTier {
    type Err = UnknownTier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            _ => Err(UnknownTier(value.to_string())),
        }
    }
}

/// Whether the joiner found an auction listing for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Linked,
    Unlinked,
}

impl MatchStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Linked => "linked",
            Self::Unlinked => "unlinked",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "linked" => Some(Self::Linked),
            "unlinked" => Some(Self::Unlinked),
            _ => None,
        }
    }
}

/// Inclusive date window; an absent side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<Self> {
        (from.is_some() || to.is_some()).then_some(Self { from, to })
    }
}

/// One delinquency/auction case with every expected column present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub name_masked: String,
    pub officer: Option<String>,
    pub region: String,
    pub district: String,
    pub stage: String,
    pub auction_type: String,
    pub status: String,
    pub amount_total: f64,
    pub amount_penalty: Option<f64>,
    pub asset_flag: String,
    pub delinquent_since: Option<NaiveDate>,
    pub bid_start: Option<NaiveDate>,
    pub bid_end: Option<NaiveDate>,
    pub appraisal_price: Option<f64>,
    pub min_bid_price: Option<f64>,
    pub address: String,
    pub source_url: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub match_status: Option<MatchStatus>,
}

/// A case record plus the fields derived from it for one evaluation date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRow {
    #[serde(flatten)]
    pub record: CaseRecord,
    pub days_delinquent: Option<i64>,
    pub due_days: Option<i64>,
    pub min_ratio: Option<f64>,
    pub penalty_ratio: Option<f64>,
    pub collectability_proxy: f64,
    pub priority_score: f64,
    pub priority_tier: PriorityTier,
}

impl CaseRow {
    /// Display value of a named column, `None` for unknown columns and an
    /// empty string for missing values.
    pub fn column_value(&self, column: &str) -> Option<String> {
        let record = &self.record;
        let value = match column {
            "case_id" => record.case_id.clone(),
            "name_masked" => record.name_masked.clone(),
            "officer" => record.officer.clone().unwrap_or_default(),
            "region" => record.region.clone(),
            "district" => record.district.clone(),
            "stage" => record.stage.clone(),
            "auction_type" => record.auction_type.clone(),
            "status" => record.status.clone(),
            "amount_total" => format_number(record.amount_total),
            "amount_penalty" => optional_number(record.amount_penalty),
            "asset_flag" => record.asset_flag.clone(),
            "delinquent_since" => optional_date(record.delinquent_since),
            "bid_start" => optional_date(record.bid_start),
            "bid_end" => optional_date(record.bid_end),
            "appraisal_price" => optional_number(record.appraisal_price),
            "min_bid_price" => optional_number(record.min_bid_price),
            "address" => record.address.clone(),
            "source_url" => record.source_url.clone(),
            "lat" => optional_number(record.lat),
            "lon" => optional_number(record.lon),
            "match_status" => record
                .match_status
                .map(|status| status.label().to_string())
                .unwrap_or_default(),
            "days_delinquent" => self
                .days_delinquent
                .map(|days| days.to_string())
                .unwrap_or_default(),
            "due_days" => self.due_days.map(|days| days.to_string()).unwrap_or_default(),
            "min_ratio" => optional_number(self.min_ratio),
            "penalty_ratio" => optional_number(self.penalty_ratio),
            "collectability_proxy" => format_number(self.collectability_proxy),
            "priority_score" => format_number(self.priority_score),
            "priority_tier" => self.priority_tier.label().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

fn optional_number(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

fn optional_date(value: Option<NaiveDate>) -> String {
    value
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_parse_case_insensitively() {
        assert_eq!("a".parse::<PriorityTier>(), Ok(PriorityTier::A));
        assert_eq!(" C ".parse::<PriorityTier>(), Ok(PriorityTier::C));
        assert!("D".parse::<PriorityTier>().is_err());
    }

    #[test]
    fn date_range_requires_at_least_one_bound() {
        assert!(DateRange::new(None, None).is_none());
        let to = NaiveDate::from_ymd_opt(2025, 6, 30);
        assert_eq!(
            DateRange::new(None, to),
            Some(DateRange { from: None, to })
        );
    }
}
