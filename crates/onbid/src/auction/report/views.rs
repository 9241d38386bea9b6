use super::super::domain::PriorityTier;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierCount {
    pub tier: PriorityTier,
    pub tier_label: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub count: usize,
    pub amount_total: f64,
    /// Mean over rows that have a ratio; absent when none do.
    pub average_min_ratio: Option<f64>,
    pub closing_soon: usize,
    pub tiers: Vec<TierCount>,
    pub linked: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyCount {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub case_id: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub kpis: KpiSummary,
    pub status_share: Vec<CategoryCount>,
    pub top_regions: Vec<CategoryCount>,
    pub weekly_trend: Vec<WeeklyCount>,
    pub map_points: Vec<MapPoint>,
}
