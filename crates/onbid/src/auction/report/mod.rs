mod summary;
pub mod views;

pub use summary::{
    kpis, map_points, status_share, summarize, top_regions, weekly_trend, CLOSING_SOON_DAYS,
    TOP_REGION_LIMIT,
};
pub use views::{CategoryCount, DashboardSummary, KpiSummary, MapPoint, TierCount, WeeklyCount};
