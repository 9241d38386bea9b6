use super::super::domain::{CaseRow, MatchStatus, PriorityTier};
use super::super::parser::round_to;
use super::views::{CategoryCount, DashboardSummary, KpiSummary, MapPoint, TierCount, WeeklyCount};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

/// Rows whose bid closes within this many days (inclusive) count as closing soon.
pub const CLOSING_SOON_DAYS: i64 = 7;
pub const TOP_REGION_LIMIT: usize = 10;

pub fn summarize(rows: &[&CaseRow]) -> DashboardSummary {
    DashboardSummary {
        kpis: kpis(rows),
        status_share: status_share(rows),
        top_regions: top_regions(rows),
        weekly_trend: weekly_trend(rows),
        map_points: map_points(rows),
    }
}

pub fn kpis(rows: &[&CaseRow]) -> KpiSummary {
    let ratios: Vec<f64> = rows.iter().filter_map(|row| row.min_ratio).collect();
    let average_min_ratio =
        (!ratios.is_empty()).then(|| round_to(ratios.iter().sum::<f64>() / ratios.len() as f64, 4));

    let tiers = PriorityTier::ordered()
        .into_iter()
        .map(|tier| TierCount {
            tier,
            tier_label: tier.label(),
            count: rows.iter().filter(|row| row.priority_tier == tier).count(),
        })
        .collect();

    KpiSummary {
        count: rows.len(),
        amount_total: rows.iter().map(|row| row.record.amount_total).sum(),
        average_min_ratio,
        closing_soon: rows
            .iter()
            .filter(|row| row.due_days.is_some_and(|due| (0..=CLOSING_SOON_DAYS).contains(&due)))
            .count(),
        tiers,
        linked: rows
            .iter()
            .filter(|row| row.record.match_status == Some(MatchStatus::Linked))
            .count(),
    }
}

pub fn status_share(rows: &[&CaseRow]) -> Vec<CategoryCount> {
    ranked_counts(rows.iter().map(|row| row.record.status.as_str()))
}

pub fn top_regions(rows: &[&CaseRow]) -> Vec<CategoryCount> {
    let mut ranked = ranked_counts(rows.iter().map(|row| row.record.region.as_str()));
    ranked.truncate(TOP_REGION_LIMIT);
    ranked
}

/// Counts by Monday-start week of `bid_start`, oldest week first.
pub fn weekly_trend(rows: &[&CaseRow]) -> Vec<WeeklyCount> {
    let mut weeks: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for start in rows.iter().filter_map(|row| row.record.bid_start) {
        let monday = start - Duration::days(i64::from(start.weekday().num_days_from_monday()));
        *weeks.entry(monday).or_default() += 1;
    }

    weeks
        .into_iter()
        .map(|(week_start, count)| {
            let week_end = week_start + Duration::days(6);
            WeeklyCount {
                week_start,
                week_end,
                label: format!("{}/{}", week_start.format("%Y-%m-%d"), week_end.format("%Y-%m-%d")),
                count,
            }
        })
        .collect()
}

pub fn map_points(rows: &[&CaseRow]) -> Vec<MapPoint> {
    rows.iter()
        .filter_map(|row| {
            Some(MapPoint {
                case_id: row.record.case_id.clone(),
                lat: row.record.lat?,
                lon: row.record.lon?,
            })
        })
        .collect()
}

fn ranked_counts<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }

    let mut ranked: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(label, count)| CategoryCount {
            label: label.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|left, right| {
        right
            .count
            .cmp(&left.count)
            .then_with(|| left.label.cmp(&right.label))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::book::CaseBook;
    use crate::auction::filter::CaseFilter;
    use crate::auction::metrics::TierBasis;
    use crate::auction::table::RawTable;

    const FIXTURE: &str = "\
case_id,region,status,amount_total,min_bid_price,appraisal_price,bid_start,bid_end,lat,lon,match_status
C1,서울,진행중,100,70,100,2025-06-02,2025-06-05,37.5,127.0,linked
C2,부산,유찰,200,50,0,2025-06-08,2025-06-20,,,unlinked
C3,서울,진행중,300,40,100,2025-06-09,2025-05-30,35.1,,
C4,대구,유찰,400,,,,2025-06-01,36.0,128.6,linked
";

    fn book() -> CaseBook {
        let table = RawTable::from_csv_str(FIXTURE).expect("fixture parses");
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date");
        CaseBook::from_table(&table, today, TierBasis::AmountTotal)
    }

    #[test]
    fn kpis_cover_the_whole_view() {
        let book = book();
        let view = book.filter(&CaseFilter::default());
        let kpis = kpis(&view);

        assert_eq!(kpis.count, 4);
        assert_eq!(kpis.amount_total, 1000.0);
        // C1 0.7, C3 0.4; C2 has a zero appraisal and C4 no prices
        assert_eq!(kpis.average_min_ratio, Some(0.55));
        // C1 due in 4 days, C4 due today; C3 is overdue
        assert_eq!(kpis.closing_soon, 2);
        assert_eq!(kpis.linked, 2);
        let tier_total: usize = kpis.tiers.iter().map(|tier| tier.count).sum();
        assert_eq!(tier_total, 4);
        assert_eq!(kpis.tiers[0].tier_label, "A");
    }

    #[test]
    fn empty_view_has_no_average() {
        let kpis = kpis(&[]);
        assert_eq!(kpis.count, 0);
        assert_eq!(kpis.average_min_ratio, None);
    }

    #[test]
    fn category_counts_rank_by_count_then_label() {
        let book = book();
        let view = book.filter(&CaseFilter::default());

        let regions = top_regions(&view);
        let labels: Vec<(&str, usize)> = regions
            .iter()
            .map(|entry| (entry.label.as_str(), entry.count))
            .collect();
        assert_eq!(labels, vec![("서울", 2), ("대구", 1), ("부산", 1)]);

        let statuses = status_share(&view);
        assert_eq!(statuses[0].label, "유찰");
        assert_eq!(statuses[1].label, "진행중");
    }

    #[test]
    fn weeks_start_on_monday() {
        let book = book();
        let view = book.filter(&CaseFilter::default());
        let trend = weekly_trend(&view);

        let labels: Vec<(&str, usize)> = trend
            .iter()
            .map(|week| (week.label.as_str(), week.count))
            .collect();
        assert_eq!(
            labels,
            vec![("2025-06-02/2025-06-08", 2), ("2025-06-09/2025-06-15", 1)]
        );
    }

    #[test]
    fn map_points_need_both_coordinates() {
        let book = book();
        let view = book.filter(&CaseFilter::default());
        let points = map_points(&view);
        let ids: Vec<&str> = points.iter().map(|point| point.case_id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C4"]);
        assert_eq!(points[1].lon, 128.6);
    }
}
