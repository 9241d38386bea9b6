use super::domain::{CaseRecord, CaseRow, PriorityTier};
use super::parser::round_to;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Tier assigned to every row when tertile edges cannot be formed.
pub const FALLBACK_TIER: PriorityTier = PriorityTier::B;

pub const DEFAULT_STAGE_WEIGHT: f64 = 0.4;
pub const DEFAULT_ASSET_WEIGHT: f64 = 0.3;

const STAGE_WEIGHTS: &[(&str, f64)] = &[
    ("분납중", 0.8),
    ("납부약속", 0.75),
    ("매각결정", 0.7),
    ("공매진행", 0.6),
    ("공매공고", 0.55),
    ("압류", 0.5),
    ("체납", 0.3),
    ("종결", 0.1),
];

const ASSET_WEIGHTS: &[(&str, f64)] = &[
    ("예금", 0.5),
    ("부동산", 0.4),
    ("차량", 0.3),
    ("기타", 0.1),
];

const AMOUNT_WEIGHT: f64 = 0.6;
const COLLECTABILITY_WEIGHT: f64 = 0.3;
const URGENCY_WEIGHT: f64 = 0.1;
const DUE_WINDOW_DAYS: i64 = 30;

/// Which value the A/B/C tertiles are cut on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierBasis {
    AmountTotal,
    #[default]
    PriorityScore,
}

impl FromStr for TierBasis {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "amount" | "amount_total" => Ok(Self::AmountTotal),
            "score" | "priority_score" => Ok(Self::PriorityScore),
            other => Err(format!(
                "unknown tier basis '{other}' (expected 'amount' or 'score')"
            )),
        }
    }
}

/// `numerator / denominator` rounded to 4 places; missing when either side is
/// missing or the denominator is zero.
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    let numerator = numerator?;
    let denominator = denominator?;
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then(|| round_to(value, 4))
}

pub fn collectability_proxy(stage: &str, asset_flag: &str) -> f64 {
    weight(STAGE_WEIGHTS, stage, DEFAULT_STAGE_WEIGHT)
        + weight(ASSET_WEIGHTS, asset_flag, DEFAULT_ASSET_WEIGHT)
}

fn weight(table: &[(&str, f64)], key: &str, default: f64) -> f64 {
    let key = key.trim();
    table
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, weight)| *weight)
        .unwrap_or(default)
}

/// Derives every computed field for `records` as of `today`.
pub fn derive_rows(
    records: Vec<CaseRecord>,
    today: NaiveDate,
    basis: TierBasis,
) -> Vec<CaseRow> {
    let (min_amount, max_amount) = records
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), record| {
            (lo.min(record.amount_total), hi.max(record.amount_total))
        });
    let amount_range = max_amount - min_amount;

    let mut rows: Vec<CaseRow> = records
        .into_iter()
        .map(|record| {
            let days_delinquent = record.delinquent_since.map(|since| (today - since).num_days());
            let due_days = record.bid_end.map(|end| (end - today).num_days());
            let collectability = collectability_proxy(&record.stage, &record.asset_flag);

            let normalized_amount = if amount_range.is_finite() && amount_range > f64::EPSILON {
                (record.amount_total - min_amount) / amount_range
            } else {
                0.0
            };
            let clipped_due = due_days
                .unwrap_or(DUE_WINDOW_DAYS)
                .clamp(-DUE_WINDOW_DAYS, DUE_WINDOW_DAYS);
            let urgency = -(clipped_due as f64) / DUE_WINDOW_DAYS as f64;
            let priority_score = round_to(
                AMOUNT_WEIGHT * normalized_amount
                    + COLLECTABILITY_WEIGHT * collectability
                    + URGENCY_WEIGHT * urgency,
                4,
            );

            CaseRow {
                min_ratio: ratio(record.min_bid_price, record.appraisal_price),
                penalty_ratio: ratio(record.amount_penalty, Some(record.amount_total)),
                days_delinquent,
                due_days,
                collectability_proxy: round_to(collectability, 4),
                priority_score,
                priority_tier: FALLBACK_TIER,
                record,
            }
        })
        .collect();

    let values: Vec<f64> = rows
        .iter()
        .map(|row| match basis {
            TierBasis::AmountTotal => row.record.amount_total,
            TierBasis::PriorityScore => row.priority_score,
        })
        .collect();
    for (row, tier) in rows.iter_mut().zip(tertile_tiers(&values)) {
        row.priority_tier = tier;
    }

    rows
}

/// Cuts `values` into tertiles, highest third `A`. Falls back to
/// [`FALLBACK_TIER`] for every value when fewer than three distinct values
/// exist or two edges coincide.
pub fn tertile_tiers(values: &[f64]) -> Vec<PriorityTier> {
    match tertile_edges(values) {
        Some([_, lower, upper, _]) => values
            .iter()
            .map(|value| {
                if *value <= lower {
                    PriorityTier::C
                } else if *value <= upper {
                    PriorityTier::B
                } else {
                    PriorityTier::A
                }
            })
            .collect(),
        None => {
            debug!(values = values.len(), "tertile edges degenerate, using fallback tier");
            vec![FALLBACK_TIER; values.len()]
        }
    }
}

fn tertile_edges(values: &[f64]) -> Option<[f64; 4]> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|value| value.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let mut distinct = sorted.clone();
    distinct.dedup();
    if distinct.len() < 3 {
        return None;
    }

    let edges = [
        quantile(&sorted, 0.0),
        quantile(&sorted, 1.0 / 3.0),
        quantile(&sorted, 2.0 / 3.0),
        quantile(&sorted, 1.0),
    ];
    edges.windows(2).all(|pair| pair[0] < pair[1]).then_some(edges)
}

/// Linear-interpolation quantile over an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::normalizer::normalize;
    use crate::auction::table::RawTable;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("valid date")
    }

    fn rows(csv: &str) -> Vec<CaseRow> {
        let table = RawTable::from_csv_str(csv).expect("fixture parses");
        derive_rows(normalize(&table), today(), TierBasis::AmountTotal)
    }

    #[test]
    fn ratio_is_missing_for_unusable_denominators() {
        assert_eq!(ratio(Some(70.0), Some(100.0)), Some(0.7));
        assert_eq!(ratio(Some(2.0), Some(3.0)), Some(0.6667));
        assert_eq!(ratio(Some(70.0), Some(0.0)), None);
        assert_eq!(ratio(Some(70.0), None), None);
        assert_eq!(ratio(None, Some(10.0)), None);
    }

    #[test]
    fn penalty_ratio_needs_a_usable_total() {
        let rows = rows("amount_total,amount_penalty\n0,50\noops,50\n300,\n300,100\n");
        let ratios: Vec<Option<f64>> = rows.iter().map(|row| row.penalty_ratio).collect();
        assert_eq!(ratios, vec![None, None, None, Some(0.3333)]);
    }

    #[test]
    fn day_counts_follow_today() {
        let rows = rows("delinquent_since,bid_end\n2025-05-01,2025-06-11\n,\n");
        assert_eq!(rows[0].days_delinquent, Some(31));
        assert_eq!(rows[0].due_days, Some(10));
        assert_eq!(rows[1].days_delinquent, None);
        assert_eq!(rows[1].due_days, None);
    }

    #[test]
    fn collectability_uses_lookup_defaults() {
        assert!((collectability_proxy("압류", "예금") - 1.0).abs() < 1e-9);
        assert!((collectability_proxy("처음보는단계", "선박") - 0.7).abs() < 1e-9);
    }

    #[test]
    fn priority_score_combines_amount_collectability_and_urgency() {
        let rows = rows(
            "amount_total,stage,asset_flag,bid_end\n0,압류,부동산,\n1000,분납중,예금,2025-06-01\n",
        );
        // amount 0 → normalized 0, collectability 0.9, due defaults to 30 → -0.1
        assert_eq!(rows[0].priority_score, round_to(0.3 * 0.9 - 0.1, 4));
        // amount max → 1, collectability 1.3, due 0 → 0
        assert_eq!(rows[1].priority_score, round_to(0.6 + 0.3 * 1.3, 4));
    }

    #[test]
    fn overdue_bids_raise_urgency_up_to_the_clip() {
        let rows = rows("amount_total,bid_end\n100,2025-03-01\n100,2025-05-22\n");
        assert_eq!(rows[0].due_days, Some(-92));
        assert_eq!(rows[0].priority_score, round_to(0.3 * 0.5 + 0.1, 4));
        assert_eq!(rows[1].priority_score, round_to(0.3 * 0.5 + 0.1 * (10.0 / 30.0), 4));
    }

    #[test]
    fn tertiles_label_highest_third_a() {
        let tiers = tertile_tiers(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(
            tiers,
            vec![
                PriorityTier::C,
                PriorityTier::C,
                PriorityTier::B,
                PriorityTier::B,
                PriorityTier::A,
                PriorityTier::A
            ]
        );
    }

    #[test]
    fn degenerate_inputs_use_the_fallback_tier() {
        assert!(tertile_tiers(&[]).is_empty());
        assert_eq!(tertile_tiers(&[5.0]), vec![FALLBACK_TIER]);
        assert_eq!(tertile_tiers(&[1.0, 2.0]), vec![FALLBACK_TIER; 2]);
        assert_eq!(tertile_tiers(&[7.0, 7.0, 7.0, 9.0]), vec![FALLBACK_TIER; 4]);
        // three distinct values but the lower edges coincide
        assert_eq!(
            tertile_tiers(&[1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 3.0]),
            vec![FALLBACK_TIER; 7]
        );
    }

    #[test]
    fn tier_basis_parses_short_and_long_names() {
        assert_eq!("amount".parse::<TierBasis>(), Ok(TierBasis::AmountTotal));
        assert_eq!("Priority_Score".parse::<TierBasis>(), Ok(TierBasis::PriorityScore));
        assert!("median".parse::<TierBasis>().is_err());
    }
}
