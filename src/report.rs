use crate::cli::DataArgs;
use chrono::{Local, NaiveDate};
use clap::Args;
use onbid::auction::export::write_csv;
use onbid::auction::report::{summarize, DashboardSummary, CLOSING_SOON_DAYS};
use onbid::auction::{
    sort_rows, CaseBook, CaseFilter, CaseRow, DashboardService, DateRange, PriorityTier, SortKey,
};
use onbid::config::AppConfig;
use onbid::error::AppError;
use onbid::telemetry;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

const DEFAULT_TABLE_ROWS: usize = 20;

/// Sidebar filters and table ordering.
#[derive(Args, Debug, Default)]
pub(crate) struct FilterArgs {
    /// Exact region ("전체" selects all)
    #[arg(long)]
    pub(crate) region: Option<String>,
    /// Exact auction type
    #[arg(long)]
    pub(crate) auction_type: Option<String>,
    /// Exact status
    #[arg(long)]
    pub(crate) status: Option<String>,
    /// Case-insensitive substring of the assigned officer
    #[arg(long)]
    pub(crate) officer: Option<String>,
    /// Allowed stage (repeatable)
    #[arg(long = "stage")]
    pub(crate) stages: Vec<String>,
    /// Allowed priority tier A, B or C (repeatable)
    #[arg(long = "tier")]
    pub(crate) tiers: Vec<PriorityTier>,
    /// Keep rows closing within this many days
    #[arg(long)]
    pub(crate) max_due_days: Option<i64>,
    /// Earliest bid start (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) from: Option<NaiveDate>,
    /// Latest bid end (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) to: Option<NaiveDate>,
    /// Sort column: bid_start, bid_end, amount_total, priority_score, due_days
    #[arg(long, default_value = "bid_start")]
    pub(crate) sort: SortKey,
    /// Sort ascending instead of descending
    #[arg(long)]
    pub(crate) ascending: bool,
}

impl FilterArgs {
    pub(crate) fn to_filter(&self) -> CaseFilter {
        CaseFilter {
            region: self.region.clone(),
            auction_type: self.auction_type.clone(),
            status: self.status.clone(),
            officer: self.officer.clone(),
            stages: self.stages.clone(),
            tiers: self.tiers.clone(),
            max_due_days: self.max_due_days,
            date_range: DateRange::new(self.from, self.to),
        }
    }

    fn view<'a>(&self, book: &'a CaseBook) -> Vec<&'a CaseRow> {
        let mut view = book.filter(&self.to_filter());
        sort_rows(&mut view, self.sort, !self.ascending);
        view
    }
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    #[command(flatten)]
    pub(crate) data: DataArgs,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Evaluation date for day counts (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Number of table rows to print
    #[arg(long, default_value_t = DEFAULT_TABLE_ROWS)]
    pub(crate) limit: usize,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) data: DataArgs,
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Evaluation date for day counts (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Destination CSV file
    #[arg(long)]
    pub(crate) output: PathBuf,
}

fn load_book(data: &mut DataArgs, today: Option<NaiveDate>) -> Result<CaseBook, AppError> {
    let mut config = AppConfig::load()?;
    data.apply(&mut config.dashboard);
    telemetry::init(&config.telemetry)?;

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let service = DashboardService::new(config.dashboard);
    Ok(service.book(today)?)
}

pub(crate) fn run_cases_report(mut args: ReportArgs) -> Result<(), AppError> {
    let book = load_book(&mut args.data, args.today)?;
    let view = args.filters.view(&book);
    let summary = summarize(&view);

    render_case_report(&book, &view, &summary, args.limit);
    Ok(())
}

pub(crate) fn run_cases_export(mut args: ExportArgs) -> Result<(), AppError> {
    let book = load_book(&mut args.data, args.today)?;
    let view = args.filters.view(&book);

    let file = File::create(&args.output)?;
    write_csv(BufWriter::new(file), &view)?;
    println!(
        "Exported {} of {} cases to {}",
        view.len(),
        book.len(),
        args.output.display()
    );
    Ok(())
}

fn render_case_report(
    book: &CaseBook,
    view: &[&CaseRow],
    summary: &DashboardSummary,
    limit: usize,
) {
    let kpis = &summary.kpis;
    println!("Onbid case dashboard (evaluated {})", book.today());
    println!("- {} of {} cases match the filters", kpis.count, book.len());
    println!("- Total delinquent amount: {:.0}", kpis.amount_total);
    match kpis.average_min_ratio {
        Some(ratio) => println!("- Average min bid / appraisal: {:.1}%", ratio * 100.0),
        None => println!("- Average min bid / appraisal: n/a"),
    }
    println!("- Closing within {} days: {}", CLOSING_SOON_DAYS, kpis.closing_soon);
    println!("- Linked to auction listings: {}", kpis.linked);
    let tiers: Vec<String> = kpis
        .tiers
        .iter()
        .map(|tier| format!("{} {}", tier.tier_label, tier.count))
        .collect();
    println!("- Priority tiers: {}", tiers.join(" | "));

    println!("\nStatus share");
    for entry in &summary.status_share {
        println!("- {}: {}", entry.label, entry.count);
    }

    println!("\nTop regions");
    for entry in &summary.top_regions {
        println!("- {}: {}", entry.label, entry.count);
    }

    if summary.weekly_trend.is_empty() {
        println!("\nWeekly bid starts: none");
    } else {
        println!("\nWeekly bid starts");
        for week in &summary.weekly_trend {
            println!("- {}: {}", week.label, week.count);
        }
    }

    println!("\nCases (showing {} of {})", limit.min(view.len()), view.len());
    for row in view.iter().take(limit) {
        let record = &row.record;
        println!(
            "- {} [{}] {} {}/{} | {} | amount {:.0} | due {} | score {:.4} | {}",
            record.case_id,
            row.priority_tier,
            record.stage,
            record.region,
            record.district,
            record.officer.as_deref().unwrap_or("-"),
            record.amount_total,
            row.due_days
                .map(|days| format!("{days}d"))
                .unwrap_or_else(|| "-".to_string()),
            row.priority_score,
            record
                .match_status
                .map(|status| status.label())
                .unwrap_or("-"),
        );
    }
}
