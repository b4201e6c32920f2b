//! LedgerLens CLI: summary analytics, details views, and export.
//!
//! Commands:
//! - `summary`: KPIs, snapshot, period rollups, and breakdown series
//! - `events`: filtered / sorted / paged deal events with their roles
//! - `positions`: filtered / sorted / paged reconstructed positions
//! - `export`: events or positions as CSV, the analytics report as JSON
//! - `reconcile`: daily summaries rebuilt from raw events, merged by date

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use ledgerlens_core::analytics::{AnalyticsReport, Series};
use ledgerlens_core::normalize::time_of_day;
use ledgerlens_core::query::{DetailsFilter, SortDirection, SortSpec};
use ledgerlens_core::{DailySummaryRecord, EnrichedEvent, Position};
use ledgerlens_runner::{
    export_events_csv, export_positions_csv, export_report_json, export_summary_csv,
    select_source, write_export, DashboardSession, DetailsPage, DetailsView, LedgerConfig,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "ledgerlens",
    about = "LedgerLens CLI, trading ledger reconciliation and analytics"
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL. Overrides the config file and LEDGERLENS_API_BASE.
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Bearer token for the API.
    #[arg(long, global = true)]
    api_token: Option<String>,

    /// Daily summary CSV (used when no API base is set).
    #[arg(long, global = true)]
    summary_csv: Option<PathBuf>,

    /// Raw events CSV (used when no API base is set).
    #[arg(long, global = true)]
    raw_csv: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// KPIs, period rollups, and chart series for a date range.
    Summary {
        /// First trading day (YYYY-MM-DD), inclusive.
        #[arg(long)]
        from: Option<String>,

        /// Last trading day (YYYY-MM-DD), inclusive.
        #[arg(long)]
        to: Option<String>,

        /// Reference day for Today / This Week / ... rollups. Defaults to today.
        #[arg(long)]
        today: Option<String>,

        /// Print the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Deal events with deal role and position PnL.
    Events(DetailsArgs),
    /// Positions reconstructed from trade deals.
    Positions(DetailsArgs),
    /// Write events, positions, or the analytics report to a file.
    Export {
        #[arg(long, value_enum)]
        what: ExportKind,

        /// Output file.
        #[arg(long)]
        out: PathBuf,

        /// First trading day (YYYY-MM-DD), inclusive.
        #[arg(long)]
        from: Option<String>,

        /// Last trading day (YYYY-MM-DD), inclusive.
        #[arg(long)]
        to: Option<String>,

        /// Reference day for period rollups in the report.
        #[arg(long)]
        today: Option<String>,
    },
    /// Rebuild daily summaries from raw events and merge them over the summary source.
    Reconcile {
        /// Write the merged summaries as CSV instead of printing them.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DetailsArgs {
    /// First trading day (YYYY-MM-DD), inclusive.
    #[arg(long)]
    from: Option<String>,

    /// Last trading day (YYYY-MM-DD), inclusive.
    #[arg(long)]
    to: Option<String>,

    /// Exact trading day.
    #[arg(long)]
    date: Option<String>,

    /// Exact deal action, e.g. Buy or Sell. Ignored for positions.
    #[arg(long)]
    action: Option<String>,

    /// Case-insensitive symbol substring.
    #[arg(long)]
    symbol: Option<String>,

    /// Sort key, e.g. close_time_vn, symbol, position_pnl.
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending.
    #[arg(long, default_value_t = false)]
    desc: bool,

    /// Page number (clamped to the available pages).
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Rows per page. Defaults to the config value.
    #[arg(long)]
    page_size: Option<usize>,

    /// Print the page as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportKind {
    Events,
    Positions,
    Report,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerlens=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = build_config(&cli)?;

    match cli.command {
        Commands::Summary {
            from,
            to,
            today,
            json,
        } => run_summary(&config, from, to, today, json),
        Commands::Events(args) => {
            if let Some(size) = args.page_size {
                config.view.page_size = size;
            }
            run_details(&config, DetailsView::Event, args)
        }
        Commands::Positions(args) => {
            if let Some(size) = args.page_size {
                config.view.page_size = size;
            }
            run_details(&config, DetailsView::Position, args)
        }
        Commands::Export {
            what,
            out,
            from,
            to,
            today,
        } => run_export(&config, what, out, from, to, today),
        Commands::Reconcile { out } => run_reconcile(&config, out),
    }
}

/// Config file (or defaults), then environment, then command-line flags.
fn build_config(cli: &Cli) -> Result<LedgerConfig> {
    let mut config = LedgerConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(base) = &cli.api_base {
        config.source.api_base = Some(base.clone());
    }
    if let Some(token) = &cli.api_token {
        config.source.api_token = Some(token.clone());
    }
    if let Some(path) = &cli.summary_csv {
        config.source.summary_csv = path.clone();
    }
    if let Some(path) = &cli.raw_csv {
        config.source.raw_events_csv = path.clone();
    }
    Ok(config)
}

fn open_session(config: &LedgerConfig) -> Result<DashboardSession> {
    config.validate()?;
    let source = select_source(&config.source)?;
    DashboardSession::open(source, &config.view).context("failed to load daily summary")
}

fn parse_date(label: &str, value: Option<&str>) -> Result<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .with_context(|| format!("--{label} must be YYYY-MM-DD, got '{v}'"))?;
            Ok(Some(v.to_string()))
        }
        None => Ok(None),
    }
}

fn reference_day(today: Option<&str>) -> Result<NaiveDate> {
    match parse_date("today", today)? {
        Some(day) => Ok(NaiveDate::parse_from_str(&day, "%Y-%m-%d")?),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn run_summary(
    config: &LedgerConfig,
    from: Option<String>,
    to: Option<String>,
    today: Option<String>,
    json: bool,
) -> Result<()> {
    let from = parse_date("from", from.as_deref())?;
    let to = parse_date("to", to.as_deref())?;
    let today = reference_day(today.as_deref())?;

    let mut session = open_session(config)?;
    session.set_summary_range(from.as_deref(), to.as_deref());
    if let Err(err) = session.ensure_raw_loaded() {
        tracing::warn!(%err, "raw events unavailable; showing summary-only analytics");
    }

    let report = session.summary_report(today);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn run_details(config: &LedgerConfig, view: DetailsView, args: DetailsArgs) -> Result<()> {
    let details = DetailsFilter {
        from: parse_date("from", args.from.as_deref())?,
        to: parse_date("to", args.to.as_deref())?,
        date: parse_date("date", args.date.as_deref())?,
        action: args.action.filter(|a| !a.trim().is_empty()),
        symbol: args.symbol.filter(|s| !s.trim().is_empty()),
    };

    let mut session = open_session(config)?;
    session.switch_view(view);
    session.ensure_raw_loaded().context("failed to load raw events")?;
    session.set_details_filter(details);

    if let Some(key) = args.sort {
        let direction = if args.desc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        let spec = SortSpec::new(key, direction);
        match view {
            DetailsView::Event => session.set_event_sort(spec),
            DetailsView::Position => session.set_position_sort(spec),
        }
    } else if args.desc {
        bail!("--desc needs --sort");
    }
    session.set_page(args.page);

    match view {
        DetailsView::Event => {
            let page = session.event_page().context("raw events not loaded")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_events(&page);
            }
        }
        DetailsView::Position => {
            let page = session.position_page().context("raw events not loaded")?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_positions(&page);
            }
        }
    }
    Ok(())
}

fn run_export(
    config: &LedgerConfig,
    what: ExportKind,
    out: PathBuf,
    from: Option<String>,
    to: Option<String>,
    today: Option<String>,
) -> Result<()> {
    let from = parse_date("from", from.as_deref())?;
    let to = parse_date("to", to.as_deref())?;

    let mut session = open_session(config)?;
    let contents = match what {
        ExportKind::Report => {
            session.set_summary_range(from.as_deref(), to.as_deref());
            if let Err(err) = session.ensure_raw_loaded() {
                tracing::warn!(%err, "raw events unavailable; exporting summary-only report");
            }
            export_report_json(&session.summary_report(reference_day(today.as_deref())?))?
        }
        ExportKind::Events | ExportKind::Positions => {
            session.ensure_raw_loaded().context("failed to load raw events")?;
            session.set_details_filter(DetailsFilter {
                from,
                to,
                ..Default::default()
            });
            if matches!(what, ExportKind::Events) {
                export_events_csv(&session.selected_events())?
            } else {
                export_positions_csv(&session.selected_positions())?
            }
        }
    };

    write_export(&out, &contents)?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn run_reconcile(config: &LedgerConfig, out: Option<PathBuf>) -> Result<()> {
    let session = open_session(config)?;
    session.ensure_raw_loaded().context("failed to load raw events")?;
    let days = session.reconciled_summary().context("raw events not loaded")?;

    match out {
        Some(path) => {
            write_export(&path, &export_summary_csv(&days)?)?;
            println!("Wrote {} ({} days)", path.display(), days.len());
        }
        None => print_days(&days),
    }
    Ok(())
}

// ─── Printing ───────────────────────────────────────────────────────

fn print_report(report: &AnalyticsReport) {
    let k = &report.kpis;
    let s = &report.snapshot;
    println!();
    println!("=== Ledger Summary ===");
    match &k.latest_trade_date {
        Some(date) => println!("Latest trade date: {date} (VN)"),
        None => println!("No data in range"),
    }
    println!("Trading PnL:    ${:.2}", k.trading_pnl);
    println!("Net PnL:        ${:.2}", k.net_pnl);
    println!("Positions:      {}", k.total_positions);
    println!("Win Rate:       {:.1}%", k.win_rate * 100.0);
    println!("Gross Profit:   ${:.2}", k.gross_profit);
    println!("Gross Loss:     ${:.2}", k.gross_loss);
    println!();
    println!("--- Snapshot ---");
    println!("Deposits:       ${:.2}", s.deposits);
    println!("Withdrawals:    ${:.2}", s.withdrawals);
    println!("Gain:           {:.2}%", s.gain_pct * 100.0);
    println!("Max Drawdown:   ${:.2}", s.max_drawdown);
    println!("Profit Factor:  {:.2}", s.profit_factor);
    println!();
    println!("--- Periods ---");
    for p in &report.periods {
        println!(
            "{:<11} trading ${:>10.2}  net ${:>10.2}  win {:>5.1}%  trades {:>5}  positions {:>5}",
            p.period.label(),
            p.trading_pnl,
            p.net_pnl,
            p.win_rate * 100.0,
            p.trades,
            p.positions,
        );
    }
    print_series("Monthly", &report.monthly);
    print_series("Top Symbols", &report.symbols);
    print_series("Weekdays", &report.weekdays);
}

fn print_series(title: &str, series: &Series) {
    println!();
    println!("--- {title} ---");
    if series.is_empty() {
        println!("(no data)");
    }
    for (label, value) in series.iter() {
        println!("{label:<10} {value:>12.2}");
    }
}

fn print_days(days: &[DailySummaryRecord]) {
    println!(
        "{:<10} {:>12} {:>12} {:>12} {:>9} {:>6} {:>4} {:>4} {:>10} {:>10}",
        "Date",
        "Net",
        "Gross P",
        "Gross L",
        "Positions",
        "Deals",
        "W",
        "L",
        "Deposit",
        "Withdraw",
    );
    for d in days {
        println!(
            "{:<10} {:>12} {:>12} {:>12} {:>9} {:>6} {:>4} {:>4} {:>10} {:>10}",
            d.trade_date_vn,
            d.net_profit,
            d.gross_profit,
            d.gross_loss,
            d.total_positions,
            d.total_deals,
            d.win_positions,
            d.loss_positions,
            d.total_deposit,
            d.total_withdrawal,
        );
    }
    println!("{} days", days.len());
}

fn print_events(page: &DetailsPage<EnrichedEvent>) {
    println!(
        "{:<10} {:<8} {:<10} {:<12} {:<10} {:<6} {:<10} {:>6} {:>10} {:>12} {:>10}",
        "Date",
        "Time",
        "Event",
        "Position",
        "Role",
        "Action",
        "Symbol",
        "Lots",
        "Price",
        "Pos PnL",
        "Profit",
    );
    for e in &page.rows {
        let r = &e.event;
        println!(
            "{:<10} {:<8} {:<10} {:<12} {:<10} {:<6} {:<10} {:>6} {:>10} {:>12} {:>10}",
            r.trade_date_vn,
            time_of_day(&r.close_time_vn),
            r.event_id,
            r.position_id,
            e.deal_role,
            r.action,
            r.symbol,
            r.lots,
            r.close_price,
            e.position_pnl,
            r.profit,
        );
    }
    println!(
        "Page {} / {} (Total {} events)",
        page.page, page.page_count, page.total
    );
}

fn print_positions(page: &DetailsPage<Position>) {
    println!(
        "{:<10} {:<8} {:<12} {:<10} {:<8} {:<8} {:>10} {:>10} {:>6} {:>5} {:>12}",
        "Date",
        "Account",
        "Position",
        "Symbol",
        "Entry",
        "Exit",
        "Entry Px",
        "Exit Px",
        "Lots",
        "Deals",
        "PnL",
    );
    for p in &page.rows {
        println!(
            "{:<10} {:<8} {:<12} {:<10} {:<8} {:<8} {:>10} {:>10} {:>6} {:>5} {:>12}",
            p.trade_date_vn,
            p.account_id,
            p.position_id,
            p.symbol,
            time_of_day(&p.entry_time),
            time_of_day(&p.exit_time),
            p.entry_price,
            p.exit_price,
            p.lots,
            p.deals_count,
            p.position_pnl,
        );
    }
    println!(
        "Page {} / {} (Total {} positions)",
        page.page, page.page_count, page.total
    );
}
