pub mod aggregate;
pub mod alias;
pub mod brand;
pub mod cli;
pub mod config;
pub mod data;
pub mod debounce;
pub mod error;
pub mod format;
pub mod header;
pub mod io_utils;
pub mod months;
pub mod query;
pub mod record;
pub mod report;
pub mod session;
pub mod source;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, FilterArgs, LoadArgs},
    config::Config,
    query::{Facet, QueryState, SortKey},
    report::{Report, Summary},
    session::{Dataset, LoadOptions, Session},
    source::Source,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("stock_ledger", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Headers(args) => {
            let session = load_session(&args.load)?;
            let dataset = loaded(&session)?;
            Report::new(args.output.format, args.output.output.as_deref()).headers(dataset)
        }
        Commands::Records(args) => handle_records(&args),
        Commands::Brands(args) => handle_brands(&args),
        Commands::Months(args) => handle_months(&args),
        Commands::Summary(args) => handle_summary(&args),
    }
}

fn handle_records(args: &cli::RecordsArgs) -> Result<()> {
    let session = load_session(&args.load)?;
    let dataset = loaded(&session)?;
    let state = query_state(&args.filter, args.sort);
    let mut records = dataset.query(&state);
    let matched = records.len();
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }
    info!(
        "Emitting {} of {} matching record(s) sorted by {:?}",
        records.len(),
        matched,
        args.sort
    );
    Report::new(args.output.format, args.output.output.as_deref())
        .records(&records, &dataset.months)
}

fn handle_brands(args: &cli::ReportArgs) -> Result<()> {
    let session = load_session(&args.load)?;
    let dataset = loaded(&session)?;
    if let Some(brand) = args.filter.brand.as_deref()
        && !brand.is_empty()
        && !query::distinct_values(&dataset.records, Facet::Brand)
            .iter()
            .any(|known| known == brand)
    {
        warn!("No records carry brand '{brand}'");
    }
    let state = query_state(&args.filter, SortKey::default());
    let view = session.view(&state).context("No ledger loaded")?;
    debug!("Rolled {} record(s) into {} brand(s)", view.records.len(), view.brands.len());
    Report::new(args.output.format, args.output.output.as_deref())
        .brands(&view.brands, &dataset.months)
}

fn handle_months(args: &cli::ReportArgs) -> Result<()> {
    let session = load_session(&args.load)?;
    let state = query_state(&args.filter, SortKey::default());
    let view = session.view(&state).context("No ledger loaded")?;
    debug!("Monthly series has {} active month(s)", view.monthly.len());
    Report::new(args.output.format, args.output.output.as_deref()).months(&view.monthly)
}

fn handle_summary(args: &cli::SummaryArgs) -> Result<()> {
    let session = load_session(&args.load)?;
    let state = query_state(&args.filter, args.sort);
    let view = session.view(&state).context("No ledger loaded")?;
    let summary = Summary {
        profit_ranking: aggregate::profit_ranking(&view.records, args.top),
        kpis: view.kpis,
        brand_share: view.brand_share,
        supplier_share: view.supplier_share,
    };
    Report::new(args.output.format, args.output.output.as_deref()).summary(&summary)
}

fn load_session(args: &LoadArgs) -> Result<Session> {
    let mut config = match &args.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("Loading configuration from {path:?}"))?
        }
        None => Config::default(),
    };
    apply_overrides(&mut config, args);

    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let source = Source::parse(&args.input);
    let delimiter = io_utils::resolve_input_delimiter(source.path_hint(), args.delimiter);
    info!(
        "Loading '{}' with delimiter '{}' and {} header row(s)",
        source,
        printable_delimiter(delimiter),
        config.header_rows
    );

    let mut session = Session::new(config)?;
    session
        .load(
            &source,
            LoadOptions {
                delimiter: Some(delimiter),
                encoding,
            },
        )
        .with_context(|| format!("Loading ledger from {source}"))?;
    Ok(session)
}

fn apply_overrides(config: &mut Config, args: &LoadArgs) {
    if let Some(rows) = args.header_rows {
        config.header_rows = rows;
    }
    if let Some(path) = &args.brand_table {
        config.brands.table = Some(path.clone());
    }
    if let Some(policy) = args.brand_policy {
        config.brands.policy = policy;
    }
    if args.exclude_other {
        config.brands.exclude_fallback = true;
    }
}

fn loaded(session: &Session) -> Result<&Dataset> {
    session.dataset().context("No ledger loaded")
}

fn query_state(filter: &FilterArgs, sort: SortKey) -> QueryState {
    QueryState {
        search: filter.search.clone(),
        brand: filter.brand.clone(),
        sub_category: filter.sub_category.clone(),
        supplier: filter.supplier.clone(),
        sort,
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
