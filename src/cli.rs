use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{brand::BrandPolicy, query::SortKey};

#[derive(Debug, Parser)]
#[command(author, version, about = "Normalise and summarise stock/sales ledger exports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the synthesised header, resolved column map and month columns
    Headers(HeadersArgs),
    /// List normalised records, filtered and sorted
    Records(RecordsArgs),
    /// Roll records up by canonical brand
    Brands(ReportArgs),
    /// Per-month unit and revenue totals
    Months(ReportArgs),
    /// Headline KPIs with brand and supplier shares
    Summary(SummaryArgs),
}

/// Options shared by every subcommand that loads a ledger.
#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// Ledger to load: a file path, `-` for stdin, or an http(s) URL
    #[arg(short = 'i', long = "input")]
    pub input: String,
    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Number of leading rows that form the header
    #[arg(long = "header-rows")]
    pub header_rows: Option<usize>,
    /// Brand table YAML replacing the built-in one
    #[arg(long = "brand-table")]
    pub brand_table: Option<PathBuf>,
    /// How brands missing from the table are reported
    #[arg(long = "brand-policy", value_enum)]
    pub brand_policy: Option<BrandPolicy>,
    /// Leave the fallback brand bucket out of rollups
    #[arg(long = "exclude-other")]
    pub exclude_other: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Case-insensitive text matched against description and stock code
    #[arg(short = 's', long = "search", default_value = "")]
    pub search: String,
    /// Only records with exactly this canonical brand
    #[arg(long)]
    pub brand: Option<String>,
    /// Only records in this sub category
    #[arg(long = "sub-category")]
    pub sub_category: Option<String>,
    /// Only records from this supplier
    #[arg(long)]
    pub supplier: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: OutputFormat,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HeadersArgs {
    #[command(flatten)]
    pub load: LoadArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct RecordsArgs {
    #[command(flatten)]
    pub load: LoadArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Record ordering
    #[arg(long = "sort", value_enum, default_value = "profit-desc")]
    pub sort: SortKey,
    /// Limit number of records emitted
    #[arg(long)]
    pub limit: Option<usize>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub load: LoadArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub load: LoadArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Ordering of the profit ranking
    #[arg(long = "sort", value_enum, default_value = "profit-desc")]
    pub sort: SortKey,
    /// Entries in the profit ranking
    #[arg(long = "top", default_value_t = 10)]
    pub top: usize,
    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn records_command_parses_filters_and_sort() {
        let cli = Cli::try_parse_from([
            "stock-ledger",
            "records",
            "-i",
            "ledger.csv",
            "--brand",
            "Milwaukee",
            "--sort",
            "brand-za",
            "--format",
            "json",
            "--exclude-other",
        ])
        .unwrap();
        match cli.command {
            Commands::Records(args) => {
                assert_eq!(args.filter.brand.as_deref(), Some("Milwaukee"));
                assert_eq!(args.sort, SortKey::BrandZa);
                assert_eq!(args.output.format, OutputFormat::Json);
                assert!(args.load.exclude_other);
                assert_eq!(args.load.input, "ledger.csv");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn summary_command_defaults_to_profit_descending() {
        let cli = Cli::try_parse_from(["stock-ledger", "summary", "-i", "ledger.csv"]).unwrap();
        match cli.command {
            Commands::Summary(args) => {
                assert_eq!(args.sort, SortKey::ProfitDesc);
                assert_eq!(args.top, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
