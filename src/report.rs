//! Rendering of pipeline outputs as text tables, CSV or JSON.
//!
//! Tables use UK display formatting. CSV and JSON carry raw numbers, with
//! non-finite values written as an empty cell or `null`.

use std::{collections::BTreeMap, io::Write, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::{
    aggregate::{BrandSummary, Kpis, MonthlySeries, ShareSeries},
    alias::Field,
    cli::OutputFormat,
    format::{MISSING, fmt_gbp, fmt_int, fmt_pct},
    io_utils,
    months::MonthColumn,
    record::Record,
    session::Dataset,
    table::{Align, TextTable},
};

/// Headline figures for the `summary` command.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub kpis: Kpis,
    pub brand_share: ShareSeries,
    pub supplier_share: ShareSeries,
    pub profit_ranking: ShareSeries,
}

#[derive(Debug, Serialize)]
struct HeaderReport<'a> {
    source: &'a str,
    headers: &'a [String],
    columns: BTreeMap<&'static str, i64>,
    months: &'a [MonthColumn],
    unresolved: Vec<&'static str>,
}

pub struct Report<'a> {
    format: OutputFormat,
    output: Option<&'a Path>,
}

impl<'a> Report<'a> {
    pub fn new(format: OutputFormat, output: Option<&'a Path>) -> Self {
        Self { format, output }
    }

    pub fn headers(&self, dataset: &Dataset) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.write_json(&HeaderReport {
                source: &dataset.source,
                headers: &dataset.headers,
                columns: Field::ALL
                    .iter()
                    .map(|field| (field.as_str(), dataset.columns.display_index(*field)))
                    .collect(),
                months: &dataset.months,
                unresolved: dataset
                    .columns
                    .unresolved()
                    .iter()
                    .map(Field::as_str)
                    .collect(),
            }),
            format => {
                let rows = dataset
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(idx, header)| {
                        let fields = dataset
                            .columns
                            .fields_at(idx)
                            .iter()
                            .map(Field::as_str)
                            .collect::<Vec<_>>()
                            .join(" ");
                        let month = if dataset.months.iter().any(|m| m.index == idx) {
                            "yes"
                        } else {
                            ""
                        };
                        vec![idx.to_string(), header.clone(), fields, month.to_string()]
                    })
                    .collect::<Vec<_>>();
                if format == OutputFormat::Csv {
                    return self.write_csv(&["index", "header", "fields", "month"], rows);
                }
                let mut table = TextTable::new()
                    .column("#", Align::Right)
                    .column("Header", Align::Left)
                    .column("Fields", Align::Left)
                    .column("Month", Align::Left);
                rows.into_iter().for_each(|row| table.push_row(row));
                let mut text = table.render();
                let unresolved = dataset.columns.unresolved();
                if !unresolved.is_empty() {
                    text.push_str(&format!(
                        "\nUnresolved: {}\n",
                        unresolved.iter().map(Field::as_str).collect::<Vec<_>>().join(", ")
                    ));
                }
                self.write_text(&text)
            }
        }
    }

    pub fn records(&self, records: &[&Record], months: &[MonthColumn]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.write_json(records),
            OutputFormat::Csv => {
                let mut headers: Vec<&str> = RECORD_COLUMNS.to_vec();
                let month_headers = months
                    .iter()
                    .flat_map(|m| [m.name.clone(), format!("{} revenue", m.name)])
                    .collect::<Vec<_>>();
                headers.extend(month_headers.iter().map(String::as_str));
                let rows = records
                    .iter()
                    .map(|record| {
                        let mut row = vec![
                            record.stock_code.clone(),
                            record.description.clone(),
                            record.supplier.clone(),
                            record.brand.clone(),
                            record.sub_category.clone(),
                            raw_number(record.price),
                            raw_number(record.cost),
                            raw_number(record.profit_pct),
                            raw_number(record.price_basis),
                            raw_number(record.available_qty),
                            raw_number(record.stock_value),
                            raw_number(record.ytd_sales),
                            raw_number(record.internet_sales),
                            raw_number(record.ebay_sales),
                            raw_number(record.combined_sales),
                            record.last_invoice_date.clone(),
                        ];
                        for month in &record.months {
                            row.push(raw_number(month.units));
                            row.push(raw_number(month.revenue));
                        }
                        row
                    })
                    .collect();
                self.write_csv(&headers, rows)
            }
            OutputFormat::Table => {
                let mut table = TextTable::new()
                    .column("Stock Code", Align::Left)
                    .column("Description", Align::Left)
                    .column("Brand", Align::Left)
                    .column("Supplier", Align::Left)
                    .column("Price", Align::Right)
                    .column("Cost", Align::Right)
                    .column("Profit", Align::Right)
                    .column("Stock Value", Align::Right)
                    .column("Sales", Align::Right)
                    .column("Revenue", Align::Right)
                    .column("Last Invoice", Align::Left);
                for record in records {
                    table.push_row(vec![
                        record.stock_code.clone(),
                        record.description.clone(),
                        text_or_missing(&record.brand),
                        text_or_missing(&record.supplier),
                        fmt_gbp(record.price),
                        fmt_gbp(record.cost),
                        fmt_pct(record.profit_pct),
                        fmt_gbp(record.stock_value),
                        fmt_int(record.combined_sales),
                        fmt_gbp(record.total_revenue()),
                        text_or_missing(&record.last_invoice_date),
                    ]);
                }
                self.write_text(&table.render())
            }
        }
    }

    pub fn brands(&self, summaries: &[BrandSummary], months: &[MonthColumn]) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.write_json(summaries),
            OutputFormat::Csv => {
                let mut headers: Vec<&str> = vec![
                    "brand",
                    "records",
                    "combined_sales",
                    "stock_value",
                    "avg_profit_pct",
                    "revenue",
                ];
                headers.extend(months.iter().map(|m| m.name.as_str()));
                let rows = summaries
                    .iter()
                    .map(|summary| {
                        let mut row = vec![
                            summary.brand.clone(),
                            summary.records.to_string(),
                            raw_number(summary.combined_sales),
                            raw_number(summary.stock_value),
                            raw_number(summary.avg_profit_pct),
                            raw_number(summary.revenue),
                        ];
                        row.extend(summary.month_revenue.iter().map(|v| raw_number(*v)));
                        row
                    })
                    .collect();
                self.write_csv(&headers, rows)
            }
            OutputFormat::Table => {
                let mut table = TextTable::new()
                    .column("Brand", Align::Left)
                    .column("Records", Align::Right)
                    .column("Sales", Align::Right)
                    .column("Stock Value", Align::Right)
                    .column("Avg Profit", Align::Right)
                    .column("Revenue", Align::Right);
                for summary in summaries {
                    table.push_row(vec![
                        text_or_missing(&summary.brand),
                        fmt_int(summary.records as f64),
                        fmt_int(summary.combined_sales),
                        fmt_gbp(summary.stock_value),
                        fmt_pct(summary.avg_profit_pct),
                        fmt_gbp(summary.revenue),
                    ]);
                }
                self.write_text(&table.render())
            }
        }
    }

    pub fn months(&self, series: &MonthlySeries) -> Result<()> {
        let rows = series
            .labels
            .iter()
            .zip(series.units.iter().zip(&series.revenue));
        match self.format {
            OutputFormat::Json => self.write_json(series),
            OutputFormat::Csv => self.write_csv(
                &["month", "units", "revenue"],
                rows.map(|(label, (units, revenue))| {
                    vec![label.clone(), raw_number(*units), raw_number(*revenue)]
                })
                .collect(),
            ),
            OutputFormat::Table => {
                let mut table = TextTable::new()
                    .column("Month", Align::Left)
                    .column("Units", Align::Right)
                    .column("Revenue", Align::Right);
                for (label, (units, revenue)) in rows {
                    table.push_row(vec![label.clone(), fmt_int(*units), fmt_gbp(*revenue)]);
                }
                self.write_text(&table.render())
            }
        }
    }

    pub fn summary(&self, summary: &Summary) -> Result<()> {
        match self.format {
            OutputFormat::Json => self.write_json(summary),
            OutputFormat::Csv => {
                let kpis = &summary.kpis;
                let mut rows = vec![
                    kpi_row("records", kpis.records.to_string()),
                    kpi_row("stock_value", raw_number(kpis.stock_value)),
                    kpi_row("avg_profit_pct", raw_number(kpis.avg_profit_pct)),
                    kpi_row("combined_sales", raw_number(kpis.combined_sales)),
                    kpi_row("revenue", raw_number(kpis.revenue)),
                ];
                for (section, series) in [
                    ("brand_share", &summary.brand_share),
                    ("supplier_share", &summary.supplier_share),
                    ("profit_ranking", &summary.profit_ranking),
                ] {
                    rows.extend(series.labels.iter().zip(&series.values).map(|(label, value)| {
                        vec![section.to_string(), label.clone(), raw_number(*value)]
                    }));
                }
                self.write_csv(&["section", "label", "value"], rows)
            }
            OutputFormat::Table => {
                let kpis = &summary.kpis;
                let mut overview = TextTable::new()
                    .column("Metric", Align::Left)
                    .column("Value", Align::Right);
                overview.push_row(vec!["Records".into(), fmt_int(kpis.records as f64)]);
                overview.push_row(vec!["Stock value".into(), fmt_gbp(kpis.stock_value)]);
                overview.push_row(vec!["Avg profit".into(), fmt_pct(kpis.avg_profit_pct)]);
                overview.push_row(vec!["Combined sales".into(), fmt_int(kpis.combined_sales)]);
                overview.push_row(vec!["Revenue".into(), fmt_gbp(kpis.revenue)]);

                let mut text = overview.render();
                text.push('\n');
                text.push_str(&share_table("Brand", "Sales", &summary.brand_share, fmt_int).render());
                text.push('\n');
                text.push_str(
                    &share_table("Supplier", "Sales", &summary.supplier_share, fmt_int).render(),
                );
                text.push('\n');
                text.push_str(
                    &share_table("Product", "Profit", &summary.profit_ranking, fmt_pct).render(),
                );
                self.write_text(&text)
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let mut out = io_utils::open_output(self.output)?;
        serde_json::to_writer_pretty(&mut out, value).context("Writing JSON output")?;
        writeln!(out)?;
        out.flush().context("Flushing output")
    }

    fn write_csv(&self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        let mut writer = io_utils::open_csv_writer(self.output, io_utils::DEFAULT_CSV_DELIMITER)?;
        writer.write_record(headers).context("Writing CSV header")?;
        for row in rows {
            writer.write_record(&row).context("Writing CSV row")?;
        }
        writer.flush().context("Flushing output")
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let mut out = io_utils::open_output(self.output)?;
        out.write_all(text.as_bytes()).context("Writing output")?;
        out.flush().context("Flushing output")
    }
}

const RECORD_COLUMNS: [&str; 16] = [
    "stock_code",
    "description",
    "supplier",
    "brand",
    "sub_category",
    "price",
    "cost",
    "profit_pct",
    "price_basis",
    "available_qty",
    "stock_value",
    "ytd_sales",
    "internet_sales",
    "ebay_sales",
    "combined_sales",
    "last_invoice_date",
];

fn share_table(label: &str, value: &str, series: &ShareSeries, fmt: fn(f64) -> String) -> TextTable {
    let mut table = TextTable::new()
        .column(label, Align::Left)
        .column(value, Align::Right);
    for (name, amount) in series.labels.iter().zip(&series.values) {
        table.push_row(vec![name.clone(), fmt(*amount)]);
    }
    table
}

fn kpi_row(label: &str, value: String) -> Vec<String> {
    vec!["kpi".to_string(), label.to_string(), value]
}

/// Raw number for machine-readable output; empty when not finite.
pub fn raw_number(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}

fn text_or_missing(value: &str) -> String {
    if value.is_empty() {
        MISSING.to_string()
    } else {
        value.to_string()
    }
}
