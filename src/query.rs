//! Record filtering and ordering.
//!
//! A [`QueryState`] mirrors what a dashboard filter bar holds: free-text
//! search, exact brand / sub-category / supplier selections and a sort key.
//! Applying it never mutates the record set.

use std::cmp::Ordering;

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::record::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    ProfitDesc,
    ProfitAsc,
    BrandAz,
    BrandZa,
    StockCodeAz,
    StockCodeZa,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    pub search: String,
    pub brand: Option<String>,
    pub sub_category: Option<String>,
    pub supplier: Option<String>,
    pub sort: SortKey,
}

impl QueryState {
    pub fn matches(&self, record: &Record) -> bool {
        if !selection_matches(self.brand.as_deref(), &record.brand)
            || !selection_matches(self.sub_category.as_deref(), &record.sub_category)
            || !selection_matches(self.supplier.as_deref(), &record.supplier)
        {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        needle.is_empty() || record.search_text().contains(&needle)
    }

    /// Filtered records in the requested order.
    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        let mut selected = records
            .iter()
            .filter(|record| self.matches(record))
            .collect::<Vec<_>>();
        sort_records(&mut selected, self.sort);
        selected
    }
}

fn selection_matches(selected: Option<&str>, value: &str) -> bool {
    match selected {
        Some(wanted) if !wanted.is_empty() => wanted == value,
        _ => true,
    }
}

/// Stable sort. Unranked (NaN) profits compare as negative infinity.
pub fn sort_records(records: &mut [&Record], key: SortKey) {
    match key {
        SortKey::ProfitDesc => records.sort_by(|a, b| compare_numbers(b.profit_pct, a.profit_pct)),
        SortKey::ProfitAsc => records.sort_by(|a, b| compare_numbers(a.profit_pct, b.profit_pct)),
        SortKey::BrandAz => records.sort_by(|a, b| compare_text(&a.brand, &b.brand)),
        SortKey::BrandZa => records.sort_by(|a, b| compare_text(&b.brand, &a.brand)),
        SortKey::StockCodeAz => records.sort_by(|a, b| compare_text(&a.stock_code, &b.stock_code)),
        SortKey::StockCodeZa => records.sort_by(|a, b| compare_text(&b.stock_code, &a.stock_code)),
    }
}

pub fn compare_numbers(left: f64, right: f64) -> Ordering {
    rank(left).total_cmp(&rank(right))
}

fn rank(value: f64) -> f64 {
    if value.is_nan() { f64::NEG_INFINITY } else { value }
}

fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Brand,
    SubCategory,
    Supplier,
}

/// Sorted, de-duplicated non-empty values for a filter drop-down.
pub fn distinct_values(records: &[Record], facet: Facet) -> Vec<String> {
    records
        .iter()
        .map(|record| match facet {
            Facet::Brand => record.brand.as_str(),
            Facet::SubCategory => record.sub_category.as_str(),
            Facet::Supplier => record.supplier.as_str(),
        })
        .filter(|value| !value.is_empty())
        .unique()
        .sorted_by(|a, b| compare_text(a, b))
        .map(str::to_string)
        .collect()
}
