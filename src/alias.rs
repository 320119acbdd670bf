//! Header alias resolution.
//!
//! Maps each semantic [`Field`] to a column of the synthesised header. Two
//! strategies are supported per field:
//!
//! - **Tolerant**: case-insensitive substring search, candidates tried in
//!   priority order, first matching column wins.
//! - **Exact**: verbatim lookup of the full header text, falling back to the
//!   tolerant search when no candidate appears verbatim.
//!
//! An unresolved field is not an error; the resulting [`ColumnIndexMap`]
//! simply reports `None` for it.

use std::{collections::BTreeMap, collections::HashMap, fmt};

use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    StockCode,
    Description,
    Supplier,
    Brand,
    SubCategory,
    SalePrice,
    SalePriceExVat,
    PriceExVat,
    Cost,
    ProfitPct,
    AvailableQty,
    StockValue,
    YtdSales,
    InternetSales,
    EbaySales,
    LastInvoiceDate,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::StockCode,
        Field::Description,
        Field::Supplier,
        Field::Brand,
        Field::SubCategory,
        Field::SalePrice,
        Field::SalePriceExVat,
        Field::PriceExVat,
        Field::Cost,
        Field::ProfitPct,
        Field::AvailableQty,
        Field::StockValue,
        Field::YtdSales,
        Field::InternetSales,
        Field::EbaySales,
        Field::LastInvoiceDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::StockCode => "stockCode",
            Field::Description => "description",
            Field::Supplier => "supplier",
            Field::Brand => "brand",
            Field::SubCategory => "subCategory",
            Field::SalePrice => "salePrice",
            Field::SalePriceExVat => "salePriceExVat",
            Field::PriceExVat => "priceExVat",
            Field::Cost => "cost",
            Field::ProfitPct => "profitPct",
            Field::AvailableQty => "availableQty",
            Field::StockValue => "stockValue",
            Field::YtdSales => "ytdSales",
            Field::InternetSales => "internetSales",
            Field::EbaySales => "ebaySales",
            Field::LastInvoiceDate => "lastInvoiceDate",
        }
    }

    fn default_candidates(&self) -> &'static [&'static str] {
        match self {
            Field::StockCode => &["stock code"],
            Field::Description => &["description"],
            Field::Supplier => &["supplier", "buying"],
            Field::Brand => &["brand", "manu"],
            Field::SubCategory => &["sub category", "sub-category", "subcategory"],
            Field::SalePrice => &["sale price", "online price", "online"],
            Field::SalePriceExVat => &["sale price ex vat"],
            Field::PriceExVat => &["online price ex vat", "online pr ex vat", "price ex vat"],
            Field::Cost => &["cost", "average cost price", "calculated cost", "calc cost"],
            Field::ProfitPct => &["% profit", "profit %", "calculated % profit"],
            Field::AvailableQty => &["available stock", "available", "stock", "quantity"],
            Field::StockValue => &["stock value", "available value", "value"],
            Field::YtdSales => &["sales year to date", "year to date", "ytd"],
            Field::InternetSales => &["internet sales", "internet"],
            Field::EbaySales => &["ebay", "ebay sales"],
            Field::LastInvoiceDate => &["last invoice date", "last invoice", "invoice date"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Tolerant,
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    #[serde(default)]
    pub mode: MatchMode,
    pub candidates: Vec<String>,
}

impl AliasRule {
    pub fn tolerant<S: AsRef<str>>(candidates: &[S]) -> Self {
        Self {
            mode: MatchMode::Tolerant,
            candidates: candidates.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    pub fn exact<S: AsRef<str>>(candidates: &[S]) -> Self {
        Self {
            mode: MatchMode::Exact,
            candidates: candidates.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    rules: BTreeMap<Field, AliasRule>,
}

impl Default for AliasTable {
    fn default() -> Self {
        let rules = Field::ALL
            .iter()
            .map(|field| (*field, AliasRule::tolerant(field.default_candidates())))
            .collect();
        Self { rules }
    }
}

impl AliasTable {
    pub fn rule(&self, field: Field) -> Option<&AliasRule> {
        self.rules.get(&field)
    }

    pub fn set(&mut self, field: Field, rule: AliasRule) {
        self.rules.insert(field, rule);
    }

    /// Overlays `overrides` onto this table, replacing whole rules per field.
    pub fn merge(&mut self, overrides: &AliasTable) {
        for (field, rule) in &overrides.rules {
            self.rules.insert(*field, rule.clone());
        }
    }

    pub fn resolve(&self, headers: &[String]) -> ColumnIndexMap {
        let lowered = headers
            .iter()
            .map(|h| h.to_lowercase())
            .collect::<Vec<_>>();
        let mut verbatim: HashMap<&str, usize> = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            verbatim.entry(header.trim()).or_insert(idx);
        }

        let mut indices = BTreeMap::new();
        for (field, rule) in &self.rules {
            let resolved = match rule.mode {
                MatchMode::Exact => rule
                    .candidates
                    .iter()
                    .find_map(|candidate| verbatim.get(candidate.trim()).copied())
                    .or_else(|| find_column_index(&lowered, &rule.candidates)),
                MatchMode::Tolerant => find_column_index(&lowered, &rule.candidates),
            };
            match resolved {
                Some(idx) => {
                    indices.insert(*field, idx);
                }
                None => debug!("Column for '{field}' not resolved; treating as absent"),
            }
        }
        ColumnIndexMap { indices }
    }
}

/// Tolerant search over pre-lowered headers: first candidate with any
/// containing column wins, and within a candidate the first column wins.
pub fn find_column_index<S: AsRef<str>>(lowered_headers: &[String], candidates: &[S]) -> Option<usize> {
    candidates.iter().find_map(|candidate| {
        let needle = candidate.as_ref().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        lowered_headers
            .iter()
            .position(|header| header.contains(needle.as_str()))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnIndexMap {
    indices: BTreeMap<Field, usize>,
}

impl ColumnIndexMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.indices.get(&field).copied()
    }

    pub fn is_resolved(&self, field: Field) -> bool {
        self.indices.contains_key(&field)
    }

    /// Index as reported to presentation code, with `-1` for unresolved.
    pub fn display_index(&self, field: Field) -> i64 {
        self.get(field).map(|idx| idx as i64).unwrap_or(-1)
    }

    /// Fields resolved to header column `index`.
    pub fn fields_at(&self, index: usize) -> Vec<Field> {
        self.indices
            .iter()
            .filter(|(_, idx)| **idx == index)
            .map(|(field, _)| *field)
            .collect()
    }

    pub fn unresolved(&self) -> Vec<Field> {
        Field::ALL
            .iter()
            .copied()
            .filter(|field| !self.is_resolved(*field))
            .collect()
    }
}
