//! Row normalisation.
//!
//! A [`Normaliser`] turns one raw data row into a typed [`Record`] using the
//! column map resolved for the current load. Derived fields follow fixed
//! fallback chains:
//!
//! - **profit %**: the provided column when finite, otherwise
//!   `(price - cost) / cost * 100` from the first finite of sale price /
//!   ex-VAT price, otherwise NaN.
//! - **price basis**: first finite value among the configured price fields.
//! - **monthly revenue**: `units * price basis`, NaN when either side is NaN.
//! - **combined sales**: internet + eBay, each 0 when its column is unresolved.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::{
    alias::{ColumnIndexMap, Field},
    brand::BrandResolver,
    data::{self, parse_number, product},
    months::MonthColumn,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub stock_code: String,
    pub description: String,
    pub supplier: String,
    pub brand: String,
    pub sub_category: String,
    #[serde(serialize_with = "serialize_number")]
    pub price: f64,
    #[serde(serialize_with = "serialize_number")]
    pub cost: f64,
    #[serde(serialize_with = "serialize_number")]
    pub profit_pct: f64,
    #[serde(serialize_with = "serialize_number")]
    pub price_basis: f64,
    #[serde(serialize_with = "serialize_number")]
    pub available_qty: f64,
    #[serde(serialize_with = "serialize_number")]
    pub stock_value: f64,
    #[serde(serialize_with = "serialize_number")]
    pub ytd_sales: f64,
    pub months: Vec<MonthValue>,
    #[serde(serialize_with = "serialize_number")]
    pub internet_sales: f64,
    #[serde(serialize_with = "serialize_number")]
    pub ebay_sales: f64,
    #[serde(serialize_with = "serialize_number")]
    pub combined_sales: f64,
    pub last_invoice_date: String,
}

/// Units and derived revenue for one month column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthValue {
    pub name: String,
    #[serde(serialize_with = "serialize_number")]
    pub units: f64,
    #[serde(serialize_with = "serialize_number")]
    pub revenue: f64,
}

impl Record {
    /// Units for the first month column with this name; NaN when absent.
    pub fn units_for(&self, month: &str) -> f64 {
        self.months
            .iter()
            .find(|m| m.name == month)
            .map(|m| m.units)
            .unwrap_or(f64::NAN)
    }

    pub fn revenue_for(&self, month: &str) -> f64 {
        self.months
            .iter()
            .find(|m| m.name == month)
            .map(|m| m.revenue)
            .unwrap_or(f64::NAN)
    }

    /// Sum of monthly revenue with NaN months counted as zero.
    pub fn total_revenue(&self) -> f64 {
        data::sum_finite(self.months.iter().map(|m| m.revenue))
    }

    pub fn invoice_date(&self) -> Option<NaiveDate> {
        if self.last_invoice_date.is_empty() {
            return None;
        }
        data::parse_naive_date(&self.last_invoice_date).ok()
    }

    pub fn search_text(&self) -> String {
        format!("{} {}", self.description, self.stock_code).to_lowercase()
    }
}

pub(crate) fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

pub struct Normaliser<'a> {
    columns: &'a ColumnIndexMap,
    months: &'a [MonthColumn],
    price_basis: &'a [Field],
    brands: BrandResolver<'a>,
}

impl<'a> Normaliser<'a> {
    pub fn new(
        columns: &'a ColumnIndexMap,
        months: &'a [MonthColumn],
        price_basis: &'a [Field],
        brands: BrandResolver<'a>,
    ) -> Self {
        Self {
            columns,
            months,
            price_basis,
            brands,
        }
    }

    /// Builds a record, or `None` for a row with no non-blank cell.
    pub fn normalise(&mut self, row: &[String]) -> Option<Record> {
        if is_blank_row(row) {
            return None;
        }

        let number = |field: Field| -> f64 {
            match self.columns.get(field) {
                Some(idx) => parse_number(row.get(idx).map(String::as_str)),
                None => f64::NAN,
            }
        };
        let text = |field: Field| -> String {
            self.columns
                .get(field)
                .and_then(|idx| row.get(idx))
                .map(|cell| cell.trim().to_string())
                .unwrap_or_default()
        };
        let channel = |field: Field| -> f64 {
            if self.columns.is_resolved(field) {
                number(field)
            } else {
                0.0
            }
        };

        let price = first_finite([Field::SalePrice, Field::PriceExVat].map(number));
        let cost = number(Field::Cost);
        let profit_pct = derive_profit_pct(number(Field::ProfitPct), price, cost);
        let price_basis = first_finite(self.price_basis.iter().map(|field| number(*field)));

        let months = self
            .months
            .iter()
            .map(|month| {
                let units = parse_number(row.get(month.index).map(String::as_str));
                MonthValue {
                    name: month.name.clone(),
                    units,
                    revenue: product(units, price_basis),
                }
            })
            .collect();

        let internet_sales = channel(Field::InternetSales);
        let ebay_sales = channel(Field::EbaySales);

        let stock_code = text(Field::StockCode);
        let description = text(Field::Description);
        let supplier = text(Field::Supplier);
        let sub_category = text(Field::SubCategory);
        let last_invoice_date = text(Field::LastInvoiceDate);
        let available_qty = number(Field::AvailableQty);
        let stock_value = number(Field::StockValue);
        let ytd_sales = number(Field::YtdSales);
        let raw_brand = text(Field::Brand);
        let brand = self.brands.resolve(&raw_brand);

        Some(Record {
            stock_code,
            description,
            supplier,
            brand,
            sub_category,
            price,
            cost,
            profit_pct,
            price_basis,
            available_qty,
            stock_value,
            ytd_sales,
            months,
            internet_sales,
            ebay_sales,
            combined_sales: internet_sales + ebay_sales,
            last_invoice_date,
        })
    }
}

pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

/// Provided profit wins; otherwise derive from price and cost when both are
/// finite and cost is non-zero.
pub fn derive_profit_pct(provided: f64, price: f64, cost: f64) -> f64 {
    if provided.is_finite() {
        provided
    } else if price.is_finite() && cost.is_finite() && cost != 0.0 {
        ((price - cost) / cost) * 100.0
    } else {
        f64::NAN
    }
}

fn first_finite<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .find(|value| value.is_finite())
        .unwrap_or(f64::NAN)
}
