//! Rollups over normalised records.
//!
//! NaN values stay NaN on records and are counted as zero only here, at
//! summation time. Profit averages are taken over finite values only.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    data::{finite_or_zero, sum_finite},
    months::MonthColumn,
    record::{Record, serialize_number},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandSummary {
    pub brand: String,
    pub records: usize,
    pub combined_sales: f64,
    pub stock_value: f64,
    #[serde(serialize_with = "serialize_number")]
    pub avg_profit_pct: f64,
    pub revenue: f64,
    pub month_revenue: Vec<f64>,
}

#[derive(Debug, Clone)]
struct BrandAccumulator {
    brand: String,
    records: usize,
    combined_sales: f64,
    stock_value: f64,
    profit_sum: f64,
    profit_count: usize,
    month_revenue: Vec<f64>,
}

impl BrandAccumulator {
    fn new(brand: &str, months: usize) -> Self {
        Self {
            brand: brand.to_string(),
            records: 0,
            combined_sales: 0.0,
            stock_value: 0.0,
            profit_sum: 0.0,
            profit_count: 0,
            month_revenue: vec![0.0; months],
        }
    }

    fn ingest(&mut self, record: &Record) {
        self.records += 1;
        self.combined_sales += finite_or_zero(record.combined_sales);
        self.stock_value += finite_or_zero(record.stock_value);
        if record.profit_pct.is_finite() {
            self.profit_sum += record.profit_pct;
            self.profit_count += 1;
        }
        for (slot, month) in self.month_revenue.iter_mut().zip(&record.months) {
            *slot += finite_or_zero(month.revenue);
        }
    }

    fn finish(self) -> BrandSummary {
        let avg_profit_pct = if self.profit_count == 0 {
            f64::NAN
        } else {
            self.profit_sum / self.profit_count as f64
        };
        BrandSummary {
            revenue: self.month_revenue.iter().sum(),
            brand: self.brand,
            records: self.records,
            combined_sales: self.combined_sales,
            stock_value: self.stock_value,
            avg_profit_pct,
            month_revenue: self.month_revenue,
        }
    }
}

/// Groups records by canonical brand, ordered by descending revenue. Ties keep
/// first-encounter order. With `exclude` set, that brand (the fallback bucket)
/// is left out.
pub fn brand_summaries<'a, I>(records: I, months: &[MonthColumn], exclude: Option<&str>) -> Vec<BrandSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<BrandAccumulator> = Vec::new();
    for record in records {
        let slot = match positions.get(&record.brand) {
            Some(slot) => *slot,
            None => {
                positions.insert(record.brand.clone(), groups.len());
                groups.push(BrandAccumulator::new(&record.brand, months.len()));
                groups.len() - 1
            }
        };
        groups[slot].ingest(record);
    }

    let mut summaries = groups
        .into_iter()
        .filter(|group| exclude != Some(group.brand.as_str()))
        .map(BrandAccumulator::finish)
        .collect::<Vec<_>>();
    summaries.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    summaries
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlySeries {
    pub labels: Vec<String>,
    pub units: Vec<f64>,
    pub revenue: Vec<f64>,
}

impl MonthlySeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Global per-month totals, cut after the last month with any activity.
pub fn monthly_series<'a, I>(records: I, months: &[MonthColumn]) -> MonthlySeries
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut units = vec![0.0; months.len()];
    let mut revenue = vec![0.0; months.len()];
    for record in records {
        for (idx, month) in record.months.iter().enumerate().take(months.len()) {
            units[idx] += finite_or_zero(month.units);
            revenue[idx] += finite_or_zero(month.revenue);
        }
    }

    let keep = last_active_index(&revenue, &units).map_or(0, |idx| idx + 1);
    units.truncate(keep);
    revenue.truncate(keep);
    MonthlySeries {
        labels: months.iter().take(keep).map(|m| m.name.clone()).collect(),
        units,
        revenue,
    }
}

/// Last index, scanning from the end, where either series holds a finite
/// positive value.
pub fn last_active_index(revenue: &[f64], units: &[f64]) -> Option<usize> {
    let len = revenue.len().max(units.len());
    let active = |series: &[f64], idx: usize| {
        series
            .get(idx)
            .is_some_and(|value| value.is_finite() && *value > 0.0)
    };
    (0..len)
        .rev()
        .find(|idx| active(revenue, *idx) || active(units, *idx))
}

/// Truncates `series` after its last finite positive value.
pub fn truncate_trailing(series: &[f64]) -> Vec<f64> {
    match last_active_index(series, &[]) {
        Some(idx) => series[..=idx].to_vec(),
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub records: usize,
    pub stock_value: f64,
    #[serde(serialize_with = "serialize_number")]
    pub avg_profit_pct: f64,
    pub combined_sales: f64,
    pub revenue: f64,
}

pub fn kpis(records: &[&Record]) -> Kpis {
    Kpis {
        records: records.len(),
        stock_value: sum_finite(records.iter().map(|r| r.stock_value)),
        avg_profit_pct: if records.is_empty() {
            f64::NAN
        } else {
            sum_finite(records.iter().map(|r| r.profit_pct)) / records.len() as f64
        },
        combined_sales: sum_finite(records.iter().map(|r| r.combined_sales)),
        revenue: records.iter().map(|r| r.total_revenue()).sum(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareKey {
    Brand,
    Supplier,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShareSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Combined sales per brand or supplier, largest first. Entries past `top`
/// fold into a trailing `Other` slice when it is positive. Records in
/// `exclude` (the brand fallback bucket) are ignored.
pub fn share_by(records: &[&Record], key: ShareKey, top: usize, exclude: Option<&str>) -> ShareSeries {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<(String, f64)> = Vec::new();
    for record in records {
        let label = match key {
            ShareKey::Brand => record.brand.as_str(),
            ShareKey::Supplier => record.supplier.as_str(),
        };
        if key == ShareKey::Brand && exclude == Some(label) {
            continue;
        }
        let label = if label.is_empty() { "Unknown" } else { label };
        let slot = *positions.entry(label).or_insert_with(|| {
            totals.push((label.to_string(), 0.0));
            totals.len() - 1
        });
        totals[slot].1 += finite_or_zero(record.combined_sales);
    }
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    let other = totals.iter().skip(top).map(|(_, value)| value).sum::<f64>();
    totals.truncate(top);
    let (mut labels, mut values): (Vec<_>, Vec<_>) = totals.into_iter().unzip();
    if other > 0.0 {
        labels.push("Other".to_string());
        values.push(other);
    }
    ShareSeries { labels, values }
}

/// The first `limit` records with a finite profit, in the order given.
pub fn profit_ranking(records: &[&Record], limit: usize) -> ShareSeries {
    let (labels, values) = records
        .iter()
        .filter(|r| r.profit_pct.is_finite())
        .take(limit)
        .map(|r| (format!("{} — {}", r.stock_code, r.description), r.profit_pct))
        .unzip();
    ShareSeries { labels, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MonthValue;

    fn month_columns(names: &[&str]) -> Vec<MonthColumn> {
        names
            .iter()
            .enumerate()
            .map(|(index, name)| MonthColumn {
                name: name.to_string(),
                index,
            })
            .collect()
    }

    fn record(brand: &str, profit: f64, revenue: &[f64]) -> Record {
        Record {
            stock_code: format!("{brand}-1"),
            description: String::new(),
            supplier: String::new(),
            brand: brand.to_string(),
            sub_category: String::new(),
            price: f64::NAN,
            cost: f64::NAN,
            profit_pct: profit,
            price_basis: 1.0,
            available_qty: f64::NAN,
            stock_value: 10.0,
            ytd_sales: f64::NAN,
            months: revenue
                .iter()
                .enumerate()
                .map(|(idx, value)| MonthValue {
                    name: format!("m{idx}"),
                    units: *value,
                    revenue: *value,
                })
                .collect(),
            internet_sales: 1.0,
            ebay_sales: 1.0,
            combined_sales: 2.0,
            last_invoice_date: String::new(),
        }
    }

    #[test]
    fn truncates_after_last_positive_month() {
        let series = [100.0, 200.0, 0.0, f64::NAN, 0.0, 0.0];
        assert_eq!(truncate_trailing(&series), vec![100.0, 200.0]);
        assert_eq!(last_active_index(&series, &[0.0; 6]), Some(1));
        assert!(truncate_trailing(&[0.0, f64::NAN]).is_empty());
    }

    #[test]
    fn units_alone_keep_a_month_active() {
        assert_eq!(last_active_index(&[5.0, 0.0, 0.0], &[1.0, 0.0, 3.0]), Some(2));
    }

    #[test]
    fn brand_summaries_sort_by_revenue_and_keep_ties_stable() {
        let months = month_columns(&["m0", "m1"]);
        let records = vec![
            record("Bosch", 10.0, &[1.0, 1.0]),
            record("Makita", f64::NAN, &[5.0, 0.0]),
            record("DeWalt", 30.0, &[1.0, 1.0]),
            record("Bosch", 20.0, &[f64::NAN, 1.0]),
        ];
        let summaries = brand_summaries(&records, &months, None);
        let brands = summaries.iter().map(|s| s.brand.as_str()).collect::<Vec<_>>();
        assert_eq!(brands, vec!["Makita", "Bosch", "DeWalt"]);

        let bosch = &summaries[1];
        assert_eq!(bosch.records, 2);
        assert_eq!(bosch.revenue, 3.0);
        assert_eq!(bosch.month_revenue, vec![1.0, 2.0]);
        assert_eq!(bosch.avg_profit_pct, 15.0);
        assert_eq!(bosch.stock_value, 20.0);
        assert!(summaries[0].avg_profit_pct.is_nan());
    }

    #[test]
    fn brand_summaries_can_drop_fallback_bucket() {
        let months = month_columns(&["m0"]);
        let records = vec![record("Other", 1.0, &[9.0]), record("Bosch", 1.0, &[1.0])];
        let kept = brand_summaries(&records, &months, None);
        assert_eq!(kept.len(), 2);
        let dropped = brand_summaries(&records, &months, Some("Other"));
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].brand, "Bosch");
    }

    #[test]
    fn monthly_series_sums_and_truncates() {
        let months = month_columns(&["m0", "m1", "m2", "m3"]);
        let records = vec![
            record("Bosch", 1.0, &[1.0, 0.0, 2.0, 0.0]),
            record("Makita", 1.0, &[f64::NAN, 4.0, 0.0, 0.0]),
        ];
        let series = monthly_series(&records, &months);
        assert_eq!(series.labels, vec!["m0", "m1", "m2"]);
        assert_eq!(series.revenue, vec![1.0, 4.0, 2.0]);
        assert_eq!(series.units, vec![1.0, 4.0, 2.0]);

        let empty = monthly_series(&[record("Bosch", 1.0, &[0.0, 0.0, 0.0, 0.0])], &months);
        assert!(empty.is_empty());
    }

    #[test]
    fn kpis_reduce_the_current_scope() {
        let a = record("Bosch", 10.0, &[2.0]);
        let b = record("Makita", f64::NAN, &[f64::NAN]);
        let stats = kpis(&[&a, &b]);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.stock_value, 20.0);
        assert_eq!(stats.avg_profit_pct, 5.0);
        assert_eq!(stats.combined_sales, 4.0);
        assert_eq!(stats.revenue, 2.0);
    }

    #[test]
    fn kpis_of_an_empty_scope_have_no_profit_mean() {
        let stats = kpis(&[]);
        assert_eq!(stats.records, 0);
        assert!(stats.avg_profit_pct.is_nan());
        assert_eq!(stats.revenue, 0.0);
    }

    #[test]
    fn share_by_folds_the_tail_into_other() {
        let records = ["A", "B", "B", "C", "D"]
            .iter()
            .map(|brand| record(brand, 1.0, &[]))
            .collect::<Vec<_>>();
        let refs = records.iter().collect::<Vec<_>>();
        let shares = share_by(&refs, ShareKey::Brand, 2, None);
        assert_eq!(shares.labels, vec!["B", "A", "Other"]);
        assert_eq!(shares.values, vec![4.0, 2.0, 4.0]);

        let suppliers = share_by(&refs, ShareKey::Supplier, 10, None);
        assert_eq!(suppliers.labels, vec!["Unknown"]);
        assert_eq!(suppliers.values, vec![10.0]);
    }

    #[test]
    fn profit_ranking_skips_unranked_records() {
        let a = record("A", f64::NAN, &[]);
        let b = record("B", 12.5, &[]);
        let ranking = profit_ranking(&[&a, &b], 10);
        assert_eq!(ranking.labels, vec!["B-1 — "]);
        assert_eq!(ranking.values, vec![12.5]);
    }
}
