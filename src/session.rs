//! Loaded-dataset state.
//!
//! A [`Session`] owns the configuration, the compiled brand canonicaliser and
//! month detector, and at most one [`Dataset`]. A load builds a complete new
//! dataset before swapping it in, so a failed load leaves the previous one
//! active. Filter changes go through a debouncer and are recomputed from the
//! current dataset on demand.

use std::time::Instant;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info};
use serde::Serialize;

use crate::{
    aggregate::{self, BrandSummary, Kpis, MonthlySeries, ShareKey, ShareSeries},
    alias::{AliasTable, ColumnIndexMap, Field},
    brand::BrandCanonicaliser,
    config::Config,
    debounce::Debouncer,
    error::LoadError,
    header,
    io_utils::{self, RawTable},
    months::{MonthColumn, MonthDetector},
    query::QueryState,
    record::{Normaliser, Record},
    source::Source,
};

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub source: String,
    pub headers: Vec<String>,
    pub columns: ColumnIndexMap,
    pub months: Vec<MonthColumn>,
    pub records: Vec<Record>,
    pub skipped_rows: usize,
}

impl Dataset {
    pub fn query(&self, state: &QueryState) -> Vec<&Record> {
        state.apply(&self.records)
    }

    pub fn brand_summaries(&self, records: &[&Record], exclude: Option<&str>) -> Vec<BrandSummary> {
        aggregate::brand_summaries(records.iter().copied(), &self.months, exclude)
    }

    pub fn monthly_series(&self, records: &[&Record]) -> MonthlySeries {
        aggregate::monthly_series(records.iter().copied(), &self.months)
    }
}

/// Everything a presentation layer renders for one query state.
#[derive(Debug, Clone, Serialize)]
pub struct View<'a> {
    pub records: Vec<&'a Record>,
    pub brands: Vec<BrandSummary>,
    pub monthly: MonthlySeries,
    pub kpis: Kpis,
    pub brand_share: ShareSeries,
    pub supplier_share: ShareSeries,
}

pub const SHARE_TOP_N: usize = 10;

pub struct Session {
    config: Config,
    aliases: AliasTable,
    canonicaliser: BrandCanonicaliser,
    months: MonthDetector,
    dataset: Option<Dataset>,
    query: QueryState,
    debouncer: Debouncer,
}

impl Session {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let canonicaliser = config
            .brand_canonicaliser()
            .context("Loading brand table")?;
        let months = config.months.detector()?;
        let debouncer = Debouncer::new(config.debounce_interval());
        Ok(Self {
            aliases: config.alias_table(),
            canonicaliser,
            months,
            dataset: None,
            query: QueryState::default(),
            debouncer,
            config,
        })
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    /// The brand excluded from rollups, when the fallback bucket is hidden.
    pub fn excluded_brand(&self) -> Option<&'static str> {
        self.config
            .brands
            .exclude_fallback
            .then(|| self.canonicaliser.fallback().as_str())
    }

    /// Fetches, tokenises and normalises a ledger. The current dataset is only
    /// replaced once every step has succeeded.
    pub fn load(&mut self, source: &Source, options: LoadOptions) -> Result<&Dataset, LoadError> {
        let bytes = source.fetch()?;
        let delimiter = io_utils::resolve_input_delimiter(source.path_hint(), options.delimiter);
        let rows = io_utils::read_raw_table(&bytes, delimiter, options.encoding)?;
        Ok(self.load_rows(source.to_string(), rows))
    }

    /// Replaces the dataset with one built from an already tokenised table.
    pub fn load_rows(&mut self, source_name: String, rows: RawTable) -> &Dataset {
        let dataset = self.build(source_name, &rows);
        self.dataset.insert(dataset)
    }

    fn build(&self, source_name: String, rows: &RawTable) -> Dataset {
        let (header_rows, body) = header::split_header_rows(rows, self.config.header_rows);
        let headers = header::synthesise_header(header_rows);
        let columns = self.aliases.resolve(&headers);
        let months = self.months.detect(&headers);

        let mut normaliser = Normaliser::new(
            &columns,
            &months,
            &self.config.price_basis,
            self.canonicaliser.resolver(),
        );
        let mut records = Vec::with_capacity(body.len());
        let mut skipped_rows = 0usize;
        for row in body {
            match normaliser.normalise(row) {
                Some(record) => records.push(record),
                None => skipped_rows += 1,
            }
        }

        if skipped_rows > 0 {
            debug!("Skipped {skipped_rows} blank row(s) in {source_name}");
        }
        info!(
            "Loaded {} record(s) from {} ({} of {} field(s) resolved, {} month column(s))",
            records.len(),
            source_name,
            Field::ALL.len() - columns.unresolved().len(),
            Field::ALL.len(),
            months.len()
        );

        Dataset {
            source: source_name,
            headers,
            columns,
            months,
            records,
            skipped_rows,
        }
    }

    /// Computes the full presentation view for `state`.
    pub fn view(&self, state: &QueryState) -> Option<View<'_>> {
        let dataset = self.dataset.as_ref()?;
        let exclude = self.excluded_brand();
        let records = dataset.query(state);
        Some(View {
            brands: dataset.brand_summaries(&records, exclude),
            monthly: dataset.monthly_series(&records),
            kpis: aggregate::kpis(&records),
            brand_share: aggregate::share_by(&records, ShareKey::Brand, SHARE_TOP_N, exclude),
            supplier_share: aggregate::share_by(&records, ShareKey::Supplier, SHARE_TOP_N, None),
            records,
        })
    }

    /// Records a new filter state; the recomputation is deferred until
    /// [`Session::poll_refresh`] runs after the debounce interval.
    pub fn request_refresh(&mut self, state: QueryState, now: Instant) {
        self.query = state;
        self.debouncer.trigger(now);
    }

    pub fn poll_refresh(&mut self, now: Instant) -> Option<View<'_>> {
        if !self.debouncer.ready(now) {
            return None;
        }
        self.view(&self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn table(rows: &[&[&str]]) -> RawTable {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn sample() -> RawTable {
        table(&[
            &["Stock", "Manu/", "Internet", "Ebay", "Sale Price", "Aug"],
            &["Code", "Brand", "Sales", "", "Ex Vat", ""],
            &["", "", "", "", "", ""],
            &["M1", "Milwaukee", "3", "2", "10", "4"],
            &["", "", "", "", "", ""],
            &["M2", "milwaukee ", "1", "0", "10", ""],
        ])
    }

    #[test]
    fn load_rows_builds_records_and_skips_blank_rows() {
        let mut session = Session::new(Config::default()).unwrap();
        let dataset = session.load_rows("sample".to_string(), sample());
        assert_eq!(dataset.headers[0], "Stock Code");
        assert_eq!(dataset.headers[1], "Manu/ Brand");
        assert_eq!(dataset.records.len(), 2);
        assert_eq!(dataset.skipped_rows, 1);
        assert_eq!(dataset.months.len(), 1);
    }

    #[test]
    fn failed_load_keeps_previous_dataset() {
        let mut session = Session::new(Config::default()).unwrap();
        session.load_rows("sample".to_string(), sample());
        let missing = Source::parse("/no/such/ledger.csv");
        assert!(session.load(&missing, LoadOptions::default()).is_err());
        let dataset = session.dataset().expect("previous dataset");
        assert_eq!(dataset.source, "sample");
        assert_eq!(dataset.records.len(), 2);
    }

    #[test]
    fn view_groups_brand_variants() {
        let mut session = Session::new(Config::default()).unwrap();
        session.load_rows("sample".to_string(), sample());
        let view = session.view(&QueryState::default()).unwrap();
        assert_eq!(view.brands.len(), 1);
        assert_eq!(view.brands[0].brand, "Milwaukee");
        assert_eq!(view.brands[0].combined_sales, 6.0);
        assert_eq!(view.kpis.records, 2);
        assert_eq!(view.monthly.revenue, vec![40.0]);
    }

    #[test]
    fn refresh_is_debounced() {
        let mut session = Session::new(Config::default()).unwrap();
        session.load_rows("sample".to_string(), sample());
        let start = Instant::now();
        let search = |text: &str| QueryState {
            search: text.to_string(),
            ..QueryState::default()
        };
        session.request_refresh(search("m"), start);
        session.request_refresh(search("m2"), start + Duration::from_millis(40));
        assert!(session.poll_refresh(start + Duration::from_millis(100)).is_none());
        let view = session
            .poll_refresh(start + Duration::from_millis(200))
            .expect("refresh due");
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.records[0].stock_code, "M2");
        assert!(session.poll_refresh(start + Duration::from_millis(400)).is_none());
    }

    #[test]
    fn view_without_dataset_is_none() {
        let session = Session::new(Config::default()).unwrap();
        assert!(session.view(&QueryState::default()).is_none());
    }
}
