//! Pipeline configuration.
//!
//! Every option has a default so an empty (or absent) YAML file describes the
//! standard ledger export. Alias overrides replace the default rule for the
//! fields they name and leave the rest untouched.

use std::{fs::File, io::BufReader, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result, ensure};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    alias::{AliasTable, Field},
    brand::{BrandCanonicaliser, BrandPolicy, BrandTable, FallbackLabel},
    header::DEFAULT_HEADER_ROWS,
    months::MonthCycle,
};

pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub header_rows: usize,
    pub months: MonthCycle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<AliasTable>,
    pub brands: BrandSettings,
    pub price_basis: Vec<Field>,
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            header_rows: DEFAULT_HEADER_ROWS,
            months: MonthCycle::default(),
            aliases: None,
            brands: BrandSettings::default(),
            price_basis: vec![Field::SalePriceExVat, Field::PriceExVat],
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandSettings {
    /// Brand table YAML; the embedded table is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<PathBuf>,
    pub policy: BrandPolicy,
    pub fallback: FallbackLabel,
    /// Drop the fallback bucket from brand rollups and share series.
    pub exclude_fallback: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: Option<Config> =
            serde_yaml::from_reader(reader).with_context(|| format!("Parsing config {path:?}"))?;
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: Option<Config> = serde_yaml::from_str(input).context("Parsing config YAML")?;
        let config = config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.header_rows > 0, "header_rows must be at least 1");
        self.months.labels().context("Validating month cycle")?;
        ensure!(self.months.cycles > 0, "months.cycles must be at least 1");
        Ok(())
    }

    pub fn alias_table(&self) -> AliasTable {
        let mut table = AliasTable::default();
        if let Some(overrides) = &self.aliases {
            table.merge(overrides);
        }
        table
    }

    pub fn brand_canonicaliser(&self) -> Result<BrandCanonicaliser> {
        let table = match &self.brands.table {
            Some(path) => BrandTable::load(path)?,
            None => BrandTable::embedded()?,
        };
        if table.is_empty() {
            warn!(
                "Brand table has no entries; every brand follows the {:?} policy",
                self.brands.policy
            );
        } else {
            debug!("Brand table maps {} spelling(s)", table.len());
        }
        Ok(BrandCanonicaliser::new(
            table,
            self.brands.policy,
            self.brands.fallback,
        ))
    }

    pub fn debounce_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::MatchMode;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.header_rows, 3);
        assert_eq!(config.months.start, "Aug");
        assert_eq!(config.debounce_interval(), Duration::from_millis(150));
    }

    #[test]
    fn alias_overrides_replace_only_named_fields() {
        let config = Config::from_yaml_str(
            r#"
aliases:
  brand:
    mode: exact
    candidates: ["Manu/ Brand"]
"#,
        )
        .unwrap();
        let table = config.alias_table();
        let brand = table.rule(Field::Brand).unwrap();
        assert_eq!(brand.mode, MatchMode::Exact);
        assert_eq!(brand.candidates, vec!["Manu/ Brand"]);
        let stock = table.rule(Field::StockCode).unwrap();
        assert_eq!(stock.candidates, vec!["stock code"]);
    }

    #[test]
    fn parses_brand_and_price_settings() {
        let config = Config::from_yaml_str(
            r#"
header_rows: 2
months: { start: Jan, cycles: 2 }
brands:
  policy: fallback
  fallback: Unknown
  exclude_fallback: true
price_basis: [price_ex_vat]
"#,
        )
        .unwrap();
        assert_eq!(config.header_rows, 2);
        assert_eq!(config.months.length, 12);
        assert_eq!(config.months.cycles, 2);
        assert_eq!(config.brands.policy, BrandPolicy::Fallback);
        assert_eq!(config.brands.fallback, FallbackLabel::Unknown);
        assert!(config.brands.exclude_fallback);
        assert_eq!(config.price_basis, vec![Field::PriceExVat]);
    }

    #[test]
    fn empty_brand_table_passes_brands_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brands.yaml");
        std::fs::write(&path, "brands: {}\n").unwrap();
        let mut config = Config::default();
        config.brands.table = Some(path);
        let canonicaliser = config.brand_canonicaliser().unwrap();
        assert_eq!(canonicaliser.canonicalise(" milwaukee "), "milwaukee");
        assert_eq!(canonicaliser.canonicalise(""), "Other");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Config::from_yaml_str("header_rows: 0").is_err());
        assert!(Config::from_yaml_str("months: { start: Foo }").is_err());
        assert!(Config::from_yaml_str("price_basis: [not_a_field]").is_err());
    }
}
