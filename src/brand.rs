//! Brand canonicalisation.
//!
//! Free-text manufacturer columns are reconciled into a canonical taxonomy:
//!
//! 1. [`normalise_key()`] lower-cases and drops every non-alphanumeric character.
//! 2. Empty or excluded keys become the fallback label.
//! 3. Keys found in the [`BrandTable`] become the table's canonical name.
//! 4. Anything else is passed through (trimmed) or replaced by the fallback
//!    label, depending on [`BrandPolicy`].
//!
//! The table itself is configuration data. An embedded default ships with the
//! crate and [`BrandTable::load`] reads a replacement from YAML.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    fs::File,
    io::BufReader,
    path::Path,
};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

const DEFAULT_TABLE_YAML: &str = include_str!("../assets/brands.yaml");

pub fn normalise_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "kebab-case")]
pub enum BrandPolicy {
    /// Unlisted brands keep their (trimmed) source text.
    #[default]
    Passthrough,
    /// Unlisted brands collapse into the fallback bucket.
    Fallback,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FallbackLabel {
    #[default]
    Other,
    Unknown,
}

impl FallbackLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackLabel::Other => "Other",
            FallbackLabel::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FallbackLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk shape of a brand table: canonical name to its known spellings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BrandTableFile {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    brands: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct BrandTable {
    lookup: HashMap<String, String>,
    excluded: HashSet<String>,
}

impl BrandTable {
    pub fn embedded() -> Result<Self> {
        Self::from_yaml_str(DEFAULT_TABLE_YAML).context("Parsing embedded brand table")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening brand table {path:?}"))?;
        let parsed: BrandTableFile = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing brand table {path:?}"))?;
        Self::from_file(parsed)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let parsed: BrandTableFile = serde_yaml::from_str(input).context("Parsing brand table YAML")?;
        Self::from_file(parsed)
    }

    fn from_file(file: BrandTableFile) -> Result<Self> {
        let mut table = BrandTable::default();
        for (canonical, spellings) in &file.brands {
            let canonical = canonical.trim();
            if canonical.is_empty() {
                bail!("Brand table contains an empty canonical name");
            }
            table.insert(canonical, canonical)?;
            for spelling in spellings {
                table.insert(spelling, canonical)?;
            }
        }
        for entry in &file.exclude {
            table.exclude(entry);
        }
        Ok(table)
    }

    /// Maps `spelling` to `canonical`. Re-mapping a key to a different
    /// canonical name is rejected.
    pub fn insert(&mut self, spelling: &str, canonical: &str) -> Result<()> {
        let key = normalise_key(spelling);
        if key.is_empty() {
            return Ok(());
        }
        if let Some(existing) = self.lookup.get(&key)
            && existing != canonical
        {
            bail!(
                "Brand spelling '{spelling}' maps to both '{existing}' and '{canonical}'"
            );
        }
        self.lookup.insert(key, canonical.to_string());
        Ok(())
    }

    pub fn exclude(&mut self, spelling: &str) {
        let key = normalise_key(spelling);
        if !key.is_empty() {
            self.excluded.insert(key);
        }
    }

    pub fn lookup_key(&self, key: &str) -> Option<&str> {
        self.lookup.get(key).map(String::as_str)
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        self.excluded.contains(key)
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// Outcome of classifying one raw brand value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrandMatch<'a> {
    Known(&'a str),
    Fallback,
    Unlisted { key: String },
}

#[derive(Debug, Clone)]
pub struct BrandCanonicaliser {
    table: BrandTable,
    policy: BrandPolicy,
    fallback: FallbackLabel,
}

impl BrandCanonicaliser {
    pub fn new(table: BrandTable, policy: BrandPolicy, fallback: FallbackLabel) -> Self {
        Self {
            table,
            policy,
            fallback,
        }
    }

    pub fn fallback(&self) -> FallbackLabel {
        self.fallback
    }

    pub fn classify(&self, raw: &str) -> BrandMatch<'_> {
        let key = normalise_key(raw);
        if key.is_empty() || self.table.is_excluded(&key) {
            return BrandMatch::Fallback;
        }
        match self.table.lookup_key(&key) {
            Some(canonical) => BrandMatch::Known(canonical),
            None => match self.policy {
                BrandPolicy::Passthrough => BrandMatch::Unlisted { key },
                BrandPolicy::Fallback => BrandMatch::Fallback,
            },
        }
    }

    /// Canonical name for a single value. Unlisted brands under
    /// [`BrandPolicy::Passthrough`] come back as their trimmed source text;
    /// use a [`BrandResolver`] to unify their spellings across a load.
    pub fn canonicalise(&self, raw: &str) -> String {
        match self.classify(raw) {
            BrandMatch::Known(canonical) => canonical.to_string(),
            BrandMatch::Fallback => self.fallback.as_str().to_string(),
            BrandMatch::Unlisted { .. } => raw.trim().to_string(),
        }
    }

    pub fn resolver(&self) -> BrandResolver<'_> {
        BrandResolver {
            canonicaliser: self,
            unlisted: HashMap::new(),
        }
    }
}

/// Per-load brand resolution. Unlisted brands are interned by key so the first
/// spelling encountered becomes the display name for every later variant.
#[derive(Debug)]
pub struct BrandResolver<'a> {
    canonicaliser: &'a BrandCanonicaliser,
    unlisted: HashMap<String, String>,
}

impl BrandResolver<'_> {
    pub fn resolve(&mut self, raw: &str) -> String {
        match self.canonicaliser.classify(raw) {
            BrandMatch::Known(canonical) => canonical.to_string(),
            BrandMatch::Fallback => self.canonicaliser.fallback.as_str().to_string(),
            BrandMatch::Unlisted { key } => self
                .unlisted
                .entry(key)
                .or_insert_with(|| {
                    debug!("Passing through unlisted brand '{}'", raw.trim());
                    raw.trim().to_string()
                })
                .clone(),
        }
    }

    pub fn unlisted_count(&self) -> usize {
        self.unlisted.len()
    }
}
