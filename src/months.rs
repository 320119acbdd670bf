//! Month column detection.
//!
//! Ledger exports carry one column per month of the trading year. A header is a
//! month column when it contains one of the cycle's month labels as a whole
//! word. Only the first `length * cycles` matches are kept, so a second year of
//! repeated month labels is ignored unless more cycles are configured.

use anyhow::{Result, anyhow, ensure};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonthCycle {
    pub start: String,
    pub length: usize,
    pub cycles: usize,
}

impl Default for MonthCycle {
    fn default() -> Self {
        Self {
            start: "Aug".to_string(),
            length: 12,
            cycles: 1,
        }
    }
}

impl MonthCycle {
    /// Month labels in cycle order, e.g. `Aug, Sep, ... Jul`.
    pub fn labels(&self) -> Result<Vec<&'static str>> {
        ensure!(
            (1..=12).contains(&self.length),
            "Month cycle length must be between 1 and 12, got {}",
            self.length
        );
        let start = MONTH_LABELS
            .iter()
            .position(|label| label.eq_ignore_ascii_case(self.start.trim()))
            .ok_or_else(|| anyhow!("Unknown month '{}' for cycle start", self.start))?;
        Ok((0..self.length)
            .map(|offset| MONTH_LABELS[(start + offset) % 12])
            .collect())
    }

    pub fn max_columns(&self) -> usize {
        self.length * self.cycles.max(1)
    }

    /// Compiles the cycle into a reusable detector.
    pub fn detector(&self) -> Result<MonthDetector> {
        let labels = self.labels()?;
        let pattern = format!(r"(?i)(^|\s)({})(\s|$)", labels.join("|"));
        Ok(MonthDetector {
            matcher: Regex::new(&pattern)?,
            limit: self.max_columns(),
        })
    }

    pub fn detect(&self, headers: &[String]) -> Result<Vec<MonthColumn>> {
        Ok(self.detector()?.detect(headers))
    }
}

#[derive(Debug, Clone)]
pub struct MonthDetector {
    matcher: Regex,
    limit: usize,
}

impl MonthDetector {
    pub fn detect(&self, headers: &[String]) -> Vec<MonthColumn> {
        let columns = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| self.matcher.is_match(header))
            .map(|(index, header)| MonthColumn {
                name: header.clone(),
                index,
            })
            .take(self.limit)
            .collect::<Vec<_>>();
        debug!(
            "Detected {} month column(s): {:?}",
            columns.len(),
            columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );
        columns
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthColumn {
    pub name: String,
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn labels_wrap_from_configured_start() {
        let cycle = MonthCycle::default();
        let labels = cycle.labels().unwrap();
        assert_eq!(labels.first(), Some(&"Aug"));
        assert_eq!(labels.last(), Some(&"Jul"));
        assert_eq!(labels.len(), 12);
    }

    #[test]
    fn detects_whole_word_month_headers_only() {
        let cycle = MonthCycle::default();
        let found = cycle
            .detect(&headers(&["Stock Code", "Aug 24", "Sept", "sep 24", "Marketing", "Oct"]))
            .unwrap();
        let names = found.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Aug 24", "sep 24", "Oct"]);
        assert_eq!(found[1].index, 3);
    }

    #[test]
    fn keeps_only_the_first_run_by_default() {
        let mut months = MONTH_LABELS
            .iter()
            .map(|m| format!("{m} 23"))
            .collect::<Vec<_>>();
        months.extend(MONTH_LABELS.iter().map(|m| format!("{m} 24")));
        let cycle = MonthCycle::default();
        assert_eq!(cycle.detect(&months).unwrap().len(), 12);

        let two_years = MonthCycle {
            cycles: 2,
            ..MonthCycle::default()
        };
        assert_eq!(two_years.detect(&months).unwrap().len(), 24);
    }

    #[test]
    fn short_cycle_only_recognises_its_months() {
        let cycle = MonthCycle {
            start: "nov".to_string(),
            length: 3,
            cycles: 1,
        };
        let found = cycle
            .detect(&headers(&["Oct", "Nov", "Dec", "Jan", "Feb"]))
            .unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].name, "Nov");
    }

    #[test]
    fn rejects_unknown_start_month() {
        let cycle = MonthCycle {
            start: "Smarch".to_string(),
            ..MonthCycle::default()
        };
        assert!(cycle.labels().is_err());
    }
}
