//! Per-member normalization factors.
//!
//! Table format, one file per PDF set (`<dir>/<set>.txt`):
//!
//! ```text
//! # dataset set member factor
//! 110101 CT10nlo 0 1.0000
//! 110101 CT10nlo 1 0.9987
//! ```
//!
//! Lines starting with `#` and blank lines are skipped; fields are
//! whitespace-separated. Rows match on the exact dataset id and on set names
//! that start with the requested set name.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use pw_core::{Error, Result};

/// One `(dataset, set, member, factor)` row.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationRow {
    /// Dataset (sample) id.
    pub dataset: u32,
    /// PDF set name as written in the table.
    pub set: String,
    /// Member index.
    pub member: usize,
    /// Multiplicative factor applied to the member weight.
    pub factor: f64,
}

impl NormalizationRow {
    fn matches(&self, dataset: u32, set: &str) -> bool {
        self.dataset == dataset && self.set.starts_with(set)
    }
}

/// Parse one table line. `Ok(None)` for comments and blank lines.
fn parse_line(line: &str, lineno: usize) -> Result<Option<NormalizationRow>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let bad = |what: &str| {
        Error::Validation(format!("normalization table line {lineno}: {what} in '{trimmed}'"))
    };
    let mut fields = trimmed.split_whitespace();
    let (Some(dataset), Some(set), Some(member), Some(factor)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(bad("expected 4 fields"));
    };
    let dataset = dataset.parse::<u32>().map_err(|_| bad("bad dataset id"))?;
    let member = member.parse::<usize>().map_err(|_| bad("bad member index"))?;
    let factor = factor.parse::<f64>().map_err(|_| bad("bad factor"))?;
    if !factor.is_finite() {
        return Err(bad("non-finite factor"));
    }
    Ok(Some(NormalizationRow { dataset, set: set.to_string(), member, factor }))
}

/// Collects factors for one (dataset, set) until every member is seen.
struct FactorCollector<'a> {
    dataset: u32,
    set: &'a str,
    slots: Vec<Option<f64>>,
    found: usize,
}

impl<'a> FactorCollector<'a> {
    fn new(dataset: u32, set: &'a str, member_count: usize) -> Self {
        Self { dataset, set, slots: vec![None; member_count], found: 0 }
    }

    /// Returns true once all members are filled.
    fn offer(&mut self, row: &NormalizationRow) -> bool {
        if row.matches(self.dataset, self.set)
            && let Some(slot) = self.slots.get_mut(row.member)
            && slot.is_none()
        {
            *slot = Some(row.factor);
            self.found += 1;
        }
        self.is_complete()
    }

    fn is_complete(&self) -> bool {
        self.found == self.slots.len()
    }

    fn finish(self) -> Result<Vec<f64>> {
        if !self.is_complete() {
            return Err(Error::MissingNormalizationRows {
                set: self.set.to_string(),
                dataset: self.dataset,
                found: self.found,
                expected: self.slots.len(),
            });
        }
        Ok(self.slots.into_iter().flatten().collect())
    }
}

/// Location of the table for `set` inside `dir`.
pub fn table_path(dir: &Path, set: &str) -> PathBuf {
    dir.join(format!("{set}.txt"))
}

/// Stream `path` and return one factor per member of `set` for `dataset`.
///
/// Reading stops as soon as every member has a factor.
pub fn read_factors(path: &Path, dataset: u32, set: &str, member_count: usize) -> Result<Vec<f64>> {
    log::info!("reading normalization factors for {set} (dataset {dataset}) from '{}'", path.display());
    let file = File::open(path).map_err(|e| Error::config_io(path, e))?;
    let mut collector = FactorCollector::new(dataset, set, member_count);
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::config_io(path, e))?;
        if let Some(row) = parse_line(&line, i + 1)?
            && collector.offer(&row)
        {
            break;
        }
    }
    collector.finish()
}

/// An in-memory normalization table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizationTable {
    rows: Vec<NormalizationRow>,
}

impl NormalizationTable {
    /// Table from rows.
    pub fn new(rows: Vec<NormalizationRow>) -> Self {
        Self { rows }
    }

    /// Parse table text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if let Some(row) = parse_line(line, i + 1)? {
                rows.push(row);
            }
        }
        Ok(Self { rows })
    }

    /// Read and parse a table file.
    pub fn open(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::config_io(path, e))?;
        Self::parse(&text)
    }

    /// All rows in file order.
    pub fn rows(&self) -> &[NormalizationRow] {
        &self.rows
    }

    /// One factor per member of `set` for `dataset`, in member order.
    pub fn factors_for(&self, dataset: u32, set: &str, member_count: usize) -> Result<Vec<f64>> {
        let mut collector = FactorCollector::new(dataset, set, member_count);
        for row in &self.rows {
            if collector.offer(row) {
                break;
            }
        }
        collector.finish()
    }

    /// Render in the on-disk format.
    pub fn to_text(&self) -> String {
        let mut out = String::from("# dataset set member factor\n");
        for r in &self.rows {
            out.push_str(&format!("{} {} {} {:.10}\n", r.dataset, r.set, r.member, r.factor));
        }
        out
    }

    /// Write in the on-disk format.
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_text()).map_err(|e| Error::config_io(path, e))
    }
}

/// Factors that restore the unweighted total: `f_m = nominal / member_sums[m]`.
///
/// `member_sums` must come from an event-count observable filled with
/// normalization disabled.
pub fn derive_factors(nominal: f64, member_sums: &[f64]) -> Result<Vec<f64>> {
    member_sums
        .iter()
        .enumerate()
        .map(|(m, &s)| {
            if s == 0.0 || !s.is_finite() {
                Err(Error::DegenerateDensity(format!(
                    "reweighted event count of member {m} is {s}; cannot derive a normalization factor"
                )))
            } else {
                Ok(nominal / s)
            }
        })
        .collect()
}

/// Table rows for one (dataset, set) from derived factors.
pub fn rows_for(dataset: u32, set: &str, factors: &[f64]) -> Vec<NormalizationRow> {
    factors
        .iter()
        .enumerate()
        .map(|(member, &factor)| NormalizationRow {
            dataset,
            set: set.to_string(),
            member,
            factor,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TABLE: &str = "\
# dataset set member factor
110101 CT10nlo 0 1.00
110101 CT10nlo 1 0.98

110101 CT10nlo 2 1.02
110102 CT10nlo 0 0.50
110101 MSTW2008nlo68cl 0 1.10
";

    #[test]
    fn factors_follow_member_order() {
        let t = NormalizationTable::parse(TABLE).unwrap();
        assert_eq!(t.rows().len(), 5);
        let f = t.factors_for(110101, "CT10nlo", 3).unwrap();
        assert_eq!(f, vec![1.00, 0.98, 1.02]);
    }

    #[test]
    fn missing_rows_fail() {
        let t = NormalizationTable::parse(TABLE).unwrap();
        let err = t.factors_for(110101, "CT10nlo", 53).unwrap_err();
        match err {
            Error::MissingNormalizationRows { found, expected, dataset, .. } => {
                assert_eq!(found, 3);
                assert_eq!(expected, 53);
                assert_eq!(dataset, 110101);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(t.factors_for(999, "CT10nlo", 1).is_err());
    }

    #[test]
    fn set_name_matches_by_prefix() {
        let t = NormalizationTable::parse("7 CT10nlo.LHgrid 0 0.9\n").unwrap();
        assert_eq!(t.factors_for(7, "CT10nlo", 1).unwrap(), vec![0.9]);
        assert!(t.factors_for(7, "CT10nlo.LHgrid.v2", 1).is_err());
    }

    #[test]
    fn first_row_per_member_wins() {
        let t = NormalizationTable::parse("1 A 0 0.5\n1 A 0 0.7\n1 A 1 0.9\n").unwrap();
        assert_eq!(t.factors_for(1, "A", 2).unwrap(), vec![0.5, 0.9]);
    }

    #[test]
    fn malformed_rows_are_rejected() {
        for bad in ["1 CT10nlo 0\n", "x CT10nlo 0 1.0\n", "1 CT10nlo -1 1.0\n", "1 A 0 nan\n"] {
            let err = NormalizationTable::parse(bad).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{bad:?}");
        }
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = read_factors(Path::new("/nonexistent/dir/CT10nlo.txt"), 1, "CT10nlo", 1)
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationIo { .. }));
        assert!(NormalizationTable::open(Path::new("/nonexistent/x.txt")).is_err());
    }

    #[test]
    fn write_failure_names_the_path() {
        let t = NormalizationTable::new(rows_for(1, "CT10nlo", &[1.0]));
        let path = Path::new("/nonexistent/dir/CT10nlo.txt");
        match t.write(path).unwrap_err() {
            Error::ConfigurationIo { path: p, .. } => assert_eq!(p, path.to_path_buf()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn derive_and_render() {
        let f = derive_factors(100.0, &[100.0, 80.0, 125.0]).unwrap();
        assert_relative_eq!(f[1], 1.25);
        assert_relative_eq!(f[2], 0.8);
        assert!(matches!(derive_factors(1.0, &[1.0, 0.0]), Err(Error::DegenerateDensity(_))));

        let t = NormalizationTable::new(rows_for(42, "CT10nlo", &f));
        let back = NormalizationTable::parse(&t.to_text()).unwrap();
        let g = back.factors_for(42, "CT10nlo", 3).unwrap();
        for (a, b) in f.iter().zip(&g) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
        assert_eq!(table_path(Path::new("/data"), "CT10nlo"), PathBuf::from("/data/CT10nlo.txt"));
    }
}
