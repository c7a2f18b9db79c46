//! 1-D histogram holding an observable's nominal distribution.

use serde::{Deserialize, Serialize};

use pw_core::{Error, Result};

use crate::axis::{BinLocation, find_bin, uniform_edges, validate_edges};

/// A weighted 1-D histogram with explicit under/overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Histogram name; also the observable's identity inside the engine.
    pub name: String,
    /// Histogram title.
    #[serde(default)]
    pub title: String,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents (length = n_bins, excluding under/overflow).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin.
    pub sumw2: Vec<f64>,
    /// Underflow sum of weights.
    #[serde(default)]
    pub underflow: f64,
    /// Overflow sum of weights.
    #[serde(default)]
    pub overflow: f64,
    /// Number of fills (including under/overflow).
    #[serde(default)]
    pub entries: f64,
}

impl Histogram {
    /// Create an empty histogram with the given edges.
    pub fn new(name: impl Into<String>, bin_edges: Vec<f64>) -> Result<Self> {
        validate_edges(&bin_edges)?;
        let n_bins = bin_edges.len() - 1;
        Ok(Self {
            name: name.into(),
            title: String::new(),
            bin_edges,
            bin_content: vec![0.0; n_bins],
            sumw2: vec![0.0; n_bins],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0.0,
        })
    }

    /// Create an empty histogram with `n_bins` equal-width bins on `[low, high)`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, low: f64, high: f64) -> Result<Self> {
        Self::new(name, uniform_edges(n_bins, low, high)?)
    }

    /// Builder-style title setter.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        self.bin_content.len()
    }

    /// Lower edge of the first bin.
    pub fn x_min(&self) -> f64 {
        self.bin_edges[0]
    }

    /// Upper edge of the last bin.
    pub fn x_max(&self) -> f64 {
        self.bin_edges[self.bin_edges.len() - 1]
    }

    /// Centre of in-range bin `i` (0-based).
    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.bin_edges[i] + self.bin_edges[i + 1])
    }

    /// Locate a value on this histogram's axis.
    pub fn locate(&self, x: f64) -> Result<BinLocation> {
        find_bin(&self.bin_edges, x)
    }

    /// Add `weight` at `x`.
    pub fn fill(&mut self, x: f64, weight: f64) -> Result<BinLocation> {
        let loc = self.locate(x)?;
        match loc {
            BinLocation::Underflow => self.underflow += weight,
            BinLocation::Overflow => self.overflow += weight,
            BinLocation::Bin(i) => {
                self.bin_content[i] += weight;
                self.sumw2[i] += weight * weight;
            }
        }
        self.entries += 1.0;
        Ok(loc)
    }

    /// Content of a ROOT-style cell (0 = underflow, n+1 = overflow).
    pub fn cell_content(&self, cell: usize) -> f64 {
        let n = self.n_bins();
        match cell {
            0 => self.underflow,
            c if c <= n => self.bin_content[c - 1],
            _ => self.overflow,
        }
    }

    /// Overwrite a ROOT-style cell.
    pub fn set_cell_content(&mut self, cell: usize, value: f64) {
        let n = self.n_bins();
        match cell {
            0 => self.underflow = value,
            c if c <= n => self.bin_content[c - 1] = value,
            _ => self.overflow = value,
        }
    }

    /// Sum of in-range bin contents.
    pub fn integral(&self) -> f64 {
        self.bin_content.iter().sum()
    }

    /// True if both histograms have identical edges.
    pub fn same_binning(&self, other: &Histogram) -> bool {
        self.bin_edges == other.bin_edges
    }

    /// Fail with a validation error unless `edges` equal this histogram's edges.
    pub fn check_binning(&self, edges: &[f64]) -> Result<()> {
        if self.bin_edges.as_slice() != edges {
            return Err(Error::Validation(format!(
                "histogram '{}' binning ({} bins on [{}, {})) does not match the registered binning",
                self.name,
                self.n_bins(),
                self.x_min(),
                self.x_max()
            )));
        }
        if self.bin_content.len() != self.n_bins() || self.sumw2.len() != self.n_bins() {
            return Err(Error::Validation(format!(
                "histogram '{}' has {} contents and {} sumw2 entries for {} bins",
                self.name,
                self.bin_content.len(),
                self.sumw2.len(),
                self.n_bins()
            )));
        }
        Ok(())
    }

    /// Empty copy with the same binning and a new name.
    pub fn empty_like(&self, name: impl Into<String>) -> Self {
        let n = self.n_bins();
        Self {
            name: name.into(),
            title: self.title.clone(),
            bin_edges: self.bin_edges.clone(),
            bin_content: vec![0.0; n],
            sumw2: vec![0.0; n],
            underflow: 0.0,
            overflow: 0.0,
            entries: 0.0,
        }
    }

    /// Full copy under a new name.
    pub fn clone_named(&self, name: impl Into<String>) -> Self {
        Self { name: name.into(), ..self.clone() }
    }

    /// Zero all contents, keep binning.
    pub fn reset(&mut self) {
        self.bin_content.iter_mut().for_each(|v| *v = 0.0);
        self.sumw2.iter_mut().for_each(|v| *v = 0.0);
        self.underflow = 0.0;
        self.overflow = 0.0;
        self.entries = 0.0;
    }
}
