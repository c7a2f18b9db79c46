//! 2-D histogram, handled by the reweighting engine as a stack of x-slices.

use serde::{Deserialize, Serialize};

use pw_core::{Error, Result};

use crate::axis::{find_bin, validate_edges};
use crate::histogram::Histogram;

/// Weighted 2-D histogram with ROOT-style cells (flows included on both axes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    /// Histogram name.
    pub name: String,
    /// x bin edges.
    pub x_edges: Vec<f64>,
    /// y bin edges.
    pub y_edges: Vec<f64>,
    /// `(nx + 2) * (ny + 2)` cell contents, y-major: index = `ycell * (nx + 2) + xcell`.
    pub content: Vec<f64>,
    /// Sum of weights squared, same layout as `content`.
    pub sumw2: Vec<f64>,
    /// Number of fills.
    #[serde(default)]
    pub entries: f64,
}

impl Histogram2D {
    /// Create an empty 2-D histogram.
    pub fn new(name: impl Into<String>, x_edges: Vec<f64>, y_edges: Vec<f64>) -> Result<Self> {
        validate_edges(&x_edges)?;
        validate_edges(&y_edges)?;
        let n = (x_edges.len() + 1) * (y_edges.len() + 1);
        Ok(Self {
            name: name.into(),
            x_edges,
            y_edges,
            content: vec![0.0; n],
            sumw2: vec![0.0; n],
            entries: 0.0,
        })
    }

    /// In-range x bins.
    pub fn n_bins_x(&self) -> usize {
        self.x_edges.len() - 1
    }

    /// In-range y bins.
    pub fn n_bins_y(&self) -> usize {
        self.y_edges.len() - 1
    }

    fn stride(&self) -> usize {
        self.n_bins_x() + 2
    }

    /// y cell of a value (0 = underflow, `ny + 1` = overflow).
    pub fn y_cell(&self, y: f64) -> Result<usize> {
        Ok(find_bin(&self.y_edges, y)?.cell(self.n_bins_y()))
    }

    /// Add `weight` at `(x, y)`.
    pub fn fill(&mut self, x: f64, y: f64, weight: f64) -> Result<()> {
        let xc = find_bin(&self.x_edges, x)?.cell(self.n_bins_x());
        let yc = self.y_cell(y)?;
        let idx = yc * self.stride() + xc;
        self.content[idx] += weight;
        self.sumw2[idx] += weight * weight;
        self.entries += 1.0;
        Ok(())
    }

    /// Content of cell `(xcell, ycell)`.
    pub fn cell_content(&self, xcell: usize, ycell: usize) -> f64 {
        self.content[ycell * self.stride() + xcell]
    }

    fn check_y_cell(&self, ycell: usize) -> Result<()> {
        if ycell > self.n_bins_y() + 1 {
            return Err(Error::Validation(format!(
                "y cell {ycell} out of range for '{}' ({} y bins)",
                self.name,
                self.n_bins_y()
            )));
        }
        Ok(())
    }

    /// x-projection of a single y cell (x flows included).
    pub fn slice(&self, ycell: usize, name: impl Into<String>) -> Result<Histogram> {
        self.check_y_cell(ycell)?;
        let mut h = Histogram::new(name, self.x_edges.clone())?;
        let base = ycell * self.stride();
        for xc in 0..self.stride() {
            h.set_cell_content(xc, self.content[base + xc]);
            if (1..=self.n_bins_x()).contains(&xc) {
                h.sumw2[xc - 1] = self.sumw2[base + xc];
            }
        }
        Ok(h)
    }

    /// Overwrite one y cell with the contents of a 1-D histogram of the same x binning.
    pub fn set_slice(&mut self, ycell: usize, slice: &Histogram) -> Result<()> {
        self.check_y_cell(ycell)?;
        slice.check_binning(&self.x_edges)?;
        let base = ycell * self.stride();
        for xc in 0..self.stride() {
            self.content[base + xc] = slice.cell_content(xc);
        }
        Ok(())
    }
}
