//! Bin-edge handling shared by all histogram types.

use pw_core::{Error, Result};

/// Where a value lands on an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinLocation {
    /// Below the first edge.
    Underflow,
    /// In-range bin (0-based).
    Bin(usize),
    /// At or above the last edge.
    Overflow,
}

impl BinLocation {
    /// Cell index with ROOT conventions: 0 = underflow, `1..=n_bins` in range,
    /// `n_bins + 1` = overflow.
    pub fn cell(self, n_bins: usize) -> usize {
        match self {
            BinLocation::Underflow => 0,
            BinLocation::Bin(i) => i + 1,
            BinLocation::Overflow => n_bins + 1,
        }
    }
}

/// Check that edges are finite, strictly increasing, and describe at least one bin.
pub fn validate_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::Validation(format!(
            "bin edges must describe at least one bin (got {} edges)",
            edges.len()
        )));
    }
    if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
        return Err(Error::Validation(format!("non-finite bin edge {bad}")));
    }
    if let Some(w) = edges.windows(2).find(|w| w[1] <= w[0]) {
        return Err(Error::Validation(format!(
            "bin edges must be strictly increasing ({} >= {})",
            w[0], w[1]
        )));
    }
    Ok(())
}

/// Equidistant edges for `n_bins` bins over `[low, high)`.
pub fn uniform_edges(n_bins: usize, low: f64, high: f64) -> Result<Vec<f64>> {
    if n_bins == 0 {
        return Err(Error::Validation("number of bins must be > 0".into()));
    }
    let width = (high - low) / n_bins as f64;
    let mut edges: Vec<f64> = (0..n_bins).map(|i| low + width * i as f64).collect();
    edges.push(high);
    validate_edges(&edges)?;
    Ok(edges)
}

/// Locate `val` on sorted `edges` (lower edge inclusive, upper edge exclusive).
///
/// `edges` must have passed [`validate_edges`]. Non-finite values are rejected.
pub fn find_bin(edges: &[f64], val: f64) -> Result<BinLocation> {
    if val.is_nan() {
        return Err(Error::Validation("cannot bin NaN".into()));
    }
    let n_edges = edges.len();
    if val < edges[0] {
        return Ok(BinLocation::Underflow);
    }
    if val >= edges[n_edges - 1] {
        return Ok(BinLocation::Overflow);
    }
    // First edge strictly above val; val >= edges[0] so idx >= 1.
    let idx = edges.partition_point(|&e| e <= val);
    Ok(BinLocation::Bin(idx - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_bin_edge_cases() {
        let edges = vec![0.0, 1.0, 2.0, 3.0];
        assert_eq!(find_bin(&edges, -0.5).unwrap(), BinLocation::Underflow);
        assert_eq!(find_bin(&edges, 3.0).unwrap(), BinLocation::Overflow);
        assert_eq!(find_bin(&edges, f64::INFINITY).unwrap(), BinLocation::Overflow);
        assert_eq!(find_bin(&edges, 0.0).unwrap(), BinLocation::Bin(0));
        assert_eq!(find_bin(&edges, 1.0).unwrap(), BinLocation::Bin(1));
        assert_eq!(find_bin(&edges, 2.99).unwrap(), BinLocation::Bin(2));
        assert!(find_bin(&edges, f64::NAN).is_err());
    }

    #[test]
    fn cell_indices_follow_root_layout() {
        assert_eq!(BinLocation::Underflow.cell(3), 0);
        assert_eq!(BinLocation::Bin(0).cell(3), 1);
        assert_eq!(BinLocation::Bin(2).cell(3), 3);
        assert_eq!(BinLocation::Overflow.cell(3), 4);
    }

    #[test]
    fn validate_rejects_bad_edges() {
        assert!(validate_edges(&[0.0]).is_err());
        assert!(validate_edges(&[0.0, 0.0]).is_err());
        assert!(validate_edges(&[1.0, 0.5]).is_err());
        assert!(validate_edges(&[0.0, f64::NAN]).is_err());
        assert!(validate_edges(&[0.0, 0.5, 2.0]).is_ok());
    }

    #[test]
    fn uniform_edges_hit_bounds() {
        let e = uniform_edges(30, 0.0, 200.0).unwrap();
        assert_eq!(e.len(), 31);
        assert_eq!(e[0], 0.0);
        assert_eq!(e[30], 200.0);
        assert!(uniform_edges(0, 0.0, 1.0).is_err());
        assert!(uniform_edges(2, 1.0, 1.0).is_err());
    }
}
