//! Per-set accumulator: observable bin × set member.
//!
//! Every event contributes one weight per member to the cell of the
//! observable value. Storage is cell-major, so the member column of one
//! observable bin (the input of the uncertainty estimators) is contiguous.

use serde::{Deserialize, Serialize};

use pw_core::{Error, Result};

use crate::axis::{BinLocation, find_bin, validate_edges};
use crate::histogram::Histogram;

/// Weighted 2-D accumulator with the observable's x-binning and one row per member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberHistogram {
    name: String,
    bin_edges: Vec<f64>,
    n_members: usize,
    /// `(n_bins + 2) * n_members` sums of weights, cell-major.
    sumw: Vec<f64>,
    /// Same layout as `sumw`.
    sumw2: Vec<f64>,
    entries: u64,
}

impl MemberHistogram {
    /// Create an empty accumulator.
    pub fn new(name: impl Into<String>, bin_edges: Vec<f64>, n_members: usize) -> Result<Self> {
        validate_edges(&bin_edges)?;
        if n_members == 0 {
            return Err(Error::Validation("member accumulator needs at least one member".into()));
        }
        let n_cells = (bin_edges.len() + 1) * n_members;
        Ok(Self {
            name: name.into(),
            bin_edges,
            n_members,
            sumw: vec![0.0; n_cells],
            sumw2: vec![0.0; n_cells],
            entries: 0,
        })
    }

    /// Accumulator for `obs` inside PDF set `set`, named `<obs>_<set>`.
    pub fn for_observable(obs: &Histogram, set: &str, n_members: usize) -> Result<Self> {
        Self::new(format!("{}_{}", obs.name, set), obs.bin_edges.clone(), n_members)
    }

    /// Accumulator name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Observable bin edges.
    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    /// Number of in-range observable bins.
    pub fn n_bins(&self) -> usize {
        self.bin_edges.len() - 1
    }

    /// Number of members (rows).
    pub fn n_members(&self) -> usize {
        self.n_members
    }

    /// Number of events filled.
    pub fn entries(&self) -> u64 {
        self.entries
    }

    fn offset(&self, cell: usize) -> usize {
        cell * self.n_members
    }

    /// Add `weight` to member `member` at observable value `value`.
    pub fn fill(&mut self, value: f64, member: usize, weight: f64) -> Result<BinLocation> {
        if member >= self.n_members {
            return Err(Error::Validation(format!(
                "member {member} out of range for '{}' ({} members)",
                self.name, self.n_members
            )));
        }
        let loc = find_bin(&self.bin_edges, value)?;
        let idx = self.offset(loc.cell(self.n_bins())) + member;
        self.sumw[idx] += weight;
        self.sumw2[idx] += weight * weight;
        Ok(loc)
    }

    /// Add `weights[m] * event_weight` for every member `m` at `value`.
    pub fn fill_members(
        &mut self,
        value: f64,
        weights: &[f64],
        event_weight: f64,
    ) -> Result<BinLocation> {
        if weights.len() != self.n_members {
            return Err(Error::Validation(format!(
                "'{}' expects {} member weights, got {}",
                self.name,
                self.n_members,
                weights.len()
            )));
        }
        if !event_weight.is_finite() {
            return Err(Error::Validation(format!(
                "'{}': non-finite event weight {event_weight}",
                self.name
            )));
        }
        let loc = find_bin(&self.bin_edges, value)?;
        let start = self.offset(loc.cell(self.n_bins()));
        let end = start + self.n_members;
        for ((sw, sw2), &w) in
            self.sumw[start..end].iter_mut().zip(&mut self.sumw2[start..end]).zip(weights)
        {
            let v = w * event_weight;
            *sw += v;
            *sw2 += v * v;
        }
        self.entries += 1;
        Ok(loc)
    }

    /// Member values of one ROOT-style cell (0 = underflow, `n_bins + 1` = overflow).
    ///
    /// # Panics
    /// If `cell > n_bins + 1`.
    pub fn column(&self, cell: usize) -> &[f64] {
        let start = self.offset(cell);
        &self.sumw[start..start + self.n_members]
    }

    /// Reweighted observable of a single member, as a 1-D histogram.
    pub fn member_projection(&self, member: usize, name: impl Into<String>) -> Result<Histogram> {
        if member >= self.n_members {
            return Err(Error::Validation(format!(
                "member {member} out of range for '{}' ({} members)",
                self.name, self.n_members
            )));
        }
        let n = self.n_bins();
        let mut h = Histogram::new(name, self.bin_edges.clone())?;
        for cell in 0..=n + 1 {
            let idx = self.offset(cell) + member;
            h.set_cell_content(cell, self.sumw[idx]);
            if (1..=n).contains(&cell) {
                h.sumw2[cell - 1] = self.sumw2[idx];
            }
        }
        h.entries = self.entries as f64;
        Ok(h)
    }

    /// Sum of in-range contents of one member.
    pub fn member_integral(&self, member: usize) -> f64 {
        (1..=self.n_bins()).map(|cell| self.sumw[self.offset(cell) + member]).sum()
    }

    /// Add another accumulator cell-wise (sharded accumulation).
    pub fn merge(&mut self, other: &MemberHistogram) -> Result<()> {
        if self.bin_edges != other.bin_edges || self.n_members != other.n_members {
            return Err(Error::Validation(format!(
                "cannot merge '{}' into '{}': binning or member count differs",
                other.name, self.name
            )));
        }
        self.sumw.iter_mut().zip(&other.sumw).for_each(|(a, b)| *a += b);
        self.sumw2.iter_mut().zip(&other.sumw2).for_each(|(a, b)| *a += b);
        self.entries += other.entries;
        Ok(())
    }

    /// Zero all cells.
    pub fn reset(&mut self) {
        self.sumw.iter_mut().for_each(|v| *v = 0.0);
        self.sumw2.iter_mut().for_each(|v| *v = 0.0);
        self.entries = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn acc() -> MemberHistogram {
        MemberHistogram::new("pt_CT10nlo", vec![0.0, 10.0, 20.0], 3).unwrap()
    }

    #[test]
    fn fill_members_scales_by_event_weight() {
        let mut a = acc();
        a.fill_members(5.0, &[1.0, 1.2, 0.8], 2.0).unwrap();
        a.fill_members(7.0, &[1.0, 1.0, 1.0], 1.0).unwrap();
        a.fill_members(15.0, &[0.5, 0.5, 0.5], 1.0).unwrap();
        assert_eq!(a.column(1), &[3.0, 3.4, 2.6]);
        assert_eq!(a.column(2), &[0.5, 0.5, 0.5]);
        assert_eq!(a.entries(), 3);
    }

    #[test]
    fn flows_go_to_edge_cells() {
        let mut a = acc();
        a.fill_members(-3.0, &[1.0, 2.0, 3.0], 1.0).unwrap();
        a.fill_members(25.0, &[4.0, 5.0, 6.0], 1.0).unwrap();
        assert_eq!(a.column(0), &[1.0, 2.0, 3.0]);
        assert_eq!(a.column(3), &[4.0, 5.0, 6.0]);
        assert_eq!(a.member_integral(1), 0.0);
    }

    #[test]
    fn wrong_weight_count_is_rejected() {
        let mut a = acc();
        assert!(a.fill_members(5.0, &[1.0, 1.0], 1.0).is_err());
        assert!(a.fill(5.0, 3, 1.0).is_err());
        assert!(MemberHistogram::new("x", vec![0.0, 1.0], 0).is_err());
        assert!(a.fill_members(5.0, &[1.0, 1.0, 1.0], f64::NAN).is_err());
        assert_eq!(a.entries(), 0);
    }

    #[test]
    fn projection_extracts_one_member() {
        let mut a = acc();
        a.fill_members(5.0, &[1.0, 1.5, 0.5], 2.0).unwrap();
        a.fill_members(15.0, &[1.0, 1.5, 0.5], 1.0).unwrap();
        a.fill_members(30.0, &[1.0, 1.5, 0.5], 1.0).unwrap();
        let h = a.member_projection(1, "pt_CT10nlo_member1").unwrap();
        assert_eq!(h.bin_content, vec![3.0, 1.5]);
        assert_relative_eq!(h.sumw2[0], 9.0);
        assert_eq!(h.overflow, 1.5);
        assert_eq!(h.entries, 3.0);
        assert!(a.member_projection(3, "bad").is_err());
    }

    #[test]
    fn merge_sums_cellwise() {
        let mut a = acc();
        let mut b = acc();
        a.fill_members(5.0, &[1.0, 2.0, 3.0], 1.0).unwrap();
        b.fill_members(5.0, &[0.5, 0.5, 0.5], 2.0).unwrap();
        b.fill_members(12.0, &[1.0, 1.0, 1.0], 1.0).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.column(1), &[2.0, 3.0, 4.0]);
        assert_eq!(a.column(2), &[1.0, 1.0, 1.0]);
        assert_eq!(a.entries(), 3);

        let other = MemberHistogram::new("x", vec![0.0, 10.0, 20.0], 4).unwrap();
        assert!(a.merge(&other).is_err());
    }

    #[test]
    fn reset_clears_everything() {
        let mut a = acc();
        a.fill_members(5.0, &[1.0, 2.0, 3.0], 1.0).unwrap();
        a.reset();
        assert_eq!(a.column(1), &[0.0, 0.0, 0.0]);
        assert_eq!(a.entries(), 0);
    }
}
