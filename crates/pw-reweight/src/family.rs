//! Closed table of supported PDF sets and their error-propagation rules.
//!
//! Each supported set belongs to one estimator family. The family is resolved
//! once, when a [`crate::PdfSet`] is built, and applied per observable bin to
//! the column of member values accumulated in that bin.

use serde::{Deserialize, Serialize};

use pw_core::{Error, Result, Variation};

/// Rescales a 90% CL Hessian eigenvector basis to a 68% CL (1σ) estimate.
pub const C90_TO_68: f64 = 1.64485;

/// Set whose central member is the common denominator of every weight ratio.
pub const REFERENCE_SET: &str = "CT10nlo";

/// Member of [`REFERENCE_SET`] used as the denominator.
pub const REFERENCE_MEMBER: usize = 0;

/// Supported sets, in default instantiation order.
pub const KNOWN_SETS: [(&str, ModelFamily); 3] = [
    ("CT10nlo", ModelFamily::SymmetricHessian),
    ("MSTW2008nlo68cl", ModelFamily::AsymmetricHessian),
    ("NNPDF23_nlo_as_0119", ModelFamily::ReplicaEnsemble),
];

/// Error-propagation convention of a PDF set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Eigenvector pairs (1,2), (3,4), ... at 90% CL (CTEQ convention).
    SymmetricHessian,
    /// Independent eigenvector directions, asymmetric errors (MSTW convention).
    AsymmetricHessian,
    /// Monte Carlo replicas, mean ± standard deviation (NNPDF convention).
    ReplicaEnsemble,
}

impl ModelFamily {
    /// Resolve the family of a set by name (ASCII case-insensitive exact match).
    pub fn from_set_name(name: &str) -> Result<Self> {
        KNOWN_SETS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, family)| *family)
            .ok_or_else(|| Error::UnknownModelFamily(name.to_string()))
    }

    /// Smallest member count the estimator is defined for.
    pub fn min_members(self) -> usize {
        match self {
            ModelFamily::SymmetricHessian | ModelFamily::AsymmetricHessian => 1,
            // Mean over replicas 1..N and a Bessel-corrected variance need two replicas.
            ModelFamily::ReplicaEnsemble => 3,
        }
    }

    /// Varied bin value from the member column of one observable bin.
    pub fn variation(self, column: &[f64], var: Variation) -> Result<f64> {
        if column.len() < self.min_members() {
            return Err(Error::Validation(format!(
                "{self:?} estimator needs at least {} members, got {}",
                self.min_members(),
                column.len()
            )));
        }
        Ok(match self {
            ModelFamily::SymmetricHessian => symmetric_hessian(column, var),
            ModelFamily::AsymmetricHessian => asymmetric_hessian(column, var),
            ModelFamily::ReplicaEnsemble => replica_ensemble(column, var),
        })
    }
}

/// Names of all supported sets.
pub fn known_set_names() -> impl Iterator<Item = &'static str> {
    KNOWN_SETS.iter().map(|(name, _)| *name)
}

/// Symmetric Hessian: `central ± 0.5 * sqrt(Σ (v[2i-1] - v[2i])²) / C90`.
///
/// A trailing unpaired member is ignored.
pub(crate) fn symmetric_hessian(column: &[f64], var: Variation) -> f64 {
    let central = column[0];
    let sumsq: f64 = column[1..]
        .chunks_exact(2)
        .map(|pair| {
            let d = pair[0] - pair[1];
            d * d
        })
        .sum();
    let delta = 0.5 * sumsq.sqrt() / C90_TO_68;
    match var {
        Variation::Up => central + delta,
        Variation::Down => central - delta,
    }
}

/// Asymmetric Hessian: positive deviations from the central member feed the
/// upward error, zero and negative ones the downward error.
pub(crate) fn asymmetric_hessian(column: &[f64], var: Variation) -> f64 {
    let central = column[0];
    let (mut up2, mut down2) = (0.0, 0.0);
    for &v in &column[1..] {
        let d = v - central;
        if d > 0.0 {
            up2 += d * d;
        } else {
            down2 += d * d;
        }
    }
    match var {
        Variation::Up => central + f64::sqrt(up2),
        Variation::Down => central - f64::sqrt(down2),
    }
}

/// Replica ensemble: mean of members 1..N ± their sample standard deviation.
///
/// Member 0 is excluded: the accumulated value is a sum of weight products,
/// and the mean of a product is not the product of the means.
pub(crate) fn replica_ensemble(column: &[f64], var: Variation) -> f64 {
    let replicas = &column[1..];
    let n = replicas.len() as f64;
    let mean = replicas.iter().sum::<f64>() / n;
    let sumsq: f64 = replicas.iter().map(|v| (v - mean) * (v - mean)).sum();
    let sigma = (sumsq / (n - 1.0)).sqrt();
    match var {
        Variation::Up => mean + sigma,
        Variation::Down => mean - sigma,
    }
}
