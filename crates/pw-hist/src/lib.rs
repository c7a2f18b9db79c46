//! # pw-hist
//!
//! Histograms used by the reweighting engine.
//!
//! - [`Histogram`]: the caller's 1-D observable (nominal values and binning).
//! - [`Histogram2D`]: a 2-D observable, reweighted slice by slice along y.
//! - [`MemberHistogram`]: the per-set accumulator, observable bin × set member.
//!
//! ## Example
//!
//! ```
//! use pw_hist::{Histogram, MemberHistogram};
//!
//! let mut h = Histogram::uniform("lepton_pt", 4, 0.0, 200.0).unwrap();
//! h.fill(42.0, 1.0).unwrap();
//!
//! let mut acc = MemberHistogram::for_observable(&h, "CT10nlo", 3).unwrap();
//! acc.fill_members(42.0, &[1.0, 1.1, 0.9], 1.0).unwrap();
//! assert_eq!(acc.column(1), &[1.0, 1.1, 0.9]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod hist2d;
pub mod histogram;
pub mod member;

pub use axis::{BinLocation, find_bin, uniform_edges, validate_edges};
pub use hist2d::Histogram2D;
pub use histogram::Histogram;
pub use member::MemberHistogram;
