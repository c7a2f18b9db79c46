//! # pw-reweight
//!
//! Event-by-event PDF reweighting with cross-model uncertainty envelopes.
//!
//! A [`PdfSet`] evaluates one weight per member for each event, relative to a
//! fixed reference member, and accumulates those weights per observable. On
//! request it turns the member spread of every observable bin into an up/down
//! band with the estimator of its [`ModelFamily`]. The [`ReweightingEngine`]
//! drives several sets at once and folds their bands into one envelope that is
//! applied to the caller's nominal histogram as a relative correction.
//!
//! ```
//! use std::sync::Arc;
//! use pw_core::{DensitySource, PartonDensity, PartonKinematics, Result, Variation};
//! use pw_hist::Histogram;
//! use pw_reweight::ReweightingEngine;
//!
//! struct Toy;
//! impl DensitySource for Toy {
//!     fn member_count(&self, _set: &str) -> Result<usize> { Ok(3) }
//!     fn load_member(&self, _set: &str, m: usize) -> Result<Arc<dyn PartonDensity>> {
//!         let k = 1.0 + 0.05 * m as f64;
//!         Ok(Arc::new(move |_f: i32, x: f64, _q: f64| k * (1.0 - x)))
//!     }
//! }
//!
//! let mut engine = ReweightingEngine::with_default_sets(&Toy).unwrap();
//! let mut pt = Histogram::uniform("pt", 4, 0.0, 200.0).unwrap();
//! engine.add_observable(&pt).unwrap();
//!
//! engine.compute_weights(&PartonKinematics::new(0.1, 0.05, 172.5, 21, 21)).unwrap();
//! engine.fill_observable("pt", 42.0, 1.0).unwrap();
//! pt.fill(42.0, 1.0).unwrap();
//!
//! let up = engine.uncertainty(&pt, Variation::Up).unwrap();
//! assert_eq!(up.name, "pt_PDF_up");
//! assert!(up.bin_content[0] >= pt.bin_content[0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod envelope;
pub mod family;
pub mod normalization;
pub mod pdf_set;
pub mod tool;

pub use engine::{EngineSummary, MemberColumn, Phase, ReweightingEngine, SetBands, SetSummary};
pub use family::{C90_TO_68, KNOWN_SETS, ModelFamily, REFERENCE_MEMBER, REFERENCE_SET};
pub use normalization::{NormalizationRow, NormalizationTable};
pub use pdf_set::PdfSet;
pub use tool::SystematicTool;
