//! # pw-core
//!
//! Shared foundation for the PDF reweighting workspace: the error taxonomy,
//! value types passed between the event loop and the reweighting engine, and
//! the traits that keep the engine independent of any concrete PDF library.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{DensitySource, PartonDensity};
pub use types::{PartonKinematics, SystMode, Variation};

/// Crate version, shared by every workspace member.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
