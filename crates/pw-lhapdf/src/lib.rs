//! # pw-lhapdf
//!
//! Parton densities read from LHAPDF6 data directories.
//!
//! [`LhapdfSource`] implements [`pw_core::DensitySource`]: it finds a set in
//! one of its search directories, reads the member count from the set's
//! `.info` file and loads each `lhagrid1` member file into a [`GridPdf`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod grid;
pub mod info;
pub mod source;

pub use grid::GridPdf;
pub use info::{LHAGRID1, MemberHeader, SetInfo};
pub use source::{DATA_PATH_ENV, LhapdfSource};
