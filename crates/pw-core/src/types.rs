//! Common data types for PDF reweighting

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Direction of a systematic variation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variation {
    /// Central value plus the upward error.
    Up,
    /// Central value minus the downward error.
    Down,
}

impl Variation {
    /// Both directions, up first.
    pub const ALL: [Variation; 2] = [Variation::Up, Variation::Down];

    /// Lowercase suffix used in derived histogram names.
    pub fn suffix(self) -> &'static str {
        match self {
            Variation::Up => "up",
            Variation::Down => "down",
        }
    }
}

impl fmt::Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Which histogram an analysis job should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystMode {
    /// Replace observables by the upward PDF variation.
    Up,
    /// Replace observables by the downward PDF variation.
    Down,
    /// Leave observables untouched (reweighting disabled).
    #[default]
    Nominal,
}

impl SystMode {
    /// The variation to produce, `None` in nominal mode.
    pub fn variation(self) -> Option<Variation> {
        match self {
            SystMode::Up => Some(Variation::Up),
            SystMode::Down => Some(Variation::Down),
            SystMode::Nominal => None,
        }
    }
}

/// Hard-scatter parton kinematics of one generated event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartonKinematics {
    /// Momentum fraction of the first incoming parton.
    pub x1: f64,
    /// Momentum fraction of the second incoming parton.
    pub x2: f64,
    /// Factorization scale Q (GeV).
    pub scale: f64,
    /// PDG id of the first parton (0 and 21 both mean gluon).
    pub flavor1: i32,
    /// PDG id of the second parton.
    pub flavor2: i32,
}

impl PartonKinematics {
    /// Create kinematics for one event.
    pub fn new(x1: f64, x2: f64, scale: f64, flavor1: i32, flavor2: i32) -> Self {
        Self { x1, x2, scale, flavor1, flavor2 }
    }

    /// Check x in (0, 1] and a finite positive scale.
    pub fn validate(&self) -> Result<()> {
        for (label, x) in [("x1", self.x1), ("x2", self.x2)] {
            if !(x > 0.0 && x <= 1.0) {
                return Err(Error::InvalidKinematics(format!("{label}={x} outside (0, 1]")));
            }
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(Error::InvalidKinematics(format!(
                "scale={} must be finite and > 0",
                self.scale
            )));
        }
        Ok(())
    }
}
