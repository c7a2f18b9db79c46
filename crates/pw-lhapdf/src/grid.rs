//! `lhagrid1` member grids and their interpolation.
//!
//! A member file is a YAML header followed by one or more subgrids, each
//! delimited by a `---` line:
//!
//! ```text
//! PdfType: central
//! Format: lhagrid1
//! ---
//! <x knots>
//! <Q knots>
//! <PDG ids>
//! <one row per (x, Q) pair, Q fastest: x·f for every PDG id>
//! ---
//! ```
//!
//! Values are interpolated bilinearly in (ln x, ln Q²) and clamped at the
//! grid boundaries.

use std::path::Path;

use pw_core::{Error, PartonDensity, Result};

use crate::info::{LHAGRID1, MemberHeader, parse_yaml};

const GLUON: i32 = 21;

#[derive(Debug, Clone)]
struct Subgrid {
    log_x: Vec<f64>,
    log_q2: Vec<f64>,
    flavors: Vec<i32>,
    /// `values[(ix * nq + iq) * nf + f]`
    values: Vec<f64>,
}

/// Index `i` with `knots[i] <= v <= knots[i + 1]` and the fractional position in that interval.
fn bracket(knots: &[f64], v: f64) -> (usize, f64) {
    let last = knots.len() - 1;
    let v = v.clamp(knots[0], knots[last]);
    let i = knots.partition_point(|&k| k <= v).saturating_sub(1).min(last - 1);
    let t = (v - knots[i]) / (knots[i + 1] - knots[i]);
    (i, t)
}

impl Subgrid {
    fn parse(block: &str, path: &Path, index: usize) -> Result<Self> {
        let bad = |what: String| {
            Error::Validation(format!("'{}' subgrid {index}: {what}", path.display()))
        };
        let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
        let mut numbers = |label: &str| -> Result<Vec<f64>> {
            let line = lines.next().ok_or_else(|| bad(format!("missing {label} line")))?;
            line.split_whitespace()
                .map(|tok| tok.parse::<f64>().map_err(|_| bad(format!("bad {label} value '{tok}'"))))
                .collect()
        };

        let xs = numbers("x knot")?;
        let qs = numbers("Q knot")?;
        let ids = numbers("flavour")?;
        for (label, knots) in [("x", &xs), ("Q", &qs)] {
            if knots.len() < 2
                || knots.iter().any(|&k| !(k > 0.0 && k.is_finite()))
                || knots.windows(2).any(|w| w[0] >= w[1])
            {
                return Err(bad(format!("{label} knots must be >= 2 positive increasing values")));
            }
        }
        let flavors = ids
            .iter()
            .map(|&id| {
                if id.fract() != 0.0 || id.abs() > f64::from(i32::MAX) {
                    return Err(bad(format!("flavour '{id}' is not a PDG id")));
                }
                Ok(if id == 0.0 { GLUON } else { id as i32 })
            })
            .collect::<Result<Vec<i32>>>()?;
        if flavors.is_empty() {
            return Err(bad("no flavours".into()));
        }

        let (nx, nq, nf) = (xs.len(), qs.len(), flavors.len());
        let mut values = Vec::with_capacity(nx * nq * nf);
        for row in 0..nx * nq {
            let r = numbers("grid")?;
            if r.len() != nf {
                return Err(bad(format!("grid row {row} has {} values, expected {nf}", r.len())));
            }
            values.extend(r);
        }
        if lines.next().is_some() {
            return Err(bad(format!("more than {} grid rows", nx * nq)));
        }

        Ok(Self {
            log_x: xs.iter().map(|x| x.ln()).collect(),
            log_q2: qs.iter().map(|q| (q * q).ln()).collect(),
            flavors,
            values,
        })
    }

    fn q2_range(&self) -> (f64, f64) {
        (self.log_q2[0], self.log_q2[self.log_q2.len() - 1])
    }

    fn value(&self, ix: usize, iq: usize, f: usize) -> f64 {
        let nq = self.log_q2.len();
        self.values[(ix * nq + iq) * self.flavors.len() + f]
    }

    fn interpolate(&self, f: usize, log_x: f64, log_q2: f64) -> f64 {
        let (ix, tx) = bracket(&self.log_x, log_x);
        let (iq, tq) = bracket(&self.log_q2, log_q2);
        (1.0 - tx) * (1.0 - tq) * self.value(ix, iq, f)
            + tx * (1.0 - tq) * self.value(ix + 1, iq, f)
            + (1.0 - tx) * tq * self.value(ix, iq + 1, f)
            + tx * tq * self.value(ix + 1, iq + 1, f)
    }
}

/// One member of an LHAPDF6 set, held fully in memory.
#[derive(Debug, Clone)]
pub struct GridPdf {
    pdf_type: String,
    subgrids: Vec<Subgrid>,
}

impl GridPdf {
    /// Parse a member file's text.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let mut sections = vec![String::new()];
        for line in text.lines() {
            if line.trim() == "---" {
                sections.push(String::new());
            } else if let Some(current) = sections.last_mut() {
                current.push_str(line);
                current.push('\n');
            }
        }
        let header_text = &sections[0];
        let header: MemberHeader = if header_text.trim().is_empty() {
            MemberHeader::default()
        } else {
            parse_yaml(header_text, path)?
        };
        if let Some(format) = &header.format
            && format != LHAGRID1
        {
            return Err(Error::Validation(format!(
                "'{}': unsupported grid format '{format}'",
                path.display()
            )));
        }

        let subgrids = sections[1..]
            .iter()
            .filter(|b| !b.trim().is_empty())
            .enumerate()
            .map(|(i, b)| Subgrid::parse(b, path, i))
            .collect::<Result<Vec<_>>>()?;
        if subgrids.is_empty() {
            return Err(Error::Validation(format!("'{}' contains no subgrid", path.display())));
        }
        if subgrids.windows(2).any(|w| w[0].q2_range().1 > w[1].q2_range().0) {
            return Err(Error::Validation(format!(
                "'{}': subgrids must be ordered in Q and not overlap",
                path.display()
            )));
        }
        Ok(Self { pdf_type: header.pdf_type, subgrids })
    }

    /// Read and parse a member file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::config_io(path, e))?;
        Self::parse(&text, path)
    }

    /// `PdfType` from the header (empty if absent).
    pub fn pdf_type(&self) -> &str {
        &self.pdf_type
    }

    /// Number of Q subgrids.
    pub fn n_subgrids(&self) -> usize {
        self.subgrids.len()
    }

    fn subgrid_for(&self, log_q2: f64) -> &Subgrid {
        self.subgrids
            .iter()
            .find(|g| log_q2 <= g.q2_range().1)
            .unwrap_or(&self.subgrids[self.subgrids.len() - 1])
    }
}

impl PartonDensity for GridPdf {
    /// x·f(x, Q); zero for flavours the grid does not carry.
    fn xfx_q(&self, flavor: i32, x: f64, q: f64) -> f64 {
        let flavor = if flavor == 0 { GLUON } else { flavor };
        let log_q2 = (q * q).ln();
        let grid = self.subgrid_for(log_q2);
        match grid.flavors.iter().position(|&f| f == flavor) {
            Some(f) => grid.interpolate(f, x.ln(), log_q2),
            None => 0.0,
        }
    }
}
