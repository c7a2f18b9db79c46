//! Density-provider traits
//!
//! The reweighting engine never talks to a PDF library directly. It asks a
//! [`DensitySource`] for one [`PartonDensity`] per (set name, member index)
//! once, at construction time, and evaluates those per event.

use std::sync::Arc;

use crate::Result;

/// One member of a PDF set: x·f(x, Q) for a given parton flavour.
pub trait PartonDensity: Send + Sync {
    /// Evaluate the density for PDG `flavor` at momentum fraction `x` and scale `q` (GeV).
    fn xfx_q(&self, flavor: i32, x: f64, q: f64) -> f64;
}

impl<F> PartonDensity for F
where
    F: Fn(i32, f64, f64) -> f64 + Send + Sync,
{
    fn xfx_q(&self, flavor: i32, x: f64, q: f64) -> f64 {
        self(flavor, x, q)
    }
}

/// Factory for set members, e.g. an on-disk LHAPDF installation.
pub trait DensitySource: Send + Sync {
    /// Number of members (central + error members) of the named set.
    fn member_count(&self, set: &str) -> Result<usize>;

    /// Instantiate one member of the named set.
    fn load_member(&self, set: &str, member: usize) -> Result<Arc<dyn PartonDensity>>;

    /// Human-readable description of the set.
    fn description(&self, set: &str) -> Result<String> {
        Ok(set.to_string())
    }

    /// Instantiate every member of the named set, central member first.
    fn load_set(&self, set: &str) -> Result<Vec<Arc<dyn PartonDensity>>> {
        let n = self.member_count(set)?;
        (0..n).map(|m| self.load_member(set, m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use approx::assert_relative_eq;

    struct ScaledSource;

    impl DensitySource for ScaledSource {
        fn member_count(&self, set: &str) -> Result<usize> {
            match set {
                "toy" => Ok(3),
                other => Err(Error::UnknownModelFamily(other.to_string())),
            }
        }

        fn load_member(&self, _set: &str, member: usize) -> Result<Arc<dyn PartonDensity>> {
            let k = 1.0 + 0.1 * member as f64;
            Ok(Arc::new(move |_flavor: i32, x: f64, _q: f64| k * (1.0 - x)))
        }
    }

    #[test]
    fn test_closure_density() {
        let pdf = |flavor: i32, x: f64, q: f64| flavor as f64 * x * q;
        assert_relative_eq!(pdf.xfx_q(2, 0.5, 10.0), 10.0);
    }

    #[test]
    fn test_load_set_orders_members() {
        let members = ScaledSource.load_set("toy").unwrap();
        assert_eq!(members.len(), 3);
        assert_relative_eq!(members[0].xfx_q(1, 0.5, 100.0), 0.5);
        assert_relative_eq!(members[2].xfx_q(1, 0.5, 100.0), 0.6);
        assert!(ScaledSource.load_set("other").is_err());
        assert_eq!(ScaledSource.description("toy").unwrap(), "toy");
    }
}
