//! Envelope of per-set bands and the relative variation applied to the nominal.

use pw_core::{Error, Result, Variation};
use pw_hist::Histogram;

fn check_same_binning(bands: &[Histogram]) -> Result<&Histogram> {
    let first = bands
        .first()
        .ok_or_else(|| Error::Validation("envelope of zero bands".to_string()))?;
    for b in &bands[1..] {
        b.check_binning(&first.bin_edges)?;
    }
    Ok(first)
}

fn fold(bands: &[Histogram], name: &str, pick: fn(f64, f64) -> f64) -> Result<Histogram> {
    let first = check_same_binning(bands)?;
    let mut out = first.clone_named(name);
    for b in &bands[1..] {
        for (o, v) in out.bin_content.iter_mut().zip(&b.bin_content) {
            *o = pick(*o, *v);
        }
    }
    Ok(out)
}

/// Bin-wise maximum over the up bands of every set, seeded with the first band.
pub fn envelope_up(bands: &[Histogram], name: &str) -> Result<Histogram> {
    fold(bands, name, f64::max)
}

/// Bin-wise minimum over the down bands of every set, seeded with the first band.
pub fn envelope_down(bands: &[Histogram], name: &str) -> Result<Histogram> {
    fold(bands, name, f64::min)
}

/// Per-bin relative half-width `(up - mid) / mid` with `mid = (up + down) / 2`.
///
/// Bins with a zero midpoint get 0.
pub fn relative_variation(up: &Histogram, down: &Histogram) -> Result<Vec<f64>> {
    down.check_binning(&up.bin_edges)?;
    Ok(up
        .bin_content
        .iter()
        .zip(&down.bin_content)
        .map(|(&u, &d)| {
            let mid = 0.5 * (u + d);
            if mid == 0.0 { 0.0 } else { (u - mid) / mid }
        })
        .collect())
}

/// Copy of `nominal` named `<obs>_PDF_<up|down>` with every in-range bin scaled
/// by `1 ± rel[i]`. Flows and errors are carried over unchanged.
pub fn apply_relative(nominal: &Histogram, rel: &[f64], var: Variation) -> Result<Histogram> {
    if rel.len() != nominal.n_bins() {
        return Err(Error::Validation(format!(
            "'{}' has {} bins but {} relative variations were given",
            nominal.name,
            nominal.n_bins(),
            rel.len()
        )));
    }
    let sign = match var {
        Variation::Up => 1.0,
        Variation::Down => -1.0,
    };
    let mut out = nominal.clone_named(format!("{}_PDF_{}", nominal.name, var.suffix()));
    for (c, r) in out.bin_content.iter_mut().zip(rel) {
        *c *= 1.0 + sign * r;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn band(name: &str, contents: &[f64]) -> Histogram {
        let mut h = Histogram::uniform(name, contents.len(), 0.0, contents.len() as f64).unwrap();
        h.bin_content = contents.to_vec();
        h
    }

    #[test]
    fn envelope_takes_extremes() {
        let ups = [band("a", &[1.0, 5.0]), band("b", &[3.0, 2.0]), band("c", &[2.0, 4.0])];
        let up = envelope_up(&ups, "pt_envelope_up").unwrap();
        assert_eq!(up.bin_content, vec![3.0, 5.0]);
        assert_eq!(up.name, "pt_envelope_up");

        let downs = [band("a", &[-1.0, 0.5]), band("b", &[-3.0, 0.7])];
        let down = envelope_down(&downs, "d").unwrap();
        assert_eq!(down.bin_content, vec![-3.0, 0.5]);
    }

    #[test]
    fn envelope_of_negative_bands_is_seeded_by_first() {
        // a zero seed would wrongly win here
        let ups = [band("a", &[-4.0]), band("b", &[-2.0])];
        assert_eq!(envelope_up(&ups, "u").unwrap().bin_content, vec![-2.0]);
        let downs = [band("a", &[4.0]), band("b", &[2.0])];
        assert_eq!(envelope_down(&downs, "d").unwrap().bin_content, vec![2.0]);
    }

    #[test]
    fn envelope_rejects_empty_and_mismatched() {
        assert!(envelope_up(&[], "x").is_err());
        let bands = [band("a", &[1.0]), band("b", &[1.0, 2.0])];
        assert!(envelope_down(&bands, "x").is_err());
    }

    #[test]
    fn relative_variation_and_apply() {
        let up = band("u", &[110.0, 0.0, 6.0]);
        let down = band("d", &[90.0, 0.0, 2.0]);
        let rel = relative_variation(&up, &down).unwrap();
        assert_relative_eq!(rel[0], 0.1);
        assert_eq!(rel[1], 0.0);
        assert_relative_eq!(rel[2], 0.5);

        let mut nominal = band("pt", &[50.0, 10.0, 8.0]);
        nominal.overflow = 3.0;
        let hu = apply_relative(&nominal, &rel, Variation::Up).unwrap();
        let hd = apply_relative(&nominal, &rel, Variation::Down).unwrap();
        assert_eq!(hu.name, "pt_PDF_up");
        assert_eq!(hd.name, "pt_PDF_down");
        assert_relative_eq!(hu.bin_content[0], 55.0);
        assert_relative_eq!(hd.bin_content[0], 45.0);
        assert_eq!(hu.bin_content[1], 10.0);
        assert_relative_eq!(hd.bin_content[2], 4.0);
        assert_eq!(hu.overflow, 3.0);
        assert!(apply_relative(&nominal, &rel[..2], Variation::Up).is_err());
    }
}
