use proptest::prelude::*;
use pw_core::Variation;
use pw_hist::Histogram;
use pw_reweight::envelope::{apply_relative, envelope_down, envelope_up, relative_variation};

const N_BINS: usize = 6;

fn band(name: &str, contents: &[f64]) -> Histogram {
    let mut h = Histogram::uniform(name, N_BINS, 0.0, 6.0).unwrap();
    h.bin_content = contents.to_vec();
    h
}

fn bands(values: &[Vec<f64>]) -> Vec<Histogram> {
    values.iter().enumerate().map(|(i, v)| band(&format!("set{i}"), v)).collect()
}

proptest! {
    #[test]
    fn prop_widening_one_band_never_narrows_envelope(
        ups in proptest::collection::vec(proptest::collection::vec(0.0f64..1e3, N_BINS), 1..5),
        downs in proptest::collection::vec(proptest::collection::vec(-1e3f64..1e3, N_BINS), 1..5),
        pick in 0usize..5,
        widen in proptest::collection::vec(0.0f64..100.0, N_BINS),
    ) {
        let up0 = envelope_up(&bands(&ups), "u").unwrap();
        let down0 = envelope_down(&bands(&downs), "d").unwrap();

        let mut wider_ups = ups.clone();
        let i = pick % wider_ups.len();
        for (v, w) in wider_ups[i].iter_mut().zip(&widen) {
            *v += w;
        }
        let mut wider_downs = downs.clone();
        let j = pick % wider_downs.len();
        for (v, w) in wider_downs[j].iter_mut().zip(&widen) {
            *v -= w;
        }

        let up1 = envelope_up(&bands(&wider_ups), "u").unwrap();
        let down1 = envelope_down(&bands(&wider_downs), "d").unwrap();
        for b in 0..N_BINS {
            prop_assert!(up1.bin_content[b] >= up0.bin_content[b]);
            prop_assert!(down1.bin_content[b] <= down0.bin_content[b]);
        }
    }

    #[test]
    fn prop_envelope_bounds_every_band(
        values in proptest::collection::vec(proptest::collection::vec(-50.0f64..50.0, N_BINS), 1..6),
    ) {
        let hs = bands(&values);
        let up = envelope_up(&hs, "u").unwrap();
        let down = envelope_down(&hs, "d").unwrap();
        for h in &hs {
            for b in 0..N_BINS {
                prop_assert!(up.bin_content[b] >= h.bin_content[b]);
                prop_assert!(down.bin_content[b] <= h.bin_content[b]);
            }
        }
    }

    #[test]
    fn prop_relative_variation_is_finite(
        up in proptest::collection::vec(0.0f64..1e3, N_BINS),
        spread in proptest::collection::vec(0.0f64..1e3, N_BINS),
        nominal in proptest::collection::vec(0.0f64..1e3, N_BINS),
    ) {
        let down: Vec<f64> = up.iter().zip(&spread).map(|(u, s)| (u - s).max(0.0)).collect();
        let rel = relative_variation(&band("u", &up), &band("d", &down)).unwrap();
        let nom = band("x", &nominal);
        let hu = apply_relative(&nom, &rel, Variation::Up).unwrap();
        let hd = apply_relative(&nom, &rel, Variation::Down).unwrap();
        for b in 0..N_BINS {
            prop_assert!(rel[b].is_finite());
            prop_assert!(rel[b] >= 0.0);
            prop_assert!(hu.bin_content[b] >= hd.bin_content[b]);
        }
    }
}

#[test]
fn zero_envelope_gives_zero_variation() {
    let zero = band("z", &[0.0; N_BINS]);
    let rel = relative_variation(&zero, &zero).unwrap();
    assert!(rel.iter().all(|&r| r == 0.0));
}
