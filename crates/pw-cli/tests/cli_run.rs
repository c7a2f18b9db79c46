use approx::assert_relative_eq;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const SETS: [&str; 3] = ["CT10nlo", "MSTW2008nlo68cl", "NNPDF23_nlo_as_0119"];
const MEMBERS: usize = 5;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pdfrw"))
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("pdfrw_cli_{}_{}_{}", std::process::id(), nanos, name));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .env_remove("LHAPDF_DATA_PATH")
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn ok_json(out: &Output) -> serde_json::Value {
    assert!(
        out.status.success(),
        "command failed: status={:?}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON")
}

/// Flat density of member `m`: independent of flavour, x and Q.
fn level(set: &str, m: usize) -> f64 {
    let step = match set {
        "CT10nlo" => 0.02,
        "MSTW2008nlo68cl" => 0.03,
        _ => 0.015,
    };
    let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
    1.0 + sign * step * m as f64
}

fn write_pdfs(root: &Path) {
    for set in SETS {
        let dir = root.join(set);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(format!("{set}.info")),
            format!("SetDesc: \"flat {set}\"\nNumMembers: {MEMBERS}\nFlavors: [1, 2, 21]\n"),
        )
        .unwrap();
        for m in 0..MEMBERS {
            let c = level(set, m);
            let mut text = String::from("PdfType: error\nFormat: lhagrid1\n---\n1e-5 1e-3 1e-1 1\n1 1e4\n1 2 21\n");
            for _ in 0..8 {
                text.push_str(&format!("{c:.12} {c:.12} {c:.12}\n"));
            }
            text.push_str("---\n");
            std::fs::write(dir.join(format!("{set}_{m:04}.dat")), text).unwrap();
        }
    }
}

fn write_events(path: &Path) {
    let mut csv = String::from("x1,x2,scale,id1,id2,weight,pt\n");
    for i in 0..30 {
        let x1 = 0.01 + 0.02 * i as f64;
        let pt = 5.0 + 13.0 * (i % 15) as f64;
        let w = if i % 4 == 0 { 2.0 } else { 1.0 };
        csv.push_str(&format!("{x1},0.05,91.2,21,2,{w},{pt}\n"));
    }
    std::fs::write(path, csv).unwrap();
}

fn write_config(path: &Path, pdf_dir: &Path, extra: &str) {
    let yaml = format!(
        r#"pdf_path: ["{pdf}"]
event_weight: weight
observables:
  - {{ name: pt, bins: 4, low: 0, high: 200 }}
{extra}"#,
        pdf = pdf_dir.display(),
    );
    std::fs::write(path, yaml).unwrap();
}

struct Fixture {
    dir: PathBuf,
    pdfs: PathBuf,
    events: PathBuf,
}

impl Fixture {
    fn new(name: &str) -> Self {
        let dir = tmp_dir(name);
        let pdfs = dir.join("pdfsets");
        std::fs::create_dir_all(&pdfs).unwrap();
        write_pdfs(&pdfs);
        let events = dir.join("events.csv");
        write_events(&events);
        Self { dir, pdfs, events }
    }

    fn config(&self, name: &str, extra: &str) -> PathBuf {
        let p = self.dir.join(name);
        write_config(&p, &self.pdfs, extra);
        p
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

fn bins(v: &serde_json::Value) -> Vec<f64> {
    v["bin_content"].as_array().unwrap().iter().map(|x| x.as_f64().unwrap()).collect()
}

#[test]
fn run_writes_envelope_per_observable() {
    let fx = Fixture::new("run");
    let cfg = fx.config("run.yaml", "");
    let out = run(&["run", "--config", cfg.to_str().unwrap(), "--events", fx.events.to_str().unwrap()]);
    let v = ok_json(&out);

    assert_eq!(v["n_events"], 30);
    assert_eq!(v["sets"].as_array().unwrap().len(), 3);
    assert_eq!(v["sets"][1]["family"], "asymmetric_hessian");
    assert_eq!(v["sets"][2]["members"], MEMBERS);

    let obs = &v["observables"][0];
    assert_eq!(obs["name"], "pt");
    assert_eq!(obs["pdf_up"]["name"], "pt_PDF_up");
    assert_eq!(obs["pdf_down"]["name"], "pt_PDF_down");
    assert_eq!(obs["bands"].as_array().unwrap().len(), 3);

    let nominal = bins(&obs["nominal"]);
    let up = bins(&obs["pdf_up"]);
    let down = bins(&obs["pdf_down"]);
    assert_relative_eq!(nominal.iter().sum::<f64>(), 38.0, epsilon = 1e-12);
    for i in 0..nominal.len() {
        assert!(up[i] > nominal[i], "bin {i}: {} <= {}", up[i], nominal[i]);
        assert!(down[i] < nominal[i]);
    }
}

#[test]
fn threaded_run_matches_sequential() {
    let fx = Fixture::new("threads");
    let cfg = fx.config("run.yaml", "threads: 1\n");
    let args = ["run", "--config", cfg.to_str().unwrap(), "--events", fx.events.to_str().unwrap()];
    let serial = ok_json(&run(&args));

    let mut threaded_args = args.to_vec();
    threaded_args.extend(["--threads", "3"]);
    let threaded = ok_json(&run(&threaded_args));

    for key in ["pdf_up", "pdf_down"] {
        let a = bins(&serial["observables"][0][key]);
        let b = bins(&threaded["observables"][0][key]);
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(x, y, max_relative = 1e-12);
        }
    }
}

#[test]
fn derived_factors_flatten_the_bands() {
    let fx = Fixture::new("norm");
    let cfg = fx.config("derive.yaml", "");
    let tables = fx.dir.join("norm");
    let out = run(&[
        "norm-factors",
        "--config",
        cfg.to_str().unwrap(),
        "--events",
        fx.events.to_str().unwrap(),
        "--dataset",
        "410000",
        "--out-dir",
        tables.to_str().unwrap(),
    ]);
    let v = ok_json(&out);
    assert_eq!(v["dataset"], 410000);
    assert_eq!(v["tables"].as_array().unwrap().len(), 3);
    for set in SETS {
        let text = std::fs::read_to_string(tables.join(format!("{set}.txt"))).unwrap();
        assert!(text.starts_with("# dataset set member factor"));
        assert_eq!(text.lines().filter(|l| l.starts_with("410000 ")).count(), MEMBERS);
    }
    // flat densities: f_m = 1 / level(m)^2
    let f = v["tables"][1]["factors"].as_array().unwrap();
    assert_relative_eq!(
        f[3].as_f64().unwrap(),
        1.0 / level("MSTW2008nlo68cl", 3).powi(2),
        max_relative = 1e-9
    );

    let normed = fx.config(
        "normed.yaml",
        &format!("normalization: {{ dataset: 410000, dir: \"{}\" }}\n", tables.display()),
    );
    let v = ok_json(&run(&[
        "run",
        "--config",
        normed.to_str().unwrap(),
        "--events",
        fx.events.to_str().unwrap(),
    ]));
    assert_eq!(v["normalization"]["dataset"], 410000);
    assert_eq!(v["sets"][0]["normalized"], true);
    let obs = &v["observables"][0];
    let nominal = bins(&obs["nominal"]);
    for key in ["pdf_up", "pdf_down"] {
        for (x, n) in bins(&obs[key]).iter().zip(&nominal) {
            assert_relative_eq!(x, n, max_relative = 1e-6);
        }
    }

    let wrong = fx.config(
        "wrong.yaml",
        &format!("normalization: {{ dataset: 999, dir: \"{}\" }}\n", tables.display()),
    );
    let out = run(&["run", "--config", wrong.to_str().unwrap(), "--events", fx.events.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("missing normalization factors"), "stderr: {stderr}");
}

#[test]
fn run_fails_without_pdf_path() {
    let fx = Fixture::new("nopath");
    let cfg = fx.dir.join("nopath.yaml");
    std::fs::write(&cfg, "observables:\n  - { name: pt, bins: 2, low: 0, high: 10 }\n").unwrap();
    let out = run(&["run", "--config", cfg.to_str().unwrap(), "--events", fx.events.to_str().unwrap()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("LHAPDF_DATA_PATH"));
}

#[test]
fn sets_lists_model_table() {
    let fx = Fixture::new("sets");
    let v = ok_json(&run(&["sets", "--pdf-path", fx.pdfs.to_str().unwrap()]));
    let sets = v["sets"].as_array().unwrap();
    assert_eq!(sets.len(), 3);
    assert_eq!(sets[0]["name"], "CT10nlo");
    assert_eq!(sets[0]["reference"], true);
    assert_eq!(sets[2]["family"], "replica_ensemble");
    assert_eq!(sets[1]["members"], MEMBERS);
    assert_eq!(sets[1]["description"], "flat MSTW2008nlo68cl");

    let bare = ok_json(&run(&["sets"]));
    assert!(bare["sets"][0].get("members").is_none());
}

#[test]
fn version_prints_crate_version() {
    let out = run(&["version"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("pdfrw "));
}
