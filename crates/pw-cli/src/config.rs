//! Run configuration (YAML or JSON).

use anyhow::{Context, Result};
use pw_hist::Histogram;
use pw_reweight::family::known_set_names;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// PDF sets to evaluate, in order. Defaults to every supported set.
    #[serde(default = "default_sets")]
    pub sets: Vec<String>,

    /// LHAPDF data directories. Empty: use `LHAPDF_DATA_PATH`.
    #[serde(default)]
    pub pdf_path: Vec<PathBuf>,

    /// Event-weight column; absent means unit weights.
    #[serde(default)]
    pub event_weight: Option<String>,

    /// Per-member normalization tables.
    #[serde(default)]
    pub normalization: Option<NormalizationConfig>,

    /// Observables to reweight.
    #[serde(default)]
    pub observables: Vec<ObservableConfig>,

    /// Threads (0 = auto). Use 1 for deterministic parity.
    #[serde(default = "default_threads")]
    pub threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizationConfig {
    /// Dataset id looked up in the tables.
    pub dataset: u32,
    /// Directory holding `<set>.txt`.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservableConfig {
    pub name: String,
    /// CSV column holding the observable value. Defaults to `name`.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(flatten)]
    pub binning: Binning,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Binning {
    Edges { edges: Vec<f64> },
    Uniform { bins: usize, low: f64, high: f64 },
}

fn default_sets() -> Vec<String> {
    known_set_names().map(str::to_string).collect()
}

fn default_threads() -> usize {
    1
}

impl ObservableConfig {
    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    pub fn histogram(&self) -> Result<Histogram> {
        let h = match &self.binning {
            Binning::Edges { edges } => Histogram::new(&self.name, edges.clone()),
            Binning::Uniform { bins, low, high } => Histogram::uniform(&self.name, *bins, *low, *high),
        };
        h.with_context(|| format!("invalid binning for observable '{}'", self.name))
    }
}

impl RunConfig {
    pub fn set_names(&self) -> Vec<&str> {
        self.sets.iter().map(String::as_str).collect()
    }
}

pub fn read_run_config(path: &Path) -> Result<RunConfig> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read config {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: RunConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        serde_yaml_ng::from_slice(&bytes)?
    };
    if cfg.sets.is_empty() {
        anyhow::bail!("config {} lists no PDF sets", path.display());
    }
    Ok(cfg)
}
