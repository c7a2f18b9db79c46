//! Event loop: reweight every event, then derive the envelope per observable.

use anyhow::{Context, Result};
use pw_core::Variation;
use pw_hist::Histogram;
use pw_lhapdf::LhapdfSource;
use pw_reweight::ReweightingEngine;
use pw_reweight::normalization::{NormalizationTable, rows_for, table_path};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::events::{Event, read_events};

/// Name of the internal single-bin observable used to derive normalization factors.
pub const EVENT_COUNT: &str = "pdfrw_event_count";

#[derive(Debug, Serialize)]
pub struct BandJson {
    pub set: String,
    pub up: Vec<f64>,
    pub down: Vec<f64>,
}

#[derive(Debug, Serialize)]
pub struct ObservableJson {
    pub name: String,
    pub nominal: Histogram,
    pub pdf_up: Histogram,
    pub pdf_down: Histogram,
    pub bands: Vec<BandJson>,
}

pub fn open_source(pdf_path: &[PathBuf]) -> Result<LhapdfSource> {
    LhapdfSource::from_config_or_env(pdf_path).context("no usable LHAPDF data path")
}

pub fn build_engine(cfg: &RunConfig, with_normalization: bool) -> Result<ReweightingEngine> {
    let source = open_source(&cfg.pdf_path)?;
    let mut engine = ReweightingEngine::from_source(&source, &cfg.set_names())
        .context("failed to load PDF sets")?;
    if with_normalization && let Some(norm) = &cfg.normalization {
        engine.load_normalization(&norm.dir, norm.dataset).with_context(|| {
            format!("failed to load normalization factors from {}", norm.dir.display())
        })?;
        tracing::info!(dataset = norm.dataset, dir = %norm.dir.display(), "normalization enabled");
    }
    engine.describe();
    Ok(engine)
}

fn process(
    engine: &mut ReweightingEngine,
    events: &[Event],
    first: usize,
    names: &[String],
) -> Result<()> {
    for (i, evt) in events.iter().enumerate() {
        engine
            .compute_weights(&evt.kinematics)
            .with_context(|| format!("event {}: weight computation failed", first + i))?;
        for (name, &value) in names.iter().zip(&evt.values) {
            engine
                .fill_observable(name, value, evt.weight)
                .with_context(|| format!("event {}: cannot fill '{name}'", first + i))?;
        }
    }
    Ok(())
}

fn resolve_threads(threads: usize) -> usize {
    if threads == 0 { rayon::current_num_threads() } else { threads }
}

/// Accumulate `events` into `engine`. With more than one thread, events are
/// split into contiguous chunks, each filled into its own shard, and the
/// shards are merged in chunk order.
pub fn accumulate(
    engine: &mut ReweightingEngine,
    events: &[Event],
    names: &[String],
    threads: usize,
) -> Result<()> {
    let threads = resolve_threads(threads);
    if threads <= 1 || events.len() < 2 {
        return process(engine, events, 0, names);
    }
    let chunk = events.len().div_ceil(threads);
    let template: &ReweightingEngine = engine;
    let shards = events
        .par_chunks(chunk)
        .enumerate()
        .map(|(ci, evts)| {
            let mut shard = template.shard();
            process(&mut shard, evts, ci * chunk, names)?;
            Ok(shard)
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(shards = shards.len(), chunk, "merging shards");
    for shard in &shards {
        engine.merge(shard)?;
    }
    Ok(())
}

fn observable_json(engine: &mut ReweightingEngine, nominal: Histogram) -> Result<ObservableJson> {
    let pdf_up = engine.uncertainty(&nominal, Variation::Up)?;
    let pdf_down = engine.uncertainty(&nominal, Variation::Down)?;
    let bands = match engine.last_bands(&nominal.name) {
        Some(b) => engine
            .sets()
            .iter()
            .zip(b.ups.iter().zip(&b.downs))
            .map(|(s, (u, d))| BandJson {
                set: s.name().to_string(),
                up: u.bin_content.clone(),
                down: d.bin_content.clone(),
            })
            .collect(),
        None => Vec::new(),
    };
    Ok(ObservableJson { name: nominal.name.clone(), nominal, pdf_up, pdf_down, bands })
}

pub fn run(cfg: &RunConfig, events_path: &Path, threads: usize) -> Result<serde_json::Value> {
    if cfg.observables.is_empty() {
        anyhow::bail!("config defines no observables");
    }
    let mut nominals =
        cfg.observables.iter().map(|o| o.histogram()).collect::<Result<Vec<_>>>()?;
    let columns: Vec<&str> = cfg.observables.iter().map(|o| o.column()).collect();
    let names: Vec<String> = nominals.iter().map(|h| h.name.clone()).collect();

    let mut engine = build_engine(cfg, true)?;
    for h in &nominals {
        engine.add_observable(h)?;
    }

    let events = read_events(events_path, cfg.event_weight.as_deref(), &columns)?;
    for evt in &events {
        for (h, &v) in nominals.iter_mut().zip(&evt.values) {
            h.fill(v, evt.weight)?;
        }
    }
    accumulate(&mut engine, &events, &names, threads)?;
    tracing::info!(events = events.len(), observables = names.len(), "accumulation done");

    let observables = nominals
        .into_iter()
        .map(|h| observable_json(&mut engine, h))
        .collect::<Result<Vec<_>>>()?;

    Ok(serde_json::json!({
        "version": pw_core::VERSION,
        "n_events": events.len(),
        "normalization": cfg.normalization.as_ref().map(|n| serde_json::json!({
            "dataset": n.dataset,
            "dir": n.dir,
        })),
        "sets": engine.summary().sets,
        "observables": observables,
    }))
}

/// Derive per-member normalization factors for `dataset` and write `<out_dir>/<set>.txt`.
pub fn norm_factors(
    cfg: &RunConfig,
    events_path: &Path,
    dataset: u32,
    out_dir: &Path,
    threads: usize,
) -> Result<serde_json::Value> {
    if cfg.normalization.is_some() {
        tracing::warn!("ignoring configured normalization while deriving factors");
    }
    let mut engine = build_engine(cfg, false)?;
    let mut count = Histogram::new(EVENT_COUNT, vec![0.0, 1.0])?;
    engine.add_observable(&count)?;

    let events = read_events(events_path, cfg.event_weight.as_deref(), &[])?;
    // every event sits at the centre of the single count bin
    let counted: Vec<Event> = events
        .into_iter()
        .map(|mut e| {
            e.values = vec![0.5];
            e
        })
        .collect();
    for e in &counted {
        count.fill(0.5, e.weight)?;
    }
    accumulate(&mut engine, &counted, &[EVENT_COUNT.to_string()], threads)?;

    let factors = engine.derive_normalization(&count)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let mut written = Vec::with_capacity(factors.len());
    for (set, f) in &factors {
        let path = table_path(out_dir, set);
        NormalizationTable::new(rows_for(dataset, set, f))
            .write(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(set = %set, path = %path.display(), "normalization table written");
        written.push(serde_json::json!({ "set": set, "path": path, "factors": f }));
    }

    Ok(serde_json::json!({
        "dataset": dataset,
        "n_events": counted.len(),
        "sum_weights": count.integral(),
        "tables": written,
    }))
}
