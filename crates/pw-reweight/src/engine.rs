//! Reweighting engine: owns the PDF sets, forwards per-event calls and
//! combines per-set bands into the cross-model envelope.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use pw_core::{DensitySource, Error, PartonKinematics, Result, Variation};
use pw_hist::{Histogram, find_bin};

use crate::envelope::{apply_relative, envelope_down, envelope_up, relative_variation};
use crate::family::{ModelFamily, known_set_names};
use crate::normalization::derive_factors;
use crate::pdf_set::PdfSet;

/// Lifecycle of an engine. Queries are allowed in both phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Sets attached, normalization mode may still change.
    Configured,
    /// At least one event had its weights computed; normalization mode is fixed.
    Accumulating,
}

/// Per-set bands of the last uncertainty request for one observable.
#[derive(Debug, Clone, Serialize)]
pub struct SetBands {
    /// Up band of every set, in set order.
    pub ups: Vec<Histogram>,
    /// Down band of every set, in set order.
    pub downs: Vec<Histogram>,
}

/// Member column of one set for one observable bin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberColumn {
    /// Set name.
    pub set: String,
    /// Accumulated value of every member, central member first.
    pub values: Vec<f64>,
}

/// Static description of one set.
#[derive(Debug, Clone, Serialize)]
pub struct SetSummary {
    /// 1-based set id.
    pub id: usize,
    /// Set name.
    pub name: String,
    /// Estimator family.
    pub family: ModelFamily,
    /// Members including the central one.
    pub members: usize,
    /// Provider description.
    pub description: String,
    /// Whether normalization factors are applied.
    pub normalized: bool,
}

/// Static description of an engine.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    /// Current phase.
    pub phase: Phase,
    /// Owned sets.
    pub sets: Vec<SetSummary>,
    /// Registered observable names.
    pub observables: Vec<String>,
}

/// Owns an ordered, non-empty collection of [`PdfSet`]s with distinct names.
#[derive(Debug, Clone)]
pub struct ReweightingEngine {
    sets: Vec<PdfSet>,
    observables: BTreeMap<String, Vec<f64>>,
    last_bands: BTreeMap<String, SetBands>,
    phase: Phase,
}

impl ReweightingEngine {
    /// Engine over already-built sets.
    pub fn new(sets: Vec<PdfSet>) -> Result<Self> {
        if sets.is_empty() {
            return Err(Error::Validation("reweighting engine needs at least one PDF set".into()));
        }
        for (i, a) in sets.iter().enumerate() {
            if sets[..i].iter().any(|b| b.name().eq_ignore_ascii_case(a.name())) {
                return Err(Error::Validation(format!("PDF set '{}' added twice", a.name())));
            }
        }
        Ok(Self {
            sets,
            observables: BTreeMap::new(),
            last_bands: BTreeMap::new(),
            phase: Phase::Configured,
        })
    }

    /// Instantiate the named sets from `source`, ids assigned in order from 1.
    pub fn from_source(source: &dyn DensitySource, names: &[&str]) -> Result<Self> {
        let sets = names
            .iter()
            .enumerate()
            .map(|(i, name)| PdfSet::from_source(source, name, i + 1))
            .collect::<Result<Vec<_>>>()?;
        Self::new(sets)
    }

    /// Every set of the closed model table.
    pub fn with_default_sets(source: &dyn DensitySource) -> Result<Self> {
        let names: Vec<&str> = known_set_names().collect();
        Self::from_source(source, &names)
    }

    /// A single named set.
    pub fn single_set(source: &dyn DensitySource, name: &str) -> Result<Self> {
        Self::from_source(source, &[name])
    }

    /// Owned sets in order.
    pub fn sets(&self) -> &[PdfSet] {
        &self.sets
    }

    /// Set by name.
    pub fn set(&self, name: &str) -> Result<&PdfSet> {
        self.sets
            .iter()
            .find(|s| s.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Validation(format!("no PDF set named '{name}' in this engine")))
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Registered observables.
    pub fn observable_names(&self) -> impl Iterator<Item = &str> {
        self.observables.keys().map(String::as_str)
    }

    fn check_configurable(&self, what: &str) -> Result<()> {
        if self.phase == Phase::Accumulating {
            return Err(Error::Validation(format!("cannot {what} after accumulation has started")));
        }
        Ok(())
    }

    /// Enable or disable normalization on every set.
    pub fn set_apply_normalization(&mut self, apply: bool) -> Result<()> {
        self.check_configurable("change the normalization mode")?;
        self.sets.iter_mut().for_each(|s| s.set_apply_normalization(apply));
        Ok(())
    }

    /// Load every set's factors for `dataset` from `<dir>/<set>.txt` and enable normalization.
    pub fn load_normalization(&mut self, dir: &Path, dataset: u32) -> Result<()> {
        self.check_configurable("load normalization factors")?;
        for set in &mut self.sets {
            set.load_normalization_factors(dir, dataset)?;
        }
        self.set_apply_normalization(true)
    }

    /// Compute this event's weights in every set.
    ///
    /// If any set fails, all sets are left without weights.
    pub fn compute_weights(&mut self, kin: &PartonKinematics) -> Result<()> {
        let mut failure = None;
        for set in &mut self.sets {
            if let Err(e) = set.compute_weights(kin).map(|_| ()) {
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            self.sets.iter_mut().for_each(PdfSet::clear_weights);
            return Err(e);
        }
        self.phase = Phase::Accumulating;
        Ok(())
    }

    /// Register `obs` with every set. Re-registering identical binning is a no-op.
    pub fn add_observable(&mut self, obs: &Histogram) -> Result<()> {
        if let Some(edges) = self.observables.get(&obs.name) {
            return obs.check_binning(edges);
        }
        for set in &mut self.sets {
            set.add_observable(obs)?;
        }
        log::info!("registered observable '{}' ({} bins) with {} PDF sets", obs.name, obs.n_bins(), self.sets.len());
        self.observables.insert(obs.name.clone(), obs.bin_edges.clone());
        Ok(())
    }

    /// Fill `obs` at `value` in every set with this event's weights times `event_weight`.
    pub fn fill_observable(&mut self, obs: &str, value: f64, event_weight: f64) -> Result<()> {
        let edges =
            self.observables.get(obs).ok_or_else(|| Error::MissingObservable(obs.to_string()))?;
        find_bin(edges, value)?;
        if !event_weight.is_finite() {
            return Err(Error::Validation(format!("non-finite event weight {event_weight} for '{obs}'")));
        }
        if let Some(set) = self.sets.iter().find(|s| s.weights().len() != s.member_count()) {
            return Err(Error::Validation(format!(
                "no weights for the current event in '{}'; call compute_weights first",
                set.name()
            )));
        }
        for set in &mut self.sets {
            set.fill_observable(obs, value, event_weight)?;
        }
        Ok(())
    }

    /// Envelope variation of the nominal `obs`, named `<obs>_PDF_<up|down>`.
    ///
    /// Rebuilds the per-set bands from the current accumulators and caches them
    /// (see [`ReweightingEngine::last_bands`]).
    pub fn uncertainty(&mut self, obs: &Histogram, var: Variation) -> Result<Histogram> {
        let edges = self
            .observables
            .get(&obs.name)
            .ok_or_else(|| Error::MissingObservable(obs.name.clone()))?;
        obs.check_binning(edges)?;

        let mut ups = Vec::with_capacity(self.sets.len());
        let mut downs = Vec::with_capacity(self.sets.len());
        for set in &self.sets {
            ups.push(set.uncertainty(obs, Variation::Up)?);
            downs.push(set.uncertainty(obs, Variation::Down)?);
        }
        let up = envelope_up(&ups, &format!("{}_envelope_up", obs.name))?;
        let down = envelope_down(&downs, &format!("{}_envelope_down", obs.name))?;
        let rel = relative_variation(&up, &down)?;
        self.last_bands.insert(obs.name.clone(), SetBands { ups, downs });
        apply_relative(obs, &rel, var)
    }

    /// Per-set bands from the most recent [`ReweightingEngine::uncertainty`] call on `obs`.
    pub fn last_bands(&self, obs: &str) -> Option<&SetBands> {
        self.last_bands.get(obs)
    }

    /// Member columns of every set for one in-range bin (0-based) of `obs`.
    pub fn envelope_plot(&self, obs: &str, bin: usize) -> Result<Vec<MemberColumn>> {
        self.sets
            .iter()
            .map(|s| Ok(MemberColumn { set: s.name().to_string(), values: s.member_column(obs, bin)? }))
            .collect()
    }

    /// One histogram per member of `set` for `obs`.
    pub fn reweighted_observable(&self, obs: &str, set: &str) -> Result<Vec<Histogram>> {
        self.set(set)?.reweighted_observable(obs)
    }

    /// Factors `f_m = Σ w_evt / Σ (w_m w_evt)` for every set, from a count
    /// observable filled with normalization disabled. `nominal` holds the
    /// event-weight sum in its in-range bins.
    pub fn derive_normalization(&self, nominal: &Histogram) -> Result<Vec<(String, Vec<f64>)>> {
        if let Some(set) = self.sets.iter().find(|s| s.applies_normalization()) {
            return Err(Error::Validation(format!(
                "set '{}' applies normalization; derive factors from unnormalized weights",
                set.name()
            )));
        }
        self.sets
            .iter()
            .map(|s| {
                let acc = s.accumulator(&nominal.name)?;
                let sums: Vec<f64> = (0..acc.n_members()).map(|m| acc.member_integral(m)).collect();
                Ok((s.name().to_string(), derive_factors(nominal.integral(), &sums)?))
            })
            .collect()
    }

    /// Static summary of the engine.
    pub fn summary(&self) -> EngineSummary {
        EngineSummary {
            phase: self.phase,
            sets: self
                .sets
                .iter()
                .map(|s| SetSummary {
                    id: s.id(),
                    name: s.name().to_string(),
                    family: s.family(),
                    members: s.member_count(),
                    description: s.description().to_string(),
                    normalized: s.applies_normalization(),
                })
                .collect(),
            observables: self.observables.keys().cloned().collect(),
        }
    }

    /// Log the summary at info level.
    pub fn describe(&self) {
        let summary = self.summary();
        log::info!("reweighting engine with {} PDF sets ({:?})", summary.sets.len(), summary.phase);
        for s in &summary.sets {
            log::info!(
                "  [{}] {} {:?} members={} normalized={} : {}",
                s.id,
                s.name,
                s.family,
                s.members,
                s.normalized,
                s.description
            );
        }
        for obs in &summary.observables {
            log::info!("  observable {obs}");
        }
    }

    /// Empty-accumulator copy sharing the density providers, for one worker.
    pub fn shard(&self) -> Self {
        Self {
            sets: self.sets.iter().map(PdfSet::shard).collect(),
            observables: self.observables.clone(),
            last_bands: BTreeMap::new(),
            phase: self.phase,
        }
    }

    /// Sum the accumulators of a shard into this engine.
    pub fn merge(&mut self, other: &ReweightingEngine) -> Result<()> {
        if self.observables != other.observables
            || self.sets.len() != other.sets.len()
            || self.sets.iter().zip(&other.sets).any(|(a, b)| a.name() != b.name())
        {
            return Err(Error::Validation(
                "cannot merge engines with different sets or observables".into(),
            ));
        }
        for (mine, theirs) in self.sets.iter_mut().zip(&other.sets) {
            mine.merge(theirs)?;
        }
        if other.phase == Phase::Accumulating {
            self.phase = Phase::Accumulating;
        }
        Ok(())
    }
}
