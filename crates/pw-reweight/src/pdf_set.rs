//! One alternative PDF set: per-event member weights, per-observable
//! accumulators and the family-specific uncertainty band.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use pw_core::{DensitySource, Error, PartonDensity, PartonKinematics, Result, Variation};
use pw_hist::{Histogram, MemberHistogram};

use crate::family::{ModelFamily, REFERENCE_MEMBER, REFERENCE_SET};
use crate::normalization;

/// A named PDF set with its members, reference denominator and accumulators.
///
/// Cloning is cheap for the densities (shared `Arc`s) and copies the
/// accumulators.
#[derive(Clone)]
pub struct PdfSet {
    name: String,
    id: usize,
    family: ModelFamily,
    description: String,
    members: Vec<Arc<dyn PartonDensity>>,
    reference: Arc<dyn PartonDensity>,
    weights: Vec<f64>,
    norm_factors: Option<Vec<f64>>,
    apply_norm: bool,
    observables: BTreeMap<String, MemberHistogram>,
}

impl std::fmt::Debug for PdfSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfSet")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("family", &self.family)
            .field("members", &self.members.len())
            .field("apply_norm", &self.apply_norm)
            .field("observables", &self.observables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PdfSet {
    /// Build a set from already-instantiated members.
    ///
    /// `members[0]` is the central member. The family is resolved from `name`
    /// against the closed model table.
    pub fn new(
        name: impl Into<String>,
        id: usize,
        members: Vec<Arc<dyn PartonDensity>>,
        reference: Arc<dyn PartonDensity>,
    ) -> Result<Self> {
        let name = name.into();
        let family = ModelFamily::from_set_name(&name)?;
        if members.len() < family.min_members() {
            return Err(Error::Validation(format!(
                "PDF set '{name}' has {} members; {family:?} needs at least {}",
                members.len(),
                family.min_members()
            )));
        }
        Ok(Self {
            description: name.clone(),
            name,
            id,
            family,
            weights: Vec::with_capacity(members.len()),
            members,
            reference,
            norm_factors: None,
            apply_norm: false,
            observables: BTreeMap::new(),
        })
    }

    /// Instantiate every member of `name` (and the reference member) from `source`.
    pub fn from_source(source: &dyn DensitySource, name: &str, id: usize) -> Result<Self> {
        // Fail on unknown names before touching the source.
        ModelFamily::from_set_name(name)?;
        let members = source.load_set(name)?;
        let reference = source.load_member(REFERENCE_SET, REFERENCE_MEMBER)?;
        let mut set = Self::new(name, id, members, reference)?;
        set.description = source.description(name)?;
        log::info!("added PdfSet no. {id} '{name}' ({} members, {:?})", set.member_count(), set.family);
        Ok(set)
    }

    /// Builder-style description setter.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based position of the set inside its engine.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Error-propagation family.
    pub fn family(&self) -> ModelFamily {
        self.family
    }

    /// Provider description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Number of members, central member included.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Weights of the last [`PdfSet::compute_weights`] call; empty if none or if it failed.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Loaded normalization factors, if any.
    pub fn normalization_factors(&self) -> Option<&[f64]> {
        self.norm_factors.as_deref()
    }

    /// Whether weights are multiplied by the normalization factors.
    pub fn applies_normalization(&self) -> bool {
        self.apply_norm
    }

    /// Enable or disable normalization. Factors must be loaded before weights
    /// are computed with normalization enabled.
    pub fn set_apply_normalization(&mut self, apply: bool) {
        self.apply_norm = apply;
    }

    /// Install factors directly (one per member).
    pub fn set_normalization_factors(&mut self, factors: Vec<f64>) -> Result<()> {
        if factors.len() != self.member_count() {
            return Err(Error::Validation(format!(
                "'{}' needs {} normalization factors, got {}",
                self.name,
                self.member_count(),
                factors.len()
            )));
        }
        self.norm_factors = Some(factors);
        Ok(())
    }

    /// Load this set's factors for `dataset` from `<dir>/<set>.txt`.
    pub fn load_normalization_factors(&mut self, dir: &Path, dataset: u32) -> Result<()> {
        let path = normalization::table_path(dir, &self.name);
        let factors = normalization::read_factors(&path, dataset, &self.name, self.member_count())?;
        self.norm_factors = Some(factors);
        Ok(())
    }

    /// Forget the weights of the current event.
    pub fn clear_weights(&mut self) {
        self.weights.clear();
    }

    /// Compute one weight per member for this event:
    /// `w_m = f_m(id1, x1, Q) f_m(id2, x2, Q) / (ref(id1, x1, Q) ref(id2, x2, Q))`,
    /// times the member's normalization factor when enabled.
    pub fn compute_weights(&mut self, kin: &PartonKinematics) -> Result<&[f64]> {
        self.weights.clear();
        kin.validate()?;

        let factors = if self.apply_norm {
            match &self.norm_factors {
                Some(f) => Some(f.as_slice()),
                None => {
                    return Err(Error::Validation(format!(
                        "normalization is enabled for '{}' but no factors are loaded",
                        self.name
                    )));
                }
            }
        } else {
            None
        };

        let base1 = self.reference.xfx_q(kin.flavor1, kin.x1, kin.scale);
        let base2 = self.reference.xfx_q(kin.flavor2, kin.x2, kin.scale);
        let denom = base1 * base2;
        if denom == 0.0 || !denom.is_finite() {
            return Err(Error::DegenerateDensity(format!(
                "reference density product {base1} * {base2} at x1={}, x2={}, Q={} (ids {}, {})",
                kin.x1, kin.x2, kin.scale, kin.flavor1, kin.flavor2
            )));
        }

        let mut weights = Vec::with_capacity(self.members.len());
        for (m, member) in self.members.iter().enumerate() {
            let nw1 = member.xfx_q(kin.flavor1, kin.x1, kin.scale);
            let nw2 = member.xfx_q(kin.flavor2, kin.x2, kin.scale);
            let mut w = nw1 * nw2 / denom;
            if let Some(f) = factors {
                w *= f[m];
            }
            if !w.is_finite() {
                return Err(Error::DegenerateDensity(format!(
                    "non-finite weight for member {m} of '{}'",
                    self.name
                )));
            }
            weights.push(w);
        }
        self.weights = weights;
        Ok(&self.weights)
    }

    /// Register an observable; creates its accumulator named `<obs>_<set>`.
    ///
    /// Registering the same name again with identical binning is a no-op.
    pub fn add_observable(&mut self, obs: &Histogram) -> Result<()> {
        if let Some(existing) = self.observables.get(&obs.name) {
            return obs.check_binning(existing.bin_edges());
        }
        let acc = MemberHistogram::for_observable(obs, &self.name, self.member_count())?;
        self.observables.insert(obs.name.clone(), acc);
        Ok(())
    }

    /// True if `name` has an accumulator in this set.
    pub fn has_observable(&self, name: &str) -> bool {
        self.observables.contains_key(name)
    }

    /// Accumulator of a registered observable.
    pub fn accumulator(&self, name: &str) -> Result<&MemberHistogram> {
        self.observables.get(name).ok_or_else(|| Error::MissingObservable(name.to_string()))
    }

    /// Names of all registered observables.
    pub fn observable_names(&self) -> impl Iterator<Item = &str> {
        self.observables.keys().map(String::as_str)
    }

    /// Fill the accumulator of `obs` at `value` with `weights[m] * event_weight` per member.
    pub fn fill_observable(&mut self, obs: &str, value: f64, event_weight: f64) -> Result<()> {
        if self.weights.len() != self.members.len() {
            return Err(Error::Validation(format!(
                "no weights for the current event in '{}'; call compute_weights first",
                self.name
            )));
        }
        let acc =
            self.observables.get_mut(obs).ok_or_else(|| Error::MissingObservable(obs.to_string()))?;
        acc.fill_members(value, &self.weights, event_weight)?;
        Ok(())
    }

    /// Up or down band of `obs`: one varied value per in-range bin, named
    /// `<obs>_<set>_<up|down>`. Under/overflow stay zero.
    pub fn uncertainty(&self, obs: &Histogram, var: Variation) -> Result<Histogram> {
        let acc = self.accumulator(&obs.name)?;
        obs.check_binning(acc.bin_edges())?;
        let mut out = obs.empty_like(format!("{}_{}_{}", obs.name, self.name, var.suffix()));
        for bin in 0..acc.n_bins() {
            out.bin_content[bin] = self.family.variation(acc.column(bin + 1), var)?;
        }
        Ok(out)
    }

    /// Reweighted observable for every member, named `<obs>_<set>_member<m>`.
    pub fn reweighted_observable(&self, obs: &str) -> Result<Vec<Histogram>> {
        let acc = self.accumulator(obs)?;
        (0..acc.n_members())
            .map(|m| acc.member_projection(m, format!("{obs}_{}_member{m}", self.name)))
            .collect()
    }

    /// Member column of one in-range bin (0-based) of `obs`.
    pub fn member_column(&self, obs: &str, bin: usize) -> Result<Vec<f64>> {
        let acc = self.accumulator(obs)?;
        if bin >= acc.n_bins() {
            return Err(Error::Validation(format!(
                "bin {bin} out of range for '{obs}' ({} bins)",
                acc.n_bins()
            )));
        }
        Ok(acc.column(bin + 1).to_vec())
    }

    /// Copy with the same densities and observables but empty accumulators.
    pub fn shard(&self) -> Self {
        let mut s = self.clone();
        s.weights.clear();
        s.observables.values_mut().for_each(MemberHistogram::reset);
        s
    }

    /// Add the accumulators of `other` (a shard of this set).
    pub fn merge(&mut self, other: &PdfSet) -> Result<()> {
        if other.name != self.name || other.member_count() != self.member_count() {
            return Err(Error::Validation(format!(
                "cannot merge set '{}' into '{}'",
                other.name, self.name
            )));
        }
        for (name, acc) in &other.observables {
            match self.observables.get_mut(name) {
                Some(mine) => mine.merge(acc)?,
                None => {
                    self.observables.insert(name.clone(), acc.clone());
                }
            }
        }
        Ok(())
    }
}
