//! Analysis-facing wrapper selecting one systematic direction.
//!
//! In [`SystMode::Nominal`] no PDF set is loaded and every call is a no-op, so
//! analysis code can call the tool unconditionally.

use std::collections::BTreeMap;
use std::path::Path;

use pw_core::{DensitySource, Error, PartonKinematics, Result, SystMode};
use pw_hist::{Histogram, Histogram2D};

use crate::engine::ReweightingEngine;

/// Name of the internal 1-D observable for y cell `ycell` of a 2-D observable.
pub fn slice_name(obs: &str, ycell: usize) -> String {
    format!("{obs}_ybin{ycell}")
}

/// Binning of a registered 2-D observable.
#[derive(Debug, Clone)]
struct Binning2D {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
}

impl Binning2D {
    fn y_cell(&self, y: f64) -> Result<usize> {
        Ok(pw_hist::find_bin(&self.y_edges, y)?.cell(self.y_edges.len() - 1))
    }
}

/// PDF systematic for one analysis job.
#[derive(Debug)]
pub struct SystematicTool {
    mode: SystMode,
    dataset: Option<u32>,
    engine: Option<ReweightingEngine>,
    observables_2d: BTreeMap<String, Binning2D>,
}

impl SystematicTool {
    /// Build the tool; loads every default set unless `mode` is nominal.
    pub fn new(mode: SystMode, source: &dyn DensitySource) -> Result<Self> {
        let engine = match mode {
            SystMode::Nominal => None,
            SystMode::Up | SystMode::Down => Some(ReweightingEngine::with_default_sets(source)?),
        };
        log::info!("PDF systematic tool in {mode:?} mode");
        Ok(Self { mode, dataset: None, engine, observables_2d: BTreeMap::new() })
    }

    /// Wrap an existing engine.
    pub fn with_engine(mode: SystMode, engine: ReweightingEngine) -> Self {
        let engine = mode.variation().map(|_| engine);
        Self { mode, dataset: None, engine, observables_2d: BTreeMap::new() }
    }

    /// Enable normalization for `dataset` with tables from `dir`.
    pub fn with_normalization(mut self, dir: &Path, dataset: u32) -> Result<Self> {
        if let Some(engine) = &mut self.engine {
            engine.load_normalization(dir, dataset)?;
        }
        self.dataset = Some(dataset);
        Ok(self)
    }

    /// Selected direction.
    pub fn mode(&self) -> SystMode {
        self.mode
    }

    /// Dataset id normalization was enabled for.
    pub fn dataset(&self) -> Option<u32> {
        self.dataset
    }

    /// Underlying engine; `None` in nominal mode.
    pub fn engine(&self) -> Option<&ReweightingEngine> {
        self.engine.as_ref()
    }

    /// Track a 1-D observable.
    pub fn add_observable_1d(&mut self, obs: &Histogram) -> Result<()> {
        match &mut self.engine {
            Some(engine) => engine.add_observable(obs),
            None => Ok(()),
        }
    }

    /// Track a 2-D observable as one 1-D observable per y cell, flows included.
    pub fn add_observable_2d(&mut self, obs: &Histogram2D) -> Result<()> {
        let Some(engine) = &mut self.engine else {
            return Ok(());
        };
        if let Some(b) = self.observables_2d.get(&obs.name) {
            if b.x_edges != obs.x_edges || b.y_edges != obs.y_edges {
                return Err(Error::Validation(format!(
                    "2-D observable '{}' already registered with a different binning",
                    obs.name
                )));
            }
            return Ok(());
        }
        for ycell in 0..=obs.n_bins_y() + 1 {
            let slice = Histogram::new(slice_name(&obs.name, ycell), obs.x_edges.clone())?;
            engine.add_observable(&slice)?;
        }
        self.observables_2d.insert(
            obs.name.clone(),
            Binning2D { x_edges: obs.x_edges.clone(), y_edges: obs.y_edges.clone() },
        );
        Ok(())
    }

    /// Compute this event's weights.
    pub fn begin_event(&mut self, kin: &PartonKinematics) -> Result<()> {
        match &mut self.engine {
            Some(engine) => engine.compute_weights(kin),
            None => Ok(()),
        }
    }

    /// Fill a 1-D observable for the current event.
    pub fn fill_1d(&mut self, obs: &str, value: f64, event_weight: f64) -> Result<()> {
        match &mut self.engine {
            Some(engine) => engine.fill_observable(obs, value, event_weight),
            None => Ok(()),
        }
    }

    /// Fill a 2-D observable for the current event.
    pub fn fill_2d(&mut self, obs: &str, x: f64, y: f64, event_weight: f64) -> Result<()> {
        let Some(engine) = &mut self.engine else {
            return Ok(());
        };
        let binning =
            self.observables_2d.get(obs).ok_or_else(|| Error::MissingObservable(obs.to_string()))?;
        let ycell = binning.y_cell(y)?;
        engine.fill_observable(&slice_name(obs, ycell), x, event_weight)
    }

    /// Replace the contents of `nominal` by its PDF variation in the selected direction.
    pub fn finalize_1d(&mut self, nominal: &mut Histogram) -> Result<()> {
        let (Some(engine), Some(var)) = (&mut self.engine, self.mode.variation()) else {
            return Ok(());
        };
        let varied = engine.uncertainty(nominal, var)?;
        nominal.bin_content = varied.bin_content;
        Ok(())
    }

    /// Replace every y slice of `nominal` by its PDF variation in the selected direction.
    pub fn finalize_2d(&mut self, nominal: &mut Histogram2D) -> Result<()> {
        let (Some(engine), Some(var)) = (&mut self.engine, self.mode.variation()) else {
            return Ok(());
        };
        if !self.observables_2d.contains_key(&nominal.name) {
            return Err(Error::MissingObservable(nominal.name.clone()));
        }
        for ycell in 0..=nominal.n_bins_y() + 1 {
            let slice = nominal.slice(ycell, slice_name(&nominal.name, ycell))?;
            let varied = engine.uncertainty(&slice, var)?;
            nominal.set_slice(ycell, &varied)?;
        }
        Ok(())
    }
}
