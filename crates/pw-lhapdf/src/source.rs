//! Set lookup across LHAPDF data directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pw_core::{DensitySource, Error, PartonDensity, Result};

use crate::grid::GridPdf;
use crate::info::SetInfo;

/// Environment variable listing data directories, `:`-separated.
pub const DATA_PATH_ENV: &str = "LHAPDF_DATA_PATH";

/// Reads sets laid out as `<dir>/<set>/<set>.info` + `<dir>/<set>/<set>_NNNN.dat`.
#[derive(Debug, Clone)]
pub struct LhapdfSource {
    paths: Vec<PathBuf>,
}

impl LhapdfSource {
    /// Search the given directories, in order.
    pub fn new(paths: Vec<PathBuf>) -> Result<Self> {
        if paths.is_empty() {
            return Err(Error::Validation("no LHAPDF data directory given".into()));
        }
        Ok(Self { paths })
    }

    /// Directories from [`DATA_PATH_ENV`].
    pub fn from_env() -> Result<Self> {
        let value = std::env::var(DATA_PATH_ENV).map_err(|_| {
            Error::Validation(format!("{DATA_PATH_ENV} is not set and no PDF path was configured"))
        })?;
        Self::new(std::env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()).collect())
    }

    /// Configured directories when given, [`DATA_PATH_ENV`] otherwise.
    pub fn from_config_or_env(paths: &[PathBuf]) -> Result<Self> {
        if paths.is_empty() { Self::from_env() } else { Self::new(paths.to_vec()) }
    }

    /// Search directories.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Directory holding `set`.
    pub fn set_dir(&self, set: &str) -> Result<PathBuf> {
        self.paths
            .iter()
            .map(|p| p.join(set))
            .find(|d| d.join(format!("{set}.info")).is_file())
            .ok_or_else(|| {
                let searched =
                    self.paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>();
                Error::config_io(
                    Path::new(set),
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("PDF set not found in [{}]", searched.join(", ")),
                    ),
                )
            })
    }

    /// Parsed `.info` of `set`.
    pub fn info(&self, set: &str) -> Result<SetInfo> {
        SetInfo::read(&self.set_dir(set)?.join(format!("{set}.info")))
    }

    /// Path of one member file.
    pub fn member_path(&self, set: &str, member: usize) -> Result<PathBuf> {
        Ok(self.set_dir(set)?.join(format!("{set}_{member:04}.dat")))
    }
}

impl DensitySource for LhapdfSource {
    fn member_count(&self, set: &str) -> Result<usize> {
        Ok(self.info(set)?.num_members)
    }

    fn load_member(&self, set: &str, member: usize) -> Result<Arc<dyn PartonDensity>> {
        let path = self.member_path(set, member)?;
        log::debug!("loading PDF member '{}'", path.display());
        Ok(Arc::new(GridPdf::read(&path)?))
    }

    fn description(&self, set: &str) -> Result<String> {
        let info = self.info(set)?;
        Ok(if info.description.is_empty() { set.to_string() } else { info.description })
    }

    fn load_set(&self, set: &str) -> Result<Vec<Arc<dyn PartonDensity>>> {
        let dir = self.set_dir(set)?;
        let info = SetInfo::read(&dir.join(format!("{set}.info")))?;
        log::info!("loading {} members of '{set}' from '{}'", info.num_members, dir.display());
        (0..info.num_members)
            .map(|m| {
                let pdf = GridPdf::read(&dir.join(format!("{set}_{m:04}.dat")))?;
                Ok(Arc::new(pdf) as Arc<dyn PartonDensity>)
            })
            .collect()
    }
}
