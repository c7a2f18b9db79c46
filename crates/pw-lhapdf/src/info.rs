//! `.info` metadata and per-member headers.

use std::path::Path;

use serde::{Deserialize, Serialize};

use pw_core::{Error, Result};

/// The subset of a set's `.info` file the reader needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetInfo {
    /// Free-text description.
    #[serde(rename = "SetDesc", default)]
    pub description: String,
    /// Members including the central one.
    #[serde(rename = "NumMembers")]
    pub num_members: usize,
    /// Error convention as declared by the set (`hessian`, `symmhessian`, `replicas`, ...).
    #[serde(rename = "ErrorType", default)]
    pub error_type: String,
    /// Declared PDG ids.
    #[serde(rename = "Flavors", default)]
    pub flavors: Vec<i32>,
    /// Default member file format.
    #[serde(rename = "Format", default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    LHAGRID1.to_string()
}

/// The only grid format understood here.
pub const LHAGRID1: &str = "lhagrid1";

/// YAML header of a member file, before the first `---`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MemberHeader {
    /// `central`, `error`, `replica`, ...
    #[serde(rename = "PdfType", default)]
    pub pdf_type: String,
    /// Overrides the set format when present.
    #[serde(rename = "Format", default)]
    pub format: Option<String>,
}

pub(crate) fn parse_yaml<T: for<'de> Deserialize<'de>>(text: &str, what: &Path) -> Result<T> {
    serde_yaml_ng::from_str(text)
        .map_err(|e| Error::Validation(format!("invalid YAML in '{}': {e}", what.display())))
}

impl SetInfo {
    /// Parse `.info` text.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let info: SetInfo = parse_yaml(text, path)?;
        if info.num_members == 0 {
            return Err(Error::Validation(format!("'{}' declares NumMembers: 0", path.display())));
        }
        Ok(info)
    }

    /// Read and parse a `.info` file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::config_io(path, e))?;
        Self::parse(&text, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_info_and_ignores_unknown_keys() {
        let text = "\
SetDesc: \"CT10 NLO, 52 error members\"
Authors: someone
NumMembers: 53
ErrorType: hessian
Flavors: [-5, -4, -3, -2, -1, 1, 2, 3, 4, 5, 21]
AlphaS_MZ: 0.118
";
        let info = SetInfo::parse(text, Path::new("CT10nlo.info")).unwrap();
        assert_eq!(info.num_members, 53);
        assert_eq!(info.error_type, "hessian");
        assert_eq!(info.flavors.len(), 11);
        assert_eq!(info.format, LHAGRID1);
    }

    #[test]
    fn rejects_missing_members() {
        assert!(SetInfo::parse("SetDesc: x\n", Path::new("x.info")).is_err());
        assert!(SetInfo::parse("NumMembers: 0\n", Path::new("x.info")).is_err());
        let err = SetInfo::read(Path::new("/nonexistent/x.info")).unwrap_err();
        assert!(matches!(err, Error::ConfigurationIo { .. }));
    }

    #[test]
    fn member_header() {
        let h: MemberHeader =
            parse_yaml("PdfType: replica\nFormat: lhagrid1\n", Path::new("m.dat")).unwrap();
        assert_eq!(h.pdf_type, "replica");
        assert_eq!(h.format.as_deref(), Some(LHAGRID1));
    }
}
