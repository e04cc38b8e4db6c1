use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// Kaggle dataset slug in `owner/dataset` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SourceId {
    type Err = StageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]*/[A-Za-z0-9][A-Za-z0-9_.-]*$")
            .unwrap()
            .is_match(&normalized);
        if !is_valid {
            return Err(StageError::InvalidSourceId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// One side of a folder-map entry. `WholeRoot` stands for the extraction
/// root (source side) or the staging destination (destination side) itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapPath {
    WholeRoot,
    Subpath(&'static str),
}

impl MapPath {
    pub fn join_onto(&self, base: &Utf8Path) -> Utf8PathBuf {
        match self {
            MapPath::WholeRoot => base.to_path_buf(),
            MapPath::Subpath(name) => base.join(name),
        }
    }

    pub fn is_whole_root(&self) -> bool {
        matches!(self, MapPath::WholeRoot)
    }
}

impl fmt::Display for MapPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapPath::WholeRoot => write!(f, "<root>"),
            MapPath::Subpath(name) => write!(f, "{name}"),
        }
    }
}
