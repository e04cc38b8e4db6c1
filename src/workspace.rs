use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::StageError;
use crate::registry::DatasetProfile;

/// Fixed project layout. Staging destinations under `data/processed` must
/// stay in sync with the registry profiles.
pub const SKELETON_DIRS: &[&str] = &[
    "data/raw",
    "data/processed/01_vehicles_original",
    "data/processed/02_plates_original",
    "data/processed/03_characters_original",
    "datasets/01_vehicles",
    "datasets/02_plates",
    "datasets/03_characters",
    "notebooks/01_vehicles",
    "notebooks/02_plates",
    "notebooks/03_characters",
    "src",
    "pipelines",
    "models/vehicle_detector",
    "models/plate_detector",
    "models/ocr_model",
    "production_weights",
];

#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new() -> Result<Self, StageError> {
        let cwd = std::env::current_dir().map_err(|err| StageError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| StageError::Filesystem("invalid project path".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Shared deposit directory for the external download tool. One per
    /// workspace; all profiles stage out of it.
    pub fn download_root(&self) -> Utf8PathBuf {
        self.root.join("data/raw")
    }

    pub fn staging_dest(&self, profile: &DatasetProfile) -> Utf8PathBuf {
        self.root.join(profile.staging_dest)
    }

    /// Idempotent: creates every skeleton directory and drops a `.gitkeep`
    /// in each so empty directories survive a git checkout.
    pub fn ensure_skeleton(&self) -> Result<(), StageError> {
        for dir in SKELETON_DIRS {
            let path = self.root.join(dir);
            fs::create_dir_all(path.as_std_path())
                .map_err(|err| StageError::Filesystem(format!("create {path}: {err}")))?;
            let gitkeep = path.join(".gitkeep");
            if !gitkeep.as_std_path().exists() {
                fs::write(gitkeep.as_std_path(), b"")
                    .map_err(|err| StageError::Filesystem(format!("write {gitkeep}: {err}")))?;
            }
        }
        Ok(())
    }

    /// A destination counts as staged once it exists and holds anything
    /// beyond the skeleton's `.gitkeep`.
    pub fn is_staged(&self, profile: &DatasetProfile) -> bool {
        let dest = self.staging_dest(profile);
        let Ok(entries) = fs::read_dir(dest.as_std_path()) else {
            return false;
        };
        entries
            .flatten()
            .any(|entry| entry.file_name() != ".gitkeep")
    }
}
