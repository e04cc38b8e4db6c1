use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::StageError;
use crate::fs_util;
use crate::registry::DatasetProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Moved,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Staged,
    /// Every step completed but nothing was relocated. A logical failure,
    /// distinct from a filesystem error.
    NoContentMoved,
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Staged)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub source: String,
    pub dest: String,
    pub status: EntryStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub key: String,
    pub display_name: String,
    pub resolved_root: String,
    pub root_fallback: bool,
    pub staging_dest: String,
    pub entries: Vec<EntryReport>,
    pub outcome: StageOutcome,
}

/// Candidate extraction root for a profile, with a fallback to the shared
/// download root when the declared container subfolder is absent. The
/// returned flag records that the fallback was taken.
pub fn resolve_extraction_root(
    profile: &DatasetProfile,
    download_root: &Utf8Path,
) -> (Utf8PathBuf, bool) {
    let candidate = match profile.container_subfolder {
        Some(subfolder) => download_root.join(subfolder),
        None => download_root.to_path_buf(),
    };
    if candidate.as_std_path().exists() {
        (candidate, false)
    } else {
        (download_root.to_path_buf(), profile.container_subfolder.is_some())
    }
}

/// Relocate the profile's mapped subpaths out of `download_root` into
/// `staging_dest`. The destination is reset first; the container subfolder,
/// when one was configured, is deleted afterwards. The shared download root
/// itself is never deleted.
pub fn stage(
    profile: &DatasetProfile,
    download_root: &Utf8Path,
    staging_dest: &Utf8Path,
) -> Result<StageReport, StageError> {
    let (resolved_root, root_fallback) = resolve_extraction_root(profile, download_root);
    if root_fallback {
        warn!(
            dataset = profile.key,
            root = %resolved_root,
            "declared container subfolder absent, using download root"
        );
    }

    fs_util::reset_dir(staging_dest)?;

    let mut entries = Vec::with_capacity(profile.folder_map.len());
    for (source, dest) in &profile.folder_map {
        let src_path = source.join_onto(&resolved_root);
        let dst_path = dest.join_onto(staging_dest);

        if !src_path.as_std_path().exists() {
            warn!(dataset = profile.key, source = %source, "mapped subpath missing");
            entries.push(EntryReport {
                source: source.to_string(),
                dest: dest.to_string(),
                status: EntryStatus::Missing,
            });
            continue;
        }

        if source.is_whole_root() {
            // The root itself must survive the move; it is either the shared
            // download root or will be removed during cleanup below.
            fs_util::move_children(&src_path, &dst_path)?;
        } else {
            fs_util::move_tree(&src_path, &dst_path)?;
        }
        info!(dataset = profile.key, source = %source, dest = %dst_path, "moved");
        entries.push(EntryReport {
            source: source.to_string(),
            dest: dest.to_string(),
            status: EntryStatus::Moved,
        });
    }

    if profile.container_subfolder.is_some() && resolved_root.as_std_path().exists() {
        std::fs::remove_dir_all(resolved_root.as_std_path())
            .map_err(|err| StageError::Filesystem(format!("cleanup {resolved_root}: {err}")))?;
        info!(dataset = profile.key, root = %resolved_root, "removed extraction root");
    }

    let moved = entries
        .iter()
        .any(|entry| entry.status == EntryStatus::Moved);
    let outcome = if moved {
        StageOutcome::Staged
    } else {
        StageOutcome::NoContentMoved
    };

    Ok(StageReport {
        key: profile.key.to_string(),
        display_name: profile.display_name.to_string(),
        resolved_root: resolved_root.to_string(),
        root_fallback,
        staging_dest: staging_dest.to_string(),
        entries,
        outcome,
    })
}
