use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::SourceId;
use crate::error::StageError;
use crate::fs_util;

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub kaggle: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ToolStatus {
    Ready,
    Missing { message: String },
}

pub trait DownloadClient: Send + Sync {
    fn tool_status(&self) -> ToolStatus;
    fn download(&self, id: &SourceId, destination: &Utf8Path) -> Result<(), StageError>;
    fn tool_info(&self) -> ToolInfo;
}

#[derive(Clone)]
pub struct SystemKaggleClient {
    kaggle: Option<PathBuf>,
}

impl SystemKaggleClient {
    pub fn new() -> Self {
        Self {
            kaggle: find_in_path("kaggle"),
        }
    }

    fn require_kaggle(&self) -> Result<&PathBuf, StageError> {
        self.kaggle
            .as_ref()
            .ok_or_else(|| StageError::MissingTool("kaggle (pip install kaggle)".to_string()))
    }

    fn run_cmd(&self, program: &Path, args: &[String]) -> Result<(), StageError> {
        debug!(program = %program.display(), ?args, "running download tool");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|err| StageError::DownloadFailed(err.to_string()))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("command failed: {}", program.display())
        } else {
            stderr
        };
        Err(StageError::DownloadFailed(message))
    }

    /// Older kaggle CLI versions ignore `--unzip` and leave the archive in
    /// place. Any `.zip` remaining under `destination` is validated,
    /// extracted next to it, and removed.
    fn unpack_leftover_zips(&self, destination: &Utf8Path) -> Result<(), StageError> {
        for zip_path in find_exts(destination.as_std_path(), "zip") {
            info!(archive = %zip_path.display(), "unpacking leftover archive");
            fs_util::validate_zip(&zip_path)?;
            fs_util::extract_zip(&zip_path, destination.as_std_path())?;
            fs::remove_file(&zip_path).map_err(|err| {
                StageError::Filesystem(format!("remove {}: {err}", zip_path.display()))
            })?;
        }
        Ok(())
    }
}

impl DownloadClient for SystemKaggleClient {
    fn tool_status(&self) -> ToolStatus {
        if self.kaggle.is_none() {
            return ToolStatus::Missing {
                message: "missing kaggle CLI (pip install kaggle)".to_string(),
            };
        }
        ToolStatus::Ready
    }

    fn download(&self, id: &SourceId, destination: &Utf8Path) -> Result<(), StageError> {
        let kaggle = self.require_kaggle()?;
        fs::create_dir_all(destination.as_std_path())
            .map_err(|err| StageError::Filesystem(err.to_string()))?;

        let args = vec![
            "datasets".to_string(),
            "download".to_string(),
            "-d".to_string(),
            id.as_str().to_string(),
            "-p".to_string(),
            destination.to_string(),
            "--unzip".to_string(),
        ];
        self.run_cmd(kaggle.as_path(), &args)?;
        self.unpack_leftover_zips(destination)
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            kaggle: self
                .kaggle
                .as_ref()
                .and_then(|path| tool_version(path, &["--version"])),
        }
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let exe = path.join(format!("{name}.exe"));
        if exe.exists() {
            return Some(exe);
        }
        let plain = path.join(name);
        if plain.exists() {
            return Some(plain);
        }
    }
    None
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() { None } else { Some(stdout) }
}

fn find_exts(root: &Path, ext: &str) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        if let Ok(entries) = fs::read_dir(&path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if path
                    .extension()
                    .and_then(|value| value.to_str())
                    .map(|value| value.eq_ignore_ascii_case(ext))
                    .unwrap_or(false)
                {
                    out.push(path);
                }
            }
        }
    }
    out
}
