use serde::Serialize;

use crate::error::StageError;
use crate::kaggle::{DownloadClient, ToolStatus};
use crate::registry::Registry;
use crate::stage::{self, StageReport};
use crate::workspace::{SKELETON_DIRS, Workspace};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    pub root: String,
    pub dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub key: String,
    pub display_name: String,
    pub source_id: String,
    pub stage: StageReport,
    pub note: Option<String>,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub datasets: Vec<ListEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    pub key: String,
    pub display_name: String,
    pub source_id: String,
    pub staging_dest: String,
    pub staged: bool,
}

pub struct App<D: DownloadClient> {
    workspace: Workspace,
    registry: Registry,
    downloader: D,
}

impl<D: DownloadClient> App<D> {
    pub fn new(workspace: Workspace, registry: Registry, downloader: D) -> Self {
        Self {
            workspace,
            registry,
            downloader,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn setup(&self, sink: &dyn ProgressSink) -> Result<SetupReport, StageError> {
        sink.event(ProgressEvent {
            message: "phase=Setup; ensuring directory skeleton".to_string(),
        });
        self.workspace.ensure_skeleton()?;
        Ok(SetupReport {
            root: self.workspace.root().to_string(),
            dirs: SKELETON_DIRS.iter().map(|dir| dir.to_string()).collect(),
        })
    }

    /// Download one dataset through the external tool and stage it into its
    /// canonical destination. Tool failures short-circuit before any
    /// destructive step runs.
    pub fn fetch(&self, key: &str, sink: &dyn ProgressSink) -> Result<FetchReport, StageError> {
        let profile = self.registry.profile(key)?;
        let source: crate::domain::SourceId = profile.source_id.parse()?;

        if let ToolStatus::Missing { message } = self.downloader.tool_status() {
            return Err(StageError::MissingTool(message));
        }

        let download_root = self.workspace.download_root();
        sink.event(ProgressEvent {
            message: format!("phase=Download; {} -> {download_root}", source),
        });
        self.downloader.download(&source, &download_root)?;

        let staging_dest = self.workspace.staging_dest(profile);
        sink.event(ProgressEvent {
            message: format!("phase=Stage; {} -> {staging_dest}", profile.display_name),
        });
        let report = stage::stage(profile, &download_root, &staging_dest)?;

        Ok(FetchReport {
            key: profile.key.to_string(),
            display_name: profile.display_name.to_string(),
            source_id: source.as_str().to_string(),
            note: report
                .outcome
                .is_success()
                .then(|| profile.post_stage_note.map(|note| note.to_string()))
                .flatten(),
            stage: report,
            finished_at: iso_timestamp(),
        })
    }

    pub fn list(&self, sink: &dyn ProgressSink) -> Result<ListResult, StageError> {
        sink.event(ProgressEvent {
            message: "phase=Resolve; scanning staging destinations".to_string(),
        });
        let datasets = self
            .registry
            .profiles()
            .iter()
            .map(|profile| ListEntry {
                key: profile.key.to_string(),
                display_name: profile.display_name.to_string(),
                source_id: profile.source_id.to_string(),
                staging_dest: self.workspace.staging_dest(profile).to_string(),
                staged: self.workspace.is_staged(profile),
            })
            .collect();
        Ok(ListResult { datasets })
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
