use std::fs;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use alpr_dataset_manager::app::App;
use alpr_dataset_manager::domain::SourceId;
use alpr_dataset_manager::error::StageError;
use alpr_dataset_manager::kaggle::{DownloadClient, ToolInfo, ToolStatus};
use alpr_dataset_manager::output::JsonOutput;
use alpr_dataset_manager::registry::Registry;
use alpr_dataset_manager::workspace::Workspace;

/// Plants an unpacked archive tree the way the kaggle CLI would leave it.
struct MockDownloader {
    tree: Vec<&'static str>,
}

impl DownloadClient for MockDownloader {
    fn tool_status(&self) -> ToolStatus {
        ToolStatus::Ready
    }

    fn download(&self, _id: &SourceId, destination: &Utf8Path) -> Result<(), StageError> {
        for file in &self.tree {
            let path = destination.join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent.as_std_path())
                    .map_err(|err| StageError::Filesystem(err.to_string()))?;
            }
            fs::write(path.as_std_path(), b"data")
                .map_err(|err| StageError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo {
            kaggle: Some("mock".to_string()),
        }
    }
}

struct MissingToolDownloader;

impl DownloadClient for MissingToolDownloader {
    fn tool_status(&self) -> ToolStatus {
        ToolStatus::Missing {
            message: "missing kaggle CLI".to_string(),
        }
    }

    fn download(&self, _id: &SourceId, _destination: &Utf8Path) -> Result<(), StageError> {
        Err(StageError::MissingTool("missing kaggle CLI".to_string()))
    }

    fn tool_info(&self) -> ToolInfo {
        ToolInfo { kaggle: None }
    }
}

fn temp_workspace(temp: &tempfile::TempDir) -> Workspace {
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    Workspace::new_with_root(root)
}

#[test]
fn fetch_stages_containered_dataset_end_to_end() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = temp_workspace(&temp);
    let root = workspace.root().to_path_buf();

    let downloader = MockDownloader {
        tree: vec![
            "car_dataset-master/train/img1.jpg",
            "car_dataset-master/test/img2.jpg",
            "car_dataset-master/valid/img3.jpg",
        ],
    };
    let app = App::new(workspace, Registry::builtin(), downloader);
    app.setup(&JsonOutput).unwrap();

    let result = app.fetch("1", &JsonOutput).unwrap();

    assert!(result.stage.outcome.is_success());
    assert!(!result.stage.root_fallback);
    let dest = root.join("data/processed/01_vehicles_original");
    assert!(dest.join("train/img1.jpg").as_std_path().is_file());
    assert!(dest.join("test/img2.jpg").as_std_path().is_file());
    assert!(dest.join("val/img3.jpg").as_std_path().is_file());
    assert!(
        !root
            .join("data/raw/car_dataset-master")
            .as_std_path()
            .exists()
    );
}

#[test]
fn fetch_stages_flat_dataset_and_reports_note() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = temp_workspace(&temp);
    let root = workspace.root().to_path_buf();

    let downloader = MockDownloader {
        tree: vec!["images/plate1.jpg", "annotations/plate1.xml"],
    };
    let app = App::new(workspace, Registry::builtin(), downloader);
    app.setup(&JsonOutput).unwrap();

    let result = app.fetch("2", &JsonOutput).unwrap();

    assert!(result.stage.outcome.is_success());
    assert!(result.note.is_some());
    let dest = root.join("data/processed/02_plates_original");
    assert!(dest.join("images/plate1.jpg").as_std_path().is_file());
    assert!(dest.join("annotations/plate1.xml").as_std_path().is_file());
    // The shared download root is emptied but never deleted.
    assert!(root.join("data/raw").as_std_path().is_dir());
}

#[test]
fn fetch_unknown_key_fails_at_lookup() {
    let temp = tempfile::tempdir().unwrap();
    let app = App::new(
        temp_workspace(&temp),
        Registry::builtin(),
        MissingToolDownloader,
    );

    let err = app.fetch("99", &JsonOutput).unwrap_err();
    assert_matches!(err, StageError::UnknownDatasetKey(_));
}

#[test]
fn missing_tool_short_circuits_before_any_destructive_step() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = temp_workspace(&temp);
    let root = workspace.root().to_path_buf();

    let app = App::new(workspace, Registry::builtin(), MissingToolDownloader);
    app.setup(&JsonOutput).unwrap();

    let dest = root.join("data/processed/01_vehicles_original");
    fs::write(dest.join("sentinel.txt").as_std_path(), b"keep").unwrap();

    let err = app.fetch("1", &JsonOutput).unwrap_err();
    assert_matches!(err, StageError::MissingTool(_));
    // The destination was not reset.
    assert!(dest.join("sentinel.txt").as_std_path().is_file());
}

#[test]
fn list_reflects_staging_state() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = temp_workspace(&temp);

    let downloader = MockDownloader {
        tree: vec!["car_dataset-master/train/img1.jpg"],
    };
    let app = App::new(workspace, Registry::builtin(), downloader);
    app.setup(&JsonOutput).unwrap();

    let before = app.list(&JsonOutput).unwrap();
    assert!(before.datasets.iter().all(|entry| !entry.staged));

    app.fetch("1", &JsonOutput).unwrap();

    let after = app.list(&JsonOutput).unwrap();
    let vehicles = after
        .datasets
        .iter()
        .find(|entry| entry.key == "1")
        .unwrap();
    assert!(vehicles.staged);
    let plates = after
        .datasets
        .iter()
        .find(|entry| entry.key == "2")
        .unwrap();
    assert!(!plates.staged);
}

#[test]
fn fetch_report_serializes_for_non_interactive_mode() {
    let temp = tempfile::tempdir().unwrap();
    let workspace = temp_workspace(&temp);

    let downloader = MockDownloader {
        tree: vec!["car_dataset-master/train/img1.jpg"],
    };
    let app = App::new(workspace, Registry::builtin(), downloader);
    app.setup(&JsonOutput).unwrap();

    let result = app.fetch("1", &JsonOutput).unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["key"], "1");
    assert_eq!(json["stage"]["outcome"], "staged");
    assert_eq!(json["stage"]["entries"][0]["status"], "moved");
    assert_eq!(json["stage"]["entries"][2]["status"], "missing");
}
