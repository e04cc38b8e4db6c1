use crate::domain::MapPath;
use crate::error::StageError;

/// Static description of one downloadable dataset: where its archive comes
/// from, which subfolders of the unpacked tree we keep, and where they land.
#[derive(Debug, Clone)]
pub struct DatasetProfile {
    pub key: &'static str,
    pub display_name: &'static str,
    /// Kaggle slug, validated when a fetch is actually attempted.
    pub source_id: &'static str,
    /// Canonical destination, relative to the workspace root.
    pub staging_dest: &'static str,
    /// Top-level folder some archives wrap their content in. Packaging
    /// artifact only; discarded during cleanup.
    pub container_subfolder: Option<&'static str>,
    /// Ordered (source, destination) relocations. Order is reporting order;
    /// entries are independent.
    pub folder_map: Vec<(MapPath, MapPath)>,
    /// Shown to the user after a successful stage.
    pub post_stage_note: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    profiles: Vec<DatasetProfile>,
}

impl Registry {
    pub fn builtin() -> Self {
        Self {
            profiles: vec![
                DatasetProfile {
                    key: "1",
                    display_name: "Vehicles (car detection)",
                    source_id: "seyeon040768/car-detection-dataset",
                    staging_dest: "data/processed/01_vehicles_original",
                    container_subfolder: Some("car_dataset-master"),
                    folder_map: vec![
                        (MapPath::Subpath("train"), MapPath::Subpath("train")),
                        (MapPath::Subpath("test"), MapPath::Subpath("test")),
                        (MapPath::Subpath("valid"), MapPath::Subpath("val")),
                    ],
                    post_stage_note: None,
                },
                DatasetProfile {
                    key: "2",
                    display_name: "Plates (large license plate dataset)",
                    source_id: "fareselmenshawii/large-license-plate-dataset",
                    staging_dest: "data/processed/02_plates_original",
                    container_subfolder: None,
                    folder_map: vec![(MapPath::WholeRoot, MapPath::WholeRoot)],
                    post_stage_note: Some(
                        "labels are Pascal-VOC XML; convert them to YOLO TXT before training",
                    ),
                },
            ],
        }
    }

    pub fn profile(&self, key: &str) -> Result<&DatasetProfile, StageError> {
        self.profiles
            .iter()
            .find(|profile| profile.key == key)
            .ok_or_else(|| StageError::UnknownDatasetKey(key.to_string()))
    }

    pub fn profiles(&self) -> &[DatasetProfile] {
        &self.profiles
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn lookup_known_keys() {
        let registry = Registry::builtin();
        let vehicles = registry.profile("1").unwrap();
        assert_eq!(vehicles.container_subfolder, Some("car_dataset-master"));
        assert_eq!(vehicles.folder_map.len(), 3);

        let plates = registry.profile("2").unwrap();
        assert_eq!(plates.container_subfolder, None);
        assert_eq!(
            plates.folder_map,
            vec![(MapPath::WholeRoot, MapPath::WholeRoot)]
        );
    }

    #[test]
    fn lookup_unknown_key() {
        let registry = Registry::builtin();
        let err = registry.profile("99").unwrap_err();
        assert_matches!(err, StageError::UnknownDatasetKey(_));
    }

    #[test]
    fn source_ids_are_valid_slugs() {
        let registry = Registry::builtin();
        for profile in registry.profiles() {
            profile
                .source_id
                .parse::<crate::domain::SourceId>()
                .unwrap();
        }
    }
}
