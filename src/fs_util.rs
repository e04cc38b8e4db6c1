use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use camino::Utf8Path;
use zip::ZipArchive;

use crate::error::StageError;

/// Destructive reset: remove `dir` recursively if present, then recreate it
/// empty. Callers rely on this to keep re-runs free of stale content.
pub fn reset_dir(dir: &Utf8Path) -> Result<(), StageError> {
    if dir.as_std_path().exists() {
        fs::remove_dir_all(dir.as_std_path())
            .map_err(|err| StageError::Filesystem(format!("reset {dir}: {err}")))?;
    }
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| StageError::Filesystem(format!("reset {dir}: {err}")))
}

/// Move the subtree at `source` so that it becomes `dest`. If `dest` already
/// exists as a directory, `source`'s contents are merged into it and the
/// emptied `source` directory is removed.
pub fn move_tree(source: &Utf8Path, dest: &Utf8Path) -> Result<(), StageError> {
    if dest.as_std_path().is_dir() {
        if source.as_std_path().is_file() {
            let name = source
                .file_name()
                .ok_or_else(|| StageError::Filesystem(format!("no file name in {source}")))?;
            return rename_or_copy(source, &dest.join(name));
        }
        move_children(source, dest)?;
        return fs::remove_dir_all(source.as_std_path())
            .map_err(|err| StageError::Filesystem(format!("remove {source}: {err}")));
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| StageError::Filesystem(err.to_string()))?;
    }
    rename_or_copy(source, dest)
}

/// Move every direct child of `source` into `dest`, leaving `source` itself
/// in place. Used for whole-root relocations where the root must survive.
pub fn move_children(source: &Utf8Path, dest: &Utf8Path) -> Result<(), StageError> {
    fs::create_dir_all(dest.as_std_path())
        .map_err(|err| StageError::Filesystem(err.to_string()))?;
    let entries = fs::read_dir(source.as_std_path())
        .map_err(|err| StageError::Filesystem(format!("read {source}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| StageError::Filesystem(err.to_string()))?;
        let name = entry.file_name();
        let name = name
            .to_str()
            .ok_or_else(|| StageError::Filesystem("non-utf8 file name in dataset".to_string()))?;
        let child = source.join(name);
        move_tree(&child, &dest.join(name))?;
    }
    Ok(())
}

fn rename_or_copy(source: &Utf8Path, dest: &Utf8Path) -> Result<(), StageError> {
    match fs::rename(source.as_std_path(), dest.as_std_path()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
            if source.as_std_path().is_dir() {
                copy_tree(source.as_std_path(), dest.as_std_path())?;
                fs::remove_dir_all(source.as_std_path())
                    .map_err(|err| StageError::Filesystem(format!("remove {source}: {err}")))
            } else {
                fs::copy(source.as_std_path(), dest.as_std_path())
                    .map_err(|err| StageError::Filesystem(err.to_string()))?;
                fs::remove_file(source.as_std_path())
                    .map_err(|err| StageError::Filesystem(format!("remove {source}: {err}")))
            }
        }
        Err(err) => Err(StageError::Filesystem(format!(
            "move {source} -> {dest}: {err}"
        ))),
    }
}

fn copy_tree(source: &Path, dest: &Path) -> Result<(), StageError> {
    fs::create_dir_all(dest).map_err(|err| StageError::Filesystem(err.to_string()))?;
    for entry in walk_dir(source)? {
        let relative = entry.strip_prefix(source).unwrap();
        let target = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|err| StageError::Filesystem(err.to_string()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| StageError::Filesystem(err.to_string()))?;
            }
            fs::copy(entry, &target).map_err(|err| StageError::Filesystem(err.to_string()))?;
        }
    }
    Ok(())
}

fn walk_dir(root: &Path) -> Result<Vec<PathBuf>, StageError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries = fs::read_dir(&path).map_err(|err| StageError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| StageError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}

pub fn extract_zip(zip_path: &Path, target_dir: &Path) -> Result<(), StageError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| StageError::Filesystem(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| StageError::Filesystem(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| StageError::Filesystem(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => {
                return Err(StageError::Filesystem(
                    "zip entry path traversal detected".to_string(),
                ));
            }
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| StageError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| StageError::Filesystem(err.to_string()))?;
        }
        let mut outfile =
            fs::File::create(&entry_path).map_err(|err| StageError::Filesystem(err.to_string()))?;
        io::copy(&mut entry, &mut outfile).map_err(|err| StageError::Filesystem(err.to_string()))?;
    }
    Ok(())
}

pub fn validate_zip(zip_path: &Path) -> Result<(), StageError> {
    let file = fs::File::open(zip_path)
        .map_err(|err| StageError::Filesystem(format!("open zip {}: {err}", zip_path.display())))?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| StageError::Filesystem(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| StageError::Filesystem(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink())
            .map_err(|err| StageError::Filesystem(err.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    fn utf8(path: &Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
    }

    #[test]
    fn reset_dir_clears_stale_content() {
        let temp = tempfile::tempdir().unwrap();
        let dir = utf8(temp.path()).join("dest");
        fs::create_dir_all(dir.as_std_path()).unwrap();
        fs::write(dir.join("stale.txt").as_std_path(), b"old").unwrap();

        reset_dir(&dir).unwrap();

        assert!(dir.as_std_path().is_dir());
        assert!(!dir.join("stale.txt").as_std_path().exists());
    }

    #[test]
    fn move_tree_renames_into_fresh_dest() {
        let temp = tempfile::tempdir().unwrap();
        let root = utf8(temp.path());
        let src = root.join("src");
        fs::create_dir_all(src.join("nested").as_std_path()).unwrap();
        fs::write(src.join("nested/a.txt").as_std_path(), b"a").unwrap();

        let dst = root.join("out/moved");
        move_tree(&src, &dst).unwrap();

        assert!(!src.as_std_path().exists());
        assert!(dst.join("nested/a.txt").as_std_path().is_file());
    }

    #[test]
    fn move_tree_merges_into_existing_dir() {
        let temp = tempfile::tempdir().unwrap();
        let root = utf8(temp.path());
        let src = root.join("src");
        fs::create_dir_all(src.as_std_path()).unwrap();
        fs::write(src.join("a.txt").as_std_path(), b"a").unwrap();

        let dst = root.join("dest");
        fs::create_dir_all(dst.as_std_path()).unwrap();

        move_tree(&src, &dst).unwrap();

        assert!(!src.as_std_path().exists());
        assert!(dst.join("a.txt").as_std_path().is_file());
    }

    #[test]
    fn move_children_keeps_source_dir() {
        let temp = tempfile::tempdir().unwrap();
        let root = utf8(temp.path());
        let src = root.join("raw");
        fs::create_dir_all(src.join("b").as_std_path()).unwrap();
        fs::write(src.join("a.txt").as_std_path(), b"a").unwrap();

        let dst = root.join("staged");
        move_children(&src, &dst).unwrap();

        assert!(src.as_std_path().is_dir());
        assert!(dst.join("a.txt").as_std_path().is_file());
        assert!(dst.join("b").as_std_path().is_dir());
        assert!(!src.join("a.txt").as_std_path().exists());
    }
}
