//! Game directory walking

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::catalog::{GameFile, Origin};
use crate::config::ScanConfig;
use crate::error::Result;

/// `.sb` and `.toc` files found under a game root, in walk order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFiles {
    /// Superbundles
    pub superbundles: Vec<GameFile>,
    /// Tables of contents
    pub tocs: Vec<GameFile>,
}

/// Whether `path` has extension `ext`, ignoring ASCII case
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Classify `path` by its location relative to the game root
pub fn classify_path(root: &Path, path: &Path, config: &ScanConfig) -> Origin {
    let relative = path.strip_prefix(root).unwrap_or(path);
    Origin::classify(
        &relative.to_string_lossy(),
        &config.update_marker,
        &config.patch_marker,
    )
}

/// Every regular file under `root` accepted by `keep`, sorted by name within
/// each directory
pub(crate) fn walk_files(root: &Path, mut keep: impl FnMut(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && keep(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Find every `.sb` and `.toc` file under the configured game root
pub fn enumerate_game_files(config: &ScanConfig) -> Result<GameFiles> {
    let root = config.game_path.as_path();
    let mut found = GameFiles::default();

    for path in walk_files(root, |p| has_extension(p, "sb") || has_extension(p, "toc"))? {
        let file = GameFile {
            origin: classify_path(root, &path, config),
            path: path.to_string_lossy().into_owned(),
        };
        if has_extension(&path, "sb") {
            found.superbundles.push(file);
        } else {
            found.tocs.push(file);
        }
    }

    debug!(
        "{}: {} sb files, {} toc files",
        root.display(),
        found.superbundles.len(),
        found.tocs.len()
    );
    Ok(found)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::IndexError;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, b"").expect("write");
    }

    #[test]
    fn test_enumerate_and_classify() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        touch(root, "Data/Win32/ui.toc");
        touch(root, "Data/Win32/ui.sb");
        touch(root, "Data/cas.cat");
        touch(root, "Update/DLC1/Data/dlc.TOC");
        touch(root, "Update/Patch/Data/patch.toc");

        let files = enumerate_game_files(&ScanConfig::new(root)).expect("walk");

        assert_eq!(files.superbundles.len(), 1);
        let origins: Vec<Origin> = files.tocs.iter().map(|f| f.origin).collect();
        assert_eq!(origins, vec![Origin::BaseGame, Origin::Update, Origin::Patch]);
    }

    #[test]
    fn test_root_above_marker_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("update");
        touch(&root, "Data/ui.toc");

        let files = enumerate_game_files(&ScanConfig::new(&root)).expect("walk");
        assert_eq!(files.tocs[0].origin, Origin::BaseGame);
    }

    #[test]
    fn test_missing_root_is_enumeration_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = enumerate_game_files(&ScanConfig::new(dir.path().join("missing")))
            .expect_err("no root");
        assert!(matches!(err, IndexError::Enumeration(_)));
        assert!(err.is_fatal());
    }
}
