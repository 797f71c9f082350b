//! On-disk layout of the labeled training images.
//!
//! ```text
//! <root>/position/{Front,Back,Side,Top,Bottom,PartZoom}/*
//! <root>/background/{neutral,non-neutral}/*
//! <root>/product-only/{product-only,situational}/*
//! ```
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::TrainingError;
use crate::pipeline::types::{ClassifierKind, Position};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// Folders still holding lateral shots from before the `Side` merge.
pub const LEGACY_LATERAL_FOLDERS: [&str; 4] = ["Left", "Right", "LateralLeft", "LateralRight"];

/// A class folder and the label its images train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSource {
    pub folder: String,
    pub label: String,
}

impl ClassSource {
    fn new(folder: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReorganizeReport {
    /// `(from, to)` for every moved (or, in dry-run, movable) image.
    pub moved: Vec<(PathBuf, PathBuf)>,
    pub removed_dirs: Vec<PathBuf>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct TrainingLayout {
    root: PathBuf,
}

impl TrainingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind_dir(&self, kind: ClassifierKind) -> PathBuf {
        self.root.join(kind.name())
    }

    pub fn class_sources(kind: ClassifierKind) -> Vec<ClassSource> {
        match kind {
            ClassifierKind::Position => {
                let mut sources = Vec::new();
                for position in Position::ALL {
                    sources.push(ClassSource::new(position.folder_name(), position.as_str()));
                    if position == Position::Side {
                        sources.extend(
                            LEGACY_LATERAL_FOLDERS
                                .iter()
                                .map(|folder| ClassSource::new(*folder, Position::Side.as_str())),
                        );
                    }
                }
                sources
            }
            ClassifierKind::Background => vec![
                ClassSource::new("neutral", "true"),
                ClassSource::new("non-neutral", "false"),
            ],
            ClassifierKind::ProductOnly => vec![
                ClassSource::new("product-only", "true"),
                ClassSource::new("situational", "false"),
            ],
        }
    }

    /// Image paths grouped by label, sorted within each folder. Missing or
    /// empty class folders are skipped with a warning.
    pub fn collect_images(&self, kind: ClassifierKind) -> Result<IndexMap<String, Vec<PathBuf>>, TrainingError> {
        let kind_dir = self.kind_dir(kind);
        if !kind_dir.is_dir() {
            return Err(TrainingError::MissingTrainingDir(kind_dir));
        }

        let mut by_label: IndexMap<String, Vec<PathBuf>> = IndexMap::new();
        for source in Self::class_sources(kind) {
            let folder = kind_dir.join(&source.folder);
            if !folder.is_dir() {
                warn!(kind = %kind, folder = %folder.display(), "Class folder not found, skipping");
                continue;
            }

            let images = list_images(&folder)?;
            if images.is_empty() {
                warn!(kind = %kind, folder = %folder.display(), "Class folder has no images");
                continue;
            }

            debug!(kind = %kind, label = %source.label, count = images.len(), "Collected class images");
            by_label.entry(source.label).or_default().extend(images);
        }

        Ok(by_label)
    }

    /// Moves images out of the legacy lateral folders into `Side`. A file
    /// whose name is taken in `Side` is renamed `<Folder>_<name>`. Emptied
    /// legacy folders are removed.
    pub fn reorganize_position_folders(&self, dry_run: bool) -> Result<ReorganizeReport, TrainingError> {
        let position_dir = self.kind_dir(ClassifierKind::Position);
        if !position_dir.is_dir() {
            return Err(TrainingError::MissingTrainingDir(position_dir));
        }

        let side_dir = position_dir.join(Position::Side.folder_name());
        if !dry_run {
            fs::create_dir_all(&side_dir)?;
        }

        let mut report = ReorganizeReport {
            dry_run,
            ..ReorganizeReport::default()
        };

        for folder in LEGACY_LATERAL_FOLDERS {
            let legacy_dir = position_dir.join(folder);
            if !legacy_dir.is_dir() {
                continue;
            }

            for image in list_images(&legacy_dir)? {
                let Some(file_name) = image.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };

                let mut target = side_dir.join(file_name);
                if target.exists() || report.moved.iter().any(|(_, to)| *to == target) {
                    target = side_dir.join(format!("{folder}_{file_name}"));
                }
                if target.exists() {
                    warn!(from = %image.display(), to = %target.display(), "Target already exists, leaving image in place");
                    continue;
                }

                if !dry_run {
                    fs::rename(&image, &target)?;
                }
                debug!(from = %image.display(), to = %target.display(), dry_run, "Moved legacy image");
                report.moved.push((image, target));
            }

            if dry_run {
                continue;
            }
            if fs::read_dir(&legacy_dir)?.next().is_none() {
                fs::remove_dir(&legacy_dir)?;
                report.removed_dirs.push(legacy_dir);
            }
        }

        info!(
            moved = report.moved.len(),
            removed_dirs = report.removed_dirs.len(),
            dry_run,
            "Reorganized position folders"
        );
        Ok(report)
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Image files directly inside `dir`, sorted by path.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, TrainingError> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"img").unwrap();
    }

    #[test]
    fn recognizes_image_extensions_case_insensitively() {
        assert!(is_image_file(Path::new("a/b.JPG")));
        assert!(is_image_file(Path::new("b.webp")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("noext")));
    }

    #[test]
    fn position_sources_fold_legacy_folders_into_side() {
        let sources = TrainingLayout::class_sources(ClassifierKind::Position);
        let side: Vec<_> = sources.iter().filter(|s| s.label == "Side").map(|s| s.folder.as_str()).collect();
        assert_eq!(side, vec!["Side", "Left", "Right", "LateralLeft", "LateralRight"]);
        assert!(sources.contains(&ClassSource::new("PartZoom", "Part Zoom")));
    }

    #[test]
    fn collects_images_by_label() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("position/Front/b.png"));
        touch(&root.join("position/Front/a.jpg"));
        touch(&root.join("position/Front/readme.md"));
        touch(&root.join("position/Left/l.jpeg"));
        touch(&root.join("position/Side/s.png"));
        fs::create_dir_all(root.join("position/Top")).unwrap();

        let layout = TrainingLayout::new(root);
        let images = layout.collect_images(ClassifierKind::Position).unwrap();

        assert_eq!(images.keys().collect::<Vec<_>>(), vec!["Front", "Side"]);
        assert_eq!(
            images["Front"],
            vec![root.join("position/Front/a.jpg"), root.join("position/Front/b.png")]
        );
        assert_eq!(images["Side"].len(), 2);
    }

    #[test]
    fn missing_kind_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = TrainingLayout::new(dir.path());
        assert!(matches!(
            layout.collect_images(ClassifierKind::Background),
            Err(TrainingError::MissingTrainingDir(_))
        ));
    }

    #[test]
    fn reorganize_moves_legacy_images_and_prefixes_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("position/Side/shot.jpg"));
        touch(&root.join("position/Left/shot.jpg"));
        touch(&root.join("position/LateralRight/other.png"));
        let layout = TrainingLayout::new(root);

        let preview = layout.reorganize_position_folders(true).unwrap();
        assert_eq!(preview.moved.len(), 2);
        assert!(preview.removed_dirs.is_empty());
        assert!(root.join("position/Left/shot.jpg").exists());

        let report = layout.reorganize_position_folders(false).unwrap();
        assert_eq!(report.moved.len(), 2);
        assert!(root.join("position/Side/Left_shot.jpg").exists());
        assert!(root.join("position/Side/other.png").exists());
        assert!(root.join("position/Side/shot.jpg").exists());
        assert!(!root.join("position/Left").exists());
        assert!(!root.join("position/LateralRight").exists());
        assert_eq!(report.removed_dirs.len(), 2);
    }
}
