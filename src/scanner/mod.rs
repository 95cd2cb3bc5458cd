pub mod exif;

use crate::config::SourceSet;
use crate::error::{GallerySyncError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 取り込み対象の元画像とそのラベル
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub path: PathBuf,
    pub label: String,
}

impl SourceImage {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
        }
    }
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// 元画像フォルダを列挙（直下のみ、ファイル名順）
pub fn scan_source_dir(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(GallerySyncError::FolderNotFound(folder.display().to_string()));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| is_image_extension(&ext.to_string_lossy()))
                .unwrap_or(false)
        })
        .collect();

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(images)
}

/// 設定された元画像フォルダを順に列挙してラベルを付与
///
/// 見つからないフォルダは警告してスキップする。
pub fn collect_sources(sets: &[SourceSet]) -> Vec<SourceImage> {
    let mut sources = Vec::new();

    for set in sets {
        match scan_source_dir(&set.path) {
            Ok(paths) => {
                tracing::debug!(folder = %set.path.display(), count = paths.len(), label = %set.label, "元画像フォルダを走査");
                sources.extend(paths.into_iter().map(|p| SourceImage::new(p, set.label.clone())));
            }
            Err(e) => {
                tracing::warn!("{}（スキップ）", e);
            }
        }
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_is_image_extension() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPG"));
        assert!(is_image_extension("jpeg"));
        assert!(is_image_extension("Png"));
        assert!(!is_image_extension("zip"));
        assert!(!is_image_extension("gif"));
    }

    #[test]
    fn test_scan_source_dir_not_found() {
        let result = scan_source_dir(Path::new("/nonexistent/folder"));
        assert!(matches!(result, Err(GallerySyncError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_source_dir_filters_and_sorts() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.jpg"), b"x").unwrap();
        fs::write(dir.path().join("a.PNG"), b"x").unwrap();
        fs::write(dir.path().join("b.jpeg"), b"x").unwrap();
        fs::write(dir.path().join("photos.zip"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested.jpg")).unwrap();

        let names: Vec<String> = scan_source_dir(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.jpeg", "c.jpg"]);
    }

    #[test]
    fn test_collect_sources_keeps_set_order_and_skips_missing() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("TBF");
        let second = dir.path().join("ikebukuro");
        fs::create_dir(&first).unwrap();
        fs::create_dir(&second).unwrap();
        fs::write(first.join("2.jpg"), b"x").unwrap();
        fs::write(first.join("1.jpg"), b"x").unwrap();
        fs::write(second.join("0.jpg"), b"x").unwrap();

        let sets = vec![
            SourceSet { path: first.clone(), label: "TBF".into() },
            SourceSet { path: dir.path().join("missing"), label: "なし".into() },
            SourceSet { path: second.clone(), label: "이케부크로".into() },
        ];

        let sources = collect_sources(&sets);
        assert_eq!(
            sources,
            vec![
                SourceImage::new(first.join("1.jpg"), "TBF"),
                SourceImage::new(first.join("2.jpg"), "TBF"),
                SourceImage::new(second.join("0.jpg"), "이케부크로"),
            ]
        );
    }
}
