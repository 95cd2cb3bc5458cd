//! 同期処理の統合テスト
//!
//! 画像フォルダ・台帳・TOTAL_IMAGES をまとめて更新する流れを検証

use gallery_sync::asset::{asset_file_name, next_id, IdRange};
use gallery_sync::config::SitePaths;
use gallery_sync::marker::read_total_file;
use gallery_sync::optimizer::ImageOptions;
use gallery_sync::registry::LocationRegistry;
use gallery_sync::scanner::SourceImage;
use gallery_sync::sync::{SyncOptions, Synchronizer};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const SCRIPT_JS: &str = "document.addEventListener('DOMContentLoaded', () => {\n    const TOTAL_IMAGES = 5;\n});\n";

struct Site {
    dir: TempDir,
    paths: SitePaths,
}

impl Site {
    /// project-1..=existing の画像と台帳を持つサイトを作る
    fn with_assets(existing: u32) -> Self {
        let dir = tempdir().expect("Failed to create temp dir");
        let paths = SitePaths::under(dir.path());
        std::fs::create_dir_all(&paths.images_dir).unwrap();

        let mut registry = LocationRegistry::new();
        for id in 1..=existing {
            write_jpeg(&paths.images_dir.join(asset_file_name(id)), 8, 8);
            registry.insert(asset_file_name(id), format!("기존 현장 {}", id));
        }
        registry.save(&paths.registry_file).unwrap();
        std::fs::write(&paths.count_file, SCRIPT_JS.replace("= 5;", &format!("= {};", existing))).unwrap();

        Self { dir, paths }
    }

    fn synchronizer(&self) -> Synchronizer {
        Synchronizer::new(
            self.paths.clone(),
            ImageOptions { max_dimension: 32, quality: 80 },
            SyncOptions { backup: true, progress: false },
        )
    }

    fn source(&self, name: &str, label: &str) -> SourceImage {
        let path = self.dir.path().join("data").join(name);
        write_jpeg(&path, 64, 48);
        SourceImage::new(path, label)
    }

    fn corrupt_source(&self, name: &str, label: &str) -> SourceImage {
        let path = self.dir.path().join("data").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not an image at all").unwrap();
        SourceImage::new(path, label)
    }

    fn registry(&self) -> LocationRegistry {
        LocationRegistry::load(&self.paths.registry_file).unwrap().registry
    }

    fn registry_text(&self) -> String {
        std::fs::read_to_string(&self.paths.registry_file).unwrap()
    }

    fn asset(&self, id: u32) -> PathBuf {
        self.paths.images_dir.join(asset_file_name(id))
    }
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(width, height, Rgb([120, 80, 40]))
        .save(path)
        .expect("テスト画像の作成失敗");
}

/// 5枚ある状態で2枚追加 → 6, 7 が作られ TOTAL_IMAGES が 7 になる
#[test]
fn test_append_two_images_after_five() {
    let site = Site::with_assets(5);
    let batch = vec![
        site.source("a.jpg", "티오더(t'order) 본사"),
        site.source("b.jpg", "프리미엄 오피스 미팅룸"),
    ];

    let report = site.synchronizer().append(&batch).expect("追加失敗");

    assert_eq!(report.added.len(), 2);
    assert!(report.failures.is_empty());
    assert_eq!(report.total, Some(7));
    assert!(site.asset(6).exists());
    assert!(site.asset(7).exists());

    let registry = site.registry();
    assert_eq!(registry.len(), 7);
    assert_eq!(registry.get("project-6.jpg"), Some("티오더(t'order) 본사"));
    assert_eq!(registry.get("project-7.jpg"), Some("프리미엄 오피스 미팅룸"));
    assert_eq!(read_total_file(&site.paths.count_file).unwrap(), Some(7));
}

/// 追加した画像は長辺が上限に収まる
#[test]
fn test_appended_image_is_downsized() {
    let site = Site::with_assets(0);
    let batch = vec![site.source("wide.jpg", "TBF")];
    site.synchronizer().append(&batch).unwrap();

    let written = image::open(site.asset(1)).unwrap();
    assert_eq!((written.width(), written.height()), (32, 24));
}

/// 既存エントリは追加後も変わらない
#[test]
fn test_append_preserves_existing_entries() {
    let site = Site::with_assets(3);
    let before = site.registry();

    let batch = vec![site.source("x.jpg", "새 현장")];
    site.synchronizer().append(&batch).unwrap();

    let after = site.registry();
    for entry in before.entries() {
        assert_eq!(after.get(&entry.file_name), Some(entry.label.as_str()));
    }
    let first_three: Vec<_> = after.entries().take(3).collect();
    assert_eq!(first_three, before.entries().collect::<Vec<_>>());
}

/// 台帳のコメント行は追加後もそのまま残る
#[test]
fn test_append_keeps_registry_comments() {
    let site = Site::with_assets(2);
    let original = site.registry_text().replace(
        "const imageLocations = {\n",
        "const imageLocations = {\n  // 2024 본사 촬영분\n",
    );
    std::fs::write(&site.paths.registry_file, &original).unwrap();

    let batch = vec![site.source("c.jpg", "새 현장")];
    let report = site.synchronizer().append(&batch).unwrap();

    assert_eq!(report.recovered_lines, Some(1));
    let text = site.registry_text();
    assert!(text.starts_with("const imageLocations = {\n  // 2024 본사 촬영분\n  \"project-1.jpg\""));
    assert!(text.contains("  \"project-3.jpg\": \"새 현장\",\n"));
    assert_eq!(site.registry().len(), 3);
}

/// 壊れた画像が混じっても残りは取り込まれ、番号は詰めて振られる
#[test]
fn test_corrupt_image_is_skipped() {
    let site = Site::with_assets(5);
    let batch = vec![
        site.corrupt_source("broken.jpg", "깨진 파일"),
        site.source("ok.jpg", "정상"),
    ];

    let report = site.synchronizer().append(&batch).expect("バッチ全体は成功する");

    assert_eq!(report.added.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, batch[0].path);
    assert_eq!(report.added[0].file_name, "project-6.jpg");
    assert_eq!(report.total, Some(6));
    assert!(site.asset(6).exists());
    assert!(!site.asset(7).exists());

    let registry = site.registry();
    assert_eq!(registry.len(), 6);
    assert_eq!(registry.get("project-6.jpg"), Some("정상"));
}

/// 1枚も取り込めなければ台帳・スクリプトに触れない
#[test]
fn test_all_failures_write_nothing() {
    let site = Site::with_assets(2);
    let registry_before = site.registry_text();
    let script_before = std::fs::read_to_string(&site.paths.count_file).unwrap();

    let batch = vec![site.corrupt_source("broken.jpg", "x")];
    let report = site.synchronizer().append(&batch).unwrap();

    assert!(!report.committed());
    assert!(report.backups.is_empty());
    assert_eq!(site.registry_text(), registry_before);
    assert_eq!(std::fs::read_to_string(&site.paths.count_file).unwrap(), script_before);
}

/// 空のバッチは何もしない
#[test]
fn test_empty_batch_is_noop() {
    let site = Site::with_assets(2);
    let registry_before = site.registry_text();

    let report = site.synchronizer().append(&[]).unwrap();
    assert!(!report.committed());
    assert_eq!(site.registry_text(), registry_before);

    let report = site
        .synchronizer()
        .replace_range(IdRange::new(1, None).unwrap(), &[])
        .unwrap();
    assert!(!report.committed());
    assert!(site.asset(1).exists());
}

/// 範囲置き換え: 古いエントリは残らず、新しいファイル名はちょうど1回ずつ現れる
#[test]
fn test_replace_range() {
    let site = Site::with_assets(6);
    let batch = vec![
        site.source("t1.jpg", "TBF"),
        site.source("t2.jpg", "TBF"),
        site.source("i1.jpg", "이케부크로 프로젝트(Ikebukuro Project)"),
    ];

    let range = IdRange::new(4, None).unwrap();
    let report = site.synchronizer().replace_range(range, &batch).unwrap();

    assert_eq!(report.deleted_assets, 3);
    assert_eq!(report.removed_entries, 3);
    assert_eq!(report.total, Some(6));

    let registry = site.registry();
    assert_eq!(registry.len(), 6);
    assert_eq!(registry.get("project-3.jpg"), Some("기존 현장 3"));
    assert_eq!(registry.get("project-4.jpg"), Some("TBF"));
    assert_eq!(registry.get("project-6.jpg"), Some("이케부크로 프로젝트(Ikebukuro Project)"));
    assert!(registry.entries().all(|e| !e.label.starts_with("기존 현장 4")));

    let text = site.registry_text();
    for entry in &report.added {
        assert_eq!(text.matches(&format!("\"{}\"", entry.file_name)).count(), 1);
    }
}

/// 範囲置き換えで元より少ない枚数なら、範囲の残りは消える
#[test]
fn test_replace_range_shrinks() {
    let site = Site::with_assets(8);
    let batch = vec![site.source("only.jpg", "하나")];

    let report = site
        .synchronizer()
        .replace_range(IdRange::new(5, Some(8)).unwrap(), &batch)
        .unwrap();

    assert_eq!(report.total, Some(5));
    assert!(site.asset(5).exists());
    assert!(!site.asset(6).exists());
    assert_eq!(site.registry().len(), 5);
    assert_eq!(next_id(&site.paths.images_dir).unwrap(), 6);
}

/// 範囲に収まらない場合は何も変更せずエラー
#[test]
fn test_replace_range_overflow() {
    let site = Site::with_assets(4);
    let batch = vec![site.source("a.jpg", "A"), site.source("b.jpg", "B")];
    let registry_before = site.registry_text();

    let result = site
        .synchronizer()
        .replace_range(IdRange::new(4, Some(4)).unwrap(), &batch);

    assert!(matches!(
        result,
        Err(gallery_sync::error::GallerySyncError::RangeOverflow { requested: 2, capacity: 1, .. })
    ));
    assert!(site.asset(4).exists());
    assert_eq!(site.registry_text(), registry_before);
}

/// 範囲削除
#[test]
fn test_delete_range() {
    let site = Site::with_assets(5);
    let report = site
        .synchronizer()
        .delete_range(IdRange::new(4, Some(10)).unwrap())
        .unwrap();

    assert_eq!(report.deleted_assets.len(), 2);
    assert_eq!(report.removed_entries, 2);
    assert_eq!(report.total, Some(3));
    assert_eq!(report.backups.len(), 2);
    assert!(report.backups.iter().all(|p| p.exists()));
    assert_eq!(site.registry().len(), 3);
}

/// TOTAL_IMAGES を画像フォルダの最大番号に合わせる
#[test]
fn test_refresh_total() {
    let site = Site::with_assets(3);
    write_jpeg(&site.asset(9), 4, 4);

    let (previous, total) = site.synchronizer().refresh_total().unwrap();
    assert_eq!(previous, Some(3));
    assert_eq!(total, 9);
    assert_eq!(read_total_file(&site.paths.count_file).unwrap(), Some(9));
}

/// 整合性チェック
#[test]
fn test_check_reports_mismatches() {
    let site = Site::with_assets(3);
    let synchronizer = site.synchronizer();
    assert!(synchronizer.check().unwrap().is_consistent());

    std::fs::remove_file(site.asset(2)).unwrap();
    write_jpeg(&site.asset(4), 4, 4);

    let report = synchronizer.check().unwrap();
    assert_eq!(report.orphan_entries, vec!["project-2.jpg".to_string()]);
    assert_eq!(report.unregistered_assets, vec!["project-4.jpg".to_string()]);
    assert_eq!(report.max_id, Some(4));
    assert_eq!(report.marker, Some(3));
    assert!(!report.is_consistent());
}

/// 台帳が無いサイトでは新規に作成する
#[test]
fn test_append_creates_missing_registry() {
    let site = Site::with_assets(0);
    std::fs::remove_file(&site.paths.registry_file).unwrap();

    let batch = vec![site.source("first.jpg", "첫 현장")];
    let report = site.synchronizer().append(&batch).unwrap();

    assert_eq!(report.total, Some(1));
    assert_eq!(
        site.registry_text(),
        "const imageLocations = {\n  \"project-1.jpg\": \"첫 현장\",\n};\n"
    );
}
