//! 画像ディレクトリ・ロケーション台帳・TOTAL_IMAGES の同期
//!
//! ## 処理フロー（追加）
//! 1. 台帳と TOTAL_IMAGES の事前チェック（壊れていれば何も書かずに中断）
//! 2. 次の番号から元画像を1枚ずつ取り込み（失敗した画像はスキップ）
//! 3. 1枚以上成功した場合のみ、バックアップ → 台帳追記 → TOTAL_IMAGES 更新
//!
//! 範囲の置き換えでは、全画像をメモリ上でエンコードしてから既存アセットを削除する。

use crate::asset::{
    asset_file_name, ensure_ids_fit, list_assets, max_asset_id, next_id, parse_asset_id, IdRange,
};
use crate::backup::{backup_file, backup_stamp};
use crate::config::SitePaths;
use crate::error::{GallerySyncError, Result};
use crate::lock::SiteLock;
use crate::marker;
use crate::optimizer::{encode_optimized, ingest_image, write_optimized, ImageOptions, OptimizedImage};
use crate::registry::{LocationRegistry, RegistryEntry};
use crate::scanner::SourceImage;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// 同期処理の動作設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// 書き換え前に台帳・スクリプトのバックアップを取る
    pub backup: bool,
    /// 進捗バーを表示
    pub progress: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            backup: true,
            progress: false,
        }
    }
}

/// 取り込みに失敗した画像
#[derive(Debug, Clone, PartialEq)]
pub struct IngestFailure {
    pub source: PathBuf,
    pub reason: String,
}

/// 追加・置き換えの結果
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// 台帳に追加したエントリ（番号順）
    pub added: Vec<RegistryEntry>,
    pub failures: Vec<IngestFailure>,
    /// 範囲置き換えで削除したアセット数
    pub deleted_assets: usize,
    /// 範囲置き換えで削除した台帳エントリ数
    pub removed_entries: usize,
    /// 更新後の TOTAL_IMAGES（書き込みが無ければ None）
    pub total: Option<u32>,
    pub backups: Vec<PathBuf>,
    /// 台帳を行単位で復旧した際に解釈できずそのまま残した行数
    pub recovered_lines: Option<usize>,
}

impl SyncReport {
    /// 台帳・スクリプトに書き込んだか
    pub fn committed(&self) -> bool {
        self.total.is_some()
    }
}

/// 範囲削除の結果
#[derive(Debug, Clone, Default)]
pub struct DeleteReport {
    pub deleted_assets: Vec<PathBuf>,
    pub removed_entries: usize,
    pub total: Option<u32>,
    pub backups: Vec<PathBuf>,
}

/// 整合性チェックの結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub asset_count: usize,
    pub entry_count: usize,
    /// 台帳に載っていないアセット
    pub unregistered_assets: Vec<String>,
    /// 画像が存在しない台帳エントリ
    pub orphan_entries: Vec<String>,
    /// `project-<N>.jpg` 形式でないキー
    pub foreign_keys: Vec<String>,
    pub marker: Option<u32>,
    pub max_id: Option<u32>,
}

impl ConsistencyReport {
    pub fn marker_matches(&self) -> bool {
        self.marker == Some(self.max_id.unwrap_or(0))
    }

    pub fn is_consistent(&self) -> bool {
        self.unregistered_assets.is_empty()
            && self.orphan_entries.is_empty()
            && self.foreign_keys.is_empty()
            && self.marker_matches()
    }
}

/// ギャラリー同期処理
#[derive(Debug, Clone)]
pub struct Synchronizer {
    paths: SitePaths,
    image: ImageOptions,
    options: SyncOptions,
}

impl Synchronizer {
    pub fn new(paths: SitePaths, image: ImageOptions, options: SyncOptions) -> Self {
        Self {
            paths,
            image,
            options,
        }
    }

    pub fn paths(&self) -> &SitePaths {
        &self.paths
    }

    /// 次に割り当てる番号
    pub fn next_id(&self) -> Result<u32> {
        next_id(&self.paths.images_dir)
    }

    /// 新しい画像を末尾の番号に追加
    pub fn append(&self, batch: &[SourceImage]) -> Result<SyncReport> {
        if batch.is_empty() {
            return Ok(SyncReport::default());
        }

        let _lock = SiteLock::acquire(&self.paths.site_dir)?;
        let (mut registry, recovered_lines) = self.preflight()?;

        let start = self.next_id()?;
        ensure_ids_fit(start, batch.len())?;
        tracing::info!("開始番号: {}", start);

        let mut report = SyncReport {
            recovered_lines,
            ..Default::default()
        };
        let pb = self.progress_bar(batch.len());

        for source in batch {
            pb.set_message(display_name(source));
            // 成功した枚数だけ番号を進める
            let file_name = asset_file_name(start + report.added.len() as u32);
            let dst = self.paths.images_dir.join(&file_name);

            match ingest_image(&source.path, &dst, &self.image) {
                Ok((width, height)) => {
                    tracing::debug!("{} -> {} ({}x{})", source.path.display(), file_name, width, height);
                    report.added.push(RegistryEntry {
                        file_name,
                        label: source.label.clone(),
                    });
                }
                Err(e) => report.failures.push(self.record_failure(source, e)),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if report.added.is_empty() {
            tracing::info!("取り込めた画像がないため台帳は更新しません");
            return Ok(report);
        }

        report.backups = self.backup_artifacts()?;
        registry.extend(report.added.iter().map(|e| (e.file_name.clone(), e.label.clone())));
        report.total = Some(self.save_and_recount(&registry)?);

        Ok(report)
    }

    /// 番号範囲のアセットを捨てて、範囲の先頭から新しい画像で置き換える
    pub fn replace_range(&self, range: IdRange, batch: &[SourceImage]) -> Result<SyncReport> {
        if batch.is_empty() {
            return Ok(SyncReport::default());
        }

        let _lock = SiteLock::acquire(&self.paths.site_dir)?;
        let (mut registry, recovered_lines) = self.preflight()?;

        let mut report = SyncReport {
            recovered_lines,
            ..Default::default()
        };

        // 既存アセットを消す前に全画像をエンコードしておく
        let mut encoded: Vec<(&SourceImage, OptimizedImage)> = Vec::with_capacity(batch.len());
        let pb = self.progress_bar(batch.len());
        for source in batch {
            pb.set_message(display_name(source));
            match encode_optimized(&source.path, &self.image) {
                Ok(image) => encoded.push((source, image)),
                Err(e) => report.failures.push(self.record_failure(source, e)),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        if encoded.is_empty() {
            tracing::info!("取り込めた画像がないため何も変更しません");
            return Ok(report);
        }

        if let Some(capacity) = range.capacity() {
            if encoded.len() > capacity {
                return Err(GallerySyncError::RangeOverflow {
                    range: range.to_string(),
                    requested: encoded.len(),
                    capacity,
                });
            }
        }
        ensure_ids_fit(range.lo, encoded.len())?;

        report.backups = self.backup_artifacts()?;
        report.deleted_assets = self.delete_assets(range)?.len();

        for (source, image) in &encoded {
            let file_name = asset_file_name(range.lo + report.added.len() as u32);
            let dst = self.paths.images_dir.join(&file_name);
            match write_optimized(image, &dst) {
                Ok(()) => {
                    tracing::debug!("{} -> {}", source.path.display(), file_name);
                    report.added.push(RegistryEntry {
                        file_name,
                        label: source.label.clone(),
                    });
                }
                Err(e) => report.failures.push(self.record_failure(source, e)),
            }
        }

        report.removed_entries = registry.replace_range(
            range,
            report.added.iter().map(|e| (e.file_name.clone(), e.label.clone())),
        );
        report.total = Some(self.save_and_recount(&registry)?);

        Ok(report)
    }

    /// 番号範囲のアセットと台帳エントリを削除
    pub fn delete_range(&self, range: IdRange) -> Result<DeleteReport> {
        let _lock = SiteLock::acquire(&self.paths.site_dir)?;
        let (mut registry, _) = self.preflight()?;

        let in_range = list_assets(&self.paths.images_dir)?
            .into_iter()
            .any(|(id, _)| range.contains(id));
        let entries_in_range = registry
            .entries()
            .any(|e| parse_asset_id(&e.file_name).is_some_and(|id| range.contains(id)));

        if !in_range && !entries_in_range {
            tracing::info!("範囲 {} に該当するアセットはありません", range);
            return Ok(DeleteReport::default());
        }

        let backups = self.backup_artifacts()?;
        let deleted_assets = self.delete_assets(range)?;
        let removed_entries = registry.remove_range(range);
        let total = self.save_and_recount(&registry)?;

        Ok(DeleteReport {
            deleted_assets,
            removed_entries,
            total: Some(total),
            backups,
        })
    }

    /// TOTAL_IMAGES を画像ディレクトリの最大番号に合わせる
    ///
    /// 戻り値は (更新前, 更新後)。
    pub fn refresh_total(&self) -> Result<(Option<u32>, u32)> {
        let _lock = SiteLock::acquire(&self.paths.site_dir)?;
        let total = max_asset_id(&self.paths.images_dir)?.unwrap_or(0);
        let previous = marker::update_total_file(&self.paths.count_file, total)?;
        Ok((previous, total))
    }

    /// 画像・台帳・TOTAL_IMAGES の整合性を確認（読み取りのみ）
    pub fn check(&self) -> Result<ConsistencyReport> {
        let assets = list_assets(&self.paths.images_dir)?;
        let registry = LocationRegistry::load(&self.paths.registry_file)?.registry;

        let asset_names: BTreeSet<String> = assets.iter().map(|(id, _)| asset_file_name(*id)).collect();
        let entry_names: BTreeSet<String> = registry
            .entries()
            .filter(|e| parse_asset_id(&e.file_name).is_some())
            .map(|e| canonical_name(&e.file_name))
            .collect();

        let unregistered_assets = asset_names.difference(&entry_names).cloned().collect();
        let orphan_entries = entry_names.difference(&asset_names).cloned().collect();
        let foreign_keys = registry
            .entries()
            .filter(|e| parse_asset_id(&e.file_name).is_none())
            .map(|e| e.file_name.clone())
            .collect();

        Ok(ConsistencyReport {
            asset_count: assets.len(),
            entry_count: registry.len(),
            unregistered_assets,
            orphan_entries,
            foreign_keys,
            marker: marker::read_total_file(&self.paths.count_file)?,
            max_id: assets.last().map(|(id, _)| *id),
        })
    }

    /// 書き込み前に台帳と TOTAL_IMAGES を読めることを確認
    fn preflight(&self) -> Result<(LocationRegistry, Option<usize>)> {
        let parsed = LocationRegistry::load(&self.paths.registry_file)?;
        if let Some(kept) = parsed.recovered_lines {
            tracing::warn!(
                "{} を行単位で復旧しました（解釈できない{}行はそのまま残します）",
                self.paths.registry_file.display(),
                kept
            );
        }

        if marker::read_total_file(&self.paths.count_file)?.is_none() {
            return Err(GallerySyncError::MarkerNotFound(
                self.paths.count_file.display().to_string(),
            ));
        }

        Ok((parsed.registry, parsed.recovered_lines))
    }

    fn backup_artifacts(&self) -> Result<Vec<PathBuf>> {
        if !self.options.backup {
            return Ok(Vec::new());
        }
        let stamp = backup_stamp();
        let mut backups = Vec::new();
        for path in [&self.paths.registry_file, &self.paths.count_file] {
            if let Some(dest) = backup_file(path, &stamp)? {
                backups.push(dest);
            }
        }
        Ok(backups)
    }

    fn delete_assets(&self, range: IdRange) -> Result<Vec<PathBuf>> {
        let mut deleted = Vec::new();
        for (id, path) in list_assets(&self.paths.images_dir)? {
            if range.contains(id) {
                std::fs::remove_file(&path)?;
                tracing::debug!("削除: {}", path.display());
                deleted.push(path);
            }
        }
        Ok(deleted)
    }

    /// 台帳を保存し、TOTAL_IMAGES を最大番号で更新
    fn save_and_recount(&self, registry: &LocationRegistry) -> Result<u32> {
        registry.save(&self.paths.registry_file)?;
        let total = max_asset_id(&self.paths.images_dir)?.unwrap_or(0);
        marker::update_total_file(&self.paths.count_file, total)?;
        Ok(total)
    }

    fn record_failure(&self, source: &SourceImage, error: GallerySyncError) -> IngestFailure {
        tracing::warn!("取り込み失敗（スキップ）: {}", error);
        IngestFailure {
            source: source.path.clone(),
            reason: error.to_string(),
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.progress {
            return ProgressBar::hidden();
        }
        let style = ProgressStyle::with_template("  [{bar:30}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        ProgressBar::new(len as u64).with_style(style)
    }
}

/// `project-7.JPG` のような大文字拡張子のキーを正規の名前に揃える
fn canonical_name(file_name: &str) -> String {
    parse_asset_id(file_name)
        .map(asset_file_name)
        .unwrap_or_else(|| file_name.to_string())
}

fn display_name(source: &SourceImage) -> String {
    source
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
